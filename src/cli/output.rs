use anyhow::Result;
use serde::Serialize;

use super::command::OutputFormat;

/// A report that can be printed for humans or serialised as YAML.
pub trait Report: Serialize {
    fn write_text(&self, out: &mut String);
}

pub fn render<R: Report>(report: &R, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            report.write_text(&mut out);
            Ok(out)
        }
        OutputFormat::Yaml => Ok(serde_yaml_ng::to_string(report)?),
    }
}

pub fn emit<R: Report>(report: &R, format: OutputFormat) -> Result<()> {
    print!("{}", render(report, format)?);
    Ok(())
}

/// Appends a `label value` line with the label padded to a fixed column.
pub fn field(out: &mut String, label: &str, value: impl std::fmt::Display) {
    out.push_str(&format!("{label:<28}{value}\n"));
}
