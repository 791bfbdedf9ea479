use anyhow::{Context, Result};
use serde::Serialize;

use coreaudio_ext::format::{ChannelLabel, ChannelLayout};

use super::command::{Cli, LayoutArgs};
use super::output::{Report, emit, field};

pub fn cmd_layout(args: &LayoutArgs, _cli: &Cli) -> Result<()> {
    let layout = parse_layout(&args.layout)?;
    let mut report = LayoutReport::from_layout(&layout);

    if let Some(target) = &args.map_to {
        let target = parse_layout(target)?;
        let map = layout
            .map_to_layout(&target)
            .context("Cannot build a channel map between these layouts")?;
        let unmatched = map.iter().filter(|&&index| index < 0).count();
        if unmatched > 0 {
            log::warn!("{unmatched} output channel(s) have no source channel");
        }
        report.channel_map = Some(ChannelMapReport {
            target: target.to_string(),
            map,
        });
    }

    emit(&report, args.output)
}

fn parse_layout(s: &str) -> Result<ChannelLayout> {
    s.parse::<ChannelLayout>()
        .with_context(|| format!("Invalid channel layout \"{s}\""))
}

#[derive(Debug, Serialize)]
struct LayoutReport {
    description: String,
    tag: String,
    channel_count: usize,
    labels: Vec<LabelReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bitmap: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel_map: Option<ChannelMapReport>,
}

#[derive(Debug, Serialize)]
struct LabelReport {
    abbreviation: String,
    name: Option<&'static str>,
    value: u32,
}

#[derive(Debug, Serialize)]
struct ChannelMapReport {
    target: String,
    /// Source channel for every target channel, -1 when unmatched.
    map: Vec<i32>,
}

impl LayoutReport {
    fn from_layout(layout: &ChannelLayout) -> Self {
        let labels = match layout.labels() {
            Ok(labels) => labels,
            Err(err) => {
                log::debug!("Layout labels unavailable: {err}");
                Vec::new()
            }
        };
        Self {
            description: layout.to_string(),
            tag: layout.tag.to_string(),
            channel_count: layout.channel_count(),
            labels: labels
                .into_iter()
                .map(|label: ChannelLabel| LabelReport {
                    abbreviation: label.to_string(),
                    name: label.full_name(),
                    value: label.as_u32(),
                })
                .collect(),
            bitmap: layout.to_bitmap().map(|bitmap| bitmap.bits()),
            channel_map: None,
        }
    }
}

impl Report for LayoutReport {
    fn write_text(&self, out: &mut String) {
        field(out, "Layout", &self.description);
        field(out, "Tag", &self.tag);
        field(out, "Channels", self.channel_count);
        if let Some(bitmap) = self.bitmap {
            field(out, "Channel bitmap", format!("{bitmap:#010x}"));
        }
        for (index, label) in self.labels.iter().enumerate() {
            field(
                out,
                &format!("  Channel {index}"),
                format!("{} ({})", label.abbreviation, label.name.unwrap_or("unknown")),
            );
        }
        if let Some(channel_map) = &self.channel_map {
            field(out, "Mapped to", &channel_map.target);
            let map = channel_map
                .map
                .iter()
                .map(|index| match index {
                    -1 => "-".to_string(),
                    index => index.to_string(),
                })
                .collect::<Vec<_>>()
                .join(" ");
            field(out, "Channel map", map);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_string_report() {
        let layout = parse_layout("L R C").unwrap();
        let report = LayoutReport::from_layout(&layout);
        assert_eq!(report.channel_count, 3);
        assert_eq!(report.labels.len(), 3);
        assert_eq!(report.labels[0].abbreviation, "L");
        assert_eq!(report.labels[2].abbreviation, "C");
    }

    #[test]
    fn rejects_unknown_layout() {
        assert!(parse_layout("L R Bogus").is_err());
    }
}
