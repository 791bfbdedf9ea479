use anyhow::Result;
use serde::Serialize;

use coreaudio_ext::format::{CommonPcmFormat, StreamDescription};

use super::command::{Cli, Equivalent, FormatArgs};
use super::output::{Report, emit, field};

pub fn cmd_format(args: &FormatArgs, _cli: &Cli) -> Result<()> {
    let common = CommonPcmFormat::from(args.common);
    if args.channels == 0 {
        anyhow::bail!("Channel count must be at least 1");
    }
    let format =
        StreamDescription::from_common_format(common, args.rate, args.channels, !args.non_interleaved);
    log::debug!("Built {format}");

    let equivalent = args
        .equivalent
        .map(|kind| -> Result<StreamDescription> {
            let converted = match kind {
                Equivalent::Interleaved => format.interleaved_equivalent()?,
                Equivalent::NonInterleaved => format.non_interleaved_equivalent()?,
                Equivalent::Standard => format.standard_equivalent()?,
            };
            Ok(converted)
        })
        .transpose()?;

    let report = FormatPair {
        format: FormatReport::from(&format),
        equivalent: equivalent.as_ref().map(FormatReport::from),
    };
    emit(&report, args.output)
}

#[derive(Debug, Serialize)]
struct FormatPair {
    format: FormatReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    equivalent: Option<FormatReport>,
}

impl Report for FormatPair {
    fn write_text(&self, out: &mut String) {
        self.format.write_text(out);
        if let Some(equivalent) = &self.equivalent {
            out.push_str("\nEquivalent format\n");
            equivalent.write_text(out);
        }
    }
}

/// Serialisable view of a stream description.
#[derive(Debug, Serialize)]
pub struct FormatReport {
    pub description: String,
    pub sample_rate: f64,
    pub format_id: String,
    pub format_flags: u32,
    pub bytes_per_packet: u32,
    pub frames_per_packet: u32,
    pub bytes_per_frame: u32,
    pub channels_per_frame: u32,
    pub bits_per_channel: u32,
    pub interleaved: bool,
    pub channel_streams: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_format: Option<String>,
    pub canonical: bool,
    pub packet_duration: f64,
}

impl From<&StreamDescription> for FormatReport {
    fn from(format: &StreamDescription) -> Self {
        Self {
            description: format.to_string(),
            sample_rate: format.sample_rate,
            format_id: format.format_id.to_string(),
            format_flags: format.format_flags.bits(),
            bytes_per_packet: format.bytes_per_packet,
            frames_per_packet: format.frames_per_packet,
            bytes_per_frame: format.bytes_per_frame,
            channels_per_frame: format.channels_per_frame,
            bits_per_channel: format.bits_per_channel,
            interleaved: format.is_interleaved(),
            channel_streams: format.channel_stream_count(),
            common_format: format.common_format().map(|c| c.to_string()),
            canonical: format.is_canonical(),
            packet_duration: format.packet_duration(),
        }
    }
}

impl Report for FormatReport {
    fn write_text(&self, out: &mut String) {
        field(out, "Format", &self.description);
        field(out, "Sample rate", format!("{} Hz", self.sample_rate));
        field(out, "Format ID", &self.format_id);
        field(out, "Format flags", format!("{:#010x}", self.format_flags));
        field(out, "Bytes per packet", self.bytes_per_packet);
        field(out, "Frames per packet", self.frames_per_packet);
        field(out, "Bytes per frame", self.bytes_per_frame);
        field(out, "Channels per frame", self.channels_per_frame);
        field(out, "Bits per channel", self.bits_per_channel);
        field(out, "Interleaved", yes_no(self.interleaved));
        field(out, "Channel streams", self.channel_streams);
        field(
            out,
            "Common format",
            self.common_format.as_deref().unwrap_or("none"),
        );
        field(out, "Canonical", yes_no(self.canonical));
        field(out, "Packet duration", format!("{:.9} s", self.packet_duration));
    }
}

pub fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::command::OutputFormat;
    use crate::cli::output::render;

    #[test]
    fn report_for_non_interleaved_float() {
        let format = StreamDescription::from_common_format(CommonPcmFormat::Float32, 44100.0, 2, false);
        let report = FormatReport::from(&format);
        assert!(!report.interleaved);
        assert_eq!(report.channel_streams, 2);
        assert_eq!(report.bytes_per_frame, 4);
        assert_eq!(report.common_format.as_deref(), Some("float32"));

        let text = render(&report, OutputFormat::Text).unwrap();
        assert!(text.contains("Interleaved"));
        assert!(text.contains("no"));
    }

    #[test]
    fn yaml_skips_missing_equivalent() {
        let format = StreamDescription::from_common_format(CommonPcmFormat::Int16, 48000.0, 1, true);
        let report = FormatPair {
            format: FormatReport::from(&format),
            equivalent: None,
        };
        let yaml = render(&report, OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("sample_rate: 48000"));
        assert!(!yaml.contains("equivalent"));
    }
}
