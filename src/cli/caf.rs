use anyhow::{Context, Result};
use log::Level;
use serde::Serialize;

use coreaudio_ext::caf::{CafHeader, CafParser};
use coreaudio_ext::format::timestamp::time_str;

use super::command::{CafArgs, Cli};
use super::format::FormatReport;
use super::output::{Report, emit, field};

pub fn cmd_caf(args: &CafArgs, cli: &Cli) -> Result<()> {
    log::info!("Reading CAF header: {}", args.input.display());

    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let mut parser = CafParser::default();

    // Configure fail level based on strict mode
    let fail_level = if cli.strict {
        Level::Warn
    } else {
        Level::Error
    };
    parser.set_fail_level(fail_level);

    let header = parser
        .parse(&bytes)
        .with_context(|| format!("Invalid CAF file {}", args.input.display()))?;

    emit(&CafReport::from_header(&header, bytes.len() as u64), args.output)
}

#[derive(Debug, Serialize)]
struct CafReport {
    file_size: u64,
    format: FormatReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel_layout: Option<String>,
    chunks: Vec<ChunkReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ChunkReport {
    chunk_type: String,
    offset: u64,
    size: i64,
}

impl CafReport {
    fn from_header(header: &CafHeader, file_size: u64) -> Self {
        Self {
            file_size,
            format: FormatReport::from(&header.description),
            channel_layout: header.channel_layout.as_ref().map(|l| l.to_string()),
            chunks: header
                .chunks
                .iter()
                .map(|chunk| ChunkReport {
                    chunk_type: chunk.type_string(),
                    offset: chunk.offset,
                    size: chunk.size,
                })
                .collect(),
            data_offset: header.data_offset,
            data_size: header.data_size,
            frame_count: header.frame_count(),
            duration: header.duration(),
        }
    }
}

impl Report for CafReport {
    fn write_text(&self, out: &mut String) {
        field(out, "File size", format!("{} bytes", self.file_size));
        self.format.write_text(out);
        field(
            out,
            "Channel layout",
            self.channel_layout.as_deref().unwrap_or("none"),
        );
        for chunk in &self.chunks {
            let size = match chunk.size {
                -1 => "open-ended".to_string(),
                size => format!("{size} bytes"),
            };
            field(
                out,
                &format!("  Chunk {}", chunk.chunk_type),
                format!("at {}, {size}", chunk.offset),
            );
        }
        if let Some(offset) = self.data_offset {
            field(out, "Audio data offset", offset);
        }
        match self.data_size {
            Some(size) => field(out, "Audio data size", format!("{size} bytes")),
            None => field(out, "Audio data size", "unknown"),
        }
        if let Some(frames) = self.frame_count {
            field(out, "Frames", frames);
        }
        if let Some(duration) = self.duration {
            field(out, "Duration", time_str(duration));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coreaudio_ext::caf::write_caf_header;
    use coreaudio_ext::format::{ChannelLayout, CommonPcmFormat, StreamDescription};

    #[test]
    fn report_from_written_header() {
        let format = StreamDescription::from_common_format(CommonPcmFormat::Int16, 48000.0, 2, true);
        let mut file = Vec::new();
        write_caf_header(&mut file, &format, Some(&ChannelLayout::stereo()), Some(48000 * 4)).unwrap();
        file.resize(file.len() + 48000 * 4, 0);

        let header = CafParser::default().parse(&file).unwrap();
        let report = CafReport::from_header(&header, file.len() as u64);
        assert_eq!(report.frame_count, Some(48000));
        assert_eq!(report.duration, Some(1.0));
        assert!(report.channel_layout.is_some());
        assert!(report.chunks.iter().any(|c| c.chunk_type == "'data'"));
    }
}
