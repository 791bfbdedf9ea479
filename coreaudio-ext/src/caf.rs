//! Core Audio Format header codec.
//!
//! Reads and writes the parts of a CAF file that describe its audio: the
//! file header, the `desc` and `chan` chunks, and the position of the `data`
//! chunk. Sample data itself is left to the caller.

use std::io::{self, Write};

use caext_macros::{FromBytes, ToBytes, caf_chunk_type};
use log::{Level, debug, trace};

use crate::format::channel_layout::ChannelLayout;
use crate::format::stream_description::{FormatFlags, FormatId, StreamDescription};
use crate::log_or_err;
use crate::utils::byte_stream::ByteStream;
use crate::utils::byteorder::ReadBytesBe;
use crate::utils::errors::{ByteStreamError, CafError};
use crate::utils::fourcc::fourcc_string;

const CAF_FILE_TYPE: &[u8; 4] = b"caff";
const CAF_FILE_VERSION: u16 = 1;
const CAF_HEADER_SIZE: usize = 8;
const CHUNK_HEADER_SIZE: usize = 12;

// Linear PCM flags as stored in a `desc` chunk
const CAF_LPCM_IS_FLOAT: u32 = 1 << 0;
const CAF_LPCM_IS_LITTLE_ENDIAN: u32 = 1 << 1;

const KNOWN_CHUNKS: &[&[u8; 4]] = &[
    b"pakt", b"kuki", b"free", b"info", b"strg", b"mark", b"regn", b"inst", b"midi", b"ovvw",
    b"peak", b"edct", b"uuid", b"umid", b"lyrc", b"ldsc",
];

pub fn write_caf_file_header<W: Write>(writer: &mut W) -> io::Result<()> {
    writer.write_all(CAF_FILE_TYPE)?;
    writer.write_all(&CAF_FILE_VERSION.to_be_bytes())?;
    writer.write_all(&0u16.to_be_bytes())?;

    Ok(())
}

pub trait CafChunk {
    const CHUNK_TYPE: [u8; 4];

    fn chunk_data(&self) -> Vec<u8>;

    fn write_chunk<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&Self::CHUNK_TYPE)?;

        let chunk_data = self.chunk_data();
        writer.write_all(&(chunk_data.len() as i64).to_be_bytes())?;
        writer.write_all(&chunk_data)?;

        Ok(())
    }
}

/// Body of the `desc` chunk, always big-endian and always interleaved.
#[derive(Debug, Clone, Copy, PartialEq, ToBytes, FromBytes)]
#[caf_chunk_type(b"desc")]
pub struct CafAudioDescription {
    pub sample_rate: f64,
    pub format_id: FormatId,
    pub format_flags: u32,
    pub bytes_per_packet: u32,
    pub frames_per_packet: u32,
    pub channels_per_frame: u32,
    pub bits_per_channel: u32,
}

impl CafAudioDescription {
    pub const SIZE: usize = 32;
}

impl From<&StreamDescription> for CafAudioDescription {
    fn from(asbd: &StreamDescription) -> Self {
        if !asbd.is_pcm() {
            return Self {
                sample_rate: asbd.sample_rate,
                format_id: asbd.format_id,
                format_flags: asbd.format_flags.bits(),
                bytes_per_packet: asbd.bytes_per_packet,
                frames_per_packet: asbd.frames_per_packet,
                channels_per_frame: asbd.channels_per_frame,
                bits_per_channel: asbd.bits_per_channel,
            };
        }

        let interleaved = asbd.interleaved_equivalent().unwrap_or(*asbd);
        let mut flags = 0;
        if interleaved.is_float() {
            flags |= CAF_LPCM_IS_FLOAT;
        }
        if interleaved.is_little_endian() {
            flags |= CAF_LPCM_IS_LITTLE_ENDIAN;
        }

        Self {
            sample_rate: interleaved.sample_rate,
            format_id: FormatId::LINEAR_PCM,
            format_flags: flags,
            bytes_per_packet: interleaved.bytes_per_packet,
            frames_per_packet: interleaved.frames_per_packet,
            channels_per_frame: interleaved.channels_per_frame,
            bits_per_channel: interleaved.bits_per_channel,
        }
    }
}

impl From<&CafAudioDescription> for StreamDescription {
    fn from(desc: &CafAudioDescription) -> Self {
        if desc.format_id != FormatId::LINEAR_PCM {
            return StreamDescription::new(
                desc.sample_rate,
                desc.format_id,
                FormatFlags(desc.format_flags),
                desc.bytes_per_packet,
                desc.frames_per_packet,
                0,
                desc.channels_per_frame,
                desc.bits_per_channel,
            );
        }

        let mut flags = if desc.format_flags & CAF_LPCM_IS_FLOAT != 0 {
            FormatFlags::IS_FLOAT
        } else {
            FormatFlags::IS_SIGNED_INTEGER
        };
        if desc.format_flags & CAF_LPCM_IS_LITTLE_ENDIAN == 0 {
            flags |= FormatFlags::IS_BIG_ENDIAN;
        }
        let sample_size = match desc.channels_per_frame {
            0 => 0,
            n => desc.bytes_per_packet / n,
        };
        flags |= if sample_size * 8 == desc.bits_per_channel {
            FormatFlags::IS_PACKED
        } else {
            FormatFlags::IS_ALIGNED_HIGH
        };

        StreamDescription::new(
            desc.sample_rate,
            FormatId::LINEAR_PCM,
            flags,
            desc.bytes_per_packet,
            desc.frames_per_packet,
            desc.bytes_per_packet,
            desc.channels_per_frame,
            desc.bits_per_channel,
        )
    }
}

impl StreamDescription {
    /// Reads a CAF `desc` chunk body.
    pub fn read_caf<S: AsRef<[u8]>>(stream: &mut ByteStream<S>) -> Result<Self, ByteStreamError> {
        let desc = CafAudioDescription::read_be(stream)?;
        Ok(Self::from(&desc))
    }
}

/// Writes the file header, `desc`, optional `chan`, and the `data` chunk
/// header. A `data_size` of `None` marks the data length as unknown.
pub fn write_caf_header<W: Write>(
    writer: &mut W,
    format: &StreamDescription,
    layout: Option<&ChannelLayout>,
    data_size: Option<u64>,
) -> io::Result<()> {
    let declared = match data_size {
        // Declared size covers the edit count as well
        Some(size) => i64::try_from(size)
            .ok()
            .and_then(|size| size.checked_add(4))
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, CafError::DataSizeTooLarge(size)))?,
        None => -1,
    };

    write_caf_file_header(writer)?;
    CafAudioDescription::from(format).write_chunk(writer)?;
    if let Some(layout) = layout {
        layout.write_chunk(writer)?;
    }

    writer.write_all(b"data")?;
    writer.write_all(&declared.to_be_bytes())?;
    // Edit count
    writer.write_all(&0u32.to_be_bytes())?;

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CafChunkInfo {
    pub chunk_type: [u8; 4],
    /// Offset of the chunk body from the start of the file.
    pub offset: u64,
    /// Declared body size; -1 for a `data` chunk of unknown length.
    pub size: i64,
}

impl CafChunkInfo {
    pub fn type_string(&self) -> String {
        fourcc_string(u32::from_be_bytes(self.chunk_type))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CafHeader {
    pub description: StreamDescription,
    pub channel_layout: Option<ChannelLayout>,
    pub chunks: Vec<CafChunkInfo>,
    /// Offset of the first audio byte, past the edit count.
    pub data_offset: Option<u64>,
    /// Audio byte count, `None` when the file leaves it open.
    pub data_size: Option<u64>,
}

impl CafHeader {
    /// Frame count of constant bitrate audio with a known data size.
    pub fn frame_count(&self) -> Option<u64> {
        let bytes_per_packet = self.description.bytes_per_packet as u64;
        let frames_per_packet = self.description.frames_per_packet as u64;
        match (self.data_size, bytes_per_packet) {
            (Some(size), bpp) if bpp > 0 => Some(size / bpp * frames_per_packet),
            _ => None,
        }
    }

    pub fn duration(&self) -> Option<f64> {
        match self.frame_count() {
            Some(frames) if self.description.sample_rate > 0.0 => {
                Some(frames as f64 / self.description.sample_rate)
            }
            _ => None,
        }
    }
}

pub struct CafParser {
    pub fail_level: Level,
}

impl Default for CafParser {
    fn default() -> Self {
        Self {
            fail_level: Level::Error,
        }
    }
}

impl CafParser {
    pub fn set_fail_level(&mut self, level: Level) {
        self.fail_level = level;
    }

    /// Parses the header chunks of an in-memory CAF file up to the end of
    /// the buffer or the start of a `data` chunk of unknown length.
    pub fn parse(&self, bytes: &[u8]) -> Result<CafHeader, CafError> {
        let mut stream = ByteStream::from(bytes);

        if stream.len() < CAF_HEADER_SIZE || &stream.read_array::<4>()? != CAF_FILE_TYPE {
            return Err(CafError::MissingSignature);
        }
        let version = stream.read_be::<u16>()?;
        if version != CAF_FILE_VERSION {
            return Err(CafError::UnsupportedVersion(version));
        }
        let _flags = stream.read_be::<u16>()?;

        let mut description = None;
        let mut channel_layout = None;
        let mut chunks = Vec::new();
        let mut data_offset = None;
        let mut data_size = None;

        while stream.remaining() >= CHUNK_HEADER_SIZE {
            let chunk_type = stream.read_array::<4>()?;
            let size = stream.read_be::<i64>()?;
            let offset = stream.position() as u64;
            let info = CafChunkInfo {
                chunk_type,
                offset,
                size,
            };
            trace!("Chunk {} at {offset}, {size} bytes", info.type_string());
            chunks.push(info);

            if description.is_none() && &chunk_type != b"desc" {
                return Err(CafError::MissingDescription);
            }

            let available = stream.remaining();
            let open_ended = &chunk_type == b"data" && size == -1;
            let body_len = if open_ended {
                available
            } else if size < 0 || size as u64 > available as u64 {
                let err = CafError::TruncatedChunk {
                    chunk: info.type_string(),
                    declared: size as u64,
                    available,
                };
                if &chunk_type == b"data" {
                    log_or_err!(self, Level::Warn, err);
                    available
                } else {
                    log_or_err!(self, Level::Error, err);
                    available
                }
            } else {
                size as usize
            };

            let body = stream.read_slice(body_len)?;
            let mut chunk = ByteStream::from(body);

            match &chunk_type {
                b"desc" => {
                    let asbd = StreamDescription::read_caf(&mut chunk)?;
                    debug!("CAF format: {asbd}");
                    description = Some(asbd);
                }
                b"chan" => {
                    let layout = ChannelLayout::read_caf(&mut chunk)?;
                    debug!("CAF channel layout: {layout}");
                    channel_layout = Some(layout);
                }
                b"data" => {
                    // Edit count precedes the audio bytes
                    let _edit_count = chunk.read_be::<u32>()?;
                    data_offset = Some(offset + 4);
                    data_size = if open_ended {
                        None
                    } else {
                        Some(body_len.saturating_sub(4) as u64)
                    };
                }
                other if KNOWN_CHUNKS.contains(&other) => {
                    debug!("Skipping {} chunk", info.type_string());
                }
                _ => {
                    log_or_err!(self, Level::Warn, CafError::UnknownChunk(info.type_string()));
                }
            }

            if open_ended {
                break;
            }
        }

        let description = description.ok_or(CafError::MissingDescription)?;

        if let Some(layout) = &channel_layout {
            let layout_channels = layout.channel_count();
            if layout_channels != description.channels_per_frame as usize {
                log_or_err!(
                    self,
                    Level::Warn,
                    CafError::ChannelCountMismatch {
                        layout: layout_channels,
                        format: description.channels_per_frame,
                    }
                );
            }
        }

        Ok(CafHeader {
            description,
            channel_layout,
            chunks,
            data_offset,
            data_size,
        })
    }
}

/// Parses with the default fail level.
pub fn read_caf_header(bytes: &[u8]) -> Result<CafHeader, CafError> {
    CafParser::default().parse(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::channel_layout::ChannelLayoutTag;
    use crate::format::stream_description::CommonPcmFormat;
    use std::io::Cursor;

    fn int24_stereo() -> StreamDescription {
        StreamDescription::linear_pcm(48000.0, 2, 24, 24, false, true, false)
    }

    #[test]
    fn header_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let mut cursor = Cursor::new(Vec::new());
        let layout = ChannelLayout::stereo();
        write_caf_header(&mut cursor, &int24_stereo(), Some(&layout), Some(600))?;
        cursor.write_all(&[0u8; 600])?;
        let buffer = cursor.into_inner();

        assert_eq!(&buffer[0..4], b"caff");
        let header = read_caf_header(&buffer)?;
        assert_eq!(header.description, int24_stereo());
        assert_eq!(header.channel_layout, Some(layout));
        assert_eq!(header.data_size, Some(600));
        assert_eq!(header.frame_count(), Some(100));
        assert_eq!(header.duration(), Some(100.0 / 48000.0));

        let data_offset = header.data_offset.ok_or("no data chunk")? as usize;
        assert_eq!(buffer.len() - data_offset, 600);
        assert_eq!(
            header.chunks.iter().map(|c| c.chunk_type).collect::<Vec<_>>(),
            vec![*b"desc", *b"chan", *b"data"]
        );
        Ok(())
    }

    #[test]
    fn desc_chunk_layout() {
        let asbd = StreamDescription::from_common_format(CommonPcmFormat::Float32, 44100.0, 2, false);
        let desc = CafAudioDescription::from(&asbd);
        // Stored interleaved
        assert_eq!(desc.bytes_per_packet, 8);
        assert_eq!(desc.format_flags & CAF_LPCM_IS_FLOAT, CAF_LPCM_IS_FLOAT);

        let data = desc.chunk_data();
        assert_eq!(data.len(), CafAudioDescription::SIZE);
        assert_eq!(&data[..8], &44100.0f64.to_be_bytes());
        assert_eq!(&data[8..12], b"lpcm");

        let back = StreamDescription::from(&desc);
        assert!(back.is_float());
        assert!(back.is_interleaved());
        assert_eq!(back, asbd.interleaved_equivalent().unwrap());
    }

    #[test]
    fn open_ended_data_chunk() {
        let mut buffer = Vec::new();
        write_caf_header(&mut buffer, &int24_stereo(), None, None).unwrap();
        buffer.extend_from_slice(&[0u8; 60]);
        let header = read_caf_header(&buffer).unwrap();
        assert_eq!(header.data_size, None);
        assert_eq!(header.frame_count(), None);
        assert_eq!(header.chunks.last().map(|c| c.size), Some(-1));
    }

    #[test]
    fn rejects_non_caf() {
        assert_eq!(read_caf_header(b"RIFF\0\0\0\0WAVE"), Err(CafError::MissingSignature));
        assert_eq!(read_caf_header(b"caf"), Err(CafError::MissingSignature));
        assert_eq!(
            read_caf_header(b"caff\x00\x02\x00\x00"),
            Err(CafError::UnsupportedVersion(2))
        );

        let mut buffer = Vec::new();
        write_caf_file_header(&mut buffer).unwrap();
        ChannelLayout::stereo().write_chunk(&mut buffer).unwrap();
        assert_eq!(read_caf_header(&buffer), Err(CafError::MissingDescription));
    }

    #[test]
    fn strict_mode_escalates_warnings() {
        let mut buffer = Vec::new();
        write_caf_file_header(&mut buffer).unwrap();
        CafAudioDescription::from(&int24_stereo())
            .write_chunk(&mut buffer)
            .unwrap();
        ChannelLayout::with_tag(ChannelLayoutTag::MPEG_5_1_A)
            .write_chunk(&mut buffer)
            .unwrap();
        buffer.extend_from_slice(b"zzzz");
        buffer.extend_from_slice(&0i64.to_be_bytes());

        let lenient = read_caf_header(&buffer).unwrap();
        assert_eq!(lenient.channel_layout.map(|l| l.channel_count()), Some(6));
        assert_eq!(lenient.data_offset, None);

        let mut strict = CafParser::default();
        strict.set_fail_level(Level::Warn);
        assert_eq!(
            strict.parse(&buffer),
            Err(CafError::UnknownChunk("'zzzz'".to_string()))
        );
    }

    #[test]
    fn truncated_chunk() {
        let mut buffer = Vec::new();
        write_caf_file_header(&mut buffer).unwrap();
        CafAudioDescription::from(&int24_stereo())
            .write_chunk(&mut buffer)
            .unwrap();
        buffer.truncate(buffer.len() - 4);
        assert!(matches!(
            read_caf_header(&buffer),
            Err(CafError::TruncatedChunk { declared: 32, available: 28, .. })
        ));
    }

    #[test]
    fn oversized_data_size_is_rejected() {
        for size in [u64::MAX, i64::MAX as u64] {
            let mut out = Vec::new();
            let err = write_caf_header(&mut out, &int24_stereo(), None, Some(size)).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
            assert!(out.is_empty());
        }

        let mut out = Vec::new();
        write_caf_header(&mut out, &int24_stereo(), None, Some(i64::MAX as u64 - 4)).unwrap();
        let data = out.len() - 16;
        assert_eq!(&out[data..data + 4], b"data");
        assert_eq!(&out[data + 4..data + 12], &i64::MAX.to_be_bytes());
    }
}
