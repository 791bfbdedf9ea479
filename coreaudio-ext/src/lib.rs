#![doc = include_str!("../README.md")]
//!
//! ## Technical Overview
//!
//! Value types and thin wrappers around Core Audio structures and the audio
//! hardware abstraction layer (HAL).
//!
//! ### Stream Formats
//!
//! [`format::StreamDescription`] mirrors `AudioStreamBasicDescription`:
//! sample rate, format ID and flags, packet and frame geometry. Linear PCM
//! helpers cover interleaving, endianness, sample type and the common
//! processing formats.
//!
//! ### Channel Layouts
//!
//! [`format::ChannelLayout`] holds a layout tag, a channel bitmap or explicit
//! channel descriptions, and maps channels between layouts.
//!
//! ### Byte Streams
//!
//! [`utils::byte_stream::ByteStream`] is a cursor over an in-memory buffer with
//! typed reads and writes in native, little or big endian byte order. The
//! position never leaves `[0, len]`; failed operations leave it untouched.
//!
//! ## Quick Start
//!
//! ```rust
//! use coreaudio_ext::format::{ChannelLayout, CommonPcmFormat, StreamDescription};
//! use coreaudio_ext::utils::byte_stream::ByteStream;
//!
//! let format = StreamDescription::from_common_format(CommonPcmFormat::Float32, 44100.0, 2, false);
//! assert!(format.is_float());
//! assert_eq!(format.channel_stream_count(), 2);
//!
//! let layout: ChannelLayout = "L R".parse()?;
//! assert_eq!(layout.channel_count(), 2);
//!
//! let mut stream = ByteStream::new();
//! stream.write_be(0x6c70_636du32)?;
//! stream.rewind();
//! assert_eq!(stream.read_array::<4>()?, *b"lpcm");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Owned audio buffers and lock-free ring buffers.
///
/// - **Buffer Lists** ([`buffer::buffer_list`]): Per channel stream storage
/// - **Byte Ring** ([`buffer::ring_buffer`]): SPSC byte transport
/// - **Audio Ring** ([`buffer::audio_ring_buffer`]): SPSC frame transport
pub mod buffer;

/// Core Audio Format header reading and writing.
pub mod caf;

/// Descriptions of audio data.
///
/// - **Stream Descriptions** ([`format::stream_description`]): Format descriptors
/// - **Channel Layouts** ([`format::channel_layout`]): Speaker assignments
/// - **Timestamps** ([`format::timestamp`]): Multi-clock time points
pub mod format;

/// Audio objects of the HAL: system, devices and streams.
pub mod object;

/// Utility functions and supporting infrastructure.
///
/// - **Byte Streams** ([`utils::byte_stream`]): Cursor over bytes
/// - **Byte Order** ([`utils::byteorder`]): Endian-aware encoding traits
/// - **Four-Character Codes** ([`utils::fourcc`]): Code formatting
/// - **Error Handling** ([`utils::errors`]): Error types
pub mod utils;
