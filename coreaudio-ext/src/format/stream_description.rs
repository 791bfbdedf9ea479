//! Audio stream format descriptions.
//!
//! [`StreamDescription`] mirrors the host `AudioStreamBasicDescription`
//! layout field for field. It can be built from a handful of common PCM
//! formats, queried for its PCM properties, and converted between
//! interleaved and non-interleaved equivalents.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};
use std::str::FromStr;

use caext_macros::{FromBytes, ToBytes};

use crate::utils::byte_stream::ByteStream;
use crate::utils::byteorder::ByteValue;
use crate::utils::errors::{ByteStreamError, FormatError};
use crate::utils::fourcc::{fourcc, fourcc_string};

/// Four-character code identifying an audio data format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ToBytes, FromBytes)]
pub struct FormatId(pub u32);

impl FormatId {
    pub const LINEAR_PCM: Self = Self(fourcc(b"lpcm"));
    pub const AC3: Self = Self(fourcc(b"ac-3"));
    pub const ENHANCED_AC3: Self = Self(fourcc(b"ec-3"));
    pub const APPLE_IMA4: Self = Self(fourcc(b"ima4"));
    pub const MPEG4_AAC: Self = Self(fourcc(b"aac "));
    pub const MPEG4_AAC_HE: Self = Self(fourcc(b"aach"));
    pub const MPEG4_ALS: Self = Self(fourcc(b"als "));
    pub const MPEG_LAYER3: Self = Self(fourcc(b".mp3"));
    pub const APPLE_LOSSLESS: Self = Self(fourcc(b"alac"));
    pub const FLAC: Self = Self(fourcc(b"flac"));
    pub const OPUS: Self = Self(fourcc(b"opus"));
    pub const ULAW: Self = Self(fourcc(b"ulaw"));
    pub const ALAW: Self = Self(fourcc(b"alaw"));
    pub const AMR: Self = Self(fourcc(b"samr"));
    pub const MIDI_STREAM: Self = Self(fourcc(b"midi"));
    pub const TIME_CODE: Self = Self(fourcc(b"time"));

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl From<u32> for FormatId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&fourcc_string(self.0))
    }
}

/// `mFormatFlags` bit set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ToBytes, FromBytes)]
pub struct FormatFlags(pub u32);

impl FormatFlags {
    pub const IS_FLOAT: Self = Self(1 << 0);
    pub const IS_BIG_ENDIAN: Self = Self(1 << 1);
    pub const IS_SIGNED_INTEGER: Self = Self(1 << 2);
    pub const IS_PACKED: Self = Self(1 << 3);
    pub const IS_ALIGNED_HIGH: Self = Self(1 << 4);
    pub const IS_NON_INTERLEAVED: Self = Self(1 << 5);
    pub const IS_NON_MIXABLE: Self = Self(1 << 6);
    pub const ARE_ALL_CLEAR: Self = Self(0x8000_0000);

    pub const NATIVE_ENDIAN: Self = if cfg!(target_endian = "big") {
        Self::IS_BIG_ENDIAN
    } else {
        Self(0)
    };

    /// Native-endian packed float, the host's canonical sample format.
    pub const CANONICAL: Self =
        Self(Self::IS_FLOAT.0 | Self::NATIVE_ENDIAN.0 | Self::IS_PACKED.0);

    pub const SAMPLE_FRACTION_SHIFT: u32 = 7;
    pub const SAMPLE_FRACTION_MASK: u32 = 0x3F << Self::SAMPLE_FRACTION_SHIFT;

    pub const APPLE_LOSSLESS_16_BIT_SOURCE: Self = Self(1);
    pub const APPLE_LOSSLESS_20_BIT_SOURCE: Self = Self(2);
    pub const APPLE_LOSSLESS_24_BIT_SOURCE: Self = Self(3);
    pub const APPLE_LOSSLESS_32_BIT_SOURCE: Self = Self(4);

    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Fractional bits of a fixed-point linear PCM sample.
    #[inline]
    pub const fn sample_fraction_bits(self) -> u32 {
        (self.0 & Self::SAMPLE_FRACTION_MASK) >> Self::SAMPLE_FRACTION_SHIFT
    }
}

impl BitOr for FormatFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for FormatFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for FormatFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for FormatFlags {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0)
    }
}

/// Native-endian, packed PCM formats commonly used for processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommonPcmFormat {
    Float32,
    Float64,
    Int16,
    Int32,
}

impl CommonPcmFormat {
    pub const fn bits_per_channel(self) -> u32 {
        match self {
            Self::Float32 | Self::Int32 => 32,
            Self::Float64 => 64,
            Self::Int16 => 16,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
        }
    }
}

impl fmt::Display for CommonPcmFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CommonPcmFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "float32" | "f32" => Ok(Self::Float32),
            "float64" | "f64" => Ok(Self::Float64),
            "int16" | "i16" => Ok(Self::Int16),
            "int32" | "i32" => Ok(Self::Int32),
            _ => Err(FormatError::UnknownCommonFormat(s.to_string())),
        }
    }
}

/// Wrapper over the host `AudioStreamBasicDescription`.
///
/// Equality is bitwise over every field, the sample rate included.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamDescription {
    pub sample_rate: f64,
    pub format_id: FormatId,
    pub format_flags: FormatFlags,
    pub bytes_per_packet: u32,
    pub frames_per_packet: u32,
    pub bytes_per_frame: u32,
    pub channels_per_frame: u32,
    pub bits_per_channel: u32,
    pub reserved: u32,
}

impl PartialEq for StreamDescription {
    fn eq(&self, other: &Self) -> bool {
        self.sample_rate.to_bits() == other.sample_rate.to_bits()
            && self.format_id == other.format_id
            && self.format_flags == other.format_flags
            && self.bytes_per_packet == other.bytes_per_packet
            && self.frames_per_packet == other.frames_per_packet
            && self.bytes_per_frame == other.bytes_per_frame
            && self.channels_per_frame == other.channels_per_frame
            && self.bits_per_channel == other.bits_per_channel
            && self.reserved == other.reserved
    }
}

impl Eq for StreamDescription {}

impl StreamDescription {
    /// Size of the host structure in bytes.
    pub const NATIVE_SIZE: usize = 40;

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sample_rate: f64,
        format_id: FormatId,
        format_flags: FormatFlags,
        bytes_per_packet: u32,
        frames_per_packet: u32,
        bytes_per_frame: u32,
        channels_per_frame: u32,
        bits_per_channel: u32,
    ) -> Self {
        Self {
            sample_rate,
            format_id,
            format_flags,
            bytes_per_packet,
            frames_per_packet,
            bytes_per_frame,
            channels_per_frame,
            bits_per_channel,
            reserved: 0,
        }
    }

    /// Fills out a linear PCM description the way `FillOutASBDForLPCM` does.
    pub fn linear_pcm(
        sample_rate: f64,
        channels_per_frame: u32,
        valid_bits_per_channel: u32,
        total_bits_per_channel: u32,
        is_float: bool,
        is_big_endian: bool,
        is_non_interleaved: bool,
    ) -> Self {
        let mut flags = if is_float {
            FormatFlags::IS_FLOAT
        } else {
            FormatFlags::IS_SIGNED_INTEGER
        };
        if is_big_endian {
            flags |= FormatFlags::IS_BIG_ENDIAN;
        }
        flags |= if valid_bits_per_channel == total_bits_per_channel {
            FormatFlags::IS_PACKED
        } else {
            FormatFlags::IS_ALIGNED_HIGH
        };
        if is_non_interleaved {
            flags |= FormatFlags::IS_NON_INTERLEAVED;
        }

        let bytes_per_frame =
            (if is_non_interleaved { 1 } else { channels_per_frame }) * (total_bits_per_channel / 8);

        Self {
            sample_rate,
            format_id: FormatId::LINEAR_PCM,
            format_flags: flags,
            bytes_per_packet: bytes_per_frame,
            frames_per_packet: 1,
            bytes_per_frame,
            channels_per_frame,
            bits_per_channel: valid_bits_per_channel,
            reserved: 0,
        }
    }

    /// Native-endian packed PCM in one of the common processing formats.
    pub fn from_common_format(
        format: CommonPcmFormat,
        sample_rate: f64,
        channels_per_frame: u32,
        interleaved: bool,
    ) -> Self {
        let bits = format.bits_per_channel();
        Self::linear_pcm(
            sample_rate,
            channels_per_frame,
            bits,
            bits,
            format.is_float(),
            cfg!(target_endian = "big"),
            !interleaved,
        )
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn is_interleaved(&self) -> bool {
        !self.format_flags.contains(FormatFlags::IS_NON_INTERLEAVED)
    }

    #[inline]
    pub fn is_non_interleaved(&self) -> bool {
        !self.is_interleaved()
    }

    /// Channels sharing each buffer: all of them when interleaved, else one.
    #[inline]
    pub fn interleaved_channel_count(&self) -> u32 {
        if self.is_interleaved() {
            self.channels_per_frame
        } else {
            1
        }
    }

    /// Number of buffers needed to carry the stream.
    #[inline]
    pub fn channel_stream_count(&self) -> u32 {
        if self.is_interleaved() {
            1
        } else {
            self.channels_per_frame
        }
    }

    #[inline]
    pub fn channel_count(&self) -> u32 {
        self.channels_per_frame
    }

    #[inline]
    pub fn is_pcm(&self) -> bool {
        self.format_id == FormatId::LINEAR_PCM
    }

    #[inline]
    pub fn is_big_endian(&self) -> bool {
        self.format_flags.contains(FormatFlags::IS_BIG_ENDIAN)
    }

    #[inline]
    pub fn is_little_endian(&self) -> bool {
        !self.is_big_endian()
    }

    #[inline]
    pub fn is_native_endian(&self) -> bool {
        (self.format_flags & FormatFlags::IS_BIG_ENDIAN) == FormatFlags::NATIVE_ENDIAN
    }

    #[inline]
    pub fn is_float(&self) -> bool {
        self.is_pcm() && self.format_flags.contains(FormatFlags::IS_FLOAT)
    }

    #[inline]
    pub fn is_integer(&self) -> bool {
        self.is_pcm() && !self.format_flags.contains(FormatFlags::IS_FLOAT)
    }

    #[inline]
    pub fn is_signed_integer(&self) -> bool {
        self.is_pcm() && self.format_flags.contains(FormatFlags::IS_SIGNED_INTEGER)
    }

    #[inline]
    pub fn is_packed(&self) -> bool {
        self.format_flags.contains(FormatFlags::IS_PACKED)
    }

    #[inline]
    pub fn is_aligned_high(&self) -> bool {
        self.format_flags.contains(FormatFlags::IS_ALIGNED_HIGH)
    }

    #[inline]
    pub fn is_non_mixable(&self) -> bool {
        self.format_flags.contains(FormatFlags::IS_NON_MIXABLE)
    }

    #[inline]
    pub fn is_mixable(&self) -> bool {
        self.is_pcm() && !self.is_non_mixable()
    }

    /// Native-endian packed 32-bit float, interleaved or not.
    pub fn is_canonical(&self) -> bool {
        self.is_pcm()
            && (self.format_flags & !FormatFlags::IS_NON_INTERLEAVED) == FormatFlags::CANONICAL
            && self.bits_per_channel == 32
            && self.sample_word_size() == 4
    }

    /// The common format this description is exactly equivalent to, if any.
    pub fn common_format(&self) -> Option<CommonPcmFormat> {
        if !self.is_pcm() || self.channels_per_frame == 0 {
            return None;
        }
        [
            CommonPcmFormat::Float32,
            CommonPcmFormat::Float64,
            CommonPcmFormat::Int16,
            CommonPcmFormat::Int32,
        ]
        .into_iter()
        .find(|&format| {
            let candidate = Self::from_common_format(
                format,
                self.sample_rate,
                self.channels_per_frame,
                self.is_interleaved(),
            );
            candidate == *self
        })
    }

    /// Bytes per sample in each buffer, 0 when there are no channels.
    pub fn sample_word_size(&self) -> u32 {
        match self.interleaved_channel_count() {
            0 => 0,
            n => self.bytes_per_frame / n,
        }
    }

    /// Byte size of `frame_count` frames, `None` when it exceeds `u32`.
    #[inline]
    pub fn frame_count_to_byte_size(&self, frame_count: u32) -> Option<u32> {
        frame_count.checked_mul(self.bytes_per_frame)
    }

    #[inline]
    pub fn byte_size_to_frame_count(&self, byte_size: u32) -> u32 {
        match self.bytes_per_frame {
            0 => 0,
            n => byte_size / n,
        }
    }

    /// Duration of one packet in seconds, 0 for an unset sample rate.
    pub fn packet_duration(&self) -> f64 {
        if self.sample_rate == 0.0 {
            0.0
        } else {
            self.frames_per_packet as f64 / self.sample_rate
        }
    }

    fn ensure_pcm(&self) -> Result<(), FormatError> {
        if self.is_pcm() {
            Ok(())
        } else {
            Err(FormatError::NotPcm(fourcc_string(self.format_id.0)))
        }
    }

    pub fn non_interleaved_equivalent(&self) -> Result<Self, FormatError> {
        self.ensure_pcm()?;
        let mut format = *self;
        if self.is_interleaved() && self.channels_per_frame > 0 {
            format.format_flags.insert(FormatFlags::IS_NON_INTERLEAVED);
            format.bytes_per_packet /= self.channels_per_frame;
            format.bytes_per_frame /= self.channels_per_frame;
        }
        Ok(format)
    }

    pub fn interleaved_equivalent(&self) -> Result<Self, FormatError> {
        self.ensure_pcm()?;
        let mut format = *self;
        if !self.is_interleaved() {
            format.format_flags.remove(FormatFlags::IS_NON_INTERLEAVED);
            format.bytes_per_packet *= self.channels_per_frame;
            format.bytes_per_frame *= self.channels_per_frame;
        }
        Ok(format)
    }

    /// Deinterleaved native float32 at the same sample rate and channel count.
    pub fn standard_equivalent(&self) -> Result<Self, FormatError> {
        self.ensure_pcm()?;
        Ok(Self::from_common_format(
            CommonPcmFormat::Float32,
            self.sample_rate,
            self.channels_per_frame,
            false,
        ))
    }

    /// Human readable description, optionally prefixed.
    pub fn description(&self, prefix: &str) -> String {
        let mut s = String::from(prefix);
        s.push_str(&format!(
            "{} ch, {:.2} Hz, {} (0x{:08x}) ",
            self.channels_per_frame,
            self.sample_rate,
            quoted_format_id(self.format_id),
            self.format_flags.bits()
        ));

        if self.is_pcm() {
            let fractional_bits = self.format_flags.sample_fraction_bits();
            if fractional_bits > 0 {
                s.push_str(&format!(
                    "{}.{}-bit",
                    self.bits_per_channel.wrapping_sub(fractional_bits),
                    fractional_bits
                ));
            } else {
                s.push_str(&format!("{}-bit", self.bits_per_channel));
            }

            let sample_size = self.sample_word_size();
            if sample_size > 1 {
                s.push_str(if self.is_big_endian() {
                    " big-endian"
                } else {
                    " little-endian"
                });
            }

            let is_integer = !self.format_flags.contains(FormatFlags::IS_FLOAT);
            if is_integer {
                s.push_str(if self.is_signed_integer() {
                    " signed"
                } else {
                    " unsigned"
                });
            }
            s.push_str(if is_integer { " integer" } else { " float" });

            let unusual_width = sample_size > 0 && (sample_size << 3) != self.bits_per_channel;
            if unusual_width {
                s.push_str(&format!(
                    ", {} in {} bytes",
                    if self.is_packed() { "packed" } else { "unpacked" },
                    sample_size
                ));
            }
            if unusual_width || self.bits_per_channel & 7 != 0 {
                s.push_str(if self.is_aligned_high() {
                    " high-aligned"
                } else {
                    " low-aligned"
                });
            }

            if !self.is_interleaved() {
                s.push_str(", deinterleaved");
            }
        } else if self.format_id == FormatId::APPLE_LOSSLESS {
            let source_bit_depth = match self.format_flags {
                FormatFlags::APPLE_LOSSLESS_16_BIT_SOURCE => Some(16),
                FormatFlags::APPLE_LOSSLESS_20_BIT_SOURCE => Some(20),
                FormatFlags::APPLE_LOSSLESS_24_BIT_SOURCE => Some(24),
                FormatFlags::APPLE_LOSSLESS_32_BIT_SOURCE => Some(32),
                _ => None,
            };
            match source_bit_depth {
                Some(depth) => s.push_str(&format!("from {depth}-bit source, ")),
                None => s.push_str("from UNKNOWN source bit depth, "),
            }
            s.push_str(&format!("{} frames/packet", self.frames_per_packet));
        } else {
            s.push_str(&format!(
                "{} bits/channel, {} bytes/packet, {} frames/packet, {} bytes/frame",
                self.bits_per_channel,
                self.bytes_per_packet,
                self.frames_per_packet,
                self.bytes_per_frame
            ));
        }

        s
    }

    /// Decodes the host structure from exactly [`Self::NATIVE_SIZE`] bytes.
    pub fn from_ne_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() != Self::NATIVE_SIZE {
            return Err(FormatError::InvalidSize {
                expected: Self::NATIVE_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self::from_ne_slice(bytes))
    }

    /// Reads one host structure from `stream`.
    pub fn read_ne<S: AsRef<[u8]>>(stream: &mut ByteStream<S>) -> Result<Self, ByteStreamError> {
        stream.read_slice(Self::NATIVE_SIZE).map(Self::from_ne_slice)
    }

    fn from_ne_slice(bytes: &[u8]) -> Self {
        let word = |i: usize| u32::from_ne_slice(&bytes[8 + 4 * i..]);
        Self {
            sample_rate: f64::from_ne_slice(bytes),
            format_id: FormatId(word(0)),
            format_flags: FormatFlags(word(1)),
            bytes_per_packet: word(2),
            frames_per_packet: word(3),
            bytes_per_frame: word(4),
            channels_per_frame: word(5),
            bits_per_channel: word(6),
            reserved: word(7),
        }
    }

    pub fn to_ne_bytes(&self) -> [u8; Self::NATIVE_SIZE] {
        let mut out = [0u8; Self::NATIVE_SIZE];
        self.sample_rate.put_ne(&mut out);
        let words = [
            self.format_id.0,
            self.format_flags.0,
            self.bytes_per_packet,
            self.frames_per_packet,
            self.bytes_per_frame,
            self.channels_per_frame,
            self.bits_per_channel,
            self.reserved,
        ];
        for (i, word) in words.into_iter().enumerate() {
            word.put_ne(&mut out[8 + 4 * i..]);
        }
        out
    }
}

fn quoted_format_id(id: FormatId) -> String {
    // The classic description always quotes the code, printable or not.
    let bytes = id.0.to_be_bytes();
    let chars: String = bytes
        .iter()
        .map(|&b| if (0x20..=0x7E).contains(&b) { b as char } else { '?' })
        .collect();
    format!("'{chars}'")
}

impl fmt::Display for StreamDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description(""))
    }
}

/// Inclusive range of values, the host `AudioValueRange`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ValueRange {
    pub minimum: f64,
    pub maximum: f64,
}

impl ValueRange {
    pub const NATIVE_SIZE: usize = 16;

    pub fn new(minimum: f64, maximum: f64) -> Self {
        Self { minimum, maximum }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.minimum <= value && value <= self.maximum
    }

    pub fn read_ne<S: AsRef<[u8]>>(stream: &mut ByteStream<S>) -> Result<Self, ByteStreamError> {
        let bytes = stream.read_slice(Self::NATIVE_SIZE)?;
        Ok(Self {
            minimum: f64::from_ne_slice(bytes),
            maximum: f64::from_ne_slice(&bytes[8..]),
        })
    }

    pub fn to_ne_bytes(&self) -> [u8; Self::NATIVE_SIZE] {
        let mut out = [0u8; Self::NATIVE_SIZE];
        self.minimum.put_ne(&mut out);
        self.maximum.put_ne(&mut out[8..]);
        out
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.minimum == self.maximum {
            write!(f, "{:.2}", self.minimum)
        } else {
            write!(f, "[{:.2}, {:.2}]", self.minimum, self.maximum)
        }
    }
}

/// A stream format paired with the sample rates it supports, the host
/// `AudioStreamRangedDescription`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamRangedDescription {
    pub format: StreamDescription,
    pub sample_rate_range: ValueRange,
}

impl StreamRangedDescription {
    pub const NATIVE_SIZE: usize = StreamDescription::NATIVE_SIZE + ValueRange::NATIVE_SIZE;

    pub fn read_ne<S: AsRef<[u8]>>(stream: &mut ByteStream<S>) -> Result<Self, ByteStreamError> {
        let start = stream.position();
        let format = StreamDescription::read_ne(stream)?;
        match ValueRange::read_ne(stream) {
            Ok(sample_rate_range) => Ok(Self {
                format,
                sample_rate_range,
            }),
            Err(e) => {
                stream.set_position(start)?;
                Err(e)
            }
        }
    }

    pub fn to_ne_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::NATIVE_SIZE);
        out.extend_from_slice(&self.format.to_ne_bytes());
        out.extend_from_slice(&self.sample_rate_range.to_ne_bytes());
        out
    }

    pub fn supports_sample_rate(&self, sample_rate: f64) -> bool {
        self.sample_rate_range.contains(sample_rate)
    }
}

impl fmt::Display for StreamRangedDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (rates {})", self.format, self.sample_rate_range)
    }
}
