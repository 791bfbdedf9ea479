use crate::utils::fourcc::osstatus_string;

#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err.into());
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ByteStreamError {
    #[error("Read of {requested} bytes at position {position} exceeds remaining {remaining}")]
    OutOfBounds {
        requested: usize,
        remaining: usize,
        position: usize,
    },

    #[error("Seek to {target} is outside the stream bounds [0, {length}]")]
    SeekOutOfRange { target: i128, length: usize },

    #[error("Write of {requested} bytes at position {position} exceeds fixed length {length}")]
    CapacityExceeded {
        requested: usize,
        position: usize,
        length: usize,
    },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Format {0} is not linear PCM")]
    NotPcm(String),

    #[error("Format has zero bytes per frame")]
    ZeroBytesPerFrame,

    #[error("Unsupported common PCM format: {0}")]
    UnknownCommonFormat(String),

    #[error("Stream description data must be {expected} bytes, got {actual}")]
    InvalidSize { expected: usize, actual: usize },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelLayoutError {
    #[error("Unknown channel label abbreviation: {0:?}")]
    UnknownLabel(String),

    #[error("Unknown channel layout tag name: {0:?}")]
    UnknownTagName(String),

    #[error("Channel layout tag {0:#010X} has no known channel assignment")]
    UnmappableTag(u32),

    #[error("Channel layout contains no channels")]
    Empty,

    #[error("Channel layout declares {declared} descriptions but only {available} bytes remain")]
    Truncated { declared: u32, available: usize },

    #[error(transparent)]
    Stream(#[from] ByteStreamError),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferListError {
    #[error("Format has zero bytes per frame")]
    ZeroBytesPerFrame,

    #[error("Frame capacity {capacity} with {bytes_per_frame} bytes per frame overflows u32")]
    CapacityOverflow { capacity: u32, bytes_per_frame: u32 },

    #[error("Frame length {length} exceeds capacity {capacity}")]
    LengthExceedsCapacity { length: u32, capacity: u32 },

    #[error("Buffer {index} holds {actual} bytes, buffer 0 holds {expected}")]
    InconsistentBufferSizes {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Expected {expected} buffers for this format, got {actual}")]
    BufferCountMismatch { expected: usize, actual: usize },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RingBufferError {
    #[error("Ring buffer capacity must be between 2 and 0x80000000, got {0}")]
    InvalidCapacity(u64),

    #[error("Audio ring buffer requires linear PCM with a nonzero frame size")]
    UnsupportedFormat,

    #[error("Buffer list format does not match the ring buffer format")]
    FormatMismatch,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioObjectError {
    #[error("{operation} failed: {} ({})", osstatus_string(*.status), hal_status_name(*.status))]
    Status { operation: &'static str, status: i32 },

    #[error("Property {0} is not present on object {1}")]
    UnknownProperty(String, u32),

    #[error("Property {property} returned {actual} bytes, expected {expected}")]
    BadPropertySize {
        property: String,
        expected: usize,
        actual: usize,
    },

    #[error("No audio device with UID {0:?}")]
    NoDeviceForUid(String),

    #[error("Property {0} is not a string property")]
    NotAString(String),

    #[error("The audio object backend is not available on this platform")]
    Unavailable,

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Stream(#[from] ByteStreamError),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CafError {
    #[error("Not a CAF file: missing 'caff' signature")]
    MissingSignature,

    #[error("Unsupported CAF file version {0}")]
    UnsupportedVersion(u16),

    #[error("CAF file has no 'desc' chunk before its audio data")]
    MissingDescription,

    #[error("Chunk {chunk} declares {declared} bytes but {available} remain")]
    TruncatedChunk {
        chunk: String,
        declared: u64,
        available: usize,
    },

    #[error("Unknown chunk {0} skipped")]
    UnknownChunk(String),

    #[error(
        "Channel layout has {layout} channels but the stream description has {format}"
    )]
    ChannelCountMismatch { layout: usize, format: u32 },

    #[error("Audio data size {0} does not fit in a CAF data chunk")]
    DataSizeTooLarge(u64),

    #[error(transparent)]
    Stream(#[from] ByteStreamError),

    #[error(transparent)]
    Layout(#[from] ChannelLayoutError),
}

// HAL status codes (AudioHardwareBase.h), all four-character codes
pub const HARDWARE_NOT_RUNNING: i32 = fourcc_i32(b"stop");
pub const HARDWARE_UNSPECIFIED: i32 = fourcc_i32(b"what");
pub const HARDWARE_UNKNOWN_PROPERTY: i32 = fourcc_i32(b"who?");
pub const HARDWARE_BAD_PROPERTY_SIZE: i32 = fourcc_i32(b"!siz");
pub const HARDWARE_ILLEGAL_OPERATION: i32 = fourcc_i32(b"nope");
pub const HARDWARE_BAD_OBJECT: i32 = fourcc_i32(b"!obj");
pub const HARDWARE_BAD_DEVICE: i32 = fourcc_i32(b"!dev");
pub const HARDWARE_BAD_STREAM: i32 = fourcc_i32(b"!str");
pub const HARDWARE_UNSUPPORTED_OPERATION: i32 = fourcc_i32(b"unop");
pub const DEVICE_UNSUPPORTED_FORMAT: i32 = fourcc_i32(b"!dat");
pub const DEVICE_PERMISSIONS: i32 = fourcc_i32(b"!hog");
// CoreAudioBaseTypes.h
pub const AUDIO_UNIMPLEMENTED: i32 = -4;
pub const AUDIO_PARAM: i32 = -50;
pub const AUDIO_MEM_FULL: i32 = -108;

const fn fourcc_i32(code: &[u8; 4]) -> i32 {
    u32::from_be_bytes(*code) as i32
}

/// Symbolic name of a HAL or general Core Audio status code.
pub fn hal_status_name(status: i32) -> &'static str {
    match status {
        0 => "no error",
        HARDWARE_NOT_RUNNING => "hardware not running",
        HARDWARE_UNSPECIFIED => "unspecified hardware error",
        HARDWARE_UNKNOWN_PROPERTY => "unknown property",
        HARDWARE_BAD_PROPERTY_SIZE => "bad property size",
        HARDWARE_ILLEGAL_OPERATION => "illegal operation",
        HARDWARE_BAD_OBJECT => "bad object",
        HARDWARE_BAD_DEVICE => "bad device",
        HARDWARE_BAD_STREAM => "bad stream",
        HARDWARE_UNSUPPORTED_OPERATION => "unsupported operation",
        DEVICE_UNSUPPORTED_FORMAT => "unsupported format",
        DEVICE_PERMISSIONS => "device permissions error",
        AUDIO_UNIMPLEMENTED => "unimplemented",
        AUDIO_PARAM => "parameter error",
        AUDIO_MEM_FULL => "memory full",
        _ => "unrecognized status",
    }
}
