//! Value types describing audio data: stream formats, channel layouts and
//! timestamps.

pub mod channel_layout;
pub mod stream_description;
pub mod timestamp;

pub use channel_layout::{
    ChannelBitmap, ChannelDescription, ChannelLabel, ChannelLayout, ChannelLayoutTag,
};
pub use stream_description::{
    CommonPcmFormat, FormatFlags, FormatId, StreamDescription, StreamRangedDescription,
    ValueRange,
};
pub use timestamp::{AudioTimeStamp, TimeStampFlags};
