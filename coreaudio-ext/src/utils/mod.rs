//! Utility functions and supporting infrastructure.
//!
//! Provides the byte-stream cursor, byte order traits, four-character code
//! formatting and the error types shared by every module.

pub mod byte_stream;
pub mod byteorder;
pub mod errors;
pub mod fourcc;
