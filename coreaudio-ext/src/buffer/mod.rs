//! Owned audio buffers and lock-free ring buffers.

pub mod audio_ring_buffer;
pub mod buffer_list;
pub mod ring_buffer;

pub use audio_ring_buffer::{AudioRingBuffer, AudioRingConsumer, AudioRingProducer};
pub use buffer_list::{AudioBuffer, AudioBufferList};
pub use ring_buffer::{RingBuffer, RingConsumer, RingProducer};
