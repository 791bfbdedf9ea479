use std::cell::UnsafeCell;
use std::ptr;
use std::sync::Arc;

use log::trace;

use crate::buffer::buffer_list::AudioBufferList;
use crate::buffer::ring_buffer::RingIndices;
use crate::format::stream_description::StreamDescription;
use crate::utils::errors::RingBufferError;

struct Shared {
    format: StreamDescription,
    indices: RingIndices,
    // One ring per channel stream, `capacity * bytes_per_frame` bytes each
    streams: Box<[Box<[UnsafeCell<u8>]>]>,
}

// Same discipline as the byte ring: disjoint regions per side.
unsafe impl Sync for Shared {}

impl Shared {
    #[inline]
    fn bytes_per_frame(&self) -> usize {
        self.format.bytes_per_frame as usize
    }

    #[inline]
    fn stream_base(&self, index: usize) -> *mut u8 {
        UnsafeCell::raw_get(self.streams[index].as_ptr())
    }

    fn store(&self, start: usize, list: &AudioBufferList, frames: usize) {
        let bpf = self.bytes_per_frame();
        let (first, second) = self.indices.regions(start, frames);
        for (index, buffer) in list.buffers().iter().enumerate() {
            let src = buffer.data();
            let base = self.stream_base(index);
            // SAFETY: regions are within the ring and owned by the producer
            unsafe {
                ptr::copy_nonoverlapping(src.as_ptr(), base.add(first.start * bpf), first.len() * bpf);
                ptr::copy_nonoverlapping(
                    src.as_ptr().add(first.len() * bpf),
                    base,
                    second.len() * bpf,
                );
            }
        }
    }

    fn fetch(&self, start: usize, list: &mut AudioBufferList, frames: usize) {
        let bpf = self.bytes_per_frame();
        let (first, second) = self.indices.regions(start, frames);
        for index in 0..self.streams.len() {
            let base = self.stream_base(index);
            let dst = list.buffers_mut()[index].data_mut();
            // SAFETY: regions are within the ring and hold readable frames
            unsafe {
                ptr::copy_nonoverlapping(base.add(first.start * bpf), dst.as_mut_ptr(), first.len() * bpf);
                ptr::copy_nonoverlapping(
                    base,
                    dst.as_mut_ptr().add(first.len() * bpf),
                    second.len() * bpf,
                );
            }
        }
    }
}

/// Frame-oriented SPSC ring buffer of linear PCM audio.
pub struct AudioRingBuffer;

impl AudioRingBuffer {
    /// Allocates room for `capacity_frames` frames (rounded up to a power of
    /// two, one frame kept free) of audio in `format`.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(
        format: StreamDescription,
        capacity_frames: usize,
    ) -> Result<(AudioRingProducer, AudioRingConsumer), RingBufferError> {
        if !format.is_pcm() || format.bytes_per_frame == 0 {
            return Err(RingBufferError::UnsupportedFormat);
        }
        let indices = RingIndices::new(capacity_frames)?;
        let stream_size = indices.capacity() * format.bytes_per_frame as usize;
        let stream_count = format.channel_stream_count() as usize;
        trace!(
            "Allocating audio ring buffer: {} frames, {stream_count} x {stream_size} bytes",
            indices.capacity()
        );

        let streams = (0..stream_count)
            .map(|_| (0..stream_size).map(|_| UnsafeCell::new(0)).collect())
            .collect();
        let shared = Arc::new(Shared {
            format,
            indices,
            streams,
        });

        Ok((
            AudioRingProducer {
                shared: Arc::clone(&shared),
            },
            AudioRingConsumer { shared },
        ))
    }
}

pub struct AudioRingProducer {
    shared: Arc<Shared>,
}

impl AudioRingProducer {
    pub fn format(&self) -> &StreamDescription {
        &self.shared.format
    }

    #[inline]
    pub fn capacity_frames(&self) -> usize {
        self.shared.indices.capacity()
    }

    #[inline]
    pub fn frames_available_to_write(&self) -> usize {
        self.shared.indices.available_to_write()
    }

    /// Writes the valid frames of `list`, or as many as fit.
    ///
    /// Returns the number of frames written.
    pub fn write(&mut self, list: &AudioBufferList) -> Result<usize, RingBufferError> {
        if list.format() != &self.shared.format {
            return Err(RingBufferError::FormatMismatch);
        }

        let frames = self
            .frames_available_to_write()
            .min(list.frame_length() as usize);
        if frames == 0 {
            return Ok(0);
        }

        self.shared
            .store(self.shared.indices.write_position(), list, frames);
        self.shared.indices.advance_write(frames);
        Ok(frames)
    }
}

pub struct AudioRingConsumer {
    shared: Arc<Shared>,
}

impl AudioRingConsumer {
    pub fn format(&self) -> &StreamDescription {
        &self.shared.format
    }

    #[inline]
    pub fn capacity_frames(&self) -> usize {
        self.shared.indices.capacity()
    }

    #[inline]
    pub fn frames_available_to_read(&self) -> usize {
        self.shared.indices.available_to_read()
    }

    /// Reads up to `frame_count` frames into `list`, replacing its contents.
    ///
    /// The frame length of `list` is set to the number of frames read.
    pub fn read(
        &mut self,
        list: &mut AudioBufferList,
        frame_count: usize,
    ) -> Result<usize, RingBufferError> {
        if list.format() != &self.shared.format {
            return Err(RingBufferError::FormatMismatch);
        }

        let frames = self
            .frames_available_to_read()
            .min(frame_count)
            .min(list.frame_capacity() as usize);
        if frames > 0 {
            self.shared
                .fetch(self.shared.indices.read_position(), list, frames);
            self.shared.indices.advance_read(frames);
        }
        // Bounded by the list capacity above
        let _ = list.set_frame_length(frames as u32);

        Ok(frames)
    }

    pub fn drain(&mut self) {
        let available = self.frames_available_to_read();
        self.shared.indices.advance_read(available);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::stream_description::CommonPcmFormat;

    fn stereo_float() -> StreamDescription {
        StreamDescription::from_common_format(CommonPcmFormat::Float32, 48000.0, 2, false)
    }

    fn ramp(format: StreamDescription, start: u32, frames: u32) -> AudioBufferList {
        let mut list = AudioBufferList::new(format, frames).unwrap();
        list.set_frame_length(frames).unwrap();
        for (channel, buffer) in list.buffers_mut().iter_mut().enumerate() {
            for (i, chunk) in buffer.data_mut().chunks_exact_mut(4).enumerate() {
                let value = (start + i as u32) as f32 + channel as f32 * 1000.0;
                chunk.copy_from_slice(&value.to_ne_bytes());
            }
        }
        list
    }

    fn channel(list: &AudioBufferList, index: usize) -> Vec<f32> {
        list.buffer(index)
            .unwrap()
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn rejects_unsupported_formats() {
        let mut aac = stereo_float();
        aac.format_id = crate::format::FormatId::MPEG4_AAC;
        assert_eq!(
            AudioRingBuffer::new(aac, 64).err(),
            Some(RingBufferError::UnsupportedFormat)
        );
        assert_eq!(
            AudioRingBuffer::new(stereo_float(), 0).err(),
            Some(RingBufferError::InvalidCapacity(0))
        );
    }

    #[test]
    fn frames_wrap_per_channel() {
        let format = stereo_float();
        let (mut producer, mut consumer) = AudioRingBuffer::new(format, 8).unwrap();
        assert_eq!(producer.capacity_frames(), 8);
        assert_eq!(producer.frames_available_to_write(), 7);

        assert_eq!(producer.write(&ramp(format, 0, 5)).unwrap(), 5);
        let mut out = AudioBufferList::new(format, 8).unwrap();
        assert_eq!(consumer.read(&mut out, 3).unwrap(), 3);
        assert_eq!(channel(&out, 0), vec![0.0, 1.0, 2.0]);

        // 2 frames left, 5 more fit and wrap around the end
        assert_eq!(producer.write(&ramp(format, 5, 6)).unwrap(), 5);
        assert_eq!(consumer.frames_available_to_read(), 7);
        assert_eq!(consumer.read(&mut out, 8).unwrap(), 7);
        assert_eq!(out.frame_length(), 7);
        assert_eq!(channel(&out, 0), vec![3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(channel(&out, 1)[0], 1003.0);

        assert_eq!(consumer.read(&mut out, 4).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn format_must_match() {
        let (mut producer, mut consumer) = AudioRingBuffer::new(stereo_float(), 16).unwrap();
        let mono = StreamDescription::from_common_format(CommonPcmFormat::Float32, 48000.0, 1, false);
        assert_eq!(
            producer.write(&ramp(mono, 0, 2)),
            Err(RingBufferError::FormatMismatch)
        );
        let mut out = AudioBufferList::new(mono, 4).unwrap();
        assert_eq!(
            consumer.read(&mut out, 4),
            Err(RingBufferError::FormatMismatch)
        );
        consumer.drain();
    }

    #[test]
    fn interleaved_storage() {
        let format = StreamDescription::from_common_format(CommonPcmFormat::Int16, 44100.0, 2, true);
        let (mut producer, mut consumer) = AudioRingBuffer::new(format, 4).unwrap();
        let mut list = AudioBufferList::new(format, 2).unwrap();
        list.set_frame_length(2).unwrap();
        list.buffer_mut(0).unwrap().copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);

        assert_eq!(producer.write(&list).unwrap(), 2);
        let mut out = AudioBufferList::new(format, 4).unwrap();
        assert_eq!(consumer.read(&mut out, 4).unwrap(), 2);
        assert_eq!(out.buffer(0), Some(&[1u8, 2, 3, 4, 5, 6, 7, 8][..]));
    }
}
