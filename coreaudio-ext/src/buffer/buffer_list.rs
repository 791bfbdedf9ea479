use log::trace;

use crate::format::stream_description::StreamDescription;
use crate::utils::errors::BufferListError;

/// One buffer of a buffer list: a single channel stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    pub number_channels: u32,
    data: Box<[u8]>,
}

impl AudioBuffer {
    /// Full backing storage, valid frames or not.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Owned audio buffer list with a fixed frame capacity.
///
/// Holds one [`AudioBuffer`] per channel stream of its format. All buffers
/// share the same frame length, which never exceeds the capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBufferList {
    format: StreamDescription,
    frame_capacity: u32,
    frame_length: u32,
    buffers: Vec<AudioBuffer>,
}

impl AudioBufferList {
    pub fn new(format: StreamDescription, frame_capacity: u32) -> Result<Self, BufferListError> {
        if format.bytes_per_frame == 0 {
            return Err(BufferListError::ZeroBytesPerFrame);
        }
        let buffer_size = frame_capacity.checked_mul(format.bytes_per_frame).ok_or(
            BufferListError::CapacityOverflow {
                capacity: frame_capacity,
                bytes_per_frame: format.bytes_per_frame,
            },
        )?;

        let buffer_count = format.channel_stream_count() as usize;
        trace!(
            "Allocating {buffer_count} buffers of {buffer_size} bytes for {frame_capacity} frames"
        );
        let buffers = (0..buffer_count)
            .map(|_| AudioBuffer {
                number_channels: format.interleaved_channel_count(),
                data: vec![0u8; buffer_size as usize].into_boxed_slice(),
            })
            .collect();

        Ok(Self {
            format,
            frame_capacity,
            frame_length: 0,
            buffers,
        })
    }

    /// Adopts existing channel stream buffers, inferring the frame length
    /// from their (equal) sizes.
    pub fn from_buffers(
        format: StreamDescription,
        buffers: Vec<Vec<u8>>,
    ) -> Result<Self, BufferListError> {
        if format.bytes_per_frame == 0 {
            return Err(BufferListError::ZeroBytesPerFrame);
        }
        let expected = format.channel_stream_count() as usize;
        if buffers.len() != expected {
            return Err(BufferListError::BufferCountMismatch {
                expected,
                actual: buffers.len(),
            });
        }

        let first = buffers.first().map_or(0, Vec::len);
        if let Some((index, buffer)) = buffers.iter().enumerate().find(|(_, b)| b.len() != first) {
            return Err(BufferListError::InconsistentBufferSizes {
                index,
                expected: first,
                actual: buffer.len(),
            });
        }

        let frames = u32::try_from(first / format.bytes_per_frame as usize).map_err(|_| {
            BufferListError::CapacityOverflow {
                capacity: u32::MAX,
                bytes_per_frame: format.bytes_per_frame,
            }
        })?;
        let buffers = buffers
            .into_iter()
            .map(|data| AudioBuffer {
                number_channels: format.interleaved_channel_count(),
                data: data.into_boxed_slice(),
            })
            .collect();

        Ok(Self {
            format,
            frame_capacity: frames,
            frame_length: frames,
            buffers,
        })
    }

    #[inline]
    pub fn format(&self) -> &StreamDescription {
        &self.format
    }

    #[inline]
    pub fn frame_capacity(&self) -> u32 {
        self.frame_capacity
    }

    #[inline]
    pub fn frame_length(&self) -> u32 {
        self.frame_length
    }

    pub fn set_frame_length(&mut self, frame_length: u32) -> Result<(), BufferListError> {
        if frame_length > self.frame_capacity {
            return Err(BufferListError::LengthExceedsCapacity {
                length: frame_length,
                capacity: self.frame_capacity,
            });
        }
        self.frame_length = frame_length;
        Ok(())
    }

    #[inline]
    pub fn frames_available(&self) -> u32 {
        self.frame_capacity - self.frame_length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frame_length == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.frame_length == self.frame_capacity
    }

    /// Sets the frame length to 0 without touching the audio.
    pub fn reset(&mut self) {
        self.frame_length = 0;
    }

    /// Zeroes the audio and sets the frame length to 0.
    pub fn clear(&mut self) {
        for buffer in &mut self.buffers {
            buffer.data.fill(0);
        }
        self.frame_length = 0;
    }

    #[inline]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn buffers(&self) -> &[AudioBuffer] {
        &self.buffers
    }

    pub fn buffers_mut(&mut self) -> &mut [AudioBuffer] {
        &mut self.buffers
    }

    /// Valid bytes of buffer `index`.
    pub fn buffer(&self, index: usize) -> Option<&[u8]> {
        let len = self.byte_length();
        self.buffers.get(index).map(|b| &b.data[..len])
    }

    /// Valid bytes of buffer `index`, mutably.
    pub fn buffer_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        let len = self.byte_length();
        self.buffers.get_mut(index).map(|b| &mut b.data[..len])
    }

    #[inline]
    fn byte_length(&self) -> usize {
        self.frame_length as usize * self.format.bytes_per_frame as usize
    }

    #[inline]
    fn byte_offset(&self, frames: u32) -> usize {
        frames as usize * self.format.bytes_per_frame as usize
    }

    /// Copies up to `frame_length` frames starting at `read_offset` in `other`
    /// into this list at `write_offset`, shifting later frames back.
    ///
    /// Returns the number of frames inserted, 0 when the formats differ or an
    /// offset lies past the end of its list.
    pub fn insert_from(
        &mut self,
        other: &AudioBufferList,
        read_offset: u32,
        frame_length: u32,
        write_offset: u32,
    ) -> u32 {
        if self.format != other.format {
            return 0;
        }
        if read_offset > other.frame_length
            || write_offset > self.frame_length
            || frame_length == 0
            || other.frame_length == 0
        {
            return 0;
        }

        let frames_to_insert = self
            .frames_available()
            .min(frame_length.min(other.frame_length - read_offset));
        if frames_to_insert == 0 {
            return 0;
        }

        self.open_gap(write_offset, frames_to_insert);

        let dst = self.byte_offset(write_offset);
        let src = other.byte_offset(read_offset);
        let count = self.byte_offset(frames_to_insert);
        for (to, from) in self.buffers.iter_mut().zip(&other.buffers) {
            to.data[dst..dst + count].copy_from_slice(&from.data[src..src + count]);
        }
        self.frame_length += frames_to_insert;

        frames_to_insert
    }

    /// Appends as much of `other` as fits.
    pub fn append_from(&mut self, other: &AudioBufferList) -> u32 {
        let end = self.frame_length;
        self.insert_from(other, 0, other.frame_length, end)
    }

    /// Removes up to `frame_length` frames at `offset`, returning the number
    /// removed.
    pub fn trim_at_offset(&mut self, offset: u32, frame_length: u32) -> u32 {
        if offset > self.frame_length || frame_length == 0 {
            return 0;
        }

        let frames_to_trim = frame_length.min(self.frame_length - offset);
        let move_from = self.byte_offset(offset + frames_to_trim);
        let end = self.byte_length();
        let dst = self.byte_offset(offset);
        if move_from < end {
            for buffer in &mut self.buffers {
                buffer.data.copy_within(move_from..end, dst);
            }
        }
        self.frame_length -= frames_to_trim;

        frames_to_trim
    }

    /// Inserts up to `frame_length` frames of silence at `offset`.
    ///
    /// Only float and signed integer samples have an all-zero silence, so
    /// other formats insert nothing.
    pub fn insert_silence(&mut self, offset: u32, frame_length: u32) -> u32 {
        if !(self.format.is_float() || self.format.is_signed_integer()) {
            return 0;
        }
        if offset > self.frame_length || frame_length == 0 {
            return 0;
        }

        let frames_to_zero = self.frames_available().min(frame_length);
        if frames_to_zero == 0 {
            return 0;
        }

        self.open_gap(offset, frames_to_zero);

        let dst = self.byte_offset(offset);
        let count = self.byte_offset(frames_to_zero);
        for buffer in &mut self.buffers {
            buffer.data[dst..dst + count].fill(0);
        }
        self.frame_length += frames_to_zero;

        frames_to_zero
    }

    // Shifts frames at and after `offset` back by `frames`; capacity checked by callers
    fn open_gap(&mut self, offset: u32, frames: u32) {
        let src = self.byte_offset(offset);
        let end = self.byte_length();
        if src == end {
            return;
        }
        let dst = self.byte_offset(offset + frames);
        for buffer in &mut self.buffers {
            buffer.data.copy_within(src..end, dst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::stream_description::CommonPcmFormat;

    fn int16_mono() -> StreamDescription {
        StreamDescription::from_common_format(CommonPcmFormat::Int16, 44100.0, 1, true)
    }

    fn filled(frames: &[i16]) -> AudioBufferList {
        let mut list = AudioBufferList::new(int16_mono(), frames.len() as u32).unwrap();
        list.set_frame_length(frames.len() as u32).unwrap();
        let data = list.buffer_mut(0).unwrap();
        for (chunk, value) in data.chunks_exact_mut(2).zip(frames) {
            chunk.copy_from_slice(&value.to_ne_bytes());
        }
        list
    }

    fn samples(list: &AudioBufferList) -> Vec<i16> {
        list.buffer(0)
            .unwrap()
            .chunks_exact(2)
            .map(|c| i16::from_ne_bytes([c[0], c[1]]))
            .collect()
    }

    #[test]
    fn allocation_per_channel_stream() {
        let format = StreamDescription::from_common_format(CommonPcmFormat::Float32, 48000.0, 2, false);
        let list = AudioBufferList::new(format, 512).unwrap();
        assert_eq!(list.buffer_count(), 2);
        assert_eq!(list.frame_capacity(), 512);
        assert_eq!(list.frame_length(), 0);
        assert_eq!(list.buffers()[1].data().len(), 512 * 4);
        assert_eq!(list.buffers()[0].number_channels, 1);
        assert_eq!(list.buffer(0).map(<[u8]>::len), Some(0));
        assert!(list.buffer(2).is_none());

        let interleaved = AudioBufferList::new(format.interleaved_equivalent().unwrap(), 16).unwrap();
        assert_eq!(interleaved.buffer_count(), 1);
        assert_eq!(interleaved.buffers()[0].number_channels, 2);
    }

    #[test]
    fn rejects_bad_formats() {
        assert_eq!(
            AudioBufferList::new(StreamDescription::default(), 16),
            Err(BufferListError::ZeroBytesPerFrame)
        );
        let wide = StreamDescription::linear_pcm(44100.0, 8, 32, 32, true, false, false);
        assert!(matches!(
            AudioBufferList::new(wide, u32::MAX / 4),
            Err(BufferListError::CapacityOverflow { .. })
        ));
    }

    #[test]
    fn frame_length_bounded_by_capacity() {
        let mut list = AudioBufferList::new(int16_mono(), 8).unwrap();
        assert!(list.set_frame_length(8).is_ok());
        assert!(list.is_full());
        assert_eq!(
            list.set_frame_length(9),
            Err(BufferListError::LengthExceedsCapacity {
                length: 9,
                capacity: 8
            })
        );
        list.reset();
        assert!(list.is_empty());
    }

    #[test]
    fn insert_from_shifts_tail() {
        let mut dst = AudioBufferList::new(int16_mono(), 8).unwrap();
        dst.append_from(&filled(&[1, 2, 3]));
        let src = filled(&[10, 20, 30, 40]);

        assert_eq!(dst.insert_from(&src, 1, 2, 1), 2);
        assert_eq!(samples(&dst), vec![1, 20, 30, 2, 3]);

        // Limited by the remaining capacity
        assert_eq!(dst.insert_from(&src, 0, 4, 5), 3);
        assert_eq!(samples(&dst), vec![1, 20, 30, 2, 3, 10, 20, 30]);
        assert_eq!(dst.insert_from(&src, 0, 1, 0), 0);
    }

    #[test]
    fn insert_from_rejects_mismatches() {
        let mut dst = AudioBufferList::new(int16_mono(), 8).unwrap();
        let stereo = StreamDescription::from_common_format(CommonPcmFormat::Int16, 44100.0, 2, true);
        let other = AudioBufferList::new(stereo, 8).unwrap();
        assert_eq!(dst.insert_from(&other, 0, 4, 0), 0);

        let src = filled(&[1, 2]);
        assert_eq!(dst.insert_from(&src, 3, 1, 0), 0);
        assert_eq!(dst.insert_from(&src, 0, 1, 1), 0);
        assert_eq!(dst.insert_from(&src, 0, 0, 0), 0);
    }

    #[test]
    fn trim_and_silence() {
        let mut list = AudioBufferList::new(int16_mono(), 6).unwrap();
        list.append_from(&filled(&[1, 2, 3, 4]));

        assert_eq!(list.trim_at_offset(1, 2), 2);
        assert_eq!(samples(&list), vec![1, 4]);
        assert_eq!(list.trim_at_offset(1, 10), 1);
        assert_eq!(samples(&list), vec![1]);
        assert_eq!(list.trim_at_offset(5, 1), 0);

        assert_eq!(list.insert_silence(0, 2), 2);
        assert_eq!(samples(&list), vec![0, 0, 1]);
        assert_eq!(list.insert_silence(3, 10), 3);
        assert_eq!(samples(&list), vec![0, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn no_silence_for_unsigned() {
        let mut format = int16_mono();
        format.format_flags.remove(crate::format::FormatFlags::IS_SIGNED_INTEGER);
        let mut list = AudioBufferList::new(format, 4).unwrap();
        assert_eq!(list.insert_silence(0, 2), 0);
    }

    #[test]
    fn adopt_buffers() {
        let format = StreamDescription::from_common_format(CommonPcmFormat::Int16, 44100.0, 2, false);
        let list = AudioBufferList::from_buffers(format, vec![vec![0; 8], vec![1; 8]]).unwrap();
        assert_eq!(list.frame_length(), 4);
        assert_eq!(list.buffer(1), Some(&[1u8; 8][..]));

        assert_eq!(
            AudioBufferList::from_buffers(format, vec![vec![0; 8]]),
            Err(BufferListError::BufferCountMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(
            AudioBufferList::from_buffers(format, vec![vec![0; 8], vec![0; 6]]),
            Err(BufferListError::InconsistentBufferSizes {
                index: 1,
                expected: 8,
                actual: 6
            })
        );
    }

    #[test]
    fn clear_zeroes_audio() {
        let mut list = filled(&[5, 6]);
        list.clear();
        assert_eq!(list.frame_length(), 0);
        assert!(list.buffers()[0].data().iter().all(|&b| b == 0));
    }
}
