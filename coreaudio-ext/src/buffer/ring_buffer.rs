//! Lock-free single producer, single consumer byte ring buffer.
//!
//! [`RingBuffer::new`] hands out a [`RingProducer`] and a [`RingConsumer`]
//! sharing one allocation. Each handle may move to its own thread; the
//! producer only ever advances the write position and the consumer only the
//! read position, published with release stores and observed with acquire
//! loads.

use std::cell::UnsafeCell;
use std::ops::Range;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::trace;

use crate::utils::byteorder::ByteValue;
use crate::utils::errors::RingBufferError;

pub const MIN_CAPACITY: usize = 2;
pub const MAX_CAPACITY: usize = 0x8000_0000;

/// Read and write positions over a power-of-two sized ring.
///
/// One slot is always left empty so that equal positions mean "empty".
pub(crate) struct RingIndices {
    capacity: usize,
    mask: usize,
    read: AtomicUsize,
    write: AtomicUsize,
}

impl RingIndices {
    pub(crate) fn new(requested: usize) -> Result<Self, RingBufferError> {
        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&requested) {
            return Err(RingBufferError::InvalidCapacity(requested as u64));
        }
        let capacity = requested.next_power_of_two();
        Ok(Self {
            capacity,
            mask: capacity - 1,
            read: AtomicUsize::new(0),
            write: AtomicUsize::new(0),
        })
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn positions(&self) -> (usize, usize) {
        (
            self.read.load(Ordering::Acquire),
            self.write.load(Ordering::Acquire),
        )
    }

    #[inline]
    pub(crate) fn available_to_read(&self) -> usize {
        let (read, write) = self.positions();
        write.wrapping_sub(read) & self.mask
    }

    #[inline]
    pub(crate) fn available_to_write(&self) -> usize {
        self.capacity - 1 - self.available_to_read()
    }

    #[inline]
    pub(crate) fn read_position(&self) -> usize {
        self.read.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn write_position(&self) -> usize {
        self.write.load(Ordering::Acquire)
    }

    pub(crate) fn advance_read(&self, count: usize) {
        let read = self.read.load(Ordering::Acquire);
        self.read.store((read + count) & self.mask, Ordering::Release);
    }

    pub(crate) fn advance_write(&self, count: usize) {
        let write = self.write.load(Ordering::Acquire);
        self.write.store((write + count) & self.mask, Ordering::Release);
    }

    /// Splits `count` slots starting at `start` into the part before the end
    /// of the ring and the wrapped part at its beginning.
    #[inline]
    pub(crate) fn regions(&self, start: usize, count: usize) -> (Range<usize>, Range<usize>) {
        let first = count.min(self.capacity - start);
        (start..start + first, 0..count - first)
    }
}

struct Shared {
    indices: RingIndices,
    storage: Box<[UnsafeCell<u8>]>,
}

// Producer and consumer never touch the same bytes: the producer writes only
// the free region and the consumer reads only the filled one.
unsafe impl Sync for Shared {}

impl Shared {
    #[inline]
    fn base(&self) -> *mut u8 {
        UnsafeCell::raw_get(self.storage.as_ptr())
    }

    fn copy_out(&self, start: usize, dst: &mut [u8]) {
        let (first, second) = self.indices.regions(start, dst.len());
        let split = first.len();
        // SAFETY: both ranges lie within the storage and in the readable region
        unsafe {
            ptr::copy_nonoverlapping(self.base().add(first.start), dst.as_mut_ptr(), split);
            ptr::copy_nonoverlapping(self.base(), dst.as_mut_ptr().add(split), second.len());
        }
    }

    fn copy_in(&self, start: usize, src: &[u8]) {
        let (first, second) = self.indices.regions(start, src.len());
        let split = first.len();
        // SAFETY: both ranges lie within the storage and in the writable region
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), self.base().add(first.start), split);
            ptr::copy_nonoverlapping(src.as_ptr().add(split), self.base(), second.len());
        }
    }
}

pub struct RingBuffer;

impl RingBuffer {
    /// Allocates a ring of `capacity` bytes rounded up to a power of two.
    ///
    /// `capacity` must lie in `[2, 0x8000_0000]`. At most `capacity - 1`
    /// bytes can be stored at once.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(capacity: usize) -> Result<(RingProducer, RingConsumer), RingBufferError> {
        let indices = RingIndices::new(capacity)?;
        trace!("Allocating {} byte ring buffer", indices.capacity());
        let storage = (0..indices.capacity()).map(|_| UnsafeCell::new(0)).collect();
        let shared = Arc::new(Shared { indices, storage });

        Ok((
            RingProducer {
                shared: Arc::clone(&shared),
            },
            RingConsumer { shared },
        ))
    }
}

pub struct RingProducer {
    shared: Arc<Shared>,
}

impl RingProducer {
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.indices.capacity()
    }

    #[inline]
    pub fn bytes_available_to_read(&self) -> usize {
        self.shared.indices.available_to_read()
    }

    #[inline]
    pub fn bytes_available_to_write(&self) -> usize {
        self.shared.indices.available_to_write()
    }

    /// Writes `src`, or as much of it as fits when `allow_partial` is set.
    ///
    /// Returns the number of bytes written; without `allow_partial` this is
    /// either `src.len()` or 0.
    pub fn write(&mut self, src: &[u8], allow_partial: bool) -> usize {
        let available = self.bytes_available_to_write();
        if src.is_empty() || available == 0 || (!allow_partial && available < src.len()) {
            return 0;
        }

        let count = available.min(src.len());
        self.shared
            .copy_in(self.shared.indices.write_position(), &src[..count]);
        self.shared.indices.advance_write(count);
        count
    }

    /// Writes the host byte order representation of `value`, all or nothing.
    pub fn write_value<T: ByteValue>(&mut self, value: T) -> bool {
        let mut bytes = vec![0u8; T::SIZE];
        value.put_ne(&mut bytes);
        self.write(&bytes, false) == T::SIZE
    }

    pub fn write_values<T: ByteValue>(&mut self, values: &[T]) -> bool {
        let mut bytes = vec![0u8; T::SIZE * values.len()];
        for (chunk, value) in bytes.chunks_exact_mut(T::SIZE).zip(values) {
            value.put_ne(chunk);
        }
        self.write(&bytes, false) == bytes.len()
    }

    /// The free space as up to two contiguous regions, in write order.
    ///
    /// Fill them directly and commit with [`advance_write`](Self::advance_write).
    pub fn write_vector(&mut self) -> (&mut [u8], &mut [u8]) {
        let indices = &self.shared.indices;
        let (first, second) = indices.regions(indices.write_position(), indices.available_to_write());
        let base = self.shared.base();
        // SAFETY: the free region is owned by the single producer, which is
        // borrowed mutably for the lifetime of the slices
        unsafe {
            (
                std::slice::from_raw_parts_mut(base.add(first.start), first.len()),
                std::slice::from_raw_parts_mut(base, second.len()),
            )
        }
    }

    /// Commits `count` bytes written through [`write_vector`](Self::write_vector).
    pub fn advance_write(&mut self, count: usize) {
        let count = count.min(self.bytes_available_to_write());
        self.shared.indices.advance_write(count);
    }
}

pub struct RingConsumer {
    shared: Arc<Shared>,
}

impl RingConsumer {
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.indices.capacity()
    }

    #[inline]
    pub fn bytes_available_to_read(&self) -> usize {
        self.shared.indices.available_to_read()
    }

    #[inline]
    pub fn bytes_available_to_write(&self) -> usize {
        self.shared.indices.available_to_write()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes_available_to_read() == 0
    }

    /// Reads into `dst`, or as much as is available when `allow_partial` is
    /// set. Returns the number of bytes read.
    pub fn read(&mut self, dst: &mut [u8], allow_partial: bool) -> usize {
        let count = self.peek(dst, allow_partial);
        self.shared.indices.advance_read(count);
        count
    }

    /// Like [`read`](Self::read) without consuming.
    pub fn peek(&self, dst: &mut [u8], allow_partial: bool) -> usize {
        let available = self.bytes_available_to_read();
        if dst.is_empty() || available == 0 || (!allow_partial && available < dst.len()) {
            return 0;
        }

        let count = available.min(dst.len());
        self.shared
            .copy_out(self.shared.indices.read_position(), &mut dst[..count]);
        count
    }

    pub fn read_value<T: ByteValue>(&mut self) -> Option<T> {
        let value = self.peek_value()?;
        self.shared.indices.advance_read(T::SIZE);
        Some(value)
    }

    pub fn peek_value<T: ByteValue>(&self) -> Option<T> {
        let mut bytes = vec![0u8; T::SIZE];
        (self.peek(&mut bytes, false) == T::SIZE).then(|| T::from_ne_slice(&bytes))
    }

    /// The readable bytes as up to two contiguous regions, in read order.
    ///
    /// Consume them with [`advance_read`](Self::advance_read).
    pub fn read_vector(&self) -> (&[u8], &[u8]) {
        let indices = &self.shared.indices;
        let (first, second) = indices.regions(indices.read_position(), indices.available_to_read());
        let base = self.shared.base();
        // SAFETY: the producer never writes into the readable region
        unsafe {
            (
                std::slice::from_raw_parts(base.add(first.start), first.len()),
                std::slice::from_raw_parts(base, second.len()),
            )
        }
    }

    pub fn advance_read(&mut self, count: usize) {
        let count = count.min(self.bytes_available_to_read());
        self.shared.indices.advance_read(count);
    }

    /// Discards everything currently readable.
    pub fn drain(&mut self) {
        let available = self.bytes_available_to_read();
        self.shared.indices.advance_read(available);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn capacity_rules() {
        assert_eq!(
            RingBuffer::new(1).err(),
            Some(RingBufferError::InvalidCapacity(1))
        );
        assert!(RingBuffer::new(MAX_CAPACITY + 1).is_err());

        let (producer, consumer) = RingBuffer::new(100).unwrap();
        assert_eq!(producer.capacity(), 128);
        assert_eq!(producer.bytes_available_to_write(), 127);
        assert_eq!(consumer.bytes_available_to_read(), 0);

        let (producer, _) = RingBuffer::new(2).unwrap();
        assert_eq!(producer.bytes_available_to_write(), 1);
    }

    #[test]
    fn partial_and_all_or_nothing() {
        let (mut producer, mut consumer) = RingBuffer::new(8).unwrap();
        assert_eq!(producer.write(&[1; 10], false), 0);
        assert_eq!(producer.write(&[1; 10], true), 7);
        assert_eq!(producer.bytes_available_to_write(), 0);

        let mut out = [0u8; 10];
        assert_eq!(consumer.read(&mut out, false), 0);
        assert_eq!(consumer.read(&mut out, true), 7);
        assert_eq!(&out[..7], &[1; 7]);
        assert!(consumer.is_empty());
    }

    #[test]
    fn wraparound() {
        let (mut producer, mut consumer) = RingBuffer::new(8).unwrap();
        assert_eq!(producer.write(&[0, 1, 2, 3, 4, 5], false), 6);
        let mut out = [0u8; 4];
        assert_eq!(consumer.read(&mut out, false), 4);

        // Crosses the end of the storage
        assert_eq!(producer.write(&[6, 7, 8, 9, 10], false), 5);
        let mut peeked = [0u8; 7];
        assert_eq!(consumer.peek(&mut peeked, false), 7);
        assert_eq!(peeked, [4, 5, 6, 7, 8, 9, 10]);

        let (first, second) = consumer.read_vector();
        assert_eq!(first, &[4, 5, 6, 7]);
        assert_eq!(second, &[8, 9, 10]);
        consumer.advance_read(5);
        assert_eq!(consumer.bytes_available_to_read(), 2);
    }

    #[test]
    fn write_vector_then_advance() {
        let (mut producer, mut consumer) = RingBuffer::new(4).unwrap();
        {
            let (first, second) = producer.write_vector();
            assert_eq!(first.len() + second.len(), 3);
            first[..2].copy_from_slice(&[9, 8]);
        }
        producer.advance_write(2);
        assert_eq!(consumer.read_value::<u16>(), Some(u16::from_ne_bytes([9, 8])));

        producer.advance_write(100);
        assert_eq!(producer.bytes_available_to_write(), 0);
        consumer.drain();
        assert!(consumer.is_empty());
    }

    #[test]
    fn typed_values() {
        let (mut producer, mut consumer) = RingBuffer::new(16).unwrap();
        assert!(producer.write_value(0x1234_5678u32));
        assert!(producer.write_values(&[1.5f32, -2.0]));
        assert!(!producer.write_value(7u64));

        assert_eq!(consumer.peek_value::<u32>(), Some(0x1234_5678));
        assert_eq!(consumer.read_value::<u32>(), Some(0x1234_5678));
        assert_eq!(consumer.read_value::<f32>(), Some(1.5));
        assert_eq!(consumer.read_value::<f32>(), Some(-2.0));
        assert_eq!(consumer.read_value::<u8>(), None);
    }

    #[test]
    fn threads_see_bytes_in_order() {
        let (mut producer, mut consumer) = RingBuffer::new(64).unwrap();
        let total = 10_000usize;

        let writer = thread::spawn(move || {
            let mut next = 0usize;
            while next < total {
                let end = (next + 13).min(total);
                let chunk: Vec<u8> = (next..end).map(|i| i as u8).collect();
                next += producer.write(&chunk, true);
                thread::yield_now();
            }
        });

        let mut received = Vec::with_capacity(total);
        let mut buf = [0u8; 17];
        while received.len() < total {
            let n = consumer.read(&mut buf, true);
            received.extend_from_slice(&buf[..n]);
            thread::yield_now();
        }
        writer.join().unwrap();

        assert!(received.iter().enumerate().all(|(i, &b)| b == i as u8));
    }
}
