//! In-memory cursor over a byte buffer with typed, endian-aware access.
//!
//! A [`ByteStream`] pairs a storage value with a position and maintains
//! `0 <= position <= len` across every operation. Failed reads, writes and
//! seeks leave the position where it was.
//!
//! The storage decides the ownership model:
//!
//! - `&[u8]`: borrowed, read only
//! - `&mut [u8]` / `Box<[u8]>`: fixed length, writes past the end fail
//! - `Vec<u8>`: owned and growable, writes past the end extend the buffer

use std::io::{self, SeekFrom};
use std::ops::Range;

use crate::utils::byteorder::ByteValue;
use crate::utils::errors::ByteStreamError;

/// Storage that can be written through a [`ByteStream`].
pub trait WriteStorage: AsRef<[u8]> {
    fn as_mut_bytes(&mut self) -> &mut [u8];

    /// Makes at least `len` bytes addressable, returning `false` when the
    /// storage cannot hold that many.
    fn ensure_len(&mut self, len: usize) -> bool;
}

impl WriteStorage for Vec<u8> {
    fn as_mut_bytes(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }

    fn ensure_len(&mut self, len: usize) -> bool {
        if self.len() < len {
            self.resize(len, 0);
        }
        true
    }
}

impl WriteStorage for &mut [u8] {
    fn as_mut_bytes(&mut self) -> &mut [u8] {
        self
    }

    fn ensure_len(&mut self, len: usize) -> bool {
        len <= self.len()
    }
}

impl WriteStorage for Box<[u8]> {
    fn as_mut_bytes(&mut self) -> &mut [u8] {
        self
    }

    fn ensure_len(&mut self, len: usize) -> bool {
        len <= self.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteStream<S = Vec<u8>> {
    buf: S,
    pos: usize,
}

impl ByteStream<Vec<u8>> {
    /// Creates an empty growable stream.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::wrap(Vec::with_capacity(capacity))
    }
}

impl<S> ByteStream<S> {
    /// Wraps `buf` with the position at zero.
    pub fn wrap(buf: S) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn get_ref(&self) -> &S {
        &self.buf
    }

    pub fn into_inner(self) -> S {
        self.buf
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl<S> From<S> for ByteStream<S> {
    fn from(buf: S) -> Self {
        Self::wrap(buf)
    }
}

impl<S: AsRef<[u8]>> ByteStream<S> {
    #[doc(alias = "length")]
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.as_ref().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.len() - self.pos
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.pos == self.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_ref()
    }

    /// Bytes between the position and the end.
    pub fn remaining_bytes(&self) -> &[u8] {
        &self.buf.as_ref()[self.pos..]
    }

    /// Moves the position and returns the new absolute offset.
    pub fn seek(&mut self, target: SeekFrom) -> Result<usize, ByteStreamError> {
        let len = self.len();
        let target = match target {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(delta) => self.pos as i128 + delta as i128,
            SeekFrom::End(delta) => len as i128 + delta as i128,
        };
        if target < 0 || target > len as i128 {
            return Err(ByteStreamError::SeekOutOfRange {
                target,
                length: len,
            });
        }
        self.pos = target as usize;
        Ok(self.pos)
    }

    pub fn set_position(&mut self, pos: usize) -> Result<(), ByteStreamError> {
        self.seek(SeekFrom::Start(pos as u64)).map(|_| ())
    }

    /// Advances the position by `count` bytes.
    pub fn skip(&mut self, count: usize) -> Result<(), ByteStreamError> {
        if count > self.remaining() {
            return Err(ByteStreamError::SeekOutOfRange {
                target: self.pos as i128 + count as i128,
                length: self.len(),
            });
        }
        self.pos += count;
        Ok(())
    }

    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    fn span(&self, count: usize) -> Result<Range<usize>, ByteStreamError> {
        let remaining = self.remaining();
        if count > remaining {
            return Err(ByteStreamError::OutOfBounds {
                requested: count,
                remaining,
                position: self.pos,
            });
        }
        Ok(self.pos..self.pos + count)
    }

    fn take(&mut self, count: usize) -> Result<&[u8], ByteStreamError> {
        let range = self.span(count)?;
        self.pos = range.end;
        Ok(&self.buf.as_ref()[range])
    }

    /// Reads a value in host byte order.
    pub fn read<T: ByteValue>(&mut self) -> Result<T, ByteStreamError> {
        self.take(T::SIZE).map(T::from_ne_slice)
    }

    pub fn read_le<T: ByteValue>(&mut self) -> Result<T, ByteStreamError> {
        self.take(T::SIZE).map(T::from_le_slice)
    }

    pub fn read_be<T: ByteValue>(&mut self) -> Result<T, ByteStreamError> {
        self.take(T::SIZE).map(T::from_be_slice)
    }

    /// Reads a value stored in the byte order opposite to the host's.
    pub fn read_swapped<T: ByteValue>(&mut self) -> Result<T, ByteStreamError> {
        self.take(T::SIZE).map(T::from_swapped_slice)
    }

    /// Reads a value in host byte order without advancing.
    pub fn peek<T: ByteValue>(&self) -> Result<T, ByteStreamError> {
        let range = self.span(T::SIZE)?;
        Ok(T::from_ne_slice(&self.buf.as_ref()[range]))
    }

    pub fn peek_be<T: ByteValue>(&self) -> Result<T, ByteStreamError> {
        let range = self.span(T::SIZE)?;
        Ok(T::from_be_slice(&self.buf.as_ref()[range]))
    }

    /// Fills `dst` entirely from the stream.
    pub fn read_bytes(&mut self, dst: &mut [u8]) -> Result<(), ByteStreamError> {
        let src = self.take(dst.len())?;
        dst.copy_from_slice(src);
        Ok(())
    }

    pub fn read_slice(&mut self, count: usize) -> Result<&[u8], ByteStreamError> {
        self.take(count)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ByteStreamError> {
        self.read::<[u8; N]>()
    }
}

impl<S: WriteStorage> ByteStream<S> {
    fn reserve(&mut self, count: usize) -> Result<Range<usize>, ByteStreamError> {
        let end = self.pos.checked_add(count);
        match end {
            Some(end) if self.buf.ensure_len(end) => Ok(self.pos..end),
            _ => Err(ByteStreamError::CapacityExceeded {
                requested: count,
                position: self.pos,
                length: self.len(),
            }),
        }
    }

    fn put<T: ByteValue>(
        &mut self,
        value: T,
        put: impl FnOnce(T, &mut [u8]),
    ) -> Result<(), ByteStreamError> {
        let range = self.reserve(T::SIZE)?;
        put(value, &mut self.buf.as_mut_bytes()[range.clone()]);
        self.pos = range.end;
        Ok(())
    }

    /// Writes a value in host byte order.
    pub fn write<T: ByteValue>(&mut self, value: T) -> Result<(), ByteStreamError> {
        self.put(value, T::put_ne)
    }

    pub fn write_le<T: ByteValue>(&mut self, value: T) -> Result<(), ByteStreamError> {
        self.put(value, T::put_le)
    }

    pub fn write_be<T: ByteValue>(&mut self, value: T) -> Result<(), ByteStreamError> {
        self.put(value, T::put_be)
    }

    pub fn write_swapped<T: ByteValue>(&mut self, value: T) -> Result<(), ByteStreamError> {
        self.put(value, T::put_swapped)
    }

    pub fn write_bytes(&mut self, src: &[u8]) -> Result<(), ByteStreamError> {
        let range = self.reserve(src.len())?;
        self.buf.as_mut_bytes()[range.clone()].copy_from_slice(src);
        self.pos = range.end;
        Ok(())
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        self.buf.as_mut_bytes()
    }
}

impl From<ByteStreamError> for io::Error {
    fn from(err: ByteStreamError) -> Self {
        let kind = match err {
            ByteStreamError::OutOfBounds { .. } => io::ErrorKind::UnexpectedEof,
            ByteStreamError::SeekOutOfRange { .. } => io::ErrorKind::InvalidInput,
            ByteStreamError::CapacityExceeded { .. } => io::ErrorKind::WriteZero,
        };
        io::Error::new(kind, err)
    }
}

impl<S: AsRef<[u8]>> io::Read for ByteStream<S> {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        let count = dst.len().min(self.remaining());
        self.read_bytes(&mut dst[..count])?;
        Ok(count)
    }
}

impl<S: WriteStorage> io::Write for ByteStream<S> {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        self.write_bytes(src)?;
        Ok(src.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_stream() {
        let stream = ByteStream::new();
        assert_eq!(stream.len(), 0);
        assert_eq!(stream.position(), 0);
        assert_eq!(stream.remaining(), 0);
        assert!(stream.is_empty());
        assert!(stream.at_end());
    }

    #[test]
    fn remaining_tracks_position() {
        let data = [0u8; 16];
        let mut stream = ByteStream::from(&data[..]);
        for step in [0usize, 3, 5, 8] {
            stream.set_position(step).unwrap();
            assert_eq!(stream.remaining(), stream.len() - stream.position());
        }
        stream.read::<u64>().unwrap();
        assert_eq!(stream.remaining(), 0);
    }

    #[test]
    fn short_read_keeps_position() {
        let data = [1u8, 2, 3];
        let mut stream = ByteStream::from(&data[..]);
        stream.skip(1).unwrap();
        let err = stream.read::<u32>().unwrap_err();
        assert_eq!(
            err,
            ByteStreamError::OutOfBounds {
                requested: 4,
                remaining: 2,
                position: 1
            }
        );
        assert_eq!(stream.position(), 1);
        assert_eq!(stream.read_be::<u16>().unwrap(), 0x0203);
    }

    #[test]
    fn write_then_read_back() {
        let mut stream = ByteStream::new();
        stream.write(0xDEAD_BEEFu32).unwrap();
        stream.write_be(-2i16).unwrap();
        stream.write_le(0.25f64).unwrap();
        stream.write_swapped(0x0102u16).unwrap();
        stream.write_bytes(b"abc").unwrap();
        assert_eq!(stream.len(), 4 + 2 + 8 + 2 + 3);

        stream.rewind();
        assert_eq!(stream.read::<u32>().unwrap(), 0xDEAD_BEEF);
        assert_eq!(stream.read_be::<i16>().unwrap(), -2);
        assert_eq!(stream.read_le::<f64>().unwrap(), 0.25);
        assert_eq!(stream.read_swapped::<u16>().unwrap(), 0x0102);
        assert_eq!(&stream.read_array::<3>().unwrap(), b"abc");
        assert!(stream.at_end());
    }

    #[test]
    fn big_endian_layout() {
        let mut stream = ByteStream::new();
        stream.write_be(0x0102_0304u32).unwrap();
        stream.write_le(0x0102_0304u32).unwrap();
        assert_eq!(stream.as_bytes(), &[1, 2, 3, 4, 4, 3, 2, 1]);
    }

    #[test]
    fn seek_bounds() {
        let data = [0u8; 10];
        let mut stream = ByteStream::from(&data[..]);
        assert_eq!(stream.seek(SeekFrom::Start(10)).unwrap(), 10);
        assert_eq!(stream.seek(SeekFrom::End(-4)).unwrap(), 6);
        assert_eq!(stream.seek(SeekFrom::Current(-6)).unwrap(), 0);

        assert!(stream.seek(SeekFrom::Start(11)).is_err());
        assert!(stream.seek(SeekFrom::Current(-1)).is_err());
        assert!(stream.seek(SeekFrom::End(1)).is_err());
        assert_eq!(stream.position(), 0);

        stream.set_position(7).unwrap();
        assert!(stream.skip(4).is_err());
        assert_eq!(stream.position(), 7);
        stream.skip(3).unwrap();
        assert!(stream.at_end());
    }

    #[test]
    fn fixed_storage_rejects_overflow() {
        let mut backing = [0u8; 6];
        let mut stream = ByteStream::from(&mut backing[..]);
        stream.write_be(0x1122_3344u32).unwrap();
        assert!(matches!(
            stream.write_be(0x5566_7788u32),
            Err(ByteStreamError::CapacityExceeded { .. })
        ));
        assert_eq!(stream.position(), 4);
        stream.write_be(0x5566u16).unwrap();
        assert_eq!(stream.len(), 6);
        assert_eq!(backing, [0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
    }

    #[test]
    fn growable_storage_overwrites_then_extends() {
        let mut stream = ByteStream::wrap(vec![0u8; 4]);
        stream.set_position(2).unwrap();
        stream.write_be(0xAABB_CCDDu32).unwrap();
        assert_eq!(stream.into_inner(), vec![0, 0, 0xAA, 0xBB, 0xCC, 0xDD]);
    }

    #[test]
    fn peek_does_not_advance() {
        let data = [0u8, 0, 0, 42];
        let stream = ByteStream::from(&data[..]);
        assert_eq!(stream.peek_be::<u32>().unwrap(), 42);
        assert_eq!(stream.position(), 0);
        assert_eq!(
            stream.peek::<u32>().unwrap(),
            u32::from_ne_bytes([0, 0, 0, 42])
        );
    }

    #[test]
    fn io_traits() {
        let mut stream = ByteStream::new();
        stream.write_all(b"caff").unwrap();
        write!(stream, "{}", 12).unwrap();
        assert_eq!(stream.as_bytes(), b"caff12");

        stream.rewind();
        let mut out = [0u8; 8];
        let n = std::io::Read::read(&mut stream, &mut out).unwrap();
        assert_eq!(n, 6);
        assert_eq!(&out[..6], b"caff12");
    }
}
