use crate::utils::byte_stream::ByteStream;
use crate::utils::errors::ByteStreamError;

pub trait WriteBytesLe {
    fn write_le(&self, dst: &mut Vec<u8>);
}

pub trait WriteBytesBe {
    fn write_be(&self, dst: &mut Vec<u8>);
}

pub trait ReadBytesLe: Sized {
    fn read_le<S: AsRef<[u8]>>(src: &mut ByteStream<S>) -> Result<Self, ByteStreamError>;
}

pub trait ReadBytesBe: Sized {
    fn read_be<S: AsRef<[u8]>>(src: &mut ByteStream<S>) -> Result<Self, ByteStreamError>;
}

/// A fixed-size plain value that can be moved in and out of raw bytes.
///
/// Slices passed to the conversion functions must hold at least
/// [`ByteValue::SIZE`] bytes; only the first `SIZE` bytes are touched.
pub trait ByteValue: Copy {
    const SIZE: usize;

    fn from_ne_slice(src: &[u8]) -> Self;
    fn from_le_slice(src: &[u8]) -> Self;
    fn from_be_slice(src: &[u8]) -> Self;

    fn put_ne(self, dst: &mut [u8]);
    fn put_le(self, dst: &mut [u8]);
    fn put_be(self, dst: &mut [u8]);

    #[inline]
    fn from_swapped_slice(src: &[u8]) -> Self {
        if cfg!(target_endian = "little") {
            Self::from_be_slice(src)
        } else {
            Self::from_le_slice(src)
        }
    }

    #[inline]
    fn put_swapped(self, dst: &mut [u8]) {
        if cfg!(target_endian = "little") {
            self.put_be(dst)
        } else {
            self.put_le(dst)
        }
    }
}

macro_rules! impl_num_le_be {
    ($($t:ty),+) => { $(
        impl WriteBytesLe for $t { #[inline] fn write_le(&self, dst: &mut Vec<u8>) { dst.extend_from_slice(&self.to_le_bytes()); }}
        impl WriteBytesBe for $t { #[inline] fn write_be(&self, dst: &mut Vec<u8>) { dst.extend_from_slice(&self.to_be_bytes()); }}
        impl ReadBytesLe for $t { #[inline] fn read_le<S: AsRef<[u8]>>(src: &mut ByteStream<S>) -> Result<Self, ByteStreamError> { src.read_le::<$t>() }}
        impl ReadBytesBe for $t { #[inline] fn read_be<S: AsRef<[u8]>>(src: &mut ByteStream<S>) -> Result<Self, ByteStreamError> { src.read_be::<$t>() }}

        impl ByteValue for $t {
            const SIZE: usize = size_of::<$t>();

            #[inline]
            fn from_ne_slice(src: &[u8]) -> Self { <$t>::from_ne_bytes(head(src)) }
            #[inline]
            fn from_le_slice(src: &[u8]) -> Self { <$t>::from_le_bytes(head(src)) }
            #[inline]
            fn from_be_slice(src: &[u8]) -> Self { <$t>::from_be_bytes(head(src)) }

            #[inline]
            fn put_ne(self, dst: &mut [u8]) { dst[..Self::SIZE].copy_from_slice(&self.to_ne_bytes()) }
            #[inline]
            fn put_le(self, dst: &mut [u8]) { dst[..Self::SIZE].copy_from_slice(&self.to_le_bytes()) }
            #[inline]
            fn put_be(self, dst: &mut [u8]) { dst[..Self::SIZE].copy_from_slice(&self.to_be_bytes()) }
        }
    )+ }
}

#[inline]
fn head<const N: usize>(src: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&src[..N]);
    out
}

impl_num_le_be!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

// Byte arrays carry no byte order.
impl<const N: usize> ByteValue for [u8; N] {
    const SIZE: usize = N;

    #[inline]
    fn from_ne_slice(src: &[u8]) -> Self {
        head(src)
    }
    #[inline]
    fn from_le_slice(src: &[u8]) -> Self {
        head(src)
    }
    #[inline]
    fn from_be_slice(src: &[u8]) -> Self {
        head(src)
    }
    #[inline]
    fn from_swapped_slice(src: &[u8]) -> Self {
        head(src)
    }

    #[inline]
    fn put_ne(self, dst: &mut [u8]) {
        dst[..N].copy_from_slice(&self)
    }
    #[inline]
    fn put_le(self, dst: &mut [u8]) {
        dst[..N].copy_from_slice(&self)
    }
    #[inline]
    fn put_be(self, dst: &mut [u8]) {
        dst[..N].copy_from_slice(&self)
    }
    #[inline]
    fn put_swapped(self, dst: &mut [u8]) {
        dst[..N].copy_from_slice(&self)
    }
}

#[macro_export]
macro_rules! impl_collection {
    ($trait:ident, $method:ident) => {
        impl<T: $trait> $trait for Vec<T> {
            #[inline]
            fn $method(&self, dst: &mut Vec<u8>) {
                self.iter().for_each(|item| item.$method(dst));
            }
        }
        impl<T: $trait, const N: usize> $trait for [T; N] {
            #[inline]
            fn $method(&self, dst: &mut Vec<u8>) {
                self.iter().for_each(|item| item.$method(dst));
            }
        }
    };
}

impl_collection!(WriteBytesLe, write_le);
impl_collection!(WriteBytesBe, write_be);

macro_rules! impl_array_read {
    ($trait:ident, $method:ident) => {
        impl<T: $trait + Copy + Default, const N: usize> $trait for [T; N] {
            fn $method<S: AsRef<[u8]>>(src: &mut ByteStream<S>) -> Result<Self, ByteStreamError> {
                let start = src.position();
                let mut out = [T::default(); N];
                for item in out.iter_mut() {
                    match T::$method(src) {
                        Ok(v) => *item = v,
                        Err(e) => {
                            src.set_position(start)?;
                            return Err(e);
                        }
                    }
                }
                Ok(out)
            }
        }
    };
}

impl_array_read!(ReadBytesLe, read_le);
impl_array_read!(ReadBytesBe, read_be);

/// Implements the byte order traits for a `u32` code type that converts
/// with `From<u32>` and `as_u32()`.
#[macro_export]
macro_rules! impl_u32_code {
    ($t:ty) => {
        impl $crate::utils::byteorder::WriteBytesLe for $t {
            fn write_le(&self, dst: &mut Vec<u8>) {
                dst.extend_from_slice(&self.as_u32().to_le_bytes())
            }
        }
        impl $crate::utils::byteorder::WriteBytesBe for $t {
            fn write_be(&self, dst: &mut Vec<u8>) {
                dst.extend_from_slice(&self.as_u32().to_be_bytes())
            }
        }
        impl $crate::utils::byteorder::ReadBytesLe for $t {
            fn read_le<S: AsRef<[u8]>>(
                src: &mut $crate::utils::byte_stream::ByteStream<S>,
            ) -> Result<Self, $crate::utils::errors::ByteStreamError> {
                src.read_le::<u32>().map(<$t>::from)
            }
        }
        impl $crate::utils::byteorder::ReadBytesBe for $t {
            fn read_be<S: AsRef<[u8]>>(
                src: &mut $crate::utils::byte_stream::ByteStream<S>,
            ) -> Result<Self, $crate::utils::errors::ByteStreamError> {
                src.read_be::<u32>().map(<$t>::from)
            }
        }
    };
}

#[macro_export]
macro_rules! join_bytes_le {
    ( $($value:expr),+ $(,)? ) => {{
        let mut vec = Vec::<u8>::new();
        $( $crate::utils::byteorder::WriteBytesLe::write_le(&$value, &mut vec); )+
        vec
    }};
}

#[macro_export]
macro_rules! join_bytes_be {
    ( $($value:expr),+ $(,)? ) => {{
        let mut vec = Vec::<u8>::new();
        $( $crate::utils::byteorder::WriteBytesBe::write_be(&$value, &mut vec); )+
        vec
    }};
}

#[cfg(test)]
mod tests {
    use crate::utils::byte_stream::ByteStream;
    use crate::utils::byteorder::{ByteValue, ReadBytesBe, ReadBytesLe, WriteBytesBe, WriteBytesLe};
    use caext_macros::{FromBytes, ToBytes};

    #[derive(Debug, PartialEq, ToBytes, FromBytes)]
    struct Mini {
        a: u16,
        b: u32,
        tag: [u8; 4],
    }

    #[test]
    fn derived_writers() {
        let s = Mini {
            a: 0x1234,
            b: 0xABCDEF01,
            tag: *b"TEST",
        };

        let vec_le = &mut Vec::new();
        let vec_be = &mut Vec::new();

        s.write_le(vec_le);
        s.write_be(vec_be);

        let expected_le = [0x34, 0x12, 0x01, 0xEF, 0xCD, 0xAB, b'T', b'E', b'S', b'T'];
        let expected_be = [0x12, 0x34, 0xAB, 0xCD, 0xEF, 0x01, b'T', b'E', b'S', b'T'];

        assert_eq!(&vec_le[..], &expected_le);
        assert_eq!(&vec_be[..], &expected_be);
    }

    #[test]
    fn derived_readers() {
        let be = [0x12, 0x34, 0xAB, 0xCD, 0xEF, 0x01, b'T', b'E', b'S', b'T'];
        let mut stream = ByteStream::from(&be[..]);
        let s = Mini::read_be(&mut stream).unwrap();
        assert_eq!(s.a, 0x1234);
        assert_eq!(s.b, 0xABCDEF01);
        assert_eq!(&s.tag, b"TEST");
        assert_eq!(stream.remaining(), 0);

        let mut short = ByteStream::from(&be[..5]);
        assert!(Mini::read_le(&mut short).is_err());
        assert_eq!(short.position(), 0);

        let mut offset = ByteStream::from(&be[..]);
        offset.skip(4).unwrap();
        assert!(Mini::read_be(&mut offset).is_err());
        assert_eq!(offset.position(), 4);
    }

    #[test]
    fn array_read_restores_position_on_failure() {
        let data = [0u8, 1, 0, 2, 0];
        let mut stream = ByteStream::from(&data[..]);
        assert!(<[u16; 3]>::read_be(&mut stream).is_err());
        assert_eq!(stream.position(), 0);
        assert_eq!(<[u16; 2]>::read_be(&mut stream).unwrap(), [1, 2]);
    }

    #[test]
    fn value_conversions() {
        let mut buf = [0u8; 8];
        0x0102_0304u32.put_be(&mut buf);
        assert_eq!(&buf[..4], &[1, 2, 3, 4]);
        assert_eq!(u32::from_le_slice(&buf), 0x0403_0201);
        assert_eq!(u32::from_swapped_slice(&buf).swap_bytes(), u32::from_ne_slice(&buf));

        1.5f64.put_le(&mut buf);
        assert_eq!(f64::from_le_slice(&buf), 1.5);
        assert_eq!(<[u8; 3]>::SIZE, 3);
    }
}
