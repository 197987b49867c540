//! Unaligned little-endian integer types for packed firmware tables.
//!
//! Firmware-facing tables such as the E820 map are packed: a 64-bit field may
//! start at any byte offset. The [`Le`] wrapper stores the value as its raw
//! little-endian bytes, so it has an alignment of one and can be embedded in
//! `#[repr(C)]` structs without introducing padding. Every wrapper is
//! [`Pod`], which lets whole tables be viewed as byte slices with
//! [`dataview`].

#![cfg_attr(not(test), no_std)]

use core::fmt;

use dataview::Pod;

/// Integers that can be stored as little-endian byte arrays.
pub trait LeBytes: Copy + 'static {
    /// The byte array holding the encoded value.
    type Bytes: Pod + Copy + Eq;

    /// Decodes a value from its little-endian bytes.
    #[must_use]
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Encodes the value into little-endian bytes.
    #[must_use]
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_le_bytes {
    ($($t:ty),+) => {
        $(
            impl LeBytes for $t {
                type Bytes = [u8; size_of::<$t>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$t>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$t>::to_le_bytes(self)
                }
            }
        )+
    };
}

impl_le_bytes!(u16, u32, u64);

/// A value stored in little-endian byte order with byte alignment.
#[repr(transparent)]
pub struct Le<T>(T::Bytes)
where
    T: LeBytes;

impl<T> Le<T>
where
    T: LeBytes,
{
    /// Creates a wrapper holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self(value.to_le_bytes())
    }

    /// Reads the value, converting from little-endian to native endianness.
    #[must_use]
    pub fn read(&self) -> T {
        T::from_le_bytes(self.0)
    }

    /// Writes a value, converting from native endianness to little-endian.
    pub fn write(&mut self, value: T) {
        self.0 = value.to_le_bytes();
    }
}

impl<T> From<T> for Le<T>
where
    T: LeBytes,
{
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T> Clone for Le<T>
where
    T: LeBytes,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Le<T> where T: LeBytes {}

impl<T> PartialEq for Le<T>
where
    T: LeBytes,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for Le<T> where T: LeBytes {}

unsafe impl<T> Pod for Le<T> where T: LeBytes {}

macro_rules! impl_fmt_traits {
    ($($trait:tt),+) => {
        $(
            impl<T> fmt::$trait for Le<T>
            where
                T: LeBytes + fmt::$trait,
            {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::$trait::fmt(&self.read(), f)
                }
            }
        )+
    };
}

impl_fmt_traits!(Debug, Display, LowerHex, UpperHex);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_le_is_byte_aligned() {
        assert_eq!(align_of::<Le<u64>>(), 1);
        assert_eq!(size_of::<Le<u64>>(), 8);
        assert_eq!(size_of::<Le<u32>>(), 4);
    }

    #[test]
    fn test_le_read_write() {
        let mut le = Le::new(0x1234_5678_u32);
        assert_eq!(le.read(), 0x1234_5678);
        // The internal value is always stored as LE
        assert_eq!(le.0, [0x78, 0x56, 0x34, 0x12]);
        le.write(0xAABB_CCDD);
        assert_eq!(le.read(), 0xAABB_CCDD);
        assert_eq!(le.0, [0xDD, 0xCC, 0xBB, 0xAA]);
    }

    #[test]
    fn test_le_from_bytes_view() {
        let bytes = [0x00, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x00, 0x00];
        let view = dataview::DataView::from(&bytes[..]);
        let value = view.get::<Le<u64>>(0);
        assert_eq!(value.read(), 0xa_0000);
    }

    #[test]
    fn test_fmt_traits() {
        let le = Le::new(0x1234_u16);
        assert_eq!(format!("{le:?}"), "4660");
        assert_eq!(format!("{le:x}"), "1234");
        assert_eq!(format!("{le:#X}"), "0x1234");
    }
}
