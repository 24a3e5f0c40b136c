// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounds-checked, byte-order aware reads over a borrowed packet buffer.

use super::{align, ByteOrder, LONG_DOUBLE_SIZE};
use crate::error::{DissectError, DissectResult};

/// Generate an unaligned read at an absolute offset.
///
/// Each generated method:
/// 1. Checks buffer bounds (returns `DissectError::TruncatedBuffer` if overflow)
/// 2. Converts the bytes with the buffer's byte order
macro_rules! impl_read_at {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&self, offset: usize) -> DissectResult<$type> {
            let mut raw = [0u8; $size];
            raw.copy_from_slice(self.bytes(offset, $size)?);
            Ok(match self.order {
                ByteOrder::BigEndian => <$type>::from_be_bytes(raw),
                ByteOrder::LittleEndian => <$type>::from_le_bytes(raw),
            })
        }
    };
}

/// Generate an aligned read returning `(value, new_offset)`.
///
/// The value starts at `align(offset, size, origin)`.
macro_rules! impl_read_aligned {
    ($name:ident, $at:ident, $type:ty, $size:expr) => {
        pub fn $name(&self, offset: usize, origin: usize) -> DissectResult<($type, usize)> {
            let start = align(offset, $size, origin);
            let value = self.$at(start)?;
            Ok((value, start + $size))
        }
    };
}

/// Read-only view of a packet buffer in a given byte order.
#[derive(Debug, Clone, Copy)]
pub struct CdrBuffer<'a> {
    data: &'a [u8],
    order: ByteOrder,
}

impl<'a> CdrBuffer<'a> {
    pub const fn new(data: &'a [u8], order: ByteOrder) -> Self {
        Self { data, order }
    }

    /// Same bytes, different byte order.
    pub const fn with_order(self, order: ByteOrder) -> Self {
        Self {
            data: self.data,
            order,
        }
    }

    pub const fn order(&self) -> ByteOrder {
        self.order
    }

    pub const fn len(&self) -> usize {
        self.data.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left after `offset` (zero when past the end).
    pub const fn remaining(&self, offset: usize) -> usize {
        self.data.len().saturating_sub(offset)
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn bytes(&self, offset: usize, len: usize) -> DissectResult<&'a [u8]> {
        match offset.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(&self.data[offset..end]),
            _ => Err(DissectError::TruncatedBuffer {
                offset,
                needed: len,
                available: self.remaining(offset),
            }),
        }
    }

    pub fn u8_at(&self, offset: usize) -> DissectResult<u8> {
        Ok(self.bytes(offset, 1)?[0])
    }

    impl_read_at!(u16_at, u16, 2);
    impl_read_at!(u32_at, u32, 4);
    impl_read_at!(u64_at, u64, 8);
    impl_read_at!(i16_at, i16, 2);
    impl_read_at!(i32_at, i32, 4);
    impl_read_at!(i64_at, i64, 8);

    pub fn read_u8(&self, offset: usize) -> DissectResult<(u8, usize)> {
        Ok((self.u8_at(offset)?, offset + 1))
    }

    pub fn read_i8(&self, offset: usize) -> DissectResult<(i8, usize)> {
        let (value, next) = self.read_u8(offset)?;
        Ok((value as i8, next))
    }

    /// Any non-zero octet reads as `true`.
    pub fn read_bool(&self, offset: usize) -> DissectResult<(bool, usize)> {
        let (value, next) = self.read_u8(offset)?;
        Ok((value != 0, next))
    }

    impl_read_aligned!(read_u16, u16_at, u16, 2);
    impl_read_aligned!(read_u32, u32_at, u32, 4);
    impl_read_aligned!(read_u64, u64_at, u64, 8);
    impl_read_aligned!(read_i16, i16_at, i16, 2);
    impl_read_aligned!(read_i32, i32_at, i32, 4);
    impl_read_aligned!(read_i64, i64_at, i64, 8);

    pub fn read_f32(&self, offset: usize, origin: usize) -> DissectResult<(f32, usize)> {
        let (bits, next) = self.read_u32(offset, origin)?;
        Ok((f32::from_bits(bits), next))
    }

    pub fn read_f64(&self, offset: usize, origin: usize) -> DissectResult<(f64, usize)> {
        let (bits, next) = self.read_u64(offset, origin)?;
        Ok((f64::from_bits(bits), next))
    }

    /// Read a `long double` as an opaque 16-byte blob.
    ///
    /// No float interpretation is attempted: the bytes are returned in wire
    /// order whatever the buffer's byte order.
    pub fn read_long_double(
        &self,
        offset: usize,
        origin: usize,
    ) -> DissectResult<([u8; LONG_DOUBLE_SIZE], usize)> {
        let start = align(offset, LONG_DOUBLE_SIZE, origin);
        let mut raw = [0u8; LONG_DOUBLE_SIZE];
        raw.copy_from_slice(self.bytes(start, LONG_DOUBLE_SIZE)?);
        Ok((raw, start + LONG_DOUBLE_SIZE))
    }
}
