// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Primitive CDR codec: byte order, alignment, bounds-checked scalar reads.
//!
//! CDR aligns each primitive on a multiple of its own size, measured from the
//! start of the enclosing aggregate (the *origin*) rather than from the start
//! of the message. [`align`] implements that rule and every aligned read on
//! [`CdrBuffer`] goes through it.

mod buffer;

pub use buffer::CdrBuffer;

/// Byte order of the CDR stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

impl ByteOrder {
    /// Byte order from the CDR encapsulation endianness bit.
    pub const fn from_little_endian_flag(little_endian: bool) -> Self {
        if little_endian {
            Self::LittleEndian
        } else {
            Self::BigEndian
        }
    }
}

/// Size in bytes of the opaque `long double` read.
pub const LONG_DOUBLE_SIZE: usize = 16;

/// Align `offset` so that `offset - origin` is a multiple of `size`.
///
/// `size` must be a power of two (CDR primitive sizes are 1, 2, 4, 8, 16).
/// An `offset` before `origin` is still aligned relative to `origin`.
/// Saturates at `usize::MAX`, which no buffer read can satisfy.
#[inline]
pub const fn align(offset: usize, size: usize, origin: usize) -> usize {
    if size <= 1 {
        return offset;
    }
    debug_assert!(size.is_power_of_two());
    let mask = size - 1;
    let misalignment = offset.wrapping_sub(origin) & mask;
    offset.saturating_add((size - misalignment) & mask)
}

/// Padding inserted by [`align`].
#[inline]
pub const fn padding(offset: usize, size: usize, origin: usize) -> usize {
    align(offset, size, origin) - offset
}
