// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Legacy CDR typecode decoder.
//!
//! A typecode is the wire encoding of a type *definition* carried in
//! discovery parameter lists. Each typecode starts with a 4-byte kind (top
//! bit masked off) and a 2-byte length, so the whole blob spans
//! `6 + length` bytes and can be skipped even when its body is not
//! understood.
//!
//! The output is informational: one printable declaration line per
//! struct, union, enum member or field.
//!
//! ```text
//! struct Point {
//!   long x; //@key
//!   sequence<double, 16> samples;
//! };
//! ```

mod decoder;


use crate::codec::CdrBuffer;
use crate::config::DecoderConfig;
use crate::error::DissectResult;
use std::fmt;

/// Typecode kind tags (current encoding).
pub mod kinds {
    pub const TK_NULL: u32 = 0;
    pub const TK_SHORT: u32 = 1;
    pub const TK_LONG: u32 = 2;
    pub const TK_USHORT: u32 = 3;
    pub const TK_ULONG: u32 = 4;
    pub const TK_FLOAT: u32 = 5;
    pub const TK_DOUBLE: u32 = 6;
    pub const TK_BOOLEAN: u32 = 7;
    pub const TK_CHAR: u32 = 8;
    pub const TK_OCTET: u32 = 9;
    pub const TK_STRUCT: u32 = 10;
    pub const TK_UNION: u32 = 11;
    pub const TK_ENUM: u32 = 12;
    pub const TK_STRING: u32 = 13;
    pub const TK_SEQUENCE: u32 = 14;
    pub const TK_ARRAY: u32 = 15;
    pub const TK_ALIAS: u32 = 16;
    pub const TK_LONGLONG: u32 = 17;
    pub const TK_ULONGLONG: u32 = 18;
    pub const TK_LONGDOUBLE: u32 = 19;
    pub const TK_WCHAR: u32 = 20;
    pub const TK_WSTRING: u32 = 21;
    pub const TK_VALUE: u32 = 22;

    /// Presence flag carried in the top bit of the kind word.
    pub const TK_FLAGS_MASK: u32 = 0x8000_0000;

    /// Bitfield width meaning "not a bitfield".
    pub const NO_BITFIELD: u16 = 0xffff;

    /// Size of the kind word plus the length field.
    pub const TYPECODE_HEADER_SIZE: usize = 6;

    /// Display name of a primitive kind.
    pub const fn primitive_name(kind: u32) -> Option<&'static str> {
        Some(match kind {
            TK_NULL => "null",
            TK_SHORT => "short",
            TK_LONG => "long",
            TK_USHORT => "unsigned short",
            TK_ULONG => "unsigned long",
            TK_FLOAT => "float",
            TK_DOUBLE => "double",
            TK_BOOLEAN => "boolean",
            TK_CHAR => "char",
            TK_OCTET => "octet",
            TK_LONGLONG => "long long",
            TK_ULONGLONG => "unsigned long long",
            TK_LONGDOUBLE => "long double",
            TK_WCHAR => "wchar",
            _ => return None,
        })
    }
}

/// Placeholder printed for kinds the decoder does not recognise.
pub const UNKNOWN_TYPE_NAME: &str = "<unknown type>";

/// Printable declaration decoded from one typecode blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypecodeDeclaration {
    /// Declaration lines, indented two spaces per nesting level.
    pub lines: Vec<String>,
    /// Offset of the kind word (after alignment).
    pub start: usize,
    /// `6 + declared length`.
    pub consumed: usize,
    /// First byte after the blob.
    pub end_offset: usize,
}

impl fmt::Display for TypecodeDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Decode the typecode starting at `offset`.
///
/// `origin` anchors CDR alignment (usually the start of the parameter value).
/// The returned `end_offset` is derived from the declared length only, so a
/// caller can always resume after the blob.
pub fn decode_typecode(
    buffer: CdrBuffer<'_>,
    offset: usize,
    origin: usize,
    config: &DecoderConfig,
) -> DissectResult<TypecodeDeclaration> {
    decoder::TypecodeWalker::new(buffer, origin, config).run(offset)
}
