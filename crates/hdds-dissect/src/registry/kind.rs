// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Member kinds of the TypeObject descriptor tables.
//!
//! Kind tags and type ids share one numeric space: a type id with no registry
//! entry is interpreted as a kind tag, which is how primitive members are
//! referenced without registering a descriptor for them.

/// Numeric kind tags as carried in type ids.
pub mod tags {
    pub const NO_TYPE: u64 = 0;
    pub const BOOLEAN: u64 = 1;
    pub const BYTE: u64 = 2;
    pub const INT16: u64 = 3;
    pub const UINT16: u64 = 4;
    pub const INT32: u64 = 5;
    pub const UINT32: u64 = 6;
    pub const INT64: u64 = 7;
    pub const UINT64: u64 = 8;
    pub const FLOAT32: u64 = 9;
    pub const FLOAT64: u64 = 10;
    pub const FLOAT128: u64 = 11;
    pub const CHAR8: u64 = 12;
    pub const CHAR32: u64 = 13;
    pub const ENUMERATION: u64 = 14;
    pub const BITSET: u64 = 15;
    pub const ALIAS: u64 = 16;
    pub const ARRAY: u64 = 17;
    pub const SEQUENCE: u64 = 18;
    pub const STRING: u64 = 19;
    pub const MAP: u64 = 20;
    pub const UNION: u64 = 21;
    pub const STRUCTURE: u64 = 22;
    pub const ANNOTATION: u64 = 23;
}

/// Kind of a type descriptor.
///
/// `Raw` keeps any tag the decoder has no case for (bitsets, maps, wide
/// chars, garbage ids) so it can be reported rather than dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Boolean,
    Char8,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Float128,
    Array,
    Sequence,
    String,
    Alias,
    Union,
    Structure,
    Enumeration,
    Raw(u64),
}

impl MemberKind {
    /// Kind named by a numeric tag.
    pub const fn from_tag(tag: u64) -> Self {
        match tag {
            tags::BOOLEAN => Self::Boolean,
            tags::BYTE => Self::Byte,
            tags::INT16 => Self::Int16,
            tags::UINT16 => Self::UInt16,
            tags::INT32 => Self::Int32,
            tags::UINT32 => Self::UInt32,
            tags::INT64 => Self::Int64,
            tags::UINT64 => Self::UInt64,
            tags::FLOAT32 => Self::Float32,
            tags::FLOAT64 => Self::Float64,
            tags::FLOAT128 => Self::Float128,
            tags::CHAR8 => Self::Char8,
            tags::ENUMERATION => Self::Enumeration,
            tags::ALIAS => Self::Alias,
            tags::ARRAY => Self::Array,
            tags::SEQUENCE => Self::Sequence,
            tags::STRING => Self::String,
            tags::UNION => Self::Union,
            tags::STRUCTURE => Self::Structure,
            other => Self::Raw(other),
        }
    }

    /// Numeric tag of this kind.
    pub const fn tag(self) -> u64 {
        match self {
            Self::Boolean => tags::BOOLEAN,
            Self::Byte => tags::BYTE,
            Self::Int16 => tags::INT16,
            Self::UInt16 => tags::UINT16,
            Self::Int32 => tags::INT32,
            Self::UInt32 => tags::UINT32,
            Self::Int64 => tags::INT64,
            Self::UInt64 => tags::UINT64,
            Self::Float32 => tags::FLOAT32,
            Self::Float64 => tags::FLOAT64,
            Self::Float128 => tags::FLOAT128,
            Self::Char8 => tags::CHAR8,
            Self::Enumeration => tags::ENUMERATION,
            Self::Alias => tags::ALIAS,
            Self::Array => tags::ARRAY,
            Self::Sequence => tags::SEQUENCE,
            Self::String => tags::STRING,
            Self::Union => tags::UNION,
            Self::Structure => tags::STRUCTURE,
            Self::Raw(tag) => tag,
        }
    }

    /// Wire size of fixed-width kinds. Enumerations encode as 32-bit.
    pub const fn primitive_size(self) -> Option<usize> {
        match self {
            Self::Boolean | Self::Char8 | Self::Byte => Some(1),
            Self::Int16 | Self::UInt16 => Some(2),
            Self::Int32 | Self::UInt32 | Self::Float32 | Self::Enumeration => Some(4),
            Self::Int64 | Self::UInt64 | Self::Float64 => Some(8),
            Self::Float128 => Some(16),
            _ => None,
        }
    }

    /// Kinds that need a registry descriptor to decode.
    pub const fn needs_descriptor(self) -> bool {
        matches!(
            self,
            Self::Array | Self::Sequence | Self::Alias | Self::Union | Self::Structure
        )
    }

    /// Lower-case name, also accepted by [`MemberKind::from_name`].
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Char8 => "char8",
            Self::Byte => "byte",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Float128 => "float128",
            Self::Array => "array",
            Self::Sequence => "sequence",
            Self::String => "string",
            Self::Alias => "alias",
            Self::Union => "union",
            Self::Structure => "structure",
            Self::Enumeration => "enumeration",
            Self::Raw(_) => "raw",
        }
    }

    /// Parse a kind name (`int32`, `structure`, ...) or a numeric tag.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if let Ok(tag) = name.parse::<u64>() {
            return Some(Self::from_tag(tag));
        }
        let kind = match name.to_ascii_lowercase().as_str() {
            "boolean" | "bool" => Self::Boolean,
            "char8" | "char" => Self::Char8,
            "byte" | "octet" | "uint8" => Self::Byte,
            "int16" | "short" => Self::Int16,
            "uint16" | "ushort" => Self::UInt16,
            "int32" | "long" => Self::Int32,
            "uint32" | "ulong" => Self::UInt32,
            "int64" | "longlong" => Self::Int64,
            "uint64" | "ulonglong" => Self::UInt64,
            "float32" | "float" => Self::Float32,
            "float64" | "double" => Self::Float64,
            "float128" | "longdouble" => Self::Float128,
            "array" => Self::Array,
            "sequence" => Self::Sequence,
            "string" => Self::String,
            "alias" | "typedef" => Self::Alias,
            "union" => Self::Union,
            "structure" | "struct" => Self::Structure,
            "enumeration" | "enum" => Self::Enumeration,
            _ => return None,
        };
        Some(kind)
    }
}
