// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Output tree of a payload dissection.

use crate::error::{DissectError, DissectResult};
use crate::registry::{MemberKind, TypeId};
use std::fmt;
use std::fmt::Write as _;

/// A decoded leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Char(u8),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    /// `long double`, raw wire bytes.
    LongDouble([u8; 16]),
    Enum(i32),
    Str(String),
}

impl FieldValue {
    /// Integer view of integral values (booleans, chars and enums included).
    pub fn as_i64(&self) -> Option<i64> {
        Some(match *self {
            Self::Bool(v) => i64::from(v),
            Self::Char(v) | Self::Byte(v) => i64::from(v),
            Self::Int16(v) => i64::from(v),
            Self::UInt16(v) => i64::from(v),
            Self::Int32(v) | Self::Enum(v) => i64::from(v),
            Self::UInt32(v) => i64::from(v),
            Self::Int64(v) => v,
            Self::UInt64(v) => i64::try_from(v).ok()?,
            _ => return None,
        })
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float32(v) => Some(f64::from(v)),
            Self::Float64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Char(c) if c.is_ascii_graphic() || *c == b' ' => write!(f, "'{}'", *c as char),
            Self::Char(c) => write!(f, "'\\x{:02x}'", c),
            Self::Byte(v) => write!(f, "0x{:02x}", v),
            Self::Int16(v) => write!(f, "{}", v),
            Self::UInt16(v) => write!(f, "{}", v),
            Self::Int32(v) | Self::Enum(v) => write!(f, "{}", v),
            Self::UInt32(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::UInt64(v) => write!(f, "{}", v),
            Self::Float32(v) => write!(f, "{}", v),
            Self::Float64(v) => write!(f, "{}", v),
            Self::LongDouble(raw) => {
                write!(f, "0x")?;
                for b in raw {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            Self::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// Non-fatal condition met while decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Aggregate type id with no registry descriptor.
    UnresolvedType { type_id: TypeId },
    UnresolvedUnionDiscriminator { union_type_id: TypeId },
    /// Discriminator is neither a 32-bit integer nor an enumeration.
    UnsupportedDiscriminator {
        union_type_id: TypeId,
        kind: MemberKind,
    },
    /// Neither a labelled nor a default branch matched.
    UnresolvedUnionBranch {
        union_type_id: TypeId,
        discriminator: i32,
    },
    /// Mutable member id with no mapping; `length` bytes were skipped.
    UnresolvedMutableMember {
        struct_type_id: TypeId,
        member_id: u32,
        length: usize,
    },
    UnknownMemberKind { tag: u64 },
    /// Only the first `shown` of `total` collection elements are attached.
    ElementsTruncated { shown: usize, total: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedType { type_id } => write!(f, "type {} not found", type_id),
            Self::UnresolvedUnionDiscriminator { union_type_id } => {
                write!(f, "discriminator of union {} not found", union_type_id)
            }
            Self::UnsupportedDiscriminator {
                union_type_id,
                kind,
            } => write!(
                f,
                "union {}: unsupported discriminator kind {}",
                union_type_id,
                kind.name()
            ),
            Self::UnresolvedUnionBranch {
                union_type_id,
                discriminator,
            } => write!(
                f,
                "union {}: no branch for discriminator {}",
                union_type_id, discriminator
            ),
            Self::UnresolvedMutableMember {
                struct_type_id,
                member_id,
                length,
            } => write!(
                f,
                "member {} of {} not found ({} bytes skipped)",
                member_id, struct_type_id, length
            ),
            Self::UnknownMemberKind { tag } => write!(f, "unknown member kind {}", tag),
            Self::ElementsTruncated { shown, total } => write!(
                f,
                "{} more elements not shown ({} total)",
                total.saturating_sub(*shown),
                total
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    Value(FieldValue),
    Group(Vec<DecodedNode>),
    Diagnostic(Diagnostic),
}

/// One field of the dissection, with the byte range it was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedNode {
    pub name: String,
    pub offset: usize,
    pub length: usize,
    pub content: NodeContent,
}

impl DecodedNode {
    pub fn value(name: impl Into<String>, offset: usize, length: usize, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            offset,
            length,
            content: NodeContent::Value(value),
        }
    }

    pub fn group(
        name: impl Into<String>,
        offset: usize,
        length: usize,
        children: Vec<DecodedNode>,
    ) -> Self {
        Self {
            name: name.into(),
            offset,
            length,
            content: NodeContent::Group(children),
        }
    }

    pub fn diagnostic(name: impl Into<String>, offset: usize, diagnostic: Diagnostic) -> Self {
        let length = match diagnostic {
            Diagnostic::UnresolvedMutableMember { length, .. } => length,
            _ => 0,
        };
        Self {
            name: name.into(),
            offset,
            length,
            content: NodeContent::Diagnostic(diagnostic),
        }
    }

    pub fn as_value(&self) -> Option<&FieldValue> {
        match &self.content {
            NodeContent::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn children(&self) -> &[DecodedNode] {
        match &self.content {
            NodeContent::Group(children) => children,
            _ => &[],
        }
    }

    pub fn as_diagnostic(&self) -> Option<&Diagnostic> {
        match &self.content {
            NodeContent::Diagnostic(d) => Some(d),
            _ => None,
        }
    }

    /// First byte after this node.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    fn collect_diagnostics<'n>(&'n self, out: &mut Vec<&'n Diagnostic>) {
        match &self.content {
            NodeContent::Diagnostic(d) => out.push(d),
            NodeContent::Group(children) => {
                for child in children {
                    child.collect_diagnostics(out);
                }
            }
            NodeContent::Value(_) => {}
        }
    }

    fn render_into(&self, level: usize, out: &mut String) {
        let pad = "  ".repeat(level);
        // Writing to a String cannot fail.
        let _ = match &self.content {
            NodeContent::Value(v) => writeln!(out, "{}{}: {}", pad, self.name, v),
            NodeContent::Group(_) => writeln!(out, "{}{}", pad, self.name),
            NodeContent::Diagnostic(d) => writeln!(out, "{}{}: [{}]", pad, self.name, d),
        };
        for child in self.children() {
            child.render_into(level + 1, out);
        }
    }
}

fn find_in<'n>(nodes: &'n [DecodedNode], path: &str) -> Option<&'n DecodedNode> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    let node = nodes.iter().find(|n| n.name == head)?;
    match rest {
        Some(rest) => find_in(node.children(), rest),
        None => Some(node),
    }
}

/// Result of one top-level payload decode.
///
/// The tree is kept even when the decode aborted, so a corrupt packet still
/// shows everything decoded before the failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Dissection {
    pub nodes: Vec<DecodedNode>,
    /// Final offset, or the error that aborted the decode.
    pub outcome: DissectResult<usize>,
}

impl Dissection {
    pub fn end_offset(&self) -> Option<usize> {
        self.outcome.as_ref().ok().copied()
    }

    pub fn error(&self) -> Option<&DissectError> {
        self.outcome.as_ref().err()
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Node at a dotted path of names, e.g. `"Point.x"` or `"Track.pos[2].y"`.
    pub fn find(&self, path: &str) -> Option<&DecodedNode> {
        find_in(&self.nodes, path)
    }

    /// Every diagnostic marker in the tree, depth first.
    pub fn diagnostics(&self) -> Vec<&Diagnostic> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.collect_diagnostics(&mut out);
        }
        out
    }

    /// Indented text rendering, one node per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            node.render_into(0, &mut out);
        }
        if let Err(e) = &self.outcome {
            let _ = writeln!(out, "error: {}", e);
        }
        out
    }
}
