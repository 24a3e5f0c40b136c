// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Recursive typecode walker.

use super::kinds::*;
use super::{TypecodeDeclaration, UNKNOWN_TYPE_NAME};
use crate::codec::{align, CdrBuffer};
use crate::config::DecoderConfig;
use crate::error::{DissectError, DissectResult};

/// How the enclosing declaration refers to the typecode being decoded.
#[derive(Debug, Clone, Default)]
struct Declarator {
    name: Option<String>,
    is_pointer: bool,
    is_key: bool,
    bitfield: Option<u16>,
    /// Set when this typecode is the element of a sequence.
    sequence_bound: Option<u32>,
    /// Set when this typecode is the element of an array.
    dimensions: Vec<u32>,
}

impl Declarator {
    fn member(name: String, is_pointer: bool, bitfield: u16, is_key: bool) -> Self {
        Self {
            name: Some(name),
            is_pointer,
            is_key,
            bitfield: (bitfield != NO_BITFIELD).then_some(bitfield),
            ..Self::default()
        }
    }

    fn render(&self, indent: &str, type_name: &str) -> String {
        let name = self.name.as_deref().unwrap_or("");
        let pointer = if self.is_pointer { "*" } else { "" };
        if let Some(bound) = self.sequence_bound {
            return format!("{indent}sequence<{type_name}, {bound}> {pointer}{name};");
        }
        if !self.dimensions.is_empty() {
            let dims: String = self.dimensions.iter().map(|d| format!("[{d}]")).collect();
            return format!("{indent}{type_name} {name}{dims};");
        }
        if let (Some(bits), false, false) = (self.bitfield, name.is_empty(), self.is_pointer) {
            return format!("{indent}{type_name} {name}:{bits};");
        }
        let sep = if name.is_empty() { "" } else { " " };
        let key = if self.is_key { " //@key" } else { "" };
        format!("{indent}{type_name}{sep}{pointer}{name};{key}")
    }
}

pub(super) struct TypecodeWalker<'a> {
    buffer: CdrBuffer<'a>,
    origin: usize,
    max_depth: usize,
    max_dimensions: usize,
    max_steps: usize,
    steps: usize,
    /// Older minor-version encoding detected: every kind is shifted by one.
    shifted_kinds: bool,
    lines: Vec<String>,
}

impl<'a> TypecodeWalker<'a> {
    pub(super) fn new(buffer: CdrBuffer<'a>, origin: usize, config: &DecoderConfig) -> Self {
        Self {
            buffer,
            origin,
            max_depth: config.max_depth,
            max_dimensions: config.max_array_dimensions,
            max_steps: config.max_steps,
            steps: 0,
            shifted_kinds: false,
            lines: Vec::new(),
        }
    }

    pub(super) fn run(mut self, offset: usize) -> DissectResult<TypecodeDeclaration> {
        let start = align(offset, 4, self.origin);
        let (size, body) = self.u16_at(start.saturating_add(4))?;
        if size as usize > self.buffer.remaining(body) {
            return Err(DissectError::MalformedLength {
                offset: body - 2,
                declared: size as u64,
                available: self.buffer.remaining(body),
                what: "typecode length",
            });
        }
        let consumed = self.walk(start, 0, 0, Declarator::default())?;
        log::trace!(
            "[typecode] {} lines, {} bytes at {} in {} steps",
            self.lines.len(),
            consumed,
            start,
            self.steps
        );
        Ok(TypecodeDeclaration {
            lines: self.lines,
            start,
            consumed,
            end_offset: start + consumed,
        })
    }

    /// One unit of work against `max_steps`: a typecode, a member or a label.
    fn tick(&mut self) -> DissectResult<()> {
        self.steps += 1;
        if self.steps > self.max_steps {
            log::warn!("[typecode] step budget of {} exhausted", self.max_steps);
            return Err(DissectError::BudgetExceeded {
                steps: self.max_steps,
            });
        }
        Ok(())
    }

    fn u8_at(&self, offset: usize) -> DissectResult<(u8, usize)> {
        self.buffer.read_u8(offset)
    }

    fn u16_at(&self, offset: usize) -> DissectResult<(u16, usize)> {
        self.buffer.read_u16(offset, self.origin)
    }

    fn u32_at(&self, offset: usize) -> DissectResult<(u32, usize)> {
        self.buffer.read_u32(offset, self.origin)
    }

    /// Length-prefixed, NUL-terminated name.
    fn name_at(&self, offset: usize) -> DissectResult<(String, usize)> {
        let (len, start) = self.u32_at(offset)?;
        let len = len as usize;
        if len > self.buffer.remaining(start) {
            return Err(DissectError::MalformedLength {
                offset: start - 4,
                declared: len as u64,
                available: self.buffer.remaining(start),
                what: "typecode name",
            });
        }
        let raw = self.buffer.bytes(start, len)?;
        let text = raw.split(|&b| b == 0).next().unwrap_or(raw);
        Ok((String::from_utf8_lossy(text).into_owned(), start + len))
    }

    /// Decode one typecode at `offset` and return the bytes it spans.
    fn walk(
        &mut self,
        offset: usize,
        indent: usize,
        depth: usize,
        decl: Declarator,
    ) -> DissectResult<usize> {
        if depth > self.max_depth {
            return Err(DissectError::RecursionLimitExceeded { depth });
        }
        self.tick()?;

        let (raw_kind, cursor) = self.u32_at(offset)?;
        let mut kind = raw_kind & !TK_FLAGS_MASK;
        let (size, mut cursor) = self.u16_at(cursor)?;
        let consumed = size as usize + TYPECODE_HEADER_SIZE;

        if self.shifted_kinds {
            kind += 1;
        }
        if indent == 0 && kind == TK_OCTET {
            log::debug!("[typecode] octet at top level, assuming shifted kind tags");
            kind += 1;
            self.shifted_kinds = true;
        }

        let pad = "  ".repeat(indent);
        let type_name = match kind {
            TK_STRUCT | TK_ENUM => {
                let (name, next) = self.name_at(cursor)?;
                if decl.sequence_bound.is_some() {
                    name
                } else {
                    let keyword = if kind == TK_ENUM { "enum" } else { "struct" };
                    self.lines.push(format!("{pad}{keyword} {name} {{"));
                    let (count, next) = self.u32_at(next)?;
                    cursor = next;
                    for _ in 0..count {
                        self.tick()?;
                        cursor = if kind == TK_ENUM {
                            self.enum_member(cursor, indent + 1)?
                        } else {
                            self.struct_member(cursor, indent + 1, depth)?
                        };
                    }
                    "}".to_string()
                }
            }
            TK_UNION => match self.union_body(cursor, indent, depth, &decl)? {
                Some(name) => name,
                None => "}".to_string(),
            },
            TK_ALIAS => self.name_at(cursor)?.0,
            TK_STRING | TK_WSTRING => {
                let (bound, _) = self.u32_at(cursor)?;
                let prefix = if kind == TK_WSTRING { "wstring" } else { "string" };
                format!("{prefix}<{bound}>")
            }
            TK_SEQUENCE => {
                let (bound, next) = self.u32_at(cursor)?;
                let element = Declarator {
                    sequence_bound: Some(bound),
                    ..decl
                };
                self.walk(next, indent, depth + 1, element)?;
                return Ok(consumed);
            }
            TK_ARRAY => {
                let (count, mut next) = self.u32_at(cursor)?;
                let count = count as usize;
                if count > self.max_dimensions {
                    log::debug!(
                        "[typecode] array declares {} dimensions, keeping {}",
                        count,
                        self.max_dimensions
                    );
                }
                let mut dimensions = Vec::with_capacity(count.min(self.max_dimensions));
                for _ in 0..count.min(self.max_dimensions) {
                    let (dim, after) = self.u32_at(next)?;
                    dimensions.push(dim);
                    next = after;
                }
                let element = Declarator { dimensions, ..decl };
                self.walk(next, indent, depth + 1, element)?;
                return Ok(consumed);
            }
            TK_VALUE => format!("valuetype {}", self.name_at(cursor)?.0),
            other => match primitive_name(other) {
                Some(name) => name.to_string(),
                None => {
                    log::debug!("[typecode] unknown kind {} ({} bytes)", other, consumed);
                    UNKNOWN_TYPE_NAME.to_string()
                }
            },
        };

        self.lines.push(decl.render(&pad, &type_name));
        Ok(consumed)
    }

    /// `u16 length` then the member body; returns the offset the length says
    /// the next member starts at.
    fn member_extent(&self, offset: usize) -> DissectResult<(usize, usize)> {
        let (length, body) = self.u16_at(offset)?;
        Ok((body, body + length as usize))
    }

    fn enum_member(&mut self, offset: usize, indent: usize) -> DissectResult<usize> {
        let (body, next_member) = self.member_extent(offset)?;
        let (name, cursor) = self.name_at(body)?;
        let (ordinal, _) = self.u32_at(cursor)?;
        self.lines
            .push(format!("{}{} = {};", "  ".repeat(indent), name, ordinal));
        Ok(next_member)
    }

    fn struct_member(&mut self, offset: usize, indent: usize, depth: usize) -> DissectResult<usize> {
        let (body, next_member) = self.member_extent(offset)?;
        let (name, cursor) = self.name_at(body)?;
        let (is_pointer, cursor) = self.u8_at(cursor)?;
        let (bitfield, cursor) = self.u16_at(cursor)?;
        let (is_key, cursor) = self.u8_at(cursor)?;
        let decl = Declarator::member(name, is_pointer != 0, bitfield, is_key != 0);
        self.walk(cursor, indent, depth + 1, decl)?;
        Ok(next_member)
    }

    /// Decode a union body. Returns the union name when it is a sequence
    /// element (no member list follows), `None` after printing the members.
    fn union_body(
        &mut self,
        offset: usize,
        indent: usize,
        depth: usize,
        decl: &Declarator,
    ) -> DissectResult<Option<String>> {
        let (name, cursor) = self.name_at(offset)?;
        // default branch index, unused
        let cursor = align(cursor, 4, self.origin) + 4;

        let (disc_kind, cursor) = self.u32_at(cursor)?;
        let mut disc_kind = disc_kind & !TK_FLAGS_MASK;
        if self.shifted_kinds {
            disc_kind += 1;
        }
        let (disc_size, disc_body) = self.u16_at(cursor)?;
        let disc_name = if disc_kind == TK_ENUM {
            format!("enum {}", self.name_at(disc_body)?.0)
        } else {
            primitive_name(disc_kind)
                .unwrap_or(UNKNOWN_TYPE_NAME)
                .to_string()
        };
        let cursor = disc_body + disc_size as usize;

        if decl.sequence_bound.is_some() {
            return Ok(Some(name));
        }

        let pad = "  ".repeat(indent);
        self.lines
            .push(format!("{pad}union {name} ({disc_name}) {{"));

        let (count, mut cursor) = self.u32_at(cursor)?;
        for _ in 0..count {
            self.tick()?;
            let (body, next_member) = self.member_extent(cursor)?;
            let (member_name, next) = self.name_at(body)?;
            let (is_pointer, next) = self.u8_at(next)?;
            let (labels, mut next) = self.u32_at(next)?;
            for _ in 0..labels {
                self.tick()?;
                let (label, after) = self.buffer.read_i32(next, self.origin)?;
                self.lines.push(format!("{pad}  case {label}:"));
                next = after;
            }
            let member = Declarator::member(member_name, is_pointer != 0, NO_BITFIELD, false);
            self.walk(next, indent + 2, depth + 1, member)?;
            cursor = next_member;
        }
        Ok(None)
    }
}
