// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Registry-driven recursive payload decoder.

use super::tree::{DecodedNode, Diagnostic, Dissection, FieldValue};
use crate::codec::{align, CdrBuffer};
use crate::config::{
    DecoderConfig, EXTENDED_MEMBER_ID_MASK, MEMBER_ID_MASK, PID_EXTENDED, PID_LIST_END,
};
use crate::error::{DissectError, DissectResult};
use crate::registry::{
    MemberFlags, MemberKind, MutableMemberKey, TypeDescriptor, TypeId, TypeLookup, UnionKey,
};
use std::sync::Arc;

/// What to decode: a descriptor already in hand, or a type id to resolve.
#[derive(Debug, Clone, Copy)]
pub enum TypeRef<'t> {
    Resolved(&'t TypeDescriptor),
    ById(TypeId),
}

/// Decodes CDR payloads against the descriptors of a [`TypeLookup`].
///
/// The decoder holds no per-packet state; one instance can serve any number
/// of packets, from any number of threads when `R: Sync`.
pub struct PayloadDecoder<'r, R: TypeLookup + ?Sized> {
    registry: &'r R,
    config: DecoderConfig,
}

impl<'r, R: TypeLookup + ?Sized> PayloadDecoder<'r, R> {
    pub fn new(registry: &'r R) -> Self {
        Self::with_config(registry, DecoderConfig::default())
    }

    pub fn with_config(registry: &'r R, config: DecoderConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode one value of `descriptor` at `offset`, aligning from `offset`.
    pub fn decode_root(
        &self,
        descriptor: &TypeDescriptor,
        buffer: CdrBuffer<'_>,
        offset: usize,
    ) -> Dissection {
        self.decode(TypeRef::Resolved(descriptor), buffer, offset, offset)
    }

    /// Decode one value of the type registered as `type_id` at `offset`.
    ///
    /// An id with no descriptor is read as a bare kind tag.
    pub fn decode_by_id(&self, type_id: TypeId, buffer: CdrBuffer<'_>, offset: usize) -> Dissection {
        self.decode(TypeRef::ById(type_id), buffer, offset, offset)
    }

    /// Decode one value with an explicit alignment origin.
    pub fn decode(
        &self,
        target: TypeRef<'_>,
        buffer: CdrBuffer<'_>,
        offset: usize,
        origin: usize,
    ) -> Dissection {
        let name = match target {
            TypeRef::Resolved(desc) => desc.member_name.clone(),
            TypeRef::ById(id) => self
                .registry
                .lookup_type(id)
                .map(|desc| desc.member_name.clone())
                .unwrap_or_else(|| id.to_string()),
        };

        let mut session = Session {
            registry: self.registry,
            config: self.config,
            buffer,
            steps: 0,
        };
        let mut nodes = Vec::new();
        let outcome = session.decode_value(target, MemberSlot::inline(name, origin), offset, 0, &mut nodes);
        match &outcome {
            Ok(end) => log::trace!("[payload] decoded {}..{} in {} steps", offset, end, session.steps),
            Err(e) => log::warn!("[payload] decode at offset {} aborted: {}", offset, e),
        }
        Dissection { nodes, outcome }
    }
}

/// Framing of the value about to be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// Value starts right at the cursor.
    Inline,
    /// Value is preceded by a member header (mutable encoding).
    Tagged,
}

/// How the enclosing aggregate refers to the value.
#[derive(Debug, Clone)]
struct MemberSlot {
    name: String,
    framing: Framing,
    origin: usize,
    flags: MemberFlags,
    member_id: u32,
}

impl MemberSlot {
    fn inline(name: String, origin: usize) -> Self {
        Self {
            name,
            framing: Framing::Inline,
            origin,
            flags: MemberFlags::empty(),
            member_id: 0,
        }
    }
}

/// Parsed PL_CDR member header.
#[derive(Debug, Clone, Copy)]
struct MemberHeader {
    member_id: u32,
    length: usize,
    /// First byte after the header.
    body: usize,
    list_end: bool,
}

enum MemberStep {
    Next(usize),
    End(usize),
}

/// State of one top-level decode.
struct Session<'a, 'r, R: TypeLookup + ?Sized> {
    registry: &'r R,
    config: DecoderConfig,
    buffer: CdrBuffer<'a>,
    steps: usize,
}

/// Push a group node even when its body failed, so partial output survives.
fn push_group(
    out: &mut Vec<DecodedNode>,
    name: String,
    offset: usize,
    children: Vec<DecodedNode>,
    result: &DissectResult<usize>,
) {
    let end = match result {
        Ok(end) => *end,
        Err(_) => children.iter().map(DecodedNode::end).max().unwrap_or(offset),
    };
    out.push(DecodedNode::group(
        name,
        offset,
        end.saturating_sub(offset),
        children,
    ));
}

impl<'a, 'r, R: TypeLookup + ?Sized> Session<'a, 'r, R> {
    fn tick(&mut self) -> DissectResult<()> {
        self.steps += 1;
        if self.steps > self.config.max_steps {
            return Err(DissectError::BudgetExceeded {
                steps: self.config.max_steps,
            });
        }
        Ok(())
    }

    fn check_depth(&self, depth: usize) -> DissectResult<()> {
        if depth > self.config.max_depth {
            return Err(DissectError::RecursionLimitExceeded { depth });
        }
        Ok(())
    }

    /// Kind of `type_id`: its descriptor's kind, else the id as a kind tag.
    fn kind_of(&self, type_id: TypeId) -> MemberKind {
        self.registry
            .lookup_type(type_id)
            .map(|desc| desc.member_kind)
            .unwrap_or_else(|| MemberKind::from_tag(type_id.get()))
    }

    fn member_header(&self, offset: usize, origin: usize) -> DissectResult<MemberHeader> {
        let start = align(offset, 4, origin);
        let (raw_id, next) = self.buffer.read_u16(start, origin)?;
        let (length, next) = self.buffer.read_u16(next, origin)?;
        let id = raw_id & MEMBER_ID_MASK;
        if id == PID_LIST_END {
            return Ok(MemberHeader {
                member_id: u32::from(id),
                length: 0,
                body: next,
                list_end: true,
            });
        }
        if id == PID_EXTENDED {
            let (ext_id, next) = self.buffer.read_u32(next, origin)?;
            let (ext_length, next) = self.buffer.read_u32(next, origin)?;
            return Ok(MemberHeader {
                member_id: ext_id & EXTENDED_MEMBER_ID_MASK,
                length: ext_length as usize,
                body: next,
                list_end: false,
            });
        }
        Ok(MemberHeader {
            member_id: u32::from(id),
            length: usize::from(length),
            body: next,
            list_end: false,
        })
    }

    /// Reject a member length running past the buffer.
    fn member_end(&self, header: &MemberHeader) -> DissectResult<usize> {
        let available = self.buffer.remaining(header.body);
        if header.length > available {
            return Err(DissectError::MalformedLength {
                offset: header.body,
                declared: header.length as u64,
                available,
                what: "member length",
            });
        }
        Ok(header.body + header.length)
    }

    /// Reject a count of fixed-size elements that cannot fit.
    fn check_fixed_extent(
        &self,
        element: TypeId,
        count: u64,
        offset: usize,
        what: &'static str,
    ) -> DissectResult<()> {
        let Some(size) = self.kind_of(element).primitive_size() else {
            return Ok(());
        };
        let available = self.buffer.remaining(offset);
        if count.saturating_mul(size as u64) > available as u64 {
            return Err(DissectError::MalformedLength {
                offset,
                declared: count,
                available,
                what,
            });
        }
        Ok(())
    }

    /// Decode one value and return the offset after it.
    fn decode_value(
        &mut self,
        target: TypeRef<'_>,
        mut slot: MemberSlot,
        offset: usize,
        depth: usize,
        out: &mut Vec<DecodedNode>,
    ) -> DissectResult<usize> {
        self.check_depth(depth)?;
        self.tick()?;

        let looked_up: Option<Arc<TypeDescriptor>>;
        let (type_id, desc) = match target {
            TypeRef::Resolved(desc) => (desc.type_id, Some(desc)),
            TypeRef::ById(id) => {
                looked_up = self.registry.lookup_type(id);
                (id, looked_up.as_deref())
            }
        };
        let kind = desc.map_or_else(|| MemberKind::from_tag(type_id.get()), |d| d.member_kind);

        if slot.flags.is_optional() && slot.member_id != 0 {
            match self.member_header(offset, slot.origin) {
                Ok(header) if !header.list_end && header.member_id == slot.member_id => {
                    slot.framing = Framing::Tagged;
                }
                _ => {
                    log::trace!("[payload] optional {} absent", slot.name);
                    return Ok(offset);
                }
            }
        }

        if slot.framing == Framing::Tagged {
            let header = self.member_header(offset, slot.origin)?;
            if header.list_end || header.length == 0 {
                return Ok(header.body);
            }
            let end = self.member_end(&header)?;
            slot.framing = Framing::Inline;
            slot.origin = header.body;
            self.dispatch(type_id, kind, desc, slot, header.body, depth, out)?;
            return Ok(end);
        }

        self.dispatch(type_id, kind, desc, slot, offset, depth, out)
    }

    #[allow(clippy::too_many_arguments)]
    fn dispatch(
        &mut self,
        type_id: TypeId,
        kind: MemberKind,
        desc: Option<&TypeDescriptor>,
        slot: MemberSlot,
        offset: usize,
        depth: usize,
        out: &mut Vec<DecodedNode>,
    ) -> DissectResult<usize> {
        let origin = slot.origin;
        let buf = self.buffer;

        macro_rules! leaf {
            ($read:expr, $size:expr, $variant:ident) => {{
                let start = align(offset, $size, origin);
                let (value, next) = $read?;
                let value = FieldValue::$variant(value);
                log::trace!("[payload] {} @{} = {}", slot.name, start, value);
                out.push(DecodedNode::value(slot.name, start, next - start, value));
                Ok(next)
            }};
        }

        match kind {
            MemberKind::Boolean => leaf!(buf.read_bool(offset), 1, Bool),
            MemberKind::Char8 => leaf!(buf.read_u8(offset), 1, Char),
            MemberKind::Byte => leaf!(buf.read_u8(offset), 1, Byte),
            MemberKind::Int16 => leaf!(buf.read_i16(offset, origin), 2, Int16),
            MemberKind::UInt16 => leaf!(buf.read_u16(offset, origin), 2, UInt16),
            MemberKind::Int32 => leaf!(buf.read_i32(offset, origin), 4, Int32),
            MemberKind::UInt32 => leaf!(buf.read_u32(offset, origin), 4, UInt32),
            MemberKind::Enumeration => leaf!(buf.read_i32(offset, origin), 4, Enum),
            MemberKind::Int64 => leaf!(buf.read_i64(offset, origin), 8, Int64),
            MemberKind::UInt64 => leaf!(buf.read_u64(offset, origin), 8, UInt64),
            MemberKind::Float32 => leaf!(buf.read_f32(offset, origin), 4, Float32),
            MemberKind::Float64 => leaf!(buf.read_f64(offset, origin), 8, Float64),
            MemberKind::Float128 => leaf!(buf.read_long_double(offset, origin), 16, LongDouble),
            MemberKind::String => self.decode_string(slot, offset, out),
            kind if kind.needs_descriptor() => {
                let Some(desc) = desc else {
                    log::debug!("[payload] {}: type {} not found", slot.name, type_id);
                    out.push(DecodedNode::diagnostic(
                        slot.name,
                        offset,
                        Diagnostic::UnresolvedType { type_id },
                    ));
                    return Ok(offset);
                };
                match kind {
                    MemberKind::Alias => self.decode_alias(desc, slot, offset, depth, out),
                    MemberKind::Array => self.decode_array(desc, slot, offset, depth, out),
                    MemberKind::Sequence => self.decode_sequence(desc, slot, offset, depth, out),
                    MemberKind::Union => self.decode_union(desc, slot, offset, depth, out),
                    _ => self.decode_struct(desc, slot, offset, depth, out),
                }
            }
            _ => {
                let tag = kind.tag();
                log::debug!("[payload] {}: unknown member kind {}", slot.name, tag);
                out.push(DecodedNode::diagnostic(
                    slot.name,
                    offset,
                    Diagnostic::UnknownMemberKind { tag },
                ));
                Ok(offset)
            }
        }
    }

    fn decode_string(
        &mut self,
        slot: MemberSlot,
        offset: usize,
        out: &mut Vec<DecodedNode>,
    ) -> DissectResult<usize> {
        let start = align(offset, 4, slot.origin);
        let (len, body) = self.buffer.read_u32(offset, slot.origin)?;
        let available = self.buffer.remaining(body);
        if len as usize > available {
            return Err(DissectError::MalformedLength {
                offset: start,
                declared: u64::from(len),
                available,
                what: "string length",
            });
        }
        let raw = self.buffer.bytes(body, len as usize)?;
        let text = raw.split(|&b| b == 0).next().unwrap_or(raw);
        let value = FieldValue::Str(String::from_utf8_lossy(text).into_owned());
        let end = body + len as usize;
        out.push(DecodedNode::value(slot.name, start, end - start, value));
        Ok(end)
    }

    fn decode_alias(
        &mut self,
        desc: &TypeDescriptor,
        slot: MemberSlot,
        offset: usize,
        depth: usize,
        out: &mut Vec<DecodedNode>,
    ) -> DissectResult<usize> {
        match desc.base() {
            Some(target) => self.decode_value(TypeRef::ById(target), slot, offset, depth + 1, out),
            None => {
                out.push(DecodedNode::diagnostic(
                    slot.name,
                    offset,
                    Diagnostic::UnresolvedType {
                        type_id: TypeId::NONE,
                    },
                ));
                Ok(offset)
            }
        }
    }

    /// Decode `count` elements, attaching at most `max_displayed_elements`.
    #[allow(clippy::too_many_arguments)]
    fn decode_elements(
        &mut self,
        element: TypeId,
        name: &str,
        count: usize,
        offset: usize,
        origin: usize,
        depth: usize,
        children: &mut Vec<DecodedNode>,
    ) -> DissectResult<usize> {
        let shown = self.config.max_displayed_elements;
        let mut hidden = Vec::new();
        let mut cursor = offset;
        for i in 0..count {
            let target = if i < shown {
                &mut *children
            } else {
                hidden.clear();
                &mut hidden
            };
            let slot = MemberSlot::inline(format!("{}[{}]", name, i), origin);
            cursor = self.decode_value(TypeRef::ById(element), slot, cursor, depth + 1, target)?;
        }
        if count > shown {
            children.push(DecodedNode::diagnostic(
                "...",
                cursor,
                Diagnostic::ElementsTruncated {
                    shown,
                    total: count,
                },
            ));
        }
        Ok(cursor)
    }

    fn decode_array(
        &mut self,
        desc: &TypeDescriptor,
        slot: MemberSlot,
        offset: usize,
        depth: usize,
        out: &mut Vec<DecodedNode>,
    ) -> DissectResult<usize> {
        let Some(element) = desc.base() else {
            log::debug!("[payload] array {} has no element type", desc.type_id);
            return Ok(offset);
        };
        self.check_fixed_extent(element, u64::from(desc.bound), offset, "array bound")?;

        let mut children = Vec::new();
        let result = self.decode_elements(
            element,
            &slot.name,
            desc.bound as usize,
            offset,
            slot.origin,
            depth,
            &mut children,
        );
        push_group(out, slot.name, offset, children, &result);
        result
    }

    fn decode_sequence(
        &mut self,
        desc: &TypeDescriptor,
        slot: MemberSlot,
        offset: usize,
        depth: usize,
        out: &mut Vec<DecodedNode>,
    ) -> DissectResult<usize> {
        let start = align(offset, 4, slot.origin);
        let (count, cursor) = self.buffer.read_u32(offset, slot.origin)?;
        let Some(element) = desc.base() else {
            out.push(DecodedNode::group(slot.name, start, 4, Vec::new()));
            return Ok(cursor);
        };
        self.check_fixed_extent(element, u64::from(count), cursor, "sequence length")?;

        let mut children = Vec::new();
        let result = self.decode_elements(
            element,
            &slot.name,
            count as usize,
            cursor,
            slot.origin,
            depth,
            &mut children,
        );
        push_group(out, slot.name, start, children, &result);
        result
    }

    fn decode_union(
        &mut self,
        desc: &TypeDescriptor,
        slot: MemberSlot,
        offset: usize,
        depth: usize,
        out: &mut Vec<DecodedNode>,
    ) -> DissectResult<usize> {
        let mut children = Vec::new();
        let result = self.union_body(desc.type_id, slot.origin, offset, depth, &mut children);
        push_group(out, slot.name, offset, children, &result);
        result
    }

    fn union_body(
        &mut self,
        union_type_id: TypeId,
        origin: usize,
        offset: usize,
        depth: usize,
        out: &mut Vec<DecodedNode>,
    ) -> DissectResult<usize> {
        let Some(disc) = self
            .registry
            .lookup_union_member(UnionKey::Discriminator(union_type_id))
        else {
            log::debug!("[payload] union {}: discriminator not found", union_type_id);
            out.push(DecodedNode::diagnostic(
                "discriminator",
                offset,
                Diagnostic::UnresolvedUnionDiscriminator { union_type_id },
            ));
            return Ok(offset);
        };

        let disc_kind = self.kind_of(disc.member_type_id);
        if !matches!(disc_kind, MemberKind::Int32 | MemberKind::Enumeration) {
            out.push(DecodedNode::diagnostic(
                disc.member_name.clone(),
                offset,
                Diagnostic::UnsupportedDiscriminator {
                    union_type_id,
                    kind: disc_kind,
                },
            ));
            return Ok(offset);
        }

        let start = align(offset, 4, origin);
        let (value, cursor) = self.buffer.read_i32(offset, origin)?;
        let shown = if disc_kind == MemberKind::Enumeration {
            FieldValue::Enum(value)
        } else {
            FieldValue::Int32(value)
        };
        out.push(DecodedNode::value(disc.member_name.clone(), start, 4, shown));

        let branch = self
            .registry
            .lookup_union_member(UnionKey::Branch(union_type_id, value))
            .or_else(|| {
                self.registry
                    .lookup_union_member(UnionKey::Default(union_type_id))
            });
        match branch {
            Some(branch) => {
                let slot = MemberSlot::inline(branch.member_name.clone(), origin);
                self.decode_value(
                    TypeRef::ById(branch.member_type_id),
                    slot,
                    cursor,
                    depth + 1,
                    out,
                )
            }
            None => {
                log::debug!(
                    "[payload] union {}: no branch for discriminator {}",
                    union_type_id,
                    value
                );
                out.push(DecodedNode::diagnostic(
                    "branch",
                    cursor,
                    Diagnostic::UnresolvedUnionBranch {
                        union_type_id,
                        discriminator: value,
                    },
                ));
                Ok(cursor)
            }
        }
    }

    fn decode_struct(
        &mut self,
        desc: &TypeDescriptor,
        slot: MemberSlot,
        offset: usize,
        depth: usize,
        out: &mut Vec<DecodedNode>,
    ) -> DissectResult<usize> {
        let mut children = Vec::new();
        let result = self.struct_body(desc, offset, slot.origin, depth, &mut children);
        push_group(out, slot.name, offset, children, &result);
        result
    }

    fn struct_body(
        &mut self,
        desc: &TypeDescriptor,
        offset: usize,
        origin: usize,
        depth: usize,
        out: &mut Vec<DecodedNode>,
    ) -> DissectResult<usize> {
        self.check_depth(depth)?;
        if desc.extensibility.is_mutable() {
            return self.mutable_members(desc, offset, origin, depth, out);
        }

        let mut cursor = offset;
        if let Some(base) = desc.base() {
            match self.registry.lookup_type(base) {
                Some(parent) if parent.member_kind == MemberKind::Structure => {
                    cursor = self.struct_body(&parent, cursor, origin, depth + 1, out)?;
                }
                _ => {
                    log::debug!("[payload] struct {}: base {} not found", desc.type_id, base);
                    out.push(DecodedNode::diagnostic(
                        "base",
                        cursor,
                        Diagnostic::UnresolvedType { type_id: base },
                    ));
                }
            }
        }

        for element in desc.elements.iter().take(self.config.max_struct_members) {
            let slot = MemberSlot {
                name: element.member_name.clone(),
                framing: Framing::Inline,
                origin,
                flags: element.flags,
                member_id: element.member_id,
            };
            cursor = self.decode_value(TypeRef::ById(element.type_id), slot, cursor, depth + 1, out)?;
        }
        Ok(cursor)
    }

    fn mutable_members(
        &mut self,
        desc: &TypeDescriptor,
        offset: usize,
        origin: usize,
        depth: usize,
        out: &mut Vec<DecodedNode>,
    ) -> DissectResult<usize> {
        let mut cursor = offset;
        loop {
            self.tick()?;
            match self.mutable_member(desc, cursor, origin, depth, out)? {
                MemberStep::Next(next) => cursor = next,
                MemberStep::End(end) => return Ok(end),
            }
        }
    }

    /// One member of a mutable struct. The header's length is authoritative
    /// for where the next member starts.
    fn mutable_member(
        &mut self,
        desc: &TypeDescriptor,
        offset: usize,
        origin: usize,
        depth: usize,
        out: &mut Vec<DecodedNode>,
    ) -> DissectResult<MemberStep> {
        let header = self.member_header(offset, origin)?;
        if header.list_end {
            return Ok(MemberStep::End(header.body));
        }
        if header.length == 0 {
            return Ok(MemberStep::Next(header.body));
        }
        let end = self.member_end(&header)?;

        let mapping = desc
            .base()
            .and_then(|base| {
                self.registry
                    .lookup_mutable_member(MutableMemberKey::new(base, header.member_id))
            })
            .or_else(|| {
                self.registry
                    .lookup_mutable_member(MutableMemberKey::new(desc.type_id, header.member_id))
            });

        match mapping {
            Some(member) => {
                let slot = MemberSlot::inline(member.member_name.clone(), header.body);
                self.decode_value(
                    TypeRef::ById(member.member_type_id),
                    slot,
                    header.body,
                    depth + 1,
                    out,
                )?;
            }
            None => {
                log::debug!(
                    "[payload] struct {}: member {} not found, skipping {} bytes",
                    desc.type_id,
                    header.member_id,
                    header.length
                );
                out.push(DecodedNode::diagnostic(
                    format!("member {}", header.member_id),
                    header.body,
                    Diagnostic::UnresolvedMutableMember {
                        struct_type_id: desc.type_id,
                        member_id: header.member_id,
                        length: header.length,
                    },
                ));
            }
        }
        Ok(MemberStep::Next(end))
    }
}
