// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type registry: descriptors and side tables consumed by the payload decoder.
//!
//! Three tables, all keyed by composite keys:
//!
//! - **types**: [`TypeId`] -> [`TypeDescriptor`]
//! - **union members**: [`UnionKey`] -> [`UnionMemberMapping`] (discriminator
//!   type, one entry per labelled branch, default branch)
//! - **mutable members**: [`MutableMemberKey`] -> [`MutableMemberMapping`]
//!
//! Tables are populated by discovery (parameter lists carrying type
//! information) or from a YAML document, then read by any number of decoders.
//! They are append-only: nothing is ever evicted for the session lifetime.
//!
//! # Example
//!
//! ```
//! use hdds_dissect::registry::{
//!     tags, MemberDescriptor, TypeDescriptor, TypeId, TypeLookup, TypeRegistry,
//! };
//!
//! let mut registry = TypeRegistry::new();
//! registry.register_type(TypeDescriptor::structure(
//!     TypeId(100),
//!     "Point",
//!     vec![
//!         MemberDescriptor::new(TypeId(tags::INT32), "x", 0),
//!         MemberDescriptor::new(TypeId(tags::INT32), "y", 1),
//!     ],
//! ));
//! assert!(registry.lookup_type(TypeId(100)).is_some());
//! ```

mod kind;
#[cfg(feature = "registry-loaders")]
pub mod loader;
mod store;

pub use kind::{tags, MemberKind};
pub use store::{ConcurrentTypeRegistry, RegistryStats, TypeLookup, TypeRegistry};

use std::fmt;

/// Opaque 64-bit type identifier. Zero means "no type".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct TypeId(pub u64);

impl TypeId {
    pub const NONE: Self = Self(0);

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// `None` for the zero id.
    pub const fn non_zero(self) -> Option<Self> {
        if self.0 == 0 {
            None
        } else {
            Some(self)
        }
    }
}

impl From<u64> for TypeId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Struct wire encoding policy.
///
/// Final and Appendable structs are decoded identically (members inline in
/// declaration order); Mutable structs carry a member header per member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Extensibility {
    Final,
    Appendable,
    Mutable,
    /// Not declared, or not applicable to the kind.
    #[default]
    Unspecified,
}

impl Extensibility {
    pub const fn is_mutable(self) -> bool {
        matches!(self, Self::Mutable)
    }
}

/// Member flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct MemberFlags(pub u16);

impl MemberFlags {
    /// @key
    pub const KEY: Self = Self(0x0001);

    /// @optional
    pub const OPTIONAL: Self = Self(0x0002);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, flag: Self) -> bool {
        (self.0 & flag.0) != 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn is_optional(self) -> bool {
        self.contains(Self::OPTIONAL)
    }
}

/// A struct member as declared in its type descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDescriptor {
    pub type_id: TypeId,
    pub flags: MemberFlags,
    pub member_id: u32,
    pub member_name: String,
}

impl MemberDescriptor {
    pub fn new(type_id: TypeId, member_name: impl Into<String>, member_id: u32) -> Self {
        Self {
            type_id,
            flags: MemberFlags::empty(),
            member_id,
            member_name: member_name.into(),
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: MemberFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Runtime description of one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub type_id: TypeId,
    pub member_kind: MemberKind,
    /// Alias target, collection element type, or parent struct.
    pub base_type_id: Option<TypeId>,
    pub extensibility: Extensibility,
    /// Element count of an array.
    pub bound: u32,
    pub member_name: String,
    pub elements: Vec<MemberDescriptor>,
}

impl TypeDescriptor {
    pub fn new(type_id: TypeId, member_kind: MemberKind, member_name: impl Into<String>) -> Self {
        Self {
            type_id,
            member_kind,
            base_type_id: None,
            extensibility: Extensibility::Unspecified,
            bound: 0,
            member_name: member_name.into(),
            elements: Vec::new(),
        }
    }

    /// Final struct with the given members.
    pub fn structure(
        type_id: TypeId,
        name: impl Into<String>,
        elements: Vec<MemberDescriptor>,
    ) -> Self {
        let mut desc = Self::new(type_id, MemberKind::Structure, name);
        desc.extensibility = Extensibility::Final;
        desc.elements = elements;
        desc
    }

    pub fn sequence(type_id: TypeId, name: impl Into<String>, element: TypeId) -> Self {
        Self::new(type_id, MemberKind::Sequence, name).with_base(element)
    }

    pub fn array(type_id: TypeId, name: impl Into<String>, element: TypeId, bound: u32) -> Self {
        let mut desc = Self::new(type_id, MemberKind::Array, name).with_base(element);
        desc.bound = bound;
        desc
    }

    pub fn alias(type_id: TypeId, name: impl Into<String>, target: TypeId) -> Self {
        Self::new(type_id, MemberKind::Alias, name).with_base(target)
    }

    pub fn union(type_id: TypeId, name: impl Into<String>) -> Self {
        Self::new(type_id, MemberKind::Union, name)
    }

    #[must_use]
    pub fn with_base(mut self, base: TypeId) -> Self {
        self.base_type_id = base.non_zero();
        self
    }

    #[must_use]
    pub fn with_extensibility(mut self, extensibility: Extensibility) -> Self {
        self.extensibility = extensibility;
        self
    }

    /// Base type id, treating an explicit zero as unset.
    pub fn base(&self) -> Option<TypeId> {
        self.base_type_id.and_then(TypeId::non_zero)
    }
}

/// Entry of the union side table.
///
/// Depending on its key this is the discriminator descriptor (whose
/// `member_type_id` gives the discriminator's kind), a labelled branch, or
/// the default branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionMemberMapping {
    pub union_type_id: TypeId,
    pub member_type_id: TypeId,
    pub discriminator: Option<i32>,
    pub member_name: String,
}

/// Entry of the mutable-member side table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutableMemberMapping {
    pub struct_type_id: TypeId,
    pub member_type_id: TypeId,
    pub member_id: u32,
    pub member_name: String,
}

/// Key into the union side table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnionKey {
    /// How to read the discriminator of this union.
    Discriminator(TypeId),
    /// Branch selected by a discriminator value.
    Branch(TypeId, i32),
    /// Branch used when no labelled branch matches.
    Default(TypeId),
}

/// Key into the mutable-member side table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MutableMemberKey {
    pub struct_type_id: TypeId,
    pub member_id: u32,
}

impl MutableMemberKey {
    pub const fn new(struct_type_id: TypeId, member_id: u32) -> Self {
        Self {
            struct_type_id,
            member_id,
        }
    }
}

/// Truncate over-long member lists, keeping declaration order.
pub(crate) fn cap_members(mut descriptor: TypeDescriptor, cap: usize) -> TypeDescriptor {
    if descriptor.elements.len() > cap {
        log::warn!(
            "[registry] type {} ({}) declares {} members, keeping the first {}",
            descriptor.type_id,
            descriptor.member_name,
            descriptor.elements.len(),
            cap
        );
        descriptor.elements.truncate(cap);
    }
    descriptor
}
