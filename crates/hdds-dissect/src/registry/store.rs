// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Registry storage: the [`TypeLookup`] trait and its two implementations.

use super::{
    cap_members, MutableMemberKey, MutableMemberMapping, TypeDescriptor, TypeId, UnionKey,
    UnionMemberMapping,
};
use crate::config::DEFAULT_MAX_STRUCT_MEMBERS;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// TypeLookup trait
// ---------------------------------------------------------------------------

/// Point lookups performed by the payload decoder.
///
/// Entries are handed out as `Arc`s so implementations backed by concurrent
/// maps do not have to hold a guard across a decode.
pub trait TypeLookup {
    /// Descriptor registered for `type_id`.
    fn lookup_type(&self, type_id: TypeId) -> Option<Arc<TypeDescriptor>>;

    /// Union side-table entry.
    fn lookup_union_member(&self, key: UnionKey) -> Option<Arc<UnionMemberMapping>>;

    /// Mutable-member side-table entry.
    fn lookup_mutable_member(&self, key: MutableMemberKey) -> Option<Arc<MutableMemberMapping>>;
}

impl<T: TypeLookup + ?Sized> TypeLookup for Arc<T> {
    fn lookup_type(&self, type_id: TypeId) -> Option<Arc<TypeDescriptor>> {
        (**self).lookup_type(type_id)
    }

    fn lookup_union_member(&self, key: UnionKey) -> Option<Arc<UnionMemberMapping>> {
        (**self).lookup_union_member(key)
    }

    fn lookup_mutable_member(&self, key: MutableMemberKey) -> Option<Arc<MutableMemberMapping>> {
        (**self).lookup_mutable_member(key)
    }
}

/// Entry counts of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    pub types: usize,
    pub union_members: usize,
    pub mutable_members: usize,
}

fn discriminator_mapping(union_type_id: TypeId, discriminator_type_id: TypeId) -> UnionMemberMapping {
    UnionMemberMapping {
        union_type_id,
        member_type_id: discriminator_type_id,
        discriminator: None,
        member_name: "discriminator".to_string(),
    }
}

fn branch_mapping(
    union_type_id: TypeId,
    discriminator: Option<i32>,
    member_type_id: TypeId,
    member_name: String,
) -> UnionMemberMapping {
    UnionMemberMapping {
        union_type_id,
        member_type_id,
        discriminator,
        member_name,
    }
}

fn mutable_mapping(
    struct_type_id: TypeId,
    member_id: u32,
    member_type_id: TypeId,
    member_name: String,
) -> MutableMemberMapping {
    MutableMemberMapping {
        struct_type_id,
        member_type_id,
        member_id,
        member_name,
    }
}

// ---------------------------------------------------------------------------
// HashMap registry
// ---------------------------------------------------------------------------

/// `HashMap`-backed registry.
///
/// Registration takes `&mut self`, so the borrow checker enforces the
/// "populate, then share read-only" phase model: wrap it in an `Arc` once
/// discovery is done and hand it to as many decoders as needed. Use
/// [`ConcurrentTypeRegistry`] when registration and decoding interleave.
#[derive(Debug)]
pub struct TypeRegistry {
    types: HashMap<TypeId, Arc<TypeDescriptor>>,
    union_members: HashMap<UnionKey, Arc<UnionMemberMapping>>,
    mutable_members: HashMap<MutableMemberKey, Arc<MutableMemberMapping>>,
    max_struct_members: usize,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::with_member_cap(DEFAULT_MAX_STRUCT_MEMBERS)
    }

    /// Registry truncating struct member lists to `max_struct_members`.
    #[must_use]
    pub fn with_member_cap(max_struct_members: usize) -> Self {
        Self {
            types: HashMap::new(),
            union_members: HashMap::new(),
            mutable_members: HashMap::new(),
            max_struct_members,
        }
    }

    /// Register a descriptor under its own `type_id`. Replaces any previous entry.
    pub fn register_type(&mut self, descriptor: TypeDescriptor) {
        let descriptor = cap_members(descriptor, self.max_struct_members);
        log::trace!(
            "[registry] type {} {} ({:?})",
            descriptor.type_id,
            descriptor.member_name,
            descriptor.member_kind
        );
        self.types.insert(descriptor.type_id, Arc::new(descriptor));
    }

    pub fn register_union_member(&mut self, key: UnionKey, mapping: UnionMemberMapping) {
        self.union_members.insert(key, Arc::new(mapping));
    }

    /// Declare how the discriminator of `union_type_id` is read.
    pub fn register_union_discriminator(
        &mut self,
        union_type_id: TypeId,
        discriminator_type_id: TypeId,
    ) {
        self.register_union_member(
            UnionKey::Discriminator(union_type_id),
            discriminator_mapping(union_type_id, discriminator_type_id),
        );
    }

    pub fn register_union_branch(
        &mut self,
        union_type_id: TypeId,
        discriminator: i32,
        member_type_id: TypeId,
        member_name: impl Into<String>,
    ) {
        self.register_union_member(
            UnionKey::Branch(union_type_id, discriminator),
            branch_mapping(
                union_type_id,
                Some(discriminator),
                member_type_id,
                member_name.into(),
            ),
        );
    }

    pub fn register_union_default(
        &mut self,
        union_type_id: TypeId,
        member_type_id: TypeId,
        member_name: impl Into<String>,
    ) {
        self.register_union_member(
            UnionKey::Default(union_type_id),
            branch_mapping(union_type_id, None, member_type_id, member_name.into()),
        );
    }

    pub fn register_mutable_member(
        &mut self,
        struct_type_id: TypeId,
        member_id: u32,
        member_type_id: TypeId,
        member_name: impl Into<String>,
    ) {
        self.mutable_members.insert(
            MutableMemberKey::new(struct_type_id, member_id),
            Arc::new(mutable_mapping(
                struct_type_id,
                member_id,
                member_type_id,
                member_name.into(),
            )),
        );
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            types: self.types.len(),
            union_members: self.union_members.len(),
            mutable_members: self.mutable_members.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stats() == RegistryStats::default()
    }
}

impl TypeLookup for TypeRegistry {
    fn lookup_type(&self, type_id: TypeId) -> Option<Arc<TypeDescriptor>> {
        self.types.get(&type_id).cloned()
    }

    fn lookup_union_member(&self, key: UnionKey) -> Option<Arc<UnionMemberMapping>> {
        self.union_members.get(&key).cloned()
    }

    fn lookup_mutable_member(&self, key: MutableMemberKey) -> Option<Arc<MutableMemberMapping>> {
        self.mutable_members.get(&key).cloned()
    }
}

// ---------------------------------------------------------------------------
// DashMap registry
// ---------------------------------------------------------------------------

/// Lock-free registry for hosts that register types while other threads are
/// decoding packets.
#[derive(Debug)]
pub struct ConcurrentTypeRegistry {
    types: DashMap<TypeId, Arc<TypeDescriptor>>,
    union_members: DashMap<UnionKey, Arc<UnionMemberMapping>>,
    mutable_members: DashMap<MutableMemberKey, Arc<MutableMemberMapping>>,
    max_struct_members: usize,
}

impl Default for ConcurrentTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrentTypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::with_member_cap(DEFAULT_MAX_STRUCT_MEMBERS)
    }

    #[must_use]
    pub fn with_member_cap(max_struct_members: usize) -> Self {
        Self {
            types: DashMap::new(),
            union_members: DashMap::new(),
            mutable_members: DashMap::new(),
            max_struct_members,
        }
    }

    pub fn register_type(&self, descriptor: TypeDescriptor) {
        let descriptor = cap_members(descriptor, self.max_struct_members);
        self.types.insert(descriptor.type_id, Arc::new(descriptor));
    }

    pub fn register_union_member(&self, key: UnionKey, mapping: UnionMemberMapping) {
        self.union_members.insert(key, Arc::new(mapping));
    }

    pub fn register_union_discriminator(&self, union_type_id: TypeId, discriminator_type_id: TypeId) {
        self.register_union_member(
            UnionKey::Discriminator(union_type_id),
            discriminator_mapping(union_type_id, discriminator_type_id),
        );
    }

    pub fn register_union_branch(
        &self,
        union_type_id: TypeId,
        discriminator: i32,
        member_type_id: TypeId,
        member_name: impl Into<String>,
    ) {
        self.register_union_member(
            UnionKey::Branch(union_type_id, discriminator),
            branch_mapping(
                union_type_id,
                Some(discriminator),
                member_type_id,
                member_name.into(),
            ),
        );
    }

    pub fn register_union_default(
        &self,
        union_type_id: TypeId,
        member_type_id: TypeId,
        member_name: impl Into<String>,
    ) {
        self.register_union_member(
            UnionKey::Default(union_type_id),
            branch_mapping(union_type_id, None, member_type_id, member_name.into()),
        );
    }

    pub fn register_mutable_member(
        &self,
        struct_type_id: TypeId,
        member_id: u32,
        member_type_id: TypeId,
        member_name: impl Into<String>,
    ) {
        self.mutable_members.insert(
            MutableMemberKey::new(struct_type_id, member_id),
            Arc::new(mutable_mapping(
                struct_type_id,
                member_id,
                member_type_id,
                member_name.into(),
            )),
        );
    }

    /// Copy every entry of a populated [`TypeRegistry`] (e.g. a loaded YAML
    /// document) into this registry.
    pub fn absorb(&self, registry: &TypeRegistry) {
        for (id, desc) in &registry.types {
            self.types.insert(*id, Arc::clone(desc));
        }
        for (key, mapping) in &registry.union_members {
            self.union_members.insert(*key, Arc::clone(mapping));
        }
        for (key, mapping) in &registry.mutable_members {
            self.mutable_members.insert(*key, Arc::clone(mapping));
        }
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            types: self.types.len(),
            union_members: self.union_members.len(),
            mutable_members: self.mutable_members.len(),
        }
    }
}

impl TypeLookup for ConcurrentTypeRegistry {
    fn lookup_type(&self, type_id: TypeId) -> Option<Arc<TypeDescriptor>> {
        self.types.get(&type_id).map(|entry| Arc::clone(entry.value()))
    }

    fn lookup_union_member(&self, key: UnionKey) -> Option<Arc<UnionMemberMapping>> {
        self.union_members
            .get(&key)
            .map(|entry| Arc::clone(entry.value()))
    }

    fn lookup_mutable_member(&self, key: MutableMemberKey) -> Option<Arc<MutableMemberMapping>> {
        self.mutable_members
            .get(&key)
            .map(|entry| Arc::clone(entry.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{tags, MemberDescriptor};

    #[test]
    fn test_union_keys_do_not_collide() {
        // With arithmetic keys, branch 1 of union 10 and the discriminator of
        // union 12 would both hash to 11.
        let mut registry = TypeRegistry::new();
        registry.register_union_discriminator(TypeId(12), TypeId(tags::INT32));
        registry.register_union_branch(TypeId(10), 1, TypeId(tags::FLOAT64), "value");

        let disc = registry
            .lookup_union_member(UnionKey::Discriminator(TypeId(12)))
            .unwrap();
        assert_eq!(disc.member_type_id, TypeId(tags::INT32));
        let branch = registry
            .lookup_union_member(UnionKey::Branch(TypeId(10), 1))
            .unwrap();
        assert_eq!(branch.member_name, "value");
        assert!(registry
            .lookup_union_member(UnionKey::Default(TypeId(10)))
            .is_none());
    }

    #[test]
    fn test_registration_replaces_previous_entry() {
        let mut registry = TypeRegistry::new();
        registry.register_type(TypeDescriptor::structure(TypeId(5000), "V1", Vec::new()));
        registry.register_type(TypeDescriptor::structure(TypeId(5000), "V2", Vec::new()));
        assert_eq!(registry.lookup_type(TypeId(5000)).unwrap().member_name, "V2");
        assert_eq!(registry.stats().types, 1);
    }

    #[test]
    fn test_member_cap_applied_on_register() {
        let mut registry = TypeRegistry::with_member_cap(2);
        let elements = (0..4)
            .map(|i| MemberDescriptor::new(TypeId(tags::BYTE), format!("b{i}"), i))
            .collect();
        registry.register_type(TypeDescriptor::structure(TypeId(300), "Bytes", elements));
        assert_eq!(registry.lookup_type(TypeId(300)).unwrap().elements.len(), 2);
    }

    #[test]
    fn test_concurrent_registry_shared_across_threads() {
        let registry = Arc::new(ConcurrentTypeRegistry::new());
        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..50u64 {
                        let id = TypeId(1000 + t * 100 + i);
                        registry.register_type(TypeDescriptor::structure(id, "S", Vec::new()));
                        assert!(registry.lookup_type(id).is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.stats().types, 200);
    }

    #[test]
    fn test_absorb_copies_all_tables() {
        let mut source = TypeRegistry::new();
        source.register_type(TypeDescriptor::union(TypeId(40), "U"));
        source.register_union_default(TypeId(40), TypeId(tags::INT16), "fallback");
        source.register_mutable_member(TypeId(41), 3, TypeId(tags::UINT32), "count");

        let target = ConcurrentTypeRegistry::new();
        target.absorb(&source);
        assert_eq!(target.stats(), source.stats());
        let member = target
            .lookup_mutable_member(MutableMemberKey::new(TypeId(41), 3))
            .unwrap();
        assert_eq!(member.member_name, "count");
    }
}
