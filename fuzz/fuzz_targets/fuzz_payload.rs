// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use hdds_dissect::registry::{
    tags, Extensibility, MemberDescriptor, TypeDescriptor, TypeId, TypeRegistry,
};
use hdds_dissect::{dissect_serialized_data, DecoderConfig};
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

fn registry() -> &'static TypeRegistry {
    static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut r = TypeRegistry::new();
        r.register_type(TypeDescriptor::structure(
            TypeId(100),
            "Node",
            vec![
                MemberDescriptor::new(TypeId(tags::INT16), "tag", 0),
                MemberDescriptor::new(TypeId(tags::STRING), "label", 1),
                MemberDescriptor::new(TypeId(101), "children", 2),
                MemberDescriptor::new(TypeId(102), "value", 3),
            ],
        ));
        r.register_type(TypeDescriptor::sequence(TypeId(101), "Children", TypeId(100)));
        r.register_type(TypeDescriptor::union(TypeId(102), "Value"));
        r.register_union_discriminator(TypeId(102), TypeId(tags::INT32));
        r.register_union_branch(TypeId(102), 0, TypeId(tags::FLOAT64), "real");
        r.register_union_branch(TypeId(102), 1, TypeId(103), "opts");
        r.register_type(
            TypeDescriptor::structure(TypeId(103), "Opts", Vec::new())
                .with_extensibility(Extensibility::Mutable),
        );
        r.register_mutable_member(TypeId(103), 1, TypeId(tags::UINT64), "limit");
        r.register_mutable_member(TypeId(103), 2, TypeId(100), "inner");
        r
    })
}

fuzz_target!(|data: &[u8]| {
    let config = DecoderConfig::default();
    for id in [100, 102, 103] {
        let _ = dissect_serialized_data(data, 0, TypeId(id), registry(), &config);
    }
});
