// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use crate::codec::{ByteOrder, CdrBuffer};
use crate::config::DecoderConfig;
use crate::error::DissectError;
use crate::registry::{
    tags, ConcurrentTypeRegistry, Extensibility, MemberDescriptor, MemberFlags, TypeDescriptor,
    TypeId, TypeRegistry,
};
use std::sync::Arc;

fn le(bytes: &[u8]) -> CdrBuffer<'_> {
    CdrBuffer::new(bytes, ByteOrder::LittleEndian)
}

fn int(d: &Dissection, path: &str) -> Option<i64> {
    d.find(path)?.as_value()?.as_i64()
}

fn point() -> TypeDescriptor {
    TypeDescriptor::structure(
        TypeId(100),
        "Point",
        vec![
            MemberDescriptor::new(TypeId(tags::INT32), "x", 0),
            MemberDescriptor::new(TypeId(tags::INT32), "y", 1),
        ],
    )
}

fn union_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register_type(TypeDescriptor::union(TypeId(200), "Choice"));
    registry.register_union_discriminator(TypeId(200), TypeId(tags::INT32));
    registry.register_union_branch(TypeId(200), 1, TypeId(tags::FLOAT64), "reading");
    registry.register_union_default(TypeId(200), TypeId(tags::INT16), "code");
    registry
}

fn mutable_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register_type(
        TypeDescriptor::structure(TypeId(300), "Settings", Vec::new())
            .with_extensibility(Extensibility::Mutable),
    );
    registry.register_mutable_member(TypeId(300), 1, TypeId(tags::INT32), "a");
    registry.register_mutable_member(TypeId(300), 2, TypeId(tags::FLOAT64), "b");
    registry
}

#[test]
fn test_final_struct_point() {
    let registry = TypeRegistry::new();
    let bytes = [0x01, 0, 0, 0, 0x02, 0, 0, 0];
    let d = PayloadDecoder::new(&registry).decode_root(&point(), le(&bytes), 0);

    assert_eq!(d.end_offset(), Some(8));
    let root = &d.nodes[0];
    assert_eq!(root.name, "Point");
    assert_eq!(root.children().len(), 2);
    assert_eq!(int(&d, "Point.x"), Some(1));
    assert_eq!(int(&d, "Point.y"), Some(2));
    assert_eq!(d.find("Point.y").unwrap().offset, 4);
}

#[test]
fn test_sequence_of_int32() {
    let mut registry = TypeRegistry::new();
    registry.register_type(TypeDescriptor::sequence(TypeId(101), "values", TypeId(tags::INT32)));
    let bytes = [0x02, 0, 0, 0, 0x0A, 0, 0, 0, 0x14, 0, 0, 0];
    let d = PayloadDecoder::new(&registry).decode_by_id(TypeId(101), le(&bytes), 0);

    assert_eq!(d.end_offset(), Some(12));
    let values: Vec<_> = d.nodes[0]
        .children()
        .iter()
        .filter_map(|n| n.as_value().and_then(FieldValue::as_i64))
        .collect();
    assert_eq!(values, vec![10, 20]);
    assert_eq!(d.nodes[0].children()[1].name, "values[1]");
}

#[test]
fn test_sequence_advances_by_count_times_size() {
    let mut registry = TypeRegistry::new();
    registry.register_type(TypeDescriptor::sequence(TypeId(102), "s", TypeId(tags::INT16)));
    let decoder = PayloadDecoder::new(&registry);
    for n in 0..6u32 {
        let mut bytes = n.to_le_bytes().to_vec();
        bytes.extend((0..n).flat_map(|i| (i as i16).to_le_bytes()));
        let d = decoder.decode_by_id(TypeId(102), le(&bytes), 0);
        assert_eq!(d.end_offset(), Some(4 + 2 * n as usize));
    }
}

#[test]
fn test_sequence_without_element_type_skips_elements() {
    let mut registry = TypeRegistry::new();
    registry.register_type(TypeDescriptor::sequence(TypeId(103), "opaque", TypeId::NONE));
    let bytes = [0x03, 0, 0, 0, 0xff, 0xff, 0xff];
    let d = PayloadDecoder::new(&registry).decode_by_id(TypeId(103), le(&bytes), 0);
    assert_eq!(d.end_offset(), Some(4));
}

#[test]
fn test_mutable_struct_terminates_on_list_end() {
    let registry = mutable_registry();
    let decoder = PayloadDecoder::new(&registry);

    // no members
    let d = decoder.decode_by_id(TypeId(300), le(&[0x02, 0x3f, 0, 0]), 0);
    assert_eq!(d.end_offset(), Some(4));
    assert!(d.nodes[0].children().is_empty());

    let mut bytes = vec![0x01, 0, 0x04, 0, 0x07, 0, 0, 0];
    bytes.extend_from_slice(&[0x02, 0, 0x08, 0]);
    bytes.extend_from_slice(&2.5f64.to_le_bytes());
    bytes.extend_from_slice(&[0x02, 0x3f, 0, 0]);
    let d = decoder.decode_by_id(TypeId(300), le(&bytes), 0);
    assert_eq!(d.end_offset(), Some(24));
    assert_eq!(int(&d, "Settings.a"), Some(7));
    assert_eq!(
        d.find("Settings.b").and_then(DecodedNode::as_value),
        Some(&FieldValue::Float64(2.5))
    );
}

#[test]
fn test_mutable_unknown_member_skipped_by_length() {
    let registry = mutable_registry();
    let mut bytes = vec![0x09, 0, 0x06, 0, 1, 2, 3, 4, 5, 6, 0, 0];
    bytes.extend_from_slice(&[0x01, 0, 0x04, 0, 0x2a, 0, 0, 0]);
    bytes.extend_from_slice(&[0x02, 0x3f, 0, 0]);
    let d = PayloadDecoder::new(&registry).decode_by_id(TypeId(300), le(&bytes), 0);

    assert_eq!(d.end_offset(), Some(24));
    assert_eq!(int(&d, "Settings.a"), Some(42));
    assert_eq!(
        d.diagnostics(),
        vec![&Diagnostic::UnresolvedMutableMember {
            struct_type_id: TypeId(300),
            member_id: 9,
            length: 6,
        }]
    );
}

#[test]
fn test_mutable_extended_header_and_empty_member() {
    let registry = mutable_registry();
    let mut bytes = vec![0x01, 0, 0, 0]; // member 1, length 0
    bytes.extend_from_slice(&[0x01, 0x3f, 0x08, 0]); // extended header
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&4u32.to_le_bytes());
    bytes.extend_from_slice(&(-5i32).to_le_bytes());
    bytes.extend_from_slice(&[0x02, 0x3f, 0, 0]);
    let d = PayloadDecoder::new(&registry).decode_by_id(TypeId(300), le(&bytes), 0);
    assert_eq!(d.end_offset(), Some(bytes.len()));
    assert_eq!(int(&d, "Settings.a"), Some(-5));
}

#[test]
fn test_mutable_member_prefers_base_mapping() {
    let mut registry = mutable_registry();
    registry.register_type(
        TypeDescriptor::structure(TypeId(301), "Derived", Vec::new())
            .with_base(TypeId(300))
            .with_extensibility(Extensibility::Mutable),
    );
    registry.register_mutable_member(TypeId(301), 1, TypeId(tags::INT16), "shadowed");
    registry.register_mutable_member(TypeId(301), 5, TypeId(tags::BYTE), "own");

    let mut bytes = vec![0x01, 0, 0x04, 0, 0x0b, 0, 0, 0];
    bytes.extend_from_slice(&[0x05, 0, 0x01, 0, 0xee, 0, 0, 0]);
    bytes.extend_from_slice(&[0x02, 0x3f, 0, 0]);
    let d = PayloadDecoder::new(&registry).decode_by_id(TypeId(301), le(&bytes), 0);

    assert_eq!(d.end_offset(), Some(20));
    assert_eq!(int(&d, "Derived.a"), Some(11));
    assert!(d.find("Derived.shadowed").is_none());
    assert_eq!(int(&d, "Derived.own"), Some(0xee));
}

#[test]
fn test_mutable_member_length_past_end() {
    let registry = mutable_registry();
    let bytes = [0x01, 0, 0x40, 0, 0, 0, 0, 0];
    let d = PayloadDecoder::new(&registry).decode_by_id(TypeId(300), le(&bytes), 0);
    assert!(matches!(
        d.error(),
        Some(DissectError::MalformedLength {
            what: "member length",
            ..
        })
    ));
}

#[test]
fn test_union_branch_then_default() {
    let registry = union_registry();
    let decoder = PayloadDecoder::new(&registry);

    let mut bytes = vec![0x01, 0, 0, 0, 0, 0, 0, 0];
    bytes.extend_from_slice(&(-1.25f64).to_le_bytes());
    let d = decoder.decode_by_id(TypeId(200), le(&bytes), 0);
    assert_eq!(d.end_offset(), Some(16));
    assert_eq!(
        d.find("Choice.reading").and_then(DecodedNode::as_value),
        Some(&FieldValue::Float64(-1.25))
    );
    assert!(d.find("Choice.code").is_none());

    let d = decoder.decode_by_id(TypeId(200), le(&[0x05, 0, 0, 0, 0x2a, 0]), 0);
    assert_eq!(d.end_offset(), Some(6));
    assert_eq!(int(&d, "Choice.discriminator"), Some(5));
    assert_eq!(int(&d, "Choice.code"), Some(42));
    assert!(d.find("Choice.reading").is_none());
}

#[test]
fn test_union_without_matching_branch() {
    let mut registry = TypeRegistry::new();
    registry.register_type(TypeDescriptor::union(TypeId(201), "Sparse"));
    registry.register_union_discriminator(TypeId(201), TypeId(tags::ENUMERATION));
    registry.register_union_branch(TypeId(201), 0, TypeId(tags::INT32), "zero");

    let d = PayloadDecoder::new(&registry).decode_by_id(TypeId(201), le(&[3, 0, 0, 0]), 0);
    assert_eq!(d.end_offset(), Some(4));
    assert_eq!(
        d.find("Sparse.discriminator").and_then(DecodedNode::as_value),
        Some(&FieldValue::Enum(3))
    );
    assert_eq!(
        d.diagnostics(),
        vec![&Diagnostic::UnresolvedUnionBranch {
            union_type_id: TypeId(201),
            discriminator: 3,
        }]
    );
}

#[test]
fn test_union_discriminator_problems() {
    let mut registry = TypeRegistry::new();
    registry.register_type(TypeDescriptor::union(TypeId(210), "Short"));
    registry.register_union_discriminator(TypeId(210), TypeId(tags::INT16));
    registry.register_type(TypeDescriptor::union(TypeId(211), "Orphan"));
    let decoder = PayloadDecoder::new(&registry);

    let d = decoder.decode_by_id(TypeId(210), le(&[1, 0, 0, 0]), 0);
    assert_eq!(d.end_offset(), Some(0));
    assert!(matches!(
        d.diagnostics()[0],
        Diagnostic::UnsupportedDiscriminator { .. }
    ));

    let d = decoder.decode_by_id(TypeId(211), le(&[1, 0, 0, 0]), 0);
    assert_eq!(d.end_offset(), Some(0));
    assert_eq!(
        d.diagnostics(),
        vec![&Diagnostic::UnresolvedUnionDiscriminator {
            union_type_id: TypeId(211)
        }]
    );
}

#[test]
fn test_unknown_kind_advances_zero() {
    let registry = TypeRegistry::new();
    let bytes = [0u8; 8];
    let d = PayloadDecoder::new(&registry).decode_by_id(TypeId(0xdead), le(&bytes), 3);
    assert_eq!(d.end_offset(), Some(3));
    assert_eq!(
        d.diagnostics(),
        vec![&Diagnostic::UnknownMemberKind { tag: 0xdead }]
    );
}

#[test]
fn test_unregistered_aggregate_is_unresolved() {
    let registry = TypeRegistry::new();
    let desc = TypeDescriptor::structure(
        TypeId(110),
        "Holder",
        vec![
            MemberDescriptor::new(TypeId(tags::STRUCTURE), "inner", 0),
            MemberDescriptor::new(TypeId(tags::UINT16), "after", 1),
        ],
    );
    let d = PayloadDecoder::new(&registry).decode_root(&desc, le(&[9, 0]), 0);
    assert_eq!(d.end_offset(), Some(2));
    assert_eq!(int(&d, "Holder.after"), Some(9));
    assert!(matches!(
        d.diagnostics()[0],
        Diagnostic::UnresolvedType { .. }
    ));
}

#[test]
fn test_alias_array_string() {
    let mut registry = TypeRegistry::new();
    registry.register_type(TypeDescriptor::alias(TypeId(400), "Meters", TypeId(tags::FLOAT32)));
    registry.register_type(TypeDescriptor::array(TypeId(401), "Triple", TypeId(tags::UINT16), 3));
    let desc = TypeDescriptor::structure(
        TypeId(402),
        "Reading",
        vec![
            MemberDescriptor::new(TypeId(400), "distance", 0),
            MemberDescriptor::new(TypeId(401), "ids", 1),
            MemberDescriptor::new(TypeId(tags::STRING), "label", 2),
        ],
    );
    let mut bytes = 0.5f32.to_le_bytes().to_vec();
    bytes.extend_from_slice(&[1, 0, 2, 0, 3, 0, 0, 0]); // ids + padding
    bytes.extend_from_slice(&[6, 0, 0, 0]);
    bytes.extend_from_slice(b"hello\0");

    let d = PayloadDecoder::new(&registry).decode_root(&desc, le(&bytes), 0);
    assert_eq!(d.end_offset(), Some(bytes.len()));
    assert_eq!(
        d.find("Reading.distance").and_then(DecodedNode::as_value),
        Some(&FieldValue::Float32(0.5))
    );
    assert_eq!(int(&d, "Reading.ids.ids[2]"), Some(3));
    assert_eq!(
        d.find("Reading.label")
            .and_then(DecodedNode::as_value)
            .and_then(FieldValue::as_str),
        Some("hello")
    );
}

#[test]
fn test_optional_member_absent_and_present() {
    let desc = TypeDescriptor::structure(
        TypeId(500),
        "Opt",
        vec![
            MemberDescriptor::new(TypeId(tags::INT32), "a", 1),
            MemberDescriptor::new(TypeId(tags::INT32), "maybe", 2).with_flags(MemberFlags::OPTIONAL),
            MemberDescriptor::new(TypeId(tags::INT16), "c", 3),
        ],
    );
    let registry = TypeRegistry::new();
    let decoder = PayloadDecoder::new(&registry);

    let d = decoder.decode_root(&desc, le(&[1, 0, 0, 0, 3, 0]), 0);
    assert_eq!(d.end_offset(), Some(6));
    assert!(d.find("Opt.maybe").is_none());
    assert_eq!(int(&d, "Opt.c"), Some(3));

    let bytes = [1, 0, 0, 0, 0x02, 0, 0x04, 0, 0x63, 0, 0, 0, 3, 0];
    let d = decoder.decode_root(&desc, le(&bytes), 0);
    assert_eq!(d.end_offset(), Some(14));
    assert_eq!(int(&d, "Opt.maybe"), Some(99));
    assert_eq!(int(&d, "Opt.c"), Some(3));
}

#[test]
fn test_base_struct_fields_come_first() {
    let mut registry = TypeRegistry::new();
    registry.register_type(TypeDescriptor::structure(
        TypeId(800),
        "Base",
        vec![MemberDescriptor::new(TypeId(tags::UINT32), "id", 0)],
    ));
    let derived = TypeDescriptor::structure(
        TypeId(801),
        "Derived",
        vec![MemberDescriptor::new(TypeId(tags::FLOAT64), "v", 1)],
    )
    .with_base(TypeId(800));
    let mut bytes = vec![7, 0, 0, 0, 0, 0, 0, 0];
    bytes.extend_from_slice(&3.0f64.to_le_bytes());

    let d = PayloadDecoder::new(&registry).decode_root(&derived, le(&bytes), 0);
    assert_eq!(d.end_offset(), Some(16));
    let names: Vec<_> = d.nodes[0].children().iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["id", "v"]);
}

#[test]
fn test_long_double_and_big_endian() {
    let desc = TypeDescriptor::structure(
        TypeId(900),
        "Wide",
        vec![
            MemberDescriptor::new(TypeId(tags::BOOLEAN), "flag", 0),
            MemberDescriptor::new(TypeId(tags::FLOAT128), "ld", 1),
            MemberDescriptor::new(TypeId(tags::INT64), "big", 2),
        ],
    );
    let mut bytes = vec![1u8];
    bytes.resize(16, 0);
    bytes.extend_from_slice(&[0xab; 16]);
    bytes.extend_from_slice(&(-2i64).to_be_bytes());
    let registry = TypeRegistry::new();
    let buffer = CdrBuffer::new(&bytes, ByteOrder::BigEndian);
    let d = PayloadDecoder::new(&registry).decode_root(&desc, buffer, 0);

    assert_eq!(d.end_offset(), Some(40));
    assert_eq!(
        d.find("Wide.ld").and_then(DecodedNode::as_value),
        Some(&FieldValue::LongDouble([0xab; 16]))
    );
    assert_eq!(int(&d, "Wide.big"), Some(-2));
    assert_eq!(
        d.find("Wide.flag").and_then(DecodedNode::as_value),
        Some(&FieldValue::Bool(true))
    );
}

#[test]
fn test_truncated_buffer_keeps_partial_tree() {
    let registry = TypeRegistry::new();
    let d = PayloadDecoder::new(&registry).decode_root(&point(), le(&[1, 0, 0, 0, 2, 0]), 0);
    assert!(matches!(
        d.error(),
        Some(DissectError::TruncatedBuffer { offset: 4, .. })
    ));
    assert_eq!(int(&d, "Point.x"), Some(1));
    assert!(d.find("Point.y").is_none());
    assert_eq!(d.nodes[0].length, 4);
}

#[test]
fn test_offset_at_end_of_address_space_is_truncated() {
    let mut registry = TypeRegistry::new();
    registry.register_type(
        TypeDescriptor::structure(TypeId(700), "Opts", Vec::new())
            .with_extensibility(Extensibility::Mutable),
    );
    let bytes = [0u8; 8];
    let point = point();
    let decoder = PayloadDecoder::new(&registry);
    for target in [TypeRef::Resolved(&point), TypeRef::ById(TypeId(700))] {
        let d = decoder.decode(target, le(&bytes), usize::MAX - 1, 0);
        assert!(
            matches!(d.error(), Some(DissectError::TruncatedBuffer { .. })),
            "{:?}",
            d.outcome
        );
    }
}

#[test]
fn test_cyclic_type_hits_recursion_limit() {
    let mut registry = TypeRegistry::new();
    registry.register_type(TypeDescriptor::structure(
        TypeId(600),
        "Loop",
        vec![MemberDescriptor::new(TypeId(600), "again", 0)],
    ));
    let config = DecoderConfig::default().with_max_depth(8);
    let d = PayloadDecoder::with_config(&registry, config).decode_by_id(TypeId(600), le(&[]), 0);
    assert!(matches!(
        d.error(),
        Some(DissectError::RecursionLimitExceeded { .. })
    ));

    // A struct deriving from itself loops through the base chain.
    registry.register_type(
        TypeDescriptor::structure(TypeId(601), "SelfBase", Vec::new()).with_base(TypeId(601)),
    );
    let d = PayloadDecoder::with_config(&registry, config).decode_by_id(TypeId(601), le(&[]), 0);
    assert!(matches!(
        d.error(),
        Some(DissectError::RecursionLimitExceeded { .. })
    ));
}

#[test]
fn test_attacker_sized_sequences() {
    let mut registry = TypeRegistry::new();
    registry.register_type(TypeDescriptor::structure(TypeId(700), "Empty", Vec::new()));
    registry.register_type(TypeDescriptor::sequence(TypeId(701), "empties", TypeId(700)));
    registry.register_type(TypeDescriptor::sequence(TypeId(702), "ints", TypeId(tags::INT32)));
    let config = DecoderConfig::default().with_max_steps(1000);
    let decoder = PayloadDecoder::with_config(&registry, config);

    let d = decoder.decode_by_id(TypeId(701), le(&[0xff, 0xff, 0xff, 0xff]), 0);
    assert_eq!(d.error(), Some(&DissectError::BudgetExceeded { steps: 1000 }));

    let d = decoder.decode_by_id(TypeId(702), le(&[0xe8, 0x03, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0]), 0);
    assert_eq!(
        d.error(),
        Some(&DissectError::MalformedLength {
            offset: 4,
            declared: 1000,
            available: 8,
            what: "sequence length",
        })
    );
}

#[test]
fn test_displayed_elements_capped() {
    let mut registry = TypeRegistry::new();
    registry.register_type(TypeDescriptor::sequence(TypeId(710), "bytes", TypeId(tags::BYTE)));
    let config = DecoderConfig::default().with_max_displayed_elements(2);
    let bytes = [5, 0, 0, 0, 1, 2, 3, 4, 5];
    let d = PayloadDecoder::with_config(&registry, config).decode_by_id(TypeId(710), le(&bytes), 0);

    assert_eq!(d.end_offset(), Some(9));
    assert_eq!(d.nodes[0].children().len(), 3);
    assert_eq!(
        d.diagnostics(),
        vec![&Diagnostic::ElementsTruncated { shown: 2, total: 5 }]
    );
}

#[test]
fn test_struct_member_cap_applies_at_decode() {
    let desc = TypeDescriptor::structure(
        TypeId(720),
        "Wide",
        (0..4)
            .map(|i| MemberDescriptor::new(TypeId(tags::BYTE), format!("b{i}"), i))
            .collect(),
    );
    let registry = TypeRegistry::new();
    let config = DecoderConfig::default().with_max_struct_members(2);
    let d = PayloadDecoder::with_config(&registry, config).decode_root(&desc, le(&[1, 2, 3, 4]), 0);
    assert_eq!(d.end_offset(), Some(2));
}

#[test]
fn test_random_buffers_never_panic() {
    let mut registry = union_registry();
    registry.register_type(point());
    registry.register_type(
        TypeDescriptor::structure(TypeId(300), "Settings", Vec::new())
            .with_extensibility(Extensibility::Mutable),
    );
    registry.register_mutable_member(TypeId(300), 1, TypeId(101), "nested");
    registry.register_type(TypeDescriptor::sequence(TypeId(101), "values", TypeId(200)));
    registry.register_type(TypeDescriptor::sequence(TypeId(102), "strings", TypeId(tags::STRING)));
    let config = DecoderConfig::default().with_max_steps(10_000);
    let decoder = PayloadDecoder::with_config(&registry, config);

    let mut rng = fastrand::Rng::with_seed(0xd15ec7);
    for _ in 0..2_000 {
        let len = rng.usize(0..64);
        let bytes: Vec<u8> = (0..len).map(|_| rng.u8(..)).collect();
        for id in [100u64, 101, 102, 200, 300] {
            let d = decoder.decode_by_id(TypeId(id), le(&bytes), 0);
            if let Some(end) = d.end_offset() {
                assert!(end <= bytes.len());
            }
        }
    }
}

#[test]
fn test_concurrent_registry_parallel_decode() {
    let registry = Arc::new(ConcurrentTypeRegistry::new());
    registry.register_type(point());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                let bytes = [i as u8, 0, 0, 0, 2, 0, 0, 0];
                let d = PayloadDecoder::new(&*registry).decode_by_id(TypeId(100), le(&bytes), 0);
                assert_eq!(int(&d, "Point.x"), Some(i));
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}
