// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dissection throughput
//!
//! Measures registry-driven decoding of a nested sample with a large
//! sequence, and a mutable struct walked member by member.

#![allow(clippy::cast_possible_truncation)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hdds_dissect::registry::{tags, Extensibility, MemberDescriptor, TypeDescriptor};
use hdds_dissect::{dissect_serialized_data, DecoderConfig, TypeId, TypeRegistry};

const TRACK: TypeId = TypeId(200);
const POINT: TypeId = TypeId(201);
const POINTS: TypeId = TypeId(202);
const SETTINGS: TypeId = TypeId(210);

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register_type(TypeDescriptor::structure(
        POINT,
        "Point",
        vec![
            MemberDescriptor::new(TypeId(tags::FLOAT64), "x", 0),
            MemberDescriptor::new(TypeId(tags::FLOAT64), "y", 1),
        ],
    ));
    registry.register_type(TypeDescriptor::sequence(POINTS, "Points", POINT));
    registry.register_type(TypeDescriptor::structure(
        TRACK,
        "Track",
        vec![
            MemberDescriptor::new(TypeId(tags::UINT32), "id", 0),
            MemberDescriptor::new(TypeId(tags::STRING), "label", 1),
            MemberDescriptor::new(POINTS, "points", 2),
        ],
    ));
    registry.register_type(
        TypeDescriptor::structure(SETTINGS, "Settings", Vec::new())
            .with_extensibility(Extensibility::Mutable),
    );
    for id in 0..32u32 {
        registry.register_mutable_member(SETTINGS, id, TypeId(tags::UINT32), format!("m{}", id));
    }
    registry
}

fn track_sample(points: u32) -> Vec<u8> {
    let mut data = vec![0x00, 0x01, 0x00, 0x00];
    data.extend_from_slice(&7u32.to_le_bytes());
    data.extend_from_slice(&6u32.to_le_bytes());
    data.extend_from_slice(b"radar\0");
    data.extend_from_slice(&[0, 0]);
    data.extend_from_slice(&points.to_le_bytes());
    data.extend_from_slice(&[0; 4]);
    for i in 0..points {
        data.extend_from_slice(&f64::from(i).to_le_bytes());
        data.extend_from_slice(&(-f64::from(i)).to_le_bytes());
    }
    data
}

fn settings_sample() -> Vec<u8> {
    let mut data = vec![0x00, 0x03, 0x00, 0x00];
    for id in 0..32u16 {
        data.extend_from_slice(&id.to_le_bytes());
        data.extend_from_slice(&4u16.to_le_bytes());
        data.extend_from_slice(&u32::from(id).to_le_bytes());
    }
    data.extend_from_slice(&[0x02, 0x3f, 0x00, 0x00]);
    data
}

fn bench_nested_sequence(c: &mut Criterion) {
    let registry = registry();
    let config = DecoderConfig::default();
    let data = track_sample(1000);

    c.bench_function("dissect_track_1000_points", |b| {
        b.iter(|| {
            let d = dissect_serialized_data(black_box(&data), 0, TRACK, &registry, &config);
            black_box(d.end_offset())
        });
    });
}

fn bench_mutable_struct(c: &mut Criterion) {
    let registry = registry();
    let config = DecoderConfig::default();
    let data = settings_sample();

    c.bench_function("dissect_mutable_32_members", |b| {
        b.iter(|| {
            let d = dissect_serialized_data(black_box(&data), 0, SETTINGS, &registry, &config);
            black_box(d.nodes.len())
        });
    });
}

criterion_group!(benches, bench_nested_sequence, bench_mutable_struct);
criterion_main!(benches);
