// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use hdds_dissect::codec::{ByteOrder, CdrBuffer};
use hdds_dissect::{decode_typecode, DecoderConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let config = DecoderConfig::default();
    for order in [ByteOrder::BigEndian, ByteOrder::LittleEndian] {
        let _ = decode_typecode(CdrBuffer::new(data, order), 0, 0, &config);
    }
});
