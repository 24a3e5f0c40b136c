// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use hdds_dissect::codec::{ByteOrder, CdrBuffer};
use hdds_dissect::{decode_typecode_parameters, DecoderConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First byte picks the byte order, the rest is the parameter list
    let Some((&flag, list)) = data.split_first() else {
        return;
    };
    let order = if flag & 1 == 0 {
        ByteOrder::BigEndian
    } else {
        ByteOrder::LittleEndian
    };
    let _ = decode_typecode_parameters(CdrBuffer::new(list, order), 0, &DecoderConfig::default());
});
