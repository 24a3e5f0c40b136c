// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Serialized-payload encapsulation header and the payload entry point.
//!
//! Serialized data starts with a 4-byte header: a big-endian encapsulation
//! id (RTPS v2.5 Sec.10.2) followed by 2 option bytes. CDR alignment of the
//! payload is measured from the first byte after the header.

use crate::codec::{ByteOrder, CdrBuffer};
use crate::config::DecoderConfig;
use crate::error::{DissectError, DissectResult};
use crate::payload::{DecodedNode, Dissection, FieldValue, PayloadDecoder};
use crate::registry::{TypeId, TypeLookup};

/// Plain CDR, big-endian.
pub const CDR_BE: u16 = 0x0000;
/// Plain CDR, little-endian.
pub const CDR_LE: u16 = 0x0001;
/// Parameter list, big-endian.
pub const PL_CDR_BE: u16 = 0x0002;
/// Parameter list, little-endian.
pub const PL_CDR_LE: u16 = 0x0003;
pub const CDR2_BE: u16 = 0x0006;
pub const CDR2_LE: u16 = 0x0007;
pub const D_CDR2_BE: u16 = 0x0008;
pub const D_CDR2_LE: u16 = 0x0009;
pub const PL_CDR2_BE: u16 = 0x000a;
pub const PL_CDR2_LE: u16 = 0x000b;

/// FastDDS vendor-flagged PL_CDR_LE.
pub const PL_CDR_LE_VENDOR: u16 = 0x8001;
/// FastDDS vendor-flagged PL_CDR_BE.
pub const PL_CDR_BE_VENDOR: u16 = 0x8002;

/// Size of the encapsulation header.
pub const ENCAPSULATION_HEADER_SIZE: usize = 4;

/// Encoding family named by an encapsulation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncapsulationKind {
    Cdr,
    ParameterList,
    Cdr2,
    DelimitedCdr2,
    ParameterListCdr2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncapsulationHeader {
    pub id: u16,
    pub kind: EncapsulationKind,
    pub order: ByteOrder,
    pub options: u16,
}

impl EncapsulationHeader {
    /// Classify an encapsulation id.
    ///
    /// The low bit of every known id selects little-endian.
    pub const fn classify(id: u16) -> Option<(EncapsulationKind, ByteOrder)> {
        use EncapsulationKind::*;
        let kind = match id {
            CDR_BE | CDR_LE => Cdr,
            PL_CDR_BE | PL_CDR_LE | PL_CDR_LE_VENDOR | PL_CDR_BE_VENDOR => ParameterList,
            CDR2_BE | CDR2_LE => Cdr2,
            D_CDR2_BE | D_CDR2_LE => DelimitedCdr2,
            PL_CDR2_BE | PL_CDR2_LE => ParameterListCdr2,
            _ => return None,
        };
        Some((kind, ByteOrder::from_little_endian_flag(id & 1 != 0)))
    }

    /// Parse the header at `offset`.
    pub fn parse(data: &[u8], offset: usize) -> DissectResult<Self> {
        let raw = CdrBuffer::new(data, ByteOrder::BigEndian);
        let id = raw.u16_at(offset)?;
        let options = raw.u16_at(offset + 2)?;
        let (kind, order) = Self::classify(id).ok_or(DissectError::InvalidEncapsulation { id })?;
        Ok(Self {
            id,
            kind,
            order,
            options,
        })
    }
}

/// Decode a serialized payload of type `type_id` starting at its
/// encapsulation header.
///
/// The header contributes two nodes (`encapsulation`, `options`) ahead of
/// the decoded value. An unknown encapsulation id aborts with
/// [`DissectError::InvalidEncapsulation`].
pub fn dissect_serialized_data<R: TypeLookup + ?Sized>(
    data: &[u8],
    offset: usize,
    type_id: TypeId,
    registry: &R,
    config: &DecoderConfig,
) -> Dissection {
    let header = match EncapsulationHeader::parse(data, offset) {
        Ok(header) => header,
        Err(e) => {
            log::debug!("[payload] serialized data at {}: {}", offset, e);
            return Dissection {
                nodes: Vec::new(),
                outcome: Err(e),
            };
        }
    };

    let body = offset + ENCAPSULATION_HEADER_SIZE;
    let buffer = CdrBuffer::new(data, header.order);
    let mut dissection = PayloadDecoder::with_config(registry, *config).decode_by_id(type_id, buffer, body);
    dissection.nodes.splice(
        0..0,
        [
            DecodedNode::value("encapsulation", offset, 2, FieldValue::UInt16(header.id)),
            DecodedNode::value("options", offset + 2, 2, FieldValue::UInt16(header.options)),
        ],
    );
    dissection
}
