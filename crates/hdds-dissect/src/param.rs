// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Parameter-list walker and typecode extraction.
//!
//! A parameter list is a run of `{pid: u16, length: u16, value}` entries in
//! the payload byte order, terminated by PID_SENTINEL. Only the typecode
//! parameters are interpreted here.

use crate::codec::CdrBuffer;
use crate::config::{DecoderConfig, PID_PAD, PID_SENTINEL, PID_TYPECODE, PID_TYPECODE_RTPS2};
use crate::error::{DissectError, DissectResult};
use crate::typecode::{decode_typecode, TypecodeDeclaration};

/// One parameter of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    pub pid: u16,
    /// Offset of the value (after the 4-byte header).
    pub offset: usize,
    pub length: usize,
}

impl Parameter {
    pub const fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Iterates parameters until PID_SENTINEL or the end of the buffer.
///
/// Yields `Err` once on a truncated header or an overlong value, then stops.
pub struct ParameterListIter<'a> {
    buffer: CdrBuffer<'a>,
    offset: usize,
    done: bool,
}

impl<'a> ParameterListIter<'a> {
    pub fn new(buffer: CdrBuffer<'a>, offset: usize) -> Self {
        Self {
            buffer,
            offset,
            done: false,
        }
    }

    /// Offset of the next parameter header (after the sentinel once finished).
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn next_parameter(&mut self) -> DissectResult<Option<Parameter>> {
        let pid = self.buffer.u16_at(self.offset)?;
        let length = self.buffer.u16_at(self.offset + 2)? as usize;
        let value = self.offset + 4;
        self.offset = value;
        if pid == PID_SENTINEL {
            return Ok(None);
        }
        let available = self.buffer.remaining(value);
        if length > available {
            return Err(DissectError::MalformedLength {
                offset: value - 2,
                declared: length as u64,
                available,
                what: "parameter length",
            });
        }
        self.offset = value + length;
        Ok(Some(Parameter {
            pid,
            offset: value,
            length,
        }))
    }
}

impl Iterator for ParameterListIter<'_> {
    type Item = DissectResult<Parameter>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.buffer.len() {
            return None;
        }
        match self.next_parameter() {
            Ok(Some(param)) => Some(Ok(param)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Decode every typecode parameter of the list starting at `offset`.
///
/// Other parameters are skipped. Each typecode aligns relative to the start
/// of its parameter value.
pub fn decode_typecode_parameters(
    buffer: CdrBuffer<'_>,
    offset: usize,
    config: &DecoderConfig,
) -> DissectResult<Vec<TypecodeDeclaration>> {
    let mut declarations = Vec::new();
    for param in ParameterListIter::new(buffer, offset) {
        let param = param?;
        match param.pid {
            PID_TYPECODE | PID_TYPECODE_RTPS2 => {
                let decl = decode_typecode(buffer, param.offset, param.offset, config)?;
                if decl.end_offset > param.end() {
                    log::warn!(
                        "[param] typecode at {} spans {} bytes, parameter holds {}",
                        param.offset,
                        decl.consumed,
                        param.length
                    );
                }
                declarations.push(decl);
            }
            PID_PAD => {}
            pid => log::trace!("[param] skipping pid {:#06x} ({} bytes)", pid, param.length),
        }
    }
    Ok(declarations)
}
