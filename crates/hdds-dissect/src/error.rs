// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fatal decode errors.
//!
//! Every variant aborts the current top-level decode only. Registry misses and
//! unknown kinds are not errors: they surface as
//! [`Diagnostic`](crate::payload::Diagnostic) nodes in the output tree.

use std::fmt;

/// Error raised while dissecting a single payload or typecode blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DissectError {
    /// A read would run past the end of the buffer.
    TruncatedBuffer {
        offset: usize,
        needed: usize,
        available: usize,
    },
    /// A declared length or count cannot fit in the remaining buffer.
    MalformedLength {
        offset: usize,
        declared: u64,
        available: usize,
        what: &'static str,
    },
    /// The type graph nests deeper than the configured limit (cyclic types).
    RecursionLimitExceeded { depth: usize },
    /// The decode exceeded its step budget (attacker-sized collections).
    BudgetExceeded { steps: usize },
    /// The serialized payload carries an encapsulation id we cannot decode.
    InvalidEncapsulation { id: u16 },
}

impl fmt::Display for DissectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedBuffer {
                offset,
                needed,
                available,
            } => write!(
                f,
                "truncated buffer at offset {}: need {} bytes, have {}",
                offset, needed, available
            ),
            Self::MalformedLength {
                offset,
                declared,
                available,
                what,
            } => write!(
                f,
                "malformed {} at offset {}: declared {}, only {} bytes remain",
                what, offset, declared, available
            ),
            Self::RecursionLimitExceeded { depth } => {
                write!(f, "type nesting exceeds recursion limit ({})", depth)
            }
            Self::BudgetExceeded { steps } => {
                write!(f, "decode step budget exhausted after {} steps", steps)
            }
            Self::InvalidEncapsulation { id } => {
                write!(f, "unsupported encapsulation id {:#06x}", id)
            }
        }
    }
}

impl std::error::Error for DissectError {}

pub type DissectResult<T> = core::result::Result<T, DissectError>;
