// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generic payload decoder.
//!
//! Walks a type descriptor from the registry and decodes one value of that
//! type from a CDR buffer, producing a tree of [`DecodedNode`]s. Structs,
//! unions, sequences, arrays and aliases recurse; unions and mutable structs
//! consult the registry side tables at decode time.
//!
//! Registry misses never abort a decode: they become [`Diagnostic`] nodes.
//! Truncated or inconsistent buffers, runaway nesting and exhausted step
//! budgets abort the current decode, keeping what was decoded so far.
//!
//! # Example
//!
//! ```
//! use hdds_dissect::codec::{ByteOrder, CdrBuffer};
//! use hdds_dissect::payload::{FieldValue, PayloadDecoder};
//! use hdds_dissect::registry::{tags, MemberDescriptor, TypeDescriptor, TypeId, TypeRegistry};
//!
//! let point = TypeDescriptor::structure(
//!     TypeId(100),
//!     "Point",
//!     vec![
//!         MemberDescriptor::new(TypeId(tags::INT32), "x", 0),
//!         MemberDescriptor::new(TypeId(tags::INT32), "y", 1),
//!     ],
//! );
//! let registry = TypeRegistry::new();
//! let bytes = [1, 0, 0, 0, 2, 0, 0, 0];
//! let buffer = CdrBuffer::new(&bytes, ByteOrder::LittleEndian);
//!
//! let dissection = PayloadDecoder::new(&registry).decode_root(&point, buffer, 0);
//! assert_eq!(dissection.end_offset(), Some(8));
//! assert_eq!(
//!     dissection.find("Point.y").and_then(|n| n.as_value()),
//!     Some(&FieldValue::Int32(2))
//! );
//! ```

mod decoder;
mod tree;

#[cfg(test)]
mod tests;

pub use decoder::{PayloadDecoder, TypeRef};
pub use tree::{DecodedNode, Diagnostic, Dissection, FieldValue, NodeContent};
