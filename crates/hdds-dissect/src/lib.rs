// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # hdds-dissect - Type-driven RTPS payload dissector
//!
//! Decodes captured RTPS serialized data against runtime type descriptors,
//! and renders legacy CDR typecodes found in discovery parameter lists.
//!
//! ## Quick Start
//!
//! ```rust
//! use hdds_dissect::config::DecoderConfig;
//! use hdds_dissect::registry::{tags, MemberDescriptor, TypeDescriptor, TypeId, TypeRegistry};
//! use hdds_dissect::dissect_serialized_data;
//!
//! let mut registry = TypeRegistry::new();
//! registry.register_type(TypeDescriptor::structure(
//!     TypeId(100),
//!     "Point",
//!     vec![
//!         MemberDescriptor::new(TypeId(tags::INT32), "x", 0),
//!         MemberDescriptor::new(TypeId(tags::INT32), "y", 1),
//!     ],
//! ));
//!
//! // CDR_LE header, then x = 1, y = 2
//! let data = [0x00, 0x01, 0x00, 0x00, 1, 0, 0, 0, 2, 0, 0, 0];
//! let dissection =
//!     dissect_serialized_data(&data, 0, TypeId(100), &registry, &DecoderConfig::default());
//! assert_eq!(dissection.end_offset(), Some(12));
//! print!("{}", dissection.render());
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |  encapsulation (serialized data)   |  param (parameter lists) |
//! +------------------------------------+--------------------------+
//! |  payload (registry-driven decoder) |  typecode (declarations) |
//! +------------------------------------+--------------------------+
//! |  registry (descriptors, union and mutable-member tables)      |
//! +---------------------------------------------------------------+
//! |  codec (byte order, CDR alignment, bounds-checked reads)      |
//! +---------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`codec`] - primitive reads and the CDR alignment rule
//! - [`registry`] - type descriptors and lookup tables
//! - [`payload`] - recursive value decoder and its output tree
//! - [`typecode`] - legacy typecode declarations
//! - [`encapsulation`] / [`param`] - entry points used by the submessage layer
//!
//! ## Features
//!
//! - `registry-loaders` (default): load registries from YAML documents

/// Primitive CDR codec (byte order, alignment, scalar reads).
pub mod codec;
/// Protocol constants and decoder limits.
pub mod config;
/// Serialized-data encapsulation header and payload entry point.
pub mod encapsulation;
/// Fatal decode errors.
pub mod error;
/// Parameter-list walker and typecode parameters.
pub mod param;
/// Generic registry-driven payload decoder.
pub mod payload;
/// Type registry and lookup tables.
pub mod registry;
/// Legacy CDR typecode decoder.
pub mod typecode;

pub use config::DecoderConfig;
pub use encapsulation::dissect_serialized_data;
pub use error::{DissectError, DissectResult};
pub use param::decode_typecode_parameters;
pub use payload::{DecodedNode, Diagnostic, Dissection, FieldValue, PayloadDecoder, TypeRef};
pub use registry::{ConcurrentTypeRegistry, TypeId, TypeLookup, TypeRegistry};
pub use typecode::{decode_typecode, TypecodeDeclaration};
