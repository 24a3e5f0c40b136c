// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dissector configuration and protocol constants.
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: wire constants (PIDs, member-header ids, limits)
//! - **Level 2 (Dynamic)**: [`DecoderConfig`] sanity limits, overridable from
//!   the environment
//!
//! # Example
//!
//! ```
//! use hdds_dissect::config::DecoderConfig;
//!
//! let config = DecoderConfig::default()
//!     .with_max_depth(32)
//!     .with_max_displayed_elements(16);
//! assert_eq!(config.max_depth, 32);
//! ```

// =======================================================================
// Parameter list (RTPS v2.5 Sec.9.4.2.11)
// =======================================================================

/// Padding parameter, value ignored.
pub const PID_PAD: u16 = 0x0000;

/// End of a parameter list.
pub const PID_SENTINEL: u16 = 0x0001;

/// Legacy typecode (RTPS 2.x standard id).
pub const PID_TYPECODE_RTPS2: u16 = 0x0047;

/// Vendor typecode (RTI Connext).
pub const PID_TYPECODE: u16 = 0x8004;

// =======================================================================
// PL_CDR member headers (XTypes v1.3 Sec.7.4.1.2.1)
// =======================================================================

/// Mask extracting the member id from a short member header.
pub const MEMBER_ID_MASK: u16 = 0x3fff;

/// Short header escape: a 4-byte id and 4-byte length follow.
pub const PID_EXTENDED: u16 = 0x3f01;

/// End of a mutable member list.
pub const PID_LIST_END: u16 = 0x3f02;

/// Mask applied to the 32-bit id of an extended member header.
pub const EXTENDED_MEMBER_ID_MASK: u32 = 0x0fff_ffff;

// =======================================================================
// Sanity limits (defaults)
// =======================================================================

/// Default maximum type nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default per-decode step budget (one step per value visited).
pub const DEFAULT_MAX_STEPS: usize = 1_000_000;

/// Default struct member cap applied at registration and decode time.
pub const DEFAULT_MAX_STRUCT_MEMBERS: usize = 100;

/// Default typecode array dimension cap.
pub const DEFAULT_MAX_ARRAY_DIMENSIONS: usize = 10;

/// Default number of collection elements attached to the output tree.
pub const DEFAULT_MAX_DISPLAYED_ELEMENTS: usize = 100;

/// Limits applied by the payload and typecode decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Maximum recursion depth before `RecursionLimitExceeded`.
    pub max_depth: usize,
    /// Maximum values visited by one top-level decode.
    pub max_steps: usize,
    /// Struct members beyond this count are ignored.
    pub max_struct_members: usize,
    /// Typecode array dimensions beyond this count are ignored.
    pub max_array_dimensions: usize,
    /// Collection elements beyond this count are decoded but not attached.
    pub max_displayed_elements: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderConfig {
    /// Configuration with the default limits.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_steps: DEFAULT_MAX_STEPS,
            max_struct_members: DEFAULT_MAX_STRUCT_MEMBERS,
            max_array_dimensions: DEFAULT_MAX_ARRAY_DIMENSIONS,
            max_displayed_elements: DEFAULT_MAX_DISPLAYED_ELEMENTS,
        }
    }

    #[must_use]
    pub const fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    #[must_use]
    pub const fn with_max_steps(mut self, steps: usize) -> Self {
        self.max_steps = steps;
        self
    }

    #[must_use]
    pub const fn with_max_struct_members(mut self, members: usize) -> Self {
        self.max_struct_members = members;
        self
    }

    #[must_use]
    pub const fn with_max_array_dimensions(mut self, dimensions: usize) -> Self {
        self.max_array_dimensions = dimensions;
        self
    }

    #[must_use]
    pub const fn with_max_displayed_elements(mut self, elements: usize) -> Self {
        self.max_displayed_elements = elements;
        self
    }

    /// Create from environment variables.
    ///
    /// Checks:
    /// - `HDDS_DISSECT_MAX_DEPTH` - recursion limit
    /// - `HDDS_DISSECT_MAX_STEPS` - step budget
    /// - `HDDS_DISSECT_MAX_ELEMENTS` - displayed collection elements
    ///
    /// Unparsable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(depth) = env_usize("HDDS_DISSECT_MAX_DEPTH") {
            config.max_depth = depth;
        }
        if let Some(steps) = env_usize("HDDS_DISSECT_MAX_STEPS") {
            config.max_steps = steps;
        }
        if let Some(elements) = env_usize("HDDS_DISSECT_MAX_ELEMENTS") {
            config.max_displayed_elements = elements;
        }

        config
    }
}

fn env_usize(name: &str) -> Option<usize> {
    let value = std::env::var(name).ok()?;
    match value.trim().parse::<usize>() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("[config] ignoring {}={:?}: not an unsigned integer", name, value);
            None
        }
    }
}
