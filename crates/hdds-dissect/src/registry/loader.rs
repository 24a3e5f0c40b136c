// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML registry loader.
//!
//! Lets a capture session be replayed against type information gathered
//! elsewhere (a previous discovery pass, or a hand-written description).
//!
//! # Example YAML
//!
//! ```yaml
//! types:
//!   - id: 100
//!     kind: structure
//!     name: Point
//!     members:
//!       - { name: x, type: int32, id: 0 }
//!       - { name: y, type: int32, id: 1 }
//!   - id: 101
//!     kind: sequence
//!     name: Samples
//!     base: int32
//!
//! unions:
//!   - union: 200
//!     discriminator: int32
//!     branches:
//!       - { value: 1, type: float64, name: reading }
//!     default: { type: int16, name: code }
//!
//! mutable_members:
//!   - { struct: 300, id: 1, type: uint32, name: count }
//! ```
//!
//! Type references (`type`, `base`, `discriminator`) are either numeric type
//! ids or kind names (`int32`, `float64`, ...), which map to their kind tag.

use super::{
    Extensibility, MemberDescriptor, MemberFlags, MemberKind, TypeDescriptor, TypeId,
    TypeRegistry,
};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

/// YAML registry loader.
pub struct RegistryLoader;

/// Error raised while loading a registry document.
#[derive(Debug)]
pub enum RegistryLoadError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    /// A kind or type reference names nothing we know.
    InvalidKind { context: String, value: String },
    InvalidExtensibility { context: String, value: String },
}

impl fmt::Display for RegistryLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Failed to read registry file: {}", e),
            Self::Parse(e) => write!(f, "Failed to parse registry YAML: {}", e),
            Self::InvalidKind { context, value } => {
                write!(f, "Invalid kind '{}' in {}", value, context)
            }
            Self::InvalidExtensibility { context, value } => {
                write!(f, "Invalid extensibility '{}' in {}", value, context)
            }
        }
    }
}

impl std::error::Error for RegistryLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

/// Root YAML document structure.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RegistryDocument {
    pub types: Vec<YamlType>,
    pub unions: Vec<YamlUnion>,
    pub mutable_members: Vec<YamlMutableMember>,
}

/// Numeric type id or kind name.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum YamlTypeRef {
    Id(u64),
    Name(String),
}

impl YamlTypeRef {
    fn resolve(&self, context: &str) -> Result<TypeId, RegistryLoadError> {
        match self {
            Self::Id(id) => Ok(TypeId(*id)),
            Self::Name(name) => MemberKind::from_name(name)
                .map(|kind| TypeId(kind.tag()))
                .ok_or_else(|| RegistryLoadError::InvalidKind {
                    context: context.to_string(),
                    value: name.clone(),
                }),
        }
    }
}

/// A type descriptor in YAML format.
#[derive(Debug, Deserialize)]
pub struct YamlType {
    pub id: u64,
    /// Kind name or numeric tag.
    pub kind: YamlTypeRef,
    #[serde(default)]
    pub name: String,
    /// Alias target, element type, or parent struct.
    #[serde(default)]
    pub base: Option<YamlTypeRef>,
    /// final, appendable or mutable
    #[serde(default)]
    pub extensibility: Option<String>,
    #[serde(default)]
    pub bound: u32,
    #[serde(default)]
    pub members: Vec<YamlMember>,
}

/// A struct member in YAML format.
#[derive(Debug, Deserialize)]
pub struct YamlMember {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: YamlTypeRef,
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub key: bool,
    #[serde(default)]
    pub optional: bool,
}

/// Union side-table entries for one union type.
#[derive(Debug, Deserialize)]
pub struct YamlUnion {
    pub union: u64,
    pub discriminator: YamlTypeRef,
    #[serde(default)]
    pub branches: Vec<YamlBranch>,
    #[serde(default)]
    pub default: Option<YamlDefaultBranch>,
}

#[derive(Debug, Deserialize)]
pub struct YamlBranch {
    pub value: i32,
    #[serde(rename = "type")]
    pub type_ref: YamlTypeRef,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct YamlDefaultBranch {
    #[serde(rename = "type")]
    pub type_ref: YamlTypeRef,
    pub name: String,
}

/// One mutable-member mapping.
#[derive(Debug, Deserialize)]
pub struct YamlMutableMember {
    #[serde(rename = "struct")]
    pub struct_id: u64,
    pub id: u32,
    #[serde(rename = "type")]
    pub type_ref: YamlTypeRef,
    pub name: String,
}

fn parse_extensibility(value: &str, context: &str) -> Result<Extensibility, RegistryLoadError> {
    match value.to_uppercase().as_str() {
        "FINAL" => Ok(Extensibility::Final),
        "APPENDABLE" => Ok(Extensibility::Appendable),
        "MUTABLE" => Ok(Extensibility::Mutable),
        other => Err(RegistryLoadError::InvalidExtensibility {
            context: context.to_string(),
            value: other.to_string(),
        }),
    }
}

impl YamlType {
    fn to_descriptor(&self) -> Result<TypeDescriptor, RegistryLoadError> {
        let context = format!("type {}", self.id);
        let kind = MemberKind::from_tag(self.kind.resolve(&context)?.get());
        let mut desc = TypeDescriptor::new(TypeId(self.id), kind, self.name.clone());
        if kind == MemberKind::Structure {
            desc.extensibility = Extensibility::Final;
        }
        if let Some(ref base) = self.base {
            desc = desc.with_base(base.resolve(&context)?);
        }
        if let Some(ref ext) = self.extensibility {
            desc.extensibility = parse_extensibility(ext, &context)?;
        }
        desc.bound = self.bound;
        for member in &self.members {
            let member_context = format!("{} member {}", context, member.name);
            let mut flags = MemberFlags::empty();
            if member.key {
                flags = flags.union(MemberFlags::KEY);
            }
            if member.optional {
                flags = flags.union(MemberFlags::OPTIONAL);
            }
            desc.elements.push(
                MemberDescriptor::new(
                    member.type_ref.resolve(&member_context)?,
                    member.name.clone(),
                    member.id,
                )
                .with_flags(flags),
            );
        }
        Ok(desc)
    }
}

impl RegistryDocument {
    /// Register every entry of the document into `registry`.
    ///
    /// Validation happens before anything is registered, so a document with
    /// a bad entry leaves the registry untouched.
    pub fn apply_to(&self, registry: &mut TypeRegistry) -> Result<(), RegistryLoadError> {
        let descriptors = self
            .types
            .iter()
            .map(YamlType::to_descriptor)
            .collect::<Result<Vec<_>, _>>()?;

        let mut unions = Vec::with_capacity(self.unions.len());
        for union in &self.unions {
            let context = format!("union {}", union.union);
            let union_id = TypeId(union.union);
            let disc = union.discriminator.resolve(&context)?;
            let branches = union
                .branches
                .iter()
                .map(|b| Ok((b.value, b.type_ref.resolve(&context)?, b.name.clone())))
                .collect::<Result<Vec<_>, RegistryLoadError>>()?;
            let default = match union.default {
                Some(ref d) => Some((d.type_ref.resolve(&context)?, d.name.clone())),
                None => None,
            };
            unions.push((union_id, disc, branches, default));
        }

        let mutable = self
            .mutable_members
            .iter()
            .map(|m| {
                let context = format!("mutable member {} of {}", m.id, m.struct_id);
                Ok((
                    TypeId(m.struct_id),
                    m.id,
                    m.type_ref.resolve(&context)?,
                    m.name.clone(),
                ))
            })
            .collect::<Result<Vec<_>, RegistryLoadError>>()?;

        for desc in descriptors {
            registry.register_type(desc);
        }
        for (union_id, disc, branches, default) in unions {
            registry.register_union_discriminator(union_id, disc);
            for (value, member_type, name) in branches {
                registry.register_union_branch(union_id, value, member_type, name);
            }
            if let Some((member_type, name)) = default {
                registry.register_union_default(union_id, member_type, name);
            }
        }
        for (struct_id, member_id, member_type, name) in mutable {
            registry.register_mutable_member(struct_id, member_id, member_type, name);
        }

        log::debug!(
            "[registry] loaded {} types, {} unions, {} mutable members",
            self.types.len(),
            self.unions.len(),
            self.mutable_members.len()
        );
        Ok(())
    }

    /// Build a fresh [`TypeRegistry`] from the document.
    pub fn into_registry(self) -> Result<TypeRegistry, RegistryLoadError> {
        let mut registry = TypeRegistry::new();
        self.apply_to(&mut registry)?;
        Ok(registry)
    }
}

impl RegistryLoader {
    /// Load a registry document from a YAML file.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<RegistryDocument, RegistryLoadError> {
        let yaml_content = fs::read_to_string(path).map_err(RegistryLoadError::Io)?;
        Self::load_str(&yaml_content)
    }

    /// Parse YAML content.
    pub fn load_str(yaml_content: &str) -> Result<RegistryDocument, RegistryLoadError> {
        serde_yaml::from_str(yaml_content).map_err(RegistryLoadError::Parse)
    }
}
