// Copyright (c) 2025 The Weft Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Resolved component types.
//!
//! After validation, every type index has been chased through its scope and
//! the result lives in the arena under a stable ID. A resolved [`ValType`]
//! is structural: it contains no raw indices except resource IDs, which are
//! identities rather than references.

use crate::prelude::*;

/// The kind axis of an arena type ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeKind {
    /// A defined value type.
    Defined,
    /// A function type.
    Func,
    /// An instance type.
    Instance,
    /// A component type.
    Component,
    /// A fresh resource identity; carries no payload.
    Resource,
}

impl TypeKind {
    /// Stable name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Defined => "defined",
            Self::Func => "func",
            Self::Instance => "instance",
            Self::Component => "component",
            Self::Resource => "resource",
        }
    }
}

/// A stable ID within one kind's table of the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub u32);

/// A kinded type ID; what scopes hand out from their type index spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnyTypeId {
    /// Which arena table the ID indexes.
    pub kind: TypeKind,
    /// The ID within that table.
    pub id: TypeId,
}

impl AnyTypeId {
    /// Construct a kinded ID.
    pub fn new(kind: TypeKind, id: TypeId) -> Self {
        Self { kind, id }
    }
}

/// One case of a resolved variant.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseType {
    /// Case label.
    pub name: String,
    /// Optional payload type.
    pub ty: Option<ValType>,
}

/// A resolved value type.
#[derive(Debug, Clone, PartialEq)]
pub enum ValType {
    Bool,
    S8,
    U8,
    S16,
    U16,
    S32,
    U32,
    S64,
    U64,
    F32,
    F64,
    Char,
    String,
    /// Reserved error-context type; represented as a u32 index at the ABI.
    ErrorContext,
    /// Record with named fields.
    Record(Vec<(String, ValType)>),
    /// Variant with cases.
    Variant(Vec<CaseType>),
    /// Homogeneous list.
    List(Box<ValType>),
    /// Positional tuple.
    Tuple(Vec<ValType>),
    /// Named bit-set.
    Flags(Vec<String>),
    /// Named enumeration.
    Enum(Vec<String>),
    /// Optional value.
    Option(Box<ValType>),
    /// Result with optional payloads.
    Result {
        ok: Option<Box<ValType>>,
        err: Option<Box<ValType>>,
    },
    /// Owned handle to the identified resource.
    Own(TypeId),
    /// Borrowed handle to the identified resource.
    Borrow(TypeId),
}

impl ValType {
    /// Short name of the type's shape, for error paths.
    pub fn shape_name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::S8 => "s8",
            Self::U8 => "u8",
            Self::S16 => "s16",
            Self::U16 => "u16",
            Self::S32 => "s32",
            Self::U32 => "u32",
            Self::S64 => "s64",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Char => "char",
            Self::String => "string",
            Self::ErrorContext => "error-context",
            Self::Record(_) => "record",
            Self::Variant(_) => "variant",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Flags(_) => "flags",
            Self::Enum(_) => "enum",
            Self::Option(_) => "option",
            Self::Result { .. } => "result",
            Self::Own(_) => "own",
            Self::Borrow(_) => "borrow",
        }
    }
}

/// A resolved function type.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncType {
    /// Named parameters, in order.
    pub params: Vec<(String, ValType)>,
    /// Result type; absent or exactly one.
    pub result: Option<ValType>,
}

/// The typed shape of an entity visible through an import or export.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityType {
    /// A function with its arena type ID.
    Func(TypeId),
    /// A type; any kind, including fresh resources.
    Type(AnyTypeId),
    /// An instance with its arena type ID.
    Instance(TypeId),
    /// A component with its arena type ID.
    Component(TypeId),
    /// A value of the given type.
    Value(ValType),
}

impl EntityType {
    /// Name of the entity's sort, for diagnostics.
    pub fn sort_name(&self) -> &'static str {
        match self {
            Self::Func(_) => "func",
            Self::Type(_) => "type",
            Self::Instance(_) => "instance",
            Self::Component(_) => "component",
            Self::Value(_) => "value",
        }
    }
}

/// A resolved instance type: its sealed export map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceType {
    /// Exports in declaration order.
    pub exports: Vec<(String, EntityType)>,
}

impl InstanceType {
    /// Look up an export by name.
    pub fn export(&self, name: &str) -> Option<&EntityType> {
        self.exports.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }
}

/// A resolved component type: import and export maps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentType {
    /// Imports in declaration order.
    pub imports: Vec<(String, EntityType)>,
    /// Exports in declaration order.
    pub exports: Vec<(String, EntityType)>,
}
