//! Unresolved component type grammar.
//!
//! These are the types exactly as they appear in a type section: indices
//! are raw `u32`s interpreted in the enclosing scope, and instance-export
//! references stay symbolic until validation resolves them against the
//! instance's declared export set.

use crate::component::Alias;
use crate::prelude::*;

/// The thirteen primitive value types plus the reserved error-context
/// code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveValType {
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
    /// Reserved code 0x64, accepted for forward compatibility.
    ErrorContext,
}

impl PrimitiveValType {
    /// Decode a primitive from its spec byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x7F => Some(Self::Bool),
            0x7E => Some(Self::S8),
            0x7D => Some(Self::U8),
            0x7C => Some(Self::S16),
            0x7B => Some(Self::U16),
            0x7A => Some(Self::S32),
            0x79 => Some(Self::U32),
            0x78 => Some(Self::S64),
            0x77 => Some(Self::U64),
            0x76 => Some(Self::F32),
            0x75 => Some(Self::F64),
            0x74 => Some(Self::Char),
            0x73 => Some(Self::String),
            0x64 => Some(Self::ErrorContext),
            _ => None,
        }
    }

    /// The name used in error paths and logs.
    pub fn name(&self) -> &'static str {
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
        }
    }
}

/// One case of a variant type.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantCase {
    /// Case label.
    pub name: String,
    /// Optional payload type.
    pub ty: Option<FormatValType>,
    /// Optional refinement; must reference a strictly earlier case.
    pub refines: Option<u32>,
}

/// A value type as written in the binary.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatValType {
    /// Primitive type.
    Primitive(PrimitiveValType),
    /// Reference to a type by index in the enclosing scope.
    Ref(u32),
    /// Record with named fields.
    Record(Vec<(String, FormatValType)>),
    /// Variant with cases.
    Variant(Vec<VariantCase>),
    /// Homogeneous list.
    List(Box<FormatValType>),
    /// Positional tuple.
    Tuple(Vec<FormatValType>),
    /// Named bit-set.
    Flags(Vec<String>),
    /// Named enumeration.
    Enum(Vec<String>),
    /// Optional value.
    Option(Box<FormatValType>),
    /// Result with optional ok and error payloads.
    Result {
        /// Payload of the ok case, if any.
        ok: Option<Box<FormatValType>>,
        /// Payload of the error case, if any.
        err: Option<Box<FormatValType>>,
    },
    /// Owned resource handle; the index references a resource type.
    Own(u32),
    /// Borrowed resource handle; the index references a resource type.
    Borrow(u32),
    /// Deferred alias to an instance export, resolved at lookup time.
    InstanceExport {
        /// The instance whose export is referenced.
        instance_idx: u32,
        /// The export name within that instance.
        name: String,
    },
}

/// A component-level function type.
///
/// The result is either absent or exactly one type; the binary encodes the
/// position with a discriminated union, not a `vec()`.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncType {
    /// Named parameters, in declaration order.
    pub params: Vec<(String, FormatValType)>,
    /// Result type, if any.
    pub result: Option<FormatValType>,
}

/// Bound carried by a type import or type-declaration export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeBound {
    /// Equal to the type at the given index.
    Eq(u32),
    /// A fresh abstract resource (sub-resource bound).
    SubResource,
}

/// Extern descriptor: the typed shape of an import or a type-declaration
/// export.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternDesc {
    /// Function with the given type index.
    Func(u32),
    /// Instance with the given type index.
    Instance(u32),
    /// Type with a bound.
    Type(TypeBound),
    /// Component with the given type index.
    Component(u32),
    /// Value with the given type index.
    Value(u32),
}

/// One declaration in an instance type.
///
/// Only type declarations, type aliases, and type exports contribute to the
/// instance type's internal type index space, in appearance order.
#[derive(Debug, Clone, PartialEq)]
pub enum InstanceTypeDecl {
    /// Raw core type bytes, passed through unparsed.
    CoreType(Vec<u8>),
    /// A nested type whose index space is local to this instance type.
    Type(Box<TypeDef>),
    /// An alias, captured for deferred resolution.
    Alias(Alias),
    /// A named export with its descriptor.
    Export {
        /// Export name.
        name: String,
        /// Export shape.
        desc: ExternDesc,
    },
}

/// One declaration in a component type.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentTypeDecl {
    /// Raw core type bytes.
    CoreType(Vec<u8>),
    /// A nested type local to this component type.
    Type(Box<TypeDef>),
    /// An alias, captured for deferred resolution.
    Alias(Alias),
    /// A named import.
    Import {
        /// Import name.
        name: String,
        /// Import shape.
        desc: ExternDesc,
    },
    /// A named export.
    Export {
        /// Export name.
        name: String,
        /// Export shape.
        desc: ExternDesc,
    },
}

/// A parsed type-section entry.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDef {
    /// A defined value type.
    Defined(FormatValType),
    /// A function type.
    Func(FuncType),
    /// An instance type: an ordered declaration list.
    Instance(Vec<InstanceTypeDecl>),
    /// A nested component type: an ordered declaration list.
    Component(Vec<ComponentTypeDecl>),
}
