// Weft - weft-format
// Module: Component Model binary format
//
// Copyright (c) 2025 The Weft Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

//! WebAssembly Component Model binary format.
//!
//! This crate holds the bit-level knowledge of the component binary format:
//! opcode and section-id constant tables, bounded LEB128/name readers, and
//! the raw (unresolved) data model that the decoder in `weft-decoder`
//! produces. Nothing here resolves type indices; that is the validator's
//! job in `weft-component`.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod binary;
pub mod component;
pub mod prelude;
pub mod section;
pub mod types;

pub use component::{
    Alias, AliasTarget, Canon, CanonOptions, Component, ComponentInstance, CoreExport,
    CoreFuncRef, CoreInstance, CoreInstantiateArg, CoreSort, CustomSection, Export, FuncRef,
    Import, InlineExport, InstantiateArg, MarkerKind, RawType, RawValue, SectionMarker, Sort,
    Start, StringEncoding,
};
pub use section::SectionId;
pub use types::{
    ComponentTypeDecl, ExternDesc, FormatValType, FuncType, InstanceTypeDecl, PrimitiveValType,
    TypeBound, TypeDef, VariantCase,
};
