// Weft - weft-component
// Module: Component validation and Canonical ABI
//
// Copyright (c) 2025 The Weft Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

//! Component Model validation and Canonical ABI transcoding.
//!
//! This crate consumes the raw model produced by `weft-decoder` and turns
//! it into something a host runtime can call through:
//!
//! - a streaming validator that replays sections in binary order, stacks a
//!   scope per open declaration, resolves aliases and canons, and seals
//!   every resolved type into an arena with stable IDs;
//! - the canonical ABI: layout, flattening, lifting, and lowering between
//!   generic values and core-wasm flat slots plus linear memory;
//! - a canon registry keyed by export/import name;
//! - the core-instance dependency graph for ordered instantiation.
//!
//! The arena and scope are immutable once validation finishes; per-call
//! lift/lower work allocates only local scratch, so a validated component
//! can be shared across threads.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod arena;
pub mod canonical_abi;
pub mod graph;
pub mod prelude;
pub mod registry;
pub mod state;
pub mod types;
pub mod validate;
pub mod values;

pub use arena::TypeArena;
pub use canonical_abi::{
    flatten, flatten_function, layout, lift_flat, lift_memory, lower_flat, lower_into_retptr,
    lower_memory, BumpAllocator, CanonContext, CoreType, CoreVal, Layout, Memory, Realloc,
    SimpleMemory, MAX_FLAT_PARAMS, MAX_FLAT_RESULTS,
};
pub use graph::{InstanceGraph, InstanceNode, InstanceNodeKind};
pub use registry::{CanonRegistry, LiftDef, LowerDef};
pub use state::{ScopeKind, State};
pub use types::{
    AnyTypeId, CaseType, ComponentType, EntityType, FuncType, InstanceType, TypeId, TypeKind,
    ValType,
};
pub use validate::{decode_and_validate, validate, ValidatedComponent};
pub use values::Value;

// The decoder's entry points are part of this crate's public surface so
// embedders depend on one crate.
pub use weft_decoder::{decode, decode_with_options, is_component, DecodeOptions};
