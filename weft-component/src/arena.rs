// Copyright (c) 2025 The Weft Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The shared type arena.
//!
//! All resolved types of a component live here under stable IDs; the arena
//! is append-only during validation and immutable afterwards, so a
//! finalized component can be shared freely across readers.

use crate::prelude::*;
use crate::types::{AnyTypeId, ComponentType, FuncType, InstanceType, TypeId, TypeKind, ValType};

/// ID-keyed storage for all resolved types of one component.
#[derive(Debug, Clone, Default)]
pub struct TypeArena {
    defined: Vec<ValType>,
    funcs: Vec<FuncType>,
    instances: Vec<InstanceType>,
    components: Vec<ComponentType>,
    /// Resources have identity but no payload; only a count is stored.
    resources: u32,
}

impl TypeArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a defined value type.
    pub fn alloc_defined(&mut self, ty: ValType) -> AnyTypeId {
        let id = TypeId(self.defined.len() as u32);
        self.defined.push(ty);
        AnyTypeId::new(TypeKind::Defined, id)
    }

    /// Allocate a function type.
    pub fn alloc_func(&mut self, ty: FuncType) -> AnyTypeId {
        let id = TypeId(self.funcs.len() as u32);
        self.funcs.push(ty);
        AnyTypeId::new(TypeKind::Func, id)
    }

    /// Allocate an instance type.
    pub fn alloc_instance(&mut self, ty: InstanceType) -> AnyTypeId {
        let id = TypeId(self.instances.len() as u32);
        self.instances.push(ty);
        AnyTypeId::new(TypeKind::Instance, id)
    }

    /// Allocate a component type.
    pub fn alloc_component(&mut self, ty: ComponentType) -> AnyTypeId {
        let id = TypeId(self.components.len() as u32);
        self.components.push(ty);
        AnyTypeId::new(TypeKind::Component, id)
    }

    /// Allocate a fresh resource identity.
    pub fn alloc_resource(&mut self) -> AnyTypeId {
        let id = TypeId(self.resources);
        self.resources += 1;
        AnyTypeId::new(TypeKind::Resource, id)
    }

    /// Get a defined value type.
    pub fn defined(&self, id: TypeId) -> Option<&ValType> {
        self.defined.get(id.0 as usize)
    }

    /// Get a function type.
    pub fn func(&self, id: TypeId) -> Option<&FuncType> {
        self.funcs.get(id.0 as usize)
    }

    /// Get an instance type.
    pub fn instance(&self, id: TypeId) -> Option<&InstanceType> {
        self.instances.get(id.0 as usize)
    }

    /// Get a component type.
    pub fn component(&self, id: TypeId) -> Option<&ComponentType> {
        self.components.get(id.0 as usize)
    }

    /// Number of resource identities allocated so far.
    pub fn resource_count(&self) -> u32 {
        self.resources
    }
}
