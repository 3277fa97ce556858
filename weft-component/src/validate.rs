// Copyright (c) 2025 The Weft Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Streaming validation.
//!
//! The validator re-walks the byte stream section by section, in exact
//! binary order, resolving what the decoder recorded: type indices against
//! the scope's type space, aliases against instance export maps and outer
//! frames, canons against the function spaces. Scopes stack while
//! instance-type and component-type declarations are open; closing a scope
//! with an unused value entry is an error, and the outermost scope must be
//! the only survivor at end of stream.

use log::trace;
use weft_decoder::component::types::parse_type_def;
use weft_format::binary;
use weft_format::component::{
    Alias, AliasTarget, Canon, Component, ComponentInstance, CoreSort, Export, Import,
    InlineExport, Sort, Start,
};
use weft_format::types::{
    ComponentTypeDecl, ExternDesc, FormatValType, InstanceTypeDecl, PrimitiveValType, TypeBound,
    TypeDef, VariantCase,
};

use crate::arena::TypeArena;
use crate::prelude::*;
use crate::state::{CoreFuncEntry, FuncEntry, FuncOrigin, InstanceEntry, ScopeKind, State, ValueEntry};
use crate::types::{
    AnyTypeId, CaseType, ComponentType, EntityType, FuncType, InstanceType, TypeKind, ValType,
};

/// A decoded and validated component: the raw model, the sealed type
/// arena, and the outermost scope.
#[derive(Debug, Clone)]
pub struct ValidatedComponent {
    /// The decoded component.
    pub component: Component,
    /// All resolved types, under stable IDs.
    pub arena: TypeArena,
    /// The outermost scope's index spaces and name maps.
    pub scope: State,
}

/// Decode a component binary and run streaming validation over it.
pub fn decode_and_validate(bytes: &[u8]) -> Result<ValidatedComponent> {
    let component = weft_decoder::decode(bytes)?;
    validate(bytes, component)
}

/// Validate a decoded component against its original byte stream.
///
/// The byte stream is consulted only for section ordering; payload data
/// comes from the decoded component.
pub fn validate(bytes: &[u8], component: Component) -> Result<ValidatedComponent> {
    let mut validator = Validator {
        component: &component,
        arena: TypeArena::new(),
        states: vec![State::new(ScopeKind::Component)],
    };
    validator.run(bytes)?;

    let Validator { arena, mut states, .. } = validator;
    if states.len() != 1 {
        return Err(Error::validate(ErrorKind::UnresolvedAlias, "scope stack did not close"));
    }
    let scope = states.pop().ok_or_else(|| {
        Error::validate(ErrorKind::UnresolvedAlias, "scope stack did not close")
    })?;
    if let Some(index) = scope.first_unused_value() {
        return Err(weft_error::kinds::value_not_used(index));
    }

    Ok(ValidatedComponent { component, arena, scope })
}

/// Running per-section cursors into the decoded component's item vectors.
#[derive(Debug, Default)]
struct Cursors {
    instances: usize,
    aliases: usize,
    types: usize,
    canons: usize,
    imports: usize,
    exports: usize,
}

struct Validator<'c> {
    component: &'c Component,
    arena: TypeArena,
    states: Vec<State>,
}

impl<'c> Validator<'c> {
    fn state(&mut self) -> &mut State {
        // The stack always holds at least the outermost component scope.
        self.states.last_mut().unwrap_or_else(|| unreachable!("scope stack is never empty"))
    }

    fn state_ref(&self) -> &State {
        self.states.last().unwrap_or_else(|| unreachable!("scope stack is never empty"))
    }

    /// Walk the byte stream again for section order, processing the
    /// decoded items in exact appearance order.
    fn run(&mut self, bytes: &[u8]) -> Result<()> {
        let component = self.component;
        let mut cursors = Cursors::default();
        let mut offset = 8usize;

        while offset < bytes.len() {
            let (section_id, size) = binary::read_u8(bytes, offset)?;
            offset += size;
            let (section_size, size) = binary::read_leb128_u32(bytes, offset)?;
            offset += size;
            let end = offset
                .checked_add(section_size as usize)
                .filter(|end| *end <= bytes.len())
                .ok_or_else(|| Error::truncated("section exceeds input during validation"))?;
            let payload = &bytes[offset..end];
            offset = end;

            match section_id {
                binary::CORE_MODULE_SECTION_ID => self.state().core_modules += 1,
                binary::CORE_INSTANCE_SECTION_ID => {
                    let count = item_count(payload)?;
                    self.state().core_instances += count;
                },
                binary::COMPONENT_SECTION_ID => self.state().components.push(None),
                binary::INSTANCE_SECTION_ID => {
                    let count = item_count(payload)?;
                    for _ in 0..count {
                        let instance = decoded_item(&component.instances, cursors.instances)?;
                        cursors.instances += 1;
                        self.process_instance(instance)?;
                    }
                },
                binary::ALIAS_SECTION_ID => {
                    let count = item_count(payload)?;
                    for _ in 0..count {
                        let alias = decoded_item(&component.aliases, cursors.aliases)?;
                        cursors.aliases += 1;
                        self.process_alias(alias)?;
                    }
                },
                binary::TYPE_SECTION_ID => {
                    let count = item_count(payload)?;
                    for _ in 0..count {
                        let raw = decoded_item(&component.types, cursors.types)?;
                        cursors.types += 1;
                        let def = match &raw.parsed {
                            Some(def) => def.clone(),
                            None => parse_type_def(&raw.data, 0)?.0,
                        };
                        self.add_type(&def)?;
                    }
                },
                binary::CANON_SECTION_ID => {
                    let canon_idx = cursors.canons as u32;
                    let canon = decoded_item(&component.canons, cursors.canons)?;
                    cursors.canons += 1;
                    self.process_canon(canon, canon_idx)?;
                },
                binary::START_SECTION_ID => {
                    if let Some(start) = &component.start {
                        self.process_start(start)?;
                    }
                },
                binary::IMPORT_SECTION_ID => {
                    let count = item_count(payload)?;
                    for _ in 0..count {
                        let import = decoded_item(&component.imports, cursors.imports)?;
                        cursors.imports += 1;
                        self.process_import(import)?;
                    }
                },
                binary::EXPORT_SECTION_ID => {
                    let count = item_count(payload)?;
                    for _ in 0..count {
                        let export = decoded_item(&component.exports, cursors.exports)?;
                        cursors.exports += 1;
                        self.process_export(export)?;
                    }
                },
                binary::VALUE_SECTION_ID => {
                    let count = item_count(payload)?;
                    for _ in 0..count {
                        self.state().values.push(ValueEntry { ty: None, used: false });
                    }
                },
                _ => {},
            }
        }
        Ok(())
    }

    //======================================================================
    // Types
    //======================================================================

    fn add_type(&mut self, def: &TypeDef) -> Result<()> {
        match def {
            TypeDef::Defined(format_ty) => {
                let ty = self.resolve_val_type(format_ty)?;
                let id = self.arena.alloc_defined(ty);
                self.state().types.push(id);
            },
            TypeDef::Func(func) => {
                let ty = self.resolve_func_type(func)?;
                let id = self.arena.alloc_func(ty);
                self.state().types.push(id);
            },
            TypeDef::Instance(decls) => {
                trace!("opening instance-type scope with {} decls", decls.len());
                self.states.push(State::new(ScopeKind::InstanceType));
                let result = self.process_instance_decls(decls);
                let state = self.states.pop().unwrap_or_else(|| unreachable!("scope just pushed"));
                result?;
                if let Some(index) = state.first_unused_value() {
                    return Err(weft_error::kinds::value_not_used(index));
                }
                let id = self.arena.alloc_instance(InstanceType { exports: state.exports });
                self.state().types.push(id);
            },
            TypeDef::Component(decls) => {
                trace!("opening component-type scope with {} decls", decls.len());
                self.states.push(State::new(ScopeKind::ComponentType));
                let result = self.process_component_decls(decls);
                let state = self.states.pop().unwrap_or_else(|| unreachable!("scope just pushed"));
                result?;
                if let Some(index) = state.first_unused_value() {
                    return Err(weft_error::kinds::value_not_used(index));
                }
                let id = self.arena.alloc_component(ComponentType {
                    imports: state.imports,
                    exports: state.exports,
                });
                self.state().types.push(id);
            },
        }
        Ok(())
    }

    fn process_instance_decls(&mut self, decls: &[InstanceTypeDecl]) -> Result<()> {
        for (idx, decl) in decls.iter().enumerate() {
            match decl {
                InstanceTypeDecl::CoreType(_) => {},
                InstanceTypeDecl::Type(def) => self.add_type(def).at_index(idx as u32)?,
                InstanceTypeDecl::Alias(alias) => self.process_alias(alias).at_index(idx as u32)?,
                InstanceTypeDecl::Export { name, desc } => {
                    self.process_declared_export(name, desc).in_field(name)?;
                },
            }
        }
        Ok(())
    }

    fn process_component_decls(&mut self, decls: &[ComponentTypeDecl]) -> Result<()> {
        for (idx, decl) in decls.iter().enumerate() {
            match decl {
                ComponentTypeDecl::CoreType(_) => {},
                ComponentTypeDecl::Type(def) => self.add_type(def).at_index(idx as u32)?,
                ComponentTypeDecl::Alias(alias) => {
                    self.process_alias(alias).at_index(idx as u32)?;
                },
                ComponentTypeDecl::Import { name, desc } => {
                    let entity = self.resolve_extern_desc(desc)?;
                    if let EntityType::Type(any) = &entity {
                        self.state().types.push(*any);
                    }
                    self.state().imports.push((name.clone(), entity));
                },
                ComponentTypeDecl::Export { name, desc } => {
                    self.process_declared_export(name, desc).in_field(name)?;
                },
            }
        }
        Ok(())
    }

    /// An export declaration inside an instance or component type. Type
    /// exports contribute to the local type index space; a sub-resource
    /// bound mints a fresh resource, an eq bound reuses the bounded ID.
    fn process_declared_export(&mut self, name: &str, desc: &ExternDesc) -> Result<()> {
        let entity = self.resolve_extern_desc(desc)?;
        if let EntityType::Type(any) = &entity {
            self.state().types.push(*any);
        }
        self.state().exports.push((name.to_string(), entity));
        Ok(())
    }

    fn resolve_extern_desc(&mut self, desc: &ExternDesc) -> Result<EntityType> {
        let entity = match desc {
            ExternDesc::Func(idx) => {
                let any = self.expect_type_kind(*idx, TypeKind::Func)?;
                EntityType::Func(any.id)
            },
            ExternDesc::Instance(idx) => {
                let any = self.expect_type_kind(*idx, TypeKind::Instance)?;
                EntityType::Instance(any.id)
            },
            ExternDesc::Component(idx) => {
                let any = self.expect_type_kind(*idx, TypeKind::Component)?;
                EntityType::Component(any.id)
            },
            ExternDesc::Value(idx) => {
                let any = self.expect_type_kind(*idx, TypeKind::Defined)?;
                let ty = self
                    .arena
                    .defined(any.id)
                    .cloned()
                    .ok_or_else(|| weft_error::kinds::invalid_type_index(*idx, 0))?;
                EntityType::Value(ty)
            },
            ExternDesc::Type(TypeBound::Eq(idx)) => {
                let any = self.state_ref().type_at(*idx)?;
                EntityType::Type(any)
            },
            ExternDesc::Type(TypeBound::SubResource) => {
                // Sub-resource bounds always mint a fresh identity.
                EntityType::Type(self.arena.alloc_resource())
            },
        };
        Ok(entity)
    }

    fn expect_type_kind(&self, index: u32, kind: TypeKind) -> Result<AnyTypeId> {
        let any = self.state_ref().type_at(index)?;
        if any.kind != kind {
            return Err(Error::validate(
                ErrorKind::InvalidTypeIndex,
                format!("type index {} is a {} type, expected {}", index, any.kind.name(), kind.name()),
            ));
        }
        Ok(any)
    }

    fn resolve_func_type(&mut self, func: &weft_format::types::FuncType) -> Result<FuncType> {
        let mut params = Vec::with_capacity(func.params.len());
        for (name, ty) in &func.params {
            let resolved = self.resolve_val_type(ty).in_field(name)?;
            params.push((name.clone(), resolved));
        }
        let result = match &func.result {
            Some(ty) => Some(self.resolve_val_type(ty).in_field("result")?),
            None => None,
        };
        Ok(FuncType { params, result })
    }

    fn resolve_val_type(&mut self, ty: &FormatValType) -> Result<ValType> {
        let resolved = match ty {
            FormatValType::Primitive(prim) => resolve_primitive(*prim),
            FormatValType::Ref(idx) => {
                let any = self.state_ref().type_at(*idx)?;
                self.defined_by_id(any, *idx)?
            },
            FormatValType::Record(fields) => {
                let mut out = Vec::with_capacity(fields.len());
                for (name, field) in fields {
                    out.push((name.clone(), self.resolve_val_type(field).in_field(name)?));
                }
                ValType::Record(out)
            },
            FormatValType::Variant(cases) => ValType::Variant(self.resolve_cases(cases)?),
            FormatValType::List(element) => {
                ValType::List(Box::new(self.resolve_val_type(element)?))
            },
            FormatValType::Tuple(members) => {
                let mut out = Vec::with_capacity(members.len());
                for (idx, member) in members.iter().enumerate() {
                    out.push(self.resolve_val_type(member).at_index(idx as u32)?);
                }
                ValType::Tuple(out)
            },
            FormatValType::Flags(names) => ValType::Flags(names.clone()),
            FormatValType::Enum(names) => ValType::Enum(names.clone()),
            FormatValType::Option(payload) => {
                ValType::Option(Box::new(self.resolve_val_type(payload)?))
            },
            FormatValType::Result { ok, err } => ValType::Result {
                ok: match ok {
                    Some(ty) => Some(Box::new(self.resolve_val_type(ty).in_case("ok")?)),
                    None => None,
                },
                err: match err {
                    Some(ty) => Some(Box::new(self.resolve_val_type(ty).in_case("error")?)),
                    None => None,
                },
            },
            FormatValType::Own(idx) => {
                let any = self.expect_type_kind(*idx, TypeKind::Resource)?;
                ValType::Own(any.id)
            },
            FormatValType::Borrow(idx) => {
                let any = self.expect_type_kind(*idx, TypeKind::Resource)?;
                ValType::Borrow(any.id)
            },
            FormatValType::InstanceExport { instance_idx, name } => {
                let entity = self.instance_export_entity(*instance_idx, name)?;
                match entity {
                    EntityType::Type(any) => self.defined_by_id(any, *instance_idx)?,
                    other => {
                        return Err(Error::validate(
                            ErrorKind::InvalidTypeIndex,
                            format!("instance export {:?} is a {}, not a type", name, other.sort_name()),
                        ));
                    },
                }
            },
        };
        Ok(resolved)
    }

    fn resolve_cases(&mut self, cases: &[VariantCase]) -> Result<Vec<CaseType>> {
        let mut out = Vec::with_capacity(cases.len());
        for case in cases {
            let ty = match &case.ty {
                Some(ty) => Some(self.resolve_val_type(ty).in_case(&case.name)?),
                None => None,
            };
            out.push(CaseType { name: case.name.clone(), ty });
        }
        Ok(out)
    }

    fn defined_by_id(&self, any: AnyTypeId, index: u32) -> Result<ValType> {
        match any.kind {
            TypeKind::Defined => self
                .arena
                .defined(any.id)
                .cloned()
                .ok_or_else(|| weft_error::kinds::invalid_type_index(index, 0)),
            other => Err(Error::validate(
                ErrorKind::InvalidTypeIndex,
                format!("type index {} is a {} type, not usable as a value type", index, other.name()),
            )),
        }
    }

    //======================================================================
    // Component instances
    //======================================================================

    /// Process one component-instance definition: resolve its export set
    /// and seal it into the arena so aliases can be looked up against it.
    fn process_instance(&mut self, instance: &ComponentInstance) -> Result<()> {
        let entry = match instance {
            ComponentInstance::Instantiate { component_idx, .. } => {
                let declared = self
                    .state_ref()
                    .components
                    .get(*component_idx as usize)
                    .copied()
                    .ok_or_else(|| {
                        Error::validate(
                            ErrorKind::UnresolvedAlias,
                            format!("instantiated component index {} out of range", component_idx),
                        )
                    })?;
                match declared {
                    Some(type_id) => {
                        // The instance exposes exactly what the component
                        // type declares.
                        let exports = self
                            .arena
                            .component(type_id)
                            .map(|component_ty| component_ty.exports.clone())
                            .unwrap_or_default();
                        let id = self.arena.alloc_instance(InstanceType { exports });
                        InstanceEntry { type_id: Some(id.id), import_name: None }
                    },
                    // Nested components kept as raw bytes carry no resolved
                    // type; aliases into such an instance stay unresolvable.
                    None => InstanceEntry { type_id: None, import_name: None },
                }
            },
            ComponentInstance::FromExports(exports) => {
                let mut sealed = Vec::with_capacity(exports.len());
                for export in exports {
                    let entity = self.inline_export_entity(export).in_field(&export.name)?;
                    sealed.push((export.name.clone(), entity));
                }
                let id = self.arena.alloc_instance(InstanceType { exports: sealed });
                InstanceEntry { type_id: Some(id.id), import_name: None }
            },
        };
        self.state().instances.push(entry);
        Ok(())
    }

    /// Resolve one inline export of a from-exports instance against the
    /// current scope's index spaces.
    fn inline_export_entity(&mut self, export: &InlineExport) -> Result<EntityType> {
        let index = export.index as usize;
        match export.sort {
            Sort::Func => {
                let entry = self.state_ref().funcs.get(index).ok_or_else(|| {
                    Error::validate(
                        ErrorKind::UnresolvedAlias,
                        format!("bundled function index {} out of range", export.index),
                    )
                })?;
                Ok(EntityType::Func(entry.type_id))
            },
            Sort::Type => Ok(EntityType::Type(self.state_ref().type_at(export.index)?)),
            Sort::Instance => {
                let entry = self.state_ref().instances.get(index).ok_or_else(|| {
                    Error::validate(
                        ErrorKind::UnresolvedAlias,
                        format!("bundled instance index {} out of range", export.index),
                    )
                })?;
                let type_id = entry.type_id.ok_or_else(|| {
                    Error::validate(
                        ErrorKind::UnresolvedAlias,
                        format!("bundled instance {} has no declared export set", export.index),
                    )
                })?;
                Ok(EntityType::Instance(type_id))
            },
            Sort::Component => {
                let entry =
                    self.state_ref().components.get(index).copied().ok_or_else(|| {
                        Error::validate(
                            ErrorKind::UnresolvedAlias,
                            format!("bundled component index {} out of range", export.index),
                        )
                    })?;
                let type_id = entry.ok_or_else(|| {
                    Error::validate(
                        ErrorKind::UnresolvedAlias,
                        format!("bundled component {} has no resolved type", export.index),
                    )
                })?;
                Ok(EntityType::Component(type_id))
            },
            Sort::Value => {
                let entry = self.state().values.get_mut(index).ok_or_else(|| {
                    Error::validate(
                        ErrorKind::UnresolvedAlias,
                        format!("bundled value index {} out of range", export.index),
                    )
                })?;
                entry.used = true;
                let ty = entry.ty.clone().ok_or_else(|| {
                    Error::validate(
                        ErrorKind::UnresolvedAlias,
                        format!("bundled value {} has no declared type", export.index),
                    )
                })?;
                Ok(EntityType::Value(ty))
            },
            Sort::Core(_) => Err(Error::validate(
                ErrorKind::UnresolvedAlias,
                "core items cannot be bundled into a component instance",
            )),
        }
    }

    //======================================================================
    // Aliases
    //======================================================================

    fn instance_export_entity(&self, instance_idx: u32, name: &str) -> Result<EntityType> {
        let entry = self.state_ref().instances.get(instance_idx as usize).ok_or_else(|| {
            Error::validate(
                ErrorKind::UnresolvedAlias,
                format!("instance index {} out of range", instance_idx),
            )
        })?;
        let type_id = entry.type_id.ok_or_else(|| {
            Error::validate(
                ErrorKind::UnresolvedAlias,
                format!("instance {} has no declared export set", instance_idx),
            )
        })?;
        let instance = self.arena.instance(type_id).ok_or_else(|| {
            Error::validate(
                ErrorKind::UnresolvedAlias,
                format!("instance {} has a dangling type", instance_idx),
            )
        })?;
        instance
            .export(name)
            .cloned()
            .ok_or_else(|| weft_error::kinds::unresolved_export(instance_idx, name))
    }

    fn process_alias(&mut self, alias: &Alias) -> Result<()> {
        match &alias.target {
            AliasTarget::InstanceExport { sort, instance_idx, name } => {
                let entity = self.instance_export_entity(*instance_idx, name)?;
                match (sort, entity) {
                    (Sort::Func, EntityType::Func(type_id)) => {
                        self.state().funcs.push(FuncEntry {
                            type_id,
                            origin: FuncOrigin::InstanceExport {
                                instance_idx: *instance_idx,
                                name: name.clone(),
                            },
                        });
                    },
                    (Sort::Type, EntityType::Type(any)) => self.state().types.push(any),
                    (Sort::Instance, EntityType::Instance(type_id)) => {
                        self.state().instances.push(InstanceEntry {
                            type_id: Some(type_id),
                            import_name: None,
                        });
                    },
                    (Sort::Component, EntityType::Component(type_id)) => {
                        self.state().components.push(Some(type_id));
                    },
                    (Sort::Value, EntityType::Value(ty)) => {
                        self.state().values.push(ValueEntry { ty: Some(ty), used: false });
                    },
                    (sort, entity) => {
                        return Err(Error::validate(
                            ErrorKind::UnresolvedAlias,
                            format!(
                                "instance export {:?} is a {}, alias wants {:?}",
                                name,
                                entity.sort_name(),
                                sort
                            ),
                        ));
                    },
                }
            },
            AliasTarget::CoreInstanceExport { sort, instance_idx, name } => {
                // Core modules are opaque at this layer; the alias is
                // recorded with its origin for index-space and dependency
                // tracking, not type-checked.
                match sort {
                    CoreSort::Func => self.state().core_funcs.push(CoreFuncEntry::AliasExport {
                        instance_idx: *instance_idx,
                        name: name.clone(),
                    }),
                    CoreSort::Table => self.state().core_tables.push(*instance_idx),
                    CoreSort::Memory => self.state().core_memories.push(*instance_idx),
                    CoreSort::Global => self.state().core_globals.push(*instance_idx),
                    CoreSort::Module | CoreSort::Instance | CoreSort::Type => {},
                }
            },
            AliasTarget::Outer { sort, count, index } => self.process_outer_alias(*sort, *count, *index)?,
        }
        Ok(())
    }

    fn process_outer_alias(&mut self, sort: Sort, count: u32, index: u32) -> Result<()> {
        let depth = self.states.len();
        if count as usize >= depth {
            return Err(weft_error::kinds::unresolved_outer(count, depth));
        }
        let frame = &self.states[depth - 1 - count as usize];
        match sort {
            Sort::Type => {
                let any = frame.types.get(index as usize).copied().ok_or_else(|| {
                    weft_error::kinds::invalid_type_index(index, frame.types.len())
                })?;
                self.state().types.push(any);
            },
            Sort::Func => {
                let entry = frame.funcs.get(index as usize).cloned().ok_or_else(|| {
                    Error::validate(
                        ErrorKind::UnresolvedAlias,
                        format!("outer function index {} out of range", index),
                    )
                })?;
                self.state().funcs.push(entry);
            },
            Sort::Component => {
                let entry = frame.components.get(index as usize).copied().ok_or_else(|| {
                    Error::validate(
                        ErrorKind::UnresolvedAlias,
                        format!("outer component index {} out of range", index),
                    )
                })?;
                self.state().components.push(entry);
            },
            Sort::Instance => {
                let entry = frame.instances.get(index as usize).cloned().ok_or_else(|| {
                    Error::validate(
                        ErrorKind::UnresolvedAlias,
                        format!("outer instance index {} out of range", index),
                    )
                })?;
                self.state().instances.push(entry);
            },
            Sort::Core(CoreSort::Module) => {
                if index >= frame.core_modules {
                    return Err(Error::validate(
                        ErrorKind::UnresolvedAlias,
                        format!("outer core module index {} out of range", index),
                    ));
                }
                self.state().core_modules += 1;
            },
            other => {
                return Err(Error::validate(
                    ErrorKind::UnresolvedAlias,
                    format!("outer alias of sort {:?} is not supported", other),
                ));
            },
        }
        Ok(())
    }

    //======================================================================
    // Canons
    //======================================================================

    fn process_canon(&mut self, canon: &Canon, canon_idx: u32) -> Result<()> {
        match canon {
            Canon::Lift { core_func_idx, type_idx, .. } => {
                if *core_func_idx as usize >= self.state_ref().core_funcs.len() {
                    return Err(Error::validate(
                        ErrorKind::InvalidTypeIndex,
                        format!("canon lift core function index {} out of range", core_func_idx),
                    ));
                }
                let any = self.expect_type_kind(*type_idx, TypeKind::Func)?;
                self.state().funcs.push(FuncEntry {
                    type_id: any.id,
                    origin: FuncOrigin::Lift { canon_idx },
                });
            },
            Canon::Lower { func_idx, .. } => {
                if *func_idx as usize >= self.state_ref().funcs.len() {
                    return Err(Error::validate(
                        ErrorKind::InvalidTypeIndex,
                        format!("canon lower function index {} out of range", func_idx),
                    ));
                }
                self.state().core_funcs.push(CoreFuncEntry::CanonLower { canon_idx });
            },
            Canon::ResourceNew { type_idx } => {
                let any = self.expect_type_kind(*type_idx, TypeKind::Resource)?;
                self.state().core_funcs.push(CoreFuncEntry::ResourceNew { resource: any.id });
            },
            Canon::ResourceDrop { type_idx } | Canon::ResourceDropAsync { type_idx } => {
                let any = self.expect_type_kind(*type_idx, TypeKind::Resource)?;
                self.state().core_funcs.push(CoreFuncEntry::ResourceDrop { resource: any.id });
            },
            Canon::ResourceRep { type_idx } => {
                let any = self.expect_type_kind(*type_idx, TypeKind::Resource)?;
                self.state().core_funcs.push(CoreFuncEntry::ResourceRep { resource: any.id });
            },
            Canon::TaskCancel | Canon::SubtaskCancel => {
                self.state().core_funcs.push(CoreFuncEntry::TaskBuiltin);
            },
        }
        Ok(())
    }

    //======================================================================
    // Imports, exports, start
    //======================================================================

    fn process_import(&mut self, import: &Import) -> Result<()> {
        let entity = self.resolve_extern_desc(&import.desc).in_field(&import.name)?;
        match &entity {
            EntityType::Instance(type_id) => {
                self.state().instances.push(InstanceEntry {
                    type_id: Some(*type_id),
                    import_name: Some(import.name.clone()),
                });
            },
            EntityType::Component(type_id) => {
                let id = *type_id;
                self.state().components.push(Some(id));
            },
            EntityType::Type(any) => self.state().types.push(*any),
            EntityType::Value(ty) => {
                let ty = ty.clone();
                self.state().values.push(ValueEntry { ty: Some(ty), used: false });
            },
            EntityType::Func(_) => {},
        }
        self.state().imports.push((import.name.clone(), entity));
        Ok(())
    }

    fn process_export(&mut self, export: &Export) -> Result<()> {
        match export.sort {
            Sort::Func => {
                let entry =
                    self.state_ref().funcs.get(export.index as usize).cloned().ok_or_else(|| {
                        Error::validate(
                            ErrorKind::InvalidTypeIndex,
                            format!("exported function index {} out of range", export.index),
                        )
                    })?;
                let type_id = entry.type_id;
                self.state().funcs.push(FuncEntry {
                    type_id,
                    origin: FuncOrigin::ReExport { func_idx: export.index },
                });
                self.state().exports.push((export.name.clone(), EntityType::Func(type_id)));
            },
            Sort::Type => {
                let any = self.state_ref().type_at(export.index)?;
                self.state().types.push(any);
                self.state().exports.push((export.name.clone(), EntityType::Type(any)));
            },
            Sort::Instance => {
                let entry = self
                    .state_ref()
                    .instances
                    .get(export.index as usize)
                    .cloned()
                    .ok_or_else(|| {
                        Error::validate(
                            ErrorKind::InvalidTypeIndex,
                            format!("exported instance index {} out of range", export.index),
                        )
                    })?;
                // An instance whose export set never resolved cannot be
                // described to importers; exporting it is an error, not a
                // silently thinner export list.
                let type_id = entry.type_id.ok_or_else(|| {
                    Error::validate(
                        ErrorKind::UnresolvedAlias,
                        format!("exported instance {} has no declared export set", export.index),
                    )
                })?;
                self.state().exports.push((export.name.clone(), EntityType::Instance(type_id)));
                self.state().instances.push(InstanceEntry { import_name: None, ..entry });
            },
            Sort::Value => {
                let index = export.index as usize;
                let entry = self.state().values.get_mut(index).ok_or_else(|| {
                    Error::validate(
                        ErrorKind::InvalidTypeIndex,
                        format!("exported value index {} out of range", export.index),
                    )
                })?;
                entry.used = true;
                let ty = entry.ty.clone();
                if let Some(ty) = ty {
                    self.state().exports.push((export.name.clone(), EntityType::Value(ty)));
                }
            },
            Sort::Component => {
                let entry = self
                    .state_ref()
                    .components
                    .get(export.index as usize)
                    .copied()
                    .ok_or_else(|| {
                        Error::validate(
                            ErrorKind::InvalidTypeIndex,
                            format!("exported component index {} out of range", export.index),
                        )
                    })?;
                if let Some(type_id) = entry {
                    self.state().exports.push((export.name.clone(), EntityType::Component(type_id)));
                }
                self.state().components.push(entry);
            },
            Sort::Core(_) => {},
        }
        Ok(())
    }

    fn process_start(&mut self, start: &Start) -> Result<()> {
        if start.func_idx as usize >= self.state_ref().funcs.len() {
            return Err(Error::validate(
                ErrorKind::InvalidTypeIndex,
                format!("start function index {} out of range", start.func_idx),
            ));
        }
        for arg in &start.args {
            let entry = self.state().values.get_mut(*arg as usize).ok_or_else(|| {
                Error::validate(
                    ErrorKind::InvalidTypeIndex,
                    format!("start argument value index {} out of range", arg),
                )
            })?;
            entry.used = true;
        }
        for _ in 0..start.results {
            self.state().values.push(ValueEntry { ty: None, used: false });
        }
        Ok(())
    }
}

fn decoded_item<'a, T>(items: &'a [T], index: usize) -> Result<&'a T> {
    items.get(index).ok_or_else(|| {
        Error::validate(
            ErrorKind::UnresolvedAlias,
            "decoded component does not match the byte stream",
        )
    })
}

fn item_count(payload: &[u8]) -> Result<u32> {
    let (count, _) = binary::read_leb128_u32(payload, 0)?;
    Ok(count)
}

fn resolve_primitive(prim: PrimitiveValType) -> ValType {
    match prim {
        PrimitiveValType::Bool => ValType::Bool,
        PrimitiveValType::S8 => ValType::S8,
        PrimitiveValType::U8 => ValType::U8,
        PrimitiveValType::S16 => ValType::S16,
        PrimitiveValType::U16 => ValType::U16,
        PrimitiveValType::S32 => ValType::S32,
        PrimitiveValType::U32 => ValType::U32,
        PrimitiveValType::S64 => ValType::S64,
        PrimitiveValType::U64 => ValType::U64,
        PrimitiveValType::F32 => ValType::F32,
        PrimitiveValType::F64 => ValType::F64,
        PrimitiveValType::Char => ValType::Char,
        PrimitiveValType::String => ValType::String,
        PrimitiveValType::ErrorContext => ValType::ErrorContext,
    }
}
