// Copyright (c) 2025 The Weft Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The canon registry.
//!
//! Maps export and import names to lift/lower templates so a host can call
//! typed component exports and answer typed component imports. Export
//! entries are keyed by the component's export names; import entries are
//! scoped as `instance#export`.

use log::warn;

use crate::prelude::*;
use crate::state::{FuncOrigin, State};
use crate::types::{FuncType, ValType};
use crate::validate::ValidatedComponent;
use weft_format::component::{Canon, CanonOptions, Sort, StringEncoding};

/// Template for calling a lifted component export.
#[derive(Debug, Clone, PartialEq)]
pub struct LiftDef {
    /// The core function that backs the export.
    pub core_func_idx: u32,
    /// The component-level function type.
    pub ty: FuncType,
    /// Memory option from the canon.
    pub memory_idx: Option<u32>,
    /// Realloc option from the canon.
    pub realloc_idx: Option<u32>,
}

/// Template for answering a lowered component import.
#[derive(Debug, Clone, PartialEq)]
pub struct LowerDef {
    /// The component-level function being lowered.
    pub component_func_idx: u32,
    /// Parameter names and types.
    pub params: Vec<(String, ValType)>,
    /// Result type, if any.
    pub result: Option<ValType>,
    /// Memory option from the canon.
    pub memory_idx: Option<u32>,
    /// Realloc option from the canon.
    pub realloc_idx: Option<u32>,
    /// Async canon option, passed through for the runtime.
    pub is_async: bool,
}

/// Name-keyed lift and lower templates for one component.
///
/// Iteration order over entries is unspecified.
#[derive(Debug, Clone, Default)]
pub struct CanonRegistry {
    lifts: BTreeMap<String, LiftDef>,
    lowers: BTreeMap<String, LowerDef>,
}

impl CanonRegistry {
    /// Build the registry from a validated component.
    pub fn from_validated(validated: &ValidatedComponent) -> Result<Self> {
        let mut registry = Self::default();
        registry.collect_lifts(validated)?;
        registry.collect_lowers(validated)?;
        Ok(registry)
    }

    /// Look up the lift template for an export name.
    pub fn lift(&self, name: &str) -> Option<&LiftDef> {
        self.lifts.get(name)
    }

    /// Look up the lower template for a scoped import name.
    pub fn lower(&self, name: &str) -> Option<&LowerDef> {
        self.lowers.get(name)
    }

    /// All lift entries.
    pub fn lifts(&self) -> impl Iterator<Item = (&str, &LiftDef)> {
        self.lifts.iter().map(|(name, def)| (name.as_str(), def))
    }

    /// All lower entries.
    pub fn lowers(&self) -> impl Iterator<Item = (&str, &LowerDef)> {
        self.lowers.iter().map(|(name, def)| (name.as_str(), def))
    }

    fn collect_lifts(&mut self, validated: &ValidatedComponent) -> Result<()> {
        for export in &validated.component.exports {
            if export.sort != Sort::Func {
                continue;
            }
            let Some(entry) = chase_func(&validated.scope, export.index) else {
                continue;
            };
            let FuncOrigin::Lift { canon_idx } = entry.1 else {
                // Imported functions re-exported straight through have no
                // core backing to call.
                continue;
            };
            let Some(Canon::Lift { core_func_idx, options, .. }) =
                validated.component.canons.get(canon_idx as usize)
            else {
                continue;
            };
            reject_untranscoded_encoding(options)?;
            let ty = validated
                .arena
                .func(entry.0)
                .cloned()
                .unwrap_or_else(|| fallback_func_type(&export.name));
            self.lifts.insert(
                export.name.clone(),
                LiftDef {
                    core_func_idx: *core_func_idx,
                    ty,
                    memory_idx: options.memory,
                    realloc_idx: options.realloc,
                },
            );
        }
        Ok(())
    }

    fn collect_lowers(&mut self, validated: &ValidatedComponent) -> Result<()> {
        for (canon_idx, canon) in validated.component.canons.iter().enumerate() {
            let Canon::Lower { func_idx, options } = canon else {
                continue;
            };
            reject_untranscoded_encoding(options)?;
            let Some((type_id, origin)) = chase_func(&validated.scope, *func_idx) else {
                continue;
            };
            let FuncOrigin::InstanceExport { instance_idx, name } = origin else {
                warn!(
                    "canon {} lowers function {} which is not an instance export; skipping",
                    canon_idx, func_idx
                );
                continue;
            };
            let scope_name = validated
                .scope
                .instances
                .get(instance_idx as usize)
                .and_then(|entry| entry.import_name.clone());
            let key = match scope_name {
                Some(instance_name) => format!("{}#{}", instance_name, name),
                None => name.clone(),
            };

            let def = match validated.arena.func(type_id) {
                Some(func) => LowerDef {
                    component_func_idx: *func_idx,
                    params: func.params.clone(),
                    result: func.result.clone(),
                    memory_idx: options.memory,
                    realloc_idx: options.realloc,
                    is_async: options.is_async,
                },
                None => lower_def_fallback(*func_idx, &key, options)?,
            };
            self.lowers.insert(key, def);
        }
        Ok(())
    }
}

/// UTF-16 and compact-UTF-16 canon options are recognized at decode time
/// but this layer does not transcode them; registering such a canon is an
/// explicit error rather than a silent mis-encoding.
fn reject_untranscoded_encoding(options: &CanonOptions) -> Result<()> {
    match options.string_encoding {
        StringEncoding::Utf8 => Ok(()),
        other => Err(weft_error::kinds::unsupported_canon(&format!(
            "string encoding {} is not transcoded",
            other.name()
        ))),
    }
}

fn chase_func(scope: &State, mut index: u32) -> Option<(crate::types::TypeId, FuncOrigin)> {
    // Re-export chains are finite; the space only grows forward.
    for _ in 0..scope.funcs.len() + 1 {
        let entry = scope.funcs.get(index as usize)?;
        match &entry.origin {
            FuncOrigin::ReExport { func_idx } => index = *func_idx,
            other => return Some((entry.type_id, other.clone())),
        }
    }
    None
}

/// Result inference for resource methods lacking explicit type info.
///
/// Names shaped like readiness or presence checks (`.ready`, `.is-*`,
/// `.has-*`, `.check*`) default to a single bool result. This is a
/// heuristic; its use is surfaced with a warning.
pub fn infers_bool_result(name: &str) -> bool {
    let tail = name.rsplit('.').next().unwrap_or(name);
    tail == "ready" || tail.starts_with("is-") || tail.starts_with("has-") || tail.starts_with("check")
}

fn fallback_func_type(name: &str) -> FuncType {
    let result = if infers_bool_result(name) {
        warn!("no type info for {:?}; inferring a single bool result", name);
        Some(ValType::Bool)
    } else {
        warn!("no type info for {:?}; assuming u32 result", name);
        Some(ValType::U32)
    };
    FuncType { params: Vec::new(), result }
}

fn lower_def_fallback(func_idx: u32, key: &str, options: &CanonOptions) -> Result<LowerDef> {
    let ty = fallback_func_type(key);
    Ok(LowerDef {
        component_func_idx: func_idx,
        params: ty.params,
        result: ty.result,
        memory_idx: options.memory,
        realloc_idx: options.realloc,
        is_async: options.is_async,
    })
}
