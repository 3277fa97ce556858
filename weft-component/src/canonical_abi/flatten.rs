// Copyright (c) 2025 The Weft Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Flat core-wasm representation of component types.
//!
//! `flatten` maps a resolved type to the sequence of core value slots it
//! occupies when passed in registers. Signature flattening is
//! context-sensitive: oversized parameter lists collapse to an indirect
//! pointer, and oversized results collapse differently for lift and lower.

use crate::prelude::*;
use crate::types::{FuncType, ValType};

use super::layout::layout;

/// Parameter-slot budget before arguments go indirect.
pub const MAX_FLAT_PARAMS: usize = 16;

/// Result-slot budget before results go through a return pointer.
pub const MAX_FLAT_RESULTS: usize = 1;

/// A core value slot type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreType {
    I32,
    I64,
    F32,
    F64,
}

impl CoreType {
    /// Name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

/// Which side of the boundary a signature is flattened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonContext {
    /// Host calls a lifted export.
    Lift,
    /// Core wasm calls a lowered import.
    Lower,
}

/// Flatten a type to its core slot sequence.
pub fn flatten(ty: &ValType) -> Result<Vec<CoreType>> {
    let flat = match ty {
        ValType::Bool
        | ValType::S8
        | ValType::U8
        | ValType::S16
        | ValType::U16
        | ValType::S32
        | ValType::U32
        | ValType::Char
        | ValType::ErrorContext => vec![CoreType::I32],
        ValType::S64 | ValType::U64 => vec![CoreType::I64],
        ValType::F32 => vec![CoreType::F32],
        ValType::F64 => vec![CoreType::F64],
        // (pointer, length)
        ValType::String | ValType::List(_) => vec![CoreType::I32, CoreType::I32],
        ValType::Own(_) | ValType::Borrow(_) => vec![CoreType::I32],
        ValType::Record(fields) => {
            let mut flat = Vec::new();
            for (_, field) in fields {
                flat.extend(flatten(field)?);
            }
            flat
        },
        ValType::Tuple(members) => {
            let mut flat = Vec::new();
            for member in members {
                flat.extend(flatten(member)?);
            }
            flat
        },
        ValType::Option(payload) => {
            let mut flat = vec![CoreType::I32];
            flat.extend(flatten(payload)?);
            flat
        },
        ValType::Result { ok, err } => {
            let ok_flat = match ok {
                Some(ty) => flatten(ty)?,
                None => Vec::new(),
            };
            let err_flat = match err {
                Some(ty) => flatten(ty)?,
                None => Vec::new(),
            };
            let mut flat = vec![CoreType::I32];
            flat.extend(join(&ok_flat, &err_flat));
            flat
        },
        ValType::Variant(cases) => {
            let mut payload: Vec<CoreType> = Vec::new();
            for case in cases {
                if let Some(ty) = &case.ty {
                    let case_flat = flatten(ty)?;
                    payload = join(&payload, &case_flat);
                }
            }
            let mut flat = vec![CoreType::I32];
            flat.extend(payload);
            flat
        },
        ValType::Enum(_) => vec![CoreType::I32],
        ValType::Flags(names) => {
            if names.len() <= 32 {
                vec![CoreType::I32]
            } else if names.len() <= 64 {
                vec![CoreType::I64]
            } else {
                // Beyond 64 flags the flat form follows the memory layout.
                let words = layout(ty)?.size / 4;
                vec![CoreType::I32; words as usize]
            }
        },
    };
    Ok(flat)
}

/// Union two payload slot sequences element-wise.
///
/// Identical types unify; an i32/f32 pair in either order becomes i32; any
/// other mismatch widens to i64. The result is as long as the longer
/// operand.
pub fn join(a: &[CoreType], b: &[CoreType]) -> Vec<CoreType> {
    let len = a.len().max(b.len());
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let slot = match (a.get(i), b.get(i)) {
            (Some(x), None) => *x,
            (None, Some(y)) => *y,
            (Some(x), Some(y)) if x == y => *x,
            (Some(CoreType::I32), Some(CoreType::F32))
            | (Some(CoreType::F32), Some(CoreType::I32)) => CoreType::I32,
            _ => CoreType::I64,
        };
        out.push(slot);
    }
    out
}

/// Flatten a function signature for the given context.
///
/// Returns `(params, results)` after the register budgets are applied:
/// more than [`MAX_FLAT_PARAMS`] parameter slots collapse to a single
/// pointer; more than [`MAX_FLAT_RESULTS`] result slots become a returned
/// pointer when lifting, or an appended return-pointer parameter when
/// lowering.
pub fn flatten_function(ty: &FuncType, context: CanonContext) -> Result<(Vec<CoreType>, Vec<CoreType>)> {
    let mut params = Vec::new();
    for (_, param) in &ty.params {
        params.extend(flatten(param)?);
    }
    let mut results = match &ty.result {
        Some(result) => flatten(result)?,
        None => Vec::new(),
    };

    if params.len() > MAX_FLAT_PARAMS {
        params = vec![CoreType::I32];
    }

    if results.len() > MAX_FLAT_RESULTS {
        match context {
            CanonContext::Lift => results = vec![CoreType::I32],
            CanonContext::Lower => {
                params.push(CoreType::I32);
                results = Vec::new();
            },
        }
    }

    Ok((params, results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CaseType;

    fn func(params: &[ValType], result: Option<ValType>) -> FuncType {
        FuncType {
            params: params.iter().enumerate().map(|(i, t)| (format!("p{}", i), t.clone())).collect(),
            result,
        }
    }

    #[test]
    fn scalar_flattening() {
        assert_eq!(flatten(&ValType::Bool).unwrap(), vec![CoreType::I32]);
        assert_eq!(flatten(&ValType::U64).unwrap(), vec![CoreType::I64]);
        assert_eq!(flatten(&ValType::F32).unwrap(), vec![CoreType::F32]);
        assert_eq!(flatten(&ValType::String).unwrap(), vec![CoreType::I32, CoreType::I32]);
    }

    #[test]
    fn record_flattening_concatenates() {
        let ty = ValType::Record(vec![
            ("a".to_string(), ValType::U8),
            ("b".to_string(), ValType::U64),
        ]);
        assert_eq!(flatten(&ty).unwrap(), vec![CoreType::I32, CoreType::I64]);
    }

    #[test]
    fn join_rules() {
        assert_eq!(join(&[CoreType::I32], &[CoreType::I32]), vec![CoreType::I32]);
        assert_eq!(join(&[CoreType::F32], &[CoreType::I32]), vec![CoreType::I32]);
        assert_eq!(join(&[CoreType::I32], &[CoreType::F32]), vec![CoreType::I32]);
        assert_eq!(join(&[CoreType::F32], &[CoreType::F64]), vec![CoreType::I64]);
        assert_eq!(join(&[CoreType::I32], &[CoreType::I64]), vec![CoreType::I64]);
        // Unequal lengths keep the longer tail.
        assert_eq!(
            join(&[CoreType::I32], &[CoreType::F32, CoreType::F64]),
            vec![CoreType::I32, CoreType::F64]
        );
    }

    #[test]
    fn variant_payload_joins_across_cases() {
        let ty = ValType::Variant(vec![
            CaseType { name: "a".to_string(), ty: Some(ValType::F32) },
            CaseType { name: "b".to_string(), ty: Some(ValType::U32) },
            CaseType { name: "c".to_string(), ty: None },
        ]);
        assert_eq!(flatten(&ty).unwrap(), vec![CoreType::I32, CoreType::I32]);
    }

    #[test]
    fn option_and_result_flattening() {
        let ty = ValType::Option(Box::new(ValType::F64));
        assert_eq!(flatten(&ty).unwrap(), vec![CoreType::I32, CoreType::F64]);

        let ty = ValType::Result {
            ok: Some(Box::new(ValType::U64)),
            err: Some(Box::new(ValType::F32)),
        };
        assert_eq!(flatten(&ty).unwrap(), vec![CoreType::I32, CoreType::I64]);
    }

    #[test]
    fn large_flags_follow_memory_layout() {
        let names: Vec<String> = (0..65).map(|i| format!("f{}", i)).collect();
        assert_eq!(flatten(&ValType::Flags(names)).unwrap(), vec![CoreType::I32; 3]);
    }

    #[test]
    fn string_result_lowers_through_a_return_pointer() {
        let ty = func(&[], Some(ValType::String));
        let (params, results) = flatten_function(&ty, CanonContext::Lower).unwrap();
        assert_eq!(params, vec![CoreType::I32]);
        assert!(results.is_empty());

        let (params, results) = flatten_function(&ty, CanonContext::Lift).unwrap();
        assert!(params.is_empty());
        assert_eq!(results, vec![CoreType::I32]);
    }

    #[test]
    fn oversized_params_collapse_to_a_pointer() {
        let ty = func(&vec![ValType::U32; 17], None);
        let (params, results) = flatten_function(&ty, CanonContext::Lift).unwrap();
        assert_eq!(params, vec![CoreType::I32]);
        assert!(results.is_empty());

        // Exactly sixteen stays direct.
        let ty = func(&vec![ValType::U32; 16], None);
        let (params, _) = flatten_function(&ty, CanonContext::Lift).unwrap();
        assert_eq!(params.len(), 16);
    }

    #[test]
    fn oversized_params_and_results_in_lower_context() {
        let ty = func(&vec![ValType::U64; 17], Some(ValType::String));
        let (params, results) = flatten_function(&ty, CanonContext::Lower).unwrap();
        // Indirect args pointer plus appended return pointer.
        assert_eq!(params, vec![CoreType::I32, CoreType::I32]);
        assert!(results.is_empty());
    }
}
