// Copyright (c) 2025 The Weft Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Lowering: generic values to core-wasm representation.
//!
//! Lowering needs the realloc capability for strings, lists, and
//! indirect-return structs. Aggregate regions are zero-filled before the
//! live fields are written, so padding and inactive variant tails are
//! deterministic. Float NaNs are canonicalized on every write.

use crate::prelude::*;
use crate::types::{CaseType, ValType};
use crate::values::Value;

use super::flatten::{flatten, join, CoreType};
use super::layout::{discriminant_size, layout, payload_offset, record_layout, Layout};
use super::lift::{canonical_f32, canonical_f64, CoreVal, MAX_STRING_BYTES};
use super::memory::{Memory, Realloc};

/// Byte cap on lowered list contents.
const MAX_LIST_BYTES: u64 = 1 << 30;

fn write_addr(base: u32, offset: u32) -> Result<u32> {
    base.checked_add(offset)
        .ok_or_else(|| Error::lower(ErrorKind::Overflow, "address arithmetic overflows u32"))
}

fn alloc<R: Realloc>(realloc: &mut R, align: u32, size: u32) -> Result<u32> {
    let ptr = realloc.realloc(0, 0, align, size)?;
    if ptr == 0 && size != 0 {
        return Err(Error::lower(
            ErrorKind::Overflow,
            format!("realloc failed for {} bytes (align {})", size, align),
        ));
    }
    Ok(ptr)
}

fn case_mismatch(case: &str, cases: &[CaseType]) -> Error {
    Error::lower(
        ErrorKind::InvalidDiscriminant,
        format!("case {:?} is not one of the {} declared cases", case, cases.len()),
    )
}

fn expect_variant<'v>(value: &'v Value, what: &str) -> Result<(&'v str, Option<&'v Value>)> {
    match value {
        Value::Variant { case, payload } => Ok((case.as_str(), payload.as_deref())),
        other => Err(Error::lower(
            ErrorKind::InvalidDiscriminant,
            format!("expected {}, got {}", what, other.shape_name()),
        )),
    }
}

/// Lower `value` into flat slots, allocating indirect data through
/// `realloc`.
///
/// The returned slots match `flatten(ty)` exactly.
pub fn lower_flat<M: Memory, R: Realloc>(
    ty: &ValType,
    value: &Value,
    memory: &mut M,
    realloc: &mut R,
) -> Result<Vec<CoreVal>> {
    let slots = match ty {
        ValType::Bool => vec![CoreVal::I32(i32::from(value.coerce_bool()?))],
        ValType::U8 => vec![CoreVal::I32(value.coerce_unsigned(8)? as i32)],
        ValType::S8 => vec![CoreVal::I32(value.coerce_signed(8)? as u8 as i32)],
        ValType::U16 => vec![CoreVal::I32(value.coerce_unsigned(16)? as i32)],
        ValType::S16 => vec![CoreVal::I32(value.coerce_signed(16)? as u16 as i32)],
        ValType::U32 => vec![CoreVal::I32(value.coerce_unsigned(32)? as i32)],
        ValType::S32 => vec![CoreVal::I32(value.coerce_signed(32)? as i32)],
        ValType::U64 => vec![CoreVal::I64(value.coerce_unsigned(64)? as i64)],
        ValType::S64 => vec![CoreVal::I64(value.coerce_signed(64)?)],
        ValType::F32 => vec![CoreVal::F32(canonical_f32(value.coerce_f32()?))],
        ValType::F64 => vec![CoreVal::F64(canonical_f64(value.coerce_f64()?))],
        ValType::Char => vec![CoreVal::I32(value.coerce_char()? as u32 as i32)],
        ValType::String => {
            let (ptr, len) = store_string(value.coerce_str()?, memory, realloc)?;
            vec![CoreVal::I32(ptr as i32), CoreVal::I32(len as i32)]
        },
        ValType::List(element) => {
            let (ptr, len) = store_list(element, value, memory, realloc)?;
            vec![CoreVal::I32(ptr as i32), CoreVal::I32(len as i32)]
        },
        ValType::Record(fields) => {
            let entries = match value {
                Value::Record(entries) => entries,
                other => {
                    return Err(Error::lower(
                        ErrorKind::InvalidDiscriminant,
                        format!("expected record, got {}", other.shape_name()),
                    ));
                },
            };
            let mut slots = Vec::new();
            for (name, field_ty) in fields {
                let field_value = entries
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| v)
                    .ok_or_else(|| {
                        Error::lower(
                            ErrorKind::InvalidDiscriminant,
                            format!("record value is missing field {:?}", name),
                        )
                    })?;
                slots.extend(lower_flat(field_ty, field_value, memory, realloc).in_field(name)?);
            }
            slots
        },
        ValType::Tuple(members) => {
            let entries = match value {
                Value::Tuple(entries) if entries.len() == members.len() => entries,
                other => {
                    return Err(Error::lower(
                        ErrorKind::InvalidDiscriminant,
                        format!("expected {}-tuple, got {}", members.len(), other.shape_name()),
                    ));
                },
            };
            let mut slots = Vec::new();
            for (idx, (member, entry)) in members.iter().zip(entries).enumerate() {
                slots.extend(lower_flat(member, entry, memory, realloc).at_index(idx as u32)?);
            }
            slots
        },
        ValType::Option(payload) => {
            let (case, inner) = expect_variant(value, "option")?;
            let payload_flat = flatten(payload)?;
            match (case, inner) {
                ("none", _) => {
                    let mut slots = vec![CoreVal::I32(0)];
                    slots.extend(payload_flat.iter().map(|t| zero_slot(*t)));
                    slots
                },
                ("some", Some(inner)) => {
                    let mut slots = vec![CoreVal::I32(1)];
                    slots.extend(lower_flat(payload, inner, memory, realloc).in_case("some")?);
                    slots
                },
                _ => {
                    return Err(Error::lower(
                        ErrorKind::InvalidDiscriminant,
                        format!("option value has case {:?}", case),
                    ));
                },
            }
        },
        ValType::Result { ok, err } => {
            let cases = result_cases(ok, err);
            lower_cases_flat(&cases, value, memory, realloc)?
        },
        ValType::Variant(cases) => lower_cases_flat(cases, value, memory, realloc)?,
        ValType::Enum(names) => {
            let (case, _) = expect_variant(value, "enum")?;
            let ordinal = names.iter().position(|n| n == case).ok_or_else(|| {
                Error::lower(
                    ErrorKind::InvalidDiscriminant,
                    format!("enum value {:?} is not a declared case", case),
                )
            })?;
            vec![CoreVal::I32(ordinal as i32)]
        },
        ValType::Flags(names) => {
            let bits = flags_bits(names, value)?;
            if names.len() <= 32 {
                vec![CoreVal::I32(bits[0] as i32)]
            } else if names.len() <= 64 {
                vec![CoreVal::I64((u64::from(bits[1]) << 32 | u64::from(bits[0])) as i64)]
            } else {
                bits.iter().map(|word| CoreVal::I32(*word as i32)).collect()
            }
        },
        ValType::Own(_) | ValType::Borrow(_) | ValType::ErrorContext => {
            vec![CoreVal::I32(value.coerce_handle()? as i32)]
        },
    };
    Ok(slots)
}

fn lower_cases_flat<M: Memory, R: Realloc>(
    cases: &[CaseType],
    value: &Value,
    memory: &mut M,
    realloc: &mut R,
) -> Result<Vec<CoreVal>> {
    let (case_name, payload) = expect_variant(value, "variant")?;
    let ordinal = cases
        .iter()
        .position(|c| c.name == case_name)
        .ok_or_else(|| case_mismatch(case_name, cases))?;
    let case = &cases[ordinal];

    let mut joined: Vec<CoreType> = Vec::new();
    for case in cases {
        if let Some(ty) = &case.ty {
            joined = join(&joined, &flatten(ty)?);
        }
    }

    let mut slots = vec![CoreVal::I32(ordinal as i32)];
    let payload_slots = match (&case.ty, payload) {
        (None, _) => Vec::new(),
        (Some(ty), Some(payload)) => lower_flat(ty, payload, memory, realloc).in_case(case_name)?,
        (Some(_), None) => {
            return Err(Error::lower(
                ErrorKind::InvalidDiscriminant,
                format!("case {:?} requires a payload", case_name),
            ));
        },
    };

    // Store the payload in the joined slot types and zero-fill the tail.
    for (idx, slot_ty) in joined.iter().enumerate() {
        match payload_slots.get(idx) {
            Some(slot) => slots.push(slot.convert_to(*slot_ty)),
            None => slots.push(zero_slot(*slot_ty)),
        }
    }
    Ok(slots)
}

/// Lower `value` into linear memory at `addr`, which must be aligned for
/// `ty`.
pub fn lower_memory<M: Memory, R: Realloc>(
    ty: &ValType,
    value: &Value,
    memory: &mut M,
    realloc: &mut R,
    addr: u32,
) -> Result<()> {
    match ty {
        ValType::Bool => memory.write_u8(addr, u8::from(value.coerce_bool()?))?,
        ValType::U8 => memory.write_u8(addr, value.coerce_unsigned(8)? as u8)?,
        ValType::S8 => memory.write_u8(addr, value.coerce_signed(8)? as u8)?,
        ValType::U16 => memory.write_u16(addr, value.coerce_unsigned(16)? as u16)?,
        ValType::S16 => memory.write_u16(addr, value.coerce_signed(16)? as u16)?,
        ValType::U32 => memory.write_u32(addr, value.coerce_unsigned(32)? as u32)?,
        ValType::S32 => memory.write_u32(addr, value.coerce_signed(32)? as u32)?,
        ValType::U64 => memory.write_u64(addr, value.coerce_unsigned(64)?)?,
        ValType::S64 => memory.write_u64(addr, value.coerce_signed(64)? as u64)?,
        ValType::F32 => memory.write_u32(addr, canonical_f32(value.coerce_f32()?).to_bits())?,
        ValType::F64 => memory.write_u64(addr, canonical_f64(value.coerce_f64()?).to_bits())?,
        ValType::Char => memory.write_u32(addr, value.coerce_char()? as u32)?,
        ValType::String => {
            let (ptr, len) = store_string(value.coerce_str()?, memory, realloc)?;
            memory.write_u32(addr, ptr)?;
            memory.write_u32(write_addr(addr, 4)?, len)?;
        },
        ValType::List(element) => {
            let (ptr, len) = store_list(element, value, memory, realloc)?;
            memory.write_u32(addr, ptr)?;
            memory.write_u32(write_addr(addr, 4)?, len)?;
        },
        ValType::Record(_) | ValType::Tuple(_) | ValType::Option(_) | ValType::Result { .. }
        | ValType::Variant(_) => {
            lower_aggregate_memory(ty, value, memory, realloc, addr)?;
        },
        ValType::Enum(names) => {
            let (case, _) = expect_variant(value, "enum")?;
            let ordinal = names.iter().position(|n| n == case).ok_or_else(|| {
                Error::lower(
                    ErrorKind::InvalidDiscriminant,
                    format!("enum value {:?} is not a declared case", case),
                )
            })?;
            write_discriminant(memory, addr, discriminant_size(names.len()), ordinal as u32)?;
        },
        ValType::Flags(names) => {
            let bits = flags_bits(names, value)?;
            let flags_layout = layout(ty)?;
            let mut bytes = Vec::with_capacity(flags_layout.size as usize);
            for word in &bits {
                bytes.extend_from_slice(&word.to_le_bytes());
            }
            bytes.truncate(flags_layout.size as usize);
            memory.write(addr, &bytes)?;
        },
        ValType::Own(_) | ValType::Borrow(_) | ValType::ErrorContext => {
            memory.write_u32(addr, value.coerce_handle()?)?;
        },
    }
    Ok(())
}

fn lower_aggregate_memory<M: Memory, R: Realloc>(
    ty: &ValType,
    value: &Value,
    memory: &mut M,
    realloc: &mut R,
    addr: u32,
) -> Result<()> {
    // Zero the whole region first so padding and inactive tails are
    // deterministic.
    let Layout { size, .. } = layout(ty)?;
    memory.write(addr, &vec![0u8; size as usize])?;

    match ty {
        ValType::Record(fields) => {
            let entries = match value {
                Value::Record(entries) => entries,
                other => {
                    return Err(Error::lower(
                        ErrorKind::InvalidDiscriminant,
                        format!("expected record, got {}", other.shape_name()),
                    ));
                },
            };
            let types: Vec<&ValType> = fields.iter().map(|(_, ty)| ty).collect();
            let (_, offsets) = record_layout(&types)?;
            for ((name, field_ty), offset) in fields.iter().zip(offsets) {
                let field_value = entries
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| v)
                    .ok_or_else(|| {
                        Error::lower(
                            ErrorKind::InvalidDiscriminant,
                            format!("record value is missing field {:?}", name),
                        )
                    })?;
                lower_memory(field_ty, field_value, memory, realloc, write_addr(addr, offset)?)
                    .in_field(name)?;
            }
        },
        ValType::Tuple(members) => {
            let entries = match value {
                Value::Tuple(entries) if entries.len() == members.len() => entries,
                other => {
                    return Err(Error::lower(
                        ErrorKind::InvalidDiscriminant,
                        format!("expected {}-tuple, got {}", members.len(), other.shape_name()),
                    ));
                },
            };
            let types: Vec<&ValType> = members.iter().collect();
            let (_, offsets) = record_layout(&types)?;
            for (idx, (member, offset)) in members.iter().zip(offsets).enumerate() {
                lower_memory(member, &entries[idx], memory, realloc, write_addr(addr, offset)?)
                    .at_index(idx as u32)?;
            }
        },
        ValType::Option(payload) => {
            let (case, inner) = expect_variant(value, "option")?;
            let payload_layout = layout(payload)?;
            let offset = payload_offset(1, payload_layout.align)?;
            match (case, inner) {
                ("none", _) => memory.write_u8(addr, 0)?,
                ("some", Some(inner)) => {
                    memory.write_u8(addr, 1)?;
                    lower_memory(payload, inner, memory, realloc, write_addr(addr, offset)?)
                        .in_case("some")?;
                },
                _ => {
                    return Err(Error::lower(
                        ErrorKind::InvalidDiscriminant,
                        format!("option value has case {:?}", case),
                    ));
                },
            }
        },
        ValType::Result { ok, err } => {
            let cases = result_cases(ok, err);
            lower_cases_memory(&cases, 1, value, memory, realloc, addr)?;
        },
        ValType::Variant(cases) => {
            lower_cases_memory(cases, discriminant_size(cases.len()), value, memory, realloc, addr)?;
        },
        _ => unreachable!("lower_aggregate_memory called on non-aggregate"),
    }
    Ok(())
}

fn lower_cases_memory<M: Memory, R: Realloc>(
    cases: &[CaseType],
    disc_size: u32,
    value: &Value,
    memory: &mut M,
    realloc: &mut R,
    addr: u32,
) -> Result<()> {
    let (case_name, payload) = expect_variant(value, "variant")?;
    let ordinal = cases
        .iter()
        .position(|c| c.name == case_name)
        .ok_or_else(|| case_mismatch(case_name, cases))?;
    let case = &cases[ordinal];

    write_discriminant(memory, addr, disc_size, ordinal as u32)?;

    let mut payload_align = 1u32;
    for case in cases {
        if let Some(ty) = &case.ty {
            payload_align = payload_align.max(layout(ty)?.align);
        }
    }
    let offset = payload_offset(disc_size, payload_align)?;

    match (&case.ty, payload) {
        (None, _) => {},
        (Some(ty), Some(payload)) => {
            lower_memory(ty, payload, memory, realloc, write_addr(addr, offset)?)
                .in_case(case_name)?;
        },
        (Some(_), None) => {
            return Err(Error::lower(
                ErrorKind::InvalidDiscriminant,
                format!("case {:?} requires a payload", case_name),
            ));
        },
    }
    Ok(())
}

/// Lower a value into a fresh heap allocation and return its address; used
/// for indirect returns when a signature exceeds the flat-result budget.
pub fn lower_into_retptr<M: Memory, R: Realloc>(
    ty: &ValType,
    value: &Value,
    memory: &mut M,
    realloc: &mut R,
) -> Result<u32> {
    let ty_layout = layout(ty)?;
    let ptr = alloc(realloc, ty_layout.align, ty_layout.size)?;
    lower_memory(ty, value, memory, realloc, ptr)?;
    Ok(ptr)
}

fn store_string<M: Memory, R: Realloc>(
    text: &str,
    memory: &mut M,
    realloc: &mut R,
) -> Result<(u32, u32)> {
    let len = text.len();
    if len as u64 > u64::from(MAX_STRING_BYTES) {
        return Err(Error::lower(ErrorKind::Overflow, format!("string length {} exceeds cap", len)));
    }
    let ptr = alloc(realloc, 1, len as u32)?;
    memory.write(ptr, text.as_bytes())?;
    Ok((ptr, len as u32))
}

fn store_list<M: Memory, R: Realloc>(
    element: &ValType,
    value: &Value,
    memory: &mut M,
    realloc: &mut R,
) -> Result<(u32, u32)> {
    let items = match value {
        Value::List(items) => items,
        other => {
            return Err(Error::lower(
                ErrorKind::InvalidDiscriminant,
                format!("expected list, got {}", other.shape_name()),
            ));
        },
    };
    let element_layout = layout(element)?;
    let total = items.len() as u64 * u64::from(element_layout.size);
    if total > MAX_LIST_BYTES {
        return Err(Error::lower(
            ErrorKind::Overflow,
            format!("list of {} bytes exceeds cap", total),
        ));
    }
    let ptr = alloc(realloc, element_layout.align, total as u32)?;
    for (idx, item) in items.iter().enumerate() {
        let addr = write_addr(ptr, idx as u32 * element_layout.size)?;
        lower_memory(element, item, memory, realloc, addr).at_index(idx as u32)?;
    }
    Ok((ptr, items.len() as u32))
}

fn result_cases(ok: &Option<Box<ValType>>, err: &Option<Box<ValType>>) -> Vec<CaseType> {
    vec![
        CaseType { name: "ok".to_string(), ty: ok.as_deref().cloned() },
        CaseType { name: "error".to_string(), ty: err.as_deref().cloned() },
    ]
}

fn write_discriminant<M: Memory>(memory: &mut M, addr: u32, size: u32, value: u32) -> Result<()> {
    match size {
        1 => memory.write_u8(addr, value as u8),
        2 => memory.write_u16(addr, value as u16),
        _ => memory.write_u32(addr, value),
    }
}

fn zero_slot(ty: CoreType) -> CoreVal {
    match ty {
        CoreType::I32 => CoreVal::I32(0),
        CoreType::I64 => CoreVal::I64(0),
        CoreType::F32 => CoreVal::F32(0.0),
        CoreType::F64 => CoreVal::F64(0.0),
    }
}

fn flags_bits(names: &[String], value: &Value) -> Result<Vec<u32>> {
    let set = match value {
        Value::Flags(set) => set,
        other => {
            return Err(Error::lower(
                ErrorKind::InvalidDiscriminant,
                format!("expected flags, got {}", other.shape_name()),
            ));
        },
    };
    let words = names.len().div_ceil(32).max(1);
    let mut bits = vec![0u32; words];
    for name in set {
        let index = names.iter().position(|n| n == name).ok_or_else(|| {
            Error::lower(
                ErrorKind::InvalidDiscriminant,
                format!("flag {:?} is not a declared flag", name),
            )
        })?;
        bits[index / 32] |= 1u32 << (index % 32);
    }
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical_abi::lift::{lift_flat, lift_memory};
    use crate::canonical_abi::memory::{BumpAllocator, SimpleMemory};

    fn arena() -> (SimpleMemory, BumpAllocator) {
        (SimpleMemory::new(4096), BumpAllocator::new(8, 4096))
    }

    #[test]
    fn scalars_roundtrip_through_flat() {
        let (mut memory, mut realloc) = arena();
        for (ty, value) in [
            (ValType::Bool, Value::Bool(true)),
            (ValType::U8, Value::U8(200)),
            (ValType::S16, Value::S16(-300)),
            (ValType::U64, Value::U64(1 << 40)),
            (ValType::Char, Value::Char('ß')),
        ] {
            let slots = lower_flat(&ty, &value, &mut memory, &mut realloc).unwrap();
            let back = lift_flat(&ty, &slots, &memory).unwrap();
            assert_eq!(back, value, "{:?}", ty);
        }
    }

    #[test]
    fn string_lowering_allocates_and_roundtrips() {
        let (mut memory, mut realloc) = arena();
        let value = Value::String("déjà vu".to_string());
        let slots = lower_flat(&ValType::String, &value, &mut memory, &mut realloc).unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(lift_flat(&ValType::String, &slots, &memory).unwrap(), value);
    }

    #[test]
    fn list_lowering_respects_element_stride() {
        let (mut memory, mut realloc) = arena();
        let ty = ValType::List(Box::new(ValType::U32));
        let value = Value::List(vec![Value::U32(1), Value::U32(2), Value::U32(3)]);
        let slots = lower_flat(&ty, &value, &mut memory, &mut realloc).unwrap();
        assert_eq!(lift_flat(&ty, &slots, &memory).unwrap(), value);
    }

    #[test]
    fn record_roundtrips_through_memory() {
        let (mut memory, mut realloc) = arena();
        let ty = ValType::Record(vec![
            ("a".to_string(), ValType::U8),
            ("b".to_string(), ValType::U64),
        ]);
        let value = Value::Record(vec![
            ("a".to_string(), Value::U8(9)),
            ("b".to_string(), Value::U64(77)),
        ]);
        lower_memory(&ty, &value, &mut memory, &mut realloc, 16).unwrap();
        assert_eq!(lift_memory(&ty, &memory, 16).unwrap(), value);
    }

    #[test]
    fn variant_inactive_tail_is_zeroed() {
        let (mut memory, mut realloc) = arena();
        let ty = ValType::Variant(vec![
            CaseType { name: "big".to_string(), ty: Some(ValType::U64) },
            CaseType { name: "small".to_string(), ty: None },
        ]);
        // Pre-fill so the zero-fill is observable.
        memory.write(16, &[0xFF; 16]).unwrap();
        let value = Value::tag("small");
        lower_memory(&ty, &value, &mut memory, &mut realloc, 16).unwrap();
        assert_eq!(memory.read(17, 15).unwrap(), vec![0u8; 15]);
        assert_eq!(lift_memory(&ty, &memory, 16).unwrap(), value);
    }

    #[test]
    fn variant_flat_payload_goes_through_joined_slots() {
        let (mut memory, mut realloc) = arena();
        let ty = ValType::Variant(vec![
            CaseType { name: "f".to_string(), ty: Some(ValType::F32) },
            CaseType { name: "i".to_string(), ty: Some(ValType::U32) },
        ]);
        let value = Value::tag_with("f", Value::F32(2.5));
        let slots = lower_flat(&ty, &value, &mut memory, &mut realloc).unwrap();
        // Joined payload slot is i32 carrying the float bits.
        assert_eq!(slots[0], CoreVal::I32(0));
        assert_eq!(slots[1], CoreVal::I32(2.5f32.to_bits() as i32));
        assert_eq!(lift_flat(&ty, &slots, &memory).unwrap(), value);
    }

    #[test]
    fn nan_is_canonicalized_on_lower() {
        let (mut memory, mut realloc) = arena();
        let value = Value::F64(f64::from_bits(0x7FF8_0000_0000_0042));
        lower_memory(&ValType::F64, &value, &mut memory, &mut realloc, 0).unwrap();
        assert_eq!(memory.read_u64(0).unwrap(), 0x7FF8_0000_0000_0000);

        let slots =
            lower_flat(&ValType::F32, &Value::F32(f32::NAN), &mut memory, &mut realloc).unwrap();
        match slots[0] {
            CoreVal::F32(f) => assert_eq!(f.to_bits(), 0x7FC0_0000),
            other => panic!("expected f32 slot, got {:?}", other),
        }
    }

    #[test]
    fn numeric_coercion_applies_when_lowering() {
        let (mut memory, mut realloc) = arena();
        // A u64-shaped host number fills a u8 slot when in range.
        let slots = lower_flat(&ValType::U8, &Value::U64(7), &mut memory, &mut realloc).unwrap();
        assert_eq!(slots, vec![CoreVal::I32(7)]);

        let err = lower_flat(&ValType::U8, &Value::U64(256), &mut memory, &mut realloc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Overflow);

        let err =
            lower_flat(&ValType::U32, &Value::F64(1.5), &mut memory, &mut realloc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Overflow);
    }

    #[test]
    fn enum_and_flags_lower_to_integers() {
        let (mut memory, mut realloc) = arena();
        let ty = ValType::Enum(vec!["a".to_string(), "b".to_string()]);
        let slots = lower_flat(&ty, &Value::tag("b"), &mut memory, &mut realloc).unwrap();
        assert_eq!(slots, vec![CoreVal::I32(1)]);

        let err = lower_flat(&ty, &Value::tag("zzz"), &mut memory, &mut realloc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidDiscriminant);

        let ty = ValType::Flags(vec!["x".to_string(), "y".to_string(), "z".to_string()]);
        let value = Value::Flags(vec!["x".to_string(), "z".to_string()]);
        let slots = lower_flat(&ty, &value, &mut memory, &mut realloc).unwrap();
        assert_eq!(slots, vec![CoreVal::I32(0b101)]);
    }

    #[test]
    fn retptr_lowering_allocates_an_aligned_struct() {
        let (mut memory, mut realloc) = arena();
        let ty = ValType::Record(vec![
            ("x".to_string(), ValType::U64),
            ("y".to_string(), ValType::U8),
        ]);
        let value = Value::Record(vec![
            ("x".to_string(), Value::U64(11)),
            ("y".to_string(), Value::U8(22)),
        ]);
        let ptr = lower_into_retptr(&ty, &value, &mut memory, &mut realloc).unwrap();
        assert_eq!(ptr % 8, 0);
        assert_eq!(lift_memory(&ty, &memory, ptr).unwrap(), value);
    }

    #[test]
    fn exhausted_allocator_surfaces_as_overflow() {
        let mut memory = SimpleMemory::new(16);
        let mut realloc = BumpAllocator::new(8, 16);
        let value = Value::String("this does not fit in eight bytes".to_string());
        let err = lower_flat(&ValType::String, &value, &mut memory, &mut realloc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Overflow);
    }
}
