// Copyright (c) 2025 The Weft Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Lifting: core-wasm representation to generic values.
//!
//! A lift consumes flat argument slots for top-level calls and linear
//! memory for aggregates and indirect data. Float NaNs are canonicalized
//! on every lift; chars are validated; strings must be UTF-8.

use crate::prelude::*;
use crate::types::{CaseType, ValType};
use crate::values::Value;

use super::flatten::{flatten, join, CoreType};
use super::layout::{discriminant_size, layout, payload_offset, record_layout};
use super::memory::Memory;

/// Byte cap on lifted strings.
pub const MAX_STRING_BYTES: u32 = 1 << 30;

/// Element cap on lifted lists.
pub const MAX_LIST_ELEMENTS: u32 = 1 << 27;

/// A core value in a flat slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoreVal {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl CoreVal {
    /// The slot type this value occupies.
    pub fn core_type(&self) -> CoreType {
        match self {
            Self::I32(_) => CoreType::I32,
            Self::I64(_) => CoreType::I64,
            Self::F32(_) => CoreType::F32,
            Self::F64(_) => CoreType::F64,
        }
    }

    /// Reinterpret into another slot type.
    ///
    /// Variant payloads are stored in joined slots, so the stored type can
    /// be wider than what the active case expects; narrowing keeps the low
    /// bits and float/integer crossings go through the bit pattern.
    pub fn convert_to(self, target: CoreType) -> CoreVal {
        match (self, target) {
            (value, target) if value.core_type() == target => value,
            (Self::I32(v), CoreType::I64) => Self::I64(i64::from(v as u32)),
            (Self::I32(v), CoreType::F32) => Self::F32(f32::from_bits(v as u32)),
            (Self::I32(v), CoreType::F64) => Self::F64(f64::from_bits(u64::from(v as u32))),
            (Self::I64(v), CoreType::I32) => Self::I32(v as i32),
            (Self::I64(v), CoreType::F32) => Self::F32(f32::from_bits(v as u32)),
            (Self::I64(v), CoreType::F64) => Self::F64(f64::from_bits(v as u64)),
            (Self::F32(v), CoreType::I32) => Self::I32(v.to_bits() as i32),
            (Self::F32(v), CoreType::I64) => Self::I64(i64::from(v.to_bits())),
            (Self::F32(v), CoreType::F64) => Self::F64(f64::from_bits(u64::from(v.to_bits()))),
            (Self::F64(v), CoreType::I32) => Self::I32(v.to_bits() as i32),
            (Self::F64(v), CoreType::I64) => Self::I64(v.to_bits() as i64),
            (Self::F64(v), CoreType::F32) => Self::F32(f32::from_bits(v.to_bits() as u32)),
            (value, _) => value,
        }
    }
}

/// Canonicalize an f32 NaN to 0x7fc00000.
pub fn canonical_f32(value: f32) -> f32 {
    if value.is_nan() {
        f32::from_bits(0x7fc0_0000)
    } else {
        value
    }
}

/// Canonicalize an f64 NaN to 0x7ff8000000000000.
pub fn canonical_f64(value: f64) -> f64 {
    if value.is_nan() {
        f64::from_bits(0x7ff8_0000_0000_0000)
    } else {
        value
    }
}

fn valid_char(code: u32) -> Result<char> {
    char::from_u32(code).ok_or_else(|| {
        Error::lift(ErrorKind::InvalidChar, format!("code point {:#x} is not a valid char", code))
    })
}

struct FlatReader<'a> {
    slots: &'a [CoreVal],
    pos: usize,
}

impl<'a> FlatReader<'a> {
    fn new(slots: &'a [CoreVal]) -> Self {
        Self { slots, pos: 0 }
    }

    fn take(&mut self, expected: CoreType) -> Result<CoreVal> {
        let slot = self
            .slots
            .get(self.pos)
            .ok_or_else(|| Error::lift(ErrorKind::Truncated, "flat value slots exhausted"))?;
        self.pos += 1;
        Ok(slot.convert_to(expected))
    }

    fn take_u32(&mut self) -> Result<u32> {
        match self.take(CoreType::I32)? {
            CoreVal::I32(v) => Ok(v as u32),
            _ => Err(Error::lift(ErrorKind::Truncated, "expected i32 slot")),
        }
    }

    fn take_u64(&mut self) -> Result<u64> {
        match self.take(CoreType::I64)? {
            CoreVal::I64(v) => Ok(v as u64),
            _ => Err(Error::lift(ErrorKind::Truncated, "expected i64 slot")),
        }
    }

    fn take_f32(&mut self) -> Result<f32> {
        match self.take(CoreType::F32)? {
            CoreVal::F32(v) => Ok(v),
            _ => Err(Error::lift(ErrorKind::Truncated, "expected f32 slot")),
        }
    }

    fn take_f64(&mut self) -> Result<f64> {
        match self.take(CoreType::F64)? {
            CoreVal::F64(v) => Ok(v),
            _ => Err(Error::lift(ErrorKind::Truncated, "expected f64 slot")),
        }
    }

    fn skip(&mut self, count: usize) -> Result<()> {
        if self.pos + count > self.slots.len() {
            return Err(Error::lift(ErrorKind::Truncated, "flat value slots exhausted"));
        }
        self.pos += count;
        Ok(())
    }

    fn remaining(&self) -> usize {
        self.slots.len() - self.pos
    }
}

/// Lift a value of type `ty` from flat slots.
///
/// The slot sequence must match `flatten(ty)` exactly; leftover slots are
/// an error.
pub fn lift_flat<M: Memory>(ty: &ValType, vals: &[CoreVal], memory: &M) -> Result<Value> {
    let mut reader = FlatReader::new(vals);
    let value = lift_from_reader(ty, &mut reader, memory)?;
    if reader.remaining() != 0 {
        return Err(Error::lift(
            ErrorKind::Bounds,
            format!("{} flat value slots left unconsumed", reader.remaining()),
        ));
    }
    Ok(value)
}

fn lift_from_reader<M: Memory>(ty: &ValType, reader: &mut FlatReader<'_>, memory: &M) -> Result<Value> {
    let value = match ty {
        ValType::Bool => Value::Bool(reader.take_u32()? != 0),
        ValType::U8 => Value::U8(reader.take_u32()? as u8),
        ValType::S8 => Value::S8(reader.take_u32()? as u8 as i8),
        ValType::U16 => Value::U16(reader.take_u32()? as u16),
        ValType::S16 => Value::S16(reader.take_u32()? as u16 as i16),
        ValType::U32 => Value::U32(reader.take_u32()?),
        ValType::S32 => Value::S32(reader.take_u32()? as i32),
        ValType::U64 => Value::U64(reader.take_u64()?),
        ValType::S64 => Value::S64(reader.take_u64()? as i64),
        ValType::F32 => Value::F32(canonical_f32(reader.take_f32()?)),
        ValType::F64 => Value::F64(canonical_f64(reader.take_f64()?)),
        ValType::Char => Value::Char(valid_char(reader.take_u32()?)?),
        ValType::String => {
            let ptr = reader.take_u32()?;
            let len = reader.take_u32()?;
            load_string(memory, ptr, len)?
        },
        ValType::List(element) => {
            let ptr = reader.take_u32()?;
            let len = reader.take_u32()?;
            load_list(memory, element, ptr, len)?
        },
        ValType::Record(fields) => {
            let mut out = Vec::with_capacity(fields.len());
            for (name, field) in fields {
                let value = lift_from_reader(field, reader, memory).in_field(name)?;
                out.push((name.clone(), value));
            }
            Value::Record(out)
        },
        ValType::Tuple(members) => {
            let mut out = Vec::with_capacity(members.len());
            for (idx, member) in members.iter().enumerate() {
                out.push(lift_from_reader(member, reader, memory).at_index(idx as u32)?);
            }
            Value::Tuple(out)
        },
        ValType::Option(payload) => {
            let disc = reader.take_u32()?;
            let payload_slots = flatten(payload)?.len();
            match disc {
                0 => {
                    // None still consumes the padded payload slots.
                    reader.skip(payload_slots)?;
                    Value::tag("none")
                },
                1 => {
                    let value = lift_from_reader(payload, reader, memory).in_case("some")?;
                    Value::tag_with("some", value)
                },
                other => {
                    return Err(Error::lift(
                        ErrorKind::InvalidDiscriminant,
                        format!("option discriminant {}", other),
                    ));
                },
            }
        },
        ValType::Result { ok, err } => {
            let cases = [
                CaseType { name: "ok".to_string(), ty: ok.as_deref().cloned() },
                CaseType { name: "error".to_string(), ty: err.as_deref().cloned() },
            ];
            lift_cases_flat(&cases, reader, memory)?
        },
        ValType::Variant(cases) => lift_cases_flat(cases, reader, memory)?,
        ValType::Enum(cases) => {
            let ordinal = reader.take_u32()?;
            let case = cases.get(ordinal as usize).ok_or_else(|| {
                Error::lift(
                    ErrorKind::InvalidDiscriminant,
                    format!("enum discriminant {} out of {} cases", ordinal, cases.len()),
                )
            })?;
            Value::tag(case)
        },
        ValType::Flags(names) => {
            if names.len() <= 32 {
                flags_from_bits(names, u64::from(reader.take_u32()?))
            } else if names.len() <= 64 {
                flags_from_bits(names, reader.take_u64()?)
            } else {
                let words = layout(ty)?.size / 4;
                let mut bits = Vec::with_capacity(words as usize);
                for _ in 0..words {
                    bits.push(reader.take_u32()?);
                }
                flags_from_words(names, &bits)
            }
        },
        ValType::Own(_) | ValType::Borrow(_) | ValType::ErrorContext => {
            Value::Handle(reader.take_u32()?)
        },
    };
    Ok(value)
}

/// Lift a variant-shaped value from flat slots: discriminant, then the
/// active case's payload read out of the joined slot window.
fn lift_cases_flat<M: Memory>(
    cases: &[CaseType],
    reader: &mut FlatReader<'_>,
    memory: &M,
) -> Result<Value> {
    let disc = reader.take_u32()?;
    let case = cases.get(disc as usize).ok_or_else(|| {
        Error::lift(
            ErrorKind::InvalidDiscriminant,
            format!("discriminant {} out of {} cases", disc, cases.len()),
        )
    })?;

    let mut joined: Vec<CoreType> = Vec::new();
    for case in cases {
        if let Some(ty) = &case.ty {
            let flat = flatten(ty)?;
            joined = join(&joined, &flat);
        }
    }

    // Pull the whole joined window, then re-read the active case's slots
    // out of it with per-slot reinterpretation.
    let mut window = Vec::with_capacity(joined.len());
    for slot_ty in &joined {
        window.push(reader.take(*slot_ty)?);
    }

    let payload = match &case.ty {
        None => None,
        Some(ty) => {
            let expected = flatten(ty)?;
            let converted: Vec<CoreVal> = expected
                .iter()
                .zip(window.iter())
                .map(|(target, slot)| slot.convert_to(*target))
                .collect();
            if converted.len() < expected.len() {
                return Err(Error::lift(ErrorKind::Truncated, "joined payload window too short"));
            }
            let mut sub = FlatReader::new(&converted);
            let value = lift_from_reader(ty, &mut sub, memory).in_case(&case.name)?;
            Some(Box::new(value))
        },
    };

    Ok(Value::Variant { case: case.name.clone(), payload })
}

/// Lift a value of type `ty` from linear memory at `addr`.
pub fn lift_memory<M: Memory>(ty: &ValType, memory: &M, addr: u32) -> Result<Value> {
    let value = match ty {
        ValType::Bool => Value::Bool(memory.read_u8(addr)? != 0),
        ValType::U8 => Value::U8(memory.read_u8(addr)?),
        ValType::S8 => Value::S8(memory.read_u8(addr)? as i8),
        ValType::U16 => Value::U16(memory.read_u16(addr)?),
        ValType::S16 => Value::S16(memory.read_u16(addr)? as i16),
        ValType::U32 => Value::U32(memory.read_u32(addr)?),
        ValType::S32 => Value::S32(memory.read_u32(addr)? as i32),
        ValType::U64 => Value::U64(memory.read_u64(addr)?),
        ValType::S64 => Value::S64(memory.read_u64(addr)? as i64),
        ValType::F32 => Value::F32(canonical_f32(f32::from_bits(memory.read_u32(addr)?))),
        ValType::F64 => Value::F64(canonical_f64(f64::from_bits(memory.read_u64(addr)?))),
        ValType::Char => Value::Char(valid_char(memory.read_u32(addr)?)?),
        ValType::String => {
            let ptr = memory.read_u32(addr)?;
            let len = memory.read_u32(addr + 4)?;
            load_string(memory, ptr, len)?
        },
        ValType::List(element) => {
            let ptr = memory.read_u32(addr)?;
            let len = memory.read_u32(addr + 4)?;
            load_list(memory, element, ptr, len)?
        },
        ValType::Record(fields) => {
            let types: Vec<&ValType> = fields.iter().map(|(_, ty)| ty).collect();
            let (_, offsets) = record_layout(&types)?;
            let mut out = Vec::with_capacity(fields.len());
            for ((name, field), offset) in fields.iter().zip(offsets) {
                let value = lift_memory(field, memory, checked_addr(addr, offset)?).in_field(name)?;
                out.push((name.clone(), value));
            }
            Value::Record(out)
        },
        ValType::Tuple(members) => {
            let types: Vec<&ValType> = members.iter().collect();
            let (_, offsets) = record_layout(&types)?;
            let mut out = Vec::with_capacity(members.len());
            for (idx, (member, offset)) in members.iter().zip(offsets).enumerate() {
                out.push(
                    lift_memory(member, memory, checked_addr(addr, offset)?)
                        .at_index(idx as u32)?,
                );
            }
            Value::Tuple(out)
        },
        ValType::Option(payload) => {
            let disc = memory.read_u8(addr)?;
            let payload_layout = layout(payload)?;
            let offset = payload_offset(1, payload_layout.align)?;
            match disc {
                0 => Value::tag("none"),
                1 => {
                    let value = lift_memory(payload, memory, checked_addr(addr, offset)?)
                        .in_case("some")?;
                    Value::tag_with("some", value)
                },
                other => {
                    return Err(Error::lift(
                        ErrorKind::InvalidDiscriminant,
                        format!("option discriminant {}", other),
                    ));
                },
            }
        },
        ValType::Result { ok, err } => {
            let cases = [
                CaseType { name: "ok".to_string(), ty: ok.as_deref().cloned() },
                CaseType { name: "error".to_string(), ty: err.as_deref().cloned() },
            ];
            lift_cases_memory(&cases, 1, memory, addr)?
        },
        ValType::Variant(cases) => {
            lift_cases_memory(cases, discriminant_size(cases.len()), memory, addr)?
        },
        ValType::Enum(cases) => {
            let ordinal = read_discriminant(memory, addr, discriminant_size(cases.len()))?;
            let case = cases.get(ordinal as usize).ok_or_else(|| {
                Error::lift(
                    ErrorKind::InvalidDiscriminant,
                    format!("enum discriminant {} out of {} cases", ordinal, cases.len()),
                )
            })?;
            Value::tag(case)
        },
        ValType::Flags(names) => {
            let flags_size = layout(ty)?.size;
            let bytes = memory.read(addr, flags_size)?;
            let mut words = Vec::with_capacity(bytes.len().div_ceil(4));
            for chunk in bytes.chunks(4) {
                let mut word = [0u8; 4];
                word[..chunk.len()].copy_from_slice(chunk);
                words.push(u32::from_le_bytes(word));
            }
            flags_from_words(names, &words)
        },
        ValType::Own(_) | ValType::Borrow(_) | ValType::ErrorContext => {
            Value::Handle(memory.read_u32(addr)?)
        },
    };
    Ok(value)
}

fn lift_cases_memory<M: Memory>(
    cases: &[CaseType],
    disc_size: u32,
    memory: &M,
    addr: u32,
) -> Result<Value> {
    let disc = read_discriminant(memory, addr, disc_size)?;
    let case = cases.get(disc as usize).ok_or_else(|| {
        Error::lift(
            ErrorKind::InvalidDiscriminant,
            format!("discriminant {} out of {} cases", disc, cases.len()),
        )
    })?;

    let mut payload_align = 1u32;
    for case in cases {
        if let Some(ty) = &case.ty {
            payload_align = payload_align.max(layout(ty)?.align);
        }
    }
    let offset = payload_offset(disc_size, payload_align)?;

    let payload = match &case.ty {
        None => None,
        Some(ty) => Some(Box::new(
            lift_memory(ty, memory, checked_addr(addr, offset)?).in_case(&case.name)?,
        )),
    };
    Ok(Value::Variant { case: case.name.clone(), payload })
}

fn read_discriminant<M: Memory>(memory: &M, addr: u32, size: u32) -> Result<u32> {
    match size {
        1 => Ok(u32::from(memory.read_u8(addr)?)),
        2 => Ok(u32::from(memory.read_u16(addr)?)),
        _ => memory.read_u32(addr),
    }
}

fn load_string<M: Memory>(memory: &M, ptr: u32, len: u32) -> Result<Value> {
    if len > MAX_STRING_BYTES {
        return Err(Error::lift(ErrorKind::Overflow, format!("string length {} exceeds cap", len)));
    }
    let bytes = memory.read(ptr, len)?;
    let text = String::from_utf8(bytes)
        .map_err(|_| Error::lift(ErrorKind::InvalidUtf8, "string bytes are not valid UTF-8"))?;
    Ok(Value::String(text))
}

fn load_list<M: Memory>(memory: &M, element: &ValType, ptr: u32, len: u32) -> Result<Value> {
    if len > MAX_LIST_ELEMENTS {
        return Err(Error::lift(ErrorKind::Overflow, format!("list length {} exceeds cap", len)));
    }
    let element_layout = layout(element)?;
    // The whole list must fit in the address space.
    let total = u64::from(len) * u64::from(element_layout.size);
    if ptr as u64 + total > u64::from(u32::MAX) + 1 {
        return Err(Error::lift(ErrorKind::Overflow, "list extent overflows address space"));
    }
    let mut out = Vec::with_capacity(len as usize);
    for i in 0..len {
        let addr = ptr + i * element_layout.size;
        out.push(lift_memory(element, memory, addr).at_index(i)?);
    }
    Ok(Value::List(out))
}

fn checked_addr(base: u32, offset: u32) -> Result<u32> {
    base.checked_add(offset)
        .ok_or_else(|| Error::lift(ErrorKind::Overflow, "address arithmetic overflows u32"))
}

fn flags_from_bits(names: &[String], bits: u64) -> Value {
    let set = names
        .iter()
        .enumerate()
        .filter(|(i, _)| bits & (1u64 << i) != 0)
        .map(|(_, name)| name.clone())
        .collect();
    Value::Flags(set)
}

fn flags_from_words(names: &[String], words: &[u32]) -> Value {
    let set = names
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            let word = i / 32;
            let bit = i % 32;
            words.get(word).is_some_and(|w| w & (1u32 << bit) != 0)
        })
        .map(|(_, name)| name.clone())
        .collect();
    Value::Flags(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical_abi::memory::SimpleMemory;

    #[test]
    fn scalars_from_flat_slots() {
        let memory = SimpleMemory::new(0);
        assert_eq!(
            lift_flat(&ValType::Bool, &[CoreVal::I32(2)], &memory).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            lift_flat(&ValType::U8, &[CoreVal::I32(0x1FF)], &memory).unwrap(),
            Value::U8(0xFF)
        );
        assert_eq!(
            lift_flat(&ValType::S8, &[CoreVal::I32(0xFF)], &memory).unwrap(),
            Value::S8(-1)
        );
        assert_eq!(
            lift_flat(&ValType::S64, &[CoreVal::I64(-9)], &memory).unwrap(),
            Value::S64(-9)
        );
    }

    #[test]
    fn nan_is_canonicalized_on_lift() {
        let memory = SimpleMemory::new(0);
        let weird_nan = f32::from_bits(0x7FC0_0001);
        let value = lift_flat(&ValType::F32, &[CoreVal::F32(weird_nan)], &memory).unwrap();
        match value {
            Value::F32(f) => assert_eq!(f.to_bits(), 0x7FC0_0000),
            other => panic!("expected f32, got {:?}", other),
        }

        let mut memory = SimpleMemory::new(8);
        memory.write_u64(0, 0x7FF8_0000_0000_0001).unwrap();
        match lift_memory(&ValType::F64, &memory, 0).unwrap() {
            Value::F64(f) => assert_eq!(f.to_bits(), 0x7FF8_0000_0000_0000),
            other => panic!("expected f64, got {:?}", other),
        }
    }

    #[test]
    fn surrogates_and_out_of_range_chars_fail() {
        let memory = SimpleMemory::new(0);
        let err = lift_flat(&ValType::Char, &[CoreVal::I32(0xD800)], &memory).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidChar);
        let err = lift_flat(&ValType::Char, &[CoreVal::I32(0x110000)], &memory).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidChar);
        assert_eq!(
            lift_flat(&ValType::Char, &[CoreVal::I32(0x10FFFF)], &memory).unwrap(),
            Value::Char('\u{10FFFF}')
        );
    }

    #[test]
    fn overlong_utf8_fails() {
        let mut memory = SimpleMemory::new(16);
        memory.write(0, &[0xC0, 0x80, 0x00]).unwrap();
        let err =
            lift_flat(&ValType::String, &[CoreVal::I32(0), CoreVal::I32(3)], &memory).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidUtf8);
    }

    #[test]
    fn string_from_memory() {
        let mut memory = SimpleMemory::new(32);
        memory.write(8, b"weft").unwrap();
        // (ptr, len) pair stored at address 0.
        memory.write_u32(0, 8).unwrap();
        memory.write_u32(4, 4).unwrap();
        assert_eq!(
            lift_memory(&ValType::String, &memory, 0).unwrap(),
            Value::String("weft".to_string())
        );
    }

    #[test]
    fn record_from_memory_uses_field_offsets() {
        let ty = ValType::Record(vec![
            ("a".to_string(), ValType::U8),
            ("b".to_string(), ValType::U64),
        ]);
        let mut memory = SimpleMemory::new(16);
        memory.write_u8(0, 7).unwrap();
        memory.write_u64(8, 900).unwrap();
        assert_eq!(
            lift_memory(&ty, &memory, 0).unwrap(),
            Value::Record(vec![
                ("a".to_string(), Value::U8(7)),
                ("b".to_string(), Value::U64(900)),
            ])
        );
    }

    #[test]
    fn list_elements_stride_by_element_size() {
        let ty = ValType::List(Box::new(ValType::U16));
        let mut memory = SimpleMemory::new(16);
        memory.write_u16(4, 10).unwrap();
        memory.write_u16(6, 20).unwrap();
        memory.write_u16(8, 30).unwrap();
        let value = lift_flat(&ty, &[CoreVal::I32(4), CoreVal::I32(3)], &memory).unwrap();
        assert_eq!(
            value,
            Value::List(vec![Value::U16(10), Value::U16(20), Value::U16(30)])
        );
    }

    #[test]
    fn option_consumes_padded_flat_slots_even_for_none() {
        let memory = SimpleMemory::new(0);
        let ty = ValType::Option(Box::new(ValType::U64));
        // Exactly 1 + flat(u64) slots, both consumed.
        let value = lift_flat(&ty, &[CoreVal::I32(0), CoreVal::I64(0)], &memory).unwrap();
        assert_eq!(value, Value::tag("none"));

        let value = lift_flat(&ty, &[CoreVal::I32(1), CoreVal::I64(5)], &memory).unwrap();
        assert_eq!(value, Value::tag_with("some", Value::U64(5)));

        let err = lift_flat(&ty, &[CoreVal::I32(2), CoreVal::I64(0)], &memory).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidDiscriminant);
    }

    #[test]
    fn variant_payload_reinterprets_joined_slots() {
        let ty = ValType::Variant(vec![
            CaseType { name: "f".to_string(), ty: Some(ValType::F32) },
            CaseType { name: "i".to_string(), ty: Some(ValType::U32) },
        ]);
        let memory = SimpleMemory::new(0);
        // Joined payload slot is i32; case "f" reads f32 out of its bits.
        let bits = 1.5f32.to_bits() as i32;
        let value = lift_flat(&ty, &[CoreVal::I32(0), CoreVal::I32(bits)], &memory).unwrap();
        assert_eq!(value, Value::tag_with("f", Value::F32(1.5)));
    }

    #[test]
    fn variant_discriminant_bounds() {
        let ty = ValType::Variant(vec![CaseType { name: "only".to_string(), ty: None }]);
        let memory = SimpleMemory::new(4);
        assert_eq!(lift_memory(&ty, &memory, 0).unwrap(), Value::tag("only"));

        let mut memory = SimpleMemory::new(4);
        memory.write_u8(0, 1).unwrap();
        let err = lift_memory(&ty, &memory, 0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidDiscriminant);
    }

    #[test]
    fn flags_lift_as_set_names() {
        let names: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        let ty = ValType::Flags(names);
        let memory = SimpleMemory::new(0);
        let value = lift_flat(&ty, &[CoreVal::I32(0b101)], &memory).unwrap();
        assert_eq!(value, Value::Flags(vec!["a".to_string(), "c".to_string()]));
    }

    #[test]
    fn oversized_string_and_list_lengths_fail() {
        let memory = SimpleMemory::new(8);
        let err = lift_flat(
            &ValType::String,
            &[CoreVal::I32(0), CoreVal::I32((1 << 30) + 1)],
            &memory,
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Overflow);

        let ty = ValType::List(Box::new(ValType::U8));
        let err =
            lift_flat(&ty, &[CoreVal::I32(0), CoreVal::I32(1 << 28)], &memory).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Overflow);
    }

    #[test]
    fn leftover_flat_slots_are_rejected() {
        let memory = SimpleMemory::new(0);
        let err =
            lift_flat(&ValType::U32, &[CoreVal::I32(1), CoreVal::I32(2)], &memory).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Bounds);
    }
}
