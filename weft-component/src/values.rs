// Copyright (c) 2025 The Weft Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The generic value model.
//!
//! Lift produces these and lower consumes them. Records are
//! insertion-ordered field maps; variants, options, results, and enums all
//! share the tagged form so hosts see one shape for every discriminated
//! type; flags are a set of names; resource handles are bare `u32`s.

use crate::prelude::*;

/// A host-generic component value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    S8(i8),
    U8(u8),
    S16(i16),
    U16(u16),
    S32(i32),
    U32(u32),
    S64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    String(String),
    /// A list value.
    List(Vec<Value>),
    /// A tuple value.
    Tuple(Vec<Value>),
    /// A record: insertion-ordered named fields.
    Record(Vec<(String, Value)>),
    /// A tagged value: variants, options, results, and enums.
    Variant {
        /// Case name ("some"/"none" for options, "ok"/"error" for
        /// results, the case label otherwise).
        case: String,
        /// Payload, if the case carries one.
        payload: Option<Box<Value>>,
    },
    /// Set flag names of a flags value.
    Flags(Vec<String>),
    /// A resource handle.
    Handle(u32),
}

impl Value {
    /// Construct a tagged value without payload.
    pub fn tag(case: &str) -> Self {
        Self::Variant { case: case.to_string(), payload: None }
    }

    /// Construct a tagged value with payload.
    pub fn tag_with(case: &str, payload: Value) -> Self {
        Self::Variant { case: case.to_string(), payload: Some(Box::new(payload)) }
    }

    /// Shape name for error messages.
    pub fn shape_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::S8(_) => "s8",
            Self::U8(_) => "u8",
            Self::S16(_) => "s16",
            Self::U16(_) => "u16",
            Self::S32(_) => "s32",
            Self::U32(_) => "u32",
            Self::S64(_) => "s64",
            Self::U64(_) => "u64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::Char(_) => "char",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Record(_) => "record",
            Self::Variant { .. } => "variant",
            Self::Flags(_) => "flags",
            Self::Handle(_) => "handle",
        }
    }
}

fn wrong_shape(expected: &str, value: &Value) -> Error {
    Error::lower(
        ErrorKind::InvalidDiscriminant,
        format!("expected {}, got {}", expected, value.shape_name()),
    )
}

fn out_of_range(value: &Value, target: &str) -> Error {
    Error::lower(ErrorKind::Overflow, format!("{} value out of {} range", value.shape_name(), target))
}

/// Numeric coercion used by lowering.
///
/// Hosts whose generic representation merges integer and float widths hand
/// in whatever they have; integers are range-checked against the target
/// width, floats landing in integer slots must be whole numbers in range,
/// and integers landing in float slots widen losslessly where possible.
impl Value {
    fn as_i128(&self) -> Option<i128> {
        match self {
            Self::S8(v) => Some(i128::from(*v)),
            Self::U8(v) => Some(i128::from(*v)),
            Self::S16(v) => Some(i128::from(*v)),
            Self::U16(v) => Some(i128::from(*v)),
            Self::S32(v) => Some(i128::from(*v)),
            Self::U32(v) => Some(i128::from(*v)),
            Self::S64(v) => Some(i128::from(*v)),
            Self::U64(v) => Some(i128::from(*v)),
            _ => None,
        }
    }

    fn float_as_i128(&self, target: &str) -> Result<Option<i128>> {
        let float = match self {
            Self::F32(v) => f64::from(*v),
            Self::F64(v) => *v,
            _ => return Ok(None),
        };
        if float.fract() != 0.0 || !float.is_finite() {
            return Err(Error::lower(
                ErrorKind::Overflow,
                format!("fractional float {} cannot fill a {} slot", float, target),
            ));
        }
        Ok(Some(float as i128))
    }

    fn coerce_integer(&self, target: &str, min: i128, max: i128) -> Result<i128> {
        let raw = match self.as_i128() {
            Some(raw) => raw,
            None => match self.float_as_i128(target)? {
                Some(raw) => raw,
                None => return Err(wrong_shape(target, self)),
            },
        };
        if raw < min || raw > max {
            return Err(out_of_range(self, target));
        }
        Ok(raw)
    }

    /// Coerce to an unsigned integer of the given bit width.
    pub fn coerce_unsigned(&self, bits: u32) -> Result<u64> {
        let max = if bits == 64 { u64::MAX as i128 } else { (1i128 << bits) - 1 };
        let raw = self.coerce_integer(unsigned_name(bits), 0, max)?;
        Ok(raw as u64)
    }

    /// Coerce to a signed integer of the given bit width.
    pub fn coerce_signed(&self, bits: u32) -> Result<i64> {
        let half = 1i128 << (bits - 1);
        let raw = self.coerce_integer(signed_name(bits), -half, half - 1)?;
        Ok(raw as i64)
    }

    /// Coerce to f32; integers widen.
    pub fn coerce_f32(&self) -> Result<f32> {
        match self {
            Self::F32(v) => Ok(*v),
            Self::F64(v) => Ok(*v as f32),
            other => match other.as_i128() {
                Some(raw) => Ok(raw as f32),
                None => Err(wrong_shape("f32", self)),
            },
        }
    }

    /// Coerce to f64; integers widen.
    pub fn coerce_f64(&self) -> Result<f64> {
        match self {
            Self::F64(v) => Ok(*v),
            Self::F32(v) => Ok(f64::from(*v)),
            other => match other.as_i128() {
                Some(raw) => Ok(raw as f64),
                None => Err(wrong_shape("f64", self)),
            },
        }
    }

    /// Require a bool.
    pub fn coerce_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(v) => Ok(*v),
            other => Err(wrong_shape("bool", other)),
        }
    }

    /// Require a char.
    pub fn coerce_char(&self) -> Result<char> {
        match self {
            Self::Char(v) => Ok(*v),
            other => Err(wrong_shape("char", other)),
        }
    }

    /// Require a string.
    pub fn coerce_str(&self) -> Result<&str> {
        match self {
            Self::String(v) => Ok(v),
            other => Err(wrong_shape("string", other)),
        }
    }

    /// Require a handle.
    pub fn coerce_handle(&self) -> Result<u32> {
        match self {
            Self::Handle(v) => Ok(*v),
            other => Err(wrong_shape("handle", other)),
        }
    }
}

fn unsigned_name(bits: u32) -> &'static str {
    match bits {
        8 => "u8",
        16 => "u16",
        32 => "u32",
        _ => "u64",
    }
}

fn signed_name(bits: u32) -> &'static str {
    match bits {
        8 => "s8",
        16 => "s16",
        32 => "s32",
        _ => "s64",
    }
}
