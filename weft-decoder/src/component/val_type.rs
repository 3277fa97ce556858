// Copyright (c) 2025 The Weft Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Value-type grammar.
//!
//! The byte ranges of primitives, defined-type opcodes, and signed type
//! indices overlap, so decoding a value type is a fixed order of checks,
//! never trial-and-backtrack:
//!
//! 1. `0x73..=0x7F` and `0x64` are primitives.
//! 2. `0x68..=0x72` are defined-type opcodes; recurse into the payload.
//! 3. Anything else is a signed LEB128 (s33) type index; a negative value
//!    is an error.
//!
//! The index fallback must be *signed*: an unsigned read would accept byte
//! sequences that the signed grammar reserves.

use weft_format::binary::{
    DEFTYPE_BORROW, DEFTYPE_ENUM, DEFTYPE_FLAGS, DEFTYPE_LIST, DEFTYPE_OPTION, DEFTYPE_OWN,
    DEFTYPE_RECORD, DEFTYPE_RESULT, DEFTYPE_TUPLE, DEFTYPE_VARIANT, MAX_ITEM_NAME, MAX_TYPE_ITEMS,
    MAX_VEC, RESULTLIST_NONE, RESULTLIST_ONE,
};
use weft_format::types::{FormatValType, FuncType, PrimitiveValType, VariantCase};

use crate::prelude::*;

/// Maximum nesting depth of the value-type grammar.
///
/// Not a wire-format limit; it bounds parser recursion so that adversarial
/// nesting fails with a typed error instead of exhausting the stack.
const MAX_TYPE_NESTING: u32 = 100;

/// Parse a value type at `pos`.
pub fn parse_val_type(bytes: &[u8], pos: usize) -> Result<(FormatValType, usize)> {
    parse_val_type_at_depth(bytes, pos, 0)
}

fn parse_val_type_at_depth(bytes: &[u8], pos: usize, depth: u32) -> Result<(FormatValType, usize)> {
    if depth > MAX_TYPE_NESTING {
        return Err(Error::bounds("value type nesting exceeds limit"));
    }

    let (byte, _) = binary::read_u8(bytes, pos)?;

    // Check 1: primitives.
    if let Some(prim) = PrimitiveValType::from_byte(byte) {
        return Ok((FormatValType::Primitive(prim), 1));
    }

    // Check 2: defined-type opcodes.
    if (DEFTYPE_BORROW..=DEFTYPE_RECORD).contains(&byte) {
        return parse_defined_type(bytes, pos, byte, depth);
    }

    // Check 3: push the byte back and decode a signed type index.
    let (index, size) = binary::read_leb128_s33(bytes, pos)?;
    if index < 0 {
        return Err(Error::parse(
            ErrorKind::InvalidTypeIndex,
            format!("negative type index {}", index),
        ));
    }
    if index > i64::from(u32::MAX) {
        return Err(Error::parse(
            ErrorKind::InvalidTypeIndex,
            format!("type index {} exceeds u32 range", index),
        ));
    }
    Ok((FormatValType::Ref(index as u32), size))
}

fn parse_defined_type(
    bytes: &[u8],
    pos: usize,
    opcode: u8,
    depth: u32,
) -> Result<(FormatValType, usize)> {
    let mut offset = 1;
    let ty = match opcode {
        DEFTYPE_RECORD => {
            let (fields, size) = parse_named_types(bytes, pos + offset, depth)?;
            offset += size;
            FormatValType::Record(fields)
        },
        DEFTYPE_VARIANT => {
            let (cases, size) = parse_variant_cases(bytes, pos + offset, depth)?;
            offset += size;
            FormatValType::Variant(cases)
        },
        DEFTYPE_LIST => {
            let (element, size) = parse_val_type_at_depth(bytes, pos + offset, depth + 1)?;
            offset += size;
            FormatValType::List(Box::new(element))
        },
        DEFTYPE_TUPLE => {
            let (count, size) = binary::read_vec_count(bytes, pos + offset, MAX_TYPE_ITEMS)?;
            offset += size;
            let mut members = Vec::with_capacity(count as usize);
            for idx in 0..count {
                let (member, size) =
                    parse_val_type_at_depth(bytes, pos + offset, depth + 1).at_index(idx)?;
                offset += size;
                members.push(member);
            }
            FormatValType::Tuple(members)
        },
        DEFTYPE_FLAGS => {
            let (names, size) = parse_name_list(bytes, pos + offset)?;
            offset += size;
            FormatValType::Flags(names)
        },
        DEFTYPE_ENUM => {
            let (names, size) = parse_name_list(bytes, pos + offset)?;
            offset += size;
            FormatValType::Enum(names)
        },
        DEFTYPE_OPTION => {
            let (payload, size) = parse_val_type_at_depth(bytes, pos + offset, depth + 1)?;
            offset += size;
            FormatValType::Option(Box::new(payload))
        },
        DEFTYPE_RESULT => {
            let (ok, size) = parse_optional_val_type(bytes, pos + offset, depth).in_case("ok")?;
            offset += size;
            let (err, size) = parse_optional_val_type(bytes, pos + offset, depth).in_case("error")?;
            offset += size;
            FormatValType::Result {
                ok: ok.map(Box::new),
                err: err.map(Box::new),
            }
        },
        DEFTYPE_OWN => {
            let (index, size) = binary::read_leb128_u32(bytes, pos + offset)?;
            offset += size;
            FormatValType::Own(index)
        },
        DEFTYPE_BORROW => {
            let (index, size) = binary::read_leb128_u32(bytes, pos + offset)?;
            offset += size;
            FormatValType::Borrow(index)
        },
        // 0x6C is reserved.
        _ => return Err(Error::unknown_opcode("defined type", opcode)),
    };
    Ok((ty, offset))
}

/// Parse a `vec<(name, valtype)>`, as used by records and parameter lists.
pub fn parse_named_types(
    bytes: &[u8],
    pos: usize,
    depth: u32,
) -> Result<(Vec<(String, FormatValType)>, usize)> {
    let (count, mut offset) = binary::read_vec_count(bytes, pos, MAX_TYPE_ITEMS)?;
    let mut items = Vec::with_capacity(count as usize);
    for idx in 0..count {
        let (name, size) = binary::read_name(bytes, pos + offset, MAX_ITEM_NAME).at_index(idx)?;
        offset += size;
        let (ty, size) =
            parse_val_type_at_depth(bytes, pos + offset, depth + 1).in_field(&name)?;
        offset += size;
        items.push((name, ty));
    }
    Ok((items, offset))
}

fn parse_name_list(bytes: &[u8], pos: usize) -> Result<(Vec<String>, usize)> {
    let (count, mut offset) = binary::read_vec_count(bytes, pos, MAX_TYPE_ITEMS)?;
    let mut names = Vec::with_capacity(count as usize);
    for idx in 0..count {
        let (name, size) = binary::read_name(bytes, pos + offset, MAX_ITEM_NAME).at_index(idx)?;
        offset += size;
        names.push(name);
    }
    Ok((names, offset))
}

fn parse_optional_val_type(
    bytes: &[u8],
    pos: usize,
    depth: u32,
) -> Result<(Option<FormatValType>, usize)> {
    let (flag, mut offset) = binary::read_u8(bytes, pos)?;
    match flag {
        0x00 => Ok((None, offset)),
        0x01 => {
            let (ty, size) = parse_val_type_at_depth(bytes, pos + offset, depth + 1)?;
            offset += size;
            Ok((Some(ty), offset))
        },
        _ => Err(Error::unknown_opcode("optional value type flag", flag)),
    }
}

/// Parse the case list of a variant type.
///
/// Each case is `label, optional payload type, optional refines index`,
/// both optionals encoded as `0x00 | 0x01 payload`. A refines index must
/// reference a strictly earlier case.
pub fn parse_variant_cases(bytes: &[u8], pos: usize, depth: u32) -> Result<(Vec<VariantCase>, usize)> {
    let (count, mut offset) = binary::read_vec_count(bytes, pos, MAX_TYPE_ITEMS)?;
    let mut cases = Vec::with_capacity(count as usize);
    for ordinal in 0..count {
        let (name, size) = binary::read_name(bytes, pos + offset, MAX_ITEM_NAME).at_index(ordinal)?;
        offset += size;

        let (ty, size) = parse_optional_val_type(bytes, pos + offset, depth).in_case(&name)?;
        offset += size;

        let (flag, size) = binary::read_u8(bytes, pos + offset)?;
        offset += size;
        let refines = match flag {
            0x00 => None,
            0x01 => {
                let (index, size) = binary::read_leb128_u32(bytes, pos + offset)?;
                offset += size;
                if index >= ordinal {
                    return Err(Error::parse(
                        ErrorKind::InvalidDiscriminant,
                        format!("case {} refines case {}, which is not earlier", ordinal, index),
                    ));
                }
                Some(index)
            },
            _ => return Err(Error::unknown_opcode("refines flag", flag)),
        };

        cases.push(VariantCase { name, ty, refines });
    }
    Ok((cases, offset))
}

/// Parse a function type. `pos` points just past the `0x40` header.
///
/// The parameter list is a `vec<(label, valtype)>`; the result position is
/// a discriminated union, `0x00 valtype` for one result or `0x01 0x00` for
/// none. It is not a `vec()`.
pub fn parse_func_type(bytes: &[u8], pos: usize) -> Result<(FuncType, usize)> {
    let (count, mut offset) = binary::read_vec_count(bytes, pos, MAX_VEC)?;
    let mut params = Vec::with_capacity(count as usize);
    for idx in 0..count {
        let (name, size) = binary::read_name(bytes, pos + offset, MAX_ITEM_NAME).at_index(idx)?;
        offset += size;
        let (ty, size) = parse_val_type(bytes, pos + offset).in_field(&name)?;
        offset += size;
        params.push((name, ty));
    }

    let (discriminator, size) = binary::read_u8(bytes, pos + offset)?;
    offset += size;
    let result = match discriminator {
        RESULTLIST_ONE => {
            let (ty, size) = parse_val_type(bytes, pos + offset).in_field("result")?;
            offset += size;
            Some(ty)
        },
        RESULTLIST_NONE => {
            let (terminator, size) = binary::read_u8(bytes, pos + offset)?;
            offset += size;
            if terminator != 0x00 {
                return Err(Error::unknown_opcode("empty resultlist terminator", terminator));
            }
            None
        },
        _ => return Err(Error::unknown_opcode("resultlist discriminator", discriminator)),
    };

    Ok((FuncType { params, result }, offset))
}
