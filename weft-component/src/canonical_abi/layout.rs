// Copyright (c) 2025 The Weft Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Memory layout of component values.
//!
//! `layout` is a pure function of a resolved type. Sizes are always a
//! multiple of alignment, and record/tuple field offsets are strictly
//! increasing.

use crate::prelude::*;
use crate::types::ValType;

/// Size and alignment of a type in linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Size in bytes, rounded up to a multiple of `align`.
    pub size: u32,
    /// Alignment in bytes; always a power of two.
    pub align: u32,
}

impl Layout {
    fn new(size: u32, align: u32) -> Self {
        Self { size, align }
    }
}

/// Round `offset` up to `align`.
pub fn align_to(offset: u32, align: u32) -> Result<u32> {
    let align = align.max(1);
    let aligned = offset
        .checked_add(align - 1)
        .ok_or_else(|| Error::lift(ErrorKind::Overflow, "alignment overflows u32"))?;
    Ok(aligned / align * align)
}

/// Discriminant byte width for `n` cases: 1, 2, or 4. Alignment equals
/// size.
pub fn discriminant_size(n: usize) -> u32 {
    if n <= 256 {
        1
    } else if n <= 65536 {
        2
    } else {
        4
    }
}

/// Compute size and alignment of a type.
pub fn layout(ty: &ValType) -> Result<Layout> {
    let layout = match ty {
        ValType::Bool | ValType::S8 | ValType::U8 => Layout::new(1, 1),
        ValType::S16 | ValType::U16 => Layout::new(2, 2),
        ValType::S32 | ValType::U32 | ValType::F32 | ValType::Char => Layout::new(4, 4),
        ValType::S64 | ValType::U64 | ValType::F64 => Layout::new(8, 8),
        // A (pointer, length) pair.
        ValType::String | ValType::List(_) => Layout::new(8, 4),
        // Handles are a single i32.
        ValType::Own(_) | ValType::Borrow(_) | ValType::ErrorContext => Layout::new(4, 4),
        ValType::Record(fields) => {
            let types: Vec<&ValType> = fields.iter().map(|(_, ty)| ty).collect();
            sequential_layout(&types)?
        },
        ValType::Tuple(members) => {
            let types: Vec<&ValType> = members.iter().collect();
            sequential_layout(&types)?
        },
        ValType::Enum(cases) => {
            let size = discriminant_size(cases.len());
            Layout::new(size, size)
        },
        ValType::Flags(names) => flags_layout(names.len()),
        ValType::Option(payload) => {
            let payload_layout = layout(payload)?;
            tagged_layout(1, payload_layout)?
        },
        ValType::Result { ok, err } => {
            let ok_layout = optional_layout(ok.as_deref())?;
            let err_layout = optional_layout(err.as_deref())?;
            let payload = Layout::new(
                ok_layout.size.max(err_layout.size),
                ok_layout.align.max(err_layout.align),
            );
            tagged_layout(1, payload)?
        },
        ValType::Variant(cases) => {
            let mut payload = Layout::new(0, 1);
            for case in cases {
                let case_layout = optional_layout(case.ty.as_ref())?;
                payload.size = payload.size.max(case_layout.size);
                payload.align = payload.align.max(case_layout.align);
            }
            tagged_layout(discriminant_size(cases.len()), payload)?
        },
    };
    Ok(layout)
}

/// Layout of a record or tuple plus the offset of each field.
pub fn record_layout(fields: &[&ValType]) -> Result<(Layout, Vec<u32>)> {
    let mut offsets = Vec::with_capacity(fields.len());
    let mut offset = 0u32;
    let mut max_align = 1u32;
    for field in fields {
        let field_layout = layout(field)?;
        offset = align_to(offset, field_layout.align)?;
        offsets.push(offset);
        offset = offset
            .checked_add(field_layout.size)
            .ok_or_else(|| Error::lift(ErrorKind::Overflow, "record size overflows u32"))?;
        max_align = max_align.max(field_layout.align);
    }
    let size = align_to(offset, max_align)?;
    Ok((Layout::new(size, max_align), offsets))
}

/// Offset of the payload inside an option/result/variant with the given
/// discriminant size and payload alignment.
pub fn payload_offset(disc_size: u32, payload_align: u32) -> Result<u32> {
    align_to(disc_size, payload_align)
}

fn sequential_layout(fields: &[&ValType]) -> Result<Layout> {
    let (layout, _) = record_layout(fields)?;
    Ok(layout)
}

fn optional_layout(ty: Option<&ValType>) -> Result<Layout> {
    match ty {
        Some(ty) => layout(ty),
        None => Ok(Layout::new(0, 1)),
    }
}

fn tagged_layout(disc_size: u32, payload: Layout) -> Result<Layout> {
    let offset = payload_offset(disc_size, payload.align)?;
    let align = disc_size.max(payload.align);
    let end = offset
        .checked_add(payload.size)
        .ok_or_else(|| Error::lift(ErrorKind::Overflow, "variant size overflows u32"))?;
    let size = align_to(end, align)?;
    Ok(Layout::new(size, align))
}

fn flags_layout(count: usize) -> Layout {
    if count <= 8 {
        Layout::new(1, 1)
    } else if count <= 16 {
        Layout::new(2, 2)
    } else if count <= 32 {
        Layout::new(4, 4)
    } else if count <= 64 {
        Layout::new(8, 8)
    } else {
        Layout::new(count.div_ceil(32) as u32 * 4, 4)
    }
}
