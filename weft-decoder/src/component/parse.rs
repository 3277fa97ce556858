// Copyright (c) 2025 The Weft Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Per-section parsers.
//!
//! Every parser takes the section payload (or a tail of it) and returns the
//! parsed items together with the number of bytes consumed, so the section
//! walk in [`super::decode`] stays a thin loop.

use weft_format::binary::{
    ALIAS_TARGET_CORE_EXPORT, ALIAS_TARGET_EXPORT, ALIAS_TARGET_OUTER, CANONOPT_ASYNC,
    CANONOPT_CALLBACK, CANONOPT_COMPACT_UTF16, CANONOPT_CORE_TYPE, CANONOPT_GC, CANONOPT_MEMORY,
    CANONOPT_POST_RETURN, CANONOPT_REALLOC, CANONOPT_UTF16, CANONOPT_UTF8, CANON_LIFT,
    CANON_LOWER, CANON_RESOURCE_DROP, CANON_RESOURCE_DROP_ASYNC, CANON_RESOURCE_NEW,
    CANON_RESOURCE_REP, CANON_SUBTASK_CANCEL, CANON_TASK_CANCEL, CORE_INSTANCE_FROM_EXPORTS,
    CORE_INSTANCE_INSTANTIATE, CORE_SORT_INSTANCE, EXTERN_KIND_COMPONENT, EXTERN_KIND_FUNC,
    EXTERN_KIND_INSTANCE, EXTERN_KIND_TYPE, EXTERN_KIND_VALUE, INSTANCE_FROM_EXPORTS,
    INSTANCE_INSTANTIATE, MAX_IMPORT_EXPORT_VEC, MAX_NAME, MAX_VEC, SORT_COMPONENT, SORT_CORE,
    SORT_FUNC, SORT_INSTANCE, SORT_TYPE, SORT_VALUE, TYPE_BOUND_EQ, TYPE_BOUND_SUB_RESOURCE,
};
use weft_format::component::{
    Alias, AliasTarget, Canon, CanonOptions, ComponentInstance, CoreExport, CoreInstance,
    CoreInstantiateArg, CoreSort, Export, Import, InlineExport, InstantiateArg, RawValue, Sort,
    Start, StringEncoding,
};
use weft_format::types::{ExternDesc, TypeBound};

use super::val_type::parse_val_type;
use crate::prelude::*;

/// Parse a sort byte, consuming a core sub-sort byte after `0x00`.
pub fn parse_sort(bytes: &[u8], pos: usize) -> Result<(Sort, usize)> {
    let (byte, mut offset) = binary::read_u8(bytes, pos)?;
    let sort = match byte {
        SORT_CORE => {
            let (sub, size) = binary::read_u8(bytes, pos + offset)?;
            offset += size;
            let core = CoreSort::from_byte(sub)
                .ok_or_else(|| Error::unknown_opcode("core sort", sub))?;
            Sort::Core(core)
        },
        SORT_FUNC => Sort::Func,
        SORT_VALUE => Sort::Value,
        SORT_TYPE => Sort::Type,
        SORT_COMPONENT => Sort::Component,
        SORT_INSTANCE => Sort::Instance,
        _ => return Err(Error::unknown_opcode("sort", byte)),
    };
    Ok((sort, offset))
}

/// Parse a single alias: sort, target kind, payload.
pub fn parse_alias_item(bytes: &[u8], pos: usize) -> Result<(Alias, usize)> {
    let (sort, mut offset) = parse_sort(bytes, pos)?;

    let (target_kind, size) = binary::read_u8(bytes, pos + offset)?;
    offset += size;

    let target = match target_kind {
        ALIAS_TARGET_EXPORT | ALIAS_TARGET_CORE_EXPORT => {
            let (instance_idx, size) = binary::read_leb128_u32(bytes, pos + offset)?;
            offset += size;
            let (name, size) = binary::read_name(bytes, pos + offset, MAX_NAME)?;
            offset += size;
            match sort {
                Sort::Core(core_sort) => AliasTarget::CoreInstanceExport {
                    sort: core_sort,
                    instance_idx,
                    name,
                },
                other => AliasTarget::InstanceExport { sort: other, instance_idx, name },
            }
        },
        ALIAS_TARGET_OUTER => {
            let (count, size) = binary::read_leb128_u32(bytes, pos + offset)?;
            offset += size;
            let (index, size) = binary::read_leb128_u32(bytes, pos + offset)?;
            offset += size;
            AliasTarget::Outer { sort, count, index }
        },
        _ => return Err(Error::unknown_opcode("alias target", target_kind)),
    };

    Ok((Alias { target }, offset))
}

/// Parse an alias section.
pub fn parse_alias_section(bytes: &[u8]) -> Result<(Vec<Alias>, usize)> {
    let (count, mut offset) = binary::read_vec_count(bytes, 0, MAX_VEC)?;
    let mut aliases = Vec::with_capacity(count as usize);
    for idx in 0..count {
        let (alias, size) = parse_alias_item(bytes, offset).at_index(idx)?;
        offset += size;
        aliases.push(alias);
    }
    Ok((aliases, offset))
}

/// Parse an extern descriptor: kind byte plus a type index, or a bound for
/// type kinds.
pub fn parse_extern_desc(bytes: &[u8], pos: usize) -> Result<(ExternDesc, usize)> {
    let (kind, mut offset) = binary::read_u8(bytes, pos)?;
    let desc = match kind {
        EXTERN_KIND_FUNC => {
            let (index, size) = binary::read_leb128_u32(bytes, pos + offset)?;
            offset += size;
            ExternDesc::Func(index)
        },
        EXTERN_KIND_INSTANCE => {
            let (index, size) = binary::read_leb128_u32(bytes, pos + offset)?;
            offset += size;
            ExternDesc::Instance(index)
        },
        EXTERN_KIND_TYPE => {
            let (bound, size) = binary::read_u8(bytes, pos + offset)?;
            offset += size;
            match bound {
                TYPE_BOUND_EQ => {
                    let (index, size) = binary::read_leb128_u32(bytes, pos + offset)?;
                    offset += size;
                    ExternDesc::Type(TypeBound::Eq(index))
                },
                TYPE_BOUND_SUB_RESOURCE => ExternDesc::Type(TypeBound::SubResource),
                _ => return Err(Error::unknown_opcode("type bound", bound)),
            }
        },
        EXTERN_KIND_COMPONENT => {
            let (index, size) = binary::read_leb128_u32(bytes, pos + offset)?;
            offset += size;
            ExternDesc::Component(index)
        },
        EXTERN_KIND_VALUE => {
            let (index, size) = binary::read_leb128_u32(bytes, pos + offset)?;
            offset += size;
            ExternDesc::Value(index)
        },
        _ => return Err(Error::unknown_opcode("extern descriptor kind", kind)),
    };
    Ok((desc, offset))
}

/// Parse a core instance section.
pub fn parse_core_instance_section(bytes: &[u8]) -> Result<(Vec<CoreInstance>, usize)> {
    let (count, mut offset) = binary::read_vec_count(bytes, 0, MAX_VEC)?;
    let mut instances = Vec::with_capacity(count as usize);
    for idx in 0..count {
        let (instance, size) = parse_core_instance_expr(bytes, offset).at_index(idx)?;
        offset += size;
        instances.push(instance);
    }
    Ok((instances, offset))
}

fn parse_core_instance_expr(bytes: &[u8], pos: usize) -> Result<(CoreInstance, usize)> {
    let (tag, mut offset) = binary::read_u8(bytes, pos)?;
    match tag {
        CORE_INSTANCE_INSTANTIATE => {
            let (module_idx, size) = binary::read_leb128_u32(bytes, pos + offset)?;
            offset += size;

            let (args_count, size) = binary::read_vec_count(bytes, pos + offset, MAX_VEC)?;
            offset += size;
            let mut args = Vec::with_capacity(args_count as usize);
            for idx in 0..args_count {
                let (name, size) =
                    binary::read_name(bytes, pos + offset, MAX_NAME).at_index(idx)?;
                offset += size;

                // Core instantiation arguments are always instances.
                let (kind, size) = binary::read_u8(bytes, pos + offset)?;
                offset += size;
                if kind != CORE_SORT_INSTANCE {
                    return Err(Error::unknown_opcode("core instantiate arg kind", kind));
                }

                let (instance_idx, size) = binary::read_leb128_u32(bytes, pos + offset)?;
                offset += size;
                args.push(CoreInstantiateArg { name, instance_idx });
            }

            Ok((CoreInstance::Instantiate { module_idx, args }, offset))
        },
        CORE_INSTANCE_FROM_EXPORTS => {
            let (count, size) = binary::read_vec_count(bytes, pos + offset, MAX_VEC)?;
            offset += size;
            let mut exports = Vec::with_capacity(count as usize);
            for idx in 0..count {
                let (name, size) =
                    binary::read_name(bytes, pos + offset, MAX_NAME).at_index(idx)?;
                offset += size;
                let (sort_byte, size) = binary::read_u8(bytes, pos + offset)?;
                offset += size;
                let sort = CoreSort::from_byte(sort_byte)
                    .ok_or_else(|| Error::unknown_opcode("core sort", sort_byte))?;
                let (index, size) = binary::read_leb128_u32(bytes, pos + offset)?;
                offset += size;
                exports.push(CoreExport { name, sort, index });
            }
            Ok((CoreInstance::FromExports(exports), offset))
        },
        _ => Err(Error::unknown_opcode("core instance expression", tag)),
    }
}

/// Parse a component instance section.
pub fn parse_instance_section(bytes: &[u8]) -> Result<(Vec<ComponentInstance>, usize)> {
    let (count, mut offset) = binary::read_vec_count(bytes, 0, MAX_VEC)?;
    let mut instances = Vec::with_capacity(count as usize);
    for idx in 0..count {
        let (instance, size) = parse_instance_expr(bytes, offset).at_index(idx)?;
        offset += size;
        instances.push(instance);
    }
    Ok((instances, offset))
}

fn parse_instance_expr(bytes: &[u8], pos: usize) -> Result<(ComponentInstance, usize)> {
    let (tag, mut offset) = binary::read_u8(bytes, pos)?;
    match tag {
        INSTANCE_INSTANTIATE => {
            let (component_idx, size) = binary::read_leb128_u32(bytes, pos + offset)?;
            offset += size;

            let (args_count, size) = binary::read_vec_count(bytes, pos + offset, MAX_VEC)?;
            offset += size;
            let mut args = Vec::with_capacity(args_count as usize);
            for idx in 0..args_count {
                let (name, size) =
                    binary::read_name(bytes, pos + offset, MAX_NAME).at_index(idx)?;
                offset += size;
                let (sort, size) = parse_sort(bytes, pos + offset)?;
                offset += size;
                let (index, size) = binary::read_leb128_u32(bytes, pos + offset)?;
                offset += size;
                args.push(InstantiateArg { name, sort, index });
            }

            Ok((ComponentInstance::Instantiate { component_idx, args }, offset))
        },
        INSTANCE_FROM_EXPORTS => {
            let (count, size) = binary::read_vec_count(bytes, pos + offset, MAX_VEC)?;
            offset += size;
            let mut exports = Vec::with_capacity(count as usize);
            for idx in 0..count {
                let (name, size) =
                    binary::read_name(bytes, pos + offset, MAX_NAME).at_index(idx)?;
                offset += size;
                let (sort, size) = parse_sort(bytes, pos + offset)?;
                offset += size;
                let (index, size) = binary::read_leb128_u32(bytes, pos + offset)?;
                offset += size;
                exports.push(InlineExport { name, sort, index });
            }
            Ok((ComponentInstance::FromExports(exports), offset))
        },
        _ => Err(Error::unknown_opcode("instance expression", tag)),
    }
}

/// Parse the canon options vector.
fn parse_canon_options(bytes: &[u8], pos: usize) -> Result<(CanonOptions, usize)> {
    let (count, mut offset) = binary::read_vec_count(bytes, pos, MAX_VEC)?;
    let mut options = CanonOptions::default();
    for _ in 0..count {
        let (opt, size) = binary::read_u8(bytes, pos + offset)?;
        offset += size;
        match opt {
            CANONOPT_UTF8 => options.string_encoding = StringEncoding::Utf8,
            CANONOPT_UTF16 => options.string_encoding = StringEncoding::Utf16,
            CANONOPT_COMPACT_UTF16 => options.string_encoding = StringEncoding::CompactUtf16,
            CANONOPT_MEMORY => {
                let (index, size) = binary::read_leb128_u32(bytes, pos + offset)?;
                offset += size;
                options.memory = Some(index);
            },
            CANONOPT_REALLOC => {
                let (index, size) = binary::read_leb128_u32(bytes, pos + offset)?;
                offset += size;
                options.realloc = Some(index);
            },
            CANONOPT_POST_RETURN => {
                let (index, size) = binary::read_leb128_u32(bytes, pos + offset)?;
                offset += size;
                options.post_return = Some(index);
            },
            CANONOPT_ASYNC => options.is_async = true,
            CANONOPT_CALLBACK => {
                let (index, size) = binary::read_leb128_u32(bytes, pos + offset)?;
                offset += size;
                options.callback = Some(index);
            },
            CANONOPT_CORE_TYPE => {
                let (index, size) = binary::read_leb128_u32(bytes, pos + offset)?;
                offset += size;
                options.core_type = Some(index);
            },
            CANONOPT_GC => options.gc = true,
            _ => {
                return Err(Error::parse(
                    ErrorKind::UnsupportedCanon,
                    format!("unknown canon option byte {:#04x}", opt),
                ));
            },
        }
    }
    Ok((options, offset))
}

/// Parse a canon section. The item count must be exactly one.
pub fn parse_canon_section(bytes: &[u8]) -> Result<(Canon, usize)> {
    let (count, mut offset) = binary::read_leb128_u32(bytes, 0)?;
    if count != 1 {
        return Err(Error::bounds(format!("canon section holds {} items, expected 1", count)));
    }

    let (opcode, size) = binary::read_u8(bytes, offset)?;
    offset += size;

    let canon = match opcode {
        CANON_LIFT => {
            let (second, size) = binary::read_u8(bytes, offset)?;
            offset += size;
            if second != 0x00 {
                return Err(Error::unknown_opcode("canon lift marker", second));
            }
            let (core_func_idx, size) = binary::read_leb128_u32(bytes, offset)?;
            offset += size;
            let (options, size) = parse_canon_options(bytes, offset)?;
            offset += size;
            let (type_idx, size) = binary::read_leb128_u32(bytes, offset)?;
            offset += size;
            Canon::Lift { core_func_idx, type_idx, options }
        },
        CANON_LOWER => {
            let (second, size) = binary::read_u8(bytes, offset)?;
            offset += size;
            if second != 0x00 {
                return Err(Error::unknown_opcode("canon lower marker", second));
            }
            let (func_idx, size) = binary::read_leb128_u32(bytes, offset)?;
            offset += size;
            let (options, size) = parse_canon_options(bytes, offset)?;
            offset += size;
            Canon::Lower { func_idx, options }
        },
        CANON_RESOURCE_NEW => {
            let (type_idx, size) = binary::read_leb128_u32(bytes, offset)?;
            offset += size;
            Canon::ResourceNew { type_idx }
        },
        CANON_RESOURCE_DROP => {
            let (type_idx, size) = binary::read_leb128_u32(bytes, offset)?;
            offset += size;
            Canon::ResourceDrop { type_idx }
        },
        CANON_RESOURCE_DROP_ASYNC => {
            let (type_idx, size) = binary::read_leb128_u32(bytes, offset)?;
            offset += size;
            Canon::ResourceDropAsync { type_idx }
        },
        CANON_RESOURCE_REP => {
            let (type_idx, size) = binary::read_leb128_u32(bytes, offset)?;
            offset += size;
            Canon::ResourceRep { type_idx }
        },
        CANON_TASK_CANCEL => Canon::TaskCancel,
        CANON_SUBTASK_CANCEL => Canon::SubtaskCancel,
        _ => {
            return Err(Error::parse(
                ErrorKind::UnsupportedCanon,
                format!("canon opcode {:#04x} is reserved", opcode),
            ));
        },
    };

    Ok((canon, offset))
}

/// Parse a start section.
pub fn parse_start_section(bytes: &[u8]) -> Result<(Start, usize)> {
    let (func_idx, mut offset) = binary::read_leb128_u32(bytes, 0)?;

    let (args_count, size) = binary::read_vec_count(bytes, offset, MAX_VEC)?;
    offset += size;
    let mut args = Vec::with_capacity(args_count as usize);
    for _ in 0..args_count {
        let (value_idx, size) = binary::read_leb128_u32(bytes, offset)?;
        offset += size;
        args.push(value_idx);
    }

    let (results, size) = binary::read_leb128_u32(bytes, offset)?;
    offset += size;

    Ok((Start { func_idx, args, results }, offset))
}

/// Parse an import section.
pub fn parse_import_section(bytes: &[u8]) -> Result<(Vec<Import>, usize)> {
    let (count, mut offset) = binary::read_vec_count(bytes, 0, MAX_IMPORT_EXPORT_VEC)?;
    let mut imports = Vec::with_capacity(count as usize);
    for idx in 0..count {
        let (name_kind, size) = binary::read_u8(bytes, offset)?;
        offset += size;
        if name_kind > 0x01 {
            return Err(Error::unknown_opcode("import name kind", name_kind));
        }
        let (name, size) = binary::read_name(bytes, offset, MAX_NAME).at_index(idx)?;
        offset += size;
        let (desc, size) = parse_extern_desc(bytes, offset).in_field(&name)?;
        offset += size;
        imports.push(Import { name_kind, name, desc });
    }
    Ok((imports, offset))
}

/// Parse an export section.
pub fn parse_export_section(bytes: &[u8]) -> Result<(Vec<Export>, usize)> {
    let (count, mut offset) = binary::read_vec_count(bytes, 0, MAX_IMPORT_EXPORT_VEC)?;
    let mut exports = Vec::with_capacity(count as usize);
    for idx in 0..count {
        let (name_kind, size) = binary::read_u8(bytes, offset)?;
        offset += size;
        if name_kind > 0x01 {
            return Err(Error::unknown_opcode("export name kind", name_kind));
        }
        let (name, size) = binary::read_name(bytes, offset, MAX_NAME).at_index(idx)?;
        offset += size;
        let (sort, size) = parse_sort(bytes, offset).in_field(&name)?;
        offset += size;
        let (index, size) = binary::read_leb128_u32(bytes, offset)?;
        offset += size;
        exports.push(Export { name_kind, name, sort, index });
    }
    Ok((exports, offset))
}

/// Parse a value section: each entry is a value type, a byte length, and
/// that many payload bytes, preserved raw.
pub fn parse_value_section(bytes: &[u8]) -> Result<(Vec<RawValue>, usize)> {
    let (count, mut offset) = binary::read_vec_count(bytes, 0, MAX_VEC)?;
    let mut values = Vec::with_capacity(count as usize);
    for idx in 0..count {
        let start = offset;
        let (_ty, size) = parse_val_type(bytes, offset).at_index(idx)?;
        offset += size;
        let (len, size) = binary::read_leb128_u32(bytes, offset)?;
        offset += size;
        let (_payload, size) = binary::read_bytes(bytes, offset, len as usize)?;
        offset += size;
        values.push(RawValue { data: bytes[start..offset].to_vec() });
    }
    Ok((values, offset))
}
