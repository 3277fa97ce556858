// Copyright (c) 2025 The Weft Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Type-section parsing.
//!
//! A type-section entry is a function type (`0x40`), a component type
//! (`0x41`), an instance type (`0x42`), or a defined value type (anything
//! the value-type grammar accepts). Instance and component types carry
//! their own declaration streams with index spaces local to the
//! declaration.

use weft_format::binary::{MAX_DECLS, MAX_NAME, TYPE_COMPONENT, TYPE_FUNC, TYPE_INSTANCE};
use weft_format::component::RawType;
use weft_format::types::{ComponentTypeDecl, InstanceTypeDecl, TypeDef};

use super::parse::{parse_alias_item, parse_extern_desc};
use super::val_type::{parse_func_type, parse_val_type};
use crate::prelude::*;

/// Parse a type section, capturing each entry's raw bytes and (optionally)
/// its parsed form.
///
/// The raw slice is always captured per-entry so that decoding with and
/// without type parsing slices sections identically.
pub fn parse_type_section(bytes: &[u8], keep_parsed: bool) -> Result<(Vec<RawType>, usize)> {
    let (count, mut offset) = binary::read_vec_count(bytes, 0, MAX_DECLS)?;
    let mut types = Vec::with_capacity(count as usize);
    for idx in 0..count {
        let start = offset;
        let (parsed, size) = parse_type_def(bytes, offset).at_index(idx)?;
        offset += size;
        types.push(RawType {
            data: bytes[start..offset].to_vec(),
            parsed: if keep_parsed { Some(parsed) } else { None },
        });
    }
    Ok((types, offset))
}

/// Maximum nesting depth of instance/component type declarations.
///
/// Bounds parser recursion, like the value-type grammar's own depth
/// limit, so adversarial nesting fails with a typed error.
const MAX_DECL_NESTING: u32 = 100;

/// Parse a single type definition.
pub fn parse_type_def(bytes: &[u8], pos: usize) -> Result<(TypeDef, usize)> {
    parse_type_def_at_depth(bytes, pos, 0)
}

fn parse_type_def_at_depth(bytes: &[u8], pos: usize, depth: u32) -> Result<(TypeDef, usize)> {
    if depth > MAX_DECL_NESTING {
        return Err(Error::bounds("type declaration nesting exceeds limit"));
    }
    let (header, _) = binary::read_u8(bytes, pos)?;
    match header {
        TYPE_FUNC => {
            let (func, size) = parse_func_type(bytes, pos + 1)?;
            Ok((TypeDef::Func(func), size + 1))
        },
        TYPE_COMPONENT => {
            let (decls, size) = parse_component_type_decls(bytes, pos + 1, depth + 1)?;
            Ok((TypeDef::Component(decls), size + 1))
        },
        TYPE_INSTANCE => {
            let (decls, size) = parse_instance_type_decls(bytes, pos + 1, depth + 1)?;
            Ok((TypeDef::Instance(decls), size + 1))
        },
        _ => {
            let (ty, size) = parse_val_type(bytes, pos)?;
            Ok((TypeDef::Defined(ty), size))
        },
    }
}

/// Parse the declaration stream of an instance type.
fn parse_instance_type_decls(
    bytes: &[u8],
    pos: usize,
    depth: u32,
) -> Result<(Vec<InstanceTypeDecl>, usize)> {
    let (count, mut offset) = binary::read_vec_count(bytes, pos, MAX_DECLS)?;
    let mut decls = Vec::with_capacity(count as usize);
    for idx in 0..count {
        let (tag, size) = binary::read_u8(bytes, pos + offset)?;
        offset += size;
        let decl = match tag {
            0x00 => {
                let (raw, size) = skip_core_type(bytes, pos + offset).at_index(idx)?;
                offset += size;
                InstanceTypeDecl::CoreType(raw)
            },
            0x01 => {
                let (def, size) = parse_type_def_at_depth(bytes, pos + offset, depth).at_index(idx)?;
                offset += size;
                InstanceTypeDecl::Type(Box::new(def))
            },
            0x02 => {
                let (alias, size) = parse_alias_item(bytes, pos + offset).at_index(idx)?;
                offset += size;
                InstanceTypeDecl::Alias(alias)
            },
            0x04 => {
                let (name, size) = binary::read_name(bytes, pos + offset, MAX_NAME).at_index(idx)?;
                offset += size;
                let (desc, size) = parse_extern_desc(bytes, pos + offset).in_field(&name)?;
                offset += size;
                InstanceTypeDecl::Export { name, desc }
            },
            _ => return Err(Error::unknown_opcode("instance declaration", tag)),
        };
        decls.push(decl);
    }
    Ok((decls, offset))
}

/// Parse the declaration stream of a component type.
fn parse_component_type_decls(
    bytes: &[u8],
    pos: usize,
    depth: u32,
) -> Result<(Vec<ComponentTypeDecl>, usize)> {
    let (count, mut offset) = binary::read_vec_count(bytes, pos, MAX_DECLS)?;
    let mut decls = Vec::with_capacity(count as usize);
    for idx in 0..count {
        let (tag, size) = binary::read_u8(bytes, pos + offset)?;
        offset += size;
        let decl = match tag {
            0x00 => {
                let (raw, size) = skip_core_type(bytes, pos + offset).at_index(idx)?;
                offset += size;
                ComponentTypeDecl::CoreType(raw)
            },
            0x01 => {
                let (def, size) = parse_type_def_at_depth(bytes, pos + offset, depth).at_index(idx)?;
                offset += size;
                ComponentTypeDecl::Type(Box::new(def))
            },
            0x02 => {
                let (alias, size) = parse_alias_item(bytes, pos + offset).at_index(idx)?;
                offset += size;
                ComponentTypeDecl::Alias(alias)
            },
            0x03 => {
                let (name_kind, size) = binary::read_u8(bytes, pos + offset)?;
                offset += size;
                if name_kind > 0x01 {
                    return Err(Error::unknown_opcode("import name kind", name_kind));
                }
                let (name, size) = binary::read_name(bytes, pos + offset, MAX_NAME).at_index(idx)?;
                offset += size;
                let (desc, size) = parse_extern_desc(bytes, pos + offset).in_field(&name)?;
                offset += size;
                ComponentTypeDecl::Import { name, desc }
            },
            0x04 => {
                let (name, size) = binary::read_name(bytes, pos + offset, MAX_NAME).at_index(idx)?;
                offset += size;
                let (desc, size) = parse_extern_desc(bytes, pos + offset).in_field(&name)?;
                offset += size;
                ComponentTypeDecl::Export { name, desc }
            },
            _ => return Err(Error::unknown_opcode("component declaration", tag)),
        };
        decls.push(decl);
    }
    Ok((decls, offset))
}

/// Walk past a core type and return its raw bytes.
///
/// Core types are passed through unparsed, but the walker still has to
/// find their end. Only core function types (`0x60`) appear at this layer;
/// each value type in their parameter and result vectors is one byte.
fn skip_core_type(bytes: &[u8], pos: usize) -> Result<(Vec<u8>, usize)> {
    let (header, mut offset) = binary::read_u8(bytes, pos)?;
    if header != 0x60 {
        return Err(Error::unknown_opcode("core type", header));
    }
    for _ in 0..2 {
        let (count, size) = binary::read_vec_count(bytes, pos + offset, MAX_DECLS)?;
        offset += size;
        let (_types, size) = binary::read_bytes(bytes, pos + offset, count as usize)?;
        offset += size;
    }
    Ok((bytes[pos..pos + offset].to_vec(), offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_format::types::{ExternDesc, FormatValType, PrimitiveValType, TypeBound};

    #[test]
    fn defined_type_entry() {
        // list<u8>
        let bytes = [0x01, 0x70, 0x7D];
        let (types, size) = parse_type_section(&bytes, true).unwrap();
        assert_eq!(size, bytes.len());
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].data, vec![0x70, 0x7D]);
        assert_eq!(
            types[0].parsed,
            Some(TypeDef::Defined(FormatValType::List(Box::new(FormatValType::Primitive(
                PrimitiveValType::U8
            )))))
        );
    }

    #[test]
    fn raw_slices_match_with_and_without_parsing() {
        let bytes = [0x02, 0x70, 0x7D, 0x40, 0x00, 0x01, 0x00];
        let (parsed, parsed_size) = parse_type_section(&bytes, true).unwrap();
        let (raw, raw_size) = parse_type_section(&bytes, false).unwrap();
        assert_eq!(parsed_size, raw_size);
        assert_eq!(parsed.len(), raw.len());
        for (a, b) in parsed.iter().zip(raw.iter()) {
            assert_eq!(a.data, b.data);
            assert!(b.parsed.is_none());
        }
    }

    #[test]
    fn func_type_entry() {
        // func(x: u32) -> (no result)
        let bytes = [0x01, 0x40, 0x01, 0x01, b'x', 0x79, 0x01, 0x00];
        let (types, _) = parse_type_section(&bytes, true).unwrap();
        match types[0].parsed.as_ref().unwrap() {
            TypeDef::Func(func) => {
                assert_eq!(func.params.len(), 1);
                assert_eq!(func.params[0].0, "x");
                assert_eq!(func.result, None);
            },
            other => panic!("expected func type, got {:?}", other),
        }
    }

    #[test]
    fn instance_type_with_type_alias_and_exports() {
        // instance {
        //   type u32                      (decl 0x01, contributes index)
        //   alias outer 1 0 (type)        (decl 0x02, contributes index)
        //   export "r" type sub-resource  (decl 0x04, contributes index)
        //   export "f" func 0
        // }
        let bytes = [
            0x01, 0x42, 0x04, // one entry, instance type, four decls
            0x01, 0x79, // type u32
            0x02, 0x03, 0x02, 0x01, 0x00, // alias sort=type outer count=1 index=0
            0x04, 0x01, b'r', 0x03, 0x01, // export "r": type sub-resource
            0x04, 0x01, b'f', 0x01, 0x00, // export "f": func type 0
        ];
        let (types, size) = parse_type_section(&bytes, true).unwrap();
        assert_eq!(size, bytes.len());
        match types[0].parsed.as_ref().unwrap() {
            TypeDef::Instance(decls) => {
                assert_eq!(decls.len(), 4);
                match &decls[2] {
                    InstanceTypeDecl::Export { name, desc } => {
                        assert_eq!(name, "r");
                        assert_eq!(*desc, ExternDesc::Type(TypeBound::SubResource));
                    },
                    other => panic!("expected export decl, got {:?}", other),
                }
            },
            other => panic!("expected instance type, got {:?}", other),
        }
    }

    #[test]
    fn component_type_with_import() {
        // component { import "host" instance 0 }
        let bytes = [
            0x01, 0x41, 0x01, // one entry, component type, one decl
            0x03, 0x00, 0x04, b'h', b'o', b's', b't', 0x02, 0x00,
        ];
        let (types, _) = parse_type_section(&bytes, true).unwrap();
        match types[0].parsed.as_ref().unwrap() {
            TypeDef::Component(decls) => match &decls[0] {
                ComponentTypeDecl::Import { name, desc } => {
                    assert_eq!(name, "host");
                    assert_eq!(*desc, ExternDesc::Instance(0));
                },
                other => panic!("expected import decl, got {:?}", other),
            },
            other => panic!("expected component type, got {:?}", other),
        }
    }

    #[test]
    fn core_func_type_passthrough() {
        // instance { core type (func (param i32 i32) (result i32)) }
        let bytes = [
            0x01, 0x42, 0x01, // one entry, instance type, one decl
            0x00, 0x60, 0x02, 0x7F, 0x7F, 0x01, 0x7F,
        ];
        let (types, _) = parse_type_section(&bytes, true).unwrap();
        match types[0].parsed.as_ref().unwrap() {
            TypeDef::Instance(decls) => match &decls[0] {
                InstanceTypeDecl::CoreType(raw) => {
                    assert_eq!(raw, &vec![0x60, 0x02, 0x7F, 0x7F, 0x01, 0x7F]);
                },
                other => panic!("expected core type decl, got {:?}", other),
            },
            other => panic!("expected instance type, got {:?}", other),
        }
    }

    #[test]
    fn deep_declaration_nesting_is_bounded() {
        // 120 instance types each declaring the next: 0x42 0x01 0x01 ...
        let mut bytes = vec![0x01u8];
        for _ in 0..120 {
            bytes.extend_from_slice(&[0x42, 0x01, 0x01]);
        }
        bytes.push(0x79);
        let err = parse_type_section(&bytes, true).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Bounds);
    }

    #[test]
    fn unknown_declaration_tag() {
        let bytes = [0x01, 0x42, 0x01, 0x07];
        let err = parse_type_section(&bytes, true).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownOpcode);
    }
}
