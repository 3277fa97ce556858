// Copyright (c) 2025 The Weft Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Component section walk.
//!
//! Decoding never looks across sections: every parsed item is recorded in
//! binary order, and the index-space bookkeeping done here (function and
//! core-function references, instance typing, section-appearance markers)
//! is pure counting. Resolution happens later, in the validator.

use log::{debug, trace};
use weft_format::binary::{COMPONENT_MAGIC, MAX_NAME, MAX_SECTIONS};
use weft_format::component::{
    AliasTarget, Canon, Component, CoreFuncRef, CoreSort, CustomSection, FuncRef, MarkerKind,
    SectionMarker, Sort,
};
use weft_format::section::SectionId;
use weft_format::types::ExternDesc;

use super::name_section::parse_component_name;
use super::parse::{
    parse_alias_section, parse_canon_section, parse_core_instance_section, parse_export_section,
    parse_import_section, parse_instance_section, parse_start_section, parse_value_section,
};
use super::types::parse_type_section;
use crate::prelude::*;

/// Decoding options.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// Parse type-section entries in full. When false, entries are still
    /// sliced (the grammar is walked to find their bounds) but only the
    /// raw bytes are kept.
    pub parse_types: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self { parse_types: true }
    }
}

impl DecodeOptions {
    /// Default options: full type parsing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether type-section entries are parsed in full.
    pub fn with_parse_types(mut self, parse_types: bool) -> Self {
        self.parse_types = parse_types;
        self
    }
}

/// Check whether `bytes` starts with a component preamble: the `\0asm`
/// magic followed by a little-endian layer/version word greater than 1
/// (any non-core version).
pub fn is_component(bytes: &[u8]) -> bool {
    if bytes.len() < 8 || bytes[0..4] != COMPONENT_MAGIC {
        return false;
    }
    u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) > 1
}

/// Decode a component binary with default options.
pub fn decode(bytes: &[u8]) -> Result<Component> {
    decode_with_options(bytes, DecodeOptions::default())
}

/// Decode a component binary.
pub fn decode_with_options(bytes: &[u8], options: DecodeOptions) -> Result<Component> {
    if bytes.len() < 8 {
        return Err(Error::truncated("component preamble needs 8 bytes"));
    }
    if bytes[0..4] != COMPONENT_MAGIC {
        return Err(Error::parse(ErrorKind::UnknownOpcode, "missing \\0asm magic"));
    }
    let version_word = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version_word <= 1 {
        return Err(Error::parse(
            ErrorKind::UnknownOpcode,
            format!("layer/version word {:#010x} marks a core module, not a component", version_word),
        ));
    }
    trace!("component preamble accepted, layer/version word {:#010x}", version_word);

    let mut component = Component::new();
    component.version_word = version_word;

    // Instance index space counter; imports, the instance section, aliases,
    // and instance exports all grow it, in binary order.
    let mut instance_count: u32 = 0;
    let mut section_count: u32 = 0;
    let mut offset = 8usize;

    while offset < bytes.len() {
        section_count += 1;
        if section_count > MAX_SECTIONS {
            return Err(Error::bounds("section count exceeds cap"));
        }

        let (id_byte, size) = binary::read_u8(bytes, offset)?;
        offset += size;
        let section_id = SectionId::from_u8(id_byte)
            .ok_or_else(|| Error::unknown_opcode("section id", id_byte))?;
        let (section_size, size) = binary::read_leb128_u32(bytes, offset)?;
        offset += size;

        let section_end = offset
            .checked_add(section_size as usize)
            .ok_or_else(|| Error::parse(ErrorKind::Overflow, "section size overflows usize"))?;
        if section_end > bytes.len() {
            return Err(Error::truncated(format!(
                "{} section of size {} exceeds remaining input",
                section_id, section_size
            )));
        }
        let payload = &bytes[offset..section_end];
        trace!("{} section, {} bytes", section_id, section_size);

        match section_id {
            SectionId::Custom => {
                let (name, name_size) = binary::read_name(payload, 0, MAX_NAME)?;
                let data = payload[name_size..].to_vec();
                if name == "name" {
                    // Custom sections are never validated; a malformed name
                    // payload degrades to an anonymous component.
                    if let Some(component_name) = parse_component_name(&data) {
                        component.name = Some(component_name);
                    }
                }
                component.customs.push(CustomSection { name, data });
            },
            SectionId::CoreModule => {
                component.modules.push(payload.to_vec());
            },
            SectionId::CoreInstance => {
                let (instances, consumed) = parse_core_instance_section(payload)?;
                expect_consumed(consumed, payload.len(), section_id)?;
                component.core_instances.extend(instances);
            },
            SectionId::CoreType => {
                component.core_types.push(payload.to_vec());
            },
            SectionId::Component => {
                component.nested_components.push(payload.to_vec());
            },
            SectionId::Instance => {
                let (instances, consumed) = parse_instance_section(payload)?;
                expect_consumed(consumed, payload.len(), section_id)?;
                instance_count += instances.len() as u32;
                component.instances.extend(instances);
            },
            SectionId::Alias => {
                let (aliases, consumed) = parse_alias_section(payload)?;
                expect_consumed(consumed, payload.len(), section_id)?;
                let start = component.aliases.len() as u32;
                for alias in &aliases {
                    record_alias_spaces(&mut component, alias, &mut instance_count);
                }
                component.section_order.push(SectionMarker {
                    kind: MarkerKind::Alias,
                    start,
                    count: aliases.len() as u32,
                });
                component.aliases.extend(aliases);
            },
            SectionId::Type => {
                let (types, consumed) = parse_type_section(payload, options.parse_types)?;
                expect_consumed(consumed, payload.len(), section_id)?;
                component.section_order.push(SectionMarker {
                    kind: MarkerKind::Type,
                    start: component.types.len() as u32,
                    count: types.len() as u32,
                });
                component.types.extend(types);
            },
            SectionId::Canon => {
                let (canon, consumed) = parse_canon_section(payload)?;
                expect_consumed(consumed, payload.len(), section_id)?;
                let canon_idx = component.canons.len() as u32;
                record_canon_spaces(&mut component, &canon, canon_idx);
                component.section_order.push(SectionMarker {
                    kind: MarkerKind::Canon,
                    start: canon_idx,
                    count: 1,
                });
                component.canons.push(canon);
            },
            SectionId::Start => {
                if component.start.is_some() {
                    return Err(Error::bounds("more than one start section"));
                }
                let (start, consumed) = parse_start_section(payload)?;
                expect_consumed(consumed, payload.len(), section_id)?;
                component.start = Some(start);
            },
            SectionId::Import => {
                let (imports, consumed) = parse_import_section(payload)?;
                expect_consumed(consumed, payload.len(), section_id)?;
                for import in &imports {
                    if let ExternDesc::Instance(type_idx) = import.desc {
                        component.instance_types.insert(instance_count, type_idx);
                        instance_count += 1;
                    }
                }
                component.imports.extend(imports);
            },
            SectionId::Export => {
                let (exports, consumed) = parse_export_section(payload)?;
                expect_consumed(consumed, payload.len(), section_id)?;
                let start = component.exports.len() as u32;
                for export in &exports {
                    match export.sort {
                        Sort::Func => {
                            component.func_refs.push(FuncRef::ExportedFunc { func_idx: export.index });
                        },
                        Sort::Instance => {
                            // Re-exporting an instance appends a new
                            // instance index with the same declared type.
                            let declared = component.instance_types.get(&export.index).copied();
                            if let Some(type_idx) = declared {
                                component.instance_types.insert(instance_count, type_idx);
                            }
                            instance_count += 1;
                        },
                        _ => {},
                    }
                }
                component.section_order.push(SectionMarker {
                    kind: MarkerKind::Export,
                    start,
                    count: exports.len() as u32,
                });
                component.exports.extend(exports);
            },
            SectionId::Value => {
                let (values, consumed) = parse_value_section(payload)?;
                expect_consumed(consumed, payload.len(), section_id)?;
                component.values.extend(values);
            },
        }

        offset = section_end;
    }

    debug!(
        "decoded component: {} modules, {} types, {} canons, {} imports, {} exports, {} sections logged",
        component.modules.len(),
        component.types.len(),
        component.canons.len(),
        component.imports.len(),
        component.exports.len(),
        component.section_order.len(),
    );
    Ok(component)
}

fn expect_consumed(consumed: usize, size: usize, section: SectionId) -> Result<()> {
    if consumed != size {
        return Err(Error::bounds(format!(
            "{} section payload has {} trailing bytes",
            section,
            size - consumed
        )));
    }
    Ok(())
}

/// Track index-space growth caused by an alias.
fn record_alias_spaces(component: &mut Component, alias: &weft_format::component::Alias, instance_count: &mut u32) {
    match &alias.target {
        AliasTarget::InstanceExport { sort, instance_idx, name } => match sort {
            Sort::Func => component.func_refs.push(FuncRef::AliasExport {
                instance_idx: *instance_idx,
                name: name.clone(),
            }),
            Sort::Instance => *instance_count += 1,
            _ => {},
        },
        AliasTarget::CoreInstanceExport { sort, instance_idx, name } => {
            if *sort == CoreSort::Func {
                component.core_func_refs.push(CoreFuncRef::AliasExport {
                    instance_idx: *instance_idx,
                    name: name.clone(),
                });
            }
        },
        AliasTarget::Outer { sort, count, index } => match sort {
            Sort::Func => {
                component.func_refs.push(FuncRef::OuterAlias { count: *count, index: *index });
            },
            Sort::Instance => *instance_count += 1,
            _ => {},
        },
    }
}

/// Track index-space growth caused by a canon definition.
fn record_canon_spaces(component: &mut Component, canon: &Canon, canon_idx: u32) {
    match canon {
        Canon::Lift { .. } => component.func_refs.push(FuncRef::CanonLift { canon_idx }),
        Canon::Lower { .. } => component.core_func_refs.push(CoreFuncRef::CanonLower { canon_idx }),
        Canon::ResourceNew { type_idx } => {
            component.core_func_refs.push(CoreFuncRef::ResourceNew { type_idx: *type_idx });
        },
        Canon::ResourceDrop { type_idx } | Canon::ResourceDropAsync { type_idx } => {
            component.core_func_refs.push(CoreFuncRef::ResourceDrop { type_idx: *type_idx });
        },
        Canon::ResourceRep { type_idx } => {
            component.core_func_refs.push(CoreFuncRef::ResourceRep { type_idx: *type_idx });
        },
        Canon::TaskCancel | Canon::SubtaskCancel => {
            component.core_func_refs.push(CoreFuncRef::TaskBuiltin);
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_format::binary::{ALIAS_SECTION_ID, EXPORT_SECTION_ID, TYPE_SECTION_ID};

    fn preamble() -> Vec<u8> {
        let mut bytes = COMPONENT_MAGIC.to_vec();
        bytes.extend_from_slice(&[0x0D, 0x00, 0x01, 0x00]);
        bytes
    }

    fn section(id: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![id, payload.len() as u8];
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn is_component_matches_preamble_rule() {
        assert!(is_component(&preamble()));

        // Core module: version 1, layer 0.
        let mut core = COMPONENT_MAGIC.to_vec();
        core.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]);
        assert!(!is_component(&core));

        assert!(!is_component(b"\0asm"));
        assert!(!is_component(b"nope\x0d\x00\x01\x00"));
    }

    #[test]
    fn empty_component_decodes() {
        let component = decode(&preamble()).unwrap();
        assert!(component.types.is_empty());
        assert!(component.section_order.is_empty());
        assert_eq!(component.version_word, 0x0001_000D);
    }

    #[test]
    fn core_preamble_is_rejected() {
        let mut core = COMPONENT_MAGIC.to_vec();
        core.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]);
        let err = decode(&core).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownOpcode);
    }

    #[test]
    fn section_walk_records_markers_in_order() {
        let mut bytes = preamble();
        // type section: one u32 defined type
        bytes.extend_from_slice(&section(TYPE_SECTION_ID, &[0x01, 0x79]));
        // alias section: func alias on instance 0 export "f"
        bytes.extend_from_slice(&section(ALIAS_SECTION_ID, &[0x01, 0x01, 0x00, 0x00, 0x01, b'f']));
        // export section: "g" func 0
        bytes.extend_from_slice(&section(EXPORT_SECTION_ID, &[0x01, 0x00, 0x01, b'g', 0x01, 0x00]));

        let component = decode(&bytes).unwrap();
        let kinds: Vec<MarkerKind> =
            component.section_order.iter().map(|marker| marker.kind).collect();
        assert_eq!(kinds, vec![MarkerKind::Type, MarkerKind::Alias, MarkerKind::Export]);

        // Function index space: alias then export re-export, in order.
        assert_eq!(component.func_refs.len(), 2);
        assert_eq!(
            component.func_refs[0],
            FuncRef::AliasExport { instance_idx: 0, name: "f".to_string() }
        );
        assert_eq!(component.func_refs[1], FuncRef::ExportedFunc { func_idx: 0 });
    }

    #[test]
    fn parse_types_off_keeps_identical_slices() {
        let mut bytes = preamble();
        bytes.extend_from_slice(&section(
            TYPE_SECTION_ID,
            &[0x02, 0x70, 0x7D, 0x40, 0x00, 0x01, 0x00],
        ));

        let parsed = decode_with_options(&bytes, DecodeOptions::new()).unwrap();
        let raw =
            decode_with_options(&bytes, DecodeOptions::new().with_parse_types(false)).unwrap();

        assert_eq!(parsed.section_order, raw.section_order);
        assert_eq!(parsed.types.len(), raw.types.len());
        for (a, b) in parsed.types.iter().zip(raw.types.iter()) {
            assert_eq!(a.data, b.data);
            assert!(a.parsed.is_some());
            assert!(b.parsed.is_none());
        }
    }

    #[test]
    fn trailing_section_bytes_are_rejected() {
        let mut bytes = preamble();
        // Alias section declaring zero aliases but carrying a stray byte.
        bytes.extend_from_slice(&section(ALIAS_SECTION_ID, &[0x00, 0xFF]));
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Bounds);
    }

    #[test]
    fn truncated_section_is_rejected() {
        let mut bytes = preamble();
        bytes.extend_from_slice(&[TYPE_SECTION_ID, 0x20, 0x01]);
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Truncated);
    }

    #[test]
    fn unknown_section_id_is_rejected() {
        let mut bytes = preamble();
        bytes.extend_from_slice(&section(0x0D, &[]));
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownOpcode);
    }

    #[test]
    fn section_count_is_capped() {
        let mut bytes = preamble();
        // 100_001 empty custom sections: id 0, size 1, zero-length name.
        for _ in 0..=MAX_SECTIONS {
            bytes.extend_from_slice(&[0x00, 0x01, 0x00]);
        }
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Bounds);
    }
}
