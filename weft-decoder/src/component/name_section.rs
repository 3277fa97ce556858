//! Component `name` custom section.
//!
//! Only the component-name subsection (id 0x00) is consumed here. Custom
//! sections are never validated, so any malformed payload yields `None`.

use weft_format::binary::MAX_NAME;

use crate::prelude::*;

/// Subsection id carrying the component's own name.
const COMPONENT_NAME_SUBSECTION: u8 = 0x00;

/// Extract the component name from a `name` custom-section payload.
pub fn parse_component_name(data: &[u8]) -> Option<String> {
    let mut offset = 0usize;
    while offset < data.len() {
        let (subsection_id, size) = binary::read_u8(data, offset).ok()?;
        offset += size;
        let (subsection_size, size) = binary::read_leb128_u32(data, offset).ok()?;
        offset += size;
        let end = offset.checked_add(subsection_size as usize)?;
        if end > data.len() {
            return None;
        }
        if subsection_id == COMPONENT_NAME_SUBSECTION {
            let (name, consumed) = binary::read_name(data, offset, MAX_NAME).ok()?;
            if consumed != subsection_size as usize {
                return None;
            }
            return Some(name);
        }
        offset = end;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_name_subsection() {
        let data = [0x00, 0x05, 0x04, b'd', b'e', b'm', b'o'];
        assert_eq!(parse_component_name(&data), Some("demo".to_string()));
    }

    #[test]
    fn later_subsection_is_found() {
        // An unknown subsection first, then the component name.
        let data = [0x04, 0x01, 0xAA, 0x00, 0x03, 0x02, b'o', b'k'];
        assert_eq!(parse_component_name(&data), Some("ok".to_string()));
    }

    #[test]
    fn malformed_payload_degrades_to_none() {
        assert_eq!(parse_component_name(&[0x00]), None);
        assert_eq!(parse_component_name(&[0x00, 0x7F, 0x01]), None);
        assert_eq!(parse_component_name(&[]), None);
    }
}
