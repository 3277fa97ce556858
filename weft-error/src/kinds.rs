//! Helper constructors for common error shapes.
//!
//! These keep parser and validator call sites one-liners; each fixes the
//! phase that kind is raised from in practice.

use crate::errors::{Error, ErrorKind, Phase};
use crate::prelude::*;

/// The reader ran out of bytes mid-field.
pub fn truncated(message: &str) -> Error {
    Error::parse(ErrorKind::Truncated, message)
}

/// A count or length prefix exceeded its cap.
pub fn bounds(message: &str) -> Error {
    Error::parse(ErrorKind::Bounds, message)
}

/// A byte outside the known opcode set.
pub fn unknown_opcode(what: &str, byte: u8) -> Error {
    Error::unknown_opcode(what, byte)
}

/// A type index out of range or of the wrong kind, raised during
/// validation.
pub fn invalid_type_index(index: u32, space_len: usize) -> Error {
    Error::validate(
        ErrorKind::InvalidTypeIndex,
        format!("type index {} out of range (space holds {})", index, space_len),
    )
}

/// An instance export lookup that found nothing.
pub fn unresolved_export(instance_idx: u32, name: &str) -> Error {
    Error::validate(
        ErrorKind::UnresolvedAlias,
        format!("instance {} has no export named {:?}", instance_idx, name),
    )
}

/// An outer-alias count that walked off the scope stack.
pub fn unresolved_outer(count: u32, depth: usize) -> Error {
    Error::validate(
        ErrorKind::UnresolvedAlias,
        format!("outer alias count {} exceeds scope depth {}", count, depth),
    )
}

/// A canon opcode or option this layer does not support.
pub fn unsupported_canon(message: &str) -> Error {
    Error::validate(ErrorKind::UnsupportedCanon, message)
}

/// A scope closed with an unconsumed value entry.
pub fn value_not_used(index: u32) -> Error {
    Error::validate(ErrorKind::ValueNotUsed, format!("value {} declared but never used", index))
}

/// Address or size arithmetic overflow in the given phase.
pub fn overflow(phase: Phase, message: &str) -> Error {
    Error::new(phase, ErrorKind::Overflow, message)
}
