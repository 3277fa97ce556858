//! Breadcrumb-path accumulation on results.

use crate::errors::PathSegment;
use crate::prelude::*;
use crate::Result;

/// Extension trait that prepends a path segment to a bubbling error.
///
/// Applied at each structural level as an error propagates outward, so the
/// final path reads root-first:
///
/// ```
/// use weft_error::{Error, ResultExt};
///
/// fn inner() -> weft_error::Result<()> {
///     Err(Error::truncated("ran out"))
/// }
///
/// let err = inner().at_index(3).in_field("items").unwrap_err();
/// assert_eq!(err.path_string(), ".items[3]");
/// ```
pub trait ResultExt<T> {
    /// Record that the error happened inside the named field.
    fn in_field(self, name: &str) -> Result<T>;

    /// Record that the error happened inside the named variant case.
    fn in_case(self, name: &str) -> Result<T>;

    /// Record that the error happened at the given element or item index.
    fn at_index(self, index: u32) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn in_field(self, name: &str) -> Result<T> {
        self.map_err(|e| e.push_path(PathSegment::Field(name.to_string())))
    }

    fn in_case(self, name: &str) -> Result<T> {
        self.map_err(|e| e.push_path(PathSegment::Case(name.to_string())))
    }

    fn at_index(self, index: u32) -> Result<T> {
        self.map_err(|e| e.push_path(PathSegment::Index(index)))
    }
}
