//! Prelude module for weft-format.
//!
//! Unified imports for std and no_std builds.

#[cfg(not(feature = "std"))]
pub use alloc::{
    boxed::Box,
    collections::BTreeMap,
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};
#[cfg(feature = "std")]
pub use std::{
    boxed::Box,
    collections::BTreeMap,
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};

pub use core::{fmt, str};

pub use weft_error::{Error, ErrorKind, Phase, Result, ResultExt};
