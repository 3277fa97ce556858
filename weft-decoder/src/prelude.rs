//! Prelude module for weft-decoder.
//!
//! Unified imports for std and no_std builds, plus the error and format
//! re-exports every parser module uses.

#[cfg(not(feature = "std"))]
pub use alloc::{
    boxed::Box,
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};
#[cfg(feature = "std")]
pub use std::{
    boxed::Box,
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};

pub use core::{fmt, str};

pub use weft_error::{Error, ErrorKind, Phase, Result, ResultExt};
pub use weft_format::binary;
