//! Prelude module for weft-error.
//!
//! Re-exports the allocation and formatting types used throughout the crate
//! so module bodies read the same in std and no_std builds.

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

pub use core::{
    fmt,
    fmt::{Debug, Display},
    str,
};
