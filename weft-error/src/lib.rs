// Weft - weft-error
// Module: Weft Error Handling
//
// Copyright (c) 2025 The Weft Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

//! Error handling for the weft component toolkit.
//!
//! Every failure surfaced by the decoder, the validator, and the canonical
//! ABI transcoder is an [`Error`] value: a phase (where in the pipeline the
//! failure happened), a kind (a closed taxonomy), a human-readable message,
//! and a breadcrumb path of field/case/index names from the root of the
//! value or section being processed.
//!
//! # Usage
//!
//! ```
//! use weft_error::{Error, ErrorKind, Phase, ResultExt};
//!
//! fn read_field() -> weft_error::Result<u32> {
//!     Err(Error::truncated("field ran past end of section"))
//! }
//!
//! let err = read_field().in_field("offset").unwrap_err();
//! assert_eq!(err.kind, ErrorKind::Truncated);
//! assert_eq!(err.phase, Phase::Parse);
//! ```

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod context;
pub mod errors;
pub mod kinds;
pub mod prelude;

pub use context::ResultExt;
pub use errors::{Error, ErrorKind, PathSegment, Phase};

/// A specialized `Result` type for weft operations.
pub type Result<T> = core::result::Result<T, Error>;
