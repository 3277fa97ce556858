// Weft - weft-decoder
// Module: Component Model binary decoder
//
// Copyright (c) 2025 The Weft Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

//! WebAssembly Component Model binary decoder.
//!
//! This crate walks a component binary section by section and produces the
//! raw model defined in `weft-format`: parsed imports, exports, aliases,
//! canons, instances, and the full type grammar, together with the
//! section-appearance log that the streaming validator in `weft-component`
//! replays.
//!
//! The decoder never resolves type indices and never consults other
//! sections while parsing one; everything index-shaped is recorded as-is.
//! All reads are length-checked and all counts are capped before
//! allocation, so malformed input yields a typed error, never a panic.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod component;
pub mod prelude;

pub use component::decode::{decode, decode_with_options, is_component, DecodeOptions};
