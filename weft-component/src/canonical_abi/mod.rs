//! Canonical ABI: layout, flattening, lifting, and lowering.
//!
//! Layout and flattening are pure functions of a resolved type. Lifting
//! and lowering additionally consume the [`memory::Memory`] capability,
//! and lowering the [`memory::Realloc`] capability; neither touches the
//! arena.

pub mod flatten;
pub mod layout;
pub mod lift;
pub mod lower;
pub mod memory;

pub use flatten::{flatten, flatten_function, join, CanonContext, CoreType, MAX_FLAT_PARAMS, MAX_FLAT_RESULTS};
pub use layout::{discriminant_size, layout, record_layout, Layout};
pub use lift::{lift_flat, lift_memory, CoreVal};
pub use lower::{lower_flat, lower_into_retptr, lower_memory};
pub use memory::{BumpAllocator, Memory, Realloc, SimpleMemory};
