//! GPU memory management.
//!
//! Device memory objects are carved into sub-allocations by [`BuddyBlock`],
//! a binary buddy tree over one fixed-size memory object.
//! [`Heaps`] owns blocks for every memory type of the device, picks memory type by usage
//! and creates new blocks when existing ones are exhausted.

#![warn(
    missing_debug_implementations,
    missing_copy_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications
)]

// Profile the rest of the enclosing scope when `profiler` feature is enabled.
macro_rules! profile_scope {
    ($name:expr) => {
        #[cfg(feature = "profiler")]
        let _profile_scope =
            thread_profiler::ProfileScope::new(format!("{}: {}", module_path!(), $name));
    };
}

mod allocator;
mod block;
mod device;
mod error;
mod heaps;
mod mapping;
mod memory;
mod usage;
mod util;
mod utilization;

#[cfg(feature = "ash")]
mod impls;

#[cfg(test)]
mod test;

pub use crate::{
    allocator::*,
    block::Block,
    device::Device,
    error::*,
    heaps::{Heaps, HeapsConfig, HeapsError, MemoryBlock},
    mapping::MemoryMapping,
    memory::*,
    usage::*,
    utilization::*,
};
