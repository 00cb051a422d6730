//! Tessera's top level crate.
//! Reexports all others.

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

#[cfg(feature = "command")]
#[doc(inline)]
pub use tessera_command as command;

#[cfg(feature = "memory")]
#[doc(inline)]
pub use tessera_memory as memory;

#[cfg(feature = "ash")]
pub use ash;

#[cfg(feature = "profiler")]
pub use thread_profiler;
