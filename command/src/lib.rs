//! Parallel command recording.
//!
//! [`Recorder`] splits ordered command lists into contiguous shards,
//! records every shard into a secondary command buffer on a [`ThreadPool`]
//! and stitches secondaries into one primary command buffer in shard order.
//! Turning a single command into native calls is up to the [`Executor`].

#![forbid(overflowing_literals)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![deny(missing_docs)]
#![deny(path_statements)]
#![deny(trivial_bounds)]
#![deny(type_alias_bounds)]
#![deny(unconditional_recursion)]
#![deny(while_true)]
#![deny(bad_style)]
#![deny(future_incompatible)]
#![warn(rust_2018_idioms)]

// Profile the rest of the enclosing scope when `profiler` feature is enabled.
macro_rules! profile_scope {
    ($name:expr) => {
        #[cfg(feature = "profiler")]
        let _profile_scope =
            thread_profiler::ProfileScope::new(format!("{}: {}", module_path!(), $name));
    };
}

mod buffer;
mod capability;
mod command;
mod device;
mod error;
mod executor;
mod partition;
mod pool;
mod recorder;
mod thread_pool;

#[cfg(feature = "ash")]
mod impls;

#[cfg(test)]
mod test;

pub use crate::{
    buffer::{
        CommandBuffer, ExecutableState, Failed, InitialState, InvalidState, Level, PrimaryLevel,
        RawLevel, RecordingState, Resettable, SecondaryLevel,
    },
    capability::{FamilyId, QueueType},
    command::*,
    device::Device,
    error::{OutOfMemory, RecordError},
    executor::Executor,
    partition::{locate, shard_commands, shards, Cursor, Shard, MIN_COMMANDS_PER_THREAD},
    pool::{CommandPool, CommandPools},
    recorder::{RecordConfig, Recorder, Recording},
    thread_pool::{FixedThreadPool, ThreadPool},
};
