use crate::{command::Command, device::Device};

/// Records single command into raw command buffer.
///
/// Called once per command, in order, from the thread recording the shard.
/// Shards are recorded concurrently so executor must be `Sync`.
pub trait Executor<D: Device, C: Command>: Sync {
    /// Record `command` into `target`.
    fn execute(&self, target: &mut D::CommandBuffer, command: &C);
}

impl<D, C, F> Executor<D, C> for F
where
    D: Device,
    C: Command,
    F: Fn(&mut D::CommandBuffer, &C) + Sync,
{
    fn execute(&self, target: &mut D::CommandBuffer, command: &C) {
        self(target, command)
    }
}
