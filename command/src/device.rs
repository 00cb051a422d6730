//! Device module docs.

use {
    crate::{buffer::RawLevel, capability::FamilyId, error::OutOfMemory},
    std::fmt::Debug,
};

/// Abstract logical device.
/// Defines everything recording needs from the graphics API
/// except encoding of commands which is done by `Executor`.
///
/// Shards are recorded from multiple threads with distinct pools and buffers,
/// hence the `Sync` requirement.
pub trait Device: Sync {
    /// Raw command pool.
    type CommandPool: Debug + Send;

    /// Raw command buffer.
    type CommandBuffer: Debug + Send;

    /// Create command pool for the family.
    /// Buffers allocated from the pool must be individually resettable.
    ///
    /// # Safety
    ///
    /// `family` must be a family of this device.
    unsafe fn create_pool(&self, family: FamilyId) -> Result<Self::CommandPool, OutOfMemory>;

    /// Destroy command pool.
    ///
    /// # Safety
    ///
    /// Pool must be created by this device
    /// and no buffers allocated from the pool may be pending execution.
    unsafe fn destroy_pool(&self, pool: Self::CommandPool);

    /// Allocate command buffer of specified level.
    ///
    /// # Safety
    ///
    /// Pool must be created by this device.
    unsafe fn allocate_buffer(
        &self,
        pool: &mut Self::CommandPool,
        level: RawLevel,
    ) -> Result<Self::CommandBuffer, OutOfMemory>;

    /// Free command buffer.
    ///
    /// # Safety
    ///
    /// Buffer must be allocated from `pool` and not pending execution.
    unsafe fn free_buffer(&self, pool: &mut Self::CommandPool, buffer: Self::CommandBuffer);

    /// Begin recording.
    /// Secondary buffers are recorded outside of render pass.
    ///
    /// # Safety
    ///
    /// Buffer must be in initial state and allocated with `level`.
    unsafe fn begin_buffer(
        &self,
        buffer: &mut Self::CommandBuffer,
        level: RawLevel,
    ) -> Result<(), OutOfMemory>;

    /// Finish recording.
    ///
    /// # Safety
    ///
    /// Buffer must be in recording state.
    unsafe fn finish_buffer(&self, buffer: &mut Self::CommandBuffer) -> Result<(), OutOfMemory>;

    /// Reset buffer into initial state.
    ///
    /// # Safety
    ///
    /// Buffer must not be pending execution.
    unsafe fn reset_buffer(&self, buffer: &mut Self::CommandBuffer) -> Result<(), OutOfMemory>;

    /// Record execution of secondary buffers into primary buffer.
    ///
    /// # Safety
    ///
    /// `primary` must be primary buffer in recording state.
    /// `secondaries` must be secondary buffers in executable state.
    unsafe fn execute_secondaries<'a>(
        &self,
        primary: &mut Self::CommandBuffer,
        secondaries: impl IntoIterator<Item = &'a Self::CommandBuffer>,
    ) where
        Self::CommandBuffer: 'a;
}
