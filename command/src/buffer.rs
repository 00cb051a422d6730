//! Command buffer module docs.

use crate::{
    capability::{FamilyId, QueueType},
    device::Device,
    error::OutOfMemory,
};

/// Command buffer state in which all buffers start.
/// Resetting also moves buffer to this state.
#[derive(Clone, Copy, Debug, Default)]
pub struct InitialState;

/// Command buffer in recording state could be populated with commands.
#[derive(Clone, Copy, Debug, Default)]
pub struct RecordingState;

/// Command buffer in executable state can be submitted
/// or executed as part of primary buffer.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExecutableState;

/// Command buffer whose begin or finish failed.
/// It must be reset before reuse.
#[derive(Clone, Copy, Debug, Default)]
pub struct InvalidState;

/// States in which command buffer can be reset and returned to the pool.
pub trait Resettable: Copy + std::fmt::Debug {}
impl Resettable for InitialState {}
impl Resettable for RecordingState {}
impl Resettable for ExecutableState {}
impl Resettable for InvalidState {}

/// Command buffer level as seen by the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RawLevel {
    /// Can be submitted to queues.
    Primary,
    /// Can be executed as part of primary buffers.
    Secondary,
}

/// Command buffers of this level can be submitted to the command queues.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrimaryLevel;

/// Command buffers of this level can be executed as part of the primary buffers.
#[derive(Clone, Copy, Debug, Default)]
pub struct SecondaryLevel;

/// Command buffer level.
pub trait Level: Copy + Default + std::fmt::Debug + Send + Sync + 'static {
    /// Get raw level value.
    fn raw_level(&self) -> RawLevel;
}

impl Level for PrimaryLevel {
    fn raw_level(&self) -> RawLevel {
        RawLevel::Primary
    }
}

impl Level for SecondaryLevel {
    fn raw_level(&self) -> RawLevel {
        RawLevel::Secondary
    }
}

/// Command buffer wrapper.
/// State and level are tracked at type level
/// so buffers can't be begun twice or executed before they are finished.
///
/// Buffer remembers the pool slot it came from
/// and must be returned there with `CommandPools::release`.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = "S: std::fmt::Debug, L: std::fmt::Debug"))]
pub struct CommandBuffer<D: Device, S, L = PrimaryLevel> {
    raw: D::CommandBuffer,
    state: S,
    level: L,
    queue: QueueType,
    slot: usize,
    family: FamilyId,
    #[derivative(Debug = "ignore")]
    relevant: relevant::Relevant,
}

/// Command buffer that failed to change state, along with the cause.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = "L: std::fmt::Debug"))]
pub struct Failed<D: Device, L> {
    /// Cause of the failure.
    pub error: OutOfMemory,

    /// Buffer to return to the pool.
    pub buffer: CommandBuffer<D, InvalidState, L>,
}

impl<D, S, L> CommandBuffer<D, S, L>
where
    D: Device,
    L: Level,
{
    /// Wrap raw buffer handle.
    ///
    /// # Safety
    ///
    /// `raw` must be allocated with `level` from pool of `queue` pools at `slot`
    /// and actually be in state `S`.
    pub(crate) unsafe fn from_raw(
        raw: D::CommandBuffer,
        state: S,
        level: L,
        queue: QueueType,
        slot: usize,
        family: FamilyId,
    ) -> Self {
        CommandBuffer {
            raw,
            state,
            level,
            queue,
            slot,
            family,
            relevant: relevant::Relevant,
        }
    }

    /// Change state of the command buffer.
    ///
    /// # Safety
    ///
    /// This method must be used only to reflect state changed due to raw handle usage.
    unsafe fn change_state<U>(self, f: impl FnOnce(S) -> U) -> CommandBuffer<D, U, L> {
        CommandBuffer {
            raw: self.raw,
            state: f(self.state),
            level: self.level,
            queue: self.queue,
            slot: self.slot,
            family: self.family,
            relevant: self.relevant,
        }
    }

    /// Get raw command buffer handle.
    pub fn raw(&self) -> &D::CommandBuffer {
        &self.raw
    }

    /// Queue type the buffer is recorded for.
    pub fn queue(&self) -> QueueType {
        self.queue
    }

    /// Index of the pool slot the buffer belongs to.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Family the buffer can be submitted to.
    pub fn family(&self) -> FamilyId {
        self.family
    }

    /// Level of the buffer.
    pub fn level(&self) -> L {
        self.level
    }
}

impl<D, L> CommandBuffer<D, InitialState, L>
where
    D: Device,
    L: Level,
{
    /// Begin recording command buffer.
    pub(crate) fn begin(
        mut self,
        device: &D,
    ) -> Result<CommandBuffer<D, RecordingState, L>, Failed<D, L>> {
        let level = self.level.raw_level();
        match unsafe { device.begin_buffer(&mut self.raw, level) } {
            // Buffer is in initial state and allocated with `level`.
            Ok(()) => Ok(unsafe { self.change_state(|_| RecordingState) }),
            Err(error) => Err(self.fail(error)),
        }
    }
}

impl<D, L> CommandBuffer<D, RecordingState, L>
where
    D: Device,
    L: Level,
{
    /// Get raw command buffer to record commands into.
    pub fn raw_mut(&mut self) -> &mut D::CommandBuffer {
        &mut self.raw
    }

    /// Finish recording command buffer.
    pub(crate) fn finish(
        mut self,
        device: &D,
    ) -> Result<CommandBuffer<D, ExecutableState, L>, Failed<D, L>> {
        match unsafe { device.finish_buffer(&mut self.raw) } {
            Ok(()) => Ok(unsafe { self.change_state(|_| ExecutableState) }),
            Err(error) => Err(self.fail(error)),
        }
    }
}

impl<D> CommandBuffer<D, RecordingState, PrimaryLevel>
where
    D: Device,
{
    /// Record execution of finished secondary buffers in order.
    pub(crate) fn execute_secondaries<'a>(
        &mut self,
        device: &D,
        secondaries: impl IntoIterator<
            Item = &'a CommandBuffer<D, ExecutableState, SecondaryLevel>,
        >,
    ) where
        D: 'a,
        D::CommandBuffer: 'a,
    {
        unsafe {
            // Typestate guarantees primary is recording and secondaries are executable.
            let secondaries = secondaries.into_iter().map(CommandBuffer::raw);
            device.execute_secondaries(&mut self.raw, secondaries);
        }
    }
}

impl<D, S, L> CommandBuffer<D, S, L>
where
    D: Device,
    S: Resettable,
    L: Level,
{
    fn fail(self, error: OutOfMemory) -> Failed<D, L> {
        Failed {
            error,
            buffer: unsafe { self.change_state(|_| InvalidState) },
        }
    }

    /// Dispose of command buffer wrapper releasing raw command buffer value.
    pub(crate) fn into_raw(self) -> D::CommandBuffer {
        self.relevant.dispose();
        self.raw
    }
}
