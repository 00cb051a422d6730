//! Abstract commands recorded by `Recorder`.
//!
//! Commands reference resources by ids.
//! Resolving ids into native handles is up to the `Executor`.

use {crate::capability::QueueType, smallvec::SmallVec, std::ops::Range};

/// Command that can be recorded into command buffer.
pub trait Command: Send + Sync {
    /// Minimal queue type able to execute the command.
    const QUEUE: QueueType;
}

/// Buffer resource id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(pub u32);

/// Image resource id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageId(pub u32);

/// Pipeline id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PipelineId(pub u32);

/// Descriptor set id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DescriptorSetId(pub u32);

/// Type of index buffer indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// 16 bit unsigned integer indices.
    U16,
    /// 32 bit unsigned integer indices.
    U32,
}

/// Region of buffer to buffer copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferCopy {
    /// Offset in source buffer.
    pub src: u64,
    /// Offset in destination buffer.
    pub dst: u64,
    /// Number of bytes to copy.
    pub size: u64,
}

/// Commands for transfer queues.
#[derive(Clone, Debug, PartialEq)]
pub enum TransferCommand {
    /// Copy regions between buffers.
    CopyBuffer {
        /// Source buffer.
        src: BufferId,
        /// Destination buffer.
        dst: BufferId,
        /// Copied regions.
        regions: SmallVec<[BufferCopy; 1]>,
    },

    /// Copy tightly packed buffer data into whole image level.
    CopyBufferToImage {
        /// Source buffer.
        src: BufferId,
        /// Offset of the data in source buffer.
        offset: u64,
        /// Destination image.
        dst: ImageId,
        /// Destination mip level.
        level: u32,
    },

    /// Fill buffer range with repeated word.
    FillBuffer {
        /// Filled buffer.
        buffer: BufferId,
        /// Range of the buffer to fill.
        range: Range<u64>,
        /// Word to fill with.
        data: u32,
    },

    /// Update buffer with inline data.
    UpdateBuffer {
        /// Updated buffer.
        buffer: BufferId,
        /// Offset of the update.
        offset: u64,
        /// Data to write.
        data: Vec<u8>,
    },
}

impl Command for TransferCommand {
    const QUEUE: QueueType = QueueType::Transfer;
}

/// Commands for compute queues.
#[derive(Clone, Debug, PartialEq)]
pub enum ComputeCommand {
    /// Bind compute pipeline.
    BindPipeline(PipelineId),

    /// Bind descriptor sets starting from `first`.
    BindDescriptorSets {
        /// First set index.
        first: u32,
        /// Bound sets.
        sets: SmallVec<[DescriptorSetId; 4]>,
    },

    /// Update push constants.
    PushConstants {
        /// Offset in words.
        offset: u32,
        /// Constants data.
        data: SmallVec<[u32; 16]>,
    },

    /// Dispatch work groups.
    Dispatch {
        /// Group count along X.
        x: u32,
        /// Group count along Y.
        y: u32,
        /// Group count along Z.
        z: u32,
    },

    /// Dispatch with group counts read from buffer.
    DispatchIndirect {
        /// Buffer with group counts.
        buffer: BufferId,
        /// Offset of the counts.
        offset: u64,
    },

    /// Transfer command recorded into compute command buffer.
    Transfer(TransferCommand),
}

impl Command for ComputeCommand {
    const QUEUE: QueueType = QueueType::Compute;
}

/// Commands for graphics queues.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphicsCommand {
    /// Bind graphics pipeline.
    BindPipeline(PipelineId),

    /// Bind descriptor sets starting from `first`.
    BindDescriptorSets {
        /// First set index.
        first: u32,
        /// Bound sets.
        sets: SmallVec<[DescriptorSetId; 4]>,
    },

    /// Bind vertex buffers with offsets starting from `first` binding.
    BindVertexBuffers {
        /// First binding.
        first: u32,
        /// Buffers and offsets.
        buffers: SmallVec<[(BufferId, u64); 8]>,
    },

    /// Bind index buffer.
    BindIndexBuffer {
        /// Index buffer.
        buffer: BufferId,
        /// Offset of the first index.
        offset: u64,
        /// Index type.
        index_type: IndexType,
    },

    /// Update push constants.
    PushConstants {
        /// Offset in words.
        offset: u32,
        /// Constants data.
        data: SmallVec<[u32; 16]>,
    },

    /// Set scissor rectangle `[x, y, width, height]` for viewport `0`.
    SetScissor([u32; 4]),

    /// Draw non-indexed primitives.
    Draw {
        /// Vertex range.
        vertices: Range<u32>,
        /// Instance range.
        instances: Range<u32>,
    },

    /// Draw indexed primitives.
    DrawIndexed {
        /// Index range.
        indices: Range<u32>,
        /// Value added to each index.
        vertex_offset: i32,
        /// Instance range.
        instances: Range<u32>,
    },

    /// Draw with parameters read from buffer.
    DrawIndirect {
        /// Buffer with draw parameters.
        buffer: BufferId,
        /// Offset of the first draw.
        offset: u64,
        /// Number of draws.
        draw_count: u32,
        /// Stride between draws.
        stride: u32,
    },

    /// Compute command recorded into graphics command buffer.
    Compute(ComputeCommand),
}

impl Command for GraphicsCommand {
    const QUEUE: QueueType = QueueType::Graphics;
}

impl From<TransferCommand> for ComputeCommand {
    fn from(command: TransferCommand) -> Self {
        ComputeCommand::Transfer(command)
    }
}

impl From<ComputeCommand> for GraphicsCommand {
    fn from(command: ComputeCommand) -> Self {
        GraphicsCommand::Compute(command)
    }
}

impl From<TransferCommand> for GraphicsCommand {
    fn from(command: TransferCommand) -> Self {
        GraphicsCommand::Compute(command.into())
    }
}
