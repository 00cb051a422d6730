//! Error module docs.

use crate::capability::QueueType;

/// Out of memory error returned when command pools or buffers can't be allocated or recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum OutOfMemory {
    /// Host memory exhausted.
    #[error("Out of host memory")]
    Host,

    /// Device memory exhausted.
    #[error("Out of device memory")]
    Device,
}

/// Error that aborts recording of the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// Command pool or command buffer allocation, begin or finish failed.
    #[error(transparent)]
    OutOfMemory(#[from] OutOfMemory),

    /// No queue family was registered for the queue type.
    #[error("No queue family registered for {0:?} queue")]
    NoFamily(QueueType),

    /// Commands can't be recorded for the queue type.
    #[error("{queue:?} queue can't execute {required:?} commands")]
    Unsupported {
        /// Queue type recording was requested for.
        queue: QueueType,
        /// Queue type commands require.
        required: QueueType,
    },
}
