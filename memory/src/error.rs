/// Typical memory error - out of available memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum OutOfMemoryError {
    /// Host memory exhausted.
    #[error("Out of host memory")]
    OutOfHostMemory,

    /// Device memory exhausted.
    #[error("Out of device memory")]
    OutOfDeviceMemory,
}

/// Possible cause of mapping failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    /// Attempt to map memory without host-visible property.
    #[error("Memory is not HOST_VISIBLE and can't be mapped")]
    HostInvisible,

    /// Attempt to access memory out of bounds.
    #[error("Mapping range is out of bound")]
    OutOfBounds,

    /// Unable to allocate an appropriately sized contiguous virtual address range.
    #[error("Virtual memory allocation failed")]
    MappingFailed,

    /// Out of either host or device memory.
    #[error(transparent)]
    OutOfMemoryError(#[from] OutOfMemoryError),

    /// Attempt to interpret mapped range with wrong alignment.
    #[error("Offset {offset} doesn't satisfy alignment requirements {align}")]
    Unaligned {
        /// Alignment requirements.
        align: usize,

        /// Offset that doesn't satisfy alignment.
        offset: usize,
    },
}

/// Possible cause of memory object allocation failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    /// Out of either host or device memory.
    #[error(transparent)]
    OutOfMemoryError(#[from] OutOfMemoryError),

    /// Implementation doesn't allow to create too many objects.
    #[error("Can't allocate more memory objects")]
    TooManyObjects,
}
