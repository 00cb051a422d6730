use {
    crate::error::{AllocationError, MappingError},
    std::{fmt::Debug, ops::Range, ptr::NonNull, sync::Arc},
};

/// Trait for memory allocation and mapping.
///
/// Allocators in this crate never talk to the graphics API directly.
/// Everything they need from the device goes through this trait.
pub trait Device {
    /// Raw memory object handle.
    type Memory: Copy + Debug + PartialEq;

    /// Allocate memory object.
    ///
    /// # Parameters
    /// `memory_type` - memory type index.
    /// `size`        - size of the memory object to allocate.
    ///
    /// # Safety
    ///
    /// `memory_type` must be valid memory type index of the device.
    unsafe fn allocate(&self, memory_type: u32, size: u64) -> Result<Self::Memory, AllocationError>;

    /// Free memory object.
    ///
    /// # Safety
    ///
    /// Memory must be allocated from this device and must not be used afterwards.
    unsafe fn free(&self, memory: Self::Memory);

    /// Map memory range.
    /// Only one range for the given memory object can be mapped.
    ///
    /// # Safety
    ///
    /// Memory must be host-visible and not mapped already.
    unsafe fn map(
        &self,
        memory: Self::Memory,
        range: Range<u64>,
    ) -> Result<NonNull<u8>, MappingError>;

    /// Unmap memory.
    ///
    /// # Safety
    ///
    /// Memory must be mapped. Pointers obtained from the mapping become dangling.
    unsafe fn unmap(&self, memory: Self::Memory);
}

impl<'a, D> Device for &'a D
where
    D: Device + ?Sized,
{
    type Memory = D::Memory;

    unsafe fn allocate(&self, memory_type: u32, size: u64) -> Result<D::Memory, AllocationError> {
        D::allocate(*self, memory_type, size)
    }

    unsafe fn free(&self, memory: D::Memory) {
        D::free(*self, memory)
    }

    unsafe fn map(
        &self,
        memory: D::Memory,
        range: Range<u64>,
    ) -> Result<NonNull<u8>, MappingError> {
        D::map(*self, memory, range)
    }

    unsafe fn unmap(&self, memory: D::Memory) {
        D::unmap(*self, memory)
    }
}

impl<D> Device for Arc<D>
where
    D: Device + ?Sized,
{
    type Memory = D::Memory;

    unsafe fn allocate(&self, memory_type: u32, size: u64) -> Result<D::Memory, AllocationError> {
        D::allocate(self, memory_type, size)
    }

    unsafe fn free(&self, memory: D::Memory) {
        D::free(self, memory)
    }

    unsafe fn map(
        &self,
        memory: D::Memory,
        range: Range<u64>,
    ) -> Result<NonNull<u8>, MappingError> {
        D::map(self, memory, range)
    }

    unsafe fn unmap(&self, memory: D::Memory) {
        D::unmap(self, memory)
    }
}
