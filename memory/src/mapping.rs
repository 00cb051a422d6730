use {
    crate::{device::Device, error::MappingError, util::fits_usize},
    std::ptr::NonNull,
};

/// Persistent mapping of a whole memory object.
///
/// Memory is mapped once for the lifetime of the mapping and
/// unmapped exactly once, either by [`reset`](#method.reset) or on drop.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct MemoryMapping<D: Device> {
    #[derivative(Debug = "ignore")]
    device: D,
    memory: D::Memory,
    ptr: Option<NonNull<u8>>,
    size: u64,
}

unsafe impl<D> Send for MemoryMapping<D>
where
    D: Device + Send,
    D::Memory: Send,
{
}

unsafe impl<D> Sync for MemoryMapping<D>
where
    D: Device + Sync,
    D::Memory: Sync,
{
}

impl<D> MemoryMapping<D>
where
    D: Device,
{
    /// Map whole memory object.
    ///
    /// # Safety
    ///
    /// * `memory` must be host-visible memory object of `size` bytes allocated from `device`.
    /// * `memory` must not be mapped already.
    pub unsafe fn map(device: D, memory: D::Memory, size: u64) -> Result<Self, MappingError> {
        assert!(fits_usize(size), "Mapping size must fit in usize");
        let ptr = device.map(memory, 0..size)?;
        log::trace!("Mapped {:?} of {} bytes at {:p}", memory, size, ptr);
        Ok(Self::from_raw(device, memory, ptr, size))
    }

    /// Wrap existing mapping.
    ///
    /// # Safety
    ///
    /// `ptr` must point to the beginning of `memory` mapped with `device` for `size` bytes.
    pub unsafe fn from_raw(device: D, memory: D::Memory, ptr: NonNull<u8>, size: u64) -> Self {
        MemoryMapping {
            device,
            memory,
            ptr: Some(ptr),
            size,
        }
    }

    /// Get pointer at `offset` bytes from the beginning of the memory object.
    /// Returns `None` if memory is unmapped or `offset` is out of bounds.
    pub fn get(&self, offset: u64) -> Option<NonNull<u8>> {
        let ptr = self.ptr?;
        if offset >= self.size {
            return None;
        }
        // Offset is within mapped range, and range fits in `usize`.
        Some(unsafe { NonNull::new_unchecked(ptr.as_ptr().add(offset as usize)) })
    }

    /// Pointer to the beginning of the mapping.
    pub fn ptr(&self) -> Option<NonNull<u8>> {
        self.ptr
    }

    /// Size of the mapped range.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Mapped memory object.
    pub fn memory(&self) -> D::Memory {
        self.memory
    }

    /// Check if memory is still mapped.
    pub fn is_mapped(&self) -> bool {
        self.ptr.is_some()
    }

    /// Unmap memory.
    /// Subsequent calls are no-op.
    pub fn reset(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            log::trace!("Unmap {:?} at {:p}", self.memory, ptr);
            unsafe {
                // Pointer was taken, so memory is unmapped exactly once.
                self.device.unmap(self.memory);
            }
        }
    }
}

impl<D> Drop for MemoryMapping<D>
where
    D: Device,
{
    fn drop(&mut self) {
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::test::MockDevice};

    #[test]
    fn unmaps_exactly_once() {
        let device = MockDevice::new();
        let memory = unsafe { device.allocate(0, 256) }.unwrap();

        let mut mapping = unsafe { MemoryMapping::map(device.clone(), memory, 256) }.unwrap();
        assert!(mapping.is_mapped());
        assert_eq!(device.mapped(memory), true);

        mapping.reset();
        mapping.reset();
        assert!(!mapping.is_mapped());
        assert_eq!(mapping.get(0), None);
        drop(mapping);

        assert_eq!(device.unmap_count(memory), 1);
        unsafe { device.free(memory) };
    }

    #[test]
    fn unmaps_on_drop_after_move() {
        let device = MockDevice::new();
        let memory = unsafe { device.allocate(0, 64) }.unwrap();

        let mapping = unsafe { MemoryMapping::map(device.clone(), memory, 64) }.unwrap();
        let moved = mapping;
        let boxed = Box::new(moved);
        assert!(boxed.is_mapped());
        drop(boxed);

        assert_eq!(device.unmap_count(memory), 1);
        unsafe { device.free(memory) };
    }

    #[test]
    fn get_offsets_from_base_pointer() {
        let device = MockDevice::new();
        let memory = unsafe { device.allocate(0, 128) }.unwrap();
        let mapping = unsafe { MemoryMapping::map(device.clone(), memory, 128) }.unwrap();

        let base = mapping.get(0).unwrap().as_ptr() as usize;
        let at = mapping.get(100).unwrap().as_ptr() as usize;
        assert_eq!(at - base, 100);
        assert_eq!(mapping.get(128), None);

        drop(mapping);
        unsafe { device.free(memory) };
    }
}
