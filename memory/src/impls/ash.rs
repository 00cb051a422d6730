use {
    crate::{device::Device, error::*},
    ash::vk,
    std::{ops::Range, ptr::NonNull},
};

impl From<vk::Result> for OutOfMemoryError {
    fn from(result: vk::Result) -> OutOfMemoryError {
        match result {
            vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => OutOfMemoryError::OutOfDeviceMemory,
            vk::Result::ERROR_OUT_OF_HOST_MEMORY => OutOfMemoryError::OutOfHostMemory,
            _ => {
                log::error!("Unexpected memory error: {:?}", result);
                OutOfMemoryError::OutOfHostMemory
            }
        }
    }
}

impl From<vk::Result> for AllocationError {
    fn from(result: vk::Result) -> AllocationError {
        match result {
            vk::Result::ERROR_TOO_MANY_OBJECTS => AllocationError::TooManyObjects,
            _ => OutOfMemoryError::from(result).into(),
        }
    }
}

impl From<vk::Result> for MappingError {
    fn from(result: vk::Result) -> MappingError {
        match result {
            vk::Result::ERROR_MEMORY_MAP_FAILED => MappingError::MappingFailed,
            _ => OutOfMemoryError::from(result).into(),
        }
    }
}

impl Device for ash::Device {
    type Memory = vk::DeviceMemory;

    unsafe fn allocate(
        &self,
        memory_type: u32,
        size: u64,
    ) -> Result<vk::DeviceMemory, AllocationError> {
        let info = vk::MemoryAllocateInfo::default()
            .allocation_size(size)
            .memory_type_index(memory_type);
        Ok(self.allocate_memory(&info, None)?)
    }

    unsafe fn free(&self, memory: vk::DeviceMemory) {
        self.free_memory(memory, None);
    }

    unsafe fn map(
        &self,
        memory: vk::DeviceMemory,
        range: Range<u64>,
    ) -> Result<NonNull<u8>, MappingError> {
        let ptr = self.map_memory(
            memory,
            range.start,
            range.end - range.start,
            vk::MemoryMapFlags::empty(),
        )?;
        NonNull::new(ptr as *mut u8).ok_or(MappingError::MappingFailed)
    }

    unsafe fn unmap(&self, memory: vk::DeviceMemory) {
        self.unmap_memory(memory);
    }
}
