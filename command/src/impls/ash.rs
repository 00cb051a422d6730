use {
    crate::{buffer::RawLevel, capability::FamilyId, device::Device, error::OutOfMemory},
    ash::vk,
    smallvec::SmallVec,
};

impl From<vk::Result> for OutOfMemory {
    fn from(result: vk::Result) -> OutOfMemory {
        match result {
            vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => OutOfMemory::Device,
            vk::Result::ERROR_OUT_OF_HOST_MEMORY => OutOfMemory::Host,
            _ => {
                log::error!("Unexpected command buffer error: {:?}", result);
                OutOfMemory::Host
            }
        }
    }
}

fn level(level: RawLevel) -> vk::CommandBufferLevel {
    match level {
        RawLevel::Primary => vk::CommandBufferLevel::PRIMARY,
        RawLevel::Secondary => vk::CommandBufferLevel::SECONDARY,
    }
}

impl Device for ash::Device {
    type CommandPool = vk::CommandPool;
    type CommandBuffer = vk::CommandBuffer;

    unsafe fn create_pool(&self, family: FamilyId) -> Result<vk::CommandPool, OutOfMemory> {
        let info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(family.index);
        Ok(self.create_command_pool(&info, None)?)
    }

    unsafe fn destroy_pool(&self, pool: vk::CommandPool) {
        self.destroy_command_pool(pool, None);
    }

    unsafe fn allocate_buffer(
        &self,
        pool: &mut vk::CommandPool,
        raw_level: RawLevel,
    ) -> Result<vk::CommandBuffer, OutOfMemory> {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(level(raw_level))
            .command_buffer_count(1);
        let buffers = self.allocate_command_buffers(&info)?;
        buffers
            .into_iter()
            .next()
            .ok_or(OutOfMemory::Host)
    }

    unsafe fn free_buffer(&self, pool: &mut vk::CommandPool, buffer: vk::CommandBuffer) {
        self.free_command_buffers(*pool, &[buffer]);
    }

    unsafe fn begin_buffer(
        &self,
        buffer: &mut vk::CommandBuffer,
        raw_level: RawLevel,
    ) -> Result<(), OutOfMemory> {
        let inheritance = vk::CommandBufferInheritanceInfo::default();
        let info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        let info = match raw_level {
            RawLevel::Primary => info,
            RawLevel::Secondary => info.inheritance_info(&inheritance),
        };
        Ok(self.begin_command_buffer(*buffer, &info)?)
    }

    unsafe fn finish_buffer(&self, buffer: &mut vk::CommandBuffer) -> Result<(), OutOfMemory> {
        Ok(self.end_command_buffer(*buffer)?)
    }

    unsafe fn reset_buffer(&self, buffer: &mut vk::CommandBuffer) -> Result<(), OutOfMemory> {
        Ok(self.reset_command_buffer(*buffer, vk::CommandBufferResetFlags::empty())?)
    }

    unsafe fn execute_secondaries<'a>(
        &self,
        primary: &mut vk::CommandBuffer,
        secondaries: impl IntoIterator<Item = &'a vk::CommandBuffer>,
    ) {
        let secondaries = secondaries.into_iter().copied().collect::<SmallVec<[_; 16]>>();
        if !secondaries.is_empty() {
            self.cmd_execute_commands(*primary, &secondaries);
        }
    }
}
