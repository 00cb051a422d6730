use {
    super::{BlockFlavor, HeapsConfig, HeapsError},
    crate::{
        allocator::*, device::Device, mapping::MemoryMapping, memory::*, utilization::*,
    },
    slab::Slab,
};

#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub(super) struct MemoryType<D: Device> {
    index: u32,
    heap_index: usize,
    properties: Properties,
    config: HeapsConfig,
    blocks: Slab<BuddyBlock<D>>,
    used: u64,
    effective: u64,
}

impl<D> MemoryType<D>
where
    D: Device + Clone,
{
    pub(super) fn new(
        index: u32,
        heap_index: usize,
        properties: Properties,
        config: HeapsConfig,
    ) -> Self {
        if let Some(buddy) = &config.buddy {
            assert!(
                buddy.levels > 0 && buddy.levels <= MAX_LEVELS,
                "Invalid buddy levels {} for memory type {}",
                buddy.levels,
                index
            );
        }
        MemoryType {
            index,
            heap_index,
            properties,
            config,
            blocks: Slab::new(),
            used: 0,
            effective: 0,
        }
    }

    pub(super) fn heap_index(&self) -> usize {
        self.heap_index
    }

    pub(super) fn properties(&self) -> Properties {
        self.properties
    }

    /// Allocate block.
    /// Returns the block and number of bytes of new memory objects created for it.
    pub(super) fn alloc(
        &mut self,
        device: &D,
        requirements: Requirements,
    ) -> Result<(BlockFlavor<D>, u64), HeapsError> {
        let result = match self.config.buddy {
            Some(buddy) if requirements.size <= buddy.block_size => {
                self.alloc_buddy(device, buddy, requirements)
            }
            _ => self.alloc_dedicated(device, requirements.size),
        }?;
        self.used += result.1;
        self.effective += requirements.size;
        Ok(result)
    }

    fn alloc_buddy(
        &mut self,
        device: &D,
        config: BuddyConfig,
        requirements: Requirements,
    ) -> Result<(BlockFlavor<D>, u64), HeapsError> {
        for (index, block) in self.blocks.iter_mut() {
            if let Some(allocation) = block.alloc(requirements) {
                return Ok((
                    BlockFlavor::Buddy {
                        allocation,
                        block: index,
                    },
                    0,
                ));
            }
        }

        let mut block = self.create_block(device, config)?;
        match block.alloc(requirements) {
            Some(allocation) => {
                let index = self.blocks.insert(block);
                Ok((
                    BlockFlavor::Buddy {
                        allocation,
                        block: index,
                    },
                    config.block_size,
                ))
            }
            None => {
                // Offset 0 of a fresh block satisfies any alignment, so this needs a broken config.
                log::debug!(
                    "Request of {} bytes aligned to {} falls back to dedicated memory",
                    requirements.size,
                    requirements.alignment
                );
                unsafe {
                    device.free(block.into_raw());
                }
                self.alloc_dedicated(device, requirements.size)
            }
        }
    }

    fn create_block(&self, device: &D, config: BuddyConfig) -> Result<BuddyBlock<D>, HeapsError> {
        let (memory, mapping) = self.allocate_memory(device, config.block_size)?;
        Ok(BuddyBlock::new(
            memory,
            mapping,
            config.block_size,
            config.levels,
            self.index,
            self.properties,
        ))
    }

    fn alloc_dedicated(
        &mut self,
        device: &D,
        size: u64,
    ) -> Result<(BlockFlavor<D>, u64), HeapsError> {
        let (memory, mapping) = self.allocate_memory(device, size)?;
        let memory = unsafe { Memory::from_raw(memory, size, self.properties) };
        Ok((
            BlockFlavor::Dedicated(DedicatedBlock::new(memory, mapping)),
            size,
        ))
    }

    /// Allocate memory object and map it if possible.
    fn allocate_memory(
        &self,
        device: &D,
        size: u64,
    ) -> Result<(D::Memory, Option<MemoryMapping<D>>), HeapsError> {
        let memory = unsafe { device.allocate(self.index, size) }?;

        if !self.mappable() {
            return Ok((memory, None));
        }

        match unsafe { MemoryMapping::map(device.clone(), memory, size) } {
            Ok(mapping) => Ok((memory, Some(mapping))),
            Err(error) => {
                unsafe {
                    device.free(memory);
                }
                Err(error.into())
            }
        }
    }

    fn mappable(&self) -> bool {
        self.properties.host_visible() && !self.properties.contains(Properties::LAZILY_ALLOCATED)
    }

    /// Free block.
    /// Returns number of bytes of memory objects released.
    pub(super) fn free(&mut self, device: &D, block: BlockFlavor<D>) -> u64 {
        self.effective -= block.size();
        let released = match block {
            BlockFlavor::Dedicated(block) => {
                let memory = block.into_memory();
                let size = memory.size();
                unsafe {
                    device.free(memory.into_raw());
                }
                size
            }
            BlockFlavor::Buddy { allocation, block } => self.free_buddy(device, allocation, block),
        };
        self.used -= released;
        released
    }

    fn free_buddy(
        &mut self,
        device: &D,
        allocation: BuddyAllocation<D::Memory>,
        index: usize,
    ) -> u64 {
        let block = match self.blocks.get_mut(index) {
            Some(block) => block,
            None => {
                log::error!(
                    "Buddy block {} of memory type {} doesn't exist. Allocation leaked: {:?}",
                    index,
                    self.index,
                    allocation
                );
                std::mem::forget(allocation);
                return 0;
            }
        };
        block.free(allocation);

        if !block.is_empty() {
            return 0;
        }
        let empty = self.blocks.iter().filter(|(_, block)| block.is_empty()).count();
        if empty <= self.config.keep_empty {
            return 0;
        }

        let block = self.blocks.remove(index);
        let size = block.size();
        log::debug!("Release empty buddy block {:?} of memory type {}", block.memory(), self.index);
        unsafe {
            device.free(block.into_raw());
        }
        size
    }

    pub(super) fn dispose(self, device: &D) {
        let mut blocks = self.blocks;
        for block in blocks.drain() {
            // Block reports outstanding allocations when dropped.
            unsafe {
                device.free(block.into_raw());
            }
        }
    }

    pub(super) fn utilization(&self) -> MemoryTypeUtilization {
        MemoryTypeUtilization {
            utilization: MemoryUtilization {
                used: self.used,
                effective: self.effective,
            },
            properties: self.properties,
            heap_index: self.heap_index,
            blocks: self.blocks.len(),
        }
    }
}
