use {
    crate::{block::Block, device::Device, mapping::MemoryMapping, memory::*},
    std::{ops::Range, ptr::NonNull},
};

/// Memory block that owns whole memory object.
///
/// Used for requests too big for buddy blocks.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct DedicatedBlock<D: Device> {
    memory: Memory<D::Memory>,
    mapping: Option<MemoryMapping<D>>,
}

unsafe impl<D> Send for DedicatedBlock<D>
where
    D: Device + Send,
    D::Memory: Send,
{
}

unsafe impl<D> Sync for DedicatedBlock<D>
where
    D: Device + Sync,
    D::Memory: Sync,
{
}

impl<D> DedicatedBlock<D>
where
    D: Device,
{
    /// Make block from memory object and optional mapping of it.
    pub fn new(memory: Memory<D::Memory>, mapping: Option<MemoryMapping<D>>) -> Self {
        debug_assert!(mapping
            .as_ref()
            .map_or(true, |mapping| mapping.memory() == memory.raw()));
        DedicatedBlock { memory, mapping }
    }

    /// Unmap memory if mapped and unwrap memory object.
    pub fn into_memory(mut self) -> Memory<D::Memory> {
        if let Some(mut mapping) = self.mapping.take() {
            mapping.reset();
        }
        self.memory
    }
}

impl<D> Block<D::Memory> for DedicatedBlock<D>
where
    D: Device,
{
    #[inline]
    fn properties(&self) -> Properties {
        self.memory.properties()
    }

    #[inline]
    fn memory(&self) -> D::Memory {
        self.memory.raw()
    }

    #[inline]
    fn range(&self) -> Range<u64> {
        0..self.memory.size()
    }

    #[inline]
    fn ptr(&self) -> Option<NonNull<u8>> {
        self.mapping.as_ref().and_then(MemoryMapping::ptr)
    }
}
