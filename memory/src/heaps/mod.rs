mod heap;
mod memory_type;

use {
    self::{heap::MemoryHeap, memory_type::MemoryType},
    crate::{
        allocator::*,
        block::Block,
        device::Device,
        error::*,
        memory::{Properties, Requirements},
        usage::MemoryUsage,
        utilization::*,
    },
    std::{ops::Range, ptr::NonNull},
};

/// Possible errors returned by `Heaps`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HeapsError {
    /// No memory types among required for resource with requested properties was found.
    #[error("Memory type among ({0:#b}) with properties ({1:?}) not found")]
    NoSuitableMemory(u32, Properties),

    /// Memory object allocation failure.
    #[error(transparent)]
    AllocationError(#[from] AllocationError),

    /// Failed to map host-visible memory object.
    #[error(transparent)]
    MappingError(#[from] MappingError),
}

impl From<OutOfMemoryError> for HeapsError {
    fn from(error: OutOfMemoryError) -> Self {
        HeapsError::AllocationError(error.into())
    }
}

/// Config for one memory type of `Heaps`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeapsConfig {
    /// Config for buddy blocks.
    /// Without it every allocation gets dedicated memory object.
    pub buddy: Option<BuddyConfig>,

    /// Number of empty buddy blocks kept alive for reuse.
    pub keep_empty: usize,
}

impl Default for HeapsConfig {
    fn default() -> Self {
        HeapsConfig {
            buddy: Some(BuddyConfig::default()),
            keep_empty: 1,
        }
    }
}

/// Heaps available on particular physical device.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct Heaps<D: Device> {
    types: Vec<MemoryType<D>>,
    heaps: Vec<MemoryHeap>,
}

impl<D> Heaps<D>
where
    D: Device + Clone,
{
    /// Create heaps from memory types and heap sizes fetched from physical device.
    /// `types` yields properties, heap index and config for each memory type.
    pub fn new<P, H>(types: P, heaps: H) -> Self
    where
        P: IntoIterator<Item = (Properties, u32, HeapsConfig)>,
        H: IntoIterator<Item = u64>,
    {
        let heaps = heaps.into_iter().map(MemoryHeap::new).collect::<Vec<_>>();
        let types = types
            .into_iter()
            .enumerate()
            .map(|(index, (properties, heap_index, config))| {
                assert!(
                    (heap_index as usize) < heaps.len(),
                    "Memory type {} refers to missing heap {}",
                    index,
                    heap_index
                );
                log::info!(
                    "Memory type {}: heap: {}, properties: {:?}, config: {:?}",
                    index,
                    heap_index,
                    properties,
                    config
                );
                MemoryType::new(index as u32, heap_index as usize, properties, config)
            })
            .collect::<Vec<_>>();
        assert!(types.len() <= 32, "At most 32 memory types can be addressed by mask");

        Heaps { types, heaps }
    }

    /// Allocate memory block
    /// from one of memory types allowed by `requirements.type_mask`,
    /// for intended `usage`,
    /// with size and alignment from `requirements`.
    pub fn allocate(
        &mut self,
        device: &D,
        requirements: Requirements,
        usage: impl MemoryUsage,
    ) -> Result<MemoryBlock<D>, HeapsError> {
        profile_scope!("allocate");

        let mask = requirements.type_mask;
        let suitable = self
            .types
            .iter()
            .enumerate()
            .filter(|&(index, _)| (mask & (1u32 << index)) != 0)
            .filter(|(_, mt)| mt.properties().contains(usage.properties_required()))
            .filter_map(|(index, mt)| Some((index, mt, usage.memory_fitness(mt.properties())?)))
            .collect::<smallvec::SmallVec<[_; 32]>>();

        if suitable.is_empty() {
            return Err(HeapsError::NoSuitableMemory(
                mask,
                usage.properties_required(),
            ));
        }

        let needed = requirements.size.saturating_add(requirements.alignment);
        let (memory_index, _, _) = suitable
            .into_iter()
            .filter(|(_, mt, _)| self.heaps[mt.heap_index()].available() >= needed)
            .max_by_key(|&(_, _, fitness)| fitness)
            .ok_or(OutOfMemoryError::OutOfDeviceMemory)?;

        self.allocate_from(device, memory_index as u32, requirements)
    }

    /// Allocate memory block from memory type with `memory_index` specified.
    fn allocate_from(
        &mut self,
        device: &D,
        memory_index: u32,
        requirements: Requirements,
    ) -> Result<MemoryBlock<D>, HeapsError> {
        log::trace!(
            "Allocate {} bytes aligned to {} from memory type {}",
            requirements.size,
            requirements.alignment,
            memory_index
        );

        let memory_type = &mut self.types[memory_index as usize];
        let memory_heap = &mut self.heaps[memory_type.heap_index()];

        let (flavor, used) = memory_type.alloc(device, requirements)?;
        memory_heap.allocated(used, requirements.size);

        Ok(MemoryBlock {
            flavor,
            memory_index,
        })
    }

    /// Free memory block.
    ///
    /// Memory block must be allocated from this heaps.
    pub fn free(&mut self, device: &D, block: MemoryBlock<D>) {
        profile_scope!("free");

        let memory_index = block.memory_index;
        let size = block.size();

        let memory_type = &mut self.types[memory_index as usize];
        let memory_heap = &mut self.heaps[memory_type.heap_index()];
        let released = memory_type.free(device, block.flavor);
        memory_heap.freed(released, size);
    }

    /// Dispose of heaps.
    /// Releases all memory objects.
    /// Blocks still allocated are reported and must not be used afterwards.
    pub fn dispose(self, device: &D) {
        for (index, heap) in self.heaps.iter().enumerate() {
            let utilization = heap.utilization().utilization;
            if utilization.effective != 0 {
                log::error!(
                    "Heap {} disposed with {} bytes still allocated",
                    index,
                    utilization.effective
                );
            }
        }
        for mt in self.types {
            mt.dispose(device);
        }
    }

    /// Get memory utilization.
    pub fn utilization(&self) -> TotalMemoryUtilization {
        TotalMemoryUtilization {
            heaps: self.heaps.iter().map(MemoryHeap::utilization).collect(),
            types: self.types.iter().map(MemoryType::utilization).collect(),
        }
    }
}

/// Memory block allocated from `Heaps`.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct MemoryBlock<D: Device> {
    flavor: BlockFlavor<D>,
    memory_index: u32,
}

impl<D> MemoryBlock<D>
where
    D: Device,
{
    /// Get memory type id.
    pub fn memory_type(&self) -> u32 {
        self.memory_index
    }

    /// Check if block owns whole memory object.
    pub fn is_dedicated(&self) -> bool {
        matches!(self.flavor, BlockFlavor::Dedicated(_))
    }
}

#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub(crate) enum BlockFlavor<D: Device> {
    Dedicated(DedicatedBlock<D>),
    Buddy {
        allocation: BuddyAllocation<D::Memory>,
        block: usize,
    },
}

macro_rules! any_block {
    (& $self:ident . $flavor:ident => $block:ident . $($call:tt)*) => {{
        match &$self.$flavor {
            BlockFlavor::Dedicated($block) => $block.$($call)*,
            BlockFlavor::Buddy {
                allocation: $block,
                ..
            } => $block.$($call)*,
        }
    }};
}

impl<D> BlockFlavor<D>
where
    D: Device,
{
    fn size(&self) -> u64 {
        match self {
            BlockFlavor::Dedicated(block) => block.size(),
            BlockFlavor::Buddy { allocation, .. } => allocation.size(),
        }
    }
}

impl<D> Block<D::Memory> for MemoryBlock<D>
where
    D: Device,
{
    #[inline]
    fn properties(&self) -> Properties {
        any_block!(&self.flavor => block.properties())
    }

    #[inline]
    fn memory(&self) -> D::Memory {
        any_block!(&self.flavor => block.memory())
    }

    #[inline]
    fn range(&self) -> Range<u64> {
        any_block!(&self.flavor => block.range())
    }

    #[inline]
    fn ptr(&self) -> Option<NonNull<u8>> {
        any_block!(&self.flavor => block.ptr())
    }
}
