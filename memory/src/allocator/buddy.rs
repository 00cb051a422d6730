use {
    crate::{
        block::Block,
        device::Device,
        mapping::MemoryMapping,
        memory::{Properties, Requirements},
        util::aligned,
    },
    hibitset::BitSet,
    std::{ops::Range, ptr::NonNull},
};

/// Maximum number of levels in the buddy tree.
/// Bounded by the capacity of the node bitset on 32-bit targets.
pub const MAX_LEVELS: u32 = 20;

/// Config for `BuddyBlock`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuddyConfig {
    /// Size of memory objects to allocate from the device.
    /// Must be multiple of `2 ^ (levels - 1)`.
    pub block_size: u64,

    /// Number of levels in the tree.
    /// Nodes on the last level are the smallest unit of allocation.
    pub levels: u32,
}

impl BuddyConfig {
    /// Size of the smallest allocation unit.
    pub fn leaf_size(&self) -> u64 {
        self.block_size >> (self.levels - 1)
    }
}

impl Default for BuddyConfig {
    fn default() -> Self {
        BuddyConfig {
            block_size: 64 * 1024 * 1024,
            levels: 14,
        }
    }
}

/// Memory range allocated from `BuddyBlock`.
/// Must be returned to the same block with `BuddyBlock::free`.
#[derive(derivative::Derivative)]
#[derivative(Debug)]
pub struct BuddyAllocation<M> {
    memory: M,
    offset: u64,
    size: u64,
    node: u32,
    memory_type: u32,
    properties: Properties,
    ptr: Option<NonNull<u8>>,
    #[derivative(Debug = "ignore")]
    relevant: relevant::Relevant,
}

unsafe impl<M> Send for BuddyAllocation<M> where M: Send {}
unsafe impl<M> Sync for BuddyAllocation<M> where M: Sync {}

impl<M> BuddyAllocation<M>
where
    M: Copy,
{
    /// Offset of the allocation within memory object.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Index of the tree node claimed by this allocation.
    pub fn node(&self) -> u32 {
        self.node
    }

    /// Index of memory type the allocation belongs to.
    pub fn memory_type(&self) -> u32 {
        self.memory_type
    }

    fn dispose(self) {
        self.relevant.dispose();
    }
}

impl<M> Block<M> for BuddyAllocation<M>
where
    M: Copy,
{
    #[inline]
    fn properties(&self) -> Properties {
        self.properties
    }

    #[inline]
    fn memory(&self) -> M {
        self.memory
    }

    #[inline]
    fn range(&self) -> Range<u64> {
        self.offset..self.offset + self.size
    }

    #[inline]
    fn ptr(&self) -> Option<NonNull<u8>> {
        self.ptr
    }
}

/// One memory object managed as a binary buddy tree.
///
/// Tree is stored implicitly in level order: node `0` spans the whole block,
/// children of node `i` are `2i + 1` and `2i + 2`.
/// A node is marked when it, any of its ancestors or any of its descendants is allocated.
/// So single bit answers whether node's range is available.
///
/// Block performs no synchronization. Calls to `alloc` and `free` must be serialized by the owner.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct BuddyBlock<D: Device> {
    memory: D::Memory,
    mapping: Option<MemoryMapping<D>>,
    size: u64,
    levels: u32,
    memory_type: u32,
    properties: Properties,
    #[derivative(Debug = "ignore")]
    nodes: BitSet,
    allocated: u64,
    count: usize,
}

impl<D> BuddyBlock<D>
where
    D: Device,
{
    /// Wrap memory object of `size` bytes.
    /// `mapping` should be provided for host-visible memory.
    ///
    /// # Panics
    ///
    /// If `levels` is zero or exceeds `MAX_LEVELS`
    /// or `size` is not a non-zero multiple of `2 ^ (levels - 1)`.
    pub fn new(
        memory: D::Memory,
        mapping: Option<MemoryMapping<D>>,
        size: u64,
        levels: u32,
        memory_type: u32,
        properties: Properties,
    ) -> Self {
        assert!(
            levels > 0 && levels <= MAX_LEVELS,
            "Buddy tree must have from 1 to {} levels",
            MAX_LEVELS
        );
        assert!(
            size > 0 && size % (1u64 << (levels - 1)) == 0,
            "Block size {} must be multiple of leaf count {}",
            size,
            1u64 << (levels - 1)
        );
        if let Some(mapping) = &mapping {
            assert_eq!(mapping.memory(), memory, "Mapping of another memory object");
            assert!(mapping.size() >= size, "Mapping must cover whole block");
        }

        log::debug!(
            "Create buddy block: memory: {:?}, size: {}, levels: {}, type: {}, properties: {:?}",
            memory,
            size,
            levels,
            memory_type,
            properties,
        );

        BuddyBlock {
            memory,
            mapping,
            size,
            levels,
            memory_type,
            properties,
            nodes: BitSet::with_capacity(node_count(levels)),
            allocated: 0,
            count: 0,
        }
    }

    /// Raw memory object.
    pub fn memory(&self) -> D::Memory {
        self.memory
    }

    /// Size of the block.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of levels in the tree.
    pub fn levels(&self) -> u32 {
        self.levels
    }

    /// Memory type index of the block.
    pub fn memory_type(&self) -> u32 {
        self.memory_type
    }

    /// Memory properties of the block.
    pub fn properties(&self) -> Properties {
        self.properties
    }

    /// Bytes of the block claimed by live allocations,
    /// including padding up to node size.
    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    /// Number of live allocations.
    pub fn allocation_count(&self) -> usize {
        self.count
    }

    /// Check if there are no live allocations.
    pub fn is_empty(&self) -> bool {
        debug_assert_eq!(self.nodes.contains(0), self.count != 0);
        !self.nodes.contains(0)
    }

    /// Allocate `requirements.size` bytes with offset aligned to `requirements.alignment`.
    /// Type mask is not checked, block memory type is chosen by the caller.
    /// Returns `None` if no free node can fit the request.
    pub fn alloc(&mut self, requirements: Requirements) -> Option<BuddyAllocation<D::Memory>> {
        let size = requirements.size;
        let align = requirements.alignment.max(1);
        assert!(align.is_power_of_two(), "Alignment must be power of two");

        if size == 0 || size > self.size {
            log::trace!("Request of {} bytes can't be served by block of {}", size, self.size);
            return None;
        }

        let mut level = self.level_for_size(size);
        loop {
            if let Some((node, offset)) = self.find_free(level, size, align) {
                return Some(self.claim(node, offset, size));
            }
            if level == 0 {
                log::trace!(
                    "Block {:?} exhausted for request: size: {}, align: {}",
                    self.memory,
                    size,
                    align
                );
                return None;
            }
            // Alignment padding may fit into bigger node.
            level -= 1;
        }
    }

    /// Return allocation to the block.
    /// Allocation must be made from this block.
    pub fn free(&mut self, allocation: BuddyAllocation<D::Memory>) {
        if allocation.memory != self.memory {
            log::error!(
                "Allocation {:?} belongs to another block {:?}",
                allocation,
                self.memory
            );
            allocation.dispose();
            return;
        }

        let node = allocation.node;
        if !self.nodes.contains(node) {
            log::error!("Node {} is not allocated. Double free?", node);
            allocation.dispose();
            return;
        }

        log::trace!(
            "Free node {} at {}..{} of {:?}",
            node,
            allocation.offset,
            allocation.offset + allocation.size,
            self.memory
        );

        self.unmark_up(node);
        self.unmark_down(node);
        self.allocated -= self.node_size(level_of(node));
        self.count -= 1;
        allocation.dispose();
    }

    /// Release the block, unmapping memory if mapped.
    /// Returns raw memory object which should be freed by the caller.
    pub fn into_raw(mut self) -> D::Memory {
        if let Some(mut mapping) = self.mapping.take() {
            mapping.reset();
        }
        self.memory
    }

    fn node_size(&self, level: u32) -> u64 {
        self.size >> level
    }

    fn node_range(&self, node: u32) -> Range<u64> {
        let level = level_of(node);
        let node_size = self.node_size(level);
        let start = node_size * u64::from(node + 1 - (1 << level));
        start..start + node_size
    }

    /// Deepest level with nodes big enough for `size`.
    fn level_for_size(&self, size: u64) -> u32 {
        let mut level = self.levels - 1;
        while self.node_size(level) < size {
            level -= 1;
        }
        level
    }

    /// Find leftmost free node on `level` that fits `size` bytes after aligning its start.
    fn find_free(&self, level: u32, size: u64, align: u64) -> Option<(u32, u64)> {
        let first = (1u32 << level) - 1;
        let last = (1u32 << (level + 1)) - 1;
        (first..last)
            .filter(|&node| !self.nodes.contains(node))
            .find_map(|node| {
                let range = self.node_range(node);
                let offset = aligned(range.start, align);
                if offset.checked_add(size)? <= range.end {
                    Some((node, offset))
                } else {
                    None
                }
            })
    }

    fn claim(&mut self, node: u32, offset: u64, size: u64) -> BuddyAllocation<D::Memory> {
        self.mark_up(node);
        self.mark_down(node);
        self.allocated += self.node_size(level_of(node));
        self.count += 1;

        log::trace!(
            "Allocate node {} at {}..{} of {:?}",
            node,
            offset,
            offset + size,
            self.memory
        );

        BuddyAllocation {
            memory: self.memory,
            offset,
            size,
            node,
            memory_type: self.memory_type,
            properties: self.properties,
            ptr: self.mapping.as_ref().and_then(|mapping| mapping.get(offset)),
            relevant: relevant::Relevant,
        }
    }

    /// Mark node and its ancestors.
    /// Stops at first ancestor already marked as everything above it is marked too.
    fn mark_up(&mut self, mut node: u32) {
        loop {
            if self.nodes.add(node) || node == 0 {
                break;
            }
            node = parent(node);
        }
    }

    /// Unmark node and ancestors that no longer have marked descendants.
    fn unmark_up(&mut self, mut node: u32) {
        self.nodes.remove(node);
        while node != 0 {
            if self.nodes.contains(sibling(node)) {
                break;
            }
            node = parent(node);
            self.nodes.remove(node);
        }
    }

    fn mark_down(&mut self, node: u32) {
        for range in self.descendants(node) {
            for child in range {
                self.nodes.add(child);
            }
        }
    }

    fn unmark_down(&mut self, node: u32) {
        for range in self.descendants(node) {
            for child in range {
                self.nodes.remove(child);
            }
        }
    }

    /// Ranges of descendant node indices, one per level below `node`.
    fn descendants(&self, node: u32) -> impl Iterator<Item = Range<u32>> {
        let count = node_count(self.levels);
        let mut first = 2 * node + 1;
        let mut width = 2;
        std::iter::from_fn(move || {
            if first >= count {
                return None;
            }
            let range = first..first + width;
            first = 2 * first + 1;
            width *= 2;
            Some(range)
        })
    }
}

impl<D> Drop for BuddyBlock<D>
where
    D: Device,
{
    fn drop(&mut self) {
        if self.count != 0 {
            log::error!(
                "Buddy block {:?} destroyed with {} outstanding allocations ({} bytes)",
                self.memory,
                self.count,
                self.allocated
            );
        }
    }
}

fn node_count(levels: u32) -> u32 {
    (1u32 << levels) - 1
}

fn level_of(node: u32) -> u32 {
    31 - (node + 1).leading_zeros()
}

fn parent(node: u32) -> u32 {
    debug_assert_ne!(node, 0);
    (node - 1) / 2
}

fn sibling(node: u32) -> u32 {
    debug_assert_ne!(node, 0);
    if node % 2 == 1 {
        node + 1
    } else {
        node - 1
    }
}
