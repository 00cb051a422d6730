bitflags::bitflags! {
    /// Memory property flags.
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Properties: u32 {
        /// Device local memory on the GPU.
        const DEVICE_LOCAL   = 0x1;

        /// Host visible memory can be accessed by the CPU.
        ///
        /// Backends must provide at least one cpu visible memory.
        const HOST_VISIBLE    = 0x2;

        /// CPU-GPU coherent.
        ///
        /// Non-coherent memory requires explicit flushing.
        const HOST_COHERENT       = 0x4;

        /// Cached memory by the CPU
        const HOST_CACHED     = 0x8;

        /// Memory may be allocated lazily and must not be mapped.
        const LAZILY_ALLOCATED = 0x10;
    }
}

impl Properties {
    /// Check if memory with these properties can be mapped.
    pub fn host_visible(&self) -> bool {
        self.contains(Properties::HOST_VISIBLE)
    }

    /// Check if memory with these properties is host-coherent
    /// and doesn't require invalidating or flushing.
    pub fn host_coherent(&self) -> bool {
        self.contains(Properties::HOST_COHERENT)
    }
}

/// Size and alignment requirements of a resource.
/// Typically fetched from the device for a buffer or an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Requirements {
    /// Number of bytes the resource occupies.
    pub size: u64,

    /// Required alignment of the resource offset. Power of two.
    pub alignment: u64,

    /// Bitmask of memory types the resource can be bound to.
    pub type_mask: u32,
}

impl Requirements {
    /// Requirements that can be satisfied by any memory type.
    pub fn new(size: u64, alignment: u64) -> Self {
        Requirements {
            size,
            alignment,
            type_mask: !0,
        }
    }
}

/// Memory object wrapper.
/// Contains size and properties of the memory.
#[derive(derivative::Derivative)]
#[derivative(Debug)]
pub struct Memory<M> {
    raw: M,
    size: u64,
    properties: Properties,
    #[derivative(Debug = "ignore")]
    relevant: relevant::Relevant,
}

impl<M> Memory<M>
where
    M: Copy,
{
    /// Get memory properties.
    pub fn properties(&self) -> Properties {
        self.properties
    }

    /// Get memory size.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Get raw memory.
    pub fn raw(&self) -> M {
        self.raw
    }

    /// Unwrap raw memory.
    pub fn into_raw(self) -> M {
        self.relevant.dispose();
        self.raw
    }

    /// Create memory from raw object.
    ///
    /// # Safety
    ///
    /// `raw` must be a memory object of `size` bytes
    /// allocated from memory type with `properties`.
    pub unsafe fn from_raw(raw: M, size: u64, properties: Properties) -> Self {
        Memory {
            properties,
            raw,
            size,
            relevant: relevant::Relevant,
        }
    }

    /// Check if this memory is host-visible and can be mapped.
    /// `memory.host_visible()` is equivalent to
    /// `memory.properties().contains(Properties::HOST_VISIBLE)`
    pub fn host_visible(&self) -> bool {
        self.properties.host_visible()
    }

    /// Check if this memory is host-coherent and doesn't require invalidating or flushing.
    pub fn host_coherent(&self) -> bool {
        self.properties.host_coherent()
    }
}
