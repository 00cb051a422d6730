
use {
    crate::{device::Device, error::*},
    parking_lot::Mutex,
    std::{collections::HashMap, ops::Range, ptr::NonNull, sync::Arc},
};

/// Memory object of `MockDevice`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MockMemory(pub u64);

#[derive(Debug)]
struct MockAllocation {
    memory_type: u32,
    size: u64,
    // `u64` words keep mapped pointers aligned for any plain data.
    data: Option<Box<[u64]>>,
    mapped: bool,
    unmaps: usize,
}

#[derive(Debug, Default)]
struct Inner {
    next: u64,
    live: HashMap<MockMemory, MockAllocation>,
    allocation_budget: Option<usize>,
    fail_map: bool,
}

/// Device that hands out host buffers instead of GPU memory.
/// Panics on double free and unbalanced map/unmap.
#[derive(Clone, Debug, Default)]
pub struct MockDevice {
    inner: Arc<Mutex<Inner>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail allocations after `count` more succeed.
    pub fn limit_allocations(&self, count: usize) {
        self.inner.lock().allocation_budget = Some(count);
    }

    /// Make subsequent `map` calls fail.
    pub fn fail_map(&self, fail: bool) {
        self.inner.lock().fail_map = fail;
    }

    /// Number of memory objects alive.
    pub fn live(&self) -> usize {
        self.inner.lock().live.len()
    }

    /// Sizes of live memory objects of `memory_type`.
    pub fn live_sizes(&self, memory_type: u32) -> Vec<u64> {
        let mut sizes = self
            .inner
            .lock()
            .live
            .values()
            .filter(|allocation| allocation.memory_type == memory_type)
            .map(|allocation| allocation.size)
            .collect::<Vec<_>>();
        sizes.sort_unstable();
        sizes
    }

    pub fn mapped(&self, memory: MockMemory) -> bool {
        self.inner.lock().live[&memory].mapped
    }

    pub fn unmap_count(&self, memory: MockMemory) -> usize {
        self.inner.lock().live[&memory].unmaps
    }

    /// Read word written through a mapping.
    pub fn read_u32(&self, memory: MockMemory, offset: u64) -> u32 {
        let inner = self.inner.lock();
        let data = inner.live[&memory]
            .data
            .as_ref()
            .expect("Memory was never mapped");
        let bytes =
            unsafe { std::slice::from_raw_parts(data.as_ptr() as *const u8, data.len() * 8) };
        let offset = offset as usize;
        let mut word = [0u8; 4];
        word.copy_from_slice(&bytes[offset..offset + 4]);
        u32::from_ne_bytes(word)
    }
}

impl Device for MockDevice {
    type Memory = MockMemory;

    unsafe fn allocate(&self, memory_type: u32, size: u64) -> Result<MockMemory, AllocationError> {
        let mut inner = self.inner.lock();
        if let Some(budget) = &mut inner.allocation_budget {
            if *budget == 0 {
                return Err(OutOfMemoryError::OutOfDeviceMemory.into());
            }
            *budget -= 1;
        }
        inner.next += 1;
        let memory = MockMemory(inner.next);
        inner.live.insert(
            memory,
            MockAllocation {
                memory_type,
                size,
                data: None,
                mapped: false,
                unmaps: 0,
            },
        );
        Ok(memory)
    }

    unsafe fn free(&self, memory: MockMemory) {
        let allocation = self
            .inner
            .lock()
            .live
            .remove(&memory)
            .unwrap_or_else(|| panic!("Double free of {:?}", memory));
        assert!(!allocation.mapped, "{:?} freed while mapped", memory);
    }

    unsafe fn map(
        &self,
        memory: MockMemory,
        range: Range<u64>,
    ) -> Result<NonNull<u8>, MappingError> {
        let mut inner = self.inner.lock();
        if inner.fail_map {
            return Err(MappingError::MappingFailed);
        }
        let allocation = inner.live.get_mut(&memory).expect("Map of unknown memory");
        assert!(!allocation.mapped, "{:?} is mapped twice", memory);
        assert!(range.end <= allocation.size);

        let words = ((allocation.size + 7) / 8) as usize;
        let data = allocation
            .data
            .get_or_insert_with(|| vec![0u64; words].into_boxed_slice());
        allocation.mapped = true;
        let base = data.as_mut_ptr() as *mut u8;
        Ok(NonNull::new_unchecked(base.add(range.start as usize)))
    }

    unsafe fn unmap(&self, memory: MockMemory) {
        let mut inner = self.inner.lock();
        let allocation = inner.live.get_mut(&memory).expect("Unmap of unknown memory");
        assert!(allocation.mapped, "{:?} is not mapped", memory);
        allocation.mapped = false;
        allocation.unmaps += 1;
    }
}
