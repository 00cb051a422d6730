mod recorder;

use {
    crate::{
        buffer::RawLevel,
        capability::{FamilyId, QueueType},
        command::Command,
        device::Device,
        error::OutOfMemory,
    },
    parking_lot::Mutex,
    std::{collections::HashSet, sync::Arc},
};

/// Command carrying its position in the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Draw(pub usize);

impl Command for Draw {
    const QUEUE: QueueType = QueueType::Graphics;
}

/// Transfer command carrying its position in the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fill(pub usize);

impl Command for Fill {
    const QUEUE: QueueType = QueueType::Transfer;
}

#[derive(Debug)]
pub struct MockPool {
    id: u64,
    buffers: HashSet<u64>,
}

/// Command buffer that stores indices of recorded commands.
#[derive(Debug)]
pub struct MockBuffer {
    pub id: u64,
    pub level: RawLevel,
    pub commands: Vec<usize>,
    pub begun: bool,
    pub finished: bool,
}

#[derive(Debug, Default)]
struct Inner {
    next: u64,
    pools: HashSet<u64>,
    buffers: HashSet<u64>,
    buffer_budget: Option<usize>,
    begin_budget: Option<usize>,
    fail_reset: bool,
    resets: usize,
}

impl Inner {
    fn next(&mut self) -> u64 {
        self.next += 1;
        self.next
    }
}

fn take(budget: &mut Option<usize>) -> Result<(), OutOfMemory> {
    match budget {
        Some(0) => Err(OutOfMemory::Device),
        Some(left) => {
            *left -= 1;
            Ok(())
        }
        None => Ok(()),
    }
}

/// Device that records command indices into host vectors.
/// Panics on misuse of pools and buffers.
#[derive(Clone, Debug, Default)]
pub struct MockDevice {
    inner: Arc<Mutex<Inner>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer that doesn't belong to any pool.
    pub fn raw_buffer(&self, level: RawLevel) -> MockBuffer {
        MockBuffer {
            id: self.inner.lock().next(),
            level,
            commands: Vec::new(),
            begun: false,
            finished: false,
        }
    }

    /// Fail buffer allocations after `count` more succeed.
    pub fn limit_buffers(&self, count: usize) {
        self.inner.lock().buffer_budget = Some(count);
    }

    /// Fail begin after `count` more succeed.
    pub fn fail_begin_after(&self, count: usize) {
        self.inner.lock().begin_budget = Some(count);
    }

    pub fn fail_reset(&self, fail: bool) {
        self.inner.lock().fail_reset = fail;
    }

    pub fn live_pools(&self) -> usize {
        self.inner.lock().pools.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.inner.lock().buffers.len()
    }

    pub fn resets(&self) -> usize {
        self.inner.lock().resets
    }
}

impl Device for MockDevice {
    type CommandPool = MockPool;
    type CommandBuffer = MockBuffer;

    unsafe fn create_pool(&self, _family: FamilyId) -> Result<MockPool, OutOfMemory> {
        let mut inner = self.inner.lock();
        let id = inner.next();
        inner.pools.insert(id);
        Ok(MockPool {
            id,
            buffers: HashSet::new(),
        })
    }

    unsafe fn destroy_pool(&self, pool: MockPool) {
        let mut inner = self.inner.lock();
        assert!(inner.pools.remove(&pool.id), "Unknown pool {:?}", pool);
        for buffer in &pool.buffers {
            inner.buffers.remove(buffer);
        }
    }

    unsafe fn allocate_buffer(
        &self,
        pool: &mut MockPool,
        level: RawLevel,
    ) -> Result<MockBuffer, OutOfMemory> {
        let mut inner = self.inner.lock();
        assert!(inner.pools.contains(&pool.id), "Unknown pool {:?}", pool);
        take(&mut inner.buffer_budget)?;
        let id = inner.next();
        inner.buffers.insert(id);
        pool.buffers.insert(id);
        Ok(MockBuffer {
            id,
            level,
            commands: Vec::new(),
            begun: false,
            finished: false,
        })
    }

    unsafe fn free_buffer(&self, pool: &mut MockPool, buffer: MockBuffer) {
        assert!(
            pool.buffers.remove(&buffer.id),
            "Buffer {} is not from pool {}",
            buffer.id,
            pool.id
        );
        assert!(self.inner.lock().buffers.remove(&buffer.id));
    }

    unsafe fn begin_buffer(
        &self,
        buffer: &mut MockBuffer,
        level: RawLevel,
    ) -> Result<(), OutOfMemory> {
        assert_eq!(buffer.level, level);
        assert!(!buffer.begun, "Buffer {} is begun twice", buffer.id);
        take(&mut self.inner.lock().begin_budget)?;
        buffer.begun = true;
        Ok(())
    }

    unsafe fn finish_buffer(&self, buffer: &mut MockBuffer) -> Result<(), OutOfMemory> {
        assert!(buffer.begun && !buffer.finished, "Buffer {} is not recording", buffer.id);
        buffer.finished = true;
        Ok(())
    }

    unsafe fn reset_buffer(&self, buffer: &mut MockBuffer) -> Result<(), OutOfMemory> {
        let mut inner = self.inner.lock();
        if inner.fail_reset {
            return Err(OutOfMemory::Host);
        }
        inner.resets += 1;
        buffer.commands.clear();
        buffer.begun = false;
        buffer.finished = false;
        Ok(())
    }

    unsafe fn execute_secondaries<'a>(
        &self,
        primary: &mut MockBuffer,
        secondaries: impl IntoIterator<Item = &'a MockBuffer>,
    ) {
        assert_eq!(primary.level, RawLevel::Primary);
        assert!(primary.begun && !primary.finished);
        for secondary in secondaries {
            assert_eq!(secondary.level, RawLevel::Secondary);
            assert!(secondary.finished, "Secondary {} is not finished", secondary.id);
            primary.commands.extend_from_slice(&secondary.commands);
        }
    }
}
