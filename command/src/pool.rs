//! CommandPool module docs.

use {
    crate::{
        buffer::{CommandBuffer, InitialState, Level, RawLevel, Resettable},
        capability::{FamilyId, QueueType},
        device::Device,
        error::{OutOfMemory, RecordError},
    },
    parking_lot::Mutex,
    std::sync::Arc,
};

/// Native command pool with free lists of reset command buffers.
///
/// Every pool is used by at most one thread at a time,
/// so buffers are recycled without synchronization.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct CommandPool<D: Device> {
    raw: D::CommandPool,
    queue: QueueType,
    family: FamilyId,
    slot: usize,
    primary: Vec<D::CommandBuffer>,
    secondary: Vec<D::CommandBuffer>,
    allocated: usize,
    #[derivative(Debug = "ignore")]
    relevant: relevant::Relevant,
}

impl<D> CommandPool<D>
where
    D: Device,
{
    /// Create command pool for the family.
    ///
    /// # Safety
    ///
    /// `family` must belong to `device` and support `queue` commands.
    pub(crate) unsafe fn create(
        device: &D,
        queue: QueueType,
        family: FamilyId,
        slot: usize,
    ) -> Result<Self, OutOfMemory> {
        let raw = device.create_pool(family)?;
        Ok(CommandPool {
            raw,
            queue,
            family,
            slot,
            primary: Vec::new(),
            secondary: Vec::new(),
            allocated: 0,
            relevant: relevant::Relevant,
        })
    }

    /// Queue type of the buffers from this pool.
    pub fn queue(&self) -> QueueType {
        self.queue
    }

    /// Family of the pool.
    pub fn family(&self) -> FamilyId {
        self.family
    }

    /// Index of the pool among pools of its queue type.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Number of buffers allocated from the native pool.
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Number of reset buffers waiting for reuse.
    pub fn free(&self) -> usize {
        self.primary.len() + self.secondary.len()
    }

    /// Number of buffers acquired and not yet released.
    pub fn outstanding(&self) -> usize {
        self.allocated - self.free()
    }

    fn free_list(&mut self, level: RawLevel) -> &mut Vec<D::CommandBuffer> {
        match level {
            RawLevel::Primary => &mut self.primary,
            RawLevel::Secondary => &mut self.secondary,
        }
    }

    /// Get buffer in initial state.
    /// Reuses reset buffer if there is one.
    ///
    /// # Safety
    ///
    /// `device` must be the one the pool was created with.
    pub(crate) unsafe fn acquire<L: Level>(
        &mut self,
        device: &D,
    ) -> Result<CommandBuffer<D, InitialState, L>, OutOfMemory> {
        let level = L::default();
        let raw_level = level.raw_level();
        let raw = match self.free_list(raw_level).pop() {
            Some(raw) => raw,
            None => {
                let raw = device.allocate_buffer(&mut self.raw, raw_level)?;
                self.allocated += 1;
                log::trace!(
                    "Allocated {:?} buffer #{} for {:?} slot {}",
                    raw_level,
                    self.allocated,
                    self.queue,
                    self.slot
                );
                raw
            }
        };

        Ok(CommandBuffer::from_raw(
            raw,
            InitialState,
            level,
            self.queue,
            self.slot,
            self.family,
        ))
    }

    /// Reset buffer and put it into free list.
    /// Buffer that fails to reset is freed.
    ///
    /// # Safety
    ///
    /// `device` must be the one the pool was created with.
    /// Buffer must be acquired from this pool and not pending execution.
    pub(crate) unsafe fn release<S, L>(&mut self, device: &D, buffer: CommandBuffer<D, S, L>)
    where
        S: Resettable,
        L: Level,
    {
        assert_eq!(
            (buffer.queue(), buffer.slot()),
            (self.queue, self.slot),
            "Buffer must be released to the pool it was acquired from"
        );

        let level = buffer.level().raw_level();
        let mut raw = buffer.into_raw();
        match device.reset_buffer(&mut raw) {
            Ok(()) => self.free_list(level).push(raw),
            Err(error) => {
                log::warn!("Failed to reset command buffer: {}. Freeing", error);
                device.free_buffer(&mut self.raw, raw);
                self.allocated -= 1;
            }
        }
    }

    /// Free all buffers and destroy native pool.
    ///
    /// # Safety
    ///
    /// `device` must be the one the pool was created with.
    /// No buffers from the pool may be pending execution.
    pub(crate) unsafe fn dispose(mut self, device: &D) {
        if self.outstanding() > 0 {
            log::warn!(
                "{} buffers from {:?} slot {} were not released before pool is disposed",
                self.outstanding(),
                self.queue,
                self.slot
            );
        }

        for raw in self.primary.drain(..).chain(self.secondary.drain(..)) {
            device.free_buffer(&mut self.raw, raw);
        }
        device.destroy_pool(self.raw);
        self.relevant.dispose();
    }
}

#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
struct QueuePools<D: Device> {
    queue: QueueType,
    family: FamilyId,
    slots: Mutex<Vec<Arc<Mutex<CommandPool<D>>>>>,
}

/// Command pools of all queue types registered for the device.
///
/// Every queue type gets a growing list of pools, one per shard index,
/// so shards recorded in parallel never contend for the same pool.
/// Pools are created on demand by `reserve`.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct CommandPools<D: Device> {
    #[derivative(Debug = "ignore")]
    device: D,
    queues: Vec<QueuePools<D>>,
    #[derivative(Debug = "ignore")]
    relevant: relevant::Relevant,
}

impl<D> CommandPools<D>
where
    D: Device,
{
    /// Create pools for `device`.
    /// `families` tells which family records buffers of each queue type.
    pub fn new(device: D, families: impl IntoIterator<Item = (QueueType, FamilyId)>) -> Self {
        let mut queues: Vec<QueuePools<D>> = Vec::new();
        for (queue, family) in families {
            if queues.iter().any(|pools| pools.queue == queue) {
                log::warn!(
                    "Family for {:?} queue is already registered. Ignoring {:?}",
                    queue,
                    family
                );
                continue;
            }
            log::debug!("{:?} queue uses {:?}", queue, family);
            queues.push(QueuePools {
                queue,
                family,
                slots: Mutex::new(Vec::new()),
            });
        }

        CommandPools {
            device,
            queues,
            relevant: relevant::Relevant,
        }
    }

    /// Get device pools belong to.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Get family registered for the queue type.
    pub fn family(&self, queue: QueueType) -> Option<FamilyId> {
        self.queue(queue).map(|pools| pools.family)
    }

    fn queue(&self, queue: QueueType) -> Option<&QueuePools<D>> {
        self.queues.iter().find(|pools| pools.queue == queue)
    }

    /// Make sure `queue` has at least `count` pools.
    pub fn reserve(&self, queue: QueueType, count: usize) -> Result<(), RecordError> {
        let pools = self.queue(queue).ok_or(RecordError::NoFamily(queue))?;
        let mut slots = pools.slots.lock();
        while slots.len() < count {
            let slot = slots.len();
            // Family was registered for this queue type.
            let pool = unsafe { CommandPool::create(&self.device, queue, pools.family, slot)? };
            log::debug!("Created command pool for {:?} slot {}", queue, slot);
            slots.push(Arc::new(Mutex::new(pool)));
        }
        Ok(())
    }

    /// Get pool at `index` for the queue type.
    pub(crate) fn slot(
        &self,
        queue: QueueType,
        index: usize,
    ) -> Option<Arc<Mutex<CommandPool<D>>>> {
        self.queue(queue)?.slots.lock().get(index).cloned()
    }

    /// Number of pools created for the queue type.
    pub fn slot_count(&self, queue: QueueType) -> usize {
        self.queue(queue).map_or(0, |pools| pools.slots.lock().len())
    }

    /// Number of buffers of the queue type acquired and not yet released.
    pub fn outstanding(&self, queue: QueueType) -> usize {
        self.queue(queue).map_or(0, |pools| {
            pools.slots.lock().iter().map(|pool| pool.lock().outstanding()).sum()
        })
    }

    /// Number of buffers of the queue type allocated from native pools.
    pub fn allocated(&self, queue: QueueType) -> usize {
        self.queue(queue).map_or(0, |pools| {
            pools.slots.lock().iter().map(|pool| pool.lock().allocated()).sum()
        })
    }

    /// Get buffer in initial state from the pool at `slot`.
    pub(crate) fn acquire<L: Level>(
        &self,
        queue: QueueType,
        slot: usize,
    ) -> Result<CommandBuffer<D, InitialState, L>, RecordError> {
        self.reserve(queue, slot + 1)?;
        let pool = self.slot(queue, slot).ok_or(RecordError::NoFamily(queue))?;
        let mut pool = pool.lock();
        // Pool was created with `self.device`.
        Ok(unsafe { pool.acquire(&self.device)? })
    }

    /// Return buffer to the pool it was acquired from.
    ///
    /// # Safety
    ///
    /// Buffer must be acquired from these pools and not pending execution.
    pub unsafe fn release<S, L>(&self, buffer: CommandBuffer<D, S, L>)
    where
        S: Resettable,
        L: Level,
    {
        let pool = self
            .slot(buffer.queue(), buffer.slot())
            .expect("Buffer must be acquired from these pools");
        let mut pool = pool.lock();
        pool.release(&self.device, buffer);
    }

    /// Destroy all pools.
    ///
    /// # Safety
    ///
    /// No buffers from the pools may be pending execution.
    pub unsafe fn dispose(self) {
        let CommandPools {
            device,
            queues,
            relevant,
        } = self;

        for pools in queues {
            for pool in pools.slots.into_inner() {
                match Arc::try_unwrap(pool) {
                    Ok(pool) => pool.into_inner().dispose(&device),
                    Err(_) => {
                        log::error!("Command pool of {:?} queue is still in use", pools.queue)
                    }
                }
            }
        }
        relevant.dispose();
    }
}
