//! Parallel recording of command lists.

use {
    crate::{
        buffer::{
            CommandBuffer, ExecutableState, Failed, Level, PrimaryLevel, RecordingState,
            SecondaryLevel,
        },
        capability::QueueType,
        command::Command,
        device::Device,
        error::RecordError,
        executor::Executor,
        partition::{shard_commands, shards, Shard, MIN_COMMANDS_PER_THREAD},
        pool::CommandPools,
        thread_pool::ThreadPool,
    },
    smallvec::SmallVec,
};

/// Recorder configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct RecordConfig {
    /// Minimal number of commands worth recording on a separate thread.
    pub min_commands_per_thread: usize,
}

impl Default for RecordConfig {
    fn default() -> Self {
        RecordConfig {
            min_commands_per_thread: MIN_COMMANDS_PER_THREAD,
        }
    }
}

/// Records command lists into primary command buffer
/// spreading the work across thread pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct Recorder {
    config: RecordConfig,
}

impl Recorder {
    /// Create recorder with specified config.
    pub fn new(config: RecordConfig) -> Self {
        log::info!("Create recorder with {:#?}", config);
        Recorder { config }
    }

    /// Get recorder config.
    pub fn config(&self) -> RecordConfig {
        self.config
    }

    /// Record all commands from `lists` in order into a primary buffer for `queue`.
    ///
    /// Commands are split into contiguous shards.
    /// Every shard is recorded into its own secondary buffer on `thread_pool`
    /// and the primary buffer executes secondaries in shard order.
    ///
    /// When any buffer fails to allocate, begin or finish,
    /// buffers recorded so far are returned to the pools and the first error is returned.
    pub fn record<D, C, L, E, P>(
        &self,
        pools: &CommandPools<D>,
        queue: QueueType,
        lists: &[L],
        executor: &E,
        thread_pool: &P,
    ) -> Result<Recording<D>, RecordError>
    where
        D: Device,
        C: Command,
        L: AsRef<[C]> + Sync,
        E: Executor<D, C>,
        P: ThreadPool,
    {
        profile_scope!("record");

        if !queue.supports(C::QUEUE) {
            return Err(RecordError::Unsupported {
                queue,
                required: C::QUEUE,
            });
        }

        let lengths = lists
            .iter()
            .map(|list| list.as_ref().len())
            .collect::<SmallVec<[usize; 16]>>();
        let commands: usize = lengths.iter().sum();
        let shards = shards(&lengths, thread_pool.size(), self.config.min_commands_per_thread);
        pools.reserve(queue, shards.len().max(1))?;

        log::trace!(
            "Record {} commands from {} lists into {} shards for {:?} queue",
            commands,
            lists.len(),
            shards.len(),
            queue
        );

        let tasks = shards
            .iter()
            .enumerate()
            .map(|(slot, &shard)| {
                move || record_shard::<D, C, L, E>(pools, queue, slot, lists, shard, executor)
            })
            .collect::<Vec<_>>();

        let mut secondaries = Vec::with_capacity(shards.len());
        let mut error = None;
        for result in thread_pool.join(tasks) {
            match result {
                Ok(buffer) => secondaries.push(buffer),
                Err(err) => {
                    error.get_or_insert(err);
                }
            }
        }

        let result = match error {
            Some(error) => Err(error),
            None => record_primary(pools, queue, &secondaries),
        };

        match result {
            Ok(primary) => Ok(Recording {
                queue,
                primary,
                secondaries,
                commands,
            }),
            Err(error) => {
                log::warn!("Recording for {:?} queue failed: {}", queue, error);
                for buffer in secondaries {
                    // Secondaries were never submitted.
                    unsafe { pools.release(buffer) };
                }
                Err(error)
            }
        }
    }
}

fn begin_and_record<D, L>(
    pools: &CommandPools<D>,
    queue: QueueType,
    slot: usize,
    record: impl FnOnce(&mut CommandBuffer<D, RecordingState, L>),
) -> Result<CommandBuffer<D, ExecutableState, L>, RecordError>
where
    D: Device,
    L: Level,
{
    let device = pools.device();
    let buffer = pools.acquire::<L>(queue, slot)?;

    let recorded = buffer.begin(device).and_then(|mut recording| {
        record(&mut recording);
        recording.finish(device)
    });

    recorded.map_err(|Failed { error, buffer }| {
        // Buffer that failed to begin or finish was never submitted.
        unsafe { pools.release(buffer) };
        error.into()
    })
}

fn record_shard<D, C, L, E>(
    pools: &CommandPools<D>,
    queue: QueueType,
    slot: usize,
    lists: &[L],
    shard: Shard,
    executor: &E,
) -> Result<CommandBuffer<D, ExecutableState, SecondaryLevel>, RecordError>
where
    D: Device,
    C: Command,
    L: AsRef<[C]>,
    E: Executor<D, C>,
{
    profile_scope!("record_shard");
    begin_and_record(pools, queue, slot, |recording| {
        for command in shard_commands::<C, L>(lists, shard) {
            executor.execute(recording.raw_mut(), command);
        }
    })
}

fn record_primary<D>(
    pools: &CommandPools<D>,
    queue: QueueType,
    secondaries: &[CommandBuffer<D, ExecutableState, SecondaryLevel>],
) -> Result<CommandBuffer<D, ExecutableState, PrimaryLevel>, RecordError>
where
    D: Device,
{
    profile_scope!("record_primary");
    begin_and_record(pools, queue, 0, |recording| {
        recording.execute_secondaries(pools.device(), secondaries);
    })
}

/// Result of recording.
/// Primary buffer executes secondaries, so all of them must be kept alive
/// until primary buffer finishes execution.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct Recording<D: Device> {
    queue: QueueType,
    primary: CommandBuffer<D, ExecutableState, PrimaryLevel>,
    secondaries: Vec<CommandBuffer<D, ExecutableState, SecondaryLevel>>,
    commands: usize,
}

impl<D> Recording<D>
where
    D: Device,
{
    /// Queue type buffers were recorded for.
    pub fn queue(&self) -> QueueType {
        self.queue
    }

    /// Primary buffer ready for submission.
    pub fn primary(&self) -> &CommandBuffer<D, ExecutableState, PrimaryLevel> {
        &self.primary
    }

    /// Secondary buffers in shard order.
    pub fn secondaries(&self) -> &[CommandBuffer<D, ExecutableState, SecondaryLevel>] {
        &self.secondaries
    }

    /// Number of shards commands were split into.
    pub fn shard_count(&self) -> usize {
        self.secondaries.len()
    }

    /// Number of recorded commands.
    pub fn command_count(&self) -> usize {
        self.commands
    }

    /// Return all buffers to the pools for reuse.
    ///
    /// # Safety
    ///
    /// `pools` must be the pools recording was made with.
    /// Primary buffer must not be pending execution.
    pub unsafe fn release(self, pools: &CommandPools<D>) {
        pools.release(self.primary);
        for buffer in self.secondaries {
            pools.release(buffer);
        }
    }
}
