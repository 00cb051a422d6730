use {
    super::{Draw, Fill, MockBuffer, MockDevice},
    crate::{
        capability::{FamilyId, QueueType},
        command::{BufferId, ComputeCommand, GraphicsCommand, TransferCommand},
        error::{OutOfMemory, RecordError},
        pool::CommandPools,
        recorder::{RecordConfig, Recorder, Recording},
        thread_pool::FixedThreadPool,
    },
    rand::{rngs::StdRng, Rng, SeedableRng},
    std::sync::atomic::{AtomicUsize, Ordering},
};

fn pools(device: &MockDevice) -> CommandPools<MockDevice> {
    CommandPools::new(
        device.clone(),
        vec![
            (QueueType::Graphics, FamilyId { index: 0 }),
            (QueueType::Transfer, FamilyId { index: 2 }),
        ],
    )
}

/// Lists of draws numbered in order across lists.
fn draws(lengths: &[usize]) -> Vec<Vec<Draw>> {
    let mut next = 0;
    lengths
        .iter()
        .map(|&length| {
            let list = (next..next + length).map(Draw).collect();
            next += length;
            list
        })
        .collect()
}

fn draw(target: &mut MockBuffer, command: &Draw) {
    target.commands.push(command.0);
}

fn record(
    pools: &CommandPools<MockDevice>,
    lists: &[Vec<Draw>],
    threads: usize,
) -> Result<Recording<MockDevice>, RecordError> {
    let thread_pool = FixedThreadPool::new(threads);
    Recorder::default().record(pools, QueueType::Graphics, lists, &draw, &thread_pool)
}

#[test]
fn order_is_preserved_for_any_pool_size() {
    let _ = env_logger::builder().is_test(true).try_init();
    let device = MockDevice::new();
    let pools = pools(&device);
    let mut rng = StdRng::seed_from_u64(11);

    for _ in 0..20 {
        let lengths = (0..rng.gen_range(1..10))
            .map(|_| rng.gen_range(0..80))
            .collect::<Vec<usize>>();
        let total = lengths.iter().sum::<usize>();
        let lists = draws(&lengths);

        for threads in 1..=8 {
            let recording = record(&pools, &lists, threads).unwrap();
            assert_eq!(recording.command_count(), total);
            assert_eq!(recording.primary().raw().commands, (0..total).collect::<Vec<_>>());
            assert!(recording.primary().raw().finished);

            let mut next = 0;
            for secondary in recording.secondaries() {
                let commands = &secondary.raw().commands;
                assert!(!commands.is_empty());
                assert_eq!(commands[0], next);
                next += commands.len();
            }
            assert_eq!(next, total);

            unsafe { recording.release(&pools) };
        }
    }

    assert_eq!(pools.outstanding(QueueType::Graphics), 0);
    unsafe { pools.dispose() };
    assert_eq!(device.live_pools(), 0);
    assert_eq!(device.live_buffers(), 0);
}

#[test]
fn zero_commands_give_empty_primary() {
    let device = MockDevice::new();
    let pools = pools(&device);
    let calls = AtomicUsize::new(0);
    let executor = |_: &mut MockBuffer, _: &Draw| {
        calls.fetch_add(1, Ordering::Relaxed);
    };

    let lists: Vec<Vec<Draw>> = vec![vec![], vec![]];
    let recording = Recorder::default()
        .record(&pools, QueueType::Graphics, &lists, &executor, &FixedThreadPool::new(4))
        .unwrap();

    assert_eq!(calls.load(Ordering::Relaxed), 0);
    assert_eq!(recording.shard_count(), 0);
    assert!(recording.primary().raw().finished);
    assert!(recording.primary().raw().commands.is_empty());

    unsafe {
        recording.release(&pools);
        pools.dispose();
    }
}

#[test]
fn three_lists_make_two_shards() {
    let device = MockDevice::new();
    let pools = pools(&device);
    let lists = draws(&[10, 5, 40]);

    let recording = record(&pools, &lists, 4).unwrap();
    assert_eq!(recording.shard_count(), 2);
    assert_eq!(recording.secondaries()[0].raw().commands, (0..25).collect::<Vec<_>>());
    assert_eq!(recording.secondaries()[1].raw().commands, (25..55).collect::<Vec<_>>());
    assert_eq!(recording.secondaries()[1].slot(), 1);
    assert_eq!(recording.primary().slot(), 0);

    unsafe {
        recording.release(&pools);
        pools.dispose();
    }
}

#[test]
fn min_commands_per_thread_is_configurable() {
    let device = MockDevice::new();
    let pools = pools(&device);
    let lists = draws(&[10, 5, 40]);
    let recorder = Recorder::new(RecordConfig {
        min_commands_per_thread: 5,
    });

    let recording = recorder
        .record(&pools, QueueType::Graphics, &lists, &draw, &FixedThreadPool::new(4))
        .unwrap();
    assert_eq!(recording.shard_count(), 4);
    assert_eq!(recording.secondaries()[3].raw().commands, (39..55).collect::<Vec<_>>());

    unsafe {
        recording.release(&pools);
        pools.dispose();
    }
}

#[test]
fn transfer_commands_record_on_any_queue() {
    let device = MockDevice::new();
    let pools = pools(&device);
    let lists = vec![(0..30).map(Fill).collect::<Vec<_>>()];
    let fill = |target: &mut MockBuffer, command: &Fill| target.commands.push(command.0);

    for &queue in &[QueueType::Transfer, QueueType::Graphics] {
        let recording = Recorder::default()
            .record(&pools, queue, &lists, &fill, &FixedThreadPool::new(2))
            .unwrap();
        assert_eq!(recording.queue(), queue);
        assert_eq!(recording.primary().raw().commands, (0..30).collect::<Vec<_>>());
        unsafe { recording.release(&pools) };
    }

    unsafe { pools.dispose() };
}

#[test]
fn unsupported_queue_is_rejected() {
    let device = MockDevice::new();
    let pools = pools(&device);
    let lists = draws(&[3]);

    let error = Recorder::default()
        .record(&pools, QueueType::Transfer, &lists, &draw, &FixedThreadPool::new(2))
        .unwrap_err();
    assert_eq!(
        error,
        RecordError::Unsupported {
            queue: QueueType::Transfer,
            required: QueueType::Graphics,
        }
    );
    assert_eq!(device.live_pools(), 0);
    unsafe { pools.dispose() };
}

#[test]
fn missing_family_is_reported() {
    let device = MockDevice::new();
    let pools = pools(&device);
    let lists = vec![vec![Fill(0)]];
    let fill = |target: &mut MockBuffer, command: &Fill| target.commands.push(command.0);

    let error = Recorder::default()
        .record(&pools, QueueType::Compute, &lists, &fill, &FixedThreadPool::new(2))
        .unwrap_err();
    assert_eq!(error, RecordError::NoFamily(QueueType::Compute));
    unsafe { pools.dispose() };
}

#[test]
fn allocation_failure_returns_recorded_buffers() {
    let device = MockDevice::new();
    let pools = pools(&device);
    let lists = draws(&[400]);
    device.limit_buffers(2);

    let error = record(&pools, &lists, 4).unwrap_err();
    assert_eq!(error, RecordError::OutOfMemory(OutOfMemory::Device));
    assert_eq!(pools.outstanding(QueueType::Graphics), 0);
    assert_eq!(pools.allocated(QueueType::Graphics), 2);

    unsafe { pools.dispose() };
    assert_eq!(device.live_buffers(), 0);
}

#[test]
fn begin_failure_returns_all_buffers() {
    let device = MockDevice::new();
    let pools = pools(&device);
    let lists = draws(&[400]);
    // All secondaries begin, the primary doesn't.
    device.fail_begin_after(4);

    let error = record(&pools, &lists, 4).unwrap_err();
    assert_eq!(error, RecordError::OutOfMemory(OutOfMemory::Device));
    assert_eq!(pools.outstanding(QueueType::Graphics), 0);
    assert_eq!(pools.allocated(QueueType::Graphics), 5);

    unsafe { pools.dispose() };
}

#[test]
fn buffers_are_recycled_between_frames() {
    let device = MockDevice::new();
    let pools = pools(&device);
    let lists = draws(&[60, 70, 80]);

    let recording = record(&pools, &lists, 3).unwrap();
    let allocated = pools.allocated(QueueType::Graphics);
    assert_eq!(allocated, recording.shard_count() + 1);
    unsafe { recording.release(&pools) };

    for _ in 0..3 {
        let recording = record(&pools, &lists, 3).unwrap();
        assert_eq!(recording.primary().raw().commands, (0..210).collect::<Vec<_>>());
        unsafe { recording.release(&pools) };
    }
    assert_eq!(pools.allocated(QueueType::Graphics), allocated);
    assert_eq!(pools.slot_count(QueueType::Graphics), 3);

    unsafe { pools.dispose() };
    assert_eq!(device.live_buffers(), 0);
}

#[test]
fn graphics_lists_carry_compute_and_transfer_work() {
    let device = MockDevice::new();
    let pools = pools(&device);
    let lists = vec![
        vec![
            GraphicsCommand::Draw {
                vertices: 0..3,
                instances: 0..1,
            };
            30
        ],
        vec![ComputeCommand::Dispatch { x: 8, y: 8, z: 1 }.into(); 20],
        vec![
            TransferCommand::FillBuffer {
                buffer: BufferId(1),
                range: 0..256,
                data: 0,
            }
            .into();
            10
        ],
    ];
    let executor = |target: &mut MockBuffer, command: &GraphicsCommand| {
        let kind = match command {
            GraphicsCommand::Draw { .. } => 0,
            GraphicsCommand::Compute(ComputeCommand::Transfer(_)) => 2,
            GraphicsCommand::Compute(_) => 1,
            _ => 3,
        };
        target.commands.push(kind);
    };

    let recording = Recorder::default()
        .record(&pools, QueueType::Graphics, &lists, &executor, &FixedThreadPool::new(2))
        .unwrap();
    assert_eq!(recording.shard_count(), 2);
    let expected = [(0, 30), (1, 20), (2, 10)]
        .iter()
        .flat_map(|&(kind, count)| std::iter::repeat(kind).take(count))
        .collect::<Vec<usize>>();
    assert_eq!(recording.primary().raw().commands, expected);

    unsafe {
        recording.release(&pools);
        pools.dispose();
    }
}

#[cfg(feature = "profiler")]
#[test]
fn profiler_feature_records_scopes() {
    thread_profiler::register_thread_with_profiler();
    let device = MockDevice::new();
    let pools = pools(&device);
    let lists = draws(&[30]);

    let recording = record(&pools, &lists, 1).unwrap();
    unsafe {
        recording.release(&pools);
        pools.dispose();
    }

    let path = std::env::temp_dir().join("tessera-command-profile.json");
    thread_profiler::write_profile(path.to_str().unwrap());
    let profile = std::fs::read_to_string(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert!(profile.contains("record_primary"));
}
