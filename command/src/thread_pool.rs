use {
    crossbeam_channel::{Receiver, SendError, Sender},
    std::{
        panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
        thread::JoinHandle,
    },
};

/// Pool of threads that runs batch of tasks and waits for all of them.
pub trait ThreadPool {
    /// Number of threads tasks are spread across.
    fn size(&self) -> usize;

    /// Run all tasks and wait for completion.
    /// Returns results in task order.
    /// If any task panics the panic is resumed on the calling thread
    /// after all tasks are finished.
    fn join<'a, T, F>(&self, tasks: Vec<F>) -> Vec<T>
    where
        T: Send + 'a,
        F: FnOnce() -> T + Send + 'a;
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Thread pool with fixed number of long-lived workers.
///
/// Workers pull jobs from shared queue.
/// `join` blocks until every submitted job is finished,
/// so tasks may borrow from the caller's stack.
/// Calling `join` from a task of the same pool may deadlock.
#[derive(Debug)]
pub struct FixedThreadPool {
    size: usize,
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl FixedThreadPool {
    /// Create pool with `size` workers.
    /// Pool of size 1 spawns no threads and runs tasks on the calling thread.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        if size == 1 {
            return FixedThreadPool {
                size,
                sender: None,
                workers: Vec::new(),
            };
        }

        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let workers = (0..size)
            .filter_map(|index| {
                let receiver = receiver.clone();
                std::thread::Builder::new()
                    .name(format!("tessera-worker-{}", index))
                    .spawn(move || work(receiver))
                    .map_err(|err| log::warn!("Failed to spawn worker {}: {}", index, err))
                    .ok()
            })
            .collect::<Vec<_>>();

        log::debug!("Spawned {} of {} workers", workers.len(), size);
        if workers.is_empty() {
            return Self::new(1);
        }

        FixedThreadPool {
            size: workers.len(),
            sender: Some(sender),
            workers,
        }
    }

    /// Create pool with a worker per available CPU.
    pub fn with_available_parallelism() -> Self {
        let size = std::thread::available_parallelism()
            .map(Into::into)
            .unwrap_or(1);
        Self::new(size)
    }
}

fn work(receiver: Receiver<Job>) {
    for job in receiver.iter() {
        job();
    }
}

impl Default for FixedThreadPool {
    fn default() -> Self {
        Self::with_available_parallelism()
    }
}

impl Drop for FixedThreadPool {
    fn drop(&mut self) {
        // Workers exit once queue is disconnected and drained.
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("Worker thread panicked");
            }
        }
    }
}

impl ThreadPool for FixedThreadPool {
    fn size(&self) -> usize {
        self.size
    }

    fn join<'a, T, F>(&self, tasks: Vec<F>) -> Vec<T>
    where
        T: Send + 'a,
        F: FnOnce() -> T + Send + 'a,
    {
        let count = tasks.len();
        let sender = match &self.sender {
            Some(sender) if count > 1 => sender,
            _ => return tasks.into_iter().map(|task| task()).collect(),
        };

        let (result_sender, result_receiver) = crossbeam_channel::bounded(count);
        for (index, task) in tasks.into_iter().enumerate() {
            let result_sender = result_sender.clone();
            let job: Box<dyn FnOnce() + Send + 'a> = Box::new(move || {
                let result = catch_unwind(AssertUnwindSafe(task));
                let _ = result_sender.send((index, result));
            });

            // Every job owns a result sender and the loop below doesn't end
            // until all of them are dropped, that is until every job has run or was dropped.
            // So nothing borrowed for `'a` is used after `join` returns.
            let job = unsafe {
                std::mem::transmute::<Box<dyn FnOnce() + Send + 'a>, Job>(job)
            };
            if let Err(SendError(job)) = sender.send(job) {
                job();
            }
        }
        drop(result_sender);

        let mut results = (0..count).map(|_| None).collect::<Vec<Option<T>>>();
        let mut panic = None;
        for (index, result) in result_receiver.iter() {
            match result {
                Ok(value) => results[index] = Some(value),
                Err(payload) => {
                    panic.get_or_insert(payload);
                }
            }
        }
        if let Some(payload) = panic {
            resume_unwind(payload);
        }

        results
            .into_iter()
            .map(|result| result.expect("Every task sends its result"))
            .collect()
    }
}
