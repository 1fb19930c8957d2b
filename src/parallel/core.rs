use super::worker::{WorkerBinding, WorkerOutcome};
use crate::error::PoolError;
use crossbeam::channel::{Receiver, Sender, bounded, unbounded};
use std::sync::Arc;

/// Partitions handed to the pool machinery per internal batch.
///
/// Tuned by timing runs; independent of the caller's chunk size.
pub const POOL_CHUNK_SIZE: usize = 5;

type Partition<T> = Vec<Arc<T>>;
type Batch<T> = Vec<(usize, Partition<T>)>;
type Delivery<T, R, D> = (usize, Result<WorkerOutcome<T, R, D>, PoolError>);

/// How partitions are driven through the worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Blocking dispatch, outcomes consumed in completion order
    Synchronous,
    /// One non-blocking submit followed by an explicit wait, outcomes in submission order
    Asynchronous,
}

impl ExecutionStrategy {
    /// Chunk size used when the caller does not pick one
    pub fn default_chunk_size(&self) -> usize {
        match self {
            ExecutionStrategy::Synchronous => 10,
            ExecutionStrategy::Asynchronous => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExecutionStrategy::Synchronous => "sync",
            ExecutionStrategy::Asynchronous => "async",
        }
    }

    /// Run every partition on a pool of `workers` threads.
    ///
    /// `on_outcome` receives each partition index with its outcome. The first
    /// error, from a worker or from the callback, ends the run. Every pool
    /// thread is joined before this returns, on success and on error.
    pub fn execute<T, R, D, F>(
        &self,
        partitions: Vec<Partition<T>>,
        workers: usize,
        binding: &WorkerBinding<T, R, D>,
        on_outcome: F,
    ) -> Result<(), PoolError>
    where
        T: Send + Sync + 'static,
        R: Send + 'static,
        D: Send + 'static,
        F: FnMut(usize, WorkerOutcome<T, R, D>) -> Result<(), PoolError>,
    {
        match self {
            ExecutionStrategy::Synchronous => {
                SynchronousExecutor::new(workers).execute(partitions, binding, on_outcome)
            }
            ExecutionStrategy::Asynchronous => {
                AsynchronousExecutor::new(workers).execute(partitions, binding, on_outcome)
            }
        }
    }
}

/// Producer/consumer pool over crossbeam scoped threads
pub struct SynchronousExecutor {
    workers: usize,
    buffer_size: usize,
}

impl SynchronousExecutor {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            workers,
            buffer_size: workers * 2,
        }
    }

    pub fn execute<T, R, D, F>(
        &self,
        partitions: Vec<Partition<T>>,
        binding: &WorkerBinding<T, R, D>,
        mut on_outcome: F,
    ) -> Result<(), PoolError>
    where
        T: Send + Sync + 'static,
        R: Send + 'static,
        D: Send + 'static,
        F: FnMut(usize, WorkerOutcome<T, R, D>) -> Result<(), PoolError>,
    {
        let total = partitions.len();
        if total == 0 {
            return Ok(());
        }

        // Channels live inside the scope so an early return disconnects them
        // and lets every thread wind down before the scope joins.
        crossbeam::thread::scope(|s| -> Result<(), PoolError> {
            let (work_tx, work_rx): (Sender<Batch<T>>, Receiver<Batch<T>>) =
                bounded(self.buffer_size);
            let (result_tx, result_rx): (Sender<Delivery<T, R, D>>, Receiver<Delivery<T, R, D>>) =
                bounded(self.buffer_size * POOL_CHUNK_SIZE);

            for worker_id in 0..self.workers {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let binding = binding.clone();

                s.builder()
                    .name(format!("worker-{worker_id}"))
                    .spawn(move |_| worker_loop(work_rx, result_tx, binding))
                    .map_err(|e| {
                        PoolError::PoolLifecycle(format!("failed to spawn worker-{worker_id}: {e}"))
                    })?;
            }

            // Producer thread: hand partitions to the workers in batches
            s.builder()
                .name("dispatcher".to_string())
                .spawn(move |_| {
                    let mut batch = Vec::with_capacity(POOL_CHUNK_SIZE);
                    for (index, partition) in partitions.into_iter().enumerate() {
                        batch.push((index, partition));
                        if batch.len() == POOL_CHUNK_SIZE
                            && work_tx.send(std::mem::take(&mut batch)).is_err()
                        {
                            return; // Workers dropped
                        }
                    }
                    if !batch.is_empty() {
                        let _ = work_tx.send(batch);
                    }
                })
                .map_err(|e| PoolError::PoolLifecycle(format!("failed to spawn dispatcher: {e}")))?;

            // Drop the original handles so disconnects propagate
            drop(work_rx);
            drop(result_tx);

            collect_completed(result_rx, total, &mut on_outcome)
        })
        .map_err(|_| PoolError::PoolLifecycle("thread panic occurred during parallel execution".into()))?
    }
}

fn worker_loop<T, R, D>(
    work_rx: Receiver<Batch<T>>,
    result_tx: Sender<Delivery<T, R, D>>,
    binding: WorkerBinding<T, R, D>,
) {
    while let Ok(batch) = work_rx.recv() {
        for (index, partition) in batch {
            tracing::debug!("Partition {} with {} items", index, partition.len());
            let result = binding.invoke(index, &partition);
            if result_tx.send((index, result)).is_err() {
                return; // Collector gave up
            }
        }
    }
}

fn collect_completed<T, R, D, F>(
    result_rx: Receiver<Delivery<T, R, D>>,
    total: usize,
    on_outcome: &mut F,
) -> Result<(), PoolError>
where
    F: FnMut(usize, WorkerOutcome<T, R, D>) -> Result<(), PoolError>,
{
    for received in 0..total {
        let (index, result) = result_rx.recv().map_err(|_| {
            PoolError::PoolLifecycle(format!(
                "worker pool closed with {} of {} partitions outstanding",
                total - received,
                total
            ))
        })?;
        on_outcome(index, result?)?;
    }
    Ok(())
}

/// Rayon pool scoped to one run; its threads are joined when `execute` returns
pub struct AsynchronousExecutor {
    workers: usize,
}

impl AsynchronousExecutor {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn execute<T, R, D, F>(
        &self,
        partitions: Vec<Partition<T>>,
        binding: &WorkerBinding<T, R, D>,
        mut on_outcome: F,
    ) -> Result<(), PoolError>
    where
        T: Send + Sync + 'static,
        R: Send + 'static,
        D: Send + 'static,
        F: FnMut(usize, WorkerOutcome<T, R, D>) -> Result<(), PoolError>,
    {
        if partitions.is_empty() {
            return Ok(());
        }

        let outcomes = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|index| format!("worker-{index}"))
            .panic_handler(|payload| {
                tracing::error!(
                    "Worker pool job panicked: {}",
                    crate::error::panic_message(payload.as_ref())
                );
            })
            .build_scoped(
                |thread| thread.run(),
                |pool| AsyncMapResult::submit(pool, partitions, binding).get(),
            )
            .map_err(|e| PoolError::PoolLifecycle(format!("failed to build worker pool: {e}")))??;

        for (index, result) in outcomes.into_iter().enumerate() {
            on_outcome(index, result?)?;
        }
        Ok(())
    }
}

/// Handle to a batch submitted without blocking
pub struct AsyncMapResult<T, R, D> {
    receiver: Receiver<Delivery<T, R, D>>,
    expected: usize,
}

impl<T, R, D> AsyncMapResult<T, R, D>
where
    T: Send + Sync + 'static,
    R: Send + 'static,
    D: Send + 'static,
{
    /// Queue every partition on `pool` and return immediately
    pub fn submit(
        pool: &rayon::ThreadPool,
        partitions: Vec<Partition<T>>,
        binding: &WorkerBinding<T, R, D>,
    ) -> Self {
        let expected = partitions.len();
        let (result_tx, receiver) = unbounded();

        let mut batch = Vec::with_capacity(POOL_CHUNK_SIZE);
        for (index, partition) in partitions.into_iter().enumerate() {
            batch.push((index, partition));
            if batch.len() == POOL_CHUNK_SIZE {
                spawn_batch(pool, std::mem::take(&mut batch), binding.clone(), result_tx.clone());
            }
        }
        if !batch.is_empty() {
            spawn_batch(pool, batch, binding.clone(), result_tx);
        }

        Self { receiver, expected }
    }

    /// Block until every partition has reported, then return outcomes in submission order
    #[allow(clippy::type_complexity)]
    pub fn get(self) -> Result<Vec<Result<WorkerOutcome<T, R, D>, PoolError>>, PoolError> {
        let mut slots: Vec<Option<Result<WorkerOutcome<T, R, D>, PoolError>>> =
            (0..self.expected).map(|_| None).collect();

        for received in 0..self.expected {
            let (index, result) = self.receiver.recv().map_err(|_| {
                PoolError::PoolLifecycle(format!(
                    "worker pool closed with {} of {} partitions outstanding",
                    self.expected - received,
                    self.expected
                ))
            })?;
            slots[index] = Some(result);
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

fn spawn_batch<T, R, D>(
    pool: &rayon::ThreadPool,
    batch: Batch<T>,
    binding: WorkerBinding<T, R, D>,
    result_tx: Sender<Delivery<T, R, D>>,
) where
    T: Send + Sync + 'static,
    R: Send + 'static,
    D: Send + 'static,
{
    pool.spawn(move || {
        for (index, partition) in batch {
            tracing::debug!("Partition {} with {} items", index, partition.len());
            let result = binding.invoke(index, &partition);
            if result_tx.send((index, result)).is_err() {
                return;
            }
        }
    });
}
