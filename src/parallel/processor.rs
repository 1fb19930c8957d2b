use super::aggregate::{Aggregator, RunOutcome, ValueDifference, value_difference};
use super::core::ExecutionStrategy;
use super::partition::{partition, partition_count, resolve_workers};
use super::worker::{Options, Worker, WorkerBinding};
use crate::error::PoolError;
use crate::logging::ScopedLogger;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::Arc;

/// Per-run knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Worker threads (0 = twice the CPU cores), clamped to the item count
    pub num_workers: usize,
    /// Result channels every worker outcome must carry
    pub num_results: usize,
    /// Items per partition (0 = one partition per worker, `None` = strategy default)
    pub chunk_size: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            num_workers: 0,
            num_results: 1,
            chunk_size: None,
        }
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    pub fn results(mut self, num_results: usize) -> Self {
        self.num_results = num_results;
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }
}

/// Distributes a batch of items over a bounded worker pool and aggregates the outcomes
pub struct MultiProcPool<T, R, D> {
    worker: Option<Arc<dyn Worker<T, R, D>>>,
    options: Options,
    working_dir: PathBuf,
    value_diff: Option<ValueDifference<T>>,
    logger: Option<ScopedLogger>,
}

impl<T, R, D> Default for MultiProcPool<T, R, D>
where
    T: Send + Sync + 'static,
    R: Send + 'static,
    D: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, R, D> MultiProcPool<T, R, D>
where
    T: Hash + Eq + Send + Sync + 'static,
    R: Send + 'static,
    D: Send + 'static,
{
    /// Pool whose fail-set compares items by value, falling back to identity
    pub fn hashable() -> Self {
        let mut pool = Self::new();
        pool.value_diff = Some(value_difference::<T>);
        pool
    }
}

impl<T, R, D> MultiProcPool<T, R, D>
where
    T: Send + Sync + 'static,
    R: Send + 'static,
    D: Send + 'static,
{
    /// Pool whose fail-set compares items by identity only
    pub fn new() -> Self {
        Self {
            worker: None,
            options: Options::new(),
            working_dir: PathBuf::from("."),
            value_diff: None,
            logger: None,
        }
    }

    /// Bind the worker together with its options and working directory
    pub fn configure<W>(
        &mut self,
        worker: W,
        options: Options,
        working_dir: impl Into<PathBuf>,
    ) -> &mut Self
    where
        W: Worker<T, R, D> + 'static,
    {
        self.worker = Some(Arc::new(worker));
        self.options = options;
        self.working_dir = working_dir.into();
        self
    }

    pub fn set_worker<W>(&mut self, worker: W) -> &mut Self
    where
        W: Worker<T, R, D> + 'static,
    {
        self.worker = Some(Arc::new(worker));
        self
    }

    /// Options map passed to every worker invocation
    pub fn set_options(&mut self, options: Options) -> &mut Self {
        self.options = options;
        self
    }

    /// Working directory passed to every worker invocation
    pub fn set_working_dir(&mut self, working_dir: impl Into<PathBuf>) -> &mut Self {
        self.working_dir = working_dir.into();
        self
    }

    /// Funnel worker log records into `logger`'s scope.
    ///
    /// Without an explicit logger, workers log to whatever dispatcher is the
    /// default on the thread calling `run`, including an enclosing [`LogScope`](crate::logging::LogScope).
    pub fn with_logger(&mut self, logger: &ScopedLogger) -> &mut Self {
        self.logger = Some(logger.clone());
        self
    }

    pub fn clear_logger(&mut self) -> &mut Self {
        self.logger = None;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.worker.is_some()
    }

    /// Blocking run; outcomes are merged as partitions complete (default chunk size 10)
    pub fn run_synchronous<I>(&self, data: I, options: RunOptions) -> RunOutcome<T, R, D>
    where
        I: IntoIterator,
        I::Item: Into<Arc<T>>,
    {
        self.run(ExecutionStrategy::Synchronous, data, options)
    }

    /// Submit-then-wait run; outcomes are merged in partition order (default chunk size 1)
    pub fn run_asynchronous<I>(&self, data: I, options: RunOptions) -> RunOutcome<T, R, D>
    where
        I: IntoIterator,
        I::Item: Into<Arc<T>>,
    {
        self.run(ExecutionStrategy::Asynchronous, data, options)
    }

    /// Partition `data`, dispatch it with `strategy`, and aggregate the outcomes.
    ///
    /// Never fails outright: every problem is reported through the returned
    /// [`RunOutcome`].
    pub fn run<I>(&self, strategy: ExecutionStrategy, data: I, options: RunOptions) -> RunOutcome<T, R, D>
    where
        I: IntoIterator,
        I::Item: Into<Arc<T>>,
    {
        let Some(worker) = &self.worker else {
            let error = PoolError::Configuration("no worker bound, call configure() before running".into());
            tracing::error!("{}", error);
            return RunOutcome::failed(error);
        };

        let inputs: Vec<Arc<T>> = data.into_iter().map(Into::into).collect();
        if inputs.is_empty() {
            tracing::info!("Empty input, nothing to dispatch");
            return RunOutcome::empty(options.num_results);
        }

        let workers = resolve_workers(options.num_workers, inputs.len());
        let chunk_size = options
            .chunk_size
            .unwrap_or_else(|| strategy.default_chunk_size());
        let partitions = partition(&inputs, partition_count(inputs.len(), workers, chunk_size));

        tracing::info!(
            "Running {} with {} workers, subtask count {} subtask length ~ {}",
            strategy.name(),
            workers,
            partitions.len(),
            partitions.first().map_or(0, Vec::len)
        );

        // Pool threads do not inherit the caller's thread default, so hand it over explicitly
        let dispatch = match &self.logger {
            Some(logger) => logger.dispatch().clone(),
            None => tracing::dispatcher::get_default(|current| current.clone()),
        };
        let binding = WorkerBinding::new(Arc::clone(worker), self.options.clone(), self.working_dir.clone())
            .with_dispatch(Some(dispatch));

        let mut aggregator = Aggregator::new(options.num_results);
        let dispatched = strategy.execute(partitions, workers, &binding, |index, outcome| {
            aggregator.absorb(index, outcome)
        });

        match dispatched {
            Ok(()) => aggregator.finish(&inputs, self.value_diff),
            Err(e) => {
                tracing::error!("Failing with {}", e);
                RunOutcome::failed(e)
            }
        }
    }
}
