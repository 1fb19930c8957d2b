use crate::error::{PoolError, panic_message};
use anyhow::Result;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Free-form options handed to every worker invocation
pub type Options = serde_json::Map<String, serde_json::Value>;

/// Label passed to workers for logging. It identifies the role, not the partition.
pub const WORKER_NAME: &str = "worker";

/// What one worker invocation reports back for its partition
#[derive(Debug, Clone)]
pub struct WorkerOutcome<T, R, D> {
    /// Items from the partition that were processed successfully
    pub success: Vec<Arc<T>>,
    /// Result channels, each parallel to `success`
    pub results: Vec<Vec<R>>,
    pub diagnostics: Vec<D>,
}

impl<T, R, D> WorkerOutcome<T, R, D> {
    pub fn new(success: Vec<Arc<T>>, results: Vec<Vec<R>>, diagnostics: Vec<D>) -> Self {
        Self {
            success,
            results,
            diagnostics,
        }
    }

    /// An outcome with no successes and `channels` empty result channels
    pub fn empty(channels: usize) -> Self {
        Self {
            success: Vec::new(),
            results: (0..channels).map(|_| Vec::new()).collect(),
            diagnostics: Vec::new(),
        }
    }

    /// Check the parallel-array contract for the first `declared` channels
    pub fn check_channels(&self, declared: usize) -> std::result::Result<(), String> {
        if self.results.len() < declared {
            return Err(format!(
                "outcome has {} result channels, {} declared",
                self.results.len(),
                declared
            ));
        }

        for (channel, values) in self.results.iter().take(declared).enumerate() {
            if values.len() != self.success.len() {
                return Err(format!(
                    "result channel {} has {} values for {} successful items",
                    channel,
                    values.len(),
                    self.success.len()
                ));
            }
        }

        Ok(())
    }
}

/// A unit of work applied to one partition.
///
/// Any function or closure with the matching signature is a worker:
///
/// ```rust
/// use multiproc::parallel::{Options, WorkerOutcome};
/// use std::path::Path;
/// use std::sync::Arc;
///
/// fn doubler(
///     partition: &[Arc<u32>],
///     _worker_name: &str,
///     _options: &Options,
///     _working_dir: &Path,
/// ) -> anyhow::Result<WorkerOutcome<u32, u32, String>> {
///     let doubled = partition.iter().map(|v| **v * 2).collect();
///     Ok(WorkerOutcome::new(partition.to_vec(), vec![doubled], Vec::new()))
/// }
/// ```
pub trait Worker<T, R, D>: Send + Sync {
    fn run(
        &self,
        partition: &[Arc<T>],
        worker_name: &str,
        options: &Options,
        working_dir: &Path,
    ) -> Result<WorkerOutcome<T, R, D>>;
}

impl<F, T, R, D> Worker<T, R, D> for F
where
    F: Fn(&[Arc<T>], &str, &Options, &Path) -> Result<WorkerOutcome<T, R, D>> + Send + Sync,
{
    fn run(
        &self,
        partition: &[Arc<T>],
        worker_name: &str,
        options: &Options,
        working_dir: &Path,
    ) -> Result<WorkerOutcome<T, R, D>> {
        self(partition, worker_name, options, working_dir)
    }
}

/// A worker bound to fixed options and working directory, ready for dispatch.
///
/// Cloning is cheap; every pool thread holds its own clone.
pub struct WorkerBinding<T, R, D> {
    worker: Arc<dyn Worker<T, R, D>>,
    options: Arc<Options>,
    working_dir: Arc<PathBuf>,
    dispatch: Option<tracing::Dispatch>,
}

impl<T, R, D> Clone for WorkerBinding<T, R, D> {
    fn clone(&self) -> Self {
        Self {
            worker: Arc::clone(&self.worker),
            options: Arc::clone(&self.options),
            working_dir: Arc::clone(&self.working_dir),
            dispatch: self.dispatch.clone(),
        }
    }
}

impl<T, R, D> WorkerBinding<T, R, D> {
    pub fn new(
        worker: Arc<dyn Worker<T, R, D>>,
        options: Options,
        working_dir: PathBuf,
    ) -> Self {
        Self {
            worker,
            options: Arc::new(options),
            working_dir: Arc::new(working_dir),
            dispatch: None,
        }
    }

    /// Route every tracing event emitted by the worker to `dispatch`
    pub fn with_dispatch(mut self, dispatch: Option<tracing::Dispatch>) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Run the bound worker over one partition.
    ///
    /// Worker errors and panics both come back as [`PoolError::WorkerExecution`].
    pub fn invoke(
        &self,
        index: usize,
        partition: &[Arc<T>],
    ) -> std::result::Result<WorkerOutcome<T, R, D>, PoolError> {
        let call = || {
            catch_unwind(AssertUnwindSafe(|| {
                self.worker
                    .run(partition, WORKER_NAME, &self.options, &self.working_dir)
            }))
        };

        let caught = match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, call),
            None => call(),
        };

        match caught {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(e)) => Err(PoolError::worker(index, format!("{e:#}"))),
            Err(payload) => Err(PoolError::worker(
                index,
                format!("panic: {}", panic_message(payload.as_ref())),
            )),
        }
    }
}
