use super::worker::WorkerOutcome;
use crate::error::{PoolError, panic_message};
use std::collections::HashSet;
use std::hash::Hash;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Value-based set difference, available when items are `Hash + Eq`
pub type ValueDifference<T> = fn(&[Arc<T>], &[Arc<T>]) -> Vec<Arc<T>>;

/// Final report of one batch run
#[derive(Debug)]
pub struct RunOutcome<T, R, D> {
    /// True iff every input item was reported successful
    pub ok: bool,
    /// Input items never reported successful
    pub fail_list: Vec<Arc<T>>,
    /// One list per declared result channel
    pub result_lists: Vec<Vec<R>>,
    pub diagnostics: Vec<D>,
    /// Batch-level failure, when `ok` is false for a reason other than rejected items
    pub error: Option<PoolError>,
}

impl<T, R, D> RunOutcome<T, R, D> {
    /// Successful run with `num_results` empty result lists
    pub fn empty(num_results: usize) -> Self {
        Self {
            ok: true,
            fail_list: Vec::new(),
            result_lists: (0..num_results).map(|_| Vec::new()).collect(),
            diagnostics: Vec::new(),
            error: None,
        }
    }

    /// Whole-batch failure: nothing aggregated is reported
    pub fn failed(error: PoolError) -> Self {
        Self {
            ok: false,
            fail_list: Vec::new(),
            result_lists: Vec::new(),
            diagnostics: Vec::new(),
            error: Some(error),
        }
    }

    pub fn into_parts(self) -> (bool, Vec<Arc<T>>, Vec<Vec<R>>, Vec<D>) {
        (self.ok, self.fail_list, self.result_lists, self.diagnostics)
    }
}

/// Items of `inputs` whose value never appears in `successes`, deduplicated
pub fn value_difference<T: Hash + Eq>(inputs: &[Arc<T>], successes: &[Arc<T>]) -> Vec<Arc<T>> {
    let succeeded: HashSet<&T> = successes.iter().map(|item| &**item).collect();
    let mut emitted: HashSet<&T> = HashSet::new();
    let mut fail_list = Vec::new();

    for item in inputs {
        let value: &T = item;
        if !succeeded.contains(value) && emitted.insert(value) {
            fail_list.push(Arc::clone(item));
        }
    }

    fail_list
}

/// Items of `inputs` whose allocation never appears in `successes`.
///
/// A value-equal item in a different allocation does not count as a match.
pub fn identity_difference<T>(inputs: &[Arc<T>], successes: &[Arc<T>]) -> Vec<Arc<T>> {
    let succeeded: HashSet<*const T> = successes.iter().map(Arc::as_ptr).collect();
    let mut emitted: HashSet<*const T> = HashSet::new();
    let mut fail_list = Vec::new();

    for item in inputs {
        let key = Arc::as_ptr(item);
        if !succeeded.contains(&key) && emitted.insert(key) {
            fail_list.push(Arc::clone(item));
        }
    }

    fail_list
}

/// Compute the fail-set, preferring value comparison and falling back to identity
pub fn fail_set<T>(
    inputs: &[Arc<T>],
    successes: &[Arc<T>],
    value_diff: Option<ValueDifference<T>>,
) -> Result<Vec<Arc<T>>, PoolError> {
    if let Some(diff) = value_diff {
        match catch_unwind(AssertUnwindSafe(|| diff(inputs, successes))) {
            Ok(fail_list) => return Ok(fail_list),
            Err(payload) => {
                tracing::warn!(
                    "Value comparison failed ({}), falling back to identity",
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    catch_unwind(AssertUnwindSafe(|| identity_difference(inputs, successes)))
        .map_err(|payload| PoolError::Aggregation(panic_message(payload.as_ref())))
}

/// Merges worker outcomes, in whatever order they arrive, into one report
pub struct Aggregator<T, R, D> {
    num_results: usize,
    success: Vec<Arc<T>>,
    result_lists: Vec<Vec<R>>,
    diagnostics: Vec<D>,
}

impl<T, R, D> Aggregator<T, R, D> {
    pub fn new(num_results: usize) -> Self {
        Self {
            num_results,
            success: Vec::new(),
            result_lists: (0..num_results).map(|_| Vec::new()).collect(),
            diagnostics: Vec::new(),
        }
    }

    /// Fold one outcome in. Outcomes breaking the channel contract are rejected whole.
    pub fn absorb(&mut self, index: usize, outcome: WorkerOutcome<T, R, D>) -> Result<(), PoolError> {
        outcome
            .check_channels(self.num_results)
            .map_err(|message| PoolError::worker(index, message))?;

        let WorkerOutcome {
            success,
            results,
            diagnostics,
        } = outcome;

        self.success.extend(success);
        for (merged, channel) in self.result_lists.iter_mut().zip(results) {
            merged.extend(channel);
        }
        self.diagnostics.extend(diagnostics);
        Ok(())
    }

    pub fn success_count(&self) -> usize {
        self.success.len()
    }

    /// Decide overall success against the original input
    pub fn finish(self, inputs: &[Arc<T>], value_diff: Option<ValueDifference<T>>) -> RunOutcome<T, R, D> {
        tracing::info!(
            "Input task length {} success length {} result lists {} diagnostics {}",
            inputs.len(),
            self.success.len(),
            self.result_lists.len(),
            self.diagnostics.len()
        );

        if inputs.len() == self.success.len() {
            tracing::info!(
                "Complete run - input task length {} success length {}",
                inputs.len(),
                self.success.len()
            );
            return RunOutcome {
                ok: true,
                fail_list: Vec::new(),
                result_lists: self.result_lists,
                diagnostics: self.diagnostics,
                error: None,
            };
        }

        let (fail_list, error) = match fail_set(inputs, &self.success, value_diff) {
            Ok(fail_list) => (fail_list, None),
            Err(e) => {
                tracing::error!("Failing with {}", e);
                (Vec::new(), Some(e))
            }
        };

        tracing::info!(
            "Incomplete run - input task length {} success length {} fail list {}",
            inputs.len(),
            self.success.len(),
            fail_list.len()
        );

        RunOutcome {
            ok: false,
            fail_list,
            result_lists: self.result_lists,
            diagnostics: self.diagnostics,
            error,
        }
    }
}
