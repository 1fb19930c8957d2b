use crate::cli::Output;
use crate::config::MultiProcConfig;
use crate::error::PoolError;
use crate::logging::{LogScope, LogSink};
use crate::parallel::{ExecutionStrategy, MultiProcPool, Options, RunOutcome, Worker, WorkerOutcome};
use anyhow::{Result, bail};
use clap::{Args, ValueEnum};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

#[derive(Args)]
pub struct ReverseArgs {
    /// Strings per half of the batch; one half is accepted, the other rejected
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub count: usize,

    /// Worker threads (0 = twice the CPU cores); overrides pool.num_workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Items per partition (0 = one partition per worker); overrides the configured chunk size
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Execution strategy
    #[arg(short, long, value_enum, default_value_t = Mode::Sync)]
    pub mode: Mode,

    /// Funnel every log record of the run into this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Summary format
    #[arg(long, value_enum, default_value_t = SummaryFormat::Text)]
    pub format: SummaryFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Sync,
    Async,
}

impl From<Mode> for ExecutionStrategy {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Sync => ExecutionStrategy::Synchronous,
            Mode::Async => ExecutionStrategy::Asynchronous,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SummaryFormat {
    Text,
    Json,
}

/// Reverses every string that does not match `rejected`.
///
/// Channel 0 holds the reversed string, channel 1 the reversed string followed
/// by the original; diagnostics are the lengths of channel 1 values.
pub struct Reverser {
    rejected: Regex,
}

impl Reverser {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            rejected: Regex::new(pattern)?,
        })
    }
}

impl Worker<String, String, usize> for Reverser {
    fn run(
        &self,
        partition: &[Arc<String>],
        worker_name: &str,
        _options: &Options,
        _working_dir: &Path,
    ) -> Result<WorkerOutcome<String, String, usize>> {
        let mut outcome = WorkerOutcome::empty(2);

        for item in partition {
            if self.rejected.is_match(item) {
                continue;
            }
            let reversed: String = item.chars().rev().collect();
            let joined = format!("{reversed}{item}");
            outcome.diagnostics.push(joined.len());
            outcome.success.push(Arc::clone(item));
            outcome.results[0].push(reversed);
            outcome.results[1].push(joined);
        }

        tracing::debug!(
            "{} partition length {} success length {}",
            worker_name,
            partition.len(),
            outcome.success.len()
        );
        Ok(outcome)
    }
}

/// `count` rejected strings followed by `count` accepted ones.
///
/// Accepted strings are octal renderings, so they never contain an 8 or 9.
pub fn generate_batch(count: usize) -> Vec<String> {
    let mut batch: Vec<String> = (0..count).map(|i| format!("9{i:08o}")).collect();
    batch.extend((0..count).map(|i| format!("{i:08o}")));
    batch
}

#[derive(Debug, Serialize)]
struct RunSummary {
    mode: &'static str,
    ok: bool,
    inputs: usize,
    failed: usize,
    result_lengths: Vec<usize>,
    diagnostics: usize,
    elapsed_ms: u128,
    error: Option<String>,
}

impl RunSummary {
    fn new(
        strategy: ExecutionStrategy,
        inputs: usize,
        outcome: &RunOutcome<String, String, usize>,
        elapsed_ms: u128,
    ) -> Self {
        Self {
            mode: strategy.name(),
            ok: outcome.ok,
            inputs,
            failed: outcome.fail_list.len(),
            result_lengths: outcome.result_lists.iter().map(Vec::len).collect(),
            diagnostics: outcome.diagnostics.len(),
            elapsed_ms,
            error: outcome.error.as_ref().map(ToString::to_string),
        }
    }
}

pub fn execute(args: ReverseArgs, custom_config: Option<&str>, output: &Output) -> Result<()> {
    let config = MultiProcConfig::load_with_custom_config(custom_config)?;
    let settings = config.pool_settings()?;
    let strategy = ExecutionStrategy::from(args.mode);

    let mut run_options = settings.run_options(strategy);
    if let Some(workers) = args.workers {
        run_options = run_options.workers(workers);
    }
    if let Some(chunk_size) = args.chunk_size {
        run_options = run_options.chunk_size(chunk_size);
    }
    run_options = run_options.results(2);

    let mut pool: MultiProcPool<String, String, usize> = MultiProcPool::hashable();
    pool.configure(Reverser::new("[8-9]")?, Options::new(), settings.working_dir.clone());

    let scope = match &args.log_file {
        Some(path) => {
            let log_settings = config.log_settings()?;
            let scope = LogScope::enter(
                LogSink::File(path.clone()),
                &log_settings.format,
                log_settings.level()?,
            )
            .map_err(|e| PoolError::Logging(format!("{e:#}")))?;
            pool.with_logger(&scope.logger());
            Some(scope)
        }
        None => None,
    };

    let batch = generate_batch(args.count);
    let inputs = batch.len();
    output.verbose(&format!(
        "Dispatching {} items ({} run, {} workers requested)",
        inputs,
        strategy.name(),
        run_options.num_workers
    ));

    let started = Instant::now();
    let outcome = pool.run(strategy, batch, run_options);
    let summary = RunSummary::new(strategy, inputs, &outcome, started.elapsed().as_millis());

    if let Some(scope) = scope {
        scope.exit();
    }

    match args.format {
        SummaryFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        SummaryFormat::Text => print_summary(&summary, args.log_file.as_deref(), output),
    }

    if let Some(error) = outcome.error {
        bail!(error);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, log_file: Option<&Path>, output: &Output) {
    output.header("Reverse run");
    output.table_row("Mode", summary.mode);
    output.table_row("Inputs", &summary.inputs.to_string());
    output.table_row(
        "Result lengths",
        &summary
            .result_lengths
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
    );
    output.table_row("Diagnostics", &summary.diagnostics.to_string());
    output.table_row("Elapsed", &format!("{} ms", summary.elapsed_ms));
    if let Some(path) = log_file {
        output.info(&format!("Log records written to {}", path.display()));
    }

    match (&summary.error, summary.ok) {
        (Some(error), _) => output.error(&format!("Batch failed: {}", error)),
        (None, true) => output.success("Every item processed successfully"),
        (None, false) => output.warning(&format!("{} items were rejected", summary.failed)),
    }
}
