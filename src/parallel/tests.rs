//! End-to-end batch run tests

use super::*;
use crate::error::PoolError;
use anyhow::{Result, bail};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Rejects strings containing an 8 or 9, reverses everything else
fn reverser(
    partition: &[Arc<String>],
    _worker_name: &str,
    _options: &Options,
    _working_dir: &Path,
) -> Result<WorkerOutcome<String, String, usize>> {
    let rejected = Regex::new("[8-9]")?;
    let mut success = Vec::new();
    let mut reversed = Vec::new();
    let mut shouted = Vec::new();
    let mut diagnostics = Vec::new();

    for item in partition {
        if rejected.is_match(item) {
            continue;
        }
        let flipped: String = item.chars().rev().collect();
        success.push(Arc::clone(item));
        shouted.push(format!("{flipped}!"));
        reversed.push(flipped);
        diagnostics.push(item.len());
    }

    Ok(WorkerOutcome::new(success, vec![reversed, shouted], diagnostics))
}

/// Octal renderings never contain 8 or 9; the prefixed half always does
fn mixed_batch(half: usize) -> Vec<String> {
    let mut data: Vec<String> = (0..half).map(|i| format!("9{i:08o}")).collect();
    data.extend((0..half).map(|i| format!("{i:08o}")));
    data
}

fn reverser_pool() -> MultiProcPool<String, String, usize> {
    let mut pool = MultiProcPool::hashable();
    pool.configure(reverser, Options::new(), ".");
    pool
}

fn sorted<T: Ord + Clone>(values: &[T]) -> Vec<T> {
    let mut values = values.to_vec();
    values.sort();
    values
}

#[test]
fn test_mixed_batch_synchronous() {
    let data = mixed_batch(5_000);
    let pool = reverser_pool();

    let outcome = pool.run_synchronous(data, RunOptions::new().workers(4).results(2).chunk_size(10));

    assert!(!outcome.ok);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.fail_list.len(), 5_000);
    assert!(outcome.fail_list.iter().all(|item| item.starts_with('9')));
    assert_eq!(outcome.result_lists.len(), 2);
    assert_eq!(outcome.result_lists[0].len(), 5_000);
    assert_eq!(outcome.result_lists[1].len(), 5_000);
    assert_eq!(outcome.diagnostics.len(), 5_000);
}

#[test]
fn test_mixed_batch_asynchronous_matches_synchronous() {
    let data = mixed_batch(5_000);
    let pool = reverser_pool();
    let options = RunOptions::new().workers(4).results(2).chunk_size(10);

    let sync = pool.run_synchronous(data.clone(), options);
    let async_run = pool.run_asynchronous(data, options);

    assert!(!async_run.ok);
    assert_eq!(async_run.fail_list.len(), 5_000);
    assert_eq!(async_run.result_lists[0].len(), 5_000);
    assert_eq!(async_run.result_lists[1].len(), 5_000);

    assert_eq!(sorted(&sync.result_lists[0]), sorted(&async_run.result_lists[0]));
    assert_eq!(sorted(&sync.result_lists[1]), sorted(&async_run.result_lists[1]));
    let sync_fail: Vec<String> = sync.fail_list.iter().map(|s| s.to_string()).collect();
    let async_fail: Vec<String> = async_run.fail_list.iter().map(|s| s.to_string()).collect();
    assert_eq!(sorted(&sync_fail), sorted(&async_fail));
}

#[test]
fn test_all_items_accepted() {
    let mut pool: MultiProcPool<u32, u32, String> = MultiProcPool::hashable();
    pool.configure(
        |partition: &[Arc<u32>], _: &str, _: &Options, _: &Path| -> Result<WorkerOutcome<u32, u32, String>> {
            let squares = partition.iter().map(|v| **v * **v).collect();
            Ok(WorkerOutcome::new(partition.to_vec(), vec![squares], Vec::new()))
        },
        Options::new(),
        ".",
    );

    for strategy in [ExecutionStrategy::Synchronous, ExecutionStrategy::Asynchronous] {
        let outcome = pool.run(strategy, 1..=9u32, RunOptions::new().workers(3));
        assert!(outcome.ok, "{} run failed", strategy.name());
        assert!(outcome.fail_list.is_empty());
        assert_eq!(sorted(&outcome.result_lists[0]), vec![1, 4, 9, 16, 25, 36, 49, 64, 81]);
    }
}

#[test]
fn test_asynchronous_unit_chunks_keep_input_order() {
    let pool = reverser_pool();
    let data: Vec<String> = (0..50).map(|i| format!("{i:o}")).collect();

    let outcome = pool.run_asynchronous(data.clone(), RunOptions::new().workers(4).results(2).chunk_size(1));

    assert!(outcome.ok);
    let expected: Vec<String> = data.iter().map(|s| s.chars().rev().collect()).collect();
    assert_eq!(outcome.result_lists[0], expected);
}

#[test]
fn test_empty_input() {
    let pool = reverser_pool();

    for strategy in [ExecutionStrategy::Synchronous, ExecutionStrategy::Asynchronous] {
        let outcome = pool.run(strategy, Vec::<String>::new(), RunOptions::new().results(3));
        assert!(outcome.ok);
        assert!(outcome.fail_list.is_empty());
        assert_eq!(outcome.result_lists, vec![Vec::<String>::new(); 3]);
        assert!(outcome.diagnostics.is_empty());
        assert!(outcome.error.is_none());
    }
}

#[test]
fn test_workers_clamped_to_item_count() {
    let mut pool: MultiProcPool<u32, u32, String> = MultiProcPool::new();
    pool.configure(
        |partition: &[Arc<u32>], _: &str, _: &Options, _: &Path| -> Result<WorkerOutcome<u32, u32, String>> {
            let thread = std::thread::current().name().unwrap_or("unnamed").to_string();
            let values = partition.iter().map(|v| **v).collect();
            Ok(WorkerOutcome::new(partition.to_vec(), vec![values], vec![thread]))
        },
        Options::new(),
        ".",
    );

    for strategy in [ExecutionStrategy::Synchronous, ExecutionStrategy::Asynchronous] {
        let outcome = pool.run(strategy, [7u32, 8, 9], RunOptions::new().workers(16).chunk_size(1));
        assert!(outcome.ok);
        assert_eq!(sorted(&outcome.result_lists[0]), vec![7, 8, 9]);

        let threads: HashSet<&String> = outcome.diagnostics.iter().collect();
        assert!(!threads.is_empty() && threads.len() <= 3, "threads used: {threads:?}");
    }
}

#[test]
fn test_default_worker_count_runs() {
    let pool = reverser_pool();
    let outcome = pool.run_synchronous(mixed_batch(20), RunOptions::new().results(2));

    assert!(!outcome.ok);
    assert_eq!(outcome.fail_list.len(), 20);
    assert_eq!(outcome.result_lists[0].len(), 20);
}

#[test]
fn test_every_item_accounted_for() {
    let data = mixed_batch(300);
    let pool = reverser_pool();

    let outcome = pool.run_synchronous(data.clone(), RunOptions::new().workers(5).results(2).chunk_size(7));

    let failed: HashSet<String> = outcome.fail_list.iter().map(|s| s.to_string()).collect();
    let succeeded: HashSet<String> = outcome.result_lists[0]
        .iter()
        .map(|s| s.chars().rev().collect())
        .collect();

    assert!(failed.is_disjoint(&succeeded));
    let covered: HashSet<String> = failed.union(&succeeded).cloned().collect();
    let inputs: HashSet<String> = data.into_iter().collect();
    assert_eq!(covered, inputs);
}

#[test]
fn test_duplicate_rejects_reported_once() {
    let pool = reverser_pool();
    let data = vec!["98".to_string(), "12".to_string(), "98".to_string()];

    let outcome = pool.run_synchronous(data, RunOptions::new().workers(2).results(2));

    assert!(!outcome.ok);
    assert_eq!(outcome.fail_list.len(), 1);
    assert_eq!(*outcome.fail_list[0], "98");
}

/// Value-equal to its twin but deliberately not hashable
#[derive(Debug, PartialEq)]
struct Opaque(u32);

#[test]
fn test_identity_fail_set_for_unhashable_items() {
    let first = Arc::new(Opaque(1));
    let second = Arc::new(Opaque(1));
    let third = Arc::new(Opaque(2));

    let mut pool: MultiProcPool<Opaque, u32, ()> = MultiProcPool::new();
    pool.configure(
        |partition: &[Arc<Opaque>], _: &str, _: &Options, _: &Path| -> Result<WorkerOutcome<Opaque, u32, ()>> {
            let success: Vec<Arc<Opaque>> = partition.iter().filter(|item| item.0 == 2).cloned().collect();
            let values = success.iter().map(|item| item.0).collect();
            Ok(WorkerOutcome::new(success, vec![values], Vec::new()))
        },
        Options::new(),
        ".",
    );

    let outcome = pool.run_asynchronous(
        vec![Arc::clone(&first), Arc::clone(&second), Arc::clone(&third)],
        RunOptions::new().workers(2),
    );

    assert!(!outcome.ok);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.fail_list.len(), 2);
    assert!(outcome.fail_list.iter().any(|item| Arc::ptr_eq(item, &first)));
    assert!(outcome.fail_list.iter().any(|item| Arc::ptr_eq(item, &second)));
    assert_eq!(outcome.result_lists, vec![vec![2]]);
}

#[test]
fn test_worker_error_fails_batch() {
    let mut pool: MultiProcPool<u32, u32, ()> = MultiProcPool::hashable();
    pool.configure(
        |partition: &[Arc<u32>], _: &str, _: &Options, _: &Path| -> Result<WorkerOutcome<u32, u32, ()>> {
            if partition.iter().any(|v| **v == 13) {
                bail!("unlucky item");
            }
            let values = partition.iter().map(|v| **v).collect();
            Ok(WorkerOutcome::new(partition.to_vec(), vec![values], Vec::new()))
        },
        Options::new(),
        ".",
    );

    for strategy in [ExecutionStrategy::Synchronous, ExecutionStrategy::Asynchronous] {
        let outcome = pool.run(strategy, 0..40u32, RunOptions::new().workers(4).chunk_size(2));
        assert!(!outcome.ok);
        assert!(outcome.fail_list.is_empty());
        assert!(outcome.result_lists.is_empty());
        match outcome.error {
            Some(PoolError::WorkerExecution { message, .. }) => assert!(message.contains("unlucky item")),
            other => panic!("expected worker execution error, got {other:?}"),
        }
    }
}

#[test]
fn test_worker_panic_fails_batch() {
    let mut pool: MultiProcPool<u32, u32, ()> = MultiProcPool::hashable();
    pool.configure(
        |partition: &[Arc<u32>], _: &str, _: &Options, _: &Path| -> Result<WorkerOutcome<u32, u32, ()>> {
            assert!(partition.iter().all(|v| **v != 3), "cannot handle three");
            Ok(WorkerOutcome::new(partition.to_vec(), vec![vec![0; partition.len()]], Vec::new()))
        },
        Options::new(),
        ".",
    );

    let outcome = pool.run_asynchronous(0..10u32, RunOptions::new().workers(3));

    assert!(!outcome.ok);
    assert_eq!(outcome.error.as_ref().map(PoolError::kind), Some("worker-execution"));
    assert!(outcome.result_lists.is_empty());
}

#[test]
fn test_ragged_outcome_fails_batch() {
    let mut pool: MultiProcPool<u32, u32, ()> = MultiProcPool::hashable();
    pool.configure(
        |partition: &[Arc<u32>], _: &str, _: &Options, _: &Path| -> Result<WorkerOutcome<u32, u32, ()>> {
            // One value short on the first channel
            let values = partition.iter().skip(1).map(|v| **v).collect();
            Ok(WorkerOutcome::new(partition.to_vec(), vec![values], Vec::new()))
        },
        Options::new(),
        ".",
    );

    let outcome = pool.run_synchronous(0..6u32, RunOptions::new().workers(2));

    assert!(!outcome.ok);
    assert!(matches!(outcome.error, Some(PoolError::WorkerExecution { .. })));
}

#[test]
fn test_missing_channels_fail_batch() {
    let pool = reverser_pool();

    let outcome = pool.run_synchronous(mixed_batch(4), RunOptions::new().workers(2).results(3));

    assert!(!outcome.ok);
    assert!(matches!(outcome.error, Some(PoolError::WorkerExecution { .. })));
}

#[test]
fn test_unconfigured_pool_reports_configuration_error() {
    let pool: MultiProcPool<u32, u32, ()> = MultiProcPool::new();
    assert!(!pool.is_configured());

    let outcome = pool.run_synchronous(0..5u32, RunOptions::new());
    assert!(!outcome.ok);
    assert!(matches!(outcome.error, Some(PoolError::Configuration(_))));

    // The configuration check comes before the empty-input shortcut
    let outcome = pool.run_asynchronous(Vec::<u32>::new(), RunOptions::new());
    assert!(!outcome.ok);
    assert_eq!(outcome.error.as_ref().map(PoolError::kind), Some("configuration"));
}

#[test]
fn test_options_and_working_dir_reach_worker() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut options = Options::new();
    options.insert("prefix".into(), serde_json::json!("item-"));

    let mut pool: MultiProcPool<u32, String, String> = MultiProcPool::hashable();
    pool.configure(
        |partition: &[Arc<u32>], worker_name: &str, options: &Options, working_dir: &Path| -> Result<WorkerOutcome<u32, String, String>> {
            let prefix = options.get("prefix").and_then(|v| v.as_str()).unwrap_or_default();
            let labels = partition.iter().map(|v| format!("{prefix}{v}")).collect();
            let seen = format!("{worker_name}:{}", working_dir.display());
            Ok(WorkerOutcome::new(partition.to_vec(), vec![labels], vec![seen]))
        },
        options,
        dir.path(),
    );

    let outcome = pool.run_synchronous(1..=4u32, RunOptions::new().workers(2).chunk_size(0));

    assert!(outcome.ok);
    assert_eq!(sorted(&outcome.result_lists[0]), vec!["item-1", "item-2", "item-3", "item-4"]);
    let expected = format!("{WORKER_NAME}:{}", dir.path().display());
    assert_eq!(outcome.diagnostics, vec![expected.clone(), expected]);
}

#[test]
fn test_rebinding_worker_between_runs() {
    let mut pool = reverser_pool();
    let first = pool.run_synchronous(mixed_batch(3), RunOptions::new().results(2));
    assert!(!first.ok);

    pool.set_worker(
        |partition: &[Arc<String>], _: &str, _: &Options, _: &Path| -> Result<WorkerOutcome<String, String, usize>> {
            let copies = partition.iter().map(|s| s.to_string()).collect();
            Ok(WorkerOutcome::new(partition.to_vec(), vec![copies], Vec::new()))
        },
    );
    let second = pool.run_synchronous(mixed_batch(3), RunOptions::new());
    assert!(second.ok);
    assert_eq!(second.result_lists[0].len(), 6);
}
