use std::sync::Arc;

/// Resolve the effective worker count for a batch of `work_count` items.
///
/// `requested == 0` selects twice the available CPU cores. The result never
/// exceeds the number of items and is always at least 1.
pub fn resolve_workers(requested: usize, work_count: usize) -> usize {
    let workers = if requested < 1 {
        num_cpus::get() * 2
    } else {
        requested
    };

    std::cmp::max(1, std::cmp::min(workers, work_count))
}

/// Number of partitions for `work_count` items.
///
/// Both `chunk_size` and `num_workers` are clamped to the item count first.
/// A zero chunk size falls back to one partition per worker, otherwise the
/// items are split into `work_count / chunk_size` partitions.
pub fn partition_count(work_count: usize, num_workers: usize, chunk_size: usize) -> usize {
    if work_count == 0 {
        return 0;
    }

    let num_workers = std::cmp::min(num_workers, work_count);
    let chunk_size = std::cmp::min(chunk_size, work_count);

    let count = if chunk_size == 0 {
        num_workers
    } else {
        work_count / chunk_size
    };

    std::cmp::max(1, count)
}

/// Split `items` into `count` partitions round-robin: item `i` lands in partition `i % count`.
pub fn partition<T>(items: &[Arc<T>], count: usize) -> Vec<Vec<Arc<T>>> {
    if count == 0 {
        return Vec::new();
    }

    let mut partitions: Vec<Vec<Arc<T>>> = (0..count)
        .map(|_| Vec::with_capacity(items.len() / count + 1))
        .collect();

    for (index, item) in items.iter().enumerate() {
        partitions[index % count].push(Arc::clone(item));
    }

    partitions
}
