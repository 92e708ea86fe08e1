//! Stress tests for FlatDB stores.
//!
//! These helpers drive a store under heavy load and concurrent access.

use flatdb_core::{KeyStore, OpenMode, StoreOptions};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let secs = duration.as_secs_f64();
        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second: if secs > 0.0 { total as f64 / secs } else { 0.0 },
        }
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {name} ===");
        println!("Operations: {} ({} failed)", self.total_ops, self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform.
    pub operations: usize,
    /// Number of concurrent threads (for concurrent tests).
    pub threads: usize,
    /// Size of each value in bytes.
    pub value_size: usize,
    /// Number of distinct keys.
    pub key_count: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            value_size: 256,
            key_count: 1_000,
        }
    }
}

fn stress_key(i: usize) -> Vec<u8> {
    format!("stress-{i:06}").into_bytes()
}

fn populate(store: &KeyStore, config: &StressConfig) {
    let data = vec![0xABu8; config.value_size];
    for i in 0..config.key_count {
        store
            .set_value(&stress_key(i), &data)
            .expect("Failed to populate store");
    }
}

/// Run a sequential write stress test.
pub fn stress_sequential_writes(store: &KeyStore, config: &StressConfig) -> StressTestResult {
    let data = vec![0xABu8; config.value_size];

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        match store.set_value(&stress_key(i % config.key_count), &data) {
            Ok(()) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a sequential read stress test. Every read must find its key.
pub fn stress_sequential_reads(store: &KeyStore, config: &StressConfig) -> StressTestResult {
    populate(store, config);

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        match store.get_value(&stress_key(i % config.key_count), 0) {
            Some(_) => successful += 1,
            None => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a mixed set/read/remove stress test.
///
/// Removing a key that is already gone counts as a failure.
pub fn stress_mixed_operations(store: &KeyStore, config: &StressConfig) -> StressTestResult {
    let data = vec![0xABu8; config.value_size];

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let key = stress_key(i % config.key_count);
        let ok = match i % 3 {
            0 => store.set_value(&key, &data).is_ok(),
            1 => {
                let _ = store.get_value(&key, 0);
                true
            }
            _ => store.remove_values(&key).is_ok(),
        };
        if ok {
            successful += 1;
        } else {
            failed += 1;
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a concurrent read stress test over persistent handles.
///
/// The database at `path` is populated first. Each thread then opens its own
/// persistent store on the same file, so all threads share one connection.
pub fn stress_concurrent_reads(path: &Path, driver: &str, config: &StressConfig) -> StressTestResult {
    let options = StoreOptions::with_driver(driver).persistent(true);
    let writer = KeyStore::open(path, OpenMode::CREATE, options.clone()).expect("Failed to open store");
    populate(&writer, config);
    writer.sync().expect("Failed to sync store");
    drop(writer);

    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let ops_per_thread = config.operations / config.threads.max(1);

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let options = options.clone();
            let path = path.to_path_buf();
            let key_count = config.key_count;

            thread::spawn(move || {
                let store =
                    KeyStore::open(&path, OpenMode::READ, options).expect("Failed to open store");
                for i in 0..ops_per_thread {
                    let key = stress_key((t * ops_per_thread + i) % key_count);
                    if store.exists(&key) {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Run a write-then-optimize stress test: churn every key, then compact.
pub fn stress_optimize_churn(store: &KeyStore, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for round in 0..config.operations / config.key_count.max(1) {
        let data = vec![round as u8; config.value_size];
        for i in 0..config.key_count {
            match store.set_value(&stress_key(i), &data) {
                Ok(()) => successful += 1,
                Err(_) => failed += 1,
            }
        }
    }
    match store.optimize() {
        Ok(()) => successful += 1,
        Err(_) => failed += 1,
    }

    StressTestResult::new(successful, failed, start.elapsed())
}
