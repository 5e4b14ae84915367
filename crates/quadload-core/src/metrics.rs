//! Throughput counters shared between the producer and writer workers.
//!
//! All counters are atomics; workers report one [`BatchReport`] per
//! completed batch and get back the line to log.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::progress::fmt_num;

/// Outcome of one batch's serialize + insert cycle
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub batch_no: u64,
    pub statements: usize,
    pub serialized: usize,
    pub serialize_errors: usize,
    pub inserted: usize,
    /// Documents the store already held (duplicate `_id`)
    pub duplicates: usize,
    /// Per-document failures other than duplicates
    pub write_failures: usize,
    /// Serialized documents never written because the whole batch failed
    pub lost: usize,
    pub failed: bool,
    pub serialize_time: Duration,
    pub insert_time: Duration,
}

/// Documents per second, 0 for an empty interval
pub fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

#[derive(Default)]
pub struct Metrics {
    started: OnceLock<Instant>,
    statements: AtomicU64,
    batches_dispatched: AtomicU64,
    batches_completed: AtomicU64,
    batches_failed: AtomicU64,
    batch_statements: AtomicU64,
    serialized: AtomicU64,
    serialize_errors: AtomicU64,
    inserted: AtomicU64,
    duplicates: AtomicU64,
    write_failures: AtomicU64,
    lost: AtomicU64,
    serialize_nanos: AtomicU64,
    insert_nanos: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the stream clock. Later calls are ignored.
    pub fn start(&self) {
        let _ = self.started.set(Instant::now());
    }

    pub fn elapsed(&self) -> Duration {
        self.started.get().map(Instant::elapsed).unwrap_or_default()
    }

    /// Count one statement handed in by the source; returns the new total
    pub fn record_statement(&self) -> u64 {
        self.statements.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// A batch of `len` statements left the producer; returns its number.
    pub fn record_dispatch(&self, len: usize) -> u64 {
        let in_flight = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_in_flight.fetch_max(in_flight, Ordering::AcqRel);
        self.batch_statements
            .fetch_add(len as u64, Ordering::Relaxed);
        self.batches_dispatched.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Fold a finished batch into the totals and build its progress line
    pub fn record_completion(&self, report: &BatchReport) -> String {
        self.serialized
            .fetch_add(report.serialized as u64, Ordering::Relaxed);
        self.serialize_errors
            .fetch_add(report.serialize_errors as u64, Ordering::Relaxed);
        self.duplicates
            .fetch_add(report.duplicates as u64, Ordering::Relaxed);
        self.write_failures
            .fetch_add(report.write_failures as u64, Ordering::Relaxed);
        self.lost.fetch_add(report.lost as u64, Ordering::Relaxed);
        self.serialize_nanos
            .fetch_add(duration_nanos(report.serialize_time), Ordering::Relaxed);
        self.insert_nanos
            .fetch_add(duration_nanos(report.insert_time), Ordering::Relaxed);
        if report.failed {
            self.batches_failed.fetch_add(1, Ordering::Relaxed);
        }
        let total_inserted =
            self.inserted.fetch_add(report.inserted as u64, Ordering::Relaxed) + report.inserted as u64;
        self.batches_completed.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_sub(1, Ordering::AcqRel);

        let snap = self.snapshot();
        format!(
            "batch {}: {} statements | inserted {} total | serialize {:.0}/s (avg {:.0}/s) | insert {:.0}/s (avg {:.0}/s)",
            report.batch_no,
            fmt_num(report.statements),
            fmt_num(total_inserted as usize),
            rate(report.serialized as u64, report.serialize_time),
            snap.serialize_rate(),
            rate(report.inserted as u64, report.insert_time),
            snap.insert_rate(),
        )
    }

    /// Batches dispatched but not yet completed
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            statements: self.statements.load(Ordering::Relaxed),
            batches_dispatched: self.batches_dispatched.load(Ordering::Relaxed),
            batches_completed: self.batches_completed.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            batch_statements: self.batch_statements.load(Ordering::Relaxed),
            serialized: self.serialized.load(Ordering::Relaxed),
            serialize_errors: self.serialize_errors.load(Ordering::Relaxed),
            inserted: self.inserted.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            lost: self.lost.load(Ordering::Relaxed),
            serialize_time: Duration::from_nanos(self.serialize_nanos.load(Ordering::Relaxed)),
            insert_time: Duration::from_nanos(self.insert_nanos.load(Ordering::Relaxed)),
            peak_in_flight: self.peak_in_flight.load(Ordering::Acquire),
            elapsed: self.elapsed(),
        }
    }
}

fn duration_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

/// Point-in-time copy of the counters; also the end-of-run summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub statements: u64,
    pub batches_dispatched: u64,
    pub batches_completed: u64,
    pub batches_failed: u64,
    /// Statements contained in dispatched batches
    pub batch_statements: u64,
    pub serialized: u64,
    pub serialize_errors: u64,
    pub inserted: u64,
    pub duplicates: u64,
    pub write_failures: u64,
    pub lost: u64,
    /// Serialize time summed over all workers
    pub serialize_time: Duration,
    /// Insert time summed over all workers
    pub insert_time: Duration,
    pub peak_in_flight: usize,
    pub elapsed: Duration,
}

impl Snapshot {
    /// Cumulative serialize rate per worker-second
    pub fn serialize_rate(&self) -> f64 {
        rate(self.serialized, self.serialize_time)
    }

    /// Cumulative insert rate per worker-second
    pub fn insert_rate(&self) -> f64 {
        rate(self.inserted, self.insert_time)
    }

    /// End-to-end statements per wall-clock second
    pub fn throughput(&self) -> f64 {
        rate(self.statements, self.elapsed)
    }

    /// Log the end-of-run summary
    pub fn log(&self) {
        log::info!("=== Load Summary ===");
        log::info!(
            "Statements: {} in {} batches ({} failed)",
            fmt_num(self.statements as usize),
            fmt_num(self.batches_completed as usize),
            self.batches_failed
        );
        log::info!(
            "Documents: {} inserted, {} duplicates, {} write errors, {} skipped, {} lost",
            fmt_num(self.inserted as usize),
            fmt_num(self.duplicates as usize),
            fmt_num(self.write_failures as usize),
            fmt_num(self.serialize_errors as usize),
            fmt_num(self.lost as usize)
        );
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
        if self.statements > 0 {
            log::info!(
                "Throughput: {:.0} statements/sec (serialize {:.0}/s, insert {:.0}/s)",
                self.throughput(),
                self.serialize_rate(),
                self.insert_rate()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_handles_zero_duration() {
        assert_eq!(rate(100, Duration::ZERO), 0.0);
        assert_eq!(rate(100, Duration::from_secs(2)), 50.0);
    }

    #[test]
    fn dispatch_and_completion_counts() {
        let m = Metrics::new();
        m.start();
        for _ in 0..5 {
            m.record_statement();
        }
        let first = m.record_dispatch(3);
        let second = m.record_dispatch(2);
        assert_eq!((first, second), (1, 2));
        assert_eq!(m.in_flight(), 2);

        m.record_completion(&BatchReport {
            batch_no: first,
            statements: 3,
            serialized: 3,
            inserted: 2,
            duplicates: 1,
            serialize_time: Duration::from_millis(10),
            insert_time: Duration::from_millis(20),
            ..Default::default()
        });
        m.record_completion(&BatchReport {
            batch_no: second,
            statements: 2,
            serialized: 2,
            lost: 2,
            failed: true,
            ..Default::default()
        });

        let snap = m.snapshot();
        assert_eq!(snap.statements, 5);
        assert_eq!(snap.batch_statements, 5);
        assert_eq!(snap.batches_dispatched, 2);
        assert_eq!(snap.batches_completed, 2);
        assert_eq!(snap.batches_failed, 1);
        assert_eq!(snap.inserted, 2);
        assert_eq!(snap.duplicates, 1);
        assert_eq!(snap.lost, 2);
        assert_eq!(snap.peak_in_flight, 2);
        assert_eq!(m.in_flight(), 0);
    }

    #[test]
    fn completion_line_mentions_batch() {
        let m = Metrics::new();
        let n = m.record_dispatch(1_000);
        let line = m.record_completion(&BatchReport {
            batch_no: n,
            statements: 1_000,
            serialized: 1_000,
            inserted: 1_000,
            serialize_time: Duration::from_millis(100),
            insert_time: Duration::from_millis(500),
            ..Default::default()
        });
        assert!(line.starts_with("batch 1: 1,000 statements"));
        assert!(line.contains("serialize 10000/s"));
        assert!(line.contains("insert 2000/s"));
    }

    #[test]
    fn elapsed_zero_before_start() {
        let m = Metrics::new();
        assert_eq!(m.elapsed(), Duration::ZERO);
        m.start();
        std::thread::sleep(Duration::from_millis(5));
        assert!(m.elapsed() >= Duration::from_millis(5));
    }
}
