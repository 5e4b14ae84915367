//! Bounded writer pool: serialize + bulk-insert batches on a fixed set of
//! worker threads, with one permit per in-flight batch.
//!
//! `submit` blocks the producer while every worker is busy, so at most
//! `workers × batch_size` statements are buffered at any time. Batches may
//! complete out of submission order.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use crate::accumulator::BatchSink;
use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::metrics::{BatchReport, Metrics};
use crate::retry::{RetryPolicy, retry_with_backoff};
use crate::semaphore::Semaphore;
use crate::serializer::Serializer;
use crate::statement::Statement;
use crate::store::{DocumentStore, InsertOptions};

/// State every worker reads; never mutated after construction
struct Shared<S> {
    store: Arc<S>,
    serializer: Serializer,
    collection: String,
    retry: RetryPolicy,
    metrics: Arc<Metrics>,
}

pub struct WriterPool<S: DocumentStore> {
    shared: Arc<Shared<S>>,
    permits: Semaphore,
    workers: rayon::ThreadPool,
}

impl<S: DocumentStore> WriterPool<S> {
    pub fn new(
        store: Arc<S>,
        serializer: Serializer,
        config: &LoaderConfig,
        metrics: Arc<Metrics>,
    ) -> Result<Self, LoadError> {
        config.validate()?;
        let workers = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("quadload-writer-{i}"))
            .build()
            .map_err(|e| LoadError::Config(format!("failed to create worker pool: {e}")))?;
        Ok(Self {
            shared: Arc::new(Shared {
                store,
                serializer,
                collection: config.collection.clone(),
                retry: config.retry,
                metrics,
            }),
            permits: Semaphore::new(config.workers),
            workers,
        })
    }

    /// Hand a batch to a worker, blocking until one is free.
    ///
    /// Empty batches are ignored.
    pub fn submit(&self, batch: Vec<Statement>) {
        if batch.is_empty() {
            return;
        }
        let permit = self.permits.acquire();
        let batch_no = self.shared.metrics.record_dispatch(batch.len());
        let shared = Arc::clone(&self.shared);
        self.workers.spawn(move || {
            let _permit = permit;
            let len = batch.len();
            let run = panic::catch_unwind(AssertUnwindSafe(|| shared.process(batch_no, batch)));
            if run.is_err() {
                log::error!("batch {batch_no}: worker panicked, {len} statements not written");
                shared.metrics.record_completion(&BatchReport {
                    batch_no,
                    statements: len,
                    lost: len,
                    failed: true,
                    ..Default::default()
                });
            }
        });
    }

    /// Block until every submitted batch has completed.
    pub fn drain(&self) {
        self.permits.wait_idle();
    }

    /// Batches currently being processed
    pub fn in_flight(&self) -> usize {
        self.permits.in_use()
    }

    pub fn workers(&self) -> usize {
        self.permits.capacity()
    }
}

impl<S: DocumentStore> BatchSink for WriterPool<S> {
    fn submit(&self, batch: Vec<Statement>) {
        WriterPool::submit(self, batch);
    }
}

impl<S: DocumentStore> Drop for WriterPool<S> {
    fn drop(&mut self) {
        self.drain();
    }
}

impl<S: DocumentStore> Shared<S> {
    fn process(&self, batch_no: u64, batch: Vec<Statement>) {
        let statements = batch.len();
        let sw = Instant::now();
        let mut documents = Vec::with_capacity(statements);
        let mut serialize_errors = 0usize;
        for st in &batch {
            match self.serializer.serialize(st) {
                Ok(doc) => documents.push(doc),
                Err(e) => {
                    serialize_errors += 1;
                    log::error!("batch {batch_no}: skipping statement: {e}");
                }
            }
        }
        drop(batch);
        let serialize_time = sw.elapsed();

        let mut report = BatchReport {
            batch_no,
            statements,
            serialized: documents.len(),
            serialize_errors,
            serialize_time,
            ..Default::default()
        };

        if !documents.is_empty() {
            let sw = Instant::now();
            let label = format!("batch {batch_no}");
            let outcome = retry_with_backoff(&label, &self.retry, |attempt| {
                self.store
                    .bulk_insert(&self.collection, &documents, InsertOptions::UNORDERED)
                    .map(|res| (attempt, res))
            });
            report.insert_time = sw.elapsed();

            match outcome {
                Ok((attempt, res)) => {
                    let duplicates = res.duplicates();
                    report.inserted = res.inserted;
                    report.duplicates = duplicates;
                    report.write_failures = res.failures.len() - duplicates;
                    if let Some(first) = res.failures.first() {
                        if attempt > 0 && report.write_failures == 0 {
                            log::info!(
                                "batch {batch_no}: {duplicates} documents already present after retry"
                            );
                        } else {
                            log::error!(
                                "Bulk write error in batch {batch_no}. First message :: {}. {} total errors",
                                first.message,
                                res.failures.len()
                            );
                        }
                    }
                }
                Err(e) => {
                    log::error!(
                        "Error loading batch {batch_no} into store: {e}. {} documents not written",
                        documents.len()
                    );
                    report.lost = documents.len();
                    report.failed = true;
                }
            }
        }

        let line = self.metrics.record_completion(&report);
        log::info!("{line}");
    }
}
