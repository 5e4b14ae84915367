//! Loader: wires accumulator, writer pool and store together and owns the
//! shutdown sequence.
//!
//! Shutdown always runs in this order: flush the last partial batch, drain
//! the pool, close the store. Closing earlier would abort in-flight inserts.

use std::sync::Arc;

use indicatif::ProgressBar;

use crate::accumulator::BatchAccumulator;
use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::handler::StatementHandler;
use crate::metrics::{Metrics, Snapshot};
use crate::pool::WriterPool;
use crate::progress::fmt_num;
use crate::serializer::Serializer;
use crate::statement::Statement;
use crate::store::DocumentStore;

/// Progress update interval (every N statements to avoid overhead)
const UPDATE_INTERVAL: u64 = 10_000;

pub struct Loader<S: DocumentStore> {
    accumulator: BatchAccumulator<WriterPool<S>>,
    store: Arc<S>,
    metrics: Arc<Metrics>,
    progress: ProgressBar,
    summary: Option<Snapshot>,
    closed: bool,
}

impl<S: DocumentStore> Loader<S> {
    /// Connect to the store and start the worker pool.
    ///
    /// Fails before any work starts when the store is unreachable or the
    /// configuration is invalid.
    pub fn new(store: Arc<S>, config: &LoaderConfig) -> Result<Self, LoadError> {
        let serializer = Serializer::new(config.serializer);
        Self::with_serializer(store, config, serializer)
    }

    /// Like [`Loader::new`] with a custom serializer (e.g. another WKT decoder)
    pub fn with_serializer(
        store: Arc<S>,
        config: &LoaderConfig,
        serializer: Serializer,
    ) -> Result<Self, LoadError> {
        config.validate()?;
        log::info!("Opening connection to document store");
        store.ping().map_err(LoadError::Connect)?;
        log::info!(
            "Loading into {} with {} workers, batch size {}",
            config.collection,
            config.workers,
            fmt_num(config.batch_size)
        );

        let metrics = Arc::new(Metrics::new());
        let pool = WriterPool::new(Arc::clone(&store), serializer, config, Arc::clone(&metrics))?;
        Ok(Self {
            accumulator: BatchAccumulator::new(pool, config.batch_size),
            store,
            metrics,
            progress: ProgressBar::hidden(),
            summary: None,
            closed: false,
        })
    }

    /// Report progress on `pb` (see [`ProgressContext::load_line`](crate::progress::ProgressContext::load_line))
    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.progress = pb;
        self
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Feed one statement. Blocks while every worker is busy and the buffer
    /// is full.
    pub fn add(&mut self, statement: Statement) {
        let seen = self.metrics.record_statement();
        self.accumulator.add(statement);
        if seen % UPDATE_INTERVAL == 0 {
            self.progress.set_position(seen);
            self.progress.set_message(format!(
                "{} batches in flight",
                self.accumulator.sink().in_flight()
            ));
        }
    }

    /// Run the shutdown sequence once; later calls are no-ops.
    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.accumulator.flush_remaining();
        self.progress.set_message("waiting for writers...");
        self.accumulator.sink().drain();
        if let Err(e) = self.store.close() {
            log::error!("Document store not closed properly: {e}");
        }
        self.progress.finish_and_clear();

        let summary = self.metrics.snapshot();
        summary.log();
        self.summary = Some(summary);
    }

    /// Flush, drain, close, and return the end-of-run summary.
    pub fn finish(mut self) -> Snapshot {
        self.shutdown();
        self.summary.take().unwrap_or_default()
    }

    /// Summary of a finished load (after `on_end`)
    pub fn summary(&self) -> Option<&Snapshot> {
        self.summary.as_ref()
    }
}

impl<S: DocumentStore> StatementHandler for Loader<S> {
    fn on_start(&mut self) {
        self.metrics.start();
    }

    fn handle(&mut self, statement: Statement) {
        self.add(statement);
    }

    fn on_end(&mut self) {
        self.shutdown();
    }
}

impl<S: DocumentStore> Drop for Loader<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::retry::RetryPolicy;
    use crate::document::Document;
    use crate::statement::Object;
    use crate::store::{BulkWriteResult, InsertOptions, MemoryStore};

    fn config(batch_size: usize, workers: usize) -> LoaderConfig {
        LoaderConfig {
            batch_size,
            workers,
            collection: "t".to_string(),
            retry: RetryPolicy::NONE,
            ..Default::default()
        }
    }

    #[test]
    fn loads_everything() {
        let store = Arc::new(MemoryStore::new());
        let mut loader = Loader::new(Arc::clone(&store), &config(3, 2)).unwrap();
        loader.on_start();
        for i in 0..10 {
            loader.handle(Statement::new(format!("s:{i}"), "p:b", Object::string("x")));
        }
        let summary = loader.finish();
        assert_eq!(summary.statements, 10);
        assert_eq!(summary.batches_completed, 4);
        assert_eq!(summary.inserted, 10);
        assert_eq!(store.len("t"), 10);
        assert!(store.is_closed());
    }

    #[test]
    fn on_end_then_finish_runs_once() {
        let store = Arc::new(MemoryStore::new());
        let mut loader = Loader::new(Arc::clone(&store), &config(100, 1)).unwrap();
        loader.handle(Statement::new("s", "p", Object::iri("o")));
        loader.on_end();
        assert!(store.is_closed());
        assert_eq!(loader.summary().map(|s| s.inserted), Some(1));
        let summary = loader.finish();
        assert_eq!(summary.inserted, 1);
    }

    struct Unreachable;

    impl DocumentStore for Unreachable {
        fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        fn bulk_insert(
            &self,
            _collection: &str,
            _documents: &[Document],
            _options: InsertOptions,
        ) -> Result<BulkWriteResult, StoreError> {
            unreachable!("no insert without a connection")
        }
    }

    #[test]
    fn unreachable_store_is_fatal() {
        let res = Loader::new(Arc::new(Unreachable), &config(10, 1));
        assert!(matches!(res, Err(LoadError::Connect(_))));
    }

    #[test]
    fn drop_runs_shutdown() {
        let store = Arc::new(MemoryStore::new());
        {
            let mut loader = Loader::new(Arc::clone(&store), &config(100, 2)).unwrap();
            loader.add(Statement::new("s", "p", Object::iri("o")));
        }
        assert_eq!(store.len("t"), 1);
        assert!(store.is_closed());
    }
}
