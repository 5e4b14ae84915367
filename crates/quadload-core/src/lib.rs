//! Quadload Core - bounded-concurrency bulk loader for RDF statements
//!
//! Turns a stream of subject-predicate-object statements into
//! content-addressed documents and bulk-inserts them into a document store.
//! A fixed pool of writer workers holds one permit per in-flight batch, so
//! a fast producer blocks instead of buffering without bound.

pub mod accumulator;
pub mod config;
pub mod document;
pub mod error;
pub mod geometry;
pub mod handler;
pub mod loader;
pub mod logging;
pub mod metrics;
pub mod ndjson;
pub mod pool;
pub mod progress;
pub mod retry;
pub mod semaphore;
pub mod serializer;
pub mod shutdown;
pub mod statement;
pub mod store;

// Re-exports for convenience
pub use accumulator::{BatchAccumulator, BatchSink, DEFAULT_BATCH_SIZE};
pub use config::{DEFAULT_DATABASE, DEFAULT_WORKERS, LoaderConfig, triples_collection};
pub use document::{Document, DocumentId, FieldHashes, ShortHash};
pub use error::{LoadError, SerializeError, StoreError};
pub use geometry::{GeoShape, GeometryError, GeometryParser, WktParser};
pub use handler::{CountingHandler, StatementHandler};
pub use loader::Loader;
pub use logging::{IndicatifLogger, init_logging};
pub use metrics::{Metrics, Snapshot};
pub use ndjson::NdjsonStore;
pub use pool::WriterPool;
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use retry::RetryPolicy;
pub use serializer::{GeoMode, Serializer, SerializerOptions};
pub use shutdown::{is_shutdown_requested, request_shutdown, shutdown_flag};
pub use statement::{Object, Statement};
pub use store::{BulkWriteResult, DocumentStore, InsertOptions, MemoryStore, WriteFailure, WriteFailureKind};
