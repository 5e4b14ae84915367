//! Batch accumulator: buffers statements and hands full batches to a sink

use crate::statement::Statement;

/// Default number of statements per dispatched batch.
pub const DEFAULT_BATCH_SIZE: usize = 1_000_000;

/// Receiver of full batches. Ownership of the batch moves to the sink.
pub trait BatchSink {
    fn submit(&self, batch: Vec<Statement>);
}

impl<K: BatchSink + ?Sized> BatchSink for &K {
    fn submit(&self, batch: Vec<Statement>) {
        (**self).submit(batch);
    }
}

/// Single-producer statement buffer.
///
/// Once a batch is dispatched the accumulator never touches it again.
pub struct BatchAccumulator<K> {
    buffer: Vec<Statement>,
    batch_size: usize,
    sink: K,
    dispatched: usize,
}

impl<K: BatchSink> BatchAccumulator<K> {
    /// `batch_size` must be at least 1; smaller values are clamped.
    pub fn new(sink: K, batch_size: usize) -> Self {
        Self {
            buffer: Vec::new(),
            batch_size: batch_size.max(1),
            sink,
            dispatched: 0,
        }
    }

    /// Push a statement, dispatching the buffer once it reaches the threshold
    pub fn add(&mut self, statement: Statement) {
        self.buffer.push(statement);
        if self.buffer.len() >= self.batch_size {
            self.dispatch();
        }
    }

    /// Dispatch whatever is buffered. Empty buffers are a no-op.
    pub fn flush_remaining(&mut self) {
        if !self.buffer.is_empty() {
            self.dispatch();
        }
    }

    /// Number of statements currently buffered
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Batches handed to the sink so far
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    fn dispatch(&mut self) {
        let batch = std::mem::take(&mut self.buffer);
        self.dispatched += 1;
        self.sink.submit(batch);
    }
}
