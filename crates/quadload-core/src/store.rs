//! Document store seam and an in-memory implementation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;

use crate::document::{Document, DocumentId};
use crate::error::StoreError;

/// Bulk-insert switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOptions {
    /// Stop at the first failing document. The loader always sends `false`.
    pub ordered: bool,
}

impl InsertOptions {
    pub const UNORDERED: Self = Self { ordered: false };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFailureKind {
    /// Identifier already present in the collection
    DuplicateKey,
    Other,
}

/// Per-document failure inside an otherwise accepted bulk insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    /// Position of the document in the submitted slice
    pub index: usize,
    pub id: DocumentId,
    pub kind: WriteFailureKind,
    pub message: String,
}

/// Outcome of one bulk insert
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkWriteResult {
    pub inserted: usize,
    pub failures: Vec<WriteFailure>,
}

impl BulkWriteResult {
    pub fn duplicates(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.kind == WriteFailureKind::DuplicateKey)
            .count()
    }
}

/// Client for a document store that enforces `_id` uniqueness per collection.
///
/// Shared by all workers, so implementations must tolerate concurrent calls.
pub trait DocumentStore: Send + Sync + 'static {
    /// Verify the store is reachable. Called once before loading starts.
    fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Write `documents` into `collection` in one call.
    ///
    /// With `ordered == false` a failing document does not stop the rest;
    /// every failure is reported in the result. `Err` means the batch as a
    /// whole was not processed.
    fn bulk_insert(
        &self,
        collection: &str,
        documents: &[Document],
        options: InsertOptions,
    ) -> Result<BulkWriteResult, StoreError>;

    /// Release the connection. No call may follow.
    fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Insert `documents` into an id-keyed collection map, honouring `ordered`.
pub(crate) fn insert_unique<F>(
    documents: &[Document],
    options: InsertOptions,
    mut insert: F,
) -> BulkWriteResult
where
    F: FnMut(&Document) -> Result<(), WriteFailureKind>,
{
    let mut result = BulkWriteResult::default();
    for (index, doc) in documents.iter().enumerate() {
        match insert(doc) {
            Ok(()) => result.inserted += 1,
            Err(kind) => {
                let message = match kind {
                    WriteFailureKind::DuplicateKey => format!("duplicate key: _id {}", doc.id),
                    WriteFailureKind::Other => format!("write failed: _id {}", doc.id),
                };
                result.failures.push(WriteFailure {
                    index,
                    id: doc.id,
                    kind,
                    message,
                });
                if options.ordered {
                    break;
                }
            }
        }
    }
    result
}

type Collections = FxHashMap<String, FxHashMap<DocumentId, Document>>;

/// In-memory store with unique `_id` per collection.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Documents stored in `collection`
    pub fn len(&self, collection: &str) -> usize {
        self.lock().get(collection).map_or(0, FxHashMap::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    pub fn get(&self, collection: &str, id: &DocumentId) -> Option<Document> {
        self.lock().get(collection).and_then(|c| c.get(id)).cloned()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl DocumentStore for MemoryStore {
    fn ping(&self) -> Result<(), StoreError> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn bulk_insert(
        &self,
        collection: &str,
        documents: &[Document],
        options: InsertOptions,
    ) -> Result<BulkWriteResult, StoreError> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        let mut collections = self.lock();
        let coll = collections.entry(collection.to_string()).or_default();
        Ok(insert_unique(documents, options, |doc| {
            if coll.contains_key(&doc.id) {
                return Err(WriteFailureKind::DuplicateKey);
            }
            coll.insert(doc.id, doc.clone());
            Ok(())
        }))
    }

    fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::Serializer;
    use crate::statement::{Object, Statement};

    fn docs(subjects: &[&str]) -> Vec<Document> {
        let ser = Serializer::default();
        subjects
            .iter()
            .map(|s| {
                ser.serialize(&Statement::new(*s, "p:b", Object::string("hello")))
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn inserts_all() {
        let store = MemoryStore::new();
        let res = store
            .bulk_insert("c", &docs(&["a", "b", "c"]), InsertOptions::UNORDERED)
            .unwrap();
        assert_eq!(res.inserted, 3);
        assert!(res.failures.is_empty());
        assert_eq!(store.len("c"), 3);
        assert!(store.is_empty("other"));
    }

    #[test]
    fn duplicate_does_not_block_siblings() {
        let store = MemoryStore::new();
        store
            .bulk_insert("c", &docs(&["b"]), InsertOptions::UNORDERED)
            .unwrap();

        let batch = docs(&["a", "b", "c"]);
        let res = store
            .bulk_insert("c", &batch, InsertOptions::UNORDERED)
            .unwrap();
        assert_eq!(res.inserted, 2);
        assert_eq!(res.failures.len(), 1);
        assert_eq!(res.failures[0].index, 1);
        assert_eq!(res.failures[0].id, batch[1].id);
        assert_eq!(res.duplicates(), 1);
        assert!(res.failures[0].message.contains("duplicate key"));
        assert_eq!(store.len("c"), 3);
    }

    #[test]
    fn ordered_stops_at_first_failure() {
        let store = MemoryStore::new();
        store
            .bulk_insert("c", &docs(&["b"]), InsertOptions::UNORDERED)
            .unwrap();
        let res = store
            .bulk_insert(
                "c",
                &docs(&["a", "b", "c"]),
                InsertOptions { ordered: true },
            )
            .unwrap();
        assert_eq!(res.inserted, 1);
        assert_eq!(res.failures.len(), 1);
        assert_eq!(store.len("c"), 2);
    }

    #[test]
    fn collections_are_independent() {
        let store = MemoryStore::new();
        let batch = docs(&["a"]);
        store.bulk_insert("x", &batch, InsertOptions::UNORDERED).unwrap();
        let res = store.bulk_insert("y", &batch, InsertOptions::UNORDERED).unwrap();
        assert_eq!(res.inserted, 1);
        assert!(store.get("y", &batch[0].id).is_some());
    }

    #[test]
    fn closed_store_rejects_writes() {
        let store = MemoryStore::new();
        store.close().unwrap();
        assert!(store.is_closed());
        let err = store
            .bulk_insert("c", &docs(&["a"]), InsertOptions::UNORDERED)
            .unwrap_err();
        assert!(matches!(err, StoreError::Closed));
        assert!(store.ping().is_err());
    }
}
