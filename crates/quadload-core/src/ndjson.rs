//! Newline-delimited JSON document store.
//!
//! One `<collection>.ndjson` file per collection inside a directory. `_id`
//! uniqueness is enforced with an in-memory id set, seeded from the existing
//! file the first time a collection is touched, so reruns over the same input
//! only append new documents.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;

use crate::document::{Document, DocumentId};
use crate::error::StoreError;
use crate::store::{BulkWriteResult, DocumentStore, InsertOptions, WriteFailureKind, insert_unique};

/// Writer buffer per collection file (1MB)
const WRITE_BUF_SIZE: usize = 1024 * 1024;

struct CollectionFile {
    writer: BufWriter<File>,
    ids: FxHashSet<DocumentId>,
}

#[derive(Default)]
struct State {
    files: FxHashMap<String, CollectionFile>,
    closed: bool,
}

#[derive(Deserialize)]
struct IdOnly {
    #[serde(rename = "_id")]
    id: DocumentId,
}

/// Append-only NDJSON store
pub struct NdjsonStore {
    dir: PathBuf,
    state: Mutex<State>,
}

impl std::fmt::Debug for NdjsonStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NdjsonStore")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl NdjsonStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            state: Mutex::new(State::default()),
        })
    }

    /// Path of the file backing `collection`
    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{collection}.ndjson"))
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open_collection(&self, collection: &str) -> Result<CollectionFile, StoreError> {
        if collection.is_empty()
            || collection.contains(['/', '\\'])
            || collection.starts_with('.')
        {
            return Err(StoreError::Rejected(format!(
                "invalid collection name: {collection:?}"
            )));
        }
        let path = self.collection_path(collection);
        let ids = if path.exists() {
            load_ids(&path)?
        } else {
            FxHashSet::default()
        };
        if !ids.is_empty() {
            log::info!(
                "{}: {} existing documents",
                path.display(),
                ids.len()
            );
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(CollectionFile {
            writer: BufWriter::with_capacity(WRITE_BUF_SIZE, file),
            ids,
        })
    }
}

fn load_ids(path: &Path) -> io::Result<FxHashSet<DocumentId>> {
    let reader = BufReader::new(File::open(path)?);
    let mut ids = FxHashSet::default();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<IdOnly>(&line) {
            Ok(doc) => {
                ids.insert(doc.id);
            }
            Err(e) => log::warn!("{}:{}: unreadable document: {e}", path.display(), lineno + 1),
        }
    }
    Ok(ids)
}

impl DocumentStore for NdjsonStore {
    fn ping(&self) -> Result<(), StoreError> {
        if self.lock().closed {
            return Err(StoreError::Closed);
        }
        let meta = fs::metadata(&self.dir)?;
        if meta.permissions().readonly() {
            return Err(StoreError::Unavailable(format!(
                "{} is read-only",
                self.dir.display()
            )));
        }
        Ok(())
    }

    fn bulk_insert(
        &self,
        collection: &str,
        documents: &[Document],
        options: InsertOptions,
    ) -> Result<BulkWriteResult, StoreError> {
        let mut state = self.lock();
        if state.closed {
            return Err(StoreError::Closed);
        }
        if !state.files.contains_key(collection) {
            let file = self.open_collection(collection)?;
            state.files.insert(collection.to_string(), file);
        }
        let Some(file) = state.files.get_mut(collection) else {
            return Err(StoreError::Rejected(format!("unknown collection {collection}")));
        };

        let mut line = Vec::with_capacity(512);
        let mut io_error = None;
        let result = insert_unique(documents, options, |doc| {
            if io_error.is_some() {
                return Err(WriteFailureKind::Other);
            }
            if file.ids.contains(&doc.id) {
                return Err(WriteFailureKind::DuplicateKey);
            }
            line.clear();
            if serde_json::to_writer(&mut line, doc).is_err() {
                return Err(WriteFailureKind::Other);
            }
            line.push(b'\n');
            if let Err(e) = file.writer.write_all(&line) {
                io_error = Some(e);
                return Err(WriteFailureKind::Other);
            }
            file.ids.insert(doc.id);
            Ok(())
        });

        if let Some(e) = io_error {
            return Err(StoreError::Io(e));
        }
        file.writer.flush()?;
        Ok(result)
    }

    fn close(&self) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.closed = true;
        for (name, file) in &mut state.files {
            file.writer.flush()?;
            log::debug!("closed collection {name} ({} documents)", file.ids.len());
        }
        state.files.clear();
        Ok(())
    }
}
