//! JSON flat-file backend
//!
//! A collection is one JSON array on disk (`<dir>/<collection>.json`). It is
//! loaded once when the store opens, kept in memory behind a single-writer
//! lock and rewritten wholesale after every mutation. New documents go to the
//! front of the array, so the natural order is newest first.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::id::DocId;
use crate::store::{self, Document, Filter, FindOptions, Store, StoreError, StoreResult};

/// [`Store`] over one JSON file, held in memory
///
/// # Example
///
/// ```no_run
/// # use toyshop::flat_file::JsonFileStore;
/// # use toyshop::model::Toy;
/// # async fn run() -> toyshop::store::StoreResult<()> {
/// // reads ./data/toy.json
/// let toys = JsonFileStore::<Toy>::open("data").await?;
/// # Ok(())
/// # }
/// ```
pub struct JsonFileStore<T> {
    path: PathBuf,
    docs: Mutex<Vec<T>>,
}

impl<T: Document> JsonFileStore<T> {
    /// Opens `<dir>/<collection>.json`, starting empty if the file does not exist yet
    pub async fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let path = dir.as_ref().join(format!("{}.json", T::COLLECTION));

        let docs = match tokio::fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => Vec::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        tracing::debug!(path = %path.display(), count = docs.len(), "loaded collection file");

        Ok(Self {
            path,
            docs: Mutex::new(docs),
        })
    }

    /// Rewrites the whole file from `docs`
    ///
    /// Callers hold the lock and restore their in-memory change if this fails.
    async fn persist(&self, docs: &[T]) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(docs)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl<T: Document> Store<T> for JsonFileStore<T> {
    async fn find(
        &self,
        filter: &dyn Filter<T>,
        options: FindOptions<T::SortKey>,
    ) -> StoreResult<Vec<T>> {
        let docs = self.docs.lock().await;
        Ok(store::select(docs.iter().cloned(), filter, options))
    }

    async fn count(&self, filter: &dyn Filter<T>) -> StoreResult<u64> {
        let docs = self.docs.lock().await;
        Ok(docs.iter().filter(|doc| filter.matches(doc)).count() as u64)
    }

    async fn find_one(&self, id: &DocId) -> StoreResult<Option<T>> {
        let docs = self.docs.lock().await;
        Ok(docs.iter().find(|doc| doc.id() == id).cloned())
    }

    async fn insert(&self, doc: T) -> StoreResult<T> {
        let mut docs = self.docs.lock().await;
        if docs.iter().any(|existing| existing.id() == doc.id()) {
            return Err(StoreError::DuplicateKey {
                collection: T::COLLECTION,
                key: doc.id().to_string(),
            });
        }

        docs.insert(0, doc.clone());
        if let Err(err) = self.persist(&docs).await {
            docs.remove(0);
            return Err(err);
        }
        Ok(doc)
    }

    async fn update_fields(&self, id: &DocId, patch: &T::Patch) -> StoreResult<Option<T>> {
        let mut docs = self.docs.lock().await;
        let Some(idx) = docs.iter().position(|doc| doc.id() == id) else {
            return Ok(None);
        };

        // Patch a copy so a failed write leaves memory matching the file
        let mut updated = docs[idx].clone();
        updated.apply_patch(patch);
        let previous = std::mem::replace(&mut docs[idx], updated.clone());
        if let Err(err) = self.persist(&docs).await {
            docs[idx] = previous;
            return Err(err);
        }
        Ok(Some(updated))
    }

    async fn delete_one(&self, filter: &dyn Filter<T>) -> StoreResult<u64> {
        let mut docs = self.docs.lock().await;
        let Some(idx) = docs.iter().position(|doc| filter.matches(doc)) else {
            return Ok(0);
        };

        let removed = docs.remove(idx);
        if let Err(err) = self.persist(&docs).await {
            docs.insert(idx, removed);
            return Err(err);
        }
        Ok(1)
    }
}
