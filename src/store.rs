//! Storage contract shared by every backend
//!
//! Services talk to a [`Store`] and never to redb or the JSON files directly.
//! Predicates are plain Rust values implementing [`Filter`], evaluated by the
//! backend against each decoded document.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::id::DocId;

/// Errors raised by a storage backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] redb::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("duplicate key {key} in collection {collection}")]
    DuplicateKey {
        collection: &'static str,
        key: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Sort direction, encoded as +1 / -1 on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<K> {
    pub key: K,
    pub direction: SortDirection,
}

/// Ordering and windowing applied after filtering
#[derive(Debug, Clone, Copy)]
pub struct FindOptions<K> {
    /// `None` keeps the backend's natural order
    pub sort: Option<Sort<K>>,
    pub skip: usize,
    /// `None` returns everything after `skip`
    pub limit: Option<usize>,
}

impl<K> Default for FindOptions<K> {
    fn default() -> Self {
        Self {
            sort: None,
            skip: 0,
            limit: None,
        }
    }
}

/// A persisted entity
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection (table / file) name
    const COLLECTION: &'static str;

    /// Fields a caller may sort on
    type SortKey: Copy + Send + Sync + 'static;

    /// The allow-listed mutation accepted by [`Store::update_fields`]
    type Patch: Send + Sync;

    fn id(&self) -> &DocId;

    fn compare_by(&self, other: &Self, key: Self::SortKey) -> Ordering;

    fn apply_patch(&mut self, patch: &Self::Patch);
}

/// Storage-query predicate
pub trait Filter<T>: Send + Sync {
    fn matches(&self, doc: &T) -> bool;
}

/// Matches every document
pub struct All;

impl<T> Filter<T> for All {
    fn matches(&self, _doc: &T) -> bool {
        true
    }
}

/// Matches the document with the given id
pub struct ById(pub DocId);

impl<T: Document> Filter<T> for ById {
    fn matches(&self, doc: &T) -> bool {
        doc.id() == &self.0
    }
}

/// Per-collection storage operations
///
/// Implemented by [`crate::database::RedbStore`] and
/// [`crate::flat_file::JsonFileStore`]. Single-document operations are atomic;
/// nothing spans documents.
#[async_trait]
pub trait Store<T: Document>: Send + Sync {
    async fn find(
        &self,
        filter: &dyn Filter<T>,
        options: FindOptions<T::SortKey>,
    ) -> StoreResult<Vec<T>>;

    async fn count(&self, filter: &dyn Filter<T>) -> StoreResult<u64>;

    async fn find_one(&self, id: &DocId) -> StoreResult<Option<T>>;

    async fn insert(&self, doc: T) -> StoreResult<T>;

    /// Applies `patch` to the document and returns the stored result,
    /// or `None` when no document has that id
    async fn update_fields(&self, id: &DocId, patch: &T::Patch) -> StoreResult<Option<T>>;

    /// Deletes the first document matching `filter`; returns how many were removed
    async fn delete_one(&self, filter: &dyn Filter<T>) -> StoreResult<u64>;
}

/// Filters, sorts and windows an in-memory scan
///
/// Both backends scan their whole collection, so they share this step. The
/// sort is stable: documents comparing equal keep their storage order.
pub fn select<T: Document>(
    docs: impl IntoIterator<Item = T>,
    filter: &dyn Filter<T>,
    options: FindOptions<T::SortKey>,
) -> Vec<T> {
    let mut matched: Vec<T> = docs.into_iter().filter(|doc| filter.matches(doc)).collect();

    if let Some(sort) = options.sort {
        matched.sort_by(|a, b| sort.direction.apply(a.compare_by(b, sort.key)));
    }

    let window = matched.into_iter().skip(options.skip);
    match options.limit {
        Some(limit) => window.take(limit).collect(),
        None => window.collect(),
    }
}
