//! Embedded document database backend
//!
//! Each collection lives in its own redb table keyed by document id, with the
//! JSON-serialized document as the value. Ids start with their creation
//! timestamp, so key order is creation order.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};

use crate::id::DocId;
use crate::model::{Review, Toy, User};
use crate::store::{self, Document, Filter, FindOptions, Store, StoreError, StoreResult};

impl From<redb::DatabaseError> for StoreError {
    fn from(err: redb::DatabaseError) -> Self {
        StoreError::Database(err.into())
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(err: redb::TransactionError) -> Self {
        StoreError::Database(err.into())
    }
}

impl From<redb::TableError> for StoreError {
    fn from(err: redb::TableError) -> Self {
        StoreError::Database(err.into())
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(err: redb::StorageError) -> Self {
        StoreError::Database(err.into())
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(err: redb::CommitError) -> Self {
        StoreError::Database(err.into())
    }
}

/// Table holding every document of `T`
///
/// Key: document id, e.g. `"65e1c8a0f3a9b2c4d5e6f708"`
/// Value: the document as JSON
fn table<T: Document>() -> TableDefinition<'static, &'static str, &'static str> {
    TableDefinition::new(T::COLLECTION)
}

/// Creates or opens the database file and makes sure every collection table exists
///
/// # Arguments
///
/// * `db_path` - File path of the database, e.g. "data.db"
///
/// # Returns
///
/// * `Ok(Database)` - Database with the `toy`, `user` and `review` tables
/// * `Err(StoreError)` - The file could not be opened or the tables created
///
/// # Example
///
/// ```no_run
/// # use toyshop::database::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, StoreError> {
    let db = Database::create(db_path)?;

    // Opening a table in a write transaction creates it when missing
    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(table::<Toy>())?;
        write_txn.open_table(table::<User>())?;
        write_txn.open_table(table::<Review>())?;
    }
    write_txn.commit()?;

    Ok(db)
}

/// [`Store`] over one redb table
///
/// redb transactions are synchronous; they are short and run inline on the
/// calling task.
pub struct RedbStore<T> {
    db: Arc<Database>,
    _doc: PhantomData<fn() -> T>,
}

impl<T: Document> RedbStore<T> {
    /// Wraps a database opened by [`init_db`]
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            _doc: PhantomData,
        }
    }

    /// Every document in key order, which is creation order
    fn load_all(&self) -> StoreResult<Vec<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table::<T>())?;

        let mut docs = Vec::with_capacity(usize::try_from(table.len()?).unwrap_or_default());
        for entry in table.iter()? {
            let (_, value) = entry?;
            docs.push(serde_json::from_str(value.value())?);
        }
        Ok(docs)
    }
}

#[async_trait]
impl<T: Document> Store<T> for RedbStore<T> {
    async fn find(
        &self,
        filter: &dyn Filter<T>,
        options: FindOptions<T::SortKey>,
    ) -> StoreResult<Vec<T>> {
        Ok(store::select(self.load_all()?, filter, options))
    }

    async fn count(&self, filter: &dyn Filter<T>) -> StoreResult<u64> {
        let matched = self.load_all()?.iter().filter(|doc| filter.matches(doc)).count();
        Ok(matched as u64)
    }

    async fn find_one(&self, id: &DocId) -> StoreResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table::<T>())?;

        let found = table.get(id.as_str())?;
        match found {
            Some(value) => Ok(Some(serde_json::from_str(value.value())?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, doc: T) -> StoreResult<T> {
        let json = serde_json::to_string(&doc)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(table::<T>())?;
            if table.get(doc.id().as_str())?.is_some() {
                return Err(StoreError::DuplicateKey {
                    collection: T::COLLECTION,
                    key: doc.id().to_string(),
                });
            }
            table.insert(doc.id().as_str(), json.as_str())?;
        }
        write_txn.commit()?;

        Ok(doc)
    }

    async fn update_fields(&self, id: &DocId, patch: &T::Patch) -> StoreResult<Option<T>> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(table::<T>())?;
            let current = table.get(id.as_str())?.map(|value| value.value().to_owned());
            match current {
                Some(json) => {
                    let mut doc: T = serde_json::from_str(&json)?;
                    doc.apply_patch(patch);
                    table.insert(id.as_str(), serde_json::to_string(&doc)?.as_str())?;
                    Some(doc)
                }
                None => None,
            }
        };
        write_txn.commit()?;

        Ok(updated)
    }

    async fn delete_one(&self, filter: &dyn Filter<T>) -> StoreResult<u64> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(table::<T>())?;

            let mut target = None;
            for entry in table.iter()? {
                let (key, value) = entry?;
                let doc: T = serde_json::from_str(value.value())?;
                if filter.matches(&doc) {
                    target = Some(key.value().to_owned());
                    break;
                }
            }

            match target {
                Some(key) => u64::from(table.remove(key.as_str())?.is_some()),
                None => 0,
            }
        };
        write_txn.commit()?;

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ToyPatch, ToySortField, ToyUpdate};
    use crate::store::{All, ById, Sort, SortDirection};
    use tempfile::NamedTempFile;

    fn toy(name: &str, price: f64) -> Toy {
        Toy {
            id: DocId::generate(),
            name: name.into(),
            price,
            in_stock: true,
            labels: vec![],
            created_at: None,
            owner: None,
            msgs: vec![],
        }
    }

    fn open() -> (RedbStore<Toy>, NamedTempFile) {
        let file = NamedTempFile::new().unwrap();
        let db = init_db(file.path().to_str().unwrap()).unwrap();
        (RedbStore::new(Arc::new(db)), file)
    }

    #[tokio::test]
    async fn insert_then_find_one() {
        let (store, _file) = open();
        let bear = store.insert(toy("Bear", 10.0)).await.unwrap();

        let found = store.find_one(&bear.id).await.unwrap();
        assert_eq!(found, Some(bear));
        assert_eq!(store.find_one(&DocId::generate()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let (store, _file) = open();
        let bear = store.insert(toy("Bear", 10.0)).await.unwrap();

        let err = store.insert(bear).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { collection: "toy", .. }));
    }

    #[tokio::test]
    async fn find_sorts_and_windows() {
        let (store, _file) = open();
        for (name, price) in [("A", 30.0), ("B", 10.0), ("C", 20.0)] {
            store.insert(toy(name, price)).await.unwrap();
        }

        let options = FindOptions {
            sort: Some(Sort {
                key: ToySortField::Price,
                direction: SortDirection::Descending,
            }),
            skip: 1,
            limit: Some(1),
        };
        let page = store.find(&All, options).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "C");
        assert_eq!(store.count(&All).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn update_and_delete() {
        let (store, _file) = open();
        let bear = store.insert(toy("Bear", 10.0)).await.unwrap();

        let patch = ToyPatch::Fields(ToyUpdate {
            name: "Teddy".into(),
            price: 11.0,
            in_stock: Some(false),
            labels: vec!["Cute".into()],
        });
        let updated = store.update_fields(&bear.id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.name, "Teddy");
        assert!(!updated.in_stock);

        assert_eq!(store.delete_one(&ById(bear.id.clone())).await.unwrap(), 1);
        assert_eq!(store.delete_one(&ById(bear.id.clone())).await.unwrap(), 0);
        assert!(store.update_fields(&bear.id, &patch).await.unwrap().is_none());
    }
}
