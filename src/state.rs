//! Application state shared across all request handlers

use std::path::Path;
use std::sync::Arc;

use redb::Database;

use crate::config::{AuthConfig, StorageConfig};
use crate::database::{init_db, RedbStore};
use crate::flat_file::JsonFileStore;
use crate::model::{Review, Toy, User};
use crate::service::{ReviewService, ToyService, UserService};
use crate::store::{Store, StoreResult};

/// Services wired to one storage backend, plus the token settings
///
/// Cloned into every handler; all fields are cheap `Arc` handles. Nothing in
/// here is per-request: the acting user travels in request extensions.
#[derive(Clone)]
pub struct AppState {
    pub toys: ToyService,
    pub users: UserService,
    pub reviews: ReviewService,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(
        toys: Arc<dyn Store<Toy>>,
        users: Arc<dyn Store<User>>,
        reviews: Arc<dyn Store<Review>>,
        auth: AuthConfig,
    ) -> Self {
        Self {
            toys: ToyService::new(toys.clone()),
            users: UserService::new(users.clone()),
            reviews: ReviewService::new(reviews, users, toys),
            auth: Arc::new(auth),
        }
    }

    /// State backed by an already opened redb database
    pub fn with_redb(db: Arc<Database>, auth: AuthConfig) -> Self {
        Self::new(
            Arc::new(RedbStore::<Toy>::new(db.clone())),
            Arc::new(RedbStore::<User>::new(db.clone())),
            Arc::new(RedbStore::<Review>::new(db)),
            auth,
        )
    }

    /// State backed by `toy.json`, `user.json` and `review.json` in `dir`
    pub async fn with_json_dir(dir: impl AsRef<Path>, auth: AuthConfig) -> StoreResult<Self> {
        let dir = dir.as_ref();
        Ok(Self::new(
            Arc::new(JsonFileStore::<Toy>::open(dir).await?),
            Arc::new(JsonFileStore::<User>::open(dir).await?),
            Arc::new(JsonFileStore::<Review>::open(dir).await?),
            auth,
        ))
    }

    /// Opens whichever backend the configuration names
    pub async fn open(storage: &StorageConfig, auth: AuthConfig) -> StoreResult<Self> {
        match storage {
            StorageConfig::Redb { path } => Ok(Self::with_redb(Arc::new(init_db(path)?), auth)),
            StorageConfig::JsonFiles { dir } => Self::with_json_dir(dir, auth).await,
        }
    }
}
