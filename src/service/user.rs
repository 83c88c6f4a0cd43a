//! User repository operations
//!
//! Registration, profile updates and score bookkeeping on top of a
//! [`Store<User>`]. Callers get [`UserView`]s, which never carry the password
//! hash; the full [`User`] is only handed out for credential checks.

use std::sync::Arc;

use crate::criteria::{ByUsername, UserCriteria};
use crate::error::{AppError, AppResult};
use crate::id::DocId;
use crate::model::{User, UserFilter, UserPatch, UserSortField, UserView, DEFAULT_SCORE};
use crate::store::{ById, FindOptions, Sort, SortDirection, Store};

/// A user about to be registered; `password` is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub fullname: String,
    pub score: Option<i64>,
    pub is_admin: bool,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store<User>>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store<User>>) -> Self {
        Self { store }
    }

    /// Lists users matching `filter`, ordered by username
    ///
    /// # Arguments
    ///
    /// * `filter` - optional name fragment (username or fullname) and minimum score
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<UserView>)` - matching users without their password hashes
    /// * `Err(AppError::Storage)` - the store could not be read
    pub async fn query(&self, filter: &UserFilter) -> AppResult<Vec<UserView>> {
        let options = FindOptions {
            sort: Some(Sort {
                key: UserSortField::Username,
                direction: SortDirection::Ascending,
            }),
            ..FindOptions::default()
        };
        let users = self.store.find(&UserCriteria::build(filter), options).await?;
        Ok(users.iter().map(UserView::from).collect())
    }

    /// Client-facing view of one user; `NotFound` when the id is unknown
    pub async fn get_by_id(&self, id: &DocId) -> AppResult<UserView> {
        self.get_user(id).await.map(|user| UserView::from(&user))
    }

    /// Full stored record, password hash included; never hand this to a client
    pub async fn get_user(&self, id: &DocId) -> AppResult<User> {
        self.store
            .find_one(id)
            .await?
            .ok_or_else(|| AppError::not_found("user", id))
    }

    /// Exact-match lookup used by login and the uniqueness checks
    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let mut found = self
            .store
            .find(
                &ByUsername(username),
                FindOptions {
                    limit: Some(1),
                    ..FindOptions::default()
                },
            )
            .await?;
        Ok(found.pop())
    }

    /// Registers a user after checking the username is free
    ///
    /// The check and the insert are separate storage calls; two concurrent
    /// signups for the same name can both pass.
    ///
    /// # Arguments
    ///
    /// * `new_user` - profile and already-hashed password; `score` defaults to 1000
    ///
    /// # Returns
    ///
    /// * `Ok(User)` - the stored user with its new id
    /// * `Err(AppError::Conflict)` - the username is taken
    pub async fn add(&self, new_user: NewUser) -> AppResult<User> {
        // Uniqueness pre-check
        if self.get_by_username(&new_user.username).await?.is_some() {
            return Err(AppError::Conflict("Username taken".into()));
        }

        let user = User {
            id: DocId::generate(),
            username: new_user.username,
            password: new_user.password_hash,
            fullname: new_user.fullname,
            score: new_user.score.unwrap_or(DEFAULT_SCORE),
            is_admin: new_user.is_admin,
        };
        let user = self.store.insert(user).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "user added");
        Ok(user)
    }

    /// Makes sure an admin account with `new_user.username` exists
    ///
    /// Creates it as an admin when missing. An existing account is promoted
    /// if needed and otherwise left untouched; its password is not replaced.
    ///
    /// # Returns
    ///
    /// * `Ok(User)` - the admin account as stored
    pub async fn ensure_admin(&self, new_user: NewUser) -> AppResult<User> {
        match self.get_by_username(&new_user.username).await? {
            Some(user) if user.is_admin => Ok(user),
            Some(user) => {
                let patch = UserPatch {
                    is_admin: Some(true),
                    ..UserPatch::default()
                };
                let promoted = self
                    .store
                    .update_fields(&user.id, &patch)
                    .await?
                    .ok_or_else(|| AppError::not_found("user", &user.id))?;
                tracing::info!(user_id = %promoted.id, username = %promoted.username, "user promoted to admin");
                Ok(promoted)
            }
            None => {
                self.add(NewUser {
                    is_admin: true,
                    ..new_user
                })
                .await
            }
        }
    }

    /// Replaces the profile fields set in `patch`
    ///
    /// # Returns
    ///
    /// * `Ok(UserView)` - the updated user
    /// * `Err(AppError::Conflict)` - the new username belongs to someone else
    /// * `Err(AppError::NotFound)` - no user with that id
    pub async fn update(&self, id: &DocId, patch: UserPatch) -> AppResult<UserView> {
        // A user may keep their own username; anyone else's is taken
        if let Some(username) = &patch.username {
            if let Some(owner) = self.get_by_username(username).await? {
                if &owner.id != id {
                    return Err(AppError::Conflict("Username taken".into()));
                }
            }
        }

        let user = self
            .store
            .update_fields(id, &patch)
            .await?
            .ok_or_else(|| AppError::not_found("user", id))?;
        tracing::info!(user_id = %id, "user updated");
        Ok(UserView::from(&user))
    }

    /// Applies a signed change to a user's score, refusing to go below zero
    ///
    /// # Arguments
    ///
    /// * `id` - the user whose score changes
    /// * `diff` - amount to add; negative to spend
    ///
    /// # Returns
    ///
    /// * `Ok(User)` - the user with the new score
    /// * `Err(AppError::Validation)` - "No credit": the result would be negative
    pub async fn adjust_score(&self, id: &DocId, diff: i64) -> AppResult<User> {
        let user = self.get_user(id).await?;
        let score = user
            .score
            .checked_add(diff)
            .filter(|score| *score >= 0)
            .ok_or_else(|| AppError::Validation("No credit".into()))?;

        let patch = UserPatch {
            score: Some(score),
            ..UserPatch::default()
        };
        self.store
            .update_fields(id, &patch)
            .await?
            .ok_or_else(|| AppError::not_found("user", id))
    }

    /// Deletes a user; returns how many were deleted (0 or 1)
    pub async fn remove(&self, id: &DocId) -> AppResult<u64> {
        let deleted = self.store.delete_one(&ById(id.clone())).await?;
        tracing::info!(user_id = %id, deleted, "user removed");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat_file::JsonFileStore;
    use tempfile::TempDir;

    async fn service() -> (UserService, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::<User>::open(dir.path()).await.unwrap();
        (UserService::new(Arc::new(store)), dir)
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.into(),
            password_hash: "hash".into(),
            fullname: format!("{username} Ja"),
            score: None,
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn add_defaults_score_and_rejects_taken_username() {
        let (users, _dir) = service().await;
        let puki = users.add(new_user("puki")).await.unwrap();
        assert_eq!(puki.score, DEFAULT_SCORE);

        let err = users.add(new_user("puki")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn query_matches_username_or_fullname() {
        let (users, _dir) = service().await;
        users.add(new_user("puki")).await.unwrap();
        users
            .add(NewUser {
                fullname: "Shuki Puk".into(),
                ..new_user("shuki")
            })
            .await
            .unwrap();
        users.add(new_user("muki")).await.unwrap();

        let filter = UserFilter {
            txt: Some("PUK".into()),
            min_score: None,
        };
        let names: Vec<String> = users
            .query(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["puki", "shuki"]);
    }

    #[tokio::test]
    async fn score_cannot_go_negative() {
        let (users, _dir) = service().await;
        let puki = users.add(new_user("puki")).await.unwrap();

        let spent = users.adjust_score(&puki.id, -400).await.unwrap();
        assert_eq!(spent.score, 600);

        let err = users.adjust_score(&puki.id, -601).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "No credit"));
        assert_eq!(users.get_by_id(&puki.id).await.unwrap().score, 600);
    }

    #[tokio::test]
    async fn update_refuses_someone_elses_username() {
        let (users, _dir) = service().await;
        let puki = users.add(new_user("puki")).await.unwrap();
        users.add(new_user("muki")).await.unwrap();

        let patch = UserPatch {
            username: Some("muki".into()),
            ..UserPatch::default()
        };
        assert!(matches!(
            users.update(&puki.id, patch).await.unwrap_err(),
            AppError::Conflict(_)
        ));

        let patch = UserPatch {
            fullname: Some("Puki Reviewed".into()),
            ..UserPatch::default()
        };
        let view = users.update(&puki.id, patch).await.unwrap();
        assert_eq!(view.fullname, "Puki Reviewed");
        assert_eq!(view.username, "puki");
    }

    #[tokio::test]
    async fn ensure_admin_creates_then_promotes() {
        let (users, _dir) = service().await;

        let created = users.ensure_admin(new_user("root")).await.unwrap();
        assert!(created.is_admin);
        let again = users.ensure_admin(new_user("root")).await.unwrap();
        assert_eq!(again.id, created.id);

        let puki = users.add(new_user("puki")).await.unwrap();
        assert!(!puki.is_admin);
        let promoted = users
            .ensure_admin(NewUser {
                password_hash: "replacement".into(),
                ..new_user("puki")
            })
            .await
            .unwrap();
        assert_eq!(promoted.id, puki.id);
        assert!(promoted.is_admin);
        assert_eq!(promoted.password, "hash");
    }
}
