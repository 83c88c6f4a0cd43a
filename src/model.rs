//! Data models for the toy shop
//!
//! This module defines the persisted documents (toys, users, reviews), the
//! patches the storage layer accepts for them, the request bodies accepted by
//! the API and the response shapes returned to clients.
//!
//! Field names follow the JSON the front-end already speaks: camelCase keys
//! and `_id` for identifiers.

use std::cmp::Ordering;
use std::convert::Infallible;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::id::DocId;
use crate::store::{Document, Sort, SortDirection};

/// Starting balance for new users
pub const DEFAULT_SCORE: i64 = 1000;

/// Display summary of a user, embedded in toys, messages and reviews
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MiniUser {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub fullname: String,
}

/// Display summary of a toy, embedded in reviews
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MiniToy {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub name: String,
    pub price: f64,
}

/// A chat message attached to a toy
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToyMsg {
    pub id: DocId,
    pub txt: String,
    pub by: MiniUser,
}

/// A toy as stored in the database
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Toy {
    #[serde(rename = "_id")]
    pub id: DocId,

    pub name: String,

    pub price: f64,

    pub in_stock: bool,

    /// Order is preserved for display
    #[serde(default)]
    pub labels: Vec<String>,

    /// Explicit creation time (milliseconds since epoch on disk)
    ///
    /// Only the flat-file data carries this; otherwise the time embedded in
    /// the id is used. See [`Toy::creation_time`].
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<MiniUser>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub msgs: Vec<ToyMsg>,
}

impl Toy {
    /// Explicit `createdAt` if present, else the id's embedded timestamp
    pub fn creation_time(&self) -> Option<DateTime<Utc>> {
        self.created_at.or_else(|| self.id.timestamp())
    }

    /// Copies the derived creation time into `created_at` for display
    pub fn with_creation_time(mut self) -> Self {
        self.created_at = self.creation_time();
        self
    }

    pub fn summary(&self) -> MiniToy {
        MiniToy {
            id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToySortField {
    Name,
    Price,
    CreatedAt,
}

impl ToySortField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "name" => Some(ToySortField::Name),
            "price" => Some(ToySortField::Price),
            "createdAt" => Some(ToySortField::CreatedAt),
            _ => None,
        }
    }
}

/// Allow-listed toy fields replaced by an update
///
/// `in_stock: None` leaves the stored flag untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ToyUpdate {
    pub name: String,
    pub price: f64,
    pub in_stock: Option<bool>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToyPatch {
    Fields(ToyUpdate),
    PushMsg(ToyMsg),
    PullMsg(DocId),
}

impl Document for Toy {
    const COLLECTION: &'static str = "toy";
    type SortKey = ToySortField;
    type Patch = ToyPatch;

    fn id(&self) -> &DocId {
        &self.id
    }

    fn compare_by(&self, other: &Self, key: ToySortField) -> Ordering {
        match key {
            ToySortField::Name => self
                .name
                .to_lowercase()
                .cmp(&other.name.to_lowercase())
                .then_with(|| self.name.cmp(&other.name)),
            ToySortField::Price => self.price.total_cmp(&other.price),
            ToySortField::CreatedAt => self
                .creation_time()
                .cmp(&other.creation_time())
                .then_with(|| self.id.cmp(&other.id)),
        }
    }

    fn apply_patch(&mut self, patch: &ToyPatch) {
        match patch {
            ToyPatch::Fields(update) => {
                self.name = update.name.clone();
                self.price = update.price;
                if let Some(in_stock) = update.in_stock {
                    self.in_stock = in_stock;
                }
                self.labels = update.labels.clone();
            }
            ToyPatch::PushMsg(msg) => self.msgs.push(msg.clone()),
            ToyPatch::PullMsg(msg_id) => self.msgs.retain(|msg| &msg.id != msg_id),
        }
    }
}

/// A registered user as stored; `password` holds the Argon2 hash
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub username: String,
    pub password: String,
    pub fullname: String,
    #[serde(default = "default_score")]
    pub score: i64,
    #[serde(default)]
    pub is_admin: bool,
}

fn default_score() -> i64 {
    DEFAULT_SCORE
}

impl User {
    pub fn summary(&self) -> MiniUser {
        MiniUser {
            id: self.id.clone(),
            fullname: self.fullname.clone(),
        }
    }
}

/// Users are only ever listed by username
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSortField {
    Username,
}

/// Profile fields a user update may replace; `None` keeps the stored value
///
/// `is_admin` is never taken from a request body; only the startup admin
/// bootstrap sets it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub username: Option<String>,
    pub fullname: Option<String>,
    pub score: Option<i64>,
    pub is_admin: Option<bool>,
}

impl Document for User {
    const COLLECTION: &'static str = "user";
    type SortKey = UserSortField;
    type Patch = UserPatch;

    fn id(&self) -> &DocId {
        &self.id
    }

    fn compare_by(&self, other: &Self, key: UserSortField) -> Ordering {
        match key {
            UserSortField::Username => self.username.cmp(&other.username),
        }
    }

    fn apply_patch(&mut self, patch: &UserPatch) {
        if let Some(username) = &patch.username {
            self.username = username.clone();
        }
        if let Some(fullname) = &patch.fullname {
            self.fullname = fullname.clone();
        }
        if let Some(score) = patch.score {
            self.score = score;
        }
        if let Some(is_admin) = patch.is_admin {
            self.is_admin = is_admin;
        }
    }
}

/// What clients see of a user: never the password
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub username: String,
    pub fullname: String,
    pub score: i64,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        UserView {
            id: user.id.clone(),
            username: user.username.clone(),
            fullname: user.fullname.clone(),
            score: user.score,
            is_admin: user.is_admin,
            created_at: user.id.timestamp(),
        }
    }
}

/// A review in its stored, foreign-key form
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub by_user_id: DocId,
    pub about_toy_id: DocId,
    pub txt: String,
}

/// Reviews are only ever listed in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewSortField {
    CreatedAt,
}

impl Document for Review {
    const COLLECTION: &'static str = "review";
    type SortKey = ReviewSortField;
    type Patch = Infallible;

    fn id(&self) -> &DocId {
        &self.id
    }

    fn compare_by(&self, other: &Self, key: ReviewSortField) -> Ordering {
        match key {
            ReviewSortField::CreatedAt => self
                .id
                .timestamp()
                .cmp(&other.id.timestamp())
                .then_with(|| self.id.cmp(&other.id)),
        }
    }

    fn apply_patch(&mut self, patch: &Infallible) {
        match *patch {}
    }
}

/// A review joined with its author and toy
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub txt: String,
    pub by_user: MiniUser,
    pub about_toy: MiniToy,
}

/// Toy listing filter, built per request from the query string
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToyFilter {
    /// Case-insensitive name fragment
    pub txt: Option<String>,
    pub max_price: Option<f64>,
    /// `Some(false)` is an active filter, only `None` means "any"
    pub in_stock: Option<bool>,
    /// Any-of match
    pub labels: Vec<String>,
    pub sort_by: Option<Sort<ToySortField>>,
    /// 0-based; `None` returns the whole matching set
    pub page_idx: Option<usize>,
}

/// Raw query-string pairs failed to parse into a listing filter
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("invalid value {value:?} for query parameter {param}")]
pub struct FilterParseError {
    pub param: String,
    pub value: String,
}

impl ToyFilter {
    /// Parses `txt`, `maxPrice`, `inStock`, `pageIdx`, `labels[]`,
    /// `sortBy[type]` and `sortBy[desc]` from decoded query pairs
    ///
    /// Unknown keys are ignored; empty values count as absent.
    pub fn from_query_pairs(pairs: &[(String, String)]) -> Result<Self, FilterParseError> {
        let mut filter = ToyFilter::default();
        let mut sort_field = None;
        let mut direction = SortDirection::Ascending;

        for (key, value) in pairs {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let invalid = || FilterParseError {
                param: key.clone(),
                value: value.to_string(),
            };

            match key.as_str() {
                "txt" => filter.txt = Some(value.to_string()),
                "maxPrice" => {
                    let price: f64 = value.parse().map_err(|_| invalid())?;
                    if !price.is_finite() || price < 0.0 {
                        return Err(invalid());
                    }
                    filter.max_price = Some(price);
                }
                "inStock" => {
                    filter.in_stock = Some(match value {
                        "true" => true,
                        "false" => false,
                        _ => return Err(invalid()),
                    })
                }
                "pageIdx" => filter.page_idx = Some(value.parse().map_err(|_| invalid())?),
                "labels" | "labels[]" => filter.labels.push(value.to_string()),
                "sortBy[type]" => {
                    sort_field = Some(ToySortField::parse(value).ok_or_else(invalid)?)
                }
                "sortBy[desc]" => {
                    direction = match value {
                        "-1" | "true" => SortDirection::Descending,
                        "1" | "false" => SortDirection::Ascending,
                        _ => return Err(invalid()),
                    }
                }
                _ => {}
            }
        }

        filter.sort_by = sort_field.map(|key| Sort { key, direction });
        Ok(filter)
    }
}

/// User listing filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFilter {
    /// Matched against username or fullname, case-insensitively
    pub txt: Option<String>,
    pub min_score: Option<i64>,
}

impl UserFilter {
    /// Parses `txt` and `minScore` from decoded query pairs
    ///
    /// Unknown keys are ignored; empty values count as absent.
    pub fn from_query_pairs(pairs: &[(String, String)]) -> Result<Self, FilterParseError> {
        let mut filter = UserFilter::default();

        for (key, value) in pairs {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key.as_str() {
                "txt" => filter.txt = Some(value.to_string()),
                "minScore" => {
                    let min_score = value.parse().map_err(|_| FilterParseError {
                        param: key.clone(),
                        value: value.to_string(),
                    })?;
                    filter.min_score = Some(min_score);
                }
                _ => {}
            }
        }

        Ok(filter)
    }
}

/// Optional restrictions for a review listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewFilter {
    pub by_user_id: Option<DocId>,
    pub about_toy_id: Option<DocId>,
}

/// Query parameters for listing reviews, before id validation
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReviewParams {
    pub by_user_id: Option<String>,
    pub about_toy_id: Option<String>,
}

/// Request body for creating or updating a toy
#[derive(Deserialize, Validate, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ToyInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(range(min = 0.0))]
    pub price: f64,

    /// New toys default to in stock; updates keep the stored flag
    pub in_stock: Option<bool>,

    #[serde(default)]
    #[validate(length(max = 20))]
    pub labels: Vec<String>,
}

impl ToyInput {
    pub fn into_update(self) -> ToyUpdate {
        ToyUpdate {
            name: self.name,
            price: self.price,
            in_stock: self.in_stock,
            labels: self.labels,
        }
    }
}

#[derive(Deserialize, Validate, Debug, Clone)]
pub struct MsgInput {
    #[validate(length(min = 1, max = 500))]
    pub txt: String,
}

#[derive(Deserialize, Validate, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    pub about_toy_id: String,

    #[validate(length(min = 1, max = 1000))]
    pub txt: String,
}

#[derive(Deserialize, Validate, Debug, Clone)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,

    #[validate(length(min = 4))]
    pub password: String,

    #[validate(length(min = 1, max = 100))]
    pub fullname: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Validate, Debug, Clone)]
pub struct UserUpdateRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub fullname: Option<String>,

    pub score: Option<i64>,
}

/// Body of `PUT /api/user`: a signed change to the caller's score
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct ScoreDiff {
    pub diff: i64,
}
