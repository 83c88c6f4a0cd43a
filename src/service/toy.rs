//! Toy query engine and toy CRUD

use std::sync::Arc;

use serde::Serialize;

use crate::auth::ActingUser;
use crate::criteria::ToyCriteria;
use crate::error::{AppError, AppResult};
use crate::id::DocId;
use crate::model::{MiniUser, ReviewView, Toy, ToyFilter, ToyInput, ToyMsg, ToyPatch};
use crate::stats::{self, ChartsData};
use crate::store::{All, ById, FindOptions, Store};

/// Toys per page when a page index is given
pub const PAGE_SIZE: usize = 6;

/// One page of a toy listing
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ToyPage {
    pub toys: Vec<Toy>,
    /// Computed over `toys`, i.e. the returned page only
    pub charts_data: ChartsData,
    /// Matching toys before pagination
    pub total: u64,
}

/// A single toy with its circular neighbours and reviews
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ToyDetail {
    #[serde(flatten)]
    pub toy: Toy,
    pub next_toy_id: DocId,
    pub prev_toy_id: DocId,
    pub reviews: Vec<ReviewView>,
}

#[derive(Clone)]
pub struct ToyService {
    store: Arc<dyn Store<Toy>>,
}

impl ToyService {
    pub fn new(store: Arc<dyn Store<Toy>>) -> Self {
        Self { store }
    }

    /// Runs a toy listing
    ///
    /// # Arguments
    ///
    /// * `filter` - Parsed listing parameters, see [`ToyFilter::from_query_pairs`]
    ///
    /// # Returns
    ///
    /// * `Ok(ToyPage)` - The requested page (or every match without `page_idx`),
    ///   chart data for that page and the total match count
    /// * `Err(AppError)` - Storage failure
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use toyshop::model::ToyFilter;
    /// # async fn run(toys: toyshop::service::ToyService) -> toyshop::error::AppResult<()> {
    /// let filter = ToyFilter { txt: Some("bear".into()), page_idx: Some(0), ..Default::default() };
    /// let page = toys.query(&filter).await?;
    /// assert!(page.toys.len() <= toyshop::service::toy::PAGE_SIZE);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn query(&self, filter: &ToyFilter) -> AppResult<ToyPage> {
        // Count before paging so `total` covers every match
        let criteria = ToyCriteria::build(filter);
        let total = self.store.count(&criteria).await?;

        let options = FindOptions {
            sort: filter.sort_by,
            skip: filter.page_idx.map_or(0, |idx| idx.saturating_mul(PAGE_SIZE)),
            limit: filter.page_idx.map(|_| PAGE_SIZE),
        };
        let toys: Vec<Toy> = self
            .store
            .find(&criteria, options)
            .await?
            .into_iter()
            .map(Toy::with_creation_time)
            .collect();

        // Stats describe the returned slice only
        let charts_data = stats::charts_data(&toys);
        tracing::debug!(total, returned = toys.len(), "queried toys");

        Ok(ToyPage {
            toys,
            charts_data,
            total,
        })
    }

    /// Loads one toy, or [`AppError::NotFound`]
    pub async fn get_by_id(&self, id: &DocId) -> AppResult<Toy> {
        self.store
            .find_one(id)
            .await?
            .map(Toy::with_creation_time)
            .ok_or_else(|| AppError::not_found("toy", id))
    }

    /// Loads a toy plus the ids of its neighbours in the unfiltered collection
    ///
    /// Navigation wraps: the last toy's next is the first, and vice versa.
    /// `reviews` is left empty for the caller to fill in.
    pub async fn get_detail(&self, id: &DocId) -> AppResult<ToyDetail> {
        let all = self.store.find(&All, FindOptions::default()).await?;
        let idx = all
            .iter()
            .position(|toy| &toy.id == id)
            .ok_or_else(|| AppError::not_found("toy", id))?;

        let len = all.len();
        let next_toy_id = all[(idx + 1) % len].id.clone();
        let prev_toy_id = all[(idx + len - 1) % len].id.clone();
        let toy = all.into_iter().nth(idx).map(Toy::with_creation_time);

        toy.map(|toy| ToyDetail {
            toy,
            next_toy_id,
            prev_toy_id,
            reviews: Vec::new(),
        })
        .ok_or_else(|| AppError::not_found("toy", id))
    }

    /// Creates a toy
    ///
    /// # Arguments
    ///
    /// * `input` - Validated name, price, stock flag and labels; stock defaults to `true`
    /// * `owner` - The admin creating it
    ///
    /// # Returns
    ///
    /// The stored toy with `createdAt` filled in from its new id.
    pub async fn add(&self, input: ToyInput, owner: MiniUser) -> AppResult<Toy> {
        let toy = Toy {
            id: DocId::generate(),
            name: input.name,
            price: input.price,
            in_stock: input.in_stock.unwrap_or(true),
            labels: input.labels,
            created_at: None,
            owner: Some(owner),
            msgs: Vec::new(),
        };

        let toy = self.store.insert(toy).await?;
        tracing::info!(toy_id = %toy.id, name = %toy.name, "toy added");
        Ok(toy.with_creation_time())
    }

    /// Replaces name, price, stock flag and labels; other fields are untouched
    pub async fn update(&self, id: &DocId, input: ToyInput) -> AppResult<Toy> {
        let patch = ToyPatch::Fields(input.into_update());
        let toy = self
            .store
            .update_fields(id, &patch)
            .await?
            .ok_or_else(|| AppError::not_found("toy", id))?;

        tracing::info!(toy_id = %id, "toy updated");
        Ok(toy.with_creation_time())
    }

    /// Deletes a toy and returns how many were deleted (0 or 1)
    pub async fn remove(&self, id: &DocId) -> AppResult<u64> {
        let deleted = self.store.delete_one(&ById(id.clone())).await?;
        tracing::info!(toy_id = %id, deleted, "toy removed");
        Ok(deleted)
    }

    /// Appends a message to a toy's thread
    ///
    /// # Returns
    ///
    /// * `Ok(ToyMsg)` - The new message with its generated id
    /// * `Err(AppError::NotFound)` - No such toy
    pub async fn add_msg(&self, toy_id: &DocId, txt: String, by: MiniUser) -> AppResult<ToyMsg> {
        let msg = ToyMsg {
            id: DocId::generate(),
            txt,
            by,
        };
        self.store
            .update_fields(toy_id, &ToyPatch::PushMsg(msg.clone()))
            .await?
            .ok_or_else(|| AppError::not_found("toy", toy_id))?;
        Ok(msg)
    }

    /// Removes a message; only its author or an admin may do so
    pub async fn remove_msg(
        &self,
        toy_id: &DocId,
        msg_id: &DocId,
        actor: &ActingUser,
    ) -> AppResult<()> {
        // Ownership is checked against the stored message, not the request
        let toy = self.get_by_id(toy_id).await?;
        let msg = toy
            .msgs
            .iter()
            .find(|msg| &msg.id == msg_id)
            .ok_or_else(|| AppError::not_found("message", msg_id))?;

        if !actor.is_admin && msg.by.id != actor.id {
            return Err(AppError::Forbidden(
                "Only the author or an admin can remove this message".into(),
            ));
        }

        self.store
            .update_fields(toy_id, &ToyPatch::PullMsg(msg_id.clone()))
            .await?
            .ok_or_else(|| AppError::not_found("toy", toy_id))?;
        Ok(())
    }
}
