//! Review join engine
//!
//! Reviews are stored in foreign-key form. Listing joins each one with its
//! author and toy; a review whose author or toy no longer resolves is left out
//! of the result and logged.

use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::ActingUser;
use crate::criteria::ReviewCriteria;
use crate::error::AppResult;
use crate::id::DocId;
use crate::model::{MiniToy, MiniUser, Review, ReviewFilter, ReviewSortField, ReviewView, Toy, User};
use crate::store::{FindOptions, Sort, SortDirection, Store};

#[derive(Clone)]
pub struct ReviewService {
    reviews: Arc<dyn Store<Review>>,
    users: Arc<dyn Store<User>>,
    toys: Arc<dyn Store<Toy>>,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn Store<Review>>,
        users: Arc<dyn Store<User>>,
        toys: Arc<dyn Store<Toy>>,
    ) -> Self {
        Self {
            reviews,
            users,
            toys,
        }
    }

    /// Reviews matching `filter`, oldest first, joined with author and toy summaries
    ///
    /// # Arguments
    ///
    /// * `filter` - Optional author and toy ids; both absent means every review
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ReviewView>)` - Joined reviews. A review whose author or toy
    ///   no longer exists is left out and logged at `warn`.
    /// * `Err(AppError)` - Storage failure
    pub async fn query(&self, filter: &ReviewFilter) -> AppResult<Vec<ReviewView>> {
        let options = FindOptions {
            sort: Some(Sort {
                key: ReviewSortField::CreatedAt,
                direction: SortDirection::Ascending,
            }),
            ..FindOptions::default()
        };
        let reviews = self
            .reviews
            .find(&ReviewCriteria::build(filter), options)
            .await?;

        // Each author and toy is looked up once, however many reviews share it.
        let mut authors: HashMap<DocId, Option<MiniUser>> = HashMap::new();
        let mut subjects: HashMap<DocId, Option<MiniToy>> = HashMap::new();
        let mut joined = Vec::with_capacity(reviews.len());

        for review in reviews {
            if !authors.contains_key(&review.by_user_id) {
                let author = self.users.find_one(&review.by_user_id).await?;
                authors.insert(review.by_user_id.clone(), author.map(|u| u.summary()));
            }
            if !subjects.contains_key(&review.about_toy_id) {
                let toy = self.toys.find_one(&review.about_toy_id).await?;
                subjects.insert(review.about_toy_id.clone(), toy.map(|t| t.summary()));
            }

            let by_user = authors.get(&review.by_user_id).cloned().flatten();
            let about_toy = subjects.get(&review.about_toy_id).cloned().flatten();
            match (by_user, about_toy) {
                (Some(by_user), Some(about_toy)) => joined.push(ReviewView {
                    id: review.id,
                    txt: review.txt,
                    by_user,
                    about_toy,
                }),
                _ => tracing::warn!(
                    review_id = %review.id,
                    by_user_id = %review.by_user_id,
                    about_toy_id = %review.about_toy_id,
                    "dropping review with dangling reference"
                ),
            }
        }

        Ok(joined)
    }

    /// Stores the review in foreign-key form and returns it as stored
    ///
    /// Hydrating it with author and toy for display is the caller's job.
    pub async fn add(&self, by_user_id: DocId, about_toy_id: DocId, txt: String) -> AppResult<Review> {
        let review = Review {
            id: DocId::generate(),
            by_user_id,
            about_toy_id,
            txt,
        };
        let review = self.reviews.insert(review).await?;
        tracing::info!(review_id = %review.id, toy_id = %review.about_toy_id, "review added");
        Ok(review)
    }

    /// Deletes a review; returns how many were deleted
    ///
    /// # Arguments
    ///
    /// * `review_id` - Review to delete
    /// * `actor` - The caller, from the login token
    ///
    /// # Returns
    ///
    /// `Ok(1)` when deleted, `Ok(0)` when nothing matched.
    ///
    /// Admins may delete any review. For anyone else the delete predicate
    /// also requires them to be the author, so deleting someone else's review
    /// deletes nothing and reports 0.
    pub async fn remove(&self, review_id: &DocId, actor: &ActingUser) -> AppResult<u64> {
        let criteria = ReviewCriteria {
            id: Some(review_id.clone()),
            by_user_id: (!actor.is_admin).then(|| actor.id.clone()),
            about_toy_id: None,
        };

        let deleted = self.reviews.delete_one(&criteria).await?;
        tracing::info!(review_id = %review_id, actor_id = %actor.id, deleted, "review remove");
        Ok(deleted)
    }
}
