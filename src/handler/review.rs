//! `/api/review` handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use validator::Validate;

use crate::auth::ActingUser;
use crate::error::{parse_id, AppResult};
use crate::model::{ReviewFilter, ReviewInput, ReviewParams, ReviewView};
use crate::state::AppState;

/// `GET /api/review?byUserId=&aboutToyId=`
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(params): Query<ReviewParams>,
) -> AppResult<Json<Vec<ReviewView>>> {
    let filter = ReviewFilter {
        by_user_id: params.by_user_id.as_deref().map(parse_id).transpose()?,
        about_toy_id: params.about_toy_id.as_deref().map(parse_id).transpose()?,
    };
    Ok(Json(state.reviews.query(&filter).await?))
}

/// Posts a review by the caller about an existing toy
///
/// The engine stores only the foreign keys; the response is hydrated here
/// with the caller's summary and the toy's summary.
///
/// - **201 Created** - the joined review
/// - **404 Not Found** - no such toy
pub async fn add_review(
    State(state): State<AppState>,
    actor: ActingUser,
    Json(input): Json<ReviewInput>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let toy_id = parse_id(&input.about_toy_id)?;
    let toy = state.toys.get_by_id(&toy_id).await?;

    let review = state
        .reviews
        .add(actor.id.clone(), toy.id.clone(), input.txt)
        .await?;

    let view = ReviewView {
        id: review.id,
        txt: review.txt,
        by_user: actor.summary(),
        about_toy: toy.summary(),
    };
    Ok((StatusCode::CREATED, Json(view)))
}

/// Deletes a review; non-admins can only delete their own
///
/// Always 200; `deletedCount` is 0 when nothing was removed.
pub async fn remove_review(
    State(state): State<AppState>,
    actor: ActingUser,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let deleted = state.reviews.remove(&id, &actor).await?;

    Ok(Json(json!({
        "message": format!("{deleted} reviews removed successfully"),
        "deletedCount": deleted
    })))
}
