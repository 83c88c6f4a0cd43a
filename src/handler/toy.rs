//! `/api/toy` handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use validator::Validate;

use crate::auth::ActingUser;
use crate::error::{parse_id, AppError, AppResult};
use crate::middleware::RequireAdmin;
use crate::model::{MsgInput, ReviewFilter, ToyFilter, ToyInput};
use crate::service::{ToyDetail, ToyPage};
use crate::state::AppState;

/// Lists toys with filtering, sorting, pagination and chart data
///
/// # Query Parameters
///
/// - `txt` - case-insensitive name fragment
/// - `maxPrice` - price ceiling
/// - `inStock` - `true` or `false`; omit for both
/// - `labels[]` - repeatable; a toy matches if it has any of them
/// - `sortBy[type]` - `name`, `price` or `createdAt`
/// - `sortBy[desc]` - `-1` for descending, `1` for ascending
/// - `pageIdx` - 0-based page; omit to get every match
///
/// # Example Request
///
/// `GET /api/toy?txt=bear&inStock=false&labels[]=Cute&sortBy[type]=price&sortBy[desc]=-1&pageIdx=0`
///
/// # Response
///
/// ```json
/// {
///   "toys": [...],
///   "chartsData": { "pricesByLabel": {...}, "inventoryByLabel": {...}, "monthlySales": {...} },
///   "total": 14
/// }
/// ```
pub async fn list_toys(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> AppResult<Json<ToyPage>> {
    let filter = ToyFilter::from_query_pairs(&params)?;
    let page = state.toys.query(&filter).await?;
    Ok(Json(page))
}

/// Returns one toy with its neighbours' ids and its reviews
///
/// - **200 OK** - the toy
/// - **400 Bad Request** - malformed id
/// - **404 Not Found** - no such toy
pub async fn get_toy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ToyDetail>> {
    let id = parse_id(&id)?;
    let mut detail = state.toys.get_detail(&id).await?;

    let about_toy = ReviewFilter {
        about_toy_id: Some(id),
        ..ReviewFilter::default()
    };
    detail.reviews = state.reviews.query(&about_toy).await?;

    Ok(Json(detail))
}

/// Creates a toy owned by the calling admin
pub async fn add_toy(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    Json(input): Json<ToyInput>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let toy = state.toys.add(input, actor.summary()).await?;
    Ok((StatusCode::CREATED, Json(toy)))
}

/// Replaces a toy's name, price, stock flag and labels
pub async fn update_toy(
    State(state): State<AppState>,
    RequireAdmin(_actor): RequireAdmin,
    Path(id): Path<String>,
    Json(input): Json<ToyInput>,
) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    input.validate()?;
    let toy = state.toys.update(&id, input).await?;
    Ok(Json(toy))
}

pub async fn remove_toy(
    State(state): State<AppState>,
    RequireAdmin(_actor): RequireAdmin,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let deleted = state.toys.remove(&id).await?;
    if deleted == 0 {
        return Err(AppError::not_found("toy", &id));
    }

    Ok(Json(json!({
        "message": format!("{deleted} toys removed"),
        "deletedId": id
    })))
}

/// Appends a message from the caller to a toy
pub async fn add_msg(
    State(state): State<AppState>,
    actor: ActingUser,
    Path(id): Path<String>,
    Json(input): Json<MsgInput>,
) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    input.validate()?;
    let msg = state.toys.add_msg(&id, input.txt, actor.summary()).await?;
    Ok((StatusCode::CREATED, Json(msg)))
}

pub async fn remove_msg(
    State(state): State<AppState>,
    actor: ActingUser,
    Path((id, msg_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let msg_id = parse_id(&msg_id)?;
    state.toys.remove_msg(&id, &msg_id, &actor).await?;

    Ok(Json(json!({
        "message": "Message removed",
        "deletedId": msg_id
    })))
}
