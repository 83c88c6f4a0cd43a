//! `/api/user` handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use validator::Validate;

use crate::auth::ActingUser;
use crate::error::{parse_id, AppError, AppResult};
use crate::middleware::RequireAdmin;
use crate::model::{ScoreDiff, UserFilter, UserPatch, UserUpdateRequest, UserView};
use crate::state::AppState;

/// `GET /api/user?txt=&minScore=`
///
/// - **200 OK** - matching users, ordered by username
/// - **400 Bad Request** - `minScore` is not an integer
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> AppResult<Json<Vec<UserView>>> {
    let filter = UserFilter::from_query_pairs(&params)?;
    Ok(Json(state.users.query(&filter).await?))
}

/// `GET /api/user/{id}`
///
/// - **200 OK** - the user, without password hash
/// - **400 Bad Request** - malformed id
/// - **404 Not Found** - no such user
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<UserView>> {
    let id = parse_id(&id)?;
    Ok(Json(state.users.get_by_id(&id).await?))
}

/// `PUT /api/user/{id}`: updates username, fullname or score
///
/// Users may edit themselves; admins may edit anyone. Only admins can set a
/// score directly.
///
/// # Example Request
///
/// ```json
/// { "fullname": "Puki Ja", "score": 200 }
/// ```
///
/// - **200 OK** - the updated user
/// - **403 Forbidden** - editing someone else, or setting a score as a non-admin
/// - **404 Not Found** - no such user
pub async fn update_user(
    State(state): State<AppState>,
    actor: ActingUser,
    Path(id): Path<String>,
    Json(input): Json<UserUpdateRequest>,
) -> AppResult<Json<UserView>> {
    let id = parse_id(&id)?;
    input.validate()?;

    // Role checks come before any lookup
    if !actor.is_admin && actor.id != id {
        return Err(AppError::Forbidden("Cannot update another user".into()));
    }
    if !actor.is_admin && input.score.is_some() {
        return Err(AppError::Forbidden("Only an admin can set a score".into()));
    }

    let patch = UserPatch {
        username: input.username,
        fullname: input.fullname,
        score: input.score,
        ..UserPatch::default()
    };
    Ok(Json(state.users.update(&id, patch).await?))
}

/// `PUT /api/user` with `{"diff": -50}`: spends or credits the caller's score
///
/// - **200 OK** - the updated user
/// - **400 Bad Request** - the score would drop below zero
pub async fn adjust_score(
    State(state): State<AppState>,
    actor: ActingUser,
    Json(input): Json<ScoreDiff>,
) -> AppResult<Json<UserView>> {
    let user = state.users.adjust_score(&actor.id, input.diff).await?;
    Ok(Json(UserView::from(&user)))
}

/// `DELETE /api/user/{id}`, admins only
///
/// - **200 OK** - `{"message", "deletedId"}`
/// - **404 Not Found** - no such user
pub async fn remove_user(
    State(state): State<AppState>,
    RequireAdmin(_actor): RequireAdmin,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let id = parse_id(&id)?;
    if state.users.remove(&id).await? == 0 {
        return Err(AppError::not_found("user", &id));
    }

    Ok(Json(json!({
        "message": "Deleted successfully",
        "deletedId": id
    })))
}
