//! `/api/auth` handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use serde_json::json;
use validator::Validate;

use crate::auth::{hash_password, issue_token, verify_password, LOGIN_COOKIE};
use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};
use crate::model::{LoginRequest, SignupRequest, User, UserView};
use crate::service::NewUser;
use crate::state::AppState;

/// Body returned by login and signup: the user plus the token also set as a cookie
#[derive(Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub user: UserView,
    pub token: String,
}

/// `loginToken` cookie scoped to the whole site and hidden from scripts
fn login_cookie(token: String) -> Cookie<'static> {
    Cookie::build((LOGIN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn session(
    jar: CookieJar,
    user: &User,
    config: &AuthConfig,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    let token = issue_token(user, config)?;

    let mut cookie = login_cookie(token.clone());
    cookie.set_max_age(time::Duration::hours(config.token_ttl_hours.max(0)));

    let body = SessionResponse {
        user: UserView::from(user),
        token,
    };
    Ok((jar.add(cookie), Json(body)))
}

/// Checks credentials and starts a session
///
/// - **200 OK** - the user, with the `loginToken` cookie set
/// - **401 Unauthorized** - unknown username or wrong password
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(credentials): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let user = state
        .users
        .get_by_username(&credentials.username)
        .await?
        .filter(|user| verify_password(&credentials.password, &user.password))
        .ok_or_else(|| {
            tracing::info!(username = %credentials.username, "failed login");
            AppError::Unauthorized("Invalid credentials".into())
        })?;

    tracing::info!(user_id = %user.id, "user logged in");
    session(jar, &user, &state.auth)
}

/// Registers a user and starts a session
///
/// - **201 Created** - the new user, with the `loginToken` cookie set
/// - **400 Bad Request** - invalid fields
/// - **409 Conflict** - username taken
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<SignupRequest>,
) -> AppResult<impl IntoResponse> {
    request.validate()?;

    let new_user = NewUser {
        username: request.username,
        password_hash: hash_password(&request.password)?,
        fullname: request.fullname,
        score: None,
        is_admin: false,
    };
    let user = state.users.add(new_user).await?;

    Ok((StatusCode::CREATED, session(jar, &user, &state.auth)?))
}

/// Ends the session by expiring the login cookie
///
/// The expired cookie is always sent, whether or not the request carried one.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let mut expired = login_cookie(String::new());
    expired.make_removal();

    (jar.add(expired), Json(json!({ "message": "Logged out" })))
}
