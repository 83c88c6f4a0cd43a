use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::{validate_token, ActingUser, LOGIN_COOKIE};
use crate::error::AppError;
use crate::state::AppState;

/// Resolves the acting user for the request
///
/// The login token is read from the `loginToken` cookie, or from an
/// `Authorization: Bearer` header when no cookie is present. A valid token
/// puts an [`ActingUser`] into the request extensions; a missing or invalid
/// one leaves the request anonymous and lets it through, so public routes keep
/// working. Routes that need a user ask for one through the extractors below.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let actor = login_token(request.headers()).and_then(|token| validate_token(&token, &state.auth));

    if let Some(actor) = actor {
        tracing::debug!(user_id = %actor.id, is_admin = actor.is_admin, "request authenticated");
        request.extensions_mut().insert(actor);
    }

    next.run(request).await
}

fn login_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    let from_cookie = jar
        .get(LOGIN_COOKIE)
        .map(|cookie| cookie.value_trimmed().to_string())
        .filter(|token| !token.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    })
}

/// Requires a logged-in user; rejects anonymous requests with 401
impl<S: Send + Sync> FromRequestParts<S> for ActingUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ActingUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Not logged in".into()))
    }
}

/// Requires an admin; 401 when anonymous, 403 for a regular user
pub struct RequireAdmin(pub ActingUser);

impl<S: Send + Sync> FromRequestParts<S> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let actor = ActingUser::from_request_parts(parts, state).await?;
        if !actor.is_admin {
            return Err(AppError::Forbidden("Admin role required".into()));
        }
        Ok(RequireAdmin(actor))
    }
}
