//! Route definitions for the toy shop API
//!
//! This module maps every HTTP route to its handler and attaches the
//! middleware that resolves the acting user.

use axum::routing::{delete, get, post};
use axum::{middleware, Router};

use crate::handler::{auth, review, toy, user};
use crate::middleware::auth_middleware;
use crate::state::AppState;

/// Creates the router with all routes under `/api`
///
/// # Route Definitions
///
/// - `GET /api/toy` - filtered, sorted, paginated listing with chart data
/// - `GET /api/toy/{id}` - one toy with neighbours and reviews
/// - `POST /api/toy`, `PUT /api/toy/{id}`, `DELETE /api/toy/{id}` - admin only
/// - `POST /api/toy/{id}/msg`, `DELETE /api/toy/{id}/msg/{msg_id}` - logged in
/// - `GET /api/user`, `GET /api/user/{id}`
/// - `PUT /api/user` - adjust own score; `PUT /api/user/{id}` - self or admin
/// - `DELETE /api/user/{id}` - admin only
/// - `GET /api/review`, `POST /api/review`, `DELETE /api/review/{id}`
/// - `POST /api/auth/login`, `POST /api/auth/signup`, `POST /api/auth/logout`
///
/// Role checks happen in the handlers' extractors
/// ([`crate::auth::ActingUser`], [`crate::middleware::RequireAdmin`]).
///
/// ```no_run
/// # use std::sync::Arc;
/// # use toyshop::config::AuthConfig;
/// # use toyshop::database::init_db;
/// # use toyshop::route::create_app;
/// # use toyshop::state::AppState;
/// # let db = init_db("data.db").unwrap();
/// let state = AppState::with_redb(Arc::new(db), AuthConfig::new("secret"));
/// let app = create_app(state);
/// // axum::serve(listener, app).await.unwrap();
/// ```
pub fn create_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/toy", get(toy::list_toys).post(toy::add_toy))
        .route(
            "/toy/{id}",
            get(toy::get_toy)
                .put(toy::update_toy)
                .delete(toy::remove_toy),
        )
        .route("/toy/{id}/msg", post(toy::add_msg))
        .route("/toy/{id}/msg/{msg_id}", delete(toy::remove_msg))
        .route("/user", get(user::list_users).put(user::adjust_score))
        .route(
            "/user/{id}",
            get(user::get_user)
                .put(user::update_user)
                .delete(user::remove_user),
        )
        .route("/review", get(review::list_reviews).post(review::add_review))
        .route("/review/{id}", delete(review::remove_review))
        .route("/auth/login", post(auth::login))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/logout", post(auth::logout))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
}
