//! Integration tests for sessions and the user API
//!
//! Covers signup, login and logout through the `loginToken` cookie, the
//! bearer-token fallback, and the permission rules on user updates and
//! score changes.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use tower::ServiceExt;

use toyshop::auth::hash_password;
use toyshop::config::AuthConfig;
use toyshop::database::init_db;
use toyshop::route::create_app;
use toyshop::service::NewUser;
use toyshop::state::AppState;

/// Creates a test application with a temporary database
fn setup_test_app() -> (axum::Router, AppState, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db = init_db(temp_db.path().to_str().unwrap()).expect("Failed to initialize test database");
    let state = AppState::with_redb(Arc::new(db), AuthConfig::new("auth-test-secret"));

    (create_app(state.clone()), state, temp_db)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

/// Returns the `loginToken=...` pair from a `Set-Cookie` header
fn login_cookie(response: &Response<Body>) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Missing Set-Cookie header")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn signup(app: &axum::Router, username: &str) -> (String, Value) {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/signup",
            json!({ "username": username, "password": "secret", "fullname": format!("{username} ja") }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = login_cookie(&response);
    (cookie, response_json(response).await)
}

#[tokio::test]
async fn test_signup_sets_cookie_and_hides_password() {
    let (app, _state, _temp_db) = setup_test_app();

    let (cookie, body) = signup(&app, "puki").await;

    assert!(cookie.starts_with("loginToken="));
    assert!(cookie.len() > "loginToken=".len());
    assert_eq!(body["username"], "puki");
    assert_eq!(body["fullname"], "puki ja");
    assert_eq!(body["score"], 1000);
    assert_eq!(body["isAdmin"], false);
    assert!(body.get("password").is_none());
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn test_session_cookie_attributes() {
    let (app, _state, _temp_db) = setup_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/signup",
            json!({ "username": "puki", "password": "secret", "fullname": "Puki Ja" }),
        ))
        .await
        .unwrap();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let token = response_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    assert!(set_cookie.starts_with(&format!("loginToken={token};")));
    for attribute in ["HttpOnly", "SameSite=Lax", "Path=/", "Max-Age=86400"] {
        assert!(set_cookie.contains(attribute), "{attribute} missing in {set_cookie}");
    }
}

#[tokio::test]
async fn test_signup_duplicate_username_conflicts() {
    let (app, _state, _temp_db) = setup_test_app();
    signup(&app, "puki").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/signup",
            json!({ "username": "puki", "password": "other", "fullname": "Another Puki" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(response_json(response).await["code"], "conflict");
}

#[tokio::test]
async fn test_signup_rejects_short_password() {
    let (app, _state, _temp_db) = setup_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/signup",
            json!({ "username": "puki", "password": "abc", "fullname": "Puki" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_checks_password() {
    let (app, _state, _temp_db) = setup_test_app();
    signup(&app, "puki").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "username": "puki", "password": "wrong" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "username": "nobody", "password": "secret" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "username": "puki", "password": "secret" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(login_cookie(&response).starts_with("loginToken="));
}

#[tokio::test]
async fn test_cookie_and_bearer_token_both_authenticate() {
    let (app, _state, _temp_db) = setup_test_app();
    let (cookie, body) = signup(&app, "puki").await;
    let token = body["token"].as_str().unwrap().to_string();

    let by_cookie = Request::builder()
        .method("PUT")
        .uri("/api/user")
        .header(header::COOKIE, format!("theme=dark; {cookie}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "diff": -10 }).to_string()))
        .unwrap();
    let response = app.clone().oneshot(by_cookie).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["score"], 990);

    let by_bearer = Request::builder()
        .method("PUT")
        .uri("/api/user")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "diff": -10 }).to_string()))
        .unwrap();
    let response = app.clone().oneshot(by_bearer).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["score"], 980);

    let forged = Request::builder()
        .method("PUT")
        .uri("/api/user")
        .header(header::AUTHORIZATION, "Bearer not.a.token")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "diff": -10 }).to_string()))
        .unwrap();
    let response = app.oneshot(forged).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_score_cannot_drop_below_zero() {
    let (app, _state, _temp_db) = setup_test_app();
    let (cookie, _) = signup(&app, "puki").await;

    let request = Request::builder()
        .method("PUT")
        .uri("/api/user")
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "diff": -1001 }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["code"], "validation_error");
}

#[tokio::test]
async fn test_logout_expires_cookie() {
    let (app, _state, _temp_db) = setup_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("loginToken=;"));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_list_users_never_exposes_passwords() {
    let (app, _state, _temp_db) = setup_test_app();
    signup(&app, "puki").await;
    signup(&app, "muki").await;

    let request = Request::builder()
        .uri("/api/user?txt=UK")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let users = response_json(response).await;
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["username"], "muki");
    assert!(users.iter().all(|user| user.get("password").is_none()));
}

#[tokio::test]
async fn test_list_users_rejects_non_numeric_min_score() {
    let (app, _state, _temp_db) = setup_test_app();
    signup(&app, "puki").await;

    let request = Request::builder()
        .uri("/api/user?minScore=abc")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert_eq!(body["code"], "validation_error");
    assert!(body["error"].as_str().unwrap().contains("minScore"));

    let request = Request::builder()
        .uri("/api/user?minScore=")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_user_updates_follow_roles() {
    let (app, state, _temp_db) = setup_test_app();
    let (puki_cookie, puki) = signup(&app, "puki").await;
    let (_, muki) = signup(&app, "muki").await;

    state
        .users
        .add(NewUser {
            username: "admin".into(),
            password_hash: hash_password("admin-pass").unwrap(),
            fullname: "Admin Admin".into(),
            score: None,
            is_admin: true,
        })
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "username": "admin", "password": "admin-pass" }),
        ))
        .await
        .unwrap();
    let admin_cookie = login_cookie(&response);

    let update = |cookie: &str, id: &Value, body: Value| {
        Request::builder()
            .method("PUT")
            .uri(format!("/api/user/{}", id.as_str().unwrap()))
            .header(header::COOKIE, cookie.to_string())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let response = app
        .clone()
        .oneshot(update(&puki_cookie, &muki["_id"], json!({ "fullname": "Hacked" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(update(&puki_cookie, &puki["_id"], json!({ "score": 99999 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(update(&puki_cookie, &puki["_id"], json!({ "username": "muki" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(update(&puki_cookie, &puki["_id"], json!({ "fullname": "Puki Renamed" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["fullname"], "Puki Renamed");

    let response = app
        .clone()
        .oneshot(update(&admin_cookie, &muki["_id"], json!({ "score": 5 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["score"], 5);
}

#[tokio::test]
async fn test_remove_user_is_admin_only() {
    let (app, state, _temp_db) = setup_test_app();
    let (puki_cookie, puki) = signup(&app, "puki").await;
    let puki_uri = format!("/api/user/{}", puki["_id"].as_str().unwrap());

    let delete = |uri: &str, cookie: &str| {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .header(header::COOKIE, cookie.to_string())
            .body(Body::empty())
            .unwrap()
    };

    let response = app
        .clone()
        .oneshot(delete(&puki_uri, &puki_cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = state
        .users
        .add(NewUser {
            username: "admin".into(),
            password_hash: hash_password("admin-pass").unwrap(),
            fullname: "Admin Admin".into(),
            score: None,
            is_admin: true,
        })
        .await
        .unwrap();
    let admin_token = toyshop::auth::issue_token(&admin, &state.auth).unwrap();
    let admin_cookie = format!("loginToken={admin_token}");

    let response = app
        .clone()
        .oneshot(delete(&puki_uri, &admin_cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(delete(&puki_uri, &admin_cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let request = Request::builder()
        .uri(&puki_uri)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bootstrapped_admin_can_log_in_and_add_toys() {
    let (app, state, _temp_db) = setup_test_app();
    let (_, existing) = signup(&app, "owner").await;

    let admin = state
        .users
        .ensure_admin(NewUser {
            username: "owner".into(),
            password_hash: hash_password("ignored").unwrap(),
            fullname: "Shop Owner".into(),
            score: None,
            is_admin: true,
        })
        .await
        .unwrap();
    assert_eq!(admin.id.as_str(), existing["_id"].as_str().unwrap());

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "username": "owner", "password": "secret" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = login_cookie(&response);
    assert_eq!(response_json(response).await["isAdmin"], true);

    let request = Request::builder()
        .method("POST")
        .uri("/api/toy")
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "name": "Kite", "price": 12 }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}
