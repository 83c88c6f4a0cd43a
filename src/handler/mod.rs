//! HTTP request handlers
//!
//! Handlers parse and validate the request, call one or more services and
//! shape the response. Business rules live in [`crate::service`].

pub mod auth;
pub mod review;
pub mod toy;
pub mod user;
