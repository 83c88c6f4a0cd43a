//! Library exports for the toy shop backend
//!
//! This module exposes internal components for testing and for the binary.

pub mod auth;
pub mod config;
pub mod criteria;
pub mod database;
pub mod error;
pub mod flat_file;
pub mod handler;
pub mod id;
pub mod middleware;
pub mod model;
pub mod route;
pub mod service;
pub mod state;
pub mod stats;
pub mod store;
