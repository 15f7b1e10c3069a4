//! Bookshelf library server
//!
//! A REST JSON API over a small library catalog: members register, browse
//! books by category, and borrow, renew and return copies under a fixed
//! loan policy.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod policy;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<services::Services>,
}
