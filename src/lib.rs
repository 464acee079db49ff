// Session Sync - Library root

pub mod auth;
pub mod config;
pub mod error;
pub mod http_client;
pub mod models;
pub mod pagination;

pub use error::{Result, SyncError};
