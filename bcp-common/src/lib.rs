//! # BudgetCasa Pro Common Library
//!
//! Shared code for the BudgetCasa Pro lead services including:
//! - Error types
//! - Configuration loading and root folder resolution
//! - SQLite schema initialization and runtime settings
//! - Domain event types (BcpEvent enum) and the EventBus

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
