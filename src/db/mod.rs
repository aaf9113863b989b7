//! Database module for SQLite operations.
//!
//! This module provides:
//! - Database initialization and migrations
//! - SQLite pragma configuration
//! - Repository layer for vaults, entries, positions and the rate cache

pub mod migrations;
pub mod repo;

pub use migrations::{init_db, init_memory_db};
pub use repo::Repository;
