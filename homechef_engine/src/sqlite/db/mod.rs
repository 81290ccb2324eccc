//! # SQLite database methods
//!
//! This module contains the "low-level" SQLite interactions.
//!
//! All of them are plain functions (rather than stateful structs) that accept a `&mut SqliteConnection` argument.
//! Callers can obtain a connection from a pool, or open a transaction as the need arises and pass `&mut *tx`
//! through without any other changes. Every multi-statement flow in `sqlite_impl` is built this way.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod customers;
pub mod orders;
pub mod outbox;
pub mod ratings;
pub mod reviews;
pub mod shifts;

const SQLITE_DB_URL: &str = "sqlite://data/homechef.db";

pub fn db_url() -> String {
    let result = env::var("HC_DATABASE_URL").unwrap_or_else(|_| {
        info!("HC_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
