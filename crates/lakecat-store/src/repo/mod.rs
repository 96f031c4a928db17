//! Repository layer for catalog records in SQLite

pub mod sqlite_repo;

pub use sqlite_repo::{LineageRecord, NewEntry, SqliteRepo};
