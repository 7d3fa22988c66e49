//! ShelfSeed database seeding and enrichment pipeline.
//!
//! This crate populates a fresh book-club database with large volumes of
//! realistic, internally-consistent synthetic data. It is built from four
//! coordinated pieces:
//!
//! - [`api`] — a rate-limited, retrying client for the Open Library
//!   bibliographic API, used to enrich imported book records.
//! - [`seed`] — the batch importer and population generators (users, clubs,
//!   discussions, reviews, reading progress) plus the master orchestrator
//!   that sequences them.
//! - [`images`] — a periodic validator that checks stored image URLs for
//!   liveness and swaps dead links for deterministic placeholders.
//! - [`storage`] — the SQLite storage layer (sqlx) with runtime migrations.
//!
//! Every job is idempotent (safe to re-run without duplication), resilient
//! to external-service failure, and commits in bounded batches so an
//! interrupted run never leaves a half-written batch behind.

pub mod api;
pub mod error;
pub mod images;
pub mod seed;
pub mod storage;

pub use error::{Result, SeedError};
