// ShelfSeed - Book Club Database Seeder
// Copyright (C) 2025 ShelfSeed contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Database storage and models
//!
//! All persistence goes through this module: a pooled SQLite database
//! (WAL mode, foreign keys on), runtime migrations tracked in a
//! `_migrations` table, typed entity models, and plain-function queries.
//!
//! The seeding jobs rely on the schema's uniqueness constraints (usernames,
//! emails, dedup keys, membership pairs) to reject duplicates rather than
//! silently allowing them; the query layer exposes probe functions so
//! generators can check before inserting.
//!
//! # Usage Example
//! ```no_run
//! use shelf_seeder::storage::{queries, Database};
//!
//! # async fn example() -> shelf_seeder::Result<()> {
//! let db = Database::new("./shelfseed.db").await?;
//! let mut conn = db.acquire().await?;
//! let genre_id = queries::get_or_create_genre(&mut conn, "Mystery").await?;
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

// Re-export commonly used types
pub use database::Database;
pub use models::{
    Author, Book, BookClub, BookSource, ClubRole, Discussion, DiscussionKind, DiscussionReply,
    Genre, Membership, NewBook, NewBookClub, NewDiscussion, NewDiscussionReply, NewMembership,
    NewReadingProgress, NewReadingSession, NewReview, NewUser, NewUserProfile, ReadingProgress,
    ReadingSession, Review, SessionStatus, User, UserProfile,
};
