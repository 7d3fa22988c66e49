//! Database models for the seeding pipeline
//!
//! Entity structs decoded with `sqlx::FromRow` plus `New*` structs for
//! inserts. Enums are stored as lowercase TEXT; timestamps as ISO-8601
//! TEXT (chrono handles both directions).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============================================================================
// ENUMS
// ============================================================================

/// Membership role within a club
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ClubRole {
    Member,
    Moderator,
    Admin,
}

impl ClubRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClubRole::Member => "member",
            ClubRole::Moderator => "moderator",
            ClubRole::Admin => "admin",
        }
    }

    /// Whether the role carries elevated club permissions
    pub fn is_elevated(&self) -> bool {
        matches!(self, ClubRole::Moderator | ClubRole::Admin)
    }
}

/// Reading session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Upcoming,
    Current,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Upcoming => "upcoming",
            SessionStatus::Current => "current",
            SessionStatus::Completed => "completed",
        }
    }
}

/// Discussion thread kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DiscussionKind {
    General,
    Chapter,
    Review,
    Meeting,
}

/// Provenance of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookSource {
    Openlibrary,
    Manual,
}

// ============================================================================
// ACTORS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
    pub is_superuser: bool,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub user_id: i64,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub image_url: Option<String>,
    pub image_checked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewUserProfile {
    pub user_id: i64,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub image_url: Option<String>,
    pub image_checked_at: Option<DateTime<Utc>>,
}

// ============================================================================
// CATALOG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Author {
    pub author_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Genre {
    pub genre_id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub book_id: i64,
    pub external_id: Option<String>,
    pub isbn: Option<String>,
    pub isbn_10: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub page_count: Option<i64>,
    pub publication_year: Option<i64>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub source: BookSource,
    pub image_url: Option<String>,
    pub image_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for inserting a new book
#[derive(Debug, Clone, Default)]
pub struct NewBook {
    pub external_id: Option<String>,
    pub isbn: Option<String>,
    pub isbn_10: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub page_count: Option<i64>,
    pub publication_year: Option<i64>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub source: Option<BookSource>,
    pub image_url: Option<String>,
    pub image_checked_at: Option<DateTime<Utc>>,
}

impl NewBook {
    pub fn new<S: Into<String>>(title: S) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

// ============================================================================
// CLUBS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BookClub {
    pub club_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: i64,
    pub category: Option<String>,
    pub location: Option<String>,
    pub meeting_frequency: Option<String>,
    pub max_members: i64,
    pub is_private: bool,
    pub image_url: Option<String>,
    pub image_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBookClub {
    pub name: String,
    pub description: Option<String>,
    pub creator_id: i64,
    pub category: Option<String>,
    pub location: Option<String>,
    pub meeting_frequency: Option<String>,
    pub max_members: i64,
    pub is_private: bool,
    pub image_url: Option<String>,
    pub image_checked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub membership_id: i64,
    pub user_id: i64,
    pub club_id: i64,
    pub role: ClubRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMembership {
    pub user_id: i64,
    pub club_id: i64,
    pub role: ClubRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReadingSession {
    pub session_id: i64,
    pub club_id: i64,
    pub book_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: SessionStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewReadingSession {
    pub club_id: i64,
    pub book_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: SessionStatus,
    pub notes: Option<String>,
}

// ============================================================================
// CONTENT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Discussion {
    pub discussion_id: i64,
    pub club_id: i64,
    pub book_id: Option<i64>,
    pub session_id: Option<i64>,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub kind: DiscussionKind,
    pub chapter_number: Option<i64>,
    pub is_spoiler: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDiscussion {
    pub club_id: i64,
    pub book_id: Option<i64>,
    pub session_id: Option<i64>,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub kind: DiscussionKind,
    pub chapter_number: Option<i64>,
    pub is_spoiler: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DiscussionReply {
    pub reply_id: i64,
    pub discussion_id: i64,
    pub parent_reply_id: Option<i64>,
    pub author_id: i64,
    pub content: String,
    pub is_spoiler: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDiscussionReply {
    pub discussion_id: i64,
    pub parent_reply_id: Option<i64>,
    pub author_id: i64,
    pub content: String,
    pub is_spoiler: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub review_id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub session_id: Option<i64>,
    pub rating: i64,
    pub title: String,
    pub content: String,
    pub is_spoiler: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub user_id: i64,
    pub book_id: i64,
    pub session_id: Option<i64>,
    pub rating: i64,
    pub title: String,
    pub content: String,
    pub is_spoiler: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReadingProgress {
    pub progress_id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub session_id: Option<i64>,
    pub current_page: i64,
    pub is_finished: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewReadingProgress {
    pub user_id: i64,
    pub book_id: i64,
    pub session_id: Option<i64>,
    pub current_page: i64,
    pub is_finished: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl NewReadingProgress {
    /// Clamp `current_page` to the book's page count.
    ///
    /// Progress past the last page is a data-integrity bug in the upstream
    /// schema; writes here never exceed the declared count.
    pub fn clamp_to(mut self, page_count: Option<i64>) -> Self {
        if let Some(count) = page_count {
            if self.current_page > count {
                self.current_page = count;
            }
        }
        self
    }
}
