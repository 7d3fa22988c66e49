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
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Query functions over the seeded schema
//!
//! Every write takes `&mut SqliteConnection` so callers can run it either on
//! a pooled connection or inside a transaction (`&mut *tx`). Multi-row reads
//! used for reporting take the pool directly.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::SqliteConnection;

use crate::error::{Result, SeedError};
use crate::storage::models::{
    Author, Book, BookClub, BookSource, ClubRole, Genre, Membership, NewBook, NewBookClub,
    NewDiscussion, NewDiscussionReply, NewMembership, NewReadingProgress, NewReadingSession,
    NewReview, NewUser, NewUserProfile, ReadingSession, User,
};

// ============================================================================
// USERS
// ============================================================================

pub async fn insert_user(conn: &mut SqliteConnection, user: &NewUser) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, first_name, last_name, date_joined)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.date_joined)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn username_exists(conn: &mut SqliteConnection, username: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

pub async fn email_exists(conn: &mut SqliteConnection, email: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

pub async fn get_user_by_username(
    conn: &mut SqliteConnection,
    username: &str,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}

pub async fn list_user_ids(pool: &SqlitePool) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar("SELECT user_id FROM users ORDER BY user_id")
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

pub async fn count_users(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn insert_profile(conn: &mut SqliteConnection, profile: &NewUserProfile) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_profiles (user_id, bio, location, website, image_url, image_checked_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(profile.user_id)
    .bind(&profile.bio)
    .bind(&profile.location)
    .bind(&profile.website)
    .bind(&profile.image_url)
    .bind(profile.image_checked_at)
    .execute(conn)
    .await?;

    Ok(())
}

// ============================================================================
// AUTHORS & GENRES
// ============================================================================

/// Split a display name into (first, last) on the final space.
pub fn split_author_name(name: &str) -> (String, String) {
    let trimmed = name.trim();
    match trimmed.rsplit_once(' ') {
        Some((first, last)) => (first.to_string(), last.to_string()),
        None => (trimmed.to_string(), String::new()),
    }
}

pub async fn get_or_create_author(conn: &mut SqliteConnection, name: &str) -> Result<i64> {
    let (first_name, last_name) = split_author_name(name);

    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT author_id FROM authors WHERE first_name = ? AND last_name = ?",
    )
    .bind(&first_name)
    .bind(&last_name)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = existing {
        return Ok(id);
    }

    let result = sqlx::query("INSERT INTO authors (first_name, last_name) VALUES (?, ?)")
        .bind(&first_name)
        .bind(&last_name)
        .execute(conn)
        .await?;

    Ok(result.last_insert_rowid())
}

pub async fn get_or_create_genre(conn: &mut SqliteConnection, name: &str) -> Result<i64> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT genre_id FROM genres WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(id) = existing {
        return Ok(id);
    }

    let result = sqlx::query("INSERT INTO genres (name) VALUES (?)")
        .bind(name)
        .execute(conn)
        .await?;

    Ok(result.last_insert_rowid())
}

pub async fn list_authors(pool: &SqlitePool) -> Result<Vec<Author>> {
    let authors =
        sqlx::query_as::<_, Author>("SELECT * FROM authors ORDER BY last_name, first_name")
            .fetch_all(pool)
            .await?;
    Ok(authors)
}

pub async fn list_genres(pool: &SqlitePool) -> Result<Vec<Genre>> {
    let genres = sqlx::query_as::<_, Genre>("SELECT * FROM genres ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(genres)
}

// ============================================================================
// BOOKS
// ============================================================================

pub async fn insert_book(
    conn: &mut SqliteConnection,
    book: &NewBook,
    now: DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO books (
            external_id, isbn, isbn_10, title, description, page_count,
            publication_year, publisher, language, source, image_url,
            image_checked_at, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&book.external_id)
    .bind(&book.isbn)
    .bind(&book.isbn_10)
    .bind(&book.title)
    .bind(&book.description)
    .bind(book.page_count)
    .bind(book.publication_year)
    .bind(&book.publisher)
    .bind(&book.language)
    .bind(book.source.unwrap_or(BookSource::Manual))
    .bind(&book.image_url)
    .bind(book.image_checked_at)
    .bind(now)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Overwrite a book row with merged fields. Bumps `updated_at`.
pub async fn update_book(
    conn: &mut SqliteConnection,
    book_id: i64,
    book: &NewBook,
    now: DateTime<Utc>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE books SET
            external_id = ?, isbn = ?, isbn_10 = ?, title = ?, description = ?,
            page_count = ?, publication_year = ?, publisher = ?, language = ?,
            source = ?, image_url = ?, updated_at = ?
        WHERE book_id = ?
        "#,
    )
    .bind(&book.external_id)
    .bind(&book.isbn)
    .bind(&book.isbn_10)
    .bind(&book.title)
    .bind(&book.description)
    .bind(book.page_count)
    .bind(book.publication_year)
    .bind(&book.publisher)
    .bind(&book.language)
    .bind(book.source.unwrap_or(BookSource::Manual))
    .bind(&book.image_url)
    .bind(now)
    .bind(book_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(SeedError::RecordNotFound(format!("book {book_id}")));
    }

    Ok(())
}

pub async fn find_book_by_isbn(conn: &mut SqliteConnection, isbn: &str) -> Result<Option<Book>> {
    let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE isbn = ? OR isbn_10 = ?")
        .bind(isbn)
        .bind(isbn)
        .fetch_optional(conn)
        .await?;
    Ok(book)
}

/// Case-insensitive lookup by title joined to any author whose full name matches.
pub async fn find_book_by_title_and_author(
    conn: &mut SqliteConnection,
    title: &str,
    author: &str,
) -> Result<Option<Book>> {
    let (first_name, last_name) = split_author_name(author);

    let book = sqlx::query_as::<_, Book>(
        r#"
        SELECT b.* FROM books b
        JOIN book_authors ba ON ba.book_id = b.book_id
        JOIN authors a ON a.author_id = ba.author_id
        WHERE LOWER(b.title) = LOWER(?)
          AND LOWER(a.first_name) = LOWER(?)
          AND LOWER(a.last_name) = LOWER(?)
        "#,
    )
    .bind(title)
    .bind(first_name)
    .bind(last_name)
    .fetch_optional(conn)
    .await?;

    Ok(book)
}

pub async fn link_book_author(
    conn: &mut SqliteConnection,
    book_id: i64,
    author_id: i64,
) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO book_authors (book_id, author_id) VALUES (?, ?)")
        .bind(book_id)
        .bind(author_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn link_book_genre(
    conn: &mut SqliteConnection,
    book_id: i64,
    genre_id: i64,
) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO book_genres (book_id, genre_id) VALUES (?, ?)")
        .bind(book_id)
        .bind(genre_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn book_genre_count(conn: &mut SqliteConnection, book_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM book_genres WHERE book_id = ?")
        .bind(book_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

pub async fn list_books(pool: &SqlitePool) -> Result<Vec<Book>> {
    let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY book_id")
        .fetch_all(pool)
        .await?;
    Ok(books)
}

pub async fn list_book_ids(pool: &SqlitePool) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar("SELECT book_id FROM books ORDER BY book_id")
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

pub async fn count_books(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM books")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn get_book(conn: &mut SqliteConnection, book_id: i64) -> Result<Book> {
    sqlx::query_as::<_, Book>("SELECT * FROM books WHERE book_id = ?")
        .bind(book_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| SeedError::RecordNotFound(format!("book {book_id}")))
}

// ============================================================================
// CLUBS
// ============================================================================

pub async fn insert_club(conn: &mut SqliteConnection, club: &NewBookClub) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO book_clubs (
            name, description, creator_id, category, location, meeting_frequency,
            max_members, is_private, image_url, image_checked_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&club.name)
    .bind(&club.description)
    .bind(club.creator_id)
    .bind(&club.category)
    .bind(&club.location)
    .bind(&club.meeting_frequency)
    .bind(club.max_members)
    .bind(club.is_private)
    .bind(&club.image_url)
    .bind(club.image_checked_at)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn club_name_exists(conn: &mut SqliteConnection, name: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_clubs WHERE name = ?")
        .bind(name)
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

pub async fn list_clubs(pool: &SqlitePool) -> Result<Vec<BookClub>> {
    let clubs = sqlx::query_as::<_, BookClub>("SELECT * FROM book_clubs ORDER BY club_id")
        .fetch_all(pool)
        .await?;
    Ok(clubs)
}

pub async fn count_clubs(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM book_clubs")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn insert_membership(
    conn: &mut SqliteConnection,
    membership: &NewMembership,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO memberships (user_id, club_id, role, joined_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(membership.user_id)
    .bind(membership.club_id)
    .bind(membership.role)
    .bind(membership.joined_at)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn membership_exists(
    conn: &mut SqliteConnection,
    user_id: i64,
    club_id: i64,
) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM memberships WHERE user_id = ? AND club_id = ?")
            .bind(user_id)
            .bind(club_id)
            .fetch_one(conn)
            .await?;
    Ok(count > 0)
}

pub async fn club_member_count(conn: &mut SqliteConnection, club_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM memberships WHERE club_id = ?")
        .bind(club_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

pub async fn club_member_ids(conn: &mut SqliteConnection, club_id: i64) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar(
        "SELECT user_id FROM memberships WHERE club_id = ? ORDER BY membership_id",
    )
    .bind(club_id)
    .fetch_all(conn)
    .await?;
    Ok(ids)
}

pub async fn club_memberships(pool: &SqlitePool, club_id: i64) -> Result<Vec<Membership>> {
    let rows = sqlx::query_as::<_, Membership>(
        "SELECT * FROM memberships WHERE club_id = ? ORDER BY membership_id",
    )
    .bind(club_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn count_memberships_with_role(pool: &SqlitePool, role: ClubRole) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM memberships WHERE role = ?")
        .bind(role)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

// ============================================================================
// SESSIONS
// ============================================================================

pub async fn insert_session(
    conn: &mut SqliteConnection,
    session: &NewReadingSession,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO reading_sessions (club_id, book_id, start_date, end_date, status, notes)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(session.club_id)
    .bind(session.book_id)
    .bind(session.start_date)
    .bind(session.end_date)
    .bind(session.status)
    .bind(&session.notes)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn list_sessions(pool: &SqlitePool) -> Result<Vec<ReadingSession>> {
    let sessions =
        sqlx::query_as::<_, ReadingSession>("SELECT * FROM reading_sessions ORDER BY session_id")
            .fetch_all(pool)
            .await?;
    Ok(sessions)
}

// ============================================================================
// CONTENT
// ============================================================================

pub async fn insert_discussion(
    conn: &mut SqliteConnection,
    discussion: &NewDiscussion,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO discussions (
            club_id, book_id, session_id, author_id, title, content,
            kind, chapter_number, is_spoiler, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(discussion.club_id)
    .bind(discussion.book_id)
    .bind(discussion.session_id)
    .bind(discussion.author_id)
    .bind(&discussion.title)
    .bind(&discussion.content)
    .bind(discussion.kind)
    .bind(discussion.chapter_number)
    .bind(discussion.is_spoiler)
    .bind(discussion.created_at)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Insert a reply, refusing any parent chain that does not terminate at a
/// top-level reply of the same discussion.
pub async fn insert_reply(
    conn: &mut SqliteConnection,
    reply: &NewDiscussionReply,
) -> Result<i64> {
    if let Some(parent_id) = reply.parent_reply_id {
        verify_reply_chain(&mut *conn, reply.discussion_id, parent_id).await?;
    }

    let result = sqlx::query(
        r#"
        INSERT INTO discussion_replies (
            discussion_id, parent_reply_id, author_id, content, is_spoiler, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(reply.discussion_id)
    .bind(reply.parent_reply_id)
    .bind(reply.author_id)
    .bind(&reply.content)
    .bind(reply.is_spoiler)
    .bind(reply.created_at)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Walk the parent chain from `parent_id` to the root, tracking visited ids
/// so a cycle is detected instead of looping forever.
async fn verify_reply_chain(
    conn: &mut SqliteConnection,
    discussion_id: i64,
    parent_id: i64,
) -> Result<()> {
    let mut visited = std::collections::HashSet::new();
    let mut current = Some(parent_id);

    while let Some(id) = current {
        if !visited.insert(id) {
            return Err(SeedError::Validation(format!(
                "reply chain cycle detected at reply {id}"
            )));
        }

        let row: Option<(i64, Option<i64>)> = sqlx::query_as(
            "SELECT discussion_id, parent_reply_id FROM discussion_replies WHERE reply_id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some((disc_id, _)) if disc_id != discussion_id => {
                return Err(SeedError::Validation(format!(
                    "parent reply {id} belongs to discussion {disc_id}, not {discussion_id}"
                )));
            }
            Some((_, parent)) => current = parent,
            None => {
                return Err(SeedError::RecordNotFound(format!("parent reply {id}")));
            }
        }
    }

    Ok(())
}

pub async fn insert_review(conn: &mut SqliteConnection, review: &NewReview) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO reviews (
            user_id, book_id, session_id, rating, title, content, is_spoiler, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(review.user_id)
    .bind(review.book_id)
    .bind(review.session_id)
    .bind(review.rating)
    .bind(&review.title)
    .bind(&review.content)
    .bind(review.is_spoiler)
    .bind(review.created_at)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn review_exists(
    conn: &mut SqliteConnection,
    user_id: i64,
    book_id: i64,
) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE user_id = ? AND book_id = ?")
            .bind(user_id)
            .bind(book_id)
            .fetch_one(conn)
            .await?;
    Ok(count > 0)
}

pub async fn insert_progress(
    conn: &mut SqliteConnection,
    progress: &NewReadingProgress,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO reading_progress (
            user_id, book_id, session_id, current_page, is_finished,
            started_at, finished_at, notes
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(progress.user_id)
    .bind(progress.book_id)
    .bind(progress.session_id)
    .bind(progress.current_page)
    .bind(progress.is_finished)
    .bind(progress.started_at)
    .bind(progress.finished_at)
    .bind(&progress.notes)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn progress_exists(
    conn: &mut SqliteConnection,
    user_id: i64,
    book_id: i64,
    session_id: Option<i64>,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM reading_progress
        WHERE user_id = ? AND book_id = ? AND session_id IS ?
        "#,
    )
    .bind(user_id)
    .bind(book_id)
    .bind(session_id)
    .fetch_one(conn)
    .await?;
    Ok(count > 0)
}

pub async fn count_discussions(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM discussions")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count_reviews(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count_progress(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM reading_progress")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

// ============================================================================
// RESET
// ============================================================================

/// Delete every user-derived row while leaving the book catalog intact.
/// Delete everything the population generators create: users and the
/// rows derived from them. Superusers and the book catalog are kept.
pub async fn flush_population(conn: &mut SqliteConnection) -> Result<()> {
    for table in [
        "reading_progress",
        "reviews",
        "discussion_replies",
        "discussions",
        "reading_sessions",
        "memberships",
        "book_clubs",
    ] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *conn)
            .await?;
    }

    // Superusers are never seeded rows; they survive a flush.
    sqlx::query(
        "DELETE FROM user_profiles
         WHERE user_id IN (SELECT user_id FROM users WHERE is_superuser = 0)",
    )
    .execute(&mut *conn)
    .await?;
    sqlx::query("DELETE FROM users WHERE is_superuser = 0")
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Delete club-derived rows: sessions, memberships and the clubs
/// themselves, plus content rows that hang off a reading session.
pub async fn flush_clubs(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query("DELETE FROM reading_progress WHERE session_id IS NOT NULL")
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM reviews WHERE session_id IS NOT NULL")
        .execute(&mut *conn)
        .await?;
    for table in [
        "discussion_replies",
        "discussions",
        "reading_sessions",
        "memberships",
        "book_clubs",
    ] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Delete generated content only: discussion threads, reviews and
/// reading progress.
pub async fn flush_content(conn: &mut SqliteConnection) -> Result<()> {
    for table in [
        "reading_progress",
        "reviews",
        "discussion_replies",
        "discussions",
    ] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Delete all seeded rows, children before parents so foreign keys hold.
/// Superusers and their profiles survive.
pub async fn flush_seed_tables(conn: &mut SqliteConnection) -> Result<()> {
    for table in [
        "reading_progress",
        "reviews",
        "discussion_replies",
        "discussions",
        "reading_sessions",
        "memberships",
        "book_clubs",
        "book_genres",
        "book_authors",
        "books",
        "genres",
        "authors",
    ] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *conn)
            .await?;
    }

    sqlx::query(
        "DELETE FROM user_profiles
         WHERE user_id IN (SELECT user_id FROM users WHERE is_superuser = 0)",
    )
    .execute(&mut *conn)
    .await?;
    sqlx::query("DELETE FROM users WHERE is_superuser = 0")
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::Database;
    use crate::storage::models::DiscussionKind;
    use chrono::TimeZone;

    fn sample_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    async fn seed_actor(db: &Database, username: &str) -> i64 {
        let mut conn = db.acquire().await.unwrap();
        insert_user(
            &mut conn,
            &NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                date_joined: sample_time(),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn author_get_or_create_is_idempotent() {
        let db = Database::new_in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let a = get_or_create_author(&mut conn, "Agatha Christie").await.unwrap();
        let b = get_or_create_author(&mut conn, "Agatha Christie").await.unwrap();
        assert_eq!(a, b);

        let c = get_or_create_author(&mut conn, "Ursula K. Le Guin").await.unwrap();
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn book_lookup_by_isbn_matches_either_column() {
        let db = Database::new_in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let mut book = NewBook::new("The Dispossessed");
        book.isbn = Some("9780060512750".to_string());
        book.isbn_10 = Some("0060512750".to_string());
        insert_book(&mut conn, &book, sample_time()).await.unwrap();

        assert!(find_book_by_isbn(&mut conn, "9780060512750").await.unwrap().is_some());
        assert!(find_book_by_isbn(&mut conn, "0060512750").await.unwrap().is_some());
        assert!(find_book_by_isbn(&mut conn, "9999999999999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn title_author_lookup_is_case_insensitive() {
        let db = Database::new_in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let book_id = insert_book(&mut conn, &NewBook::new("Dune"), sample_time())
            .await
            .unwrap();
        let author_id = get_or_create_author(&mut conn, "Frank Herbert").await.unwrap();
        link_book_author(&mut conn, book_id, author_id).await.unwrap();

        let found = find_book_by_title_and_author(&mut conn, "DUNE", "frank herbert")
            .await
            .unwrap();
        assert_eq!(found.map(|b| b.book_id), Some(book_id));
    }

    #[tokio::test]
    async fn reply_chain_rejects_cross_discussion_parent() {
        let db = Database::new_in_memory().await.unwrap();
        let user_id = seed_actor(&db, "threads").await;
        let mut conn = db.acquire().await.unwrap();

        let club_id = insert_club(
            &mut conn,
            &NewBookClub {
                name: "Thread Club".to_string(),
                description: None,
                creator_id: user_id,
                category: None,
                location: None,
                meeting_frequency: None,
                max_members: 30,
                is_private: false,
                image_url: None,
                image_checked_at: None,
            },
        )
        .await
        .unwrap();

        let mut discussion = NewDiscussion {
            club_id,
            book_id: None,
            session_id: None,
            author_id: user_id,
            title: "First".to_string(),
            content: "Opening thoughts".to_string(),
            kind: DiscussionKind::General,
            chapter_number: None,
            is_spoiler: false,
            created_at: sample_time(),
        };
        let first = insert_discussion(&mut conn, &discussion).await.unwrap();
        discussion.title = "Second".to_string();
        let second = insert_discussion(&mut conn, &discussion).await.unwrap();

        let reply_id = insert_reply(
            &mut conn,
            &NewDiscussionReply {
                discussion_id: first,
                parent_reply_id: None,
                author_id: user_id,
                content: "Agreed".to_string(),
                is_spoiler: false,
                created_at: sample_time(),
            },
        )
        .await
        .unwrap();

        let err = insert_reply(
            &mut conn,
            &NewDiscussionReply {
                discussion_id: second,
                parent_reply_id: Some(reply_id),
                author_id: user_id,
                content: "Wrong thread".to_string(),
                is_spoiler: false,
                created_at: sample_time(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SeedError::Validation(_)));
    }

    #[tokio::test]
    async fn flush_clears_everything() {
        let db = Database::new_in_memory().await.unwrap();
        seed_actor(&db, "gone").await;
        let mut conn = db.acquire().await.unwrap();
        insert_book(&mut conn, &NewBook::new("Ephemeral"), sample_time())
            .await
            .unwrap();

        flush_seed_tables(&mut conn).await.unwrap();
        drop(conn);

        assert_eq!(count_users(db.pool()).await.unwrap(), 0);
        assert_eq!(count_books(db.pool()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn flush_population_preserves_superusers() {
        let db = Database::new_in_memory().await.unwrap();
        seed_actor(&db, "admin").await;
        seed_actor(&db, "regular").await;
        let mut conn = db.acquire().await.unwrap();

        sqlx::query("UPDATE users SET is_superuser = 1 WHERE username = 'admin'")
            .execute(&mut *conn)
            .await
            .unwrap();

        flush_population(&mut conn).await.unwrap();
        drop(conn);

        assert_eq!(count_users(db.pool()).await.unwrap(), 1);
        let mut conn = db.acquire().await.unwrap();
        assert!(get_user_by_username(&mut conn, "admin").await.unwrap().is_some());
        assert!(get_user_by_username(&mut conn, "regular").await.unwrap().is_none());
    }
}
