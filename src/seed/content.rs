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

//! Content seeder: discussions with threaded replies, bell-curve reviews
//! and reading progress, including session-linked progress.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sqlx::SqliteConnection;
use tracing::info;

use crate::error::{Result, SeedError};
use crate::seed::factory;
use crate::seed::SeedReport;
use crate::storage::database::Database;
use crate::storage::models::{
    Book, DiscussionKind, NewDiscussion, NewDiscussionReply, NewReadingProgress, NewReview,
    ReadingSession,
};
use crate::storage::queries;

#[derive(Debug, Clone)]
pub struct ContentSeedConfig {
    pub discussions: u64,
    pub reviews: u64,
    pub progress: u64,
    /// Flush existing discussions, reviews and progress first
    pub clear: bool,
    pub dry_run: bool,
    pub reference_time: DateTime<Utc>,
    pub seed: Option<u64>,
}

impl Default for ContentSeedConfig {
    fn default() -> Self {
        Self {
            discussions: 50,
            reviews: 100,
            progress: 200,
            clear: false,
            dry_run: false,
            reference_time: Utc::now(),
            seed: None,
        }
    }
}

/// Uniqueness-constrained targets get this many draw attempts per row
/// before the pass gives up on the remainder.
const ATTEMPT_FACTOR: u64 = 3;

pub struct ContentSeeder {
    config: ContentSeedConfig,
}

impl ContentSeeder {
    pub fn new(config: ContentSeedConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self, db: &Database) -> Result<SeedReport> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        if self.config.clear {
            let mut conn = db.acquire().await?;
            queries::flush_content(&mut conn).await?;
            info!("existing content flushed");
        }

        let user_ids = queries::list_user_ids(db.pool()).await?;
        let books = queries::list_books(db.pool()).await?;
        let clubs = queries::list_clubs(db.pool()).await?;
        if user_ids.is_empty() || clubs.is_empty() {
            return Err(SeedError::InvalidState(
                "cannot seed content before users and clubs exist".to_string(),
            ));
        }
        if books.is_empty() {
            return Err(SeedError::InvalidState(
                "cannot seed content with an empty catalog".to_string(),
            ));
        }
        let sessions = queries::list_sessions(db.pool()).await?;

        let mut report = SeedReport::default();
        let mut tx = db.pool().begin().await?;

        let club_ids: Vec<i64> = clubs.iter().map(|c| c.club_id).collect();
        report.merge(
            &self
                .seed_discussions(&mut tx, &mut rng, &club_ids, &books, &sessions)
                .await?,
        );
        report.merge(&self.seed_reviews(&mut tx, &mut rng, &user_ids, &books).await?);
        report.merge(
            &self
                .seed_progress(&mut tx, &mut rng, &user_ids, &books, &sessions)
                .await?,
        );

        if self.config.dry_run {
            tx.rollback().await?;
        } else {
            tx.commit().await?;
        }

        info!(%report, "content seeding finished");
        Ok(report)
    }

    async fn seed_discussions(
        &self,
        conn: &mut SqliteConnection,
        rng: &mut StdRng,
        club_ids: &[i64],
        books: &[Book],
        sessions: &[ReadingSession],
    ) -> Result<SeedReport> {
        let mut report = SeedReport::default();
        let now = self.config.reference_time;

        for _ in 0..self.config.discussions {
            let club_id = *club_ids.choose(rng).unwrap();
            let members = queries::club_member_ids(&mut *conn, club_id).await?;
            if members.is_empty() {
                report.skipped += 1;
                continue;
            }

            let kind = *[
                DiscussionKind::General,
                DiscussionKind::General,
                DiscussionKind::Chapter,
                DiscussionKind::Chapter,
                DiscussionKind::Review,
                DiscussionKind::Meeting,
            ]
            .choose(rng)
            .unwrap();

            // Chapter and review threads anchor to the club's current
            // session when it has one.
            let session = sessions.iter().find(|s| s.club_id == club_id);
            let book = match (kind, session) {
                (DiscussionKind::Chapter | DiscussionKind::Review, Some(s)) => {
                    books.iter().find(|b| b.book_id == s.book_id)
                }
                (DiscussionKind::Meeting, _) => None,
                _ => books.choose(rng),
            };
            let book_title = book.map(|b| b.title.as_str());

            let created_at = factory::datetime_between(rng, now - Duration::days(180), now);
            let discussion_id = queries::insert_discussion(
                &mut *conn,
                &NewDiscussion {
                    club_id,
                    book_id: book.map(|b| b.book_id),
                    session_id: session.map(|s| s.session_id),
                    author_id: *members.choose(rng).unwrap(),
                    title: factory::discussion_title(rng, kind, book_title),
                    content: factory::discussion_content(rng, book_title),
                    kind,
                    chapter_number: matches!(kind, DiscussionKind::Chapter)
                        .then(|| rng.gen_range(1..=20)),
                    is_spoiler: rng.gen_bool(0.15),
                    created_at,
                },
            )
            .await?;
            report.created += 1;

            self.seed_replies(
                &mut *conn,
                rng,
                discussion_id,
                &members,
                book_title,
                created_at,
            )
            .await?;
        }

        Ok(report)
    }

    /// 0-8 replies per thread. A reply nests under an earlier reply 30% of
    /// the time; parents are always drawn from already-inserted replies of
    /// the same thread, so chains stay acyclic.
    async fn seed_replies(
        &self,
        conn: &mut SqliteConnection,
        rng: &mut StdRng,
        discussion_id: i64,
        members: &[i64],
        book_title: Option<&str>,
        thread_started: DateTime<Utc>,
    ) -> Result<()> {
        let now = self.config.reference_time;
        let count = rng.gen_range(0..=8);
        let mut inserted: Vec<i64> = Vec::with_capacity(count);

        for _ in 0..count {
            let parent_reply_id = if !inserted.is_empty() && rng.gen_bool(0.3) {
                Some(*inserted.choose(rng).unwrap())
            } else {
                None
            };

            let reply_id = queries::insert_reply(
                &mut *conn,
                &NewDiscussionReply {
                    discussion_id,
                    parent_reply_id,
                    author_id: *members.choose(rng).unwrap(),
                    content: factory::reply_content(rng, book_title),
                    is_spoiler: rng.gen_bool(0.1),
                    created_at: factory::datetime_between(rng, thread_started, now),
                },
            )
            .await?;
            inserted.push(reply_id);
        }

        Ok(())
    }

    async fn seed_reviews(
        &self,
        conn: &mut SqliteConnection,
        rng: &mut StdRng,
        user_ids: &[i64],
        books: &[Book],
    ) -> Result<SeedReport> {
        let mut report = SeedReport::default();
        let now = self.config.reference_time;
        let mut attempts = self.config.reviews * ATTEMPT_FACTOR;

        while report.created < self.config.reviews && attempts > 0 {
            attempts -= 1;
            let user_id = *user_ids.choose(rng).unwrap();
            let book = books.choose(rng).unwrap();

            if queries::review_exists(&mut *conn, user_id, book.book_id).await? {
                report.skipped += 1;
                continue;
            }

            let rating = factory::normal_rating(rng);
            queries::insert_review(
                &mut *conn,
                &NewReview {
                    user_id,
                    book_id: book.book_id,
                    session_id: None,
                    rating,
                    title: factory::review_title(rng, rating),
                    content: factory::review_content(rng, rating, &book.title),
                    is_spoiler: rng.gen_bool(0.1),
                    created_at: factory::datetime_between(rng, now - Duration::days(365), now),
                },
            )
            .await?;
            report.created += 1;
        }

        Ok(report)
    }

    async fn seed_progress(
        &self,
        conn: &mut SqliteConnection,
        rng: &mut StdRng,
        user_ids: &[i64],
        books: &[Book],
        sessions: &[ReadingSession],
    ) -> Result<SeedReport> {
        let mut report = SeedReport::default();
        let now = self.config.reference_time;
        let mut attempts = self.config.progress * ATTEMPT_FACTOR;

        while report.created < self.config.progress && attempts > 0 {
            attempts -= 1;

            // Link roughly a third of progress rows to a reading session,
            // reading the session's own book.
            let (user_id, book, session_id) = if !sessions.is_empty() && rng.gen_bool(0.3) {
                let session = sessions.choose(rng).unwrap();
                let members = queries::club_member_ids(&mut *conn, session.club_id).await?;
                let Some(user_id) = members.choose(rng).copied() else {
                    report.skipped += 1;
                    continue;
                };
                let Some(book) = books.iter().find(|b| b.book_id == session.book_id) else {
                    report.skipped += 1;
                    continue;
                };
                (user_id, book, Some(session.session_id))
            } else {
                (
                    *user_ids.choose(rng).unwrap(),
                    books.choose(rng).unwrap(),
                    None,
                )
            };

            if queries::progress_exists(&mut *conn, user_id, book.book_id, session_id).await? {
                report.skipped += 1;
                continue;
            }

            let pages = book.page_count.unwrap_or(300).max(1);
            let is_finished = rng.gen_bool(0.4);
            let started_at = factory::datetime_between(rng, now - Duration::days(365), now);
            let progress = NewReadingProgress {
                user_id,
                book_id: book.book_id,
                session_id,
                current_page: if is_finished {
                    pages
                } else {
                    rng.gen_range(1..=pages)
                },
                is_finished,
                started_at: Some(started_at),
                finished_at: is_finished
                    .then(|| factory::datetime_between(rng, started_at, now)),
                notes: None,
            }
            .clamp_to(book.page_count);

            queries::insert_progress(&mut *conn, &progress).await?;
            report.created += 1;
        }

        Ok(report)
    }
}
