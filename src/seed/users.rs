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

//! User population seeder: profiles, club participation and reading history.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::error::Result;
use crate::seed::factory;
use crate::seed::source::ReadingLogEntry;
use crate::seed::SeedReport;
use crate::storage::database::Database;
use crate::storage::models::{
    Book, ClubRole, NewBookClub, NewMembership, NewReadingProgress, NewReview, NewUser,
    NewUserProfile,
};
use crate::storage::queries;

/// Settings for one user-seeding pass
#[derive(Debug, Clone)]
pub struct UserSeedConfig {
    pub count: u64,
    /// Users per transaction
    pub batch_size: usize,
    /// Flush the existing population first
    pub clear: bool,
    pub dry_run: bool,
    /// Fraction of users who create or help run a club
    pub elevation_fraction: f64,
    /// How far back join dates reach
    pub join_window_days: i64,
    /// How far back reading history reaches
    pub history_window_days: i64,
    pub reference_time: DateTime<Utc>,
    /// Fixed RNG seed for reproducible populations
    pub seed: Option<u64>,
}

impl Default for UserSeedConfig {
    fn default() -> Self {
        Self {
            count: 50,
            batch_size: 10,
            clear: false,
            dry_run: false,
            elevation_fraction: 0.5,
            join_window_days: 730,
            history_window_days: 365,
            reference_time: Utc::now(),
            seed: None,
        }
    }
}

/// Hard cap on clubs the user pass will create; beyond this, elevated users
/// join existing clubs instead.
const MAX_SEEDED_CLUBS: i64 = 20;

/// Attempts at a naturally unique identity before falling back to a
/// counter suffix.
const UNIQUENESS_ATTEMPTS: u32 = 10;

pub struct UserSeeder {
    config: UserSeedConfig,
}

impl UserSeeder {
    pub fn new(config: UserSeedConfig) -> Self {
        Self { config }
    }

    fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    pub async fn run(&self, db: &Database) -> Result<SeedReport> {
        let mut rng = self.rng();
        let mut report = SeedReport::default();

        if self.config.clear {
            let mut conn = db.acquire().await?;
            queries::flush_population(&mut conn).await?;
            info!("existing population flushed");
        }

        let books = queries::list_books(db.pool()).await?;
        if books.is_empty() {
            warn!("no books in catalog; users will have empty reading histories");
        }

        let mut fallback_counter = 0u64;
        let mut remaining = self.config.count;

        while remaining > 0 {
            let batch = remaining.min(self.config.batch_size.max(1) as u64);
            let mut tx = db.pool().begin().await?;

            for _ in 0..batch {
                match self
                    .seed_one(&mut tx, &mut rng, &books, &mut fallback_counter)
                    .await
                {
                    Ok(()) => report.created += 1,
                    Err(err) => {
                        warn!(error = %err, "user creation failed");
                        report.errors += 1;
                    }
                }
            }

            if self.config.dry_run {
                tx.rollback().await?;
            } else {
                tx.commit().await?;
            }
            remaining -= batch;
        }

        info!(%report, "user seeding finished");
        Ok(report)
    }

    async fn seed_one(
        &self,
        conn: &mut SqliteConnection,
        rng: &mut StdRng,
        books: &[Book],
        fallback_counter: &mut u64,
    ) -> Result<()> {
        let now = self.config.reference_time;
        let (first_name, last_name, username, email) =
            unique_identity(&mut *conn, rng, fallback_counter).await?;

        let join_start = now - Duration::days(self.config.join_window_days);
        let date_joined = factory::datetime_between(rng, join_start, now);

        let user_id = queries::insert_user(
            &mut *conn,
            &NewUser {
                username: username.clone(),
                email,
                first_name,
                last_name,
                date_joined,
            },
        )
        .await?;

        queries::insert_profile(
            &mut *conn,
            &NewUserProfile {
                user_id,
                bio: Some(factory::bio(rng)),
                location: Some(factory::location(rng)),
                website: factory::website(rng, &username),
                image_url: Some(factory::avatar_url(rng, &username)),
                image_checked_at: None,
            },
        )
        .await?;

        self.join_clubs(&mut *conn, rng, user_id, date_joined).await?;
        self.seed_history(&mut *conn, rng, user_id, date_joined, books)
            .await?;

        Ok(())
    }

    /// Elevated users found or help run a club; everyone else joins a few.
    async fn join_clubs(
        &self,
        conn: &mut SqliteConnection,
        rng: &mut StdRng,
        user_id: i64,
        date_joined: DateTime<Utc>,
    ) -> Result<()> {
        let now = self.config.reference_time;
        let elevated = rng.gen_bool(self.config.elevation_fraction);

        let club_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_clubs")
            .fetch_one(&mut *conn)
            .await?;

        if elevated && club_count < MAX_SEEDED_CLUBS {
            let template = factory::generated_club(rng);
            let club_id = queries::insert_club(
                &mut *conn,
                &NewBookClub {
                    name: template.name,
                    description: Some(template.description),
                    creator_id: user_id,
                    category: Some(template.category),
                    location: Some(template.location),
                    meeting_frequency: Some(template.meeting_frequency),
                    max_members: template.max_members,
                    is_private: template.is_private,
                    image_url: None,
                    image_checked_at: None,
                },
            )
            .await?;

            queries::insert_membership(
                &mut *conn,
                &NewMembership {
                    user_id,
                    club_id,
                    role: ClubRole::Admin,
                    joined_at: date_joined,
                },
            )
            .await?;
            return Ok(());
        }

        let club_ids: Vec<i64> = sqlx::query_scalar("SELECT club_id FROM book_clubs")
            .fetch_all(&mut *conn)
            .await?;
        if club_ids.is_empty() {
            return Ok(());
        }

        if elevated {
            let club_id = *club_ids.choose(rng).unwrap();
            if !queries::membership_exists(&mut *conn, user_id, club_id).await? {
                let role = if rng.gen_bool(0.5) {
                    ClubRole::Admin
                } else {
                    ClubRole::Moderator
                };
                queries::insert_membership(
                    &mut *conn,
                    &NewMembership {
                        user_id,
                        club_id,
                        role,
                        joined_at: factory::datetime_between(rng, date_joined, now),
                    },
                )
                .await?;
            }
            return Ok(());
        }

        let joins = rng.gen_range(1..=3.min(club_ids.len()));
        let picks: Vec<i64> = club_ids.choose_multiple(rng, joins).copied().collect();
        for club_id in picks {
            if queries::membership_exists(&mut *conn, user_id, club_id).await? {
                continue;
            }
            queries::insert_membership(
                &mut *conn,
                &NewMembership {
                    user_id,
                    club_id,
                    role: ClubRole::Member,
                    joined_at: factory::datetime_between(rng, date_joined, now),
                },
            )
            .await?;
        }

        Ok(())
    }

    /// 2-4 finished books (half reviewed) and 1-3 in progress.
    async fn seed_history(
        &self,
        conn: &mut SqliteConnection,
        rng: &mut StdRng,
        user_id: i64,
        date_joined: DateTime<Utc>,
        books: &[Book],
    ) -> Result<()> {
        if books.is_empty() {
            return Ok(());
        }

        let now = self.config.reference_time;
        let history_start = date_joined.max(now - Duration::days(self.config.history_window_days));

        let finished_count = rng.gen_range(2..=4).min(books.len());
        let reading_count = rng.gen_range(1..=3).min(books.len());
        let mut picks: Vec<&Book> = books
            .choose_multiple(rng, (finished_count + reading_count).min(books.len()))
            .collect();

        let finished: Vec<&Book> = picks.drain(..finished_count.min(picks.len())).collect();

        for book in finished {
            let started_at = factory::datetime_between(rng, history_start, now);
            let finished_at =
                factory::datetime_between(rng, started_at, (started_at + Duration::days(45)).min(now));

            let progress = NewReadingProgress {
                user_id,
                book_id: book.book_id,
                session_id: None,
                current_page: book.page_count.unwrap_or(0),
                is_finished: true,
                started_at: Some(started_at),
                finished_at: Some(finished_at),
                notes: None,
            }
            .clamp_to(book.page_count);
            queries::insert_progress(&mut *conn, &progress).await?;

            if rng.gen_bool(0.5) && !queries::review_exists(&mut *conn, user_id, book.book_id).await? {
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
                        created_at: factory::datetime_between(rng, finished_at, now),
                    },
                )
                .await?;
            }
        }

        for book in picks {
            let pages = book.page_count.unwrap_or(300).max(1);
            let progress = NewReadingProgress {
                user_id,
                book_id: book.book_id,
                session_id: None,
                current_page: rng.gen_range(1..=pages),
                is_finished: false,
                started_at: Some(factory::datetime_between(rng, history_start, now)),
                finished_at: None,
                notes: None,
            }
            .clamp_to(book.page_count);
            queries::insert_progress(&mut *conn, &progress).await?;
        }

        Ok(())
    }

    /// Replay a reading-log export as one user's history: finished progress
    /// for every matched book plus a review where the log carries a rating.
    pub async fn replay_reading_log(
        &self,
        db: &Database,
        username: &str,
        entries: &[ReadingLogEntry],
    ) -> Result<SeedReport> {
        let mut rng = self.rng();
        let mut report = SeedReport::default();
        let now = self.config.reference_time;
        let mut conn = db.acquire().await?;

        let user_id = match queries::get_user_by_username(&mut conn, username).await? {
            Some(user) => user.user_id,
            None => {
                let (first_name, last_name) = factory::full_name(&mut rng);
                let user_id = queries::insert_user(
                    &mut conn,
                    &NewUser {
                        username: username.to_string(),
                        email: factory::email_for(&mut rng, username),
                        first_name,
                        last_name,
                        date_joined: now,
                    },
                )
                .await?;
                queries::insert_profile(
                    &mut conn,
                    &NewUserProfile {
                        user_id,
                        bio: None,
                        location: None,
                        website: None,
                        image_url: Some(factory::avatar_url(&mut rng, username)),
                        image_checked_at: None,
                    },
                )
                .await?;
                user_id
            }
        };

        for entry in entries {
            let Some(book) =
                queries::find_book_by_title_and_author(&mut conn, &entry.title, &entry.author)
                    .await?
            else {
                warn!(title = %entry.title, "reading log book not in catalog");
                report.skipped += 1;
                continue;
            };

            if queries::progress_exists(&mut conn, user_id, book.book_id, None).await? {
                report.skipped += 1;
                continue;
            }

            let finished_at = entry
                .date_read
                .as_deref()
                .and_then(parse_log_date)
                .unwrap_or(now);

            queries::insert_progress(
                &mut conn,
                &NewReadingProgress {
                    user_id,
                    book_id: book.book_id,
                    session_id: None,
                    current_page: book.page_count.unwrap_or(0),
                    is_finished: true,
                    started_at: None,
                    finished_at: Some(finished_at),
                    notes: None,
                },
            )
            .await?;

            if let Some(rating) = entry.rating.filter(|r| (1..=5).contains(r)) {
                if !queries::review_exists(&mut conn, user_id, book.book_id).await? {
                    queries::insert_review(
                        &mut conn,
                        &NewReview {
                            user_id,
                            book_id: book.book_id,
                            session_id: None,
                            rating,
                            title: factory::review_title(&mut rng, rating),
                            content: factory::review_content(&mut rng, rating, &book.title),
                            is_spoiler: false,
                            created_at: finished_at,
                        },
                    )
                    .await?;
                }
            }

            report.created += 1;
        }

        info!(%report, "reading log replay finished");
        Ok(report)
    }
}

/// Goodreads exports write dates as `YYYY/MM/DD`.
fn parse_log_date(raw: &str) -> Option<DateTime<Utc>> {
    let date = chrono::NaiveDate::parse_from_str(raw.trim(), "%Y/%m/%d").ok()?;
    Some(DateTime::from_naive_utc_and_offset(
        date.and_hms_opt(12, 0, 0)?,
        Utc,
    ))
}

/// Generate an identity whose username and email are both unused. After
/// [`UNIQUENESS_ATTEMPTS`] collisions the base gets a monotonic counter
/// suffix, which terminates by construction.
async fn unique_identity(
    conn: &mut SqliteConnection,
    rng: &mut StdRng,
    fallback_counter: &mut u64,
) -> Result<(String, String, String, String)> {
    let mut last_base = String::new();
    let mut last_name_pair = (String::new(), String::new());

    for _ in 0..UNIQUENESS_ATTEMPTS {
        let (first, last) = factory::full_name(rng);
        let base = factory::username_base(rng, &first, &last);
        let email = factory::email_for(rng, &base);

        if !queries::username_exists(&mut *conn, &base).await?
            && !queries::email_exists(&mut *conn, &email).await?
        {
            return Ok((first, last, base, email));
        }

        last_base = base;
        last_name_pair = (first, last);
    }

    loop {
        *fallback_counter += 1;
        let username = format!("{last_base}_{}", *fallback_counter);
        let email = factory::email_for(rng, &username);
        if !queries::username_exists(&mut *conn, &username).await?
            && !queries::email_exists(&mut *conn, &email).await?
        {
            let (first, last) = last_name_pair;
            return Ok((first, last, username, email));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_dates_parse() {
        assert!(parse_log_date("2024/03/01").is_some());
        assert!(parse_log_date(" 2024/03/01 ").is_some());
        assert!(parse_log_date("March 1, 2024").is_none());
        assert!(parse_log_date("").is_none());
    }

    #[tokio::test]
    async fn fallback_counter_guarantees_unique_usernames() {
        let db = Database::new_in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let mut counter = 0u64;

        let mut seen = std::collections::HashSet::new();
        for _ in 0..30 {
            let (_, _, username, email) =
                unique_identity(&mut conn, &mut rng, &mut counter).await.unwrap();
            assert!(seen.insert(username.clone()));
            queries::insert_user(
                &mut conn,
                &NewUser {
                    username,
                    email,
                    first_name: "A".to_string(),
                    last_name: "B".to_string(),
                    date_joined: Utc::now(),
                },
            )
            .await
            .unwrap();
        }
    }
}
