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

//! Club seeder: curated clubs, memberships and reading sessions.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::error::{Result, SeedError};
use crate::seed::factory;
use crate::seed::SeedReport;
use crate::storage::database::Database;
use crate::storage::models::{
    ClubRole, NewBookClub, NewMembership, NewReadingSession, SessionStatus,
};
use crate::storage::queries;

#[derive(Debug, Clone)]
pub struct ClubSeedConfig {
    pub count: u64,
    /// Flush existing clubs, memberships and sessions first
    pub clear: bool,
    pub dry_run: bool,
    pub reference_time: DateTime<Utc>,
    pub seed: Option<u64>,
}

impl Default for ClubSeedConfig {
    fn default() -> Self {
        Self {
            count: 15,
            clear: false,
            dry_run: false,
            reference_time: Utc::now(),
            seed: None,
        }
    }
}

/// Clubs that get a current and some completed reading sessions.
const CLUBS_WITH_SESSIONS: usize = 5;

pub struct ClubSeeder {
    config: ClubSeedConfig,
}

impl ClubSeeder {
    pub fn new(config: ClubSeedConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self, db: &Database) -> Result<SeedReport> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut report = SeedReport::default();

        if self.config.clear {
            let mut conn = db.acquire().await?;
            queries::flush_clubs(&mut conn).await?;
            info!("existing clubs flushed");
        }

        let user_ids = queries::list_user_ids(db.pool()).await?;
        if user_ids.is_empty() {
            return Err(SeedError::InvalidState(
                "cannot seed clubs before users exist".to_string(),
            ));
        }
        let book_ids = queries::list_book_ids(db.pool()).await?;
        if book_ids.is_empty() {
            warn!("no books in catalog; clubs will have no reading sessions");
        }

        let mut tx = db.pool().begin().await?;
        let mut created_ids = Vec::new();

        let curated = factory::club_bank();
        for template in curated.into_iter().take(self.config.count as usize) {
            if queries::club_name_exists(&mut tx, &template.name).await? {
                report.skipped += 1;
                continue;
            }
            let club_id = self
                .create_club(&mut tx, &mut rng, template, &user_ids)
                .await?;
            created_ids.push(club_id);
            report.created += 1;
        }

        while report.created + report.skipped < self.config.count {
            let template = factory::generated_club(&mut rng);
            if queries::club_name_exists(&mut tx, &template.name).await? {
                report.skipped += 1;
                continue;
            }
            let club_id = self
                .create_club(&mut tx, &mut rng, template, &user_ids)
                .await?;
            created_ids.push(club_id);
            report.created += 1;
        }

        if !book_ids.is_empty() {
            for club_id in created_ids.iter().take(CLUBS_WITH_SESSIONS) {
                self.seed_sessions(&mut tx, &mut rng, *club_id, &book_ids)
                    .await?;
            }
        }

        if self.config.dry_run {
            tx.rollback().await?;
        } else {
            tx.commit().await?;
        }

        info!(%report, "club seeding finished");
        Ok(report)
    }

    /// Insert a club, its creator's admin membership and 8-25 regular
    /// members weighted 4:1 member to moderator.
    async fn create_club(
        &self,
        conn: &mut SqliteConnection,
        rng: &mut StdRng,
        template: factory::ClubTemplate,
        user_ids: &[i64],
    ) -> Result<i64> {
        let now = self.config.reference_time;
        let creator_id = *user_ids.choose(rng).unwrap();
        let created_window_start = now - Duration::days(365);
        let created_at = factory::datetime_between(rng, created_window_start, now);

        let max_members = template.max_members;
        let club_id = queries::insert_club(
            conn,
            &NewBookClub {
                name: template.name,
                description: Some(template.description),
                creator_id,
                category: Some(template.category),
                location: Some(template.location),
                meeting_frequency: Some(template.meeting_frequency),
                max_members,
                is_private: template.is_private,
                image_url: None,
                image_checked_at: None,
            },
        )
        .await?;

        queries::insert_membership(
            conn,
            &NewMembership {
                user_id: creator_id,
                club_id,
                role: ClubRole::Admin,
                joined_at: created_at,
            },
        )
        .await?;

        let target = rng.gen_range(8..=25).min(max_members as usize - 1);
        let candidates: Vec<i64> = user_ids
            .iter()
            .filter(|id| **id != creator_id)
            .copied()
            .collect();

        for user_id in candidates.choose_multiple(rng, target.min(candidates.len())) {
            if queries::membership_exists(&mut *conn, *user_id, club_id).await? {
                continue;
            }
            let role = if rng.gen_bool(0.2) {
                ClubRole::Moderator
            } else {
                ClubRole::Member
            };
            queries::insert_membership(
                &mut *conn,
                &NewMembership {
                    user_id: *user_id,
                    club_id,
                    role,
                    joined_at: factory::datetime_between(rng, created_at, now),
                },
            )
            .await?;
        }

        Ok(club_id)
    }

    /// One current session plus one or two completed ones, all on distinct
    /// books where the catalog allows.
    async fn seed_sessions(
        &self,
        conn: &mut SqliteConnection,
        rng: &mut StdRng,
        club_id: i64,
        book_ids: &[i64],
    ) -> Result<()> {
        let today = self.config.reference_time.date_naive();
        let completed = rng.gen_range(1..=2usize);
        let picks: Vec<i64> = book_ids
            .choose_multiple(rng, (completed + 1).min(book_ids.len()))
            .copied()
            .collect();

        let mut picks = picks.into_iter();
        let Some(current_book) = picks.next() else {
            return Ok(());
        };

        let start = today - Duration::days(rng.gen_range(3..=21));
        queries::insert_session(
            &mut *conn,
            &NewReadingSession {
                club_id,
                book_id: current_book,
                start_date: start,
                end_date: start + Duration::days(30),
                status: SessionStatus::Current,
                notes: None,
            },
        )
        .await?;

        let mut end = start - Duration::days(rng.gen_range(7..=30));
        for book_id in picks {
            let session_start = end - Duration::days(30);
            queries::insert_session(
                &mut *conn,
                &NewReadingSession {
                    club_id,
                    book_id,
                    start_date: session_start,
                    end_date: end,
                    status: SessionStatus::Completed,
                    notes: None,
                },
            )
            .await?;
            end = session_start - Duration::days(rng.gen_range(7..=30));
        }

        Ok(())
    }
}
