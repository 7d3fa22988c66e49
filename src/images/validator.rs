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

//! Concurrent image freshness validator.
//!
//! Probes stale image URLs with HEAD requests through a semaphore-bounded
//! worker pool and replaces dead ones with deterministic placeholders.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future;
use sqlx::SqliteConnection;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::images::placeholder::{placeholder_for, ImageOwnerKind};
use crate::storage::database::Database;

#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// References checked within this many days are skipped
    pub staleness_days: i64,
    /// Concurrent HEAD probes
    pub max_workers: usize,
    /// Targets probed per wave, and per write pass
    pub batch_size: usize,
    pub timeout: Duration,
    /// Report only, write nothing
    pub dry_run: bool,
    /// Ignore the staleness gate and recheck everything
    pub force: bool,
    pub kinds: Vec<ImageOwnerKind>,
    pub reference_time: DateTime<Utc>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            staleness_days: 7,
            max_workers: 10,
            batch_size: 100,
            timeout: Duration::from_secs(10),
            dry_run: false,
            force: false,
            kinds: ImageOwnerKind::ALL.to_vec(),
            reference_time: Utc::now(),
        }
    }
}

/// Counters for one validation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub checked: u64,
    pub alive: u64,
    pub repaired: u64,
    /// Probes that could not reach a verdict; URL left in place
    pub unreachable: u64,
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} checked, {} alive, {} repaired, {} unreachable",
            self.checked, self.alive, self.repaired, self.unreachable
        )
    }
}

/// Whether a reference is due for a probe.
pub fn needs_check(
    checked_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    staleness_days: i64,
    force: bool,
) -> bool {
    if force {
        return true;
    }
    match checked_at {
        None => true,
        Some(t) => now - t > chrono::Duration::days(staleness_days),
    }
}

/// One image reference due for a check
#[derive(Debug, Clone, sqlx::FromRow)]
struct ImageTarget {
    id: i64,
    /// Stable key feeding the deterministic placeholder
    key: String,
    url: String,
    checked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeOutcome {
    Alive,
    Dead,
    Unknown,
}

pub struct ImageValidator {
    http: reqwest::Client,
    config: ValidatorConfig,
}

impl ImageValidator {
    pub fn new(config: ValidatorConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("shelfseed/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    pub async fn run(&self, db: &Database) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();

        for kind in self.config.kinds.clone() {
            let mut conn = db.acquire().await?;
            let targets = self.stale_targets(&mut conn, kind).await?;
            drop(conn);
            info!(kind = %kind, targets = targets.len(), "validating images");

            for wave in targets.chunks(self.config.batch_size) {
                let outcomes = self.probe_wave(wave).await;

                let mut conn = db.acquire().await?;
                for (target, outcome) in wave.iter().zip(outcomes) {
                    report.checked += 1;
                    let replacement = match outcome {
                        ProbeOutcome::Alive => {
                            report.alive += 1;
                            None
                        }
                        ProbeOutcome::Dead => {
                            report.repaired += 1;
                            Some(placeholder_for(kind, &target.key))
                        }
                        ProbeOutcome::Unknown => {
                            report.unreachable += 1;
                            None
                        }
                    };

                    if !self.config.dry_run {
                        self.apply(&mut conn, kind, target.id, replacement).await?;
                    }
                }
            }
        }

        info!(%report, "image validation finished");
        Ok(report)
    }

    /// Fetch every reference with a URL, then apply the staleness gate
    /// through [`needs_check`].
    async fn stale_targets(
        &self,
        conn: &mut SqliteConnection,
        kind: ImageOwnerKind,
    ) -> Result<Vec<ImageTarget>> {
        let sql = match kind {
            ImageOwnerKind::Book => {
                r#"
                SELECT book_id AS id, CAST(book_id AS TEXT) AS key,
                       image_url AS url, image_checked_at AS checked_at
                FROM books
                WHERE image_url IS NOT NULL
                ORDER BY book_id
                "#
            }
            ImageOwnerKind::Club => {
                r#"
                SELECT club_id AS id, CAST(club_id AS TEXT) AS key,
                       image_url AS url, image_checked_at AS checked_at
                FROM book_clubs
                WHERE image_url IS NOT NULL
                ORDER BY club_id
                "#
            }
            ImageOwnerKind::Profile => {
                r#"
                SELECT p.user_id AS id, u.username AS key,
                       p.image_url AS url, p.image_checked_at AS checked_at
                FROM user_profiles p
                JOIN users u ON u.user_id = p.user_id
                WHERE p.image_url IS NOT NULL
                ORDER BY p.user_id
                "#
            }
        };

        let targets = sqlx::query_as::<_, ImageTarget>(sql)
            .fetch_all(conn)
            .await?;
        Ok(targets
            .into_iter()
            .filter(|target| {
                needs_check(
                    target.checked_at,
                    self.config.reference_time,
                    self.config.staleness_days,
                    self.config.force,
                )
            })
            .collect())
    }

    /// Probe one wave of targets concurrently. Each target is handled by
    /// exactly one worker; the semaphore caps how many run at once.
    async fn probe_wave(&self, wave: &[ImageTarget]) -> Vec<ProbeOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        let mut handles = Vec::with_capacity(wave.len());

        for target in wave {
            let permit_source = Arc::clone(&semaphore);
            let http = self.http.clone();
            let url = target.url.clone();

            handles.push(tokio::spawn(async move {
                let _permit = permit_source.acquire_owned().await;
                probe(&http, &url).await
            }));
        }

        let mut outcomes = Vec::with_capacity(wave.len());
        for (handle, target) in future::join_all(handles).await.into_iter().zip(wave) {
            match handle {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    warn!(url = %target.url, error = %err, "probe worker panicked");
                    outcomes.push(ProbeOutcome::Unknown);
                }
            }
        }
        outcomes
    }

    /// Write back one verdict. `image_checked_at` always advances so the
    /// reference leaves the stale window either way.
    async fn apply(
        &self,
        conn: &mut SqliteConnection,
        kind: ImageOwnerKind,
        id: i64,
        replacement: Option<String>,
    ) -> Result<()> {
        let sql = match kind {
            ImageOwnerKind::Book => {
                "UPDATE books SET image_url = COALESCE(?, image_url), image_checked_at = ? WHERE book_id = ?"
            }
            ImageOwnerKind::Club => {
                "UPDATE book_clubs SET image_url = COALESCE(?, image_url), image_checked_at = ? WHERE club_id = ?"
            }
            ImageOwnerKind::Profile => {
                "UPDATE user_profiles SET image_url = COALESCE(?, image_url), image_checked_at = ? WHERE user_id = ?"
            }
        };

        sqlx::query(sql)
            .bind(replacement)
            .bind(self.config.reference_time)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }
}

/// HEAD probe with one retry on network failure. 2xx is alive; 404 and
/// other client errors are dead, and so is a URL still unreachable after
/// the retry. Only server errors are indeterminate.
async fn probe(http: &reqwest::Client, url: &str) -> ProbeOutcome {
    for attempt in 0..2 {
        match http.head(url).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return ProbeOutcome::Alive;
                }
                if status.is_client_error() {
                    debug!(url, %status, "image is gone");
                    return ProbeOutcome::Dead;
                }
                return ProbeOutcome::Unknown;
            }
            Err(err) if attempt == 0 && (err.is_timeout() || err.is_connect()) => continue,
            Err(err) if err.is_timeout() || err.is_connect() => {
                debug!(url, error = %err, "image unreachable");
                return ProbeOutcome::Dead;
            }
            Err(err) => {
                debug!(url, error = %err, "image probe failed");
                return ProbeOutcome::Unknown;
            }
        }
    }
    ProbeOutcome::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::{NewUser, NewUserProfile};
    use crate::storage::queries;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    // Nothing listens on port 1, so the probe fails to connect on both
    // attempts without ever leaving the host.
    const UNREACHABLE_URL: &str = "http://127.0.0.1:1/cover.png";

    async fn seed_profile(
        db: &Database,
        username: &str,
        checked_at: Option<DateTime<Utc>>,
    ) -> i64 {
        let mut conn = db.acquire().await.unwrap();
        let user_id = queries::insert_user(
            &mut conn,
            &NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                first_name: "Test".to_string(),
                last_name: "Reader".to_string(),
                date_joined: fixed_now(),
            },
        )
        .await
        .unwrap();
        queries::insert_profile(
            &mut conn,
            &NewUserProfile {
                user_id,
                bio: None,
                location: None,
                website: None,
                image_url: Some(UNREACHABLE_URL.to_string()),
                image_checked_at: checked_at,
            },
        )
        .await
        .unwrap();
        user_id
    }

    async fn profile_image(db: &Database, user_id: i64) -> (Option<String>, Option<DateTime<Utc>>) {
        sqlx::query_as(
            "SELECT image_url, image_checked_at FROM user_profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(db.pool())
        .await
        .unwrap()
    }

    fn profile_config() -> ValidatorConfig {
        ValidatorConfig {
            kinds: vec![ImageOwnerKind::Profile],
            timeout: Duration::from_secs(2),
            reference_time: fixed_now(),
            ..Default::default()
        }
    }

    #[test]
    fn staleness_gate() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let hour_ago = now - chrono::Duration::hours(1);
        let eight_days_ago = now - chrono::Duration::days(8);

        assert!(!needs_check(Some(hour_ago), now, 7, false));
        assert!(needs_check(Some(eight_days_ago), now, 7, false));
        assert!(needs_check(None, now, 7, false));
        assert!(needs_check(Some(hour_ago), now, 7, true));
    }

    #[test]
    fn exactly_at_threshold_is_fresh() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let at_threshold = now - chrono::Duration::days(7);
        assert!(!needs_check(Some(at_threshold), now, 7, false));
    }

    #[tokio::test]
    async fn unreachable_url_gets_placeholder() {
        let db = Database::new_in_memory().await.unwrap();
        let user_id = seed_profile(&db, "lost_avatar", None).await;

        let report = ImageValidator::new(profile_config())
            .unwrap()
            .run(&db)
            .await
            .unwrap();
        assert_eq!(report.checked, 1);
        assert_eq!(report.repaired, 1);

        let (url, checked_at) = profile_image(&db, user_id).await;
        assert_eq!(
            url.as_deref(),
            Some(placeholder_for(ImageOwnerKind::Profile, "lost_avatar").as_str())
        );
        assert_eq!(checked_at, Some(fixed_now()));
    }

    #[tokio::test]
    async fn fresh_references_are_skipped() {
        let db = Database::new_in_memory().await.unwrap();
        let fresh_id = seed_profile(&db, "fresh", Some(fixed_now() - chrono::Duration::hours(1))).await;
        let stale_id = seed_profile(&db, "stale", Some(fixed_now() - chrono::Duration::days(30))).await;

        let report = ImageValidator::new(profile_config())
            .unwrap()
            .run(&db)
            .await
            .unwrap();
        assert_eq!(report.checked, 1);

        let (fresh_url, _) = profile_image(&db, fresh_id).await;
        assert_eq!(fresh_url.as_deref(), Some(UNREACHABLE_URL));

        let (stale_url, _) = profile_image(&db, stale_id).await;
        assert_eq!(
            stale_url.as_deref(),
            Some(placeholder_for(ImageOwnerKind::Profile, "stale").as_str())
        );
    }

    #[tokio::test]
    async fn dry_run_reports_without_writing() {
        let db = Database::new_in_memory().await.unwrap();
        let user_id = seed_profile(&db, "untouched", None).await;

        let report = ImageValidator::new(ValidatorConfig {
            dry_run: true,
            ..profile_config()
        })
        .unwrap()
        .run(&db)
        .await
        .unwrap();
        assert_eq!(report.repaired, 1);

        let (url, checked_at) = profile_image(&db, user_id).await;
        assert_eq!(url.as_deref(), Some(UNREACHABLE_URL));
        assert!(checked_at.is_none());
    }
}
