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

//! Master seed orchestrator: runs every generator in a fixed stage order.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::api::client::MetadataProvider;
use crate::error::{Result, SeedError};
use crate::seed::clubs::{ClubSeedConfig, ClubSeeder};
use crate::seed::content::{ContentSeedConfig, ContentSeeder};
use crate::seed::importer::{BookImporter, ImportConfig};
use crate::seed::source::{self, SourceRecord};
use crate::seed::users::{UserSeedConfig, UserSeeder};
use crate::seed::SeedReport;
use crate::storage::database::Database;
use crate::storage::queries;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedStage {
    NotStarted,
    SeedingUsers,
    SeedingBooks,
    SeedingClubs,
    SeedingContent,
    Done,
    Failed,
}

impl fmt::Display for SeedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SeedStage::NotStarted => "not started",
            SeedStage::SeedingUsers => "seeding users",
            SeedStage::SeedingBooks => "seeding books",
            SeedStage::SeedingClubs => "seeding clubs",
            SeedStage::SeedingContent => "seeding content",
            SeedStage::Done => "done",
            SeedStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Named dataset sizes: (users, books, clubs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedLevel {
    /// Small smoke-test dataset
    Basic,
    /// Everything, for local development
    Full,
    /// Leaner realistic dataset for demo deployments
    Production,
}

impl SeedLevel {
    pub fn counts(&self) -> (u64, u64, u64) {
        match self {
            SeedLevel::Basic => (10, 20, 5),
            SeedLevel::Full => (50, 100, 15),
            SeedLevel::Production => (25, 50, 8),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeedLevel::Basic => "basic",
            SeedLevel::Full => "full",
            SeedLevel::Production => "production",
        }
    }
}

impl FromStr for SeedLevel {
    type Err = SeedError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(SeedLevel::Basic),
            "full" => Ok(SeedLevel::Full),
            "production" => Ok(SeedLevel::Production),
            other => Err(SeedError::ConfigurationError(format!(
                "unknown seed level '{other}' (expected basic, full or production)"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MasterSeedConfig {
    pub level: SeedLevel,
    /// Flush all seed-managed tables before the first stage
    pub reset: bool,
    pub reference_time: DateTime<Utc>,
    pub seed: Option<u64>,
    /// Book list to import; the built-in catalog when absent
    pub source_path: Option<PathBuf>,
}

impl Default for MasterSeedConfig {
    fn default() -> Self {
        Self {
            level: SeedLevel::Basic,
            reset: false,
            reference_time: Utc::now(),
            seed: None,
            source_path: None,
        }
    }
}

/// Aggregated outcome of a master seed run
#[derive(Debug, Clone, Default)]
pub struct MasterReport {
    pub users: SeedReport,
    pub books: SeedReport,
    pub clubs: SeedReport,
    pub content: SeedReport,
    pub elapsed: Duration,
}

impl fmt::Display for MasterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "users:   {}", self.users)?;
        writeln!(f, "books:   {}", self.books)?;
        writeln!(f, "clubs:   {}", self.clubs)?;
        writeln!(f, "content: {}", self.content)?;
        write!(f, "elapsed: {:.1}s", self.elapsed.as_secs_f64())
    }
}

/// Runs the full pipeline. Each stage commits before the next begins; a
/// storage-level failure moves the machine to `Failed` and surfaces the
/// error, while per-record failures only show in the report counters.
pub struct Orchestrator<P: MetadataProvider> {
    provider: P,
    config: MasterSeedConfig,
    stage: SeedStage,
}

impl<P: MetadataProvider> Orchestrator<P> {
    pub fn new(provider: P, config: MasterSeedConfig) -> Self {
        Self {
            provider,
            config,
            stage: SeedStage::NotStarted,
        }
    }

    pub fn stage(&self) -> SeedStage {
        self.stage
    }

    pub async fn run(&mut self, db: &Database) -> Result<MasterReport> {
        let started = Instant::now();
        let (user_count, book_count, club_count) = self.config.level.counts();
        info!(level = self.config.level.as_str(), "master seed starting");

        if self.config.reset {
            let mut conn = db.acquire().await?;
            queries::flush_seed_tables(&mut conn).await?;
            info!("seed tables flushed");
        }

        let mut report = MasterReport::default();

        self.stage = SeedStage::SeedingUsers;
        report.users = self.checked(self.seed_users(db, user_count).await)?;

        self.stage = SeedStage::SeedingBooks;
        report.books = self.checked(self.seed_books(db, book_count).await)?;

        self.stage = SeedStage::SeedingClubs;
        report.clubs = self.checked(self.seed_clubs(db, club_count).await)?;

        self.stage = SeedStage::SeedingContent;
        report.content = self.checked(self.seed_content(db, user_count).await)?;

        self.stage = SeedStage::Done;
        report.elapsed = started.elapsed();
        info!(elapsed = ?report.elapsed, "master seed finished");
        Ok(report)
    }

    fn checked(&mut self, outcome: Result<SeedReport>) -> Result<SeedReport> {
        match outcome {
            Ok(report) => Ok(report),
            Err(err) => {
                error!(stage = %self.stage, error = %err, "stage failed");
                self.stage = SeedStage::Failed;
                Err(err)
            }
        }
    }

    async fn seed_users(&self, db: &Database, count: u64) -> Result<SeedReport> {
        UserSeeder::new(UserSeedConfig {
            count,
            reference_time: self.config.reference_time,
            seed: self.config.seed,
            ..Default::default()
        })
        .run(db)
        .await
    }

    async fn seed_books(&self, db: &Database, count: u64) -> Result<SeedReport> {
        let records: Vec<SourceRecord> = match &self.config.source_path {
            Some(path) => source::load_source_records(path)?,
            None => source::builtin_catalog(),
        };
        let records = &records[..records.len().min(count as usize)];

        BookImporter::new(
            &self.provider,
            ImportConfig {
                reference_time: self.config.reference_time,
                ..Default::default()
            },
        )
        .run(db, records)
        .await
    }

    async fn seed_clubs(&self, db: &Database, count: u64) -> Result<SeedReport> {
        ClubSeeder::new(ClubSeedConfig {
            count,
            reference_time: self.config.reference_time,
            seed: self.config.seed,
            ..Default::default()
        })
        .run(db)
        .await
    }

    // Content volume scales off the user count so levels stay proportional.
    async fn seed_content(&self, db: &Database, user_count: u64) -> Result<SeedReport> {
        ContentSeeder::new(ContentSeedConfig {
            discussions: user_count,
            reviews: user_count * 2,
            progress: user_count * 4,
            reference_time: self.config.reference_time,
            seed: self.config.seed,
            ..Default::default()
        })
        .run(db)
        .await
    }
}
