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

//! `shelfseed` command line interface

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use shelf_seeder::api::{MetadataClientConfig, OpenLibraryClient};
use shelf_seeder::images::{ImageOwnerKind, ImageValidator, ValidatorConfig};
use shelf_seeder::seed::clubs::{ClubSeedConfig, ClubSeeder};
use shelf_seeder::seed::content::{ContentSeedConfig, ContentSeeder};
use shelf_seeder::seed::source;
use shelf_seeder::seed::users::{UserSeedConfig, UserSeeder};
use shelf_seeder::seed::{
    BookImporter, ImportConfig, MasterSeedConfig, Orchestrator, SeedLevel,
};
use shelf_seeder::storage::Database;

#[derive(Parser)]
#[command(name = "shelfseed", version, about = "Book club database seeder")]
struct Cli {
    /// Path to the SQLite database file
    #[arg(long, global = true, default_value = "shelfseed.db")]
    database: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Seed users with profiles, memberships and reading history
    SeedUsers {
        /// How many users to create
        #[arg(long, default_value_t = 50)]
        count: u64,
        /// Flush the existing population first
        #[arg(long)]
        clear: bool,
        /// Run everything but commit nothing
        #[arg(long)]
        dry_run: bool,
        /// Fixed RNG seed for a reproducible population
        #[arg(long)]
        seed: Option<u64>,
        /// Replay a Goodreads-style reading log for this username
        #[arg(long, requires = "reading_log")]
        username: Option<String>,
        /// CSV reading log export to replay
        #[arg(long)]
        reading_log: Option<PathBuf>,
    },
    /// Import books from a CSV/JSON list, enriched via Open Library
    SeedBooks {
        /// Input file; the built-in catalog when omitted
        #[arg(long)]
        input: Option<PathBuf>,
        /// Records per transaction
        #[arg(long, default_value_t = 100)]
        batch_size: usize,
        /// Milliseconds to wait between metadata requests
        #[arg(long, value_name = "MS", default_value_t = 500)]
        delay: u64,
        /// Re-enrich and merge into existing books
        #[arg(long)]
        update_existing: bool,
        /// Run everything but commit nothing
        #[arg(long)]
        dry_run: bool,
        /// Skip Open Library and import source fields only
        #[arg(long)]
        offline: bool,
    },
    /// Seed book clubs with members and reading sessions
    SeedClubs {
        #[arg(long, default_value_t = 15)]
        count: u64,
        /// Flush existing clubs and sessions first
        #[arg(long)]
        clear: bool,
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Seed discussions, reviews and reading progress
    SeedContent {
        #[arg(long, default_value_t = 50)]
        discussions: u64,
        #[arg(long, default_value_t = 100)]
        reviews: u64,
        #[arg(long, default_value_t = 200)]
        progress: u64,
        /// Flush existing content rows first
        #[arg(long)]
        clear: bool,
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run the whole pipeline: users, books, clubs, content
    MasterSeed {
        /// Dataset size: basic, full or production
        #[arg(long, default_value = "basic")]
        level: SeedLevel,
        /// Flush all seed-managed tables first
        #[arg(long)]
        reset: bool,
        #[arg(long)]
        seed: Option<u64>,
        /// Book list for the books stage
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Check image URLs and replace dead ones with placeholders
    ValidateImages {
        /// Only check these kinds (books, clubs, users); all when omitted
        #[arg(long, value_delimiter = ',')]
        kinds: Vec<ImageOwnerKind>,
        /// Recheck even recently checked references
        #[arg(long)]
        force: bool,
        /// Report only, write nothing
        #[arg(long)]
        dry_run: bool,
        #[arg(long, default_value_t = 7)]
        staleness_days: i64,
        #[arg(long, default_value_t = 10)]
        max_workers: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let db = Database::new(&cli.database)
        .await
        .with_context(|| format!("opening database {}", cli.database.display()))?;

    match cli.command {
        Command::SeedUsers {
            count,
            clear,
            dry_run,
            seed,
            username,
            reading_log,
        } => {
            let seeder = UserSeeder::new(UserSeedConfig {
                count,
                clear,
                dry_run,
                seed,
                ..Default::default()
            });

            if let Some(log_path) = reading_log {
                let entries = source::load_reading_log(&log_path)
                    .with_context(|| format!("reading {}", log_path.display()))?;
                let username = username.unwrap_or_else(|| "reader".to_string());
                let report = seeder.replay_reading_log(&db, &username, &entries).await?;
                println!("reading log replay: {report}");
            } else {
                let report = seeder.run(&db).await?;
                println!("users: {report}");
            }
        }

        Command::SeedBooks {
            input,
            batch_size,
            delay,
            update_existing,
            dry_run,
            offline,
        } => {
            let records = match input {
                Some(path) => source::load_source_records(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => source::builtin_catalog(),
            };

            let config = ImportConfig {
                batch_size,
                dry_run,
                update_existing,
                ..Default::default()
            };

            let report = if offline {
                BookImporter::new(OfflineProvider, config).run(&db, &records).await?
            } else {
                let client = OpenLibraryClient::new(
                    MetadataClientConfig::default()
                        .with_request_delay(Duration::from_millis(delay)),
                )?;
                BookImporter::new(client, config).run(&db, &records).await?
            };
            println!("books: {report}");
        }

        Command::SeedClubs { count, clear, dry_run, seed } => {
            let report = ClubSeeder::new(ClubSeedConfig {
                count,
                clear,
                dry_run,
                seed,
                ..Default::default()
            })
            .run(&db)
            .await?;
            println!("clubs: {report}");
        }

        Command::SeedContent {
            discussions,
            reviews,
            progress,
            clear,
            dry_run,
            seed,
        } => {
            let report = ContentSeeder::new(ContentSeedConfig {
                discussions,
                reviews,
                progress,
                clear,
                dry_run,
                seed,
                ..Default::default()
            })
            .run(&db)
            .await?;
            println!("content: {report}");
        }

        Command::MasterSeed {
            level,
            reset,
            seed,
            input,
        } => {
            let client = OpenLibraryClient::new(MetadataClientConfig::default())?;
            let mut orchestrator = Orchestrator::new(
                client,
                MasterSeedConfig {
                    level,
                    reset,
                    seed,
                    source_path: input,
                    ..Default::default()
                },
            );
            let report = orchestrator.run(&db).await?;
            println!("{report}");
        }

        Command::ValidateImages {
            kinds,
            force,
            dry_run,
            staleness_days,
            max_workers,
        } => {
            let config = ValidatorConfig {
                staleness_days,
                max_workers,
                dry_run,
                force,
                kinds: if kinds.is_empty() {
                    ImageOwnerKind::ALL.to_vec()
                } else {
                    kinds
                },
                timeout: Duration::from_secs(10),
                ..Default::default()
            };
            let report = ImageValidator::new(config)?.run(&db).await?;
            println!("images: {report}");
        }
    }

    db.close().await?;
    Ok(())
}

/// Provider used by `--offline`: never enriches anything.
struct OfflineProvider;

#[async_trait::async_trait]
impl shelf_seeder::api::MetadataProvider for OfflineProvider {
    async fn enrich(
        &self,
        _title: &str,
        _author: &str,
        _isbn: Option<&str>,
    ) -> shelf_seeder::Result<Option<shelf_seeder::api::Enrichment>> {
        Ok(None)
    }
}
