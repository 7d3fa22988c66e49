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

//! End-to-end pipeline properties against in-memory databases.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use shelf_seeder::api::{Enrichment, MetadataProvider};
use shelf_seeder::seed::clubs::{ClubSeedConfig, ClubSeeder};
use shelf_seeder::seed::content::{ContentSeedConfig, ContentSeeder};
use shelf_seeder::seed::source::SourceRecord;
use shelf_seeder::seed::users::{UserSeedConfig, UserSeeder};
use shelf_seeder::seed::{
    BookImporter, ImportConfig, MasterSeedConfig, Orchestrator, SeedLevel, SeedStage,
};
use shelf_seeder::storage::models::{BookSource, ClubRole};
use shelf_seeder::storage::Database;
use shelf_seeder::{Result, SeedError};

/// Always returns a canned enrichment derived from the title.
struct StubProvider;

#[async_trait]
impl MetadataProvider for StubProvider {
    async fn enrich(
        &self,
        title: &str,
        _author: &str,
        _isbn: Option<&str>,
    ) -> Result<Option<Enrichment>> {
        Ok(Some(Enrichment {
            external_id: format!("OL-{}", title.to_lowercase().replace(' ', "-")),
            description: Some(format!("About {title}.")),
            page_count: Some(320),
            publication_year: Some(1990),
            publisher: Some("Test Press".to_string()),
            language: Some("English".to_string()),
            genres: vec!["Fiction".to_string()],
            ..Default::default()
        }))
    }
}

/// Finds nothing, as a permanently degraded metadata API would after its
/// client exhausted retries.
struct NoneProvider;

#[async_trait]
impl MetadataProvider for NoneProvider {
    async fn enrich(
        &self,
        _title: &str,
        _author: &str,
        _isbn: Option<&str>,
    ) -> Result<Option<Enrichment>> {
        Ok(None)
    }
}

/// Fails terminally on every lookup.
struct FailingProvider;

#[async_trait]
impl MetadataProvider for FailingProvider {
    async fn enrich(
        &self,
        _title: &str,
        _author: &str,
        _isbn: Option<&str>,
    ) -> Result<Option<Enrichment>> {
        Err(SeedError::MetadataRequestFailed {
            message: "bad request".to_string(),
            status_code: Some(400),
        })
    }
}

fn fixed_now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn import_config() -> ImportConfig {
    ImportConfig {
        reference_time: fixed_now(),
        ..Default::default()
    }
}

fn records(pairs: &[(&str, &str)]) -> Vec<SourceRecord> {
    pairs
        .iter()
        .map(|(title, author)| SourceRecord::new(*title, *author))
        .collect()
}

async fn count(db: &Database, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(db.pool()).await.unwrap()
}

// ---------------------------------------------------------------------------
// importer
// ---------------------------------------------------------------------------

#[tokio::test]
async fn importing_the_same_list_twice_creates_no_duplicates() {
    let db = Database::new_in_memory().await.unwrap();
    let importer = BookImporter::new(StubProvider, import_config());
    let list = records(&[("Dune", "Frank Herbert"), ("Circe", "Madeline Miller")]);

    let first = importer.run(&db, &list).await.unwrap();
    assert_eq!(first.created, 2);
    assert_eq!(first.errors, 0);

    let second = importer.run(&db, &list).await.unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, 2);

    assert_eq!(count(&db, "SELECT COUNT(*) FROM books").await, 2);
}

#[tokio::test]
async fn update_existing_backfills_missing_fields() {
    let db = Database::new_in_memory().await.unwrap();
    let list = records(&[("Dune", "Frank Herbert")]);

    // First import without enrichment leaves gaps.
    BookImporter::new(NoneProvider, import_config())
        .run(&db, &list)
        .await
        .unwrap();

    let report = BookImporter::new(
        StubProvider,
        ImportConfig {
            update_existing: true,
            ..import_config()
        },
    )
    .run(&db, &list)
    .await
    .unwrap();
    assert_eq!(report.updated, 1);

    let books = shelf_seeder::storage::queries::list_books(db.pool()).await.unwrap();
    assert_eq!(books[0].publisher.as_deref(), Some("Test Press"));
    assert_eq!(books[0].source, BookSource::Openlibrary);
    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM book_genres").await,
        1,
        "genres backfilled for a book that had none"
    );
}

#[tokio::test]
async fn degraded_api_still_imports_source_fields() {
    let db = Database::new_in_memory().await.unwrap();
    let mut record = SourceRecord::new("Obscure Title", "Unknown Author");
    record.pages = Some(200);

    let report = BookImporter::new(NoneProvider, import_config())
        .run(&db, &[record])
        .await
        .unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.errors, 0);

    let books = shelf_seeder::storage::queries::list_books(db.pool()).await.unwrap();
    assert_eq!(books[0].source, BookSource::Manual);
    assert_eq!(books[0].page_count, Some(200));
    assert!(books[0].external_id.is_none());
}

#[tokio::test]
async fn terminal_provider_failure_still_imports_source_fields() {
    let db = Database::new_in_memory().await.unwrap();
    let list = records(&[("A", "B"), ("C", "D")]);

    let report = BookImporter::new(FailingProvider, import_config())
        .run(&db, &list)
        .await
        .unwrap();
    assert_eq!(report.created, 2);
    assert_eq!(report.errors, 0);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM books").await, 2);
    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM books WHERE source = 'manual'").await,
        2
    );
}

#[tokio::test]
async fn records_without_title_or_author_are_errors() {
    let db = Database::new_in_memory().await.unwrap();
    let mut list = records(&[("Dune", "Frank Herbert")]);
    list.push(SourceRecord::new("", "Nobody"));
    list.push(SourceRecord::new("Untitled", ""));

    let report = BookImporter::new(StubProvider, import_config())
        .run(&db, &list)
        .await
        .unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.errors, 2);
}

#[tokio::test]
async fn storage_failure_rolls_back_its_batch_only() {
    let db = Database::new_in_memory().await.unwrap();

    // Second batch carries a record violating the page_count CHECK.
    let mut poison = SourceRecord::new("Poison", "Author");
    poison.pages = Some(-5);
    let list = vec![
        SourceRecord::new("Good One", "Author One"),
        SourceRecord::new("Good Two", "Author Two"),
        poison,
        SourceRecord::new("Good Three", "Author Three"),
    ];

    let report = BookImporter::new(
        NoneProvider,
        ImportConfig {
            batch_size: 2,
            ..import_config()
        },
    )
    .run(&db, &list)
    .await
    .unwrap();

    assert_eq!(report.created, 2, "first batch committed");
    assert_eq!(report.errors, 2, "poisoned batch counted whole");
    assert_eq!(count(&db, "SELECT COUNT(*) FROM books").await, 2);
}

#[tokio::test]
async fn dry_run_commits_nothing() {
    let db = Database::new_in_memory().await.unwrap();
    let report = BookImporter::new(
        StubProvider,
        ImportConfig {
            dry_run: true,
            ..import_config()
        },
    )
    .run(&db, &records(&[("Dune", "Frank Herbert")]))
    .await
    .unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM books").await, 0);

    // The dry run never issued an insert, so the first real import still
    // gets rowid 1.
    BookImporter::new(StubProvider, import_config())
        .run(&db, &records(&[("Dune", "Frank Herbert")]))
        .await
        .unwrap();
    assert_eq!(count(&db, "SELECT MIN(book_id) FROM books").await, 1);
}

// ---------------------------------------------------------------------------
// population
// ---------------------------------------------------------------------------

#[tokio::test]
async fn seeded_usernames_and_emails_are_unique() {
    let db = Database::new_in_memory().await.unwrap();
    let report = UserSeeder::new(UserSeedConfig {
        count: 40,
        reference_time: fixed_now(),
        seed: Some(99),
        ..Default::default()
    })
    .run(&db)
    .await
    .unwrap();
    assert_eq!(report.created, 40);
    assert_eq!(report.errors, 0);

    let usernames: Vec<String> = sqlx::query_scalar("SELECT username FROM users")
        .fetch_all(db.pool())
        .await
        .unwrap();
    let unique: HashSet<&String> = usernames.iter().collect();
    assert_eq!(unique.len(), 40);

    let emails: Vec<String> = sqlx::query_scalar("SELECT email FROM users")
        .fetch_all(db.pool())
        .await
        .unwrap();
    let unique: HashSet<&String> = emails.iter().collect();
    assert_eq!(unique.len(), 40);
}

#[tokio::test]
async fn elevation_fraction_holds_with_fixed_seed() {
    let db = Database::new_in_memory().await.unwrap();
    UserSeeder::new(UserSeedConfig {
        count: 100,
        reference_time: fixed_now(),
        seed: Some(7),
        ..Default::default()
    })
    .run(&db)
    .await
    .unwrap();

    let elevated = count(
        &db,
        "SELECT COUNT(DISTINCT user_id) FROM memberships WHERE role IN ('admin', 'moderator')",
    )
    .await;
    // Half the population is elevated in expectation; fixed seed keeps the
    // draw inside a generous band.
    assert!((35..=65).contains(&elevated), "elevated = {elevated}");
}

#[tokio::test]
async fn every_club_has_exactly_one_creator_admin_membership() {
    let db = Database::new_in_memory().await.unwrap();
    UserSeeder::new(UserSeedConfig {
        count: 20,
        reference_time: fixed_now(),
        seed: Some(3),
        ..Default::default()
    })
    .run(&db)
    .await
    .unwrap();
    ClubSeeder::new(ClubSeedConfig {
        count: 10,
        reference_time: fixed_now(),
        seed: Some(3),
        ..Default::default()
    })
    .run(&db)
    .await
    .unwrap();

    let clubs = shelf_seeder::storage::queries::list_clubs(db.pool()).await.unwrap();
    assert!(!clubs.is_empty());

    for club in clubs {
        let memberships =
            shelf_seeder::storage::queries::club_memberships(db.pool(), club.club_id)
                .await
                .unwrap();
        let creator_rows: Vec<_> = memberships
            .iter()
            .filter(|m| m.user_id == club.creator_id)
            .collect();
        assert_eq!(creator_rows.len(), 1, "club {}", club.name);
        assert_eq!(creator_rows[0].role, ClubRole::Admin);
    }
}

#[tokio::test]
async fn reseeding_clubs_with_clear_replaces_previous_clubs() {
    let db = Database::new_in_memory().await.unwrap();
    UserSeeder::new(UserSeedConfig {
        count: 15,
        reference_time: fixed_now(),
        seed: Some(7),
        ..Default::default()
    })
    .run(&db)
    .await
    .unwrap();

    let config = ClubSeedConfig {
        count: 5,
        reference_time: fixed_now(),
        seed: Some(7),
        ..Default::default()
    };
    ClubSeeder::new(config.clone()).run(&db).await.unwrap();
    // Elevated users founded some clubs already, so the first pass ends
    // with more than the configured count.
    let before = count(&db, "SELECT COUNT(*) FROM book_clubs").await;
    assert!(before >= 5);

    // The flush removes every earlier club; only this pass remains.
    ClubSeeder::new(ClubSeedConfig {
        clear: true,
        ..config
    })
    .run(&db)
    .await
    .unwrap();
    assert_eq!(count(&db, "SELECT COUNT(*) FROM book_clubs").await, 5);
}

#[tokio::test]
async fn reseeding_content_with_clear_replaces_previous_rows() {
    let db = Database::new_in_memory().await.unwrap();
    BookImporter::new(StubProvider, import_config())
        .run(&db, &records(&[("Dune", "Frank Herbert"), ("Circe", "Madeline Miller")]))
        .await
        .unwrap();
    UserSeeder::new(UserSeedConfig {
        count: 10,
        reference_time: fixed_now(),
        seed: Some(8),
        ..Default::default()
    })
    .run(&db)
    .await
    .unwrap();
    ClubSeeder::new(ClubSeedConfig {
        count: 3,
        reference_time: fixed_now(),
        seed: Some(8),
        ..Default::default()
    })
    .run(&db)
    .await
    .unwrap();

    let config = ContentSeedConfig {
        discussions: 8,
        reviews: 10,
        progress: 10,
        reference_time: fixed_now(),
        seed: Some(8),
        ..Default::default()
    };
    ContentSeeder::new(config.clone()).run(&db).await.unwrap();
    assert_eq!(count(&db, "SELECT COUNT(*) FROM discussions").await, 8);

    ContentSeeder::new(ContentSeedConfig {
        clear: true,
        ..config
    })
    .run(&db)
    .await
    .unwrap();
    assert_eq!(count(&db, "SELECT COUNT(*) FROM discussions").await, 8);
}

#[tokio::test]
async fn clubs_refuse_to_seed_without_users() {
    let db = Database::new_in_memory().await.unwrap();
    let err = ClubSeeder::new(ClubSeedConfig::default())
        .run(&db)
        .await
        .unwrap_err();
    assert!(matches!(err, SeedError::InvalidState(_)));
}

#[tokio::test]
async fn content_reviews_respect_uniqueness_and_range() {
    let db = Database::new_in_memory().await.unwrap();
    BookImporter::new(StubProvider, import_config())
        .run(&db, &records(&[("Dune", "Frank Herbert"), ("Circe", "Madeline Miller")]))
        .await
        .unwrap();
    UserSeeder::new(UserSeedConfig {
        count: 10,
        reference_time: fixed_now(),
        seed: Some(5),
        ..Default::default()
    })
    .run(&db)
    .await
    .unwrap();
    ClubSeeder::new(ClubSeedConfig {
        count: 3,
        reference_time: fixed_now(),
        seed: Some(5),
        ..Default::default()
    })
    .run(&db)
    .await
    .unwrap();

    // More reviews requested than (user, book) pairs exist; the seeder must
    // stop at the cap instead of violating uniqueness.
    ContentSeeder::new(ContentSeedConfig {
        discussions: 10,
        reviews: 100,
        progress: 30,
        reference_time: fixed_now(),
        seed: Some(5),
        ..Default::default()
    })
    .run(&db)
    .await
    .unwrap();

    let pairs = count(&db, "SELECT COUNT(*) FROM reviews").await;
    let distinct = count(&db, "SELECT COUNT(DISTINCT user_id || '-' || book_id) FROM reviews").await;
    assert_eq!(pairs, distinct);
    assert!(pairs <= 20);

    let out_of_range =
        count(&db, "SELECT COUNT(*) FROM reviews WHERE rating < 1 OR rating > 5").await;
    assert_eq!(out_of_range, 0);
}

#[tokio::test]
async fn reply_threads_stay_inside_their_discussion() {
    let db = Database::new_in_memory().await.unwrap();
    BookImporter::new(StubProvider, import_config())
        .run(&db, &records(&[("1984", "George Orwell")]))
        .await
        .unwrap();
    UserSeeder::new(UserSeedConfig {
        count: 10,
        reference_time: fixed_now(),
        seed: Some(8),
        ..Default::default()
    })
    .run(&db)
    .await
    .unwrap();
    ClubSeeder::new(ClubSeedConfig {
        count: 3,
        reference_time: fixed_now(),
        seed: Some(8),
        ..Default::default()
    })
    .run(&db)
    .await
    .unwrap();
    ContentSeeder::new(ContentSeedConfig {
        discussions: 20,
        reviews: 5,
        progress: 5,
        reference_time: fixed_now(),
        seed: Some(8),
        ..Default::default()
    })
    .run(&db)
    .await
    .unwrap();

    let cross_thread = count(
        &db,
        r#"
        SELECT COUNT(*) FROM discussion_replies r
        JOIN discussion_replies p ON p.reply_id = r.parent_reply_id
        WHERE p.discussion_id != r.discussion_id
        "#,
    )
    .await;
    assert_eq!(cross_thread, 0);
}

#[tokio::test]
async fn progress_never_exceeds_page_count() {
    let db = Database::new_in_memory().await.unwrap();
    BookImporter::new(StubProvider, import_config())
        .run(&db, &records(&[("Dune", "Frank Herbert")]))
        .await
        .unwrap();
    UserSeeder::new(UserSeedConfig {
        count: 15,
        reference_time: fixed_now(),
        seed: Some(4),
        ..Default::default()
    })
    .run(&db)
    .await
    .unwrap();

    let overshoot = count(
        &db,
        r#"
        SELECT COUNT(*) FROM reading_progress rp
        JOIN books b ON b.book_id = rp.book_id
        WHERE b.page_count IS NOT NULL AND rp.current_page > b.page_count
        "#,
    )
    .await;
    assert_eq!(overshoot, 0);
}

// ---------------------------------------------------------------------------
// orchestrator
// ---------------------------------------------------------------------------

#[tokio::test]
async fn master_seed_runs_to_done() {
    let db = Database::new_in_memory().await.unwrap();
    let mut orchestrator = Orchestrator::new(
        StubProvider,
        MasterSeedConfig {
            level: SeedLevel::Basic,
            reference_time: fixed_now(),
            seed: Some(1),
            ..Default::default()
        },
    );

    let report = orchestrator.run(&db).await.unwrap();
    assert_eq!(orchestrator.stage(), SeedStage::Done);
    assert_eq!(report.users.created, 10);
    assert_eq!(report.books.created, 20);
    assert!(report.clubs.created > 0);

    assert_eq!(count(&db, "SELECT COUNT(*) FROM users").await, 10);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM books").await, 20);
}

#[tokio::test]
async fn rerunning_master_seed_adds_no_duplicate_books() {
    let db = Database::new_in_memory().await.unwrap();
    let config = MasterSeedConfig {
        level: SeedLevel::Basic,
        reference_time: fixed_now(),
        seed: Some(2),
        ..Default::default()
    };

    Orchestrator::new(StubProvider, config.clone())
        .run(&db)
        .await
        .unwrap();
    let books_after_first = count(&db, "SELECT COUNT(*) FROM books").await;

    Orchestrator::new(StubProvider, config).run(&db).await.unwrap();
    assert_eq!(count(&db, "SELECT COUNT(*) FROM books").await, books_after_first);

    let usernames: Vec<String> = sqlx::query_scalar("SELECT username FROM users")
        .fetch_all(db.pool())
        .await
        .unwrap();
    let unique: HashSet<&String> = usernames.iter().collect();
    assert_eq!(unique.len(), usernames.len(), "no duplicate usernames");
}

#[tokio::test]
async fn reset_flushes_before_reseeding() {
    let db = Database::new_in_memory().await.unwrap();
    let base = MasterSeedConfig {
        level: SeedLevel::Basic,
        reference_time: fixed_now(),
        seed: Some(6),
        ..Default::default()
    };

    Orchestrator::new(StubProvider, base.clone()).run(&db).await.unwrap();
    Orchestrator::new(
        StubProvider,
        MasterSeedConfig {
            reset: true,
            ..base
        },
    )
    .run(&db)
    .await
    .unwrap();

    assert_eq!(count(&db, "SELECT COUNT(*) FROM users").await, 10);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM books").await, 20);
}
