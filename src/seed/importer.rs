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

//! Batch book importer: dedup, metadata enrichment, per-batch transactions.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::api::client::MetadataProvider;
use crate::api::models::{clean_isbn, Enrichment};
use crate::error::{Result, SeedError};
use crate::seed::source::SourceRecord;
use crate::seed::SeedReport;
use crate::storage::database::Database;
use crate::storage::models::{Book, BookSource, NewBook};
use crate::storage::queries;

/// Importer settings
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Records per transaction
    pub batch_size: usize,
    /// Report would-be outcomes without persisting anything
    pub dry_run: bool,
    /// Re-enrich and merge into books that already exist
    pub update_existing: bool,
    /// Timestamp used for created_at/updated_at; injected for tests
    pub reference_time: DateTime<Utc>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            dry_run: false,
            update_existing: false,
            reference_time: Utc::now(),
        }
    }
}

enum Outcome {
    Created,
    Updated,
    Skipped,
}

/// Imports source records into the catalog, enriching each through the
/// configured [`MetadataProvider`].
pub struct BookImporter<P: MetadataProvider> {
    provider: P,
    config: ImportConfig,
}

impl<P: MetadataProvider> BookImporter<P> {
    pub fn new(provider: P, config: ImportConfig) -> Self {
        Self { provider, config }
    }

    /// Import every record, one transaction per batch. A storage failure
    /// rolls back its batch and the run continues with the next one.
    pub async fn run(&self, db: &Database, records: &[SourceRecord]) -> Result<SeedReport> {
        let mut report = SeedReport::default();
        let batch_size = self.config.batch_size.max(1);

        for (index, batch) in records.chunks(batch_size).enumerate() {
            match self.run_batch(db, batch).await {
                Ok(batch_report) => report.merge(&batch_report),
                Err(err) => {
                    warn!(batch = index, error = %err, "batch rolled back");
                    report.errors += batch.len() as u64;
                }
            }
        }

        info!(%report, "book import finished");
        Ok(report)
    }

    async fn run_batch(&self, db: &Database, batch: &[SourceRecord]) -> Result<SeedReport> {
        let mut report = SeedReport::default();
        let mut tx = db.pool().begin().await?;

        for record in batch {
            if !record.is_importable() {
                warn!(title = %record.title, "record missing title or author");
                report.errors += 1;
                continue;
            }

            match self.process_record(&mut tx, record).await {
                Ok(Outcome::Created) => report.created += 1,
                Ok(Outcome::Updated) => report.updated += 1,
                Ok(Outcome::Skipped) => report.skipped += 1,
                // Storage errors poison the transaction; surface them so the
                // whole batch rolls back.
                Err(err @ SeedError::Sqlx(_)) => return Err(err),
                Err(err) => {
                    warn!(title = %record.title, error = %err, "record failed");
                    report.errors += 1;
                }
            }
        }

        if self.config.dry_run {
            tx.rollback().await?;
        } else {
            tx.commit().await?;
        }

        Ok(report)
    }

    async fn process_record(
        &self,
        conn: &mut SqliteConnection,
        record: &SourceRecord,
    ) -> Result<Outcome> {
        let existing = find_existing(&mut *conn, record).await?;
        let isbn = record.isbn.as_deref().and_then(clean_isbn);

        // Dry runs report would-be outcomes and touch neither the
        // database nor the metadata provider.
        if self.config.dry_run {
            return Ok(match &existing {
                Some(_) if self.config.update_existing => Outcome::Updated,
                Some(_) => Outcome::Skipped,
                None => Outcome::Created,
            });
        }

        if let Some(existing) = &existing {
            if !self.config.update_existing {
                return Ok(Outcome::Skipped);
            }

            let enrichment = self.try_enrich(record, isbn.as_deref()).await;
            let incoming = build_new_book(record, enrichment.as_ref());
            let merged = merge_book(existing, &incoming);
            queries::update_book(&mut *conn, existing.book_id, &merged, self.config.reference_time)
                .await?;

            // Genres are only backfilled, never replaced.
            if let Some(enrichment) = &enrichment {
                if queries::book_genre_count(&mut *conn, existing.book_id).await? == 0 {
                    link_genres(&mut *conn, existing.book_id, &enrichment.genres).await?;
                }
            }

            return Ok(Outcome::Updated);
        }

        let enrichment = self.try_enrich(record, isbn.as_deref()).await;
        let new_book = build_new_book(record, enrichment.as_ref());

        let book_id = queries::insert_book(&mut *conn, &new_book, self.config.reference_time).await?;
        let author_id = queries::get_or_create_author(&mut *conn, &record.author).await?;
        queries::link_book_author(&mut *conn, book_id, author_id).await?;

        if let Some(enrichment) = &enrichment {
            link_genres(&mut *conn, book_id, &enrichment.genres).await?;
        }

        Ok(Outcome::Created)
    }

    /// Enrich one record, degrading to `None` when the provider fails.
    /// A dead or rejecting metadata API never blocks an import; the book
    /// is persisted from its source fields alone.
    async fn try_enrich(&self, record: &SourceRecord, isbn: Option<&str>) -> Option<Enrichment> {
        match self
            .provider
            .enrich(&record.title, &record.author, isbn)
            .await
        {
            Ok(enrichment) => enrichment,
            Err(err) => {
                warn!(title = %record.title, error = %err, "enrichment failed; importing source fields only");
                None
            }
        }
    }
}

/// Dedup lookup: cleaned ISBN first, then case-insensitive title + author.
async fn find_existing(
    conn: &mut SqliteConnection,
    record: &SourceRecord,
) -> Result<Option<Book>> {
    if let Some(isbn) = record.isbn.as_deref().and_then(clean_isbn) {
        if let Some(book) = queries::find_book_by_isbn(&mut *conn, &isbn).await? {
            return Ok(Some(book));
        }
    }
    queries::find_book_by_title_and_author(&mut *conn, &record.title, &record.author).await
}

async fn link_genres(conn: &mut SqliteConnection, book_id: i64, genres: &[String]) -> Result<()> {
    for genre in genres {
        let genre_id = queries::get_or_create_genre(&mut *conn, genre).await?;
        queries::link_book_genre(&mut *conn, book_id, genre_id).await?;
    }
    Ok(())
}

/// Combine a source record with optional enrichment into insertable fields.
/// Source values win where both sides have one; an unenriched record gets
/// `source = manual`.
fn build_new_book(record: &SourceRecord, enrichment: Option<&Enrichment>) -> NewBook {
    let record_isbn = record.isbn.as_deref().and_then(clean_isbn);
    let (record_isbn_13, record_isbn_10) = match record_isbn {
        Some(isbn) if isbn.len() == 13 => (Some(isbn), None),
        Some(isbn) => (None, Some(isbn)),
        None => (None, None),
    };

    match enrichment {
        Some(e) => NewBook {
            external_id: Some(e.external_id.clone()),
            isbn: record_isbn_13.or_else(|| e.isbn_13.clone()),
            isbn_10: record_isbn_10.or_else(|| e.isbn_10.clone()),
            title: record.title.clone(),
            description: record.description.clone().or_else(|| e.description.clone()),
            page_count: record.pages.or(e.page_count),
            publication_year: record.published_year.or(e.publication_year),
            publisher: e.publisher.clone(),
            language: e.language.clone(),
            source: Some(BookSource::Openlibrary),
            image_url: e.cover_url.clone(),
            image_checked_at: None,
        },
        None => NewBook {
            external_id: None,
            isbn: record_isbn_13,
            isbn_10: record_isbn_10,
            title: record.title.clone(),
            description: record.description.clone(),
            page_count: record.pages,
            publication_year: record.published_year,
            publisher: None,
            language: None,
            source: Some(BookSource::Manual),
            image_url: None,
            image_checked_at: None,
        },
    }
}

/// Merge for `--update-existing`: provenance fields always take the new
/// value, everything else only fills gaps in the stored row.
fn merge_book(existing: &Book, incoming: &NewBook) -> NewBook {
    NewBook {
        external_id: incoming.external_id.clone().or_else(|| existing.external_id.clone()),
        isbn: existing.isbn.clone().or_else(|| incoming.isbn.clone()),
        isbn_10: existing.isbn_10.clone().or_else(|| incoming.isbn_10.clone()),
        title: existing.title.clone(),
        description: existing.description.clone().or_else(|| incoming.description.clone()),
        page_count: existing.page_count.or(incoming.page_count),
        publication_year: existing.publication_year.or(incoming.publication_year),
        publisher: existing.publisher.clone().or_else(|| incoming.publisher.clone()),
        language: existing.language.clone().or_else(|| incoming.language.clone()),
        source: incoming.source,
        image_url: existing.image_url.clone().or_else(|| incoming.image_url.clone()),
        image_checked_at: existing.image_checked_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> SourceRecord {
        let mut record = SourceRecord::new("Dune", "Frank Herbert");
        record.isbn = Some("978-0-441-17271-9".to_string());
        record.pages = Some(412);
        record
    }

    fn sample_enrichment() -> Enrichment {
        Enrichment {
            external_id: "OL893415W".to_string(),
            description: Some("Paul Atreides on Arrakis.".to_string()),
            isbn_13: Some("9780441172719".to_string()),
            page_count: Some(896),
            publication_year: Some(1965),
            publisher: Some("Chilton".to_string()),
            language: Some("English".to_string()),
            genres: vec!["Science Fiction".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn source_fields_win_over_enrichment() {
        let book = build_new_book(&sample_record(), Some(&sample_enrichment()));
        assert_eq!(book.page_count, Some(412));
        assert_eq!(book.isbn, Some("9780441172719".to_string()));
        assert_eq!(book.source, Some(BookSource::Openlibrary));
        assert_eq!(book.publication_year, Some(1965));
    }

    #[test]
    fn unenriched_record_is_manual() {
        let book = build_new_book(&sample_record(), None);
        assert_eq!(book.source, Some(BookSource::Manual));
        assert!(book.external_id.is_none());
        assert!(book.publisher.is_none());
    }

    #[test]
    fn merge_only_fills_gaps() {
        let record = sample_record();
        let incoming = build_new_book(&record, Some(&sample_enrichment()));

        let existing = Book {
            book_id: 1,
            external_id: None,
            isbn: Some("9780441172719".to_string()),
            isbn_10: None,
            title: "Dune".to_string(),
            description: Some("Hand-written description.".to_string()),
            page_count: None,
            publication_year: Some(1965),
            publisher: None,
            language: None,
            source: BookSource::Manual,
            image_url: None,
            image_checked_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let merged = merge_book(&existing, &incoming);
        assert_eq!(merged.external_id, Some("OL893415W".to_string()));
        assert_eq!(merged.description, Some("Hand-written description.".to_string()));
        assert_eq!(merged.page_count, Some(412));
        assert_eq!(merged.publisher, Some("Chilton".to_string()));
        assert_eq!(merged.source, Some(BookSource::Openlibrary));
    }
}
