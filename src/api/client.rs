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

//! Rate-limited Open Library client with retry and backoff

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api::models::{
    clean_isbn, cover_url_candidates, language_name, map_subjects_to_genres, Enrichment,
    SearchDoc, SearchResponse, WorkResponse,
};
use crate::error::{Result, SeedError};

const DEFAULT_BASE_URL: &str = "https://openlibrary.org";
const DEFAULT_USER_AGENT: &str = concat!("shelfseed/", env!("CARGO_PKG_VERSION"));

/// Configuration for the Open Library client
#[derive(Debug, Clone)]
pub struct MetadataClientConfig {
    pub base_url: String,
    /// Minimum gap between consecutive requests
    pub request_delay: Duration,
    pub timeout: Duration,
    /// Retries after the initial attempt
    pub max_retries: u32,
    pub user_agent: String,
}

impl Default for MetadataClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl MetadataClientConfig {
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Delay before retry `attempt` (1-based): base delay doubled each time.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.request_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Source of bibliographic metadata, keyed by title and author.
///
/// The importer only talks to this trait; tests swap in stubs.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Look up metadata for a book, by ISBN when one is known. `Ok(None)`
    /// means "nothing found" and the caller should fall back to
    /// source-only fields.
    async fn enrich(
        &self,
        title: &str,
        author: &str,
        isbn: Option<&str>,
    ) -> Result<Option<Enrichment>>;
}

#[async_trait]
impl<T: MetadataProvider + ?Sized> MetadataProvider for &T {
    async fn enrich(
        &self,
        title: &str,
        author: &str,
        isbn: Option<&str>,
    ) -> Result<Option<Enrichment>> {
        (**self).enrich(title, author, isbn).await
    }
}

#[async_trait]
impl<T: MetadataProvider + ?Sized> MetadataProvider for std::sync::Arc<T> {
    async fn enrich(
        &self,
        title: &str,
        author: &str,
        isbn: Option<&str>,
    ) -> Result<Option<Enrichment>> {
        (**self).enrich(title, author, isbn).await
    }
}

/// HTTP client for openlibrary.org
pub struct OpenLibraryClient {
    http: reqwest::Client,
    config: MetadataClientConfig,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl OpenLibraryClient {
    pub fn new(config: MetadataClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            http,
            config,
            last_request: Arc::new(Mutex::new(None)),
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(MetadataClientConfig::default())
    }

    /// Enforce the minimum gap between requests. Holds the lock across the
    /// sleep so concurrent callers queue up instead of bursting.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.config.request_delay {
                tokio::time::sleep(self.config.request_delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// GET a JSON document with throttling and retry. `Ok(None)` on 404.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let mut attempt = 0u32;

        loop {
            self.throttle().await;

            let outcome = self.http.get(url).query(query).send().await;

            let error = match outcome {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(Some(response.json::<T>().await?));
                    }
                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Ok(None);
                    }

                    let error = SeedError::MetadataRequestFailed {
                        message: format!("{url} returned {status}"),
                        status_code: Some(status.as_u16()),
                    };
                    if !error.is_transient() {
                        return Err(error);
                    }
                    error
                }
                Err(err) => {
                    let is_transient = err.is_timeout() || err.is_connect();
                    let error = SeedError::NetworkError {
                        message: err.to_string(),
                        is_transient,
                    };
                    if !is_transient {
                        return Err(error);
                    }
                    error
                }
            };

            attempt += 1;
            if attempt > self.config.max_retries {
                return Err(error);
            }

            let delay = self.config.backoff_delay(attempt);
            debug!(url, attempt, ?delay, "retrying metadata request");
            tokio::time::sleep(delay).await;
        }
    }

    /// Search for a book and return the best-matching document. An ISBN
    /// narrows the search far better than title and author alone.
    pub async fn search(
        &self,
        title: &str,
        author: &str,
        isbn: Option<&str>,
    ) -> Result<Option<SearchDoc>> {
        let url = format!("{}/search.json", self.config.base_url);

        let mut query = vec![("title", title), ("author", author), ("limit", "1")];
        if let Some(isbn) = isbn {
            query = vec![("isbn", isbn), ("limit", "1")];
        }

        let response: Option<SearchResponse> = self.get_json(&url, &query).await?;
        Ok(response.and_then(|r| r.docs.into_iter().next()))
    }

    /// Fetch the full work record for a search document's key.
    pub async fn fetch_work(&self, work_key: &str) -> Result<Option<WorkResponse>> {
        let key = work_key.trim_start_matches('/');
        let url = format!("{}/{key}.json", self.config.base_url);
        self.get_json(&url, &[]).await
    }

    async fn lookup(
        &self,
        title: &str,
        author: &str,
        isbn: Option<&str>,
    ) -> Result<Option<Enrichment>> {
        let Some(doc) = self.search(title, author, isbn).await? else {
            debug!(title, author, "no search results");
            return Ok(None);
        };

        let mut enrichment = Enrichment {
            external_id: doc.key.trim_start_matches("/works/").to_string(),
            title: doc.title.clone(),
            page_count: doc.number_of_pages_median,
            publication_year: doc.first_publish_year,
            publisher: doc.publisher.first().cloned(),
            language: doc
                .language
                .iter()
                .find_map(|code| language_name(code))
                .map(str::to_string),
            ..Default::default()
        };

        for raw in &doc.isbn {
            match clean_isbn(raw) {
                Some(isbn) if isbn.len() == 13 && enrichment.isbn_13.is_none() => {
                    enrichment.isbn_13 = Some(isbn);
                }
                Some(isbn) if isbn.len() == 10 && enrichment.isbn_10.is_none() => {
                    enrichment.isbn_10 = Some(isbn);
                }
                _ => {}
            }
            if enrichment.isbn_13.is_some() && enrichment.isbn_10.is_some() {
                break;
            }
        }

        if let Some(isbn) = enrichment.isbn_13.as_ref().or(enrichment.isbn_10.as_ref()) {
            enrichment.cover_url = cover_url_candidates(isbn).into_iter().next();
        }

        let mut subjects = doc.subject;
        if let Some(work) = self.fetch_work(&doc.key).await? {
            if let Some(description) = work.description {
                enrichment.description = Some(description.into_text());
            }
            subjects.extend(work.subjects);
        }
        enrichment.genres = map_subjects_to_genres(&subjects);

        Ok(Some(enrichment))
    }
}

#[async_trait]
impl MetadataProvider for OpenLibraryClient {
    async fn enrich(
        &self,
        title: &str,
        author: &str,
        isbn: Option<&str>,
    ) -> Result<Option<Enrichment>> {
        match self.lookup(title, author, isbn).await {
            Ok(enrichment) => Ok(enrichment),
            // A degraded API should not sink the whole import; the record
            // falls back to source-only fields.
            Err(err) if err.is_transient() => {
                warn!(title, author, error = %err, "metadata lookup gave up, importing without enrichment");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
