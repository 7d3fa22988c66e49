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

//! Wire types for Open Library responses and the normalized [`Enrichment`]
//! the rest of the pipeline consumes.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

/// Response from `/search.json`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub docs: Vec<SearchDoc>,
    #[serde(default, rename = "numFound")]
    pub num_found: u64,
}

/// A single document from the search endpoint. Open Library omits fields
/// freely, so everything beyond the work key defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchDoc {
    pub key: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subject: Vec<String>,
    #[serde(default)]
    pub first_publish_year: Option<i64>,
    #[serde(default)]
    pub number_of_pages_median: Option<i64>,
    #[serde(default)]
    pub publisher: Vec<String>,
    #[serde(default)]
    pub isbn: Vec<String>,
    #[serde(default)]
    pub language: Vec<String>,
}

/// Response from `/works/{id}.json`
#[derive(Debug, Clone, Deserialize)]
pub struct WorkResponse {
    #[serde(default)]
    pub description: Option<WorkDescription>,
    #[serde(default)]
    pub subjects: Vec<String>,
}

/// Work descriptions arrive either as a bare string or as a typed object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WorkDescription {
    Text(String),
    Object { value: String },
}

impl WorkDescription {
    pub fn into_text(self) -> String {
        match self {
            WorkDescription::Text(text) => text,
            WorkDescription::Object { value } => value,
        }
    }
}

/// Normalized metadata for one book, assembled from search + work lookups.
#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    /// Work key with the `/works/` prefix stripped
    pub external_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub isbn_13: Option<String>,
    pub isbn_10: Option<String>,
    pub page_count: Option<i64>,
    pub publication_year: Option<i64>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub genres: Vec<String>,
    pub cover_url: Option<String>,
}

/// Genre taxonomy used by the catalog. Subjects that match none of these
/// are dropped rather than creating one genre row per raw subject string.
const GENRE_KEYWORDS: &[(&str, &str)] = &[
    ("fiction", "Fiction"),
    ("mystery", "Mystery"),
    ("thriller", "Mystery"),
    ("romance", "Romance"),
    ("science fiction", "Science Fiction"),
    ("sci-fi", "Science Fiction"),
    ("fantasy", "Fantasy"),
    ("biography", "Biography"),
    ("history", "History"),
    ("philosophy", "History"),
    ("self-help", "Self-Help"),
    ("young adult", "Young Adult"),
    ("literary", "Literary Fiction"),
    ("horror", "Fiction"),
    ("drama", "Fiction"),
    ("poetry", "Fiction"),
];

/// Map raw Open Library subjects onto the catalog's genre names.
///
/// Matching is case-insensitive and partial ("Detective and mystery
/// stories" maps to Mystery). Only the first ten subjects are considered;
/// the tail of a subject list is mostly noise.
pub fn map_subjects_to_genres(subjects: &[String]) -> Vec<String> {
    let mut genres = Vec::new();

    for subject in subjects.iter().take(10) {
        let lowered = subject.to_lowercase();
        for (keyword, genre) in GENRE_KEYWORDS {
            if lowered.contains(keyword) && !genres.iter().any(|g| g == genre) {
                genres.push((*genre).to_string());
            }
        }
    }

    genres
}

/// Human-readable language name for the MARC codes Open Library returns.
pub fn language_name(code: &str) -> Option<&'static str> {
    match code {
        "eng" => Some("English"),
        "spa" => Some("Spanish"),
        "fre" => Some("French"),
        "ger" => Some("German"),
        "ita" => Some("Italian"),
        "por" => Some("Portuguese"),
        "rus" => Some("Russian"),
        "jpn" => Some("Japanese"),
        "chi" => Some("Chinese"),
        _ => None,
    }
}

/// Strip formatting from an ISBN and keep it only if it has a valid length.
pub fn clean_isbn(raw: &str) -> Option<String> {
    static NON_ISBN: OnceLock<Regex> = OnceLock::new();
    let pattern = NON_ISBN.get_or_init(|| Regex::new(r"[^0-9Xx]").unwrap());

    let digits = pattern.replace_all(raw, "").to_uppercase();
    match digits.len() {
        10 | 13 => Some(digits),
        _ => None,
    }
}

/// Candidate cover image URLs for an ISBN, largest first.
pub fn cover_url_candidates(isbn: &str) -> Vec<String> {
    ["L", "M", "S"]
        .iter()
        .map(|size| format!("https://covers.openlibrary.org/b/isbn/{isbn}-{size}.jpg"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subjects_map_with_partial_matches() {
        let subjects = vec![
            "Detective and mystery stories".to_string(),
            "American fiction".to_string(),
            "Horror tales".to_string(),
        ];
        let genres = map_subjects_to_genres(&subjects);
        assert_eq!(genres, vec!["Mystery", "Fiction"]);
    }

    #[test]
    fn subjects_past_the_tenth_are_ignored() {
        let mut subjects: Vec<String> = (0..10).map(|i| format!("Subject {i}")).collect();
        subjects.push("Romance".to_string());
        assert!(map_subjects_to_genres(&subjects).is_empty());
    }

    #[test]
    fn isbn_cleaning() {
        assert_eq!(clean_isbn("978-0-06-051275-0"), Some("9780060512750".to_string()));
        assert_eq!(clean_isbn("0-545-01022-x"), Some("054501022X".to_string()));
        assert_eq!(clean_isbn("12345"), None);
        assert_eq!(clean_isbn(""), None);
    }

    #[test]
    fn description_variants_decode() {
        let text: WorkDescription = serde_json::from_str(r#""plain text""#).unwrap();
        assert_eq!(text.into_text(), "plain text");

        let object: WorkDescription =
            serde_json::from_str(r#"{"type": "/type/text", "value": "typed text"}"#).unwrap();
        assert_eq!(object.into_text(), "typed text");
    }
}
