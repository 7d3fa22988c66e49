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

//! Input formats for book import: CSV and JSON book lists, Goodreads-style
//! reading log exports, and the built-in catalog the orchestrator seeds from
//! when no file is given.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SeedError};

/// One book from an input file. Title and author are required for import;
/// rows missing them are kept so the importer can count them as errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub published_year: Option<i64>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub pages: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl SourceRecord {
    pub fn new<S: Into<String>>(title: S, author: S) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            ..Default::default()
        }
    }

    pub fn is_importable(&self) -> bool {
        !self.title.trim().is_empty() && !self.author.trim().is_empty()
    }
}

/// One row of a Goodreads library export
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingLogEntry {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "My Rating", default)]
    pub rating: Option<i64>,
    #[serde(rename = "Date Read", default)]
    pub date_read: Option<String>,
}

/// Load book records from a CSV or JSON file, chosen by extension.
pub fn load_source_records(path: &Path) -> Result<Vec<SourceRecord>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        other => Err(SeedError::UnsupportedFormat(format!(
            "unsupported input format '{other}' for {}",
            path.display()
        ))),
    }
}

fn load_csv(path: &Path) -> Result<Vec<SourceRecord>> {
    let mut reader = csv::Reader::from_path(path)?;

    // Missing required headers make the whole file unusable.
    let headers = reader.headers()?.clone();
    for required in ["title", "author"] {
        if !headers.iter().any(|h| h.eq_ignore_ascii_case(required)) {
            return Err(SeedError::InvalidRecord(format!(
                "{} is missing required column '{required}'",
                path.display()
            )));
        }
    }

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: SourceRecord = row?;
        records.push(record);
    }
    Ok(records)
}

fn load_json(path: &Path) -> Result<Vec<SourceRecord>> {
    let raw = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;

    // Accept either a bare array or an object with a "books" array.
    let records = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value)?,
        serde_json::Value::Object(mut map) => match map.remove("books") {
            Some(books) => serde_json::from_value(books)?,
            None => {
                return Err(SeedError::InvalidRecord(format!(
                    "{} has no top-level array or 'books' key",
                    path.display()
                )))
            }
        },
        _ => {
            return Err(SeedError::InvalidRecord(format!(
                "{} is not a JSON array or object",
                path.display()
            )))
        }
    };

    Ok(records)
}

/// Load a Goodreads-style reading log export.
pub fn load_reading_log(path: &Path) -> Result<Vec<ReadingLogEntry>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut entries = Vec::new();
    for row in reader.deserialize() {
        let entry: ReadingLogEntry = row?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Curated catalog used by the orchestrator when no input file is supplied.
/// Widely held titles so Open Library lookups actually land.
pub fn builtin_catalog() -> Vec<SourceRecord> {
    [
        ("Pride and Prejudice", "Jane Austen"),
        ("1984", "George Orwell"),
        ("To Kill a Mockingbird", "Harper Lee"),
        ("The Great Gatsby", "F. Scott Fitzgerald"),
        ("Murder on the Orient Express", "Agatha Christie"),
        ("The Shining", "Stephen King"),
        ("Harry Potter and the Philosopher's Stone", "J.K. Rowling"),
        ("The Hobbit", "J.R.R. Tolkien"),
        ("Dune", "Frank Herbert"),
        ("The Catcher in the Rye", "J.D. Salinger"),
        ("Brave New World", "Aldous Huxley"),
        ("The Handmaid's Tale", "Margaret Atwood"),
        ("Beloved", "Toni Morrison"),
        ("One Hundred Years of Solitude", "Gabriel Garcia Marquez"),
        ("The Name of the Wind", "Patrick Rothfuss"),
        ("Gone Girl", "Gillian Flynn"),
        ("The Girl with the Dragon Tattoo", "Stieg Larsson"),
        ("Educated", "Tara Westover"),
        ("Sapiens", "Yuval Noah Harari"),
        ("The Martian", "Andy Weir"),
        ("Circe", "Madeline Miller"),
        ("Normal People", "Sally Rooney"),
        ("The Night Circus", "Erin Morgenstern"),
        ("Project Hail Mary", "Andy Weir"),
        ("Where the Crawdads Sing", "Delia Owens"),
        ("The Seven Husbands of Evelyn Hugo", "Taylor Jenkins Reid"),
        ("A Game of Thrones", "George R.R. Martin"),
        ("The Road", "Cormac McCarthy"),
        ("Life of Pi", "Yann Martel"),
        ("The Kite Runner", "Khaled Hosseini"),
        ("The Book Thief", "Markus Zusak"),
        ("Never Let Me Go", "Kazuo Ishiguro"),
        ("The Remains of the Day", "Kazuo Ishiguro"),
        ("Wolf Hall", "Hilary Mantel"),
        ("The Goldfinch", "Donna Tartt"),
        ("The Secret History", "Donna Tartt"),
        ("All the Light We Cannot See", "Anthony Doerr"),
        ("The Underground Railroad", "Colson Whitehead"),
        ("Pachinko", "Min Jin Lee"),
        ("Americanah", "Chimamanda Ngozi Adichie"),
        ("The Left Hand of Darkness", "Ursula K. Le Guin"),
        ("Neuromancer", "William Gibson"),
        ("Snow Crash", "Neal Stephenson"),
        ("The Three-Body Problem", "Cixin Liu"),
        ("Klara and the Sun", "Kazuo Ishiguro"),
        ("Piranesi", "Susanna Clarke"),
        ("The Midnight Library", "Matt Haig"),
        ("Anxious People", "Fredrik Backman"),
        ("A Man Called Ove", "Fredrik Backman"),
        ("Lessons in Chemistry", "Bonnie Garmus"),
    ]
    .into_iter()
    .map(|(title, author)| SourceRecord::new(title, author))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        dir
    }

    #[test]
    fn csv_rows_with_blank_fields_are_kept() {
        let dir = write_temp(
            "books.csv",
            "title,author,isbn\nDune,Frank Herbert,9780441172719\n,No Title,\n",
        );
        let records = load_source_records(&dir.path().join("books.csv")).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_importable());
        assert!(!records[1].is_importable());
    }

    #[test]
    fn csv_without_required_headers_is_rejected() {
        let dir = write_temp("books.csv", "name,writer\nDune,Frank Herbert\n");
        let err = load_source_records(&dir.path().join("books.csv")).unwrap_err();
        assert!(matches!(err, SeedError::InvalidRecord(_)));
    }

    #[test]
    fn json_accepts_array_and_wrapped_object() {
        let dir = write_temp(
            "books.json",
            r#"{"books": [{"title": "Dune", "author": "Frank Herbert", "pages": 412}]}"#,
        );
        let records = load_source_records(&dir.path().join("books.json")).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pages, Some(412));

        let dir = write_temp("list.json", r#"[{"title": "Dune", "author": "Frank Herbert"}]"#);
        let records = load_source_records(&dir.path().join("list.json")).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn unknown_extension_is_an_error() {
        let dir = write_temp("books.yaml", "title: Dune");
        let err = load_source_records(&dir.path().join("books.yaml")).unwrap_err();
        assert!(matches!(err, SeedError::UnsupportedFormat(_)));
    }

    #[test]
    fn reading_log_uses_goodreads_headers() {
        let dir = write_temp(
            "log.csv",
            "Title,Author,My Rating,Date Read\nDune,Frank Herbert,5,2024/03/01\n",
        );
        let entries = load_reading_log(&dir.path().join("log.csv")).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].rating, Some(5));
    }

    #[test]
    fn builtin_catalog_is_complete() {
        let catalog = builtin_catalog();
        assert_eq!(catalog.len(), 50);
        assert!(catalog.iter().all(|r| r.is_importable()));
    }
}
