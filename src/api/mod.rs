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

//! Open Library metadata client
//!
//! Rate-limited, retrying HTTP wrapper around the Open Library search and
//! works endpoints, behind the [`MetadataProvider`] trait so the importer
//! can run against stubs in tests.

pub mod client;
pub mod models;

pub use client::{MetadataClientConfig, MetadataProvider, OpenLibraryClient};
pub use models::{clean_isbn, map_subjects_to_genres, Enrichment};
