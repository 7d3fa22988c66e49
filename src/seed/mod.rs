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

//! Seeding pipeline: entity factories, book import, population generators
//! and the master orchestrator.

pub mod clubs;
pub mod content;
pub mod factory;
pub mod importer;
pub mod orchestrator;
pub mod source;
pub mod users;

pub use importer::{BookImporter, ImportConfig};
pub use orchestrator::{MasterSeedConfig, Orchestrator, SeedLevel, SeedStage};
pub use source::SourceRecord;

use std::fmt;

/// Outcome counters for one seeding pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub errors: u64,
}

impl SeedReport {
    pub fn total(&self) -> u64 {
        self.created + self.updated + self.skipped + self.errors
    }

    pub fn merge(&mut self, other: &SeedReport) {
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.errors += other.errors;
    }
}

impl fmt::Display for SeedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} skipped, {} errors",
            self.created, self.updated, self.skipped, self.errors
        )
    }
}
