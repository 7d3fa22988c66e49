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

//! Deterministic placeholder images, seeded by a stable entity key.

use std::fmt;
use std::str::FromStr;

use crate::error::SeedError;

/// Which table an image reference lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageOwnerKind {
    Book,
    Club,
    Profile,
}

impl ImageOwnerKind {
    pub const ALL: [ImageOwnerKind; 3] = [
        ImageOwnerKind::Book,
        ImageOwnerKind::Club,
        ImageOwnerKind::Profile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageOwnerKind::Book => "books",
            ImageOwnerKind::Club => "clubs",
            ImageOwnerKind::Profile => "users",
        }
    }
}

impl fmt::Display for ImageOwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageOwnerKind {
    type Err = SeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "books" | "book" => Ok(ImageOwnerKind::Book),
            "clubs" | "club" => Ok(ImageOwnerKind::Club),
            "users" | "user" | "profiles" | "profile" => Ok(ImageOwnerKind::Profile),
            other => Err(SeedError::ConfigurationError(format!(
                "unknown image kind '{other}' (expected books, clubs or users)"
            ))),
        }
    }
}

/// FNV-1a, used to turn entity keys into stable numeric image seeds.
fn fnv1a(input: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in input.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Placeholder URL for a dead image. Pure function of kind and key, so
/// repeated repair runs always pick the same replacement.
pub fn placeholder_for(kind: ImageOwnerKind, key: &str) -> String {
    match kind {
        ImageOwnerKind::Book => {
            let seed = fnv1a(key) % 1000;
            format!("https://picsum.photos/seed/{seed}/300/450")
        }
        ImageOwnerKind::Club => {
            let seed = fnv1a(key) % 1000;
            format!("https://picsum.photos/seed/{seed}/600/400")
        }
        ImageOwnerKind::Profile => {
            format!("https://api.dicebear.com/7.x/avataaars/svg?seed={key}")
        }
    }
}

/// Whether a URL already points at one of our placeholder services.
pub fn is_placeholder(url: &str) -> bool {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .map(|host| host == "picsum.photos" || host == "api.dicebear.com")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_deterministic() {
        let a = placeholder_for(ImageOwnerKind::Book, "42");
        let b = placeholder_for(ImageOwnerKind::Book, "42");
        assert_eq!(a, b);

        let c = placeholder_for(ImageOwnerKind::Book, "43");
        assert_ne!(a, c);
    }

    #[test]
    fn kinds_use_distinct_dimensions() {
        let book = placeholder_for(ImageOwnerKind::Book, "1");
        let club = placeholder_for(ImageOwnerKind::Club, "1");
        assert!(book.ends_with("/300/450"));
        assert!(club.ends_with("/600/400"));
    }

    #[test]
    fn profile_placeholder_embeds_username() {
        let url = placeholder_for(ImageOwnerKind::Profile, "ada.lovelace");
        assert!(url.contains("seed=ada.lovelace"));
        assert!(is_placeholder(&url));
    }

    #[test]
    fn placeholder_detection() {
        assert!(is_placeholder("https://picsum.photos/seed/7/300/450"));
        assert!(!is_placeholder("https://covers.openlibrary.org/b/isbn/123-L.jpg"));
        assert!(!is_placeholder("not a url"));
    }

    #[test]
    fn kind_parsing() {
        assert_eq!("books".parse::<ImageOwnerKind>().unwrap(), ImageOwnerKind::Book);
        assert_eq!("Users".parse::<ImageOwnerKind>().unwrap(), ImageOwnerKind::Profile);
        assert!("covers".parse::<ImageOwnerKind>().is_err());
    }
}
