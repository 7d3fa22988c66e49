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

//! Entity factories: realistic names, profiles, clubs and content snippets.
//!
//! All generation is driven by an injected `Rng`, so a fixed seed replays
//! the same population.

use chrono::{DateTime, Duration, Utc};
use fake::faker::address::en::CityName;
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::storage::models::DiscussionKind;

// ============================================================================
// NAMES
// ============================================================================

// Mixed-locale name pool so the population does not read as a single region.
const FIRST_NAMES: &[&str] = &[
    "Emma", "Liam", "Olivia", "Noah", "Ava", "Elijah", "Sophia", "Lucas", "Isabella", "Mason",
    "Mia", "Ethan", "Charlotte", "James", "Amelia", "Benjamin", "Harper", "Jacob", "Evelyn",
    "Michael", "Sofia", "Mateo", "Valentina", "Diego", "Camila", "Alejandro", "Lucia", "Carlos",
    "Elena", "Javier", "Yuki", "Haruto", "Sakura", "Ren", "Aiko", "Kenji", "Mei", "Priya",
    "Arjun", "Ananya", "Rohan", "Divya", "Vikram", "Amara", "Kwame", "Zara", "Tariq", "Leila",
    "Omar", "Fatima", "Anders", "Ingrid", "Magnus", "Freya", "Henrik", "Astrid", "Pierre",
    "Camille", "Antoine", "Margaux", "Giulia", "Marco", "Chiara", "Lorenzo",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin", "Tanaka", "Suzuki", "Takahashi", "Watanabe", "Ito", "Yamamoto",
    "Nakamura", "Patel", "Sharma", "Singh", "Kumar", "Gupta", "Mehta", "Okafor", "Mensah",
    "Diallo", "Hassan", "Ali", "Ahmed", "Larsen", "Johansson", "Nilsson", "Eriksson", "Dubois",
    "Moreau", "Laurent", "Rossi", "Ferrari", "Ricci", "Esposito", "Kowalski", "Nowak",
];

pub fn full_name<R: Rng + ?Sized>(rng: &mut R) -> (String, String) {
    let first = *FIRST_NAMES.choose(rng).unwrap();
    let last = *LAST_NAMES.choose(rng).unwrap();
    (first.to_string(), last.to_string())
}

/// Base username before any uniqueness suffix.
pub fn username_base<R: Rng + ?Sized>(rng: &mut R, first: &str, last: &str) -> String {
    let first = first.to_lowercase();
    let last = last.to_lowercase();
    match rng.gen_range(0..4) {
        0 => format!("{first}.{last}"),
        1 => format!("{first}_{last}"),
        2 => format!("{first}{}", rng.gen_range(10..100)),
        _ => format!("{}{last}", &first[..1]),
    }
}

const EMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "outlook.com",
    "protonmail.com",
    "icloud.com",
];

pub fn email_for<R: Rng + ?Sized>(rng: &mut R, username: &str) -> String {
    let domain = EMAIL_DOMAINS.choose(rng).unwrap();
    format!("{username}@{domain}")
}

// ============================================================================
// PROFILES
// ============================================================================

const BIO_TEMPLATES: &[&str] = &[
    "Avid reader with a soft spot for {}.",
    "Currently working through a towering to-be-read pile. Mostly {}.",
    "Book club regular, tea enthusiast, collector of {} paperbacks.",
    "Reading my way around the world, one {} novel at a time.",
    "Reviews, annotations, marginalia. {} above all.",
    "Slow reader, fast opinions. Ask me about {}.",
];

const BIO_TOPICS: &[&str] = &[
    "mystery",
    "literary fiction",
    "science fiction",
    "fantasy",
    "historical fiction",
    "memoirs",
    "translated fiction",
    "nonfiction",
];

pub fn bio<R: Rng + ?Sized>(rng: &mut R) -> String {
    // Half the profiles get a template bio, the rest a generic sentence.
    if rng.gen_bool(0.5) {
        let template = BIO_TEMPLATES.choose(rng).unwrap();
        let topic = BIO_TOPICS.choose(rng).unwrap();
        template.replace("{}", topic)
    } else {
        Sentence(4..10).fake_with_rng(rng)
    }
}

pub fn location<R: Rng + ?Sized>(rng: &mut R) -> String {
    CityName().fake_with_rng(rng)
}

pub fn website<R: Rng + ?Sized>(rng: &mut R, username: &str) -> Option<String> {
    if rng.gen_bool(0.3) {
        Some(format!("https://{}.example.net", username.replace('.', "-")))
    } else {
        None
    }
}

/// Randomly styled avatar URL for a freshly generated profile. Stale-image
/// repair uses the deterministic placeholder instead.
pub fn avatar_url<R: Rng + ?Sized>(rng: &mut R, username: &str) -> String {
    if rng.gen_bool(0.5) {
        format!("https://i.pravatar.cc/300?u={username}")
    } else {
        format!("https://api.dicebear.com/7.x/avataaars/svg?seed={username}")
    }
}

// ============================================================================
// TIME
// ============================================================================

/// Uniformly random instant in `[start, end]`. Returns `start` when the
/// window is empty or inverted.
pub fn datetime_between<R: Rng + ?Sized>(
    rng: &mut R,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> DateTime<Utc> {
    let span = (end - start).num_seconds();
    if span <= 0 {
        return start;
    }
    start + Duration::seconds(rng.gen_range(0..=span))
}

// ============================================================================
// CLUBS
// ============================================================================

#[derive(Debug, Clone)]
pub struct ClubTemplate {
    pub name: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub meeting_frequency: String,
    pub max_members: i64,
    pub is_private: bool,
}

/// Curated clubs seeded before any generated ones.
pub fn club_bank() -> Vec<ClubTemplate> {
    [
        (
            "Classic Literature Society",
            "Diving into the canon, one doorstopper at a time.",
            "Classics",
            "Boston",
            "monthly",
            40,
            false,
        ),
        (
            "Mystery Lovers Club",
            "Whodunits, locked rooms, and unreliable narrators.",
            "Mystery",
            "Chicago",
            "biweekly",
            30,
            false,
        ),
        (
            "Sci-Fi Explorers",
            "First contact, last questions, and everything between.",
            "Science Fiction",
            "Seattle",
            "monthly",
            35,
            false,
        ),
        (
            "Romance Readers Circle",
            "Happily-ever-afters, guaranteed by the genre contract.",
            "Romance",
            "Austin",
            "monthly",
            25,
            false,
        ),
        (
            "Nonfiction Now",
            "History, science, and the occasional contrarian essay.",
            "Nonfiction",
            "Denver",
            "monthly",
            30,
            false,
        ),
        (
            "Fantasy Realm",
            "Maps in the front matter or it doesn't count.",
            "Fantasy",
            "Portland",
            "biweekly",
            35,
            false,
        ),
        (
            "Literary Fiction Forum",
            "Prize longlists, small presses, and big arguments.",
            "Literary Fiction",
            "New York",
            "monthly",
            30,
            false,
        ),
        (
            "Page Turners After Dark",
            "Invite-only thrillers and horror. Lights optional.",
            "Thriller",
            "San Francisco",
            "weekly",
            15,
            true,
        ),
    ]
    .into_iter()
    .map(
        |(name, description, category, location, frequency, max_members, is_private)| {
            ClubTemplate {
                name: name.to_string(),
                description: description.to_string(),
                category: category.to_string(),
                location: location.to_string(),
                meeting_frequency: frequency.to_string(),
                max_members,
                is_private,
            }
        },
    )
    .collect()
}

const CLUB_ADJECTIVES: &[&str] = &[
    "Midnight", "Sunday", "Wandering", "Armchair", "Riverside", "Backyard", "Late Night",
    "First Edition", "Dog-Eared", "Marginalia",
];

const CLUB_NOUNS: &[&str] = &[
    "Book Club", "Readers", "Reading Circle", "Literary Society", "Page Turners", "Bookworms",
    "Chapter House",
];

const CLUB_CATEGORIES: &[&str] = &[
    "General",
    "Classics",
    "Mystery",
    "Science Fiction",
    "Fantasy",
    "Romance",
    "Nonfiction",
    "Literary Fiction",
];

const MEETING_FREQUENCIES: &[&str] = &["weekly", "biweekly", "monthly"];

/// Generated club used once the curated bank runs out.
pub fn generated_club<R: Rng + ?Sized>(rng: &mut R) -> ClubTemplate {
    let adjective = CLUB_ADJECTIVES.choose(rng).unwrap();
    let noun = CLUB_NOUNS.choose(rng).unwrap();
    let category = CLUB_CATEGORIES.choose(rng).unwrap();

    ClubTemplate {
        name: format!("The {adjective} {noun}"),
        description: format!("A {} club for readers who like their {} unhurried.",
            category.to_lowercase(),
            if rng.gen_bool(0.5) { "discussions" } else { "reading" }),
        category: (*category).to_string(),
        location: CityName().fake_with_rng(rng),
        meeting_frequency: (*MEETING_FREQUENCIES.choose(rng).unwrap()).to_string(),
        max_members: rng.gen_range(15..=50),
        is_private: rng.gen_bool(0.2),
    }
}

// ============================================================================
// RATINGS & CONTENT
// ============================================================================

/// Bell-curve rating: Box-Muller normal centered at 3.5 with sigma 0.8,
/// rounded and clamped to 1..=5. Most books land on 3 or 4.
pub fn normal_rating<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
    (3.5 + 0.8 * z).round().clamp(1.0, 5.0) as i64
}

const REVIEW_TITLES_HIGH: &[&str] = &[
    "Couldn't put it down",
    "An instant favorite",
    "Everything I wanted it to be",
    "Read it in two sittings",
];

const REVIEW_TITLES_MID: &[&str] = &[
    "Solid, with reservations",
    "Good, not great",
    "Worth the read",
    "Uneven but interesting",
];

const REVIEW_TITLES_LOW: &[&str] = &[
    "Not for me",
    "Struggled to finish",
    "Expected more",
    "A disappointment",
];

pub fn review_title<R: Rng + ?Sized>(rng: &mut R, rating: i64) -> String {
    let bank = match rating {
        4..=5 => REVIEW_TITLES_HIGH,
        3 => REVIEW_TITLES_MID,
        _ => REVIEW_TITLES_LOW,
    };
    (*bank.choose(rng).unwrap()).to_string()
}

pub fn review_content<R: Rng + ?Sized>(rng: &mut R, rating: i64, book_title: &str) -> String {
    let opener = match rating {
        4..=5 => format!("{book_title} exceeded my expectations."),
        3 => format!("{book_title} was a mixed bag for me."),
        _ => format!("{book_title} never quite came together."),
    };
    let filler: String = Sentence(8..16).fake_with_rng(rng);
    format!("{opener} {filler}")
}

pub fn discussion_title<R: Rng + ?Sized>(
    rng: &mut R,
    kind: DiscussionKind,
    book_title: Option<&str>,
) -> String {
    let book = book_title.unwrap_or("this month's pick");
    match kind {
        DiscussionKind::General => {
            let prompts = [
                format!("What are we reading next after {book}?"),
                "Introduce yourself!".to_string(),
                "Favorite reading spots?".to_string(),
                format!("First impressions of {book}"),
            ];
            prompts.choose(rng).unwrap().clone()
        }
        DiscussionKind::Chapter => {
            format!("Chapter {} discussion: {book}", rng.gen_range(1..=20))
        }
        DiscussionKind::Review => format!("Final thoughts on {book}"),
        DiscussionKind::Meeting => {
            let prompts = [
                "Next meeting: date and venue".to_string(),
                format!("Agenda for our {book} wrap-up"),
                "Scheduling poll for next month".to_string(),
            ];
            prompts.choose(rng).unwrap().clone()
        }
    }
}

pub fn discussion_content<R: Rng + ?Sized>(rng: &mut R, book_title: Option<&str>) -> String {
    let book = book_title.unwrap_or("the book");
    let openers = [
        format!("I just finished {book} and I have thoughts."),
        format!("No spoilers past the halfway mark of {book}, please."),
        format!("Curious what everyone made of the ending of {book}."),
        "Starting this thread so we have somewhere to talk.".to_string(),
    ];
    let opener = openers.choose(rng).unwrap().clone();
    let filler: String = Sentence(6..14).fake_with_rng(rng);
    format!("{opener} {filler}")
}

// Book-specific comment banks keep threads about well-known titles from
// reading like pure lorem ipsum.
const BOOK_COMMENTS: &[(&str, &[&str])] = &[
    (
        "Pride and Prejudice",
        &[
            "Darcy's first proposal is still the most cringeworthy scene in the canon.",
            "Elizabeth's wit holds up two centuries later.",
            "Mr. Collins might be the funniest character Austen ever wrote.",
        ],
    ),
    (
        "Murder on the Orient Express",
        &[
            "Called part of the twist, never the whole thing.",
            "Poirot's little grey cells earn their reputation here.",
            "The snowbound setting does so much work.",
        ],
    ),
    (
        "The Shining",
        &[
            "The topiary animals scared me more than anything in the film.",
            "Jack's unraveling is so gradual you barely notice it start.",
            "Room 217. That's the comment.",
        ],
    ),
    (
        "1984",
        &[
            "The appendix on Newspeak changes how you read the whole book.",
            "Winston's diary entries hit harder every reread.",
            "Doublethink keeps showing up once you have a name for it.",
        ],
    ),
    (
        "Harry Potter and the Philosopher's Stone",
        &[
            "The mirror of Erised chapter is quietly the best in the book.",
            "Rereading as an adult, the pacing is remarkably tight.",
            "Eleven-year-old me wanted that acceptance letter so badly.",
        ],
    ),
];

const GENERIC_COMMENTS: &[&str] = &[
    "Completely agree with this.",
    "Interesting take, though I read that scene differently.",
    "This is why I love this club.",
    "Adding my vote for this one.",
    "I went back and reread that chapter after your post.",
    "Hadn't considered that angle at all.",
    "The middle third dragged for me, but the ending landed.",
    "Audiobook listeners, the narrator makes a real difference here.",
];

pub fn reply_content<R: Rng + ?Sized>(rng: &mut R, book_title: Option<&str>) -> String {
    if let Some(title) = book_title {
        if let Some((_, comments)) = BOOK_COMMENTS.iter().find(|(t, _)| *t == title) {
            // Mix in generic replies so known-book threads are not uniform.
            if rng.gen_bool(0.6) {
                return (*comments.choose(rng).unwrap()).to_string();
            }
        }
    }
    (*GENERIC_COMMENTS.choose(rng).unwrap()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn fixed_seed_replays_identical_population() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);

        for _ in 0..20 {
            assert_eq!(full_name(&mut a), full_name(&mut b));
            assert_eq!(normal_rating(&mut a), normal_rating(&mut b));
        }
    }

    #[test]
    fn ratings_stay_in_range_and_cluster_mid() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts = [0u32; 6];
        for _ in 0..10_000 {
            let rating = normal_rating(&mut rng);
            assert!((1..=5).contains(&rating));
            counts[rating as usize] += 1;
        }
        // 3s and 4s together should dominate a 3.5-centered curve.
        assert!(counts[3] + counts[4] > counts[1] + counts[2] + counts[5]);
    }

    #[test]
    fn datetime_between_respects_bounds() {
        use chrono::TimeZone;
        let mut rng = StdRng::seed_from_u64(3);
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();

        for _ in 0..100 {
            let t = datetime_between(&mut rng, start, end);
            assert!(t >= start && t <= end);
        }
        assert_eq!(datetime_between(&mut rng, end, start), end);
    }

    #[test]
    fn curated_clubs_have_unique_names() {
        let bank = club_bank();
        assert_eq!(bank.len(), 8);
        let mut names: Vec<_> = bank.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn known_books_get_specific_replies() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut saw_specific = false;
        for _ in 0..50 {
            let reply = reply_content(&mut rng, Some("1984"));
            if reply.contains("Newspeak") || reply.contains("Winston") || reply.contains("Doublethink")
            {
                saw_specific = true;
            }
        }
        assert!(saw_specific);
    }
}
