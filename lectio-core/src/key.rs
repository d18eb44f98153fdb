//! Chapter identity and cached chapter content

use crate::error::ParseError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one chapter of one translation.
///
/// Equality and hashing are structural over all three fields, so the same
/// chapter in two versions is two distinct cache entries.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChapterKey {
    /// Book name as it appears in the catalog (e.g. "1 Corinthians")
    pub book: String,
    /// 1-based chapter number
    pub chapter: u32,
    /// Translation identifier (an API.Bible bible id)
    pub version: String,
}

impl ChapterKey {
    pub fn new(book: impl Into<String>, chapter: u32, version: impl Into<String>) -> Self {
        Self {
            book: book.into(),
            chapter,
            version: version.into(),
        }
    }

    /// Same version, different position.
    pub fn with_position(&self, book: impl Into<String>, chapter: u32) -> Self {
        Self {
            book: book.into(),
            chapter,
            version: self.version.clone(),
        }
    }
}

impl fmt::Display for ChapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.book, self.chapter, self.version)
    }
}

/// A single numbered verse.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub number: u32,
    pub text: String,
}

impl Verse {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// A parsed chapter as stored in the cache.
///
/// Never mutated after construction; the cache hands out `Arc<CachedChapter>`
/// so readers share the stored value without being able to change it.
///
/// Verses are non-empty, positively numbered and strictly ascending.
/// Deserialization goes through the same checks as [`CachedChapter::new`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ChapterParts")]
pub struct CachedChapter {
    key: ChapterKey,
    verses: Vec<Verse>,
    fetched_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ChapterParts {
    key: ChapterKey,
    verses: Vec<Verse>,
    fetched_at: DateTime<Utc>,
}

impl TryFrom<ChapterParts> for CachedChapter {
    type Error = ParseError;

    fn try_from(parts: ChapterParts) -> Result<Self, ParseError> {
        CachedChapter::new(parts.key, parts.verses, parts.fetched_at)
    }
}

impl CachedChapter {
    /// Validate and build a chapter.
    ///
    /// Rejects an empty list, verse number 0, and numbers that repeat or
    /// go backwards; `verse()` relies on the ordering.
    pub fn new(
        key: ChapterKey,
        verses: Vec<Verse>,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, ParseError> {
        if verses.is_empty() {
            return Err(ParseError::new(format!("no verses found in {key}")));
        }
        if let Some(v) = verses.iter().find(|v| v.number == 0) {
            return Err(ParseError::new(format!("verse number 0 in {key}: {:?}", v.text)));
        }
        if let Some(pair) = verses.windows(2).find(|w| w[0].number >= w[1].number) {
            return Err(ParseError::new(format!(
                "verses out of order in {key}: {} then {}",
                pair[0].number, pair[1].number
            )));
        }
        Ok(Self {
            key,
            verses,
            fetched_at,
        })
    }

    pub fn key(&self) -> &ChapterKey {
        &self.key
    }

    pub fn verses(&self) -> &[Verse] {
        &self.verses
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn verse(&self, number: u32) -> Option<&Verse> {
        self.verses
            .binary_search_by_key(&number, |v| v.number)
            .ok()
            .map(|idx| &self.verses[idx])
    }

    pub fn len(&self) -> usize {
        self.verses.len()
    }

    /// Always false for a constructed chapter; provided alongside `len`.
    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }
}
