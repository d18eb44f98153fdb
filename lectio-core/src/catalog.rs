//! Ordered book catalog and wraparound chapter navigation
//!
//! The catalog is the only input to next/previous computation. Treating the
//! whole book/chapter sequence as a ring means every position has exactly
//! one successor and one predecessor:
//!
//! ```text
//! Genesis 1 → … → Genesis 50 → Exodus 1 → … → Revelation 22 ─┐
//!     ▲                                                      │
//!     └──────────────────────────────────────────────────────┘
//! ```

use crate::canon::CANON;
use crate::error::CatalogError;
use crate::key::ChapterKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Testament section of a book
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Testament {
    #[serde(rename = "OT")]
    Old,
    #[serde(rename = "NT")]
    New,
}

/// One catalog entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookEntry {
    pub name: String,
    #[serde(rename = "chapters")]
    pub chapter_count: u32,
    #[serde(rename = "section")]
    pub testament: Testament,
}

impl BookEntry {
    pub fn new(name: impl Into<String>, chapter_count: u32, testament: Testament) -> Self {
        Self {
            name: name.into(),
            chapter_count,
            testament,
        }
    }
}

/// Immutable, validated, ordered list of books.
#[derive(Clone, Debug)]
pub struct BookCatalog {
    books: Vec<BookEntry>,
    index: HashMap<String, usize>,
}

impl BookCatalog {
    /// Build a catalog. Rejects empty catalogs, zero-chapter books and
    /// duplicate names.
    pub fn new(books: Vec<BookEntry>) -> Result<Self, CatalogError> {
        if books.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut index = HashMap::with_capacity(books.len());
        for (pos, book) in books.iter().enumerate() {
            if book.chapter_count == 0 {
                return Err(CatalogError::ZeroChapters {
                    book: book.name.clone(),
                });
            }
            if index.insert(book.name.clone(), pos).is_some() {
                return Err(CatalogError::DuplicateBook {
                    book: book.name.clone(),
                });
            }
        }

        Ok(Self { books, index })
    }

    /// The 66-book canon in canonical order.
    pub fn standard() -> Self {
        let books = CANON
            .iter()
            .map(|b| BookEntry::new(b.name, b.chapters, b.testament))
            .collect::<Vec<_>>();
        let index = books
            .iter()
            .enumerate()
            .map(|(pos, b)| (b.name.clone(), pos))
            .collect();
        Self { books, index }
    }

    /// Load from a JSON array of `{ "name", "chapters", "section" }` objects.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let books: Vec<BookEntry> = serde_json::from_str(json)?;
        Self::new(books)
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BookEntry> {
        self.books.iter()
    }

    pub fn first(&self) -> &BookEntry {
        // Non-empty by construction.
        &self.books[0]
    }

    pub fn last(&self) -> &BookEntry {
        &self.books[self.books.len() - 1]
    }

    pub fn position(&self, book: &str) -> Option<usize> {
        self.index.get(book).copied()
    }

    pub fn get(&self, book: &str) -> Option<&BookEntry> {
        self.position(book).map(|pos| &self.books[pos])
    }

    pub fn chapter_count(&self, book: &str) -> Option<u32> {
        self.get(book).map(|b| b.chapter_count)
    }

    pub fn books_in(&self, testament: Testament) -> impl Iterator<Item = &BookEntry> {
        self.books.iter().filter(move |b| b.testament == testament)
    }

    pub fn total_chapters(&self) -> u64 {
        self.books.iter().map(|b| u64::from(b.chapter_count)).sum()
    }

    fn locate(&self, book: &str, chapter: u32) -> Option<usize> {
        let pos = self.position(book)?;
        let count = self.books[pos].chapter_count;
        (1..=count).contains(&chapter).then_some(pos)
    }

    /// Position after `(book, chapter)`, wrapping from the last chapter of
    /// the last book to chapter 1 of the first.
    ///
    /// `None` if the book is unknown or the chapter is out of range.
    pub fn next(&self, book: &str, chapter: u32) -> Option<(&str, u32)> {
        let pos = self.locate(book, chapter)?;
        let entry = &self.books[pos];
        if chapter < entry.chapter_count {
            return Some((entry.name.as_str(), chapter + 1));
        }
        let next = self.books.get(pos + 1).unwrap_or_else(|| self.first());
        Some((next.name.as_str(), 1))
    }

    /// Position before `(book, chapter)`, wrapping from chapter 1 of the
    /// first book to the last chapter of the last.
    pub fn previous(&self, book: &str, chapter: u32) -> Option<(&str, u32)> {
        let pos = self.locate(book, chapter)?;
        let entry = &self.books[pos];
        if chapter > 1 {
            return Some((entry.name.as_str(), chapter - 1));
        }
        let prev = match pos {
            0 => self.last(),
            _ => &self.books[pos - 1],
        };
        Some((prev.name.as_str(), prev.chapter_count))
    }

    /// [`next`](Self::next) for a key, keeping its version.
    pub fn next_key(&self, key: &ChapterKey) -> Option<ChapterKey> {
        self.next(&key.book, key.chapter)
            .map(|(book, chapter)| key.with_position(book, chapter))
    }

    /// [`previous`](Self::previous) for a key, keeping its version.
    pub fn previous_key(&self, key: &ChapterKey) -> Option<ChapterKey> {
        self.previous(&key.book, key.chapter)
            .map(|(book, chapter)| key.with_position(book, chapter))
    }
}

impl Default for BookCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> BookCatalog {
        BookCatalog::new(vec![
            BookEntry::new("Ruth", 4, Testament::Old),
            BookEntry::new("Obadiah", 1, Testament::Old),
            BookEntry::new("Jude", 1, Testament::New),
        ])
        .unwrap()
    }

    #[test]
    fn test_standard_wraparound() {
        let catalog = BookCatalog::standard();
        assert_eq!(catalog.previous("Genesis", 1), Some(("Revelation", 22)));
        assert_eq!(catalog.next("Revelation", 22), Some(("Genesis", 1)));
        assert_eq!(catalog.next("Genesis", 50), Some(("Exodus", 1)));
        assert_eq!(catalog.previous("Exodus", 1), Some(("Genesis", 50)));
    }

    #[test]
    fn test_within_book() {
        let catalog = BookCatalog::standard();
        assert_eq!(catalog.next("Psalms", 118), Some(("Psalms", 119)));
        assert_eq!(catalog.previous("Psalms", 119), Some(("Psalms", 118)));
    }

    #[test]
    fn test_single_chapter_books() {
        let catalog = small();
        assert_eq!(catalog.next("Ruth", 4), Some(("Obadiah", 1)));
        assert_eq!(catalog.next("Obadiah", 1), Some(("Jude", 1)));
        assert_eq!(catalog.previous("Jude", 1), Some(("Obadiah", 1)));
        assert_eq!(catalog.previous("Ruth", 1), Some(("Jude", 1)));
        assert_eq!(catalog.next("Jude", 1), Some(("Ruth", 1)));
    }

    #[test]
    fn test_single_book_single_chapter_is_self_loop() {
        let catalog = BookCatalog::new(vec![BookEntry::new("Philemon", 1, Testament::New)]).unwrap();
        assert_eq!(catalog.next("Philemon", 1), Some(("Philemon", 1)));
        assert_eq!(catalog.previous("Philemon", 1), Some(("Philemon", 1)));
    }

    #[test]
    fn test_unknown_positions() {
        let catalog = BookCatalog::standard();
        assert_eq!(catalog.next("Tobit", 1), None);
        assert_eq!(catalog.next("Genesis", 0), None);
        assert_eq!(catalog.next("Genesis", 51), None);
        assert_eq!(catalog.previous("Jude", 2), None);
    }

    #[test]
    fn test_keys_keep_version() {
        let catalog = BookCatalog::standard();
        let key = ChapterKey::new("Malachi", 4, "KJV");
        assert_eq!(
            catalog.next_key(&key),
            Some(ChapterKey::new("Matthew", 1, "KJV"))
        );
        assert_eq!(
            catalog.previous_key(&key),
            Some(ChapterKey::new("Malachi", 3, "KJV"))
        );
    }

    #[test]
    fn test_validation() {
        assert_eq!(BookCatalog::new(vec![]).unwrap_err(), CatalogError::Empty);
        assert_eq!(
            BookCatalog::new(vec![BookEntry::new("Esther", 0, Testament::Old)]).unwrap_err(),
            CatalogError::ZeroChapters {
                book: "Esther".to_string()
            }
        );
        assert_eq!(
            BookCatalog::new(vec![
                BookEntry::new("Mark", 16, Testament::New),
                BookEntry::new("Mark", 16, Testament::New),
            ])
            .unwrap_err(),
            CatalogError::DuplicateBook {
                book: "Mark".to_string()
            }
        );
    }

    #[test]
    fn test_from_json() {
        let catalog = BookCatalog::from_json(
            r#"[
                { "name": "Matthew", "chapters": 28, "section": "NT" },
                { "name": "Mark", "chapters": 16, "section": "NT" }
            ]"#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.chapter_count("Mark"), Some(16));
        assert_eq!(catalog.last().testament, Testament::New);

        assert!(matches!(
            BookCatalog::from_json("{ not json"),
            Err(CatalogError::Json(_))
        ));
    }

    #[test]
    fn test_standard_queries() {
        let catalog = BookCatalog::standard();
        assert_eq!(catalog.len(), 66);
        assert_eq!(catalog.first().name, "Genesis");
        assert_eq!(catalog.last().name, "Revelation");
        assert_eq!(catalog.position("Matthew"), Some(39));
        assert_eq!(catalog.books_in(Testament::New).count(), 27);
        assert_eq!(catalog.total_chapters(), 1189);
    }
}
