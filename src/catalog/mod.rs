// Book catalog
// Catalog rows as read from CSV, the cleaned book projection, and lookups over it


pub mod clean;
pub mod text;
pub mod translate;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::Result;
pub use clean::{CatalogRecord, build_features};
pub use translate::{CachedTranslator, DisabledTranslator, Translate, TranslationClient};

/// A cleaned catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub isbn: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default, alias = "new_image_url")]
    pub image_url: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub language_code: String,
}

/// A catalog row before cleaning; every column may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RawBook {
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub average_rating: Option<String>,
    #[serde(alias = "new_image_url")]
    pub image_url: Option<String>,
    pub authors: Option<String>,
    pub book_id: Option<String>,
    pub publication_year: Option<String>,
    pub publication_month: Option<String>,
    pub ratings_count: Option<String>,
    pub language_code: Option<String>,
    pub country_code: Option<String>,
    pub num_pages: Option<String>,
    pub publisher: Option<String>,
    pub text_reviews_count: Option<String>,
}

/// Read raw rows from a catalog CSV, keeping at most `rows` of them
#[inline]
pub fn read_raw_catalog(path: &Path, rows: Option<usize>) -> Result<Vec<RawBook>> {
    let mut reader = csv::Reader::from_path(path)?;
    let limit = rows.unwrap_or(usize::MAX);

    let records = reader
        .deserialize()
        .take(limit)
        .collect::<std::result::Result<Vec<RawBook>, _>>()?;

    debug!("Read {} raw rows from {}", records.len(), path.display());
    Ok(records)
}

/// Read a cleaned catalog CSV, keeping at most `rows` books
#[inline]
pub fn read_catalog(path: &Path, rows: Option<usize>) -> Result<Vec<Book>> {
    let mut reader = csv::Reader::from_path(path)?;
    let limit = rows.unwrap_or(usize::MAX);

    let books = reader
        .deserialize()
        .take(limit)
        .collect::<std::result::Result<Vec<Book>, _>>()?;

    debug!("Read {} books from {}", books.len(), path.display());
    Ok(books)
}

#[inline]
pub fn write_catalog(path: &Path, books: &[Book]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for book in books {
        writer.serialize(book)?;
    }
    writer.flush()?;

    debug!("Wrote {} books to {}", books.len(), path.display());
    Ok(())
}

/// Books indexed by isbn, in catalog order
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    books: Vec<Book>,
    by_isbn: HashMap<String, usize>,
}

impl Catalog {
    /// Index `books`; with duplicate isbns the first row wins
    #[inline]
    pub fn new(books: Vec<Book>) -> Self {
        let mut by_isbn = HashMap::with_capacity(books.len());
        for (index, book) in books.iter().enumerate() {
            by_isbn.entry(book.isbn.clone()).or_insert(index);
        }
        Self { books, by_isbn }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.books.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    #[inline]
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    #[inline]
    pub fn by_isbn(&self, isbn: &str) -> Option<&Book> {
        self.by_isbn.get(isbn).map(|&index| &self.books[index])
    }

    /// Find a book by title.
    ///
    /// Tries an exact match, then the first case-insensitive substring match,
    /// then the first book whose simplified title contains the simplified query.
    #[inline]
    pub fn find_by_title(&self, title: &str) -> Option<&Book> {
        if let Some(book) = self.books.iter().find(|b| b.title == title) {
            return Some(book);
        }

        let lowered = title.to_lowercase();
        if lowered.trim().is_empty() {
            return None;
        }
        if let Some(book) = self
            .books
            .iter()
            .find(|b| b.title.to_lowercase().contains(&lowered))
        {
            return Some(book);
        }

        let query = text::simplify_title(title);
        if query.is_empty() {
            return None;
        }
        self.books
            .iter()
            .find(|b| text::simplify_title(&b.title).contains(&query))
    }
}
