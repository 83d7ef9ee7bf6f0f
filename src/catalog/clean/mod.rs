
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::translate::{CachedTranslator, UNKNOWN_LANGUAGE};
use super::{Book, RawBook};

/// A catalog row with every column coerced to its final type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub isbn: String,
    pub title: String,
    pub description: String,
    pub average_rating: f64,
    pub image_url: String,
    pub authors: String,
    pub language_code: String,
    /// Language detected from the (translated) description
    pub language_code_new: String,
    pub book_id: i64,
    pub publication_year: i64,
    pub publication_month: i64,
    pub ratings_count: i64,
    pub country_code: String,
    pub num_pages: f64,
    pub publisher: String,
    pub text_reviews_count: i64,
}

impl CatalogRecord {
    #[inline]
    pub fn into_book(self) -> Book {
        Book {
            isbn: self.isbn,
            title: self.title,
            description: self.description,
            average_rating: self.average_rating,
            image_url: self.image_url,
            authors: self.authors,
            language_code: self.language_code,
        }
    }
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_number(value: Option<&String>) -> Option<f64> {
    present(value).and_then(|v| v.parse::<f64>().ok())
}

/// Integer column: missing or unparsable values become 0, fractions are truncated
fn integer_or_zero(value: Option<&String>) -> i64 {
    parse_number(value).map_or(0, |v| v.trunc() as i64)
}

fn text_or_unknown(value: Option<&String>) -> String {
    present(value).unwrap_or(UNKNOWN_LANGUAGE).to_string()
}

fn text_or_empty(value: Option<&String>) -> String {
    present(value).unwrap_or_default().to_string()
}

/// Median of the parseable values, 0 when there are none
pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        f64::midpoint(sorted[mid - 1], sorted[mid])
    } else {
        sorted[mid]
    }
}

/// Clean raw catalog rows.
///
/// Exact duplicate rows are dropped first. Descriptions are translated and their
/// language detected, columns are coerced with defaults, and finally duplicates
/// by isbn and then by title are dropped keeping the first occurrence.
#[inline]
pub fn build_features(rows: Vec<RawBook>, translator: &mut CachedTranslator) -> Vec<CatalogRecord> {
    let total = rows.len();
    let rows: Vec<RawBook> = rows.into_iter().unique().collect();
    debug!("Dropped {} exact duplicate rows", total - rows.len());

    let (rows, missing): (Vec<RawBook>, Vec<RawBook>) = rows
        .into_iter()
        .partition(|row| present(row.isbn.as_ref()).is_some());
    if !missing.is_empty() {
        warn!("Dropped {} rows without an isbn", missing.len());
    }

    let page_counts: Vec<f64> = rows
        .iter()
        .filter_map(|row| parse_number(row.num_pages.as_ref()))
        .collect();
    let median_pages = median(&page_counts);

    let records: Vec<CatalogRecord> = rows
        .iter()
        .map(|row| {
            let description = translator.to_target(&text_or_empty(row.description.as_ref()));
            let language_code_new = translator.detect_language(&description);

            CatalogRecord {
                isbn: text_or_empty(row.isbn.as_ref()),
                title: text_or_empty(row.title.as_ref()),
                average_rating: parse_number(row.average_rating.as_ref()).unwrap_or(0.0),
                image_url: text_or_empty(row.image_url.as_ref()),
                authors: text_or_empty(row.authors.as_ref()),
                language_code: text_or_unknown(row.language_code.as_ref()),
                language_code_new,
                book_id: integer_or_zero(row.book_id.as_ref()),
                publication_year: integer_or_zero(row.publication_year.as_ref()),
                publication_month: integer_or_zero(row.publication_month.as_ref()),
                ratings_count: integer_or_zero(row.ratings_count.as_ref()),
                country_code: text_or_unknown(row.country_code.as_ref()),
                num_pages: parse_number(row.num_pages.as_ref()).unwrap_or(median_pages),
                publisher: text_or_unknown(row.publisher.as_ref()),
                text_reviews_count: integer_or_zero(row.text_reviews_count.as_ref()),
                description,
            }
        })
        .collect();

    let records = drop_duplicates_by(records, |r| r.isbn.clone());
    let records = drop_duplicates_by(records, |r| r.title.clone());

    info!(
        "Cleaned {} rows into {} books ({} translations cached)",
        total,
        records.len(),
        translator.cached()
    );
    records
}

/// Keep the first record for every key
pub(crate) fn drop_duplicates_by<T, F>(records: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> String,
{
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(key(record)))
        .collect()
}
