// Model building
// Turns ratings and the catalog into the documents behind both similarity indexes


use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::catalog::Book;
use crate::database::{BookDocument, DocumentMetadata, VectorRecord, VectorStore};
use crate::embeddings::Embedder;
use crate::synthetic::SyntheticRating;
use crate::{RecsError, Result};

/// A document waiting to be embedded, keyed by its store id
pub type PendingDocument = (String, BookDocument);

/// The text one rating contributes to its reader's history
#[inline]
pub fn combined_text(rating: &SyntheticRating) -> String {
    format!(
        "{}{}{}{}",
        rating.user_id, rating.description, rating.title, rating.rating
    )
}

/// Everything one reader rated, in rating order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserHistory {
    pub isbns: Vec<String>,
    pub entries: Vec<String>,
}

impl UserHistory {
    /// The history text that gets embedded for this reader
    #[inline]
    pub fn text(&self) -> String {
        self.entries.join(" ")
    }
}

/// Group ratings by reader, keeping each reader's ratings in input order
#[inline]
pub fn group_histories(ratings: &[SyntheticRating]) -> BTreeMap<u32, UserHistory> {
    let mut histories: BTreeMap<u32, UserHistory> = BTreeMap::new();
    for rating in ratings {
        let history = histories.entry(rating.user_id).or_default();
        history.isbns.push(rating.isbn.clone());
        history.entries.push(combined_text(rating));
    }
    histories
}

/// One document per training reader who rated anything, in `train_users` order
#[inline]
pub fn collaborative_documents(
    train_users: &[u32],
    histories: &BTreeMap<u32, UserHistory>,
) -> Vec<PendingDocument> {
    let documents: Vec<PendingDocument> = train_users
        .iter()
        .filter_map(|user_id| {
            histories.get(user_id).map(|history| {
                (
                    user_id.to_string(),
                    BookDocument::new(history.text(), DocumentMetadata::history(history.isbns.clone())),
                )
            })
        })
        .collect();

    if documents.len() < train_users.len() {
        debug!(
            "Skipped {} training users without ratings",
            train_users.len() - documents.len()
        );
    }
    documents
}

/// One document per catalog book, keyed by isbn
#[inline]
pub fn content_documents(books: &[Book]) -> Vec<PendingDocument> {
    books
        .iter()
        .map(|book| {
            (
                book.isbn.clone(),
                BookDocument::new(
                    book.description.clone(),
                    DocumentMetadata::book(book.isbn.clone(), book.title.clone()),
                ),
            )
        })
        .collect()
}

/// Reader id to history text for every user in `users`
#[inline]
pub fn user_texts(users: &[u32], histories: &BTreeMap<u32, UserHistory>) -> BTreeMap<u32, String> {
    users
        .iter()
        .filter_map(|user_id| histories.get(user_id).map(|h| (*user_id, h.text())))
        .collect()
}

fn progress_bar(label: &str, total: usize) -> ProgressBar {
    if console::user_attended_stderr() {
        ProgressBar::new(total as u64).with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] {msg}")
                .expect("style template is valid"),
        )
        .with_message(format!("Embedding {} documents", label))
    } else {
        ProgressBar::hidden()
    }
}

/// Replace the contents of `store` with `documents`, embedded `batch_size` at a time.
///
/// Returns the number of stored documents.
#[inline]
pub async fn build_index<E: Embedder + ?Sized>(
    store: &mut VectorStore,
    embedder: &E,
    documents: Vec<PendingDocument>,
    batch_size: usize,
    label: &str,
) -> Result<usize> {
    store.reset().await?;
    if documents.is_empty() {
        info!("No {} documents to index", label);
        return Ok(0);
    }

    let bar = progress_bar(label, documents.len());
    let mut stored = 0;

    for chunk in documents.chunks(batch_size.max(1)) {
        let texts: Vec<String> = chunk.iter().map(|(_, doc)| doc.content.clone()).collect();
        let vectors = embedder
            .embed_documents(&texts)
            .map_err(|e| RecsError::Embedding(format!("{:#}", e)))?;

        if vectors.len() != chunk.len() {
            return Err(RecsError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunk.len(),
                vectors.len()
            )));
        }

        let records: Vec<VectorRecord> = chunk
            .iter()
            .zip(vectors)
            .map(|((id, document), vector)| VectorRecord {
                id: id.clone(),
                vector,
                document: document.clone(),
            })
            .collect();

        store.store_batch(records).await?;
        stored += chunk.len();
        bar.inc(chunk.len() as u64);
    }

    bar.finish_and_clear();
    store.optimize().await?;

    info!("Indexed {} {} documents", stored, label);
    Ok(stored)
}
