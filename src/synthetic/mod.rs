// Synthetic reader data
// Simulated ratings for each catalog book and the train/validation user split


use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, StandardNormal};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::catalog::Book;

/// Highest rating a reader can give
pub const MAX_RATING: i32 = 5;
/// Upper bound on the readers drawn for a single book
pub const MAX_READERS_PER_BOOK: f64 = 10_000.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Reader ids are drawn from `1..=num_users`
    pub num_users: u32,
    /// Mean readers per book
    pub mean_readers: f64,
    /// Standard deviation of readers per book
    pub std_readers: f64,
    /// Share of users placed in the training split
    pub train_fraction: f64,
    /// Catalog rows used by `generate`
    pub rows: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            num_users: 500,
            mean_readers: 50.0,
            std_readers: 6.5,
            train_fraction: 0.9,
            rows: 2000,
        }
    }
}

/// One simulated reader rating, denormalised with the book fields the model needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticRating {
    pub user_id: u32,
    pub isbn: String,
    pub title: String,
    pub rating: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
}

/// Users partitioned for model building
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSplit {
    pub train: Vec<u32>,
    pub validation: Vec<u32>,
}

/// A seeded generator when `seed` is given, otherwise one seeded from the OS
#[inline]
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

/// Number of readers for one book: `trunc(mean + std * z)` within `0..=MAX_READERS_PER_BOOK`
#[inline]
pub fn sample_reader_count<R: Rng + ?Sized>(config: &SyntheticConfig, rng: &mut R) -> usize {
    let z: f64 = rng.sample(StandardNormal);
    let readers = config.std_readers.mul_add(z, config.mean_readers).trunc();
    if readers > 0.0 {
        readers.min(MAX_READERS_PER_BOOK) as usize
    } else {
        0
    }
}

/// A rating around the book's average; the spread shrinks as the average approaches 5
#[inline]
pub fn sample_rating<R: Rng + ?Sized>(average_rating: f64, rng: &mut R) -> i32 {
    let scale = (f64::from(MAX_RATING) - average_rating) / 3.0;
    let drawn = if scale > 0.0 {
        Normal::new(average_rating, scale).map_or(average_rating, |normal| normal.sample(rng))
    } else {
        average_rating
    };

    if drawn.is_finite() {
        (drawn.trunc() as i32).clamp(0, MAX_RATING)
    } else {
        0
    }
}

/// Simulate readers for every book.
///
/// Reader ids are drawn uniformly with replacement, so a reader can rate the
/// same book more than once.
#[inline]
pub fn generate_synthetic_ratings<R: Rng + ?Sized>(
    books: &[Book],
    config: &SyntheticConfig,
    rng: &mut R,
) -> Vec<SyntheticRating> {
    if config.num_users == 0 {
        warn!("No readers to draw from; generated no ratings");
        return Vec::new();
    }

    let mut ratings = Vec::new();
    for book in books {
        let readers = sample_reader_count(config, rng);
        for _ in 0..readers {
            let user_id = rng.gen_range(1..=config.num_users);
            ratings.push(SyntheticRating {
                user_id,
                isbn: book.isbn.clone(),
                title: book.title.clone(),
                rating: sample_rating(book.average_rating, rng),
                description: book.description.clone(),
                image_url: book.image_url.clone(),
            });
        }
    }

    info!(
        "Generated {} synthetic ratings for {} books",
        ratings.len(),
        books.len()
    );
    ratings
}

/// Shuffle `1..=num_users` and put the first `round(train_fraction * num_users)` in training
#[inline]
pub fn split_users<R: Rng + ?Sized>(num_users: u32, train_fraction: f64, rng: &mut R) -> UserSplit {
    let mut users: Vec<u32> = (1..=num_users).collect();
    users.shuffle(rng);

    let train_len = (train_fraction * f64::from(num_users)).round() as usize;
    let validation = users.split_off(train_len.min(users.len()));

    debug!(
        "Split {} users into {} train and {} validation",
        num_users,
        users.len(),
        validation.len()
    );
    UserSplit {
        train: users,
        validation,
    }
}

/// Split ratings into (train, validation); anyone not in training counts as validation
#[inline]
pub fn partition(
    ratings: Vec<SyntheticRating>,
    split: &UserSplit,
) -> (Vec<SyntheticRating>, Vec<SyntheticRating>) {
    let train: HashSet<u32> = split.train.iter().copied().collect();
    ratings
        .into_iter()
        .partition(|rating| train.contains(&rating.user_id))
}
