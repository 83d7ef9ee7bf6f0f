use book_recs::catalog::Book;
use book_recs::catalog::text::strip_stopwords;
use book_recs::synthetic::{SyntheticConfig, generate_synthetic_ratings, rng_from_seed};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn catalog(size: usize) -> Vec<Book> {
    (0..size)
        .map(|i| Book {
            isbn: format!("{:010}", i),
            title: format!("Book number {}", i),
            description: "A sweeping tale of the sea, of the men who sail it and the whale they hunt"
                .to_string(),
            average_rating: 3.0 + (i % 20) as f64 / 10.0,
            image_url: format!("https://images.example.com/{}.jpg", i),
            authors: "Herman Melville".to_string(),
            language_code: "eng".to_string(),
        })
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let books = catalog(2000);
    let config = SyntheticConfig::default();
    c.bench_function("synthetic_ratings", |b| {
        b.iter(|| {
            let mut rng = rng_from_seed(Some(7));
            generate_synthetic_ratings(black_box(&books), black_box(&config), &mut rng)
        })
    });

    let description = books[0].description.repeat(20);
    c.bench_function("strip_stopwords", |b| {
        b.iter(|| strip_stopwords(black_box(&description)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
