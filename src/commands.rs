use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use mongodb::bson::{Bson, Document, doc};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::text::strip_stopwords;
use crate::catalog::{
    Book, CachedTranslator, Catalog, build_features, read_catalog, read_raw_catalog, write_catalog,
};
use crate::config::Config;
use crate::config::interactive::{redact_uri, test_http_service};
use crate::database::{FetchOptions, MongoStore, UpdateOptions, VectorStore};
use crate::embeddings::OllamaClient;
use crate::model::{
    build_index, collaborative_documents, content_documents, group_histories, user_texts,
};
use crate::recommend::{Recommendation, Recommender};
use crate::synthetic::{
    SyntheticRating, generate_synthetic_ratings, partition, rng_from_seed, split_users,
};

fn spinner(message: &str) -> ProgressBar {
    if console::user_attended_stderr() {
        let bar = ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
                .expect("style template is valid"),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(std::time::Duration::from_millis(120));
        bar
    } else {
        ProgressBar::hidden()
    }
}

async fn connect_mongo(config: &Config) -> Result<MongoStore> {
    MongoStore::connect(&config.mongo.uri, &config.mongo.database)
        .await
        .with_context(|| format!("Failed to connect to MongoDB at {}", redact_uri(&config.mongo.uri)))
}

async fn fetch_ratings(store: &mut MongoStore, config: &Config) -> Result<Vec<SyntheticRating>> {
    store
        .fetch_documents(
            &config.mongo.ratings_collection,
            FetchOptions::default().projection(doc! { "_id": 0 }),
        )
        .await
        .context("Failed to fetch ratings")
}

async fn fetch_books(store: &mut MongoStore, config: &Config) -> Result<Vec<Book>> {
    store
        .fetch_documents(
            &config.mongo.catalog_collection,
            FetchOptions::default().projection(doc! { "_id": 0 }),
        )
        .await
        .context("Failed to fetch catalog")
}

/// Clean a raw catalog CSV into the book projection
#[inline]
pub fn clean_catalog(
    config: &Config,
    input: &Path,
    output: &Path,
    rows: Option<usize>,
    translate: bool,
) -> Result<()> {
    let raw = read_raw_catalog(input, rows)
        .with_context(|| format!("Failed to read catalog {}", input.display()))?;
    println!("Read {} rows from {}", raw.len(), input.display());

    let mut translator = if translate {
        CachedTranslator::from_config(&config.translation)?
    } else {
        CachedTranslator::new(Box::new(crate::catalog::DisabledTranslator), "en")
    };

    let bar = spinner("Cleaning catalog");
    let records = build_features(raw, &mut translator);
    bar.finish_and_clear();

    let books: Vec<Book> = records.into_iter().map(|r| r.into_book()).collect();
    write_catalog(output, &books)
        .with_context(|| format!("Failed to write catalog {}", output.display()))?;

    println!(
        "{} Wrote {} books to {}",
        style("✓").green(),
        books.len(),
        output.display()
    );
    if translate {
        println!("  Translations cached: {}", translator.cached());
    }
    Ok(())
}

/// Generate synthetic ratings for a cleaned catalog and store both in MongoDB
#[inline]
pub async fn generate_ratings(
    config: &Config,
    catalog_path: &Path,
    rows: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let rows = rows.unwrap_or(config.synthetic.rows);
    let books = read_catalog(catalog_path, Some(rows))
        .with_context(|| format!("Failed to read catalog {}", catalog_path.display()))?;
    if books.is_empty() {
        anyhow::bail!("Catalog {} has no books", catalog_path.display());
    }

    let mut rng = rng_from_seed(seed);
    let ratings = generate_synthetic_ratings(&books, &config.synthetic, &mut rng);

    let mut store = connect_mongo(config).await?;
    let bar = spinner("Inserting ratings and catalog");
    let rating_ids = store
        .insert_many(&config.mongo.ratings_collection, &ratings)
        .await
        .context("Failed to insert ratings")?;
    let book_ids = store
        .insert_many(&config.mongo.catalog_collection, &books)
        .await
        .context("Failed to insert catalog")?;
    bar.finish_and_clear();
    store.close().await;

    println!(
        "{} Inserted {} ratings into '{}' and {} books into '{}'",
        style("✓").green(),
        rating_ids.len(),
        config.mongo.ratings_collection,
        book_ids.len(),
        config.mongo.catalog_collection
    );
    Ok(())
}

/// Translate and strip stop words from every stored catalog description
#[inline]
pub async fn normalize_descriptions(config: &Config) -> Result<()> {
    let mut store = connect_mongo(config).await?;
    let mut translator = CachedTranslator::from_config(&config.translation)?;

    let documents: Vec<Document> = store
        .fetch_documents(
            &config.mongo.catalog_collection,
            FetchOptions::default().projection(doc! { "_id": 1, "description": 1 }),
        )
        .await
        .context("Failed to fetch catalog")?;

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(documents.len() as u64).with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Normalizing descriptions")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };

    let mut updated = 0;
    for document in &documents {
        bar.inc(1);
        let (Some(id), Ok(description)) = (document.get("_id"), document.get_str("description"))
        else {
            continue;
        };
        if description.is_empty() {
            continue;
        }

        let normalized = strip_stopwords(&translator.to_target(description));
        store
            .update_documents(
                &config.mongo.catalog_collection,
                doc! { "_id": id.clone() },
                doc! { "$set": { "description": normalized } },
                UpdateOptions::default(),
            )
            .await
            .context("Failed to update description")?;
        debug!("Updated description for book with _id: {}", id);
        updated += 1;
    }
    bar.finish_and_clear();
    store.close().await;

    println!(
        "{} Normalized {} of {} descriptions",
        style("✓").green(),
        updated,
        documents.len()
    );
    Ok(())
}

/// Build both vector stores from the data in MongoDB
#[inline]
pub async fn build_model(config: &Config, seed: Option<u64>) -> Result<()> {
    let mut store = connect_mongo(config).await?;
    let ratings = fetch_ratings(&mut store, config).await?;
    let books = fetch_books(&mut store, config).await?;
    store.close().await;

    if ratings.is_empty() || books.is_empty() {
        anyhow::bail!("No ratings or books in MongoDB; run 'book-recs generate' first");
    }
    println!("Loaded {} ratings and {} books", ratings.len(), books.len());

    let mut rng = rng_from_seed(seed);
    let split = split_users(
        config.synthetic.num_users,
        config.synthetic.train_fraction,
        &mut rng,
    );
    let (train_ratings, validation_ratings) = partition(ratings, &split);
    info!(
        "{} train ratings, {} validation ratings",
        train_ratings.len(),
        validation_ratings.len()
    );

    let train_histories = group_histories(&train_ratings);
    let collab = collaborative_documents(&split.train, &train_histories);
    let content = content_documents(&books);

    let validation_readers = user_texts(&split.validation, &group_histories(&validation_ratings));

    let embedder = OllamaClient::new(&config.ollama)?;
    embedder
        .health_check()
        .context("Ollama is not ready; check 'book-recs config --show'")?;

    let batch_size = config.ollama.batch_size as usize;
    let dimension = config.ollama.embedding_dimension as usize;

    let mut collab_store = VectorStore::open(&config.collab_store_path(), dimension).await?;
    let collab_count =
        build_index(&mut collab_store, &embedder, collab, batch_size, "collaborative").await?;

    let mut content_store = VectorStore::open(&config.content_store_path(), dimension).await?;
    let content_count =
        build_index(&mut content_store, &embedder, content, batch_size, "content").await?;

    println!("{} Model built", style("✓").green());
    println!(
        "  Users: {} train, {} validation ({} validation readers with histories)",
        split.train.len(),
        split.validation.len(),
        validation_readers.len()
    );
    println!(
        "  Collaborative documents: {} in {}",
        collab_count,
        config.collab_store_path().display()
    );
    println!(
        "  Content documents: {} in {}",
        content_count,
        config.content_store_path().display()
    );
    Ok(())
}

/// Load everything a recommender needs from MongoDB and the vector stores
#[inline]
pub async fn load_recommender(config: &Config) -> Result<Recommender<OllamaClient, VectorStore>> {
    let mut store = connect_mongo(config).await?;
    let ratings = fetch_ratings(&mut store, config).await?;
    let books = fetch_books(&mut store, config).await?;
    store.close().await;

    let dimension = config.ollama.embedding_dimension as usize;
    let collab_store = VectorStore::open(&config.collab_store_path(), dimension).await?;
    let content_store = VectorStore::open(&config.content_store_path(), dimension).await?;
    if collab_store.count().await? == 0 || content_store.count().await? == 0 {
        anyhow::bail!("Vector stores are empty; run 'book-recs build' first");
    }

    let embedder = OllamaClient::new(&config.ollama)?;
    info!(
        "Recommender loaded with {} ratings and {} books",
        ratings.len(),
        books.len()
    );

    Ok(Recommender::new(
        embedder,
        collab_store,
        content_store,
        Catalog::new(books),
        group_histories(&ratings),
        config.recommend.clone(),
    )
    .with_max_user_id(config.synthetic.num_users))
}

fn print_recommendations(heading: &str, recommendations: &[Recommendation]) {
    println!("{}", style(heading).bold());
    if recommendations.is_empty() {
        println!("  No recommendations found.");
        return;
    }
    for (rank, rec) in recommendations.iter().enumerate() {
        println!(
            "  {}. {} {} ({} votes)",
            rank + 1,
            style(&rec.title).cyan(),
            style(format!("by {}", rec.authors)).dim(),
            rec.votes
        );
        println!("     ISBN: {}", rec.isbn);
        if !rec.image_url.is_empty() {
            println!("     Cover: {}", rec.image_url);
        }
    }
}

/// Print collaborative recommendations for one user
#[inline]
pub async fn recommend_for_user(config: &Config, user_id: u32) -> Result<()> {
    let recommender = load_recommender(config).await?;
    let recommendations = recommender.recommend_for_user(user_id).await?;
    print_recommendations(
        &format!("Recommendations for user {}", user_id),
        &recommendations,
    );
    Ok(())
}

/// Print books similar to `title`
#[inline]
pub async fn recommend_similar(config: &Config, title: &str) -> Result<()> {
    let recommender = load_recommender(config).await?;
    let recommendations = recommender.recommend_similar(title).await?;
    print_recommendations(&format!("Books similar to '{}'", title), &recommendations);
    Ok(())
}

/// Run the web UI
#[inline]
pub async fn serve(config: &Config) -> Result<()> {
    let recommender = load_recommender(config).await?;
    crate::server::serve(&config.server, Arc::new(recommender)).await?;
    Ok(())
}

/// Show connectivity and stored document counts
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    println!("📊 Book Recs Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🗄️  MongoDB Status:");
    match connect_mongo(config).await {
        Ok(mut store) => {
            if store.is_alive().await {
                println!(
                    "   ✅ Connected ({} / {})",
                    redact_uri(&config.mongo.uri),
                    config.mongo.database
                );
                for collection in [
                    &config.mongo.ratings_collection,
                    &config.mongo.catalog_collection,
                ] {
                    match store.count_documents(collection, None).await {
                        Ok(count) => println!("   📄 {}: {} documents", collection, count),
                        Err(e) => println!("   ❌ {}: {}", collection, e),
                    }
                }
                match store
                    .fetch_distinct(&config.mongo.ratings_collection, "user_id", None)
                    .await
                {
                    Ok(users) => {
                        let max_user = users
                            .iter()
                            .filter_map(|id| match id {
                                Bson::Int32(v) => Some(i64::from(*v)),
                                Bson::Int64(v) => Some(*v),
                                _ => None,
                            })
                            .max();
                        println!(
                            "   👥 Readers: {} (highest id {})",
                            users.len(),
                            max_user.map_or_else(|| "-".to_string(), |id| id.to_string())
                        );
                    }
                    Err(e) => warn!("Failed to read distinct users: {}", e),
                }
            } else {
                println!("   ❌ Server did not answer a ping");
            }
            store.close().await;
        }
        Err(e) => println!("   ❌ Failed to connect - {:#}", e),
    }

    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Model: {}", config.ollama.model);
            }
            Err(e) => println!("   ⚠️  Connected but unhealthy - {:#}", e),
        },
        Err(e) => println!("   ❌ Failed to connect - {:#}", e),
    }

    println!("🌐 Translation Status:");
    if config.translation.enabled {
        let reachable = config
            .translation_url()
            .ok()
            .and_then(|url| url.join("/languages").ok())
            .is_some_and(|url| test_http_service(url.as_str()));
        if reachable {
            println!("   ✅ Reachable ({}:{})", config.translation.host, config.translation.port);
        } else {
            println!("   ⚠️  Unreachable; descriptions will be kept untranslated");
        }
    } else {
        println!("   💤 Disabled");
    }

    println!("🔍 Vector Stores:");
    let dimension = config.ollama.embedding_dimension as usize;
    for (label, path) in [
        ("Collaborative", config.collab_store_path()),
        ("Content", config.content_store_path()),
    ] {
        if !path.exists() {
            println!("   📭 {}: not built yet", label);
            continue;
        }
        let store = match VectorStore::open(&path, dimension).await {
            Ok(store) => store,
            Err(e) => {
                println!("   ❌ {}: {}", label, e);
                continue;
            }
        };
        if !store.validate_integrity().await {
            println!("   ⚠️  {}: failed integrity check", label);
            continue;
        }
        match store.count().await {
            Ok(count) => println!(
                "   ✅ {}: {} documents ({} dimensions)",
                label,
                count,
                store.vector_dimension()
            ),
            Err(e) => println!("   ❌ {}: {}", label, e),
        }
    }

    println!();
    println!("💡 Next Steps:");
    println!("   • 'book-recs clean <raw.csv> <clean.csv>' to prepare a catalog");
    println!("   • 'book-recs generate <clean.csv>' to load ratings into MongoDB");
    println!("   • 'book-recs build' then 'book-recs serve' to start the web UI");

    Ok(())
}
