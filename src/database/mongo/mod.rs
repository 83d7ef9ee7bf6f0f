// MongoDB access layer
// CRUD helpers over named collections, each guarded by a liveness check and a single reconnect


pub mod connection;

use futures::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::{Bson, Document, doc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{RecsError, Result};
pub use connection::{MongoConnection, Reconnect, ensure_connected};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Sort on a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    #[inline]
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Ascending,
        }
    }

    #[inline]
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Descending,
        }
    }

    #[inline]
    pub fn to_document(&self) -> Document {
        let direction = match self.order {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        };
        doc! { self.field.as_str(): direction }
    }
}

/// Optional query modifiers for [`MongoStore::fetch_documents`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    pub filter: Option<Document>,
    pub projection: Option<Document>,
    pub sort: Option<Sort>,
    pub limit: Option<i64>,
}

impl FetchOptions {
    #[inline]
    pub fn filter(mut self, filter: Document) -> Self {
        self.filter = Some(filter);
        self
    }

    #[inline]
    pub fn projection(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }

    #[inline]
    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Limit the number of returned documents; zero means no limit
    #[inline]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Insert a new document when nothing matches
    pub upsert: bool,
    /// Update every match instead of the first one
    pub many: bool,
}

/// CRUD wrapper that owns the process's MongoDB connection
pub struct MongoStore {
    connection: MongoConnection,
}

fn database_error(operation: &str, collection: &str, error: impl std::fmt::Display) -> RecsError {
    RecsError::Database(format!(
        "Failed to {} in collection '{}': {}",
        operation, collection, error
    ))
}

impl MongoStore {
    #[inline]
    pub fn new(connection: MongoConnection) -> Self {
        Self { connection }
    }

    #[inline]
    pub async fn connect(uri: &str, database_name: &str) -> Result<Self> {
        Ok(Self::new(MongoConnection::connect(uri, database_name).await?))
    }

    #[inline]
    pub fn connection(&self) -> &MongoConnection {
        &self.connection
    }

    /// Whether the server currently answers a ping
    #[inline]
    pub async fn is_alive(&self) -> bool {
        self.connection.check_connection().await
    }

    async fn collection<T: Send + Sync>(&mut self, name: &str) -> Result<Collection<T>> {
        if ensure_connected(&mut self.connection).await? {
            debug!("Reconnected before accessing collection {}", name);
        }
        Ok(self.connection.database()?.collection::<T>(name))
    }

    /// Insert a single document and return its id
    #[inline]
    pub async fn insert_one<T>(&mut self, collection_name: &str, document: &T) -> Result<Bson>
    where
        T: Serialize + Send + Sync,
    {
        let collection = self.collection::<T>(collection_name).await?;
        let result = collection
            .insert_one(document)
            .await
            .map_err(|e| database_error("insert document", collection_name, e))?;
        Ok(result.inserted_id)
    }

    /// Insert many documents and return their ids in input order
    #[inline]
    pub async fn insert_many<T>(&mut self, collection_name: &str, documents: &[T]) -> Result<Vec<Bson>>
    where
        T: Serialize + Send + Sync,
    {
        if documents.is_empty() {
            debug!("No documents to insert into {}", collection_name);
            return Ok(Vec::new());
        }

        let collection = self.collection::<T>(collection_name).await?;
        let result = collection
            .insert_many(documents)
            .await
            .map_err(|e| database_error("insert documents", collection_name, e))?;

        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);

        debug!("Inserted {} documents into {}", ids.len(), collection_name);
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    /// Fetch every document matching `options`
    #[inline]
    pub async fn fetch_documents<T>(
        &mut self,
        collection_name: &str,
        options: FetchOptions,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + Sync + Unpin,
    {
        let collection = self.collection::<T>(collection_name).await?;

        let mut find = collection.find(options.filter.unwrap_or_default());
        if let Some(projection) = options.projection {
            find = find.projection(projection);
        }
        if let Some(sort) = options.sort {
            find = find.sort(sort.to_document());
        }
        if let Some(limit) = options.limit {
            find = find.limit(limit);
        }

        let cursor = find
            .await
            .map_err(|e| database_error("query documents", collection_name, e))?;
        let documents: Vec<T> = cursor
            .try_collect()
            .await
            .map_err(|e| database_error("read documents", collection_name, e))?;

        debug!(
            "Fetched {} documents from {}",
            documents.len(),
            collection_name
        );
        Ok(documents)
    }

    /// Fetch the first document matching `filter`, honouring an optional sort
    #[inline]
    pub async fn fetch_one<T>(
        &mut self,
        collection_name: &str,
        filter: Document,
        projection: Option<Document>,
        sort: Option<Sort>,
    ) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + Sync + Unpin,
    {
        let collection = self.collection::<T>(collection_name).await?;

        let mut find_one = collection.find_one(filter);
        if let Some(projection) = projection {
            find_one = find_one.projection(projection);
        }
        if let Some(sort) = sort {
            find_one = find_one.sort(sort.to_document());
        }

        find_one
            .await
            .map_err(|e| database_error("query document", collection_name, e))
    }

    /// Distinct values of `key`, optionally restricted by `filter`
    #[inline]
    pub async fn fetch_distinct(
        &mut self,
        collection_name: &str,
        key: &str,
        filter: Option<Document>,
    ) -> Result<Vec<Bson>> {
        let collection = self.collection::<Document>(collection_name).await?;
        collection
            .distinct(key, filter.unwrap_or_default())
            .await
            .map_err(|e| database_error("read distinct values", collection_name, e))
    }

    /// Apply `update` to the documents matching `filter`
    #[inline]
    pub async fn update_documents(
        &mut self,
        collection_name: &str,
        filter: Document,
        update: Document,
        options: UpdateOptions,
    ) -> Result<bool> {
        let collection = self.collection::<Document>(collection_name).await?;

        let result = if options.many {
            collection
                .update_many(filter, update)
                .upsert(options.upsert)
                .await
        } else {
            collection
                .update_one(filter, update)
                .upsert(options.upsert)
                .await
        }
        .map_err(|e| database_error("update documents", collection_name, e))?;

        debug!(
            "Matched {} and modified {} documents in {}",
            result.matched_count, result.modified_count, collection_name
        );
        Ok(true)
    }

    /// Count documents matching `filter`, or the whole collection
    #[inline]
    pub async fn count_documents(
        &mut self,
        collection_name: &str,
        filter: Option<Document>,
    ) -> Result<u64> {
        let collection = self.collection::<Document>(collection_name).await?;
        collection
            .count_documents(filter.unwrap_or_default())
            .await
            .map_err(|e| database_error("count documents", collection_name, e))
    }

    /// Remove every document from a collection
    #[inline]
    pub async fn clear_collection(&mut self, collection_name: &str) -> Result<u64> {
        let collection = self.collection::<Document>(collection_name).await?;
        let result = collection
            .delete_many(doc! {})
            .await
            .map_err(|e| database_error("clear", collection_name, e))?;
        Ok(result.deleted_count)
    }

    #[inline]
    pub async fn close(mut self) {
        self.connection.close_connection().await;
    }
}
