// Database module
// MongoDB holds the catalog and ratings, LanceDB holds the two similarity indexes

pub mod lancedb;
pub mod mongo;

pub use self::lancedb::{
    BookDocument, DocumentIndex, DocumentMetadata, SearchResult, VectorRecord, VectorStore,
};
pub use self::mongo::{
    FetchOptions, MongoConnection, MongoStore, Reconnect, Sort, SortOrder, UpdateOptions,
};
