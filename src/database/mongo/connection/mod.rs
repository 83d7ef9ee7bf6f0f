#[cfg(test)]
mod tests;

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{RecsError, Result};

const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Liveness check plus reconnect, the contract the CRUD wrapper retries through
#[async_trait]
pub trait Reconnect: Send {
    /// Whether the server currently answers; never fails
    async fn check_connection(&self) -> bool;

    /// Drop the current client and open a new one
    async fn reconnect(&mut self) -> Result<()>;
}

/// Check the connection and reconnect once if it is down.
///
/// Returns `true` when a reconnect was performed. There is no second attempt:
/// the caller runs its operation against whatever connection this leaves behind.
#[inline]
pub async fn ensure_connected<R: Reconnect + ?Sized>(connection: &mut R) -> Result<bool> {
    if connection.check_connection().await {
        return Ok(false);
    }

    info!("retry");
    connection.reconnect().await?;
    Ok(true)
}

/// A MongoDB client bound to one database
pub struct MongoConnection {
    uri: String,
    database_name: String,
    client: Option<Client>,
}

impl MongoConnection {
    /// Create the client for `uri` and select `database_name`
    #[inline]
    pub async fn connect(uri: &str, database_name: &str) -> Result<Self> {
        let mut connection = Self {
            uri: uri.to_string(),
            database_name: database_name.to_string(),
            client: None,
        };
        connection.connect_to_database().await?;
        Ok(connection)
    }

    async fn connect_to_database(&mut self) -> Result<()> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| RecsError::Database(format!("Invalid MongoDB URI: {}", e)))?;
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
        options.app_name = Some("book-recs".to_string());

        let client = Client::with_options(options)
            .map_err(|e| RecsError::Database(format!("Failed to create MongoDB client: {}", e)))?;

        debug!("MongoDB client created for database {}", self.database_name);
        self.client = Some(client);
        Ok(())
    }

    /// Close the connection to the server; the client is not reused afterwards
    #[inline]
    pub async fn close_connection(&mut self) {
        if let Some(client) = self.client.take() {
            client.shutdown().await;
            debug!("MongoDB connection closed");
        }
    }

    #[inline]
    pub fn database(&self) -> Result<Database> {
        self.client
            .as_ref()
            .map(|client| client.database(&self.database_name))
            .ok_or_else(|| RecsError::Database("MongoDB connection is closed".to_string()))
    }

    #[inline]
    pub fn database_name(&self) -> &str {
        &self.database_name
    }
}

#[async_trait]
impl Reconnect for MongoConnection {
    async fn check_connection(&self) -> bool {
        let Some(client) = &self.client else {
            warn!("MongoDB connection is not active: client closed");
            return false;
        };

        match client.database("admin").run_command(doc! { "ping": 1 }).await {
            Ok(_) => {
                debug!("MongoDB connection is active");
                true
            }
            Err(e) => {
                warn!("MongoDB connection is not active: {}", e);
                false
            }
        }
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.close_connection().await;
        self.connect_to_database().await
    }
}
