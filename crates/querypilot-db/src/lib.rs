//! PostgreSQL access for querypilot.
//!
//! Two concerns live here: catalog introspection (table names, column
//! structure, enum expansion) and raw query execution with JSON-shaped
//! results. Connections are request-scoped: every operation opens its own
//! connection and releases it when the scoped client drops. There is no
//! pool and nothing is shared across calls.

pub mod introspect;
pub mod query;

use tracing::debug;

pub use introspect::{describe_tables, list_tables, ColumnInfo, TableStructure, TABLE_DENYLIST};
pub use query::run_query;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),
}

/// A database handle: the connection string plus lazily-acquired,
/// call-scoped connections.
#[derive(Debug, Clone)]
pub struct DbHandle {
    url: String,
}

impl DbHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Open a fresh connection. The driver task finishes as soon as the
    /// returned client drops, so release is tied to scope exit.
    pub async fn connect(&self) -> Result<tokio_postgres::Client, DbError> {
        let (client, connection) = tokio_postgres::connect(&self.url, tokio_postgres::NoTls)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(error = %e, "connection driver ended");
            }
        });

        Ok(client)
    }
}
