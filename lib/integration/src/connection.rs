//! Provider connections.
//!
//! A connection holds the access token a handler needs to call a third-party
//! provider on the user's behalf. Tokens never appear in `Debug` output or logs.

use crate::error::ConnectionError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use switchyard_core::ConnectionId;

/// A stored connection to a provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    /// Provider key, e.g. `"google"` or `"notion"`.
    pub provider: String,
    pub token: String,
    /// Provider-specific account details (workspace name, email, ...).
    #[serde(default)]
    pub account_metadata: Map<String, JsonValue>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Connection {
    #[must_use]
    pub fn new(provider: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            id: ConnectionId::new(),
            provider: provider.into(),
            token: token.into(),
            account_metadata: Map::new(),
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    /// Adds an account metadata entry.
    #[must_use]
    pub fn with_account(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.account_metadata.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Returns true if the token has passed its expiry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("provider", &self.provider)
            .field("token", &"<redacted>")
            .field("account_metadata", &self.account_metadata)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Looks up the current user's connection for a provider.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Returns the connection for `provider`, or `None` if the user has not
    /// connected it.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection exists but cannot be used, or the
    /// backing store fails.
    async fn get_connection(&self, provider: &str) -> Result<Option<Connection>, ConnectionError>;
}

/// Connections held in memory, keyed by provider.
#[derive(Default)]
pub struct InMemoryConnections {
    connections: Mutex<HashMap<String, Connection>>,
}

impl InMemoryConnections {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a connection, replacing any previous one for its provider.
    pub fn insert(&self, connection: Connection) {
        if let Ok(mut connections) = self.connections.lock() {
            connections.insert(connection.provider.clone(), connection);
        }
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(self, connection: Connection) -> Self {
        self.insert(connection);
        self
    }

    /// Removes a provider's connection.
    pub fn remove(&self, provider: &str) -> Option<Connection> {
        self.connections
            .lock()
            .ok()
            .and_then(|mut connections| connections.remove(provider))
    }
}

#[async_trait]
impl ConnectionProvider for InMemoryConnections {
    async fn get_connection(&self, provider: &str) -> Result<Option<Connection>, ConnectionError> {
        let connections = self
            .connections
            .lock()
            .map_err(|e| ConnectionError::StorageFailed {
                reason: e.to_string(),
            })?;

        match connections.get(provider) {
            Some(connection) if connection.is_expired() => Err(ConnectionError::Expired {
                provider: provider.to_string(),
            }),
            found => Ok(found.cloned()),
        }
    }
}
