//! In-process ticket store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::TicketStore;
use crate::error::{AuthError, AuthResult};

/// Ticket store held in memory and shared across clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryTicketStore {
    tickets: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryTicketStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove the ticket at `path`, returning whether one was stored.
    pub async fn remove(&self, path: &str) -> bool {
        self.tickets.write().await.remove(path).is_some()
    }

    /// Number of stored tickets.
    pub async fn len(&self) -> usize {
        self.tickets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tickets.read().await.is_empty()
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn exists(&self, path: &str) -> AuthResult<bool> {
        Ok(self.tickets.read().await.contains_key(path))
    }

    async fn get(&self, path: &str) -> AuthResult<Vec<u8>> {
        self.tickets
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| AuthError::MissingArtifact {
                path: path.to_string(),
            })
    }

    async fn put(&self, path: &str, contents: &[u8]) -> AuthResult<()> {
        self.tickets
            .write()
            .await
            .insert(path.to_string(), contents.to_vec());
        Ok(())
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}
