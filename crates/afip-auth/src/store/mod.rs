//! Ticket storage backends.
//!
//! Tickets are runtime state and live behind the pluggable [`TicketStore`]
//! trait. Keys are the conventional ticket paths produced by
//! [`crate::AfipConfig::ticket_path`].

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::error::AuthResult;

pub use file::FileTicketStore;
pub use memory::MemoryTicketStore;

/// Persists and retrieves serialized tickets.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Whether a ticket exists at `path`.
    async fn exists(&self, path: &str) -> AuthResult<bool>;

    /// Raw ticket bytes at `path`.
    ///
    /// Returns `AuthError::MissingArtifact` if nothing is stored there.
    async fn get(&self, path: &str) -> AuthResult<Vec<u8>>;

    /// Store `contents` at `path`, replacing any previous ticket.
    async fn put(&self, path: &str, contents: &[u8]) -> AuthResult<()>;

    /// Backend name for logging/diagnostics.
    fn store_type(&self) -> &'static str;
}
