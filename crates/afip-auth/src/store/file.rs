//! Local filesystem ticket store.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;

use super::TicketStore;
use crate::error::{AuthError, AuthResult};

/// Ticket store that reads and writes plain files.
///
/// Keys are used verbatim as filesystem paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTicketStore;

impl FileTicketStore {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Warn when a ticket is readable by other users.
    #[cfg(unix)]
    async fn check_permissions(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = tokio::fs::metadata(path).await {
            let mode = metadata.permissions().mode();
            if mode & 0o004 != 0 {
                tracing::warn!(
                    path = %path.display(),
                    mode = format!("{:o}", mode),
                    "Ticket file is world-readable. Consider restricting permissions to 0600."
                );
            }
        }
    }

    #[cfg(not(unix))]
    async fn check_permissions(_path: &Path) {}
}

#[async_trait]
impl TicketStore for FileTicketStore {
    async fn exists(&self, path: &str) -> AuthResult<bool> {
        tokio::fs::try_exists(path)
            .await
            .map_err(|e| AuthError::Storage(format!("Cannot stat '{path}': {e}")))
    }

    async fn get(&self, path: &str) -> AuthResult<Vec<u8>> {
        Self::check_permissions(Path::new(path)).await;

        let contents = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => AuthError::MissingArtifact {
                path: path.to_string(),
            },
            _ => AuthError::Storage(format!("Failed to read '{path}': {e}")),
        })?;

        tracing::debug!(path = %path, bytes = contents.len(), "Ticket loaded from file");
        Ok(contents)
    }

    async fn put(&self, path: &str, contents: &[u8]) -> AuthResult<()> {
        let target = Path::new(path);
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AuthError::Storage(format!("Cannot create '{}': {e}", parent.display()))
            })?;
        }

        // Readers never observe a partially written ticket.
        let staging = target.with_extension("xml.tmp");
        tokio::fs::write(&staging, contents)
            .await
            .map_err(|e| AuthError::Storage(format!("Failed to write '{path}': {e}")))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) =
                tokio::fs::set_permissions(&staging, std::fs::Permissions::from_mode(0o600)).await
            {
                tracing::warn!(
                    path = %path,
                    error = %e,
                    "Cannot restrict ticket permissions to 0600"
                );
            }
        }

        tokio::fs::rename(&staging, target)
            .await
            .map_err(|e| AuthError::Storage(format!("Failed to replace '{path}': {e}")))?;

        tracing::debug!(path = %path, bytes = contents.len(), "Ticket written to file");
        Ok(())
    }

    fn store_type(&self) -> &'static str {
        "file"
    }
}
