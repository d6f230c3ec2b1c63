//! Content ingestion boundary.

use {async_trait::async_trait, tracing::info};

use tansa_line::event::MediaKind;

/// Receives raw media fetched from the platform.
///
/// Real ingestion into a knowledge store lives behind this seam; the router
/// only cares whether the content was accepted.
#[async_trait]
pub trait ContentSink: Send + Sync {
    async fn process(
        &self,
        message_id: &str,
        kind: MediaKind,
        data: &[u8],
    ) -> anyhow::Result<bool>;
}

/// Accepts everything and records what it saw.
pub struct LoggingSink;

#[async_trait]
impl ContentSink for LoggingSink {
    async fn process(
        &self,
        message_id: &str,
        kind: MediaKind,
        data: &[u8],
    ) -> anyhow::Result<bool> {
        info!(message_id, kind = %kind, bytes = data.len(), "content received");
        Ok(true)
    }
}
