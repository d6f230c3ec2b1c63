use std::error::Error as StdError;

/// Crate-wide result type for LINE client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed errors for the Messaging API client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A request to the Messaging API could not be sent or read.
    #[error("LINE API request failed: {context}: {source}")]
    Api {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The Messaging API answered with a non-success status.
    #[error("LINE API returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Downloaded content exceeds the ingestion size cap.
    #[error("content of {size} bytes exceeds the {limit} byte limit")]
    ContentTooLarge { size: usize, limit: usize },
}

impl Error {
    #[must_use]
    pub fn api(context: impl Into<String>, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Api {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
