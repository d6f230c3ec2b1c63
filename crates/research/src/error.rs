use std::error::Error as StdError;

/// Crate-wide result type for research operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the research engine boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The researcher service could not be reached or read.
    #[error("research engine failed: {context}: {source}")]
    Engine {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The researcher service answered with a non-success status.
    #[error("researcher returned status {status}: {body}")]
    EngineStatus { status: u16, body: String },
}

impl Error {
    #[must_use]
    pub fn engine(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Engine {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
