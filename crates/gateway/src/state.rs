//! Shared gateway state.

use std::sync::Arc;

use {
    tansa_line::{LineCredentials, Messenger},
    tansa_research::{TaskRegistry, engine::ResearchEngine},
    tansa_sessions::SessionStore,
};

use crate::ingest::ContentSink;

pub const SERVICE_NAME: &str = "tansa gateway";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything the webhook path needs, shared across requests.
pub struct GatewayState {
    /// `None` disables the webhook with a 503 until both credentials exist.
    pub credentials: Option<LineCredentials>,
    pub sessions: SessionStore,
    pub tasks: TaskRegistry,
    pub messenger: Arc<dyn Messenger>,
    pub engine: Arc<dyn ResearchEngine>,
    pub sink: Arc<dyn ContentSink>,
}

impl GatewayState {
    pub fn new(
        credentials: Option<LineCredentials>,
        messenger: Arc<dyn Messenger>,
        engine: Arc<dyn ResearchEngine>,
        sink: Arc<dyn ContentSink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            credentials,
            sessions: SessionStore::new(),
            tasks: TaskRegistry::new(),
            messenger,
            engine,
            sink,
        })
    }

    pub fn line_configured(&self) -> bool {
        self.credentials.is_some()
    }
}
