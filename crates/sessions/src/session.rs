//! Per-user conversational state.

use std::time::Instant;

use crate::config::UserConfig;

/// Research queries remembered per session; oldest entries drop first.
pub const HISTORY_CAP: usize = 50;

/// Where a session currently is in the research lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Researching,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Researching => "researching",
        }
    }
}

/// One remembered research query.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub query: String,
    pub submitted_at: Instant,
}

/// Conversational state for one platform user.
///
/// Sessions are owned by the store; handlers work on a copy and write it
/// back through [`crate::store::SessionStore::update`].
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub current_context: String,
    pub state: SessionState,
    pub config: UserConfig,
    pub history: Vec<HistoryEntry>,
    pub(crate) last_activity: Instant,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            current_context: String::new(),
            state: SessionState::Idle,
            config: UserConfig::default(),
            history: Vec::new(),
            last_activity: Instant::now(),
        }
    }

    /// Append a query to the history, evicting the oldest past the cap.
    pub fn record_query(&mut self, query: &str) {
        if self.history.len() == HISTORY_CAP {
            self.history.remove(0);
        }
        self.history.push(HistoryEntry {
            query: query.to_string(),
            submitted_at: Instant::now(),
        });
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }
}
