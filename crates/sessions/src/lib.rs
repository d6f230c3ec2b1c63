//! Per-user conversational state: sessions, user configuration, and the
//! concurrent store that owns them.

pub mod config;
pub mod session;
pub mod store;

pub use {
    config::{ReportFormat, UserConfig},
    session::{Session, SessionState},
    store::{SESSION_TTL, SessionStore},
};
