//! LINE Messaging API surface: webhook signature verification, the inbound
//! event model, outbound reply composition, and the HTTP client used for
//! replies, pushes, and content downloads.

pub mod client;
pub mod compose;
pub mod error;
pub mod event;
pub mod signature;

pub use {
    client::{LineClient, LineCredentials, Messenger},
    error::{Error, Result},
};
