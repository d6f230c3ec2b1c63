//! Research orchestration: the engine seam and the per-user task registry.

pub mod engine;
pub mod error;
pub mod registry;

pub use {
    engine::{HttpResearchEngine, ResearchEngine, ResearchOptions},
    error::{Error, Result},
    registry::{ResearchTask, SubmitError, TaskRegistry, TaskStatus},
};
