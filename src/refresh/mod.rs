//! Refresh orchestration and deferred background work.

pub mod background;
pub mod orchestrator;

pub use background::BackgroundTasks;
pub use orchestrator::{
    decide, CacheDecision, CacheStatus, FeedsOutcome, RefreshOrchestrator, RefreshReport,
};
