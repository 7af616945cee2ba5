//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use pathora_core::{pipeline::ContentPipeline, ports::DatabaseService};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
///
/// Everything in here is immutable after startup; each request builds its own
/// working data through the pipeline.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub pipeline: ContentPipeline,
}
