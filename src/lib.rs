pub mod api;
pub mod browser;
pub mod config;
pub mod detail;
pub mod error;
pub mod listing;
pub mod llm;
pub mod models;
pub mod navigation;
pub mod pipeline;
pub mod sanitize;
pub mod strategy;
pub mod summarize;

use std::sync::Arc;
use config::Config;
use pipeline::PipelineOrchestrator;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<PipelineOrchestrator>,
}
