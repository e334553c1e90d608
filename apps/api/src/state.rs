use std::sync::Arc;

use crate::config::Config;
use crate::screening::orchestrator::ScreeningOrchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Owns the document registry, the run guard and the progress channel.
    pub orchestrator: Arc<ScreeningOrchestrator>,
}
