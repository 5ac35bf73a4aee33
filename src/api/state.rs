use std::sync::Arc;

use crate::detect::service::ScoringService;

#[derive(Clone)]
pub struct AppState {
    pub scoring: Arc<ScoringService>,
}
