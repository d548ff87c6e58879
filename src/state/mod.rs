mod registry;

pub use registry::RoomRegistry;

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::questions::QuestionProvider;

/// Shared application state
pub struct AppState {
    pub registry: RoomRegistry,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(provider: Arc<dyn QuestionProvider>, config: ServerConfig) -> Self {
        Self {
            registry: RoomRegistry::new(provider, config.game.clone()),
            config,
        }
    }
}
