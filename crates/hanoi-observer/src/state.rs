//! Shared application state for the demo server.
//!
//! [`AppState`] holds the single hub, game service, and demo orchestrator
//! that every connection shares, plus the configuration the HTTP endpoints
//! report.

use std::sync::Arc;

use hanoi_core::config::DemoConfig;
use hanoi_core::demo::DemoOrchestrator;
use hanoi_core::game::GameService;
use hanoi_core::hub::Hub;
use hanoi_core::strategy::Strategy;
use hanoi_types::StatusData;

/// Shared state for all handlers and socket tasks.
#[derive(Debug)]
pub struct AppState {
    /// Registry of live connections.
    pub hub: Arc<Hub>,
    /// Owner of the current puzzle.
    pub games: Arc<GameService>,
    /// The single demo run.
    pub demo: Arc<DemoOrchestrator>,
    /// Server configuration.
    pub config: Arc<DemoConfig>,
}

impl AppState {
    /// Build state with the strategy selected by `config`.
    pub fn new(config: DemoConfig) -> Self {
        let strategy = config.build_strategy();
        Self::with_strategy(config, strategy)
    }

    /// Build state around an explicit strategy.
    pub fn with_strategy(config: DemoConfig, strategy: Box<dyn Strategy>) -> Self {
        let hub = Arc::new(Hub::new());
        let games = Arc::new(GameService::new(config.n_disks));
        let demo = Arc::new(DemoOrchestrator::new(
            Arc::clone(&hub),
            strategy,
            config.max_moves,
            config.default_speed,
        ));
        Self {
            hub,
            games,
            demo,
            config: Arc::new(config),
        }
    }

    /// Current status as reported to `get_status`.
    pub fn status(&self) -> StatusData {
        StatusData {
            ai_running: self.demo.is_running(),
            game_running: self.games.is_running(),
            current_speed: self.demo.speed_secs(),
            game_state: self.games.snapshot(),
            connected_clients: self.hub.connection_count(),
        }
    }
}
