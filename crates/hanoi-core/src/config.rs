//! Configuration for the demo server.
//!
//! All configuration is loaded from environment variables, each with a
//! default matching the values the dashboard expects. Loading goes through
//! a lookup function so tests can supply a map instead of mutating the
//! process environment.

use std::time::Duration;

use crate::network::NetworkStrategy;
use crate::puzzle::DEFAULT_DISKS;
use crate::strategy::{SolverStrategy, Strategy};

/// Slowest allowed cadence, in milliseconds.
pub const MAX_SPEED_MS: u64 = 3000;

/// Fastest allowed cadence, in milliseconds.
pub const MIN_SPEED_MS: u64 = 100;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable was set to a value that could not be used.
    #[error("invalid {var}: {reason}")]
    Invalid {
        /// The environment variable name.
        var: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Which bundled strategy drives the demo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Seeded random-weight policy network.
    Network,
    /// Optimal recursive solver.
    Solver,
}

impl StrategyKind {
    /// Lowercase name as used in `STRATEGY`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Solver => "solver",
        }
    }
}

impl core::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "network" => Ok(Self::Network),
            "solver" => Ok(Self::Solver),
            other => Err(format!("unknown strategy {other:?}")),
        }
    }
}

/// Complete server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoConfig {
    /// Name reported by the HTTP endpoints.
    pub app_name: String,
    /// Host address to bind to.
    pub host: String,
    /// TCP port to listen on.
    pub port: u16,
    /// Origins allowed to make cross-origin requests.
    pub allowed_origins: Vec<String>,
    /// Maximum attempted moves per demo run.
    pub max_moves: u32,
    /// Initial cadence between visualized steps.
    pub default_speed: Duration,
    /// Idle timeout for connections. Reported only; not enforced.
    pub websocket_timeout: Duration,
    /// Disks in a new puzzle.
    pub n_disks: u32,
    /// Strategy driving the demo.
    pub strategy: StrategyKind,
    /// Seed for the network strategy's weights.
    pub strategy_seed: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("Tower of Hanoi AI Visualizer"),
            host: String::from("0.0.0.0"),
            port: 8000,
            allowed_origins: vec![
                String::from("http://localhost:3000"),
                String::from("http://frontend:3000"),
            ],
            max_moves: 50,
            default_speed: Duration::from_secs(1),
            websocket_timeout: Duration::from_secs(60),
            n_disks: DEFAULT_DISKS,
            strategy: StrategyKind::Network,
            strategy_seed: 42,
        }
    }
}

impl DemoConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional variables (defaults in parentheses):
    /// - `APP_NAME` -- display name (`Tower of Hanoi AI Visualizer`)
    /// - `HANOI_HOST` -- bind host (`0.0.0.0`)
    /// - `HANOI_PORT` -- bind port (`8000`)
    /// - `ALLOWED_ORIGINS` -- comma-separated CORS origins
    ///   (`http://localhost:3000,http://frontend:3000`)
    /// - `MAX_MOVES` -- move cap per run (`50`)
    /// - `DEFAULT_SPEED` -- initial cadence in seconds, clamped to
    ///   `[0.1, 3.0]` (`1.0`)
    /// - `WEBSOCKET_TIMEOUT` -- idle timeout in seconds (`60`)
    /// - `NUM_DISKS` -- disks per puzzle, at least 1 (`4`)
    /// - `STRATEGY` -- `network` or `solver` (`network`)
    /// - `STRATEGY_SEED` -- network weight seed (`42`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let app_name = lookup("APP_NAME").unwrap_or(defaults.app_name);
        let host = lookup("HANOI_HOST").unwrap_or(defaults.host);
        let port = parse_or(&lookup, "HANOI_PORT", defaults.port)?;

        let allowed_origins = lookup("ALLOWED_ORIGINS").map_or(defaults.allowed_origins, |raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect()
        });

        let max_moves = parse_or(&lookup, "MAX_MOVES", defaults.max_moves)?;

        let speed_secs: f64 = parse_or(&lookup, "DEFAULT_SPEED", 1.0)?;
        if !speed_secs.is_finite() {
            return Err(ConfigError::Invalid {
                var: "DEFAULT_SPEED",
                reason: String::from("must be a finite number"),
            });
        }
        let default_speed = Duration::from_millis(clamp_speed_ms(speed_secs));

        let timeout_secs: u64 = parse_or(&lookup, "WEBSOCKET_TIMEOUT", 60)?;

        let n_disks: u32 = parse_or(&lookup, "NUM_DISKS", defaults.n_disks)?;
        if n_disks == 0 {
            return Err(ConfigError::Invalid {
                var: "NUM_DISKS",
                reason: String::from("must be at least 1"),
            });
        }

        let strategy = match lookup("STRATEGY") {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                var: "STRATEGY",
                reason,
            })?,
            None => defaults.strategy,
        };
        let strategy_seed = parse_or(&lookup, "STRATEGY_SEED", defaults.strategy_seed)?;

        Ok(Self {
            app_name,
            host,
            port,
            allowed_origins,
            max_moves,
            default_speed,
            websocket_timeout: Duration::from_secs(timeout_secs),
            n_disks,
            strategy,
            strategy_seed,
        })
    }
}

impl DemoConfig {
    /// Build the configured strategy.
    pub fn build_strategy(&self) -> Box<dyn Strategy> {
        match self.strategy {
            StrategyKind::Network => Box::new(NetworkStrategy::new(self.n_disks, self.strategy_seed)),
            StrategyKind::Solver => Box::new(SolverStrategy::new()),
        }
    }
}

/// Convert a cadence in seconds to milliseconds within
/// `[MIN_SPEED_MS, MAX_SPEED_MS]`. `NaN` maps to the fastest cadence.
pub fn clamp_speed_ms(seconds: f64) -> u64 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let ms = (seconds * 1000.0).round().clamp(0.0, u64::MAX as f64) as u64;
    ms.clamp(MIN_SPEED_MS, MAX_SPEED_MS)
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    lookup(var).map_or(Ok(default), |raw| {
        raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: format!("{raw:?}: {e}"),
        })
    })
}
