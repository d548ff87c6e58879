//! Server configuration from environment variables.
//!
//! Every setting has a default. A value that does not parse is logged and the
//! default is used instead.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::types::GameConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub questions_file: PathBuf,
    pub static_dir: PathBuf,
    /// Outbound buffer per connection, in messages
    pub connection_buffer: usize,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 10000,
            questions_file: PathBuf::from("questions.json"),
            static_dir: PathBuf::from("public"),
            connection_buffer: 64,
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// - `PORT`
    /// - `QUESTIONS_FILE`
    /// - `STATIC_DIR`
    /// - `QUESTIONS_PER_GAME`
    /// - `ROUND_SECONDS`
    /// - `INTERLUDE_MS`
    /// - `CONNECTION_BUFFER`
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let questions_per_game = parse_var("QUESTIONS_PER_GAME", defaults.game.questions_per_game);
        let round_seconds = parse_var("ROUND_SECONDS", defaults.game.round_time.as_secs());
        let interlude_ms = parse_var("INTERLUDE_MS", defaults.game.interlude.as_millis() as u64);

        let config = Self {
            port: parse_var("PORT", defaults.port),
            questions_file: std::env::var("QUESTIONS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.questions_file),
            static_dir: std::env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            connection_buffer: parse_var("CONNECTION_BUFFER", defaults.connection_buffer).max(1),
            game: GameConfig {
                questions_per_game: questions_per_game.max(1),
                round_time: Duration::from_secs(round_seconds.max(1)),
                interlude: Duration::from_millis(interlude_ms),
            },
        };

        tracing::info!(
            port = config.port,
            questions_file = %config.questions_file.display(),
            questions_per_game = config.game.questions_per_game,
            round_seconds = config.game.round_time.as_secs(),
            interlude_ms = config.game.interlude.as_millis() as u64,
            "Server config loaded"
        );

        config
    }
}

fn parse_var<T: FromStr + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "PORT",
        "QUESTIONS_FILE",
        "STATIC_DIR",
        "QUESTIONS_PER_GAME",
        "ROUND_SECONDS",
        "INTERLUDE_MS",
        "CONNECTION_BUFFER",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = ServerConfig::from_env();

        assert_eq!(config.port, 10000);
        assert_eq!(config.questions_file, PathBuf::from("questions.json"));
        assert_eq!(config.game.questions_per_game, 15);
        assert_eq!(config.game.round_time, Duration::from_secs(10));
        assert_eq!(config.game.interlude, Duration::from_millis(3000));
        assert_eq!(config.connection_buffer, 64);
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        std::env::set_var("PORT", "8080");
        std::env::set_var("QUESTIONS_PER_GAME", "5");
        std::env::set_var("ROUND_SECONDS", "20");
        std::env::set_var("INTERLUDE_MS", "500");

        let config = ServerConfig::from_env();
        clear_env();

        assert_eq!(config.port, 8080);
        assert_eq!(config.game.questions_per_game, 5);
        assert_eq!(config.game.round_time, Duration::from_secs(20));
        assert_eq!(config.game.interlude, Duration::from_millis(500));
    }

    #[test]
    #[serial]
    fn test_invalid_value_falls_back() {
        clear_env();
        std::env::set_var("PORT", "not-a-port");
        std::env::set_var("ROUND_SECONDS", "-3");

        let config = ServerConfig::from_env();
        clear_env();

        assert_eq!(config.port, 10000);
        assert_eq!(config.game.round_time, Duration::from_secs(10));
    }
}
