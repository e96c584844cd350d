//! Host configuration from the environment.
//!
//! The kernel consumes only the numeric values; directories stay on this
//! side of the boundary.

use std::path::PathBuf;

/// Environment-derived runner configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Sim seconds per tick.
    pub tick_interval: f64,
    pub logs_dir: PathBuf,
    pub scenarios_dir: PathBuf,
}

impl AppConfig {
    /// `SKYFENCE_TICK_INTERVAL_MS`, `SKYFENCE_LOGS_DIR`,
    /// `SKYFENCE_SCENARIOS_DIR`, each with a sensible default.
    pub fn from_env() -> AppConfig {
        let tick_interval = std::env::var("SKYFENCE_TICK_INTERVAL_MS")
            .ok()
            .and_then(|raw| raw.parse::<f64>().ok())
            .filter(|ms| *ms > 0.0)
            .map(|ms| ms / 1000.0)
            .unwrap_or(skyfence_core::constants::DT);

        AppConfig {
            tick_interval,
            logs_dir: dir_from_env("SKYFENCE_LOGS_DIR", "logs"),
            scenarios_dir: dir_from_env("SKYFENCE_SCENARIOS_DIR", "scenarios"),
        }
    }
}

fn dir_from_env(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        // Only meaningful when the variables are unset, which is the
        // normal test environment.
        if std::env::var("SKYFENCE_TICK_INTERVAL_MS").is_err() {
            let config = AppConfig::from_env();
            assert!((config.tick_interval - skyfence_core::constants::DT).abs() < 1e-12);
            assert_eq!(config.logs_dir, PathBuf::from("logs"));
        }
    }
}
