//! Retention configuration.

use std::time::Duration;

/// Default maximum artifact age (2 hours).
pub const DEFAULT_RETENTION_SECS: u64 = 7200;
/// Default interval between sweeps (1 hour).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// How long artifacts live and how often they are swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionConfig {
    pub retention: Duration,
    pub sweep_interval: Duration,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(DEFAULT_RETENTION_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl RetentionConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let secs = |key: &str, default: u64| {
            std::env::var(key)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };

        Self {
            retention: Duration::from_secs(secs("FACTREEL_RETENTION_SECS", DEFAULT_RETENTION_SECS)),
            sweep_interval: Duration::from_secs(secs(
                "FACTREEL_SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RetentionConfig::default();
        assert_eq!(config.retention, Duration::from_secs(7200));
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));
    }
}
