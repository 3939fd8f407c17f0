//! # Engine Configuration

use std::time::Duration;

/// Configuration for the reachability engine.
///
/// Mirrors the shape of the teacher repo's per-subsystem config structs
/// (`CacheConfig`, `DatabaseConfig`): a plain struct with a `Default` impl,
/// constructed once at startup and threaded down to the components that
/// need it.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Default concurrency budget `K` for `CustomLeaderboard` when the
    /// caller does not override it.
    pub default_leaderboard_concurrency: usize,

    /// How often the cache engine logs progress while draining a large
    /// dirty set.
    pub cache_progress_log_interval: usize,

    /// Timeout applied to a single leaderboard focus-node evaluation before
    /// it is treated as cancelled.
    pub leaderboard_eval_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_leaderboard_concurrency: 16,
            cache_progress_log_interval: 1000,
            leaderboard_eval_timeout: Duration::from_secs(30),
        }
    }
}
