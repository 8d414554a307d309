use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;
pub const DEFAULT_HIGHLIGHT_MS: u64 = 300;
pub const DEFAULT_RELOAD_DELAY_MS: u64 = 2000;
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "rgba(94, 234, 212, 0.15)";
pub const HIGHLIGHT_TRANSITION: &str = "background-color 0.3s ease";

/// Endpoint location and timing knobs for one live-update session.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub stats_path: String,
    pub poll_interval_ms: u64,
    pub highlight_ms: u64,
    pub reload_delay_ms: u64,
    pub http_timeout_secs: u64,
    pub highlight_color: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            stats_path: "/api/live-stats/".to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            highlight_ms: DEFAULT_HIGHLIGHT_MS,
            reload_delay_ms: DEFAULT_RELOAD_DELAY_MS,
            http_timeout_secs: 10,
            highlight_color: DEFAULT_HIGHLIGHT_COLOR.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            base_url: std::env::var("LIVE_BASE_URL").unwrap_or(d.base_url),
            stats_path: std::env::var("LIVE_STATS_PATH").unwrap_or(d.stats_path),
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.poll_interval_ms),
            highlight_ms: std::env::var("HIGHLIGHT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.highlight_ms),
            reload_delay_ms: std::env::var("RELOAD_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.reload_delay_ms),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.http_timeout_secs),
            highlight_color: std::env::var("HIGHLIGHT_COLOR").unwrap_or(d.highlight_color),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        // a zero period would make tokio's interval panic
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn highlight_duration(&self) -> Duration {
        Duration::from_millis(self.highlight_ms)
    }

    pub fn reload_delay(&self) -> Duration {
        Duration::from_millis(self.reload_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_page_timings() {
        let cfg = Config::default();
        assert_eq!(cfg.poll_interval(), Duration::from_secs(3));
        assert_eq!(cfg.highlight_duration(), Duration::from_millis(300));
        assert_eq!(cfg.reload_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let cfg = Config { poll_interval_ms: 0, ..Default::default() };
        assert_eq!(cfg.poll_interval(), Duration::from_millis(1));
    }
}
