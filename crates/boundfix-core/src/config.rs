// ── Runtime store configuration ──
//
// Describes *where* the boundary service lives and how often to poll it.
// Never touches disk: `boundfix-config` (or the embedder) builds a
// `StoreConfig` and hands it in.

use std::time::Duration;

use url::Url;

/// Status poll cadence used when nothing else is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Configuration for one store instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Service root; endpoints live under `{base_url}/api/`.
    pub base_url: Url,
    /// Delay between status polls.
    pub poll_interval: Duration,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub timeout: Option<Duration>,
    /// Keep a session cookie jar (same-origin credentials).
    pub cookies: bool,
}

impl StoreConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
            cookies: true,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
