use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use dashmap::DashMap;

/// Limiter settings, see `AppConfig::from_env`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_requests: usize,
    pub window: Duration,
    /// Key clients on `Forwarded`/`X-Forwarded-For` instead of the socket
    /// address. Only safe behind a proxy that overwrites those headers.
    pub trust_proxy: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { enabled: false, max_requests: 100, window: Duration::from_secs(60), trust_proxy: false }
    }
}

/// Sliding window in-memory rate limiter keyed by client address (pod local).
#[derive(Clone)]
pub struct SlidingWindowLimiter {
    hits: Arc<DashMap<String, VecDeque<Instant>>>,
    last_sweep: Arc<Mutex<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            hits: Arc::new(DashMap::new()),
            last_sweep: Arc::new(Mutex::new(Instant::now())),
            max_requests,
            window,
        }
    }

    /// `None` when the config disables limiting.
    pub fn from_config(cfg: &RateLimitConfig) -> Option<Self> {
        cfg.enabled.then(|| Self::new(cfg.max_requests, cfg.window))
    }

    /// Records a hit for `key`. Returns false once the window is full.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        self.sweep(now);
        let mut entry = self.hits.entry(key.to_string()).or_default();
        while let Some(front) = entry.front() {
            if now.duration_since(*front) >= self.window { entry.pop_front(); } else { break; }
        }
        if entry.len() < self.max_requests {
            entry.push_back(now);
            true
        } else {
            false
        }
    }

    /// Drops clients with no hit left in the window, at most once per window.
    /// Must not run while an entry guard is held.
    fn sweep(&self, now: Instant) {
        let Ok(mut last) = self.last_sweep.try_lock() else { return };
        if now.duration_since(*last) < self.window {
            return;
        }
        *last = now;
        drop(last);
        let window = self.window;
        self.hits.retain(|_, hits| {
            while hits.front().is_some_and(|t| now.duration_since(*t) >= window) {
                hits.pop_front();
            }
            !hits.is_empty()
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.hits.len()
    }
}
