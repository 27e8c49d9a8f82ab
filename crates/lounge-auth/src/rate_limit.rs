//! Sliding-window request limits keyed by client address.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::warn;

const WINDOW: Duration = Duration::from_secs(60);

/// Past this many tracked keys, idle ones are dropped on the next check.
const PRUNE_THRESHOLD: usize = 10_000;

/// Which quota an endpoint draws from. Each policy counts independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    Login,
    AdminLogin,
    Default,
}

impl Policy {
    pub fn max_requests(self) -> usize {
        match self {
            Policy::Login => 5,
            Policy::AdminLogin => 6,
            Policy::Default => 10,
        }
    }

    pub fn window(self) -> Duration {
        WINDOW
    }
}

#[derive(Debug, Error)]
#[error("rate limit exceeded, retry in {}s", .retry_after.as_secs())]
pub struct RateLimited {
    pub retry_after: Duration,
}

#[derive(Clone, Default)]
pub struct RateLimiter {
    hits: Arc<Mutex<HashMap<(Policy, IpAddr), VecDeque<Instant>>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request from `ip` against `policy`.
    pub fn check(&self, policy: Policy, ip: IpAddr) -> Result<(), RateLimited> {
        self.check_at(policy, ip, Instant::now())
    }

    pub fn check_at(&self, policy: Policy, ip: IpAddr, now: Instant) -> Result<(), RateLimited> {
        let mut hits = self.hits.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if hits.len() > PRUNE_THRESHOLD {
            hits.retain(|(p, _), window| {
                evict_before(window, now, p.window());
                !window.is_empty()
            });
        }

        let window = hits.entry((policy, ip)).or_default();
        evict_before(window, now, policy.window());

        if window.len() >= policy.max_requests() {
            let oldest = window.front().copied().unwrap_or(now);
            let retry_after = (oldest + policy.window()).saturating_duration_since(now);
            warn!("Rate limit hit: {:?} from {}", policy, ip);
            return Err(RateLimited { retry_after });
        }

        window.push_back(now);
        Ok(())
    }
}

fn evict_before(window: &mut VecDeque<Instant>, now: Instant, span: Duration) {
    while let Some(&front) = window.front() {
        if now.saturating_duration_since(front) >= span {
            window.pop_front();
        } else {
            break;
        }
    }
}
