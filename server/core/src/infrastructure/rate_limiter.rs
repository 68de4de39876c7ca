// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0

//! Per-client fixed-window rate limiter with a penalty block.
//!
//! Each client gets a window that opens on its first request. Going over
//! `requests_per_window` inside the window blocks the client for
//! `block_duration`. A window that has fully elapsed resets the client,
//! block included.
//!
//! State lives in a [`DashMap`], so different clients never contend on the
//! same lock and a single client's check-and-increment is atomic. Expired
//! clients are swept at most once per window from [`RateLimiter::check`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::domain::config::RateLimitConfig;

/// Source of monotonic time. Swapped for [`ManualClock`] in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { now: Mutex::new(Instant::now()) }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rate limit exceeded, retry after {}s", retry_after.as_secs())]
pub struct RateLimitExceeded {
    pub retry_after: Duration,
}

#[derive(Debug, Clone, Copy)]
struct ClientWindow {
    count: u32,
    window_start: Instant,
    blocked_at: Option<Instant>,
}

impl ClientWindow {
    fn open(now: Instant) -> Self {
        Self { count: 1, window_start: now, blocked_at: None }
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    block_duration: Duration,
    clients: Arc<DashMap<String, ClientWindow>>,
    last_sweep: Arc<Mutex<Instant>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration, block_duration: Duration) -> Self {
        Self::with_clock(limit, window, block_duration, Arc::new(SystemClock))
    }

    pub fn with_clock(
        limit: u32,
        window: Duration,
        block_duration: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let last_sweep = Arc::new(Mutex::new(clock.now()));
        Self {
            limit,
            window,
            block_duration,
            clients: Arc::new(DashMap::new()),
            last_sweep,
            clock,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_window, config.window, config.block_duration)
    }

    pub fn from_config_with_clock(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_clock(config.requests_per_window, config.window, config.block_duration, clock)
    }

    /// `true` if the request is admitted. Each call counts as one request.
    pub fn allow(&self, client_id: &str) -> bool {
        self.check(client_id).is_ok()
    }

    /// Admit one request from `client_id`, or report how long it must wait.
    pub fn check(&self, client_id: &str) -> Result<(), RateLimitExceeded> {
        let now = self.clock.now();
        // Must run before taking the entry: retain locks every shard.
        self.sweep_if_due(now);

        let mut entry = self
            .clients
            .entry(client_id.to_string())
            .or_insert_with(|| ClientWindow { count: 0, window_start: now, blocked_at: None });
        let state = entry.value_mut();

        // A fresh entry has count 0 and falls through to the increment below.
        if state.count > 0 && now.duration_since(state.window_start) > self.window {
            *state = ClientWindow::open(now);
            return Ok(());
        }

        let window_left = self.window.saturating_sub(now.duration_since(state.window_start));

        if let Some(blocked_at) = state.blocked_at {
            let blocked_for = now.duration_since(blocked_at);
            if blocked_for < self.block_duration {
                // Whichever comes first lifts the block: its expiry or the window rollover.
                let retry_after = (self.block_duration - blocked_for).min(window_left);
                debug!(client_id, retry_after_secs = retry_after.as_secs(), "client still blocked");
                return Err(RateLimitExceeded { retry_after });
            }
            *state = ClientWindow::open(now);
            return Ok(());
        }

        state.count += 1;
        if state.count > self.limit {
            state.blocked_at = Some(now);
            warn!(
                client_id,
                limit = self.limit,
                block_secs = self.block_duration.as_secs(),
                "rate limit exceeded, blocking client"
            );
            return Err(RateLimitExceeded { retry_after: self.block_duration.min(window_left) });
        }

        Ok(())
    }

    /// Drop clients whose window has elapsed.
    ///
    /// Such a client would be reset on its next request anyway, block included,
    /// so forgetting it changes no decision.
    pub fn cleanup(&self) {
        let now = self.clock.now();
        *self.last_sweep.lock() = now;
        self.sweep(now);
    }

    fn sweep_if_due(&self, now: Instant) {
        let Some(mut last_sweep) = self.last_sweep.try_lock() else {
            return;
        };
        if now.duration_since(*last_sweep) < self.window {
            return;
        }
        *last_sweep = now;
        drop(last_sweep);
        self.sweep(now);
    }

    fn sweep(&self, now: Instant) {
        let before = self.clients.len();
        self.clients
            .retain(|_, state| now.duration_since(state.window_start) <= self.window);
        let removed = before.saturating_sub(self.clients.len());
        if removed > 0 {
            debug!(removed, "rate limiter cleanup");
        }
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.limit)
            .field("window", &self.window)
            .field("block_duration", &self.block_duration)
            .field("tracked_clients", &self.clients.len())
            .finish()
    }
}
