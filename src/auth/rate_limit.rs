// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed-window ceiling on outbound key set fetches.
//!
//! Shared by every caller of one [`KeySetCache`](super::KeySetCache). When the
//! window's budget is spent, callers are refused immediately instead of
//! queueing behind the endpoint.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default window length.
pub const FETCH_WINDOW: Duration = Duration::from_secs(60);

struct Window {
    started_at: Instant,
    used: u32,
}

/// Counts fetch attempts per window.
pub struct FetchBudget {
    limit: u32,
    window: Duration,
    state: Mutex<Window>,
}

impl FetchBudget {
    /// `limit` fetches per minute.
    pub fn per_minute(limit: u32) -> Self {
        Self::with_window(limit, FETCH_WINDOW)
    }

    pub fn with_window(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new(Window {
                started_at: Instant::now(),
                used: 0,
            }),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Take one unit from the current window.
    ///
    /// Returns `false` when the budget is exhausted. A poisoned lock counts as
    /// exhausted.
    pub fn try_acquire(&self) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };

        if state.started_at.elapsed() >= self.window {
            state.started_at = Instant::now();
            state.used = 0;
        }

        if state.used >= self.limit {
            return false;
        }
        state.used += 1;
        true
    }

    /// Units left in the current window.
    pub fn remaining(&self) -> u32 {
        match self.state.lock() {
            Ok(state) if state.started_at.elapsed() >= self.window => self.limit,
            Ok(state) => self.limit.saturating_sub(state.used),
            Err(_) => 0,
        }
    }
}
