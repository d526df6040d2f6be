//! Spaced-repetition gating
//!
//! Items answered recently are suppressed: blocked entirely inside the first
//! window, then admitted with a growing weight multiplier.

use chrono::{DateTime, Utc};

use crate::ability::hours_between;
use crate::config::SrsWindows;

/// Weight multiplier for an item last answered at `last_answered_at`.
pub fn srs_penalty(
    windows: &SrsWindows,
    last_answered_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> f64 {
    match last_answered_at {
        None => 1.0,
        Some(last) => penalty_for_hours(windows, hours_between(last, now)),
    }
}

pub fn penalty_for_hours(windows: &SrsWindows, elapsed_hours: f64) -> f64 {
    if elapsed_hours < windows.block_hours {
        0.0
    } else if elapsed_hours < windows.short_hours {
        windows.short_penalty
    } else if elapsed_hours < windows.medium_hours {
        windows.medium_penalty
    } else {
        1.0
    }
}
