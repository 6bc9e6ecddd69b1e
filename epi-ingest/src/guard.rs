//! Regression guard
//!
//! Upstream feeds occasionally publish truncated data. Before a freshly
//! loaded table replaces the live one, its row count is compared with the
//! live count; a drop larger than the allowed fraction rejects the swap
//! unless the run is forced.

use epi_common::config::DEFAULT_MAX_DROP_FRACTION;
use thiserror::Error;

/// Candidate table shrank more than allowed
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "Row count would drop from {live} to {candidate} ({:.1}%, limit {:.1}%); rerun with --force to accept",
    .drop_fraction * 100.0,
    .threshold * 100.0
)]
pub struct RegressionError {
    pub live: i64,
    pub candidate: i64,
    pub drop_fraction: f64,
    pub threshold: f64,
}

/// Row-count check applied before each table swap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionGuard {
    /// Largest tolerated fractional drop, e.g. `0.1` for 10%
    pub max_drop_fraction: f64,
    /// Accept any drop
    pub force: bool,
}

impl Default for RegressionGuard {
    fn default() -> Self {
        Self {
            max_drop_fraction: DEFAULT_MAX_DROP_FRACTION,
            force: false,
        }
    }
}

impl RegressionGuard {
    pub fn new(max_drop_fraction: f64, force: bool) -> Self {
        Self {
            max_drop_fraction,
            force,
        }
    }

    /// Accept or reject replacing `live` rows with `candidate` rows
    ///
    /// An empty live table always accepts. Growth always accepts. An empty
    /// candidate against a populated table rejects whatever the threshold.
    pub fn validate(&self, live: i64, candidate: i64) -> Result<(), RegressionError> {
        if live <= 0 || candidate >= live {
            return Ok(());
        }

        let drop_fraction = (live - candidate) as f64 / live as f64;
        // Emptying a populated table is never within tolerance
        if candidate > 0 && drop_fraction <= self.max_drop_fraction {
            return Ok(());
        }

        let error = RegressionError {
            live,
            candidate,
            drop_fraction,
            threshold: self.max_drop_fraction,
        };

        if self.force {
            tracing::warn!(live, candidate, "Accepting row count regression (forced): {}", error);
            return Ok(());
        }

        Err(error)
    }
}

/// Check a swap against the default threshold
pub fn validate(live: i64, candidate: i64, force: bool) -> Result<(), RegressionError> {
    RegressionGuard {
        force,
        ..RegressionGuard::default()
    }
    .validate(live, candidate)
}
