//! Transaction timing
//!
//! A table replace holds the single SQLite writer for the whole load. These
//! wrappers log how long acquiring the connection took and how long it was
//! held, so a slow load or a blocked writer shows up in the logs.

use epi_common::Result;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::time::Instant;

const SLOW_ACQUIRE_MS: u128 = 1000;
const LONG_HOLD_MS: u128 = 30_000;

/// Transaction that logs its hold time when it ends
pub struct MonitoredTransaction<'c> {
    tx: Transaction<'c, Sqlite>,
    timer: HoldTimer,
}

impl<'c> MonitoredTransaction<'c> {
    /// Connection to run statements on
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    pub async fn commit(self) -> Result<()> {
        let Self { tx, timer } = self;
        tx.commit().await?;
        timer.finish("commit");
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        let Self { tx, timer } = self;
        tx.rollback().await?;
        timer.finish("rollback");
        Ok(())
    }
}

/// Hold-time bookkeeping; warns when a transaction ends by being dropped
struct HoldTimer {
    caller: &'static str,
    acquired_at: Instant,
    finished: bool,
}

impl HoldTimer {
    fn finish(mut self, outcome: &'static str) {
        self.finished = true;
        log_hold(self.caller, outcome, self.acquired_at.elapsed().as_millis());
    }
}

impl Drop for HoldTimer {
    fn drop(&mut self) {
        if !self.finished {
            // sqlx rolls the transaction back on drop
            tracing::warn!(
                caller = self.caller,
                held_ms = self.acquired_at.elapsed().as_millis() as u64,
                "Transaction dropped without commit or rollback"
            );
        }
    }
}

fn log_hold(caller: &'static str, outcome: &'static str, held_ms: u128) {
    if held_ms > LONG_HOLD_MS {
        tracing::warn!(caller, outcome, held_ms = held_ms as u64, "Long transaction held the writer");
    } else {
        tracing::debug!(caller, outcome, held_ms = held_ms as u64, "Transaction finished");
    }
}

/// Begin a transaction with acquisition and hold timing logs
pub async fn begin_monitored<'c>(
    pool: &'c SqlitePool,
    caller: &'static str,
) -> Result<MonitoredTransaction<'c>> {
    let start = Instant::now();
    tracing::debug!(caller, "Connection acquisition requested");

    let tx = pool.begin().await?;

    let wait_ms = start.elapsed().as_millis();
    if wait_ms > SLOW_ACQUIRE_MS {
        tracing::warn!(caller, wait_ms = wait_ms as u64, "Slow connection acquisition");
    } else {
        tracing::debug!(caller, wait_ms = wait_ms as u64, "Connection acquired");
    }

    Ok(MonitoredTransaction {
        tx,
        timer: HoldTimer {
            caller,
            acquired_at: Instant::now(),
            finished: false,
        },
    })
}
