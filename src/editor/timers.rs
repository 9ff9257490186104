//! Autosave and draft-save loops.
//!
//! Each loop ticks on its own interval and goes through the shared
//! [`Editor`], so every write reads the buffer as it is at tick time. Missed
//! ticks are skipped rather than replayed in a burst.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

use super::Editor;

/// Handles for the running timer tasks. Dropping it stops both loops.
pub struct EditorTimers {
    autosave: JoinHandle<()>,
    drafts: JoinHandle<()>,
}

impl EditorTimers {
    /// Stop both loops.
    pub fn shutdown(self) {
        drop(self);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.autosave.is_finished() && !self.drafts.is_finished()
    }
}

impl Drop for EditorTimers {
    fn drop(&mut self) {
        self.autosave.abort();
        self.drafts.abort();
    }
}

/// Spawn the autosave and draft loops for `editor`.
#[must_use]
pub fn spawn_timers(editor: &Editor, autosave_every: Duration, draft_every: Duration) -> EditorTimers {
    info!(
        autosave_secs = autosave_every.as_secs_f64(),
        draft_secs = draft_every.as_secs_f64(),
        "timers: editor timers started"
    );

    let ed = editor.clone();
    let autosave = tokio::spawn(async move {
        let mut ticker = ticker(autosave_every);
        loop {
            ticker.tick().await;
            // Failures are already published as notices.
            if let Err(e) = ed.autosave_tick().await {
                debug!(error = %e, "timers: autosave tick failed");
            }
        }
    });

    let ed = editor.clone();
    let drafts = tokio::spawn(async move {
        let mut ticker = ticker(draft_every);
        loop {
            ticker.tick().await;
            if let Err(e) = ed.draft_tick().await {
                debug!(error = %e, "timers: draft tick failed");
            }
        }
    });

    EditorTimers { autosave, drafts }
}

/// Interval whose first tick is one full period away.
fn ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

#[cfg(test)]
#[path = "timers_test.rs"]
mod tests;
