//! Brief background flash on a row when new games have been played.
//!
//! Each flash remembers the background it found and restores it after the
//! configured delay. Overlapping flashes are not queued: a second flash that
//! starts while the first is still lit records the highlight colour as its
//! "original" and restores to that.

use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::{Config, HIGHLIGHT_TRANSITION};
use crate::page::{lock_row, RowHandle};

#[derive(Debug, Clone)]
pub struct Highlighter {
    color: String,
    duration: Duration,
}

impl Highlighter {
    pub fn new(color: impl Into<String>, duration: Duration) -> Self {
        Self { color: color.into(), duration }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.highlight_color.clone(), cfg.highlight_duration())
    }

    /// Light the row now and spawn the revert. Returns `None` when the row
    /// cannot be locked.
    pub fn flash(&self, row: &RowHandle) -> Option<JoinHandle<()>> {
        let original = {
            let mut guard = lock_row(row)?;
            guard.transition = HIGHLIGHT_TRANSITION.to_string();
            std::mem::replace(&mut guard.background, self.color.clone())
        };

        let row = row.clone();
        let delay = self.duration;
        Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(mut guard) = lock_row(&row) {
                guard.background = original;
            }
        }))
    }
}
