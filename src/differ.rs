//! Decides, per job and per tick, whether a fresh snapshot is worth drawing.
//!
//! Only the W/D/L counts gate a render. Pentanomial buckets and the LLR are
//! drawn whenever a render happens but never trigger one on their own, so an
//! LLR-only change stays invisible until the counts move.

use crate::snapshot::Snapshot;

/// What the update step should do with a new snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatePlan {
    pub render: bool,
    pub flash: bool,
}

/// True when any of games/wins/draws/losses differs.
pub fn counts_changed(old: &Snapshot, new: &Snapshot) -> bool {
    old.games != new.games
        || old.wins != new.wins
        || old.draws != new.draws
        || old.losses != new.losses
}

/// First snapshot always renders; the highlight needs a previous game count
/// to compare against.
pub fn plan(old: Option<&Snapshot>, new: &Snapshot) -> UpdatePlan {
    match old {
        None => UpdatePlan { render: true, flash: false },
        Some(old) => UpdatePlan {
            render: counts_changed(old, new),
            flash: old.games != new.games,
        },
    }
}
