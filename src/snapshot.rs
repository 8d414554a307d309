//! Typed statistics snapshots and the batched live-stats response.
//!
//! The endpoint answers `{"stats": {"<id>": {...}, ...}}`. Each entry is
//! validated on its own: an entry with a non-numeric key or a missing/mistyped
//! field is rejected, the rest of the batch still applies.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type JobId = u64;

/// One test's statistics at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub games: u64,
    pub wins: u64,
    pub draws: u64,
    pub losses: u64,
    #[serde(rename = "LL")]
    pub ll: u64,
    #[serde(rename = "LD")]
    pub ld: u64,
    #[serde(rename = "DD")]
    pub dd: u64,
    #[serde(rename = "DW")]
    pub dw: u64,
    #[serde(rename = "WW")]
    pub ww: u64,
    #[serde(rename = "currentllr", alias = "currentLLR", default)]
    pub current_llr: Option<f64>,
    #[serde(default)]
    pub finished: bool,
}

impl Snapshot {
    /// Snapshot with only the W/D/L counts set; everything else zero.
    pub fn with_counts(wins: u64, draws: u64, losses: u64) -> Self {
        Self {
            games: wins.saturating_add(draws).saturating_add(losses),
            wins,
            draws,
            losses,
            ll: 0,
            ld: 0,
            dd: 0,
            dw: 0,
            ww: 0,
            current_llr: None,
            finished: false,
        }
    }

    /// wins + draws + losses, or `None` when the endpoint's counts overflow.
    pub fn wdl_sum(&self) -> Option<u64> {
        self.wins.checked_add(self.draws)?.checked_add(self.losses)
    }

    pub fn is_consistent(&self) -> bool {
        self.wdl_sum() == Some(self.games)
    }

    pub fn pentanomial(&self) -> [u64; 5] {
        [self.ll, self.ld, self.dd, self.dw, self.ww]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedEntry {
    pub key: String,
    pub reason: String,
}

/// Validated entries in the order the response listed them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsBatch {
    pub entries: Vec<(JobId, Snapshot)>,
    pub rejected: Vec<RejectedEntry>,
}

impl StatsBatch {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a live-stats response body.
///
/// Fails only when the body is not JSON or carries no `stats` object; bad
/// entries land in `rejected`.
pub fn parse_batch(body: &str) -> Result<StatsBatch> {
    let root: Value = serde_json::from_str(body).context("live-stats body is not valid JSON")?;
    let stats = root
        .get("stats")
        .and_then(Value::as_object)
        .ok_or_else(|| anyhow!("live-stats body has no stats object"))?;

    let mut batch = StatsBatch::default();
    for (key, value) in stats {
        let id = match key.trim().parse::<JobId>() {
            Ok(id) => id,
            Err(_) => {
                batch.rejected.push(RejectedEntry {
                    key: key.clone(),
                    reason: "key is not a numeric test id".to_string(),
                });
                continue;
            }
        };
        match Snapshot::deserialize(value) {
            Ok(snapshot) => batch.entries.push((id, snapshot)),
            Err(e) => batch.rejected.push(RejectedEntry {
                key: key.clone(),
                reason: e.to_string(),
            }),
        }
    }
    Ok(batch)
}
