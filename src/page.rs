//! In-memory model of the page being refreshed.
//!
//! Only the parts the live updater touches are modelled: each test row with
//! its `data-test-id`, inline background style, the statblock's `<strong>`
//! markup and the three-segment W/D/L bar. Rows are shared handles so a
//! registry entry can keep pointing at "its" row while the page owns it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Separator between statblock lines inside `<strong>`.
pub const LINE_BREAK: &str = "<br>";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BarSegment {
    #[serde(default)]
    pub width: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WdlBar {
    #[serde(default)]
    pub segments: Vec<BarSegment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatBlock {
    /// Inner markup of the `<strong>` child, absent when the block has none.
    #[serde(default)]
    pub strong: Option<String>,
}

impl StatBlock {
    pub fn from_lines(lines: &[&str]) -> Self {
        Self { strong: Some(lines.join(LINE_BREAK)) }
    }

    pub fn lines(&self) -> Vec<&str> {
        self.strong
            .as_deref()
            .map(|s| s.split(LINE_BREAK).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowElement {
    #[serde(rename = "data-test-id", default)]
    pub test_id: Option<String>,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub transition: String,
    #[serde(default)]
    pub statblock: Option<StatBlock>,
    #[serde(default)]
    pub wdl_bar: Option<WdlBar>,
}

pub type RowHandle = Arc<Mutex<RowElement>>;

/// Lock a row; a poisoned lock reads as a missing element.
pub fn lock_row(row: &RowHandle) -> Option<MutexGuard<'_, RowElement>> {
    row.lock().ok()
}

#[derive(Debug, Serialize, Deserialize)]
struct PageFile {
    rows: Vec<RowElement>,
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    rows: Vec<RowHandle>,
}

impl Document {
    pub fn new(rows: Vec<RowElement>) -> Self {
        Self {
            rows: rows.into_iter().map(|r| Arc::new(Mutex::new(r))).collect(),
        }
    }

    pub fn rows(&self) -> &[RowHandle] {
        &self.rows
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let file: PageFile = serde_json::from_str(text).context("page JSON does not match the row schema")?;
        Ok(Self::new(file.rows))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read page file {}", path.display()))?;
        Self::from_json(&text)
    }

    /// Point-in-time copy of every row; rows with poisoned locks are skipped.
    pub fn snapshot_rows(&self) -> Vec<RowElement> {
        self.rows.iter().filter_map(|r| lock_row(r).map(|g| g.clone())).collect()
    }

    pub fn to_json(&self) -> Result<String> {
        let file = PageFile { rows: self.snapshot_rows() };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("cannot write page file {}", path.display()))
    }
}
