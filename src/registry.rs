use std::collections::HashMap;

use crate::logging::{debug, info, obj, v_str, v_u64, Domain};
use crate::page::{lock_row, Document, RowHandle};
use crate::snapshot::{JobId, Snapshot};

/// One monitored test: its row on the page and the last snapshot drawn there.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub row: RowHandle,
    pub last_snapshot: Option<Snapshot>,
}

/// Tests being watched this session. Filled once by `discover`, shrinks as
/// tests finish.
#[derive(Debug, Default)]
pub struct Registry {
    jobs: HashMap<JobId, Job>,
}

impl Registry {
    pub fn new() -> Self {
        Self { jobs: HashMap::new() }
    }

    /// Register every row carrying a numeric test id, a statblock and a W/D/L
    /// bar. Anything else is skipped without complaint. Returns the number of
    /// distinct tests tracked; a repeated id counts once.
    pub fn discover(&mut self, doc: &Document) -> usize {
        for row in doc.rows() {
            let Some(guard) = lock_row(row) else { continue };
            let Some(raw_id) = guard.test_id.as_deref() else { continue };
            let Ok(id) = raw_id.trim().parse::<JobId>() else {
                debug(Domain::Registry, "row_skipped", obj(&[("test_id", v_str(raw_id)), ("reason", v_str("non-numeric id"))]));
                continue;
            };
            if guard.statblock.is_none() || guard.wdl_bar.is_none() {
                debug(Domain::Registry, "row_skipped", obj(&[("job_id", v_u64(id)), ("reason", v_str("missing statblock or bar"))]));
                continue;
            }
            drop(guard);

            // a repeated id keeps the later row
            self.jobs.insert(id, Job { id, row: row.clone(), last_snapshot: None });
        }
        info(Domain::Registry, "discovered", obj(&[("tracked", v_u64(self.jobs.len() as u64))]));
        self.jobs.len()
    }

    pub fn active_ids(&self) -> Vec<JobId> {
        self.jobs.keys().copied().collect()
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn get_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.get_mut(&id)
    }

    pub fn remove(&mut self, id: JobId) -> Option<Job> {
        self.jobs.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{RowElement, StatBlock, WdlBar};
    use std::sync::Arc;

    fn row(id: Option<&str>, statblock: bool, bar: bool) -> RowElement {
        RowElement {
            test_id: id.map(str::to_string),
            statblock: statblock.then(|| StatBlock::from_lines(&["Games: 0 W: 0 L: 0 D: 0"])),
            wdl_bar: bar.then(WdlBar::default),
            ..Default::default()
        }
    }

    #[test]
    fn test_discover_skips_malformed_rows() {
        let doc = Document::new(vec![
            row(Some("1"), true, true),
            row(Some("2"), false, true),
            row(Some("3"), true, false),
            row(None, true, true),
            row(Some("x"), true, true),
            row(Some("4"), true, true),
        ]);
        let mut reg = Registry::new();
        assert_eq!(reg.discover(&doc), 2);
        let mut ids = reg.active_ids();
        ids.sort();
        assert_eq!(ids, vec![1, 4]);
        assert!(reg.get(1).unwrap().last_snapshot.is_none());
        assert!(reg.get(2).is_none());
    }

    #[test]
    fn test_duplicate_id_counted_once() {
        let doc = Document::new(vec![row(Some("1"), true, true), row(Some("1"), true, true)]);
        let mut reg = Registry::new();
        assert_eq!(reg.discover(&doc), 1);
        assert_eq!(reg.len(), 1);
        // later row wins
        assert!(Arc::ptr_eq(&reg.get(1).unwrap().row, &doc.rows()[1]));
    }

    #[test]
    fn test_anchor_points_at_page_row() {
        let doc = Document::new(vec![row(Some("9"), true, true)]);
        let mut reg = Registry::new();
        reg.discover(&doc);
        lock_row(&reg.get(9).unwrap().row).unwrap().background = "x".into();
        assert_eq!(doc.snapshot_rows()[0].background, "x");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let doc = Document::new(vec![row(Some("1"), true, true)]);
        let mut reg = Registry::new();
        reg.discover(&doc);
        assert!(reg.remove(1).is_some());
        assert!(reg.remove(1).is_none());
        assert!(reg.is_empty());
        assert!(reg.active_ids().is_empty());
    }
}
