//! Poll loop and per-job update step for one page session.
//!
//! A `Session` owns everything that used to be page-global: the registry of
//! watched tests, the loop state, the (single) poll timer and the pending
//! reload. All mutation happens through `&mut self` on the control task, so
//! no locking is involved beyond the row handles.
//!
//! Loop states:
//!
//! ```text
//!   Idle --start--> Running --stop / drained--> Idle
//!                      |  ^
//!                pause |  | resume (only while tests remain)
//!                      v  |
//!                   Suspended
//! ```

use serde_json::Value;
use std::sync::Arc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::config::Config;
use crate::differ::{self, UpdatePlan};
use crate::highlight::Highlighter;
use crate::logging::{debug, info, obj, v_num, v_str, v_u64, warn, Domain};
use crate::page::Document;
use crate::registry::Registry;
use crate::render::{render_row, RowRender};
use crate::snapshot::{JobId, Snapshot};
use crate::source::StatsSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Suspended,
}

/// What one update step did to one job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobUpdate {
    pub id: JobId,
    pub plan: UpdatePlan,
    pub render: Option<RowRender>,
    pub flashed: bool,
    pub finished: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// No tests left; the loop stopped itself.
    Drained,
    /// Request or body failed; nothing was touched.
    FetchFailed,
    /// Updates in response order. Ids the registry no longer tracks are skipped.
    Applied(Vec<JobUpdate>),
}

pub struct Session {
    cfg: Config,
    registry: Registry,
    source: Arc<dyn StatsSource>,
    highlighter: Highlighter,
    state: LoopState,
    timer: Option<Interval>,
    cycles: u64,
    discovered: bool,
    reload_at: Option<Instant>,
}

impl Session {
    pub fn new(cfg: Config, source: Arc<dyn StatsSource>) -> Self {
        let highlighter = Highlighter::from_config(&cfg);
        Self {
            cfg,
            registry: Registry::new(),
            source,
            highlighter,
            state: LoopState::Idle,
            timer: None,
            cycles: 0,
            discovered: false,
            reload_at: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn timer_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Poll cycles that reached the fetch step.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn reload_at(&self) -> Option<Instant> {
        self.reload_at
    }

    pub fn discovered(&self) -> bool {
        self.discovered
    }

    /// Scan the page once. Later calls find nothing new and return 0.
    pub fn discover(&mut self, doc: &Document) -> usize {
        if self.discovered {
            return 0;
        }
        self.discovered = true;
        self.registry.discover(doc)
    }

    /// Poll right away, then every interval. No-op while already running.
    pub async fn start(&mut self) {
        if self.state == LoopState::Running || self.timer.is_some() {
            return;
        }
        self.state = LoopState::Running;
        self.poll_cycle().await;

        // the immediate cycle may already have found nothing to watch
        if self.state != LoopState::Running {
            return;
        }
        let period = self.cfg.poll_interval();
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.timer = Some(timer);
        debug(Domain::Poll, "timer_armed", obj(&[("interval_ms", v_u64(self.cfg.poll_interval_ms))]));
    }

    /// Cancel the timer. An in-flight fetch is not cancelled.
    pub fn stop(&mut self) {
        if self.timer.take().is_some() {
            info(Domain::Poll, "polling_stopped", obj(&[]));
        }
        self.state = LoopState::Idle;
    }

    /// Stop polling but remember to come back when the page is visible again.
    pub fn pause(&mut self) {
        self.timer = None;
        self.state = LoopState::Suspended;
        debug(Domain::Lifecycle, "paused", obj(&[("tracked", v_u64(self.registry.len() as u64))]));
    }

    /// Restart polling if any test is still being watched.
    pub async fn resume(&mut self) {
        if self.registry.is_empty() {
            // nothing left to poll; don't stay parked as Suspended
            if self.state == LoopState::Suspended {
                self.state = LoopState::Idle;
            }
            return;
        }
        debug(Domain::Lifecycle, "resumed", obj(&[("tracked", v_u64(self.registry.len() as u64))]));
        self.start().await;
    }

    /// Resolves on the next timer tick; never resolves while no timer is armed.
    pub async fn next_tick(&mut self) {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    pub async fn poll_cycle(&mut self) -> CycleOutcome {
        let ids = self.registry.active_ids();
        if ids.is_empty() {
            self.stop();
            return CycleOutcome::Drained;
        }

        self.cycles += 1;
        let cycle = self.cycles;
        let batch = match self.source.fetch_stats(&ids).await {
            Ok(batch) => batch,
            Err(e) => {
                warn(
                    Domain::Fetch,
                    "fetch_failed",
                    obj(&[("cycle", v_u64(cycle)), ("error", v_str(&format!("{:#}", e)))]),
                );
                return CycleOutcome::FetchFailed;
            }
        };

        for rejected in &batch.rejected {
            warn(
                Domain::Fetch,
                "entry_rejected",
                obj(&[("cycle", v_u64(cycle)), ("key", v_str(&rejected.key)), ("reason", v_str(&rejected.reason))]),
            );
        }

        let mut updates = Vec::with_capacity(batch.entries.len());
        for (id, snapshot) in batch.entries {
            if let Some(update) = self.apply_update(id, snapshot) {
                updates.push(update);
            }
        }
        debug(
            Domain::Poll,
            "cycle_done",
            obj(&[
                ("cycle", v_u64(cycle)),
                ("requested", v_u64(ids.len() as u64)),
                ("updated", v_u64(updates.len() as u64)),
                ("remaining", v_u64(self.registry.len() as u64)),
            ]),
        );
        CycleOutcome::Applied(updates)
    }

    /// Update step for one job. Returns `None` for ids not (or no longer)
    /// tracked.
    pub fn apply_update(&mut self, id: JobId, snapshot: Snapshot) -> Option<JobUpdate> {
        let job = self.registry.get_mut(id)?;
        if !snapshot.is_consistent() {
            warn(
                Domain::Fetch,
                "inconsistent_totals",
                obj(&[
                    ("job_id", v_u64(id)),
                    ("games", v_u64(snapshot.games)),
                    ("wdl_sum", snapshot.wdl_sum().map(v_u64).unwrap_or_else(|| v_str("overflow"))),
                ]),
            );
        }

        let plan = differ::plan(job.last_snapshot.as_ref(), &snapshot);
        let render = plan.render.then(|| render_row(&job.row, &snapshot));
        if let Some(out) = render {
            debug(
                Domain::Render,
                "row_rendered",
                obj(&[
                    ("job_id", v_u64(id)),
                    ("games", v_u64(snapshot.games)),
                    ("llr", snapshot.current_llr.map(v_num).unwrap_or(Value::Null)),
                    ("bar", v_str(&format!("{:?}", out.bar))),
                    ("text", v_str(&format!("{:?}", out.text))),
                ]),
            );
        }
        let flashed = plan.flash && self.highlighter.flash(&job.row).is_some();

        let finished = snapshot.finished;
        job.last_snapshot = Some(snapshot);

        if finished {
            self.registry.remove(id);
            info(
                Domain::Registry,
                "test_finished",
                obj(&[("job_id", v_u64(id)), ("remaining", v_u64(self.registry.len() as u64))]),
            );
            if self.registry.is_empty() {
                self.schedule_reload();
            }
        }

        Some(JobUpdate { id, plan, render, flashed, finished })
    }

    fn schedule_reload(&mut self) {
        if self.reload_at.is_some() {
            return;
        }
        self.reload_at = Some(Instant::now() + self.cfg.reload_delay());
        info(
            Domain::Lifecycle,
            "reload_scheduled",
            obj(&[("msg", v_str("all tests finished, reloading page")), ("delay_ms", v_u64(self.cfg.reload_delay_ms))]),
        );
    }
}
