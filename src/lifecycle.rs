//! Page lifecycle controller and the single control task that drives a
//! session.
//!
//! Page events arrive on a channel; timer ticks and the reload deadline come
//! from the session itself. Everything runs cooperatively on one task, so a
//! poll cycle (including its fetch) completes before the next event is looked
//! at and cycles never overlap.

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::logging::{info, obj, v_str, v_u64, Domain};
use crate::page::Document;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    /// Document finished loading.
    Ready,
    Hidden,
    Visible,
    BeforeUnload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Last test finished and the reload delay elapsed.
    Reload,
    /// Page is going away (unload event or event source closed).
    Unloaded,
}

/// Apply one page event. Returns an outcome when the session is over.
pub async fn handle_event(session: &mut Session, doc: &Document, event: PageEvent) -> Option<RunOutcome> {
    match event {
        PageEvent::Ready => {
            if session.discovered() {
                return None;
            }
            let found = session.discover(doc);
            if found > 0 {
                info(
                    Domain::Lifecycle,
                    "monitoring",
                    obj(&[("msg", v_str(&format!("monitoring {} active test(s)", found))), ("tests", v_u64(found as u64))]),
                );
                session.start().await;
            }
            None
        }
        PageEvent::Hidden => {
            session.pause();
            None
        }
        PageEvent::Visible => {
            session.resume().await;
            None
        }
        PageEvent::BeforeUnload => {
            session.pause();
            Some(RunOutcome::Unloaded)
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

/// Drive the session until the page reloads or unloads.
pub async fn run(session: &mut Session, doc: &Document, events: &mut mpsc::Receiver<PageEvent>) -> RunOutcome {
    loop {
        let reload_at = session.reload_at();
        tokio::select! {
            _ = sleep_until_opt(reload_at) => {
                session.stop();
                info(Domain::Lifecycle, "reload", obj(&[]));
                return RunOutcome::Reload;
            }
            event = events.recv() => {
                let Some(event) = event else {
                    session.pause();
                    return RunOutcome::Unloaded;
                };
                if let Some(outcome) = handle_event(session, doc, event).await {
                    return outcome;
                }
            }
            _ = session.next_tick() => {
                session.poll_cycle().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::page::{BarSegment, RowElement, StatBlock, WdlBar};
    use crate::replay::ReplayStatsSource;
    use crate::session::LoopState;
    use std::sync::Arc;

    fn doc() -> Document {
        Document::new(vec![RowElement {
            test_id: Some("1".into()),
            statblock: Some(StatBlock::from_lines(&["Games: 0 W: 0 L: 0 D: 0"])),
            wdl_bar: Some(WdlBar { segments: vec![BarSegment::default(); 3] }),
            ..Default::default()
        }])
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_with_no_rows_does_not_poll() {
        let src = Arc::new(ReplayStatsSource::default());
        let mut s = Session::new(Config::default(), src.clone());
        let out = handle_event(&mut s, &Document::default(), PageEvent::Ready).await;
        assert!(out.is_none());
        assert_eq!(s.state(), LoopState::Idle);
        assert!(src.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_then_visible() {
        let body = Some(r#"{"stats":{}}"#.to_string());
        let src = Arc::new(ReplayStatsSource::new(vec![body.clone(), body]));
        let mut s = Session::new(Config::default(), src.clone());
        let page = doc();

        handle_event(&mut s, &page, PageEvent::Ready).await;
        assert_eq!(s.state(), LoopState::Running);

        handle_event(&mut s, &page, PageEvent::Hidden).await;
        assert_eq!(s.state(), LoopState::Suspended);
        assert!(!s.timer_armed());

        handle_event(&mut s, &page, PageEvent::Visible).await;
        assert_eq!(s.state(), LoopState::Running);
        assert!(s.timer_armed());
        assert_eq!(src.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_ready_is_ignored() {
        let body = Some(r#"{"stats":{}}"#.to_string());
        let src = Arc::new(ReplayStatsSource::new(vec![body]));
        let mut s = Session::new(Config::default(), src.clone());
        let page = doc();
        handle_event(&mut s, &page, PageEvent::Ready).await;
        handle_event(&mut s, &page, PageEvent::Ready).await;
        assert_eq!(src.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unload_ends_run() {
        let mut s = Session::new(Config::default(), Arc::new(ReplayStatsSource::default()));
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(PageEvent::BeforeUnload).await.unwrap();
        let out = run(&mut s, &Document::default(), &mut rx).await;
        assert_eq!(out, RunOutcome::Unloaded);
        assert_eq!(s.state(), LoopState::Suspended);
    }
}
