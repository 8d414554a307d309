//! Minimal visual patches for one row: the W/D/L bar and the statblock text.
//!
//! The statblock is patched by line surgery. The surrounding template (LLR
//! bounds, elo estimates, timestamps, ...) is produced server side, so only
//! the three marker lines are touched and every other line is kept verbatim.

use crate::page::{lock_row, RowHandle, StatBlock, WdlBar, LINE_BREAK};
use crate::snapshot::Snapshot;

pub const GAMES_MARKER: &str = "Games:";
pub const PTNML_MARKER: &str = "Ptnml";
pub const LLR_MARKER: &str = "LLR:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Patched,
    /// Bar left untouched, no percentages exist for zero games.
    ZeroGames,
    /// The named sub-element is missing; this step is skipped for the row.
    MissingAnchor(&'static str),
}

pub fn percent(part: u64, games: u64) -> f64 {
    part as f64 / games as f64 * 100.0
}

/// Resize and relabel the three bar segments (win, draw, loss).
///
/// Percentages are not normalised; independent rounding may leave the sum
/// slightly off 100.
pub fn render_bar(bar: &mut WdlBar, s: &Snapshot) -> RenderOutcome {
    if s.games == 0 {
        return RenderOutcome::ZeroGames;
    }
    if bar.segments.len() != 3 {
        return RenderOutcome::MissingAnchor("wdl-segment");
    }

    let parts = [("Wins", s.wins), ("Draws", s.draws), ("Losses", s.losses)];
    for (segment, (label, count)) in bar.segments.iter_mut().zip(parts) {
        let pct = percent(count, s.games);
        segment.width = format!("{}%", pct);
        segment.title = format!("{}: {} ({:.1}%)", label, count, pct);
    }
    RenderOutcome::Patched
}

pub fn games_line(s: &Snapshot) -> String {
    format!("Games: {} W: {} L: {} D: {}", s.games, s.wins, s.losses, s.draws)
}

pub fn ptnml_line(s: &Snapshot) -> String {
    let [ll, ld, dd, dw, ww] = s.pentanomial();
    format!("Ptnml(0-2): {}, {}, {}, {}, {}", ll, ld, dd, dw, ww)
}

/// Swap the second space-separated token for the formatted LLR.
/// Lines with a single token are returned unchanged.
pub fn replace_llr_token(line: &str, llr: f64) -> String {
    let value = format!("{:.2}", llr);
    let mut parts: Vec<&str> = line.split(' ').collect();
    if parts.len() <= 1 {
        return line.to_string();
    }
    parts[1] = &value;
    parts.join(" ")
}

/// Rewrite the marker lines of a statblock's markup.
pub fn patch_stat_lines(markup: &str, s: &Snapshot) -> String {
    markup
        .split(LINE_BREAK)
        .map(|line| {
            let mut line = line.to_string();
            if line.contains(GAMES_MARKER) {
                line = games_line(s);
            }
            if line.contains(PTNML_MARKER) {
                line = ptnml_line(s);
            }
            if line.contains(LLR_MARKER) {
                if let Some(llr) = s.current_llr {
                    line = replace_llr_token(&line, llr);
                }
            }
            line
        })
        .collect::<Vec<_>>()
        .join(LINE_BREAK)
}

pub fn render_statblock(block: &mut StatBlock, s: &Snapshot) -> RenderOutcome {
    match block.strong.as_mut() {
        Some(markup) => {
            *markup = patch_stat_lines(markup, s);
            RenderOutcome::Patched
        }
        None => RenderOutcome::MissingAnchor("strong"),
    }
}

/// Outcome of both render steps for one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRender {
    pub bar: RenderOutcome,
    pub text: RenderOutcome,
}

/// Patch bar and statblock of a row. Each step is skipped on its own when
/// its element is gone.
pub fn render_row(row: &RowHandle, s: &Snapshot) -> RowRender {
    let Some(mut guard) = lock_row(row) else {
        return RowRender {
            bar: RenderOutcome::MissingAnchor("row"),
            text: RenderOutcome::MissingAnchor("row"),
        };
    };
    let bar = match guard.wdl_bar.as_mut() {
        Some(bar) => render_bar(bar, s),
        None => RenderOutcome::MissingAnchor("wdl-bar-container"),
    };
    let text = match guard.statblock.as_mut() {
        Some(block) => render_statblock(block, s),
        None => RenderOutcome::MissingAnchor("statblock"),
    };
    RowRender { bar, text }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{BarSegment, RowElement};
    use std::sync::{Arc, Mutex};

    fn snap() -> Snapshot {
        Snapshot {
            ll: 1,
            ld: 2,
            dd: 3,
            dw: 4,
            ww: 5,
            current_llr: Some(1.2345),
            ..Snapshot::with_counts(1, 1, 2)
        }
    }

    fn three_segments() -> WdlBar {
        WdlBar { segments: vec![BarSegment::default(); 3] }
    }

    #[test]
    fn test_bar_widths_and_titles() {
        let mut bar = three_segments();
        assert_eq!(render_bar(&mut bar, &snap()), RenderOutcome::Patched);
        assert_eq!(bar.segments[0].width, "25%");
        assert_eq!(bar.segments[0].title, "Wins: 1 (25.0%)");
        assert_eq!(bar.segments[1].title, "Draws: 1 (25.0%)");
        assert_eq!(bar.segments[2].width, "50%");
        assert_eq!(bar.segments[2].title, "Losses: 2 (50.0%)");
    }

    #[test]
    fn test_bar_thirds_are_not_normalised() {
        let mut bar = three_segments();
        render_bar(&mut bar, &Snapshot::with_counts(1, 1, 1));
        assert!(bar.segments[0].width.starts_with("33.33"));
        assert_eq!(bar.segments[0].title, "Wins: 1 (33.3%)");
    }

    #[test]
    fn test_zero_games_leaves_bar_alone() {
        let mut bar = WdlBar {
            segments: vec![
                BarSegment { width: "40%".into(), title: "Wins: 4 (40.0%)".into() },
                BarSegment { width: "20%".into(), title: String::new() },
                BarSegment { width: "40%".into(), title: String::new() },
            ],
        };
        let before = bar.clone();
        assert_eq!(render_bar(&mut bar, &Snapshot::with_counts(0, 0, 0)), RenderOutcome::ZeroGames);
        assert_eq!(bar, before);
    }

    #[test]
    fn test_bar_needs_three_segments() {
        let mut bar = WdlBar { segments: vec![BarSegment::default(); 2] };
        assert_eq!(render_bar(&mut bar, &snap()), RenderOutcome::MissingAnchor("wdl-segment"));
        assert!(bar.segments.iter().all(|s| s.width.is_empty()));
    }

    #[test]
    fn test_line_surgery_keeps_unrelated_lines() {
        let markup = [
            "LLR: 0.50 (-2.94, 2.94) [0.00, 5.00]",
            "Games: 8 W: 4 L: 2 D: 2",
            "Ptnml(0-2): 0, 1, 1, 1, 1",
            "Updated 2024-03-01 12:00 UTC",
        ]
        .join(LINE_BREAK);
        let out = patch_stat_lines(&markup, &snap());
        let lines: Vec<&str> = out.split(LINE_BREAK).collect();
        assert_eq!(lines[0], "LLR: 1.23 (-2.94, 2.94) [0.00, 5.00]");
        assert_eq!(lines[1], "Games: 4 W: 1 L: 2 D: 1");
        assert_eq!(lines[2], "Ptnml(0-2): 1, 2, 3, 4, 5");
        assert_eq!(lines[3], "Updated 2024-03-01 12:00 UTC");
    }

    #[test]
    fn test_null_llr_keeps_llr_line() {
        let markup = "LLR: 0.50 (-2.94, 2.94)<br>Games: 8 W: 4 L: 2 D: 2";
        let s = Snapshot { current_llr: None, ..snap() };
        let out = patch_stat_lines(markup, &s);
        assert!(out.starts_with("LLR: 0.50 (-2.94, 2.94)<br>"));
    }

    #[test]
    fn test_llr_token_single_word_line() {
        assert_eq!(replace_llr_token("LLR:", 1.0), "LLR:");
        assert_eq!(replace_llr_token("LLR: -0.004", -0.004), "LLR: -0.00");
    }

    #[test]
    fn test_statblock_without_strong_is_skipped() {
        let mut block = StatBlock::default();
        assert_eq!(render_statblock(&mut block, &snap()), RenderOutcome::MissingAnchor("strong"));
        assert!(block.strong.is_none());
    }

    #[test]
    fn test_render_row_skips_missing_parts_independently() {
        let row = Arc::new(Mutex::new(RowElement {
            test_id: Some("1".into()),
            statblock: Some(StatBlock::from_lines(&["Games: 0 W: 0 L: 0 D: 0"])),
            wdl_bar: None,
            ..Default::default()
        }));
        let out = render_row(&row, &snap());
        assert_eq!(out.bar, RenderOutcome::MissingAnchor("wdl-bar-container"));
        assert_eq!(out.text, RenderOutcome::Patched);
        let strong = row.lock().unwrap().statblock.clone().unwrap().strong.unwrap();
        assert_eq!(strong, "Games: 4 W: 1 L: 2 D: 1");
    }
}
