//! Frame assembly: one output chunk per draw, wrapped in DEC 2026
//! synchronized-update markers so a terminal never paints a half-updated
//! screen (spec §4.3.1, testable property 8 / scenario S6).

use crate::layout::Rect;

const SYNC_BEGIN: &str = "\x1b[?2026h";
const SYNC_END: &str = "\x1b[?2026l";
const HIDE_CURSOR: &str = "\x1b[?25l";
const SHOW_CURSOR: &str = "\x1b[?25h";

fn cup(row: u16, col: u16) -> String {
    format!("\x1b[{};{}H", row + 1, col + 1)
}

/// One pane's drawable content: absolute bounds (including the tab-bar
/// row offset already applied by the caller) and its highlighted lines,
/// one per row, already clipped/padded to `bounds.width`.
pub struct PaneFrame {
    pub bounds: Rect,
    pub lines: Vec<String>,
}

/// Everything [`assemble`] needs to build one synchronized frame.
pub struct FrameInput<'a> {
    pub tab_bar: &'a str,
    pub status_bar: &'a str,
    pub status_row: u16,
    pub panes: &'a [PaneFrame],
    /// Borders between siblings: absolute `(row, col)` cells and the glyph
    /// to paint (`'│'` or `'─'`).
    pub borders: &'a [(u16, u16, char)],
    /// Cursor to paint at `(row, col)` — only set when the focused pane is
    /// in insert mode, not locked, and not reflowing (spec §4.3.1).
    pub agent_cursor: Option<(u16, u16)>,
}

/// Assemble one full-screen redraw as a single byte sequence. The whole
/// sequence is wrapped in DEC 2026 synchronized-update markers so a
/// terminal applies it atomically.
pub fn assemble(input: &FrameInput) -> String {
    let mut out = String::new();
    out.push_str(SYNC_BEGIN);
    out.push_str(HIDE_CURSOR);

    out.push_str(&cup(0, 0));
    out.push_str(input.tab_bar);

    for pane in input.panes {
        for (row_idx, line) in pane.lines.iter().enumerate() {
            out.push_str(&cup(pane.bounds.y + row_idx as u16, pane.bounds.x));
            out.push_str(line);
        }
    }

    for &(row, col, glyph) in input.borders {
        out.push_str(&cup(row, col));
        out.push(glyph);
    }

    out.push_str(&cup(input.status_row, 0));
    out.push_str(input.status_bar);

    if let Some((row, col)) = input.agent_cursor {
        out.push_str(&cup(row, col));
        out.push_str(SHOW_CURSOR);
    }

    out.push_str(SYNC_END);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_is_wrapped_in_sync_markers() {
        let input = FrameInput {
            tab_bar: "tabs",
            status_bar: "status",
            status_row: 23,
            panes: &[],
            borders: &[],
            agent_cursor: None,
        };
        let frame = assemble(&input);
        assert!(frame.starts_with(SYNC_BEGIN));
        assert!(frame.ends_with(SYNC_END));
    }

    #[test]
    fn pane_content_is_positioned_with_cup() {
        let panes = vec![PaneFrame {
            bounds: Rect::new(0, 1, 80, 20),
            lines: vec!["hello".to_string()],
        }];
        let input = FrameInput {
            tab_bar: "",
            status_bar: "",
            status_row: 23,
            panes: &panes,
            borders: &[],
            agent_cursor: None,
        };
        let frame = assemble(&input);
        assert!(frame.contains("\x1b[2;1H"));
        assert!(frame.contains("hello"));
    }
}
