//! Headless VT buffer: wraps [`vt100::Parser`] with scrollback navigation
//! and the styled-line SGR emitter every pane's compositor pass reads
//! from.

use vt100::Parser;

/// Byte sequence for a cursor-position query (`ESC [ 6 n`, ECMA-48 DSR 6).
const DSR_CURSOR_QUERY: &[u8] = b"\x1b[6n";

/// Whether `bytes` contains an embedded DSR cursor-position query.
pub fn contains_dsr(bytes: &[u8]) -> bool {
    bytes
        .windows(DSR_CURSOR_QUERY.len())
        .any(|w| w == DSR_CURSOR_QUERY)
}

/// A pane's headless terminal emulator: scrollback of styled cells plus
/// the cursor and scroll-offset bookkeeping the compositor needs.
pub struct VtBuffer {
    parser: Parser,
    scrollback_limit: usize,
}

impl VtBuffer {
    pub fn new(rows: u16, cols: u16, scrollback: usize) -> Self {
        Self {
            parser: Parser::new(rows, cols, scrollback),
            scrollback_limit: scrollback,
        }
    }

    pub fn scrollback_limit(&self) -> usize {
        self.scrollback_limit
    }

    /// Feed raw PTY output into the emulator.
    pub fn process(&mut self, bytes: &[u8]) {
        self.parser.process(bytes);
    }

    /// Resize the emulator's grid.
    pub fn resize(&mut self, rows: u16, cols: u16) {
        self.parser.set_size(rows, cols);
    }

    /// Current cursor position as `(row, col)`, zero-based.
    pub fn cursor(&self) -> (u16, u16) {
        self.parser.screen().cursor_position()
    }

    /// Total buffered rows: the live viewport plus however much
    /// scrollback is actually available. `vt100` doesn't expose this
    /// directly, so it's measured by pushing the scrollback cursor to its
    /// clamped maximum and restoring whatever offset was there before.
    pub fn content_height(&mut self) -> u16 {
        let viewport = self.parser.screen().size().0;
        let current = self.parser.screen().scrollback();
        self.parser.screen_mut().set_scrollback(usize::MAX);
        let max_back = self.parser.screen().scrollback();
        self.parser.screen_mut().set_scrollback(current);
        viewport.saturating_add(max_back.min(u16::MAX as usize) as u16)
    }

    /// Scroll up (toward history) by `n` lines. `vt100` clamps internally
    /// to however much scrollback actually exists.
    pub fn scroll_up(&mut self, n: usize) {
        let current = self.parser.screen().scrollback();
        self.parser.screen_mut().set_scrollback(current.saturating_add(n));
    }

    /// Scroll down (toward the live tail) by `n` lines.
    pub fn scroll_down(&mut self, n: usize) {
        let current = self.parser.screen().scrollback();
        self.parser.screen_mut().set_scrollback(current.saturating_sub(n));
    }

    pub fn scroll_to_top(&mut self) {
        self.parser.screen_mut().set_scrollback(usize::MAX);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.parser.screen_mut().set_scrollback(0);
    }

    pub fn is_following_tail(&self) -> bool {
        self.parser.screen().scrollback() == 0
    }

    /// Plain (unstyled) text of row `i` of the current viewport.
    pub fn plain_line(&self, i: u16) -> String {
        self.parser
            .screen()
            .rows(i, i + 1)
            .next()
            .unwrap_or_default()
    }

    /// Row `i` of the current viewport, rendered as text with inline SGR
    /// escapes: one code run per contiguous span of identically-styled
    /// cells, minimal output (only codes that changed from the previous
    /// cell), a trailing reset if any styling was emitted, and trailing
    /// pure-default cells trimmed.
    pub fn styled_line(&self, i: u16) -> String {
        let screen = self.parser.screen();
        let (_, cols) = screen.size();

        let cells: Vec<(String, CellStyle)> = (0..cols)
            .map(|col| match screen.cell(i, col) {
                Some(c) => {
                    let text = c.contents();
                    let text = if text.is_empty() { " ".to_string() } else { text };
                    (text, CellStyle::from_cell(c))
                }
                None => (" ".to_string(), CellStyle::default()),
            })
            .collect();

        // Trailing cells that are both blank and unstyled are dropped;
        // anything styled (even if blank) is kept.
        let last_kept = cells
            .iter()
            .rposition(|(ch, style)| ch != " " || !style.is_default())
            .map(|idx| idx + 1)
            .unwrap_or(0);

        let mut out = String::new();
        let mut prev: Option<CellStyle> = None;
        let mut any_style = false;
        for (ch, style) in &cells[..last_kept] {
            if Some(style) != prev.as_ref() {
                out.push_str(&style.sgr_transition(prev.as_ref()));
                if !style.is_default() {
                    any_style = true;
                }
                prev = Some(style.clone());
            }
            out.push_str(ch);
        }

        if any_style {
            out.push_str("\x1b[0m");
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CellStyle {
    bold: bool,
    dim: bool,
    italic: bool,
    underline: bool,
    blink: bool,
    inverse: bool,
    invisible: bool,
    strikethrough: bool,
    fg: vt100::Color,
    bg: vt100::Color,
}

impl Default for CellStyle {
    fn default() -> Self {
        Self {
            bold: false,
            dim: false,
            italic: false,
            underline: false,
            blink: false,
            inverse: false,
            invisible: false,
            strikethrough: false,
            fg: vt100::Color::Default,
            bg: vt100::Color::Default,
        }
    }
}

impl CellStyle {
    // vt100's Cell exposes bold/italic/underline/inverse/fgcolor/bgcolor;
    // dim, blink, invisible and strikethrough aren't tracked by the
    // emulator and are always reported false.
    fn from_cell(cell: vt100::Cell) -> Self {
        Self {
            bold: cell.bold(),
            dim: false,
            italic: cell.italic(),
            underline: cell.underline(),
            blink: false,
            inverse: cell.inverse(),
            invisible: false,
            strikethrough: false,
            fg: cell.fgcolor(),
            bg: cell.bgcolor(),
        }
    }

    fn is_default(&self) -> bool {
        !self.bold
            && !self.dim
            && !self.italic
            && !self.underline
            && !self.blink
            && !self.inverse
            && !self.invisible
            && !self.strikethrough
            && self.fg == vt100::Color::Default
            && self.bg == vt100::Color::Default
    }

    /// Emit only the SGR codes that differ from `prev` (or, for `None`,
    /// all non-default codes), the way the spec's "only when the style
    /// changed from the previous cell" rule requires.
    fn sgr_transition(&self, prev: Option<&CellStyle>) -> String {
        let mut codes: Vec<String> = Vec::new();
        let changed = |field: bool, prev_field: bool| prev.is_none() && field || prev.is_some() && field != prev_field;

        let p = prev.cloned().unwrap_or_default();
        if self.is_default() && prev.is_some() {
            return "\x1b[0m".to_string();
        }
        if changed(self.bold, p.bold) && self.bold {
            codes.push("1".into());
        }
        if changed(self.dim, p.dim) && self.dim {
            codes.push("2".into());
        }
        if changed(self.italic, p.italic) && self.italic {
            codes.push("3".into());
        }
        if changed(self.underline, p.underline) && self.underline {
            codes.push("4".into());
        }
        if changed(self.blink, p.blink) && self.blink {
            codes.push("5".into());
        }
        if changed(self.inverse, p.inverse) && self.inverse {
            codes.push("7".into());
        }
        if changed(self.invisible, p.invisible) && self.invisible {
            codes.push("8".into());
        }
        if changed(self.strikethrough, p.strikethrough) && self.strikethrough {
            codes.push("9".into());
        }
        if self.fg != p.fg || prev.is_none() {
            if let Some(code) = fg_code(self.fg) {
                codes.push(code);
            }
        }
        if self.bg != p.bg || prev.is_none() {
            if let Some(code) = bg_code(self.bg) {
                codes.push(code);
            }
        }
        if codes.is_empty() {
            String::new()
        } else {
            format!("\x1b[{}m", codes.join(";"))
        }
    }
}

fn fg_code(color: vt100::Color) -> Option<String> {
    match color {
        vt100::Color::Default => None,
        vt100::Color::Idx(n) if n < 8 => Some(format!("{}", 30 + n)),
        vt100::Color::Idx(n) if n < 16 => Some(format!("{}", 90 + (n - 8))),
        vt100::Color::Idx(n) => Some(format!("38;5;{n}")),
        vt100::Color::Rgb(r, g, b) => Some(format!("38;2;{r};{g};{b}")),
    }
}

fn bg_code(color: vt100::Color) -> Option<String> {
    match color {
        vt100::Color::Default => None,
        vt100::Color::Idx(n) if n < 8 => Some(format!("{}", 40 + n)),
        vt100::Color::Idx(n) if n < 16 => Some(format!("{}", 100 + (n - 8))),
        vt100::Color::Idx(n) => Some(format!("48;5;{n}")),
        vt100::Color::Rgb(r, g, b) => Some(format!("48;2;{r};{g};{b}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_embedded_dsr_query() {
        assert!(contains_dsr(b"hello\x1b[6nworld"));
        assert!(!contains_dsr(b"hello world"));
    }

    #[test]
    fn plain_output_round_trips_through_vt() {
        let mut vt = VtBuffer::new(24, 80, 100);
        vt.process(b"hello");
        assert!(vt.plain_line(0).starts_with("hello"));
    }

    #[test]
    fn bold_text_emits_sgr_and_reset() {
        let mut vt = VtBuffer::new(24, 80, 100);
        vt.process(b"\x1b[1mhi\x1b[0m");
        let line = vt.styled_line(0);
        assert!(line.contains("\x1b[1m"));
        assert!(line.ends_with("\x1b[0m"));
    }

    #[test]
    fn scroll_up_then_to_bottom_restores_tail_follow() {
        let mut vt = VtBuffer::new(5, 80, 1000);
        for i in 0..50 {
            vt.process(format!("line {i}\r\n").as_bytes());
        }
        vt.scroll_up(5);
        assert!(!vt.is_following_tail());
        vt.scroll_to_bottom();
        assert!(vt.is_following_tail());
    }
}
