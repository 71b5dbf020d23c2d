//! Highlight overlay passes (spec §4.3.5): search matches, visual
//! selection, and the normal-mode virtual cursor, layered atop a styled
//! line without disturbing the SGR the VT buffer already emitted.
//!
//! Each pass walks the line character-by-character, copying existing SGR
//! escapes through untouched, and wraps the visible columns inside a
//! highlighted range with an SGR prologue/epilogue pair. Passes compose:
//! apply search first, then visual, then the cursor, so later passes win
//! on overlapping columns.

use std::ops::Range;

/// Split a styled line into tokens: either a literal `ESC [ ... letter`
/// escape sequence (passed through untouched) or a single visible
/// character (counted toward the column index highlighting operates on).
enum Token {
    Escape(String),
    Char(char),
}

fn tokenize(line: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            let mut seq = String::from("\x1b[");
            chars.next();
            for next in chars.by_ref() {
                seq.push(next);
                if next.is_ascii_alphabetic() {
                    break;
                }
            }
            out.push(Token::Escape(seq));
        } else {
            out.push(Token::Char(c));
        }
    }
    out
}

/// Wrap visible columns in `range` (0-based, end-exclusive) with `on`
/// before the first matched character and `off` after the last.
fn wrap_range(line: &str, range: Range<usize>, on: &str, off: &str) -> String {
    if range.is_empty() {
        return line.to_string();
    }
    let mut out = String::new();
    let mut col = 0usize;
    let mut inside = false;
    for token in tokenize(line) {
        match token {
            Token::Escape(seq) => out.push_str(&seq),
            Token::Char(c) => {
                let in_range = range.contains(&col);
                if in_range && !inside {
                    out.push_str(on);
                    inside = true;
                } else if !in_range && inside {
                    out.push_str(off);
                    inside = false;
                }
                out.push(c);
                col += 1;
            }
        }
    }
    if inside {
        out.push_str(off);
    }
    out
}

/// Highlight every search match in `matches` (yellow background); the
/// entry equal to `current` is rendered inverse-yellow-on-black instead.
pub fn apply_search(line: &str, matches: &[Range<usize>], current: Option<&Range<usize>>) -> String {
    let mut out = line.to_string();
    for m in matches {
        let is_current = current == Some(m);
        out = if is_current {
            wrap_range(&out, m.clone(), "\x1b[7;33;40m", "\x1b[27;39;49m")
        } else {
            wrap_range(&out, m.clone(), "\x1b[43m", "\x1b[49m")
        };
    }
    out
}

/// Highlight a visual-mode selection (inverse video).
pub fn apply_visual(line: &str, selection: Range<usize>) -> String {
    wrap_range(line, selection, "\x1b[7m", "\x1b[27m")
}

/// Render the normal-mode virtual cursor at `col` (inverse-underline, one
/// cell wide).
pub fn apply_cursor(line: &str, col: usize) -> String {
    wrap_range(line, col..col + 1, "\x1b[7;4m", "\x1b[27;24m")
}
