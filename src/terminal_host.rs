//! Owns the real terminal: raw mode, alt-screen, SGR-1006 mouse
//! reporting, and OS signal wiring (spec §4.9, C9).
//!
//! SIGWINCH is watched the way the teacher's `tui::runner` does it — a
//! `signal_hook` flag polled by the loop — since a plain boolean is
//! cheaper than a dedicated tokio signal stream for a condition checked
//! every tick anyway. SIGINT/SIGTERM/SIGTSTP/SIGCONT instead go through
//! `tokio::signal::unix`, since the event loop is already `select!`-based
//! and those are rare, one-shot transitions worth suspending on.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossterm::event::{KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};

use crate::error::Result;

const HIDE_CURSOR: &str = "\x1b[?25l";
const SHOW_CURSOR: &str = "\x1b[?25h";
const ENABLE_MOUSE: &str = "\x1b[?1000h\x1b[?1006h";
const DISABLE_MOUSE: &str = "\x1b[?1006l\x1b[?1000l";

/// A decoded mouse action, translated from the raw SGR-1006 sequence
/// into something the dispatcher can act on directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
    FocusAt { x: u16, y: u16 },
    ScrollAt { x: u16, y: u16, delta: i64 },
    ResizeVertical { x: u16, y: u16, delta: i32 },
    ResizeHorizontal { x: u16, y: u16, delta: i32 },
}

/// Decode a crossterm [`MouseEvent`] into a [`MouseAction`] per spec
/// §4.9's bit-level mouse parsing description (crossterm already does
/// the CSI parsing; this function only maps the semantics).
pub fn decode_mouse_event(event: &MouseEvent) -> Option<MouseAction> {
    let ctrl = event.modifiers.contains(crossterm::event::KeyModifiers::CONTROL);
    let shift_or_alt = event.modifiers.contains(crossterm::event::KeyModifiers::SHIFT)
        || event.modifiers.contains(crossterm::event::KeyModifiers::ALT);

    match event.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            Some(MouseAction::FocusAt { x: event.column.saturating_sub(1), y: event.row.saturating_sub(1) })
        }
        MouseEventKind::ScrollUp if ctrl => {
            Some(MouseAction::ResizeVertical { x: event.column, y: event.row, delta: -1 })
        }
        MouseEventKind::ScrollDown if ctrl => {
            Some(MouseAction::ResizeVertical { x: event.column, y: event.row, delta: 1 })
        }
        MouseEventKind::ScrollUp if shift_or_alt => {
            Some(MouseAction::ResizeHorizontal { x: event.column, y: event.row, delta: -1 })
        }
        MouseEventKind::ScrollDown if shift_or_alt => {
            Some(MouseAction::ResizeHorizontal { x: event.column, y: event.row, delta: 1 })
        }
        // Scrolling up moves away from the live tail (further into
        // history); scrolling down moves back toward it — same sign
        // convention `Compositor::scroll_pane` and `VtBuffer::scroll_up`/
        // `scroll_down` use.
        MouseEventKind::ScrollUp => {
            Some(MouseAction::ScrollAt { x: event.column, y: event.row, delta: 3 })
        }
        MouseEventKind::ScrollDown => {
            Some(MouseAction::ScrollAt { x: event.column, y: event.row, delta: -3 })
        }
        _ => None,
    }
}

/// A decoded keystroke or resize/signal notification from the terminal.
#[derive(Debug, Clone)]
pub enum HostEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize { cols: u16, rows: u16 },
    Suspend,
    Resume,
    Shutdown,
}

/// Enters and leaves every terminal mode the multiplexer needs, and owns
/// the SIGWINCH flag the loop polls each tick.
pub struct TerminalHost {
    resize_flag: Arc<AtomicBool>,
    active: bool,
}

impl TerminalHost {
    pub fn new() -> Self {
        Self { resize_flag: Arc::new(AtomicBool::new(false)), active: false }
    }

    /// Enter alt-screen, raw mode, and SGR-1006 mouse reporting; hide the
    /// real cursor; register the SIGWINCH flag.
    pub fn start(&mut self) -> Result<()> {
        enable_raw_mode()?;
        execute!(std::io::stdout(), EnterAlternateScreen)?;
        let mut stdout = std::io::stdout();
        stdout.write_all(HIDE_CURSOR.as_bytes())?;
        stdout.write_all(ENABLE_MOUSE.as_bytes())?;
        stdout.flush()?;

        #[cfg(unix)]
        {
            use signal_hook::consts::signal::SIGWINCH;
            let _ = signal_hook::flag::register(SIGWINCH, Arc::clone(&self.resize_flag));
        }

        self.active = true;
        Ok(())
    }

    /// Reverse every mode `start` entered. Idempotent: a no-op if never
    /// started or already stopped, so cleanup paths can call it freely.
    pub fn stop(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        let mut stdout = std::io::stdout();
        stdout.write_all(DISABLE_MOUSE.as_bytes())?;
        stdout.write_all(SHOW_CURSOR.as_bytes())?;
        stdout.flush()?;
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;
        self.active = false;
        Ok(())
    }

    /// Check and clear the SIGWINCH flag; `true` means a resize happened
    /// since the last check.
    pub fn take_resize(&self) -> bool {
        self.resize_flag.swap(false, Ordering::SeqCst)
    }

    /// Undo terminal modes ahead of SIGTSTP, without clearing `active` —
    /// `on_resume` expects to redo them.
    pub fn suspend_modes(&self) -> Result<()> {
        let mut stdout = std::io::stdout();
        stdout.write_all(DISABLE_MOUSE.as_bytes())?;
        stdout.write_all(SHOW_CURSOR.as_bytes())?;
        stdout.flush()?;
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;
        Ok(())
    }

    /// Redo terminal modes after SIGCONT.
    pub fn resume_modes(&self) -> Result<()> {
        enable_raw_mode()?;
        execute!(std::io::stdout(), EnterAlternateScreen)?;
        let mut stdout = std::io::stdout();
        stdout.write_all(HIDE_CURSOR.as_bytes())?;
        stdout.write_all(ENABLE_MOUSE.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

impl Default for TerminalHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Send `signal` to every PTY child's process group (SIGSTOP/SIGCONT
/// forwarding on SIGTSTP/SIGCONT, spec §4.9).
#[cfg(unix)]
pub fn forward_signal_to_pid(pid: u32, signal: nix::sys::signal::Signal) {
    let pid = nix::unistd::Pid::from_raw(pid as i32);
    let _ = nix::sys::signal::kill(pid, signal);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyModifiers, MouseButton, MouseEventKind};

    fn mouse(kind: MouseEventKind, modifiers: KeyModifiers) -> MouseEvent {
        MouseEvent { kind, column: 10, row: 5, modifiers }
    }

    #[test]
    fn left_click_focuses_zero_indexed_pane() {
        let event = mouse(MouseEventKind::Down(MouseButton::Left), KeyModifiers::NONE);
        assert_eq!(decode_mouse_event(&event), Some(MouseAction::FocusAt { x: 9, y: 4 }));
    }

    #[test]
    fn plain_scroll_moves_pane_by_three() {
        let event = mouse(MouseEventKind::ScrollDown, KeyModifiers::NONE);
        assert_eq!(decode_mouse_event(&event), Some(MouseAction::ScrollAt { x: 10, y: 5, delta: -3 }));
    }

    #[test]
    fn ctrl_scroll_resizes_vertical_border() {
        let event = mouse(MouseEventKind::ScrollUp, KeyModifiers::CONTROL);
        assert_eq!(decode_mouse_event(&event), Some(MouseAction::ResizeVertical { x: 10, y: 5, delta: -1 }));
    }

    #[test]
    fn shift_scroll_resizes_horizontal_border() {
        let event = mouse(MouseEventKind::ScrollDown, KeyModifiers::SHIFT);
        assert_eq!(decode_mouse_event(&event), Some(MouseAction::ResizeHorizontal { x: 10, y: 5, delta: 1 }));
    }
}
