//! Vim-modal input router: a Mealy machine over crossterm key events that
//! translates keystrokes into [`Action`] descriptors without executing
//! anything itself (spec §4.4).

pub mod action;
pub mod keymap;

pub use action::{Action, Mode, Motion, Operator, PageScroll};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::bus::{Performative, PromptStyle};
use crate::layout::{Direction, Orientation};

/// Transient submode entered after the `Ctrl-Space` prefix chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingPrefix {
    None,
    /// Awaiting the submode-selecting byte right after `Ctrl-Space`.
    Root,
    Layout,
    Fipa,
}

/// The input router's full state. Constructed once per session; one
/// instance serves the whole multiplexer since only the focused pane's
/// agent receives forwarded bytes.
pub struct InputRouter {
    mode: Mode,
    prefix: PendingPrefix,
    awaiting_register: bool,
    pending_operator: Option<Operator>,
    pending_g: bool,
    pending_count: String,
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl InputRouter {
    pub fn new() -> Self {
        Self {
            mode: Mode::Insert,
            prefix: PendingPrefix::None,
            awaiting_register: false,
            pending_operator: None,
            pending_g: false,
            pending_count: String::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn take_count(&mut self) -> u32 {
        let n = self.pending_count.parse().unwrap_or(1).max(1);
        self.pending_count.clear();
        n
    }

    fn reset_transients(&mut self) {
        self.prefix = PendingPrefix::None;
        self.awaiting_register = false;
        self.pending_operator = None;
        self.pending_g = false;
        self.pending_count.clear();
    }

    /// Translate one key event into an action. Never performs I/O; the
    /// caller (the dispatcher) executes whatever the descriptor names.
    pub fn handle(&mut self, key: &KeyEvent) -> Action {
        let ctrl_space = key.code == KeyCode::Null
            || (key.code == KeyCode::Char(' ') && key.modifiers.contains(KeyModifiers::CONTROL));

        if ctrl_space && self.prefix == PendingPrefix::None {
            self.prefix = PendingPrefix::Root;
            return Action::Noop;
        }

        if key.code == KeyCode::Esc {
            return self.handle_escape();
        }

        match self.prefix {
            PendingPrefix::Root => self.handle_root_prefix(key),
            PendingPrefix::Layout => self.handle_layout_prefix(key),
            PendingPrefix::Fipa => self.handle_fipa_prefix(key),
            PendingPrefix::None => self.handle_unprefixed(key),
        }
    }

    fn handle_escape(&mut self) -> Action {
        if self.mode == Mode::Insert && self.prefix == PendingPrefix::None {
            return Action::ForwardToAgent(vec![0x1b]);
        }
        // Any other mode/prefix: cancel back toward normal, then insert.
        if self.prefix != PendingPrefix::None
            || self.awaiting_register
            || self.pending_operator.is_some()
            || !self.pending_count.is_empty()
        {
            self.reset_transients();
            return Action::Cancel;
        }
        match self.mode {
            Mode::Normal => {
                self.mode = Mode::Insert;
                Action::SwitchMode(Mode::Insert)
            }
            Mode::Visual | Mode::VisualLine => {
                self.mode = Mode::Normal;
                Action::VisualCancel
            }
            Mode::Search | Mode::Command | Mode::Chat => {
                self.mode = Mode::Normal;
                Action::Cancel
            }
            Mode::Insert => Action::ForwardToAgent(vec![0x1b]),
        }
    }

    fn handle_root_prefix(&mut self, key: &KeyEvent) -> Action {
        self.prefix = PendingPrefix::None;
        let Some(c) = keymap::plain_char(key) else {
            return Action::Noop;
        };
        match c {
            'n' => self.switch_mode(Mode::Normal),
            'i' => self.switch_mode(Mode::Insert),
            'v' => self.switch_mode(Mode::Visual),
            'V' => self.switch_mode(Mode::VisualLine),
            'c' => self.switch_mode(Mode::Chat),
            'w' => {
                self.prefix = PendingPrefix::Layout;
                Action::Noop
            }
            'f' => {
                self.prefix = PendingPrefix::Fipa;
                Action::Noop
            }
            'a' => Action::Noop, // IPC sub-prefix: out of scope beyond acknowledging the chord.
            '1'..='9' => Action::SwitchTab(c as u8 - b'1'),
            '[' => Action::PrevTab,
            ']' => Action::NextTab,
            '/' => {
                self.mode = Mode::Search;
                Action::BeginSearch { forward: true }
            }
            '?' => {
                self.mode = Mode::Search;
                Action::BeginSearch { forward: false }
            }
            ':' => {
                self.mode = Mode::Command;
                Action::BeginExCommand
            }
            'q' => Action::Quit { force: false },
            'Q' => Action::QuitAll { force: true },
            'S' => Action::Save,
            'H' => Action::Help,
            _ => Action::Noop,
        }
    }

    fn switch_mode(&mut self, mode: Mode) -> Action {
        self.mode = mode;
        Action::SwitchMode(mode)
    }

    fn handle_layout_prefix(&mut self, key: &KeyEvent) -> Action {
        self.prefix = PendingPrefix::None;
        let Some(c) = keymap::plain_char(key) else {
            return Action::Noop;
        };
        match c {
            'h' => Action::FocusDirection(Direction::Left),
            'j' => Action::FocusDirection(Direction::Down),
            'k' => Action::FocusDirection(Direction::Up),
            'l' => Action::FocusDirection(Direction::Right),
            'w' => Action::CycleFocus(1),
            'W' => Action::CycleFocus(-1),
            's' => Action::Split(Orientation::Horizontal),
            'v' => Action::Split(Orientation::Vertical),
            'c' => Action::CloseFocused,
            'o' => Action::CloseOthers,
            'z' => Action::ToggleZoom,
            '=' => Action::Equalize,
            '+' => Action::ResizeHeight(0.05),
            '-' => Action::ResizeHeight(-0.05),
            '>' => Action::ResizeWidth(0.05),
            '<' => Action::ResizeWidth(-0.05),
            'x' => Action::Swap,
            'r' => Action::Rotate,
            _ => Action::Noop,
        }
    }

    fn handle_fipa_prefix(&mut self, key: &KeyEvent) -> Action {
        self.prefix = PendingPrefix::None;
        let Some(c) = keymap::plain_char(key) else {
            return Action::Noop;
        };
        match c {
            'r' => Action::BeginFipaCompose(Performative::Request),
            'i' => Action::BeginFipaCompose(Performative::Inform),
            'q' => Action::BeginFipaCompose(Performative::QueryIf),
            'Q' => Action::BeginFipaCompose(Performative::QueryRef),
            'c' => Action::BeginFipaCompose(Performative::Cfp),
            'p' => Action::BeginFipaCompose(Performative::Propose),
            'A' => Action::BeginFipaCompose(Performative::AcceptProposal),
            'R' => Action::BeginFipaCompose(Performative::RejectProposal),
            'a' => Action::BeginFipaCompose(Performative::Agree),
            'f' => Action::BeginFipaCompose(Performative::Refuse),
            'F' => Action::BeginFipaCompose(Performative::Failure),
            's' => Action::BeginFipaCompose(Performative::Subscribe),
            'l' => Action::FipaListConversations,
            'v' => Action::FipaViewConversation,
            'x' => Action::FipaCancelConversation,
            '1' => Action::FipaSetStyle(PromptStyle::Structured),
            '2' => Action::FipaSetStyle(PromptStyle::Natural),
            '3' => Action::FipaSetStyle(PromptStyle::Minimal),
            'h' => Action::Help,
            _ => Action::Noop,
        }
    }

    fn handle_unprefixed(&mut self, key: &KeyEvent) -> Action {
        match self.mode {
            Mode::Insert => {
                if let Some(bytes) = keymap::key_to_pty_bytes(key) {
                    Action::ForwardToAgent(bytes)
                } else {
                    Action::Noop
                }
            }
            Mode::Search | Mode::Command | Mode::Chat => self.handle_text_entry(key),
            Mode::Normal | Mode::Visual | Mode::VisualLine => self.handle_normal_like(key),
        }
    }

    /// Search/command/chat modes accumulate raw text until Enter; this
    /// router only reports the keystroke shape, buffering is the
    /// dispatcher's job (it owns the composer overlay's text).
    fn handle_text_entry(&mut self, key: &KeyEvent) -> Action {
        match key.code {
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                Action::SubmitExCommand(String::new())
            }
            KeyCode::Char(c) => Action::ChatInput(c.to_string()),
            KeyCode::Backspace => Action::ChatInput("\u{8}".to_string()),
            _ => Action::Noop,
        }
    }

    fn handle_normal_like(&mut self, key: &KeyEvent) -> Action {
        if self.awaiting_register {
            self.awaiting_register = false;
            if let Some(c) = keymap::plain_char(key) {
                if c.is_ascii_alphanumeric() || c == '"' || c == '+' || c == '*' {
                    return Action::SetRegister(c);
                }
            }
            return Action::Cancel;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if let KeyCode::Char(c) = key.code {
                if let Some(page) = page_scroll_for_char(c) {
                    return Action::PageScroll(page);
                }
            }
        }

        let Some(c) = keymap::plain_char(key) else {
            return Action::Noop;
        };

        if c.is_ascii_digit() && !(c == '0' && self.pending_count.is_empty()) {
            self.pending_count.push(c);
            return Action::PushCountDigit(c);
        }

        if c == '"' {
            self.awaiting_register = true;
            return Action::RegisterPrefix;
        }

        if self.pending_g {
            self.pending_g = false;
            if c == 'g' {
                return self.resolve_motion(Motion::BufferStart);
            }
            return Action::Cancel;
        }
        if c == 'g' {
            self.pending_g = true;
            return Action::Noop;
        }

        if let Some(op) = self.pending_operator {
            return self.resolve_operator_motion(op, c);
        }

        match c {
            'y' => {
                self.pending_operator = Some(Operator::Yank);
                Action::OperatorPending(Operator::Yank)
            }
            'd' => {
                self.pending_operator = Some(Operator::Delete);
                Action::OperatorPending(Operator::Delete)
            }
            'i' => self.switch_mode(Mode::Insert),
            'v' => {
                if self.mode == Mode::Visual {
                    self.switch_mode(Mode::Normal)
                } else {
                    self.switch_mode(Mode::Visual)
                }
            }
            'V' => {
                if self.mode == Mode::VisualLine {
                    self.switch_mode(Mode::Normal)
                } else {
                    self.switch_mode(Mode::VisualLine)
                }
            }
            ':' => {
                self.mode = Mode::Command;
                Action::BeginExCommand
            }
            'n' => Action::SearchNext,
            'N' => Action::SearchPrev,
            'p' => Action::Paste { before: false },
            'P' => Action::Paste { before: true },
            'x' if self.mode != Mode::Normal => Action::OperatorMotion {
                operator: Operator::Delete,
                motion: Motion::Right,
                count: self.take_count(),
            },
            _ => self.resolve_bare_motion(c),
        }
    }

    fn resolve_motion(&mut self, motion: Motion) -> Action {
        let count = self.take_count();
        Action::Motion { motion, count }
    }

    fn resolve_bare_motion(&mut self, c: char) -> Action {
        match motion_for_char(c) {
            Some(motion) => self.resolve_motion(motion),
            None => Action::Noop,
        }
    }

    fn resolve_operator_motion(&mut self, op: Operator, c: char) -> Action {
        self.pending_operator = None;
        let count = self.take_count();
        // `yy`/`dd` operate on the whole line.
        let same_as_op = (op == Operator::Yank && c == 'y') || (op == Operator::Delete && c == 'd');
        if same_as_op {
            return Action::OperatorMotion { operator: op, motion: Motion::Line, count };
        }
        match motion_for_char(c) {
            Some(motion) => Action::OperatorMotion { operator: op, motion, count },
            None => Action::Cancel,
        }
    }
}

fn page_scroll_for_char(c: char) -> Option<PageScroll> {
    Some(match c.to_ascii_lowercase() {
        'd' => PageScroll::HalfDown,
        'u' => PageScroll::HalfUp,
        'f' => PageScroll::FullDown,
        'b' => PageScroll::FullUp,
        _ => return None,
    })
}

fn motion_for_char(c: char) -> Option<Motion> {
    Some(match c {
        'h' => Motion::Left,
        'j' => Motion::Down,
        'k' => Motion::Up,
        'l' => Motion::Right,
        'w' => Motion::WordForward,
        'W' => Motion::WordForwardBig,
        'e' => Motion::WordEnd,
        'E' => Motion::WordEndBig,
        'b' => Motion::WordBack,
        'B' => Motion::WordBackBig,
        '0' => Motion::LineStart,
        '^' => Motion::LineStartNonBlank,
        '$' => Motion::LineEnd,
        'G' => Motion::BufferEnd,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn ctrl_space() -> KeyEvent {
        KeyEvent::new(KeyCode::Char(' '), KeyModifiers::CONTROL)
    }

    #[test]
    fn insert_mode_forwards_plain_keys() {
        let mut router = InputRouter::new();
        assert_eq!(router.handle(&key('a')), Action::ForwardToAgent(vec![b'a']));
    }

    #[test]
    fn esc_in_insert_mode_forwards_to_agent() {
        let mut router = InputRouter::new();
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(router.handle(&esc), Action::ForwardToAgent(vec![0x1b]));
    }

    #[test]
    fn prefix_then_n_switches_to_normal_mode() {
        let mut router = InputRouter::new();
        assert_eq!(router.handle(&ctrl_space()), Action::Noop);
        assert_eq!(router.handle(&key('n')), Action::SwitchMode(Mode::Normal));
        assert_eq!(router.mode(), Mode::Normal);
    }

    #[test]
    fn layout_prefix_splits_horizontally() {
        let mut router = InputRouter::new();
        router.handle(&ctrl_space());
        router.handle(&key('n'));
        router.handle(&ctrl_space());
        assert_eq!(router.handle(&key('w')), Action::Noop);
        assert_eq!(router.handle(&key('s')), Action::Split(Orientation::Horizontal));
    }

    #[test]
    fn dd_yanks_whole_line_as_operator_motion() {
        let mut router = InputRouter::new();
        router.handle(&ctrl_space());
        router.handle(&key('n'));
        assert_eq!(router.handle(&key('d')), Action::OperatorPending(Operator::Delete));
        assert_eq!(
            router.handle(&key('d')),
            Action::OperatorMotion { operator: Operator::Delete, motion: Motion::Line, count: 1 }
        );
    }

    #[test]
    fn count_prefixes_a_motion() {
        let mut router = InputRouter::new();
        router.handle(&ctrl_space());
        router.handle(&key('n'));
        router.handle(&key('3'));
        assert_eq!(router.handle(&key('j')), Action::Motion { motion: Motion::Down, count: 3 });
    }

    #[test]
    fn register_prefix_then_letter_sets_register() {
        let mut router = InputRouter::new();
        router.handle(&ctrl_space());
        router.handle(&key('n'));
        assert_eq!(router.handle(&key('"')), Action::RegisterPrefix);
        assert_eq!(router.handle(&key('+')), Action::SetRegister('+'));
    }

    #[test]
    fn gg_moves_to_buffer_start() {
        let mut router = InputRouter::new();
        router.handle(&ctrl_space());
        router.handle(&key('n'));
        assert_eq!(router.handle(&key('g')), Action::Noop);
        assert_eq!(router.handle(&key('g')), Action::Motion { motion: Motion::BufferStart, count: 1 });
    }

    #[test]
    fn ctrl_d_in_normal_mode_triggers_half_page_scroll() {
        let mut router = InputRouter::new();
        router.handle(&ctrl_space());
        router.handle(&key('n'));
        let ctrl_d = KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL);
        assert_eq!(router.handle(&ctrl_d), Action::PageScroll(PageScroll::HalfDown));
    }
}
