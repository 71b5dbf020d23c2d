//! The ActionDispatcher: one handler per [`Action`] variant, and the only
//! component allowed to mutate ownership relationships between layout,
//! agents, and the message bus (spec §4.5, §5 "shared-resource policy").

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use regex::{Regex, RegexBuilder};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::agent::{Agent, AgentEvent, AgentId};
use crate::bus::{
    AclMessage, AclMessageBuilder, BusMessage, MessageBus, MessageKind, Performative, ProtocolKind, ProtocolState,
};
use crate::compositor::Compositor;
use crate::config::Config;
use crate::error::{MuxError, Result};
use crate::ex::{self, ExCommand};
use crate::input::{Action, InputRouter, Mode, Motion, Operator, PageScroll};
use crate::layout::{Direction, NodeId, Orientation, Rect};
use crate::overlay::{Overlay, OverlayManager};
use crate::registers::RegisterStore;
use crate::session::{AgentSessionResolver, ConversationSnapshot, Session, SessionStore};
use crate::workspace::Workspace;

/// Which text-entry flow is currently consuming keystrokes; set when the
/// router switches into `Command`/`Search`/`Chat` mode, cleared on submit
/// or cancel. The router itself only reports shape (char/backspace/enter);
/// the dispatcher owns the actual buffer (spec's note that the context,
/// not the router, owns ownership-affecting state).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextEntry {
    ExCommand,
    Search { forward: bool },
    Chat,
    AclCompose,
}

/// An active search's compiled pattern and cursor through the match set,
/// recomputed live against the focused pane's plain lines each time `n`/`N`
/// advances it (spec §4.3.5's "search" highlight pass reads this).
struct SearchState {
    regex: Regex,
    current: usize,
    forward: bool,
}

/// What the caller (the event loop) should do after a dispatch.
pub enum DispatchOutcome {
    Continue,
    /// The program should exit with this code (0 on a clean quit, or a
    /// child's exit code per spec §6.1).
    Quit(i32),
}

/// Transient status-bar message with its own expiry (spec §7, "transient
/// message area, default 3s").
pub struct StatusMessage {
    pub text: String,
    pub expires_at: Instant,
}

/// Everything an [`Action`] handler can read or mutate. One instance
/// lives for the process lifetime; `main` owns it and feeds it actions
/// from the input router and events from PTYs/the bus.
pub struct AppContext {
    pub workspace: Workspace,
    pub agents: HashMap<AgentId, Agent>,
    pub compositor: Compositor,
    pub registers: RegisterStore,
    pub bus: MessageBus,
    pub overlay: OverlayManager,
    pub router: InputRouter,
    pub session_store: SessionStore,
    pub resolver: Box<dyn AgentSessionResolver>,
    pub config: Config,
    pub session_id: Uuid,
    pub session_name: Option<String>,
    pub session_created_at: i64,
    pub status: Option<StatusMessage>,
    pub agent_events: UnboundedSender<AgentEvent>,
    pub terminal_size: (u16, u16),
    text_entry: Option<TextEntry>,
    text_buffer: String,
    /// Set by `Action::SetRegister`, consumed by the next operator motion
    /// or paste — vim registers only bind to the command immediately
    /// following the `"<reg>` prefix.
    active_register: Option<char>,
    /// The active search, if any. `None` until `:/` or `:?` is submitted
    /// with a pattern that compiles.
    search: Option<SearchState>,
    /// Virtual-cursor position at the moment Visual/VisualLine mode was
    /// entered; `None` outside those modes.
    visual_anchor: Option<(u16, u16)>,
}

impl AppContext {
    pub fn new(
        workspace: Workspace,
        agents: HashMap<AgentId, Agent>,
        config: Config,
        resolver: Box<dyn AgentSessionResolver>,
        agent_events: UnboundedSender<AgentEvent>,
        terminal_size: (u16, u16),
    ) -> Self {
        let frame_interval = config.frame_interval;
        let session_store = SessionStore::new(Config::sessions_dir());
        Self {
            workspace,
            agents,
            compositor: Compositor::new(frame_interval),
            registers: RegisterStore::new(),
            bus: MessageBus::new(Uuid::new_v4()),
            overlay: OverlayManager::new(),
            router: InputRouter::new(),
            session_store,
            resolver,
            session_id: Uuid::new_v4(),
            session_name: None,
            session_created_at: 0,
            config,
            status: None,
            agent_events,
            terminal_size,
            text_entry: None,
            text_buffer: String::new(),
            active_register: None,
            search: None,
            visual_anchor: None,
        }
    }

    pub fn set_status(&mut self, text: impl Into<String>, now: Instant) {
        self.status = Some(StatusMessage { text: text.into(), expires_at: now + Duration::from_secs(3) });
    }

    /// The register an upcoming operator motion or paste will target, set
    /// by a preceding `"<reg>` prefix. The event loop peeks this before
    /// dispatching a yank so it knows whether to also emit OSC 52 (writing
    /// to the clipboard registers doesn't happen inside `dispatch` itself,
    /// since only the loop holds the real stdout handle).
    pub fn active_register(&self) -> Option<char> {
        self.active_register
    }

    /// The active search pattern and which match index is "current", for
    /// the compositor's highlight pass. `None` when no search is active.
    pub fn search(&self) -> Option<(&Regex, usize)> {
        self.search.as_ref().map(|s| (&s.regex, s.current))
    }

    /// Virtual-cursor position at which Visual/VisualLine mode was
    /// entered, `None` outside those modes.
    pub fn visual_anchor(&self) -> Option<(u16, u16)> {
        self.visual_anchor
    }

    fn focused_agent_id(&self) -> Option<AgentId> {
        self.workspace.current().agent_of(self.workspace.current().focused())
    }

    fn focused_agent_mut(&mut self) -> Option<&mut Agent> {
        let id = self.focused_agent_id()?;
        self.agents.get_mut(&id)
    }
}

/// Dispatch one action, returning whether the loop should keep running.
pub fn dispatch(ctx: &mut AppContext, action: Action, now: Instant) -> Result<DispatchOutcome> {
    match action {
        Action::ForwardToAgent(bytes) => {
            if let Some(agent) = ctx.focused_agent_mut() {
                agent.write(&bytes)?;
            }
            Ok(DispatchOutcome::Continue)
        }
        Action::SwitchMode(mode) => {
            match mode {
                Mode::Chat => {
                    ctx.text_entry = Some(TextEntry::Chat);
                    ctx.text_buffer.clear();
                }
                Mode::Visual | Mode::VisualLine => {
                    let pane = ctx.workspace.current().focused();
                    ctx.visual_anchor = Some(ctx.compositor.cursor_of(pane));
                }
                Mode::Normal => {
                    ctx.visual_anchor = None;
                }
                _ => {}
            }
            Ok(DispatchOutcome::Continue)
        }
        Action::Cancel => {
            ctx.text_entry = None;
            ctx.text_buffer.clear();
            ctx.overlay.dismiss();
            Ok(DispatchOutcome::Continue)
        }

        Action::FocusDirection(dir) => {
            ctx.workspace.current_mut().focus_direction(dir);
            ctx.compositor.schedule_draw();
            Ok(DispatchOutcome::Continue)
        }
        Action::CycleFocus(delta) => {
            ctx.workspace.current_mut().cycle_focus(delta);
            ctx.compositor.schedule_draw();
            Ok(DispatchOutcome::Continue)
        }
        Action::Split(orientation) => split_focused(ctx, orientation, None, Vec::new(), now),
        Action::CloseFocused => close_focused(ctx, now),
        Action::CloseOthers => {
            let survivors = close_others_agent_ids(ctx);
            ctx.workspace.current_mut().close_others();
            for (id, agent) in ctx.agents.iter_mut() {
                if !survivors.contains(id) {
                    agent.kill();
                }
            }
            ctx.compositor.schedule_draw();
            Ok(DispatchOutcome::Continue)
        }
        Action::ToggleZoom => {
            ctx.workspace.current_mut().toggle_zoom();
            ctx.compositor.schedule_draw();
            Ok(DispatchOutcome::Continue)
        }
        Action::Equalize => {
            let root = ctx.workspace.current().root();
            ctx.workspace.current_mut().equalize(root);
            ctx.compositor.schedule_draw();
            Ok(DispatchOutcome::Continue)
        }
        Action::ResizeHeight(delta) | Action::ResizeWidth(delta) => {
            ctx.workspace.current_mut().resize_focused(delta);
            ctx.compositor.schedule_draw();
            Ok(DispatchOutcome::Continue)
        }
        Action::Swap | Action::Rotate => {
            // No-op placeholder: swap/rotate act on sibling order within a
            // container, which the current two-child containers make
            // equivalent to cycling focus; a richer n-ary container would
            // give these their own meaning.
            ctx.workspace.current_mut().cycle_focus(1);
            ctx.compositor.schedule_draw();
            Ok(DispatchOutcome::Continue)
        }

        Action::SwitchTab(n) => {
            ctx.workspace.switch_to(n as usize);
            ctx.compositor.schedule_draw();
            Ok(DispatchOutcome::Continue)
        }
        Action::PrevTab => {
            ctx.workspace.prev();
            ctx.compositor.schedule_draw();
            Ok(DispatchOutcome::Continue)
        }
        Action::NextTab => {
            ctx.workspace.next();
            ctx.compositor.schedule_draw();
            Ok(DispatchOutcome::Continue)
        }

        Action::BeginSearch { forward } => {
            ctx.text_entry = Some(TextEntry::Search { forward });
            ctx.text_buffer.clear();
            Ok(DispatchOutcome::Continue)
        }
        Action::SearchNext => advance_search(ctx, true),
        Action::SearchPrev => advance_search(ctx, false),
        Action::BeginExCommand => {
            ctx.text_entry = Some(TextEntry::ExCommand);
            ctx.text_buffer.clear();
            Ok(DispatchOutcome::Continue)
        }
        Action::SubmitExCommand(_) => submit_text_entry(ctx, now),

        Action::Save => save_session(ctx, None, now),
        Action::Help => {
            ctx.set_status("see README for keybindings", now);
            Ok(DispatchOutcome::Continue)
        }
        Action::Quit { force } => quit_focused(ctx, force, now),
        Action::QuitAll { force: _ } => {
            for agent in ctx.agents.values_mut() {
                agent.kill();
            }
            Ok(DispatchOutcome::Quit(0))
        }

        Action::BeginFipaCompose(performative) => {
            let target = ctx.workspace.current().find_pane_in_direction(Direction::Right);
            ctx.overlay.open_acl_composer(performative, target, crate::bus::PromptStyle::Structured)?;
            ctx.text_entry = Some(TextEntry::AclCompose);
            ctx.text_buffer.clear();
            Ok(DispatchOutcome::Continue)
        }
        Action::FipaListConversations | Action::FipaViewConversation => Ok(DispatchOutcome::Continue),
        Action::FipaCancelConversation => {
            ctx.overlay.dismiss();
            ctx.text_entry = None;
            Ok(DispatchOutcome::Continue)
        }
        Action::FipaSetStyle(_) => Ok(DispatchOutcome::Continue),

        Action::RegisterPrefix => Ok(DispatchOutcome::Continue),
        Action::SetRegister(c) => {
            ctx.active_register = Some(c);
            Ok(DispatchOutcome::Continue)
        }
        Action::OperatorPending(_) => Ok(DispatchOutcome::Continue),
        Action::OperatorMotion { operator, motion, count } => {
            apply_operator_motion(ctx, operator, motion, count, now)
        }
        Action::Motion { motion, count } => apply_motion(ctx, motion, count),
        Action::PageScroll(page) => apply_page_scroll(ctx, page),
        Action::PushCountDigit(_) => Ok(DispatchOutcome::Continue),
        Action::Paste { before: _ } => {
            let register = ctx.active_register.take().unwrap_or('"');
            paste_register(ctx, register)
        }
        Action::VisualToggle { .. } => Ok(DispatchOutcome::Continue),
        Action::VisualCancel => {
            ctx.visual_anchor = None;
            Ok(DispatchOutcome::Continue)
        }

        Action::ChatInput(fragment) => {
            apply_text_fragment(ctx, &fragment);
            Ok(DispatchOutcome::Continue)
        }

        Action::Noop => Ok(DispatchOutcome::Continue),
    }
}

fn apply_text_fragment(ctx: &mut AppContext, fragment: &str) {
    if fragment == "\u{8}" {
        ctx.text_buffer.pop();
    } else {
        ctx.text_buffer.push_str(fragment);
    }
}

fn submit_text_entry(ctx: &mut AppContext, now: Instant) -> Result<DispatchOutcome> {
    let entry = ctx.text_entry.take();
    let text = std::mem::take(&mut ctx.text_buffer);
    ctx.router = InputRouter::new();
    match entry {
        Some(TextEntry::ExCommand) => execute_ex(ctx, ex::parse(&text), now),
        Some(TextEntry::Search { forward }) => {
            if text.is_empty() {
                ctx.search = None;
                return Ok(DispatchOutcome::Continue);
            }
            match RegexBuilder::new(&text).case_insensitive(true).build() {
                Ok(regex) => ctx.search = Some(SearchState { regex, current: 0, forward }),
                Err(_) => ctx.set_status(format!("invalid pattern: {text}"), now),
            }
            Ok(DispatchOutcome::Continue)
        }
        Some(TextEntry::Chat) => Ok(DispatchOutcome::Continue),
        Some(TextEntry::AclCompose) => send_composed_acl(ctx, text, now),
        None => Ok(DispatchOutcome::Continue),
    }
}

fn send_composed_acl(ctx: &mut AppContext, content: String, now: Instant) -> Result<DispatchOutcome> {
    let Some(Overlay::AclComposer { performative, target, .. }) = ctx.overlay.dismiss() else {
        return Ok(DispatchOutcome::Continue);
    };
    let Some(sender_id) = ctx.focused_agent_id() else {
        return Ok(DispatchOutcome::Continue);
    };
    let Some(target_node) = target else {
        ctx.set_status("no target pane for message", now);
        return Ok(DispatchOutcome::Continue);
    };
    let Some(receiver_id) = ctx.workspace.current().agent_of(target_node) else {
        return Ok(DispatchOutcome::Continue);
    };

    let conversation_id = Uuid::new_v4();
    let sender = sender_id.to_string();
    let receiver = receiver_id.to_string();
    ctx.bus.conversations_mut().start(
        conversation_id,
        sender.clone(),
        &[receiver.clone()],
        Some(protocol_name(performative)),
        false,
        now,
    );

    let acl = AclMessage::new(
        AclMessageBuilder {
            performative,
            sender: sender.clone(),
            receivers: vec![receiver.clone()],
            content: serde_json::Value::String(content),
            language: "text".into(),
            encoding: "utf-8".into(),
            ontology: "agentmux".into(),
            protocol: Some(protocol_name(performative)),
            conversation_id,
            reply_with: None,
            in_reply_to: None,
            reply_by: None,
        },
        now_epoch_ms(),
    );

    let envelope = BusMessage {
        id: acl.id,
        timestamp: acl.timestamp,
        from: sender,
        to: receiver,
        kind: MessageKind::Request,
        method: format!("fipa:{}", performative.wire_name()),
        payload: serde_json::json!({ "_fipaMessage": acl }),
        reply_to: None,
        iac_envelope: None,
    };
    // Deliberately best-effort: an unregistered recipient (not yet an
    // active bus client) shouldn't abort the compose flow.
    let _ = ctx.bus.route(envelope, now);
    Ok(DispatchOutcome::Continue)
}

fn protocol_name(performative: Performative) -> String {
    match ProtocolKind::resolve(None, performative) {
        ProtocolKind::Request => "request",
        ProtocolKind::ContractNet => "contract-net",
        ProtocolKind::Subscribe => "subscribe",
        ProtocolKind::Query => "query",
    }
    .to_string()
}

fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Feed an inbound [`BusMessage`] through the conversation manager and
/// protocol state machine. Called by the event loop whenever a socket
/// client delivers a message, not by `dispatch` directly (it isn't
/// triggered by a keystroke).
pub fn process_incoming_message(ctx: &mut AppContext, message: BusMessage, now: Instant) -> Result<()> {
    let Some(fipa_value) = message.payload.get("_fipaMessage") else {
        return Ok(());
    };
    let acl: AclMessage = serde_json::from_value(fipa_value.clone()).map_err(|e| MuxError::ProtocolError(e.to_string()))?;

    if ctx.bus.conversations().get(acl.conversation_id).is_err() {
        ctx.bus.conversations_mut().start(
            acl.conversation_id,
            acl.sender.clone(),
            &acl.receivers,
            acl.protocol.clone(),
            false,
            now,
        );
    }
    let kind = ProtocolKind::resolve(acl.protocol.as_deref(), acl.performative);
    let conversation = ctx.bus.conversations_mut().get_mut(acl.conversation_id)?;
    conversation.add_message(acl.clone(), now);
    conversation.state = crate::bus::protocol::transition(kind, conversation.state, acl.performative);

    if kind == ProtocolKind::ContractNet {
        if conversation.contract_net.is_none() {
            conversation.contract_net = Some(crate::bus::ContractNetTally::new(acl.receivers.clone()));
        }
        if matches!(acl.performative, Performative::Propose | Performative::Refuse) {
            if let Some(tally) = conversation.contract_net.as_mut() {
                tally.record(acl.sender.clone(), acl.performative);
            }
        }
        if conversation.state == ProtocolState::ProposalsReceived {
            let no_proposals = conversation.contract_net.as_ref().map(|t| !t.has_any_proposal()).unwrap_or(false);
            if no_proposals {
                conversation.complete("no-proposals", now);
                conversation.state = ProtocolState::Failed;
            }
        }
    }
    if !conversation.is_complete
        && matches!(
            conversation.state,
            ProtocolState::Completed | ProtocolState::Failed | ProtocolState::Refused | ProtocolState::Cancelled
        )
    {
        let reason = format!("{:?}", conversation.state);
        conversation.complete(reason, now);
    }

    if let Some(reply_by) = acl.reply_by {
        ctx.bus.track_deadline(acl.id, acl.conversation_id, now + Duration::from_millis((reply_by - now_epoch_ms()).max(0) as u64));
    }
    Ok(())
}

fn apply_operator_motion(ctx: &mut AppContext, operator: Operator, motion: Motion, count: u32, now: Instant) -> Result<DispatchOutcome> {
    let register = ctx.active_register.take().unwrap_or('"');
    let pane = ctx.workspace.current().focused();
    let (row, _) = ctx.compositor.cursor_of(pane);
    let Some(agent) = ctx.focused_agent_mut() else {
        return Ok(DispatchOutcome::Continue);
    };
    let text = match motion {
        Motion::Line => (0..count.max(1))
            .map(|i| agent.vt.plain_line(row + i as u16))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => agent.vt.plain_line(row),
    };
    ctx.registers.set(register, &text, operator == Operator::Yank);
    let _ = now;
    Ok(DispatchOutcome::Continue)
}

fn paste_register(ctx: &mut AppContext, register: char) -> Result<DispatchOutcome> {
    let text = ctx.registers.get(register).to_string();
    if let Some(agent) = ctx.focused_agent_mut() {
        agent.write(text.as_bytes())?;
    }
    Ok(DispatchOutcome::Continue)
}

/// A bare motion in normal/visual mode: moves the virtual cursor (spec
/// §4.4's "motions move a virtual cursor distinct from the PTY's own").
/// `BufferStart`/`BufferEnd` additionally drive the VT's own scrollback,
/// since they move the viewport as well as the cursor.
fn apply_motion(ctx: &mut AppContext, motion: Motion, count: u32) -> Result<DispatchOutcome> {
    let pane = ctx.workspace.current().focused();
    let bounds = ctx.workspace.current().bounds_of(pane);
    let Some(agent_id) = ctx.workspace.current().agent_of(pane) else {
        return Ok(DispatchOutcome::Continue);
    };
    let count = count.max(1) as i64;

    match motion {
        Motion::Left => ctx.compositor.move_cursor(pane, 0, -count, bounds.height, bounds.width),
        Motion::Right => ctx.compositor.move_cursor(pane, 0, count, bounds.height, bounds.width),
        Motion::Up => ctx.compositor.move_cursor(pane, -count, 0, bounds.height, bounds.width),
        Motion::Down => ctx.compositor.move_cursor(pane, count, 0, bounds.height, bounds.width),
        Motion::LineStart => ctx.compositor.set_cursor_col(pane, 0),
        Motion::LineStartNonBlank => {
            if let Some(agent) = ctx.agents.get(&agent_id) {
                let (row, _) = ctx.compositor.cursor_of(pane);
                let line = agent.vt.plain_line(row);
                let col = line.chars().position(|c| !c.is_whitespace()).unwrap_or(0) as u16;
                ctx.compositor.set_cursor_col(pane, col);
            }
        }
        Motion::LineEnd => {
            if let Some(agent) = ctx.agents.get(&agent_id) {
                let (row, _) = ctx.compositor.cursor_of(pane);
                let trimmed = agent.vt.plain_line(row);
                let trimmed = trimmed.trim_end();
                let col = trimmed.chars().count().saturating_sub(1) as u16;
                ctx.compositor.set_cursor_col(pane, col);
            }
        }
        Motion::WordForward | Motion::WordForwardBig => {
            if let Some(agent) = ctx.agents.get(&agent_id) {
                let (row, col) = ctx.compositor.cursor_of(pane);
                let line = agent.vt.plain_line(row);
                let big = motion == Motion::WordForwardBig;
                let mut col = col;
                for _ in 0..count {
                    col = advance_word(&line, col, big);
                }
                ctx.compositor.set_cursor_col(pane, col);
            }
        }
        Motion::WordEnd | Motion::WordEndBig => {
            if let Some(agent) = ctx.agents.get(&agent_id) {
                let (row, col) = ctx.compositor.cursor_of(pane);
                let line = agent.vt.plain_line(row);
                let big = motion == Motion::WordEndBig;
                let mut col = col;
                for _ in 0..count {
                    col = word_end(&line, col, big);
                }
                ctx.compositor.set_cursor_col(pane, col);
            }
        }
        Motion::WordBack | Motion::WordBackBig => {
            if let Some(agent) = ctx.agents.get(&agent_id) {
                let (row, col) = ctx.compositor.cursor_of(pane);
                let line = agent.vt.plain_line(row);
                let big = motion == Motion::WordBackBig;
                let mut col = col;
                for _ in 0..count {
                    col = word_back(&line, col, big);
                }
                ctx.compositor.set_cursor_col(pane, col);
            }
        }
        Motion::BufferStart => {
            if let Some(agent) = ctx.agents.get_mut(&agent_id) {
                agent.vt.scroll_to_top();
            }
            ctx.compositor.scroll_pane(pane, i64::MAX / 2, u16::MAX, bounds.height);
            ctx.compositor.set_cursor(pane, 0, 0);
        }
        Motion::BufferEnd => {
            if let Some(agent) = ctx.agents.get_mut(&agent_id) {
                agent.vt.scroll_to_bottom();
            }
            ctx.compositor.scroll_pane(pane, i64::MIN / 2, bounds.height, bounds.height);
            ctx.compositor.set_cursor(pane, bounds.height.saturating_sub(1), 0);
        }
        // Only meaningful as an operator's target (`yy`/`dd`); as a bare
        // motion it has nothing to move.
        Motion::Line => {}
    }
    Ok(DispatchOutcome::Continue)
}

/// `Ctrl-D/U/F/B`: half/full page scroll through the focused pane's
/// scrollback, driving both the VT's own scrollback cursor and the
/// compositor's parallel bookkeeping with the same signed delta.
fn apply_page_scroll(ctx: &mut AppContext, page: PageScroll) -> Result<DispatchOutcome> {
    let pane = ctx.workspace.current().focused();
    let bounds = ctx.workspace.current().bounds_of(pane);
    let Some(agent_id) = ctx.workspace.current().agent_of(pane) else {
        return Ok(DispatchOutcome::Continue);
    };
    let half = (bounds.height / 2).max(1);
    let (rows, forward) = match page {
        PageScroll::HalfUp => (half, false),
        PageScroll::HalfDown => (half, true),
        PageScroll::FullUp => (bounds.height.max(1), false),
        PageScroll::FullDown => (bounds.height.max(1), true),
    };
    let Some(agent) = ctx.agents.get_mut(&agent_id) else {
        return Ok(DispatchOutcome::Continue);
    };
    if forward {
        agent.vt.scroll_down(rows as usize);
    } else {
        agent.vt.scroll_up(rows as usize);
    }
    let content_height = agent.vt.content_height();
    let delta = if forward { -(rows as i64) } else { rows as i64 };
    ctx.compositor.scroll_pane(pane, delta, content_height, bounds.height);
    Ok(DispatchOutcome::Continue)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `w`/`W`: first character of the next word, skipping past the rest of
/// the current word (or punctuation run, for the non-big variant) and any
/// following whitespace.
fn advance_word(line: &str, col: u16, big: bool) -> u16 {
    let chars: Vec<char> = line.chars().collect();
    let len = chars.len();
    if len == 0 {
        return 0;
    }
    let mut i = (col as usize).min(len);
    if i >= len {
        return col;
    }
    if big {
        while i < len && !chars[i].is_whitespace() {
            i += 1;
        }
    } else if is_word_char(chars[i]) {
        while i < len && is_word_char(chars[i]) {
            i += 1;
        }
    } else if !chars[i].is_whitespace() {
        while i < len && !chars[i].is_whitespace() && !is_word_char(chars[i]) {
            i += 1;
        }
    }
    while i < len && chars[i].is_whitespace() {
        i += 1;
    }
    i.min(len.saturating_sub(1)) as u16
}

/// `e`/`E`: last character of the current or next word.
fn word_end(line: &str, col: u16, big: bool) -> u16 {
    let chars: Vec<char> = line.chars().collect();
    let len = chars.len();
    if len == 0 {
        return 0;
    }
    let mut i = (col as usize).min(len - 1) + 1;
    while i < len && chars[i].is_whitespace() {
        i += 1;
    }
    if i >= len {
        return (len - 1) as u16;
    }
    if big {
        while i + 1 < len && !chars[i + 1].is_whitespace() {
            i += 1;
        }
    } else {
        let word = is_word_char(chars[i]);
        while i + 1 < len && is_word_char(chars[i + 1]) == word && !chars[i + 1].is_whitespace() {
            i += 1;
        }
    }
    i as u16
}

/// `b`/`B`: first character of the previous word.
fn word_back(line: &str, col: u16, big: bool) -> u16 {
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return 0;
    }
    let mut i = (col as usize).min(chars.len() - 1);
    if i == 0 {
        return 0;
    }
    i -= 1;
    while i > 0 && chars[i].is_whitespace() {
        i -= 1;
    }
    if big {
        while i > 0 && !chars[i - 1].is_whitespace() {
            i -= 1;
        }
    } else {
        let word = is_word_char(chars[i]);
        while i > 0 && is_word_char(chars[i - 1]) == word && !chars[i - 1].is_whitespace() {
            i -= 1;
        }
    }
    i as u16
}

/// `n`/`N`: recompute the match set against the focused pane's currently
/// visible lines and step `current` forward or backward, wrapping. `n`
/// continues in the search's stored direction; `N` reverses it.
fn advance_search(ctx: &mut AppContext, same_direction: bool) -> Result<DispatchOutcome> {
    let pane = ctx.workspace.current().focused();
    let bounds = ctx.workspace.current().bounds_of(pane);
    let Some(agent_id) = ctx.workspace.current().agent_of(pane) else {
        return Ok(DispatchOutcome::Continue);
    };
    let Some(agent) = ctx.agents.get(&agent_id) else {
        return Ok(DispatchOutcome::Continue);
    };
    let lines: Vec<String> = (0..bounds.height).map(|row| agent.vt.plain_line(row)).collect();
    let Some(search) = ctx.search.as_mut() else {
        return Ok(DispatchOutcome::Continue);
    };
    let total: usize = lines.iter().map(|line| search.regex.find_iter(line).count()).sum();
    if total == 0 {
        return Ok(DispatchOutcome::Continue);
    }
    let forward = if same_direction { search.forward } else { !search.forward };
    search.current = if forward { (search.current + 1) % total } else { (search.current + total - 1) % total };
    Ok(DispatchOutcome::Continue)
}

fn close_others_agent_ids(ctx: &AppContext) -> std::collections::HashSet<AgentId> {
    let focused = ctx.workspace.current().focused();
    ctx.workspace
        .current()
        .agent_of(focused)
        .into_iter()
        .collect()
}

fn split_focused(
    ctx: &mut AppContext,
    orientation: Orientation,
    agent_type: Option<String>,
    extra_argv: Vec<String>,
    now: Instant,
) -> Result<DispatchOutcome> {
    let kind = agent_type.unwrap_or_else(|| "agent".to_string());
    let mut agent = Agent::new(kind.clone(), kind.clone(), kind, extra_argv, HashMap::new(), ctx.config.scrollback);
    let (cols, rows) = ctx.terminal_size;
    agent.spawn(cols, rows, ctx.agent_events.clone())?;
    let agent_id = agent.id;
    ctx.agents.insert(agent_id, agent);
    ctx.workspace.current_mut().split_focused(orientation, agent_id);
    let pane = ctx.workspace.current().focused();
    let bounds = ctx.workspace.current().bounds_of(pane);
    ctx.compositor.on_pane_opened(pane, bounds.height);
    ctx.compositor.schedule_draw();
    ctx.set_status("split", now);
    Ok(DispatchOutcome::Continue)
}

fn close_focused(ctx: &mut AppContext, now: Instant) -> Result<DispatchOutcome> {
    let pane = ctx.workspace.current().focused();
    let agent_id = ctx.workspace.current().agent_of(pane);
    if !ctx.workspace.current_mut().close_focused() {
        return quit_focused(ctx, false, now);
    }
    ctx.compositor.on_pane_closed(pane);
    if let Some(id) = agent_id {
        if let Some(agent) = ctx.agents.get_mut(&id) {
            agent.kill();
        }
        ctx.agents.remove(&id);
    }
    ctx.compositor.schedule_draw();
    Ok(DispatchOutcome::Continue)
}

fn quit_focused(ctx: &mut AppContext, force: bool, now: Instant) -> Result<DispatchOutcome> {
    let _ = now;
    if !force && ctx.workspace.tabs().iter().any(|t| t.panes().len() > 1) {
        // Closing the current pane is still possible via explicit
        // CloseFocused; a bare `:q` with siblings present falls through
        // to closing the focused pane instead of quitting the program.
        return close_focused(ctx, Instant::now());
    }
    for agent in ctx.agents.values_mut() {
        agent.kill();
    }
    Ok(DispatchOutcome::Quit(0))
}

fn save_session(ctx: &mut AppContext, name: Option<String>, now: Instant) -> Result<DispatchOutcome> {
    if let Some(name) = name {
        ctx.session_name = Some(name);
    }
    let Some(name) = ctx.session_name.clone() else {
        return Err(MuxError::NoSessionName);
    };
    let conversations: Vec<ConversationSnapshot> = ctx
        .bus
        .conversations()
        .all()
        .into_iter()
        .map(ConversationSnapshot::from_conversation)
        .collect();
    let mut session = SessionStore::snapshot(
        ctx.session_id,
        name,
        ctx.session_created_at,
        &ctx.agents,
        ctx.workspace.current(),
        &conversations,
    );
    ctx.session_store.save(&mut session)?;
    ctx.set_status("saved", now);
    Ok(DispatchOutcome::Continue)
}

fn execute_ex(ctx: &mut AppContext, command: ExCommand, now: Instant) -> Result<DispatchOutcome> {
    match command {
        ExCommand::Quit { force } => quit_focused(ctx, force, now),
        ExCommand::QuitAll { force } => dispatch(ctx, Action::QuitAll { force }, now),
        ExCommand::NewTab { agent_type, extra_argv } => {
            let kind = agent_type.unwrap_or_else(|| "agent".to_string());
            let mut agent = Agent::new(kind.clone(), kind.clone(), kind, extra_argv, HashMap::new(), ctx.config.scrollback);
            let (cols, rows) = ctx.terminal_size;
            agent.spawn(cols, rows, ctx.agent_events.clone())?;
            let agent_id = agent.id;
            ctx.agents.insert(agent_id, agent);
            let tree = crate::layout::LayoutTree::new(agent_id, Rect::new(0, 0, cols, rows));
            ctx.workspace.add_tab(tree);
            let pane = ctx.workspace.current().focused();
            ctx.compositor.on_pane_opened(pane, rows);
            ctx.compositor.schedule_draw();
            Ok(DispatchOutcome::Continue)
        }
        ExCommand::Split { orientation, agent_type, extra_argv } => split_focused(ctx, orientation, agent_type, extra_argv, now),
        ExCommand::CloseOthers => dispatch(ctx, Action::CloseOthers, now),
        ExCommand::CloseFocused => close_focused(ctx, now),
        ExCommand::Save { name } => save_session(ctx, name, now),
        ExCommand::SaveAndQuit => {
            save_session(ctx, None, now)?;
            quit_focused(ctx, false, now)
        }
        ExCommand::ListSessions => {
            let listing = ctx.session_store.list()?;
            ctx.set_status(format!("{} saved session(s)", listing.len()), now);
            Ok(DispatchOutcome::Continue)
        }
        ExCommand::Restore { id_or_name } => {
            ctx.set_status(
                format!("restart with -r {}", id_or_name.unwrap_or_else(|| "latest".into())),
                now,
            );
            Ok(DispatchOutcome::Continue)
        }
        ExCommand::Rename { name } => {
            ctx.session_name = Some(name);
            Ok(DispatchOutcome::Continue)
        }
        ExCommand::Set { key, value } => {
            if key == "scrollback" {
                ctx.config.scrollback = value as usize;
            } else if key == "output_silence_ms" {
                ctx.config.output_silence_ms = value;
            }
            Ok(DispatchOutcome::Continue)
        }
        ExCommand::Unknown(cmd) => {
            ctx.set_status(format!("unknown command: {cmd}"), now);
            Ok(DispatchOutcome::Continue)
        }
        ExCommand::Empty => Ok(DispatchOutcome::Continue),
    }
}

/// Restore an [`AppContext`] from a saved [`Session`], respawning every
/// persisted agent with its resolver-supplied resume argv (spec §4.8).
pub fn restore_from_session(
    session: &Session,
    cwd: &PathBuf,
    config: Config,
    resolver: Box<dyn AgentSessionResolver>,
    agent_events: UnboundedSender<AgentEvent>,
    terminal_size: (u16, u16),
) -> Result<AppContext> {
    let mut agents = HashMap::new();
    for descriptor in session.agents.values() {
        let argv = SessionStore::resume_argv(descriptor, resolver.as_ref(), cwd);
        let mut agent = Agent::new(
            descriptor.name.clone(),
            descriptor.kind.clone(),
            descriptor.command.clone(),
            argv,
            descriptor.env.clone(),
            config.scrollback,
        );
        let (cols, rows) = terminal_size;
        agent.spawn(cols, rows, agent_events.clone())?;
        agents.insert(descriptor.id, agent);
    }
    let (cols, rows) = terminal_size;
    let tree = crate::layout::LayoutTree::from_snapshot(&session.layout, Rect::new(0, 0, cols, rows));
    let workspace = Workspace::new(tree);

    let mut ctx = AppContext::new(workspace, agents, config, resolver, agent_events, terminal_size);
    ctx.session_id = session.id;
    ctx.session_name = Some(session.name.clone());
    ctx.session_created_at = session.created_at;
    for pane in ctx.workspace.current().panes() {
        let bounds = ctx.workspace.current().bounds_of(pane.0);
        ctx.compositor.on_pane_opened(pane.0, bounds.height);
    }
    Ok(ctx)
}
