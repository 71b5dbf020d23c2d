//! Entry point: parses the CLI surface (spec §6.1), builds or restores an
//! `AppContext`, and runs the single-threaded event loop that fans in
//! keyboard/mouse input, PTY output, message-bus sockets, and OS signals.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use regex::Regex;
use tokio::sync::mpsc;

use agentmux::agent::{Agent, AgentEvent, AgentId};
use agentmux::bus::{transport, BusMessage};
use agentmux::compositor::{apply_cursor, apply_search, apply_visual, assemble, FrameInput, PaneFrame, ReflowPhase};
use agentmux::config::Config;
use agentmux::dispatch::{self, AppContext, DispatchOutcome};
use agentmux::error::MuxError;
use agentmux::input::{Action, Mode};
use agentmux::layout::{LayoutTree, Orientation, Rect};
use agentmux::session::{NoopResolver, SessionStore};
use agentmux::terminal_host::{decode_mouse_event, forward_signal_to_pid, MouseAction, TerminalHost};
use agentmux::workspace::Workspace;

/// A PTY-multiplexed terminal for running several coding-assistant
/// processes side by side, tiled, with a vim-modal keymap and an
/// inter-agent message bus.
#[derive(Parser, Debug)]
#[command(name = "agentmux", version, about)]
struct Cli {
    /// Resume a saved session by id or name. Bare `-r` resumes the most
    /// recently saved session.
    #[arg(
        short = 'r',
        long = "resume",
        visible_alias = "restore",
        num_args = 0..=1,
        default_missing_value = "latest"
    )]
    resume: Option<String>,

    /// Name to save this session under.
    #[arg(short = 's', long = "session")]
    session: Option<String>,

    /// Command/type the first agent runs (defaults to "agent" — matching
    /// the fallback every `:e`/`:sp` ex-command already uses when no type
    /// is given).
    #[arg(default_value = "agent")]
    agent_type: String,

    /// Passed verbatim to the first agent's argv.
    #[arg(last = true)]
    extra_argv: Vec<String>,
}

fn log_path() -> PathBuf {
    if let Ok(path) = std::env::var("AGENTMUX_LOG_FILE") {
        return PathBuf::from(path);
    }
    std::env::temp_dir().join("agentmux.log")
}

fn init_logging() {
    let path = log_path();
    let Ok(file) = std::fs::File::create(&path) else {
        return;
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .init();
}

/// Restore every terminal mode a panic (or a clean exit) must leave sane,
/// without going through `TerminalHost` — the panic hook can't borrow it.
fn emergency_terminal_reset() {
    let _ = crossterm::terminal::disable_raw_mode();
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(b"\x1b[?1006l\x1b[?1000l\x1b[?25h");
    let _ = crossterm::execute!(stdout, crossterm::terminal::LeaveAlternateScreen);
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        emergency_terminal_reset();
        log::error!("panic: {info}");
        default_hook(info);
    }));
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging();
    install_panic_hook();

    let cli = Cli::parse();
    let config = Config::load();
    let terminal_size = crossterm::terminal::size().unwrap_or((80, 24));
    let (agent_tx, agent_rx) = mpsc::unbounded_channel();

    let mut ctx = match build_context(&cli, &config, terminal_size, agent_tx) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("agentmux: fatal error during startup: {e}");
            std::process::exit(1);
        }
    };

    let mut host = TerminalHost::new();
    host.start()?;
    let exit_code = run_event_loop(&mut ctx, &mut host, agent_rx).await;
    host.stop()?;

    std::process::exit(exit_code);
}

/// Build a fresh `AppContext`, or restore one from a saved session when
/// `-r/--resume/--restore` was given. Restore failures fall back to a
/// fresh session with a stderr warning (spec §7, "restore failures fall
/// back... preserving progress").
fn build_context(
    cli: &Cli,
    config: &Config,
    terminal_size: (u16, u16),
    agent_tx: mpsc::UnboundedSender<AgentEvent>,
) -> Result<AppContext> {
    if let Some(id_or_name) = &cli.resume {
        let store = SessionStore::new(Config::sessions_dir());
        match store.load(id_or_name) {
            Ok(session) => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                return Ok(dispatch::restore_from_session(
                    &session,
                    &cwd,
                    config.clone(),
                    Box::new(NoopResolver),
                    agent_tx,
                    terminal_size,
                )?);
            }
            Err(e) => {
                eprintln!("agentmux: could not restore session {id_or_name:?} ({e}), starting fresh");
            }
        }
    }

    let mut agent = Agent::new(
        cli.agent_type.clone(),
        cli.agent_type.clone(),
        cli.agent_type.clone(),
        cli.extra_argv.clone(),
        HashMap::new(),
        config.scrollback,
    );
    let (cols, rows) = terminal_size;
    agent.spawn(cols, rows, agent_tx.clone())?;
    let agent_id = agent.id;

    let mut agents = HashMap::new();
    agents.insert(agent_id, agent);

    let tree = LayoutTree::new(agent_id, Rect::new(0, 0, cols, rows));
    let workspace = Workspace::new(tree);

    let mut ctx = AppContext::new(workspace, agents, config.clone(), Box::new(NoopResolver), agent_tx, terminal_size);
    ctx.session_name = cli.session.clone().or_else(|| Some(config.session_name.clone()));
    ctx.session_created_at = now_epoch_ms();
    for pane in ctx.workspace.current().panes() {
        let bounds = ctx.workspace.current().bounds_of(pane.0);
        ctx.compositor.on_pane_opened(pane.0, bounds.height);
    }
    Ok(ctx)
}

fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

async fn run_event_loop(
    ctx: &mut AppContext,
    host: &mut TerminalHost,
    mut agent_rx: mpsc::UnboundedReceiver<AgentEvent>,
) -> i32 {
    let mut term_events = EventStream::new();
    let mut draw_interval = tokio::time::interval(ctx.config.frame_interval);
    let mut resize_poll = tokio::time::interval(Duration::from_millis(50));

    let socket_path = transport::socket_path(&ctx.config.runtime_dir, "agentmux", ctx.session_id);
    let listener = transport::bind(&socket_path).await.ok();
    let (bus_in_tx, mut bus_in_rx) = mpsc::unbounded_channel::<BusMessage>();
    let mut next_client_id: u64 = 0;

    #[cfg(unix)]
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();
    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
    #[cfg(unix)]
    let mut sigtstp = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::from_raw(libc::SIGTSTP)).ok();
    #[cfg(unix)]
    let mut sigcont = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::from_raw(libc::SIGCONT)).ok();

    draw(ctx);

    loop {
        let accept_fut = async {
            match &listener {
                Some(l) => l.accept().await.ok(),
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            Some(event) = agent_rx.recv() => {
                if let Some(code) = handle_agent_event(ctx, event) {
                    return code;
                }
            }

            Some(Ok(event)) = term_events.next() => {
                if let Some(code) = handle_term_event(ctx, event).await {
                    return code;
                }
            }

            accepted = accept_fut => {
                if let Some((stream, _addr)) = accepted {
                    let (mut reader, mut writer) = transport::split(stream);
                    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<BusMessage>();
                    let client_id = format!("client-{next_client_id}");
                    next_client_id += 1;
                    ctx.bus.register(client_id, out_tx);

                    tokio::spawn(async move {
                        while let Some(msg) = out_rx.recv().await {
                            if writer.send(&msg).await.is_err() {
                                break;
                            }
                        }
                    });

                    let bus_in_tx = bus_in_tx.clone();
                    tokio::spawn(async move {
                        loop {
                            match reader.recv().await {
                                Ok(Some(msg)) => {
                                    if bus_in_tx.send(msg).is_err() {
                                        break;
                                    }
                                }
                                _ => break,
                            }
                        }
                    });
                }
            }

            Some(msg) = bus_in_rx.recv() => {
                let now = Instant::now();
                if let Err(e) = dispatch::process_incoming_message(ctx, msg.clone(), now) {
                    log::warn!("malformed bus message from {}: {e}", msg.from);
                }
                if let Err(e) = ctx.bus.route(msg, now) {
                    log::warn!("bus routing failed: {e}");
                }
                ctx.compositor.schedule_draw();
            }

            _ = draw_interval.tick() => {
                let pane_heights = pane_height_map(ctx);
                ctx.compositor.tick(Instant::now(), &pane_heights);
                pin_following_panes(ctx);
                if ctx.compositor.should_draw(Instant::now()) {
                    draw(ctx);
                }
                for timed_out in ctx.bus.sweep_timeouts(Instant::now()) {
                    log::info!("conversation {} timed out", timed_out.conversation_id);
                }
            }

            _ = resize_poll.tick() => {
                if host.take_resize() {
                    on_resize(ctx);
                }
            }

            _ = async { sigint.as_mut().unwrap().recv().await }, if sigint.is_some() => {
                return quit_all(ctx);
            }
            _ = async { sigterm.as_mut().unwrap().recv().await }, if sigterm.is_some() => {
                return quit_all(ctx);
            }
            _ = async { sigtstp.as_mut().unwrap().recv().await }, if sigtstp.is_some() => {
                let _ = host.suspend_modes();
                for agent in ctx.agents.values() {
                    if let Some(pid) = agent.pid() {
                        forward_signal_to_pid(pid, nix::sys::signal::Signal::SIGSTOP);
                    }
                }
                #[cfg(unix)]
                unsafe { libc::raise(libc::SIGSTOP); }
            }
            _ = async { sigcont.as_mut().unwrap().recv().await }, if sigcont.is_some() => {
                for agent in ctx.agents.values() {
                    if let Some(pid) = agent.pid() {
                        forward_signal_to_pid(pid, nix::sys::signal::Signal::SIGCONT);
                    }
                }
                let _ = host.resume_modes();
                ctx.compositor.schedule_draw();
                draw(ctx);
            }
        }
    }
}

fn handle_agent_event(ctx: &mut AppContext, event: AgentEvent) -> Option<i32> {
    match event {
        AgentEvent::Output(agent_id, bytes) => {
            // Snapshot the pre-burst frame while still idle, so a reflow
            // that this output triggers has something frozen to show
            // (spec §4.3: the viewer sees the last stable frame, not the
            // churn, until the burst settles).
            let pane = pane_for_agent(ctx, agent_id);
            if let Some(pane) = pane {
                let still_idle = ctx
                    .compositor
                    .state(pane)
                    .map(|s| s.reflow.phase() == ReflowPhase::Idle)
                    .unwrap_or(true);
                if still_idle {
                    if let Some(agent) = ctx.agents.get(&agent_id) {
                        let bounds = ctx.workspace.current().bounds_of(pane);
                        let pre_lines: Vec<String> = (0..bounds.height).map(|i| agent.vt.styled_line(i)).collect();
                        ctx.compositor.cache_lines(pane, pre_lines);
                    }
                }
            }
            if let Some(agent) = ctx.agents.get_mut(&agent_id) {
                let _ = agent.feed_output(&bytes);
            }
            if let Some(pane) = pane {
                let bounds = ctx.workspace.current().bounds_of(pane);
                if let Some(agent) = ctx.agents.get_mut(&agent_id) {
                    let content_height = agent.vt.content_height();
                    ctx.compositor.on_data(pane, Instant::now(), content_height, bounds.height);
                }
            }
            ctx.compositor.schedule_draw();
            None
        }
        AgentEvent::Exited(agent_id, exit_code) => {
            if let Some(agent) = ctx.agents.get_mut(&agent_id) {
                agent.mark_exited(exit_code);
            }
            // Spec §6.1: exit with the last agent's own exit code if it
            // exits while alone in its pane and it was the only pane left.
            let lone_survivor = ctx.workspace.tabs().len() == 1
                && ctx.workspace.current().panes().len() == 1
                && ctx.workspace.current().agent_of(ctx.workspace.current().focused()) == Some(agent_id);
            if lone_survivor {
                return Some(exit_code.unwrap_or(0));
            }
            ctx.compositor.schedule_draw();
            None
        }
    }
}

async fn handle_term_event(ctx: &mut AppContext, event: Event) -> Option<i32> {
    match event {
        Event::Key(key) => {
            let action = ctx.router.handle(&key);
            let register_before = ctx.active_register();
            match dispatch::dispatch(ctx, action.clone(), Instant::now()) {
                Ok(DispatchOutcome::Continue) => {
                    if let Action::OperatorMotion { operator, .. } = action {
                        if operator == agentmux::input::Operator::Yank {
                            if let Some(reg @ ('+' | '*')) = register_before {
                                emit_clipboard(ctx, reg);
                            }
                        }
                    }
                    None
                }
                Ok(DispatchOutcome::Quit(code)) => Some(code),
                Err(MuxError::NoSessionName) => {
                    ctx.set_status("E32: No session name", Instant::now());
                    None
                }
                Err(e) => {
                    ctx.set_status(format!("error: {e}"), Instant::now());
                    None
                }
            }
        }
        Event::Mouse(mouse) => {
            if let Some(action) = decode_mouse_event(&mouse) {
                apply_mouse_action(ctx, action);
            }
            None
        }
        Event::Resize(cols, rows) => {
            ctx.terminal_size = (cols, rows);
            on_resize(ctx);
            None
        }
        _ => None,
    }
}

fn emit_clipboard(ctx: &AppContext, register: char) {
    let bytes = agentmux::registers::RegisterStore::clipboard_osc52(ctx.registers.get(register));
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(&bytes);
    let _ = stdout.flush();
}

fn apply_mouse_action(ctx: &mut AppContext, action: MouseAction) {
    match action {
        MouseAction::FocusAt { x, y } => {
            if let Some(pane) = ctx.workspace.current().find_pane_at(x, y) {
                ctx.workspace.current_mut().set_focused(pane);
                ctx.compositor.schedule_draw();
            }
        }
        MouseAction::ScrollAt { x, y, delta } => {
            if let Some(pane) = ctx.workspace.current().find_pane_at(x, y) {
                if let Some(agent_id) = ctx.workspace.current().agent_of(pane) {
                    let bounds = ctx.workspace.current().bounds_of(pane);
                    if let Some(agent) = ctx.agents.get_mut(&agent_id) {
                        if delta > 0 {
                            agent.vt.scroll_up(delta as usize);
                        } else {
                            agent.vt.scroll_down((-delta) as usize);
                        }
                        let content_height = agent.vt.content_height();
                        ctx.compositor.scroll_pane(pane, delta, content_height, bounds.height);
                        ctx.compositor.schedule_draw();
                    }
                }
            }
        }
        MouseAction::ResizeVertical { x, y, delta } => {
            resize_border(ctx, x, y, Orientation::Horizontal, delta);
        }
        MouseAction::ResizeHorizontal { x, y, delta } => {
            resize_border(ctx, x, y, Orientation::Vertical, delta);
        }
    }
}

/// `ResizeVertical` adjusts a `│` border (a horizontally-split
/// container's gap); `ResizeHorizontal` adjusts a `─` border (a
/// vertically-split container's gap). Falls back to nudging the focused
/// pane's own split when the mouse position doesn't land on any border.
fn resize_border(ctx: &mut AppContext, x: u16, y: u16, orientation: Orientation, delta: i32) {
    let amount = delta as f64 * 0.02;
    let hit = ctx.workspace.current_mut().resize_border_at(x, y, orientation, amount);
    if !hit {
        ctx.workspace.current_mut().resize_focused(amount);
    }
    ctx.compositor.schedule_draw();
}

fn pane_for_agent(ctx: &AppContext, agent_id: AgentId) -> Option<agentmux::layout::NodeId> {
    ctx.workspace
        .current()
        .panes()
        .into_iter()
        .find(|(_, a)| *a == agent_id)
        .map(|(pane, _)| pane)
}

fn pane_height_map(ctx: &mut AppContext) -> HashMap<agentmux::layout::NodeId, (u16, u16)> {
    let panes = ctx.workspace.current().panes();
    let mut map = HashMap::new();
    for (pane, agent_id) in panes {
        let bounds = ctx.workspace.current().bounds_of(pane);
        if let Some(agent) = ctx.agents.get_mut(&agent_id) {
            map.insert(pane, (agent.vt.content_height(), bounds.height));
        }
    }
    map
}

/// Realize `tick()`'s "pin follow-tail panes to the bottom" intent at the
/// VT level: `Compositor::tick` flips `follow_tail` bookkeeping but has no
/// agent access to actually move the scrollback cursor.
fn pin_following_panes(ctx: &mut AppContext) {
    let panes = ctx.workspace.current().panes();
    for (pane, agent_id) in panes {
        let following = ctx.compositor.state(pane).map(|s| s.follow_tail).unwrap_or(false);
        if following {
            if let Some(agent) = ctx.agents.get_mut(&agent_id) {
                agent.vt.scroll_to_bottom();
            }
        }
    }
}

fn on_resize(ctx: &mut AppContext) {
    let (cols, rows) = ctx.terminal_size;
    ctx.workspace.current_mut().compute_bounds(Rect::new(0, 0, cols, rows));
    let snapshot: HashMap<_, _> = ctx
        .workspace
        .current()
        .panes()
        .into_iter()
        .map(|(pane, _)| (pane, ctx.compositor.state(pane).map(|s| s.frame_cache.clone()).unwrap_or_default()))
        .collect();
    ctx.compositor.resize_pipeline_mut().begin(snapshot);
    for (pane, agent_id) in ctx.workspace.current().panes() {
        if let Some(agent) = ctx.agents.get_mut(&agent_id) {
            let bounds = ctx.workspace.current().bounds_of(pane);
            let _ = agent.resize(bounds.width, bounds.height);
        }
    }
    ctx.compositor.schedule_draw();
    draw(ctx);
}

fn quit_all(ctx: &mut AppContext) -> i32 {
    for agent in ctx.agents.values_mut() {
        agent.kill();
    }
    0
}

/// Assemble one frame from live state and write it to stdout, wrapped in
/// DEC 2026 synchronized-update markers by `assemble` itself.
fn draw(ctx: &mut AppContext) {
    let tab_bar = render_tab_bar(ctx);
    let status_bar = render_status_bar(ctx);
    let (cols, rows) = ctx.terminal_size;
    let status_row = rows.saturating_sub(1);

    let zoomed = ctx.workspace.current().is_zoomed();
    let panes_in_view = ctx.workspace.current().panes();
    let focused = ctx.workspace.current().focused();

    let mode = ctx.router.mode();
    let search = ctx.search().map(|(regex, current)| (regex.clone(), current));
    let visual_anchor = ctx.visual_anchor();

    let mut pane_frames = Vec::new();
    let mut agent_cursor = None;
    for (pane, agent_id) in &panes_in_view {
        if zoomed && *pane != focused {
            continue;
        }
        let Some(agent) = ctx.agents.get(agent_id) else { continue };
        let mut bounds = ctx.workspace.current().bounds_of(*pane);
        bounds.y = bounds.y.saturating_add(1); // row 0 is the tab bar

        // Rendering reads the VT's own styled lines directly: scroll
        // events (wheel, page-scroll, gg/G) already drive the VT's
        // persistent scrollback cursor, and `styled_line`/`plain_line`
        // automatically reflect whatever offset it's sitting at.
        let live_lines: Vec<String> = (0..bounds.height).map(|i| agent.vt.styled_line(i)).collect();
        let mut lines = ctx.compositor.visible_lines(*pane, &live_lines).to_vec();

        if *pane == focused {
            if let Some((regex, current)) = &search {
                highlight_search(agent, &mut lines, bounds.height, regex, *current);
            }
            if matches!(mode, Mode::Visual | Mode::VisualLine) {
                if let Some(anchor) = visual_anchor {
                    let cursor = ctx.compositor.cursor_of(*pane);
                    highlight_visual(&mut lines, bounds.width, mode, anchor, cursor);
                }
            }

            match mode {
                Mode::Insert => {
                    let scroll_locked = ctx.compositor.state(*pane).map(|s| s.scroll_lock).unwrap_or(false);
                    if agent.is_running() && !scroll_locked {
                        let (row, col) = agent.vt.cursor();
                        let row_idx = (row as usize).min(lines.len().saturating_sub(1));
                        if let Some(line) = lines.get_mut(row_idx) {
                            *line = apply_cursor(line, col as usize);
                        }
                        agent_cursor = Some((bounds.y + row, bounds.x + col));
                    }
                }
                Mode::Normal | Mode::Visual | Mode::VisualLine => {
                    let (row, col) = ctx.compositor.cursor_of(*pane);
                    let row_idx = (row as usize).min(lines.len().saturating_sub(1));
                    if let Some(line) = lines.get_mut(row_idx) {
                        *line = apply_cursor(line, col as usize);
                    }
                }
                _ => {}
            }
        }

        pane_frames.push(PaneFrame { bounds, lines });
    }

    let borders: Vec<(u16, u16, char)> = if zoomed {
        Vec::new()
    } else {
        ctx.workspace.current().borders().into_iter().map(|(row, col, glyph)| (row + 1, col, glyph)).collect()
    };

    let input = FrameInput {
        tab_bar: &tab_bar,
        status_bar: &status_bar,
        status_row,
        panes: &pane_frames,
        borders: &borders,
        agent_cursor,
    };
    let frame = assemble(&input);
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(frame.as_bytes());
    let _ = stdout.flush();
    ctx.compositor.mark_drawn(Instant::now());
    let _ = cols;
}

/// Highlight every match of `regex` in the focused pane's visible lines,
/// marking the `current`-th match (flattened row-major) as the active one.
fn highlight_search(agent: &Agent, lines: &mut [String], height: u16, regex: &Regex, current: usize) {
    let mut flat_index = 0usize;
    for row in 0..height {
        let plain = agent.vt.plain_line(row);
        let matches: Vec<_> = regex.find_iter(&plain).map(|m| byte_range_to_char_range(&plain, m.start(), m.end())).collect();
        if matches.is_empty() {
            continue;
        }
        let current_match = if current >= flat_index && current < flat_index + matches.len() {
            Some(matches[current - flat_index].clone())
        } else {
            None
        };
        if let Some(line) = lines.get_mut(row as usize) {
            *line = apply_search(line, &matches, current_match.as_ref());
        }
        flat_index += matches.len();
    }
}

fn byte_range_to_char_range(s: &str, start: usize, end: usize) -> std::ops::Range<usize> {
    let char_start = s[..start].chars().count();
    let char_end = s[..end].chars().count();
    char_start..char_end
}

/// Highlight a visual/visual-line selection between `anchor` and `cursor`
/// (both `(row, col)`), both in the focused pane's own virtual-cursor
/// coordinates.
fn highlight_visual(lines: &mut [String], width: u16, mode: Mode, anchor: (u16, u16), cursor: (u16, u16)) {
    let width = width as usize;
    if mode == Mode::VisualLine {
        let (lo, hi) = if anchor.0 <= cursor.0 { (anchor.0, cursor.0) } else { (cursor.0, anchor.0) };
        for row in lo..=hi {
            if let Some(line) = lines.get_mut(row as usize) {
                *line = apply_visual(line, 0..width);
            }
        }
        return;
    }

    let (first, last) = if anchor.0 < cursor.0 || (anchor.0 == cursor.0 && anchor.1 <= cursor.1) {
        (anchor, cursor)
    } else {
        (cursor, anchor)
    };
    if first.0 == last.0 {
        if let Some(line) = lines.get_mut(first.0 as usize) {
            *line = apply_visual(line, first.1 as usize..last.1 as usize + 1);
        }
        return;
    }
    for row in first.0..=last.0 {
        let range = if row == first.0 {
            first.1 as usize..width
        } else if row == last.0 {
            0..(last.1 as usize + 1)
        } else {
            0..width
        };
        if let Some(line) = lines.get_mut(row as usize) {
            *line = apply_visual(line, range);
        }
    }
}

fn render_tab_bar(ctx: &AppContext) -> String {
    let mut out = String::new();
    for (i, _) in ctx.workspace.tabs().iter().enumerate() {
        if i == ctx.workspace.active_index() {
            out.push_str(&format!("[{}] ", i + 1));
        } else {
            out.push_str(&format!(" {}  ", i + 1));
        }
    }
    out
}

fn render_status_bar(ctx: &AppContext) -> String {
    if let Some(status) = &ctx.status {
        if Instant::now() < status.expires_at {
            return status.text.clone();
        }
    }
    format!("{:?}", ctx.router.mode())
}
