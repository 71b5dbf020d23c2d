//! Library-level tests for the multiplexer's headline scenarios: split
//! focus routing, Contract-Net conversation tracking, reflow churn
//! hiding, and session save/restore. These drive `AppContext`,
//! `MessageBus`, and `Compositor` directly rather than spawning the
//! built binary, so time-dependent behavior (S3, S4) can be exercised
//! with explicit `Instant` offsets instead of real sleeps.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use uuid::Uuid;

use agentmux::agent::{Agent, AgentEvent};
use agentmux::bus::{AclMessage, AclMessageBuilder, Performative, ProtocolState};
use agentmux::compositor::{Compositor, ReflowPhase};
use agentmux::config::Config;
use agentmux::dispatch::{self, AppContext, DispatchOutcome};
use agentmux::input::{Action, InputRouter};
use agentmux::layout::{LayoutTree, Rect};
use agentmux::session::{AgentSessionResolver, NoopResolver, SessionStore};
use agentmux::workspace::Workspace;

fn single_pane_ctx(command: &str) -> (AppContext, mpsc::UnboundedReceiver<AgentEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut agents = HashMap::new();
    let mut agent = Agent::new("a", "agent", command, vec![], HashMap::new(), 1000);
    agent.spawn(80, 24, tx.clone()).expect("spawn");
    let agent_id = agent.id;
    agents.insert(agent_id, agent);
    let tree = LayoutTree::new(agent_id, Rect::new(0, 0, 80, 24));
    let workspace = Workspace::new(tree);
    let mut ctx = AppContext::new(workspace, agents, Config::default(), Box::new(NoopResolver), tx, (80, 24));
    let pane = ctx.workspace.current().focused();
    ctx.compositor.on_pane_opened(pane, 24);
    (ctx, rx)
}

fn type_chars(router: &mut InputRouter, s: &str) -> Vec<Action> {
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    s.chars()
        .map(|c| router.handle(&KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)))
        .collect()
}

/// Drive a full `Ctrl-Space :<line> Enter` ex-command through the router,
/// dispatching every action it produces along the way.
fn ex_command(ctx: &mut AppContext, router: &mut InputRouter, line: &str) {
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    router.handle(&KeyEvent::new(KeyCode::Char(' '), KeyModifiers::CONTROL));
    let begin = router.handle(&KeyEvent::new(KeyCode::Char(':'), KeyModifiers::NONE));
    dispatch::dispatch(ctx, begin, Instant::now()).unwrap();
    for action in type_chars(router, line) {
        dispatch::dispatch(ctx, action, Instant::now()).unwrap();
    }
    let submit = router.handle(&KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
    dispatch::dispatch(ctx, submit, Instant::now()).unwrap();
}

/// S1: splitting routes subsequent insert-mode keystrokes only to the
/// newly focused pane, leaving the sibling untouched.
#[tokio::test]
async fn split_routes_keystrokes_to_the_focused_pane_only() {
    let (mut ctx, mut rx) = single_pane_ctx("cat");
    let agent_a_id = *ctx.agents.keys().next().unwrap();

    let mut router = InputRouter::new();

    // Ctrl-Space, ':', "sp cat", Enter — drives the router exactly as a
    // real keystroke sequence would.
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    let ctrl_space = router.handle(&KeyEvent::new(KeyCode::Char(' '), KeyModifiers::CONTROL));
    assert_eq!(ctrl_space, Action::Noop);
    let begin = router.handle(&KeyEvent::new(KeyCode::Char(':'), KeyModifiers::NONE));
    dispatch::dispatch(&mut ctx, begin, Instant::now()).unwrap();

    for action in type_chars(&mut router, "sp cat") {
        dispatch::dispatch(&mut ctx, action, Instant::now()).unwrap();
    }
    let submit = router.handle(&KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
    let outcome = dispatch::dispatch(&mut ctx, submit, Instant::now()).unwrap();
    assert!(matches!(outcome, DispatchOutcome::Continue));

    let panes = ctx.workspace.current().panes();
    assert_eq!(panes.len(), 2, "expected two panes after :sp");
    let (top, _) = panes[0];
    assert_eq!(ctx.workspace.current().agent_of(top), Some(agent_a_id), "A stays on top");

    let focused = ctx.workspace.current().focused();
    let agent_b_id = ctx.workspace.current().agent_of(focused).expect("focused pane has an agent");
    assert_ne!(agent_b_id, agent_a_id, "focus moved to the new pane B");

    // Insert-mode typing now forwards to B alone.
    for action in type_chars(&mut router, "hello") {
        assert!(matches!(action, Action::ForwardToAgent(_)));
        dispatch::dispatch(&mut ctx, action, Instant::now()).unwrap();
    }

    let mut saw_b_output = false;
    let mut saw_a_output = false;
    let deadline = Instant::now() + Duration::from_millis(500);
    while Instant::now() < deadline && !saw_b_output {
        if let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await {
            match event {
                AgentEvent::Output(id, _) if id == agent_b_id => saw_b_output = true,
                AgentEvent::Output(id, _) if id == agent_a_id => saw_a_output = true,
                _ => {}
            }
        }
    }
    assert!(saw_b_output, "B's pty should echo the forwarded keystrokes");
    assert!(!saw_a_output, "A's pty received nothing and should stay silent");
}

/// S3: a Contract-Net round — cfp, two replies, accept, inform — drives
/// the conversation to `completed` with the accepted worker's result.
#[tokio::test]
async fn contract_net_happy_path_completes_with_the_accepted_result() {
    let (mut ctx, _rx) = single_pane_ctx("true");
    let conversation_id = Uuid::new_v4();
    let manager = "manager".to_string();
    let worker1 = "worker1".to_string();
    let worker2 = "worker2".to_string();

    let t0 = Instant::now();
    let reply_by_ms = now_ms() + 200;

    let cfp = acl(
        Performative::Cfp,
        &manager,
        vec![worker1.clone(), worker2.clone()],
        conversation_id,
        serde_json::json!({"task": "build"}),
        Some(reply_by_ms),
    );
    dispatch::process_incoming_message(&mut ctx, envelope(&manager, "*", &cfp), t0).unwrap();

    let propose = acl(
        Performative::Propose,
        &worker1,
        vec![manager.clone()],
        conversation_id,
        serde_json::json!({"bid": 10}),
        None,
    );
    dispatch::process_incoming_message(&mut ctx, envelope(&worker1, &manager, &propose), t0 + Duration::from_millis(50)).unwrap();

    let refuse = acl(
        Performative::Refuse,
        &worker2,
        vec![manager.clone()],
        conversation_id,
        serde_json::json!({}),
        None,
    );
    dispatch::process_incoming_message(&mut ctx, envelope(&worker2, &manager, &refuse), t0 + Duration::from_millis(80)).unwrap();

    {
        let convo = ctx.bus.conversations().get(conversation_id).unwrap();
        assert_eq!(convo.state, ProtocolState::ProposalsReceived);
        assert!(convo.contract_net.as_ref().unwrap().has_any_proposal());
    }

    let accept = acl(
        Performative::AcceptProposal,
        &manager,
        vec![worker1.clone()],
        conversation_id,
        serde_json::json!({}),
        None,
    );
    dispatch::process_incoming_message(&mut ctx, envelope(&manager, &worker1, &accept), t0 + Duration::from_millis(200)).unwrap();

    let inform = acl(
        Performative::Inform,
        &worker1,
        vec![manager.clone()],
        conversation_id,
        serde_json::json!({"result": "done"}),
        None,
    );
    dispatch::process_incoming_message(&mut ctx, envelope(&worker1, &manager, &inform), t0 + Duration::from_millis(210)).unwrap();

    let convo = ctx.bus.conversations().get(conversation_id).unwrap();
    assert_eq!(convo.state, ProtocolState::Completed);
    assert!(convo.is_complete);
    let last = convo.messages.last().unwrap();
    assert_eq!(last.content["result"], "done");
}

/// S3 variant: if nobody proposes, the tally detects it and the
/// conversation fails rather than hanging on a deadline sweep alone.
#[tokio::test]
async fn contract_net_with_only_refusals_fails_immediately() {
    let (mut ctx, _rx) = single_pane_ctx("true");
    let conversation_id = Uuid::new_v4();
    let manager = "manager".to_string();
    let worker1 = "worker1".to_string();
    let t0 = Instant::now();

    let cfp = acl(Performative::Cfp, &manager, vec![worker1.clone()], conversation_id, serde_json::json!({}), None);
    dispatch::process_incoming_message(&mut ctx, envelope(&manager, "*", &cfp), t0).unwrap();

    let refuse = acl(Performative::Refuse, &worker1, vec![manager.clone()], conversation_id, serde_json::json!({}), None);
    dispatch::process_incoming_message(&mut ctx, envelope(&worker1, &manager, &refuse), t0 + Duration::from_millis(10)).unwrap();

    let convo = ctx.bus.conversations().get(conversation_id).unwrap();
    assert_eq!(convo.state, ProtocolState::Failed);
    assert!(convo.is_complete);
    assert_eq!(convo.completion_reason.as_deref(), Some("no-proposals"));
}

/// A `replyBy` deadline that elapses with no resolving message is swept
/// and the conversation is completed with reason `"timeout"`.
#[test]
fn unanswered_request_times_out_on_sweep() {
    let mut bus = agentmux::bus::MessageBus::new(Uuid::new_v4());
    let conversation_id = Uuid::new_v4();
    let t0 = Instant::now();
    bus.conversations_mut().start(conversation_id, "manager".into(), &["worker1".into()], Some("request".into()), false, t0);

    let message_id = Uuid::new_v4();
    bus.track_deadline(message_id, conversation_id, t0 + Duration::from_millis(200));

    let timed_out = bus.sweep_timeouts(t0 + Duration::from_millis(100));
    assert!(timed_out.is_empty(), "deadline hasn't elapsed yet");

    let timed_out = bus.sweep_timeouts(t0 + Duration::from_millis(250));
    assert_eq!(timed_out.len(), 1);
    assert_eq!(timed_out[0].conversation_id, conversation_id);
    let convo = bus.conversations().get(conversation_id).unwrap();
    assert!(convo.is_complete);
    assert_eq!(convo.completion_reason.as_deref(), Some("timeout"));
}

/// S4: a burst that moves content height by more than a screenful
/// freezes the rendered view at the pre-burst frame until the reflow
/// window settles, at most `MAX_MAX` (800ms) after the burst ends.
#[test]
fn reflow_hides_churn_behind_the_cached_frame() {
    let pane = LayoutTree::new(agentmux::agent::AgentId::new(), Rect::new(0, 0, 80, 20)).root();
    let mut compositor = Compositor::new(Duration::from_millis(33));
    compositor.on_pane_opened(pane, 200);

    let pre_burst_lines: Vec<String> = (0..20).map(|i| format!("stable line {i}")).collect();
    compositor.cache_lines(pane, pre_burst_lines.clone());

    let t0 = Instant::now();
    // The burst replaces all 200 lines within 5ms: content height collapses
    // to a handful of fresh lines, a delta far larger than the pane's
    // height, so the reflow state machine enters `Reflowing`.
    compositor.on_data(pane, t0 + Duration::from_millis(5), 4, 20);
    assert_eq!(compositor.state(pane).unwrap().reflow.phase(), ReflowPhase::Reflowing);

    let live_lines: Vec<String> = (0..20).map(|i| format!("churned {i}")).collect();
    let visible = compositor.visible_lines(pane, &live_lines);
    assert_eq!(visible, pre_burst_lines.as_slice(), "frame cache hides the churn");

    let mut pane_heights = HashMap::new();
    pane_heights.insert(pane, (4u16, 20u16));

    // Still within the silence/max window: nothing changes yet.
    compositor.tick(t0 + Duration::from_millis(50), &pane_heights);
    assert_eq!(compositor.state(pane).unwrap().reflow.phase(), ReflowPhase::Reflowing);

    // At most 800ms after the burst, rendering resumes from the live buffer.
    compositor.tick(t0 + Duration::from_millis(801), &pane_heights);
    assert_eq!(compositor.state(pane).unwrap().reflow.phase(), ReflowPhase::Idle);
    let visible = compositor.visible_lines(pane, &live_lines);
    assert_eq!(visible, live_lines.as_slice());
}

/// A resolver that always reports a prior session, so resume argv
/// assembly can be exercised without a real child-agent integration.
struct AlwaysResumable;

impl AgentSessionResolver for AlwaysResumable {
    fn resolve_latest_session_id(&self, _agent_type: &str, _cwd: &Path, _spawned_at_ms: i64, _excluded: &[String]) -> Option<String> {
        Some("sess-xyz".to_string())
    }

    fn resume_argv(&self, _agent_type: &str, session_id: &str) -> Vec<String> {
        vec!["--resume".to_string(), session_id.to_string()]
    }
}

/// S5: saving a three-pane layout and restoring it preserves the pane
/// tree, the focused pane, and appends each agent's resume argv.
#[tokio::test]
async fn save_restore_preserves_layout_focus_and_resume_argv() {
    let (mut ctx, _rx) = single_pane_ctx("true");
    let mut router = InputRouter::new();

    // `vsp true` then `sp true` — real executables, driven through the
    // same ex-command path a user's keystrokes would take.
    ex_command(&mut ctx, &mut router, "vsp true");
    let pane_b = ctx.workspace.current().focused();
    let agent_b = ctx.workspace.current().agent_of(pane_b).unwrap();

    ex_command(&mut ctx, &mut router, "sp true");
    let pane_c = ctx.workspace.current().focused();
    assert_ne!(pane_c, pane_b);

    // Focus back onto the middle pane before saving.
    ctx.workspace.current_mut().set_focused(pane_b);
    assert_eq!(ctx.workspace.current().panes().len(), 3);

    ctx.session_name = Some("myproj".to_string());
    ctx.session_created_at = 1_000;
    let mut session = SessionStore::snapshot(ctx.session_id, "myproj", 1_000, &ctx.agents, ctx.workspace.current(), &[]);
    assert_eq!(session.focused_pane_agent_id, agent_b);
    assert_eq!(count_snapshot_panes(&session.layout), 3);

    let (tx, _rx) = mpsc::unbounded_channel();
    let restored = dispatch::restore_from_session(&session, &PathBuf::from("/tmp"), Config::default(), Box::new(AlwaysResumable), tx, (80, 24)).unwrap();

    assert_eq!(restored.workspace.current().panes().len(), 3);
    let restored_focused = restored.workspace.current().focused();
    assert_eq!(restored.workspace.current().agent_of(restored_focused), Some(agent_b));

    for agent in restored.agents.values() {
        assert_eq!(agent.argv, vec!["--resume".to_string(), "sess-xyz".to_string()]);
    }
    assert_eq!(restored.session_name.as_deref(), Some("myproj"));

    // The original session's agents never had resume args before saving.
    session.agents.values_mut().for_each(|d| assert!(d.argv.is_empty()));
}

fn count_snapshot_panes(snapshot: &agentmux::layout::LayoutSnapshot) -> usize {
    use agentmux::layout::LayoutSnapshot;
    match snapshot {
        LayoutSnapshot::Pane { .. } => 1,
        LayoutSnapshot::Container { children, .. } => children.iter().map(count_snapshot_panes).sum(),
    }
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn acl(
    performative: Performative,
    sender: &str,
    receivers: Vec<String>,
    conversation_id: Uuid,
    content: serde_json::Value,
    reply_by: Option<i64>,
) -> AclMessage {
    AclMessage::new(
        AclMessageBuilder {
            performative,
            sender: sender.to_string(),
            receivers,
            content,
            language: "json".into(),
            encoding: "utf-8".into(),
            ontology: "agentmux".into(),
            protocol: Some("contract-net".into()),
            conversation_id,
            reply_with: None,
            in_reply_to: None,
            reply_by,
        },
        now_ms(),
    )
}

fn envelope(from: &str, to: &str, acl: &AclMessage) -> agentmux::bus::BusMessage {
    agentmux::bus::BusMessage {
        id: acl.id,
        timestamp: acl.timestamp,
        from: from.to_string(),
        to: to.to_string(),
        kind: agentmux::bus::MessageKind::Request,
        method: format!("fipa:{}", acl.performative.wire_name()),
        payload: serde_json::json!({ "_fipaMessage": acl }),
        reply_to: None,
        iac_envelope: None,
    }
}

