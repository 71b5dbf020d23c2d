//! Session persistence: a JSON snapshot of the layout tree, agent
//! descriptors, and conversation history (spec §4.8, §6.5), restored
//! with the right resume arguments via an [`AgentSessionResolver`].

pub mod resolver;

pub use resolver::{AgentSessionResolver, NoopResolver};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::{Agent, AgentId, AgentStatus};
use crate::bus::{AclMessage, Conversation};
use crate::error::{MuxError, Result};
use crate::layout::{LayoutSnapshot, LayoutTree};

/// One agent's persisted descriptor — everything needed to respawn it,
/// minus the live PTY and VT buffer (spec §3, `Agent`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub id: AgentId,
    pub name: String,
    pub kind: String,
    pub command: String,
    pub argv: Vec<String>,
    pub env: HashMap<String, String>,
    pub status: AgentStatus,
    pub exit_code: Option<i32>,
    pub resumed_session_id: Option<Uuid>,
}

impl AgentDescriptor {
    pub fn from_agent(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            name: agent.name.clone(),
            kind: agent.kind.clone(),
            command: agent.command.clone(),
            argv: agent.argv.clone(),
            env: agent.env.clone(),
            status: agent.status,
            exit_code: agent.exit_code,
            resumed_session_id: agent.resumed_session_id,
        }
    }
}

/// A persisted conversation, stripped of the live `Instant`-based timing
/// and reconstructed protocol-state-machine instance (round-trip
/// invariant, spec §8: "ignoring live PTY state and protocol instances,
/// which are reconstructed").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub id: Uuid,
    pub initiator: String,
    pub protocol: Option<String>,
    pub messages: Vec<AclMessage>,
    pub is_complete: bool,
    pub completion_reason: Option<String>,
    pub involves_user: bool,
}

impl ConversationSnapshot {
    pub fn from_conversation(convo: &Conversation) -> Self {
        Self {
            id: convo.id,
            initiator: convo.initiator.clone(),
            protocol: convo.protocol.clone(),
            messages: convo.messages.clone(),
            is_complete: convo.is_complete,
            completion_reason: convo.completion_reason.clone(),
            involves_user: convo.involves_user,
        }
    }
}

/// The full serializable document for one session (spec §3, `Session`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub agents: HashMap<String, AgentDescriptor>,
    pub layout: LayoutSnapshot,
    pub focused_pane_agent_id: AgentId,
    pub conversations: Vec<ConversationSnapshot>,
}

/// A row in a session listing (spec §4.8: "count-of-agents and short
/// summary fields").
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub name: String,
    pub updated_at: i64,
    pub agent_count: usize,
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Reads and writes session documents under `$HOME/.config/<app>/sessions/`.
pub struct SessionStore {
    sessions_dir: PathBuf,
}

impl SessionStore {
    pub fn new(sessions_dir: PathBuf) -> Self {
        Self { sessions_dir }
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.sessions_dir.join(format!("{id}.json"))
    }

    /// Serialize `session` (bumping `updated_at`) to its JSON file,
    /// creating the sessions directory if needed.
    pub fn save(&self, session: &mut Session) -> Result<()> {
        session.updated_at = now_epoch_ms();
        std::fs::create_dir_all(&self.sessions_dir)?;
        let json = serde_json::to_string_pretty(session).map_err(|e| MuxError::SessionCorrupt(e.to_string()))?;
        std::fs::write(self.path_for(session.id), json)?;
        Ok(())
    }

    /// Load a session by uuid or by exact name match, preferring the most
    /// recently updated session when more than one shares a name. `"latest"`
    /// resolves to the most recently updated session overall.
    pub fn load(&self, id_or_name: &str) -> Result<Session> {
        if id_or_name.eq_ignore_ascii_case("latest") {
            return self
                .list()?
                .into_iter()
                .next()
                .ok_or_else(|| MuxError::SessionNotFound("latest".into()))
                .and_then(|summary| self.load_by_id(summary.id));
        }
        if let Ok(id) = Uuid::parse_str(id_or_name) {
            return self.load_by_id(id);
        }
        self.list()?
            .into_iter()
            .find(|s| s.name == id_or_name)
            .ok_or_else(|| MuxError::SessionNotFound(id_or_name.to_string()))
            .and_then(|summary| self.load_by_id(summary.id))
    }

    fn load_by_id(&self, id: Uuid) -> Result<Session> {
        let path = self.path_for(id);
        let data = std::fs::read_to_string(&path).map_err(|_| MuxError::SessionNotFound(id.to_string()))?;
        serde_json::from_str(&data).map_err(|e| MuxError::SessionCorrupt(e.to_string()))
    }

    /// Every valid session file, sorted by `updated_at` descending.
    /// Invalid files are skipped (spec §6.5).
    pub fn list(&self) -> Result<Vec<SessionSummary>> {
        let mut summaries = Vec::new();
        let entries = match std::fs::read_dir(&self.sessions_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(MuxError::Io(e)),
        };
        for entry in entries.flatten() {
            let Ok(data) = std::fs::read_to_string(entry.path()) else { continue };
            let Ok(session) = serde_json::from_str::<Session>(&data) else { continue };
            summaries.push(SessionSummary {
                id: session.id,
                name: session.name,
                updated_at: session.updated_at,
                agent_count: session.agents.len(),
            });
        }
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    /// Build a fresh [`Session`] document from live state, ready to save.
    pub fn snapshot(
        id: Uuid,
        name: impl Into<String>,
        created_at: i64,
        agents: &HashMap<AgentId, Agent>,
        layout: &LayoutTree,
        conversations: &[ConversationSnapshot],
    ) -> Session {
        let focused_pane_agent_id = layout
            .agent_of(layout.focused())
            .expect("focused node must be a pane");
        Session {
            id,
            name: name.into(),
            created_at,
            updated_at: now_epoch_ms(),
            agents: agents
                .values()
                .map(|a| (a.id.to_string(), AgentDescriptor::from_agent(a)))
                .collect(),
            layout: layout.snapshot(),
            focused_pane_agent_id,
            conversations: conversations.to_vec(),
        }
    }

    /// Build the resume argv for one restored agent: its persisted argv
    /// with the resolver's resume-argument sequence appended, when a
    /// prior session id is known.
    pub fn resume_argv(descriptor: &AgentDescriptor, resolver: &dyn AgentSessionResolver, cwd: &Path) -> Vec<String> {
        let mut argv = descriptor.argv.clone();
        let session_id = descriptor.resumed_session_id.map(|id| id.to_string()).or_else(|| {
            resolver.resolve_latest_session_id(&descriptor.kind, cwd, 0, &[])
        });
        if let Some(session_id) = session_id {
            argv.extend(resolver.resume_argv(&descriptor.kind, &session_id));
        }
        argv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Orientation, Rect};

    fn sample_session() -> Session {
        let tree = LayoutTree::new(AgentId::new(), Rect::new(0, 0, 80, 24));
        let focused_pane_agent_id = tree.agent_of(tree.focused()).unwrap();
        Session {
            id: Uuid::new_v4(),
            name: "myproj".into(),
            created_at: 0,
            updated_at: 0,
            agents: HashMap::new(),
            layout: tree.snapshot(),
            focused_pane_agent_id,
            conversations: Vec::new(),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());
        let mut session = sample_session();
        let id = session.id;
        store.save(&mut session).unwrap();

        let loaded = store.load(&id.to_string()).unwrap();
        assert_eq!(loaded.id, id);
        assert_eq!(loaded.name, "myproj");
    }

    #[test]
    fn load_by_name_finds_saved_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());
        let mut session = sample_session();
        store.save(&mut session).unwrap();

        let loaded = store.load("myproj").unwrap();
        assert_eq!(loaded.id, session.id);
    }

    #[test]
    fn list_skips_corrupt_files_and_sorts_descending() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());

        let mut older = sample_session();
        older.updated_at = 100;
        store.save(&mut older).unwrap();
        // save() overwrites updated_at with "now"; force the ordering we
        // want to assert by writing the file directly instead.
        std::fs::write(
            dir.path().join(format!("{}.json", older.id)),
            serde_json::to_string(&older).unwrap(),
        )
        .unwrap();

        let mut newer = sample_session();
        newer.updated_at = 200;
        std::fs::write(
            dir.path().join(format!("{}.json", newer.id)),
            serde_json::to_string(&newer).unwrap(),
        )
        .unwrap();

        std::fs::write(dir.path().join("garbage.json"), "not json").unwrap();

        let listing = store.list().unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].id, newer.id);
    }

    #[test]
    fn load_unknown_name_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());
        assert!(store.load("nope").is_err());
    }
}
