//! A single child process: its PTY, its headless VT buffer, and the
//! bookkeeping the rest of the multiplexer needs to address it.

mod pty;
mod vt;

pub use pty::{spawn_cli_reader_thread, AgentEvent};
pub use vt::VtBuffer;

use std::collections::HashMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::error::{MuxError, Result};

/// Stable identifier for an agent, independent of its pane in the layout
/// tree. Panes reference agents by id (a "weak reference" per the data
/// model) so closing a pane never implicitly kills the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of an agent's child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStatus {
    Stopped,
    Running,
    Error,
}

/// Everything the multiplexer knows about one spawned coding assistant.
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub kind: String,
    pub command: String,
    pub argv: Vec<String>,
    pub env: HashMap<String, String>,
    pub status: AgentStatus,
    pub exit_code: Option<i32>,
    pub spawned_at: Option<SystemTime>,
    pub resumed_session_id: Option<Uuid>,
    pub vt: VtBuffer,
    handle: Option<pty::PtyHandle>,
}

impl Agent {
    /// Create an agent descriptor in the `Stopped` state. Call [`spawn`]
    /// to actually start the child process.
    ///
    /// [`spawn`]: Agent::spawn
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        command: impl Into<String>,
        argv: Vec<String>,
        env: HashMap<String, String>,
        scrollback: usize,
    ) -> Self {
        Self {
            id: AgentId::new(),
            name: name.into(),
            kind: kind.into(),
            command: command.into(),
            argv,
            env,
            status: AgentStatus::Stopped,
            exit_code: None,
            spawned_at: None,
            resumed_session_id: None,
            vt: VtBuffer::new(24, 80, scrollback),
            handle: None,
        }
    }

    /// Start the child process in a PTY sized `(cols, rows)` and begin
    /// forwarding its output through `events`. Fails with `SpawnFailed`
    /// if the executable cannot be started.
    pub fn spawn(&mut self, cols: u16, rows: u16, events: UnboundedSender<AgentEvent>) -> Result<()> {
        let handle = pty::PtyHandle::spawn(&self.command, &self.argv, &self.env, cols, rows, self.id, events)
            .map_err(|e| MuxError::SpawnFailed(format!("{}: {e}", self.command)))?;
        self.vt = VtBuffer::new(rows, cols, self.vt.scrollback_limit());
        self.handle = Some(handle);
        self.status = AgentStatus::Running;
        self.spawned_at = Some(SystemTime::now());
        Ok(())
    }

    /// Write bytes to the child's stdin. No-op once stopped.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if let Some(handle) = self.handle.as_mut() {
            handle.write(bytes)?;
        }
        Ok(())
    }

    /// Resize the PTY and the VT buffer; the child receives SIGWINCH.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        if let Some(handle) = self.handle.as_mut() {
            handle.resize(cols, rows)?;
        }
        self.vt.resize(rows, cols);
        Ok(())
    }

    /// Feed a chunk of PTY output into the VT buffer, replying to any
    /// embedded cursor-position query (`ESC [ 6 n`) before the bytes are
    /// otherwise interpreted.
    pub fn feed_output(&mut self, bytes: &[u8]) -> Result<()> {
        if vt::contains_dsr(bytes) {
            let (row, col) = self.vt.cursor();
            let reply = format!("\x1b[{};{}R", row + 1, col + 1);
            self.write(reply.as_bytes())?;
        }
        self.vt.process(bytes);
        Ok(())
    }

    /// Mark the agent stopped after its child process has exited.
    pub fn mark_exited(&mut self, exit_code: Option<i32>) {
        self.exit_code = exit_code;
        self.status = match exit_code {
            Some(0) | None => AgentStatus::Stopped,
            Some(_) => AgentStatus::Error,
        };
        self.handle = None;
    }

    /// Send SIGTERM to the child. Idempotent: a no-op once already stopped.
    pub fn kill(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            handle.kill();
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == AgentStatus::Running
    }

    /// The child process's OS pid, for SIGSTOP/SIGCONT forwarding on
    /// terminal suspend/resume. `None` once stopped.
    pub fn pid(&self) -> Option<u32> {
        self.handle.as_ref().and_then(|h| h.pid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_agent_starts_stopped() {
        let agent = Agent::new("codex", "codex", "codex", vec![], HashMap::new(), 1000);
        assert_eq!(agent.status, AgentStatus::Stopped);
        assert!(agent.exit_code.is_none());
    }

    #[test]
    fn mark_exited_zero_is_stopped_nonzero_is_error() {
        let mut agent = Agent::new("a", "a", "a", vec![], HashMap::new(), 1000);
        agent.status = AgentStatus::Running;
        agent.mark_exited(Some(0));
        assert_eq!(agent.status, AgentStatus::Stopped);

        let mut agent2 = Agent::new("b", "b", "b", vec![], HashMap::new(), 1000);
        agent2.status = AgentStatus::Running;
        agent2.mark_exited(Some(1));
        assert_eq!(agent2.status, AgentStatus::Error);
    }

    #[test]
    fn kill_before_spawn_is_a_noop() {
        let mut agent = Agent::new("a", "a", "a", vec![], HashMap::new(), 1000);
        agent.kill(); // must not panic
    }
}
