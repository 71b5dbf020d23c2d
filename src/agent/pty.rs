//! PTY spawn/resize/kill, following the reader-thread-plus-channel bridge
//! the teacher uses to get synchronous `portable_pty` reads onto an async
//! event loop.

use std::collections::HashMap;
use std::io::{Read, Write};

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tokio::sync::mpsc::UnboundedSender;

use super::AgentId;

/// An event produced by a running agent's reader thread.
#[derive(Debug)]
pub enum AgentEvent {
    /// A chunk of raw PTY output.
    Output(AgentId, Vec<u8>),
    /// The child process exited.
    Exited(AgentId, Option<i32>),
}

/// Live handle to a spawned child's PTY, held by [`Agent`](super::Agent).
pub struct PtyHandle {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
}

fn build_command(command: &str, argv: &[String], env: &HashMap<String, String>) -> CommandBuilder {
    let mut cmd = CommandBuilder::new(command);
    cmd.args(argv);
    for (k, v) in env {
        cmd.env(k, v);
    }
    cmd
}

impl PtyHandle {
    /// Open a PTY sized `(cols, rows)`, start `command argv...` inside it,
    /// and spawn a background thread forwarding its output as
    /// [`AgentEvent`]s through `events`.
    pub fn spawn(
        command: &str,
        argv: &[String],
        env: &HashMap<String, String>,
        cols: u16,
        rows: u16,
        agent_id: AgentId,
        events: UnboundedSender<AgentEvent>,
    ) -> anyhow::Result<Self> {
        let pty_system = native_pty_system();
        let pair = pty_system.openpty(PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        })?;

        let cmd = build_command(command, argv, env);
        let child = pair.slave.spawn_command(cmd)?;
        // The slave end only needs to live long enough to hand the child
        // its controlling terminal; dropping it here matches the
        // teacher's `spawn.rs`.
        drop(pair.slave);

        let reader = pair.master.try_clone_reader()?;
        let writer = pair.master.take_writer()?;

        spawn_cli_reader_thread(agent_id, reader, events);

        Ok(Self {
            master: pair.master,
            writer,
            child,
        })
    }

    pub fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()
    }

    pub fn resize(&mut self, cols: u16, rows: u16) -> std::io::Result<()> {
        self.master
            .resize(PtySize { rows, cols, pixel_width: 0, pixel_height: 0 })
            .map_err(|e| std::io::Error::other(e.to_string()))
    }

    pub fn kill(&mut self) {
        let _ = self.child.kill();
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.process_id()
    }
}

/// Blocking reader thread: pumps PTY output into `events` until EOF, then
/// reports the child's exit code. Runs off the async runtime because
/// `portable_pty`'s reader is a plain blocking `Read`.
pub fn spawn_cli_reader_thread(
    agent_id: AgentId,
    mut reader: Box<dyn Read + Send>,
    events: UnboundedSender<AgentEvent>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if events.send(AgentEvent::Output(agent_id, buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        let _ = events.send(AgentEvent::Exited(agent_id, None));
    })
}
