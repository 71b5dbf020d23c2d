//! Modal dialogs drawn atop panes: the agent picker (for `:e`/`:sp`/`:vs`
//! without an explicit type) and the ACL message composer opened by the
//! FIPA-sub chord (spec §4.10, C10).

use crate::bus::{Performative, PromptStyle};
use crate::error::{MuxError, Result};
use crate::layout::NodeId;

/// One open modal dialog. At most one is active at a time — opening a
/// second while one is open is rejected with `OverlayReject`.
#[derive(Debug, Clone)]
pub enum Overlay {
    /// Pick an agent type for a new tab or split.
    AgentPicker { choices: Vec<String>, selected: usize },
    /// Compose an ACL message to send from the focused pane's agent.
    AclComposer {
        performative: Performative,
        target: Option<NodeId>,
        style: PromptStyle,
        content: String,
    },
}

/// Owns at most one active [`Overlay`] and the keystrokes/text routed to it.
#[derive(Debug, Default)]
pub struct OverlayManager {
    active: Option<Overlay>,
}

impl OverlayManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&Overlay> {
        self.active.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Open the agent picker. Rejects if a dialog is already open.
    pub fn open_agent_picker(&mut self, choices: Vec<String>) -> Result<()> {
        if self.active.is_some() {
            return Err(MuxError::OverlayReject("a dialog is already open".into()));
        }
        self.active = Some(Overlay::AgentPicker { choices, selected: 0 });
        Ok(())
    }

    pub fn open_acl_composer(&mut self, performative: Performative, target: Option<NodeId>, style: PromptStyle) -> Result<()> {
        if self.active.is_some() {
            return Err(MuxError::OverlayReject("a dialog is already open".into()));
        }
        self.active = Some(Overlay::AclComposer { performative, target, style, content: String::new() });
        Ok(())
    }

    /// Append a character typed while the composer dialog is open.
    pub fn push_char(&mut self, c: char) {
        if let Some(Overlay::AclComposer { content, .. }) = &mut self.active {
            content.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(Overlay::AclComposer { content, .. }) = &mut self.active {
            content.pop();
        }
    }

    /// Move the agent picker's selection by `delta`, wrapping.
    pub fn move_selection(&mut self, delta: i32) {
        if let Some(Overlay::AgentPicker { choices, selected }) = &mut self.active {
            if choices.is_empty() {
                return;
            }
            let len = choices.len() as i32;
            let next = ((*selected as i32 + delta) % len + len) % len;
            *selected = next as usize;
        }
    }

    /// Close whatever dialog is open, returning it so the caller can act
    /// on its final contents (e.g. actually send the composed message).
    pub fn dismiss(&mut self) -> Option<Overlay> {
        self.active.take()
    }
}
