//! Inter-agent message bus: FIPA speech acts over a newline-delimited
//! JSON socket (spec §4.7, §6.4).

pub mod acl;
pub mod conversation;
pub mod prompt;
pub mod protocol;
pub mod transport;

pub use acl::{AclMessage, AclMessageBuilder, Performative};
pub use conversation::{Conversation, ConversationManager};
pub use prompt::{format_message, iac_envelope, ExpectedResponse, PromptStyle};
pub use protocol::{ContractNetTally, ProtocolKind, ProtocolState};
pub use transport::{BusMessage, MessageKind, MessageWriter};

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::error::{MuxError, Result};

/// A conversation that has timed out because its `replyBy` deadline
/// elapsed with no resolving event.
pub struct TimedOutConversation {
    pub conversation_id: Uuid,
}

/// Routes [`BusMessage`]s between connected agent clients and drives the
/// FIPA layer (conversations, protocol state, pending-request deadlines)
/// on top of the raw transport.
pub struct MessageBus {
    session_id: Uuid,
    registry: HashMap<String, UnboundedSender<BusMessage>>,
    conversations: ConversationManager,
    /// `replyBy` deadlines for outstanding requests, keyed by message id.
    pending_deadlines: HashMap<Uuid, (Uuid, Instant)>,
}

impl MessageBus {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            registry: HashMap::new(),
            conversations: ConversationManager::new(),
            pending_deadlines: HashMap::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn register(&mut self, agent_id: String, sender: UnboundedSender<BusMessage>) {
        self.registry.insert(agent_id, sender);
    }

    /// Drop a client's outgoing channel; emits no event itself, the caller
    /// logs `agent:disconnected` (spec §7).
    pub fn unregister(&mut self, agent_id: &str) {
        self.registry.remove(agent_id);
    }

    pub fn conversations(&self) -> &ConversationManager {
        &self.conversations
    }

    pub fn conversations_mut(&mut self) -> &mut ConversationManager {
        &mut self.conversations
    }

    /// Route `message` to its destination(s): a specific registered agent,
    /// or every registered agent except the sender when `to == "*"`.
    /// Responses are matched by `replyTo` and simply routed like any other
    /// message — the pending-request bookkeeping lives in
    /// `pending_deadlines`, not here.
    pub fn route(&mut self, message: BusMessage, now: Instant) -> Result<()> {
        if let Some(reply_to) = message.reply_to {
            self.pending_deadlines.remove(&reply_to);
        }
        if let Some(deadline_ms) = message
            .payload
            .get("replyBy")
            .and_then(|v| v.as_i64())
        {
            let _ = deadline_ms; // epoch ms is advisory; callers schedule via reply_by_deadline
        }

        if message.is_broadcast() {
            for (agent_id, sender) in &self.registry {
                if agent_id != &message.from {
                    let _ = sender.send(message.clone());
                }
            }
            Ok(())
        } else {
            self.registry
                .get(&message.to)
                .ok_or_else(|| MuxError::ProtocolError(format!("unknown recipient: {}", message.to)))
                .map(|sender| {
                    let _ = sender.send(message);
                })
        }
    }

    /// Register a pending request's deadline so [`sweep_timeouts`] can
    /// find it later.
    ///
    /// [`sweep_timeouts`]: Self::sweep_timeouts
    pub fn track_deadline(&mut self, message_id: Uuid, conversation_id: Uuid, deadline: Instant) {
        self.pending_deadlines.insert(message_id, (conversation_id, deadline));
    }

    /// Resolve every pending request whose deadline has elapsed: the
    /// conversation completes with reason `"timeout"` and the pending
    /// promise (tracked by the caller) resolves with `null` rather than
    /// an error.
    pub fn sweep_timeouts(&mut self, now: Instant) -> Vec<TimedOutConversation> {
        let expired: Vec<Uuid> = self
            .pending_deadlines
            .iter()
            .filter(|(_, (_, deadline))| now >= *deadline)
            .map(|(id, _)| *id)
            .collect();

        let mut timed_out = Vec::new();
        for id in expired {
            if let Some((conversation_id, _)) = self.pending_deadlines.remove(&id) {
                if let Ok(convo) = self.conversations.get_mut(conversation_id) {
                    if !convo.is_complete {
                        convo.complete("timeout", now);
                    }
                }
                timed_out.push(TimedOutConversation { conversation_id });
            }
        }
        timed_out
    }

    /// Cancel every pending deadline and drop every registered client;
    /// called on hub shutdown.
    pub fn shutdown(&mut self) {
        self.pending_deadlines.clear();
        self.registry.clear();
    }
}
