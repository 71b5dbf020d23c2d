//! Conversation tracking and LRU eviction (spec §4.7).

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use uuid::Uuid;

use super::acl::{AclMessage, ParticipantId};
use super::protocol::{ContractNetTally, ProtocolState};
use crate::error::{MuxError, Result};

const MAX_CONVERSATIONS: usize = 1000;
const COMPLETED_TTL: Duration = Duration::from_secs(30);
const STALE_TTL: Duration = Duration::from_secs(5 * 60);

/// A single multi-party exchange, ordered by message timestamp and
/// de-duplicated on message id.
pub struct Conversation {
    pub id: Uuid,
    pub initiator: ParticipantId,
    pub protocol: Option<String>,
    pub messages: Vec<AclMessage>,
    pub start_time: Instant,
    pub last_activity: Instant,
    pub is_complete: bool,
    pub completed_at: Option<Instant>,
    pub completion_reason: Option<String>,
    pub state: ProtocolState,
    /// Only populated for Contract-Net conversations.
    pub contract_net: Option<ContractNetTally>,
    seen_ids: HashSet<Uuid>,
    /// Conversations with a human-facing participant are never evicted by
    /// the LRU sweep regardless of age.
    pub involves_user: bool,
}

impl Conversation {
    fn new(id: Uuid, initiator: ParticipantId, protocol: Option<String>, involves_user: bool, now: Instant) -> Self {
        Self {
            id,
            initiator,
            protocol,
            messages: Vec::new(),
            start_time: now,
            last_activity: now,
            is_complete: false,
            completed_at: None,
            completion_reason: None,
            state: ProtocolState::Initiated,
            contract_net: None,
            seen_ids: HashSet::new(),
            involves_user,
        }
    }

    /// Insert `message`, maintaining timestamp order and id de-duplication.
    /// Returns `false` (a no-op) if a message with the same `_id` was
    /// already recorded.
    pub fn add_message(&mut self, message: AclMessage, now: Instant) -> bool {
        if !self.seen_ids.insert(message.id) {
            return false;
        }
        let pos = self
            .messages
            .iter()
            .position(|m| m.timestamp > message.timestamp)
            .unwrap_or(self.messages.len());
        self.messages.insert(pos, message);
        self.last_activity = now;
        true
    }

    pub fn complete(&mut self, reason: impl Into<String>, now: Instant) {
        self.is_complete = true;
        self.completed_at = Some(now);
        self.completion_reason = Some(reason.into());
    }
}

/// Indexes conversations by id and by participant, and evicts completed
/// or stale ones once the table grows past `maxConversations`.
pub struct ConversationManager {
    conversations: HashMap<Uuid, Conversation>,
    by_participant: HashMap<ParticipantId, HashSet<Uuid>>,
}

impl Default for ConversationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationManager {
    pub fn new() -> Self {
        Self {
            conversations: HashMap::new(),
            by_participant: HashMap::new(),
        }
    }

    pub fn start(
        &mut self,
        id: Uuid,
        initiator: ParticipantId,
        participants: &[ParticipantId],
        protocol: Option<String>,
        involves_user: bool,
        now: Instant,
    ) {
        self.conversations
            .insert(id, Conversation::new(id, initiator.clone(), protocol, involves_user, now));
        for p in std::iter::once(&initiator).chain(participants) {
            self.by_participant.entry(p.clone()).or_default().insert(id);
        }
        self.evict(now);
    }

    pub fn get(&self, id: Uuid) -> Result<&Conversation> {
        self.conversations
            .get(&id)
            .ok_or_else(|| MuxError::ConversationNotFound(id.to_string()))
    }

    pub fn get_mut(&mut self, id: Uuid) -> Result<&mut Conversation> {
        self.conversations
            .get_mut(&id)
            .ok_or_else(|| MuxError::ConversationNotFound(id.to_string()))
    }

    /// Every tracked conversation, in arbitrary order — used when building
    /// a session snapshot, which needs all of them regardless of who's a
    /// participant.
    pub fn all(&self) -> Vec<&Conversation> {
        self.conversations.values().collect()
    }

    pub fn for_participant(&self, participant: &str) -> Vec<Uuid> {
        self.by_participant
            .get(participant)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Evict completed conversations older than 30s and stale ones older
    /// than 5 minutes, never touching one with `involves_user`. Runs
    /// automatically when the table exceeds `maxConversations`, but can
    /// also be called eagerly (e.g. by a periodic sweep).
    pub fn evict(&mut self, now: Instant) {
        if self.conversations.len() <= MAX_CONVERSATIONS {
            return;
        }
        let mut to_remove = Vec::new();
        for (id, convo) in &self.conversations {
            if convo.involves_user {
                continue;
            }
            if convo.is_complete {
                if let Some(completed_at) = convo.completed_at {
                    if now.duration_since(completed_at) > COMPLETED_TTL {
                        to_remove.push(*id);
                        continue;
                    }
                }
            }
            if now.duration_since(convo.last_activity) > STALE_TTL {
                to_remove.push(*id);
            }
        }
        for id in to_remove {
            self.remove(id);
        }
    }

    fn remove(&mut self, id: Uuid) {
        if let Some(convo) = self.conversations.remove(&id) {
            for p in std::iter::once(&convo.initiator).chain(convo.messages.iter().flat_map(|m| m.receivers.iter())) {
                if let Some(set) = self.by_participant.get_mut(p) {
                    set.remove(&id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::acl::{AclMessageBuilder, Performative};

    fn message(conversation_id: Uuid, id: Uuid, timestamp: i64) -> AclMessage {
        let mut m = AclMessage::new(
            AclMessageBuilder {
                performative: Performative::Inform,
                sender: "a".into(),
                receivers: vec!["b".into()],
                content: serde_json::json!({}),
                language: "json".into(),
                encoding: "utf-8".into(),
                ontology: "agentmux".into(),
                protocol: None,
                conversation_id,
                reply_with: None,
                in_reply_to: None,
                reply_by: None,
            },
            timestamp,
        );
        m.id = id;
        m.timestamp = timestamp;
        m
    }

    #[test]
    fn messages_stay_ordered_and_deduplicated() {
        let mut convo = Conversation::new(Uuid::new_v4(), "a".into(), None, false, Instant::now());
        let id1 = Uuid::new_v4();
        let id2 = Uuid::new_v4();
        let now = Instant::now();
        assert!(convo.add_message(message(convo.id, id2, 200), now));
        assert!(convo.add_message(message(convo.id, id1, 100), now));
        assert!(!convo.add_message(message(convo.id, id1, 100), now));
        assert_eq!(convo.messages.len(), 2);
        assert_eq!(convo.messages[0].id, id1);
        assert_eq!(convo.messages[1].id, id2);
    }

    #[test]
    fn manager_indexes_by_participant() {
        let mut mgr = ConversationManager::new();
        let id = Uuid::new_v4();
        let now = Instant::now();
        mgr.start(id, "a".into(), &["b".into()], None, false, now);
        assert_eq!(mgr.for_participant("a"), vec![id]);
        assert_eq!(mgr.for_participant("b"), vec![id]);
        assert!(mgr.get(id).is_ok());
    }
}
