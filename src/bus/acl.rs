//! FIPA ACL message envelope and the closed set of performatives
//! (spec §3, §4.7).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed set of FIPA performatives this multiplexer speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Performative {
    Inform,
    InformIf,
    InformRef,
    Confirm,
    Disconfirm,
    Request,
    RequestWhen,
    RequestWhenever,
    QueryIf,
    QueryRef,
    Agree,
    Refuse,
    Cancel,
    Cfp,
    Propose,
    AcceptProposal,
    RejectProposal,
    Subscribe,
    NotUnderstood,
    Failure,
    Propagate,
    Proxy,
}

impl Performative {
    /// Lowercase-hyphenated wire name, e.g. `"accept-proposal"`, used in
    /// `method = "fipa:<performative>"` (spec §6.4).
    pub fn wire_name(self) -> &'static str {
        match self {
            Performative::Inform => "inform",
            Performative::InformIf => "inform-if",
            Performative::InformRef => "inform-ref",
            Performative::Confirm => "confirm",
            Performative::Disconfirm => "disconfirm",
            Performative::Request => "request",
            Performative::RequestWhen => "request-when",
            Performative::RequestWhenever => "request-whenever",
            Performative::QueryIf => "query-if",
            Performative::QueryRef => "query-ref",
            Performative::Agree => "agree",
            Performative::Refuse => "refuse",
            Performative::Cancel => "cancel",
            Performative::Cfp => "cfp",
            Performative::Propose => "propose",
            Performative::AcceptProposal => "accept-proposal",
            Performative::RejectProposal => "reject-proposal",
            Performative::Subscribe => "subscribe",
            Performative::NotUnderstood => "not-understood",
            Performative::Failure => "failure",
            Performative::Propagate => "propagate",
            Performative::Proxy => "proxy",
        }
    }
}

/// Identifies an agent as a message sender/receiver on the bus. Distinct
/// from [`crate::agent::AgentId`] in name only — same underlying value,
/// used at the ACL layer for clarity in (de)serialized payloads.
pub type ParticipantId = String;

/// An immutable FIPA ACL message. Constructed once via [`AclMessage::new`]
/// and never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AclMessage {
    pub performative: Performative,
    pub sender: ParticipantId,
    pub receivers: Vec<ParticipantId>,
    pub content: serde_json::Value,
    pub language: String,
    pub encoding: String,
    pub ontology: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    pub conversation_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_with: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    /// Deadline in epoch milliseconds after which a pending request for
    /// this message resolves as a timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_by: Option<i64>,
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "_timestamp")]
    pub timestamp: i64,
}

/// Fields the caller supplies when building a message; ids and the
/// timestamp are assigned by [`AclMessage::new`].
pub struct AclMessageBuilder {
    pub performative: Performative,
    pub sender: ParticipantId,
    pub receivers: Vec<ParticipantId>,
    pub content: serde_json::Value,
    pub language: String,
    pub encoding: String,
    pub ontology: String,
    pub protocol: Option<String>,
    pub conversation_id: Uuid,
    pub reply_with: Option<String>,
    pub in_reply_to: Option<String>,
    pub reply_by: Option<i64>,
}

impl AclMessage {
    pub fn new(builder: AclMessageBuilder, now_ms: i64) -> Self {
        Self {
            performative: builder.performative,
            sender: builder.sender,
            receivers: builder.receivers,
            content: builder.content,
            language: builder.language,
            encoding: builder.encoding,
            ontology: builder.ontology,
            protocol: builder.protocol,
            conversation_id: builder.conversation_id,
            reply_with: builder.reply_with,
            in_reply_to: builder.in_reply_to,
            reply_by: builder.reply_by,
            id: Uuid::new_v4(),
            timestamp: now_ms,
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.receivers.iter().any(|r| r == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_name_matches_kebab_case() {
        assert_eq!(Performative::AcceptProposal.wire_name(), "accept-proposal");
        assert_eq!(Performative::QueryIf.wire_name(), "query-if");
    }

    #[test]
    fn new_message_gets_fresh_id() {
        let a = AclMessage::new(
            AclMessageBuilder {
                performative: Performative::Inform,
                sender: "a".into(),
                receivers: vec!["b".into()],
                content: serde_json::json!({}),
                language: "json".into(),
                encoding: "utf-8".into(),
                ontology: "agentmux".into(),
                protocol: None,
                conversation_id: Uuid::new_v4(),
                reply_with: None,
                in_reply_to: None,
                reply_by: None,
            },
            0,
        );
        let b = AclMessage::new(
            AclMessageBuilder {
                performative: Performative::Inform,
                sender: "a".into(),
                receivers: vec!["b".into()],
                content: serde_json::json!({}),
                language: "json".into(),
                encoding: "utf-8".into(),
                ontology: "agentmux".into(),
                protocol: None,
                conversation_id: Uuid::new_v4(),
                reply_with: None,
                in_reply_to: None,
                reply_by: None,
            },
            0,
        );
        assert_ne!(a.id, b.id);
        assert!(!a.is_broadcast());
    }
}
