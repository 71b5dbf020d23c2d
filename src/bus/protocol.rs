//! Protocol state machines, one per conversation, selected by the
//! message's `protocol` field or inferred from its performative
//! (spec §4.7).

use std::collections::HashMap;

use super::acl::{ParticipantId, Performative};

/// The union of every state any protocol state machine can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolState {
    Initiated,
    Pending,
    Agreed,
    Refused,
    Completed,
    Failed,
    Cancelled,
    ProposalsReceived,
    ProposalAccepted,
    ProposalRejected,
}

use serde::{Deserialize, Serialize};

/// Which protocol family governs a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    Request,
    ContractNet,
    Subscribe,
    Query,
}

impl ProtocolKind {
    /// Select a protocol by its explicit name, falling back to inference
    /// from the triggering performative.
    pub fn resolve(protocol_field: Option<&str>, performative: Performative) -> Self {
        match protocol_field {
            Some("contract-net") | Some("fipa-contract-net") => ProtocolKind::ContractNet,
            Some("subscribe") | Some("fipa-subscribe") => ProtocolKind::Subscribe,
            Some("query") | Some("fipa-query") => ProtocolKind::Query,
            Some("request") | Some("fipa-request") => ProtocolKind::Request,
            _ => Self::infer(performative),
        }
    }

    fn infer(performative: Performative) -> Self {
        match performative {
            Performative::Cfp | Performative::Propose | Performative::AcceptProposal | Performative::RejectProposal => {
                ProtocolKind::ContractNet
            }
            Performative::Subscribe => ProtocolKind::Subscribe,
            Performative::QueryIf | Performative::QueryRef => ProtocolKind::Query,
            _ => ProtocolKind::Request,
        }
    }
}

/// Advance `state` given an incoming performative, per the state diagram
/// for `kind`. Returns the same state for performatives that don't apply.
pub fn transition(kind: ProtocolKind, state: ProtocolState, performative: Performative) -> ProtocolState {
    use Performative::*;
    use ProtocolState::*;

    match (kind, state, performative) {
        (ProtocolKind::Request, Initiated, Request) => Pending,
        (ProtocolKind::Request, Pending, Agree) => Agreed,
        (ProtocolKind::Request, Pending, Refuse) => Refused,
        (ProtocolKind::Request, Agreed, Inform) => Completed,
        (ProtocolKind::Request, Agreed, Failure) => Failed,

        (ProtocolKind::ContractNet, Initiated, Cfp) => Pending,
        (ProtocolKind::ContractNet, Pending, Propose) => ProposalsReceived,
        (ProtocolKind::ContractNet, Pending, Refuse) => ProposalsReceived,
        (ProtocolKind::ContractNet, ProposalsReceived, AcceptProposal) => ProposalAccepted,
        (ProtocolKind::ContractNet, ProposalsReceived, RejectProposal) => ProposalRejected,
        (ProtocolKind::ContractNet, ProposalAccepted, Inform) => Completed,
        (ProtocolKind::ContractNet, ProposalAccepted, Failure) => Failed,

        (ProtocolKind::Subscribe, Initiated, Subscribe) => Pending,
        (ProtocolKind::Subscribe, Pending, Agree) => Agreed,
        (ProtocolKind::Subscribe, Pending, Refuse) => Refused,
        (ProtocolKind::Subscribe, Agreed, Inform) => Agreed,
        (ProtocolKind::Subscribe, Agreed, Cancel) => Cancelled,

        (ProtocolKind::Query, Initiated, QueryIf) | (ProtocolKind::Query, Initiated, QueryRef) => Pending,
        (ProtocolKind::Query, Pending, Inform) | (ProtocolKind::Query, Pending, Confirm) | (ProtocolKind::Query, Pending, Disconfirm) => Completed,
        (ProtocolKind::Query, Pending, Refuse) => Refused,
        (ProtocolKind::Query, Pending, Failure) => Failed,

        (_, current, _) => current,
    }
}

/// Tallies PROPOSE/REFUSE responses for a Contract-Net conversation so the
/// manager knows when "all expected responded" or can declare
/// `failed("no-proposals")`.
#[derive(Debug, Default)]
pub struct ContractNetTally {
    responses: HashMap<ParticipantId, Performative>,
    expected: Vec<ParticipantId>,
}

impl ContractNetTally {
    pub fn new(expected: Vec<ParticipantId>) -> Self {
        Self { responses: HashMap::new(), expected }
    }

    pub fn record(&mut self, participant: ParticipantId, performative: Performative) {
        self.responses.insert(participant, performative);
    }

    pub fn all_responded(&self) -> bool {
        self.expected.iter().all(|p| self.responses.contains_key(p))
    }

    pub fn proposal_count(&self) -> usize {
        self.responses.values().filter(|p| **p == Performative::Propose).count()
    }

    pub fn has_any_proposal(&self) -> bool {
        self.proposal_count() > 0
    }
}
