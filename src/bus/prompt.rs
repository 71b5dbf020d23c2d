//! LLM-readable renderings of an ACL message (spec §4.7) and the IAC
//! envelope template (spec §6.4) that wraps extended agent-to-agent
//! output.

use super::acl::AclMessage;
use super::protocol::ProtocolState;

/// Rendering style for [`format_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
    /// Field-by-field, machine-readable-ish breakdown.
    Structured,
    /// A short paragraph of prose.
    Natural,
    /// One line: sender, performative, gist of the content.
    Minimal,
}

/// Which responses the sender expects, used to produce response guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedResponse {
    None,
    AgreeOrRefuse,
    ProposeOrRefuse,
    AcceptOrRejectProposal,
    InformOrFailure,
}

/// Render `message` for display to an LLM-backed agent.
pub fn format_message(
    message: &AclMessage,
    style: PromptStyle,
    protocol_state: Option<ProtocolState>,
    conversation_summary: Option<&str>,
    expected: ExpectedResponse,
) -> String {
    let mut out = match style {
        PromptStyle::Structured => format_structured(message),
        PromptStyle::Natural => format_natural(message),
        PromptStyle::Minimal => format_minimal(message),
    };

    if let Some(state) = protocol_state {
        out.push_str(&format!("\n[protocol state: {state:?}]"));
    }
    if let Some(summary) = conversation_summary {
        out.push_str(&format!("\n[conversation so far: {summary}]"));
    }
    if let Some(guidance) = response_guidance(expected) {
        out.push_str(&format!("\n{guidance}"));
    }
    out
}

fn format_structured(message: &AclMessage) -> String {
    format!(
        "performative: {}\nfrom: {}\nto: {}\ncontent: {}",
        message.performative.wire_name(),
        message.sender,
        message.receivers.join(", "),
        message.content
    )
}

fn format_natural(message: &AclMessage) -> String {
    format!(
        "{} sent you a {} message: {}",
        message.sender,
        message.performative.wire_name(),
        message.content
    )
}

fn format_minimal(message: &AclMessage) -> String {
    format!("{}: {} — {}", message.sender, message.performative.wire_name(), message.content)
}

fn response_guidance(expected: ExpectedResponse) -> Option<&'static str> {
    match expected {
        ExpectedResponse::None => None,
        ExpectedResponse::AgreeOrRefuse => Some("Respond with agree or refuse."),
        ExpectedResponse::ProposeOrRefuse => Some("Respond with propose or refuse."),
        ExpectedResponse::AcceptOrRejectProposal => Some("Respond with accept-proposal or reject-proposal."),
        ExpectedResponse::InformOrFailure => Some("Respond with inform or failure once complete."),
    }
}

/// Build the `_iacEnvelope` string (spec §6.4) wrapping extended output
/// from one LLM agent for another to read.
pub fn iac_envelope(agent_name: &str, sender_summary: &str, extended: &str) -> String {
    format!(
        "You are reading a message from another LLM coding agent, {agent_name}. \
They want to {sender_summary}. The extended output is between \
<iac-agent-conversation>{extended}</iac-agent-conversation>"
    )
}
