//! `AgentSessionResolver` (spec §6.7): an out-of-scope external
//! collaborator that knows how to find a child agent's own prior-session
//! id on disk and build resume argv for it. The concrete child binaries
//! (Claude/Codex/Gemini) and their session-id discovery heuristics are
//! explicitly out of scope (spec §1); this crate only defines the seam.

use std::path::Path;

/// Implemented by whatever knows how a given agent type stores its own
/// session history. The multiplexer calls this during snapshot (to
/// persist `resumedSessionId`) and during restore (to build resume argv).
pub trait AgentSessionResolver: Send + Sync {
    /// Most recently modified session id belonging to `agent_type` in
    /// `cwd`, created or modified after `spawned_at_ms`, excluding ids in
    /// `excluded`. `None` if nothing qualifies.
    fn resolve_latest_session_id(
        &self,
        agent_type: &str,
        cwd: &Path,
        spawned_at_ms: i64,
        excluded: &[String],
    ) -> Option<String>;

    /// The argv fragment that tells `agent_type` to resume `session_id`.
    fn resume_argv(&self, agent_type: &str, session_id: &str) -> Vec<String>;
}

/// A resolver that never finds a prior session and appends nothing,
/// used when no real child-agent integration is configured.
pub struct NoopResolver;

impl AgentSessionResolver for NoopResolver {
    fn resolve_latest_session_id(
        &self,
        _agent_type: &str,
        _cwd: &Path,
        _spawned_at_ms: i64,
        _excluded: &[String],
    ) -> Option<String> {
        None
    }

    fn resume_argv(&self, _agent_type: &str, _session_id: &str) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_resolver_finds_nothing_and_appends_nothing() {
        let resolver = NoopResolver;
        assert!(resolver
            .resolve_latest_session_id("codex", Path::new("/tmp"), 0, &[])
            .is_none());
        assert!(resolver.resume_argv("codex", "abc").is_empty());
    }
}
