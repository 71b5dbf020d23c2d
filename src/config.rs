//! Runtime configuration sourced from environment variables.
//!
//! The multiplexer has no persistent config file beyond saved sessions
//! (see [`crate::session`]); everything else is read once at startup the
//! way `Config::load` centralizes defaults in the teacher.

use std::path::PathBuf;
use std::time::Duration;

/// Default tab/session name when none is given on the command line.
pub const DEFAULT_SESSION_NAME: &str = "Main";

/// Runtime knobs read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// `SPLASH_DURATION_MS` — how long the (out-of-scope) splash screen holds.
    pub splash_duration: Duration,
    /// `SCROLLBACK` — lines of scrollback retained per VT buffer.
    pub scrollback: usize,
    /// `FRAME_INTERVAL_MS` — draw coalescing interval.
    pub frame_interval: Duration,
    /// `OUTPUT_SILENCE_DURATION_MS` — base reflow silence timer.
    pub output_silence_ms: u64,
    /// `CPS_WINDOW_MS` — window used to measure clears-per-second.
    pub cps_window: Duration,
    /// `SESSION_NAME` — default session name.
    pub session_name: String,
    /// `RUNTIME_DIR` — base directory for the message-bus socket.
    pub runtime_dir: PathBuf,
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            splash_duration: Duration::from_millis(env_u64("SPLASH_DURATION_MS", 2000)),
            scrollback: env_usize("SCROLLBACK", 10_000),
            frame_interval: Duration::from_millis(env_u64("FRAME_INTERVAL_MS", 33)),
            output_silence_ms: env_u64("OUTPUT_SILENCE_DURATION_MS", 70),
            cps_window: Duration::from_millis(env_u64("CPS_WINDOW_MS", 5000)),
            session_name: std::env::var("SESSION_NAME")
                .unwrap_or_else(|_| DEFAULT_SESSION_NAME.to_string()),
            runtime_dir: std::env::var("RUNTIME_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/agentmux")),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Self {
        Self::default()
    }

    /// Directory holding per-user saved sessions: `$HOME/.config/agentmux/sessions`.
    pub fn sessions_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("agentmux")
            .join("sessions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        // Run in isolation from the ambient environment.
        let cfg = Config {
            splash_duration: Duration::from_millis(2000),
            scrollback: 10_000,
            frame_interval: Duration::from_millis(33),
            output_silence_ms: 70,
            cps_window: Duration::from_millis(5000),
            session_name: DEFAULT_SESSION_NAME.to_string(),
            runtime_dir: PathBuf::from("/tmp/agentmux"),
        };
        assert_eq!(cfg.scrollback, 10_000);
        assert_eq!(cfg.frame_interval, Duration::from_millis(33));
        assert_eq!(cfg.session_name, "Main");
    }
}
