//! Per-pane output-reflow state machine (spec §4.3.3).
//!
//! VT-library internals silently trim scrollback when it overflows; if the
//! compositor auto-scrolled during that churn the display would appear to
//! scroll infinitely upward. This hides the transient behind a short
//! `reflowing` window, snapshotting a stable height once things settle.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const SILENCE_MIN: Duration = Duration::from_millis(70);
const SILENCE_MAX: Duration = Duration::from_millis(120);
const MAX_MIN: Duration = Duration::from_millis(350);
const MAX_MAX: Duration = Duration::from_millis(800);
const CPS_WINDOW: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflowPhase {
    Idle,
    Reflowing,
}

/// Tracks whether a pane is currently absorbing a burst of output that
/// moved its content height by more than a screenful.
pub struct ReflowState {
    phase: ReflowPhase,
    last_content_height: u16,
    stable_content_height: u16,
    silence_deadline: Option<Instant>,
    max_deadline: Option<Instant>,
    clear_events: VecDeque<Instant>,
}

impl ReflowState {
    pub fn new(initial_height: u16) -> Self {
        Self {
            phase: ReflowPhase::Idle,
            last_content_height: initial_height,
            stable_content_height: initial_height,
            silence_deadline: None,
            max_deadline: None,
            clear_events: VecDeque::new(),
        }
    }

    pub fn phase(&self) -> ReflowPhase {
        self.phase
    }

    pub fn stable_content_height(&self) -> u16 {
        self.stable_content_height
    }

    fn clears_per_second(&mut self, now: Instant) -> f64 {
        while let Some(&front) = self.clear_events.front() {
            if now.duration_since(front) > CPS_WINDOW {
                self.clear_events.pop_front();
            } else {
                break;
            }
        }
        self.clear_events.len() as f64 / CPS_WINDOW.as_secs_f64()
    }

    /// Adaptive silence timer: scales linearly between [`SILENCE_MIN`] and
    /// [`SILENCE_MAX`] as clears-per-second rises toward 1/s.
    fn adaptive_silence(&mut self, now: Instant) -> Duration {
        let cps = self.clears_per_second(now).min(1.0);
        SILENCE_MIN + (SILENCE_MAX - SILENCE_MIN).mul_f64(cps)
    }

    fn adaptive_max(&mut self, now: Instant) -> Duration {
        let cps = self.clears_per_second(now).min(1.0);
        MAX_MIN + (MAX_MAX - MAX_MIN).mul_f64(cps)
    }

    /// Call on every data event for the pane: `content_height` is the VT's
    /// current content height, `pane_height` its visible rows.
    pub fn on_data(&mut self, now: Instant, content_height: u16, pane_height: u16) {
        let delta = content_height.abs_diff(self.last_content_height);
        self.last_content_height = content_height;

        if delta > pane_height {
            self.clear_events.push_back(now);
            self.phase = ReflowPhase::Reflowing;
            self.silence_deadline = Some(now + self.adaptive_silence(now));
            self.max_deadline.get_or_insert(now + self.adaptive_max(now));
        } else if self.phase == ReflowPhase::Reflowing {
            // Small deltas while reflowing push the silence timer back out,
            // but never past the max timer.
            self.silence_deadline = Some(now + self.adaptive_silence(now));
        }
    }

    /// Called once per tick; exits `reflowing` when the silence timer or
    /// the max timer fires, snapshotting `stable_content_height`.
    pub fn tick(&mut self, now: Instant) {
        if self.phase != ReflowPhase::Reflowing {
            return;
        }
        let silence_fired = self.silence_deadline.is_some_and(|d| now >= d);
        let max_fired = self.max_deadline.is_some_and(|d| now >= d);
        if silence_fired || max_fired {
            self.phase = ReflowPhase::Idle;
            self.stable_content_height = self.last_content_height;
            self.silence_deadline = None;
            self.max_deadline = None;
        }
    }
}
