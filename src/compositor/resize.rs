//! Two-phase resize pipeline (spec §4.3.4): freeze a frame cache, redraw
//! from it while PTYs and VTs catch up, then fall back to live rendering
//! once every pane has gone a full idle window without reflowing.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::layout::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePhase {
    Idle,
    Cached,
    Reflowing,
}

/// Drives the `idle -> cached -> reflowing -> idle` cycle across a resize
/// event. Holds no PTY/VT handles itself — the compositor calls
/// [`begin`](Self::begin) with a snapshot of each pane's visible lines and
/// [`maybe_finish`](Self::maybe_finish) once per tick.
pub struct ResizePipeline {
    phase: ResizePhase,
    frame_cache: HashMap<NodeId, Vec<String>>,
    entered_reflowing_at: Option<Instant>,
}

impl Default for ResizePipeline {
    fn default() -> Self {
        Self {
            phase: ResizePhase::Idle,
            frame_cache: HashMap::new(),
            entered_reflowing_at: None,
        }
    }
}

impl ResizePipeline {
    pub fn phase(&self) -> ResizePhase {
        self.phase
    }

    pub fn cached_lines(&self, pane: NodeId) -> Option<&[String]> {
        self.frame_cache.get(&pane).map(|v| v.as_slice())
    }

    /// Phase 1: snapshot every pane's current visible lines, transition to
    /// `cached`. The caller is then responsible for updating layout bounds
    /// and redrawing from the cache before resizing PTYs.
    pub fn begin(&mut self, snapshot: HashMap<NodeId, Vec<String>>) {
        self.frame_cache = snapshot;
        self.phase = ResizePhase::Cached;
    }

    /// Phase 3: PTYs and VTs have been resized; enter `reflowing`.
    pub fn enter_reflowing(&mut self, now: Instant) {
        self.phase = ResizePhase::Reflowing;
        self.entered_reflowing_at = Some(now);
    }

    /// Phase 4: once every pane has been reflow-stable for one idle
    /// window, discard the cache and return to `idle`.
    pub fn maybe_finish(&mut self, now: Instant, all_panes_stable: bool, idle_window: Duration) {
        if self.phase != ResizePhase::Reflowing {
            return;
        }
        let Some(entered) = self.entered_reflowing_at else {
            return;
        };
        if all_panes_stable && now.duration_since(entered) >= idle_window {
            self.frame_cache.clear();
            self.phase = ResizePhase::Idle;
            self.entered_reflowing_at = None;
        }
    }
}
