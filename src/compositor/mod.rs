//! Owns everything about *how* panes are rendered: scroll position, the
//! output-reflow state machine, the resize pipeline, and frame
//! coalescing. The compositor never touches PTYs or the layout tree
//! directly — it works from snapshots the dispatcher hands it and
//! returns data for the terminal host to write.

mod frame;
mod highlight;
mod reflow;
mod resize;

pub use frame::{assemble, FrameInput, PaneFrame};
pub use highlight::{apply_cursor, apply_search, apply_visual};
pub use reflow::{ReflowPhase, ReflowState};
pub use resize::{ResizePhase, ResizePipeline};

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::layout::NodeId;

/// Per-pane render bookkeeping (spec §4.3, the compositor's owned state).
pub struct PaneRenderState {
    pub scroll_offset: usize,
    pub follow_tail: bool,
    pub scroll_lock: bool,
    pub last_content_height: u16,
    pub reflow: ReflowState,
    pub frame_cache: Vec<String>,
    /// Normal-mode virtual cursor, relative to the pane's current
    /// viewport — distinct from the PTY's own reported cursor, which
    /// only means anything in insert mode.
    pub cursor_row: u16,
    pub cursor_col: u16,
}

impl PaneRenderState {
    fn new(content_height: u16) -> Self {
        Self {
            scroll_offset: 0,
            follow_tail: true,
            scroll_lock: false,
            last_content_height: content_height,
            reflow: ReflowState::new(content_height),
            frame_cache: Vec::new(),
            cursor_row: 0,
            cursor_col: 0,
        }
    }
}

/// Coalesces redraws, runs the per-pane reflow and resize state machines,
/// and assembles frames.
pub struct Compositor {
    panes: HashMap<NodeId, PaneRenderState>,
    resize: ResizePipeline,
    draw_scheduled: bool,
    last_draw: Instant,
    frame_interval: Duration,
}

impl Compositor {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            panes: HashMap::new(),
            resize: ResizePipeline::default(),
            draw_scheduled: false,
            last_draw: Instant::now(),
            frame_interval,
        }
    }

    pub fn resize_pipeline(&self) -> &ResizePipeline {
        &self.resize
    }

    pub fn resize_pipeline_mut(&mut self) -> &mut ResizePipeline {
        &mut self.resize
    }

    pub fn on_pane_opened(&mut self, pane: NodeId, content_height: u16) {
        self.panes.insert(pane, PaneRenderState::new(content_height));
    }

    /// Explicit cleanup on pane close: drops every per-pane map entry
    /// (scroll state, reflow timers, frame cache) in one step.
    pub fn on_pane_closed(&mut self, pane: NodeId) {
        self.panes.remove(&pane);
    }

    pub fn state(&self, pane: NodeId) -> Option<&PaneRenderState> {
        self.panes.get(&pane)
    }

    /// Feed a data event into pane `pane`'s reflow state machine.
    pub fn on_data(&mut self, pane: NodeId, now: Instant, content_height: u16, pane_height: u16) {
        if let Some(state) = self.panes.get_mut(&pane) {
            state.reflow.on_data(now, content_height, pane_height);
            state.last_content_height = content_height;
        }
    }

    /// `scrollPane` (spec §4.3.2): clamp the offset, then flip
    /// follow/lock depending on distance from the live tail.
    ///
    /// `scroll_offset` is rows scrolled back from the tail — 0 means
    /// sitting on the live tail, `max_scroll` means scrolled all the way
    /// into history — the same convention `VtBuffer`'s own `scrollback()`
    /// uses, so the two can be driven by the same signed delta.
    pub fn scroll_pane(&mut self, pane: NodeId, delta: i64, content_height: u16, pane_height: u16) {
        let Some(state) = self.panes.get_mut(&pane) else {
            return;
        };
        let max_scroll = content_height.saturating_sub(pane_height) as i64;
        let proposed = state.scroll_offset as i64 + delta;
        let clamped = proposed.clamp(0, max_scroll.max(0));
        state.scroll_offset = clamped as usize;

        if clamped <= 2 {
            state.follow_tail = true;
            state.scroll_lock = false;
        } else {
            state.follow_tail = false;
            state.scroll_lock = true;
        }
    }

    /// Per-tick housekeeping: advance every pane's reflow timer, then pin
    /// follow-tail panes to the bottom unless resizing, reflowing, or
    /// scroll-locked.
    pub fn tick(&mut self, now: Instant, pane_heights: &HashMap<NodeId, (u16, u16)>) {
        let resizing = self.resize.phase() != ResizePhase::Idle;
        for (pane, state) in self.panes.iter_mut() {
            state.reflow.tick(now);
            if resizing || state.reflow.phase() != ReflowPhase::Idle || state.scroll_lock {
                continue;
            }
            if state.follow_tail {
                if pane_heights.contains_key(pane) {
                    state.scroll_offset = 0;
                }
            }
        }
    }

    /// Lines to actually render for `pane` this frame: cached lines while
    /// reflowing-and-following-tail (freezes the view to hide churn),
    /// otherwise the live lines the caller passes in.
    pub fn visible_lines<'a>(&'a self, pane: NodeId, live: &'a [String]) -> &'a [String] {
        match self.panes.get(&pane) {
            Some(state) if state.reflow.phase() == ReflowPhase::Reflowing && state.follow_tail => {
                &state.frame_cache
            }
            _ => live,
        }
    }

    /// Current virtual-cursor position for `pane`, `(row, col)`.
    pub fn cursor_of(&self, pane: NodeId) -> (u16, u16) {
        self.panes.get(&pane).map(|s| (s.cursor_row, s.cursor_col)).unwrap_or((0, 0))
    }

    /// Nudge the virtual cursor by a signed row/col delta, clamped to
    /// `[0, row_bound)` / `[0, col_bound)`.
    pub fn move_cursor(&mut self, pane: NodeId, row_delta: i64, col_delta: i64, row_bound: u16, col_bound: u16) {
        let Some(state) = self.panes.get_mut(&pane) else {
            return;
        };
        let row_max = row_bound.saturating_sub(1) as i64;
        let col_max = col_bound.saturating_sub(1) as i64;
        state.cursor_row = (state.cursor_row as i64 + row_delta).clamp(0, row_max) as u16;
        state.cursor_col = (state.cursor_col as i64 + col_delta).clamp(0, col_max) as u16;
    }

    pub fn set_cursor(&mut self, pane: NodeId, row: u16, col: u16) {
        if let Some(state) = self.panes.get_mut(&pane) {
            state.cursor_row = row;
            state.cursor_col = col;
        }
    }

    pub fn set_cursor_col(&mut self, pane: NodeId, col: u16) {
        if let Some(state) = self.panes.get_mut(&pane) {
            state.cursor_col = col;
        }
    }

    pub fn cache_lines(&mut self, pane: NodeId, lines: Vec<String>) {
        if let Some(state) = self.panes.get_mut(&pane) {
            state.frame_cache = lines;
        }
    }

    pub fn schedule_draw(&mut self) {
        self.draw_scheduled = true;
    }

    /// Whether a coalesced draw is due: a draw was scheduled and at least
    /// one frame interval has passed since the last one.
    pub fn should_draw(&self, now: Instant) -> bool {
        self.draw_scheduled && now.duration_since(self.last_draw) >= self.frame_interval
    }

    pub fn mark_drawn(&mut self, now: Instant) {
        self.draw_scheduled = false;
        self.last_draw = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentId;
    use crate::layout::{LayoutTree, Rect};

    fn pane_id() -> NodeId {
        LayoutTree::new(AgentId::new(), Rect::new(0, 0, 80, 24)).root()
    }

    #[test]
    fn scroll_near_bottom_resumes_follow_tail() {
        let pane = pane_id();
        let mut c = Compositor::new(Duration::from_millis(33));
        c.on_pane_opened(pane, 100);
        c.scroll_pane(pane, 50, 100, 20);
        assert!(c.state(pane).unwrap().scroll_lock);
        c.scroll_pane(pane, -100, 100, 20);
        assert!(c.state(pane).unwrap().follow_tail);
        assert!(!c.state(pane).unwrap().scroll_lock);
    }

    #[test]
    fn closing_a_pane_drops_all_its_state() {
        let pane = pane_id();
        let mut c = Compositor::new(Duration::from_millis(33));
        c.on_pane_opened(pane, 10);
        c.on_pane_closed(pane);
        assert!(c.state(pane).is_none());
    }

    #[test]
    fn draw_is_coalesced_to_frame_interval() {
        let mut c = Compositor::new(Duration::from_millis(33));
        let t0 = Instant::now();
        assert!(!c.should_draw(t0));
        c.schedule_draw();
        assert!(!c.should_draw(t0)); // interval hasn't elapsed since construction's last_draw
        assert!(c.should_draw(t0 + Duration::from_millis(40)));
        c.mark_drawn(t0 + Duration::from_millis(40));
        assert!(!c.should_draw(t0 + Duration::from_millis(41)));
    }
}
