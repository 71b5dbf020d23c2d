//! Arena-backed binary split tree.
//!
//! Every node lives in a flat arena indexed by [`NodeId`]; parent links are
//! a side-table lookup rather than pointers, so there is no cyclic
//! ownership and no lifetime gymnastics when walking upward for focus or
//! resize. Ids are never reused once allocated, satisfying the invariant
//! that pane ids stay stable across mutations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::bounds::{distribute, Rect};
use super::focus::Direction;
use crate::agent::AgentId;

/// Arena index. Stable for the lifetime of the node it points at; never
/// reused after the node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

/// Split direction of a [`Container`](LayoutNode::Container).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    fn flipped(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

#[derive(Debug, Clone)]
enum LayoutNode {
    Container {
        orientation: Orientation,
        children: Vec<NodeId>,
        ratios: Vec<f64>,
        bounds: Rect,
    },
    Pane {
        agent_id: AgentId,
        bounds: Rect,
    },
}

/// The binary split tree of [`Container`]s and [`Pane`]s.
///
/// [`Container`]: LayoutNode::Container
/// [`Pane`]: LayoutNode::Pane
#[derive(Debug)]
pub struct LayoutTree {
    arena: Vec<Option<LayoutNode>>,
    parent: HashMap<NodeId, NodeId>,
    root: NodeId,
    focused: NodeId,
    next_id: u64,
    /// Saved root while zoomed; `toggle_zoom` swaps it back in.
    zoomed: Option<(NodeId, NodeId)>,
}

/// Shift `ratios[idx]` by `delta`, taking it from `ratios[other]`, clamped
/// so neither drops below a 5% minimum share.
fn shift_ratio(ratios: &mut [f64], idx: usize, other: usize, delta: f64) {
    const MIN_RATIO: f64 = 0.05;
    let applied = delta.max(MIN_RATIO - ratios[idx]).min(ratios[other] - MIN_RATIO);
    ratios[idx] += applied;
    ratios[other] -= applied;
}

impl LayoutTree {
    /// Create a tree with a single pane bound to `agent_id`, filling `rect`.
    pub fn new(agent_id: AgentId, rect: Rect) -> Self {
        let mut tree = Self {
            arena: Vec::new(),
            parent: HashMap::new(),
            root: NodeId(0),
            focused: NodeId(0),
            next_id: 0,
            zoomed: None,
        };
        let root = tree.alloc(LayoutNode::Pane { agent_id, bounds: rect });
        tree.root = root;
        tree.focused = root;
        tree
    }

    fn alloc(&mut self, node: LayoutNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.arena.push(Some(node));
        debug_assert_eq!(self.arena.len() as u64 - 1, id.0);
        id
    }

    fn get(&self, id: NodeId) -> &LayoutNode {
        self.arena[id.0 as usize]
            .as_ref()
            .expect("dangling NodeId: node was removed")
    }

    fn get_mut(&mut self, id: NodeId) -> &mut LayoutNode {
        self.arena[id.0 as usize]
            .as_mut()
            .expect("dangling NodeId: node was removed")
    }

    /// The currently focused pane's id.
    pub fn focused(&self) -> NodeId {
        self.focused
    }

    /// The root node's id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The agent id bound to a given pane, if `id` names a live Pane.
    pub fn agent_of(&self, id: NodeId) -> Option<AgentId> {
        match self.get(id) {
            LayoutNode::Pane { agent_id, .. } => Some(*agent_id),
            LayoutNode::Container { .. } => None,
        }
    }

    /// Bounds of a node as of the last [`compute_bounds`](Self::compute_bounds) call.
    pub fn bounds_of(&self, id: NodeId) -> Rect {
        match self.get(id) {
            LayoutNode::Pane { bounds, .. } => *bounds,
            LayoutNode::Container { bounds, .. } => *bounds,
        }
    }

    /// All live panes as `(NodeId, AgentId)` pairs, in tree order.
    pub fn panes(&self) -> Vec<(NodeId, AgentId)> {
        let mut out = Vec::new();
        self.collect_panes(self.root, &mut out);
        out
    }

    fn collect_panes(&self, id: NodeId, out: &mut Vec<(NodeId, AgentId)>) {
        match self.get(id) {
            LayoutNode::Pane { agent_id, .. } => out.push((id, *agent_id)),
            LayoutNode::Container { children, .. } => {
                for &child in children {
                    self.collect_panes(child, out);
                }
            }
        }
    }

    /// Replace the focused Pane with a new Container splitting it in two;
    /// focus moves to the newly created pane. Ratios start at `[0.5, 0.5]`.
    pub fn split_focused(&mut self, orientation: Orientation, new_agent_id: AgentId) {
        let target = self.focused;
        let bounds = self.bounds_of(target);
        let new_pane = self.alloc(LayoutNode::Pane { agent_id: new_agent_id, bounds });

        let container = self.alloc(LayoutNode::Container {
            orientation,
            children: vec![target, new_pane],
            ratios: vec![0.5, 0.5],
            bounds,
        });

        self.parent.insert(new_pane, container);
        if let Some(&grandparent) = self.parent.get(&target) {
            self.parent.insert(container, grandparent);
            Self::replace_child(self.get_mut(grandparent), target, container);
        } else {
            self.root = container;
        }
        self.parent.insert(target, container);

        self.focused = new_pane;
    }

    fn replace_child(node: &mut LayoutNode, old: NodeId, new: NodeId) {
        if let LayoutNode::Container { children, .. } = node {
            for c in children.iter_mut() {
                if *c == old {
                    *c = new;
                }
            }
        }
    }

    /// Close the focused pane. Its parent Container collapses: the
    /// remaining sibling (or, for >2 children, the remaining subtree)
    /// replaces the parent in the grandparent.
    ///
    /// Returns `false` (and does nothing) if the focused pane is the only
    /// pane in the tree — the caller treats that as "quit the program".
    pub fn close_focused(&mut self) -> bool {
        let target = self.focused;
        let Some(&parent_id) = self.parent.get(&target) else {
            // Target is the root: it's the only pane.
            return false;
        };

        let siblings: Vec<NodeId> = match self.get(parent_id) {
            LayoutNode::Container { children, .. } => {
                children.iter().copied().filter(|&c| c != target).collect()
            }
            LayoutNode::Pane { .. } => unreachable!("parent of a pane must be a Container"),
        };

        self.remove_subtree(target);

        if siblings.len() == 1 {
            let survivor = siblings[0];
            if let Some(&grandparent) = self.parent.get(&parent_id) {
                Self::replace_child(self.get_mut(grandparent), parent_id, survivor);
                self.parent.insert(survivor, grandparent);
            } else {
                self.root = survivor;
                self.parent.remove(&survivor);
            }
            self.remove_node(parent_id);
            self.focused = self.first_pane(survivor);
        } else {
            // More than two children (future-proofing; current ops only
            // ever produce binary containers, but equalize/close stays
            // correct if that changes).
            if let LayoutNode::Container { children, ratios, .. } = self.get_mut(parent_id) {
                let idx = children.iter().position(|&c| c == target);
                if let Some(idx) = idx {
                    children.remove(idx);
                    ratios.remove(idx);
                    let n = ratios.len().max(1);
                    for r in ratios.iter_mut() {
                        *r = 1.0 / n as f64;
                    }
                }
            }
            self.focused = self.first_pane(siblings[0]);
        }

        true
    }

    fn remove_subtree(&mut self, id: NodeId) {
        let children: Vec<NodeId> = match self.get(id) {
            LayoutNode::Container { children, .. } => children.clone(),
            LayoutNode::Pane { .. } => Vec::new(),
        };
        for c in children {
            self.remove_subtree(c);
        }
        self.remove_node(id);
    }

    fn remove_node(&mut self, id: NodeId) {
        self.arena[id.0 as usize] = None;
        self.parent.remove(&id);
    }

    fn first_pane(&self, id: NodeId) -> NodeId {
        match self.get(id) {
            LayoutNode::Pane { .. } => id,
            LayoutNode::Container { children, .. } => self.first_pane(children[0]),
        }
    }

    /// Close every pane except the focused one.
    pub fn close_others(&mut self) {
        let target = self.focused;
        if target == self.root {
            return;
        }
        let bounds = self.bounds_of(self.root);
        let agent_id = self.agent_of(target).expect("focused must be a pane");

        // Detach target from its parent before discarding everything else,
        // so its subtree (always just itself) survives the wipe.
        self.parent.remove(&target);
        for (idx, slot) in self.arena.iter_mut().enumerate() {
            if idx as u64 != target.0 {
                *slot = None;
            }
        }
        self.parent.clear();
        self.root = target;
        self.focused = target;
        if let LayoutNode::Pane { bounds: b, .. } = self.get_mut(target) {
            *b = bounds;
        }
        let _ = agent_id;
    }

    /// Reset every Container's ratios (and, transitively, every descendant)
    /// to equal shares.
    pub fn equalize(&mut self, node: NodeId) {
        let children = match self.get(node) {
            LayoutNode::Container { children, .. } => children.clone(),
            LayoutNode::Pane { .. } => return,
        };
        let n = children.len().max(1);
        if let LayoutNode::Container { ratios, .. } = self.get_mut(node) {
            *ratios = vec![1.0 / n as f64; ratios.len()];
        }
        for c in children {
            self.equalize(c);
        }
    }

    /// Nudge the ratio of the focused pane within its parent by `delta`,
    /// taking the adjustment from (or giving it to) the adjacent sibling.
    /// Clamped so no child's ratio goes below 5%.
    pub fn resize_focused(&mut self, delta: f64) {
        let Some(&parent_id) = self.parent.get(&self.focused) else {
            return;
        };
        let LayoutNode::Container { children, ratios, .. } = self.get_mut(parent_id) else {
            return;
        };
        let Some(idx) = children.iter().position(|&c| c == self.focused) else {
            return;
        };
        let other = if idx + 1 < children.len() { idx + 1 } else { idx.saturating_sub(1) };
        if other == idx {
            return;
        }
        shift_ratio(ratios, idx, other, delta);
    }

    /// `resizeBorderAt` (spec §4.1): locate the container whose
    /// inter-child gap of orientation `orientation` passes through
    /// `(x, y)`, and nudge the ratio split across that border by `delta`.
    /// Returns whether a border was actually found and resized.
    pub fn resize_border_at(&mut self, x: u16, y: u16, orientation: Orientation, delta: f64) -> bool {
        self.resize_border_at_node(self.root, x, y, orientation, delta)
    }

    fn resize_border_at_node(&mut self, id: NodeId, x: u16, y: u16, orientation: Orientation, delta: f64) -> bool {
        let (node_orientation, children) = match self.get(id) {
            LayoutNode::Pane { .. } => return false,
            LayoutNode::Container { orientation, children, .. } => (*orientation, children.clone()),
        };

        if node_orientation == orientation {
            for pair in children.windows(2) {
                let left = self.bounds_of(pair[0]);
                let hit = match orientation {
                    Orientation::Horizontal => {
                        x == left.x + left.width && y >= left.y && y < left.y + left.height
                    }
                    Orientation::Vertical => {
                        y == left.y + left.height && x >= left.x && x < left.x + left.width
                    }
                };
                if hit {
                    return self.apply_border_resize(id, pair[0], pair[1], delta);
                }
            }
        }

        for &child in &children {
            if self.resize_border_at_node(child, x, y, orientation, delta) {
                return true;
            }
        }
        false
    }

    fn apply_border_resize(&mut self, parent_id: NodeId, left: NodeId, right: NodeId, delta: f64) -> bool {
        let LayoutNode::Container { children, ratios, .. } = self.get_mut(parent_id) else {
            return false;
        };
        let (Some(li), Some(ri)) = (children.iter().position(|&c| c == left), children.iter().position(|&c| c == right)) else {
            return false;
        };
        shift_ratio(ratios, li, ri, delta);
        true
    }

    /// Every border cell between sibling children, across every
    /// container in the tree, as `(row, col, glyph)` — one cell per row
    /// (vertical borders) or column (horizontal borders) of the gap
    /// `compute_bounds_for` reserves between them.
    pub fn borders(&self) -> Vec<(u16, u16, char)> {
        let mut out = Vec::new();
        self.collect_borders(self.root, &mut out);
        out
    }

    fn collect_borders(&self, id: NodeId, out: &mut Vec<(u16, u16, char)>) {
        let (orientation, children) = match self.get(id) {
            LayoutNode::Pane { .. } => return,
            LayoutNode::Container { orientation, children, .. } => (*orientation, children.clone()),
        };

        for pair in children.windows(2) {
            let left = self.bounds_of(pair[0]);
            match orientation {
                Orientation::Horizontal => {
                    let col = left.x + left.width;
                    for row in left.y..left.y + left.height {
                        out.push((row, col, '│'));
                    }
                }
                Orientation::Vertical => {
                    let row = left.y + left.height;
                    for col in left.x..left.x + left.width {
                        out.push((row, col, '─'));
                    }
                }
            }
        }

        for &child in &children {
            self.collect_borders(child, out);
        }
    }

    /// Recompute every node's `bounds` bottom-up from `rect`, using the
    /// largest-remainder distribution for each Container's children.
    pub fn compute_bounds(&mut self, rect: Rect) {
        self.compute_bounds_for(self.root, rect);
    }

    fn compute_bounds_for(&mut self, id: NodeId, rect: Rect) {
        let (orientation, children, ratios) = match self.get(id) {
            LayoutNode::Pane { .. } => {
                if let LayoutNode::Pane { bounds, .. } = self.get_mut(id) {
                    *bounds = rect;
                }
                return;
            }
            LayoutNode::Container { orientation, children, ratios, .. } => {
                (*orientation, children.clone(), ratios.clone())
            }
        };

        if let LayoutNode::Container { bounds, .. } = self.get_mut(id) {
            *bounds = rect;
        }

        let n = children.len() as u16;
        let borders = n.saturating_sub(1);
        let span = match orientation {
            Orientation::Horizontal => rect.width,
            Orientation::Vertical => rect.height,
        };
        let usable = span.saturating_sub(borders) as u32;
        let weights: Vec<u32> = ratios.iter().map(|r| (r * 10_000.0).round() as u32).collect();
        let sizes = distribute(usable, &weights);

        let mut offset: u16 = 0;
        for (child, size) in children.iter().zip(sizes.iter()) {
            let size = *size as u16;
            let child_rect = match orientation {
                Orientation::Horizontal => {
                    Rect::new(rect.x + offset, rect.y, size, rect.height)
                }
                Orientation::Vertical => {
                    Rect::new(rect.x, rect.y + offset, rect.width, size)
                }
            };
            self.compute_bounds_for(*child, child_rect);
            offset += size + 1; // +1 reserves the border cell.
        }
    }

    /// The pane whose bounds contain `(x, y)`, if any.
    pub fn find_pane_at(&self, x: u16, y: u16) -> Option<NodeId> {
        for (id, _) in self.panes() {
            let b = self.bounds_of(id);
            if x >= b.x && x < b.x + b.width && y >= b.y && y < b.y + b.height {
                return Some(id);
            }
        }
        None
    }

    /// The nearest pane in `dir` from the focused pane, without mutating
    /// focus. Used by the message composer to pick a target with hjkl.
    pub fn find_pane_in_direction(&self, dir: Direction) -> Option<NodeId> {
        let panes = self.panes();
        let from = self.bounds_of(self.focused);
        super::focus::nearest_in_direction(from, self.focused, &panes, |id| self.bounds_of(id), dir)
    }

    /// Move focus to the nearest pane in `dir`, if one exists.
    pub fn focus_direction(&mut self, dir: Direction) {
        if let Some(id) = self.find_pane_in_direction(dir) {
            self.focused = id;
        }
    }

    /// Cycle focus to the next (`delta = 1`) or previous (`delta = -1`)
    /// pane in tree order.
    pub fn cycle_focus(&mut self, delta: i32) {
        let panes = self.panes();
        if panes.is_empty() {
            return;
        }
        let current = panes.iter().position(|&(id, _)| id == self.focused).unwrap_or(0);
        let len = panes.len() as i32;
        let next = (((current as i32 + delta) % len) + len) % len;
        self.focused = panes[next as usize].0;
    }

    /// Set focus directly to `id` (must be a live pane).
    pub fn set_focused(&mut self, id: NodeId) {
        if matches!(self.get(id), LayoutNode::Pane { .. }) {
            self.focused = id;
        }
    }

    /// Whether the tree is currently zoomed.
    pub fn is_zoomed(&self) -> bool {
        self.zoomed.is_some()
    }

    /// Replace the root with a fresh single pane referencing the focused
    /// agent; save the real root so [`unzoom`](Self::unzoom) can restore
    /// it. Zoom is a view transformation only — agent state is untouched.
    pub fn toggle_zoom(&mut self) {
        if self.zoomed.is_some() {
            self.unzoom();
        } else {
            self.zoom();
        }
    }

    fn zoom(&mut self) {
        let focused = self.focused;
        let agent_id = match self.agent_of(focused) {
            Some(a) => a,
            None => return,
        };
        let bounds = self.bounds_of(self.root);
        let zoomed_pane = self.alloc(LayoutNode::Pane { agent_id, bounds });
        self.zoomed = Some((self.root, focused));
        self.root = zoomed_pane;
        self.focused = zoomed_pane;
    }

    fn unzoom(&mut self) {
        if let Some((saved_root, saved_focus)) = self.zoomed.take() {
            // The synthetic zoom pane is now orphaned; drop it.
            self.remove_node(self.root);
            self.root = saved_root;
            self.focused = saved_focus;
        }
    }
}

/// A serializable rendering of a [`LayoutTree`] for session persistence
/// (spec §3, `Session.layout`). Bounds are not carried — they are
/// recomputed by [`LayoutTree::compute_bounds`] after restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LayoutSnapshot {
    Container { orientation: Orientation, children: Vec<LayoutSnapshot>, ratios: Vec<f64> },
    Pane { agent_id: AgentId, focused: bool },
}

impl LayoutTree {
    /// Render the live tree as a [`LayoutSnapshot`], marking whichever pane
    /// is currently focused so restore can recover it without needing the
    /// old arena's `NodeId`s (which are not meaningful across processes).
    pub fn snapshot(&self) -> LayoutSnapshot {
        self.snapshot_node(self.root)
    }

    fn snapshot_node(&self, id: NodeId) -> LayoutSnapshot {
        match self.get(id) {
            LayoutNode::Pane { agent_id, .. } => {
                LayoutSnapshot::Pane { agent_id: *agent_id, focused: id == self.focused }
            }
            LayoutNode::Container { orientation, children, ratios, .. } => LayoutSnapshot::Container {
                orientation: *orientation,
                children: children.iter().map(|&c| self.snapshot_node(c)).collect(),
                ratios: ratios.clone(),
            },
        }
    }

    /// Rebuild a tree from a [`LayoutSnapshot`], filling `rect` and
    /// restoring whichever pane was marked focused (falling back to the
    /// first pane encountered if none was, which should not happen for a
    /// snapshot this crate produced itself).
    pub fn from_snapshot(snapshot: &LayoutSnapshot, rect: Rect) -> Self {
        let mut tree = Self {
            arena: Vec::new(),
            parent: HashMap::new(),
            root: NodeId(0),
            focused: NodeId(0),
            next_id: 0,
            zoomed: None,
        };
        let mut focused = None;
        let root = tree.build_from_snapshot(snapshot, rect, None, &mut focused);
        tree.root = root;
        tree.focused = focused.unwrap_or(root);
        tree.compute_bounds(rect);
        tree
    }

    fn build_from_snapshot(
        &mut self,
        snapshot: &LayoutSnapshot,
        rect: Rect,
        parent: Option<NodeId>,
        focused: &mut Option<NodeId>,
    ) -> NodeId {
        match snapshot {
            LayoutSnapshot::Pane { agent_id, focused: is_focused } => {
                let id = self.alloc(LayoutNode::Pane { agent_id: *agent_id, bounds: rect });
                if let Some(p) = parent {
                    self.parent.insert(id, p);
                }
                if *is_focused {
                    *focused = Some(id);
                }
                id
            }
            LayoutSnapshot::Container { orientation, children, ratios } => {
                let id = self.alloc(LayoutNode::Container {
                    orientation: *orientation,
                    children: Vec::new(),
                    ratios: ratios.clone(),
                    bounds: rect,
                });
                if let Some(p) = parent {
                    self.parent.insert(id, p);
                }
                let child_ids: Vec<NodeId> = children
                    .iter()
                    .map(|c| self.build_from_snapshot(c, rect, Some(id), focused))
                    .collect();
                if let LayoutNode::Container { children, .. } = self.get_mut(id) {
                    *children = child_ids;
                }
                id
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentId;

    fn rect() -> Rect {
        Rect::new(0, 0, 80, 24)
    }

    #[test]
    fn new_tree_is_single_pane() {
        let tree = LayoutTree::new(AgentId::new(), rect());
        assert_eq!(tree.panes().len(), 1);
        assert_eq!(tree.focused(), tree.root());
    }

    #[test]
    fn split_creates_two_panes_and_moves_focus() {
        let mut tree = LayoutTree::new(AgentId::new(), rect());
        let original_focus = tree.focused();
        tree.split_focused(Orientation::Horizontal, AgentId::new());
        assert_eq!(tree.panes().len(), 2);
        assert_ne!(tree.focused(), original_focus);
    }

    #[test]
    fn split_then_close_restores_shape_and_focus() {
        let mut tree = LayoutTree::new(AgentId::new(), rect());
        let original_root = tree.root();
        let original_focus = tree.focused();
        tree.split_focused(Orientation::Vertical, AgentId::new());
        tree.close_focused();
        assert_eq!(tree.panes().len(), 1);
        assert_eq!(tree.focused(), original_focus);
        assert_eq!(tree.root(), original_root);
    }

    #[test]
    fn close_focused_fails_when_only_pane() {
        let mut tree = LayoutTree::new(AgentId::new(), rect());
        assert!(!tree.close_focused());
        assert_eq!(tree.panes().len(), 1);
    }

    #[test]
    fn bounds_sum_to_container_span() {
        let mut tree = LayoutTree::new(AgentId::new(), rect());
        tree.split_focused(Orientation::Horizontal, AgentId::new());
        tree.split_focused(Orientation::Vertical, AgentId::new());
        tree.compute_bounds(rect());
        // Root container spans full width; its two children's widths plus
        // one border must equal total width.
        let panes = tree.panes();
        assert_eq!(panes.len(), 3);
        for (id, _) in &panes {
            let b = tree.bounds_of(*id);
            assert!(b.width > 0 && b.height > 0);
        }
    }

    #[test]
    fn zoom_then_unzoom_restores_root() {
        let mut tree = LayoutTree::new(AgentId::new(), rect());
        tree.split_focused(Orientation::Horizontal, AgentId::new());
        let root_before = tree.root();
        let focus_before = tree.focused();
        tree.toggle_zoom();
        assert_ne!(tree.root(), root_before);
        assert_eq!(tree.panes().len(), 1);
        tree.toggle_zoom();
        assert_eq!(tree.root(), root_before);
        assert_eq!(tree.focused(), focus_before);
        assert_eq!(tree.panes().len(), 2);
    }

    #[test]
    fn resize_to_width_one_keeps_bounds_non_negative() {
        let mut tree = LayoutTree::new(AgentId::new(), rect());
        tree.split_focused(Orientation::Horizontal, AgentId::new());
        tree.compute_bounds(Rect::new(0, 0, 1, 1));
        for (id, _) in tree.panes() {
            let b = tree.bounds_of(id);
            assert!(b.width <= 1);
        }
    }

    #[test]
    fn cycle_focus_wraps_around() {
        let mut tree = LayoutTree::new(AgentId::new(), rect());
        tree.split_focused(Orientation::Horizontal, AgentId::new());
        let second = tree.focused();
        tree.cycle_focus(1);
        assert_ne!(tree.focused(), second);
        tree.cycle_focus(-1);
        assert_eq!(tree.focused(), second);
    }

    #[test]
    fn snapshot_then_from_snapshot_restores_shape_and_focus() {
        let mut tree = LayoutTree::new(AgentId::new(), rect());
        tree.split_focused(Orientation::Horizontal, AgentId::new());
        tree.split_focused(Orientation::Vertical, AgentId::new());
        let focused_agent = tree.agent_of(tree.focused()).unwrap();

        let snapshot = tree.snapshot();
        let restored = LayoutTree::from_snapshot(&snapshot, rect());

        assert_eq!(restored.panes().len(), 3);
        assert_eq!(restored.agent_of(restored.focused()), Some(focused_agent));
    }

    #[test]
    fn equalize_resets_ratios() {
        let mut tree = LayoutTree::new(AgentId::new(), rect());
        tree.split_focused(Orientation::Horizontal, AgentId::new());
        tree.resize_focused(0.3);
        tree.equalize(tree.root());
        tree.compute_bounds(rect());
        let panes = tree.panes();
        let widths: Vec<u16> = panes.iter().map(|(id, _)| tree.bounds_of(*id).width).collect();
        assert!((widths[0] as i32 - widths[1] as i32).abs() <= 1);
    }
}
