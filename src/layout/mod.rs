//! Binary split-tree layout.
//!
//! The source keeps child->parent back-pointers to walk upward during
//! focus and resize. We express the tree as an arena: nodes live in a
//! `Vec<Slot>` indexed by [`NodeId`], and `parent_of` is a map lookup
//! instead of a pointer chase. There is no cyclic ownership.

mod bounds;
mod focus;
mod tree;

pub use bounds::{distribute, Rect};
pub use focus::Direction;
pub use tree::{LayoutSnapshot, LayoutTree, NodeId, Orientation};

