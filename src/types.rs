//! Core types for tree addressing.

/// Seq: 1-based position of an item within its parent's ordered child list.
/// Dense (1..N, no gaps) among siblings outside an in-progress mutation.
pub type Seq = u32;

/// TreePath: seq values walked from the document root to locate a node.
pub type TreePath = Vec<Seq>;
