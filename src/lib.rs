//! Sniplets: tree-structured snippet storage with template processing.
//!
//! The data/template core of a personal snippet manager: an ordered tree of
//! folders and reusable text fragments, a size-constrained compressed
//! serialization of that tree, and a placeholder engine that turns a stored
//! fragment plus live context into final text and the custom fields still
//! requiring user input.

pub mod config;
pub mod document;
pub mod error;
pub mod interchange;
pub mod logging;
pub mod space;
pub mod storage;
pub mod template;
pub mod tree;
pub mod types;
