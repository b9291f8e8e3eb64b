//! Document tree: node variants and construction from untyped records.

pub mod node;

pub use node::{derive_name, Color, Folder, Sniplet, TreeItem};
