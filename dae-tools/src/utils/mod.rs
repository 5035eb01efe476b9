//! Shared utilities for the dae-tools CLI

pub mod table;
pub mod tree;

pub use table::*;
pub use tree::*;
