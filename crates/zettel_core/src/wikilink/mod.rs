//! Wiki-link text processing.
//!
//! # Responsibility
//! - Turn note titles and link targets into canonical slugs.
//! - Extract `[[target]]` / `[[target|display]]` links from note text.
//!
//! # Invariants
//! - Both entry points are total: no input makes them fail or panic.
//! - Links inside fenced or inline code never reach the graph.

pub mod extract;
pub mod slug;
