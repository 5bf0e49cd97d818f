//! Persistence layer for notes and link edges.
//!
//! # Responsibility
//! - Define the record-level store contract used by the graph service.
//! - Keep SQL inside the store boundary.
//!
//! # Invariants
//! - Absent rows are `Ok(None)`, never an error.
//! - Multi-statement writes run inside one transaction.

pub mod note_store;
