//! Use-case services over the note store.
//!
//! # Responsibility
//! - `link_graph`: the link extraction/persistence/resolution protocol.
//! - `note_service`: create/edit workflows that call it in the right order.
//!
//! Services are plain values built from a store handle and passed to
//! callers; there are no process-wide service instances.

pub mod link_graph;
pub mod note_service;
