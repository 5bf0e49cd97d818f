//! Domain model for the note link graph.
//!
//! # Responsibility
//! - Define notes, link edges and their identifiers.
//! - Keep validation rules next to the data they guard.
//!
//! # Invariants
//! - Every note and link is identified by a stable UUID.
//! - A link's `target_slug` is the durable intent; `target_note_id` is a
//!   cache of the last resolution pass.

pub mod link;
pub mod note;

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}
