//! Memory policies.

/// Mark-compact compaction over a space of aligned chunks.
pub mod compact;
