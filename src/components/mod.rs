// ============================================================================
// COMPONENTS — document-level state: diffs and edit history
// ============================================================================

pub mod diff;
pub mod history;
