pub mod api;
pub mod events;
pub mod models;
pub mod state;

/// The reserved default channel. Messages with no stored channel belong
/// here, and it can never be deleted.
pub const DEFAULT_CHANNEL: &str = "general";
