use serde::{Deserialize, Serialize};

use crate::DEFAULT_CHANNEL;

/// Client UI state, kept as one explicit serializable value. View code holds
/// it by reference and every change goes through [`UiState::apply`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiState {
    pub sidebar_open: bool,
    pub current_channel: String,
    pub is_typing: bool,
    pub unread_count: u32,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            sidebar_open: false,
            current_channel: DEFAULT_CHANNEL.to_string(),
            is_typing: false,
            unread_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiAction {
    ToggleSidebar,
    SetChannel(String),
    SetTyping(bool),
    IncrementUnread,
    ResetUnread,
}

impl UiState {
    /// Pure transition: returns the state after applying `action`.
    pub fn apply(&self, action: UiAction) -> UiState {
        let mut next = self.clone();
        match action {
            UiAction::ToggleSidebar => next.sidebar_open = !next.sidebar_open,
            UiAction::SetChannel(channel) => {
                next.current_channel = channel;
                // Switching channels marks everything there as read
                next.unread_count = 0;
            }
            UiAction::SetTyping(typing) => next.is_typing = typing,
            UiAction::IncrementUnread => {
                next.unread_count = next.unread_count.saturating_add(1);
            }
            UiAction::ResetUnread => next.unread_count = 0,
        }
        next
    }
}
