//! Results of access evaluation and chapter unlocking.

use serde::{Deserialize, Serialize};

/// Where a (user, chapter) pair sits relative to the token gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AccessState {
    /// No gate.
    Free,
    /// Locked, but already purchased.
    Owned,
    /// Locked, not owned, balance covers the cost.
    LockedAffordable,
    /// Locked, not owned, balance below the cost.
    LockedUnaffordable,
}

impl AccessState {
    pub fn can_access(self) -> bool {
        !matches!(self, Self::LockedUnaffordable)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct AccessResult {
    pub can_access: bool,
    pub state: AccessState,
    pub message: String,
}

impl AccessResult {
    pub fn new(state: AccessState, message: impl Into<String>) -> Self {
        Self {
            can_access: state.can_access(),
            state,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct UnlockResult {
    pub success: bool,
    pub message: String,
    pub tokens_spent: u64,
    pub remaining_balance: u64,
    pub already_purchased: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affordable_states_grant_access() {
        assert!(AccessState::Free.can_access());
        assert!(AccessState::Owned.can_access());
        assert!(AccessState::LockedAffordable.can_access());
        assert!(!AccessState::LockedUnaffordable.can_access());
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_string(&AccessState::LockedUnaffordable).expect("serialize");
        assert_eq!(json, "\"locked_unaffordable\"");
    }
}
