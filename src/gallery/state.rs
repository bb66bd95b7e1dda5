//! Navigation state machine for gallery viewers

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a gallery navigation attempt
///
/// Transitions: Closed -> TriggerFound -> ViewerOpen -> Navigating ->
/// Exhausted, with Failed reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavState {
    /// No viewer interaction has started
    Closed,

    /// A gallery trigger was located on the item
    TriggerFound,

    /// The viewer was opened successfully
    ViewerOpen,

    /// Stepping through viewer positions
    Navigating,

    /// Navigation ended normally (repeat seen, no next position, or a
    /// ceiling was reached)
    Exhausted,

    /// The trigger could not be activated or the viewer broke mid-walk
    Failed,
}

impl NavState {
    /// Whether navigation has finished, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhausted | Self::Failed)
    }

    /// Whether a viewer is currently open
    pub fn is_active(&self) -> bool {
        matches!(self, Self::ViewerOpen | Self::Navigating)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::TriggerFound => "trigger_found",
            Self::ViewerOpen => "viewer_open",
            Self::Navigating => "navigating",
            Self::Exhausted => "exhausted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for NavState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NavState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "closed" => Ok(Self::Closed),
            "trigger_found" => Ok(Self::TriggerFound),
            "viewer_open" => Ok(Self::ViewerOpen),
            "navigating" => Ok(Self::Navigating),
            "exhausted" => Ok(Self::Exhausted),
            "failed" => Ok(Self::Failed),
            other => Err(format!("Unknown navigation state: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_terminal_states() {
        assert!(NavState::Exhausted.is_terminal());
        assert!(NavState::Failed.is_terminal());
        assert!(!NavState::Closed.is_terminal());
        assert!(!NavState::Navigating.is_terminal());
    }

    #[test]
    fn test_active_states() {
        assert!(NavState::ViewerOpen.is_active());
        assert!(NavState::Navigating.is_active());
        assert!(!NavState::TriggerFound.is_active());
        assert!(!NavState::Exhausted.is_active());
    }

    #[test]
    fn test_string_roundtrip() {
        for state in [
            NavState::Closed,
            NavState::TriggerFound,
            NavState::ViewerOpen,
            NavState::Navigating,
            NavState::Exhausted,
            NavState::Failed,
        ] {
            assert_eq!(NavState::from_str(state.as_str()).unwrap(), state);
        }
    }

    #[test]
    fn test_unknown_state_string() {
        assert!(NavState::from_str("sideways").is_err());
    }
}
