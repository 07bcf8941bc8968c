use serde::{Deserialize, Serialize};

/// Lifecycle of one generation session.
///
/// ```text
/// Idle → Retrieving → ContextBuilding → Generating → Auditing → Delivered | Blocked
///   any non-terminal state → Failed | Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    Idle,
    Retrieving,
    ContextBuilding,
    Generating,
    Auditing,
    Delivered,
    Blocked,
    Failed,
    Cancelled,
}

impl GenerationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Delivered | Self::Blocked | Self::Failed | Self::Cancelled
        )
    }

    /// Whether `self → next` is a legal edge of the state machine.
    pub fn can_transition_to(self, next: Self) -> bool {
        use GenerationState::*;
        if self.is_terminal() {
            return false;
        }
        match next {
            Cancelled | Failed => true,
            Retrieving => self == Idle,
            ContextBuilding => self == Retrieving,
            Generating => self == ContextBuilding,
            Auditing => self == Generating,
            Delivered | Blocked => self == Auditing,
            Idle => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Retrieving => "retrieving",
            Self::ContextBuilding => "context_building",
            Self::Generating => "generating",
            Self::Auditing => "auditing",
            Self::Delivered => "delivered",
            Self::Blocked => "blocked",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}
