//! What a lifecycle operation actually did

use serde::{Deserialize, Serialize};

/// Effect of an idempotent lifecycle call.
///
/// `NoOp` means the desired state already held and no mutating request was
/// sent to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// The resource was created
    Create,
    /// An existing resource (or the topology document) was rewritten
    Update,
    /// The resource was deleted
    Delete,
    /// No changes needed
    NoOp,
}

impl ActionType {
    /// Whether a mutating request was issued
    pub fn is_change(&self) -> bool {
        !matches!(self, ActionType::NoOp)
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}
