//! Lifecycle state machine of a single source subscription.

use std::fmt;

/// State of one source lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LifecycleState {
    /// Subscribed, but the producer has not called `start` yet
    Inactive,
    /// Handshake done; values and pull requests flow
    Active,
    /// The producer completed or failed
    Ended,
    /// The consumer stopped the lifecycle
    Disposed,
}

/// Something that is attempted on a lifecycle, by either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operation {
    /// The producer sends the handshake
    Start,
    /// The producer sends a value
    Next,
    /// The producer fails
    Error,
    /// The producer completes
    Complete,
    /// The sink asks for a value
    Pull,
    /// The sink cancels
    Stop,
}

impl Operation {
    /// Name used in diagnostics and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Start => "start",
            Operation::Next => "next",
            Operation::Error => "error",
            Operation::Complete => "complete",
            Operation::Pull => "pull",
            Operation::Stop => "stop",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation that is not allowed in the current lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[error("This source {}, but '{operation}' was invoked.", describe(.state))]
pub struct ProtocolViolation {
    /// Name of the source, if it was given one
    pub source_name: Option<&'static str>,
    pub operation: Operation,
    pub state: LifecycleState,
}

fn describe(state: &LifecycleState) -> &'static str {
    match state {
        LifecycleState::Inactive => "has not been started",
        LifecycleState::Active => "is already active",
        LifecycleState::Ended => "has previously ended",
        LifecycleState::Disposed => "was previously disposed",
    }
}

impl LifecycleState {
    /// Whether no further values can flow
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Ended | LifecycleState::Disposed)
    }

    /// Validate `operation` against this state and return the state it leads to.
    pub fn transition(self, operation: Operation) -> Result<LifecycleState, ProtocolViolation> {
        use LifecycleState::*;

        let next = match (self, operation) {
            (Inactive, Operation::Start) => Active,
            (Active, Operation::Next | Operation::Pull) => Active,
            (Active, Operation::Error | Operation::Complete) => Ended,
            (Inactive | Active | Ended, Operation::Stop) => Disposed,
            (state, operation) => {
                return Err(ProtocolViolation {
                    source_name: None,
                    operation,
                    state,
                })
            }
        };
        Ok(next)
    }
}
