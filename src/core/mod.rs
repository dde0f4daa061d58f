//! Core protocol types.
//!
//! This module contains the message set every actor speaks and the lifecycle
//! state machine that governs a single source subscription.

pub mod lifecycle;
pub mod message;

// Re-export core items
pub use lifecycle::{LifecycleState, Operation, ProtocolViolation};
pub use message::{Actor, Kind, Message, Signal, Sink, Source, Talkback};
