//! Reporting of protocol misuse.
//!
//! Producer-side misuse (emitting before `start`, starting twice, emitting
//! after the end) never fails the caller. It is reported through a
//! [`Diagnostics`] hook instead, which logs through `tracing` unless the
//! embedding application injects its own.

use std::fmt;
use std::rc::Rc;

use crate::core::ProtocolViolation;

/// Injectable sink for [`ProtocolViolation`]s.
#[derive(Clone)]
pub struct Diagnostics {
    hook: Option<Rc<dyn Fn(&ProtocolViolation)>>,
}

impl Diagnostics {
    /// Route violations to a custom callback.
    pub fn new<F>(hook: F) -> Self
    where
        F: Fn(&ProtocolViolation) + 'static,
    {
        Self {
            hook: Some(Rc::new(hook)),
        }
    }

    /// Log violations as `tracing` warnings.
    pub fn tracing() -> Self {
        Self { hook: None }
    }

    /// Drop violations.
    pub fn silent() -> Self {
        Self::new(|_| {})
    }

    /// Report a violation. Best effort, never fails.
    pub fn report(&self, violation: &ProtocolViolation) {
        #[cfg(feature = "metrics")]
        metrics::counter!(
            "talkback_protocol_violations_total",
            "operation" => violation.operation.as_str()
        )
        .increment(1);

        match &self.hook {
            Some(hook) => hook(violation),
            None => tracing::warn!(
                source = violation.source_name.unwrap_or("anonymous"),
                operation = %violation.operation,
                state = ?violation.state,
                "{}",
                violation
            ),
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::tracing()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hook {
            Some(_) => write!(f, "Diagnostics::Custom"),
            None => write!(f, "Diagnostics::Tracing"),
        }
    }
}
