use std::error::Error;
use std::fmt;

use crate::listener::ListenerError;

/// Bus-level failures surfaced to callers.
///
/// Per-listener delivery failures are deliberately absent from the default
/// path: they are contained inside the delivery loop and logged. `Delivery`
/// only appears when a fail-fast sender strategy is asked to propagate.
#[derive(Debug)]
pub enum MessageBusError {
    /// A send or registration named an empty destination.
    InvalidDestination(String),
    /// The bus worker has been shut down; async sends are refused.
    BusUnavailable,
    /// A propagating sender surfaced a listener failure.
    Delivery {
        message: String,
        source: ListenerError,
    },
    /// An internal lock was poisoned during the named operation.
    LockPoisoned(&'static str),
    /// A subscription declaration could not be bound at wiring time.
    InvalidSubscription(String),
}

impl fmt::Display for MessageBusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageBusError::InvalidDestination(message) => {
                write!(f, "message destination can't be empty: {}", message)
            }
            MessageBusError::BusUnavailable => {
                write!(f, "message bus worker is not available (already shut down?)")
            }
            MessageBusError::Delivery { message, source } => {
                write!(f, "failed to deliver {}: {}", message, source)
            }
            MessageBusError::LockPoisoned(operation) => {
                write!(f, "message bus lock poisoned during {}", operation)
            }
            MessageBusError::InvalidSubscription(reason) => {
                write!(f, "invalid subscription declaration: {}", reason)
            }
        }
    }
}

impl Error for MessageBusError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MessageBusError::Delivery { source, .. } => Some(source),
            _ => None,
        }
    }
}
