use std::error::Error;
use std::fmt;

use crate::message::Message;

/// Error a listener may raise while handling a message.
///
/// These never reach the sender on the default delivery path; they are
/// caught per listener and logged so one failing listener cannot starve
/// its siblings.
#[derive(Debug)]
pub struct ListenerError {
    message: String,
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ListenerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn Error + 'static))
    }
}

/// Capability of receiving messages from the bus.
///
/// Anything `Send + Sync` that can handle a [`Message`] qualifies: structs
/// implementing the trait directly, or plain functions and closures via the
/// blanket impl below.
pub trait MessageListener: Send + Sync {
    fn receive(&self, message: &Message) -> Result<(), ListenerError>;
}

impl<F> MessageListener for F
where
    F: Fn(&Message) -> Result<(), ListenerError> + Send + Sync,
{
    fn receive(&self, message: &Message) -> Result<(), ListenerError> {
        self(message)
    }
}
