use std::fmt;
use std::hash::{Hash, Hasher};

use crate::message_data::MessageData;

/// Action value matching a message that carries no action.
pub const ACTION_ANY: &str = "";

const DESTINATION_UNKNOWN: &str = "<unknown>";

/// An immutable message addressed to a destination.
///
/// A message names the destination it is bound for, optionally a secondary
/// `action` discriminator, and a [`MessageData`] payload. Routing only ever
/// consults the destination; actions are for listeners that want to tell
/// apart messages arriving on the same destination.
///
/// Equality and hashing cover destination and action only, never the
/// payload.
#[derive(Clone, Debug)]
pub struct Message {
    destination: String,
    action: Option<String>,
    data: MessageData,
}

impl Message {
    pub fn new(
        destination: impl Into<String>,
        action: Option<String>,
        data: MessageData,
    ) -> Self {
        Self {
            destination: destination.into(),
            action,
            data,
        }
    }

    /// A message bound nowhere, useful as a placeholder.
    pub fn empty() -> Self {
        Self::new(DESTINATION_UNKNOWN, None, MessageData::new())
    }

    pub fn for_destination(destination: impl Into<String>) -> Self {
        Self::new(destination, None, MessageData::new())
    }

    pub fn for_destination_and_action(
        destination: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self::new(destination, Some(action.into()), MessageData::new())
    }

    pub fn for_destination_and_action_with_data(
        destination: impl Into<String>,
        action: impl Into<String>,
        data: MessageData,
    ) -> Self {
        Self::new(destination, Some(action.into()), data)
    }

    pub fn with_data(mut self, data: MessageData) -> Self {
        self.data = data;
        self
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn data(&self) -> &MessageData {
        &self.data
    }

    pub fn is_same_destination(&self, destination: &str) -> bool {
        self.destination == destination
    }

    /// True when the message's action equals `value`. [`ACTION_ANY`]
    /// matches a message without an action.
    pub fn is_same_action(&self, value: &str) -> bool {
        match &self.action {
            Some(action) => action == value,
            None => value == ACTION_ANY,
        }
    }

    pub fn is_same_any_action(&self, values: &[&str]) -> bool {
        values.iter().any(|v| self.is_same_action(v))
    }

    pub fn is_same_destination_and_action(&self, destination: &str, action: &str) -> bool {
        self.is_same_destination(destination) && self.is_same_action(action)
    }
}

impl From<&str> for Message {
    fn from(destination: &str) -> Self {
        Message::for_destination(destination)
    }
}

impl From<String> for Message {
    fn from(destination: String) -> Self {
        Message::for_destination(destination)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Message{{destination='{}', action='{}'}}",
            self.destination,
            self.action.as_deref().unwrap_or(ACTION_ANY)
        )
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.destination == other.destination && self.action == other.action
    }
}

impl Eq for Message {}

impl Hash for Message {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.destination.hash(state);
        self.action.hash(state);
    }
}
