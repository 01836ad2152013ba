use std::sync::Arc;

use crate::bus::MessageBus;
use crate::error::MessageBusError;
use crate::listener::{ListenerError, MessageListener};
use crate::message::Message;
use crate::priority::Priority;
use crate::registry::SubscriptionToken;

/// Declarative subscription table, built once at wiring time.
///
/// Call sites declare what listens where, then `bind` registers the whole
/// table against a bus in one step. This replaces ad-hoc
/// `register_listener` calls scattered through startup code, and it fails
/// loudly: every declaration is validated before anything is registered,
/// so a misdeclared subscription aborts wiring instead of silently going
/// missing.
///
/// With the `macros` feature the `subscriptions!` macro builds one of
/// these from a declaration list.
///
/// ## Example
///
/// ```
/// use std::sync::Arc;
/// use messagebus_rust::{ListenerError, Message, MessageBus, Subscriptions};
///
/// fn on_shutdown(_message: &Message) -> Result<(), ListenerError> {
///     Ok(())
/// }
///
/// let bus = MessageBus::new();
/// let tokens = Subscriptions::new()
///     .to("system.shutdown", Arc::new(on_shutdown))
///     .bind(&bus)
///     .unwrap();
/// assert_eq!(tokens.len(), 1);
/// bus.shutdown();
/// ```
pub struct Subscriptions {
    declared: Vec<Declaration>,
}

struct Declaration {
    destinations: Vec<String>,
    priority: Priority,
    action: Option<String>,
    listener: Arc<dyn MessageListener>,
}

/// Listener adapter that only forwards messages carrying a given action.
struct ActionFiltered {
    action: String,
    inner: Arc<dyn MessageListener>,
}

impl MessageListener for ActionFiltered {
    fn receive(&self, message: &Message) -> Result<(), ListenerError> {
        if message.is_same_action(&self.action) {
            self.inner.receive(message)
        } else {
            Ok(())
        }
    }
}

impl Subscriptions {
    pub fn new() -> Self {
        Self {
            declared: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    pub fn len(&self) -> usize {
        self.declared.len()
    }

    /// Full-form declaration; the builder shorthands below cover the
    /// common cases.
    pub fn declare(
        mut self,
        destinations: Vec<String>,
        priority: Priority,
        action: Option<String>,
        listener: Arc<dyn MessageListener>,
    ) -> Self {
        self.declared.push(Declaration {
            destinations,
            priority,
            action,
            listener,
        });
        self
    }

    pub fn to(self, destination: &str, listener: Arc<dyn MessageListener>) -> Self {
        self.declare(
            vec![destination.to_string()],
            Priority::Normal,
            None,
            listener,
        )
    }

    pub fn to_with_priority(
        self,
        destination: &str,
        priority: Priority,
        listener: Arc<dyn MessageListener>,
    ) -> Self {
        self.declare(vec![destination.to_string()], priority, None, listener)
    }

    pub fn to_all(self, destinations: &[&str], listener: Arc<dyn MessageListener>) -> Self {
        self.declare(
            destinations.iter().map(|d| d.to_string()).collect(),
            Priority::Normal,
            None,
            listener,
        )
    }

    /// Register every declaration against `bus`.
    ///
    /// The whole table is validated first; an invalid declaration aborts
    /// the wiring step with [`MessageBusError::InvalidSubscription`] and
    /// nothing gets registered. On success each declaration ends up
    /// registered exactly once per declared destination, and the returned
    /// tokens can be used to unregister later.
    pub fn bind(&self, bus: &MessageBus) -> Result<Vec<SubscriptionToken>, MessageBusError> {
        for (index, declaration) in self.declared.iter().enumerate() {
            if declaration.destinations.is_empty() {
                return Err(MessageBusError::InvalidSubscription(format!(
                    "declaration #{} subscribes to no destinations",
                    index
                )));
            }
            if declaration.destinations.iter().any(String::is_empty) {
                return Err(MessageBusError::InvalidSubscription(format!(
                    "declaration #{} names an empty destination",
                    index
                )));
            }
            if declaration.action.as_deref() == Some("") {
                return Err(MessageBusError::InvalidSubscription(format!(
                    "declaration #{} has an empty action filter",
                    index
                )));
            }
        }

        let mut tokens = Vec::new();
        for declaration in &self.declared {
            // One adapter per declaration, shared across its destinations,
            // so the registry's identity dedup still applies.
            let listener: Arc<dyn MessageListener> = match &declaration.action {
                Some(action) => Arc::new(ActionFiltered {
                    action: action.clone(),
                    inner: Arc::clone(&declaration.listener),
                }),
                None => Arc::clone(&declaration.listener),
            };

            for destination in &declaration.destinations {
                tokens.push(bus.register_listener_with_priority(
                    destination,
                    declaration.priority,
                    Arc::clone(&listener),
                )?);
            }
        }

        log::debug!("bound {} subscription declarations", self.declared.len());
        Ok(tokens)
    }
}

impl Default for Subscriptions {
    fn default() -> Self {
        Self::new()
    }
}
