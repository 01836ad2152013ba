use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::MessageBusError;
use crate::listener::MessageListener;
use crate::priority::Priority;

/// Stable handle returned at registration time.
///
/// Unregistering through a token is an exact removal that does not depend
/// on still holding the original listener reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionToken {
    id: u64,
    destination: String,
}

impl SubscriptionToken {
    pub fn destination(&self) -> &str {
        &self.destination
    }
}

struct Registered {
    id: u64,
    priority: Priority,
    listener: Arc<dyn MessageListener>,
}

/// Concurrent destination to listener table.
///
/// Per destination the listeners are kept sorted from highest to lowest
/// priority; among equal priorities the newest registration sits first.
/// Listener identity is the underlying allocation (`Arc::ptr_eq`), so
/// registering the same `Arc` twice for one destination stores it once.
pub struct DestinationRegistry {
    listeners: RwLock<HashMap<String, Vec<Registered>>>,
    next_id: AtomicU64,
}

impl DestinationRegistry {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add `listener` to `destination`'s set.
    ///
    /// Duplicate registrations are a logged no-op returning the token of
    /// the existing entry.
    pub fn register(
        &self,
        destination: &str,
        priority: Priority,
        listener: Arc<dyn MessageListener>,
    ) -> Result<SubscriptionToken, MessageBusError> {
        if destination.is_empty() {
            return Err(MessageBusError::InvalidDestination(
                "listener registration".to_string(),
            ));
        }

        let mut listeners = self
            .listeners
            .write()
            .map_err(|_| MessageBusError::LockPoisoned("register"))?;
        let entries = listeners.entry(destination.to_string()).or_default();

        if let Some(existing) = entries
            .iter()
            .find(|e| Arc::ptr_eq(&e.listener, &listener))
        {
            log::debug!("attempt to add duplicate listener for {}", destination);
            return Ok(SubscriptionToken {
                id: existing.id,
                destination: destination.to_string(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = Registered {
            id,
            priority,
            listener,
        };

        // Sorted high to low; equal priorities go in front of their peers.
        let index = entries
            .iter()
            .position(|e| !e.priority.is_higher_than(priority))
            .unwrap_or(entries.len());
        entries.insert(index, entry);

        Ok(SubscriptionToken {
            id,
            destination: destination.to_string(),
        })
    }

    /// Remove `listener` from `destination`'s set. Removing a listener that
    /// was never registered is a no-op, not a failure.
    pub fn unregister(
        &self,
        destination: &str,
        listener: &Arc<dyn MessageListener>,
    ) -> Result<bool, MessageBusError> {
        let mut listeners = self
            .listeners
            .write()
            .map_err(|_| MessageBusError::LockPoisoned("unregister"))?;

        let Some(entries) = listeners.get_mut(destination) else {
            return Ok(false);
        };

        let before = entries.len();
        entries.retain(|e| !Arc::ptr_eq(&e.listener, listener));
        Ok(entries.len() != before)
    }

    /// Remove the registration identified by `token`. Idempotent.
    pub fn unregister_token(&self, token: &SubscriptionToken) -> Result<bool, MessageBusError> {
        let mut listeners = self
            .listeners
            .write()
            .map_err(|_| MessageBusError::LockPoisoned("unregister_token"))?;

        let Some(entries) = listeners.get_mut(&token.destination) else {
            return Ok(false);
        };

        let before = entries.len();
        entries.retain(|e| e.id != token.id);
        Ok(entries.len() != before)
    }

    /// Snapshot of `destination`'s listeners in delivery order.
    ///
    /// The snapshot is a plain copy: registrations or removals happening
    /// concurrently never invalidate an iteration over it. An unknown
    /// destination reads as "no listeners".
    pub fn listeners_for(
        &self,
        destination: &str,
    ) -> Result<Vec<Arc<dyn MessageListener>>, MessageBusError> {
        let listeners = self
            .listeners
            .read()
            .map_err(|_| MessageBusError::LockPoisoned("listeners_for"))?;

        Ok(listeners
            .get(destination)
            .map(|entries| entries.iter().map(|e| Arc::clone(&e.listener)).collect())
            .unwrap_or_default())
    }

    pub fn listener_count(&self, destination: &str) -> Result<usize, MessageBusError> {
        let listeners = self
            .listeners
            .read()
            .map_err(|_| MessageBusError::LockPoisoned("listener_count"))?;
        Ok(listeners.get(destination).map_or(0, Vec::len))
    }
}

impl Default for DestinationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
