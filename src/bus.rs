use std::sync::Arc;

use crate::error::MessageBusError;
use crate::listener::MessageListener;
use crate::message::Message;
use crate::priority::Priority;
use crate::registry::{DestinationRegistry, SubscriptionToken};
use crate::sender::{senders, Sender};
use crate::worker::{DeliveryStats, DeliveryWorker};

/// In-process publish/subscribe message bus.
///
/// Owns the destination registry and a single background
/// [`DeliveryWorker`] used only for asynchronous sends. Synchronous sends
/// run to completion on the caller's thread against a snapshot of the
/// listeners registered at call time; asynchronous sends queue the same
/// delivery on the worker and return immediately, preserving submission
/// order.
///
/// ## Example
///
/// ```
/// use std::sync::Arc;
/// use messagebus_rust::{ListenerError, Message, MessageBus};
///
/// let bus = MessageBus::new();
/// bus.register_listener(
///     "app.shutdown",
///     Arc::new(|message: &Message| -> Result<(), ListenerError> {
///         assert!(message.is_same_destination("app.shutdown"));
///         Ok(())
///     }),
/// )
/// .unwrap();
///
/// bus.send_message("app.shutdown").unwrap();
/// bus.shutdown();
/// ```
pub struct MessageBus {
    registry: Arc<DestinationRegistry>,
    worker: DeliveryWorker,
    default_sender: Arc<dyn Sender>,
}

impl MessageBus {
    /// Create a bus with its own delivery worker.
    pub fn new() -> Self {
        Self::with_worker(DeliveryWorker::spawn())
    }

    /// Create a bus around a caller-supplied worker.
    ///
    /// The bus takes ownership; shutting the worker down remains the bus
    /// owner's responsibility via [`MessageBus::shutdown`].
    pub fn with_worker(worker: DeliveryWorker) -> Self {
        Self {
            registry: Arc::new(DestinationRegistry::new()),
            worker,
            default_sender: senders::continue_on_failure(),
        }
    }

    /// Replace the default delivery strategy.
    pub fn with_default_sender(mut self, sender: Arc<dyn Sender>) -> Self {
        self.default_sender = sender;
        self
    }

    pub fn register_listener(
        &self,
        destination: &str,
        listener: Arc<dyn MessageListener>,
    ) -> Result<SubscriptionToken, MessageBusError> {
        self.register_listener_with_priority(destination, Priority::Normal, listener)
    }

    pub fn register_listener_with_priority(
        &self,
        destination: &str,
        priority: Priority,
        listener: Arc<dyn MessageListener>,
    ) -> Result<SubscriptionToken, MessageBusError> {
        self.registry.register(destination, priority, listener)
    }

    /// Register one listener for several destinations, one token each.
    pub fn register_listener_all(
        &self,
        destinations: &[&str],
        listener: Arc<dyn MessageListener>,
    ) -> Result<Vec<SubscriptionToken>, MessageBusError> {
        self.register_listener_all_with_priority(destinations, Priority::Normal, listener)
    }

    pub fn register_listener_all_with_priority(
        &self,
        destinations: &[&str],
        priority: Priority,
        listener: Arc<dyn MessageListener>,
    ) -> Result<Vec<SubscriptionToken>, MessageBusError> {
        destinations
            .iter()
            .map(|dest| self.registry.register(dest, priority, Arc::clone(&listener)))
            .collect()
    }

    /// Remove a listener from a destination; a no-op if it was never there.
    pub fn unregister_listener(
        &self,
        destination: &str,
        listener: &Arc<dyn MessageListener>,
    ) -> Result<bool, MessageBusError> {
        self.registry.unregister(destination, listener)
    }

    pub fn unregister_listener_all(
        &self,
        destinations: &[&str],
        listener: &Arc<dyn MessageListener>,
    ) -> Result<(), MessageBusError> {
        for dest in destinations {
            self.registry.unregister(dest, listener)?;
        }
        Ok(())
    }

    /// Remove the registration behind a token. Idempotent.
    pub fn unregister(&self, token: &SubscriptionToken) -> Result<bool, MessageBusError> {
        self.registry.unregister_token(token)
    }

    /// Deliver synchronously, on the calling thread, to every listener
    /// currently registered for the message's destination.
    ///
    /// Returns once the whole snapshot has been invoked. With the default
    /// strategy individual listener failures are logged, not returned.
    pub fn send_message(&self, message: impl Into<Message>) -> Result<(), MessageBusError> {
        let message = message.into();
        deliver(&self.registry, &message, self.default_sender.as_ref())
    }

    /// Synchronous delivery with an explicit strategy.
    pub fn send_message_with(
        &self,
        message: impl Into<Message>,
        sender: &dyn Sender,
    ) -> Result<(), MessageBusError> {
        let message = message.into();
        deliver(&self.registry, &message, sender)
    }

    /// Like [`MessageBus::send_message`], but failures are logged instead
    /// of returned. Useful at call sites with nobody to report to.
    pub fn send_message_silently(&self, message: impl Into<Message>) {
        let message = message.into();
        if let Err(e) = deliver(&self.registry, &message, self.default_sender.as_ref()) {
            log::error!("failed to deliver message: {}", e);
        }
    }

    pub fn send_message_silently_with(&self, message: impl Into<Message>, sender: &dyn Sender) {
        let message = message.into();
        if let Err(e) = deliver(&self.registry, &message, sender) {
            log::error!("failed to deliver message: {}", e);
        }
    }

    /// Queue the delivery on the background worker and return immediately.
    ///
    /// Only pre-dispatch validation can fail here: an empty destination,
    /// or a bus whose worker has been shut down
    /// ([`MessageBusError::BusUnavailable`]). Delivery failures on the
    /// worker are logged, never surfaced to the sender. Successive async
    /// sends are delivered in submission order.
    pub fn send_message_async(&self, message: impl Into<Message>) -> Result<(), MessageBusError> {
        self.send_message_async_with(message, Arc::clone(&self.default_sender))
    }

    pub fn send_message_async_with(
        &self,
        message: impl Into<Message>,
        sender: Arc<dyn Sender>,
    ) -> Result<(), MessageBusError> {
        let message = message.into();
        if message.destination().is_empty() {
            return Err(MessageBusError::InvalidDestination(message.to_string()));
        }

        let registry = Arc::clone(&self.registry);
        self.worker
            .submit(Box::new(move || deliver(&registry, &message, sender.as_ref())))
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Stop the delivery worker: already-queued deliveries are drained,
    /// then the thread is joined. Idempotent; later async sends fail with
    /// [`MessageBusError::BusUnavailable`], synchronous sends keep working.
    pub fn shutdown(&self) -> Option<DeliveryStats> {
        self.worker.stop()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

fn deliver(
    registry: &DestinationRegistry,
    message: &Message,
    sender: &dyn Sender,
) -> Result<(), MessageBusError> {
    if message.destination().is_empty() {
        return Err(MessageBusError::InvalidDestination(message.to_string()));
    }

    let to = registry.listeners_for(message.destination())?;
    if to.is_empty() {
        log::warn!("no listeners for destination {}", message.destination());
        return Ok(());
    }

    sender.send(message, &to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::ListenerError;
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    struct CapturingListener {
        received: Mutex<Vec<Message>>,
    }

    impl CapturingListener {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                received: Mutex::new(Vec::new()),
            })
        }

        fn received(&self) -> Vec<Message> {
            self.received.lock().unwrap().clone()
        }
    }

    impl MessageListener for CapturingListener {
        fn receive(&self, message: &Message) -> Result<(), ListenerError> {
            self.received.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[test]
    fn sync_send_delivers_to_registered_listener() {
        let bus = MessageBus::new();
        let listener = CapturingListener::new();

        bus.register_listener("system.shutdown", listener.clone())
            .unwrap();
        bus.send_message("system.shutdown").unwrap();

        let received = listener.received();
        assert_eq!(received.len(), 1);
        assert!(received[0].is_same_destination("system.shutdown"));
    }

    #[test]
    fn unregistered_listener_no_longer_receives() {
        let bus = MessageBus::new();
        let listener = CapturingListener::new();
        let as_dyn: Arc<dyn MessageListener> = listener.clone();

        bus.register_listener("system.shutdown", as_dyn.clone())
            .unwrap();
        bus.send_message("system.shutdown").unwrap();
        bus.unregister_listener("system.shutdown", &as_dyn).unwrap();
        bus.send_message("system.shutdown").unwrap();

        assert_eq!(listener.received().len(), 1);
    }

    #[test]
    fn duplicate_registration_delivers_once() {
        let bus = MessageBus::new();
        let listener = CapturingListener::new();

        bus.register_listener("dest", listener.clone()).unwrap();
        bus.register_listener("dest", listener.clone()).unwrap();
        bus.send_message("dest").unwrap();

        assert_eq!(listener.received().len(), 1);
    }

    #[test]
    fn send_with_no_listeners_succeeds() {
        let bus = MessageBus::new();
        bus.send_message("nobody.home").unwrap();
    }

    #[test]
    fn empty_destination_is_rejected() {
        let bus = MessageBus::new();

        let err = bus.send_message("").unwrap_err();
        assert!(matches!(err, MessageBusError::InvalidDestination(_)));

        let err = bus.send_message_async("").unwrap_err();
        assert!(matches!(err, MessageBusError::InvalidDestination(_)));
    }

    #[test]
    fn failing_listener_does_not_block_siblings() {
        let bus = MessageBus::new();
        let failing: Arc<dyn MessageListener> =
            Arc::new(|_: &Message| -> Result<(), ListenerError> {
                Err(ListenerError::new("intentional failure"))
            });
        let sibling = CapturingListener::new();

        bus.register_listener_with_priority("dest", Priority::High, failing)
            .unwrap();
        bus.register_listener("dest", sibling.clone()).unwrap();

        bus.send_message("dest").unwrap();
        assert_eq!(sibling.received().len(), 1);
    }

    #[test]
    fn simple_sender_propagates_listener_failure() {
        let bus = MessageBus::new();
        let failing: Arc<dyn MessageListener> =
            Arc::new(|_: &Message| -> Result<(), ListenerError> {
                Err(ListenerError::new("intentional failure"))
            });
        bus.register_listener("dest", failing).unwrap();

        let err = bus
            .send_message_with("dest", senders::simple().as_ref())
            .unwrap_err();
        assert!(matches!(err, MessageBusError::Delivery { .. }));

        // The silent variant swallows the same failure.
        bus.send_message_silently_with("dest", senders::simple().as_ref());
    }

    #[test]
    fn sync_send_runs_on_calling_thread() {
        let bus = MessageBus::new();
        let caller = std::thread::current().id();
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);

        let listener: Arc<dyn MessageListener> =
            Arc::new(move |_: &Message| -> Result<(), ListenerError> {
                tx.lock().unwrap().send(std::thread::current().id()).unwrap();
                Ok(())
            });
        bus.register_listener("dest", listener).unwrap();
        bus.send_message("dest").unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), caller);
    }

    #[test]
    fn async_sends_deliver_in_submission_order() {
        let bus = MessageBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for dest in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            let listener: Arc<dyn MessageListener> =
                Arc::new(move |message: &Message| -> Result<(), ListenerError> {
                    order.lock().unwrap().push(message.destination().to_string());
                    Ok(())
                });
            bus.register_listener(dest, listener).unwrap();
        }

        bus.send_message_async("first").unwrap();
        bus.send_message_async("second").unwrap();
        bus.send_message_async("third").unwrap();

        let stats = bus.shutdown().unwrap();
        assert_eq!(stats.delivered, 3);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn async_send_does_not_run_on_calling_thread() {
        let bus = MessageBus::new();
        let caller = std::thread::current().id();
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);

        let listener: Arc<dyn MessageListener> =
            Arc::new(move |_: &Message| -> Result<(), ListenerError> {
                tx.lock().unwrap().send(std::thread::current().id()).unwrap();
                Ok(())
            });
        bus.register_listener("dest", listener).unwrap();
        bus.send_message_async("dest").unwrap();

        let worker_thread = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_ne!(worker_thread, caller);
        bus.shutdown();
    }

    #[test]
    fn async_send_after_shutdown_fails_cleanly() {
        let bus = MessageBus::new();
        assert!(bus.is_running());

        bus.shutdown().unwrap();
        assert!(!bus.is_running());
        assert!(bus.shutdown().is_none());

        let err = bus.send_message_async("dest").unwrap_err();
        assert!(matches!(err, MessageBusError::BusUnavailable));

        // The synchronous path never touches the worker.
        let listener = CapturingListener::new();
        bus.register_listener("dest", listener.clone()).unwrap();
        bus.send_message("dest").unwrap();
        assert_eq!(listener.received().len(), 1);
    }

    #[test]
    fn shutdown_drains_queued_deliveries() {
        let bus = MessageBus::new();
        let listener = CapturingListener::new();
        bus.register_listener("dest", listener.clone()).unwrap();

        for _ in 0..20 {
            bus.send_message_async("dest").unwrap();
        }

        let stats = bus.shutdown().unwrap();
        assert_eq!(stats.delivered, 20);
        assert_eq!(listener.received().len(), 20);
    }

    #[test]
    fn registration_during_delivery_does_not_affect_current_pass() {
        let bus = Arc::new(MessageBus::new());
        let late = CapturingListener::new();

        let registering_bus = Arc::clone(&bus);
        let late_for_closure = late.clone();
        let first: Arc<dyn MessageListener> =
            Arc::new(move |_: &Message| -> Result<(), ListenerError> {
                // Registering mid-delivery only takes effect for later sends.
                registering_bus
                    .register_listener("dest", late_for_closure.clone())
                    .map_err(|e| ListenerError::new(e.to_string()))?;
                Ok(())
            });
        bus.register_listener("dest", first).unwrap();

        bus.send_message("dest").unwrap();
        assert_eq!(late.received().len(), 0);

        bus.send_message("dest").unwrap();
        assert_eq!(late.received().len(), 1);
    }
}
