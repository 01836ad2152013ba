use std::sync::Arc;

use crate::error::MessageBusError;
use crate::listener::MessageListener;
use crate::message::Message;

/// Delivery strategy: how a message reaches a snapshot of listeners.
///
/// The bus default is [`senders::continue_on_failure`], which isolates
/// per-listener failures. [`senders::simple`] is the fail-fast
/// alternative for callers that want the first listener error back.
pub trait Sender: Send + Sync {
    fn send(
        &self,
        message: &Message,
        to: &[Arc<dyn MessageListener>],
    ) -> Result<(), MessageBusError>;
}

/// Built-in delivery strategies.
pub mod senders {
    use super::*;

    struct Simple;

    impl Sender for Simple {
        fn send(
            &self,
            message: &Message,
            to: &[Arc<dyn MessageListener>],
        ) -> Result<(), MessageBusError> {
            for listener in to {
                listener
                    .receive(message)
                    .map_err(|source| MessageBusError::Delivery {
                        message: message.to_string(),
                        source,
                    })?;
            }
            Ok(())
        }
    }

    struct ContinueOnFailure;

    impl Sender for ContinueOnFailure {
        fn send(
            &self,
            message: &Message,
            to: &[Arc<dyn MessageListener>],
        ) -> Result<(), MessageBusError> {
            for listener in to {
                if let Err(e) = listener.receive(message) {
                    log::error!("listener failed while receiving {}: {}", message, e);
                }
            }
            Ok(())
        }
    }

    /// Deliver to each listener in turn, stopping at the first failure.
    pub fn simple() -> Arc<dyn Sender> {
        Arc::new(Simple)
    }

    /// Deliver to every listener; failures are logged per listener and
    /// never abort the pass.
    pub fn continue_on_failure() -> Arc<dyn Sender> {
        Arc::new(ContinueOnFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::ListenerError;
    use std::sync::Mutex;

    fn recording_listener(
        tag: &'static str,
        calls: &Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    ) -> Arc<dyn MessageListener> {
        let calls = Arc::clone(calls);
        Arc::new(move |_: &Message| -> Result<(), ListenerError> {
            calls.lock().unwrap().push(tag);
            if fail {
                Err(ListenerError::new("intentional failure"))
            } else {
                Ok(())
            }
        })
    }

    #[test]
    fn simple_stops_at_first_failure() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let to = vec![
            recording_listener("a", &calls, false),
            recording_listener("b", &calls, true),
            recording_listener("c", &calls, false),
        ];

        let err = senders::simple()
            .send(&Message::for_destination("dest"), &to)
            .unwrap_err();

        assert!(matches!(err, MessageBusError::Delivery { .. }));
        assert_eq!(*calls.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn continue_on_failure_reaches_every_listener() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let to = vec![
            recording_listener("a", &calls, false),
            recording_listener("b", &calls, true),
            recording_listener("c", &calls, false),
        ];

        senders::continue_on_failure()
            .send(&Message::for_destination("dest"), &to)
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_snapshot_is_a_successful_send() {
        senders::simple()
            .send(&Message::for_destination("dest"), &[])
            .unwrap();
        senders::continue_on_failure()
            .send(&Message::for_destination("dest"), &[])
            .unwrap();
    }
}
