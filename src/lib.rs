mod bus;
mod error;
mod listener;
mod message;
mod message_data;
mod priority;
mod registry;
mod sender;
mod subscriptions;
mod worker;

pub use bus::MessageBus;
pub use error::MessageBusError;
pub use listener::{ListenerError, MessageListener};
pub use message::{Message, ACTION_ANY};
pub use message_data::MessageData;
pub use priority::Priority;
pub use registry::{DestinationRegistry, SubscriptionToken};
pub use sender::{senders, Sender};
pub use subscriptions::Subscriptions;
pub use worker::{DeliveryJob, DeliveryStats, DeliveryWorker};

#[cfg(feature = "macros")]
pub use messagebus_rust_macros::subscriptions;
