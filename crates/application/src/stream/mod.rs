mod hub;

pub use hub::{DEFAULT_QUEUE_CAPACITY, StreamHub, SubscriptionHandle};
