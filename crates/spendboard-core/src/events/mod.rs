//! In-process publish/subscribe bus.
//!
//! Data stores publish on the bus when a fetch completes; dashboard widgets
//! subscribe without holding a reference to the producing store. Delivery is
//! synchronous and only reaches handlers registered at the moment of
//! emission. There is no replay.

pub mod bus;

pub use bus::{Channel, Event, EventBus, SubscriptionId};
