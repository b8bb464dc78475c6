use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{error, trace};

use crate::models::{Category, Expense, Overview};

/// Named channel an event is broadcast on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    LoadingState,
    Updated,
    UpdatedCategory,
    ResponseData,
    CategoryData,
    ExpenseData,
}

impl Channel {
    pub const ALL: [Channel; 6] = [
        Channel::LoadingState,
        Channel::Updated,
        Channel::UpdatedCategory,
        Channel::ResponseData,
        Channel::CategoryData,
        Channel::ExpenseData,
    ];

    /// Wire name of the channel
    pub fn name(&self) -> &'static str {
        match self {
            Channel::LoadingState => "loading-state",
            Channel::Updated => "updated",
            Channel::UpdatedCategory => "updated-category",
            Channel::ResponseData => "responseData",
            Channel::CategoryData => "category-data",
            Channel::ExpenseData => "expense-data",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A payload tagged with the channel it travels on.
///
/// `Updated` and `UpdatedCategory` carry whatever record the producer
/// changed; the bus does not interpret it.
#[derive(Debug, Clone)]
pub enum Event {
    LoadingState(bool),
    Updated(serde_json::Value),
    UpdatedCategory(serde_json::Value),
    ResponseData(Arc<Overview>),
    CategoryData(Arc<Vec<Category>>),
    ExpenseData(Arc<Vec<Expense>>),
}

impl Event {
    pub fn channel(&self) -> Channel {
        match self {
            Event::LoadingState(_) => Channel::LoadingState,
            Event::Updated(_) => Channel::Updated,
            Event::UpdatedCategory(_) => Channel::UpdatedCategory,
            Event::ResponseData(_) => Channel::ResponseData,
            Event::CategoryData(_) => Channel::CategoryData,
            Event::ExpenseData(_) => Channel::ExpenseData,
        }
    }
}

/// Handle returned by `on`, used to deregister the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

struct Registration {
    id: SubscriptionId,
    handler: Handler,
    once: bool,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<Channel, Vec<Registration>>>,
}

/// Synchronous fan-out bus. Clones share the same registrations.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn handlers(&self) -> MutexGuard<'_, HashMap<Channel, Vec<Registration>>> {
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn register<F>(&self, channel: Channel, handler: F, once: bool) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers().entry(channel).or_default().push(Registration {
            id,
            handler: Arc::new(handler),
            once,
        });
        trace!(%channel, ?id, "Handler registered");
        id
    }

    /// Register `handler` for every subsequent emission on `channel`.
    pub fn on<F>(&self, channel: Channel, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(channel, handler, false)
    }

    /// Register `handler` for the next emission on `channel` only.
    pub fn once<F>(&self, channel: Channel, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(channel, handler, true)
    }

    /// Deregister a handler. Returns false if it was not registered.
    pub fn off(&self, channel: Channel, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers();
        let Some(list) = handlers.get_mut(&channel) else {
            return false;
        };
        let before = list.len();
        list.retain(|r| r.id != id);
        before != list.len()
    }

    /// Drop every handler on `channel`.
    pub fn clear(&self, channel: Channel) {
        self.handlers().remove(&channel);
    }

    pub fn handler_count(&self, channel: Channel) -> usize {
        self.handlers().get(&channel).map_or(0, Vec::len)
    }

    /// Deliver `event` to the handlers currently registered on its channel,
    /// in registration order. Returns how many handlers ran to completion.
    ///
    /// Handlers run outside the registry lock, so they may emit, subscribe or
    /// unsubscribe. A panicking handler is logged and skipped; the remaining
    /// handlers still run.
    pub fn emit(&self, event: Event) -> usize {
        let channel = event.channel();
        let snapshot: Vec<(SubscriptionId, Handler)> = {
            let mut handlers = self.handlers();
            let Some(list) = handlers.get_mut(&channel) else {
                trace!(%channel, "Emit with no subscribers");
                return 0;
            };
            let snapshot = list.iter().map(|r| (r.id, r.handler.clone())).collect();
            list.retain(|r| !r.once);
            snapshot
        };

        let mut delivered = 0;
        for (id, handler) in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(()) => delivered += 1,
                Err(_) => error!(%channel, ?id, "Event handler panicked"),
            }
        }
        trace!(%channel, delivered, "Event emitted");
        delivered
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers();
        let counts: HashMap<&'static str, usize> =
            handlers.iter().map(|(c, list)| (c.name(), list.len())).collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}
