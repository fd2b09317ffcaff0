//! Message bus for inter-level communication
//!
//! Every channel owns a bounded priority queue drained by a single dispatcher
//! task. Each subscription gets its own delivery queue and worker task, so a
//! slow callback holds up neither the publisher nor other subscribers.
//!
//! ```text
//!  publish ──► [channel heap] ──► dispatcher ──┬──► sub A queue ──► callback A
//!                                              └──► sub B queue ──► callback B
//!
//!  request ──► pending[id] ◄── reply (correlation_id = id)
//! ```

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{self, AtomicBool, AtomicU64};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Notify};
use tracing::{debug, instrument, trace, warn};

use crate::adapter::{AgentAdapter, OperationalAdapter, TacticalAdapter};
use crate::config::BusConfig;
use crate::error::BridgeError;
use crate::message::{
    AgentLevel, ChannelType, Message, MessageId, MessageType, SubscriptionId,
};

/// Subscriber callback
pub type Callback = Arc<dyn Fn(Message) + Send + Sync>;

/// Which messages a subscription receives
///
/// Empty type and topic lists match everything on the channel. A recipient
/// filter still lets broadcasts through.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionFilter {
    pub channel: ChannelType,
    pub message_types: Vec<MessageType>,
    pub topics: Vec<String>,
    pub recipient_id: Option<String>,
}

impl SubscriptionFilter {
    pub fn channel(channel: ChannelType) -> Self {
        Self {
            channel,
            message_types: Vec::new(),
            topics: Vec::new(),
            recipient_id: None,
        }
    }

    pub fn message_types(mut self, types: impl IntoIterator<Item = MessageType>) -> Self {
        self.message_types = types.into_iter().collect();
        self
    }

    pub fn topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    pub fn addressed_to(mut self, recipient_id: impl Into<String>) -> Self {
        self.recipient_id = Some(recipient_id.into());
        self
    }

    pub fn matches(&self, message: &Message) -> bool {
        if message.channel != self.channel {
            return false;
        }
        if !self.message_types.is_empty() && !self.message_types.contains(&message.message_type) {
            return false;
        }
        if !self.topics.is_empty() {
            match &message.topic {
                Some(topic) if self.topics.contains(topic) => {}
                _ => return false,
            }
        }
        match (&self.recipient_id, &message.recipient_id) {
            (Some(wanted), Some(actual)) => wanted == actual,
            _ => true,
        }
    }
}

struct Subscriber {
    filter: SubscriptionFilter,
    tx: mpsc::UnboundedSender<Message>,
}

/// Heap entry: higher priority first, then publish order
struct QueuedMessage {
    seq: u64,
    message: Message,
}

impl PartialEq for QueuedMessage {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedMessage {}

impl PartialOrd for QueuedMessage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedMessage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.message
            .priority
            .cmp(&other.message.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct ChannelQueue {
    heap: Mutex<BinaryHeap<QueuedMessage>>,
    notify: Notify,
    dispatching: AtomicBool,
    closed: AtomicBool,
}

pub(crate) struct BusInner {
    config: BusConfig,
    sequence: AtomicU64,
    queues: HashMap<ChannelType, Arc<ChannelQueue>>,
    subscribers: RwLock<HashMap<SubscriptionId, Subscriber>>,
    /// Open requests waiting for a correlated response
    pending: Mutex<HashMap<MessageId, oneshot::Sender<Message>>>,
    adapters: Mutex<HashMap<(String, AgentLevel), AgentAdapter>>,
}

impl BusInner {
    fn queue(&self, channel: ChannelType) -> &Arc<ChannelQueue> {
        // Every ChannelType gets a queue at construction.
        &self.queues[&channel]
    }

    fn deliver(&self, message: Message) {
        let subscribers = self.subscribers.read();
        let mut delivered = 0usize;

        for (id, sub) in subscribers.iter() {
            if !sub.filter.matches(&message) {
                continue;
            }
            if sub.tx.send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                debug!(subscription = %id, "Subscription worker gone");
            }
        }

        debug!(
            message_id = %message.id,
            channel = %message.channel,
            delivered,
            "Dispatched message"
        );
    }
}

impl Drop for BusInner {
    fn drop(&mut self) {
        for queue in self.queues.values() {
            queue.closed.store(true, atomic::Ordering::Release);
            queue.notify.notify_one();
        }
    }
}

/// Removes a request's correlation entry on every exit path, cancellation included
struct PendingGuard<'a> {
    bus: &'a BusInner,
    message_id: MessageId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.bus.pending.lock().remove(&self.message_id).is_some() {
            trace!(message_id = %self.message_id, "Dropped correlation entry");
        }
    }
}

async fn dispatch_loop(bus: Weak<BusInner>, channel: ChannelType, queue: Arc<ChannelQueue>) {
    debug!(channel = %channel, "Dispatcher started");

    loop {
        let next = queue.heap.lock().pop();
        match next {
            Some(queued) => {
                let Some(inner) = bus.upgrade() else {
                    break;
                };
                inner.deliver(queued.message);
            }
            None => {
                if queue.closed.load(atomic::Ordering::Acquire) {
                    break;
                }
                queue.notify.notified().await;
            }
        }
    }

    debug!(channel = %channel, "Dispatcher stopped");
}

/// Channel-based publish/subscribe bus with request/response correlation
///
/// Cheap to clone; all clones share the same queues and subscriptions.
/// `subscribe` and `request` must run inside a Tokio runtime.
#[derive(Clone)]
pub struct MessageBus {
    inner: Arc<BusInner>,
}

impl MessageBus {
    /// Create a bus with the given configuration
    pub fn new(config: BusConfig) -> Self {
        let queues = ChannelType::ALL
            .into_iter()
            .map(|channel| (channel, Arc::new(ChannelQueue::default())))
            .collect();

        Self {
            inner: Arc::new(BusInner {
                config,
                sequence: AtomicU64::new(0),
                queues,
                subscribers: RwLock::new(HashMap::new()),
                pending: Mutex::new(HashMap::new()),
                adapters: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<BusInner>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Enqueue a message for every subscriber of its channel
    ///
    /// A response whose correlation id matches an open request completes that
    /// request instead of being queued. Fails with `Backpressure` when the
    /// channel already holds `channel_capacity` undelivered messages.
    pub fn publish(&self, message: Message) -> Result<MessageId, BridgeError> {
        let id = message.id;

        if message.message_type == MessageType::Response {
            if let Some(correlation_id) = message.correlation_id {
                let waiter = self.inner.pending.lock().remove(&correlation_id);
                if let Some(waiter) = waiter {
                    debug!(message_id = %id, request_id = %correlation_id, "Completing request");
                    if waiter.send(message).is_err() {
                        debug!(request_id = %correlation_id, "Requester went away");
                    }
                    return Ok(id);
                }
            }
        }

        let channel = message.channel;
        let capacity = self.inner.config.channel_capacity;
        let queue = self.inner.queue(channel);
        {
            let mut heap = queue.heap.lock();
            if heap.len() >= capacity {
                warn!(message_id = %id, channel = %channel, capacity, "Channel full, rejecting message");
                return Err(BridgeError::Backpressure { channel, capacity });
            }
            let seq = self.inner.sequence.fetch_add(1, atomic::Ordering::Relaxed);
            heap.push(QueuedMessage { seq, message });
        }
        queue.notify.notify_one();

        debug!(message_id = %id, channel = %channel, "Published message");
        Ok(id)
    }

    /// Register `callback` for every future message matching `filter`
    pub fn subscribe<F>(&self, filter: SubscriptionFilter, callback: F) -> SubscriptionId
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        let channel = filter.channel;
        let callback: Callback = Arc::new(callback);
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                callback(message);
            }
        });

        self.inner
            .subscribers
            .write()
            .insert(id, Subscriber { filter, tx });
        self.ensure_dispatcher(channel);

        debug!(subscription = %id, channel = %channel, "Subscribed");
        id
    }

    /// Drop a subscription, returns false when the id is unknown
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.inner.subscribers.write().remove(&id).is_some();
        if removed {
            debug!(subscription = %id, "Unsubscribed");
        }
        removed
    }

    fn ensure_dispatcher(&self, channel: ChannelType) {
        let queue = self.inner.queue(channel);
        if queue.dispatching.swap(true, atomic::Ordering::AcqRel) {
            return;
        }
        tokio::spawn(dispatch_loop(
            Arc::downgrade(&self.inner),
            channel,
            Arc::clone(queue),
        ));
    }

    /// Publish `message` and wait for the response carrying its id
    ///
    /// The correlation entry is removed whether the call succeeds, fails to
    /// publish, times out or is dropped by the caller.
    #[instrument(skip(self, message), fields(message_id = %message.id))]
    pub async fn request(&self, message: Message, timeout: Duration) -> Result<Message, BridgeError> {
        let message_id = message.id;
        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().insert(message_id, tx);
        let _pending = PendingGuard {
            bus: &self.inner,
            message_id,
        };

        self.publish(message)?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(BridgeError::ChannelClosed),
            Err(_) => {
                warn!(message_id = %message_id, ?timeout, "Request timed out");
                Err(BridgeError::Timeout { message_id, timeout })
            }
        }
    }

    /// `request` with the configured default timeout
    pub async fn request_default(&self, message: Message) -> Result<Message, BridgeError> {
        let timeout = self.inner.config.default_request_timeout();
        self.request(message, timeout).await
    }

    /// Answer `request` on behalf of `sender_id`
    pub fn reply(
        &self,
        request: &Message,
        sender_id: impl Into<String>,
        sender_level: AgentLevel,
        payload: Value,
    ) -> Result<MessageId, BridgeError> {
        let mut response = Message::new(MessageType::Response, sender_id, sender_level, payload)
            .to(request.sender_id.clone(), request.sender_level)
            .on(request.channel)
            .with_priority(request.priority)
            .in_reply_to(request.id);
        response.topic = request.topic.clone();
        self.publish(response)
    }

    /// Adapter scoped to one agent and level
    ///
    /// Repeated calls with the same arguments return the same adapter.
    pub fn get_adapter(&self, agent_id: &str, level: AgentLevel) -> AgentAdapter {
        self.inner
            .adapters
            .lock()
            .entry((agent_id.to_string(), level))
            .or_insert_with(|| {
                debug!(agent_id = %agent_id, ?level, "Creating adapter");
                AgentAdapter::new(agent_id, level, Arc::downgrade(&self.inner))
            })
            .clone()
    }

    pub fn tactical_adapter(&self, agent_id: &str) -> TacticalAdapter {
        TacticalAdapter::from(self.get_adapter(agent_id, AgentLevel::Tactical))
    }

    pub fn operational_adapter(&self, agent_id: &str) -> OperationalAdapter {
        OperationalAdapter::from(self.get_adapter(agent_id, AgentLevel::Operational))
    }

    /// Requests still waiting for a reply
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Undelivered messages on a channel
    pub fn queued(&self, channel: ChannelType) -> usize {
        self.inner.queue(channel).heap.lock().len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}
