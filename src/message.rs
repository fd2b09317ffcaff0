//! Message envelope and routing vocabulary shared by the bus and adapters

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Unique identifier of a message on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// Opaque handle returned by `subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Level of the hierarchy an agent lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentLevel {
    Strategic,
    Tactical,
    Operational,
    System,
}

/// Logical channel a message travels on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    /// Commands and results flowing up and down the hierarchy
    Hierarchical,
    /// Peer coordination on the same level
    Collaboration,
    /// Bulk data exchange
    Data,
    Negotiation,
    /// Bus-level control traffic
    System,
}

impl ChannelType {
    pub const ALL: [ChannelType; 5] = [
        ChannelType::Hierarchical,
        ChannelType::Collaboration,
        ChannelType::Data,
        ChannelType::Negotiation,
        ChannelType::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Hierarchical => "hierarchical",
            ChannelType::Collaboration => "collaboration",
            ChannelType::Data => "data",
            ChannelType::Negotiation => "negotiation",
            ChannelType::System => "system",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Command,
    Result,
    Information,
    Request,
    Response,
    Event,
    Control,
}

/// Delivery priority, higher values are dispatched first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagePriority {
    Low,
    Normal,
    High,
    Critical,
}

impl Default for MessagePriority {
    fn default() -> Self {
        MessagePriority::Normal
    }
}

/// A message on the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub message_type: MessageType,
    /// Content kind, e.g. `operational_task` or `task_progress`
    #[serde(default)]
    pub topic: Option<String>,
    pub sender_id: String,
    pub sender_level: AgentLevel,
    /// `None` broadcasts to every subscriber of the channel
    #[serde(default)]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub recipient_level: Option<AgentLevel>,
    pub channel: ChannelType,
    #[serde(default)]
    pub priority: MessagePriority,
    pub payload: Value,
    /// Id of the request this message answers
    #[serde(default)]
    pub correlation_id: Option<MessageId>,
}

impl Message {
    /// Create a broadcast message on the hierarchical channel
    pub fn new(
        message_type: MessageType,
        sender_id: impl Into<String>,
        sender_level: AgentLevel,
        payload: Value,
    ) -> Self {
        Self {
            id: MessageId::new(),
            message_type,
            topic: None,
            sender_id: sender_id.into(),
            sender_level,
            recipient_id: None,
            recipient_level: None,
            channel: ChannelType::Hierarchical,
            priority: MessagePriority::Normal,
            payload,
            correlation_id: None,
        }
    }

    /// Address the message to one agent
    pub fn to(mut self, recipient_id: impl Into<String>, level: AgentLevel) -> Self {
        self.recipient_id = Some(recipient_id.into());
        self.recipient_level = Some(level);
        self
    }

    pub fn on(mut self, channel: ChannelType) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Mark this message as the answer to `request`
    pub fn in_reply_to(mut self, request: MessageId) -> Self {
        self.correlation_id = Some(request);
        self
    }

    pub fn is_broadcast(&self) -> bool {
        self.recipient_id.is_none()
    }
}
