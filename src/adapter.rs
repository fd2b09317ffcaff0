//! Level adapters: bus access scoped to one agent on one hierarchy level

use std::sync::{Arc, Weak};
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::bus::{BusInner, MessageBus, SubscriptionFilter};
use crate::command::{OperationalCommand, OperationalResult, TacticalReport};
use crate::error::BridgeError;
use crate::message::{
    AgentLevel, ChannelType, Message, MessageId, MessageType, SubscriptionId,
};

/// Topic of commands sent down to operational agents
pub const OPERATIONAL_TASK: &str = "operational_task";
/// Topic of raw results sent up by operational agents
pub const OPERATIONAL_RESULT: &str = "operational_result";
/// Topic of translated reports delivered to the tactical coordinator
pub const TASK_RESULT: &str = "task_result";
pub const AGENT_STATUS: &str = "agent_status";
pub const TASK_PROGRESS: &str = "task_progress";

struct AdapterInner {
    agent_id: String,
    level: AgentLevel,
    bus: Weak<BusInner>,
}

/// Bus handle bound to one agent id and level
///
/// Obtained from [`MessageBus::get_adapter`]; clones share identity.
#[derive(Clone)]
pub struct AgentAdapter {
    inner: Arc<AdapterInner>,
}

impl AgentAdapter {
    pub(crate) fn new(agent_id: &str, level: AgentLevel, bus: Weak<BusInner>) -> Self {
        Self {
            inner: Arc::new(AdapterInner {
                agent_id: agent_id.to_string(),
                level,
                bus,
            }),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.inner.agent_id
    }

    pub fn level(&self) -> AgentLevel {
        self.inner.level
    }

    /// True when both handles came from the same `get_adapter` entry
    pub fn same_as(&self, other: &AgentAdapter) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The bus this adapter publishes to
    pub fn bus(&self) -> Result<MessageBus, BridgeError> {
        self.inner
            .bus
            .upgrade()
            .map(MessageBus::from_inner)
            .ok_or(BridgeError::BusClosed)
    }

    /// A message with this adapter as sender
    pub fn message(&self, message_type: MessageType, payload: Value) -> Message {
        Message::new(message_type, self.agent_id(), self.level(), payload)
    }

    pub fn publish(&self, message: Message) -> Result<MessageId, BridgeError> {
        self.bus()?.publish(message)
    }

    pub fn subscribe<F>(&self, filter: SubscriptionFilter, callback: F) -> Result<SubscriptionId, BridgeError>
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        Ok(self.bus()?.subscribe(filter, callback))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, BridgeError> {
        Ok(self.bus()?.unsubscribe(id))
    }

    /// Filter for hierarchical traffic addressed to this agent
    fn inbox(&self) -> SubscriptionFilter {
        SubscriptionFilter::channel(ChannelType::Hierarchical).addressed_to(self.agent_id())
    }
}

/// Tactical side: assigns work downward and queries operational agents
#[derive(Clone)]
pub struct TacticalAdapter(AgentAdapter);

impl From<AgentAdapter> for TacticalAdapter {
    fn from(adapter: AgentAdapter) -> Self {
        Self(adapter)
    }
}

impl TacticalAdapter {
    pub fn new(bus: &MessageBus, agent_id: &str) -> Self {
        bus.tactical_adapter(agent_id)
    }

    pub fn adapter(&self) -> &AgentAdapter {
        &self.0
    }

    /// Send a command to an operational agent, returns the delivery id
    pub fn assign_task(
        &self,
        command: &OperationalCommand,
        recipient_id: &str,
    ) -> Result<MessageId, BridgeError> {
        let message = self
            .0
            .message(MessageType::Command, serde_json::to_value(command)?)
            .to(recipient_id, AgentLevel::Operational)
            .with_priority(command.priority)
            .with_topic(OPERATIONAL_TASK);

        let id = self.0.publish(message)?;
        info!(
            command_id = %command.id,
            tactical_task_id = %command.tactical_task_id,
            recipient = %recipient_id,
            delivery_id = %id,
            "Assigned task"
        );
        Ok(id)
    }

    /// Ask an operational agent for information and wait for its answer
    pub async fn request_operational_info(
        &self,
        request_type: &str,
        parameters: Value,
        recipient_id: &str,
        timeout: Duration,
    ) -> Result<Value, BridgeError> {
        let message = self
            .0
            .message(
                MessageType::Request,
                json!({ "request_type": request_type, "parameters": parameters }),
            )
            .to(recipient_id, AgentLevel::Operational)
            .with_topic(request_type);

        let reply = self.0.bus()?.request(message, timeout).await?;
        debug!(request_type = %request_type, recipient = %recipient_id, "Operational info received");
        Ok(reply.payload)
    }

    /// Receive progress/status updates of the given types
    pub fn subscribe_to_operational_updates<I, S, F>(
        &self,
        update_types: I,
        callback: F,
    ) -> Result<SubscriptionId, BridgeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(Message) + Send + Sync + 'static,
    {
        let filter = self
            .0
            .inbox()
            .message_types([MessageType::Information, MessageType::Event])
            .topics(update_types);
        self.0.subscribe(filter, callback)
    }

    /// Receive raw operational results addressed to this agent
    pub fn subscribe_to_results<F>(&self, callback: F) -> Result<SubscriptionId, BridgeError>
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        let filter = self
            .0
            .inbox()
            .message_types([MessageType::Result])
            .topics([OPERATIONAL_RESULT]);
        self.0.subscribe(filter, callback)
    }

    /// Receive translated reports addressed to this agent
    pub fn subscribe_to_reports<F>(&self, callback: F) -> Result<SubscriptionId, BridgeError>
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        let filter = self
            .0
            .inbox()
            .message_types([MessageType::Result])
            .topics([TASK_RESULT]);
        self.0.subscribe(filter, callback)
    }
}

/// Operational side: receives commands and sends results upward
#[derive(Clone)]
pub struct OperationalAdapter(AgentAdapter);

impl From<AgentAdapter> for OperationalAdapter {
    fn from(adapter: AgentAdapter) -> Self {
        Self(adapter)
    }
}

impl OperationalAdapter {
    pub fn new(bus: &MessageBus, agent_id: &str) -> Self {
        bus.operational_adapter(agent_id)
    }

    pub fn adapter(&self) -> &AgentAdapter {
        &self.0
    }

    /// Deliver a tactical report to `recipient_id`
    pub fn send_result(
        &self,
        tactical_task_id: &str,
        report: &TacticalReport,
        recipient_id: &str,
    ) -> Result<(), BridgeError> {
        let report = serde_json::to_value(report)?;
        let message = self
            .0
            .message(
                MessageType::Result,
                json!({ "tactical_task_id": tactical_task_id, "report": report }),
            )
            .to(recipient_id, AgentLevel::Tactical)
            .with_topic(TASK_RESULT);

        self.0.publish(message)?;
        Ok(())
    }

    /// Send an execution result back to the agent that issued the command
    pub fn publish_result(
        &self,
        result: &OperationalResult,
        recipient_id: &str,
    ) -> Result<MessageId, BridgeError> {
        let message = self
            .0
            .message(MessageType::Result, serde_json::to_value(result)?)
            .to(recipient_id, AgentLevel::Tactical)
            .with_topic(OPERATIONAL_RESULT);
        self.0.publish(message)
    }

    /// Emit a progress or status update
    pub fn send_update(
        &self,
        update_type: &str,
        payload: Value,
        recipient_id: Option<&str>,
    ) -> Result<MessageId, BridgeError> {
        let mut message = self
            .0
            .message(MessageType::Information, payload)
            .with_topic(update_type);
        if let Some(recipient) = recipient_id {
            message = message.to(recipient, AgentLevel::Tactical);
        }
        self.0.publish(message)
    }

    /// Receive commands addressed to this agent
    pub fn subscribe_to_tasks<F>(&self, callback: F) -> Result<SubscriptionId, BridgeError>
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        let filter = self
            .0
            .inbox()
            .message_types([MessageType::Command])
            .topics([OPERATIONAL_TASK]);
        self.0.subscribe(filter, callback)
    }

    /// Receive information requests addressed to this agent
    pub fn subscribe_to_requests<F>(&self, callback: F) -> Result<SubscriptionId, BridgeError>
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        let filter = self.0.inbox().message_types([MessageType::Request]);
        self.0.subscribe(filter, callback)
    }

    /// Answer a request received through `subscribe_to_requests`
    pub fn respond(&self, request: &Message, payload: Value) -> Result<MessageId, BridgeError> {
        self.0
            .bus()?
            .reply(request, self.0.agent_id(), self.0.level(), payload)
    }
}
