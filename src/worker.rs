//! Operational agent - receives commands over the bus and runs them

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::adapter::{OperationalAdapter, AGENT_STATUS, TASK_PROGRESS};
use crate::bus::MessageBus;
use crate::command::{Issue, OperationalCommand, OperationalResult, Outputs};
use crate::error::BridgeError;
use crate::message::{Message, SubscriptionId};

/// What an executor produced for one command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionOutcome {
    pub outputs: Outputs,
    pub metrics: Map<String, Value>,
    pub issues: Vec<Issue>,
}

/// Runs the techniques of a command
///
/// The analysis itself lives outside this crate; implementors plug it in here.
#[async_trait]
pub trait TechniqueExecutor: Send + Sync {
    async fn execute(&self, command: &OperationalCommand) -> anyhow::Result<ExecutionOutcome>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Busy,
    Terminated,
}

/// A single operational worker
pub struct OperationalAgent {
    /// Agent id commands are routed to
    pub id: String,
    adapter: OperationalAdapter,
    executor: Arc<dyn TechniqueExecutor>,
    status: RwLock<AgentStatus>,
    /// Command ids currently executing
    active: RwLock<HashSet<String>>,
    completed: AtomicU64,
    failed: AtomicU64,
    subscriptions: Mutex<Vec<SubscriptionId>>,
}

impl OperationalAgent {
    /// Create a new agent bound to `bus`
    pub fn new(bus: &MessageBus, id: impl Into<String>, executor: Arc<dyn TechniqueExecutor>) -> Self {
        let id = id.into();
        info!(agent_id = %id, "Creating operational agent");

        Self {
            adapter: bus.operational_adapter(&id),
            id,
            executor,
            status: RwLock::new(AgentStatus::Idle),
            active: RwLock::new(HashSet::new()),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Get current status
    pub fn status(&self) -> AgentStatus {
        *self.status.read()
    }

    pub fn tasks_in_progress(&self) -> usize {
        self.active.read().len()
    }

    /// Commands that finished with status `completed`
    pub fn tasks_completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Commands that failed or ran out of time
    pub fn tasks_failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn adapter(&self) -> &OperationalAdapter {
        &self.adapter
    }

    /// Payload answered to `agent_status` requests
    pub fn status_report(&self) -> Value {
        json!({
            "agent_id": self.id,
            "status": self.status(),
            "tasks_in_progress": self.tasks_in_progress(),
            "tasks_completed": self.tasks_completed(),
            "tasks_failed": self.tasks_failed(),
        })
    }

    fn begin(&self, command_id: &str) {
        let mut active = self.active.write();
        active.insert(command_id.to_string());
        let mut status = self.status.write();
        if *status != AgentStatus::Terminated {
            *status = AgentStatus::Busy;
        }
    }

    fn finish(&self, command_id: &str, succeeded: bool) {
        let mut active = self.active.write();
        active.remove(command_id);
        let counter = if succeeded { &self.completed } else { &self.failed };
        counter.fetch_add(1, Ordering::Relaxed);
        let mut status = self.status.write();
        if active.is_empty() && *status == AgentStatus::Busy {
            *status = AgentStatus::Idle;
        }
    }

    /// Execute a command and send the result to `reply_to`
    #[instrument(skip(self, command), fields(agent_id = %self.id, command_id = %command.id))]
    pub async fn run_command(&self, command: OperationalCommand, reply_to: &str) -> OperationalResult {
        self.begin(&command.id);
        self.notify_progress(&command, "started", reply_to);

        let started = Instant::now();
        let budget = Duration::from_secs(command.parameters.timeout);

        let (status, mut outcome) =
            match tokio::time::timeout(budget, self.executor.execute(&command)).await {
                Ok(Ok(outcome)) => ("completed", outcome),
                Ok(Err(e)) => {
                    warn!(error = %e, "Execution failed");
                    let issue = Issue::new("execution_error", format!("{e:#}"), "high");
                    ("failed", ExecutionOutcome { issues: vec![issue], ..Default::default() })
                }
                Err(_) => {
                    warn!(?budget, "Execution timed out");
                    let issue = Issue::new("timeout", "Execution time limit exceeded", "medium")
                        .with_details(json!({ "elapsed_time": command.parameters.timeout }));
                    ("failed", ExecutionOutcome { issues: vec![issue], ..Default::default() })
                }
            };

        outcome
            .metrics
            .entry("execution_time")
            .or_insert_with(|| json!(started.elapsed().as_secs_f64()));

        let result = OperationalResult {
            id: format!("result-{}", Uuid::new_v4()),
            task_id: command.id.clone(),
            tactical_task_id: command.tactical_task_id.clone(),
            status: status.to_string(),
            outputs: outcome.outputs,
            metrics: outcome.metrics,
            issues: outcome.issues,
        };

        self.finish(&command.id, status == "completed");
        self.notify_progress(&command, status, reply_to);

        if let Err(e) = self.adapter.publish_result(&result, reply_to) {
            warn!(error = %e, "Could not publish result");
        }
        debug!(status, "Command finished");
        result
    }

    fn notify_progress(&self, command: &OperationalCommand, state: &str, reply_to: &str) {
        let payload = json!({
            "command_id": command.id,
            "tactical_task_id": command.tactical_task_id,
            "state": state,
        });
        if let Err(e) = self.adapter.send_update(TASK_PROGRESS, payload, Some(reply_to)) {
            warn!(error = %e, "Could not send progress update");
        }
    }

    fn answer(&self, request: &Message) {
        let payload = match request.topic.as_deref() {
            Some(AGENT_STATUS) => self.status_report(),
            other => json!({ "error": "unsupported request", "request_type": other }),
        };
        if let Err(e) = self.adapter.respond(request, payload) {
            warn!(agent_id = %self.id, error = %e, "Could not answer request");
        }
    }

    /// Stop receiving commands and requests
    pub fn terminate(&self) {
        *self.status.write() = AgentStatus::Terminated;
        for id in self.subscriptions.lock().drain(..) {
            if let Err(e) = self.adapter.adapter().unsubscribe(id) {
                debug!(agent_id = %self.id, subscription = %id, error = %e, "Could not unsubscribe");
            }
        }
        info!(agent_id = %self.id, "Terminated operational agent");
    }
}

/// Handle to an operational agent for external interaction
#[derive(Clone)]
pub struct WorkerHandle {
    inner: Arc<OperationalAgent>,
}

impl WorkerHandle {
    pub fn new(agent: OperationalAgent) -> Self {
        Self {
            inner: Arc::new(agent),
        }
    }

    /// Subscribe to commands and requests addressed to this agent
    pub fn start(&self) -> Result<(), BridgeError> {
        let worker = self.clone();
        let tasks = self.inner.adapter.subscribe_to_tasks(move |message| {
            let command = match serde_json::from_value::<OperationalCommand>(message.payload) {
                Ok(command) => command,
                Err(e) => {
                    warn!(agent_id = %worker.id, message_id = %message.id, error = %e, "Discarding malformed command");
                    return;
                }
            };
            let worker = worker.clone();
            let reply_to = message.sender_id;
            tokio::spawn(async move {
                worker.run_command(command, &reply_to).await;
            });
        })?;

        let worker = self.clone();
        let requests = self
            .inner
            .adapter
            .subscribe_to_requests(move |message| worker.answer(&message))?;

        self.inner.subscriptions.lock().extend([tasks, requests]);
        info!(agent_id = %self.inner.id, "Operational agent listening");
        Ok(())
    }
}

impl std::ops::Deref for WorkerHandle {
    type Target = OperationalAgent;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
