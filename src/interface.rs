//! Tactical/operational interface - translates tasks into commands and
//! operational results into tactical reports

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument, trace, warn};
use uuid::Uuid;

use crate::adapter::{OperationalAdapter, TacticalAdapter, AGENT_STATUS};
use crate::bus::MessageBus;
use crate::command::{
    CommandContext, Constraints, ExecutionParameters, ExtractRef, Issue, OperationalCommand,
    OperationalResult, Outputs, ReportMetrics, TacticalReport, TechniqueDescriptor,
    WorkflowPhase, WorkflowPosition,
};
use crate::config::InterfaceConfig;
use crate::error::BridgeError;
use crate::message::{Message, MessagePriority, SubscriptionId};
use crate::state::TacticalState;
use crate::task::Task;

/// Broad intent read off a task description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskIntent {
    ArgumentIdentification,
    FallacyDetection,
    Formalization,
    Extraction,
    General,
}

impl TaskIntent {
    /// Keyword match on the description, first hit wins
    pub fn classify(description: &str) -> Self {
        let text = description.to_lowercase();
        if text.contains("fallac") || text.contains("sophism") {
            TaskIntent::FallacyDetection
        } else if text.contains("formal") || text.contains("logic") {
            TaskIntent::Formalization
        } else if text.contains("argument") || text.contains("premise") || text.contains("conclusion") {
            TaskIntent::ArgumentIdentification
        } else if text.contains("extract") || text.contains("segment") {
            TaskIntent::Extraction
        } else {
            TaskIntent::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskIntent::ArgumentIdentification => "argument_identification",
            TaskIntent::FallacyDetection => "fallacy_detection",
            TaskIntent::Formalization => "formalization",
            TaskIntent::Extraction => "extraction",
            TaskIntent::General => "general",
        }
    }
}

/// Bridge between the tactical planner and operational agents
///
/// Holds no state of its own beyond injected configuration; every command
/// and report it builds is handed to an adapter immediately.
pub struct TacticalOperationalInterface {
    state: Arc<RwLock<TacticalState>>,
    tactical_adapter: TacticalAdapter,
    operational_adapter: OperationalAdapter,
    config: InterfaceConfig,
}

impl TacticalOperationalInterface {
    /// Create an interface whose adapters are registered under `config.agent_id`
    pub fn new(
        state: Arc<RwLock<TacticalState>>,
        bus: &MessageBus,
        config: InterfaceConfig,
    ) -> Self {
        let tactical_adapter = bus.tactical_adapter(&config.agent_id);
        let operational_adapter = bus.operational_adapter(&config.agent_id);

        info!(agent_id = %config.agent_id, "Creating tactical/operational interface");

        Self {
            state,
            tactical_adapter,
            operational_adapter,
            config,
        }
    }

    pub fn config(&self) -> &InterfaceConfig {
        &self.config
    }

    pub fn tactical_adapter(&self) -> &TacticalAdapter {
        &self.tactical_adapter
    }

    pub fn operational_adapter(&self) -> &OperationalAdapter {
        &self.operational_adapter
    }

    // === Task -> Command ===

    /// Translate a task into a command and assign it to the routed agent
    #[instrument(skip(self, task), fields(task_id = %task.id))]
    pub fn translate_task_to_command(&self, task: &Task) -> Result<OperationalCommand, BridgeError> {
        let command = self.build_command(task);

        let agent_id = self.determine_appropriate_agent(&task.required_capabilities);
        let delivery_id = self.tactical_adapter.assign_task(&command, agent_id)?;

        info!(
            command_id = %command.id,
            agent_id = %agent_id,
            delivery_id = %delivery_id,
            "Translated tactical task"
        );
        Ok(command)
    }

    /// Build the command for `task` without sending it
    pub fn build_command(&self, task: &Task) -> OperationalCommand {
        OperationalCommand {
            id: format!("op-cmd-{}", Uuid::new_v4()),
            tactical_task_id: task.id.clone(),
            description: task.description.clone(),
            objective_id: task.objective_id.clone(),
            techniques: self.determine_techniques(&task.required_capabilities),
            text_extracts: self.determine_relevant_extracts(task),
            parameters: self.determine_execution_parameters(task),
            expected_outputs: self.determine_expected_outputs(task),
            priority: Self::map_priority_to_enum(task.priority.as_str()),
            context: CommandContext {
                position_in_workflow: self.determine_position_in_workflow(task),
                related_tasks: self.find_related_tasks(task),
                dependencies: self.translate_dependencies(task),
                constraints: self.determine_constraints(task),
            },
        }
    }

    /// Union of the registry's technique lists, in capability order
    pub fn determine_techniques<S: AsRef<str>>(&self, capabilities: &[S]) -> Vec<TechniqueDescriptor> {
        self.config.techniques.resolve(capabilities)
    }

    /// Extracts registered for the task's objective, or one built from the
    /// task description when there are none
    pub fn determine_relevant_extracts(&self, task: &Task) -> Vec<ExtractRef> {
        if let Some(objective) = &task.objective_id {
            let state = self.state.read();
            let known = state.extracts_for(objective);
            if !known.is_empty() {
                return known.to_vec();
            }
        }

        let source = match &task.objective_id {
            Some(objective) => format!("objective:{objective}"),
            None => "objective:unassigned".to_string(),
        };
        vec![ExtractRef::new(
            format!("extract-{}", task.id),
            source,
            task.description.clone(),
        )]
    }

    /// Execution profile; flat across priority and estimated duration
    pub fn determine_execution_parameters(&self, _task: &Task) -> ExecutionParameters {
        self.config.execution
    }

    /// Output slots the operational agent should fill
    pub fn determine_expected_outputs(&self, task: &Task) -> BTreeMap<String, Value> {
        let intent = TaskIntent::classify(&task.description);
        debug!(task_id = %task.id, intent = intent.as_str(), "Classified task intent");

        BTreeMap::from([(
            "generic_result".to_string(),
            json!({ "type": "object", "intent": intent.as_str() }),
        )])
    }

    /// Position of the task in its objective's task enumeration
    pub fn determine_position_in_workflow(&self, task: &Task) -> WorkflowPosition {
        let Some(objective) = &task.objective_id else {
            return WorkflowPosition::intermediate();
        };

        let state = self.state.read();
        let ids = state.objective_tasks(objective);
        let Some(index) = ids.iter().position(|id| *id == task.id) else {
            return WorkflowPosition::intermediate();
        };

        let is_first = index == 0;
        let is_last = index + 1 == ids.len();
        let phase = if is_first {
            WorkflowPhase::Initial
        } else if is_last {
            WorkflowPhase::Final
        } else {
            WorkflowPhase::Intermediate
        };

        WorkflowPosition {
            phase,
            is_first,
            is_last,
        }
    }

    /// Other tasks of the same objective, across every status partition
    pub fn find_related_tasks(&self, task: &Task) -> Vec<String> {
        let Some(objective) = &task.objective_id else {
            return Vec::new();
        };

        self.state
            .read()
            .all_tasks()
            .filter(|t| t.id != task.id && t.objective_id.as_ref() == Some(objective))
            .map(|t| t.id.clone())
            .collect()
    }

    /// Tactical dependency ids rewritten as operational references
    pub fn translate_dependencies(&self, task: &Task) -> Vec<String> {
        self.state
            .read()
            .get_task_dependencies(&task.id)
            .into_iter()
            .map(|dep| format!("op-{dep}"))
            .collect()
    }

    /// Runtime limits; flat across priority
    pub fn determine_constraints(&self, _task: &Task) -> Constraints {
        self.config.constraints
    }

    /// `high` -> High, `low` -> Low, anything else -> Normal
    pub fn map_priority_to_enum(priority: &str) -> MessagePriority {
        match priority {
            "high" => MessagePriority::High,
            "low" => MessagePriority::Low,
            _ => MessagePriority::Normal,
        }
    }

    /// Operational agent for a capability set, first matching rule wins
    pub fn determine_appropriate_agent<S: AsRef<str>>(&self, capabilities: &[S]) -> &str {
        self.config.routing.route(capabilities)
    }

    // === Result -> Report ===

    /// Translate a result and forward the report to the tactical coordinator
    ///
    /// `raw_result` is the payload as received; only the typed result feeds
    /// the report.
    #[instrument(skip(self, result, raw_result), fields(tactical_task_id = %result.tactical_task_id))]
    pub fn process_operational_result(
        &self,
        result: &OperationalResult,
        raw_result: &Value,
    ) -> Result<(), BridgeError> {
        trace!(raw = %raw_result, "Processing operational result");

        let report = TacticalReport {
            id: format!("report-{}", Uuid::new_v4()),
            tactical_task_id: result.tactical_task_id.clone(),
            operational_task_id: result.task_id.clone(),
            status: result.status.clone(),
            outputs: Self::translate_outputs(&result.outputs),
            metrics: Self::translate_metrics(&result.metrics),
            issues: Self::translate_issues(&result.issues),
        };

        self.operational_adapter.send_result(
            &result.tactical_task_id,
            &report,
            &self.config.tactical_coordinator_id,
        )?;

        info!(
            report_id = %report.id,
            status = %report.status,
            issues = report.issues.len(),
            "Forwarded tactical report"
        );
        Ok(())
    }

    /// Outputs pass through unchanged
    pub fn translate_outputs(outputs: &Outputs) -> Outputs {
        outputs.clone()
    }

    /// Keep `execution_time` and `confidence` under their tactical names
    pub fn translate_metrics(metrics: &Map<String, Value>) -> ReportMetrics {
        ReportMetrics {
            processing_time: metrics.get("execution_time").and_then(Value::as_f64),
            confidence_score: metrics.get("confidence").and_then(Value::as_f64),
        }
    }

    /// Retype issues into the tactical taxonomy, unknown types pass through
    pub fn translate_issues(issues: &[Issue]) -> Vec<Issue> {
        issues
            .iter()
            .map(|issue| {
                let issue_type = match issue.issue_type.as_str() {
                    "execution_error" => "task_failure",
                    "timeout" => "task_timeout",
                    other => other,
                };
                Issue {
                    issue_type: issue_type.to_string(),
                    ..issue.clone()
                }
            })
            .collect()
    }

    // === Monitoring ===

    /// Subscribe to operational updates through the tactical adapter
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
        self.tactical_adapter
            .subscribe_to_operational_updates(update_types, callback)
    }

    /// Ask an operational agent for its status
    pub async fn request_operational_status(
        &self,
        agent_id: &str,
        timeout: Duration,
    ) -> Result<Value, BridgeError> {
        self.tactical_adapter
            .request_operational_info(AGENT_STATUS, json!({ "agent_id": agent_id }), agent_id, timeout)
            .await
    }

    /// `request_operational_status` bounded by the bus's default request timeout
    pub async fn poll_agent_status(&self, agent_id: &str) -> Result<Value, BridgeError> {
        let timeout = self
            .tactical_adapter
            .adapter()
            .bus()?
            .config()
            .default_request_timeout();
        self.request_operational_status(agent_id, timeout).await
    }

    /// Process every operational result addressed to this interface
    pub fn listen_for_results(self: &Arc<Self>) -> Result<SubscriptionId, BridgeError> {
        let interface = Arc::clone(self);
        self.tactical_adapter.subscribe_to_results(move |message| {
            match serde_json::from_value::<OperationalResult>(message.payload.clone()) {
                Ok(result) => {
                    if let Err(e) = interface.process_operational_result(&result, &message.payload) {
                        warn!(message_id = %message.id, error = %e, "Failed to forward report");
                    }
                }
                Err(e) => {
                    warn!(message_id = %message.id, error = %e, "Discarding malformed operational result");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{OPERATIONAL_TASK, TASK_RESULT};
    use crate::config::BusConfig;
    use crate::message::{ChannelType, MessageType};
    use crate::registry::{RoutingRule, TechniqueRegistry, AgentRouter};
    use crate::task::{EstimatedDuration, TaskPriority, TaskStatus};
    use tokio::sync::mpsc;

    fn sample_state() -> TacticalState {
        let mut state = TacticalState::new();
        state.add_task(
            Task::new("task-1", "Extract text segments containing potential arguments")
                .for_objective("obj-1")
                .with_duration(EstimatedDuration::Short)
                .with_capabilities(["text_extraction"])
                .with_priority(TaskPriority::High),
        );
        state.add_task(
            Task::new("task-2", "Identify explicit premises and conclusions")
                .for_objective("obj-1")
                .with_capabilities(["argument_identification"])
                .with_priority(TaskPriority::High),
        );
        state.add_task(
            Task::new("task-3", "Analyse arguments for formal fallacies")
                .for_objective("obj-2")
                .with_capabilities(["fallacy_detection", "formal_logic"]),
        );
        state.set_status("task-2", TaskStatus::InProgress);
        state.set_status("task-3", TaskStatus::Completed);
        state.add_dependency("task-1", "task-3").unwrap();
        state
    }

    fn interface_on(bus: &MessageBus) -> TacticalOperationalInterface {
        TacticalOperationalInterface::new(
            Arc::new(RwLock::new(sample_state())),
            bus,
            InterfaceConfig::default(),
        )
    }

    fn interface() -> TacticalOperationalInterface {
        interface_on(&MessageBus::default())
    }

    fn names(techniques: &[TechniqueDescriptor]) -> Vec<&str> {
        techniques.iter().map(|t| t.name.as_str()).collect()
    }

    fn sample_result(issues: Vec<Issue>) -> OperationalResult {
        let mut outputs = Map::new();
        outputs.insert(
            "identified_arguments".into(),
            json!([{ "id": "arg-1", "premises": ["P1", "P2"], "conclusion": "C", "confidence": 0.8 }]),
        );
        let mut metrics = Map::new();
        metrics.insert("execution_time".into(), json!(2.5));
        metrics.insert("confidence".into(), json!(0.8));
        metrics.insert("coverage".into(), json!(0.9));
        metrics.insert("resource_usage".into(), json!(0.6));

        OperationalResult {
            id: "op-task-1".into(),
            task_id: "task-1".into(),
            tactical_task_id: "task-1".into(),
            status: "completed".into(),
            outputs,
            metrics,
            issues,
        }
    }

    // === Translation Tests ===

    #[test]
    fn test_translate_task_populates_command() {
        let bus = MessageBus::default();
        let interface = interface_on(&bus);
        let task = sample_state().get_task("task-1").cloned().unwrap();

        let command = interface.translate_task_to_command(&task).unwrap();

        assert_eq!(command.tactical_task_id, "task-1");
        assert_eq!(command.objective_id.as_deref(), Some("obj-1"));
        assert_eq!(command.description, task.description);
        assert!(command.techniques.is_empty());
        assert!(!command.text_extracts.is_empty());
        assert_eq!(command.priority, MessagePriority::High);
        assert_eq!(command.context.related_tasks, vec!["task-2"]);
        assert_eq!(command.context.dependencies, vec!["op-task-3"]);
        assert!(command.expected_outputs.contains_key("generic_result"));
        // One assignment queued for the extract processor
        assert_eq!(bus.queued(ChannelType::Hierarchical), 1);
    }

    #[test]
    fn test_command_ids_are_fresh() {
        let interface = interface();
        let task = Task::new("task-9", "x");
        assert_ne!(interface.build_command(&task).id, interface.build_command(&task).id);
    }

    #[tokio::test]
    async fn test_assignment_routed_to_capability_agent() {
        let bus = MessageBus::default();
        let interface = interface_on(&bus);
        let worker = bus.operational_adapter("informal_analyzer");

        let (tx, mut rx) = mpsc::unbounded_channel();
        worker
            .subscribe_to_tasks(move |m| {
                let _ = tx.send(m);
            })
            .unwrap();

        let task = Task::new("task-2", "Identify premises")
            .for_objective("obj-1")
            .with_capabilities(["argument_identification", "fallacy_detection"]);
        let command = interface.translate_task_to_command(&task).unwrap();

        let message = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.message_type, MessageType::Command);
        assert_eq!(message.topic.as_deref(), Some(OPERATIONAL_TASK));
        assert_eq!(message.payload["id"], command.id.as_str());
        assert_eq!(message.sender_id, "tactical_operational_interface");
    }

    #[test]
    fn test_translate_surfaces_backpressure() {
        let bus = MessageBus::new(BusConfig {
            channel_capacity: 1,
            ..Default::default()
        });
        let interface = interface_on(&bus);
        let task = Task::new("task-1", "x");

        interface.translate_task_to_command(&task).unwrap();
        let err = interface.translate_task_to_command(&task).unwrap_err();
        assert!(matches!(err, BridgeError::Backpressure { .. }));
    }

    #[test]
    fn test_determine_techniques() {
        let interface = interface();

        let result = interface.determine_techniques(&["argument_identification"]);
        assert_eq!(result[0].name, "premise_conclusion_extraction");

        let result = interface.determine_techniques(&["fallacy_detection"]);
        assert_eq!(result[0].name, "fallacy_pattern_matching");

        let result = interface.determine_techniques(&["formal_logic"]);
        assert_eq!(result[0].name, "propositional_logic_formalization");

        let result = interface.determine_techniques(&["argument_identification", "fallacy_detection"]);
        let got = names(&result);
        assert!(got.contains(&"premise_conclusion_extraction"));
        assert!(got.contains(&"fallacy_pattern_matching"));

        assert!(interface.determine_techniques(&["argument_visualization"]).is_empty());
    }

    #[test]
    fn test_substituted_tables() {
        let config = InterfaceConfig {
            techniques: TechniqueRegistry::empty()
                .with_capability("summarization", vec![TechniqueDescriptor::new("condense")]),
            routing: AgentRouter::new(vec![RoutingRule::new(["summarization"], "summarizer")], "fallback"),
            ..Default::default()
        };
        let interface = TacticalOperationalInterface::new(
            Arc::new(RwLock::new(TacticalState::new())),
            &MessageBus::default(),
            config,
        );

        assert_eq!(names(&interface.determine_techniques(&["summarization"])), vec!["condense"]);
        assert!(interface.determine_techniques(&["argument_identification"]).is_empty());
        assert_eq!(interface.determine_appropriate_agent(&["summarization"]), "summarizer");
        assert_eq!(interface.determine_appropriate_agent(&["formal_logic"]), "fallback");
    }

    #[test]
    fn test_determine_relevant_extracts() {
        let state = Arc::new(RwLock::new(sample_state()));
        let interface =
            TacticalOperationalInterface::new(state.clone(), &MessageBus::default(), InterfaceConfig::default());

        let task = Task::new("task-5", "Extract argument segments").for_objective("obj-1");
        let extracts = interface.determine_relevant_extracts(&task);
        assert_eq!(extracts.len(), 1);
        assert_eq!(extracts[0].source, "objective:obj-1");
        assert_eq!(extracts[0].content, "Extract argument segments");
        assert!(extracts[0].relevance.is_none());

        state.write().add_extract(
            "obj-1",
            ExtractRef::new("e-1", "debate.txt", "Therefore, taxes must rise.").with_relevance(0.9),
        );
        let extracts = interface.determine_relevant_extracts(&task);
        assert_eq!(extracts[0].id, "e-1");

        let orphan = Task::new("task-6", "");
        assert_eq!(interface.determine_relevant_extracts(&orphan).len(), 1);
    }

    #[test]
    fn test_execution_parameters_are_flat() {
        let interface = interface();
        for (duration, priority) in [
            (EstimatedDuration::Short, TaskPriority::High),
            (EstimatedDuration::Medium, TaskPriority::Medium),
            (EstimatedDuration::Long, TaskPriority::Low),
        ] {
            let task = Task::new("t", "").with_duration(duration).with_priority(priority);
            let params = interface.determine_execution_parameters(&task);
            assert_eq!(params.timeout, 60);
            assert_eq!(params.precision_target, 0.8);
        }
    }

    #[test]
    fn test_constraints_are_flat() {
        let interface = interface();
        for priority in [TaskPriority::High, TaskPriority::Medium, TaskPriority::Low] {
            let constraints = interface.determine_constraints(&Task::new("t", "").with_priority(priority));
            assert_eq!(constraints.max_runtime, 60);
            assert_eq!(constraints.min_confidence, 0.7);
        }
    }

    #[test]
    fn test_expected_outputs_collapse_to_generic_slot() {
        let interface = interface();
        for description in ["Identify the arguments in the text", "Run a general analysis"] {
            let outputs = interface.determine_expected_outputs(&Task::new("t", description));
            assert_eq!(outputs.len(), 1);
            assert!(outputs.contains_key("generic_result"));
        }
    }

    #[test]
    fn test_intent_classification() {
        assert_eq!(TaskIntent::classify("Detect fallacies"), TaskIntent::FallacyDetection);
        assert_eq!(TaskIntent::classify("Formalize in propositional logic"), TaskIntent::Formalization);
        assert_eq!(TaskIntent::classify("Identify premises"), TaskIntent::ArgumentIdentification);
        assert_eq!(TaskIntent::classify("Extract segments"), TaskIntent::Extraction);
        assert_eq!(TaskIntent::classify("Summarize"), TaskIntent::General);
    }

    #[test]
    fn test_position_in_workflow() {
        let interface = interface();

        let unknown = interface.determine_position_in_workflow(&Task::new("task-obj-1", ""));
        assert_eq!(unknown.phase, WorkflowPhase::Intermediate);
        assert!(!unknown.is_first);

        let first = interface.determine_position_in_workflow(&Task::new("task-1", "").for_objective("obj-1"));
        assert_eq!(first.phase, WorkflowPhase::Initial);
        assert!(first.is_first);
        assert!(!first.is_last);

        let last = interface.determine_position_in_workflow(&Task::new("task-2", "").for_objective("obj-1"));
        assert_eq!(last.phase, WorkflowPhase::Final);
        assert!(last.is_last);

        let only = interface.determine_position_in_workflow(&Task::new("task-3", "").for_objective("obj-2"));
        assert!(only.is_first && only.is_last);
    }

    #[test]
    fn test_position_middle_of_objective() {
        let mut state = TacticalState::new();
        for id in ["a", "b", "c"] {
            state.add_task(Task::new(id, "").for_objective("obj"));
        }
        let interface = TacticalOperationalInterface::new(
            Arc::new(RwLock::new(state)),
            &MessageBus::default(),
            InterfaceConfig::default(),
        );

        let middle = interface.determine_position_in_workflow(&Task::new("b", "").for_objective("obj"));
        assert_eq!(middle, WorkflowPosition::intermediate());
    }

    #[test]
    fn test_find_related_tasks() {
        let interface = interface();

        let related = interface.find_related_tasks(&Task::new("task-1", "").for_objective("obj-1"));
        assert!(related.contains(&"task-2".to_string()));
        assert!(!related.contains(&"task-1".to_string()));
        assert!(!related.contains(&"task-3".to_string()));

        assert!(interface.find_related_tasks(&Task::new("task-4", "")).is_empty());
    }

    #[test]
    fn test_translate_dependencies() {
        let interface = interface();
        assert_eq!(interface.translate_dependencies(&Task::new("task-1", "")), vec!["op-task-3"]);
        assert!(interface.translate_dependencies(&Task::new("task-2", "")).is_empty());
    }

    #[test]
    fn test_map_priority_to_enum() {
        type I = TacticalOperationalInterface;
        assert_eq!(I::map_priority_to_enum("high"), MessagePriority::High);
        assert_eq!(I::map_priority_to_enum("medium"), MessagePriority::Normal);
        assert_eq!(I::map_priority_to_enum("low"), MessagePriority::Low);
        assert_eq!(I::map_priority_to_enum("anything-else"), MessagePriority::Normal);
        assert_eq!(I::map_priority_to_enum(""), MessagePriority::Normal);
    }

    #[test]
    fn test_determine_appropriate_agent() {
        let interface = interface();
        assert_eq!(interface.determine_appropriate_agent(&["argument_identification"]), "informal_analyzer");
        assert_eq!(interface.determine_appropriate_agent(&["formal_logic"]), "logic_analyzer");
        assert_eq!(interface.determine_appropriate_agent(&["text_extraction"]), "extract_processor");
        assert_eq!(
            interface.determine_appropriate_agent(&["argument_visualization"]),
            "default_operational_agent"
        );
        assert_eq!(
            interface.determine_appropriate_agent(&["argument_identification", "fallacy_detection"]),
            "informal_analyzer"
        );
        assert_eq!(
            interface.determine_appropriate_agent(&["unknown_capability"]),
            "default_operational_agent"
        );
    }

    // === Result Tests ===

    #[test]
    fn test_translate_outputs_is_identity() {
        let outputs = sample_result(Vec::new()).outputs;
        assert_eq!(TacticalOperationalInterface::translate_outputs(&outputs), outputs);
        assert!(TacticalOperationalInterface::translate_outputs(&Map::new()).is_empty());
    }

    #[test]
    fn test_translate_metrics() {
        let metrics = sample_result(Vec::new()).metrics;
        let translated = TacticalOperationalInterface::translate_metrics(&metrics);
        assert_eq!(translated.processing_time, Some(2.5));
        assert_eq!(translated.confidence_score, Some(0.8));

        let empty = TacticalOperationalInterface::translate_metrics(&Map::new());
        assert_eq!(empty, ReportMetrics::default());
    }

    #[test]
    fn test_translate_issues() {
        let issues = vec![
            Issue::new("execution_error", "boom", "high").with_details(json!({ "error_code": 500 })),
            Issue::new("timeout", "too slow", "medium").with_details(json!({ "elapsed_time": 60 })),
            Issue::new("low_confidence", "weak", "low"),
            Issue::new("custom_issue", "custom", "medium"),
        ];

        let result = TacticalOperationalInterface::translate_issues(&issues);

        let types: Vec<_> = result.iter().map(|i| i.issue_type.as_str()).collect();
        assert_eq!(types, vec!["task_failure", "task_timeout", "low_confidence", "custom_issue"]);
        assert_eq!(result[0].details, Some(json!({ "error_code": 500 })));
        assert_eq!(result[1].severity, "medium");
        assert_eq!(result[3].description, "custom");
    }

    #[tokio::test]
    async fn test_process_operational_result_sends_one_report() {
        let bus = MessageBus::default();
        let interface = interface_on(&bus);
        let coordinator = bus.tactical_adapter("tactical_coordinator");

        let (tx, mut rx) = mpsc::unbounded_channel();
        coordinator
            .subscribe_to_reports(move |m| {
                let _ = tx.send(m);
            })
            .unwrap();

        for issues in [
            vec![Issue::new("low_confidence", "weak", "medium")],
            Vec::new(),
        ] {
            let result = sample_result(issues);
            let raw = serde_json::to_value(&result).unwrap();
            interface.process_operational_result(&result, &raw).unwrap();

            let message = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(message.topic.as_deref(), Some(TASK_RESULT));
            let report: TacticalReport =
                serde_json::from_value(message.payload["report"].clone()).unwrap();
            assert_eq!(report.tactical_task_id, "task-1");
            assert_eq!(report.outputs, result.outputs);
            assert_eq!(report.metrics.processing_time, Some(2.5));
            assert_eq!(report.issues.len(), result.issues.len());
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscribe_to_operational_updates() {
        let bus = MessageBus::default();
        let interface = interface_on(&bus);
        let worker = bus.operational_adapter("informal_analyzer");

        let (tx, mut rx) = mpsc::unbounded_channel();
        interface
            .subscribe_to_operational_updates(["task_progress", "resource_usage"], move |m| {
                let _ = tx.send(m);
            })
            .unwrap();

        worker
            .send_update("resource_usage", json!({ "cpu": 0.4 }), Some("tactical_operational_interface"))
            .unwrap();

        let update = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(update.payload["cpu"], 0.4);
    }

    #[tokio::test]
    async fn test_request_operational_status() {
        let bus = MessageBus::default();
        let interface = interface_on(&bus);
        let worker = bus.operational_adapter("operational_agent");

        let responder = worker.clone();
        worker
            .subscribe_to_requests(move |request| {
                assert_eq!(request.payload["request_type"], AGENT_STATUS);
                assert_eq!(request.payload["parameters"]["agent_id"], "operational_agent");
                responder
                    .respond(&request, json!({ "status": "ok", "tasks_in_progress": 2 }))
                    .unwrap();
            })
            .unwrap();

        let status = interface
            .request_operational_status("operational_agent", Duration::from_secs_f64(5.0))
            .await
            .unwrap();
        assert_eq!(status, json!({ "status": "ok", "tasks_in_progress": 2 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_operational_status_times_out() {
        let bus = MessageBus::default();
        let interface = interface_on(&bus);

        let err = interface
            .request_operational_status("silent_agent", Duration::from_secs_f64(5.0))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Timeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_agent_status_uses_bus_default_timeout() {
        let bus = MessageBus::new(BusConfig {
            default_request_timeout_ms: 250,
            ..Default::default()
        });
        let interface = interface_on(&bus);

        let err = interface.poll_agent_status("silent_agent").await.unwrap_err();
        match err {
            BridgeError::Timeout { timeout, .. } => {
                assert_eq!(timeout, Duration::from_millis(250));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(bus.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_listen_for_results() {
        let bus = MessageBus::default();
        let interface = Arc::new(interface_on(&bus));
        interface.listen_for_results().unwrap();

        let coordinator = bus.tactical_adapter("tactical_coordinator");
        let (tx, mut rx) = mpsc::unbounded_channel();
        coordinator
            .subscribe_to_reports(move |m| {
                let _ = tx.send(m);
            })
            .unwrap();

        let worker = bus.operational_adapter("informal_analyzer");
        let result = sample_result(vec![Issue::new("execution_error", "boom", "high")]);
        worker
            .publish_result(&result, "tactical_operational_interface")
            .unwrap();

        let message = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let report: TacticalReport = serde_json::from_value(message.payload["report"].clone()).unwrap();
        assert_eq!(report.issues[0].issue_type, "task_failure");
    }
}
