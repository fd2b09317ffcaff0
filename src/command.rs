//! Records exchanged between the tactical and operational levels

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::message::MessagePriority;

/// Free-form payload passed through the bridge untouched
pub type Outputs = Map<String, Value>;

/// A named, parameterized processing step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechniqueDescriptor {
    pub name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl TechniqueDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Map::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

/// Reference to a snippet of source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractRef {
    pub id: String,
    pub source: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
}

impl ExtractRef {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            content: content.into(),
            relevance: None,
        }
    }

    pub fn with_relevance(mut self, relevance: f64) -> Self {
        self.relevance = Some(relevance);
        self
    }
}

/// How the operational agent should run a command
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionParameters {
    /// Seconds
    pub timeout: u64,
    pub max_iterations: u32,
    pub precision_target: f64,
}

impl Default for ExecutionParameters {
    fn default() -> Self {
        Self {
            timeout: 60,
            max_iterations: 5,
            precision_target: 0.8,
        }
    }
}

/// Limits the operational agent must respect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Seconds
    pub max_runtime: u64,
    pub min_confidence: f64,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            max_runtime: 60,
            min_confidence: 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Initial,
    Intermediate,
    Final,
}

/// Where a task sits among its objective's tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowPosition {
    pub phase: WorkflowPhase,
    pub is_first: bool,
    pub is_last: bool,
}

impl WorkflowPosition {
    pub fn intermediate() -> Self {
        Self {
            phase: WorkflowPhase::Intermediate,
            is_first: false,
            is_last: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandContext {
    pub position_in_workflow: WorkflowPosition,
    pub related_tasks: Vec<String>,
    /// Operational references (`op-<task id>`)
    pub dependencies: Vec<String>,
    pub constraints: Constraints,
}

/// Work order sent to the operational level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalCommand {
    pub id: String,
    pub tactical_task_id: String,
    pub description: String,
    pub objective_id: Option<String>,
    pub techniques: Vec<TechniqueDescriptor>,
    pub text_extracts: Vec<ExtractRef>,
    pub parameters: ExecutionParameters,
    pub expected_outputs: BTreeMap<String, Value>,
    pub priority: MessagePriority,
    pub context: CommandContext,
}

/// Problem reported alongside a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub description: String,
    pub severity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Issue {
    pub fn new(
        issue_type: impl Into<String>,
        description: impl Into<String>,
        severity: impl Into<String>,
    ) -> Self {
        Self {
            issue_type: issue_type.into(),
            description: description.into(),
            severity: severity.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// What an operational agent sends back after executing a command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalResult {
    pub id: String,
    pub task_id: String,
    pub tactical_task_id: String,
    pub status: String,
    #[serde(default)]
    pub outputs: Outputs,
    #[serde(default)]
    pub metrics: Map<String, Value>,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

/// Canonical metric subset the tactical level understands
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
}

/// An operational result restated in tactical vocabulary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TacticalReport {
    pub id: String,
    pub tactical_task_id: String,
    pub operational_task_id: String,
    pub status: String,
    pub outputs: Outputs,
    pub metrics: ReportMetrics,
    pub issues: Vec<Issue>,
}
