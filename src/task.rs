//! Tactical task model

use serde::{Deserialize, Deserializer, Serialize};

/// Expected effort of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatedDuration {
    Short,
    #[default]
    Medium,
    Long,
}

/// Priority as declared by the tactical planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    /// Any label the planner emitted that is not one of the above
    #[serde(other)]
    Unspecified,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Unspecified => "unspecified",
        }
    }
}

/// Lifecycle partition a task currently sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Failed,
    ];
}

/// A unit of work produced by tactical decomposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// Objective this task contributes to, absent on malformed input
    #[serde(default)]
    pub objective_id: Option<String>,
    #[serde(default)]
    pub estimated_duration: EstimatedDuration,
    /// Capability tags in first-occurrence order, without repeats
    #[serde(default, deserialize_with = "unique_capabilities")]
    pub required_capabilities: Vec<String>,
    #[serde(default)]
    pub priority: TaskPriority,
}

impl Task {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            objective_id: None,
            estimated_duration: EstimatedDuration::default(),
            required_capabilities: Vec::new(),
            priority: TaskPriority::default(),
        }
    }

    pub fn for_objective(mut self, objective_id: impl Into<String>) -> Self {
        self.objective_id = Some(objective_id.into());
        self
    }

    /// Append capability tags, keeping first occurrence order
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        push_unique(
            &mut self.required_capabilities,
            capabilities.into_iter().map(Into::into),
        );
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_duration(mut self, duration: EstimatedDuration) -> Self {
        self.estimated_duration = duration;
        self
    }
}

fn push_unique(target: &mut Vec<String>, capabilities: impl IntoIterator<Item = String>) {
    for cap in capabilities {
        if !target.contains(&cap) {
            target.push(cap);
        }
    }
}

fn unique_capabilities<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    let mut capabilities = Vec::with_capacity(raw.len());
    push_unique(&mut capabilities, raw);
    Ok(capabilities)
}
