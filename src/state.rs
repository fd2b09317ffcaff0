//! Tactical state: tasks partitioned by lifecycle status plus the dependency index

use std::collections::HashMap;

use tracing::debug;

use crate::command::ExtractRef;
use crate::error::BridgeError;
use crate::task::{Task, TaskStatus};

/// Tasks grouped by lifecycle status
#[derive(Debug, Clone, Default)]
pub struct TaskPartitions {
    pub pending: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub completed: Vec<Task>,
    pub failed: Vec<Task>,
}

impl TaskPartitions {
    fn partition(&self, status: TaskStatus) -> &Vec<Task> {
        match status {
            TaskStatus::Pending => &self.pending,
            TaskStatus::InProgress => &self.in_progress,
            TaskStatus::Completed => &self.completed,
            TaskStatus::Failed => &self.failed,
        }
    }

    fn partition_mut(&mut self, status: TaskStatus) -> &mut Vec<Task> {
        match status {
            TaskStatus::Pending => &mut self.pending,
            TaskStatus::InProgress => &mut self.in_progress,
            TaskStatus::Completed => &mut self.completed,
            TaskStatus::Failed => &mut self.failed,
        }
    }
}

/// Store of tactical tasks
///
/// Owned by a single writer (the tactical coordinator). The translation
/// layer only reads from it.
#[derive(Debug, Default)]
pub struct TacticalState {
    tasks: TaskPartitions,
    /// task id -> ids it depends on, in declaration order
    dependencies: HashMap<String, Vec<String>>,
    /// objective id -> task ids in the order they were added
    objective_tasks: HashMap<String, Vec<String>>,
    /// objective id -> text extracts relevant to it
    extracts: HashMap<String, Vec<ExtractRef>>,
}

impl TacticalState {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task to the pending partition
    ///
    /// A task id already present anywhere is replaced in place.
    pub fn add_task(&mut self, task: Task) {
        if let Some(status) = self.status_of(&task.id) {
            let slot = self
                .tasks
                .partition_mut(status)
                .iter_mut()
                .find(|t| t.id == task.id);
            if let Some(slot) = slot {
                *slot = task;
            }
            return;
        }

        if let Some(objective) = &task.objective_id {
            self.objective_tasks
                .entry(objective.clone())
                .or_default()
                .push(task.id.clone());
        }

        debug!(task_id = %task.id, "Added tactical task");
        self.tasks.pending.push(task);
    }

    /// Move a task to another partition
    pub fn set_status(&mut self, task_id: &str, status: TaskStatus) -> bool {
        let Some(current) = self.status_of(task_id) else {
            return false;
        };
        if current == status {
            return true;
        }

        let from = self.tasks.partition_mut(current);
        let Some(pos) = from.iter().position(|t| t.id == task_id) else {
            return false;
        };
        let task = from.remove(pos);
        self.tasks.partition_mut(status).push(task);

        debug!(task_id = %task_id, from = ?current, to = ?status, "Moved tactical task");
        true
    }

    /// Record that `task_id` depends on `depends_on`
    pub fn add_dependency(&mut self, task_id: &str, depends_on: &str) -> Result<(), BridgeError> {
        if task_id == depends_on {
            return Err(BridgeError::InvalidDependency(format!(
                "task {task_id} cannot depend on itself"
            )));
        }

        let deps = self.dependencies.entry(task_id.to_string()).or_default();
        if !deps.iter().any(|d| d == depends_on) {
            deps.push(depends_on.to_string());
        }
        Ok(())
    }

    /// Register a text extract for an objective
    pub fn add_extract(&mut self, objective_id: &str, extract: ExtractRef) {
        self.extracts
            .entry(objective_id.to_string())
            .or_default()
            .push(extract);
    }

    /// Tasks currently in `status`
    pub fn tasks(&self, status: TaskStatus) -> &[Task] {
        self.tasks.partition(status)
    }

    /// All partitions
    pub fn partitions(&self) -> &TaskPartitions {
        &self.tasks
    }

    /// Every task, scanning pending, in progress, completed and failed in turn
    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        TaskStatus::ALL
            .into_iter()
            .flat_map(move |status| self.tasks.partition(status).iter())
    }

    /// Look up a task by id
    pub fn get_task(&self, task_id: &str) -> Option<&Task> {
        self.all_tasks().find(|t| t.id == task_id)
    }

    /// Partition the task currently sits in
    pub fn status_of(&self, task_id: &str) -> Option<TaskStatus> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| self.tasks.partition(*status).iter().any(|t| t.id == task_id))
    }

    /// Ids `task_id` depends on, empty when unknown
    pub fn get_task_dependencies(&self, task_id: &str) -> Vec<String> {
        self.dependencies.get(task_id).cloned().unwrap_or_default()
    }

    /// Task ids of an objective in insertion order
    pub fn objective_tasks(&self, objective_id: &str) -> &[String] {
        self.objective_tasks
            .get(objective_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Extracts registered for an objective
    pub fn extracts_for(&self, objective_id: &str) -> &[ExtractRef] {
        self.extracts
            .get(objective_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Get total task count
    pub fn len(&self) -> usize {
        TaskStatus::ALL
            .iter()
            .map(|s| self.tasks.partition(*s).len())
            .sum()
    }

    /// Check if the state holds no tasks
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
