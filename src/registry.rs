//! Capability tables: which techniques a capability needs and which agent handles it

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::command::TechniqueDescriptor;

pub const ARGUMENT_IDENTIFICATION: &str = "argument_identification";
pub const FALLACY_DETECTION: &str = "fallacy_detection";
pub const FORMAL_LOGIC: &str = "formal_logic";
pub const TEXT_EXTRACTION: &str = "text_extraction";

pub const DEFAULT_OPERATIONAL_AGENT: &str = "default_operational_agent";

/// Maps capability tags to ordered technique lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechniqueRegistry {
    entries: HashMap<String, Vec<TechniqueDescriptor>>,
}

impl TechniqueRegistry {
    /// Create a registry with no entries
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Add or replace the technique list for a capability
    pub fn with_capability(
        mut self,
        capability: impl Into<String>,
        techniques: Vec<TechniqueDescriptor>,
    ) -> Self {
        self.entries.insert(capability.into(), techniques);
        self
    }

    /// Techniques for one capability, empty when unknown
    pub fn techniques_for(&self, capability: &str) -> &[TechniqueDescriptor] {
        self.entries
            .get(capability)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Concatenate the technique lists of `capabilities` in order
    ///
    /// Duplicates across capabilities are kept.
    pub fn resolve<S: AsRef<str>>(&self, capabilities: &[S]) -> Vec<TechniqueDescriptor> {
        capabilities
            .iter()
            .flat_map(|cap| self.techniques_for(cap.as_ref()).iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TechniqueRegistry {
    fn default() -> Self {
        Self::empty()
            .with_capability(
                ARGUMENT_IDENTIFICATION,
                vec![TechniqueDescriptor::new("premise_conclusion_extraction")],
            )
            .with_capability(
                FALLACY_DETECTION,
                vec![TechniqueDescriptor::new("fallacy_pattern_matching")],
            )
            .with_capability(
                FORMAL_LOGIC,
                vec![TechniqueDescriptor::new("propositional_logic_formalization")],
            )
    }
}

/// One routing rule: any of `capabilities` sends the task to `agent_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingRule {
    pub capabilities: Vec<String>,
    pub agent_id: String,
}

impl RoutingRule {
    pub fn new<I, S>(capabilities: I, agent_id: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            agent_id: agent_id.into(),
        }
    }

    fn matches<S: AsRef<str>>(&self, capabilities: &[S]) -> bool {
        capabilities
            .iter()
            .any(|cap| self.capabilities.iter().any(|c| c == cap.as_ref()))
    }
}

/// Ordered capability -> agent routing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRouter {
    rules: Vec<RoutingRule>,
    fallback: String,
}

impl AgentRouter {
    pub fn new(rules: Vec<RoutingRule>, fallback: impl Into<String>) -> Self {
        Self {
            rules,
            fallback: fallback.into(),
        }
    }

    /// First rule (in table order) matching any capability wins
    pub fn route<S: AsRef<str>>(&self, capabilities: &[S]) -> &str {
        self.rules
            .iter()
            .find(|rule| rule.matches(capabilities))
            .map(|rule| rule.agent_id.as_str())
            .unwrap_or(self.fallback.as_str())
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }
}

impl Default for AgentRouter {
    fn default() -> Self {
        Self::new(
            vec![
                RoutingRule::new([ARGUMENT_IDENTIFICATION, FALLACY_DETECTION], "informal_analyzer"),
                RoutingRule::new([FORMAL_LOGIC], "logic_analyzer"),
                RoutingRule::new([TEXT_EXTRACTION], "extract_processor"),
            ],
            DEFAULT_OPERATIONAL_AGENT,
        )
    }
}
