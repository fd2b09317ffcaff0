//! Bridge configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::command::{Constraints, ExecutionParameters};
use crate::error::BridgeError;
use crate::registry::{AgentRouter, TechniqueRegistry};

/// Message bus settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Messages a channel may hold before publishes are rejected
    pub channel_capacity: usize,
    /// Timeout applied by `MessageBus::request_default`
    pub default_request_timeout_ms: u64,
}

impl BusConfig {
    pub fn default_request_timeout(&self) -> Duration {
        Duration::from_millis(self.default_request_timeout_ms)
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            default_request_timeout_ms: 5_000,
        }
    }
}

/// Translation settings for the tactical/operational interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceConfig {
    /// Agent id the interface registers its adapters under
    pub agent_id: String,
    /// Where tactical reports are delivered
    pub tactical_coordinator_id: String,
    pub execution: ExecutionParameters,
    pub constraints: Constraints,
    pub techniques: TechniqueRegistry,
    pub routing: AgentRouter,
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            agent_id: "tactical_operational_interface".to_string(),
            tactical_coordinator_id: "tactical_coordinator".to_string(),
            execution: ExecutionParameters::default(),
            constraints: Constraints::default(),
            techniques: TechniqueRegistry::default(),
            routing: AgentRouter::default(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub bus: BusConfig,
    pub interface: InterfaceConfig,
}

impl BridgeConfig {
    /// Parse from a JSON document, missing sections fall back to defaults
    pub fn from_json(source: &str) -> Result<Self, BridgeError> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&source)
    }

    fn validate(&self) -> Result<(), BridgeError> {
        if self.bus.channel_capacity == 0 {
            return Err(BridgeError::Config("channel_capacity must be positive".into()));
        }
        if self.interface.agent_id.is_empty() {
            return Err(BridgeError::Config("interface agent_id is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.bus.channel_capacity, 1024);
        assert_eq!(config.bus.default_request_timeout(), Duration::from_secs(5));
        assert_eq!(config.interface.execution.timeout, 60);
        assert_eq!(config.interface.constraints.min_confidence, 0.7);
    }

    #[test]
    fn test_partial_json() {
        let config = BridgeConfig::from_json(r#"{"bus": {"channel_capacity": 8}}"#).unwrap();
        assert_eq!(config.bus.channel_capacity, 8);
        assert_eq!(config.bus.default_request_timeout_ms, 5_000);
        assert_eq!(config.interface, InterfaceConfig::default());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = assert_err!(BridgeConfig::from_json(r#"{"bus": {"channel_capacity": 0}}"#));
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"interface": {{"tactical_coordinator_id": "coordinator-7"}}}}"#
        )
        .unwrap();

        let config = assert_ok!(BridgeConfig::load(file.path()));
        assert_eq!(config.interface.tactical_coordinator_id, "coordinator-7");
        assert_eq!(config.interface.agent_id, "tactical_operational_interface");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = BridgeConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }
}
