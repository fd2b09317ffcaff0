//! # Echelon
//!
//! Task translation and messaging between the tactical and operational tiers
//! of a hierarchical agent system.
//!
//! The tactical tier decomposes objectives into tasks; the operational tier
//! runs concrete analysis techniques against them. This crate sits between
//! the two: it turns tasks into executable commands, moves them over a
//! priority-ordered message bus, and folds results back into tactical reports.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐      ┌─────────────────────────────────────────┐
//! │  TacticalState   │─────►│      TacticalOperationalInterface       │
//! │ tasks + deps     │ read │  ┌──────────────┐   ┌────────────────┐  │
//! └──────────────────┘      │  │TechniqueReg. │   │  AgentRouter   │  │
//!                           │  └──────────────┘   └────────────────┘  │
//!                           └───────┬───────────────────────▲─────────┘
//!                     assign_task   │                       │  send_result
//!                 ┌─────────────────▼─────┐     ┌───────────┴───────────┐
//!                 │   TacticalAdapter     │     │  OperationalAdapter   │
//!                 └─────────────────┬─────┘     └───────────▲───────────┘
//!                                   ▼                       │
//!          ┌────────────────────────────────────────────────────────────┐
//!          │                        MessageBus                          │
//!          │   per-channel priority queues · request/response · pub/sub │
//!          └───────────────┬───────────────────────────▲────────────────┘
//!                          ▼                           │
//!                 ┌───────────────────────────────────────────┐
//!                 │ OperationalAgent (informal_analyzer, ...) │
//!                 └───────────────────────────────────────────┘
//! ```
//!
//! ## Key Concepts
//!
//! - **Task**: unit of tactical work with capability tags and a priority
//! - **Command**: a task restated as techniques, extracts and parameters
//! - **Result / Report**: what an operational agent returns, and its
//!   tactical translation
//! - **Adapter**: bus access scoped to one agent on one level

pub mod adapter;
pub mod bus;
pub mod command;
pub mod config;
pub mod error;
pub mod interface;
pub mod message;
pub mod registry;
pub mod state;
pub mod task;
pub mod worker;

pub use adapter::{AgentAdapter, OperationalAdapter, TacticalAdapter};
pub use bus::{MessageBus, SubscriptionFilter};
pub use command::{
    CommandContext, Constraints, ExecutionParameters, ExtractRef, Issue, OperationalCommand,
    OperationalResult, ReportMetrics, TacticalReport, TechniqueDescriptor, WorkflowPhase,
    WorkflowPosition,
};
pub use config::{BridgeConfig, BusConfig, InterfaceConfig};
pub use error::BridgeError;
pub use interface::TacticalOperationalInterface;
pub use message::{
    AgentLevel, ChannelType, Message, MessageId, MessagePriority, MessageType, SubscriptionId,
};
pub use registry::{AgentRouter, RoutingRule, TechniqueRegistry};
pub use state::TacticalState;
pub use task::{EstimatedDuration, Task, TaskPriority, TaskStatus};
pub use worker::{OperationalAgent, TechniqueExecutor, WorkerHandle};
