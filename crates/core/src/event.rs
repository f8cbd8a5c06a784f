//! Progress events — the observation hook of a reflection run.
//!
//! The loop publishes events as it moves through its phases. Observers (a
//! terminal progress bar, a log sink) subscribe without the loop knowing
//! about them. Events never influence control flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Unique identifier for a single reflection run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which half of a step is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Generating,
    Reflecting,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Generating => f.write_str("generating"),
            Phase::Reflecting => f.write_str("reflecting"),
        }
    }
}

/// All events emitted during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A run was accepted and is about to make its first call
    RunStarted {
        run_id: RunId,
        model: String,
        total_steps: usize,
        timestamp: DateTime<Utc>,
    },

    /// The prompt optimizer finished (possibly falling back to the input)
    PromptOptimized {
        run_id: RunId,
        changed: bool,
        timestamp: DateTime<Utc>,
    },

    /// A completion call for `phase` of `step` (1-based) is starting
    PhaseStarted {
        run_id: RunId,
        step: usize,
        total_steps: usize,
        phase: Phase,
        timestamp: DateTime<Utc>,
    },

    /// A generate/reflect pair finished
    StepCompleted {
        run_id: RunId,
        step: usize,
        generation: String,
        critique: String,
        approved: bool,
        timestamp: DateTime<Utc>,
    },

    /// The loop stopped normally
    RunFinished {
        run_id: RunId,
        steps: usize,
        approved: bool,
        timestamp: DateTime<Utc>,
    },

    /// A completion call failed and the run was aborted
    RunFailed {
        run_id: RunId,
        step: usize,
        phase: Phase,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// The run this event belongs to.
    pub fn run_id(&self) -> &RunId {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::PromptOptimized { run_id, .. }
            | Self::PhaseStarted { run_id, .. }
            | Self::StepCompleted { run_id, .. }
            | Self::RunFinished { run_id, .. }
            | Self::RunFailed { run_id, .. } => run_id,
        }
    }

    /// Whether no further events will follow for this run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RunFinished { .. } | Self::RunFailed { .. })
    }
}

/// A broadcast-based event bus for run events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
