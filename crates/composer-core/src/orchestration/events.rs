//! Build progress events
//!
//! Purely informational; a build behaves the same whether or not anyone
//! listens.

use crossbeam_channel::{Sender, TrySendError};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    /// Plan accepted, project about to be created
    PlanAccepted {
        project_name: String,
        components: Vec<String>,
    },

    ComponentStarted {
        component: String,
    },

    /// A new attempt at a component (build-global iteration)
    AttemptStarted {
        component: String,
        iteration: u32,
    },

    SecurityRejected {
        component: String,
        issues: Vec<String>,
    },

    ArtifactPersisted {
        component: String,
        iteration: u32,
        path: PathBuf,
    },

    TestsFailed {
        component: String,
        iteration: u32,
        error: String,
    },

    ComponentCompleted {
        component: String,
    },

    /// Terminal event, carries the final status string
    BuildFinished {
        status: String,
    },
}

/// Optional sender side of a progress channel
///
/// Sends never block: when a bounded channel is full the event is dropped, and
/// a disconnected receiver is ignored. A listener that falls behind loses
/// progress updates rather than stalling the build.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<Sender<BuildEvent>>,
}

impl EventSink {
    pub fn new(tx: Sender<BuildEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: BuildEvent) {
        if let Some(tx) = &self.tx {
            if let Err(TrySendError::Full(event)) = tx.try_send(event) {
                tracing::debug!("Progress channel full, dropping {:?}", event);
            }
        }
    }
}
