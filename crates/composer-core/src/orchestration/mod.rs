//! Build orchestration
//!
//! The build lifecycle and the per-component development loop, plus the
//! state and result types they produce.

mod development;
mod events;
mod orchestrator;
mod state;
mod types;

pub use events::{BuildEvent, EventSink};
pub use orchestrator::{BuildOrchestrator, Collaborators};
pub use state::{BuildId, BuildState, BuildStatus, ErrorHistory, ErrorRecord};
pub use types::{BuildResult, CancelFlag};

pub(crate) use state::now;
