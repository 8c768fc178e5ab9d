//! Event Recorder, Artifact Store and Event Replay (spec components C2,
//! C3, C11) — the durable, reconstructible audit trail every run leaves
//! behind.

mod artifact;
mod recorder;
mod replay;

pub use artifact::ArtifactStore;
pub use recorder::EventRecorder;
pub use replay::{debug_context, replay, DebugContext, ReplayResult, ReplayedEvent};
