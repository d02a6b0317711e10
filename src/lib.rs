pub mod artifact;
pub mod backlog;
pub mod capability;
pub mod errors;
pub mod estimator;
pub mod healing;
pub mod orchestrator;
pub mod risk;
pub mod sequencer;
pub mod validator;
pub mod variants;

pub use artifact::{Artifact, HealingAttempt, ValidationResult};
pub use backlog::{Backlog, BacklogFile, WorkItem};
pub use errors::{CapabilityError, ConfigurationError};
pub use healing::{HealingLoop, HealingOutcome, HealingState};
pub use orchestrator::{ExecutionProgress, ExecutionSession, Orchestrator, ProgressSink};
pub use sequencer::{ExecutionPlan, build_sequence};
pub use validator::{BrandConstraints, Validator};
