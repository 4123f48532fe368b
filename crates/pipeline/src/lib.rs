//! Side effects run after a feedback is committed.
//!
//! [`NotificationPipeline`] owns the policy: which steps run, in what order,
//! and what a failure means. The adapters behind it (see [`adapters`]) only
//! report typed errors.

pub mod adapters;
pub mod context;
pub mod pipeline;
pub mod progress;

pub use context::{NotificationContext, ProjectResolution};
pub use pipeline::{NotificationPipeline, PipelineAdapters, PipelineReport, PipelineSettings, PriorProgress};
pub use progress::{DiscardProgress, ProgressSink, StepOutcome};
