pub mod submission;
pub mod types;

pub use submission::{Step, SubmissionWorkflow};
pub use types::{LogEntry, PodVersion};
