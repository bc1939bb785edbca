mod job;
mod state;

pub use job::{Job, JobStatus, LogColumn, OutcomeRecord, OutcomeStatus};
pub use state::{AutomationState, StateMachine, Transition};
