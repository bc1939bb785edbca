use std::fmt;

use serde::{Deserialize, Serialize};

/// The states of the application automation state machine.
///
/// A session normally flows:
/// INITIALIZING → NAVIGATING_TO_LISTING → SCANNING_LISTING → VIEWING_JOB_DETAILS
/// → APPLY_FLOW_STARTED → FILLING_FORM_STEP (↺) → SUBMITTING → COMPLETED → SCANNING_LISTING
///
/// `Idle` and `Failed` are terminal; only a fresh start re-arms them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutomationState {
    Initializing,
    NavigatingToListing,
    ScanningListing,
    ViewingJobDetails,
    ApplyFlowStarted,
    FillingFormStep,
    GeneratingContent,
    AwaitingHumanInput,
    Submitting,
    Completed,
    Idle,
    Failed,
}

impl fmt::Display for AutomationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AutomationState::Initializing => "INITIALIZING",
            AutomationState::NavigatingToListing => "NAVIGATING_TO_LISTING",
            AutomationState::ScanningListing => "SCANNING_LISTING",
            AutomationState::ViewingJobDetails => "VIEWING_JOB_DETAILS",
            AutomationState::ApplyFlowStarted => "APPLY_FLOW_STARTED",
            AutomationState::FillingFormStep => "FILLING_FORM_STEP",
            AutomationState::GeneratingContent => "GENERATING_CONTENT",
            AutomationState::AwaitingHumanInput => "AWAITING_HUMAN_INPUT",
            AutomationState::Submitting => "SUBMITTING",
            AutomationState::Completed => "COMPLETED",
            AutomationState::Idle => "IDLE",
            AutomationState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

impl AutomationState {
    /// Terminal states need an explicit re-arm before the engine moves again.
    pub fn is_terminal(self) -> bool {
        matches!(self, AutomationState::Idle | AutomationState::Failed)
    }

    /// States in which `advance()` returns control to the host and waits
    /// for an external event.
    pub fn is_suspended(self) -> bool {
        self.is_terminal() || self == AutomationState::AwaitingHumanInput
    }
}

/// A recorded state change, kept in the engine's bounded history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: AutomationState,
    pub to: AutomationState,
}

/// Legal-successor table for the controller.
///
/// Forced stops bypass this table: any state may be driven to `Idle`
/// by an external stop signal.
pub struct StateMachine;

impl StateMachine {
    /// States reachable from `state` through the engine's own actions.
    pub fn successors(state: AutomationState) -> &'static [AutomationState] {
        use AutomationState::*;
        match state {
            Initializing => &[NavigatingToListing, Failed],
            NavigatingToListing => &[ScanningListing],
            ScanningListing => &[ViewingJobDetails, Idle],
            ViewingJobDetails => &[ApplyFlowStarted, ScanningListing],
            ApplyFlowStarted => &[FillingFormStep],
            FillingFormStep => &[
                FillingFormStep,
                GeneratingContent,
                AwaitingHumanInput,
                Submitting,
                Completed,
                Failed,
            ],
            GeneratingContent => &[FillingFormStep],
            AwaitingHumanInput => &[FillingFormStep, ScanningListing],
            Submitting => &[Completed, Failed],
            Completed => &[ScanningListing],
            Idle => &[Initializing],
            Failed => &[Initializing],
        }
    }

    pub fn can_transition(from: AutomationState, to: AutomationState) -> bool {
        Self::successors(from).contains(&to)
    }
}
