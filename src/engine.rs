//! State Machine Controller.
//!
//! [`Engine::advance`] is an explicit driving loop: each iteration runs the
//! action of the current state once and applies the resulting transition.
//! It returns when the engine suspends (`AwaitingHumanInput`, `Idle`,
//! `Failed`) or after `max_transitions_per_advance` transitions, whichever
//! comes first. A stop request is honoured between iterations; the result
//! of a step that was in flight when the stop arrived is discarded.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::dom::{Driver, ElementId, Page};
use crate::error::{EngineError, Failure, FailureKind};
use crate::fill::{FillOutcome, FormFiller};
use crate::gate::{GateError, GateResolution, HumanGate, PendingQuestion};
use crate::host::{AnswerAck, Host, SessionHandle};
use crate::prompt;
use crate::scan::{ScanResult, Scanner};
use crate::selectors::{SelectorResolver, names};
use crate::session::{BotDescriptor, SessionContext};
use crate::state_machine::{
    AutomationState, Job, JobStatus, OutcomeRecord, OutcomeStatus, StateMachine, Transition,
};

/// Cloneable, thread-safe stop signal for one session.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One automation session bound to one page.
pub struct Engine<P, H> {
    driver: Driver<P>,
    host: H,
    config: EngineConfig,
    resolver: SelectorResolver,
    state: AutomationState,
    history: VecDeque<Transition>,
    bot: Option<BotDescriptor>,
    session: SessionContext,
    gate: HumanGate,
    pending_content: Option<ElementId>,
    /// Source URLs already picked from the listing in this engine's lifetime.
    claimed: HashSet<String>,
    stop: StopHandle,
    state_tx: watch::Sender<AutomationState>,
    last_failure: Option<Failure>,
}

impl<P: Page, H: Host> Engine<P, H> {
    pub fn new(page: P, host: H, config: EngineConfig) -> Self {
        let driver = Driver::new(page).with_click_settle(config.timing.click_settle());
        let (state_tx, _) = watch::channel(AutomationState::Initializing);
        Self {
            driver,
            host,
            resolver: SelectorResolver::with_defaults(&Default::default()),
            config,
            state: AutomationState::Initializing,
            history: VecDeque::new(),
            bot: None,
            session: SessionContext::default(),
            gate: HumanGate::default(),
            pending_content: None,
            claimed: HashSet::new(),
            stop: StopHandle::default(),
            state_tx,
            last_failure: None,
        }
    }

    pub fn state(&self) -> AutomationState {
        self.state
    }

    /// Most recent transitions, oldest first.
    pub fn history(&self) -> Vec<Transition> {
        self.history.iter().copied().collect()
    }

    pub fn current_job(&self) -> Option<&Job> {
        self.session.current_job.as_ref()
    }

    pub fn pending_question(&self) -> Option<&PendingQuestion> {
        self.gate.pending()
    }

    pub fn last_failure(&self) -> Option<&Failure> {
        self.last_failure.as_ref()
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn page(&self) -> &P {
        self.driver.page()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AutomationState> {
        self.state_tx.subscribe()
    }

    pub fn session_handle(&self) -> SessionHandle {
        SessionHandle::new(self.stop.clone(), self.state_tx.subscribe())
    }

    /// Arm the engine for `bot`. Allowed from `Initializing` and from the
    /// terminal states; anything else means a session is already running.
    pub fn start(&mut self, bot: BotDescriptor) -> Result<(), EngineError> {
        if !matches!(
            self.state,
            AutomationState::Initializing | AutomationState::Idle | AutomationState::Failed
        ) {
            return Err(EngineError::Busy(self.state.to_string()));
        }
        info!(bot_id = %bot.id, bot = %bot.name, "session started");
        self.stop.reset();
        self.bot = Some(bot);
        self.gate.close();
        self.pending_content = None;
        self.session.current_job = None;
        self.last_failure = None;
        if self.state != AutomationState::Initializing {
            self.record(AutomationState::Initializing);
        }
        Ok(())
    }

    /// Request a stop and apply it immediately.
    pub async fn stop(&mut self) {
        self.stop.stop();
        self.force_idle().await;
    }

    /// Run states until the engine suspends or the transition budget is spent.
    pub async fn advance(&mut self) -> AutomationState {
        let mut budget = self.config.limits.max_transitions_per_advance;
        loop {
            if self.stop.is_stopped() {
                self.force_idle().await;
                break;
            }
            if self.state.is_suspended() {
                break;
            }
            if budget == 0 {
                warn!(state = %self.state, "transition budget spent, yielding");
                break;
            }

            let from = self.state;
            let next = self.step().await;
            if self.stop.is_stopped() {
                debug!(state = %from, discarded = %next, "stop requested during step");
                continue;
            }
            if !self.transition(next).await {
                break;
            }
            budget -= 1;
        }
        self.state
    }

    async fn step(&mut self) -> AutomationState {
        match self.state {
            AutomationState::Initializing => self.initialize().await,
            AutomationState::NavigatingToListing => self.navigate_to_listing().await,
            AutomationState::ScanningListing => self.scan_listing().await,
            AutomationState::ViewingJobDetails => self.view_job_details().await,
            AutomationState::ApplyFlowStarted => self.start_apply_flow().await,
            AutomationState::FillingFormStep => self.fill_form_step().await,
            AutomationState::GeneratingContent => self.generate_content().await,
            AutomationState::Submitting => self.submit().await,
            AutomationState::Completed => self.complete().await,
            AutomationState::AwaitingHumanInput
            | AutomationState::Idle
            | AutomationState::Failed => self.state,
        }
    }

    /// Apply a legal transition. Illegal ones are logged and refused.
    async fn transition(&mut self, to: AutomationState) -> bool {
        if !StateMachine::can_transition(self.state, to) {
            error!(from = %self.state, to = %to, "illegal transition refused");
            return false;
        }
        self.record(to);
        if to == AutomationState::Idle {
            self.notify_idle().await;
        }
        true
    }

    fn record(&mut self, to: AutomationState) {
        let from = self.state;
        info!(from = %from, to = %to, "transition");
        self.state = to;
        self.history.push_back(Transition { from, to });
        while self.history.len() > self.config.limits.history_len {
            self.history.pop_front();
        }
        self.state_tx.send_replace(to);
    }

    async fn force_idle(&mut self) {
        if self.state == AutomationState::Idle {
            return;
        }
        info!(state = %self.state, "stop requested, forcing idle");
        self.gate.close();
        self.pending_content = None;
        self.finish_job(JobStatus::Abandoned);
        self.record(AutomationState::Idle);
        self.notify_idle().await;
    }

    async fn notify_idle(&mut self) {
        let bot_id = self.bot.as_ref().map(|b| b.id.clone()).unwrap_or_default();
        self.host.session_idle(&bot_id).await;
    }

    // ---- state actions ----

    async fn initialize(&mut self) -> AutomationState {
        match self.load_session().await {
            Ok(()) => AutomationState::NavigatingToListing,
            Err(failure) => {
                self.fail(failure).await;
                AutomationState::Failed
            }
        }
    }

    async fn load_session(&mut self) -> Result<(), Failure> {
        let missing = |message: String| Failure::new(FailureKind::PreconditionMissing, message);

        if self.bot.is_none() {
            return Err(missing("no bot descriptor; start the session first".into()));
        }
        let (profile, settings) = self
            .host
            .fetch_profile_and_settings()
            .await
            .map_err(|e| missing(format!("could not load profile and settings: {e}")))?;
        let known_questions = match self.host.fetch_known_questions().await {
            Ok(questions) => questions,
            Err(e) => {
                warn!(error = %e, "could not load known questions, starting with none");
                Vec::new()
            }
        };

        if profile.is_empty() {
            return Err(missing("Profile data missing".into()));
        }
        if settings.gemini_api_key.trim().is_empty() && self.config.gemini_api_key.trim().is_empty()
        {
            return Err(missing("Settings or API key missing".into()));
        }

        self.resolver = SelectorResolver::with_defaults(&settings.selector_resilience);
        info!(known_questions = known_questions.len(), "session context loaded");
        self.session = SessionContext {
            current_job: None,
            profile,
            settings,
            known_questions,
        };
        Ok(())
    }

    async fn navigate_to_listing(&mut self) -> AutomationState {
        let listing_url = self
            .bot
            .as_ref()
            .map(|b| b.listing_url.clone())
            .unwrap_or_default();
        if listing_url.is_empty() {
            return AutomationState::ScanningListing;
        }
        let page = self.driver.page();
        match page.current_url().await {
            Ok(current) if current == listing_url => {
                debug!(url = %listing_url, "already on listing page");
            }
            _ => {
                info!(url = %listing_url, "navigating to listing");
                if let Err(e) = page.navigate(&listing_url).await {
                    warn!(error = %e, "navigation failed");
                }
            }
        }
        AutomationState::ScanningListing
    }

    async fn scan_listing(&mut self) -> AutomationState {
        let scanner = Scanner::new(
            &self.driver,
            &self.resolver,
            &self.config.timing,
            &self.config.limits,
        );
        match scanner.scan(&self.claimed).await {
            ScanResult::Found { job, link } => {
                self.claimed.insert(job.source_url.clone());
                self.driver.click_element(link).await;
                sleep(self.config.timing.detail_load()).await;
                self.session.current_job = Some(job);
                AutomationState::ViewingJobDetails
            }
            ScanResult::Exhausted => AutomationState::Idle,
        }
    }

    async fn view_job_details(&mut self) -> AutomationState {
        let locators = self.resolver.resolve(names::EASY_APPLY_BUTTON);
        let clicked = match self
            .driver
            .find(&locators, self.config.timing.action_control())
            .await
        {
            Some(button) => self.driver.click_element(button).await,
            None => false,
        };
        if clicked {
            info!("apply flow opened");
            return AutomationState::ApplyFlowStarted;
        }

        info!("action control unavailable, skipping job");
        self.log_outcome(
            OutcomeStatus::SkippedActionUnavailable,
            Some("Easy Apply button not found"),
        )
        .await;
        self.finish_job(JobStatus::Abandoned);
        sleep(self.config.timing.skip_delay()).await;
        AutomationState::ScanningListing
    }

    async fn start_apply_flow(&mut self) -> AutomationState {
        sleep(self.config.timing.apply_modal()).await;
        if let Some(job) = &mut self.session.current_job {
            job.status = JobStatus::Filling;
        }
        AutomationState::FillingFormStep
    }

    async fn fill_form_step(&mut self) -> AutomationState {
        let Some(mut job) = self.session.current_job.take() else {
            self.fail(Failure::new(FailureKind::StuckForm, "form step with no job in progress"))
                .await;
            return AutomationState::Failed;
        };
        let outcome = FormFiller::new(&self.driver, &self.resolver, &self.config, &self.session)
            .fill_step(&mut job)
            .await;
        self.session.current_job = Some(job);

        match outcome {
            FillOutcome::UnknownQuestion {
                question,
                field,
                already_reported,
            } => match self.request_human_input(question, field, already_reported).await {
                Ok(()) => AutomationState::AwaitingHumanInput,
                Err(e) => {
                    warn!(error = %e, "could not open gate");
                    AutomationState::FillingFormStep
                }
            },
            FillOutcome::NeedsContent { field } => {
                self.pending_content = Some(field);
                AutomationState::GeneratingContent
            }
            FillOutcome::Advanced => AutomationState::FillingFormStep,
            FillOutcome::ReadyToSubmit => AutomationState::Submitting,
            FillOutcome::SuccessMarker => AutomationState::Completed,
            FillOutcome::Stuck(reason) => {
                let url = self.driver.page().current_url().await.unwrap_or_default();
                self.fail(Failure::new(FailureKind::StuckForm, format!("{reason} ({url})")))
                    .await;
                AutomationState::Failed
            }
        }
    }

    async fn generate_content(&mut self) -> AutomationState {
        let field = self.pending_content.take();
        if let Some(job) = &mut self.session.current_job {
            job.content_requested = true;
        }

        let description = self.job_description().await;
        if description.is_empty() {
            warn!(kind = %FailureKind::GenerationFailure, "no job description to generate from");
            return AutomationState::FillingFormStep;
        }
        let prompt = prompt::content_prompt(
            &self.session.settings.ai_cover_letter_prompt,
            &self.session.profile,
            &description,
        );
        let Some(text) = self.host.request_generated_text(&prompt).await else {
            warn!(kind = %FailureKind::GenerationFailure, "generation returned nothing, leaving field blank");
            return AutomationState::FillingFormStep;
        };
        if let Some(field) = field
            && self.driver.type_into_element(field, &text).await
            && let Some(job) = &mut self.session.current_job
        {
            job.content_generated = true;
            info!(chars = text.chars().count(), "inserted generated content");
        }
        AutomationState::FillingFormStep
    }

    async fn submit(&mut self) -> AutomationState {
        let locators = self.resolver.resolve(names::SUBMIT_BUTTON);
        if self.driver.click(&locators, self.config.timing.primary()).await {
            info!("application submitted");
            if let Some(job) = &mut self.session.current_job {
                job.status = JobStatus::Submitted;
            }
            return AutomationState::Completed;
        }
        self.fail(Failure::new(
            FailureKind::StuckForm,
            "submit control could not be clicked",
        ))
        .await;
        AutomationState::Failed
    }

    async fn complete(&mut self) -> AutomationState {
        if let Some(job) = &mut self.session.current_job {
            job.status = JobStatus::Submitted;
        }
        self.log_outcome(OutcomeStatus::Applied, None).await;
        self.session.current_job = None;
        sleep(self.config.timing.cooldown()).await;
        AutomationState::ScanningListing
    }

    // ---- human-in-the-loop ----

    /// Open the gate for `question`. Rejected without side effects while
    /// another question is pending.
    pub async fn request_human_input(
        &mut self,
        question: String,
        field: ElementId,
        already_reported: bool,
    ) -> Result<(), GateError> {
        if let Some(pending) = self.gate.pending() {
            warn!(pending = %pending.question, rejected = %question, "gate already open, ignoring");
            return Err(GateError::AlreadyOpen(pending.question.clone()));
        }
        if self.state != AutomationState::FillingFormStep {
            return Err(GateError::WrongState(self.state.to_string()));
        }

        if !already_reported
            && let Err(e) = self.host.report_new_question(&question).await
        {
            warn!(error = %e, "could not report new question");
        }
        self.session.record_question(&question);

        let suggestion = if self.config.suggest_answers {
            self.suggest_answer(&question).await
        } else {
            None
        };
        self.gate.open(PendingQuestion {
            question,
            field,
            suggestion,
        })?;
        if let Some(job) = &mut self.session.current_job {
            job.status = JobStatus::AwaitingHuman;
        }
        Ok(())
    }

    async fn suggest_answer(&mut self, question: &str) -> Option<String> {
        let template = self.session.settings.ai_question_prompt.clone();
        if template.trim().is_empty() {
            return None;
        }
        let description = self.job_description().await;
        let prompt =
            prompt::question_prompt(&template, &self.session.profile, &description, question);
        self.host.request_generated_text(&prompt).await
    }

    /// Close the gate. An answer is stored, typed into the pending field and
    /// resumes filling; a skip abandons the job and resumes scanning. Returns
    /// the resumed state; call [`advance`](Self::advance) to keep going.
    /// After a stop the gate is discarded and the engine goes idle instead.
    pub async fn resolve_gate(
        &mut self,
        resolution: GateResolution,
    ) -> Result<AutomationState, GateError> {
        if self.state != AutomationState::AwaitingHumanInput {
            return Err(GateError::NotOpen);
        }
        if self.stop.is_stopped() {
            self.force_idle().await;
            return Ok(self.state);
        }
        let (pending, resolution) = self.gate.resolve(resolution)?;

        match resolution {
            GateResolution::Answer(answer) => {
                match self.host.report_answer(&pending.question, &answer).await {
                    Ok(AnswerAck::Stored) => {}
                    Ok(AnswerAck::NotFound) => {
                        warn!(question = %pending.question, "host does not know the question, answer kept for this session");
                    }
                    Err(e) => warn!(error = %e, "could not store answer"),
                }
                self.session.record_answer(&pending.question, &answer);
                let typed = self.driver.type_into_element(pending.field, &answer).await;
                if let Some(job) = &mut self.session.current_job {
                    job.status = JobStatus::Filling;
                    if typed {
                        job.questions_answered = true;
                    }
                }
                self.transition(AutomationState::FillingFormStep).await;
            }
            GateResolution::Skip => {
                info!(question = %pending.question, "human skipped the job");
                self.log_outcome(OutcomeStatus::SkippedByHuman, Some("User skipped new question"))
                    .await;
                self.finish_job(JobStatus::Abandoned);
                self.transition(AutomationState::ScanningListing).await;
            }
        }
        Ok(self.state)
    }

    // ---- helpers ----

    async fn job_description(&self) -> String {
        let locators = self.resolver.resolve(names::JOB_DESCRIPTION);
        self.driver
            .get_text(&locators, self.config.timing.probe())
            .await
            .unwrap_or_default()
    }

    /// Log an outcome for the current job (or the session when there is none).
    /// A failed log call is absorbed.
    async fn log_outcome(&mut self, status: OutcomeStatus, error: Option<&str>) {
        let bot_name = self.bot.as_ref().map(|b| b.name.as_str()).unwrap_or_default();
        let record = OutcomeRecord::new(
            bot_name,
            self.session.current_job.as_ref(),
            status,
            error.map(str::to_string),
        );
        if let Err(e) = self.host.log_outcome(&record).await {
            warn!(kind = %FailureKind::LoggingFailure, error = %e, "outcome record lost");
        }
    }

    async fn fail(&mut self, failure: Failure) {
        error!(kind = %failure.kind, message = %failure.message, state = %self.state, "fatal failure");
        let status = if self.session.current_job.is_some() {
            OutcomeStatus::ApplicationError
        } else {
            OutcomeStatus::SessionError
        };
        self.log_outcome(status, Some(failure.message.as_str())).await;
        self.finish_job(JobStatus::Abandoned);
        self.last_failure = Some(failure);
    }

    fn finish_job(&mut self, status: JobStatus) {
        if let Some(mut job) = self.session.current_job.take() {
            job.status = status;
            self.claimed.insert(job.source_url.clone());
            debug!(job = %job.title, status = ?job.status, "job finished");
        }
    }
}
