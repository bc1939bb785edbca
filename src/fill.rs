//! Form Fill Engine: one pass over the current step of the apply form.
//!
//! A pass fills what it can and reports what the controller must do next.
//! It never waits for a human or a generator itself; those are separate
//! states, and the next pass picks up where this one stopped.

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::dom::{Driver, ElementId, Page};
use crate::selectors::{SelectorResolver, names};
use crate::session::SessionContext;
use crate::state_machine::Job;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
    /// First open-answer field with no stored answer on this step.
    UnknownQuestion {
        question: String,
        field: ElementId,
        /// The question is already in the snapshot as unresolved.
        already_reported: bool,
    },
    /// An empty content field wants generated text.
    NeedsContent { field: ElementId },
    /// A next or review control was clicked; the form moved on.
    Advanced,
    /// The submit control is present.
    ReadyToSubmit,
    /// No controls, but the success marker is showing.
    SuccessMarker,
    Stuck(String),
}

/// Profile keys used for identity fields.
const IDENTITY_FIELDS: [(&str, &str); 2] = [
    (names::PHONE_FIELD, "phone"),
    (names::EMAIL_FIELD, "email"),
];

pub struct FormFiller<'a, P> {
    driver: &'a Driver<P>,
    resolver: &'a SelectorResolver,
    config: &'a EngineConfig,
    session: &'a SessionContext,
}

impl<'a, P: Page> FormFiller<'a, P> {
    pub fn new(
        driver: &'a Driver<P>,
        resolver: &'a SelectorResolver,
        config: &'a EngineConfig,
        session: &'a SessionContext,
    ) -> Self {
        Self {
            driver,
            resolver,
            config,
            session,
        }
    }

    pub async fn fill_step(&self, job: &mut Job) -> FillOutcome {
        if job.form_steps >= self.config.limits.max_form_steps {
            return FillOutcome::Stuck(format!(
                "form did not finish within {} steps",
                self.config.limits.max_form_steps
            ));
        }
        sleep(self.config.timing.step_settle()).await;

        self.fill_identity_fields().await;

        if let Some(outcome) = self.answer_questions(job).await {
            return outcome;
        }

        if let Some(field) = self.content_field(job).await {
            return FillOutcome::NeedsContent { field };
        }

        self.navigate(job).await
    }

    /// Fill identity fields from the profile, but only when the page left them empty.
    async fn fill_identity_fields(&self) {
        let timing = &self.config.timing;
        for (name, key) in IDENTITY_FIELDS {
            let Some(value) = self.session.profile.get_str(key).filter(|v| !v.is_empty()) else {
                continue;
            };
            let Some(field) = self.driver.find(&self.resolver.resolve(name), timing.probe()).await
            else {
                continue;
            };
            let Some(info) = self.driver.describe(field).await else {
                continue;
            };
            if info.value.is_empty() {
                debug!(field = name, "filling identity field");
                self.driver.type_into_element(field, &value).await;
            }
        }
    }

    /// Type stored answers in document order. Stops at the first field with no answer.
    async fn answer_questions(&self, job: &mut Job) -> Option<FillOutcome> {
        let fields = self
            .driver
            .find_all(None, &self.resolver.resolve(names::QUESTION_FIELD))
            .await;
        for field in fields {
            let Some(question) = self
                .driver
                .describe(field)
                .await
                .and_then(|info| info.question_text())
            else {
                continue;
            };
            match self.session.known_answer(&question) {
                Some(answer) => {
                    debug!(%question, "answering known question");
                    if self.driver.type_into_element(field, answer).await {
                        job.questions_answered = true;
                    }
                }
                None => {
                    info!(%question, "new question found");
                    return Some(FillOutcome::UnknownQuestion {
                        already_reported: self.session.is_known(&question),
                        question,
                        field,
                    });
                }
            }
        }
        None
    }

    /// The content field, when it is empty, a template is set and generation
    /// has not been tried for this job yet.
    async fn content_field(&self, job: &Job) -> Option<ElementId> {
        if job.content_requested || self.session.settings.ai_cover_letter_prompt.trim().is_empty() {
            return None;
        }
        let locators = self.resolver.resolve(names::CONTENT_FIELD);
        let field = self.driver.find(&locators, self.config.timing.probe()).await?;
        let info = self.driver.describe(field).await?;
        info.value.is_empty().then_some(field)
    }

    /// `job.form_steps` counts next and review clicks only.
    async fn navigate(&self, job: &mut Job) -> FillOutcome {
        let timing = &self.config.timing;

        let next = self.resolver.resolve(names::NEXT_BUTTON);
        if self.driver.exists(&next, timing.probe()).await {
            job.form_steps += 1;
            info!(step = job.form_steps, "clicking next");
            self.driver.click(&next, timing.primary()).await;
            return FillOutcome::Advanced;
        }

        let review = self.resolver.resolve(names::REVIEW_BUTTON);
        if self.driver.exists(&review, timing.probe()).await {
            self.untick_follow_company().await;
            job.form_steps += 1;
            info!(step = job.form_steps, "clicking review");
            self.driver.click(&review, timing.primary()).await;
            return FillOutcome::Advanced;
        }

        let submit = self.resolver.resolve(names::SUBMIT_BUTTON);
        if self.driver.exists(&submit, timing.probe()).await {
            return FillOutcome::ReadyToSubmit;
        }

        warn!("no form navigation controls found, probing for success marker");
        let marker = self.resolver.resolve(names::SUCCESS_MARKER);
        if self.driver.exists(&marker, timing.success_marker()).await {
            info!("success marker present");
            return FillOutcome::SuccessMarker;
        }
        FillOutcome::Stuck(format!(
            "no navigation control or success marker on step {}",
            job.form_steps
        ))
    }

    /// Only when the stored resilience map names the checkbox explicitly.
    async fn untick_follow_company(&self) {
        let configured = self
            .session
            .settings
            .selector_resilience
            .get(names::FOLLOW_COMPANY_CHECKBOX)
            .is_some_and(|v| !v.trim().is_empty());
        if !configured {
            return;
        }
        let locators = self.resolver.resolve(names::FOLLOW_COMPANY_CHECKBOX);
        let Some(checkbox) = self.driver.find(&locators, self.config.timing.probe()).await else {
            return;
        };
        if self.driver.describe(checkbox).await.is_some_and(|info| info.checked)
            && self.driver.click_element(checkbox).await
        {
            info!("unchecked follow-company checkbox");
        }
    }
}
