//! End-to-end sessions against recorded pages and an in-process host.

use std::sync::{Arc, OnceLock};

use autoapply::config::EngineConfig;
use autoapply::dom::MemoryPage;
use autoapply::engine::{Engine, StopHandle};
use autoapply::gate::{GateError, GateResolution};
use autoapply::gemini::CannedText;
use autoapply::host::{AnswerAck, Host, HostError, LocalHost, Store};
use autoapply::selectors::{default_resilience_map, names};
use autoapply::session::{BotDescriptor, KnownQuestion, Profile, Settings};
use autoapply::state_machine::{
    AutomationState, JobStatus, OutcomeRecord, OutcomeStatus, Transition,
};
use autoapply::FailureKind;
use serde_json::{Value, json};

const LISTING_URL: &str = "https://jobs.example/search";
const ITEM: &str = "li.jobs-search-results__list-item";
const ACTION: &str = "button.jobs-apply-button";
const TITLE: &str = "a.job-card-list__title";
const COMPANY: &str = "a.job-card-container__company-name";
const EASY_APPLY: &str = r#"button[aria-label^="Easy Apply to"]"#;
const NEXT: &str = r#"button[aria-label="Next"]"#;
const REVIEW: &str = r#"button[aria-label="Review your application"]"#;
const SUBMIT: &str = r#"button[aria-label="Submit application"]"#;
const FOLLOW: &str = r#"input[type="checkbox"][name="follow-company"]"#;
const PHONE: &str = r#"input[id*="phoneNumber-"]"#;
const QUESTION: &str = r#"textarea[id*="question"]"#;
const COVER: &str = r#"textarea[id*="coverletter"]"#;
const DESCRIPTION: &str = ".jobs-description__content";
const SUCCESS: &str = r#"[data-test-id="apply-form-success-card"]"#;

// ---- page fixtures ----

/// A listing card plus its detail pane. `steps` are the apply-form steps,
/// shown one at a time; each element is wired to its step automatically.
fn job(n: u32, easy_apply: bool, steps: Vec<Vec<Value>>) -> Vec<Value> {
    let card = format!("card-{n}");
    let detail = format!("detail-{n}");
    let form = format!("form-{n}");
    let mut elements = vec![
        json!({ "id": card, "kind": "container", "selectors": [ITEM], "parent": "listing" }),
        json!({ "id": format!("action-{n}"), "kind": "button", "selectors": [ACTION], "parent": card }),
        json!({ "id": format!("title-{n}"), "kind": "link", "selectors": [TITLE], "parent": card,
                "text": format!("Engineer {n}"), "href": format!("https://jobs.example/view/{n}"),
                "on_click": [{ "hide": ["detail"] }, { "show": [detail] }] }),
        json!({ "id": format!("company-{n}"), "kind": "link", "selectors": [COMPANY], "parent": card,
                "text": "Acme" }),
        json!({ "id": detail, "kind": "container", "group": "detail", "hidden": true }),
        json!({ "id": format!("description-{n}"), "kind": "text", "selectors": [DESCRIPTION],
                "parent": detail, "text": format!("Build reliable systems for team {n}.") }),
        json!({ "id": form, "kind": "container", "parent": detail }),
    ];
    if easy_apply {
        elements.push(json!({
            "id": format!("easy-apply-{n}"), "kind": "button", "selectors": [EASY_APPLY],
            "parent": detail, "on_click": [{ "show": [format!("form-{n}-step-1")] }]
        }));
    }
    for (index, step) in steps.into_iter().enumerate() {
        let group = format!("form-{n}-step-{}", index + 1);
        for mut element in step {
            element["parent"] = json!(form);
            element["group"] = json!(group);
            element["hidden"] = json!(true);
            elements.push(element);
        }
    }
    elements
}

fn page(jobs: Vec<Vec<Value>>) -> MemoryPage {
    let mut elements = vec![json!({
        "id": "listing", "kind": "container", "selectors": [".jobs-search-results-list"],
        "scroll_height": 1000
    })];
    elements.extend(jobs.into_iter().flatten());
    MemoryPage::from_value(json!({ "url": LISTING_URL, "elements": elements })).unwrap()
}

fn question(id: &str, label: &str) -> Value {
    json!({ "id": id, "kind": "text_area", "selectors": [QUESTION], "label": label })
}

fn cover(id: &str) -> Value {
    json!({ "id": id, "kind": "text_area", "selectors": [COVER], "label": "Cover letter" })
}

fn phone(id: &str) -> Value {
    json!({ "id": id, "kind": "text_input", "selectors": [PHONE], "label": "Phone" })
}

fn follow(id: &str) -> Value {
    json!({ "id": id, "kind": "checkbox", "selectors": [FOLLOW], "checked": true })
}

fn next(n: u32, step: u32) -> Value {
    json!({ "id": format!("next-{n}-{step}"), "kind": "button", "selectors": [NEXT],
            "on_click": [{ "hide": [format!("form-{n}-step-{step}")] },
                         { "show": [format!("form-{n}-step-{}", step + 1)] }] })
}

fn review(n: u32, step: u32) -> Value {
    json!({ "id": format!("review-{n}-{step}"), "kind": "button", "selectors": [REVIEW],
            "on_click": [{ "hide": [format!("form-{n}-step-{step}")] },
                         { "show": [format!("form-{n}-step-{}", step + 1)] }] })
}

fn submit(n: u32) -> Value {
    json!({ "id": format!("submit-{n}"), "kind": "button", "selectors": [SUBMIT] })
}

fn success(n: u32) -> Value {
    json!({ "id": format!("success-{n}"), "kind": "container", "selectors": [SUCCESS] })
}

// ---- host and engine ----

fn store(questions: Vec<KnownQuestion>) -> Store {
    Store {
        profile: serde_json::from_value::<Profile>(json!({
            "name": "Ada", "phone": "555-0100", "email": "ada@example.com"
        }))
        .unwrap(),
        settings: Settings {
            gemini_api_key: "test-key".into(),
            ..Default::default()
        },
        questions,
        bots: vec![bot()],
    }
}

fn bot() -> BotDescriptor {
    BotDescriptor {
        id: "bot-1".into(),
        name: "Rust roles".into(),
        listing_url: LISTING_URL.into(),
    }
}

type TestEngine = Engine<MemoryPage, LocalHost<CannedText>>;

fn engine(page: MemoryPage, store: Store, generator: CannedText) -> TestEngine {
    let host = LocalHost::new(store).with_generator(generator);
    let mut engine = Engine::new(page, host, EngineConfig::default());
    engine.start(bot()).unwrap();
    engine
}

fn visited(engine: &TestEngine, state: AutomationState) -> usize {
    engine.history().iter().filter(|t| t.to == state).count()
}

fn statuses(engine: &TestEngine) -> Vec<OutcomeStatus> {
    engine.host().outcomes().iter().map(|o| o.status).collect()
}

const SALARY: &str = "What are your salary expectations?";
const RELOCATE: &str = "Are you willing to relocate?";

// ---- scenarios ----

#[tokio::test(start_paused = true)]
async fn known_question_completes_with_one_applied_record() {
    let p = page(vec![job(1, true, vec![vec![question("q-1", SALARY), submit(1)]])]);
    let mut e = engine(p, store(vec![KnownQuestion::answered(SALARY, "100k")]), CannedText::empty());

    assert_eq!(e.advance().await, AutomationState::Idle);

    let outcomes = e.host().outcomes();
    assert_eq!(outcomes.len(), 1);
    let applied = &outcomes[0];
    assert_eq!(applied.status, OutcomeStatus::Applied);
    assert_eq!(applied.job_title, "Engineer 1");
    assert_eq!(applied.application_url, "https://jobs.example/view/1");
    assert!(applied.questions_answered);
    assert!(!applied.content_generated);
    assert_eq!(e.page().observed_value("q-1").as_deref(), Some("100k"));
    assert_eq!(e.page().clicks("submit-1"), 1);
    assert_eq!(visited(&e, AutomationState::Completed), 1);
    assert_eq!(e.host().count("report-new-question"), 0);
    assert_eq!(e.host().count("session-idle"), 1);
}

#[tokio::test(start_paused = true)]
async fn full_happy_path_visits_states_in_order() {
    let p = page(vec![job(1, true, vec![vec![submit(1)]])]);
    let mut e = engine(p, store(vec![]), CannedText::empty());
    e.advance().await;

    use AutomationState::*;
    let path: Vec<AutomationState> = e.history().iter().map(|t| t.to).collect();
    assert_eq!(
        path,
        vec![
            NavigatingToListing,
            ScanningListing,
            ViewingJobDetails,
            ApplyFlowStarted,
            FillingFormStep,
            Submitting,
            Completed,
            ScanningListing,
            Idle
        ]
    );
    assert!(e.current_job().is_none());
}

#[tokio::test(start_paused = true)]
async fn unknown_question_reports_once_and_skip_resumes_scanning() {
    let p = page(vec![job(1, true, vec![vec![question("q-1", RELOCATE), submit(1)]])]);
    let mut e = engine(p, store(vec![]), CannedText::empty());

    assert_eq!(e.advance().await, AutomationState::AwaitingHumanInput);
    assert_eq!(e.host().count("report-new-question"), 1);
    assert_eq!(e.pending_question().unwrap().question, RELOCATE);
    assert_eq!(e.current_job().unwrap().status, JobStatus::AwaitingHuman);
    let stored = &e.host().store().questions;
    assert_eq!(stored.len(), 1);
    assert!(stored[0].is_unresolved);
    assert!(stored[0].answer.is_empty());

    let resumed = e.resolve_gate(GateResolution::Skip).await.unwrap();
    assert_eq!(resumed, AutomationState::ScanningListing);
    assert_eq!(statuses(&e), vec![OutcomeStatus::SkippedByHuman]);
    assert_eq!(
        e.host().outcomes()[0].error.as_deref(),
        Some("User skipped new question")
    );

    assert_eq!(e.advance().await, AutomationState::Idle);
    assert_eq!(e.page().clicks("submit-1"), 0);
    assert_eq!(visited(&e, AutomationState::Completed), 0);
    assert_eq!(e.host().count("report-new-question"), 1);
}

#[tokio::test(start_paused = true)]
async fn answered_gate_stores_types_and_completes() {
    let p = page(vec![job(1, true, vec![vec![question("q-1", RELOCATE), submit(1)]])]);
    let mut e = engine(p, store(vec![]), CannedText::empty());
    e.advance().await;

    let resumed = e
        .resolve_gate(GateResolution::Answer("  Yes, within the EU  ".into()))
        .await
        .unwrap();
    assert_eq!(resumed, AutomationState::FillingFormStep);
    assert_eq!(e.host().count("report-answer"), 1);
    let stored = &e.host().store().questions[0];
    assert_eq!(stored.answer, "Yes, within the EU");
    assert!(!stored.is_unresolved);

    assert_eq!(e.advance().await, AutomationState::Idle);
    assert_eq!(statuses(&e), vec![OutcomeStatus::Applied]);
    assert!(e.host().outcomes()[0].questions_answered);
    assert_eq!(
        e.page().observed_value("q-1").as_deref(),
        Some("Yes, within the EU")
    );
    assert_eq!(e.host().count("report-new-question"), 1);
}

#[tokio::test(start_paused = true)]
async fn second_gate_request_is_rejected_without_side_effects() {
    let p = page(vec![job(1, true, vec![vec![
        question("q-1", RELOCATE),
        question("q-2", SALARY),
        submit(1),
    ]])]);
    let mut e = engine(p, store(vec![]), CannedText::empty());
    assert_eq!(e.advance().await, AutomationState::AwaitingHumanInput);

    let other = e.page().element_id("q-2").unwrap();
    let err = e
        .request_human_input(SALARY.into(), other, false)
        .await
        .unwrap_err();
    assert_eq!(err, GateError::AlreadyOpen(RELOCATE.into()));
    assert_eq!(e.pending_question().unwrap().question, RELOCATE);
    assert_eq!(e.host().count("report-new-question"), 1);
    assert_eq!(e.state(), AutomationState::AwaitingHumanInput);
}

#[tokio::test(start_paused = true)]
async fn empty_answer_keeps_gate_open() {
    let p = page(vec![job(1, true, vec![vec![question("q-1", RELOCATE), submit(1)]])]);
    let mut e = engine(p, store(vec![]), CannedText::empty());
    e.advance().await;

    let err = e
        .resolve_gate(GateResolution::Answer("   ".into()))
        .await
        .unwrap_err();
    assert_eq!(err, GateError::EmptyAnswer);
    assert_eq!(e.state(), AutomationState::AwaitingHumanInput);
    assert!(e.pending_question().is_some());
    assert_eq!(e.host().count("report-answer"), 0);
}

#[tokio::test(start_paused = true)]
async fn previously_reported_question_is_not_reported_again() {
    let p = page(vec![job(1, true, vec![vec![question("q-1", RELOCATE), submit(1)]])]);
    let mut e = engine(
        p,
        store(vec![KnownQuestion::unresolved(RELOCATE)]),
        CannedText::empty(),
    );
    assert_eq!(e.advance().await, AutomationState::AwaitingHumanInput);
    assert_eq!(e.host().count("report-new-question"), 0);
}

#[tokio::test(start_paused = true)]
async fn missing_action_control_skips_once_and_never_fills() {
    let p = page(vec![job(1, false, vec![])]);
    let mut e = engine(p, store(vec![]), CannedText::empty());

    assert_eq!(e.advance().await, AutomationState::Idle);
    assert_eq!(statuses(&e), vec![OutcomeStatus::SkippedActionUnavailable]);
    assert_eq!(
        e.host().outcomes()[0].error.as_deref(),
        Some("Easy Apply button not found")
    );
    assert_eq!(visited(&e, AutomationState::FillingFormStep), 0);
    assert_eq!(visited(&e, AutomationState::ApplyFlowStarted), 0);
}

#[tokio::test(start_paused = true)]
async fn skipped_job_is_not_revisited() {
    let p = page(vec![
        job(1, false, vec![]),
        job(2, true, vec![vec![submit(2)]]),
    ]);
    let mut e = engine(p, store(vec![]), CannedText::empty());

    assert_eq!(e.advance().await, AutomationState::Idle);
    assert_eq!(
        statuses(&e),
        vec![OutcomeStatus::SkippedActionUnavailable, OutcomeStatus::Applied]
    );
    assert_eq!(e.page().clicks("title-1"), 1);
    assert_eq!(e.page().clicks("title-2"), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_listing_goes_idle_and_notifies_host() {
    let mut e = engine(page(vec![]), store(vec![]), CannedText::empty());
    assert_eq!(e.advance().await, AutomationState::Idle);
    assert!(e.host().outcomes().is_empty());
    assert_eq!(e.host().count("session-idle"), 1);
    assert!(e.history().contains(&Transition {
        from: AutomationState::ScanningListing,
        to: AutomationState::Idle,
    }));
}

#[tokio::test(start_paused = true)]
async fn entries_without_the_action_control_are_not_candidates() {
    let mut elements = job(1, true, vec![vec![submit(1)]]);
    elements.retain(|el| el["id"] != "action-1");
    let mut e = engine(page(vec![elements]), store(vec![]), CannedText::empty());
    assert_eq!(e.advance().await, AutomationState::Idle);
    assert_eq!(e.page().clicks("title-1"), 0);
    assert!(e.host().outcomes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn multi_step_form_fills_identity_and_unticks_follow() {
    let p = page(vec![job(1, true, vec![
        vec![phone("phone-1"), next(1, 1)],
        vec![follow("follow-1"), review(1, 2)],
        vec![submit(1)],
    ])]);
    let mut s = store(vec![]);
    let mut resilience = default_resilience_map();
    resilience.retain(|name, _| name == names::FOLLOW_COMPANY_CHECKBOX);
    s.settings.selector_resilience = resilience;
    let mut e = engine(p, s, CannedText::empty());

    assert_eq!(e.advance().await, AutomationState::Idle);
    assert_eq!(statuses(&e), vec![OutcomeStatus::Applied]);
    assert_eq!(e.page().observed_value("phone-1").as_deref(), Some("555-0100"));
    assert!(!e.page().is_checked("follow-1"));
    assert_eq!(visited(&e, AutomationState::FillingFormStep), 3);
}

#[tokio::test(start_paused = true)]
async fn follow_checkbox_left_alone_without_stored_selector() {
    let p = page(vec![job(1, true, vec![
        vec![follow("follow-1"), review(1, 1)],
        vec![submit(1)],
    ])]);
    let mut e = engine(p, store(vec![]), CannedText::empty());
    e.advance().await;
    assert!(e.page().is_checked("follow-1"));
    assert_eq!(statuses(&e), vec![OutcomeStatus::Applied]);
}

#[tokio::test(start_paused = true)]
async fn success_marker_without_controls_completes() {
    let p = page(vec![job(1, true, vec![vec![next(1, 1)], vec![success(1)]])]);
    let mut e = engine(p, store(vec![]), CannedText::empty());
    assert_eq!(e.advance().await, AutomationState::Idle);
    assert_eq!(statuses(&e), vec![OutcomeStatus::Applied]);
    assert_eq!(visited(&e, AutomationState::Submitting), 0);
}

#[tokio::test(start_paused = true)]
async fn generated_content_is_inserted_once() {
    let p = page(vec![job(1, true, vec![vec![cover("cover-1"), submit(1)]])]);
    let mut s = store(vec![]);
    s.settings.ai_cover_letter_prompt = "Profile: {profile.json}\nRole: {Job Description}".into();
    let mut e = engine(p, s, CannedText::new("Dear team, hire me."));

    assert_eq!(e.advance().await, AutomationState::Idle);
    assert_eq!(
        e.page().observed_value("cover-1").as_deref(),
        Some("Dear team, hire me.")
    );
    let record = &e.host().outcomes()[0];
    assert_eq!(record.status, OutcomeStatus::Applied);
    assert!(record.content_generated);
    assert!(!record.questions_answered);

    let prompts = e.host().generator().unwrap().prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Build reliable systems for team 1."));
    assert!(prompts[0].contains("\"phone\": \"555-0100\""));
    assert_eq!(visited(&e, AutomationState::GeneratingContent), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_generation_leaves_field_blank_and_continues() {
    let p = page(vec![job(1, true, vec![vec![cover("cover-1"), submit(1)]])]);
    let mut s = store(vec![]);
    s.settings.ai_cover_letter_prompt = "Write about {Job Description}".into();
    let mut e = engine(p, s, CannedText::empty());

    assert_eq!(e.advance().await, AutomationState::Idle);
    assert_eq!(e.page().observed_value("cover-1").as_deref(), Some(""));
    assert_eq!(visited(&e, AutomationState::GeneratingContent), 1);
    let record = &e.host().outcomes()[0];
    assert_eq!(record.status, OutcomeStatus::Applied);
    assert!(!record.content_generated);
}

#[tokio::test(start_paused = true)]
async fn suggestion_is_offered_when_enabled() {
    let p = page(vec![job(1, true, vec![vec![question("q-1", RELOCATE), submit(1)]])]);
    let mut s = store(vec![]);
    s.settings.ai_question_prompt = "Answer {the question} for {Job Description}".into();
    let config = EngineConfig {
        suggest_answers: true,
        ..Default::default()
    };
    let host = LocalHost::new(s).with_generator(CannedText::new("Yes"));
    let mut e = Engine::new(p, host, config);
    e.start(bot()).unwrap();

    assert_eq!(e.advance().await, AutomationState::AwaitingHumanInput);
    let pending = e.pending_question().unwrap();
    assert_eq!(pending.suggestion.as_deref(), Some("Yes"));
    let prompts = e.host().generator().unwrap().prompts();
    assert!(prompts[0].contains(RELOCATE));
}

#[tokio::test(start_paused = true)]
async fn stuck_form_fails_and_restart_skips_the_job() {
    let stuck = job(1, true, vec![vec![question("q-1", SALARY)]]);
    let p = page(vec![stuck]);
    let mut e = engine(p, store(vec![KnownQuestion::answered(SALARY, "100k")]), CannedText::empty());

    assert_eq!(e.advance().await, AutomationState::Failed);
    let failure = e.last_failure().unwrap();
    assert_eq!(failure.kind, FailureKind::StuckForm);
    assert!(failure.message.contains(LISTING_URL));
    assert_eq!(statuses(&e), vec![OutcomeStatus::ApplicationError]);
    assert_eq!(e.host().outcomes()[0].job_title, "Engineer 1");

    e.start(bot()).unwrap();
    assert_eq!(e.advance().await, AutomationState::Idle);
    assert_eq!(e.host().outcomes().len(), 1);
    assert_eq!(e.page().clicks("title-1"), 1);
}

#[tokio::test(start_paused = true)]
async fn start_is_refused_while_a_session_runs() {
    let p = page(vec![job(1, true, vec![vec![question("q-1", RELOCATE), submit(1)]])]);
    let mut e = engine(p, store(vec![]), CannedText::empty());
    e.advance().await;
    assert!(e.start(bot()).is_err());
    assert_eq!(e.state(), AutomationState::AwaitingHumanInput);
}

#[tokio::test(start_paused = true)]
async fn stop_while_awaiting_human_forces_idle() {
    let p = page(vec![job(1, true, vec![vec![question("q-1", RELOCATE), submit(1)]])]);
    let mut e = engine(p, store(vec![]), CannedText::empty());
    assert_eq!(e.advance().await, AutomationState::AwaitingHumanInput);

    let handle = e.stop_handle();
    let mut states = e.subscribe();
    handle.stop();
    assert_eq!(e.advance().await, AutomationState::Idle);
    assert!(e.pending_question().is_none());
    assert!(e.current_job().is_none());
    assert_eq!(*states.borrow_and_update(), AutomationState::Idle);
    assert_eq!(e.host().count("session-idle"), 1);
    assert!(e.host().outcomes().is_empty());
    assert!(matches!(
        e.resolve_gate(GateResolution::Skip).await,
        Err(GateError::NotOpen)
    ));
}

#[tokio::test(start_paused = true)]
async fn stop_before_resolving_the_gate_discards_the_resolution() {
    for resolution in [GateResolution::Skip, GateResolution::Answer("Yes".into())] {
        let p = page(vec![job(1, true, vec![vec![question("q-1", RELOCATE), submit(1)]])]);
        let mut e = engine(p, store(vec![]), CannedText::empty());
        assert_eq!(e.advance().await, AutomationState::AwaitingHumanInput);

        e.stop_handle().stop();
        assert_eq!(e.resolve_gate(resolution).await.unwrap(), AutomationState::Idle);
        assert_eq!(e.state(), AutomationState::Idle);
        assert!(e.pending_question().is_none());
        assert!(e.current_job().is_none());
        assert!(e.host().outcomes().is_empty());
        assert_eq!(e.host().count("report-answer"), 0);
        assert!(e.host().store().questions[0].is_unresolved);
        assert_eq!(e.page().observed_value("q-1").as_deref(), Some(""));
        assert_eq!(e.host().count("session-idle"), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn many_answered_questions_on_one_step_still_complete() {
    let limit = EngineConfig::default().limits.max_form_steps as usize;
    let mut step: Vec<Value> = (0..limit + 5)
        .map(|i| question(&format!("q-{i}"), &format!("Question number {i}?")))
        .collect();
    step.push(submit(1));
    let p = page(vec![job(1, true, vec![step])]);
    let mut e = engine(p, store(vec![]), CannedText::empty());

    let mut answered = 0;
    let state = loop {
        match e.advance().await {
            AutomationState::AwaitingHumanInput => {
                e.resolve_gate(GateResolution::Answer("Yes".into())).await.unwrap();
                answered += 1;
            }
            state if state.is_terminal() => break state,
            _ => {}
        }
    };

    assert_eq!(answered, limit + 5);
    assert_eq!(state, AutomationState::Idle);
    assert!(e.last_failure().is_none());
    assert_eq!(statuses(&e), vec![OutcomeStatus::Applied]);
}

/// Host that raises the stop signal while a generation request is in flight.
struct StopDuringGeneration {
    inner: LocalHost<CannedText>,
    stop: Arc<OnceLock<StopHandle>>,
}

impl Host for StopDuringGeneration {
    async fn fetch_profile_and_settings(&mut self) -> Result<(Profile, Settings), HostError> {
        self.inner.fetch_profile_and_settings().await
    }

    async fn fetch_known_questions(&mut self) -> Result<Vec<KnownQuestion>, HostError> {
        self.inner.fetch_known_questions().await
    }

    async fn report_new_question(&mut self, question: &str) -> Result<(), HostError> {
        self.inner.report_new_question(question).await
    }

    async fn report_answer(&mut self, question: &str, answer: &str) -> Result<AnswerAck, HostError> {
        self.inner.report_answer(question, answer).await
    }

    async fn request_generated_text(&mut self, prompt: &str) -> Option<String> {
        if let Some(stop) = self.stop.get() {
            stop.stop();
        }
        self.inner.request_generated_text(prompt).await
    }

    async fn log_outcome(&mut self, record: &OutcomeRecord) -> Result<(), HostError> {
        self.inner.log_outcome(record).await
    }

    async fn session_idle(&mut self, bot_id: &str) {
        self.inner.session_idle(bot_id).await
    }
}

#[tokio::test(start_paused = true)]
async fn stop_during_a_step_discards_its_transition() {
    let p = page(vec![job(1, true, vec![vec![cover("cover-1"), submit(1)]])]);
    let mut s = store(vec![]);
    s.settings.ai_cover_letter_prompt = "Role: {Job Description}".into();
    let slot = Arc::new(OnceLock::new());
    let host = StopDuringGeneration {
        inner: LocalHost::new(s).with_generator(CannedText::new("Hello")),
        stop: slot.clone(),
    };
    let mut e = Engine::new(p, host, EngineConfig::default());
    let _ = slot.set(e.stop_handle());
    e.start(bot()).unwrap();

    assert_eq!(e.advance().await, AutomationState::Idle);
    let last = *e.history().last().unwrap();
    assert_eq!(
        last,
        Transition {
            from: AutomationState::GeneratingContent,
            to: AutomationState::Idle
        }
    );
    assert_eq!(e.page().clicks("submit-1"), 0);
    assert!(e.host().inner.outcomes().is_empty());
    assert_eq!(e.host().inner.count("session-idle"), 1);
}

#[tokio::test(start_paused = true)]
async fn transition_budget_yields_control() {
    let p = page(vec![job(1, true, vec![vec![submit(1)]])]);
    let mut config = EngineConfig::default();
    config.limits.max_transitions_per_advance = 2;
    let host = LocalHost::new(store(vec![])).with_generator(CannedText::empty());
    let mut e = Engine::new(p, host, config);
    e.start(bot()).unwrap();

    assert_eq!(e.advance().await, AutomationState::ScanningListing);
    assert_eq!(e.advance().await, AutomationState::ApplyFlowStarted);
    let mut state = e.state();
    while !state.is_terminal() {
        state = e.advance().await;
    }
    assert_eq!(state, AutomationState::Idle);
    assert_eq!(statuses(&e), vec![OutcomeStatus::Applied]);
}

#[tokio::test(start_paused = true)]
async fn answers_persist_in_the_store_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    store(vec![]).save(&path).unwrap();

    let p = page(vec![job(1, true, vec![vec![question("q-1", RELOCATE), submit(1)]])]);
    let host = LocalHost::open(path.clone())
        .unwrap()
        .with_generator(CannedText::empty());
    let mut e = Engine::new(p, host, EngineConfig::default());
    e.start(bot()).unwrap();

    e.advance().await;
    let reported = Store::load(&path).unwrap();
    assert!(reported.questions[0].is_unresolved);

    e.resolve_gate(GateResolution::Answer("Yes".into())).await.unwrap();
    let answered = Store::load(&path).unwrap();
    assert_eq!(answered.questions[0].answer, "Yes");
    assert!(!answered.questions[0].is_unresolved);
}

#[tokio::test(start_paused = true)]
async fn bundled_demo_page_runs_to_idle() {
    let mut s = store(vec![KnownQuestion::answered(
        "How many years of Rust experience do you have?",
        "6",
    )]);
    s.settings.ai_cover_letter_prompt = "Cover letter for {Job Description}".into();
    let mut resilience = default_resilience_map();
    resilience.retain(|name, _| name == names::FOLLOW_COMPANY_CHECKBOX);
    s.settings.selector_resilience = resilience;

    let page = MemoryPage::demo().unwrap();
    let host = LocalHost::new(s).with_generator(CannedText::new("Dear Ferrous Labs"));
    let mut e = Engine::new(page, host, EngineConfig::default());
    e.start(BotDescriptor {
        listing_url: "https://jobs.example/search?keywords=rust".into(),
        ..bot()
    })
    .unwrap();

    assert_eq!(e.advance().await, AutomationState::AwaitingHumanInput);
    assert_eq!(
        statuses(&e),
        vec![OutcomeStatus::Applied, OutcomeStatus::SkippedActionUnavailable]
    );
    e.resolve_gate(GateResolution::Answer("Yes".into())).await.unwrap();
    assert_eq!(e.advance().await, AutomationState::Idle);

    assert_eq!(
        statuses(&e),
        vec![
            OutcomeStatus::Applied,
            OutcomeStatus::SkippedActionUnavailable,
            OutcomeStatus::Applied
        ]
    );
    let first = &e.host().outcomes()[0];
    assert_eq!(first.job_title, "Senior Rust Engineer");
    assert!(first.content_generated);
    assert!(first.questions_answered);
    assert!(!e.page().is_checked("follow-1"));
    assert_eq!(e.page().observed_value("email-1").as_deref(), Some("ada@ferrous.example"));
    assert_eq!(e.page().observed_value("phone-3").as_deref(), Some("555-0100"));
    assert!(e.page().navigations().is_empty());
}
