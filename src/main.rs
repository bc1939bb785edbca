mod cli;
mod ui;

use std::path::Path;

use anyhow::{Context, Result, bail};
use autoapply::config::{EngineConfig, TimingConfig};
use autoapply::dom::{MemoryPage, Page};
use autoapply::EngineError;
use autoapply::engine::Engine;
use autoapply::gate::{GateResolution, PendingQuestion};
use autoapply::gemini::{CannedText, GeminiClient, TextGenerator};
use autoapply::host::{AnswerAck, Control, Host, LocalHost, Response, SessionRegistry, Store};
use autoapply::selectors::{default_resilience_map, names};
use autoapply::session::{BotDescriptor, KnownQuestion, Profile};
use autoapply::sheets::SheetsLogger;
use autoapply::state_machine::AutomationState;
use clap::Parser;
use cli::{Cli, Command};
use console::Style;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ui::SessionProgress;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "autoapply=debug" } else { "autoapply=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load_from(path),
        None => EngineConfig::load(),
    }
    .context("Failed to load configuration")?;
    if let Some(store) = cli.store {
        config.store_path = store;
    }

    let registry = SessionRegistry::new();
    {
        let registry = registry.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let stopped = registry.stop_all();
                info!(stopped, "interrupt received, stopping sessions");
            }
        });
    }

    match cli.command {
        Command::Demo { answer, skip } => {
            let policy = match (answer, skip) {
                (Some(text), _) => GatePolicy::Answer(text),
                (None, true) => GatePolicy::Skip,
                (None, false) => GatePolicy::Prompt,
            };
            demo(config, &registry, policy).await
        }
        Command::Run { page, bot } => run_page(config, &registry, &page, bot.as_deref()).await,
        Command::Questions { unresolved } => list_questions(&config, unresolved),
        Command::Answer { question, answer } => store_answer(config, &question, &answer).await,
        Command::Status => status(&config),
    }
}

/// How an open human gate is resolved.
enum GatePolicy {
    Prompt,
    Answer(String),
    Skip,
}

impl GatePolicy {
    fn resolve(&self, pending: &PendingQuestion) -> Result<GateResolution> {
        match self {
            GatePolicy::Prompt => ui::prompt_gate(pending),
            GatePolicy::Answer(text) => Ok(GateResolution::Answer(text.clone())),
            GatePolicy::Skip => Ok(GateResolution::Skip),
        }
    }
}

async fn demo(mut config: EngineConfig, registry: &SessionRegistry, policy: GatePolicy) -> Result<()> {
    config.timing = demo_timing();
    let page = MemoryPage::demo().context("Failed to load the demo page")?;
    let listing_url = page.current_url().await?;
    let bot = BotDescriptor {
        id: "demo".into(),
        name: "Demo bot".into(),
        listing_url,
    };
    let generator = CannedText::new(
        "Dear hiring team,\n\nI have shipped Rust services to production for six years \
         and would love to bring that experience to your team.\n\nBest regards,\nAda",
    );
    let host = LocalHost::new(demo_store()).with_generator(generator);

    let mut engine = Engine::new(page, host, config);
    let state = drive(&mut engine, bot, registry, &policy).await?;
    print_summary(engine.host().outcomes_logged(), state);
    Ok(())
}

async fn run_page(
    config: EngineConfig,
    registry: &SessionRegistry,
    page_path: &Path,
    bot_id: Option<&str>,
) -> Result<()> {
    let page = MemoryPage::load(page_path)
        .with_context(|| format!("Failed to load page fixture {}", page_path.display()))?;
    let mut host = LocalHost::open(config.store_path.clone())?;

    let store = host.store().clone();
    let bot = match bot_id {
        Some(id) => store.bot(id).cloned(),
        None => store.bots.first().cloned(),
    }
    .ok_or_else(|| EngineError::BotNotFound(bot_id.unwrap_or("(none configured)").to_string()))?;

    let api_key = if config.gemini_api_key.is_empty() {
        store.settings.gemini_api_key.clone()
    } else {
        config.gemini_api_key.clone()
    };
    if !api_key.is_empty() {
        host = host.with_generator(GeminiClient::new(api_key, config.gemini_model.clone()));
    }
    match SheetsLogger::new(
        &store.settings.google_sheet_link,
        &store.settings.google_sheet_api_key,
        &config.sheet_name,
        config.log_columns.clone(),
    ) {
        Ok(logger) => host = host.with_sheets(logger),
        Err(e) => warn!(error = %e, "spreadsheet logging disabled"),
    }

    let mut engine = Engine::new(page, host, config);
    let state = drive(&mut engine, bot, registry, &GatePolicy::Prompt).await?;
    print_summary(engine.host().outcomes_logged(), state);
    Ok(())
}

/// Start a session through the registry and drive it until it is terminal.
async fn drive<P: Page, G: TextGenerator>(
    engine: &mut Engine<P, LocalHost<G>>,
    bot: BotDescriptor,
    registry: &SessionRegistry,
    policy: &GatePolicy,
) -> Result<AutomationState> {
    let progress = SessionProgress::start(&bot.name);
    let bot_id = bot.id.clone();
    let response = registry.apply(Control::StartSession { bot }, |bot| {
        engine.start(bot.clone())?;
        Ok(engine.session_handle())
    });
    if let Response::Error { message } = response {
        bail!("could not start session: {message}");
    }
    progress.follow(engine.subscribe());

    let mut seen = 0;
    let state = loop {
        let state = engine.advance().await;
        progress.update_state(state);
        let logged = engine.host().outcomes_logged();
        let recent = engine.host().outcomes();
        for record in recent.iter().skip(recent.len().saturating_sub(logged - seen)) {
            progress.outcome(record);
        }
        seen = logged;

        match state {
            AutomationState::AwaitingHumanInput => {
                let Some(pending) = engine.pending_question().cloned() else {
                    break state;
                };
                let resolution = progress.suspend(|| policy.resolve(&pending))?;
                if let Err(e) = engine.resolve_gate(resolution).await {
                    warn!(error = %e, "gate resolution rejected");
                    break engine.state();
                }
            }
            state if state.is_terminal() => break state,
            _ => {}
        }
    };

    progress.finish(state, engine.last_failure());
    registry.prune();
    info!(bot_id = %bot_id, %state, "session ended");
    Ok(state)
}

fn print_summary(outcomes: usize, state: AutomationState) {
    let dim = Style::new().dim();
    println!(
        "{}",
        dim.apply_to(format!("{outcomes} outcome(s) logged, final state {state}"))
    );
}

fn list_questions(config: &EngineConfig, unresolved_only: bool) -> Result<()> {
    let store = Store::load(&config.store_path)?;
    let pending = Style::new().yellow().bold();
    let answered = Style::new().green();
    let mut shown = 0;
    for question in store.questions_by_priority() {
        if unresolved_only && !question.is_unresolved {
            continue;
        }
        shown += 1;
        if question.is_unresolved {
            println!("{} {}", pending.apply_to("?"), question.text);
        } else {
            println!("{} {}", answered.apply_to("✓"), question.text);
            println!("    {}", question.answer);
        }
    }
    if shown == 0 {
        println!("No questions stored.");
    }
    Ok(())
}

async fn store_answer(config: EngineConfig, question: &str, answer: &str) -> Result<()> {
    if answer.trim().is_empty() {
        bail!("answer must not be empty");
    }
    let mut host = LocalHost::<CannedText>::open(config.store_path.clone())?;
    match host.report_answer(question, answer.trim()).await? {
        AnswerAck::Stored => println!("{} Answer stored", Style::new().green().apply_to("✓")),
        AnswerAck::NotFound => bail!("question not found in store: {question}"),
    }
    Ok(())
}

fn status(config: &EngineConfig) -> Result<()> {
    let store = Store::load(&config.store_path)?;
    let bold = Style::new().bold();
    let unresolved = store.questions.iter().filter(|q| q.is_unresolved).count();
    let key_set = !store.settings.gemini_api_key.is_empty() || !config.gemini_api_key.is_empty();

    println!("{} {}", bold.apply_to("Store:"), config.store_path.display());
    println!(
        "{} {} field(s)",
        bold.apply_to("Profile:"),
        store.profile.0.len()
    );
    println!(
        "{} {} ({unresolved} unresolved)",
        bold.apply_to("Questions:"),
        store.questions.len()
    );
    println!(
        "{} {}",
        bold.apply_to("Generation key:"),
        if key_set { "configured" } else { "missing" }
    );
    println!("{} {}", bold.apply_to("Bots:"), store.bots.len());
    for bot in &store.bots {
        println!("  {} {} → {}", bot.id, bot.name, bot.listing_url);
    }
    Ok(())
}

fn demo_timing() -> TimingConfig {
    TimingConfig {
        poll_timeout_ms: 600,
        poll_interval_ms: 50,
        probe_timeout_ms: 200,
        probe_interval_ms: 50,
        action_control_timeout_ms: 400,
        success_probe_ms: 200,
        click_settle_ms: 50,
        detail_load_ms: 300,
        apply_modal_ms: 200,
        step_settle_ms: 150,
        scroll_wait_ms: 150,
        cooldown_ms: 300,
        skip_delay_ms: 150,
    }
}

fn demo_store() -> Store {
    let mut store = Store::default();
    if let Ok(profile) = serde_json::from_value::<Profile>(serde_json::json!({
        "name": "Ada Lovelace",
        "email": "ada@example.com",
        "phone": "+44 20 7946 0018",
        "location": "London",
        "experience": [
            { "title": "Senior Rust Engineer", "company": "Analytical Engines Ltd", "years": 6 }
        ],
        "skills": ["Rust", "tokio", "PostgreSQL", "Kubernetes"]
    })) {
        store.profile = profile;
    }
    store.settings.gemini_api_key = "demo".into();
    store.settings.ai_cover_letter_prompt = "Write a short cover letter for this candidate.\n\
         Candidate: {profile.json}\nRole: {Job Description}"
        .into();
    store.settings.ai_question_prompt = "Answer the question in one sentence as the candidate.\n\
         Candidate: {profile.json}\nRole: {Job Description}\nQuestion: {the question}"
        .into();
    let mut resilience = default_resilience_map();
    resilience.retain(|name, _| name == names::FOLLOW_COMPANY_CHECKBOX);
    store.settings.selector_resilience = resilience;
    store.questions = vec![KnownQuestion::answered(
        "How many years of Rust experience do you have?",
        "6",
    )];
    store
}
