//! Interface de terminal do autoapply: spinners, saída colorida e o prompt
//! do portão humano.
//!
//! Usa `indicatif` para o spinner de progresso, `console` para cores e
//! `dialoguer` para perguntar ao usuário quando o motor encontra uma
//! pergunta sem resposta armazenada.

use std::time::Duration;

use anyhow::Result;
use autoapply::Failure;
use autoapply::gate::{GateResolution, PendingQuestion};
use autoapply::state_machine::{AutomationState, OutcomeRecord, OutcomeStatus};
use console::{Style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;

/// Indicador visual de uma sessão de automação no terminal.
///
/// O spinner mostra o estado atual; cada resultado de vaga é impresso acima
/// dele em verde (enviada), amarelo (pulada) ou vermelho (erro).
pub struct SessionProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
}

impl SessionProgress {
    /// Inicia o spinner para o bot informado.
    pub fn start(bot_name: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {prefix:.bold} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_prefix(bot_name.to_string());
        pb.set_message(AutomationState::Initializing.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }

    /// Acompanha as mudanças de estado publicadas pelo motor.
    pub fn follow(&self, mut states: watch::Receiver<AutomationState>) {
        let pb = self.pb.clone();
        tokio::spawn(async move {
            while states.changed().await.is_ok() {
                let state = *states.borrow_and_update();
                pb.set_message(state.to_string());
            }
        });
    }

    pub fn update_state(&self, state: AutomationState) {
        self.pb.set_message(state.to_string());
    }

    /// Imprime um resultado registrado via `log-outcome`.
    pub fn outcome(&self, record: &OutcomeRecord) {
        let (mark, style) = match record.status {
            OutcomeStatus::Applied => ("✓", &self.green),
            OutcomeStatus::SkippedActionUnavailable | OutcomeStatus::SkippedByHuman => {
                ("↷", &self.yellow)
            }
            OutcomeStatus::ApplicationError | OutcomeStatus::SessionError => ("✗", &self.red),
        };
        let job = if record.job_title.is_empty() {
            String::from("(session)")
        } else {
            format!("{} @ {}", record.job_title, record.company)
        };
        let detail = record
            .error
            .as_deref()
            .map(|e| format!(" {}", self.dim.apply_to(format!("({e})"))))
            .unwrap_or_default();
        self.pb.println(format!(
            "  {} {job}: {}{detail}",
            style.apply_to(mark),
            record.status
        ));
    }

    /// Pausa o spinner enquanto `f` usa o terminal (prompts interativos).
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.pb.suspend(f)
    }

    /// Finaliza o spinner e exibe o estado final da sessão.
    pub fn finish(&self, state: AutomationState, failure: Option<&Failure>) {
        self.pb.finish_and_clear();
        match (state, failure) {
            (AutomationState::Failed, Some(failure)) => {
                println!("  {} Session failed: {failure}", self.red.apply_to("✗"));
            }
            (AutomationState::Idle, _) => {
                println!("  {} Session finished, listing exhausted", self.green.apply_to("✓"));
            }
            (other, _) => {
                println!("  {} Session stopped in {other}", self.yellow.apply_to("■"));
            }
        }
    }
}

/// Pergunta ao usuário como resolver a pergunta pendente.
///
/// Sem um terminal interativo a vaga é pulada.
pub fn prompt_gate(pending: &PendingQuestion) -> Result<GateResolution> {
    if !Term::stdout().is_term() {
        return Ok(GateResolution::Skip);
    }
    let theme = ColorfulTheme::default();
    println!();
    println!("{}", Style::new().yellow().bold().apply_to("New question"));
    println!("  {}", pending.question);
    if let Some(suggestion) = &pending.suggestion {
        println!("  {} {suggestion}", Style::new().dim().apply_to("suggested:"));
    }

    let choice = Select::with_theme(&theme)
        .with_prompt("How should this job continue?")
        .items(&["Answer and continue", "Skip this job"])
        .default(0)
        .interact()?;
    if choice == 1 {
        return Ok(GateResolution::Skip);
    }

    let mut input = Input::<String>::with_theme(&theme).with_prompt("Answer");
    if let Some(suggestion) = &pending.suggestion {
        input = input.default(suggestion.clone());
    }
    let answer = input
        .validate_with(|text: &String| -> Result<(), &str> {
            if text.trim().is_empty() {
                Err("answer must not be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    Ok(GateResolution::Answer(answer))
}
