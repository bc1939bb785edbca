//! Configuração do motor carregada a partir de `autoapply.toml`.
//!
//! A struct [`EngineConfig`] contém temporizações, limites e destinos de log.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `GEMINI_API_KEY` tem precedência sobre a chave gravada no store.

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dom::PollOptions;
use crate::state_machine::LogColumn;

/// Configuração de nível superior carregada de `autoapply.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Caminho do store JSON (perfil, configurações, perguntas, bots).
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Chave da API de geração; sobrescreve a chave do store quando presente.
    #[serde(default)]
    pub gemini_api_key: String,

    /// Modelo usado em `generateContent`.
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// Nome da aba da planilha onde os resultados são anexados.
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,

    /// Ordem fixa das colunas do log de resultados.
    #[serde(default = "default_log_columns")]
    pub log_columns: Vec<LogColumn>,

    /// Pede uma resposta sugerida ao gerador quando o portão humano abre.
    #[serde(default)]
    pub suggest_answers: bool,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Temporizações em milissegundos.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub poll_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub probe_timeout_ms: u64,
    pub probe_interval_ms: u64,
    pub action_control_timeout_ms: u64,
    pub success_probe_ms: u64,
    pub click_settle_ms: u64,
    pub detail_load_ms: u64,
    pub apply_modal_ms: u64,
    pub step_settle_ms: u64,
    pub scroll_wait_ms: u64,
    pub cooldown_ms: u64,
    pub skip_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: 10_000,
            poll_interval_ms: 500,
            probe_timeout_ms: 5_000,
            probe_interval_ms: 200,
            action_control_timeout_ms: 5_000,
            success_probe_ms: 2_000,
            click_settle_ms: 200,
            detail_load_ms: 3_000,
            apply_modal_ms: 2_000,
            step_settle_ms: 1_000,
            scroll_wait_ms: 2_000,
            cooldown_ms: 2_000,
            skip_delay_ms: 1_000,
        }
    }
}

impl TimingConfig {
    /// Polling para interações primárias (10 s / 0,5 s por padrão).
    pub fn primary(&self) -> PollOptions {
        PollOptions::new(self.poll_timeout_ms, self.poll_interval_ms)
    }

    /// Polling para sondas de existência usadas como condição de desvio.
    pub fn probe(&self) -> PollOptions {
        PollOptions::new(self.probe_timeout_ms, self.probe_interval_ms)
    }

    pub fn action_control(&self) -> PollOptions {
        PollOptions::new(self.action_control_timeout_ms, self.poll_interval_ms)
    }

    pub fn success_marker(&self) -> PollOptions {
        PollOptions::new(self.success_probe_ms, self.poll_interval_ms)
    }

    pub fn click_settle(&self) -> Duration {
        Duration::from_millis(self.click_settle_ms)
    }

    pub fn detail_load(&self) -> Duration {
        Duration::from_millis(self.detail_load_ms)
    }

    pub fn apply_modal(&self) -> Duration {
        Duration::from_millis(self.apply_modal_ms)
    }

    pub fn step_settle(&self) -> Duration {
        Duration::from_millis(self.step_settle_ms)
    }

    pub fn scroll_wait(&self) -> Duration {
        Duration::from_millis(self.scroll_wait_ms)
    }

    /// Pausa entre uma candidatura concluída e a próxima varredura.
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn skip_delay(&self) -> Duration {
        Duration::from_millis(self.skip_delay_ms)
    }
}

/// Limites que mantêm os laços do motor finitos.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Ciclos de rolagem por varredura da listagem.
    pub scroll_cycles: u32,
    /// Reenumerações da listagem depois de uma rolagem extra com crescimento.
    pub scan_passes: u32,
    /// Cliques em next ou review por vaga antes de declarar o formulário travado.
    pub max_form_steps: u32,
    /// Transições aplicadas por chamada de `advance()` antes de devolver o controle.
    pub max_transitions_per_advance: u32,
    /// Tamanho do histórico de transições mantido em memória.
    pub history_len: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            scroll_cycles: 3,
            scan_passes: 3,
            max_form_steps: 25,
            max_transitions_per_advance: 500,
            history_len: 256,
        }
    }
}

// Valor padrão para o store: "autoapply-store.json".
fn default_store_path() -> PathBuf {
    PathBuf::from("autoapply-store.json")
}

fn default_gemini_model() -> String {
    "gemini-pro".to_string()
}

fn default_sheet_name() -> String {
    "Sheet1".to_string()
}

fn default_log_columns() -> Vec<LogColumn> {
    LogColumn::DEFAULT_ORDER.to_vec()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            gemini_api_key: String::new(),
            gemini_model: default_gemini_model(),
            sheet_name: default_sheet_name(),
            log_columns: default_log_columns(),
            suggest_answers: false,
            timing: TimingConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Carrega a configuração de `autoapply.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("autoapply.toml"))
    }

    /// Carrega a configuração de um caminho explícito (flag `--config`).
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<EngineConfig>(&contents)?
        } else {
            Self::default()
        };

        if config.log_columns.is_empty() {
            anyhow::bail!("log_columns must name at least one column");
        }

        // Variável de ambiente tem precedência sobre o arquivo para a chave API.
        if let Ok(key) = std::env::var("GEMINI_API_KEY")
            && !key.is_empty()
        {
            config.gemini_api_key = key;
        }

        Ok(config)
    }
}
