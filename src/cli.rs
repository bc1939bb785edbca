//! Interface de linha de comando do autoapply baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (demo, run, questions,
//! answer, status) e flags globais (--verbose, --config, --store).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// autoapply: candidaturas automáticas com checkpoints humanos.
#[derive(Debug, Parser)]
#[command(name = "autoapply", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Caminho do arquivo de configuração (padrão: ./autoapply.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Caminho do store JSON; sobrescreve `store_path` da configuração.
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa a demonstração embutida sobre uma página de vagas gravada.
    Demo {
        /// Responde automaticamente qualquer pergunta nova com este texto.
        #[arg(long, conflicts_with = "skip")]
        answer: Option<String>,

        /// Pula automaticamente toda vaga que trouxer uma pergunta nova.
        #[arg(long)]
        skip: bool,
    },

    /// Executa uma sessão sobre uma página gravada usando o store persistente.
    Run {
        /// Fixture JSON da página de listagem.
        #[arg(long)]
        page: PathBuf,

        /// Id do bot no store (padrão: o primeiro bot).
        #[arg(long)]
        bot: Option<String>,
    },

    /// Lista as perguntas conhecidas, pendentes primeiro.
    Questions {
        /// Mostra apenas perguntas sem resposta.
        #[arg(long)]
        unresolved: bool,
    },

    /// Grava a resposta de uma pergunta já conhecida.
    Answer {
        /// Texto exato da pergunta.
        question: String,
        /// Resposta a gravar.
        answer: String,
    },

    /// Mostra bots, perfil e contagem de perguntas do store.
    Status,
}
