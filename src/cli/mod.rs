//! Interface de linha de comando do wrappy.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// wrappy - memoização com cache LRU persistente.
#[derive(Parser, Debug)]
#[command(name = "wrappy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Arquivo de configuração.
    #[arg(short, long, default_value = "wrappy.toml")]
    pub config: PathBuf,

    /// Modo verbose.
    #[arg(short, long)]
    pub verbose: bool,

    /// Modo silencioso.
    #[arg(short, long)]
    pub quiet: bool,

    /// Comando a executar.
    #[command(subcommand)]
    pub command: Commands,
}

/// Comandos disponíveis.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cria um wrappy.toml padrão.
    Init {
        /// Diretório de destino (padrão: diretório atual).
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Valida um snapshot e lista suas chaves (mais recentes primeiro).
    Inspect {
        /// Arquivo de snapshot.
        snapshot: PathBuf,

        /// Número máximo de chaves exibidas.
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Calcula fatoriais usando o cache configurado.
    Factorial {
        /// Valores de entrada.
        #[arg(required = true)]
        values: Vec<u64>,
    },

    /// Mostra versão.
    Version,
}
