//! Tipos de erro do wrappy.

use std::path::PathBuf;

use thiserror::Error;

/// Tipo de resultado padrão do wrappy.
pub type WrappyResult<T> = Result<T, WrappyError>;

/// Erros possíveis no wrappy.
///
/// Erros da computação memoizada não aparecem aqui: eles usam o tipo de erro
/// do próprio chamador e atravessam o cache sem modificação.
#[derive(Error, Debug)]
pub enum WrappyError {
    #[error("Erro de configuração: {0}")]
    Config(String),

    #[error("Falha ao serializar argumentos para a chave de cache: {0}")]
    Serialization(String),

    #[error("Snapshot inválido em {}: {reason}", path.display())]
    PersistFormat { path: PathBuf, reason: String },

    #[error("Falha ao gravar snapshot em {}: {reason}", path.display())]
    PersistWrite { path: PathBuf, reason: String },

    #[error("{0}")]
    NotImplemented(String),

    #[error("Erro de IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("Erro ao parsear TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Erro ao serializar TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl WrappyError {
    /// Cria um erro de configuração.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Cria um erro de serialização de chave.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::Serialization(msg.into())
    }

    /// Cria um erro de formato de snapshot.
    pub fn persist_format<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::PersistFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Cria um erro de gravação de snapshot.
    pub fn persist_write<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::PersistWrite {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
