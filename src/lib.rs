//! # wrappy
//!
//! Wrappers utilitários para computações, com foco em memoização.
//!
//! O [`Memoizer`](cache::Memoizer) guarda resultados em um cache LRU limitado
//! e, opcionalmente, persiste o cache em disco a cada lote de novas entradas.
//!
//! ## Módulos
//!
//! - [`cache`] - Chaves, cache LRU, snapshots e memoização
//! - [`wrap`] - `probe`, `guard` e `todo`
//! - [`cli`] - Interface de linha de comando
//! - [`types`] - Configuração e erros

pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod types;
pub mod wrap;

pub use cache::{KeyCodec, Lookup, Memoizer, NamedArgs, SyncMemoizer};
pub use types::config::{Config, MemoizeConfig};
pub use types::errors::{WrappyError, WrappyResult};
