//! Wrappers para computações.
//!
//! Funções simples, sem estado compartilhado, que podem envolver uma
//! computação (inclusive a `compute` passada a um [`Memoizer`]) em
//! qualquer ordem:
//!
//! - [`probe`]: Registra nome, chamador, argumentos, tempo e retorno
//! - [`guard`]: Substitui um erro por um valor ou computação de fallback
//! - [`todo`]: Stub que sempre falha com `NotImplemented`
//!
//! ## Exemplo de Uso
//!
//! ```
//! use std::convert::Infallible;
//! use wrappy::cache::Memoizer;
//! use wrappy::wrap::{guard, Fallback};
//! use wrappy::MemoizeConfig;
//!
//! fn divide(a: i64, b: i64) -> Result<i64, String> {
//!     a.checked_div(b).ok_or_else(|| "division by zero".to_string())
//! }
//!
//! let mut memo = Memoizer::<i64>::new("divide", MemoizeConfig::with_limit(10)).unwrap();
//! let lookup = memo
//!     .get_or_compute("10/0", || {
//!         Ok::<_, Infallible>(guard("divide", || divide(10, 0), Fallback::Default))
//!     })
//!     .unwrap();
//! assert_eq!(*lookup.value, 0);
//! ```
//!
//! [`Memoizer`]: crate::cache::Memoizer

use std::fmt::{Debug, Display};
use std::panic::Location;
use std::time::Instant;

use crate::{WrappyError, WrappyResult};

/// Mensagem padrão de [`todo`].
pub const TODO_MESSAGE: &str = "This function is not yet implemented.";

// ═══════════════════════════════════════════════════════════════════════════
// probe
// ═══════════════════════════════════════════════════════════════════════════

/// O que o [`probe`] deve registrar além do nome e do tempo.
#[derive(Debug, Clone, Default)]
pub struct ProbeOptions {
    /// Identificação de quem chamou (ex.: `"cli::factorial"`).
    pub caller: Option<String>,

    /// Registra os argumentos.
    pub show_args: bool,

    /// Registra o valor de retorno.
    pub show_returns: bool,
}

impl ProbeOptions {
    /// Cria opções que registram apenas nome e tempo.
    pub fn new() -> Self {
        Self::default()
    }

    /// Usa como chamador a posição (`arquivo:linha`) de quem chamou `here`.
    #[track_caller]
    pub fn here() -> Self {
        let location = Location::caller();
        Self::new().caller(format!("{}:{}", location.file(), location.line()))
    }

    /// Define o chamador.
    pub fn caller<S: Into<String>>(mut self, caller: S) -> Self {
        self.caller = Some(caller.into());
        self
    }

    /// Ativa o registro dos argumentos.
    pub fn show_args(mut self) -> Self {
        self.show_args = true;
        self
    }

    /// Ativa o registro do retorno.
    pub fn show_returns(mut self) -> Self {
        self.show_returns = true;
        self
    }

    /// Ativa todos os registros.
    pub fn verbose() -> Self {
        Self::new().show_args().show_returns()
    }
}

/// Executa `f` emitindo eventos de tracing ao redor da execução.
///
/// O retorno de `f` (inclusive um `Err`) é devolvido sem alteração.
pub fn probe<A, R, F>(name: &str, args: &A, options: &ProbeOptions, f: F) -> R
where
    A: Debug + ?Sized,
    R: Debug,
    F: FnOnce() -> R,
{
    let span = tracing::info_span!("probe", operation = name);
    let _enter = span.enter();

    match &options.caller {
        Some(caller) => tracing::info!(caller = %caller, "Probing {}", name),
        None => tracing::info!("Probing {}", name),
    }

    if options.show_args {
        tracing::info!(args = ?args, "{} args", name);
    }

    let started = Instant::now();
    let retval = f();
    let elapsed = started.elapsed();

    tracing::info!(
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "{} running time: {:?}",
        name,
        elapsed
    );

    if options.show_returns {
        tracing::info!(returns = ?retval, "{} returns", name);
    }

    retval
}

// ═══════════════════════════════════════════════════════════════════════════
// guard
// ═══════════════════════════════════════════════════════════════════════════

/// Computação alternativa usada pelo [`guard`].
pub type FallbackFn<T> = Box<dyn FnOnce() -> anyhow::Result<T>>;

/// O que o [`guard`] retorna quando a computação falha.
pub enum Fallback<T> {
    /// `T::default()`.
    Default,

    /// Um valor fixo.
    Value(T),

    /// Outra computação. Se ela também falhar, retorna `T::default()`.
    With(FallbackFn<T>),
}

impl<T> Fallback<T> {
    /// Cria um fallback a partir de uma computação.
    pub fn with<F>(f: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<T> + 'static,
    {
        Self::With(Box::new(f))
    }
}

impl<T: Debug> Debug for Fallback<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fallback::Default => write!(f, "Fallback::Default"),
            Fallback::Value(v) => write!(f, "Fallback::Value({:?})", v),
            Fallback::With(_) => write!(f, "Fallback::With(..)"),
        }
    }
}

/// Executa `f`; se falhar, registra um aviso e retorna o fallback.
///
/// A forma `Debug` do erro (para `anyhow::Error`, a cadeia de causas) vai
/// para o nível debug. Apenas erros (`Err`) são interceptados; pânicos
/// continuam propagando.
pub fn guard<T, E, F>(name: &str, f: F, fallback: Fallback<T>) -> T
where
    T: Default,
    E: Display + Debug,
    F: FnOnce() -> Result<T, E>,
{
    match f() {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(operation = name, error = %e, "Guarding {}: suppressing error", name);
            tracing::debug!(operation = name, "Guarded error trace: {:?}", e);
            resolve(name, fallback)
        }
    }
}

fn resolve<T: Default>(name: &str, fallback: Fallback<T>) -> T {
    match fallback {
        Fallback::Default => T::default(),
        Fallback::Value(value) => value,
        Fallback::With(f) => f().unwrap_or_else(|e| {
            tracing::warn!(
                operation = name,
                error = %e,
                "Guarding {} fallback: suppressing error",
                name
            );
            tracing::debug!(operation = name, "Guarded fallback trace: {:?}", e);
            T::default()
        }),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// todo
// ═══════════════════════════════════════════════════════════════════════════

/// Stub para computações ainda não implementadas.
///
/// Sempre retorna `WrappyError::NotImplemented`, com `message` ou
/// [`TODO_MESSAGE`].
pub fn todo<T>(message: Option<&str>) -> WrappyResult<T> {
    Err(WrappyError::NotImplemented(
        message.unwrap_or(TODO_MESSAGE).to_string(),
    ))
}
