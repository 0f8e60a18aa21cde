//! Memoização de uma computação com cache LRU e persistência em lote.
//!
//! Fluxo de uma chamada:
//!
//! 1. `KeyCodec` gera a chave a partir dos argumentos
//! 2. `BoundedCache` busca a chave (acerto: promove e retorna; erro:
//!    executa a computação, armazena e remove a entrada menos recente se
//!    necessário)
//! 3. `PersistenceManager` conta a nova entrada e grava um snapshot quando o
//!    lote é atingido
//!
//! ## Exemplo de Uso
//!
//! ```
//! use wrappy::cache::Memoizer;
//! use wrappy::{MemoizeConfig, WrappyError};
//!
//! let mut square = Memoizer::<u64>::new("square", MemoizeConfig::with_limit(100)).unwrap();
//!
//! let first = square.call(&[&12u64], &(), || Ok::<_, WrappyError>(144)).unwrap();
//! assert!(!first.was_hit);
//!
//! let second = square.call(&[&12u64], &(), || Ok::<_, WrappyError>(0)).unwrap();
//! assert!(second.was_hit);
//! assert_eq!(*second.value, 144);
//! ```

use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::config::MemoizeConfig;
use crate::{WrappyError, WrappyResult};

use super::key::KeyCodec;
use super::lru::{BoundedCache, CacheEntry, CacheStats};
use super::persist::PersistenceManager;

/// Resultado de uma chamada memoizada.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup<V> {
    /// Valor retornado.
    ///
    /// Compartilhado com o cache, a menos que `return_copy` esteja ativo.
    pub value: Arc<V>,

    /// Se o valor veio do cache.
    pub was_hit: bool,
}

impl<V: Clone> Lookup<V> {
    /// Extrai o valor, clonando apenas se ele ainda for compartilhado.
    pub fn into_owned(self) -> V {
        Arc::try_unwrap(self.value).unwrap_or_else(|shared| V::clone(&shared))
    }
}

/// Cache de resultados de uma computação.
///
/// Cada instância pertence ao componente que envolve a computação; não há
/// estado global.
pub struct Memoizer<V> {
    name: String,
    config: MemoizeConfig,
    cache: BoundedCache<Arc<V>>,
    persistence: PersistenceManager,
}

impl<V> Memoizer<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    /// Cria o cache, carregando o snapshot configurado se existir.
    ///
    /// # Erros
    /// - `WrappyError::Config` para limites não positivos
    /// - `WrappyError::PersistFormat` se o snapshot existente for inválido
    pub fn new<S: Into<String>>(name: S, config: MemoizeConfig) -> WrappyResult<Self> {
        let name = name.into();
        config.validate()?;

        let persistence =
            PersistenceManager::new(config.persist_path.clone(), config.persist_batch_size)?;
        let mut cache = BoundedCache::new(config.cache_limit)?;

        if let Some(path) = persistence.path() {
            tracing::info!(
                name = %name,
                path = %path.display(),
                "Persisting memoized output"
            );
        }

        let restored: Vec<CacheEntry<Arc<V>>> = persistence.initialize()?;
        if !restored.is_empty() {
            let count = restored.len();
            let dropped = cache.extend_lru_first(restored);
            tracing::debug!(name = %name, restored = count, dropped, "Cache restored");
        }

        Ok(Self {
            name,
            config,
            cache,
            persistence,
        })
    }

    /// Busca `key`, executando `compute` apenas em caso de miss.
    ///
    /// Erros de `compute` são devolvidos sem modificação. Uma falha ao gravar
    /// o snapshot é apenas registrada no log.
    pub fn get_or_compute<F, E>(&mut self, key: &str, compute: F) -> Result<Lookup<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let (value, was_hit) = {
            let (value, was_hit) = self
                .cache
                .get_or_compute(key, || compute().map(Arc::new))?;
            (Arc::clone(value), was_hit)
        };

        if !was_hit {
            self.persistence.record_mutation();
            self.flush_if_due();
        }

        let value = if self.config.return_copy {
            Arc::new(V::clone(&value))
        } else {
            value
        };

        Ok(Lookup { value, was_hit })
    }

    /// Gera a chave a partir dos argumentos e delega para [`Self::get_or_compute`].
    ///
    /// Erros na geração da chave são convertidos para o erro do chamador.
    pub fn call<N, F, E>(
        &mut self,
        positional: &[&dyn Debug],
        named: &N,
        compute: F,
    ) -> Result<Lookup<V>, E>
    where
        N: Serialize + ?Sized,
        F: FnOnce() -> Result<V, E>,
        E: From<WrappyError>,
    {
        let key = KeyCodec::render(positional, named)?;
        self.get_or_compute(&key, compute)
    }

    /// Grava o snapshot imediatamente.
    pub fn flush(&mut self) -> WrappyResult<()> {
        self.persistence.flush(&self.cache)
    }

    fn flush_if_due(&mut self) {
        match self.persistence.maybe_flush(&self.cache) {
            Ok(true) => {
                tracing::debug!(name = %self.name, entries = self.cache.size(), "Batch persisted");
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(
                    name = %self.name,
                    error = %e,
                    pending = self.persistence.pending_mutations(),
                    "Snapshot flush failed, will retry on next new entry"
                );
            }
        }
    }
}

impl<V> Memoizer<V> {
    /// Nome usado nos logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configuração em uso.
    pub fn config(&self) -> &MemoizeConfig {
        &self.config
    }

    /// Número de entradas.
    pub fn size(&self) -> usize {
        self.cache.size()
    }

    /// Verifica se a chave está presente (sem promovê-la).
    pub fn contains(&self, key: &str) -> bool {
        self.cache.contains(key)
    }

    /// Chaves da menos para a mais recente.
    pub fn keys_lru_first(&self) -> Vec<&str> {
        self.cache.keys_lru_first()
    }

    /// Novas entradas desde o último snapshot gravado.
    pub fn pending_mutations(&self) -> usize {
        self.persistence.pending_mutations()
    }

    /// Retorna estatísticas do cache.
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// [`Memoizer`] protegido por mutex para uso entre threads.
///
/// A sequência busca → computação → inserção → remoção → flush roda inteira
/// sob o lock, então cada chave é computada no máximo uma vez.
///
/// O lock não é reentrante: `compute` não pode chamar o mesmo
/// `SyncMemoizer` (a thread travaria ou entraria em pânico). Definições
/// recursivas devem obter os sub-resultados antes da chamada:
///
/// ```
/// use std::convert::Infallible;
/// use wrappy::{MemoizeConfig, SyncMemoizer};
///
/// fn factorial(memo: &SyncMemoizer<u64>, n: u64) -> u64 {
///     let prev = if n <= 1 { 1 } else { factorial(memo, n - 1) };
///     let lookup = memo
///         .get_or_compute(&n.to_string(), || Ok::<_, Infallible>(prev * n.max(1)))
///         .unwrap();
///     *lookup.value
/// }
///
/// let memo = SyncMemoizer::new("factorial", MemoizeConfig::with_limit(32)).unwrap();
/// assert_eq!(factorial(&memo, 10), 3_628_800);
/// ```
pub struct SyncMemoizer<V> {
    inner: Mutex<Memoizer<V>>,
}

impl<V> SyncMemoizer<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    /// Cria o cache compartilhado.
    pub fn new<S: Into<String>>(name: S, config: MemoizeConfig) -> WrappyResult<Self> {
        Ok(Self::from(Memoizer::new(name, config)?))
    }

    /// Ver [`Memoizer::get_or_compute`].
    pub fn get_or_compute<F, E>(&self, key: &str, compute: F) -> Result<Lookup<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        self.lock().get_or_compute(key, compute)
    }

    /// Ver [`Memoizer::call`].
    pub fn call<N, F, E>(
        &self,
        positional: &[&dyn Debug],
        named: &N,
        compute: F,
    ) -> Result<Lookup<V>, E>
    where
        N: Serialize + ?Sized,
        F: FnOnce() -> Result<V, E>,
        E: From<WrappyError>,
    {
        self.lock().call(positional, named, compute)
    }

    /// Grava o snapshot imediatamente.
    pub fn flush(&self) -> WrappyResult<()> {
        self.lock().flush()
    }
}

impl<V> SyncMemoizer<V> {
    /// Número de entradas.
    pub fn size(&self) -> usize {
        self.lock().size()
    }

    /// Verifica se a chave está presente (sem promovê-la).
    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    /// Novas entradas desde o último snapshot gravado.
    pub fn pending_mutations(&self) -> usize {
        self.lock().pending_mutations()
    }

    /// Retorna estatísticas do cache.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats()
    }

    /// Devolve o [`Memoizer`] interno.
    pub fn into_inner(self) -> Memoizer<V> {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    // Invariantes do cache valem ao fim de cada operação, então um lock
    // envenenado por pânico na computação pode ser reaproveitado.
    fn lock(&self) -> MutexGuard<'_, Memoizer<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V> From<Memoizer<V>> for SyncMemoizer<V> {
    fn from(memoizer: Memoizer<V>) -> Self {
        Self {
            inner: Mutex::new(memoizer),
        }
    }
}
