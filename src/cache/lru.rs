//! Cache LRU limitado para resultados de computações.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::{WrappyError, WrappyResult};

/// Uma entrada do cache: chave renderizada e valor computado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    /// Chave gerada pelo `KeyCodec`.
    pub key: String,

    /// Resultado da computação.
    pub value: V,
}

/// Estatísticas do cache.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Número atual de entradas.
    pub size: usize,

    /// Capacidade máxima.
    pub capacity: usize,

    /// Número de acertos (cache hits).
    pub hits: u64,

    /// Número de erros (cache misses).
    pub misses: u64,
}

impl CacheStats {
    /// Calcula a taxa de acerto.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Mapa ordenado chave → valor com tamanho máximo.
///
/// Um acerto move a chave para a ponta mais recente; uma inserção que
/// ultrapassa `cache_limit` remove exatamente a entrada menos recente.
pub struct BoundedCache<V> {
    entries: LruCache<String, V>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> BoundedCache<V> {
    /// Cria um novo cache.
    ///
    /// # Erros
    /// `WrappyError::Config` se `cache_limit` for zero.
    pub fn new(cache_limit: usize) -> WrappyResult<Self> {
        let cap = NonZeroUsize::new(cache_limit)
            .ok_or_else(|| WrappyError::config("cache_limit must be a positive integer"))?;

        Ok(Self {
            entries: LruCache::new(cap),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Busca `key`; se ausente, executa `compute` e armazena o resultado.
    ///
    /// Retorna o valor armazenado e se foi um acerto. Um erro de `compute`
    /// é devolvido sem modificação e nada é armazenado.
    pub fn get_or_compute<F, E>(&mut self, key: &str, compute: F) -> Result<(&V, bool), E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let was_hit = self.entries.contains(key);

        // Próxima vítima, caso a inserção estoure o limite
        let victim = if !was_hit && self.entries.len() == self.entries.cap().get() {
            self.entries.peek_lru().map(|(k, _)| k.clone())
        } else {
            None
        };

        let value = self.entries.try_get_or_insert(key.to_string(), compute)?;

        if was_hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(victim) = victim {
            tracing::debug!(key = %victim, "Evicted least recently used entry");
        }

        Ok((value, was_hit))
    }

    /// Insere uma entrada na ponta mais recente, devolvendo a entrada removida, se houver.
    ///
    /// Se a chave já existir, o valor é substituído e a chave promovida.
    pub fn insert(&mut self, key: String, value: V) -> Option<CacheEntry<V>> {
        self.entries
            .push(key, value)
            .map(|(key, value)| CacheEntry { key, value })
    }

    /// Insere entradas em ordem, da menos para a mais recente.
    ///
    /// Usado para restaurar um snapshot; se houver mais entradas que a
    /// capacidade, as mais antigas são removidas normalmente.
    pub fn extend_lru_first<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = CacheEntry<V>>,
    {
        let mut evicted = 0;
        for entry in entries {
            if let Some(old) = self.insert(entry.key.clone(), entry.value) {
                if old.key != entry.key {
                    evicted += 1;
                }
            }
        }
        evicted
    }

    /// Consulta sem alterar a ordem de recência.
    pub fn peek(&self, key: &str) -> Option<&V> {
        self.entries.peek(key)
    }

    /// Verifica se a chave está presente (sem promovê-la).
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Número de entradas.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Capacidade máxima (`cache_limit`).
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Verifica se o cache está vazio.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Chaves da menos para a mais recente.
    pub fn keys_lru_first(&self) -> Vec<&str> {
        self.entries.iter().rev().map(|(k, _)| k.as_str()).collect()
    }

    /// Entradas da menos para a mais recente, por referência.
    pub fn entries_lru_first(&self) -> impl Iterator<Item = (&String, &V)> {
        self.entries.iter().rev()
    }

    /// Invalida uma entrada específica.
    pub fn invalidate(&mut self, key: &str) -> Option<V> {
        self.entries.pop(key)
    }

    /// Limpa todo o cache.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Retorna estatísticas do cache.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            capacity: self.entries.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
