//! Persistência do cache em snapshots JSON.
//!
//! Cada flush grava o conteúdo completo do cache (da entrada menos recente
//! para a mais recente) em um arquivo temporário e o move para o destino.
//!
//! Formato do arquivo:
//! - `format`: sempre `"wrappy-snapshot"`
//! - `version`: versão do formato ([`SNAPSHOT_VERSION`])
//! - `saved_at`: data/hora do flush
//! - `checksum`: SHA-256 (hex) da forma JSON compacta de `entries`
//! - `entries`: lista de `{ "key": ..., "value": ... }`

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{WrappyError, WrappyResult};

use super::lru::{BoundedCache, CacheEntry};

/// Identificador gravado em todo snapshot.
pub const SNAPSHOT_FORMAT: &str = "wrappy-snapshot";

/// Versão atual do formato de snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    format: String,
    version: u32,
    saved_at: DateTime<Utc>,
    checksum: String,
    entries: Value,
}

#[derive(Serialize)]
struct EntryRef<'a, V> {
    key: &'a str,
    value: &'a V,
}

/// Controla quando o cache é gravado em disco.
#[derive(Debug)]
pub struct PersistenceManager {
    path: Option<PathBuf>,
    batch_size: usize,
    pending_mutations: usize,
}

impl PersistenceManager {
    /// Cria um gerenciador.
    ///
    /// Sem `path`, a persistência fica desativada e os flushes viram no-op.
    ///
    /// # Erros
    /// `WrappyError::Config` se `batch_size` for zero.
    pub fn new(path: Option<PathBuf>, batch_size: usize) -> WrappyResult<Self> {
        if batch_size == 0 {
            return Err(WrappyError::config(
                "persist_batch_size must be a positive integer",
            ));
        }

        Ok(Self {
            path,
            batch_size,
            pending_mutations: 0,
        })
    }

    /// Caminho do snapshot, se configurado.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Número de novas entradas entre flushes.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Mutações desde o último flush bem-sucedido.
    pub fn pending_mutations(&self) -> usize {
        self.pending_mutations
    }

    /// Carrega o conteúdo inicial do cache.
    ///
    /// Retorna vazio se não houver caminho configurado ou se o arquivo não
    /// existir. Um arquivo existente mas ilegível é erro fatal.
    pub fn initialize<V: DeserializeOwned>(&self) -> WrappyResult<Vec<CacheEntry<V>>> {
        let Some(path) = self.path.as_deref() else {
            return Ok(Vec::new());
        };

        let exists = path
            .try_exists()
            .map_err(|e| WrappyError::persist_format(path, format!("cannot stat: {}", e)))?;
        if !exists {
            tracing::debug!(path = %path.display(), "No snapshot found, starting empty");
            return Ok(Vec::new());
        }

        let entries = read_snapshot(path)?;
        tracing::debug!(
            path = %path.display(),
            entries = entries.len(),
            "Snapshot loaded"
        );
        Ok(entries)
    }

    /// Registra uma nova entrada no cache.
    pub fn record_mutation(&mut self) {
        self.pending_mutations += 1;
    }

    /// Verifica se um flush é devido.
    pub fn flush_due(&self) -> bool {
        self.path.is_some() && self.pending_mutations >= self.batch_size
    }

    /// Grava o cache se o lote de mutações foi atingido.
    ///
    /// Retorna `true` se um snapshot foi gravado. Em caso de erro o contador
    /// não é zerado, então a próxima mutação tenta novamente.
    pub fn maybe_flush<V>(&mut self, cache: &BoundedCache<V>) -> WrappyResult<bool>
    where
        V: Serialize + DeserializeOwned,
    {
        if !self.flush_due() {
            return Ok(false);
        }

        self.flush(cache)?;
        Ok(true)
    }

    /// Grava o cache incondicionalmente (no-op sem caminho configurado).
    pub fn flush<V>(&mut self, cache: &BoundedCache<V>) -> WrappyResult<()>
    where
        V: Serialize + DeserializeOwned,
    {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let written = write_snapshot(path, cache.entries_lru_first())?;
        tracing::debug!(
            path = %path.display(),
            entries = written,
            pending = self.pending_mutations,
            "Snapshot flushed"
        );

        self.pending_mutations = 0;
        Ok(())
    }
}

/// Lê um snapshot, validando formato, versão e checksum.
///
/// As entradas voltam na ordem gravada (menos recente primeiro).
pub fn read_snapshot<V: DeserializeOwned>(path: &Path) -> WrappyResult<Vec<CacheEntry<V>>> {
    let data = std::fs::read(path)
        .map_err(|e| WrappyError::persist_format(path, format!("unreadable: {}", e)))?;

    let snapshot: Snapshot = serde_json::from_slice(&data)
        .map_err(|e| WrappyError::persist_format(path, format!("malformed: {}", e)))?;

    if snapshot.format != SNAPSHOT_FORMAT {
        return Err(WrappyError::persist_format(
            path,
            format!("unexpected format tag '{}'", snapshot.format),
        ));
    }

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(WrappyError::persist_format(
            path,
            format!(
                "unsupported version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            ),
        ));
    }

    let computed = checksum(&snapshot.entries)
        .map_err(|e| WrappyError::persist_format(path, e.to_string()))?;
    if computed != snapshot.checksum {
        tracing::error!(
            path = %path.display(),
            stored = %snapshot.checksum,
            computed = %computed,
            "Snapshot checksum mismatch"
        );
        return Err(WrappyError::persist_format(path, "checksum mismatch"));
    }

    serde_json::from_value(snapshot.entries)
        .map_err(|e| WrappyError::persist_format(path, format!("bad entries: {}", e)))
}

/// Grava um snapshot de forma atômica (arquivo temporário + rename).
///
/// Antes de gravar, confirma que as entradas podem ser lidas de volta
/// (ex.: `f64::NAN` vira `null` em JSON). Nesse caso nada é gravado e o
/// snapshot anterior continua no lugar.
///
/// Retorna o número de entradas gravadas.
pub fn write_snapshot<'a, V, I>(path: &Path, entries: I) -> WrappyResult<usize>
where
    V: Serialize + DeserializeOwned + 'a,
    I: IntoIterator<Item = (&'a String, &'a V)>,
{
    let refs: Vec<EntryRef<'a, V>> = entries
        .into_iter()
        .map(|(key, value)| EntryRef { key, value })
        .collect();
    let count = refs.len();

    let entries = serde_json::to_value(&refs)
        .map_err(|e| WrappyError::persist_write(path, format!("serialization failed: {}", e)))?;
    Vec::<CacheEntry<V>>::deserialize(&entries).map_err(|e| {
        WrappyError::persist_write(path, format!("value not representable in JSON: {}", e))
    })?;
    let checksum = checksum(&entries)
        .map_err(|e| WrappyError::persist_write(path, format!("serialization failed: {}", e)))?;

    let snapshot = Snapshot {
        format: SNAPSHOT_FORMAT.to_string(),
        version: SNAPSHOT_VERSION,
        saved_at: Utc::now(),
        checksum,
        entries,
    };
    let data = serde_json::to_vec(&snapshot)
        .map_err(|e| WrappyError::persist_write(path, format!("serialization failed: {}", e)))?;

    let temp_path = temp_path_for(path);
    std::fs::write(&temp_path, &data)
        .map_err(|e| WrappyError::persist_write(path, format!("write failed: {}", e)))?;

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(WrappyError::persist_write(
            path,
            format!("rename failed: {}", e),
        ));
    }

    Ok(count)
}

fn checksum(entries: &Value) -> serde_json::Result<String> {
    let canonical = serde_json::to_string(entries)?;
    Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tempfile::TempDir;

    fn cache_with(keys: &[(&str, i64)]) -> BoundedCache<i64> {
        let mut cache = BoundedCache::new(16).unwrap();
        for (key, value) in keys {
            let v = *value;
            cache
                .get_or_compute(key, || Ok::<_, Infallible>(v))
                .unwrap();
        }
        cache
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(matches!(
            PersistenceManager::new(None, 0),
            Err(WrappyError::Config(_))
        ));
    }

    #[test]
    fn test_initialize_without_path_is_empty() {
        let manager = PersistenceManager::new(None, 1).unwrap();
        let entries: Vec<CacheEntry<i64>> = manager.initialize().unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_initialize_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let manager = PersistenceManager::new(Some(dir.path().join("none.json")), 1).unwrap();
        let entries: Vec<CacheEntry<i64>> = manager.initialize().unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.json");
        let cache = cache_with(&[("a", 1), ("b", 2), ("c", 3)]);

        let written = write_snapshot(&path, cache.entries_lru_first()).unwrap();
        assert_eq!(written, 3);

        let entries: Vec<CacheEntry<i64>> = read_snapshot(&path).unwrap();
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(entries[2].value, 3);

        // Nenhum arquivo temporário sobra
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_maybe_flush_respects_batch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.json");
        let mut manager = PersistenceManager::new(Some(path.clone()), 2).unwrap();
        let cache = cache_with(&[("a", 1)]);

        manager.record_mutation();
        assert!(!manager.maybe_flush(&cache).unwrap());
        assert!(!path.exists());

        manager.record_mutation();
        assert!(manager.maybe_flush(&cache).unwrap());
        assert!(path.exists());
        assert_eq!(manager.pending_mutations(), 0);
    }

    #[test]
    fn test_flush_without_path_is_noop() {
        let mut manager = PersistenceManager::new(None, 1).unwrap();
        let cache = cache_with(&[("a", 1)]);

        manager.record_mutation();
        manager.record_mutation();
        assert!(!manager.flush_due());
        assert!(!manager.maybe_flush(&cache).unwrap());
        assert_eq!(manager.pending_mutations(), 2);
    }

    #[test]
    fn test_failed_flush_keeps_counter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("snap.json");
        let mut manager = PersistenceManager::new(Some(path.clone()), 1).unwrap();
        let cache = cache_with(&[("a", 1)]);

        manager.record_mutation();
        let err = manager.maybe_flush(&cache).unwrap_err();
        assert!(matches!(err, WrappyError::PersistWrite { .. }));
        assert_eq!(manager.pending_mutations(), 1);

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        assert!(manager.maybe_flush(&cache).unwrap());
        assert_eq!(manager.pending_mutations(), 0);
    }

    #[test]
    fn test_unrepresentable_value_keeps_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.json");
        let mut manager = PersistenceManager::new(Some(path.clone()), 1).unwrap();

        let mut cache: BoundedCache<f64> = BoundedCache::new(4).unwrap();
        cache.get_or_compute("ok", || Ok::<_, Infallible>(1.5)).unwrap();
        manager.record_mutation();
        assert!(manager.maybe_flush(&cache).unwrap());

        cache
            .get_or_compute("nan", || Ok::<_, Infallible>(f64::NAN))
            .unwrap();
        manager.record_mutation();
        let err = manager.maybe_flush(&cache).unwrap_err();
        assert!(matches!(err, WrappyError::PersistWrite { .. }));
        assert!(err.to_string().contains("not representable"));
        assert_eq!(manager.pending_mutations(), 1);
        assert!(!temp_path_for(&path).exists());

        let entries: Vec<CacheEntry<f64>> = manager.initialize().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "ok");
    }

    #[test]
    fn test_initialize_reports_unreachable_snapshot() {
        let dir = TempDir::new().unwrap();
        // Um arquivo no lugar do diretório pai faz o stat falhar com ENOTDIR
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let manager = PersistenceManager::new(Some(blocker.join("snap.json")), 1).unwrap();
        let result: WrappyResult<Vec<CacheEntry<i64>>> = manager.initialize();
        assert!(matches!(result, Err(WrappyError::PersistFormat { .. })));
    }

    #[test]
    fn test_tampered_snapshot_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.json");
        let cache = cache_with(&[("a", 1), ("b", 2)]);
        write_snapshot(&path, cache.entries_lru_first()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let tampered = content.replace("\"value\":2", "\"value\":3");
        assert_ne!(content, tampered);
        std::fs::write(&path, tampered).unwrap();

        let err = read_snapshot::<i64>(&path).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn test_malformed_snapshot_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.json");
        std::fs::write(&path, b"\x80\x04not json").unwrap();

        let manager = PersistenceManager::new(Some(path), 1).unwrap();
        let result: WrappyResult<Vec<CacheEntry<i64>>> = manager.initialize();
        assert!(matches!(result, Err(WrappyError::PersistFormat { .. })));
    }

    #[test]
    fn test_wrong_version_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.json");
        let entries = serde_json::json!([]);
        let body = serde_json::json!({
            "format": SNAPSHOT_FORMAT,
            "version": 99,
            "saved_at": Utc::now(),
            "checksum": checksum(&entries).unwrap(),
            "entries": entries,
        });
        std::fs::write(&path, body.to_string()).unwrap();

        let err = read_snapshot::<i64>(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported version 99"));
    }

    #[test]
    fn test_value_type_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.json");
        let cache = cache_with(&[("a", 1)]);
        write_snapshot(&path, cache.entries_lru_first()).unwrap();

        let err = read_snapshot::<String>(&path).unwrap_err();
        assert!(matches!(err, WrappyError::PersistFormat { .. }));
    }
}
