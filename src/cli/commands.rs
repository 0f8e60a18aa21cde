//! Implementação dos comandos CLI do wrappy.

use std::path::{Path, PathBuf};

use crate::cache::{read_snapshot, Memoizer};
use crate::types::config::Config;
use crate::wrap::{guard, probe, Fallback, ProbeOptions};
use crate::{WrappyError, WrappyResult};

/// Writes a default `wrappy.toml` into the specified directory.
pub fn init(path: Option<PathBuf>) -> WrappyResult<()> {
    let target_dir = path.unwrap_or_else(|| PathBuf::from("."));

    // Create directory if it doesn't exist
    if !target_dir.exists() {
        std::fs::create_dir_all(&target_dir)?;
        tracing::info!("Directory created: {}", target_dir.display());
    }

    let config_path = target_dir.join("wrappy.toml");

    if config_path.exists() {
        println!("Configuration already exists at: {}", config_path.display());
        return Ok(());
    }

    Config::default().save(&config_path)?;

    println!("Configuration created at: {}", config_path.display());
    println!();
    println!("Set [memoize].persist_path to keep results between runs.");

    Ok(())
}

/// Validates a snapshot and lists its keys, most recently used first.
pub fn inspect(snapshot: &Path, limit: Option<usize>) -> WrappyResult<()> {
    let entries = read_snapshot::<serde_json::Value>(snapshot)?;
    let shown = limit.unwrap_or(entries.len()).min(entries.len());

    println!("Snapshot: {}", snapshot.display());
    println!("Entries: {}", entries.len());

    for (rank, entry) in entries.iter().rev().take(shown).enumerate() {
        println!("  {:>4}. {} => {}", rank + 1, entry.key, entry.value);
    }

    if shown < entries.len() {
        println!("  ... {} more", entries.len() - shown);
    }

    Ok(())
}

/// Computes factorials through a memoized, guarded and probed computation.
///
/// Overflowing inputs fall back to 0, and the fallback is cached like any
/// other result.
pub fn factorial(values: &[u64], config: &Config) -> WrappyResult<()> {
    let mut memo: Memoizer<u64> = Memoizer::new("factorial", config.memoize.clone())?;
    let options = ProbeOptions::here().show_returns();

    for &n in values {
        let lookup = memo.call(&[&n], &(), || {
            let value = guard(
                "factorial",
                || probe("factorial", &n, &options, || checked_factorial(n)),
                Fallback::Default,
            );
            Ok::<_, WrappyError>(value)
        })?;

        let source = if lookup.was_hit { "cached" } else { "computed" };
        println!("factorial({}) = {} ({})", n, lookup.value, source);
    }

    // Final save; no-op without persist_path
    memo.flush()?;

    let stats = memo.stats();
    println!(
        "Cache: {}/{} entries, {} hits, {} misses",
        stats.size, stats.capacity, stats.hits, stats.misses
    );

    Ok(())
}

/// Shows the version.
pub fn version() {
    println!("wrappy {}", env!("CARGO_PKG_VERSION"));
}

fn checked_factorial(n: u64) -> Result<u64, String> {
    (1..=n).try_fold(1u64, |acc, k| {
        acc.checked_mul(k)
            .ok_or_else(|| format!("factorial({}) overflows u64", n))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_factorial() {
        assert_eq!(checked_factorial(0), Ok(1));
        assert_eq!(checked_factorial(5), Ok(120));
        assert_eq!(checked_factorial(20), Ok(2_432_902_008_176_640_000));
        assert!(checked_factorial(21).is_err());
    }

    #[test]
    fn test_init_creates_config() {
        let dir = tempfile::TempDir::new().unwrap();
        init(Some(dir.path().to_path_buf())).unwrap();

        let config = Config::load(dir.path().join("wrappy.toml")).unwrap();
        assert_eq!(config.memoize.cache_limit, 1000);
    }

    #[test]
    fn test_inspect_missing_snapshot_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = inspect(&dir.path().join("absent.json"), None);
        assert!(matches!(result, Err(WrappyError::PersistFormat { .. })));
    }
}
