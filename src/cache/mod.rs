//! Cache LRU para resultados de computações.
//!
//! Este módulo implementa a memoização de computações com um cache Least
//! Recently Used (LRU) limitado e persistência opcional em disco, gravada em
//! lotes para amortizar o custo de IO.
//!
//! - [`KeyCodec`] - Chaves canônicas a partir dos argumentos da chamada
//! - [`BoundedCache`] - Mapa ordenado com limite de entradas
//! - [`PersistenceManager`] - Snapshots completos do cache em disco
//! - [`Memoizer`] / [`SyncMemoizer`] - Composição dos três

mod key;
mod lru;
mod memoize;
mod persist;

pub use key::{KeyCodec, NamedArgs};
pub use self::lru::{BoundedCache, CacheEntry, CacheStats};
pub use memoize::{Lookup, Memoizer, SyncMemoizer};
pub use persist::{
    read_snapshot, write_snapshot, PersistenceManager, SNAPSHOT_FORMAT, SNAPSHOT_VERSION,
};
