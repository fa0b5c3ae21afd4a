use crate::common::Result;
use serde::Deserialize;

/// Size in bytes of one on-disk page. Heap files are a concatenation of
/// pages of exactly this size.
pub const MINNOW_DB_PAGE_SIZE_BYTES: usize = 4096;

/// Maximum number of content bytes in a text field. The encoded width of a
/// text field is this plus a 4-byte length prefix.
pub const MAX_STRING_LEN: usize = 128;

/// Encoded width in bytes of a text field.
pub const STRING_FIELD_BYTES: usize = MAX_STRING_LEN + 4;

/// Default number of pages the buffer pool caches in memory.
pub const DEFAULT_POOL_CAPACITY: usize = 50;

/// Base lock-acquisition timeout. Each transaction adds its own jitter on
/// top of this so symmetric waiters do not abort in lockstep.
pub const LOCK_TIMEOUT_BASE_MS: u64 = 200;

/// Upper bound (exclusive) of the per-transaction lock-timeout jitter.
pub const LOCK_TIMEOUT_JITTER_MS: u64 = 200;

/// Engine settings resolved at startup. Every field has a default; a
/// `minnowdb.toml` next to the working directory may override them, but no
/// configuration file or environment is required.
#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    pub pool_capacity: usize,
    pub lock_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            pool_capacity: DEFAULT_POOL_CAPACITY,
            lock_timeout_ms: LOCK_TIMEOUT_BASE_MS,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Settings> {
        let settings = ::config::Config::builder()
            .set_default("pool_capacity", DEFAULT_POOL_CAPACITY as i64)?
            .set_default("lock_timeout_ms", LOCK_TIMEOUT_BASE_MS as i64)?
            .add_source(::config::File::with_name("minnowdb").required(false))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.pool_capacity, DEFAULT_POOL_CAPACITY);
        assert_eq!(settings.lock_timeout_ms, LOCK_TIMEOUT_BASE_MS);
    }

    #[test]
    fn test_load_without_file() {
        let settings = Settings::load().unwrap();
        assert_eq!(settings.pool_capacity, DEFAULT_POOL_CAPACITY);
    }
}
