use tracing::warn;

use crate::{KeyValueStorage, MemoryStorage, Result};

/// Wraps a primary medium and keeps values in memory when the primary
/// rejects a write, so the session keeps reading what it last wrote.
///
/// Values held in the fallback take precedence on reads until the primary
/// accepts a write for the same key again. Primary read errors are passed
/// through; only writes fall back. While any value is held only in memory
/// the wrapper reports itself degraded.
pub struct FallbackStorage<P> {
    primary: P,
    fallback: MemoryStorage,
}

impl<P: KeyValueStorage> FallbackStorage<P> {
    pub fn new(primary: P) -> Self {
        Self {
            primary,
            fallback: MemoryStorage::new(),
        }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    /// Number of keys currently held only in memory.
    pub fn pending_keys(&self) -> usize {
        self.fallback.len()
    }
}

impl<P: KeyValueStorage> KeyValueStorage for FallbackStorage<P> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        if let Some(value) = self.fallback.get(key)? {
            return Ok(Some(value));
        }
        self.primary.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        match self.primary.set(key, value) {
            Ok(()) => self.fallback.remove(key),
            Err(err) => {
                warn!(key, error = %err, "primary storage write failed, keeping value in memory");
                self.fallback.set(key, value)
            }
        }
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.fallback.remove(key)?;
        self.primary.remove(key)
    }

    fn is_degraded(&self) -> bool {
        self.pending_keys() > 0 || self.primary.is_degraded()
    }
}
