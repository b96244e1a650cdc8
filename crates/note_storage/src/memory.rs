use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::{KeyValueStorage, Result, StorageError};

/// In-process medium for tests and headless sessions.
///
/// With a quota set, writes that would push the total size of keys and
/// values past it are rejected, the way browser local storage behaves.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            values: Mutex::new(BTreeMap::new()),
            quota: Some(quota_bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }

    pub fn used_bytes(&self) -> usize {
        used_bytes(&self.values.lock())
    }
}

fn used_bytes(values: &BTreeMap<String, String>) -> usize {
    values.iter().map(|(k, v)| k.len() + v.len()).sum()
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock();
        if let Some(quota) = self.quota {
            let replaced = values.get(key).map(|old| key.len() + old.len()).unwrap_or(0);
            let needed = used_bytes(&values) - replaced + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_owned(),
                    needed,
                    quota,
                });
            }
        }
        values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_values() {
        let storage = MemoryStorage::new();
        assert!(storage.get("missing").expect("get").is_none());

        storage.set("a", "1").expect("set");
        storage.set("a", "2").expect("overwrite");
        assert_eq!(storage.get("a").expect("get").as_deref(), Some("2"));
        assert_eq!(storage.len(), 1);

        storage.remove("a").expect("remove");
        assert!(storage.is_empty());
    }

    #[test]
    fn quota_rejects_oversized_writes() {
        let storage = MemoryStorage::with_quota(10);
        storage.set("key", "1234").expect("fits");

        let err = storage.set("other", "123456").expect_err("over quota");
        assert!(matches!(err, StorageError::QuotaExceeded { quota: 10, .. }));
        assert!(storage.get("other").expect("get").is_none());

        // Replacing a value only counts the difference.
        storage.set("key", "1234567").expect("replace within quota");
        assert_eq!(storage.used_bytes(), 10);
    }
}
