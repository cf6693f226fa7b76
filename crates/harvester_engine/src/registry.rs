use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use harvest_logging::harvest_info;

use crate::persist::{DataDir, EmailAppender, PersistError};

/// Set of harvested addresses, persisted by appending each new one.
pub struct EmailRegistry {
    inner: Mutex<RegistryInner>,
}

struct RegistryInner {
    seen: HashSet<String>,
    appender: EmailAppender,
}

impl EmailRegistry {
    /// Seed from the existing email table and open it for appending.
    pub fn load(store: &DataDir) -> Result<Self, PersistError> {
        let seen: HashSet<String> = store.load_emails()?.into_iter().collect();
        harvest_info!("Loaded {} known email addresses", seen.len());
        let appender = store.email_appender()?;
        Ok(Self {
            inner: Mutex::new(RegistryInner {
                seen,
                appender,
            }),
        })
    }

    /// Insert `address` as given. Returns whether it was new.
    ///
    /// A new address is appended to the table before the lock is released;
    /// a failed append leaves it unregistered.
    pub fn add(&self, address: &str) -> Result<bool, PersistError> {
        let mut inner = self.lock();
        if inner.seen.contains(address) {
            return Ok(false);
        }
        inner.appender.append(address)?;
        inner.seen.insert(address.to_string());
        Ok(true)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.lock().seen.contains(address)
    }

    pub fn len(&self) -> usize {
        self.lock().seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
