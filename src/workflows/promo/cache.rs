use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use super::domain::PromoId;

/// Composite key identifying one (user, promo) fraud verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictKey(String);

impl VerdictKey {
    pub fn new(user_email: &str, promo_id: &PromoId) -> Self {
        Self(format!("antifraud:{user_email}:{promo_id}"))
    }

    pub fn composite(&self) -> &str {
        &self.0
    }
}

/// Time-bounded verdict store shared across activation requests.
///
/// Entries past their expiry are misses. Concurrent `put` calls for the same
/// key are last-write-wins; verdicts for a fixed pair are assumed stable
/// within their validity window.
pub trait VerdictCache: Send + Sync {
    fn get(&self, key: &VerdictKey, now: DateTime<Utc>) -> Option<bool>;
    fn put(&self, key: &VerdictKey, approved: bool, expires_at: DateTime<Utc>);
}

#[derive(Debug, Clone)]
struct CachedVerdict {
    approved: bool,
    expires_at: DateTime<Utc>,
}

/// Process-local cache keyed by the composite verdict key.
#[derive(Default, Clone)]
pub struct InMemoryVerdictCache {
    entries: Arc<Mutex<HashMap<String, CachedVerdict>>>,
}

impl VerdictCache for InMemoryVerdictCache {
    fn get(&self, key: &VerdictKey, now: DateTime<Utc>) -> Option<bool> {
        let mut guard = self.entries.lock().expect("verdict cache mutex poisoned");
        match guard.get(key.composite()) {
            Some(entry) if entry.expires_at > now => Some(entry.approved),
            Some(_) => {
                guard.remove(key.composite());
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &VerdictKey, approved: bool, expires_at: DateTime<Utc>) {
        let mut guard = self.entries.lock().expect("verdict cache mutex poisoned");
        guard.insert(
            key.composite().to_string(),
            CachedVerdict {
                approved,
                expires_at,
            },
        );
    }
}
