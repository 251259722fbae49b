use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::allocator;
use super::domain::{
    ActivationRecord, ActivationStats, CountryActivations, Promo, PromoId, UserId, UserProfile,
};
use super::repository::{AllocatedCode, PromoRepository, RepositoryError};

#[derive(Default)]
struct StoreInner {
    promos: HashMap<PromoId, Promo>,
    users: HashMap<UserId, UserProfile>,
    activations: HashMap<(UserId, PromoId), ActivationRecord>,
}

/// Process-local store backing the activation engine.
///
/// All operations serialize through one mutex, so `allocate_activation`
/// holds the lock for its whole check-claim-record step, the in-memory
/// equivalent of taking the promo row lock for the transaction. A relational
/// implementation would scope the lock to the promo row instead.
#[derive(Default, Clone)]
pub struct InMemoryPromoStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl InMemoryPromoStore {
    fn locked(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().expect("promo store mutex poisoned")
    }
}

impl PromoRepository for InMemoryPromoStore {
    fn insert_promo(&self, promo: Promo) -> Result<Promo, RepositoryError> {
        let mut guard = self.locked();
        if guard.promos.contains_key(&promo.promo_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.promos.insert(promo.promo_id, promo.clone());
        Ok(promo)
    }

    fn update_promo(&self, promo: Promo) -> Result<(), RepositoryError> {
        let mut guard = self.locked();
        if !guard.promos.contains_key(&promo.promo_id) {
            return Err(RepositoryError::NotFound);
        }
        guard.promos.insert(promo.promo_id, promo);
        Ok(())
    }

    fn fetch_promo(&self, id: &PromoId) -> Result<Option<Promo>, RepositoryError> {
        Ok(self.locked().promos.get(id).cloned())
    }

    fn list_promos(&self) -> Result<Vec<Promo>, RepositoryError> {
        let guard = self.locked();
        let mut promos: Vec<Promo> = guard.promos.values().cloned().collect();
        promos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(promos)
    }

    fn upsert_user(&self, user: UserProfile) -> Result<(), RepositoryError> {
        self.locked().users.insert(user.user_id, user);
        Ok(())
    }

    fn fetch_user(&self, id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self.locked().users.get(id).cloned())
    }

    fn activation(
        &self,
        user: &UserId,
        promo: &PromoId,
    ) -> Result<Option<ActivationRecord>, RepositoryError> {
        Ok(self.locked().activations.get(&(*user, *promo)).cloned())
    }

    fn activation_history(
        &self,
        user: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<ActivationRecord>, usize), RepositoryError> {
        let guard = self.locked();
        let mut records: Vec<ActivationRecord> = guard
            .activations
            .values()
            .filter(|record| record.user_id == *user)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.activated_at.cmp(&a.activated_at));

        let total = records.len();
        let page = records.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }

    fn activation_stats(&self, promo: &PromoId) -> Result<ActivationStats, RepositoryError> {
        let guard = self.locked();
        let mut total = 0u64;
        let mut by_country: HashMap<String, u64> = HashMap::new();
        for record in guard.activations.values() {
            if record.promo_id != *promo {
                continue;
            }
            total += 1;
            if let Some(country) = &record.user_country {
                *by_country.entry(country.to_ascii_uppercase()).or_default() += 1;
            }
        }

        let mut countries: Vec<CountryActivations> = by_country
            .into_iter()
            .map(|(country, activations_count)| CountryActivations {
                country,
                activations_count,
            })
            .collect();
        countries.sort_by(|a, b| a.country.cmp(&b.country));

        Ok(ActivationStats {
            activations_count: total,
            countries,
        })
    }

    fn allocate_activation(
        &self,
        promo: &PromoId,
        user: &UserId,
        at: DateTime<Utc>,
    ) -> Result<AllocatedCode, RepositoryError> {
        let mut guard = self.locked();

        let user_country = guard
            .users
            .get(user)
            .ok_or(RepositoryError::NotFound)?
            .country
            .clone();

        // Re-check under the lock: a concurrent first activation by the same
        // user may have recorded between the caller's read and this call.
        if let Some(record) = guard.activations.get_mut(&(*user, *promo)) {
            record.activation_count += 1;
            return Ok(AllocatedCode {
                code: record.code.clone(),
                repeat: true,
            });
        }

        let stored = guard.promos.get_mut(promo).ok_or(RepositoryError::NotFound)?;
        let code = allocator::claim_unit(stored)?;

        guard.activations.insert(
            (*user, *promo),
            ActivationRecord {
                user_id: *user,
                promo_id: *promo,
                code: code.clone(),
                user_country,
                activated_at: at,
                activation_count: 1,
            },
        );

        Ok(AllocatedCode {
            code,
            repeat: false,
        })
    }
}
