use chrono::{DateTime, Utc};

use super::allocator::AllocationError;
use super::domain::{ActivationRecord, ActivationStats, Promo, PromoId, UserId, UserProfile};

/// Outcome of an atomic allocation: the code to deliver and whether it is a
/// re-delivery of a previously claimed unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedCode {
    pub code: String,
    pub repeat: bool,
}

/// Storage abstraction so the activation engine can be exercised in
/// isolation.
///
/// `allocate_activation` is the concurrency-critical operation: it must
/// re-check for an existing (user, promo) record, claim a unit, and insert
/// the activation record as one atomic step per promo. Implementations back
/// this with row-level locking or an equivalent serialized section.
pub trait PromoRepository: Send + Sync {
    fn insert_promo(&self, promo: Promo) -> Result<Promo, RepositoryError>;
    fn update_promo(&self, promo: Promo) -> Result<(), RepositoryError>;
    fn fetch_promo(&self, id: &PromoId) -> Result<Option<Promo>, RepositoryError>;
    /// Every stored promo, newest first. Targeting filters are applied by
    /// the caller.
    fn list_promos(&self) -> Result<Vec<Promo>, RepositoryError>;

    fn upsert_user(&self, user: UserProfile) -> Result<(), RepositoryError>;
    fn fetch_user(&self, id: &UserId) -> Result<Option<UserProfile>, RepositoryError>;

    fn activation(
        &self,
        user: &UserId,
        promo: &PromoId,
    ) -> Result<Option<ActivationRecord>, RepositoryError>;
    /// The user's activation records, newest first, plus the total count
    /// before pagination.
    fn activation_history(
        &self,
        user: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<ActivationRecord>, usize), RepositoryError>;
    fn activation_stats(&self, promo: &PromoId) -> Result<ActivationStats, RepositoryError>;

    /// Atomically deliver one redemption unit to `user`.
    ///
    /// An existing record for the pair is re-delivered (its delivery count
    /// bumped, no unit consumed); otherwise one unit is claimed and the
    /// record inserted, all-or-nothing. Exhaustion surfaces as
    /// [`RepositoryError::Allocation`].
    fn allocate_activation(
        &self,
        promo: &PromoId,
        user: &UserId,
        at: DateTime<Utc>,
    ) -> Result<AllocatedCode, RepositoryError>;
}

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
