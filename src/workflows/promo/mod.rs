//! Promo campaign distribution and the activation engine.
//!
//! The activation path composes a pure eligibility evaluator, a cache-aware
//! anti-fraud client, and an atomically allocating store. Everything around
//! it (account management, auth, social counters) lives in other subsystems
//! and reaches this module only through identifiers and read-only fields.

pub(crate) mod allocator;
pub mod cache;
pub mod domain;
pub mod eligibility;
pub mod fraud;
pub mod repository;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use allocator::AllocationError;
pub use cache::{InMemoryVerdictCache, VerdictCache, VerdictKey};
pub use domain::{
    ActivationRecord, ActivationStats, CompanyId, CountryActivations, NewPromo, Promo, PromoId,
    PromoKind, PromoOwnerView, PromoPatch, PromoUserView, Target, TargetValidationError, UserId,
    UserProfile,
};
pub use eligibility::{evaluate_activation, is_currently_active, matches_listing, IneligibilityReason};
pub use fraud::{
    FraudChecker, FraudCheckError, FraudGateway, FraudGatewayError, FraudVerdict, HttpFraudGateway,
};
pub use repository::{AllocatedCode, PromoRepository, RepositoryError};
pub use router::promo_router;
pub use service::{
    ActivationReceipt, FeedQuery, PromoService, PromoServiceError, ValidationError,
};
pub use store::InMemoryPromoStore;
