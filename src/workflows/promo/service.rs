use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use super::cache::VerdictCache;
use super::domain::{
    ActivationStats, CompanyId, NewPromo, Promo, PromoId, PromoKind, PromoOwnerView, PromoPatch,
    PromoUserView, TargetValidationError, UserId, UserProfile,
};
use super::eligibility::{self, IneligibilityReason};
use super::fraud::{FraudChecker, FraudCheckError, FraudGateway};
use super::repository::{AllocatedCode, PromoRepository, RepositoryError};

/// Successful activation result: the code to deliver and whether this was a
/// re-delivery of an earlier redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReceipt {
    pub code: String,
    pub repeat: bool,
}

/// Listing parameters for the user-facing feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedQuery {
    pub category: Option<String>,
    pub active: Option<bool>,
    pub limit: usize,
    pub offset: usize,
}

/// Service composing the eligibility evaluator, fraud checker, and the
/// allocating store behind one activation state machine.
pub struct PromoService<R, G, C> {
    repository: Arc<R>,
    fraud: FraudChecker<G, C>,
}

impl<R, G, C> PromoService<R, G, C>
where
    R: PromoRepository + 'static,
    G: FraudGateway + 'static,
    C: VerdictCache + 'static,
{
    pub fn new(repository: Arc<R>, gateway: Arc<G>, cache: Arc<C>) -> Self {
        Self {
            repository,
            fraud: FraudChecker::new(gateway, cache),
        }
    }

    /// Seam for the out-of-scope account subsystem: make a user profile
    /// visible to targeting and activation.
    pub fn register_user(&self, user: UserProfile) -> Result<(), PromoServiceError> {
        self.repository
            .upsert_user(user)
            .map_err(PromoServiceError::Repository)
    }

    /// Create a campaign owned by `company_id`; the window and targeting are
    /// validated, and capacity is fixed by the kind.
    pub fn create_promo(
        &self,
        company_id: CompanyId,
        company_name: &str,
        new_promo: NewPromo,
        now: DateTime<Utc>,
    ) -> Result<PromoId, PromoServiceError> {
        new_promo.target.validate().map_err(ValidationError::from)?;
        validate_window(new_promo.active_from, new_promo.active_until)?;
        match &new_promo.kind {
            PromoKind::Common { code, .. } if code.is_empty() => {
                return Err(ValidationError::MissingCommonCode.into());
            }
            PromoKind::Unique { codes } if codes.is_empty() => {
                return Err(ValidationError::EmptyUniquePool.into());
            }
            _ => {}
        }

        let promo = Promo {
            promo_id: PromoId::generate(),
            company_id,
            company_name: company_name.to_string(),
            kind: new_promo.kind,
            used_count: 0,
            description: new_promo.description,
            image_url: new_promo.image_url,
            active_from: new_promo.active_from,
            active_until: new_promo.active_until,
            target: new_promo.target,
            enabled: true,
            like_count: 0,
            comment_count: 0,
            created_at: now,
        };

        let stored = self
            .repository
            .insert_promo(promo)
            .map_err(PromoServiceError::Repository)?;
        tracing::info!(promo_id = %stored.promo_id, company_id = %company_id, mode = stored.kind.mode_label(), "promo created");
        Ok(stored.promo_id)
    }

    /// Apply a partial update on behalf of the owning company. A promo owned
    /// by another company is reported as missing rather than forbidden.
    pub fn patch_promo(
        &self,
        company_id: &CompanyId,
        promo_id: &PromoId,
        patch: PromoPatch,
        now: DateTime<Utc>,
    ) -> Result<PromoOwnerView, PromoServiceError> {
        let mut promo = self.owned_promo(company_id, promo_id)?;

        if let Some(max_count) = patch.max_count {
            match &mut promo.kind {
                PromoKind::Common {
                    max_count: capacity,
                    ..
                } => {
                    if max_count < promo.used_count {
                        return Err(ValidationError::MaxCountBelowUsed.into());
                    }
                    *capacity = max_count;
                }
                PromoKind::Unique { .. } => {
                    return Err(ValidationError::MaxCountOnUnique.into());
                }
            }
        }

        if let Some(target) = patch.target {
            target.validate().map_err(ValidationError::from)?;
            promo.target = target;
        }
        if let Some(description) = patch.description {
            promo.description = Some(description);
        }
        if let Some(image_url) = patch.image_url {
            promo.image_url = Some(image_url);
        }
        if let Some(active_from) = patch.active_from {
            promo.active_from = Some(active_from);
        }
        if let Some(active_until) = patch.active_until {
            promo.active_until = Some(active_until);
        }
        if let Some(enabled) = patch.enabled {
            promo.enabled = enabled;
        }
        validate_window(promo.active_from, promo.active_until)?;

        self.repository
            .update_promo(promo.clone())
            .map_err(PromoServiceError::Repository)?;
        Ok(owner_view(&promo, now.date_naive()))
    }

    /// Owner read view including the derived `active` flag.
    pub fn promo_for_company(
        &self,
        company_id: &CompanyId,
        promo_id: &PromoId,
        now: DateTime<Utc>,
    ) -> Result<PromoOwnerView, PromoServiceError> {
        let promo = self.owned_promo(company_id, promo_id)?;
        Ok(owner_view(&promo, now.date_naive()))
    }

    /// User read view: derived `active` flag plus the caller's activation
    /// membership.
    pub fn promo_for_user(
        &self,
        user_id: &UserId,
        promo_id: &PromoId,
        now: DateTime<Utc>,
    ) -> Result<PromoUserView, PromoServiceError> {
        let promo = self
            .repository
            .fetch_promo(promo_id)
            .map_err(PromoServiceError::Repository)?
            .ok_or(PromoServiceError::PromoNotFound)?;
        let activated = self
            .repository
            .activation(user_id, promo_id)
            .map_err(PromoServiceError::Repository)?
            .is_some();
        Ok(user_view(&promo, activated, now.date_naive()))
    }

    /// Targeted feed for one user: campaigns whose country/age targeting
    /// matches the caller, optionally narrowed by category and derived
    /// active state. Returns the page and the pre-pagination total.
    pub fn feed(
        &self,
        user_id: &UserId,
        query: &FeedQuery,
        now: DateTime<Utc>,
    ) -> Result<(Vec<PromoUserView>, usize), PromoServiceError> {
        let user = self
            .repository
            .fetch_user(user_id)
            .map_err(PromoServiceError::Repository)?
            .ok_or(PromoServiceError::UserNotFound)?;
        let today = now.date_naive();

        let matching: Vec<Promo> = self
            .repository
            .list_promos()
            .map_err(PromoServiceError::Repository)?
            .into_iter()
            .filter(|promo| {
                eligibility::matches_listing(promo, &user, query.category.as_deref()).is_ok()
            })
            .filter(|promo| {
                query
                    .active
                    .map_or(true, |wanted| {
                        eligibility::is_currently_active(promo, today) == wanted
                    })
            })
            .collect();

        let total = matching.len();
        let mut page = Vec::new();
        for promo in matching.into_iter().skip(query.offset).take(query.limit) {
            let activated = self
                .repository
                .activation(user_id, &promo.promo_id)
                .map_err(PromoServiceError::Repository)?
                .is_some();
            page.push(user_view(&promo, activated, today));
        }
        Ok((page, total))
    }

    /// Decide, consume, and record: the activation state machine.
    pub async fn activate(
        &self,
        user_id: &UserId,
        promo_id: &PromoId,
        now: DateTime<Utc>,
    ) -> Result<ActivationReceipt, PromoServiceError> {
        let promo = self
            .repository
            .fetch_promo(promo_id)
            .map_err(PromoServiceError::Repository)?
            .ok_or(PromoServiceError::PromoNotFound)?;
        let user = self
            .repository
            .fetch_user(user_id)
            .map_err(PromoServiceError::Repository)?
            .ok_or(PromoServiceError::UserNotFound)?;

        // Prior redeemers get the stored code back without consuming a unit,
        // even if the campaign has since closed or drained.
        let existing = self
            .repository
            .activation(user_id, promo_id)
            .map_err(PromoServiceError::Repository)?;
        if existing.is_some() {
            let allocated = self.allocate(promo_id, user_id, now)?;
            return Ok(receipt(allocated));
        }

        eligibility::evaluate_activation(&promo, &user, now.date_naive())
            .map_err(PromoServiceError::Ineligible)?;

        let approved = self.fraud.check(&user.email, promo_id, now).await?;
        if !approved {
            tracing::info!(%promo_id, %user_id, "activation rejected by antifraud verdict");
            return Err(PromoServiceError::FraudRejected);
        }

        let allocated = self.allocate(promo_id, user_id, now)?;
        tracing::info!(%promo_id, %user_id, repeat = allocated.repeat, "promo activated");
        Ok(receipt(allocated))
    }

    /// The user's redemption history, newest first, as user views.
    pub fn activation_history(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
        now: DateTime<Utc>,
    ) -> Result<(Vec<PromoUserView>, usize), PromoServiceError> {
        if self
            .repository
            .fetch_user(user_id)
            .map_err(PromoServiceError::Repository)?
            .is_none()
        {
            return Err(PromoServiceError::UserNotFound);
        }

        let (records, total) = self
            .repository
            .activation_history(user_id, limit, offset)
            .map_err(PromoServiceError::Repository)?;

        let today = now.date_naive();
        let mut views = Vec::new();
        for record in records {
            // A promo deleted out from under its activations is skipped
            // rather than failing the whole listing.
            let Some(promo) = self
                .repository
                .fetch_promo(&record.promo_id)
                .map_err(PromoServiceError::Repository)?
            else {
                continue;
            };
            views.push(user_view(&promo, true, today));
        }
        Ok((views, total))
    }

    /// Owner-only redemption statistics with a per-country breakdown.
    pub fn activation_stats(
        &self,
        company_id: &CompanyId,
        promo_id: &PromoId,
    ) -> Result<ActivationStats, PromoServiceError> {
        self.owned_promo(company_id, promo_id)?;
        self.repository
            .activation_stats(promo_id)
            .map_err(PromoServiceError::Repository)
    }

    fn owned_promo(
        &self,
        company_id: &CompanyId,
        promo_id: &PromoId,
    ) -> Result<Promo, PromoServiceError> {
        let promo = self
            .repository
            .fetch_promo(promo_id)
            .map_err(PromoServiceError::Repository)?
            .ok_or(PromoServiceError::PromoNotFound)?;
        if promo.company_id != *company_id {
            return Err(PromoServiceError::PromoNotFound);
        }
        Ok(promo)
    }

    fn allocate(
        &self,
        promo_id: &PromoId,
        user_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<AllocatedCode, PromoServiceError> {
        self.repository
            .allocate_activation(promo_id, user_id, at)
            .map_err(|error| match error {
                // Losing the allocation race is the capacity-exhausted
                // outcome, re-derived, not an internal failure.
                RepositoryError::Allocation(_) => {
                    PromoServiceError::Ineligible(IneligibilityReason::CapacityExhausted)
                }
                other => PromoServiceError::Repository(other),
            })
    }
}

fn receipt(allocated: AllocatedCode) -> ActivationReceipt {
    ActivationReceipt {
        code: allocated.code,
        repeat: allocated.repeat,
    }
}

fn validate_window(
    active_from: Option<NaiveDate>,
    active_until: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    if let (Some(from), Some(until)) = (active_from, active_until) {
        if from > until {
            return Err(ValidationError::InvertedWindow);
        }
    }
    Ok(())
}

fn user_view(promo: &Promo, activated: bool, today: NaiveDate) -> PromoUserView {
    PromoUserView {
        promo_id: promo.promo_id,
        company_id: promo.company_id,
        company_name: promo.company_name.clone(),
        description: promo.description.clone(),
        image_url: promo.image_url.clone(),
        active: eligibility::is_currently_active(promo, today),
        is_activated_by_user: activated,
        like_count: promo.like_count,
        comment_count: promo.comment_count,
    }
}

fn owner_view(promo: &Promo, today: NaiveDate) -> PromoOwnerView {
    PromoOwnerView {
        promo_id: promo.promo_id,
        company_id: promo.company_id,
        company_name: promo.company_name.clone(),
        mode: promo.kind.mode_label(),
        description: promo.description.clone(),
        image_url: promo.image_url.clone(),
        target: promo.target.clone(),
        active_from: promo.active_from,
        active_until: promo.active_until,
        max_count: promo.capacity(),
        used_count: promo.used_count,
        active: eligibility::is_currently_active(promo, today),
        like_count: promo.like_count,
        comment_count: promo.comment_count,
    }
}

/// Error raised by the promo service.
#[derive(Debug, thiserror::Error)]
pub enum PromoServiceError {
    #[error("promo not found")]
    PromoNotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("{}", .0.summary())]
    Ineligible(IneligibilityReason),
    #[error("activation rejected by the antifraud service")]
    FraudRejected,
    #[error(transparent)]
    FraudUnavailable(#[from] FraudCheckError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(RepositoryError),
}

/// Rejections raised while validating campaign payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error(transparent)]
    Target(#[from] TargetValidationError),
    #[error("'active_from' cannot be later than 'active_until'")]
    InvertedWindow,
    #[error("COMMON promo requires a shared code")]
    MissingCommonCode,
    #[error("UNIQUE promo requires a non-empty code pool")]
    EmptyUniquePool,
    #[error("max_count applies only to COMMON promos")]
    MaxCountOnUnique,
    #[error("max_count cannot drop below the consumed count")]
    MaxCountBelowUsed,
}
