use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for promo campaigns, distinct from any storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PromoId(pub Uuid);

impl PromoId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PromoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier wrapper for the company owning a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyId(pub Uuid);

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier wrapper for end users redeeming codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Distribution mode plus the code material it carries.
///
/// `Common` hands the same string to every redeemer up to `max_count`;
/// `Unique` hands out pool entries front to back, capacity being the pool
/// length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PromoKind {
    Common { code: String, max_count: u32 },
    Unique { codes: Vec<String> },
}

impl PromoKind {
    pub fn mode_label(&self) -> &'static str {
        match self {
            PromoKind::Common { .. } => "COMMON",
            PromoKind::Unique { .. } => "UNIQUE",
        }
    }
}

/// Targeting filters; an absent dimension matches every user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_from: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_until: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

impl Target {
    /// Boundary validation: country shape and a coherent age range.
    pub fn validate(&self) -> Result<(), TargetValidationError> {
        if let Some(country) = &self.country {
            if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(TargetValidationError::InvalidCountry(country.clone()));
            }
        }
        if let (Some(from), Some(until)) = (self.age_from, self.age_until) {
            if from > until {
                return Err(TargetValidationError::InvertedAgeRange { from, until });
            }
        }
        Ok(())
    }

    pub fn declares_age_filter(&self) -> bool {
        self.age_from.is_some() || self.age_until.is_some()
    }
}

/// Rejection raised when a target fails boundary validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetValidationError {
    #[error("country '{0}' is not an ISO 3166-1 alpha-2 code")]
    InvalidCountry(String),
    #[error("age_from {from} cannot exceed age_until {until}")]
    InvertedAgeRange { from: u8, until: u8 },
}

/// A promo campaign record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promo {
    pub promo_id: PromoId,
    pub company_id: CompanyId,
    pub company_name: String,
    pub kind: PromoKind,
    /// Consumption cursor shared by both modes; for `Unique` it indexes the
    /// next unallocated pool entry.
    pub used_count: u32,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub active_from: Option<NaiveDate>,
    pub active_until: Option<NaiveDate>,
    pub target: Target,
    /// Manual toggle; the public `active` flag is derived, never stored.
    pub enabled: bool,
    pub like_count: u32,
    pub comment_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Promo {
    pub fn capacity(&self) -> u32 {
        match &self.kind {
            PromoKind::Common { max_count, .. } => *max_count,
            PromoKind::Unique { codes } => codes.len() as u32,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.capacity().saturating_sub(self.used_count)
    }
}

/// End-user identity plus the attributes targeting evaluates against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub name: String,
    pub surname: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
}

/// Durable proof that a user redeemed a promo; at most one logical record
/// per (user, promo) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationRecord {
    pub user_id: UserId,
    pub promo_id: PromoId,
    /// The code delivered on first activation; re-deliveries return it again.
    pub code: String,
    pub user_country: Option<String>,
    pub activated_at: DateTime<Utc>,
    pub activation_count: u32,
}

/// Payload for creating a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPromo {
    pub kind: PromoKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub target: Target,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_until: Option<NaiveDate>,
}

/// Partial update applied by the owning company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    /// COMMON-only; must never drop below the consumed count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_until: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Sanitized promo representation served to end users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromoUserView {
    pub promo_id: PromoId,
    pub company_id: CompanyId,
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub active: bool,
    pub is_activated_by_user: bool,
    pub like_count: u32,
    pub comment_count: u32,
}

/// Full campaign representation served to the owning company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromoOwnerView {
    pub promo_id: PromoId,
    pub company_id: CompanyId,
    pub company_name: String,
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub target: Target,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_until: Option<NaiveDate>,
    pub max_count: u32,
    pub used_count: u32,
    pub active: bool,
    pub like_count: u32,
    pub comment_count: u32,
}

/// Per-country activation tally for the owner statistics endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryActivations {
    pub country: String,
    pub activations_count: u64,
}

/// Aggregated redemption statistics for one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationStats {
    pub activations_count: u64,
    pub countries: Vec<CountryActivations>,
}
