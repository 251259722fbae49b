mod policy;
mod rules;

pub use policy::IneligibilityReason;

use chrono::NaiveDate;

use super::domain::{Promo, UserProfile};

/// Derived `active` state: manual toggle, activity window, and remaining
/// capacity. This is the exact gate the activation path re-uses, so a promo
/// shown as active can never be rejected on those grounds (and vice versa).
pub fn is_currently_active(promo: &Promo, as_of: NaiveDate) -> bool {
    promo.enabled && rules::within_window(promo, as_of) && rules::has_capacity(promo)
}

/// Decide whether `user` may activate `promo` on `as_of`.
///
/// Pure and infallible: short-circuits on the first failed check and reports
/// it as the reason. Category targeting is a listing concern and is not
/// consulted here.
pub fn evaluate_activation(
    promo: &Promo,
    user: &UserProfile,
    as_of: NaiveDate,
) -> Result<(), IneligibilityReason> {
    if !promo.enabled {
        return Err(IneligibilityReason::Disabled);
    }
    if !rules::within_window(promo, as_of) {
        return Err(IneligibilityReason::OutsideWindow);
    }
    if !rules::country_matches(&promo.target, user.country.as_deref()) {
        return Err(IneligibilityReason::CountryMismatch);
    }
    if !rules::age_matches(&promo.target, user.age) {
        return Err(IneligibilityReason::AgeRestricted);
    }
    if !rules::has_capacity(promo) {
        return Err(IneligibilityReason::CapacityExhausted);
    }
    Ok(())
}

/// Feed-listing filter: the activation targeting rules plus an optional
/// category constraint. Window/capacity/toggle state is deliberately not
/// consulted; listings may show inactive promos with a derived flag.
pub fn matches_listing(
    promo: &Promo,
    user: &UserProfile,
    category: Option<&str>,
) -> Result<(), IneligibilityReason> {
    if !rules::country_matches(&promo.target, user.country.as_deref()) {
        return Err(IneligibilityReason::CountryMismatch);
    }
    if !rules::age_matches(&promo.target, user.age) {
        return Err(IneligibilityReason::AgeRestricted);
    }
    if let Some(requested) = category {
        if !rules::category_overlaps(&promo.target, requested) {
            return Err(IneligibilityReason::CategoryMismatch);
        }
    }
    Ok(())
}
