use chrono::NaiveDate;

use super::super::domain::{Promo, Target};

pub(crate) fn within_window(promo: &Promo, as_of: NaiveDate) -> bool {
    if let Some(from) = promo.active_from {
        if as_of < from {
            return false;
        }
    }
    if let Some(until) = promo.active_until {
        if as_of > until {
            return false;
        }
    }
    true
}

pub(crate) fn has_capacity(promo: &Promo) -> bool {
    promo.remaining() > 0
}

/// A declared country filter requires a matching user country; comparison is
/// case-insensitive. No filter matches everyone.
pub(crate) fn country_matches(target: &Target, user_country: Option<&str>) -> bool {
    match &target.country {
        None => true,
        Some(wanted) => match user_country {
            Some(country) => wanted.eq_ignore_ascii_case(country),
            None => false,
        },
    }
}

/// A declared age filter requires a known user age inside
/// `[age_from ?? 0, age_until ?? unbounded]`.
pub(crate) fn age_matches(target: &Target, user_age: Option<u8>) -> bool {
    if !target.declares_age_filter() {
        return true;
    }
    let Some(age) = user_age else {
        return false;
    };
    let from = target.age_from.unwrap_or(0);
    if age < from {
        return false;
    }
    match target.age_until {
        Some(until) => age <= until,
        None => true,
    }
}

/// Case-insensitive category overlap; a promo with no categories never
/// matches an explicit category request.
pub(crate) fn category_overlaps(target: &Target, requested: &str) -> bool {
    target
        .categories
        .as_deref()
        .unwrap_or_default()
        .iter()
        .any(|category| category.eq_ignore_ascii_case(requested))
}
