use serde::{Deserialize, Serialize};

/// Why a promo cannot be activated by (or shown to) a given user right now.
///
/// Every variant maps to a stable reason string surfaced to API callers, so
/// clients can branch on the text without parsing internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IneligibilityReason {
    /// The owning company switched the campaign off.
    Disabled,
    /// Today falls outside the campaign's activity window.
    OutsideWindow,
    /// The campaign targets a country the user is not in (or the user has
    /// no country on file while the campaign filters by one).
    CountryMismatch,
    /// The user's age is outside the targeted range, or unknown while the
    /// campaign declares an age filter.
    AgeRestricted,
    /// Listing context only: none of the campaign's categories matched.
    CategoryMismatch,
    /// Every redemption unit has been consumed.
    CapacityExhausted,
}

impl IneligibilityReason {
    pub const fn summary(self) -> &'static str {
        match self {
            IneligibilityReason::Disabled => "promo is disabled",
            IneligibilityReason::OutsideWindow => "promo is outside its activity window",
            IneligibilityReason::CountryMismatch => "promo does not target the user's country",
            IneligibilityReason::AgeRestricted => "promo does not target the user's age",
            IneligibilityReason::CategoryMismatch => "promo does not match the requested category",
            IneligibilityReason::CapacityExhausted => "promo capacity is exhausted",
        }
    }
}
