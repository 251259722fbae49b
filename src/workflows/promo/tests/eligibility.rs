use super::common::*;
use crate::workflows::promo::domain::Target;
use crate::workflows::promo::eligibility::{
    evaluate_activation, is_currently_active, matches_listing, IneligibilityReason,
};
use chrono::NaiveDate;

#[test]
fn open_promo_accepts_any_user() {
    let promo = common_promo("COFFEE10", 5);
    assert!(evaluate_activation(&promo, &user(None, None), today()).is_ok());
    assert!(evaluate_activation(&promo, &user(Some("fr"), Some(44)), today()).is_ok());
}

#[test]
fn disabled_promo_is_reported_first() {
    let mut promo = common_promo("COFFEE10", 5);
    promo.enabled = false;
    promo.active_until = Some(NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid"));

    let verdict = evaluate_activation(&promo, &user(None, None), today());
    assert_eq!(verdict, Err(IneligibilityReason::Disabled));
}

#[test]
fn window_bounds_are_inclusive() {
    let mut promo = common_promo("COFFEE10", 5);
    promo.active_from = Some(NaiveDate::from_ymd_opt(2025, 10, 1).expect("valid"));
    promo.active_until = Some(NaiveDate::from_ymd_opt(2025, 10, 31).expect("valid"));
    let somebody = user(None, None);

    let first = NaiveDate::from_ymd_opt(2025, 10, 1).expect("valid");
    let last = NaiveDate::from_ymd_opt(2025, 10, 31).expect("valid");
    assert!(evaluate_activation(&promo, &somebody, first).is_ok());
    assert!(evaluate_activation(&promo, &somebody, last).is_ok());

    let before = NaiveDate::from_ymd_opt(2025, 9, 30).expect("valid");
    let after = NaiveDate::from_ymd_opt(2025, 11, 1).expect("valid");
    assert_eq!(
        evaluate_activation(&promo, &somebody, before),
        Err(IneligibilityReason::OutsideWindow)
    );
    assert_eq!(
        evaluate_activation(&promo, &somebody, after),
        Err(IneligibilityReason::OutsideWindow)
    );
}

#[test]
fn absent_bound_means_unbounded() {
    let mut promo = common_promo("COFFEE10", 5);
    promo.active_from = Some(NaiveDate::from_ymd_opt(2025, 10, 1).expect("valid"));
    let somebody = user(None, None);

    let far_future = NaiveDate::from_ymd_opt(2040, 1, 1).expect("valid");
    assert!(evaluate_activation(&promo, &somebody, far_future).is_ok());
}

#[test]
fn country_filter_matches_case_insensitively() {
    let mut promo = common_promo("COFFEE10", 5);
    promo.target = Target {
        country: Some("us".to_string()),
        ..Target::default()
    };

    assert!(evaluate_activation(&promo, &user(Some("US"), None), today()).is_ok());
    assert_eq!(
        evaluate_activation(&promo, &user(Some("FR"), None), today()),
        Err(IneligibilityReason::CountryMismatch)
    );
}

#[test]
fn country_filter_rejects_users_without_a_country() {
    let mut promo = common_promo("COFFEE10", 5);
    promo.target = Target {
        country: Some("US".to_string()),
        ..Target::default()
    };

    assert_eq!(
        evaluate_activation(&promo, &user(None, None), today()),
        Err(IneligibilityReason::CountryMismatch)
    );
}

#[test]
fn age_range_is_inclusive_on_both_ends() {
    let mut promo = common_promo("COFFEE10", 5);
    promo.target = Target {
        age_from: Some(18),
        age_until: Some(25),
        ..Target::default()
    };

    assert!(evaluate_activation(&promo, &user(None, Some(18)), today()).is_ok());
    assert!(evaluate_activation(&promo, &user(None, Some(25)), today()).is_ok());
    assert_eq!(
        evaluate_activation(&promo, &user(None, Some(17)), today()),
        Err(IneligibilityReason::AgeRestricted)
    );
    assert_eq!(
        evaluate_activation(&promo, &user(None, Some(26)), today()),
        Err(IneligibilityReason::AgeRestricted)
    );
}

#[test]
fn age_filter_requires_a_known_age() {
    let mut promo = common_promo("COFFEE10", 5);
    promo.target = Target {
        age_from: Some(21),
        ..Target::default()
    };

    assert_eq!(
        evaluate_activation(&promo, &user(None, None), today()),
        Err(IneligibilityReason::AgeRestricted)
    );
}

#[test]
fn half_open_age_ranges_work() {
    let mut promo = common_promo("COFFEE10", 5);
    promo.target = Target {
        age_until: Some(30),
        ..Target::default()
    };

    assert!(evaluate_activation(&promo, &user(None, Some(0)), today()).is_ok());
    assert!(evaluate_activation(&promo, &user(None, Some(30)), today()).is_ok());
    assert_eq!(
        evaluate_activation(&promo, &user(None, Some(31)), today()),
        Err(IneligibilityReason::AgeRestricted)
    );
}

#[test]
fn exhausted_capacity_blocks_activation() {
    let mut promo = common_promo("COFFEE10", 3);
    promo.used_count = 3;

    assert_eq!(
        evaluate_activation(&promo, &user(None, None), today()),
        Err(IneligibilityReason::CapacityExhausted)
    );

    let mut unique = unique_promo(&["A1", "A2"]);
    unique.used_count = 2;
    assert_eq!(
        evaluate_activation(&unique, &user(None, None), today()),
        Err(IneligibilityReason::CapacityExhausted)
    );
}

#[test]
fn displayed_active_flag_agrees_with_the_activation_gate() {
    // Same promo examined through both code paths, across states that flip
    // each derived-activity input.
    let cases = vec![
        common_promo("COFFEE10", 5),
        {
            let mut promo = common_promo("COFFEE10", 5);
            promo.enabled = false;
            promo
        },
        {
            let mut promo = common_promo("COFFEE10", 5);
            promo.used_count = 5;
            promo
        },
        {
            let mut promo = common_promo("COFFEE10", 5);
            promo.active_from = Some(NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid"));
            promo
        },
        {
            let mut promo = common_promo("COFFEE10", 5);
            promo.active_until = Some(NaiveDate::from_ymd_opt(2024, 12, 31).expect("valid"));
            promo
        },
    ];

    let untargeted = user(None, None);
    for promo in cases {
        let shown = is_currently_active(&promo, today());
        let gate = evaluate_activation(&promo, &untargeted, today()).is_ok();
        assert_eq!(shown, gate, "flag/gate divergence for {promo:?}");
    }
}

#[test]
fn listing_match_honors_categories_case_insensitively() {
    let mut promo = common_promo("COFFEE10", 5);
    promo.target = Target {
        categories: Some(vec!["Coffee".to_string(), "breakfast".to_string()]),
        ..Target::default()
    };
    let somebody = user(None, None);

    assert!(matches_listing(&promo, &somebody, Some("coffee")).is_ok());
    assert!(matches_listing(&promo, &somebody, Some("BREAKFAST")).is_ok());
    assert_eq!(
        matches_listing(&promo, &somebody, Some("dinner")),
        Err(IneligibilityReason::CategoryMismatch)
    );
}

#[test]
fn listing_match_without_categories_rejects_category_requests() {
    let promo = common_promo("COFFEE10", 5);
    let somebody = user(None, None);

    assert!(matches_listing(&promo, &somebody, None).is_ok());
    assert_eq!(
        matches_listing(&promo, &somebody, Some("coffee")),
        Err(IneligibilityReason::CategoryMismatch)
    );
}

#[test]
fn listing_match_applies_country_and_age_targeting() {
    let mut promo = common_promo("COFFEE10", 5);
    promo.target = Target {
        country: Some("DE".to_string()),
        age_from: Some(18),
        ..Target::default()
    };

    assert!(matches_listing(&promo, &user(Some("de"), Some(20)), None).is_ok());
    assert_eq!(
        matches_listing(&promo, &user(Some("AT"), Some(20)), None),
        Err(IneligibilityReason::CountryMismatch)
    );
    assert_eq!(
        matches_listing(&promo, &user(Some("de"), None), None),
        Err(IneligibilityReason::AgeRestricted)
    );
}
