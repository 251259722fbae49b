use super::common::*;
use crate::workflows::promo::cache::{InMemoryVerdictCache, VerdictCache, VerdictKey};
use crate::workflows::promo::domain::PromoId;
use chrono::Duration;

#[test]
fn keys_compose_user_and_promo() {
    let promo_id = PromoId::generate();
    let key = VerdictKey::new("sam@example.com", &promo_id);
    assert_eq!(
        key.composite(),
        format!("antifraud:sam@example.com:{promo_id}")
    );
}

#[test]
fn stored_verdicts_are_returned_before_expiry() {
    let cache = InMemoryVerdictCache::default();
    let key = VerdictKey::new("sam@example.com", &PromoId::generate());
    let now = fixed_now();

    cache.put(&key, true, now + Duration::minutes(5));
    assert_eq!(cache.get(&key, now), Some(true));
    assert_eq!(cache.get(&key, now + Duration::minutes(4)), Some(true));
}

#[test]
fn expired_entries_are_misses() {
    let cache = InMemoryVerdictCache::default();
    let key = VerdictKey::new("sam@example.com", &PromoId::generate());
    let now = fixed_now();

    cache.put(&key, true, now + Duration::minutes(5));
    assert_eq!(cache.get(&key, now + Duration::minutes(5)), None);
    assert_eq!(cache.get(&key, now + Duration::hours(1)), None);
}

#[test]
fn rejections_are_cached_like_approvals() {
    let cache = InMemoryVerdictCache::default();
    let key = VerdictKey::new("sam@example.com", &PromoId::generate());
    let now = fixed_now();

    cache.put(&key, false, now + Duration::minutes(5));
    assert_eq!(cache.get(&key, now), Some(false));
}

#[test]
fn later_writes_win() {
    let cache = InMemoryVerdictCache::default();
    let key = VerdictKey::new("sam@example.com", &PromoId::generate());
    let now = fixed_now();

    cache.put(&key, false, now + Duration::minutes(5));
    cache.put(&key, true, now + Duration::minutes(10));
    assert_eq!(cache.get(&key, now), Some(true));
}

#[test]
fn distinct_pairs_do_not_collide() {
    let cache = InMemoryVerdictCache::default();
    let promo_id = PromoId::generate();
    let first = VerdictKey::new("sam@example.com", &promo_id);
    let second = VerdictKey::new("alex@example.com", &promo_id);
    let now = fixed_now();

    cache.put(&first, true, now + Duration::minutes(5));
    assert_eq!(cache.get(&second, now), None);
}
