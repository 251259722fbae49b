use super::common::*;
use crate::workflows::promo::allocator::{claim_unit, AllocationError};

#[test]
fn common_claims_return_the_shared_code_until_the_cap() {
    let mut promo = common_promo("COFFEE10", 3);

    for expected_used in 1..=3 {
        let code = claim_unit(&mut promo).expect("capacity remains");
        assert_eq!(code, "COFFEE10");
        assert_eq!(promo.used_count, expected_used);
    }

    assert_eq!(claim_unit(&mut promo), Err(AllocationError::Exhausted));
    assert_eq!(promo.used_count, 3, "failed claim must not consume");
}

#[test]
fn unique_claims_walk_the_pool_front_to_back() {
    let mut promo = unique_promo(&["A1", "A2", "A3"]);

    assert_eq!(claim_unit(&mut promo).expect("first"), "A1");
    assert_eq!(claim_unit(&mut promo).expect("second"), "A2");
    assert_eq!(claim_unit(&mut promo).expect("third"), "A3");
    assert_eq!(promo.used_count, 3);

    assert_eq!(claim_unit(&mut promo), Err(AllocationError::Exhausted));
    assert_eq!(promo.used_count, 3);
}

#[test]
fn unique_capacity_is_the_pool_length() {
    let promo = unique_promo(&["ONLY"]);
    assert_eq!(promo.capacity(), 1);
    assert_eq!(promo.remaining(), 1);

    let mut promo = promo;
    claim_unit(&mut promo).expect("pool entry");
    assert_eq!(promo.remaining(), 0);
}

#[test]
fn zero_capacity_common_promo_is_exhausted_from_the_start() {
    let mut promo = common_promo("NEVER", 0);
    assert_eq!(claim_unit(&mut promo), Err(AllocationError::Exhausted));
}
