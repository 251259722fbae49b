use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::workflows::promo::cache::InMemoryVerdictCache;
use crate::workflows::promo::domain::{
    CompanyId, Promo, PromoId, PromoKind, Target, UserId, UserProfile,
};
use crate::workflows::promo::fraud::{FraudGateway, FraudGatewayError, FraudVerdict};
use crate::workflows::promo::repository::PromoRepository;
use crate::workflows::promo::service::PromoService;
use crate::workflows::promo::store::InMemoryPromoStore;

pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).single().expect("valid instant")
}

pub(super) fn today() -> NaiveDate {
    fixed_now().date_naive()
}

pub(super) fn company() -> CompanyId {
    CompanyId(Uuid::new_v4())
}

pub(super) fn common_promo(code: &str, max_count: u32) -> Promo {
    Promo {
        promo_id: PromoId::generate(),
        company_id: company(),
        company_name: "Roastery".to_string(),
        kind: PromoKind::Common {
            code: code.to_string(),
            max_count,
        },
        used_count: 0,
        description: Some("ten percent off every pour-over".to_string()),
        image_url: None,
        active_from: None,
        active_until: None,
        target: Target::default(),
        enabled: true,
        like_count: 0,
        comment_count: 0,
        created_at: fixed_now(),
    }
}

pub(super) fn unique_promo(codes: &[&str]) -> Promo {
    Promo {
        kind: PromoKind::Unique {
            codes: codes.iter().map(|code| code.to_string()).collect(),
        },
        ..common_promo("unused", 0)
    }
}

pub(super) fn user(country: Option<&str>, age: Option<u8>) -> UserProfile {
    let user_id = Uuid::new_v4();
    UserProfile {
        user_id: UserId(user_id),
        name: "Sam".to_string(),
        surname: "Riley".to_string(),
        email: format!("user-{user_id}@example.com"),
        avatar_url: None,
        country: country.map(str::to_string),
        age,
    }
}

/// Gateway double that approves every check and counts calls.
#[derive(Default)]
pub(super) struct ApprovingGateway {
    pub(super) calls: AtomicUsize,
    pub(super) cache_until: Option<DateTime<Utc>>,
}

#[async_trait]
impl FraudGateway for ApprovingGateway {
    async fn validate(
        &self,
        _user_email: &str,
        _promo_id: &PromoId,
    ) -> Result<FraudVerdict, FraudGatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FraudVerdict {
            ok: true,
            cache_until: self.cache_until,
        })
    }
}

/// Gateway double that rejects every check.
#[derive(Default)]
pub(super) struct RejectingGateway {
    pub(super) cache_until: Option<DateTime<Utc>>,
}

#[async_trait]
impl FraudGateway for RejectingGateway {
    async fn validate(
        &self,
        _user_email: &str,
        _promo_id: &PromoId,
    ) -> Result<FraudVerdict, FraudGatewayError> {
        Ok(FraudVerdict {
            ok: false,
            cache_until: self.cache_until,
        })
    }
}

/// Gateway double whose first `failures` calls error before succeeding.
pub(super) struct FlakyGateway {
    pub(super) failures: usize,
    pub(super) calls: AtomicUsize,
}

impl FlakyGateway {
    pub(super) fn failing_first(failures: usize) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl FraudGateway for FlakyGateway {
    async fn validate(
        &self,
        _user_email: &str,
        _promo_id: &PromoId,
    ) -> Result<FraudVerdict, FraudGatewayError> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(FraudGatewayError::Status(503));
        }
        Ok(FraudVerdict {
            ok: true,
            cache_until: None,
        })
    }
}

pub(super) type TestService<G> = PromoService<InMemoryPromoStore, G, InMemoryVerdictCache>;

pub(super) fn build_service<G: FraudGateway + 'static>(
    gateway: G,
) -> (
    Arc<TestService<G>>,
    Arc<InMemoryPromoStore>,
    Arc<InMemoryVerdictCache>,
) {
    let store = Arc::new(InMemoryPromoStore::default());
    let cache = Arc::new(InMemoryVerdictCache::default());
    let service = Arc::new(PromoService::new(
        store.clone(),
        Arc::new(gateway),
        cache.clone(),
    ));
    (service, store, cache)
}

/// Seed the store with a promo and user ready to activate.
pub(super) fn seed(store: &InMemoryPromoStore, promo: &Promo, user: &UserProfile) {
    store
        .insert_promo(promo.clone())
        .expect("promo seeds cleanly");
    store.upsert_user(user.clone()).expect("user seeds cleanly");
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
