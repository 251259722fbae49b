use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::cache::{VerdictCache, VerdictKey};
use super::domain::PromoId;

/// Total calls allowed per cache miss: one attempt plus one retry.
const ATTEMPT_BUDGET: usize = 2;

/// Verdict returned by the anti-fraud collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FraudVerdict {
    pub ok: bool,
    /// When present, the verdict may be cached until this instant; when
    /// absent, every activation re-checks.
    #[serde(default)]
    pub cache_until: Option<DateTime<Utc>>,
}

/// Failure of a single anti-fraud call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FraudGatewayError {
    #[error("antifraud transport failure: {0}")]
    Transport(String),
    #[error("antifraud service responded with status {0}")]
    Status(u16),
    #[error("antifraud response could not be decoded: {0}")]
    Decode(String),
}

/// Outbound seam to the anti-fraud collaborator.
#[async_trait]
pub trait FraudGateway: Send + Sync {
    async fn validate(
        &self,
        user_email: &str,
        promo_id: &PromoId,
    ) -> Result<FraudVerdict, FraudGatewayError>;
}

/// HTTP implementation posting to `http://{address}/api/validate`.
pub struct HttpFraudGateway {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpFraudGateway {
    pub fn new(address: &str, timeout: Duration) -> Result<Self, FraudGatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| FraudGatewayError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("http://{address}/api/validate"),
        })
    }
}

#[async_trait]
impl FraudGateway for HttpFraudGateway {
    async fn validate(
        &self,
        user_email: &str,
        promo_id: &PromoId,
    ) -> Result<FraudVerdict, FraudGatewayError> {
        let payload = json!({
            "user_email": user_email,
            "promo_id": promo_id.to_string(),
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|err| FraudGatewayError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FraudGatewayError::Status(status.as_u16()));
        }

        response
            .json::<FraudVerdict>()
            .await
            .map_err(|err| FraudGatewayError::Decode(err.to_string()))
    }
}

/// Terminal failure of a fraud check after the attempt budget is spent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FraudCheckError {
    #[error("antifraud service unavailable after {attempts} attempts: {last_error}")]
    Unavailable {
        attempts: usize,
        last_error: FraudGatewayError,
    },
}

/// Cache-aware client around the gateway.
///
/// A cache hit returns without touching the collaborator. On a miss the
/// gateway is called at most [`ATTEMPT_BUDGET`] times; if every attempt
/// fails the check fails closed rather than defaulting to approval.
pub struct FraudChecker<G, C> {
    gateway: Arc<G>,
    cache: Arc<C>,
}

impl<G, C> FraudChecker<G, C>
where
    G: FraudGateway,
    C: VerdictCache,
{
    pub fn new(gateway: Arc<G>, cache: Arc<C>) -> Self {
        Self { gateway, cache }
    }

    pub async fn check(
        &self,
        user_email: &str,
        promo_id: &PromoId,
        now: DateTime<Utc>,
    ) -> Result<bool, FraudCheckError> {
        let key = VerdictKey::new(user_email, promo_id);
        if let Some(approved) = self.cache.get(&key, now) {
            return Ok(approved);
        }

        let mut last_error = FraudGatewayError::Transport("antifraud never attempted".to_string());
        for attempt in 1..=ATTEMPT_BUDGET {
            match self.gateway.validate(user_email, promo_id).await {
                Ok(verdict) => {
                    if let Some(expires_at) = verdict.cache_until {
                        self.cache.put(&key, verdict.ok, expires_at);
                    }
                    return Ok(verdict.ok);
                }
                Err(error) => {
                    tracing::warn!(%promo_id, attempt, %error, "antifraud attempt failed");
                    last_error = error;
                }
            }
        }

        Err(FraudCheckError::Unavailable {
            attempts: ATTEMPT_BUDGET,
            last_error,
        })
    }
}
