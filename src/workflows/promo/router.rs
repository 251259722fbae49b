use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::cache::VerdictCache;
use super::domain::{CompanyId, NewPromo, PromoId, PromoPatch, UserId, UserProfile};
use super::fraud::FraudGateway;
use super::repository::{PromoRepository, RepositoryError};
use super::service::{FeedQuery, PromoService, PromoServiceError};

/// Router builder exposing the promo endpoints.
///
/// Authentication is an upstream concern; the caller's identity arrives as
/// an `x-user-id` (or `x-company-id`) header set by the gateway.
pub fn promo_router<R, G, C>(service: Arc<PromoService<R, G, C>>) -> Router
where
    R: PromoRepository + 'static,
    G: FraudGateway + 'static,
    C: VerdictCache + 'static,
{
    Router::new()
        .route("/api/v1/user", post(register_user_handler::<R, G, C>))
        .route(
            "/api/v1/promo/feed",
            get(feed_handler::<R, G, C>),
        )
        .route(
            "/api/v1/promo/history",
            get(history_handler::<R, G, C>),
        )
        .route(
            "/api/v1/promo/:promo_id",
            get(promo_view_handler::<R, G, C>),
        )
        .route(
            "/api/v1/promo/:promo_id/activate",
            post(activate_handler::<R, G, C>),
        )
        .route(
            "/api/v1/business/promo",
            post(create_promo_handler::<R, G, C>),
        )
        .route(
            "/api/v1/business/promo/:promo_id",
            get(owner_view_handler::<R, G, C>).patch(patch_promo_handler::<R, G, C>),
        )
        .route(
            "/api/v1/business/promo/:promo_id/stat",
            get(stats_handler::<R, G, C>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageParams {
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeedParams {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    active: Option<bool>,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

fn default_limit() -> usize {
    10
}

pub(crate) async fn register_user_handler<R, G, C>(
    State(service): State<Arc<PromoService<R, G, C>>>,
    axum::Json(profile): axum::Json<UserProfile>,
) -> Response
where
    R: PromoRepository + 'static,
    G: FraudGateway + 'static,
    C: VerdictCache + 'static,
{
    match service.register_user(profile) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn activate_handler<R, G, C>(
    State(service): State<Arc<PromoService<R, G, C>>>,
    Path(promo_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response
where
    R: PromoRepository + 'static,
    G: FraudGateway + 'static,
    C: VerdictCache + 'static,
{
    let user_id = match user_identity(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    match service
        .activate(&user_id, &PromoId(promo_id), chrono::Utc::now())
        .await
    {
        Ok(receipt) => {
            let payload = json!({ "promo": receipt.code });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn promo_view_handler<R, G, C>(
    State(service): State<Arc<PromoService<R, G, C>>>,
    Path(promo_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response
where
    R: PromoRepository + 'static,
    G: FraudGateway + 'static,
    C: VerdictCache + 'static,
{
    let user_id = match user_identity(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    match service.promo_for_user(&user_id, &PromoId(promo_id), chrono::Utc::now()) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn feed_handler<R, G, C>(
    State(service): State<Arc<PromoService<R, G, C>>>,
    Query(params): Query<FeedParams>,
    headers: HeaderMap,
) -> Response
where
    R: PromoRepository + 'static,
    G: FraudGateway + 'static,
    C: VerdictCache + 'static,
{
    let user_id = match user_identity(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    let query = FeedQuery {
        category: params.category,
        active: params.active,
        limit: params.limit,
        offset: params.offset,
    };

    match service.feed(&user_id, &query, chrono::Utc::now()) {
        Ok((views, total)) => paged_response(views, total),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn history_handler<R, G, C>(
    State(service): State<Arc<PromoService<R, G, C>>>,
    Query(params): Query<PageParams>,
    headers: HeaderMap,
) -> Response
where
    R: PromoRepository + 'static,
    G: FraudGateway + 'static,
    C: VerdictCache + 'static,
{
    let user_id = match user_identity(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    match service.activation_history(&user_id, params.limit, params.offset, chrono::Utc::now()) {
        Ok((views, total)) => paged_response(views, total),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_promo_handler<R, G, C>(
    State(service): State<Arc<PromoService<R, G, C>>>,
    headers: HeaderMap,
    axum::Json(new_promo): axum::Json<NewPromo>,
) -> Response
where
    R: PromoRepository + 'static,
    G: FraudGateway + 'static,
    C: VerdictCache + 'static,
{
    let company_id = match company_identity(&headers) {
        Ok(company_id) => company_id,
        Err(response) => return response,
    };
    let company_name = headers
        .get("x-company-name")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    match service.create_promo(company_id, &company_name, new_promo, chrono::Utc::now()) {
        Ok(promo_id) => {
            let payload = json!({ "id": promo_id });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn owner_view_handler<R, G, C>(
    State(service): State<Arc<PromoService<R, G, C>>>,
    Path(promo_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response
where
    R: PromoRepository + 'static,
    G: FraudGateway + 'static,
    C: VerdictCache + 'static,
{
    let company_id = match company_identity(&headers) {
        Ok(company_id) => company_id,
        Err(response) => return response,
    };

    match service.promo_for_company(&company_id, &PromoId(promo_id), chrono::Utc::now()) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn patch_promo_handler<R, G, C>(
    State(service): State<Arc<PromoService<R, G, C>>>,
    Path(promo_id): Path<Uuid>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<PromoPatch>,
) -> Response
where
    R: PromoRepository + 'static,
    G: FraudGateway + 'static,
    C: VerdictCache + 'static,
{
    let company_id = match company_identity(&headers) {
        Ok(company_id) => company_id,
        Err(response) => return response,
    };

    match service.patch_promo(&company_id, &PromoId(promo_id), body, chrono::Utc::now()) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn stats_handler<R, G, C>(
    State(service): State<Arc<PromoService<R, G, C>>>,
    Path(promo_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response
where
    R: PromoRepository + 'static,
    G: FraudGateway + 'static,
    C: VerdictCache + 'static,
{
    let company_id = match company_identity(&headers) {
        Ok(company_id) => company_id,
        Err(response) => return response,
    };

    match service.activation_stats(&company_id, &PromoId(promo_id)) {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(error) => error_response(error),
    }
}

fn user_identity(headers: &HeaderMap) -> Result<UserId, Response> {
    identity(headers, "x-user-id").map(UserId)
}

fn company_identity(headers: &HeaderMap) -> Result<CompanyId, Response> {
    identity(headers, "x-company-id").map(CompanyId)
}

fn identity(headers: &HeaderMap, header: &'static str) -> Result<Uuid, Response> {
    headers
        .get(header)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or_else(|| {
            let payload = json!({ "error": format!("missing or invalid {header} header") });
            (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
        })
}

fn paged_response<T: serde::Serialize>(views: Vec<T>, total: usize) -> Response {
    (
        StatusCode::OK,
        [("x-total-count", total.to_string())],
        axum::Json(views),
    )
        .into_response()
}

fn error_response(error: PromoServiceError) -> Response {
    let (status, message) = match &error {
        PromoServiceError::PromoNotFound | PromoServiceError::UserNotFound => {
            (StatusCode::NOT_FOUND, error.to_string())
        }
        PromoServiceError::Ineligible(reason) => {
            (StatusCode::FORBIDDEN, reason.summary().to_string())
        }
        PromoServiceError::FraudRejected => (StatusCode::FORBIDDEN, error.to_string()),
        PromoServiceError::FraudUnavailable(source) => {
            // Forbidden-class for the caller, but reported distinctly so an
            // antifraud outage is visible in the logs.
            tracing::warn!(error = %source, "activation failed closed: antifraud unavailable");
            (
                StatusCode::FORBIDDEN,
                "fraud check unavailable".to_string(),
            )
        }
        PromoServiceError::Validation(source) => (StatusCode::BAD_REQUEST, source.to_string()),
        PromoServiceError::Repository(RepositoryError::Conflict) => {
            (StatusCode::CONFLICT, error.to_string())
        }
        PromoServiceError::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    };

    let payload = json!({ "error": message });
    (status, axum::Json(payload)).into_response()
}
