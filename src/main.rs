use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{Local, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use promo_engine::config::AppConfig;
use promo_engine::error::AppError;
use promo_engine::telemetry;
use promo_engine::workflows::promo::{
    eligibility, CompanyId, HttpFraudGateway, InMemoryPromoStore, InMemoryVerdictCache, Promo,
    PromoId, PromoKind, PromoService, Target, UserId, UserProfile,
};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Promo Activation Service",
    about = "Serve the promo distribution API or preview eligibility decisions offline",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Evaluate a hypothetical promo/user pair without touching any store
    Eligibility(EligibilityArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct EligibilityArgs {
    /// Campaign activity start (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    active_from: Option<NaiveDate>,
    /// Campaign activity end (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    active_until: Option<NaiveDate>,
    /// Country the campaign targets (ISO 3166-1 alpha-2)
    #[arg(long)]
    target_country: Option<String>,
    /// Minimum targeted age
    #[arg(long)]
    target_age_from: Option<u8>,
    /// Maximum targeted age
    #[arg(long)]
    target_age_until: Option<u8>,
    /// Total redemption capacity
    #[arg(long, default_value_t = 1)]
    capacity: u32,
    /// Units already consumed
    #[arg(long, default_value_t = 0)]
    used: u32,
    /// Treat the campaign as manually disabled
    #[arg(long)]
    disabled: bool,
    /// Country on the user's profile
    #[arg(long)]
    user_country: Option<String>,
    /// Age on the user's profile
    #[arg(long)]
    user_age: Option<u8>,
    /// Evaluation date (defaults to today)
    #[arg(long, value_parser = parse_date)]
    today: Option<NaiveDate>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Eligibility(args) => {
            run_eligibility_preview(args);
            Ok(())
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let store = Arc::new(InMemoryPromoStore::default());
    let cache = Arc::new(InMemoryVerdictCache::default());
    let gateway = Arc::new(HttpFraudGateway::new(
        &config.antifraud.address,
        config.antifraud.timeout,
    )?);
    let service = Arc::new(PromoService::new(store, gateway, cache));

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(promo_engine::workflows::promo::promo_router(service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, antifraud = %config.antifraud.address, "promo activation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_eligibility_preview(args: EligibilityArgs) {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let (promo, user) = preview_pair(&args);

    println!("Eligibility preview");
    println!(
        "Window: {} -> {} (evaluated {})",
        promo
            .active_from
            .map_or_else(|| "open".to_string(), |date| date.to_string()),
        promo
            .active_until
            .map_or_else(|| "open".to_string(), |date| date.to_string()),
        today
    );
    println!(
        "Capacity: {} used of {}",
        promo.used_count,
        promo.capacity()
    );
    println!(
        "Currently active: {}",
        eligibility::is_currently_active(&promo, today)
    );

    match eligibility::evaluate_activation(&promo, &user, today) {
        Ok(()) => println!("Verdict: eligible"),
        Err(reason) => println!("Verdict: ineligible ({})", reason.summary()),
    }
}

fn preview_pair(args: &EligibilityArgs) -> (Promo, UserProfile) {
    let promo = Promo {
        promo_id: PromoId(Uuid::nil()),
        company_id: CompanyId(Uuid::nil()),
        company_name: "preview".to_string(),
        kind: PromoKind::Common {
            code: "PREVIEW".to_string(),
            max_count: args.capacity,
        },
        used_count: args.used,
        description: None,
        image_url: None,
        active_from: args.active_from,
        active_until: args.active_until,
        target: Target {
            age_from: args.target_age_from,
            age_until: args.target_age_until,
            country: args.target_country.clone(),
            categories: None,
        },
        enabled: !args.disabled,
        like_count: 0,
        comment_count: 0,
        created_at: Utc::now(),
    };

    let user = UserProfile {
        user_id: UserId(Uuid::nil()),
        name: "preview".to_string(),
        surname: "user".to_string(),
        email: "preview@example.com".to_string(),
        avatar_url: None,
        country: args.user_country.clone(),
        age: args.user_age,
    };

    (promo, user)
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_iso_dates() {
        let date = parse_date(" 2025-10-01 ").expect("date parses");
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 10, 1).expect("valid"));
        assert!(parse_date("October 1st").is_err());
    }

    #[test]
    fn preview_reports_targeting_mismatch() {
        let args = EligibilityArgs {
            active_from: None,
            active_until: None,
            target_country: Some("US".to_string()),
            target_age_from: None,
            target_age_until: None,
            capacity: 1,
            used: 0,
            disabled: false,
            user_country: Some("FR".to_string()),
            user_age: None,
            today: None,
        };

        let (promo, user) = preview_pair(&args);
        let today = NaiveDate::from_ymd_opt(2025, 10, 1).expect("valid");
        assert!(eligibility::is_currently_active(&promo, today));
        assert!(eligibility::evaluate_activation(&promo, &user, today).is_err());
    }
}
