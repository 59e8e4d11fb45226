//! HTTP server implementation using Axum.

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use ditchpouch_channels::{LogChannel, WhatsAppChannel};
use ditchpouch_core::config::{DitchPouchConfig, WhatsAppConfig};
use ditchpouch_core::error::Result;
use ditchpouch_core::traits::Channel;
use ditchpouch_engine::{Engine, Tracker};
use ditchpouch_scheduler::{DailyBoundary, spawn_daily_boundary};
use std::sync::Arc;

use crate::inbox::Inbox;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Tracker>,
    /// Ordered, de-duplicated hand-off for webhook messages.
    pub inbox: Arc<Inbox>,
    /// Verify token, app secret and the one sender we listen to.
    pub whatsapp: WhatsAppConfig,
    /// `None` leaves the admin routes open.
    pub admin_token: Option<String>,
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Spawns the inbound worker, so it needs a running tokio runtime.
    pub fn new(tracker: Arc<Tracker>, config: &DitchPouchConfig) -> Self {
        let token = config.gateway.admin_token.trim();
        Self {
            inbox: Arc::new(Inbox::spawn(tracker.clone())),
            tracker,
            whatsapp: config.whatsapp.clone(),
            admin_token: (!token.is_empty()).then(|| token.to_string()),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Admin auth middleware: validates the X-Admin-Token header or ?token= query.
async fn require_admin_token(
    State(state): State<Arc<AppState>>,
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Response {
    let Some(expected) = &state.admin_token else {
        return next.run(req).await;
    };

    let from_header = req
        .headers()
        .get("X-Admin-Token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if from_header == expected {
        return next.run(req).await;
    }

    let from_query = req
        .uri()
        .query()
        .into_iter()
        .flat_map(|q| q.split('&'))
        .filter_map(|pair| pair.strip_prefix("token="))
        .any(|token| token == expected);
    if from_query {
        return next.run(req).await;
    }

    (
        axum::http::StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"ok": false, "error": "Unauthorized: invalid or missing admin token"})),
    )
        .into_response()
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    build_router_from_arc(Arc::new(state))
}

pub fn build_router_from_arc(shared: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/v1/progress", get(super::routes::get_progress))
        .route("/api/v1/tick", post(super::routes::daily_tick))
        .route("/api/v1/events", post(super::routes::submit_event))
        .route_layer(axum::middleware::from_fn_with_state(
            shared.clone(),
            require_admin_token,
        ));

    // Meta must reach the webhook without credentials; POSTs are signed instead
    let public = Router::new()
        .route("/health", get(super::routes::health_check))
        .route(
            "/api/v1/webhook/whatsapp",
            get(super::routes::whatsapp_webhook_verify).post(super::routes::whatsapp_webhook),
        );

    protected
        .merge(public)
        .layer({
            let cors = CorsLayer::new()
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(Any)
                .max_age(std::time::Duration::from_secs(3600));

            // Example: DITCHPOUCH_CORS_ORIGINS=https://admin.example.com
            if let Ok(origins_str) = std::env::var("DITCHPOUCH_CORS_ORIGINS") {
                let origins: Vec<_> = origins_str
                    .split(',')
                    .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
                    .collect();
                cors.allow_origin(origins)
            } else {
                cors.allow_origin(Any)
            }
        })
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// WhatsApp when credentials are present, otherwise replies go to the log.
pub fn build_channel(config: &WhatsAppConfig) -> Arc<dyn Channel> {
    if config.is_configured() {
        Arc::new(WhatsAppChannel::new(config.clone()))
    } else {
        tracing::warn!("📝 WhatsApp not configured, replies will only be logged");
        Arc::new(LogChannel::new())
    }
}

/// Assemble store, channel and engine into the shared tracker.
pub fn build_tracker(config: &DitchPouchConfig) -> Result<Arc<Tracker>> {
    let identity = match config.whatsapp.recipient.trim() {
        "" => "default",
        recipient => recipient,
    };
    let store = ditchpouch_store::open(&config.store, identity)?;
    let channel = build_channel(&config.whatsapp);
    let engine = Engine::new(config.tracker.clone());
    Ok(Arc::new(Tracker::new(engine, store, channel)))
}

/// Start the HTTP server and the daily boundary.
pub async fn start(config: DitchPouchConfig) -> anyhow::Result<()> {
    config.validate()?;
    let tracker = build_tracker(&config)?;

    if config.scheduler.enabled {
        let last = tracker.last_boundary().await?;
        let boundary = DailyBoundary::new(&config.scheduler.boundary, chrono::Local::now(), last)?;
        if last.is_none() {
            tracker.record_boundary(boundary.last_fired()).await?;
        }
        let tracker = tracker.clone();
        tokio::spawn(spawn_daily_boundary(
            boundary,
            move |day| {
                let tracker = tracker.clone();
                async move { tracker.close_day(day).await.map(|_| ()) }
            },
            config.scheduler.check_interval_secs,
        ));
    } else {
        tracing::info!("⏸️ Daily boundary disabled; use POST /api/v1/tick or `ditchpouch tick`");
    }

    let state = AppState::new(tracker, &config);
    if state.admin_token.is_none() {
        tracing::warn!("🔓 No admin token set, admin routes are open");
    }
    let app = build_router(state);

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🌐 Gateway server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
