use crate::{
    intake::{IntakeController, IntakeEvent},
    logging::log_payloads,
    models::AppState,
    routes::{intake, recipe},
};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{ConnectInfo, DefaultBodyLimit};
use axum::http::{Request, Response};
use axum::middleware::from_fn;
use axum::routing::{delete, get};
use axum::{Json, Router};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{Span, info_span};

async fn healthz() -> Json<&'static str> {
    Json("ok")
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.body_limit();

    let trace = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            let method = req.method().to_string();
            let uri = req.uri().to_string();
            let client_ip = req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map_or_else(|| "-".into(), |ci| ci.0.to_string());
            let rid = req
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");

            info_span!("http", method=%method, uri=%uri, client_ip=%client_ip, request_id=%rid)
        })
        .on_request(|_req: &Request<Body>, _span: &Span| {
            tracing::debug!("request started");
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &Span| {
            tracing::info!(status=%res.status(), latency_ms=%latency.as_millis(), "response completed");
        })
        .on_failure(
            |class: ServerErrorsFailureClass, latency: Duration, _span: &Span| {
                tracing::error!(%class, latency_ms=%latency.as_millis(), "request failed");
            },
        );

    // Request-ID middleware wraps tracing and payload logging so the span
    // and every body line carry the x-request-id header.
    let request_id_layer = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id());

    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/intake",
            get(intake::get)
                .post(intake::upload)
                .put(intake::replace)
                .delete(intake::clear),
        )
        .route("/intake/{id}", delete(intake::remove))
        .route("/recipe", get(recipe::get).post(recipe::submit))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(from_fn(log_payloads))
        .layer(trace)
        .layer(request_id_layer)
        .layer(cors_layer())
}

/// Surfaces removals to the operator, one log line per removed file.
pub fn spawn_removal_notices(intake: &Arc<IntakeController>) -> JoinHandle<()> {
    let mut rx = intake.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(IntakeEvent::Removed(entry)) => {
                    tracing::info!("{} removed successfully", entry.name);
                }
                Ok(IntakeEvent::SelectionChanged(files)) => {
                    tracing::debug!(count = files.len(), "selection changed");
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "intake notices lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
