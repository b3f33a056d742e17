use std::{collections::HashMap, future::Future, sync::Arc};

use anyhow::{Error, Result, anyhow};
use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    routing::post,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    clients::sender::ConnectionProbe,
    dispatcher::NotificationDispatcher,
    models::{
        channel::Channel,
        health::HealthResponse,
        message::NotificationRequest,
        response::{ConnectionTestResponse, DispatchResponse, ErrorResponse},
    },
};

pub struct AppState {
    pub service_name: String,
    pub dispatcher: NotificationDispatcher,
    pub probe: Option<Arc<dyn ConnectionProbe>>,
    pub webhook_verify_token: Option<String>,
}

pub fn build_router(state: AppState) -> Router {
    let channel = state.dispatcher.channel();
    let has_probe = state.probe.is_some();

    let mut app = Router::new()
        .route("/actuator/health", get(health_check))
        .route("/send-test", post(send_test));

    if has_probe {
        app = app.route("/test-connection", get(test_connection));
    }

    if channel == Channel::WhatsApp {
        app = app.route("/webhook", get(verify_webhook).post(receive_webhook));
    }

    app.layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Binds the HTTP port on all interfaces.
pub async fn bind_listener(port: u16) -> Result<TcpListener, Error> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow!("Failed to bind {}: {}", addr, e))?;

    info!(address = %addr, "HTTP listener bound");

    Ok(listener)
}

pub async fn run_api_server<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
) -> Result<(), Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);

    info!("HTTP server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow!("HTTP server failed: {}", e))?;

    Ok(())
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse::up(&state.service_name)))
}

async fn send_test(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: NotificationRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Rejected test request with malformed body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Invalid JSON".to_string(), e.to_string())),
            )
                .into_response();
        }
    };

    info!(notification_id = %request.notification_id, "Test send requested");

    match state.dispatcher.dispatch(&request).await {
        Ok(dispatched) => (
            StatusCode::OK,
            Json(DispatchResponse::sent(
                request.notification_id,
                dispatched.recipient,
                dispatched.receipt.message_id,
            )),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(DispatchResponse::failed(request.notification_id, e.to_string())),
        )
            .into_response(),
    }
}

async fn test_connection(State(state): State<Arc<AppState>>) -> Response {
    let Some(probe) = state.probe.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match probe.test_connection().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ConnectionTestResponse::success("SMTP connection successful".to_string())),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Connection test failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ConnectionTestResponse::fail(
                    "SMTP connection failed".to_string(),
                    e.to_string(),
                )),
            )
                .into_response()
        }
    }
}

async fn verify_webhook(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let expected = state
        .webhook_verify_token
        .as_deref()
        .filter(|token| !token.is_empty());

    let presented = params.get("hub.verify_token").map(String::as_str);
    let challenge = params.get("hub.challenge");

    match (expected, presented, challenge) {
        (Some(expected), Some(presented), Some(challenge)) if expected == presented => {
            info!("Webhook verified");
            (StatusCode::OK, challenge.clone()).into_response()
        }
        _ => {
            warn!("Webhook verification failed");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

async fn receive_webhook(body: Bytes) -> StatusCode {
    info!(body = %String::from_utf8_lossy(&body), "Webhook callback received");
    StatusCode::OK
}
