pub mod cli;

use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::core::{Bill, BillConfig, PortableConfig, codec, expr};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StateQuery {
    state: Option<String>,
}

/// Bill request. `state` is an optional share token used as the starting
/// configuration; any other field present replaces the matching part of it.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SplitPayload {
    state: Option<String>,
    #[serde(flatten)]
    config: PortableConfig,
}

#[derive(Debug, Deserialize)]
struct EvaluatePayload {
    expression: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SplitResponse {
    config: PortableConfig,
    token: String,
    warnings: Vec<String>,
    bill: Bill,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShareResponse {
    token: String,
    query: String,
}

#[derive(Debug, Serialize)]
struct EvaluateResponse {
    value: f64,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router() -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/split", get(split_get_handler).post(split_post_handler))
        .route("/api/share", post(share_handler))
        .route("/api/state", get(state_handler))
        .route("/api/evaluate", post(evaluate_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "bill split HTTP API listening");
    info!("local access: http://127.0.0.1:{}/api/split", addr.port());

    axum::serve(listener, router()).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, StatusResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn split_get_handler(Query(query): Query<StateQuery>) -> Response {
    let config = codec::decode_or_default(query.state.as_deref());
    split_response(&config)
}

async fn split_post_handler(Json(payload): Json<SplitPayload>) -> Response {
    let config = config_from_payload(payload);
    split_response(&config)
}

async fn share_handler(Json(payload): Json<SplitPayload>) -> Response {
    let config = config_from_payload(payload);
    match codec::encode(&config) {
        Ok(token) => json_response(
            StatusCode::OK,
            ShareResponse {
                query: codec::share_query(&token),
                token,
            },
        ),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}

async fn state_handler(Query(query): Query<StateQuery>) -> Response {
    let config = codec::decode_or_default(query.state.as_deref());
    json_response(StatusCode::OK, config.to_portable())
}

async fn evaluate_handler(Json(payload): Json<EvaluatePayload>) -> Response {
    match expr::evaluate_consumption(&payload.expression) {
        Ok(value) => json_response(StatusCode::OK, EvaluateResponse { value }),
        Err(err) => {
            debug!(expression = %payload.expression, error = %err, "expression rejected");
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
    }
}

fn config_from_payload(payload: SplitPayload) -> BillConfig {
    codec::decode_or_default(payload.state.as_deref()).with_overrides(payload.config)
}

fn split_response(config: &BillConfig) -> Response {
    match build_split_response(config) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}

fn build_split_response(config: &BillConfig) -> Result<SplitResponse, codec::CodecError> {
    let bill = config.bill();
    debug!(
        tenants = bill.tenants.len(),
        total_consumption = bill.total_consumption,
        grand_total = bill.grand_total,
        "bill computed"
    );
    Ok(SplitResponse {
        config: config.to_portable(),
        token: codec::encode(config)?,
        warnings: config.schedule.warnings(),
        bill,
    })
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
