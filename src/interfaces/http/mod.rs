//! JSON HTTP interface.
//!
//! Buyer identity arrives in the `x-user-id` header set by the upstream auth
//! layer; admin routes additionally require `x-user-role: admin`. Successful
//! responses are wrapped as `{"data": ...}` and failures as
//! `{"error": ..., "code": ...}`, except provider callbacks which answer in
//! the provider's own acknowledgement shape.

mod admin;
mod coupons;
mod orders;
mod payments;

use crate::application::ledger::OrderLedger;
use crate::application::payments::PaymentService;
use crate::domain::UserId;
use crate::error::LedgerError;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<OrderLedger>,
    pub payments: PaymentService,
}

impl AppState {
    pub fn new(ledger: Arc<OrderLedger>, payments: PaymentService) -> Self {
        Self { ledger, payments }
    }
}

/// Builds the application router (separate from `serve` for testing).
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/orders", post(orders::create_order).get(orders::list_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/pay", post(orders::pay_order))
        .route("/orders/:id/cancel", post(orders::cancel_order))
        .route("/payments/create", post(payments::create_payment))
        .route("/payments/momo/callback", post(payments::momo_callback))
        .route("/payments/zalopay/callback", post(payments::zalopay_callback))
        .route("/payments/status", get(payments::payment_status))
        .route("/coupons/check", post(coupons::preview))
        .route("/coupons/validate", post(coupons::preview))
        .route("/admin/orders", get(admin::list_orders))
        .route("/admin/orders/:id/status", patch(admin::update_order_status))
        .route("/admin/coupons", get(admin::list_coupons).post(admin::create_coupon))
        .route(
            "/admin/coupons/:id",
            patch(admin::update_coupon).delete(admin::deactivate_coupon),
        );

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .with_state(state)
}

pub async fn serve(state: AppState, bind: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "HTTP API listening");
    axum::serve(listener, router(state)).await
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// Success envelope.
#[derive(Serialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn data<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        data,
        message: None,
    })
}

/// Failure of an HTTP request, rendered as the JSON error envelope.
#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    Unauthorized,
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
                "UNAUTHORIZED",
            ),
            ApiError::Ledger(err) => {
                let status = match &err {
                    LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
                    LedgerError::BadRequest(_) => StatusCode::BAD_REQUEST,
                    LedgerError::Conflict(_) => StatusCode::CONFLICT,
                    LedgerError::Forbidden(_) => StatusCode::FORBIDDEN,
                    LedgerError::InternalError(_) | LedgerError::ProviderError(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
                    error!(error = %err, "Request failed");
                    "Internal server error".to_string()
                } else {
                    err.to_string()
                };
                (status, message, err.code())
            }
        };
        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// The authenticated buyer making the request.
#[derive(Debug, Clone, Copy)]
pub struct Buyer(pub UserId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Buyer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .map(Buyer)
            .ok_or(ApiError::Unauthorized)
    }
}

/// An authenticated caller holding the admin role.
#[derive(Debug, Clone, Copy)]
pub struct Admin(pub UserId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Buyer(user_id) = Buyer::from_request_parts(parts, state).await?;
        let is_admin = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|role| role.eq_ignore_ascii_case("admin"));
        if !is_admin {
            return Err(LedgerError::forbidden("Admin access required").into());
        }
        Ok(Admin(user_id))
    }
}
