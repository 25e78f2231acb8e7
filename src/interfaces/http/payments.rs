use super::{ApiResult, AppState, Buyer, Envelope, data};
use crate::application::payments::{
    CallbackOutcome, CreatePaymentRequest, PaymentCreated, PaymentStatusView,
};
use crate::domain::OrderId;
use crate::error::Result;
use crate::gateway::momo::MomoIpn;
use crate::gateway::zalopay::ZaloPayCallback;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

#[derive(Deserialize)]
pub struct CreatePaymentBody {
    order_id: OrderId,
    payment_method: String,
    #[serde(default)]
    return_url: Option<String>,
}

pub async fn create_payment(
    State(state): State<AppState>,
    Buyer(buyer): Buyer,
    Json(body): Json<CreatePaymentBody>,
) -> ApiResult<Json<Envelope<PaymentCreated>>> {
    let req = CreatePaymentRequest {
        order_id: body.order_id,
        payment_method: body.payment_method.parse()?,
        return_url: body.return_url,
    };
    Ok(data(state.payments.create_payment(buyer, req).await?))
}

#[derive(Deserialize)]
pub struct StatusQuery {
    order_id: OrderId,
}

pub async fn payment_status(
    State(state): State<AppState>,
    Buyer(buyer): Buyer,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<Envelope<PaymentStatusView>>> {
    Ok(data(
        state
            .payments
            .check_payment_status(buyer, query.order_id)
            .await?,
    ))
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MomoAck {
    pub result_code: i32,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ZaloPayAck {
    pub return_code: i32,
    pub return_message: String,
}

/// Collapses the callback result into `(acknowledged, message)`. Internal
/// failures are logged and answered negatively so the provider retries.
fn settle(result: Result<CallbackOutcome>) -> (bool, String) {
    match result {
        Ok(outcome) => (outcome.acknowledged(), outcome.message()),
        Err(e) => {
            error!(error = %e, "Callback processing failed");
            (false, "Internal server error".to_string())
        }
    }
}

pub async fn momo_callback(State(state): State<AppState>, body: Bytes) -> Json<MomoAck> {
    let (ok, message) = match serde_json::from_slice::<MomoIpn>(&body) {
        Ok(ipn) => settle(state.payments.handle_momo_callback(ipn).await),
        Err(e) => {
            warn!(error = %e, "Unreadable MoMo callback");
            (false, "Invalid payload".to_string())
        }
    };
    Json(MomoAck {
        result_code: if ok { 0 } else { 1 },
        message,
    })
}

pub async fn zalopay_callback(State(state): State<AppState>, body: Bytes) -> Json<ZaloPayAck> {
    let (ok, message) = match serde_json::from_slice::<ZaloPayCallback>(&body) {
        Ok(callback) => settle(state.payments.handle_zalopay_callback(callback).await),
        Err(e) => {
            warn!(error = %e, "Unreadable ZaloPay callback");
            (false, "Invalid payload".to_string())
        }
    };
    Json(ZaloPayAck {
        return_code: if ok { 1 } else { 0 },
        return_message: message,
    })
}
