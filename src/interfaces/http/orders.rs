use super::{ApiResult, AppState, Buyer, Envelope, data};
use crate::application::ledger::{CreateOrderRequest, OrderListQuery, OrderPage, OrderView};
use crate::domain::OrderId;
use crate::domain::order::{Order, PaymentMethod};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

pub async fn create_order(
    State(state): State<AppState>,
    Buyer(buyer): Buyer,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<Envelope<Order>>)> {
    let order = state.ledger.create_order(buyer, req).await?;
    Ok((StatusCode::CREATED, data(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Buyer(buyer): Buyer,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<Json<Envelope<OrderPage>>> {
    Ok(data(state.ledger.list_orders(buyer, &query).await?))
}

pub async fn get_order(
    State(state): State<AppState>,
    Buyer(buyer): Buyer,
    Path(id): Path<OrderId>,
) -> ApiResult<Json<Envelope<OrderView>>> {
    Ok(data(state.ledger.get_order(buyer, id).await?))
}

#[derive(Deserialize)]
pub struct PayOrderBody {
    payment_method: String,
}

pub async fn pay_order(
    State(state): State<AppState>,
    Buyer(buyer): Buyer,
    Path(id): Path<OrderId>,
    Json(body): Json<PayOrderBody>,
) -> ApiResult<Json<Envelope<Order>>> {
    let method: PaymentMethod = body.payment_method.parse()?;
    Ok(data(state.ledger.pay_order(buyer, id, method).await?))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Buyer(buyer): Buyer,
    Path(id): Path<OrderId>,
) -> ApiResult<Json<Envelope<Order>>> {
    Ok(data(state.ledger.cancel_order(buyer, id).await?))
}
