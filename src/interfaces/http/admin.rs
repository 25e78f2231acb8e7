use super::{Admin, ApiResult, AppState, Envelope, data};
use crate::application::coupons::{CouponListQuery, CouponPage};
use crate::application::ledger::{AdminOrderPage, AdminOrderQuery, StatusUpdate};
use crate::domain::coupon::{Coupon, CouponPatch, NewCoupon};
use crate::domain::order::Order;
use crate::domain::{CouponId, OrderId};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use tracing::info;

pub async fn list_orders(
    State(state): State<AppState>,
    Admin(_): Admin,
    Query(query): Query<AdminOrderQuery>,
) -> ApiResult<Json<Envelope<AdminOrderPage>>> {
    Ok(data(state.ledger.list_all_orders(&query).await?))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    Admin(admin): Admin,
    Path(id): Path<OrderId>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<Json<Envelope<Order>>> {
    info!(admin_id = admin, order_id = id, status = %update.status, "Admin status change requested");
    let (order, message) = state.ledger.update_order_status(id, update).await?;
    Ok(Json(Envelope {
        data: order,
        message: Some(message),
    }))
}

pub async fn list_coupons(
    State(state): State<AppState>,
    Admin(_): Admin,
    Query(query): Query<CouponListQuery>,
) -> ApiResult<Json<Envelope<CouponPage>>> {
    Ok(data(state.ledger.coupons().list_coupons(&query).await?))
}

pub async fn create_coupon(
    State(state): State<AppState>,
    Admin(_): Admin,
    Json(new): Json<NewCoupon>,
) -> ApiResult<(StatusCode, Json<Envelope<Coupon>>)> {
    let coupon = state.ledger.coupons().create_coupon(new).await?;
    Ok((StatusCode::CREATED, data(coupon)))
}

pub async fn update_coupon(
    State(state): State<AppState>,
    Admin(_): Admin,
    Path(id): Path<CouponId>,
    Json(patch): Json<CouponPatch>,
) -> ApiResult<Json<Envelope<Coupon>>> {
    Ok(data(state.ledger.coupons().update_coupon(id, patch).await?))
}

pub async fn deactivate_coupon(
    State(state): State<AppState>,
    Admin(_): Admin,
    Path(id): Path<CouponId>,
) -> ApiResult<Json<Envelope<Coupon>>> {
    Ok(data(state.ledger.coupons().deactivate_coupon(id).await?))
}
