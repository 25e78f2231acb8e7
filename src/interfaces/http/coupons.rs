use super::{ApiResult, AppState, Envelope, data};
use crate::application::coupons::{CouponPreview, CouponPreviewRequest};
use axum::Json;
use axum::extract::State;

/// Serves both `check` and `validate`: a read-only pricing preview.
pub async fn preview(
    State(state): State<AppState>,
    Json(req): Json<CouponPreviewRequest>,
) -> ApiResult<Json<Envelope<CouponPreview>>> {
    Ok(data(state.ledger.coupons().preview(&req).await?))
}
