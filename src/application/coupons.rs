use super::{PaginationInfo, page_bounds, paginate};
use crate::domain::coupon::{
    Coupon, CouponPatch, DiscountType, NewCoupon, Quote, Rejection, validate_rules,
};
use crate::domain::money::Money;
use crate::domain::ports::{CouponStoreRef, CourseStoreRef};
use crate::domain::{CouponId, CourseId};
use crate::error::{LedgerError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Outcome of pricing a purchase against a coupon code.
#[derive(Debug, PartialEq, Clone)]
pub enum Evaluation {
    Eligible { coupon: Coupon, quote: Quote },
    Ineligible(Rejection),
}

#[derive(Debug, Deserialize, Clone)]
pub struct CouponPreviewRequest {
    pub coupon_code: String,
    pub course_id: CourseId,
    pub order_total: Money,
}

/// A stateless pricing preview, shaped for clients.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct CouponPreview {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_type: Option<DiscountType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_price: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_order_amount: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_discount_amount: Option<Money>,
    pub message: String,
}

impl CouponPreview {
    fn rejected(code: Option<String>, rejection: Rejection) -> Self {
        let min_order_amount = match &rejection {
            Rejection::MinimumNotMet { threshold } => Some(*threshold),
            _ => None,
        };
        Self {
            valid: false,
            coupon_code: code,
            discount_type: None,
            discount_value: None,
            discount_amount: None,
            final_price: None,
            min_order_amount,
            max_discount_amount: None,
            message: rejection.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CouponListQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub is_active: Option<bool>,
    pub search_code: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct CouponPage {
    pub coupons: Vec<Coupon>,
    pub pagination: PaginationInfo,
}

/// Prices purchases against coupons and administers the coupon book.
///
/// Evaluation never touches `used_count`; usage is accounted by the ledger
/// when an order completes.
#[derive(Clone)]
pub struct CouponService {
    coupons: CouponStoreRef,
    courses: CourseStoreRef,
}

impl CouponService {
    pub fn new(coupons: CouponStoreRef, courses: CourseStoreRef) -> Self {
        Self { coupons, courses }
    }

    /// Looks up `code` and prices `order_total` for a purchase of `course_id`.
    pub async fn evaluate(&self, code: &str, course_id: CourseId, order_total: Money) -> Result<Evaluation> {
        let Some(coupon) = self.coupons.find_by_code(code).await? else {
            debug!(code, course_id, "Coupon not found");
            return Ok(Evaluation::Ineligible(Rejection::InvalidCode));
        };

        let evaluation = match coupon.evaluate(order_total, Utc::now()) {
            Ok(quote) => Evaluation::Eligible { coupon, quote },
            Err(rejection) => Evaluation::Ineligible(rejection),
        };
        debug!(code, course_id, ?evaluation, "Coupon evaluated");
        Ok(evaluation)
    }

    /// The public check/validate preview. Read-only.
    pub async fn preview(&self, req: &CouponPreviewRequest) -> Result<CouponPreview> {
        if req.order_total.is_zero() {
            return Err(LedgerError::bad_request("Order total must be greater than 0"));
        }
        if self.courses.get(req.course_id).await?.is_none() {
            return Ok(CouponPreview::rejected(None, Rejection::CourseNotFound));
        }

        match self
            .evaluate(&req.coupon_code, req.course_id, req.order_total)
            .await?
        {
            Evaluation::Eligible { coupon, quote } => Ok(CouponPreview {
                valid: true,
                coupon_code: Some(coupon.code),
                discount_type: Some(coupon.discount_type),
                discount_value: Some(coupon.discount_value),
                discount_amount: Some(quote.discount_amount),
                final_price: Some(quote.final_price),
                min_order_amount: Some(coupon.min_order_amount),
                max_discount_amount: coupon.max_discount_amount,
                message: format!(
                    "Coupon applied successfully! You save {}",
                    quote.discount_amount
                ),
            }),
            Evaluation::Ineligible(Rejection::InvalidCode) => {
                Ok(CouponPreview::rejected(None, Rejection::InvalidCode))
            }
            Evaluation::Ineligible(rejection) => Ok(CouponPreview::rejected(
                Some(Coupon::normalize_code(&req.coupon_code)),
                rejection,
            )),
        }
    }

    pub async fn create_coupon(&self, new: NewCoupon) -> Result<Coupon> {
        validate_rules(&new.clone().into_coupon(0))?;
        let coupon = self.coupons.insert(new).await?;
        info!(coupon_id = coupon.id, code = %coupon.code, "Coupon created");
        Ok(coupon)
    }

    /// Partial admin edit, merged and validated inside the store so a
    /// concurrent completion's usage increment is kept.
    pub async fn update_coupon(&self, id: CouponId, patch: CouponPatch) -> Result<Coupon> {
        let coupon = self.coupons.apply_patch(id, patch).await?;
        info!(coupon_id = id, "Coupon updated");
        Ok(coupon)
    }

    /// Soft delete: the coupon stays referenced by past orders but can no
    /// longer be redeemed.
    pub async fn deactivate_coupon(&self, id: CouponId) -> Result<Coupon> {
        self.update_coupon(
            id,
            CouponPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn list_coupons(&self, query: &CouponListQuery) -> Result<CouponPage> {
        let (page, limit) = page_bounds(query.page, query.limit, 10);
        let needle = query.search_code.as_deref().map(Coupon::normalize_code);

        let mut coupons: Vec<Coupon> = self
            .coupons
            .list()
            .await?
            .into_iter()
            .filter(|c| query.is_active.is_none_or(|active| c.is_active == active))
            .filter(|c| needle.as_ref().is_none_or(|n| c.code.contains(n.as_str())))
            .collect();
        coupons.sort_by(|a, b| b.id.cmp(&a.id));

        let (coupons, pagination) = paginate(coupons, page, limit);
        Ok(CouponPage {
            coupons,
            pagination,
        })
    }
}
