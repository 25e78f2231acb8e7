use super::CouponId;
use super::money::Money;
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

/// A reusable discount rule applied when an order is priced.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_order_amount: Money,
    pub max_discount_amount: Option<Money>,
    pub usage_limit: Option<u32>,
    pub used_count: u32,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// The priced outcome of applying an eligible coupon.
#[derive(Debug, Serialize, PartialEq, Clone, Copy)]
pub struct Quote {
    pub order_total: Money,
    pub discount_amount: Money,
    pub final_price: Money,
}

/// Why a coupon cannot be applied. The first failing check wins.
#[derive(Debug, PartialEq, Clone)]
pub enum Rejection {
    InvalidCode,
    NotAvailable,
    MinimumNotMet { threshold: Money },
    CourseNotFound,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::InvalidCode => write!(f, "Invalid coupon code"),
            Rejection::NotAvailable => write!(f, "Coupon is expired or not available"),
            Rejection::MinimumNotMet { threshold } => {
                write!(f, "Minimum order amount for this coupon is {}", threshold)
            }
            Rejection::CourseNotFound => write!(f, "Course not found"),
        }
    }
}

impl From<Rejection> for LedgerError {
    fn from(rejection: Rejection) -> Self {
        LedgerError::BadRequest(rejection.to_string())
    }
}

impl Coupon {
    /// Normalized form under which codes are stored and looked up.
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase()
    }

    /// Whether the coupon can be redeemed at `now`, ignoring order amounts.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        if self.valid_from.is_some_and(|from| now < from) {
            return false;
        }
        if self.valid_to.is_some_and(|to| now > to) {
            return false;
        }
        self.has_uses_left()
    }

    pub fn has_uses_left(&self) -> bool {
        self.usage_limit.is_none_or(|limit| self.used_count < limit)
    }

    /// Records one use if the limit allows it.
    pub fn redeem(&mut self) -> bool {
        if !self.has_uses_left() {
            return false;
        }
        self.used_count += 1;
        true
    }

    /// Prices `order_total` against this coupon.
    ///
    /// Has no side effects: usage is only accounted when an order completes.
    pub fn evaluate(&self, order_total: Money, now: DateTime<Utc>) -> Result<Quote, Rejection> {
        if !self.is_active {
            return Err(Rejection::InvalidCode);
        }
        if !self.is_available(now) {
            return Err(Rejection::NotAvailable);
        }
        if order_total < self.min_order_amount {
            return Err(Rejection::MinimumNotMet {
                threshold: self.min_order_amount,
            });
        }

        let raw = match self.discount_type {
            DiscountType::Percentage => order_total.percent(self.discount_value),
            DiscountType::Fixed => Money::new(self.discount_value).unwrap_or(Money::ZERO),
        };
        let discount_amount = match self.max_discount_amount {
            Some(cap) if raw > cap => cap,
            _ => raw,
        };

        Ok(Quote {
            order_total,
            discount_amount,
            final_price: order_total - discount_amount,
        })
    }
}

/// Admin input for a new coupon.
#[derive(Debug, Deserialize, Clone)]
pub struct NewCoupon {
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    #[serde(default)]
    pub min_order_amount: Money,
    #[serde(default)]
    pub max_discount_amount: Option<Money>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl NewCoupon {
    pub fn into_coupon(self, id: CouponId) -> Coupon {
        Coupon {
            id,
            code: Coupon::normalize_code(&self.code),
            description: self.description,
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            min_order_amount: self.min_order_amount,
            max_discount_amount: self.max_discount_amount,
            usage_limit: self.usage_limit,
            used_count: 0,
            valid_from: self.valid_from,
            valid_to: self.valid_to,
            is_active: self.is_active.unwrap_or(true),
        }
    }
}

/// Partial admin update. `used_count` is deliberately absent.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CouponPatch {
    pub description: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<Decimal>,
    pub min_order_amount: Option<Money>,
    pub max_discount_amount: Option<Money>,
    pub usage_limit: Option<u32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

impl CouponPatch {
    pub fn apply(self, coupon: &mut Coupon) {
        if let Some(description) = self.description {
            coupon.description = description;
        }
        if let Some(discount_type) = self.discount_type {
            coupon.discount_type = discount_type;
        }
        if let Some(value) = self.discount_value {
            coupon.discount_value = value;
        }
        if let Some(min) = self.min_order_amount {
            coupon.min_order_amount = min;
        }
        if let Some(max) = self.max_discount_amount {
            coupon.max_discount_amount = Some(max);
        }
        if let Some(limit) = self.usage_limit {
            coupon.usage_limit = Some(limit);
        }
        if let Some(from) = self.valid_from {
            coupon.valid_from = Some(from);
        }
        if let Some(to) = self.valid_to {
            coupon.valid_to = Some(to);
        }
        if let Some(active) = self.is_active {
            coupon.is_active = active;
        }
    }
}

/// Rules every stored coupon must satisfy after an admin edit.
pub fn validate_rules(coupon: &Coupon) -> Result<(), LedgerError> {
    if coupon.code.len() < 3 || coupon.code.len() > 50 {
        return Err(LedgerError::bad_request(
            "Coupon code must be between 3 and 50 characters",
        ));
    }
    if coupon.discount_value <= Decimal::ZERO {
        return Err(LedgerError::bad_request(
            "Discount value must be greater than 0",
        ));
    }
    if coupon.discount_type == DiscountType::Percentage
        && coupon.discount_value > Decimal::ONE_HUNDRED
    {
        return Err(LedgerError::bad_request(
            "Percentage discount cannot exceed 100%",
        ));
    }
    if let (Some(from), Some(to)) = (coupon.valid_from, coupon.valid_to)
        && to < from
    {
        return Err(LedgerError::bad_request(
            "Valid to date must be after valid from date",
        ));
    }
    Ok(())
}
