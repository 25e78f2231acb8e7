use super::coupon::Quote;
use super::money::Money;
use super::{CouponId, CourseId, OrderId, UserId};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    /// The order status state machine.
    ///
    /// `pending` may settle into `paid`, `failed` or `cancelled`; a paid order
    /// may only be refunded. Everything else, including `paid -> pending` and
    /// `failed|cancelled -> paid`, is rejected.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Paid) | (Pending, Failed) | (Pending, Cancelled) | (Paid, Refunded)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Free,
    Momo,
    #[serde(rename = "zalopay")]
    ZaloPay,
    CreditCard,
    Paypal,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Free => "free",
            PaymentMethod::Momo => "momo",
            PaymentMethod::ZaloPay => "zalopay",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(PaymentMethod::Free),
            "momo" => Ok(PaymentMethod::Momo),
            "zalopay" => Ok(PaymentMethod::ZaloPay),
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "paypal" => Ok(PaymentMethod::Paypal),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            other => Err(LedgerError::bad_request(format!(
                "Unsupported payment method: {other}"
            ))),
        }
    }
}

/// A buyer's intent to purchase one course, priced once at creation.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub id: OrderId,
    pub order_code: String,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub original_price: Money,
    pub discount_amount: Money,
    pub final_price: Money,
    pub coupon_id: Option<CouponId>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: PaymentStatus,
    /// Provider-side transaction reference recorded when payment is initiated.
    pub payment_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_free(&self) -> bool {
        self.final_price.is_zero()
    }

    /// Moves the order to `next`, enforcing the state machine.
    pub fn transition(&mut self, next: PaymentStatus, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.payment_status == next {
            return Err(LedgerError::bad_request(format!(
                "Order already has status: {next}"
            )));
        }
        if !self.payment_status.can_transition_to(next) {
            return Err(LedgerError::bad_request(format!(
                "Cannot change {} order to {}",
                self.payment_status, next
            )));
        }
        self.payment_status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Marks the order paid with `method`.
    pub fn mark_paid(&mut self, method: PaymentMethod, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.transition(PaymentStatus::Paid, now)?;
        self.payment_method = Some(method);
        self.paid_at = Some(now);
        Ok(())
    }
}

/// An order that has been priced but not yet stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub order_code: String,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub original_price: Money,
    pub discount_amount: Money,
    pub final_price: Money,
    pub coupon_id: Option<CouponId>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn priced(
        user_id: UserId,
        course_id: CourseId,
        quote: Quote,
        coupon_id: Option<CouponId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            order_code: generate_order_code(now),
            user_id,
            course_id,
            original_price: quote.order_total,
            discount_amount: quote.discount_amount,
            final_price: quote.order_total - quote.discount_amount,
            coupon_id,
            created_at: now,
        }
    }

    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            order_code: self.order_code,
            user_id: self.user_id,
            course_id: self.course_id,
            original_price: self.original_price,
            discount_amount: self.discount_amount,
            final_price: self.final_price,
            coupon_id: self.coupon_id,
            payment_method: None,
            payment_status: PaymentStatus::Pending,
            payment_reference: None,
            paid_at: None,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// `ORD-<8 hex chars>-<unix seconds>`, short enough to survive the ZaloPay
/// `yymmdd_` prefix within the provider's 40 character limit.
pub fn generate_order_code(now: DateTime<Utc>) -> String {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    format!("ORD-{}-{}", nonce[..8].to_uppercase(), now.timestamp())
}
