use super::ledger::OrderLedger;
use crate::domain::money::Money;
use crate::domain::order::{Order, PaymentMethod, PaymentStatus};
use crate::domain::{OrderId, UserId};
use crate::error::{LedgerError, Result};
use crate::gateway::momo::MomoIpn;
use crate::gateway::zalopay::{ZaloPayCallback, order_code_from};
use crate::gateway::{CallbackPayload, Gateways, PaymentRequest, PaymentSession, ProviderStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Deserialize, Clone)]
pub struct CreatePaymentRequest {
    pub order_id: OrderId,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub return_url: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PaymentCreated {
    pub order_id: OrderId,
    pub order_code: String,
    pub payment_method: PaymentMethod,
    pub amount: Money,
    #[serde(flatten)]
    pub session: PaymentSession,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PaymentStatusView {
    pub order_id: OrderId,
    pub order_code: String,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub final_price: Money,
    pub paid_at: Option<DateTime<Utc>>,
    pub message: String,
}

impl PaymentStatusView {
    fn new(order: Order, message: impl Into<String>) -> Self {
        Self {
            order_id: order.id,
            order_code: order.order_code,
            payment_status: order.payment_status,
            payment_method: order.payment_method,
            final_price: order.final_price,
            paid_at: order.paid_at,
            message: message.into(),
        }
    }

    fn from_local(order: Order) -> Self {
        let message = match order.payment_status {
            PaymentStatus::Paid => "Payment completed successfully",
            PaymentStatus::Pending => "Payment is pending",
            PaymentStatus::Failed => "Payment failed",
            PaymentStatus::Cancelled => "Payment was cancelled",
            PaymentStatus::Refunded => "Payment was refunded",
        };
        Self::new(order, message)
    }
}

/// What became of a provider notification.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    /// The order is paid, either by this notification or an earlier one.
    Completed(Order),
    MarkedFailed,
    /// Authentic but not applicable to the order's current state.
    Ignored(String),
    /// Not accepted; the order is unchanged.
    Rejected(String),
}

impl CallbackOutcome {
    /// Whether the provider should consider the notification delivered.
    pub fn acknowledged(&self) -> bool {
        !matches!(self, CallbackOutcome::Rejected(_))
    }

    pub fn message(&self) -> String {
        match self {
            CallbackOutcome::Completed(_) => "Success".to_string(),
            CallbackOutcome::MarkedFailed => "Payment failure recorded".to_string(),
            CallbackOutcome::Ignored(reason) | CallbackOutcome::Rejected(reason) => reason.clone(),
        }
    }
}

/// Provider-neutral view of a verified notification.
struct Notice {
    order_code: String,
    amount: i64,
    success: bool,
}

/// Drives the payment providers on behalf of the ledger.
#[derive(Clone)]
pub struct PaymentService {
    ledger: Arc<OrderLedger>,
    gateways: Arc<Gateways>,
}

impl PaymentService {
    pub fn new(ledger: Arc<OrderLedger>, gateways: Arc<Gateways>) -> Self {
        Self { ledger, gateways }
    }

    pub async fn create_payment(&self, buyer: UserId, req: CreatePaymentRequest) -> Result<PaymentCreated> {
        let order = self.ledger.owned_order(buyer, req.order_id).await?;
        if order.payment_status != PaymentStatus::Pending {
            return Err(LedgerError::bad_request("Order has already been processed"));
        }
        if order.is_free() {
            return Err(LedgerError::bad_request(
                "This is a free order, no payment required",
            ));
        }
        let gateway = self
            .gateways
            .for_method(req.payment_method)
            .ok_or_else(|| LedgerError::bad_request("Unsupported payment method"))?;
        self.ledger.ensure_coupon_redeemable(&order).await?;

        let description = format!("Payment for order {}", order.order_code);
        let session = gateway
            .create_payment(&PaymentRequest {
                order_code: &order.order_code,
                amount: order.final_price,
                description: &description,
                return_url: req.return_url.as_deref(),
            })
            .await
            .inspect_err(|e| {
                error!(order_code = %order.order_code, error = %e, "Payment creation failed")
            })?;

        let order = self
            .ledger
            .record_payment_attempt(order.id, req.payment_method, session.reference.clone())
            .await?;
        info!(
            order_code = %order.order_code,
            payment_method = %req.payment_method,
            reference = %session.reference,
            "Payment initiated"
        );

        Ok(PaymentCreated {
            order_id: order.id,
            order_code: order.order_code,
            payment_method: req.payment_method,
            amount: order.final_price,
            session,
        })
    }

    pub async fn handle_momo_callback(&self, ipn: MomoIpn) -> Result<CallbackOutcome> {
        self.handle_callback(CallbackPayload::Momo(ipn)).await
    }

    pub async fn handle_zalopay_callback(&self, callback: ZaloPayCallback) -> Result<CallbackOutcome> {
        self.handle_callback(CallbackPayload::ZaloPay(callback)).await
    }

    /// Verifies a notification before looking at any business field, then
    /// settles or fails the order it names.
    pub async fn handle_callback(&self, payload: CallbackPayload) -> Result<CallbackOutcome> {
        let gateway = match &payload {
            CallbackPayload::Momo(_) => self.gateways.momo(),
            CallbackPayload::ZaloPay(_) => self.gateways.zalopay(),
        };
        let method = gateway.method();
        if !gateway.verify_callback(&payload) {
            warn!(provider = %method, "Callback signature mismatch");
            return Ok(CallbackOutcome::Rejected("Invalid signature".to_string()));
        }

        let notice = match payload {
            CallbackPayload::Momo(ipn) => Notice {
                success: ipn.is_success(),
                order_code: ipn.order_id,
                amount: ipn.amount,
            },
            CallbackPayload::ZaloPay(callback) => {
                let data = match callback.parse_data() {
                    Ok(data) => data,
                    Err(e) => {
                        warn!(provider = %method, error = %e, "Unreadable callback data");
                        return Ok(CallbackOutcome::Rejected(
                            "Invalid callback data".to_string(),
                        ));
                    }
                };
                let Some(order_code) = order_code_from(&data.app_trans_id) else {
                    warn!(app_trans_id = %data.app_trans_id, "Malformed app_trans_id");
                    return Ok(CallbackOutcome::Rejected(
                        "Invalid app_trans_id".to_string(),
                    ));
                };
                Notice {
                    order_code: order_code.to_string(),
                    amount: data.amount,
                    success: data.is_success(),
                }
            }
        };

        self.apply(method, notice).await
    }

    async fn apply(&self, method: PaymentMethod, notice: Notice) -> Result<CallbackOutcome> {
        let Some(order) = self.ledger.find_by_code(&notice.order_code).await? else {
            warn!(order_code = %notice.order_code, "Callback for unknown order");
            return Ok(CallbackOutcome::Rejected("Order not found".to_string()));
        };

        let expected = order.final_price.whole_units();
        if notice.amount != expected {
            warn!(
                order_code = %order.order_code,
                expected,
                received = notice.amount,
                "Callback amount mismatch, ignoring"
            );
            return Ok(CallbackOutcome::Rejected("Amount mismatch".to_string()));
        }

        if notice.success {
            return match self.ledger.complete_order(order.id, method).await {
                Ok(order) => Ok(CallbackOutcome::Completed(order)),
                Err(LedgerError::BadRequest(reason)) => {
                    warn!(order_code = %order.order_code, %reason, "Success callback for closed order");
                    Ok(CallbackOutcome::Ignored(reason))
                }
                Err(LedgerError::Conflict(reason)) => {
                    // Paid at the provider but not honorable here; needs a refund.
                    error!(order_code = %order.order_code, %reason, "Paid order could not be completed");
                    Ok(CallbackOutcome::Rejected(reason))
                }
                Err(e) => Err(e),
            };
        }

        match self.ledger.fail_pending_order(order.id).await? {
            Some(_) => Ok(CallbackOutcome::MarkedFailed),
            None => Ok(CallbackOutcome::Ignored(
                "Order has already been processed".to_string(),
            )),
        }
    }

    /// Reports the order's payment state, polling the provider while the
    /// order is still pending.
    pub async fn check_payment_status(&self, buyer: UserId, order_id: OrderId) -> Result<PaymentStatusView> {
        let order = self.ledger.owned_order(buyer, order_id).await?;
        if order.payment_status != PaymentStatus::Pending {
            return Ok(PaymentStatusView::from_local(order));
        }
        let Some(gateway) = order
            .payment_method
            .and_then(|method| self.gateways.for_method(method))
        else {
            return Ok(PaymentStatusView::from_local(order));
        };

        match gateway.query_status(&order).await {
            Ok(ProviderStatus::Paid) => {
                let order = self.ledger.complete_order(order.id, gateway.method()).await?;
                Ok(PaymentStatusView::from_local(order))
            }
            Ok(ProviderStatus::Failed) => {
                let order = match self.ledger.fail_pending_order(order.id).await? {
                    Some(order) => order,
                    None => self.ledger.owned_order(buyer, order_id).await?,
                };
                Ok(PaymentStatusView::from_local(order))
            }
            Ok(ProviderStatus::Pending) => Ok(PaymentStatusView::from_local(order)),
            Err(e) => {
                error!(order_code = %order.order_code, error = %e, "Payment status query failed");
                Ok(PaymentStatusView::new(order, "Unable to check payment status"))
            }
        }
    }
}
