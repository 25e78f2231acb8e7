use super::coupons::{CouponService, Evaluation};
use super::enrollment::EnrollmentActivator;
use super::locks::KeyedLocks;
use super::{PaginationInfo, page_bounds, paginate};
use crate::domain::coupon::Quote;
use crate::domain::money::Money;
use crate::domain::order::{NewOrder, Order, PaymentMethod, PaymentStatus};
use crate::domain::ports::{OrderFilter, Stores};
use crate::domain::{CourseId, OrderId, UserId};
use crate::error::{LedgerError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

pub const COUPON_EXHAUSTED: &str = "Coupon usage limit has been reached";

#[derive(Debug, Deserialize, Clone)]
pub struct CreateOrderRequest {
    pub course_id: CourseId,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// An order together with the code of the coupon it was priced with.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OrderListQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub payment_status: Option<PaymentStatus>,
    pub sort_by: Option<SortOrder>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AdminOrderQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub user_id: Option<UserId>,
    pub course_id: Option<CourseId>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Serialize, Clone)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub pagination: PaginationInfo,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct OrderStatistics {
    pub total_orders: usize,
    pub total_revenue: Money,
    pub pending_orders: usize,
    pub completed_orders: usize,
    pub failed_orders: usize,
    pub cancelled_orders: usize,
    pub refunded_orders: usize,
    pub average_order_value: Money,
}

impl OrderStatistics {
    fn collect(orders: &[Order]) -> Result<Self> {
        let count = |status| orders.iter().filter(|o| o.payment_status == status).count();
        let completed_orders = count(PaymentStatus::Paid);
        let total_revenue = orders
            .iter()
            .filter(|o| o.payment_status == PaymentStatus::Paid)
            .fold(Money::ZERO, |acc, o| acc + o.final_price);
        let average_order_value = if completed_orders == 0 {
            Money::ZERO
        } else {
            Money::new(
                (total_revenue.value() / Decimal::from(completed_orders as u64)).round_dp(2),
            )?
        };

        Ok(Self {
            total_orders: orders.len(),
            total_revenue,
            pending_orders: count(PaymentStatus::Pending),
            completed_orders,
            failed_orders: count(PaymentStatus::Failed),
            cancelled_orders: count(PaymentStatus::Cancelled),
            refunded_orders: count(PaymentStatus::Refunded),
            average_order_value,
        })
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct AdminOrderPage {
    pub orders: Vec<Order>,
    pub pagination: PaginationInfo,
    pub statistics: OrderStatistics,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StatusUpdate {
    pub status: PaymentStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Owns the order entity and its status state machine.
///
/// Every status write for a given order happens while holding that order's
/// entry in `order_locks`, so a provider callback and a status poll racing on
/// the same order settle it exactly once. Checkouts are likewise serialized per
/// buyer/course pair.
pub struct OrderLedger {
    stores: Stores,
    coupons: CouponService,
    enrollments: EnrollmentActivator,
    order_locks: KeyedLocks<OrderId>,
    checkout_locks: KeyedLocks<(UserId, CourseId)>,
}

impl OrderLedger {
    pub fn new(stores: Stores) -> Self {
        Self {
            coupons: CouponService::new(stores.coupons.clone(), stores.courses.clone()),
            enrollments: EnrollmentActivator::new(stores.enrollments.clone()),
            order_locks: KeyedLocks::new(),
            checkout_locks: KeyedLocks::new(),
            stores,
        }
    }

    pub fn coupons(&self) -> &CouponService {
        &self.coupons
    }

    pub fn enrollments(&self) -> &EnrollmentActivator {
        &self.enrollments
    }

    /// Prices and persists a pending order. Zero-priced orders are completed
    /// before returning.
    pub async fn create_order(&self, buyer: UserId, req: CreateOrderRequest) -> Result<Order> {
        let _guard = self.checkout_locks.lock((buyer, req.course_id)).await;

        let course = self
            .stores
            .courses
            .get(req.course_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Course not found"))?;
        if !course.is_published() {
            return Err(LedgerError::bad_request(
                "Course is not available for purchase",
            ));
        }
        if self.enrollments.is_enrolled(buyer, course.id).await? {
            return Err(LedgerError::conflict("You already own this course"));
        }
        if self
            .stores
            .orders
            .find_pending(buyer, course.id)
            .await?
            .is_some()
        {
            return Err(LedgerError::conflict(
                "You already have a pending order for this course. Please complete or cancel it first",
            ));
        }

        let order_total = course.purchase_price();
        let code = req
            .coupon_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        let (quote, coupon_id) = match code {
            Some(code) => match self.coupons.evaluate(code, course.id, order_total).await? {
                Evaluation::Eligible { coupon, quote } => (quote, Some(coupon.id)),
                Evaluation::Ineligible(rejection) => return Err(rejection.into()),
            },
            None => (
                Quote {
                    order_total,
                    discount_amount: Money::ZERO,
                    final_price: order_total,
                },
                None,
            ),
        };

        let order = self
            .stores
            .orders
            .insert(NewOrder::priced(buyer, course.id, quote, coupon_id, Utc::now()))
            .await?;
        info!(
            order_id = order.id,
            order_code = %order.order_code,
            user_id = buyer,
            course_id = course.id,
            final_price = %order.final_price,
            "Order created"
        );

        if order.is_free() {
            return self.complete_order(order.id, PaymentMethod::Free).await;
        }
        Ok(order)
    }

    /// Settles an order as paid, activating the enrollment and accounting
    /// coupon usage. Completing an already paid order is a no-op.
    pub async fn complete_order(&self, order_id: OrderId, method: PaymentMethod) -> Result<Order> {
        let _guard = self.order_locks.lock(order_id).await;
        let order = self.load(order_id).await?;
        if order.payment_status == PaymentStatus::Paid {
            debug!(order_id, "Order already paid, skipping completion");
            return Ok(order);
        }
        self.settle(order, method).await
    }

    /// Must be called with the order's lock held.
    ///
    /// The coupon use is claimed first; an exhausted coupon leaves the order
    /// pending with `Conflict`. The enrollment is written before the status
    /// flips so nobody observes a paid order without access.
    async fn settle(&self, mut order: Order, method: PaymentMethod) -> Result<Order> {
        order.mark_paid(method, Utc::now())?;

        if let Some(coupon_id) = order.coupon_id
            && !self.stores.coupons.increment_used_count(coupon_id).await?
        {
            warn!(
                order_id = order.id,
                order_code = %order.order_code,
                coupon_id,
                "Coupon exhausted before the order completed"
            );
            return Err(LedgerError::conflict(COUPON_EXHAUSTED));
        }

        if let Err(e) = self.grant_and_record(&order).await {
            if let Some(coupon_id) = order.coupon_id
                && let Err(release) = self.stores.coupons.decrement_used_count(coupon_id).await
            {
                error!(order_id = order.id, coupon_id, error = %release, "Failed to release coupon usage");
            }
            return Err(e);
        }

        info!(
            order_id = order.id,
            order_code = %order.order_code,
            payment_method = %method,
            "Order completed"
        );
        Ok(order)
    }

    async fn grant_and_record(&self, order: &Order) -> Result<()> {
        self.enrollments
            .activate(order.user_id, order.course_id)
            .await?;
        self.stores.orders.update(order.clone()).await
    }

    /// `Conflict` when the order's coupon has no uses left, so the buyer is
    /// not sent to pay a discounted price that can no longer be honored.
    pub async fn ensure_coupon_redeemable(&self, order: &Order) -> Result<()> {
        let Some(coupon_id) = order.coupon_id else {
            return Ok(());
        };
        match self.stores.coupons.get(coupon_id).await? {
            Some(coupon) if !coupon.has_uses_left() => Err(LedgerError::conflict(COUPON_EXHAUSTED)),
            _ => Ok(()),
        }
    }

    /// Buyer-initiated direct settlement with a non-gateway method.
    pub async fn pay_order(&self, buyer: UserId, order_id: OrderId, method: PaymentMethod) -> Result<Order> {
        let order = self.owned_order(buyer, order_id).await?;
        if order.payment_status != PaymentStatus::Pending {
            return Err(LedgerError::bad_request("Order has already been processed"));
        }
        if order.is_free() {
            return Err(LedgerError::bad_request(
                "This is a free order, no payment required",
            ));
        }
        if method == PaymentMethod::Free {
            return Err(LedgerError::bad_request("Unsupported payment method"));
        }
        self.complete_order(order_id, method).await
    }

    /// Admin status override. Returns the updated order and a confirmation
    /// message echoing the optional reason.
    pub async fn update_order_status(&self, order_id: OrderId, update: StatusUpdate) -> Result<(Order, String)> {
        let _guard = self.order_locks.lock(order_id).await;
        let mut order = self.load(order_id).await?;

        let order = if update.status == PaymentStatus::Paid {
            if order.payment_status == PaymentStatus::Paid {
                return Err(LedgerError::bad_request("Order already has status: paid"));
            }
            // Manual settlement without a prior method choice is an offline transfer.
            let method = order.payment_method.unwrap_or(PaymentMethod::BankTransfer);
            self.settle(order, method).await?
        } else {
            order.transition(update.status, Utc::now())?;
            self.stores.orders.update(order.clone()).await?;
            order
        };

        info!(
            order_id,
            status = %update.status,
            reason = update.reason.as_deref().unwrap_or(""),
            "Order status updated by admin"
        );
        let message = match update.reason.as_deref().filter(|r| !r.is_empty()) {
            Some(reason) => format!("Order status updated to {} (reason: {reason})", update.status),
            None => format!("Order status updated to {}", update.status),
        };
        Ok((order, message))
    }

    pub async fn get_order(&self, buyer: UserId, order_id: OrderId) -> Result<OrderView> {
        let order = self.owned_order(buyer, order_id).await?;
        let coupon_code = match order.coupon_id {
            Some(id) => self.stores.coupons.get(id).await?.map(|c| c.code),
            None => None,
        };
        Ok(OrderView { order, coupon_code })
    }

    pub async fn list_orders(&self, buyer: UserId, query: &OrderListQuery) -> Result<OrderPage> {
        let (page, limit) = page_bounds(query.page, query.limit, 10);
        let mut orders = self
            .stores
            .orders
            .list(&OrderFilter {
                user_id: Some(buyer),
                payment_status: query.payment_status,
                ..Default::default()
            })
            .await?;
        match query.sort_by.unwrap_or_default() {
            SortOrder::Asc => orders.sort_by_key(|o| (o.created_at, o.id)),
            SortOrder::Desc => orders.sort_by_key(|o| std::cmp::Reverse((o.created_at, o.id))),
        }

        let (orders, pagination) = paginate(orders, page, limit);
        Ok(OrderPage { orders, pagination })
    }

    /// Withdraws a buyer's own pending order.
    pub async fn cancel_order(&self, buyer: UserId, order_id: OrderId) -> Result<Order> {
        self.owned_order(buyer, order_id).await?;

        let _guard = self.order_locks.lock(order_id).await;
        let mut order = self.load(order_id).await?;
        if order.payment_status != PaymentStatus::Pending {
            return Err(LedgerError::bad_request("Only pending orders can be cancelled"));
        }
        order.transition(PaymentStatus::Cancelled, Utc::now())?;
        self.stores.orders.update(order.clone()).await?;
        info!(order_id, order_code = %order.order_code, "Order cancelled by buyer");
        Ok(order)
    }

    pub async fn list_all_orders(&self, query: &AdminOrderQuery) -> Result<AdminOrderPage> {
        let (page, limit) = page_bounds(query.page, query.limit, 20);
        let mut orders = self
            .stores
            .orders
            .list(&OrderFilter {
                user_id: query.user_id,
                course_id: query.course_id,
                payment_status: query.payment_status,
                payment_method: query.payment_method,
            })
            .await?;
        orders.sort_by_key(|o| std::cmp::Reverse((o.created_at, o.id)));

        let statistics = OrderStatistics::collect(&orders)?;
        let (orders, pagination) = paginate(orders, page, limit);
        Ok(AdminOrderPage {
            orders,
            pagination,
            statistics,
        })
    }

    /// Records the provider and provider-side reference of a payment attempt
    /// on a still-pending order.
    pub async fn record_payment_attempt(
        &self,
        order_id: OrderId,
        method: PaymentMethod,
        reference: String,
    ) -> Result<Order> {
        let _guard = self.order_locks.lock(order_id).await;
        let mut order = self.load(order_id).await?;
        if order.payment_status != PaymentStatus::Pending {
            return Err(LedgerError::bad_request("Order has already been processed"));
        }
        order.payment_method = Some(method);
        order.payment_reference = Some(reference);
        order.updated_at = Utc::now();
        self.stores.orders.update(order.clone()).await?;
        Ok(order)
    }

    /// Marks a pending order failed. Orders that already left `pending` are
    /// left untouched and `None` is returned.
    pub async fn fail_pending_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let _guard = self.order_locks.lock(order_id).await;
        let mut order = self.load(order_id).await?;
        if order.payment_status != PaymentStatus::Pending {
            warn!(
                order_id,
                status = %order.payment_status,
                "Ignoring failure notification for settled order"
            );
            return Ok(None);
        }
        order.transition(PaymentStatus::Failed, Utc::now())?;
        self.stores.orders.update(order.clone()).await?;
        info!(order_id, order_code = %order.order_code, "Order marked failed");
        Ok(Some(order))
    }

    pub async fn find_by_code(&self, order_code: &str) -> Result<Option<Order>> {
        self.stores.orders.find_by_code(order_code).await
    }

    /// Loads an order on behalf of `buyer`: `NotFound` if absent, `Forbidden`
    /// if it belongs to someone else.
    pub async fn owned_order(&self, buyer: UserId, order_id: OrderId) -> Result<Order> {
        let order = self.load(order_id).await?;
        if order.user_id != buyer {
            return Err(LedgerError::forbidden("Access denied"));
        }
        Ok(order)
    }

    async fn load(&self, order_id: OrderId) -> Result<Order> {
        self.stores
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Order not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::coupon::{DiscountType, NewCoupon};
    use crate::domain::course::{Course, CourseStatus};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn money(value: Decimal) -> Money {
        Money::new(value).unwrap()
    }

    async fn ledger_with_course(price: Decimal) -> (Arc<OrderLedger>, Stores) {
        let stores = Stores::in_memory();
        stores
            .courses
            .store(Course {
                id: 7,
                title: "Async Rust".to_string(),
                price: money(price),
                discount_price: None,
                status: CourseStatus::Published,
            })
            .await
            .unwrap();
        (Arc::new(OrderLedger::new(stores.clone())), stores)
    }

    fn request(coupon: Option<&str>) -> CreateOrderRequest {
        CreateOrderRequest {
            course_id: 7,
            coupon_code: coupon.map(str::to_string),
        }
    }

    async fn add_coupon(stores: &Stores) -> u64 {
        stores
            .coupons
            .insert(NewCoupon {
                code: "SAVE10".to_string(),
                description: String::new(),
                discount_type: DiscountType::Percentage,
                discount_value: dec!(10),
                min_order_amount: money(dec!(100000)),
                max_discount_amount: Some(money(dec!(50000))),
                usage_limit: Some(10),
                valid_from: None,
                valid_to: None,
                is_active: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_create_order_applies_coupon() {
        let (ledger, stores) = ledger_with_course(dec!(1000000)).await;
        add_coupon(&stores).await;

        let order = ledger.create_order(1, request(Some("save10"))).await.unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.original_price, money(dec!(1000000)));
        assert_eq!(order.discount_amount, money(dec!(50000)));
        assert_eq!(order.final_price, money(dec!(950000)));
    }

    #[tokio::test]
    async fn test_free_course_completes_synchronously() {
        let (ledger, stores) = ledger_with_course(dec!(0)).await;

        let order = ledger.create_order(1, request(None)).await.unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.payment_method, Some(PaymentMethod::Free));
        assert!(order.paid_at.is_some());
        assert!(stores.enrollments.find_active(1, 7).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_second_pending_order_conflicts() {
        let (ledger, _) = ledger_with_course(dec!(500000)).await;
        ledger.create_order(1, request(None)).await.unwrap();

        let err = ledger.create_order(1, request(None)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_create_one_order() {
        let (ledger, stores) = ledger_with_course(dec!(500000)).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.create_order(3, request(None)).await
            }));
        }
        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        let orders = stores
            .orders
            .list(&OrderFilter {
                user_id: Some(3),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(orders.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_coupon_is_bad_request() {
        let (ledger, _) = ledger_with_course(dec!(500000)).await;
        let err = ledger.create_order(1, request(Some("NOPE"))).await.unwrap_err();
        assert!(matches!(err, LedgerError::BadRequest(ref m) if m == "Invalid coupon code"));
    }

    #[tokio::test]
    async fn test_unpublished_course_is_rejected() {
        let (ledger, stores) = ledger_with_course(dec!(500000)).await;
        stores
            .courses
            .store(Course {
                id: 8,
                title: "Draft".to_string(),
                price: money(dec!(100)),
                discount_price: None,
                status: CourseStatus::Draft,
            })
            .await
            .unwrap();

        let err = ledger
            .create_order(
                1,
                CreateOrderRequest {
                    course_id: 8,
                    coupon_code: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::BadRequest(_)));

        let err = ledger
            .create_order(
                1,
                CreateOrderRequest {
                    course_id: 99,
                    coupon_code: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_complete_twice_is_idempotent() {
        let (ledger, stores) = ledger_with_course(dec!(1000000)).await;
        let coupon_id = add_coupon(&stores).await;
        let order = ledger.create_order(1, request(Some("SAVE10"))).await.unwrap();

        let first = ledger.complete_order(order.id, PaymentMethod::Momo).await.unwrap();
        let second = ledger.complete_order(order.id, PaymentMethod::Momo).await.unwrap();

        assert_eq!(first.paid_at, second.paid_at);
        assert_eq!(stores.enrollments.list_for_user(1).await.unwrap().len(), 1);
        let coupon = stores.coupons.get(coupon_id).await.unwrap().unwrap();
        assert_eq!(coupon.used_count, 1);
    }

    #[tokio::test]
    async fn test_concurrent_completion_settles_once() {
        let (ledger, stores) = ledger_with_course(dec!(1000000)).await;
        let coupon_id = add_coupon(&stores).await;
        let order = ledger.create_order(1, request(Some("SAVE10"))).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.complete_order(order.id, PaymentMethod::ZaloPay).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(stores.enrollments.list_for_user(1).await.unwrap().len(), 1);
        assert_eq!(
            stores.coupons.get(coupon_id).await.unwrap().unwrap().used_count,
            1
        );
    }

    #[tokio::test]
    async fn test_failed_order_cannot_complete() {
        let (ledger, stores) = ledger_with_course(dec!(500000)).await;
        let order = ledger.create_order(1, request(None)).await.unwrap();
        ledger.fail_pending_order(order.id).await.unwrap();

        let err = ledger
            .complete_order(order.id, PaymentMethod::Momo)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::BadRequest(_)));
        assert!(stores.enrollments.find_active(1, 7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fail_is_ignored_once_paid() {
        let (ledger, _) = ledger_with_course(dec!(500000)).await;
        let order = ledger.create_order(1, request(None)).await.unwrap();
        ledger.complete_order(order.id, PaymentMethod::Momo).await.unwrap();

        assert!(ledger.fail_pending_order(order.id).await.unwrap().is_none());
        let view = ledger.get_order(1, order.id).await.unwrap();
        assert_eq!(view.order.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_pay_order_guards() {
        let (ledger, _) = ledger_with_course(dec!(500000)).await;
        let order = ledger.create_order(1, request(None)).await.unwrap();

        let err = ledger
            .pay_order(2, order.id, PaymentMethod::CreditCard)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden(_)));

        let paid = ledger
            .pay_order(1, order.id, PaymentMethod::CreditCard)
            .await
            .unwrap();
        assert_eq!(paid.payment_method, Some(PaymentMethod::CreditCard));

        let err = ledger
            .pay_order(1, order.id, PaymentMethod::CreditCard)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Order has already been processed");
    }

    #[tokio::test]
    async fn test_admin_status_transitions() {
        let (ledger, _) = ledger_with_course(dec!(500000)).await;
        let order = ledger.create_order(1, request(None)).await.unwrap();

        let (paid, message) = ledger
            .update_order_status(
                order.id,
                StatusUpdate {
                    status: PaymentStatus::Paid,
                    reason: Some("wire received".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.payment_method, Some(PaymentMethod::BankTransfer));
        assert!(message.contains("wire received"));

        let err = ledger
            .update_order_status(
                order.id,
                StatusUpdate {
                    status: PaymentStatus::Pending,
                    reason: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::BadRequest(_)));

        let (refunded, _) = ledger
            .update_order_status(
                order.id,
                StatusUpdate {
                    status: PaymentStatus::Refunded,
                    reason: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn test_cancel_frees_checkout_slot() {
        let (ledger, _) = ledger_with_course(dec!(500000)).await;
        let order = ledger.create_order(1, request(None)).await.unwrap();

        let cancelled = ledger.cancel_order(1, order.id).await.unwrap();
        assert_eq!(cancelled.payment_status, PaymentStatus::Cancelled);
        assert!(ledger.create_order(1, request(None)).await.is_ok());
        assert!(ledger.cancel_order(1, order.id).await.is_err());
    }

    #[tokio::test]
    async fn test_listing_and_statistics() {
        let (ledger, _) = ledger_with_course(dec!(500000)).await;
        for buyer in 1..=3 {
            let order = ledger.create_order(buyer, request(None)).await.unwrap();
            if buyer != 3 {
                ledger
                    .complete_order(order.id, PaymentMethod::Momo)
                    .await
                    .unwrap();
            }
        }

        let mine = ledger
            .list_orders(1, &OrderListQuery::default())
            .await
            .unwrap();
        assert_eq!(mine.orders.len(), 1);
        assert_eq!(mine.pagination.limit, 10);

        let all = ledger
            .list_all_orders(&AdminOrderQuery::default())
            .await
            .unwrap();
        assert_eq!(all.pagination.limit, 20);
        assert_eq!(all.statistics.total_orders, 3);
        assert_eq!(all.statistics.completed_orders, 2);
        assert_eq!(all.statistics.pending_orders, 1);
        assert_eq!(all.statistics.total_revenue, money(dec!(1000000)));
        assert_eq!(all.statistics.average_order_value, money(dec!(500000)));
    }
}
