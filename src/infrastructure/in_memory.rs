use crate::domain::coupon::{Coupon, CouponPatch, NewCoupon, validate_rules};
use crate::domain::course::Course;
use crate::domain::enrollment::{Enrollment, NewEnrollment};
use crate::domain::order::{NewOrder, Order, PaymentStatus};
use crate::domain::ports::{
    CouponStore, CourseStore, EnrollmentStore, OrderFilter, OrderStore, Stores,
};
use crate::domain::{CouponId, CourseId, EnrollmentId, OrderId, UserId};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for orders.
///
/// Uses `Arc<RwLock<...>>` to allow shared concurrent access. Ids are
/// assigned sequentially under the write lock.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<BTreeMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<Order> {
        let mut orders = self.orders.write().await;
        if orders.values().any(|o| o.order_code == order.order_code) {
            return Err(LedgerError::internal(format!(
                "Duplicate order code {}",
                order.order_code
            )));
        }
        let id = orders.keys().next_back().map_or(1, |last| last + 1);
        let order = order.into_order(id);
        orders.insert(id, order.clone());
        Ok(order)
    }

    async fn update(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&order.id) {
            Some(slot) => {
                *slot = order;
                Ok(())
            }
            None => Err(LedgerError::not_found("Order not found")),
        }
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id).cloned())
    }

    async fn find_by_code(&self, order_code: &str) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.values().find(|o| o.order_code == order_code).cloned())
    }

    async fn find_pending(&self, user_id: UserId, course_id: CourseId) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|o| {
                o.user_id == user_id
                    && o.course_id == course_id
                    && o.payment_status == PaymentStatus::Pending
            })
            .cloned())
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.values().filter(|o| filter.matches(o)).cloned().collect())
    }
}

/// A thread-safe in-memory store for coupons.
#[derive(Default, Clone)]
pub struct InMemoryCouponStore {
    coupons: Arc<RwLock<BTreeMap<CouponId, Coupon>>>,
}

impl InMemoryCouponStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CouponStore for InMemoryCouponStore {
    async fn insert(&self, coupon: NewCoupon) -> Result<Coupon> {
        let mut coupons = self.coupons.write().await;
        let code = Coupon::normalize_code(&coupon.code);
        if coupons.values().any(|c| c.code == code) {
            return Err(LedgerError::conflict("Coupon code already exists"));
        }
        let id = coupons.keys().next_back().map_or(1, |last| last + 1);
        let coupon = coupon.into_coupon(id);
        coupons.insert(id, coupon.clone());
        Ok(coupon)
    }

    async fn apply_patch(&self, id: CouponId, patch: CouponPatch) -> Result<Coupon> {
        let mut coupons = self.coupons.write().await;
        let slot = coupons
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found("Coupon not found"))?;
        let mut coupon = slot.clone();
        patch.apply(&mut coupon);
        validate_rules(&coupon)?;
        *slot = coupon.clone();
        Ok(coupon)
    }

    async fn get(&self, id: CouponId) -> Result<Option<Coupon>> {
        let coupons = self.coupons.read().await;
        Ok(coupons.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        let code = Coupon::normalize_code(code);
        let coupons = self.coupons.read().await;
        Ok(coupons.values().find(|c| c.code == code).cloned())
    }

    async fn list(&self) -> Result<Vec<Coupon>> {
        let coupons = self.coupons.read().await;
        Ok(coupons.values().cloned().collect())
    }

    async fn increment_used_count(&self, id: CouponId) -> Result<bool> {
        let mut coupons = self.coupons.write().await;
        let coupon = coupons
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found("Coupon not found"))?;
        Ok(coupon.redeem())
    }

    async fn decrement_used_count(&self, id: CouponId) -> Result<()> {
        let mut coupons = self.coupons.write().await;
        let coupon = coupons
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found("Coupon not found"))?;
        coupon.used_count = coupon.used_count.saturating_sub(1);
        Ok(())
    }
}

/// A thread-safe in-memory store for enrollments.
#[derive(Default, Clone)]
pub struct InMemoryEnrollmentStore {
    enrollments: Arc<RwLock<BTreeMap<EnrollmentId, Enrollment>>>,
}

impl InMemoryEnrollmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EnrollmentStore for InMemoryEnrollmentStore {
    async fn find_active(&self, user_id: UserId, course_id: CourseId) -> Result<Option<Enrollment>> {
        let enrollments = self.enrollments.read().await;
        Ok(enrollments
            .values()
            .find(|e| e.user_id == user_id && e.course_id == course_id && e.grants_access())
            .cloned())
    }

    async fn create_if_absent(&self, enrollment: NewEnrollment) -> Result<(Enrollment, bool)> {
        let mut enrollments = self.enrollments.write().await;
        if let Some(existing) = enrollments.values().find(|e| {
            e.user_id == enrollment.user_id
                && e.course_id == enrollment.course_id
                && e.grants_access()
        }) {
            return Ok((existing.clone(), false));
        }
        let id = enrollments.keys().next_back().map_or(1, |last| last + 1);
        let enrollment = enrollment.into_enrollment(id);
        enrollments.insert(id, enrollment.clone());
        Ok((enrollment, true))
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Enrollment>> {
        let enrollments = self.enrollments.read().await;
        Ok(enrollments
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }
}

/// A thread-safe in-memory course catalog.
#[derive(Default, Clone)]
pub struct InMemoryCourseStore {
    courses: Arc<RwLock<HashMap<CourseId, Course>>>,
}

impl InMemoryCourseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CourseStore for InMemoryCourseStore {
    async fn store(&self, course: Course) -> Result<()> {
        let mut courses = self.courses.write().await;
        courses.insert(course.id, course);
        Ok(())
    }

    async fn get(&self, id: CourseId) -> Result<Option<Course>> {
        let courses = self.courses.read().await;
        Ok(courses.get(&id).cloned())
    }
}

impl Stores {
    /// Wires every port to a fresh in-memory adapter.
    pub fn in_memory() -> Self {
        Self {
            orders: Arc::new(InMemoryOrderStore::new()),
            coupons: Arc::new(InMemoryCouponStore::new()),
            enrollments: Arc::new(InMemoryEnrollmentStore::new()),
            courses: Arc::new(InMemoryCourseStore::new()),
        }
    }
}
