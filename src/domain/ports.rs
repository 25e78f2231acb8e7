use super::coupon::{Coupon, CouponPatch, NewCoupon};
use super::course::Course;
use super::enrollment::{Enrollment, NewEnrollment};
use super::order::{NewOrder, Order, PaymentMethod, PaymentStatus};
use super::{CouponId, CourseId, OrderId, UserId};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Selection criteria for order listings. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub user_id: Option<UserId>,
    pub course_id: Option<CourseId>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_method: Option<PaymentMethod>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.is_none_or(|id| order.user_id == id)
            && self.course_id.is_none_or(|id| order.course_id == id)
            && self
                .payment_status
                .is_none_or(|status| order.payment_status == status)
            && self
                .payment_method
                .is_none_or(|method| order.payment_method == Some(method))
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Assigns an id and persists a new order. Order codes are unique.
    async fn insert(&self, order: NewOrder) -> Result<Order>;
    async fn update(&self, order: Order) -> Result<()>;
    async fn get(&self, id: OrderId) -> Result<Option<Order>>;
    async fn find_by_code(&self, order_code: &str) -> Result<Option<Order>>;
    async fn find_pending(&self, user_id: UserId, course_id: CourseId) -> Result<Option<Order>>;
    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>>;
}

#[async_trait]
pub trait CouponStore: Send + Sync {
    /// Assigns an id and persists a new coupon; `Conflict` if the code is taken.
    async fn insert(&self, coupon: NewCoupon) -> Result<Coupon>;
    /// Merges `patch` into the stored coupon, validates the result and writes
    /// it back as one atomic step, so concurrent usage accounting is never
    /// overwritten. `NotFound` if absent.
    async fn apply_patch(&self, id: CouponId, patch: CouponPatch) -> Result<Coupon>;
    async fn get(&self, id: CouponId) -> Result<Option<Coupon>>;
    /// Looks up a coupon by its normalized code.
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>>;
    async fn list(&self) -> Result<Vec<Coupon>>;
    /// Atomically adds one to `used_count` unless the usage limit is already
    /// reached. Returns whether the use was recorded.
    async fn increment_used_count(&self, id: CouponId) -> Result<bool>;
    /// Gives back a use recorded by `increment_used_count`.
    async fn decrement_used_count(&self, id: CouponId) -> Result<()>;
}

#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// The active or completed enrollment for the pair, if any.
    async fn find_active(&self, user_id: UserId, course_id: CourseId) -> Result<Option<Enrollment>>;
    /// Inserts unless an active or completed enrollment already exists for the
    /// pair. The check and the insert are one atomic step. Returns the
    /// enrollment that grants access and whether it was created by this call.
    async fn create_if_absent(&self, enrollment: NewEnrollment) -> Result<(Enrollment, bool)>;
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Enrollment>>;
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn store(&self, course: Course) -> Result<()>;
    async fn get(&self, id: CourseId) -> Result<Option<Course>>;
}

pub type OrderStoreRef = Arc<dyn OrderStore>;
pub type CouponStoreRef = Arc<dyn CouponStore>;
pub type EnrollmentStoreRef = Arc<dyn EnrollmentStore>;
pub type CourseStoreRef = Arc<dyn CourseStore>;

/// The full set of stores the application is wired with.
#[derive(Clone)]
pub struct Stores {
    pub orders: OrderStoreRef,
    pub coupons: CouponStoreRef,
    pub enrollments: EnrollmentStoreRef,
    pub courses: CourseStoreRef,
}
