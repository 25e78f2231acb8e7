//! Domain model of the checkout pipeline: money, courses, coupons, orders and
//! enrollments, plus the storage ports the application layer depends on.

pub mod coupon;
pub mod course;
pub mod enrollment;
pub mod money;
pub mod order;
pub mod ports;

pub type UserId = u64;
pub type CourseId = u64;
pub type OrderId = u64;
pub type CouponId = u64;
pub type EnrollmentId = u64;
