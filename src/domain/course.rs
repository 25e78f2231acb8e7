use super::money::Money;
use super::CourseId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    Draft,
    Published,
    Archived,
}

/// The catalog's view of a course, as far as checkout is concerned.
///
/// Course content is managed elsewhere; the checkout pipeline only reads the
/// price and publish state.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub price: Money,
    #[serde(default)]
    pub discount_price: Option<Money>,
    pub status: CourseStatus,
}

impl Course {
    /// The amount a buyer is charged before any coupon.
    pub fn purchase_price(&self) -> Money {
        match self.discount_price {
            Some(discounted) if discounted < self.price => discounted,
            _ => self.price,
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == CourseStatus::Published
    }
}
