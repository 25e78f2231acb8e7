//! Application layer containing the checkout orchestration.
//!
//! `OrderLedger` owns the order state machine, `CouponService` prices and
//! administers coupons, `EnrollmentActivator` grants access and
//! `PaymentService` drives the payment providers. Every service receives its
//! stores and gateways at construction time.

pub mod coupons;
pub mod enrollment;
pub mod ledger;
pub mod locks;
pub mod payments;

use serde::Serialize;

/// Pagination metadata returned alongside listings.
#[derive(Debug, Serialize, PartialEq, Clone, Copy)]
pub struct PaginationInfo {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Normalizes a requested page/limit pair: pages start at 1, limits are
/// capped at 100 and fall back to `default_limit`.
pub fn page_bounds(page: Option<usize>, limit: Option<usize>, default_limit: usize) -> (usize, usize) {
    let page = page.filter(|p| *p > 0).unwrap_or(1);
    let limit = limit.filter(|l| *l > 0 && *l <= 100).unwrap_or(default_limit);
    (page, limit)
}

/// Slices one page out of `items`.
pub fn paginate<T>(items: Vec<T>, page: usize, limit: usize) -> (Vec<T>, PaginationInfo) {
    let total = items.len();
    let total_pages = total.div_ceil(limit);
    let slice = items
        .into_iter()
        .skip(page.saturating_sub(1).saturating_mul(limit))
        .take(limit)
        .collect();
    (
        slice,
        PaginationInfo {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds_defaults_and_caps() {
        assert_eq!(page_bounds(None, None, 10), (1, 10));
        assert_eq!(page_bounds(Some(0), Some(500), 20), (1, 20));
        assert_eq!(page_bounds(Some(3), Some(25), 10), (3, 25));
    }

    #[test]
    fn test_paginate_middle_page() {
        let (items, info) = paginate((1..=25).collect::<Vec<_>>(), 2, 10);
        assert_eq!(items, (11..=20).collect::<Vec<_>>());
        assert_eq!(info.total, 25);
        assert_eq!(info.total_pages, 3);
        assert!(info.has_next);
        assert!(info.has_prev);
    }

    #[test]
    fn test_paginate_far_page_is_empty() {
        let (page, limit) = page_bounds(Some(usize::MAX), Some(100), 10);
        let (items, info) = paginate((1..=25).collect::<Vec<_>>(), page, limit);
        assert!(items.is_empty());
        assert_eq!(info.page, usize::MAX);
        assert!(!info.has_next);
        assert!(info.has_prev);
    }

    #[test]
    fn test_paginate_empty() {
        let (items, info) = paginate(Vec::<u8>::new(), 1, 10);
        assert!(items.is_empty());
        assert_eq!(info.total_pages, 0);
        assert!(!info.has_next);
    }
}
