use super::seed_reader;
use crate::domain::coupon::NewCoupon;
use crate::error::{LedgerError, Result};
use std::io::Read;

/// Reads coupon definitions from a CSV seed file.
///
/// Columns: `code, description, discount_type, discount_value,
/// min_order_amount, max_discount_amount, usage_limit, valid_from, valid_to,
/// is_active`. Trailing columns after `discount_value` may be left out or
/// empty, except `min_order_amount` which must hold a number when present.
/// Dates are RFC 3339.
pub struct CouponReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CouponReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: seed_reader(source),
        }
    }

    pub fn coupons(self) -> impl Iterator<Item = Result<NewCoupon>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(LedgerError::from))
    }
}
