use crate::domain::coupon::{Coupon, CouponPatch, NewCoupon, validate_rules};
use crate::domain::course::Course;
use crate::domain::enrollment::{Enrollment, NewEnrollment};
use crate::domain::order::{NewOrder, Order, PaymentStatus};
use crate::domain::ports::{
    CouponStore, CourseStore, EnrollmentStore, OrderFilter, OrderStore, Stores,
};
use crate::domain::{CouponId, CourseId, OrderId, UserId};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Column Family for orders, keyed by order id.
pub const CF_ORDERS: &str = "orders";
/// Column Family mapping order codes to order ids.
pub const CF_ORDER_CODES: &str = "order_codes";
/// Column Family for coupons, keyed by coupon id.
pub const CF_COUPONS: &str = "coupons";
/// Column Family mapping normalized coupon codes to coupon ids.
pub const CF_COUPON_CODES: &str = "coupon_codes";
/// Column Family for enrollments, keyed by `user | course | enrollment id`.
pub const CF_ENROLLMENTS: &str = "enrollments";
/// Column Family for the course catalog, keyed by course id.
pub const CF_COURSES: &str = "courses";

const COLUMN_FAMILIES: [&str; 6] = [
    CF_ORDERS,
    CF_ORDER_CODES,
    CF_COUPONS,
    CF_COUPON_CODES,
    CF_ENROLLMENTS,
    CF_COURSES,
];

/// A persistent store implementation using RocksDB.
///
/// Implements every storage port over separate Column Families. Compound
/// read-modify-write operations (id assignment, unique-code inserts, coupon
/// increments, enrollment insert-if-absent) run under a single write mutex and
/// commit through a `WriteBatch`, so each is atomic with respect to the others.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
    next_order_id: Arc<AtomicU64>,
    next_coupon_id: Arc<AtomicU64>,
    next_enrollment_id: Arc<AtomicU64>,
}

fn id_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

fn enrollment_prefix(user_id: UserId, course_id: Option<CourseId>) -> Vec<u8> {
    let mut key = user_id.to_be_bytes().to_vec();
    if let Some(course_id) = course_id {
        key.extend_from_slice(&course_id.to_be_bytes());
    }
    key
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        LedgerError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Deserialization error: {}", e),
        )))
    })
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        LedgerError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Serialization error: {}", e),
        )))
    })
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures every column family exists and restores the id sequences from
    /// the highest stored ids.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        let store = Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
            next_order_id: Arc::new(AtomicU64::new(1)),
            next_coupon_id: Arc::new(AtomicU64::new(1)),
            next_enrollment_id: Arc::new(AtomicU64::new(1)),
        };
        store
            .next_order_id
            .store(store.last_id_key(CF_ORDERS)? + 1, Ordering::SeqCst);
        store
            .next_coupon_id
            .store(store.last_id_key(CF_COUPONS)? + 1, Ordering::SeqCst);
        let last_enrollment = store
            .scan::<Enrollment>(CF_ENROLLMENTS, &[])?
            .iter()
            .map(|e| e.id)
            .max()
            .unwrap_or(0);
        store
            .next_enrollment_id
            .store(last_enrollment + 1, Ordering::SeqCst);

        Ok(store)
    }

    /// Shares this database across every port.
    pub fn into_stores(self) -> Stores {
        Stores {
            orders: Arc::new(self.clone()),
            coupons: Arc::new(self.clone()),
            enrollments: Arc::new(self.clone()),
            courses: Arc::new(self),
        }
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            LedgerError::InternalError(Box::new(std::io::Error::other(format!(
                "{} column family not found",
                name
            ))))
        })
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn load_coupon(&self, id: CouponId) -> Result<Coupon> {
        self.get_json(CF_COUPONS, &id_key(id))?
            .ok_or_else(|| LedgerError::not_found("Coupon not found"))
    }

    fn get_id(&self, cf_name: &str, key: &[u8]) -> Result<Option<u64>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_ref().try_into().map_err(|_| {
                    LedgerError::internal(format!("Corrupt index entry in {}", cf_name))
                })?;
                Ok(Some(u64::from_be_bytes(raw)))
            }
            None => Ok(None),
        }
    }

    /// Deserializes every value whose key starts with `prefix`.
    fn scan<T: DeserializeOwned>(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mode = if prefix.is_empty() {
            IteratorMode::Start
        } else {
            IteratorMode::From(prefix, Direction::Forward)
        };

        let mut values = Vec::new();
        for item in self.db.iterator_cf(cf, mode) {
            let (key, value) = item.map_err(|e| {
                LedgerError::InternalError(Box::new(std::io::Error::other(format!(
                    "RocksDB iteration error: {}",
                    e
                ))))
            })?;
            if !key.starts_with(prefix) {
                break;
            }
            values.push(decode(&value)?);
        }
        Ok(values)
    }

    fn last_id_key(&self, cf_name: &str) -> Result<u64> {
        let cf = self.cf(cf_name)?;
        match self.db.iterator_cf(cf, IteratorMode::End).next() {
            Some(item) => {
                let (key, _) = item?;
                let raw: [u8; 8] = key.as_ref().try_into().map_err(|_| {
                    LedgerError::internal(format!("Corrupt key in {}", cf_name))
                })?;
                Ok(u64::from_be_bytes(raw))
            }
            None => Ok(0),
        }
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn insert(&self, order: NewOrder) -> Result<Order> {
        let _guard = self.write_lock.lock().await;
        if self
            .get_id(CF_ORDER_CODES, order.order_code.as_bytes())?
            .is_some()
        {
            return Err(LedgerError::internal(format!(
                "Duplicate order code {}",
                order.order_code
            )));
        }

        let id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
        let order = order.into_order(id);

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_ORDERS)?, id_key(id), encode(&order)?);
        batch.put_cf(
            self.cf(CF_ORDER_CODES)?,
            order.order_code.as_bytes(),
            id_key(id),
        );
        self.db.write(batch)?;

        Ok(order)
    }

    async fn update(&self, order: Order) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.get_json::<Order>(CF_ORDERS, &id_key(order.id))?.is_none() {
            return Err(LedgerError::not_found("Order not found"));
        }
        self.db
            .put_cf(self.cf(CF_ORDERS)?, id_key(order.id), encode(&order)?)?;
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        self.get_json(CF_ORDERS, &id_key(id))
    }

    async fn find_by_code(&self, order_code: &str) -> Result<Option<Order>> {
        match self.get_id(CF_ORDER_CODES, order_code.as_bytes())? {
            Some(id) => self.get_json(CF_ORDERS, &id_key(id)),
            None => Ok(None),
        }
    }

    async fn find_pending(&self, user_id: UserId, course_id: CourseId) -> Result<Option<Order>> {
        Ok(self
            .scan::<Order>(CF_ORDERS, &[])?
            .into_iter()
            .find(|o| {
                o.user_id == user_id
                    && o.course_id == course_id
                    && o.payment_status == PaymentStatus::Pending
            }))
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        Ok(self
            .scan::<Order>(CF_ORDERS, &[])?
            .into_iter()
            .filter(|o| filter.matches(o))
            .collect())
    }
}

#[async_trait]
impl CouponStore for RocksDBStore {
    async fn insert(&self, coupon: NewCoupon) -> Result<Coupon> {
        let _guard = self.write_lock.lock().await;
        let code = Coupon::normalize_code(&coupon.code);
        if self.get_id(CF_COUPON_CODES, code.as_bytes())?.is_some() {
            return Err(LedgerError::conflict("Coupon code already exists"));
        }

        let id = self.next_coupon_id.fetch_add(1, Ordering::SeqCst);
        let coupon = coupon.into_coupon(id);

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_COUPONS)?, id_key(id), encode(&coupon)?);
        batch.put_cf(self.cf(CF_COUPON_CODES)?, code.as_bytes(), id_key(id));
        self.db.write(batch)?;

        Ok(coupon)
    }

    async fn apply_patch(&self, id: CouponId, patch: CouponPatch) -> Result<Coupon> {
        let _guard = self.write_lock.lock().await;
        let mut coupon = self.load_coupon(id)?;
        patch.apply(&mut coupon);
        validate_rules(&coupon)?;
        self.db
            .put_cf(self.cf(CF_COUPONS)?, id_key(id), encode(&coupon)?)?;
        Ok(coupon)
    }

    async fn get(&self, id: CouponId) -> Result<Option<Coupon>> {
        self.get_json(CF_COUPONS, &id_key(id))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        let code = Coupon::normalize_code(code);
        match self.get_id(CF_COUPON_CODES, code.as_bytes())? {
            Some(id) => self.get_json(CF_COUPONS, &id_key(id)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Coupon>> {
        self.scan(CF_COUPONS, &[])
    }

    async fn increment_used_count(&self, id: CouponId) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut coupon = self.load_coupon(id)?;
        if !coupon.redeem() {
            return Ok(false);
        }
        self.db
            .put_cf(self.cf(CF_COUPONS)?, id_key(id), encode(&coupon)?)?;
        Ok(true)
    }

    async fn decrement_used_count(&self, id: CouponId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut coupon = self.load_coupon(id)?;
        coupon.used_count = coupon.used_count.saturating_sub(1);
        self.db
            .put_cf(self.cf(CF_COUPONS)?, id_key(id), encode(&coupon)?)?;
        Ok(())
    }
}

#[async_trait]
impl EnrollmentStore for RocksDBStore {
    async fn find_active(&self, user_id: UserId, course_id: CourseId) -> Result<Option<Enrollment>> {
        Ok(self
            .scan::<Enrollment>(CF_ENROLLMENTS, &enrollment_prefix(user_id, Some(course_id)))?
            .into_iter()
            .find(Enrollment::grants_access))
    }

    async fn create_if_absent(&self, enrollment: NewEnrollment) -> Result<(Enrollment, bool)> {
        let _guard = self.write_lock.lock().await;
        let prefix = enrollment_prefix(enrollment.user_id, Some(enrollment.course_id));
        if let Some(existing) = self
            .scan::<Enrollment>(CF_ENROLLMENTS, &prefix)?
            .into_iter()
            .find(Enrollment::grants_access)
        {
            return Ok((existing, false));
        }

        let id = self.next_enrollment_id.fetch_add(1, Ordering::SeqCst);
        let enrollment = enrollment.into_enrollment(id);
        let mut key = prefix;
        key.extend_from_slice(&id_key(id));
        self.db
            .put_cf(self.cf(CF_ENROLLMENTS)?, key, encode(&enrollment)?)?;
        Ok((enrollment, true))
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Enrollment>> {
        self.scan(CF_ENROLLMENTS, &enrollment_prefix(user_id, None))
    }
}

#[async_trait]
impl CourseStore for RocksDBStore {
    async fn store(&self, course: Course) -> Result<()> {
        self.db
            .put_cf(self.cf(CF_COURSES)?, id_key(course.id), encode(&course)?)?;
        Ok(())
    }

    async fn get(&self, id: CourseId) -> Result<Option<Course>> {
        self.get_json(CF_COURSES, &id_key(id))
    }
}
