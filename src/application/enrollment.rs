use crate::domain::enrollment::{Enrollment, NewEnrollment};
use crate::domain::ports::EnrollmentStoreRef;
use crate::domain::{CourseId, UserId};
use crate::error::Result;
use chrono::Utc;
use tracing::{debug, info};

/// Grants course access once payment has been confirmed elsewhere.
///
/// Knows nothing about orders or payments; the ledger calls it only after an
/// order has been settled.
#[derive(Clone)]
pub struct EnrollmentActivator {
    enrollments: EnrollmentStoreRef,
}

impl EnrollmentActivator {
    pub fn new(enrollments: EnrollmentStoreRef) -> Self {
        Self { enrollments }
    }

    /// Ensures the buyer holds an active-or-completed enrollment for the course.
    ///
    /// A no-op if one already exists, so repeated activation never duplicates
    /// access.
    pub async fn activate(&self, user_id: UserId, course_id: CourseId) -> Result<Enrollment> {
        let (enrollment, created) = self
            .enrollments
            .create_if_absent(NewEnrollment {
                user_id,
                course_id,
                enrolled_at: Utc::now(),
            })
            .await?;

        if created {
            info!(user_id, course_id, enrollment_id = enrollment.id, "Enrollment activated");
        } else {
            debug!(user_id, course_id, "Enrollment already active, nothing to do");
        }
        Ok(enrollment)
    }

    pub async fn is_enrolled(&self, user_id: UserId, course_id: CourseId) -> Result<bool> {
        Ok(self
            .enrollments
            .find_active(user_id, course_id)
            .await?
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::enrollment::EnrollmentStatus;
    use crate::domain::ports::EnrollmentStore;
    use crate::infrastructure::in_memory::InMemoryEnrollmentStore;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_activate_creates_fresh_enrollment() {
        let store = Arc::new(InMemoryEnrollmentStore::new());
        let activator = EnrollmentActivator::new(store.clone());

        let enrollment = activator.activate(1, 2).await.unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::Active);
        assert_eq!(enrollment.progress_percentage, Decimal::ZERO);
        assert!(activator.is_enrolled(1, 2).await.unwrap());
        assert!(!activator.is_enrolled(1, 3).await.unwrap());
    }

    #[tokio::test]
    async fn test_activate_twice_keeps_one_enrollment() {
        let store = Arc::new(InMemoryEnrollmentStore::new());
        let activator = EnrollmentActivator::new(store.clone());

        let first = activator.activate(1, 2).await.unwrap();
        let second = activator.activate(1, 2).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.list_for_user(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_activation_yields_single_row() {
        let store = Arc::new(InMemoryEnrollmentStore::new());
        let activator = EnrollmentActivator::new(store.clone());

        let mut handles = Vec::new();
        for _ in 0..10 {
            let activator = activator.clone();
            handles.push(tokio::spawn(async move { activator.activate(5, 6).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.list_for_user(5).await.unwrap().len(), 1);
    }
}
