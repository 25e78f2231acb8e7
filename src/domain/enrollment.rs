use super::{CourseId, EnrollmentId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Dropped,
}

/// A durable grant of course access for a (buyer, course) pair.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub status: EnrollmentStatus,
    pub progress_percentage: Decimal,
    pub enrolled_at: DateTime<Utc>,
}

impl Enrollment {
    /// Active and completed enrollments both grant access; dropped ones do not.
    pub fn grants_access(&self) -> bool {
        matches!(
            self.status,
            EnrollmentStatus::Active | EnrollmentStatus::Completed
        )
    }
}

/// An enrollment that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEnrollment {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub enrolled_at: DateTime<Utc>,
}

impl NewEnrollment {
    pub fn into_enrollment(self, id: EnrollmentId) -> Enrollment {
        Enrollment {
            id,
            user_id: self.user_id,
            course_id: self.course_id,
            status: EnrollmentStatus::Active,
            progress_percentage: Decimal::ZERO,
            enrolled_at: self.enrolled_at,
        }
    }
}
