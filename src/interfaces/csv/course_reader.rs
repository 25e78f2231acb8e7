use super::seed_reader;
use crate::domain::course::Course;
use crate::error::{LedgerError, Result};
use std::io::Read;

/// Reads catalog records from a CSV seed file.
///
/// Expected columns: `id, title, price, discount_price, status`. An empty
/// `discount_price` means the course is sold at its list price.
pub struct CourseReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CourseReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: seed_reader(source),
        }
    }

    /// Lazily deserializes one course per row; a malformed row yields an
    /// error without ending the stream.
    pub fn courses(self) -> impl Iterator<Item = Result<Course>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(LedgerError::from))
    }
}
