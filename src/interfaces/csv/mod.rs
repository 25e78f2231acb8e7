pub mod coupon_reader;
pub mod course_reader;

/// Builds the CSV reader shared by every seed file: fields are trimmed and
/// short rows are tolerated so optional trailing columns may be omitted.
fn seed_reader<R: std::io::Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(source)
}
