mod predicate;
mod record_scan;

pub use predicate::{CompareOp, Predicate, Term};
pub use record_scan::{RecordScan, RecordScanAdapter};
