//! Detection records, compliance summaries and snapshot I/O

mod io;
mod paths;
mod summary;
mod types;

pub use io::{atomic_write, read_jsonl, with_file_lock, write_jsonl};
pub use paths::Paths;
pub use summary::{compliance_rate, round_to};
pub use types::{ComplianceSummary, Detection, DetectionEvent, NewDetectionEvent};
