// Core algorithm exports
pub mod batch;
pub mod context;
pub mod distance;
pub mod filters;
pub mod formatter;
pub mod matcher;

pub use batch::{run_batch, BatchOutcome};
pub use context::RunContext;
pub use distance::{classify_proximity, convert_distances, meters_to_miles, select_within_threshold};
pub use filters::is_eligible;
pub use formatter::{cohort_description, format_payload, payload_for};
pub use matcher::{MatchError, Matcher};
