//! Trial Match - proximity and eligibility matching for clinical-trial outreach
//!
//! This library matches participants to enrolling study sites within a
//! drive-distance threshold whose cohort admits them, and produces the email
//! payloads used to notify them.

pub mod config;
pub mod core;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{Matcher, MatchError, RunContext, distance::{meters_to_miles, select_within_threshold}, filters::is_eligible};
pub use models::{Participant, StudySite, Coordinate, Cohort, PregnancyStatus, MatchRecord, EmailPayload};
pub use pipeline::Pipeline;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that the library exports work correctly
        assert_eq!(select_within_threshold(&[Some(meters_to_miles(1000.0))], 75.0), vec![0]);
        assert!(is_eligible(&Cohort::Adult, 30, PregnancyStatus::Unknown));
    }
}
