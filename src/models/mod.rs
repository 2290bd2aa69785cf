// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    normalize_address, Address, Cohort, Coordinate, CoordinateError, EligibilityOutcome,
    EmailPayload, MatchRecord, Participant, PregnancyStatus, Proximity, RunSummary, SiteAddress,
    SiteOutcome, StudyDescriptor, StudySite,
};
pub use requests::{PubSubEnvelope, PubSubMessage};
pub use responses::{ErrorResponse, HealthResponse, RunReport};
