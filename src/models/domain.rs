use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised when a coordinate fails its range checks
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("Coordinate components must be finite (lng={lng}, lat={lat})")]
    NotFinite { lng: f64, lat: f64 },

    #[error("Longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("Latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("Expected \"longitude,latitude\", got {0:?}")]
    Malformed(String),
}

/// A validated WGS84 point
///
/// Fields are private so every instance has passed [`Coordinate::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    longitude: f64,
    latitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    longitude: f64,
    latitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.longitude, raw.latitude)
    }
}

impl Coordinate {
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, CoordinateError> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(CoordinateError::NotFinite {
                lng: longitude,
                lat: latitude,
            });
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        Ok(Self { longitude, latitude })
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }
}

/// Renders as `longitude,latitude`, the order routing URLs expect
impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.longitude, self.latitude)
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lng, lat) = s
            .split_once(',')
            .ok_or_else(|| CoordinateError::Malformed(s.to_string()))?;
        let lng: f64 = lng
            .trim()
            .parse()
            .map_err(|_| CoordinateError::Malformed(s.to_string()))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| CoordinateError::Malformed(s.to_string()))?;
        Coordinate::new(lng, lat)
    }
}

/// Study eligibility category
///
/// Parsing never fails: unrecognised values are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Cohort {
    Pediatric,
    Adult,
    Pregnancy,
    Other(String),
}

impl From<&str> for Cohort {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "pediatric" => Cohort::Pediatric,
            "adult" => Cohort::Adult,
            "pregnancy" => Cohort::Pregnancy,
            _ => Cohort::Other(value.trim().to_string()),
        }
    }
}

impl From<String> for Cohort {
    fn from(value: String) -> Self {
        Cohort::from(value.as_str())
    }
}

impl From<Cohort> for String {
    fn from(value: Cohort) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cohort::Pediatric => f.write_str("Pediatric"),
            Cohort::Adult => f.write_str("Adult"),
            Cohort::Pregnancy => f.write_str("Pregnancy"),
            Cohort::Other(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum PregnancyStatus {
    Yes,
    No,
    #[default]
    Unknown,
}

impl From<&str> for PregnancyStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "yes" | "y" | "true" | "1" => PregnancyStatus::Yes,
            "no" | "n" | "false" | "0" => PregnancyStatus::No,
            _ => PregnancyStatus::Unknown,
        }
    }
}

impl From<String> for PregnancyStatus {
    fn from(value: String) -> Self {
        PregnancyStatus::from(value.as_str())
    }
}

/// Participant mailing address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl Address {
    /// Comma-joined `street,city,state,zip` as sent to the geocoder
    pub fn composed(&self) -> String {
        format!("{},{},{},{}", self.street, self.city, self.state, self.zip)
    }

    /// Cache key: each component trimmed, lowercased, whitespace collapsed
    pub fn normalized(&self) -> String {
        normalize_address(&self.composed())
    }
}

/// Normalise a composed address so trivially different spellings share a key
pub fn normalize_address(address: &str) -> String {
    address
        .split(',')
        .map(|part| {
            part.split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase()
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// A participant eligible to be notified about nearby studies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub email: String,
    pub address: Address,
    #[serde(default)]
    pub cohort: Option<Cohort>,
    pub age: u8,
    #[serde(default)]
    pub pregnancy_status: PregnancyStatus,
    pub sample_id: String,
}

/// City/state/zip of an enrolling site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteAddress {
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl fmt::Display for SiteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {} {}", self.city, self.state, self.zip)
    }
}

/// An enrolling study site from the roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySite {
    pub facility_name: String,
    pub coordinate: Coordinate,
    pub address: SiteAddress,
    pub cohort: Cohort,
}

/// How a site relates to the distance threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proximity {
    Within,
    TooFar,
    Unreachable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityOutcome {
    Eligible,
    NotEligible,
}

impl From<bool> for EligibilityOutcome {
    fn from(eligible: bool) -> Self {
        if eligible {
            EligibilityOutcome::Eligible
        } else {
            EligibilityOutcome::NotEligible
        }
    }
}

/// Per-site diagnostics, one per roster entry in roster order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteOutcome {
    pub site_index: usize,
    pub distance_miles: Option<f64>,
    pub proximity: Proximity,
    /// Only evaluated for sites within the threshold
    pub eligibility: Option<EligibilityOutcome>,
}

/// Result of matching one participant against the full roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub participant_id: String,
    /// Roster indices that are both within distance and eligible, roster order
    pub matched_sites: Vec<usize>,
    pub site_outcomes: Vec<SiteOutcome>,
}

impl MatchRecord {
    pub fn is_empty(&self) -> bool {
        self.matched_sites.is_empty()
    }

    /// Resolve matched indices against the roster they were computed from
    pub fn matched<'a>(&'a self, sites: &'a [StudySite]) -> impl Iterator<Item = &'a StudySite> + 'a {
        self.matched_sites.iter().filter_map(move |&idx| sites.get(idx))
    }
}

/// One study line in the participant email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyDescriptor {
    pub host: String,
    pub address: String,
    #[serde(rename = "cohort")]
    pub cohort_description: String,
}

/// Everything the delivery sink needs to notify one participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPayload {
    pub sample_id: String,
    pub participant_name: String,
    pub participant_email: String,
    pub study_descriptors: Vec<StudyDescriptor>,
}

/// Aggregate counts for one matching run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub skipped_geocode: usize,
    pub skipped_route: usize,
    pub duplicates: usize,
}

impl RunSummary {
    pub fn skipped(&self) -> usize {
        self.skipped_geocode + self.skipped_route
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_parses_lng_lat() {
        let c: Coordinate = "-87.6298, 41.8781".parse().unwrap();
        assert_eq!(c.longitude(), -87.6298);
        assert_eq!(c.latitude(), 41.8781);
        assert_eq!(c.to_string(), "-87.6298,41.8781");
    }

    #[test]
    fn test_coordinate_rejects_out_of_range() {
        assert!(matches!(
            Coordinate::new(181.0, 0.0),
            Err(CoordinateError::LongitudeOutOfRange(_))
        ));
        assert!(matches!(
            Coordinate::new(0.0, -90.5),
            Err(CoordinateError::LatitudeOutOfRange(_))
        ));
        assert!(matches!(
            Coordinate::new(f64::NAN, 0.0),
            Err(CoordinateError::NotFinite { .. })
        ));
        assert!("41.8".parse::<Coordinate>().is_err());
    }

    #[test]
    fn test_cohort_parsing_is_total() {
        assert_eq!(Cohort::from("pediatric"), Cohort::Pediatric);
        assert_eq!(Cohort::from(" Adult "), Cohort::Adult);
        assert_eq!(Cohort::from("PREGNANCY"), Cohort::Pregnancy);
        assert_eq!(Cohort::from("Long COVID"), Cohort::Other("Long COVID".into()));
    }

    #[test]
    fn test_pregnancy_status_parsing() {
        assert_eq!(PregnancyStatus::from("Yes"), PregnancyStatus::Yes);
        assert_eq!(PregnancyStatus::from("n"), PregnancyStatus::No);
        assert_eq!(PregnancyStatus::from(""), PregnancyStatus::Unknown);
    }

    #[test]
    fn test_address_normalization() {
        let address = Address {
            street: "  12  Main St ".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            zip: "62701".into(),
        };
        assert_eq!(address.composed(), "  12  Main St ,Springfield,IL,62701");
        assert_eq!(address.normalized(), "12 main st,springfield,il,62701");
    }

    #[test]
    fn test_site_address_display() {
        let address = SiteAddress {
            city: "Boston".into(),
            state: "MA".into(),
            zip: "02115".into(),
        };
        assert_eq!(address.to_string(), "Boston, MA 02115");
    }

    #[test]
    fn test_descriptor_serializes_cohort_key() {
        let descriptor = StudyDescriptor {
            host: "General".into(),
            address: "Boston, MA 02115".into(),
            cohort_description: "adult participants".into(),
        };
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["cohort"], "adult participants");
    }
}
