use crate::config::ConfigurationError;
use crate::models::{Address, Cohort, Coordinate, CoordinateError, Participant, PregnancyStatus, SiteAddress, StudySite};
use serde::Deserialize;
use std::io;
use std::path::Path;
use validator::Validate;

/// One row of the participant extract
#[derive(Debug, Clone, Deserialize, Validate)]
struct ParticipantRow {
    #[validate(length(min = 1))]
    id: String,
    name: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    address: String,
    city: String,
    state: String,
    zip: String,
    #[serde(default)]
    cohort: Option<String>,
    age: u8,
    #[serde(default)]
    pregnancy_status: Option<String>,
    #[validate(length(min = 1))]
    sample_id: String,
}

impl From<ParticipantRow> for Participant {
    fn from(row: ParticipantRow) -> Self {
        Participant {
            id: row.id,
            name: row.name,
            email: row.email,
            address: Address {
                street: row.address,
                city: row.city,
                state: row.state,
                zip: row.zip,
            },
            cohort: row.cohort.filter(|c| !c.trim().is_empty()).map(Cohort::from),
            age: row.age,
            pregnancy_status: row
                .pregnancy_status
                .map(PregnancyStatus::from)
                .unwrap_or_default(),
            sample_id: row.sample_id,
        }
    }
}

/// One row of the enrolling-site roster
#[derive(Debug, Clone, Deserialize)]
struct RosterRow {
    facility_name: String,
    #[serde(rename = "LngLat", alias = "lng_lat")]
    lng_lat: String,
    city: String,
    state: String,
    zip: String,
    cohort: String,
}

/// Participants read from the extract, with the count of rows that failed validation
#[derive(Debug, Clone, Default)]
pub struct ParticipantFeed {
    pub participants: Vec<Participant>,
    pub rejected: usize,
}

/// Read participants from CSV
///
/// Malformed or invalid rows are logged and counted; they never abort the load.
pub fn read_participants<R: io::Read>(reader: R) -> Result<ParticipantFeed, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut feed = ParticipantFeed::default();

    for (idx, row) in reader.deserialize::<ParticipantRow>().enumerate() {
        let line = idx + 2;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("Rejected participant row {}: {}", line, e);
                feed.rejected += 1;
                continue;
            }
        };

        if let Err(errors) = row.validate() {
            tracing::warn!("Rejected participant row {} ({}): {}", line, row.id, errors);
            feed.rejected += 1;
            continue;
        }

        feed.participants.push(row.into());
    }

    Ok(feed)
}

pub fn load_participants<P: AsRef<Path>>(path: P) -> Result<ParticipantFeed, ConfigurationError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| ConfigurationError::ParticipantsUnreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    read_participants(file).map_err(|e| ConfigurationError::ParticipantsUnreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Read the study roster from CSV
///
/// Unlike participants, a bad roster row fails the whole load: every
/// participant is matched against the same positional roster.
pub fn read_roster<R: io::Read>(reader: R) -> Result<Vec<StudySite>, ConfigurationError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut sites = Vec::new();

    for (idx, row) in reader.deserialize::<RosterRow>().enumerate() {
        let line = idx + 2;
        let row = row.map_err(|e| ConfigurationError::InvalidSite {
            row: line,
            reason: e.to_string(),
        })?;

        let coordinate: Coordinate = row.lng_lat.parse().map_err(|e: CoordinateError| {
            ConfigurationError::InvalidSite {
                row: line,
                reason: e.to_string(),
            }
        })?;

        sites.push(StudySite {
            facility_name: row.facility_name,
            coordinate,
            address: SiteAddress {
                city: row.city,
                state: row.state,
                zip: row.zip,
            },
            cohort: Cohort::from(row.cohort),
        });
    }

    if sites.is_empty() {
        return Err(ConfigurationError::EmptyRoster);
    }

    Ok(sites)
}

pub fn load_roster<P: AsRef<Path>>(path: P) -> Result<Vec<StudySite>, ConfigurationError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| ConfigurationError::RosterUnreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    read_roster(file)
}
