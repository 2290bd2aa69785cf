use crate::models::{Cohort, EmailPayload, MatchRecord, Participant, StudyDescriptor, StudySite};

/// Human-readable audience for a site's cohort, as shown in the email
pub fn cohort_description(cohort: &Cohort) -> &'static str {
    match cohort {
        Cohort::Adult => "adult participants",
        Cohort::Pediatric => "pediatric participants",
        Cohort::Pregnancy => "participants who are or have been pregnant",
        Cohort::Other(_) => "participants",
    }
}

pub fn describe_site(site: &StudySite) -> StudyDescriptor {
    StudyDescriptor {
        host: site.facility_name.clone(),
        address: site.address.to_string(),
        cohort_description: cohort_description(&site.cohort).to_string(),
    }
}

/// Build the delivery payload for a participant and their matched sites
///
/// Sites keep the order they were matched in.
pub fn format_payload<'a, I>(participant: &Participant, matched: I) -> EmailPayload
where
    I: IntoIterator<Item = &'a StudySite>,
{
    EmailPayload {
        sample_id: participant.sample_id.clone(),
        participant_name: participant.name.clone(),
        participant_email: participant.email.clone(),
        study_descriptors: matched.into_iter().map(describe_site).collect(),
    }
}

/// Payload for a match record, or `None` when nothing matched
pub fn payload_for(
    participant: &Participant,
    record: &MatchRecord,
    sites: &[StudySite],
) -> Option<EmailPayload> {
    if record.is_empty() {
        return None;
    }
    Some(format_payload(participant, record.matched(sites)))
}
