use crate::core::{formatter::payload_for, matcher::{MatchError, Matcher}};
use crate::models::{EmailPayload, MatchRecord, Participant, RunSummary, StudySite};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Everything produced by matching a batch of participants
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// One record per successfully matched participant, input order
    pub records: Vec<MatchRecord>,
    /// One payload per participant with at least one matched site, input order
    pub payloads: Vec<EmailPayload>,
    pub summary: RunSummary,
}

/// Match every participant against the roster with at most `max_concurrency`
/// participants in flight
///
/// Provider failures are isolated to the participant that hit them: they are
/// logged, counted in the summary, and the rest of the batch continues.
/// Participants repeating an earlier id are skipped.
pub async fn run_batch(
    matcher: &Matcher,
    participants: Vec<Participant>,
    sites: Arc<[StudySite]>,
    max_concurrency: usize,
) -> BatchOutcome {
    let mut summary = RunSummary::default();

    let mut seen = HashSet::new();
    let participants: Vec<Participant> = participants
        .into_iter()
        .filter(|p| {
            let first = seen.insert(p.id.clone());
            if !first {
                tracing::warn!("Skipping duplicate participant {}", p.id);
                summary.duplicates += 1;
            }
            first
        })
        .collect();

    summary.total = participants.len();

    // Semaphore enforces max_concurrency
    let sem = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (idx, participant) in participants.into_iter().enumerate() {
        let matcher = matcher.clone();
        let sites = Arc::clone(&sites);
        let sem = Arc::clone(&sem);

        tasks.spawn(async move {
            let _permit = sem.acquire_owned().await.ok();
            let result = matcher.match_participant(&participant, &sites).await;
            (idx, participant, result)
        });
    }

    let mut completed: Vec<(usize, Participant, Result<MatchRecord, MatchError>)> =
        Vec::with_capacity(summary.total);

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(done) => completed.push(done),
            Err(e) => tracing::error!("Matching task aborted: {}", e),
        }
    }

    completed.sort_by_key(|(idx, _, _)| *idx);

    let mut outcome = BatchOutcome::default();

    for (_, participant, result) in completed {
        match result {
            Ok(record) => {
                match payload_for(&participant, &record, &sites) {
                    Some(payload) => {
                        tracing::info!(
                            "Participant {} matched {} studies",
                            participant.id,
                            record.matched_sites.len()
                        );
                        summary.matched += 1;
                        outcome.payloads.push(payload);
                    }
                    None => {
                        tracing::info!("No eligible studies for {}", participant.name);
                        summary.unmatched += 1;
                    }
                }
                outcome.records.push(record);
            }
            Err(MatchError::Geocode(e)) => {
                tracing::warn!("Skipping participant {}: {}", participant.id, e);
                summary.skipped_geocode += 1;
            }
            Err(MatchError::Route(e)) => {
                tracing::warn!("Skipping participant {}: {}", participant.id, e);
                summary.skipped_route += 1;
            }
        }
    }

    outcome.summary = summary;
    outcome
}
