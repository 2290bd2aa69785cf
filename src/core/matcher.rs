use crate::config::MatchConfig;
use crate::core::{
    distance::{classify_proximity, convert_distances, select_within_threshold},
    filters::is_eligible,
};
use crate::models::{Coordinate, EligibilityOutcome, MatchRecord, Participant, Proximity, SiteOutcome, StudySite};
use crate::services::{GeoResolver, GeocodeError, RouteDistanceProvider, RouteProviderError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why a participant could not be matched
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Geocoding failed: {0}")]
    Geocode(#[from] GeocodeError),

    #[error("Routing failed: {0}")]
    Route(#[from] RouteProviderError),
}

/// Proximity and eligibility matching orchestrator
///
/// # Pipeline Stages
/// 1. Geocode the participant's address
/// 2. One batched drive-distance request to every roster site
/// 3. Proximity filter against the configured threshold
/// 4. Cohort eligibility check on the sites that are close enough
///
/// Cloning is cheap; providers are shared behind `Arc`.
#[derive(Clone)]
pub struct Matcher {
    geocoder: Arc<dyn GeoResolver>,
    router: Arc<dyn RouteDistanceProvider>,
    threshold_miles: f64,
    provider_timeout: Duration,
}

impl Matcher {
    pub fn new(
        geocoder: Arc<dyn GeoResolver>,
        router: Arc<dyn RouteDistanceProvider>,
        config: &MatchConfig,
    ) -> Self {
        Self {
            geocoder,
            router,
            threshold_miles: config.threshold_miles,
            provider_timeout: config.provider_timeout,
        }
    }

    pub fn threshold_miles(&self) -> f64 {
        self.threshold_miles
    }

    /// Match one participant against the full roster
    ///
    /// # Arguments
    /// * `participant` - The participant to place
    /// * `sites` - The roster; its order defines site indices
    ///
    /// # Returns
    /// A MatchRecord whose `matched_sites` may be empty. Provider failures are
    /// returned as errors and no partial record is produced.
    pub async fn match_participant(
        &self,
        participant: &Participant,
        sites: &[StudySite],
    ) -> Result<MatchRecord, MatchError> {
        if sites.is_empty() {
            return Ok(MatchRecord {
                participant_id: participant.id.clone(),
                matched_sites: Vec::new(),
                site_outcomes: Vec::new(),
            });
        }

        // Stage 1: origin
        let address = participant.address.composed();
        let origin = tokio::time::timeout(self.provider_timeout, self.geocoder.resolve(&address))
            .await
            .map_err(|_| GeocodeError::Timeout(self.provider_timeout))??;

        // Stage 2: distances, positionally aligned with the roster
        let destinations: Vec<Coordinate> = sites.iter().map(|s| s.coordinate).collect();
        let meters = tokio::time::timeout(
            self.provider_timeout,
            self.router.batch_distance(origin, &destinations),
        )
        .await
        .map_err(|_| RouteProviderError::Timeout(self.provider_timeout))??;

        if meters.len() != sites.len() {
            return Err(RouteProviderError::LengthMismatch {
                expected: sites.len(),
                actual: meters.len(),
            }
            .into());
        }

        let miles = convert_distances(&meters);

        Ok(self.evaluate(participant, sites, &miles))
    }

    /// Stages 3 and 4 on distances already converted to miles
    fn evaluate(&self, participant: &Participant, sites: &[StudySite], miles: &[Option<f64>]) -> MatchRecord {
        let mut site_outcomes: Vec<SiteOutcome> = miles
            .iter()
            .enumerate()
            .map(|(site_index, &distance_miles)| SiteOutcome {
                site_index,
                distance_miles,
                proximity: classify_proximity(distance_miles, self.threshold_miles),
                eligibility: None,
            })
            .collect();

        let mut matched_sites = Vec::new();

        for idx in select_within_threshold(miles, self.threshold_miles) {
            let site = &sites[idx];
            let outcome = EligibilityOutcome::from(is_eligible(
                &site.cohort,
                participant.age,
                participant.pregnancy_status,
            ));

            site_outcomes[idx].eligibility = Some(outcome);

            if outcome == EligibilityOutcome::Eligible {
                matched_sites.push(idx);
            } else {
                tracing::debug!(
                    "Participant {} within range of {} but not eligible for its {} cohort",
                    participant.id,
                    site.facility_name,
                    site.cohort
                );
            }
        }

        debug_assert!(site_outcomes
            .iter()
            .all(|o| (o.proximity == Proximity::Within) == o.eligibility.is_some()));

        MatchRecord {
            participant_id: participant.id.clone(),
            matched_sites,
            site_outcomes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::distance::METERS_TO_MILES;
    use crate::models::{Address, Cohort, PregnancyStatus, SiteAddress};
    use async_trait::async_trait;

    struct FixedGeocoder;

    #[async_trait]
    impl GeoResolver for FixedGeocoder {
        async fn resolve(&self, _address: &str) -> Result<Coordinate, GeocodeError> {
            Ok(Coordinate::new(-87.63, 41.88).unwrap())
        }
    }

    /// Returns a fixed row of distances given in miles
    struct FixedRouter(Vec<Option<f64>>);

    #[async_trait]
    impl RouteDistanceProvider for FixedRouter {
        async fn batch_distance(
            &self,
            _origin: Coordinate,
            _destinations: &[Coordinate],
        ) -> Result<Vec<Option<f64>>, RouteProviderError> {
            Ok(self.0.iter().map(|d| d.map(|mi| mi / METERS_TO_MILES)).collect())
        }
    }

    fn create_site(name: &str, cohort: Cohort) -> StudySite {
        StudySite {
            facility_name: name.to_string(),
            coordinate: Coordinate::new(-87.7, 41.9).unwrap(),
            address: SiteAddress {
                city: "Chicago".to_string(),
                state: "IL".to_string(),
                zip: "60601".to_string(),
            },
            cohort,
        }
    }

    fn create_participant(age: u8, pregnancy_status: PregnancyStatus) -> Participant {
        Participant {
            id: "p1".to_string(),
            name: "Pat Example".to_string(),
            email: "pat@example.com".to_string(),
            address: Address {
                street: "1 Main St".to_string(),
                city: "Chicago".to_string(),
                state: "IL".to_string(),
                zip: "60601".to_string(),
            },
            cohort: None,
            age,
            pregnancy_status,
            sample_id: "S-1".to_string(),
        }
    }

    fn matcher(distances: Vec<Option<f64>>) -> Matcher {
        Matcher::new(
            Arc::new(FixedGeocoder),
            Arc::new(FixedRouter(distances)),
            &MatchConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_distance_and_eligibility_combined() {
        let sites = vec![
            create_site("Near Adult", Cohort::Adult),
            create_site("Near Pediatric", Cohort::Pediatric),
            create_site("Far Adult", Cohort::Adult),
            create_site("Unroutable", Cohort::Other("Any".to_string())),
        ];
        let matcher = matcher(vec![Some(10.0), Some(20.0), Some(120.0), None]);

        let record = matcher
            .match_participant(&create_participant(40, PregnancyStatus::No), &sites)
            .await
            .unwrap();

        assert_eq!(record.matched_sites, vec![0]);
        assert_eq!(record.site_outcomes.len(), 4);
        assert_eq!(record.site_outcomes[1].eligibility, Some(EligibilityOutcome::NotEligible));
        assert_eq!(record.site_outcomes[2].proximity, Proximity::TooFar);
        assert_eq!(record.site_outcomes[2].eligibility, None);
        assert_eq!(record.site_outcomes[3].proximity, Proximity::Unreachable);
    }

    #[tokio::test]
    async fn test_length_mismatch_is_an_error() {
        let sites = vec![create_site("A", Cohort::Adult), create_site("B", Cohort::Adult)];
        let matcher = matcher(vec![Some(10.0)]);

        let err = matcher
            .match_participant(&create_participant(40, PregnancyStatus::No), &sites)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MatchError::Route(RouteProviderError::LengthMismatch { expected: 2, actual: 1 })
        ));
    }

    #[tokio::test]
    async fn test_empty_roster() {
        let record = matcher(vec![])
            .match_participant(&create_participant(40, PregnancyStatus::No), &[])
            .await
            .unwrap();
        assert!(record.is_empty());
        assert!(record.site_outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_slow_geocoder_times_out() {
        struct SlowGeocoder;

        #[async_trait]
        impl GeoResolver for SlowGeocoder {
            async fn resolve(&self, _address: &str) -> Result<Coordinate, GeocodeError> {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Coordinate::new(0.0, 0.0).unwrap())
            }
        }

        let config = MatchConfig::new(75.0, 1, Duration::from_secs(1)).unwrap();
        let matcher = Matcher::new(Arc::new(SlowGeocoder), Arc::new(FixedRouter(vec![Some(1.0)])), &config);

        let err = matcher
            .match_participant(&create_participant(40, PregnancyStatus::No), &[create_site("A", Cohort::Adult)])
            .await
            .unwrap_err();

        assert!(matches!(err, MatchError::Geocode(GeocodeError::Timeout(_))));
    }
}
