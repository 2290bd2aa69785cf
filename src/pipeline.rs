use crate::config::{ConfigurationError, MatchConfig, Settings};
use crate::core::{run_batch, Matcher, RunContext};
use crate::models::{RunReport, StudySite};
use crate::services::{
    deliver_all, load_participants, load_roster, AuditSink, CachedGeoResolver, CsvAuditSink,
    DeliverySink, MapQuestGeocoder, OsrmRouter, ParticipantFeed, SendGridSink, SendGridTemplate,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// One full run: load feeds, match, deliver, audit
pub struct Pipeline {
    matcher: Matcher,
    config: MatchConfig,
    participants_path: PathBuf,
    roster_path: PathBuf,
    delivery: Arc<dyn DeliverySink>,
    audit: Arc<dyn AuditSink>,
    geocode_cache: Option<Arc<CachedGeoResolver>>,
}

impl Pipeline {
    pub fn new(
        matcher: Matcher,
        config: MatchConfig,
        participants_path: impl Into<PathBuf>,
        roster_path: impl Into<PathBuf>,
        delivery: Arc<dyn DeliverySink>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            matcher,
            config,
            participants_path: participants_path.into(),
            roster_path: roster_path.into(),
            delivery,
            audit,
            geocode_cache: None,
        }
    }

    /// Wire the HTTP providers described by the settings
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigurationError> {
        let config = settings.matching.match_config()?;

        let geocoder = MapQuestGeocoder::new(
            settings.geocoding.endpoint.clone(),
            settings.geocoding.api_key.clone(),
            config.provider_timeout,
        )
        .map_err(|e| ConfigurationError::Client(e.to_string()))?;

        let geocode_cache = Arc::new(CachedGeoResolver::new(
            Arc::new(geocoder),
            settings.cache.geocode_capacity.unwrap_or(10_000),
            settings.cache.ttl_secs.unwrap_or(86_400),
        ));

        let router = OsrmRouter::new(
            settings.routing.endpoint.clone(),
            settings.routing.profile.clone(),
            config.provider_timeout,
        )
        .map_err(|e| ConfigurationError::Client(e.to_string()))?;

        let delivery = SendGridSink::new(
            settings.delivery.endpoint.clone(),
            settings.delivery.api_key.clone(),
            SendGridTemplate {
                from_email: settings.delivery.from_email.clone(),
                template_id: settings.delivery.template_id.clone(),
                support_contact: settings.delivery.support_contact.clone(),
                alert_email: settings.delivery.alert_email.clone(),
            },
            Duration::from_secs(30),
        )
        .map_err(|e| ConfigurationError::Client(e.to_string()))?;

        let matcher = Matcher::new(geocode_cache.clone(), Arc::new(router), &config);

        let mut pipeline = Self::new(
            matcher,
            config,
            &settings.feeds.participants_path,
            &settings.feeds.roster_path,
            Arc::new(delivery),
            Arc::new(CsvAuditSink::new(&settings.audit.report_dir)),
        );
        pipeline.geocode_cache = Some(geocode_cache);

        Ok(pipeline)
    }

    /// Load both feeds and run
    ///
    /// Only an unreadable or invalid roster (or participant file) fails the
    /// run; everything per participant is counted in the report instead.
    pub async fn run(&self) -> Result<RunReport, ConfigurationError> {
        let ctx = RunContext::new();
        let span = tracing::info_span!("match_run", run_id = %ctx.run_id);

        async {
            tracing::info!("Run started at {}", ctx.started_at);

            let sites = load_roster(&self.roster_path)?;
            let feed = load_participants(&self.participants_path)?;

            tracing::info!(
                "Loaded {} study sites and {} participants ({} rejected rows)",
                sites.len(),
                feed.participants.len(),
                feed.rejected
            );

            Ok::<_, ConfigurationError>(self.run_with(&ctx, feed, sites).await)
        }
        .instrument(span)
        .await
    }

    /// Match, deliver and audit already-loaded inputs
    pub async fn run_with(&self, ctx: &RunContext, feed: ParticipantFeed, sites: Vec<StudySite>) -> RunReport {
        let sites: Arc<[StudySite]> = sites.into();

        let outcome = run_batch(&self.matcher, feed.participants, sites, self.config.max_concurrency).await;
        let summary = outcome.summary;

        tracing::info!(
            "Matching complete: {} matched, {} unmatched, {} skipped after provider errors",
            summary.matched,
            summary.unmatched,
            summary.skipped()
        );
        if summary.total > 0 && summary.skipped() == summary.total {
            tracing::error!("Every participant failed at a provider; check geocoding and routing availability");
        }
        if let Some(cache) = &self.geocode_cache {
            tracing::debug!("Geocode cache holds {} entries", cache.stats().entries);
        }

        let report = deliver_all(self.delivery.as_ref(), &outcome.payloads).await;

        if !report.is_complete() {
            let note = report.shortfall_note();
            tracing::error!("{}", note);
            if let Err(e) = self.delivery.alert(&note).await {
                tracing::error!("Failed to send operator alert: {}", e);
            }
        }

        if let Err(e) = self.audit.record(ctx, &report.sent).await {
            tracing::error!("Failed to record audit entries: {}", e);
        }

        tracing::info!("Run completed; successful emails sent: {}", report.sent.len());

        RunReport {
            run_id: ctx.run_id,
            started_at: ctx.started_at,
            summary,
            rejected_rows: feed.rejected,
            emails_attempted: report.attempted,
            emails_sent: report.sent.len(),
        }
    }
}
