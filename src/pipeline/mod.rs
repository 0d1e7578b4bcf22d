// Voter enrichment pipeline: load, geocode, join, derive, export.

pub mod csv_out;
pub mod export;
pub mod loader;
pub mod parquet_out;
pub mod processing;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::app::ports::{DelayPort, GeocoderPort, RateLimiterPort};
use crate::config::Config;
use crate::error::Result;
use crate::infra::nominatim::NominatimGeocoder;
use crate::infra::rate_limiter::RateLimiter;
use crate::infra::rate_limiter_adapter::RateLimiterAdapter;
use crate::infra::tokio_delay::TokioDelay;
use crate::observability::metrics;
use crate::types::{FinalRecord, ReferenceRecord, VoterRecord};

pub use export::ExportPaths;
use processing::geocode::{geocode_voters, AddressResolver, GeocodeStats, RetryPolicy};
use processing::join::{left_join, JoinStats};
use processing::percentages::derive_all;

#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub voter_data: PathBuf,
    pub census_data: PathBuf,
    pub exports: ExportPaths,
}

/// In-memory result of the enrichment stages, before export.
#[derive(Debug)]
pub struct Enrichment {
    pub records: Vec<FinalRecord>,
    pub geocode: GeocodeStats,
    pub join: JoinStats,
    pub derivation_issues: usize,
}

/// Result of a complete pipeline run
#[derive(Debug, Serialize)]
pub struct PipelineSummary {
    pub run_id: Uuid,
    pub completed_at: DateTime<Utc>,
    pub voters: usize,
    pub output_rows: usize,
    pub geocoded: usize,
    pub no_match: usize,
    pub exhausted: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub derivation_issues: usize,
    pub csv_output: String,
    pub parquet_output: String,
}

pub struct Pipeline {
    resolver: AddressResolver,
}

impl Pipeline {
    pub fn new(resolver: AddressResolver) -> Self {
        Self { resolver }
    }

    /// Wires the Nominatim geocoder, rate limiter and tokio delay from config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let limiter: Arc<dyn RateLimiterPort> =
            Arc::new(RateLimiterAdapter(RateLimiter::new(config.geocoder.requests_per_min)));
        let geocoder: Arc<dyn GeocoderPort> =
            Arc::new(NominatimGeocoder::new(&config.geocoder)?.with_rate_limiter(limiter));
        let delay: Arc<dyn DelayPort> = Arc::new(TokioDelay);
        let policy = RetryPolicy::from(&config.retry);
        info!(
            "Geocoder ready: endpoint={} max_attempts={} delay={:?} stop_on_no_match={}",
            config.geocoder.endpoint, policy.max_attempts, policy.delay, policy.stop_on_no_match
        );
        Ok(Self::new(AddressResolver::new(geocoder, delay, policy)))
    }

    /// Runs the enrichment stages over already-loaded tables.
    pub async fn enrich(&self, voters: Vec<VoterRecord>, census: &[ReferenceRecord]) -> Enrichment {
        let (geocoded, geocode) = geocode_voters(&self.resolver, voters).await;
        let (joined, join) = left_join(geocoded, census);
        let (records, derivation_issues) = derive_all(joined);
        Enrichment {
            records,
            geocode,
            join,
            derivation_issues,
        }
    }

    /// Loads both tables, enriches, and exports. Input errors abort before
    /// anything is written; per-row failures only show up in the summary.
    #[instrument(skip(self, inputs), fields(run_id = tracing::field::Empty))]
    pub async fn run(&self, inputs: &PipelineInputs) -> Result<PipelineSummary> {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        let started = Instant::now();

        let voters = loader::load_voter_data(&inputs.voter_data)?;
        let census = loader::load_census_data(&inputs.census_data)?;
        let voter_count = voters.len();

        let enrichment = self.enrich(voters, &census).await;
        export::export_all(&enrichment.records, &inputs.exports)?;

        metrics::run_finished(started.elapsed());
        let summary = PipelineSummary {
            run_id,
            completed_at: Utc::now(),
            voters: voter_count,
            output_rows: enrichment.records.len(),
            geocoded: enrichment.geocode.resolved,
            no_match: enrichment.geocode.no_match,
            exhausted: enrichment.geocode.exhausted,
            matched: enrichment.join.matched,
            unmatched: enrichment.join.unmatched,
            derivation_issues: enrichment.derivation_issues,
            csv_output: inputs.exports.csv.display().to_string(),
            parquet_output: inputs.exports.parquet.display().to_string(),
        };
        info!(
            "Pipeline finished in {:.1}s: {} voters, {} geocoded, {} unmatched",
            started.elapsed().as_secs_f64(),
            summary.voters,
            summary.geocoded,
            summary.unmatched
        );
        Ok(summary)
    }
}
