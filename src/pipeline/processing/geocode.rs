use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::app::ports::{DelayPort, GeocodeError, GeocoderPort};
use crate::config::RetryConfig;
use crate::constants::MAX_GEOCODE_ATTEMPTS;
use crate::observability::metrics;
use crate::types::{Coordinate, GeocodedVoter, VoterRecord};

/// How many times an address is tried and how long to wait in between.
/// `max_attempts` is clamped to `1..=MAX_GEOCODE_ATTEMPTS` when resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    /// A confirmed "no match" ends resolution instead of being retried.
    pub stop_on_no_match: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: config.delay(),
            stop_on_no_match: config.stop_on_no_match,
        }
    }
}

/// Outcome of resolving one address. Only `Resolved` carries a coordinate.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved { coordinate: Coordinate, attempts: u32 },
    NoMatch { attempts: u32 },
    Exhausted { attempts: u32, last_error: String },
}

impl Resolution {
    pub fn coordinate(&self) -> Option<Coordinate> {
        match self {
            Resolution::Resolved { coordinate, .. } => Some(*coordinate),
            _ => None,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Resolution::Resolved { attempts, .. }
            | Resolution::NoMatch { attempts }
            | Resolution::Exhausted { attempts, .. } => *attempts,
        }
    }
}

enum AttemptFailure {
    NoMatch,
    Fault(GeocodeError),
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptFailure::NoMatch => f.write_str("no match"),
            AttemptFailure::Fault(e) => write!(f, "{}", e),
        }
    }
}

/// Resolves addresses through a [`GeocoderPort`], retrying with a fixed delay.
pub struct AddressResolver {
    geocoder: Arc<dyn GeocoderPort>,
    delay: Arc<dyn DelayPort>,
    policy: RetryPolicy,
}

impl AddressResolver {
    pub fn new(geocoder: Arc<dyn GeocoderPort>, delay: Arc<dyn DelayPort>, policy: RetryPolicy) -> Self {
        Self {
            geocoder,
            delay,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Never fails: an address that cannot be resolved yields `NoMatch` or
    /// `Exhausted` and the caller moves on.
    pub async fn resolve(&self, address: &str) -> Resolution {
        let max_attempts = self.policy.max_attempts.clamp(1, MAX_GEOCODE_ATTEMPTS);
        let mut attempt = 0;

        loop {
            attempt += 1;
            metrics::geocode::attempt();

            let failure = match self.geocoder.lookup(address).await {
                Ok(Some(coordinate)) => {
                    info!("Geocoded address: {} (attempt {}/{})", address, attempt, max_attempts);
                    metrics::geocode::resolved();
                    return Resolution::Resolved {
                        coordinate,
                        attempts: attempt,
                    };
                }
                Ok(None) if self.policy.stop_on_no_match => {
                    error!("No geocoding match for address {}", address);
                    metrics::geocode::no_match();
                    return Resolution::NoMatch { attempts: attempt };
                }
                Ok(None) => AttemptFailure::NoMatch,
                Err(e) => AttemptFailure::Fault(e),
            };

            if attempt >= max_attempts {
                error!(
                    "Failed to geocode address {} after {} attempts: {}",
                    address, attempt, failure
                );
                return match failure {
                    AttemptFailure::NoMatch => {
                        metrics::geocode::no_match();
                        Resolution::NoMatch { attempts: attempt }
                    }
                    AttemptFailure::Fault(e) => {
                        metrics::geocode::exhausted();
                        Resolution::Exhausted {
                            attempts: attempt,
                            last_error: e.to_string(),
                        }
                    }
                };
            }

            warn!(
                "Retrying geocoding for address {}... ({}/{}): {}",
                address, attempt, max_attempts, failure
            );
            metrics::geocode::retry_delay();
            self.delay.pause(self.policy.delay).await;
        }
    }
}

/// Per-run tallies of resolution outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeocodeStats {
    pub resolved: usize,
    pub no_match: usize,
    pub exhausted: usize,
}

/// Resolves every voter in input order, one at a time.
#[instrument(skip_all, fields(voters = voters.len()))]
pub async fn geocode_voters(
    resolver: &AddressResolver,
    voters: Vec<VoterRecord>,
) -> (Vec<GeocodedVoter>, GeocodeStats) {
    let mut stats = GeocodeStats::default();
    let mut geocoded = Vec::with_capacity(voters.len());

    for voter in voters {
        let resolution = resolver.resolve(&voter.formatted_address()).await;
        match &resolution {
            Resolution::Resolved { .. } => stats.resolved += 1,
            Resolution::NoMatch { .. } => stats.no_match += 1,
            Resolution::Exhausted { .. } => stats.exhausted += 1,
        }
        geocoded.push(GeocodedVoter {
            coordinate: resolution.coordinate(),
            voter,
        });
    }

    info!(
        "Geocoding finished: {} resolved, {} without match, {} exhausted",
        stats.resolved, stats.no_match, stats.exhausted
    );
    (geocoded, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    enum Step {
        Hit(f64, f64),
        Miss,
        Fault,
    }

    struct ScriptedGeocoder {
        steps: Mutex<VecDeque<Step>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedGeocoder {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GeocoderPort for ScriptedGeocoder {
        async fn lookup(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError> {
            self.calls.lock().unwrap().push(address.to_string());
            match self.steps.lock().unwrap().pop_front() {
                Some(Step::Hit(lat, lon)) => Ok(Coordinate::new(lat, lon)),
                Some(Step::Miss) | None => Ok(None),
                Some(Step::Fault) => Err(GeocodeError::Status(503)),
            }
        }
    }

    #[derive(Default)]
    struct RecordingDelay {
        pauses: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl DelayPort for RecordingDelay {
        async fn pause(&self, duration: Duration) {
            self.pauses.lock().unwrap().push(duration);
        }
    }

    fn resolver(
        steps: Vec<Step>,
        stop_on_no_match: bool,
    ) -> (AddressResolver, Arc<ScriptedGeocoder>, Arc<RecordingDelay>) {
        let geocoder = ScriptedGeocoder::new(steps);
        let delay = Arc::new(RecordingDelay::default());
        let policy = RetryPolicy {
            stop_on_no_match,
            ..RetryPolicy::default()
        };
        let resolver = AddressResolver::new(geocoder.clone(), delay.clone(), policy);
        (resolver, geocoder, delay)
    }

    #[tokio::test]
    async fn test_first_attempt_success_has_no_delay() {
        let (resolver, geocoder, delay) = resolver(vec![Step::Hit(40.75, -73.99)], true);
        let resolution = resolver.resolve("1 Main St, Springfield, IL").await;

        assert_eq!(resolution.attempts(), 1);
        assert_eq!(resolution.coordinate(), Coordinate::new(40.75, -73.99));
        assert_eq!(geocoder.calls(), vec!["1 Main St, Springfield, IL"]);
        assert!(delay.pauses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_two_faults_then_success_uses_third_result() {
        let (resolver, geocoder, delay) =
            resolver(vec![Step::Fault, Step::Fault, Step::Hit(41.88, -87.63)], true);
        let resolution = resolver.resolve("233 S Wacker Dr, Chicago, IL").await;

        assert_eq!(
            resolution,
            Resolution::Resolved {
                coordinate: Coordinate::new(41.88, -87.63).unwrap(),
                attempts: 3,
            }
        );
        assert_eq!(geocoder.calls().len(), 3);
        assert_eq!(
            *delay.pauses.lock().unwrap(),
            vec![Duration::from_secs(2), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn test_faults_exhaust_after_three_attempts() {
        let (resolver, geocoder, delay) =
            resolver(vec![Step::Fault, Step::Fault, Step::Fault, Step::Hit(1.0, 1.0)], true);
        let resolution = resolver.resolve("nowhere").await;

        assert!(matches!(resolution, Resolution::Exhausted { attempts: 3, .. }));
        assert!(resolution.coordinate().is_none());
        assert_eq!(geocoder.calls().len(), 3);
        assert_eq!(delay.pauses.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_attempts_never_exceed_three_whatever_the_policy() {
        let geocoder = ScriptedGeocoder::new((0..7).map(|_| Step::Fault).collect());
        let delay = Arc::new(RecordingDelay::default());
        let policy = RetryPolicy {
            max_attempts: 7,
            ..RetryPolicy::default()
        };
        let resolver = AddressResolver::new(geocoder.clone(), delay.clone(), policy);

        let resolution = resolver.resolve("always down").await;

        assert!(matches!(resolution, Resolution::Exhausted { attempts: 3, .. }));
        assert_eq!(geocoder.calls().len(), 3);
        assert_eq!(delay.pauses.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_no_match_stops_immediately_by_default() {
        let (resolver, geocoder, delay) = resolver(vec![Step::Miss, Step::Hit(1.0, 1.0)], true);
        let resolution = resolver.resolve("0 Imaginary Rd, Atlantis, ZZ").await;

        assert_eq!(resolution, Resolution::NoMatch { attempts: 1 });
        assert_eq!(geocoder.calls().len(), 1);
        assert!(delay.pauses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_match_is_retried_when_policy_allows() {
        let (resolver, geocoder, delay) = resolver(vec![Step::Miss, Step::Hit(10.0, 20.0)], false);
        let resolution = resolver.resolve("flaky").await;

        assert_eq!(resolution.coordinate(), Coordinate::new(10.0, 20.0));
        assert_eq!(geocoder.calls().len(), 2);
        assert_eq!(delay.pauses.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_no_match_without_short_circuit_ends_as_no_match() {
        let (resolver, geocoder, _delay) = resolver(vec![Step::Miss, Step::Miss, Step::Miss], false);
        let resolution = resolver.resolve("missing").await;

        assert_eq!(resolution, Resolution::NoMatch { attempts: 3 });
        assert_eq!(geocoder.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_geocode_voters_preserves_order_and_leaves_failures_absent() {
        let (resolver, geocoder, _delay) = resolver(
            vec![Step::Hit(40.0, -74.0), Step::Miss, Step::Hit(34.05, -118.24)],
            true,
        );
        let voters: Vec<VoterRecord> = ["A", "B", "C"]
            .iter()
            .map(|id| VoterRecord {
                voter_id: id.to_string(),
                name: format!("Voter {id}"),
                street: format!("{id} Street"),
                city: "Town".into(),
                state: "ST".into(),
                zip: "00001".into(),
            })
            .collect();

        let (geocoded, stats) = geocode_voters(&resolver, voters).await;

        let ids: Vec<_> = geocoded.iter().map(|g| g.voter.voter_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert!(geocoded[0].coordinate.is_some());
        assert!(geocoded[1].coordinate.is_none());
        assert!(geocoded[2].coordinate.is_some());
        assert_eq!(
            stats,
            GeocodeStats {
                resolved: 2,
                no_match: 1,
                exhausted: 0
            }
        );
        assert_eq!(geocoder.calls()[0], "A Street, Town, ST");
    }
}
