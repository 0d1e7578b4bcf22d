use std::collections::HashMap;
use tracing::{info, instrument};

use crate::observability::metrics;
use crate::types::{EnrichedRecord, GeocodedVoter, ReferenceRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    /// Voters with at least one census row.
    pub matched: usize,
    pub unmatched: usize,
    /// Extra output rows produced by duplicate census keys.
    pub fan_out: usize,
}

/// Left join on postal code by exact string equality.
///
/// Every voter appears at least once, in input order. A postal code present
/// on several census rows yields one output row per census row, in census
/// order.
#[instrument(skip_all, fields(voters = voters.len(), reference_rows = reference.len()))]
pub fn left_join(
    voters: Vec<GeocodedVoter>,
    reference: &[ReferenceRecord],
) -> (Vec<EnrichedRecord>, JoinStats) {
    let mut by_zip: HashMap<&str, Vec<&ReferenceRecord>> = HashMap::new();
    for row in reference {
        by_zip.entry(row.zip.as_str()).or_default().push(row);
    }

    let mut stats = JoinStats::default();
    let mut joined = Vec::with_capacity(voters.len());

    for voter in voters {
        match by_zip.get(voter.voter.zip.as_str()) {
            Some(matches) => {
                stats.matched += 1;
                stats.fan_out += matches.len() - 1;
                for row in matches {
                    joined.push(EnrichedRecord {
                        voter: voter.clone(),
                        reference: Some((*row).clone()),
                    });
                }
            }
            None => {
                stats.unmatched += 1;
                joined.push(EnrichedRecord {
                    voter,
                    reference: None,
                });
            }
        }
    }

    metrics::join::matched(stats.matched);
    metrics::join::unmatched(stats.unmatched);
    info!(
        "Merged voter data with census data: {} matched, {} unmatched",
        stats.matched, stats.unmatched
    );
    (joined, stats)
}
