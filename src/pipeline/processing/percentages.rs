use std::fmt;
use tracing::{info, instrument, warn};

use crate::observability::metrics;
use crate::types::{CategoryValues, EnrichedRecord, FinalRecord, PopulationCategory};

/// Why some or all percentages of a row were left absent.
#[derive(Debug, Clone, PartialEq)]
pub enum DerivationIssue {
    /// No census row for the voter's postal code.
    Unmatched,
    MissingTotal,
    ZeroTotal,
    /// Negative or non-finite total.
    InvalidTotal(f64),
    /// Total is usable but these category counts are blank or non-finite.
    MissingCount(Vec<PopulationCategory>),
}

impl DerivationIssue {
    pub fn kind(&self) -> &'static str {
        match self {
            DerivationIssue::Unmatched => "unmatched",
            DerivationIssue::MissingTotal => "missing_total",
            DerivationIssue::ZeroTotal => "zero_total",
            DerivationIssue::InvalidTotal(_) => "invalid_total",
            DerivationIssue::MissingCount(_) => "missing_count",
        }
    }
}

impl fmt::Display for DerivationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivationIssue::Unmatched => f.write_str("no census data for postal code"),
            DerivationIssue::MissingTotal => f.write_str("total population is missing"),
            DerivationIssue::ZeroTotal => f.write_str("total population is zero"),
            DerivationIssue::InvalidTotal(total) => write!(f, "total population {} is invalid", total),
            DerivationIssue::MissingCount(categories) => {
                let names: Vec<_> = categories.iter().map(|c| c.column()).collect();
                write!(f, "missing counts for {}", names.join(", "))
            }
        }
    }
}

/// Adds `100 * count / total` for each category.
///
/// A percentage that cannot be computed is left `None` and the reason is
/// returned alongside the row; it is never `inf` or `NaN`.
pub fn derive(row: EnrichedRecord) -> (FinalRecord, Option<DerivationIssue>) {
    let Some(reference) = row.reference.as_ref() else {
        return absent(row, DerivationIssue::Unmatched);
    };

    let total_population = reference.total_population;
    let counts = reference.counts;
    let total = match total_population {
        None => return absent(row, DerivationIssue::MissingTotal),
        Some(t) if t == 0.0 => return absent(row, DerivationIssue::ZeroTotal),
        Some(t) if !t.is_finite() || t < 0.0 => return absent(row, DerivationIssue::InvalidTotal(t)),
        Some(t) => t,
    };

    let mut missing = Vec::new();
    let percentages = CategoryValues::from_fn(|category| {
        match counts.get(category).filter(|c| c.is_finite()) {
            Some(count) => Some(100.0 * count / total),
            None => {
                missing.push(category);
                None
            }
        }
    });

    let issue = (!missing.is_empty()).then_some(DerivationIssue::MissingCount(missing));
    (
        FinalRecord {
            enriched: row,
            percentages,
        },
        issue,
    )
}

fn absent(row: EnrichedRecord, issue: DerivationIssue) -> (FinalRecord, Option<DerivationIssue>) {
    (
        FinalRecord {
            enriched: row,
            percentages: CategoryValues::default(),
        },
        Some(issue),
    )
}

/// Derives every row; issues are logged per row and counted, never fatal.
#[instrument(skip_all, fields(rows = rows.len()))]
pub fn derive_all(rows: Vec<EnrichedRecord>) -> (Vec<FinalRecord>, usize) {
    info!("Calculating demographic percentages");
    let mut issues = 0;
    let records = rows
        .into_iter()
        .map(|row| {
            let (record, issue) = derive(row);
            if let Some(issue) = issue {
                issues += 1;
                metrics::derive::issue(issue.kind());
                warn!(
                    voter_id = %record.voter().voter_id,
                    zip = %record.voter().zip,
                    "Percentages left empty: {}",
                    issue
                );
            }
            record
        })
        .collect();
    (records, issues)
}
