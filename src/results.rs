use crate::error::{FailureReason, FetchError};
use crate::model::FetchPair;

/// Terminal state of one fetch pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    Succeeded { rows: usize },
    Failed(FailureReason),
}

/// Outcome of one pair together with the detail needed for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairRecord {
    pub label: String,
    pub outcome: PairOutcome,
    /// Error text for failed pairs.
    pub detail: Option<String>,
}

/// Append-only accumulator of pair outcomes for one run.
///
/// Each `record_*` call consumes its [`FetchPair`], so a pair lands in exactly
/// one of the succeeded/failed partitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    records: Vec<PairRecord>,
    expected_errors: usize,
}

impl RunResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, pair: FetchPair, rows: usize) {
        self.records.push(PairRecord {
            label: pair.label(),
            outcome: PairOutcome::Succeeded { rows },
            detail: None,
        });
    }

    pub fn record_failure(&mut self, pair: FetchPair, error: &FetchError) {
        self.records.push(PairRecord {
            label: pair.label(),
            outcome: PairOutcome::Failed(error.reason()),
            detail: Some(error.to_string()),
        });
    }

    /// Counts a tolerated irregularity (an unexpected payload shape). The
    /// pair itself is still recorded through `record_success`.
    pub fn record_tolerated(&mut self) {
        self.expected_errors += 1;
    }

    pub fn records(&self) -> &[PairRecord] {
        &self.records
    }

    /// Labels of the succeeded pairs, in fetch order.
    pub fn succeeded(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|record| matches!(record.outcome, PairOutcome::Succeeded { .. }))
            .map(|record| record.label.clone())
            .collect()
    }

    /// `"{label}: {reason}"` for each failed pair, in fetch order.
    pub fn failed(&self) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|record| match record.outcome {
                PairOutcome::Failed(reason) => Some(format!("{}: {reason}", record.label)),
                PairOutcome::Succeeded { .. } => None,
            })
            .collect()
    }

    /// Labels of succeeded pairs that returned no rows.
    pub fn empty(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|record| record.outcome == PairOutcome::Succeeded { rows: 0 })
            .map(|record| record.label.clone())
            .collect()
    }

    pub fn succeeded_count(&self) -> usize {
        self.records.len() - self.failed_count()
    }

    pub fn failed_count(&self) -> usize {
        self.records
            .iter()
            .filter(|record| matches!(record.outcome, PairOutcome::Failed(_)))
            .count()
    }

    pub fn expected_errors(&self) -> usize {
        self.expected_errors
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    /// Number of pairs recorded so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
