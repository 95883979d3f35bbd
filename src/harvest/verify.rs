use std::collections::HashSet;
use std::path::Path;

use tracing::{info, warn};

use super::types::{TruthEntry, TRUTH_COLUMNS};
use super::{read_table, write_table, OutputLayout};
use crate::error::Result;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// Distinct answer ids referenced by truth before verification.
    pub truth_answer_ids: usize,
    /// Of those, how many have no corpus entry.
    pub missing_answer_ids: usize,
    /// Truth rows moved to `truth.non_corpus.csv`.
    pub moved_rows: usize,
}

/// Move truth rows whose answer id is absent from the corpus into
/// `truth.non_corpus.csv`, and rewrite `truth.csv` without them.
///
/// Returns `None` when there is no `truth.csv` to check.
pub fn verify_answer_ids(layout: &OutputLayout) -> Result<Option<VerifyReport>> {
    let truth_csv = layout.truth_csv();
    if !truth_csv.is_file() {
        info!("No truth.csv, skipping answer id verification");
        return Ok(None);
    }

    let truth: Vec<TruthEntry> = read_table(&truth_csv)?;
    let corpus_ids = read_keys(&layout.corpus_csv())?;

    let truth_ids: HashSet<&str> = truth.iter().map(|t| t.answer_id.as_str()).collect();
    let missing: HashSet<String> = truth_ids
        .iter()
        .filter(|id| !corpus_ids.contains(**id))
        .map(|id| id.to_string())
        .collect();

    let mut report = VerifyReport {
        truth_answer_ids: truth_ids.len(),
        missing_answer_ids: missing.len(),
        moved_rows: 0,
    };
    if missing.is_empty() {
        info!(answer_ids = report.truth_answer_ids, "All truth answer ids are in the corpus");
        return Ok(Some(report));
    }

    warn!(
        "{} truth answer ids of {} not in corpus ({:.3})",
        report.missing_answer_ids,
        report.truth_answer_ids,
        report.missing_answer_ids as f64 / report.truth_answer_ids as f64
    );

    let (non_corpus, kept): (Vec<TruthEntry>, Vec<TruthEntry>) = truth
        .into_iter()
        .partition(|t| missing.contains(&t.answer_id));
    report.moved_rows = non_corpus.len();

    let non_corpus_csv = layout.truth_non_corpus_csv();
    write_table(&non_corpus_csv, TRUTH_COLUMNS, &non_corpus)?;
    warn!(
        "{} omitted truth mappings (saved to {})",
        non_corpus.len(),
        non_corpus_csv.display()
    );

    write_table(&truth_csv, TRUTH_COLUMNS, &kept)?;
    Ok(Some(report))
}

/// First-column values of a CSV file with a header row.
fn read_keys(path: &Path) -> Result<HashSet<String>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut keys = HashSet::new();
    for record in reader.records() {
        let record = record?;
        if let Some(key) = record.get(0) {
            keys.insert(key.to_string());
        }
    }
    Ok(keys)
}
