//! Resumable two-phase corpus download.
//!
//! Phase one records, per document, the answer-unit ids it references in
//! `pau_ids.csv`. Phase two fetches each distinct answer unit into
//! `corpus.csv`. Both files are completion ledgers: a restarted job computes
//! its remaining work as a set difference against what they already hold.

use std::collections::BTreeSet;

use tracing::{debug, info};

use super::progress::{Phase, ProgressEvent, ProgressObserver};
use super::types::{
    deserialize_pau_ids, serialize_pau_ids, DocumentPauIds, CORPUS_COLUMNS, PAU_IDS_COLUMNS,
};
use super::verify::{verify_answer_ids, VerifyReport};
use super::{read_table, OutputLayout};
use crate::checkpoint::CheckpointWriter;
use crate::error::{HarvestError, Result};
use crate::source::SourceProject;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CorpusReport {
    pub documents: usize,
    /// Documents fetched by this run (the rest were recovered).
    pub documents_fetched: usize,
    /// Distinct answer-unit ids referenced by all documents.
    pub answer_ids: usize,
    /// Answer units requested by this run.
    pub answer_units_requested: usize,
    pub answer_units_written: usize,
    /// Requests for which the server had no content.
    pub answer_units_missing: usize,
    /// Requests that returned a unit already in the corpus under its own id.
    pub answer_units_already_present: usize,
    pub verification: Option<VerifyReport>,
}

#[derive(Debug)]
pub enum CorpusOutcome {
    /// Nothing was fetched. Truth is still checked against the finished corpus.
    AlreadyDownloaded(Option<VerifyReport>),
    Extracted(CorpusReport),
}

/// Download the corpus into `corpus.csv`, resuming from any earlier partial
/// run, then verify truth against it.
///
/// A finished corpus is recognised by `corpus.csv` existing without the
/// intermediate `pau_ids.csv`. Verification runs on that path as well, since
/// an earlier run may have stopped between finishing the corpus and rewriting
/// truth.
pub async fn download_corpus(
    source: &dyn SourceProject,
    layout: &OutputLayout,
    max_docs: Option<usize>,
    observer: &dyn ProgressObserver,
) -> Result<CorpusOutcome> {
    if !layout.pau_ids_csv().exists() && layout.corpus_csv().is_file() {
        info!("Corpus already downloaded");
        let verification = verify_answer_ids(layout)?;
        return Ok(CorpusOutcome::AlreadyDownloaded(verification));
    }

    let mut report = CorpusReport::default();

    let mut document_ids: BTreeSet<String> = source
        .get_documents()
        .await?
        .into_iter()
        .map(|d| d.id)
        .collect();
    if let Some(max) = max_docs {
        document_ids = document_ids.into_iter().take(max).collect();
    }
    report.documents = document_ids.len();

    report.documents_fetched = collect_pau_ids(source, layout, &document_ids, observer).await?;
    let pau_ids = referenced_pau_ids(layout)?;
    report.answer_ids = pau_ids.len();
    info!("{} PAUs total", pau_ids.len());

    fetch_answer_units(source, layout, &pau_ids, observer, &mut report).await?;
    if report.answer_units_requested > 0 {
        info!(
            "{} PAU ids, {} with PAUs ({:.4})",
            report.answer_units_requested,
            report.answer_units_written,
            report.answer_units_written as f64 / report.answer_units_requested as f64
        );
    }

    report.verification = verify_answer_ids(layout)?;
    std::fs::remove_file(layout.pau_ids_csv())?;
    Ok(CorpusOutcome::Extracted(report))
}

/// Phase one. Returns the number of documents fetched by this run.
async fn collect_pau_ids(
    source: &dyn SourceProject,
    layout: &OutputLayout,
    document_ids: &BTreeSet<String>,
    observer: &dyn ProgressObserver,
) -> Result<usize> {
    let mut checkpoint = CheckpointWriter::open(layout.pau_ids_csv(), PAU_IDS_COLUMNS)?;
    let remaining: Vec<&String> = document_ids
        .iter()
        .filter(|id| !checkpoint.recovered().contains(*id))
        .collect();
    let done_before = document_ids.len() - remaining.len();
    if !checkpoint.recovered().is_empty() {
        info!(
            "Recovered {} document ids from previous run",
            checkpoint.recovered().len()
        );
    }
    if !remaining.is_empty() {
        info!("Get PAU ids from {} documents", remaining.len());
    }

    let fetched = async {
        for (i, document_id) in remaining.iter().enumerate() {
            observer.on_progress(&ProgressEvent {
                phase: Phase::DocumentAnswerIds,
                index: done_before + i + 1,
                total: document_ids.len(),
                recovered: done_before,
            });
            let pau_ids = source.get_pau_ids_from_document(document_id).await?;
            checkpoint.write(document_id, &[serialize_pau_ids(&pau_ids).as_str()])?;
        }
        Ok::<usize, HarvestError>(remaining.len())
    }
    .await;
    let closed = checkpoint.close();
    let fetched = fetched?;
    closed?;
    Ok(fetched)
}

/// Union of the answer-unit ids in every row of the phase one ledger,
/// including rows written by earlier runs.
fn referenced_pau_ids(layout: &OutputLayout) -> Result<BTreeSet<String>> {
    let rows: Vec<DocumentPauIds> = read_table(&layout.pau_ids_csv())?;
    Ok(rows
        .iter()
        .flat_map(|row| deserialize_pau_ids(&row.answer_ids))
        .map(str::to_string)
        .collect())
}

/// Phase two.
async fn fetch_answer_units(
    source: &dyn SourceProject,
    layout: &OutputLayout,
    pau_ids: &BTreeSet<String>,
    observer: &dyn ProgressObserver,
    report: &mut CorpusReport,
) -> Result<()> {
    let mut checkpoint = CheckpointWriter::open(layout.corpus_csv(), CORPUS_COLUMNS)?;
    if !checkpoint.recovered().is_empty() {
        info!(
            "Recovered {} PAUs from previous run",
            checkpoint.recovered().len()
        );
    }
    let remaining: Vec<&String> = pau_ids
        .iter()
        .filter(|id| !checkpoint.recovered().contains(*id))
        .collect();
    let done_before = pau_ids.len() - remaining.len();
    report.answer_units_requested = remaining.len();
    if done_before > 0 && !remaining.is_empty() {
        // The corpus is keyed by unit id, so lookups that earlier returned no
        // content or a differently keyed unit cannot be told apart from new ones.
        info!(
            "Requesting {} PAU ids not keyed in corpus, including any that returned no content or another id before",
            remaining.len()
        );
    }

    let fetched = async {
        for (i, pau_id) in remaining.iter().enumerate() {
            observer.on_progress(&ProgressEvent {
                phase: Phase::AnswerUnits,
                index: done_before + i + 1,
                total: pau_ids.len(),
                recovered: done_before,
            });
            let Some(pau) = source.get_pau(pau_id).await? else {
                debug!(pau_id = %pau_id, "No content for PAU");
                report.answer_units_missing += 1;
                continue;
            };
            // Rows are keyed by the unit's own id, which can differ from the lookup id.
            if checkpoint.contains(&pau.id) {
                debug!(pau_id = %pau_id, answer_id = %pau.id, "PAU already in corpus");
                report.answer_units_already_present += 1;
                continue;
            }
            checkpoint.write(
                &pau.id,
                &[
                    pau.response_markup.as_str(),
                    pau.title.as_str(),
                    pau.source_name.as_str(),
                ],
            )?;
            report.answer_units_written += 1;
        }
        Ok::<(), HarvestError>(())
    }
    .await;
    let closed = checkpoint.close();
    fetched?;
    closed
}
