use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::HarvestConfig;
use crate::harvest::corpus::{download_corpus, CorpusOutcome};
use crate::harvest::progress::LogProgress;
use crate::harvest::truth::{download_truth, TruthOutcome};
use crate::harvest::OutputLayout;
use crate::source::XmgrClient;

/// Download the corpus (and truth first, if `with_truth`), rerunning the
/// whole job after a failure as many times as configured. Checkpoints make
/// each rerun pick up where the last one stopped.
pub async fn download(client: &XmgrClient, config: &HarvestConfig, with_truth: bool) -> Result<()> {
    let layout = OutputLayout::create(&config.output_directory).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_directory.display()
        )
    })?;
    info!(output = %layout.dir().display(), "Download from {}", client);

    let mut retries_left = config.job_retries.unwrap_or(0);
    loop {
        match run_job(client, &layout, config, with_truth).await {
            Ok(()) => return Ok(()),
            Err(e) if retries_left > 0 => {
                warn!(
                    error = %format!("{:#}", e),
                    retries_left,
                    "Download failed, retrying in {}s",
                    config.job_retry_delay_secs
                );
                retries_left -= 1;
                tokio::time::sleep(Duration::from_secs(config.job_retry_delay_secs)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn run_job(
    client: &XmgrClient,
    layout: &OutputLayout,
    config: &HarvestConfig,
    with_truth: bool,
) -> Result<()> {
    if with_truth {
        download_truth(client, layout)
            .await
            .context("Truth download failed")?;
    }

    let progress = LogProgress::new(config.checkpoint_frequency);
    let outcome = download_corpus(client, layout, config.max_docs, &progress)
        .await
        .context("Corpus download failed")?;

    let verification = match outcome {
        CorpusOutcome::Extracted(report) => {
            info!(
                documents = report.documents,
                fetched = report.documents_fetched,
                answer_ids = report.answer_ids,
                written = report.answer_units_written,
                missing = report.answer_units_missing,
                already_present = report.answer_units_already_present,
                "Corpus downloaded"
            );
            report.verification
        }
        CorpusOutcome::AlreadyDownloaded(verification) => verification,
    };
    if let Some(verification) = verification {
        info!(
            moved = verification.moved_rows,
            path = %layout.truth_non_corpus_csv().display(),
            "Truth verified against corpus"
        );
    }
    Ok(())
}

pub async fn truth(client: &XmgrClient, output_directory: &Path) -> Result<()> {
    let layout = OutputLayout::create(output_directory)?;
    if let TruthOutcome::Extracted(report) = download_truth(client, &layout).await? {
        info!(
            questions = report.questions,
            path = %layout.truth_csv().display(),
            "{} questions in truth",
            report.mapped
        );
    }
    Ok(())
}
