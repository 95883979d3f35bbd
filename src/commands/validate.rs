use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::harvest::verify::verify_answer_ids;
use crate::harvest::OutputLayout;

pub fn validate(output_directory: &Path) -> Result<()> {
    let layout = OutputLayout::new(output_directory);
    if !layout.corpus_csv().is_file() {
        bail!("{} not found", layout.corpus_csv().display());
    }

    let report = verify_answer_ids(&layout)
        .with_context(|| format!("Failed to verify {}", layout.dir().display()))?;
    match report {
        Some(report) => println!(
            "{} truth answer ids, {} not in corpus, {} truth rows moved",
            report.truth_answer_ids, report.missing_answer_ids, report.moved_rows
        ),
        None => bail!("{} not found", layout.truth_csv().display()),
    }
    Ok(())
}
