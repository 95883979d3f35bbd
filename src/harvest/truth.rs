use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use super::types::{TruthEntry, TRUTH_COLUMNS};
use super::{write_json, write_table, OutputLayout};
use crate::error::{HarvestError, Result};
use crate::source::types::Question;
use crate::source::SourceProject;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Answer(String),
    OffTopic,
    Unmapped,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TruthReport {
    pub questions: usize,
    pub rejected: usize,
    pub mapped: usize,
    pub unmapped: usize,
    pub off_topic: usize,
}

#[derive(Debug)]
pub enum TruthOutcome {
    AlreadyDownloaded,
    Extracted(TruthReport),
}

/// Download questions and write `truth.json` (every record as returned) and
/// `truth.csv` (questions that resolve to an answer unit).
///
/// Nothing is requested when both files already exist. `truth.csv` is
/// written last, so its presence marks a complete download.
pub async fn download_truth(
    source: &dyn SourceProject,
    layout: &OutputLayout,
) -> Result<TruthOutcome> {
    if layout.truth_json().is_file() && layout.truth_csv().is_file() {
        info!("Truth already downloaded");
        return Ok(TruthOutcome::AlreadyDownloaded);
    }

    let questions = source.get_questions().await?;
    write_json(&layout.truth_json(), &questions)?;

    let (truth, report) = truth_from_questions(&questions)?;
    write_table(&layout.truth_csv(), TRUTH_COLUMNS, &truth)?;
    info!(
        mapped = report.mapped,
        unmapped = report.unmapped,
        off_topic = report.off_topic,
        rejected = report.rejected,
        "Truth downloaded"
    );
    Ok(TruthOutcome::Extracted(report))
}

/// Resolve every non-rejected question to an answer id, following mappings
/// to other questions until one carries a direct answer unit.
pub fn truth_from_questions(questions: &[Question]) -> Result<(Vec<TruthEntry>, TruthReport)> {
    let active: Vec<&Question> = questions.iter().filter(|q| !q.is_rejected()).collect();
    let index: HashMap<&str, &Question> = active.iter().map(|&q| (q.id.as_str(), q)).collect();

    let mut report = TruthReport {
        questions: questions.len(),
        rejected: questions.len() - active.len(),
        ..Default::default()
    };
    let mut truth = Vec::new();
    let mut seen = HashSet::new();

    for question in active {
        if !seen.insert(question.id.as_str()) {
            continue;
        }
        // Later records with a repeated id replace earlier ones in the index.
        let question = index[question.id.as_str()];
        match resolve(question, &index)? {
            Resolution::Answer(answer_id) => {
                report.mapped += 1;
                truth.push(TruthEntry {
                    question_id: question.id.clone(),
                    question: question.text.clone(),
                    answer_id,
                });
            }
            Resolution::OffTopic => report.off_topic += 1,
            Resolution::Unmapped => report.unmapped += 1,
        }
    }
    Ok((truth, report))
}

/// Follow the mapping chain from `question`. The classification of a chain
/// without an answer comes from the last question reached.
pub fn resolve<'a>(question: &'a Question, index: &HashMap<&str, &'a Question>) -> Result<Resolution> {
    let mut current = question;
    let mut visited = HashSet::from([question.id.as_str()]);
    let mut chain = vec![question.id.clone()];

    loop {
        if let Some(answer) = current
            .predefined_answer_unit
            .as_deref()
            .filter(|a| !a.is_empty())
        {
            return Ok(Resolution::Answer(answer.to_string()));
        }

        let Some(target) = &current.mapped_question else {
            return Ok(if current.off_topic {
                Resolution::OffTopic
            } else {
                Resolution::Unmapped
            });
        };

        chain.push(target.id.clone());
        if !visited.insert(target.id.as_str()) {
            return Err(HarvestError::CyclicMapping {
                question_id: question.id.clone(),
                chain,
            });
        }

        match index.get(target.id.as_str()) {
            Some(&next) => current = next,
            None => {
                warn!(
                    question_id = %question.id,
                    mapped_question_id = %target.id,
                    "Mapped question is missing or rejected"
                );
                return Ok(Resolution::Unmapped);
            }
        }
    }
}
