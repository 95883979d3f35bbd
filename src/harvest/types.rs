use serde::{Deserialize, Serialize};

pub const TRUTH_COLUMNS: &[&str] = &["QuestionId", "Question", "AnswerId"];
pub const CORPUS_COLUMNS: &[&str] = &["AnswerId", "Answer", "Title", "Filename"];
pub const PAU_IDS_COLUMNS: &[&str] = &["Document Id", "Answer IDs"];

/// One ground-truth mapping from a question to its answer unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruthEntry {
    #[serde(rename = "QuestionId")]
    pub question_id: String,
    #[serde(rename = "Question")]
    pub question: String,
    #[serde(rename = "AnswerId")]
    pub answer_id: String,
}

/// Resolved content for one answer unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusEntry {
    #[serde(rename = "AnswerId")]
    pub answer_id: String,
    #[serde(rename = "Answer")]
    pub answer: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Filename")]
    pub filename: String,
}

/// A row of the intermediate document -> answer-unit ids ledger.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentPauIds {
    #[serde(rename = "Document Id")]
    pub document_id: String,
    #[serde(rename = "Answer IDs")]
    pub answer_ids: String,
}

/// Answer-unit ids are stored comma-joined in sorted order.
pub fn serialize_pau_ids<'a>(ids: impl IntoIterator<Item = &'a String>) -> String {
    let mut ids: Vec<&str> = ids.into_iter().map(String::as_str).collect();
    ids.sort_unstable();
    ids.join(",")
}

/// Inverse of [`serialize_pau_ids`]. A document with no answer units is an empty string.
pub fn deserialize_pau_ids(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pau_ids_are_sorted() {
        let ids = vec!["p3".to_string(), "p1".to_string(), "p2".to_string()];
        assert_eq!(serialize_pau_ids(&ids), "p1,p2,p3");
    }

    #[test]
    fn test_empty_document_has_no_ids() {
        let ids: Vec<String> = vec![];
        let s = serialize_pau_ids(&ids);
        assert_eq!(s, "");
        assert_eq!(deserialize_pau_ids(&s).count(), 0);
        assert_eq!(deserialize_pau_ids("p1,p2").collect::<Vec<_>>(), vec!["p1", "p2"]);
    }
}
