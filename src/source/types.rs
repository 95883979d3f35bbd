use serde::{Deserialize, Serialize};

pub const REJECTED_STATE: &str = "REJECTED";

/// A question record as returned by the workbench API.
///
/// Fields this tool does not interpret are kept in `extra` so the archived
/// `truth.json` matches what the server sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(default)]
    pub text: String,
    /// Lifecycle state, e.g. "REJECTED".
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub off_topic: bool,
    /// Direct answer-unit reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predefined_answer_unit: Option<String>,
    /// Indirection to another question whose answer applies to this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_question: Option<QuestionRef>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Question {
    pub fn is_rejected(&self) -> bool {
        self.state == REJECTED_STATE
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRef {
    pub id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionPage {
    pub total: usize,
    #[serde(default)]
    pub items: Vec<Question>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrecDocument {
    #[serde(default)]
    pub items: Vec<TrecItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrecItem {
    #[serde(rename = "DOCNO")]
    pub docno: String,
}

/// Full content of one answer unit (PAU).
///
/// `id` is the unit's own identifier and is not guaranteed to equal the id
/// that was used to look it up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerUnit {
    pub id: String,
    #[serde(default)]
    pub response_markup: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PauHits {
    #[serde(default)]
    pub hits: Vec<AnswerUnit>,
}
