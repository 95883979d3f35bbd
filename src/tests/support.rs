use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{HarvestError, Result};
use crate::source::types::{AnswerUnit, Document, Question};
use crate::source::SourceProject;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Questions,
    Documents,
    DocumentPaus(String),
    Pau(String),
}

/// In-memory Source Project that records every request it serves.
#[derive(Default)]
pub struct FakeSource {
    questions: Vec<Question>,
    documents: BTreeMap<String, Vec<String>>,
    paus: HashMap<String, AnswerUnit>,
    failing: HashSet<String>,
    requests: Mutex<Vec<Request>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn question(mut self, value: serde_json::Value) -> Self {
        self.questions
            .push(serde_json::from_value(value).expect("valid question"));
        self
    }

    pub fn document(mut self, id: &str, pau_ids: &[&str]) -> Self {
        self.documents
            .insert(id.to_string(), pau_ids.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn pau(self, id: &str, title: &str) -> Self {
        self.pau_with_id(id, id, title)
    }

    /// Serve `lookup_id` with a unit whose own id is `unit_id`.
    pub fn pau_with_id(mut self, lookup_id: &str, unit_id: &str, title: &str) -> Self {
        self.paus.insert(
            lookup_id.to_string(),
            AnswerUnit {
                id: unit_id.to_string(),
                response_markup: format!("<p>{}</p>", title),
                title: title.to_string(),
                source_name: format!("{}.pdf", title),
            },
        );
        self
    }

    pub fn failing_document(mut self, id: &str) -> Self {
        self.failing.insert(format!("doc:{}", id));
        self
    }

    pub fn failing_pau(mut self, id: &str) -> Self {
        self.failing.insert(format!("pau:{}", id));
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn document_requests(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Request::DocumentPaus(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn pau_requests(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Request::Pau(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, request: Request) {
        self.requests.lock().unwrap().push(request);
    }

    fn check(&self, key: String) -> Result<()> {
        if self.failing.contains(&key) {
            return Err(HarvestError::Status {
                url: format!("http://fake/{}", key),
                status: 500,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SourceProject for FakeSource {
    async fn get_questions(&self) -> Result<Vec<Question>> {
        self.record(Request::Questions);
        Ok(self.questions.clone())
    }

    async fn get_documents(&self) -> Result<Vec<Document>> {
        self.record(Request::Documents);
        Ok(self
            .documents
            .keys()
            .map(|id| Document { id: id.clone() })
            .collect())
    }

    async fn get_pau_ids_from_document(&self, document_id: &str) -> Result<BTreeSet<String>> {
        self.record(Request::DocumentPaus(document_id.to_string()));
        self.check(format!("doc:{}", document_id))?;
        Ok(self
            .documents
            .get(document_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_pau(&self, pau_id: &str) -> Result<Option<AnswerUnit>> {
        self.record(Request::Pau(pau_id.to_string()));
        self.check(format!("pau:{}", pau_id))?;
        Ok(self.paus.get(pau_id).cloned())
    }
}
