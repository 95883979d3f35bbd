pub mod retry;
pub mod types;

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::{RetryConfig, SourceConfig};
use crate::error::{HarvestError, Result};

use retry::with_retry;
use types::{AnswerUnit, Document, PauHits, Question, QuestionPage, TrecDocument};

pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Read operations against a Source Project.
#[async_trait]
pub trait SourceProject: Send + Sync {
    /// Every question in the project, across all pages.
    async fn get_questions(&self) -> Result<Vec<Question>>;

    /// Every corpus document (identifiers only).
    async fn get_documents(&self) -> Result<Vec<Document>>;

    /// Distinct answer-unit ids referenced by one document.
    async fn get_pau_ids_from_document(&self, document_id: &str) -> Result<BTreeSet<String>>;

    /// First hit for an answer-unit id, or `None` when the server has no content for it.
    async fn get_pau(&self, pau_id: &str) -> Result<Option<AnswerUnit>>;
}

/// HTTP client for the Source Project REST API.
pub struct XmgrClient {
    client: reqwest::Client,
    base_url: Url,
    username: String,
    password: String,
    page_size: usize,
    retry: RetryConfig,
}

impl XmgrClient {
    pub fn new(config: &SourceConfig, page_size: usize, retry: RetryConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| HarvestError::InvalidUrl(format!("{}: {}", config.url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(HarvestError::InvalidUrl(config.url.clone()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|source| HarvestError::Request {
                url: config.url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
            page_size: page_size.max(1),
            retry,
        })
    }

    /// Append encoded path segments to the project URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| HarvestError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        with_retry(&self.retry, || self.get_once(url.clone())).await
    }

    async fn get_once<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let url_str = url.to_string();
        let resp = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|source| HarvestError::Request {
                url: url_str.clone(),
                source,
            })?;

        let status = resp.status();
        debug!(url = %url_str, status = status.as_u16(), "GET");
        if !status.is_success() {
            return Err(HarvestError::Status {
                url: url_str,
                status: status.as_u16(),
            });
        }

        let text = resp.text().await.map_err(|source| HarvestError::Request {
            url: url_str.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| HarvestError::Decode {
            url: url_str,
            source,
        })
    }

    async fn get_question_page(&self, offset: usize, page_size: usize) -> Result<QuestionPage> {
        let mut url = self.endpoint(&["workbench", "api", "questions"])?;
        url.query_pairs_mut()
            .append_pair("offset", &offset.to_string())
            .append_pair("pagesize", &page_size.to_string());
        self.get_json(url).await
    }
}

impl fmt::Display for XmgrClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XMGR: {}", self.base_url)
    }
}

#[async_trait]
impl SourceProject for XmgrClient {
    async fn get_questions(&self) -> Result<Vec<Question>> {
        let questions =
            collect_pages(self.page_size, |offset, size| self.get_question_page(offset, size))
                .await?;
        debug!(count = questions.len(), "questions downloaded");
        Ok(questions)
    }

    async fn get_documents(&self) -> Result<Vec<Document>> {
        let url = self.endpoint(&["xmgr", "corpus", "document"])?;
        self.get_json(url).await
    }

    async fn get_pau_ids_from_document(&self, document_id: &str) -> Result<BTreeSet<String>> {
        let mut url = self.endpoint(&["xmgr", "corpus", "wea", "trec"])?;
        url.query_pairs_mut().append_pair("srcDocId", document_id);
        let trec: TrecDocument = self.get_json(url).await?;
        let docnos = trec.items.into_iter().map(|item| item.docno).collect();
        Ok(distinct_pau_ids(document_id, docnos))
    }

    async fn get_pau(&self, pau_id: &str) -> Result<Option<AnswerUnit>> {
        let url = self.endpoint(&["wcea", "api", "GroundTruth", "paus", pau_id])?;
        let hits: PauHits = self.get_json(url).await?;
        Ok(hits.hits.into_iter().next())
    }
}

/// Request pages until the accumulated item count reaches the total the
/// server reported on the first page. The server decides the real page size.
async fn collect_pages<F, Fut>(page_size: usize, mut fetch: F) -> Result<Vec<Question>>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<QuestionPage>>,
{
    let mut questions = Vec::new();
    let mut total = None;
    while total.map_or(true, |t| questions.len() < t) {
        let page = fetch(questions.len(), page_size).await?;
        let total = *total.get_or_insert(page.total);
        if page.items.is_empty() && questions.len() < total {
            return Err(HarvestError::ShortPagination {
                received: questions.len(),
                total,
            });
        }
        questions.extend(page.items);
    }
    Ok(questions)
}

fn distinct_pau_ids(document_id: &str, docnos: Vec<String>) -> BTreeSet<String> {
    let count = docnos.len();
    let ids: BTreeSet<String> = docnos.into_iter().collect();
    debug!(document_id, paus = count, "document answer units");
    if ids.len() != count {
        warn!(
            document_id,
            duplicates = count - ids.len(),
            "Document contains duplicate PAUs"
        );
    }
    ids
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn client(url: &str) -> XmgrClient {
        let config = SourceConfig {
            url: url.to_string(),
            username: "user".into(),
            password: "pass".into(),
        };
        XmgrClient::new(&config, DEFAULT_PAGE_SIZE, RetryConfig::default()).unwrap()
    }

    fn question(id: &str) -> Question {
        serde_json::from_value(serde_json::json!({"id": id, "text": id, "state": "APPROVED"}))
            .unwrap()
    }

    #[test]
    fn test_endpoint_with_and_without_trailing_slash() {
        for base in ["https://xmgr.example.com/project", "https://xmgr.example.com/project/"] {
            let url = client(base).endpoint(&["xmgr", "corpus", "document"]).unwrap();
            assert_eq!(
                url.as_str(),
                "https://xmgr.example.com/project/xmgr/corpus/document"
            );
        }
    }

    #[test]
    fn test_endpoint_encodes_pau_id() {
        let url = client("https://xmgr.example.com/")
            .endpoint(&["wcea", "api", "GroundTruth", "paus", "a/b c"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://xmgr.example.com/wcea/api/GroundTruth/paus/a%2Fb%20c"
        );
    }

    #[test]
    fn test_rejects_unusable_base() {
        let config = SourceConfig {
            url: "mailto:someone@example.com".into(),
            username: "u".into(),
            password: "p".into(),
        };
        let result = XmgrClient::new(&config, 500, RetryConfig::default());
        assert!(matches!(result, Err(HarvestError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_pagination_follows_server_page_size() {
        // Server caps pages at 2 items even though 500 were requested.
        let all: Vec<Question> = (0..5).map(|i| question(&format!("q{}", i))).collect();
        let requests = RefCell::new(Vec::new());
        let questions = collect_pages(500, |offset, size| {
            requests.borrow_mut().push((offset, size));
            let items = all.iter().skip(offset).take(2).cloned().collect();
            async move { Ok(QuestionPage { total: 5, items }) }
        })
        .await
        .unwrap();

        assert_eq!(questions.len(), 5);
        assert_eq!(questions[4].id, "q4");
        assert_eq!(
            *requests.borrow(),
            vec![(0, 500), (2, 500), (4, 500)]
        );
    }

    #[tokio::test]
    async fn test_pagination_empty_project() {
        let questions = collect_pages(500, |_, _| async {
            Ok(QuestionPage {
                total: 0,
                items: vec![],
            })
        })
        .await
        .unwrap();
        assert!(questions.is_empty());
    }

    #[tokio::test]
    async fn test_pagination_short_page_is_an_error() {
        let result = collect_pages(500, |offset, _| {
            let items = if offset == 0 { vec![question("q0")] } else { vec![] };
            async move { Ok(QuestionPage { total: 3, items }) }
        })
        .await;
        assert!(matches!(
            result,
            Err(HarvestError::ShortPagination {
                received: 1,
                total: 3
            })
        ));
    }

    /// Serve one canned HTTP response on a local port and hand back the raw
    /// request that was received.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/project", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (base, handle)
    }

    #[tokio::test]
    async fn test_get_pau_sends_basic_auth() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"hits": [{"id": "p1", "responseMarkup": "<p>One</p>", "title": "One", "sourceName": "one.pdf"}]}"#,
        )
        .await;

        let pau = client(&base).get_pau("p1").await.unwrap().unwrap();
        assert_eq!(pau.title, "One");

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /project/wcea/api/groundtruth/paus/p1 "));
        // base64("user:pass")
        assert!(request.contains("authorization: basic dxnlcjpwyxnz"));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let (base, server) = serve_once("401 Unauthorized", "{}").await;

        let result = client(&base).get_documents().await;
        match result {
            Err(HarvestError::Status { url, status }) => {
                assert_eq!(status, 401);
                assert!(url.ends_with("/project/xmgr/corpus/document"));
            }
            other => panic!("expected status error, got {:?}", other.map(|d| d.len())),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_decode_error() {
        let (base, server) = serve_once("200 OK", "<html>login</html>").await;

        let result = client(&base).get_pau_ids_from_document("doc 1").await;
        match result {
            Err(err @ HarvestError::Decode { .. }) => {
                assert!(!err.is_transient());
                assert!(err.to_string().contains("srcDocId=doc+1"));
            }
            other => panic!("expected decode error, got {:?}", other),
        }
        server.await.unwrap();
    }

    #[test]
    fn test_duplicate_pau_ids_collapse() {
        let ids = distinct_pau_ids(
            "doc-1",
            vec!["p2".into(), "p1".into(), "p2".into()],
        );
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["p1", "p2"]);
    }
}
