//! HTTP executor seam. The client only needs "POST these bytes, give me a
//! status and a body I can read later"; everything else belongs to the
//! executor.
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::sync::Arc;

use crate::error::TransportError;

const USER_AGENT: &str = concat!("catalog-batch/", env!("CARGO_PKG_VERSION"));

static DEFAULT_EXECUTOR: Lazy<Arc<ReqwestExecutor>> =
    Lazy::new(|| Arc::new(ReqwestExecutor::new()));

/// Process-wide executor used when a client is not given one.
pub fn default_executor() -> Arc<dyn HttpExecutor> {
    let executor: Arc<dyn HttpExecutor> = DEFAULT_EXECUTOR.clone();
    executor
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl PostRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status plus a body that is only read on demand.
pub struct ExecutorResponse {
    pub status: StatusCode,
    pub body: Box<dyn ResponseBody>,
}

impl fmt::Debug for ExecutorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait ResponseBody: Send {
    async fn read_all(self: Box<Self>) -> Result<Vec<u8>, TransportError>;
}

#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute(&self, request: PostRequest) -> Result<ExecutorResponse, TransportError>;
}

/// Executor backed by a `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestExecutor {
    http: Client,
}

impl fmt::Debug for ReqwestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestExecutor").finish_non_exhaustive()
    }
}

impl Default for ReqwestExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestExecutor {
    pub fn new() -> Self {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { http }
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: PostRequest) -> Result<ExecutorResponse, TransportError> {
        let mut builder = self.http.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        let res = builder.body(request.body).send().await?;
        Ok(ExecutorResponse {
            status: res.status(),
            body: Box::new(ReqwestBody(res)),
        })
    }
}

struct ReqwestBody(reqwest::Response);

#[async_trait]
impl ResponseBody for ReqwestBody {
    async fn read_all(self: Box<Self>) -> Result<Vec<u8>, TransportError> {
        Ok(self.0.bytes().await?.to_vec())
    }
}
