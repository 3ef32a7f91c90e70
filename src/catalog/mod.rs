use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::config::CatalogConfig;
use crate::error::{CatalogError, TransportError, ValidationErrors};

pub mod executor;
pub mod model;

pub use executor::{
    default_executor, ExecutorResponse, HttpExecutor, PostRequest, ReqwestExecutor, ResponseBody,
};
pub use model::{
    ApiError, Applink, BatchRequest, BatchResponse, Media, Method, Operation, Product,
    ValidationStatus, PRODUCT_ITEM,
};

use model::ErrorResponse;

pub const GRAPH_API_BASE: &str = "https://graph.facebook.com";

/// Cancellation and deadline for calls made through a client.
///
/// The default context never expires and cannot be cancelled.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl CallContext {
    pub fn background() -> Self {
        Self::default()
    }

    /// Absolute deadline shared by every call made with this context.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Budget for a single call, measured from when the call starts.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Earliest of the absolute deadline and `started + timeout`.
    fn deadline_from(&self, started: Instant) -> Option<Instant> {
        let relative = self.timeout.map(|t| started + t);
        match (self.deadline, relative) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    async fn guard<T, F>(&self, deadline: Option<Instant>, fut: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let expired = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            biased;
            _ = cancelled => Err(TransportError::Cancelled),
            _ = expired => Err(TransportError::DeadlineExceeded),
            res = fut => res,
        }
    }
}

/// Client bound to one catalog's `items_batch` endpoint.
///
/// Configuration methods consume the client and return a new value, so a
/// configured client can be cloned and shared without further mutation.
#[derive(Clone)]
pub struct BatchClient {
    endpoint: String,
    context: CallContext,
    executor: Arc<dyn HttpExecutor>,
}

impl fmt::Debug for BatchClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchClient")
            .field("endpoint", &self.endpoint)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl BatchClient {
    pub fn new(api_version: &str, catalog_id: u64) -> Self {
        Self::with_base_url(api_version, catalog_id, GRAPH_API_BASE)
    }

    /// Neither input is validated; a malformed endpoint surfaces as a
    /// transport error on the first call.
    pub fn with_base_url(api_version: &str, catalog_id: u64, base_url: &str) -> Self {
        let endpoint = format!(
            "{}/{}/{}/items_batch",
            base_url.trim_end_matches('/'),
            api_version,
            catalog_id
        );
        Self {
            endpoint,
            context: CallContext::background(),
            executor: default_executor(),
        }
    }

    pub fn from_config(cfg: &CatalogConfig) -> Self {
        let client = Self::with_base_url(&cfg.api_version, cfg.catalog_id, &cfg.base_url);
        match cfg.timeout() {
            Some(timeout) => client.with_context(CallContext::background().with_timeout(timeout)),
            None => client,
        }
    }

    pub fn with_context(self, context: CallContext) -> Self {
        Self { context, ..self }
    }

    pub fn with_executor(self, executor: Arc<dyn HttpExecutor>) -> Self {
        Self { executor, ..self }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    /// Submit `operations` in update-only mode.
    pub async fn send(
        &self,
        operations: &[Operation],
        token: &str,
    ) -> Result<BatchResponse, CatalogError> {
        self.submit(operations, token, false).await
    }

    /// Submit `operations` allowing the service to create missing items.
    pub async fn send_upsert(
        &self,
        operations: &[Operation],
        token: &str,
    ) -> Result<BatchResponse, CatalogError> {
        self.submit(operations, token, true).await
    }

    pub fn build_request(
        &self,
        operations: &[Operation],
        token: &str,
        allow_upsert: bool,
    ) -> Result<PostRequest, CatalogError> {
        let envelope = BatchRequest::new(operations, token, allow_upsert);
        let body = serde_json::to_vec(&envelope).map_err(CatalogError::Encode)?;
        Ok(PostRequest {
            url: self.endpoint.clone(),
            headers: vec![("Content-Type", "application/json".to_string())],
            body,
        })
    }

    #[instrument(
        skip_all,
        fields(endpoint = %self.endpoint, operations = operations.len(), allow_upsert = allow_upsert)
    )]
    async fn submit(
        &self,
        operations: &[Operation],
        token: &str,
        allow_upsert: bool,
    ) -> Result<BatchResponse, CatalogError> {
        let request = self.build_request(operations, token, allow_upsert)?;
        debug!(bytes = request.body.len(), "sending catalog batch");

        if self.context.is_cancelled() {
            return Err(TransportError::Cancelled.into());
        }
        let deadline = self.context.deadline_from(Instant::now());
        if deadline.is_some_and(|at| at <= Instant::now()) {
            return Err(TransportError::DeadlineExceeded.into());
        }

        let res = self
            .context
            .guard(deadline, self.executor.execute(request))
            .await?;
        debug!(status = %res.status, "catalog batch response");

        if res.status == StatusCode::NO_CONTENT {
            return Ok(BatchResponse::default());
        }
        let body = self.context.guard(deadline, res.body.read_all()).await?;
        interpret_response(&body)
    }
}

/// Map a response body onto a result. The success shape wins whenever it
/// carries handles; otherwise the body must be the error shape.
pub fn interpret_response(body: &[u8]) -> Result<BatchResponse, CatalogError> {
    let response: BatchResponse = serde_json::from_slice(body).map_err(CatalogError::Decode)?;
    if response.handles.is_empty() {
        let err: ErrorResponse = serde_json::from_slice(body).map_err(CatalogError::Decode)?;
        return Err(CatalogError::Application(err.into_inner()));
    }
    ValidationErrors::check(response).map_err(CatalogError::Validation)
}
