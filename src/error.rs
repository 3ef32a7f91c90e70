//! Error types returned by the batch client.
use std::fmt;
use thiserror::Error;

use crate::catalog::model::{ApiError, BatchResponse};

#[derive(Debug, Error)]
pub enum CatalogError {
    /// The envelope could not be serialized; nothing was sent.
    #[error("failed to encode batch request: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// The body matched neither the success nor the error shape.
    #[error("failed to decode catalog response: {0}")]
    Decode(#[source] serde_json::Error),
    /// Top-level failure reported by the remote service.
    #[error("catalog api error: {0}")]
    Application(ApiError),
    /// Per-item errors embedded in a handle-bearing response.
    #[error("catalog validation failed: {0}")]
    Validation(ValidationErrors),
}

impl CatalogError {
    /// The remote error record for application failures.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            CatalogError::Application(err) => Some(err),
            _ => None,
        }
    }

    pub fn validation(&self) -> Option<&ValidationErrors> {
        match self {
            CatalogError::Validation(errs) => Some(errs),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("request cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// A per-item error and the retailer id it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemError {
    pub retailer_id: String,
    pub error: ApiError,
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.retailer_id, self.error)
    }
}

/// Every per-item error found in a response, in response order.
///
/// The response is kept so callers still see the handles that were assigned
/// and any warnings reported next to the errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<ItemError>,
    response: BatchResponse,
}

impl ValidationErrors {
    /// Collect the errors of `response`, handing the response back untouched
    /// when it reports none.
    pub fn check(response: BatchResponse) -> Result<BatchResponse, Self> {
        let errors: Vec<ItemError> = response
            .validation_status
            .iter()
            .flat_map(|status| {
                status.errors.iter().map(|error| ItemError {
                    retailer_id: status.retailer_id.clone(),
                    error: error.clone(),
                })
            })
            .collect();
        if errors.is_empty() {
            return Ok(response);
        }
        Err(Self { errors, response })
    }

    pub fn errors(&self) -> &[ItemError] {
        &self.errors
    }

    pub fn handles(&self) -> &[String] {
        &self.response.handles
    }

    pub fn response(&self) -> &BatchResponse {
        &self.response
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}
