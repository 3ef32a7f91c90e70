//! Client for a remote catalog `items_batch` endpoint: packages product
//! operations into one request and folds the response into one result.

pub mod catalog;
pub mod config;
pub mod error;

pub use catalog::{BatchClient, CallContext};
pub use error::{CatalogError, TransportError, ValidationErrors};
