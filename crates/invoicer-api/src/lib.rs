//! Invoicer API Library
//!
//! HTTP handlers, application state and process setup. The same process hosts the
//! ingestion worker when `CONSUMER_ENABLED` is set.

mod api_doc;
pub mod constants;
pub mod error;
mod extractors;
mod handlers;
pub mod setup;
pub mod state;

pub use api_doc::ApiDoc;
pub use error::{ErrorResponse, HttpAppError};
pub use state::{AppState, StoreState};
