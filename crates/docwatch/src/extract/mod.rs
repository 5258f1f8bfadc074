//! Adapter to the two remote extraction stages.
//!
//! Stage 1 turns an uploaded PDF into text plus a document type label; stage 2
//! turns that text into vendor/customer/invoice details and line items.

pub mod client;
pub mod http;
pub mod types;

pub use client::{ExtractionClient, Stage};
pub use http::HttpExtractionService;
pub use types::{EntityResult, ExtractionResult};

use crate::error::ExtractionError;

/// The remote collaborator behind the extraction client.
///
/// Implementations report every failure as an error; the client decides what
/// gets logged and turns failures into "no result".
pub trait ExtractionService: Send + Sync {
    fn extract_document(
        &self,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<ExtractionResult, ExtractionError>;

    fn extract_entities(&self, document: &ExtractionResult)
        -> Result<EntityResult, ExtractionError>;
}
