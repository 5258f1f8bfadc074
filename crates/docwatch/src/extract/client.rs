use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};

use super::types::{EntityResult, ExtractionResult};
use super::ExtractionService;
use crate::error::ExtractionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    DocumentExtract,
    EntityExtract,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::DocumentExtract => write!(f, "Document Extract"),
            Stage::EntityExtract => write!(f, "Entity Extractor"),
        }
    }
}

/// Wraps an [`ExtractionService`] with per-call timing and logging.
///
/// Every failure is logged here and surfaces to the caller as `None`. There is
/// no retry: one failed call ends the file's run for this arrival.
#[derive(Clone)]
pub struct ExtractionClient {
    service: Arc<dyn ExtractionService>,
}

impl ExtractionClient {
    pub fn new(service: Arc<dyn ExtractionService>) -> Self {
        Self { service }
    }

    /// Stage 1: uploads the file and returns its text and type label.
    pub fn document(&self, path: &Path) -> Option<ExtractionResult> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document.pdf".to_string());
        let target = path.display().to_string();

        self.timed(Stage::DocumentExtract, &target, || {
            let content = std::fs::read(path).map_err(|e| ExtractionError::ReadDocument {
                path: path.to_path_buf(),
                source: e,
            })?;
            debug!(bytes = content.len(), "Uploading {}", file_name);
            self.service.extract_document(&file_name, content)
        })
    }

    /// Stage 2: turns stage-1 text into structured entities.
    pub fn entities(&self, document: &ExtractionResult) -> Option<EntityResult> {
        let target = format!("{} chars of text", document.extracted_text.len());
        self.timed(Stage::EntityExtract, &target, || {
            self.service.extract_entities(document)
        })
    }

    fn timed<T>(
        &self,
        stage: Stage,
        target: &str,
        call: impl FnOnce() -> Result<T, ExtractionError>,
    ) -> Option<T> {
        info!("Starting {} API call for {}", stage, target);
        let started = Instant::now();
        let result = call();
        let elapsed = started.elapsed();

        match result {
            Ok(value) => {
                info!(
                    latency_ms = elapsed.as_millis() as u64,
                    "{} API call successful for {}. Response Time: {:.2}s",
                    stage,
                    target,
                    elapsed.as_secs_f64()
                );
                Some(value)
            }
            Err(e) => {
                let status = e
                    .status()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "N/A".to_string());
                error!(
                    latency_ms = elapsed.as_millis() as u64,
                    status = %status,
                    error = ?e,
                    "{} API call failed for {}. Status: {}, Response Time: {:.2}s, Error: {}",
                    stage,
                    target,
                    status,
                    elapsed.as_secs_f64(),
                    e
                );
                None
            }
        }
    }
}
