//! Isolated environment for running files through the real pipeline with a
//! scripted extraction backend.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::Value;
use tempfile::TempDir;

use docwatch::error::ExtractionError;
use docwatch::pipeline::PipelineContext;
use docwatch::store::Table;
use docwatch::worker::{Job, JobResult, Trigger};
use docwatch::{
    Category, DedupTracker, EntityResult, ExtractionClient, ExtractionResult, ExtractionService,
    OutputStore, Pipeline, StabilityDetector,
};

pub fn test_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

/// Scripted extraction backend keyed by uploaded file name.
///
/// Unknown names get the default label and entities. Counts every call.
pub struct MockExtractionService {
    labels: Mutex<HashMap<String, String>>,
    entities: Mutex<HashMap<String, Value>>,
    failing_documents: Mutex<Vec<String>>,
    default_label: String,
    pub document_calls: AtomicUsize,
    pub entity_calls: AtomicUsize,
}

impl MockExtractionService {
    pub fn new() -> Self {
        Self::with_default_label("ap_invoice")
    }

    pub fn with_default_label(label: &str) -> Self {
        Self {
            labels: Mutex::new(HashMap::new()),
            entities: Mutex::new(HashMap::new()),
            failing_documents: Mutex::new(Vec::new()),
            default_label: label.to_string(),
            document_calls: AtomicUsize::new(0),
            entity_calls: AtomicUsize::new(0),
        }
    }

    /// Stage 1 labels `file_name` as `label`.
    pub fn label(&self, file_name: &str, label: &str) -> &Self {
        self.labels
            .lock()
            .unwrap()
            .insert(file_name.to_string(), label.to_string());
        self
    }

    /// Stage 2 returns `entities` for `file_name`.
    pub fn entities_for(&self, file_name: &str, entities: Value) -> &Self {
        self.entities
            .lock()
            .unwrap()
            .insert(file_name.to_string(), entities);
        self
    }

    /// Stage 1 answers 500 for `file_name`.
    pub fn fail_document(&self, file_name: &str) -> &Self {
        self.failing_documents
            .lock()
            .unwrap()
            .push(file_name.to_string());
        self
    }

    pub fn document_calls(&self) -> usize {
        self.document_calls.load(Ordering::SeqCst)
    }

    pub fn entity_calls(&self) -> usize {
        self.entity_calls.load(Ordering::SeqCst)
    }
}

impl ExtractionService for MockExtractionService {
    fn extract_document(
        &self,
        file_name: &str,
        _content: Vec<u8>,
    ) -> Result<ExtractionResult, ExtractionError> {
        self.document_calls.fetch_add(1, Ordering::SeqCst);

        if self
            .failing_documents
            .lock()
            .unwrap()
            .iter()
            .any(|name| name == file_name)
        {
            return Err(ExtractionError::Status {
                status: 500,
                body: "internal error".to_string(),
            });
        }

        let label = self
            .labels
            .lock()
            .unwrap()
            .get(file_name)
            .cloned()
            .unwrap_or_else(|| self.default_label.clone());

        // The file name rides along in the text so stage 2 can look it up.
        Ok(ExtractionResult::new(file_name, label))
    }

    fn extract_entities(
        &self,
        document: &ExtractionResult,
    ) -> Result<EntityResult, ExtractionError> {
        self.entity_calls.fetch_add(1, Ordering::SeqCst);

        let value = self
            .entities
            .lock()
            .unwrap()
            .get(&document.extracted_text)
            .cloned()
            .unwrap_or_else(|| {
                serde_json::json!({
                    "vendor_details": { "name": "Acme" },
                    "line_items": [{ "description": "Widget", "amount": 10 }]
                })
            });

        serde_json::from_value(value).map_err(|e| ExtractionError::MalformedBody(e.to_string()))
    }
}

/// Temp watch/output directories plus a pipeline wired to a mock backend.
pub struct TestHarness {
    temp_dir: TempDir,
    pub watch_dir: PathBuf,
    pub output_dir: PathBuf,
    pub service: Arc<MockExtractionService>,
    pub dedup: Arc<DedupTracker>,
    pub pipeline: Arc<Pipeline>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_service(MockExtractionService::new())
    }

    pub fn with_service(service: MockExtractionService) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let watch_dir = temp_dir.path().join("inbox");
        let output_dir = temp_dir.path().join("outputs");
        std::fs::create_dir_all(&watch_dir).expect("Failed to create watch directory");

        let service = Arc::new(service);
        let dedup = Arc::new(DedupTracker::new());
        let pipeline = Pipeline::new(
            StabilityDetector::new(Duration::from_millis(20), Duration::from_secs(5)),
            Arc::clone(&dedup),
            ExtractionClient::new(service.clone()),
            Arc::new(OutputStore::new(&output_dir)),
        )
        .with_day_source(test_day);

        Self {
            temp_dir,
            watch_dir,
            output_dir,
            service,
            dedup,
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn base(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes a small PDF-looking file into the watch directory.
    pub fn drop_pdf(&self, name: &str) -> PathBuf {
        self.drop_pdf_with_size(name, 64)
    }

    pub fn drop_pdf_with_size(&self, name: &str, size: usize) -> PathBuf {
        let path = self.watch_dir.join(name);
        let mut content = b"%PDF-1.7\n".to_vec();
        content.resize(size.max(content.len()), b'0');
        std::fs::write(&path, content).expect("Failed to write test PDF");
        path
    }

    pub fn process(&self, path: &Path) -> JobResult {
        let (result, _ctx) = self.process_with_context(path);
        result
    }

    pub fn process_with_context(&self, path: &Path) -> (JobResult, PipelineContext) {
        let job = Job::new(path.to_path_buf(), Trigger::Created);
        self.pipeline.run(PipelineContext::new(job))
    }

    pub fn store_path(&self, category: Category) -> PathBuf {
        self.pipeline.store().store_path(category, test_day())
    }

    pub fn read_store(&self, category: Category) -> Table {
        Table::read(&self.store_path(category)).expect("Failed to read output store")
    }

    /// Non-blank rows in a category's store.
    pub fn data_rows(&self, category: Category) -> Vec<Vec<String>> {
        self.read_store(category)
            .rows()
            .iter()
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .cloned()
            .collect()
    }
}
