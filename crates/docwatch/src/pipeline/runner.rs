use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{debug, error, info, info_span, warn};

use crate::aggregate::{CategorizedBatch, CategorizedRecord};
use crate::classify::Category;
use crate::extract::{ExtractionClient, ExtractionService, Stage};
use crate::store::OutputStore;
use crate::watch::{DedupTracker, StabilityDetector};
use crate::worker::job::{JobOutcome, JobResult};

use super::config::PipelineConfig;
use super::context::PipelineContext;

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Per-file processing shared by every worker.
pub struct Pipeline {
    detector: StabilityDetector,
    dedup: Arc<DedupTracker>,
    client: ExtractionClient,
    store: Arc<OutputStore>,
    today: fn() -> NaiveDate,
}

impl Pipeline {
    /// Production constructor: builds the detector and store from config.
    pub fn from_config(
        config: &PipelineConfig,
        service: Arc<dyn ExtractionService>,
        dedup: Arc<DedupTracker>,
    ) -> Self {
        Self::new(
            StabilityDetector::from_config(&config.stability),
            dedup,
            ExtractionClient::new(service),
            Arc::new(OutputStore::new(&config.output_directory)),
        )
    }

    pub fn new(
        detector: StabilityDetector,
        dedup: Arc<DedupTracker>,
        client: ExtractionClient,
        store: Arc<OutputStore>,
    ) -> Self {
        Self {
            detector,
            dedup,
            client,
            store,
            today: local_today,
        }
    }

    /// Overrides the calendar day used to pick the output store.
    pub fn with_day_source(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn dedup(&self) -> &Arc<DedupTracker> {
        &self.dedup
    }

    pub fn store(&self) -> &Arc<OutputStore> {
        &self.store
    }

    /// Run the full pipeline for a single file.
    /// Returns a (JobResult, PipelineContext) pair.
    pub fn run(&self, mut ctx: PipelineContext) -> (JobResult, PipelineContext) {
        let filename = ctx.job.file_name();
        let _pipeline_span = info_span!("pipeline",
            job_id = %ctx.job.id,
            filename = %filename,
            trigger = %ctx.job.trigger,
        )
        .entered();

        // Step 1: Wait for the upload to settle
        {
            let _step = info_span!("stability").entered();
            let stability = self.detector.wait_until_stable(&ctx.job.source_path);
            ctx.stability = Some(stability.clone());
            if !stability.is_ready() {
                info!("Skipping {} for this notification: {:?}", filename, stability);
                return (
                    JobResult::new(&ctx.job, JobOutcome::NotReady(stability)),
                    ctx,
                );
            }
        }

        // Step 2: At most one dispatch per path
        {
            let _step = info_span!("dedup").entered();
            if !self.dedup.should_process(&ctx.job.source_path) {
                debug!("{} already processed, ignoring", ctx.job.source_path.display());
                return (JobResult::new(&ctx.job, JobOutcome::Duplicate), ctx);
            }
            info!(
                "New PDF detected (processed): {}",
                ctx.job.source_path.display()
            );
        }

        // Step 3: Document extraction
        let document = {
            let _step = info_span!("extract_document").entered();
            match self.client.document(&ctx.job.source_path) {
                Some(document) => document,
                None => {
                    error!(
                        "Skipping {} due to Document Extract API failure",
                        ctx.job.source_path.display()
                    );
                    let outcome = JobOutcome::ExtractionFailed(Stage::DocumentExtract);
                    return (JobResult::new(&ctx.job, outcome), ctx);
                }
            }
        };

        // Step 4: Classify
        let category = {
            let _step = info_span!("classify").entered();
            let category = Category::classify(document.document_type_label());
            debug!("Classified {} as {}", filename, category);
            category
        };
        ctx.category = Some(category);

        // Step 5: Entity extraction
        let entities = {
            let _step = info_span!("extract_entities").entered();
            let entities = self.client.entities(&document);
            ctx.document = Some(document);
            match entities {
                Some(entities) => entities,
                None => {
                    error!(
                        "Skipping {} due to Entity Extractor API failure",
                        ctx.job.source_path.display()
                    );
                    let outcome = JobOutcome::ExtractionFailed(Stage::EntityExtract);
                    return (JobResult::new(&ctx.job, outcome), ctx);
                }
            }
        };

        // Step 6: Aggregate
        {
            let _step = info_span!("aggregate").entered();
            let record = CategorizedRecord {
                category,
                file_name: filename.clone(),
                entities,
            };
            ctx.batch = CategorizedBatch::from_records([&record]);
            ctx.record = Some(record);
        }

        // Step 7: Persist
        let outcome = {
            let _step = info_span!("store").entered();
            self.step_store(&mut ctx, category)
        };

        (JobResult::new(&ctx.job, outcome), ctx)
    }

    fn step_store(&self, ctx: &mut PipelineContext, category: Category) -> JobOutcome {
        let report = self.store.write_batch(&ctx.batch, (self.today)());

        let mut outcome = None;
        for (written, summary) in report.succeeded() {
            info!(
                "Successfully appended {} rows to {} ({} rows total)",
                summary.appended_rows,
                summary.path.display(),
                summary.total_rows
            );
            if written == category {
                outcome = Some(JobOutcome::Stored {
                    category,
                    path: summary.path.clone(),
                });
            }
        }
        for (failed, e) in report.failed() {
            error!(
                error = ?e,
                "Error appending {} rows for {}: {}",
                failed,
                ctx.job.file_name(),
                e
            );
            if failed == category {
                outcome = Some(JobOutcome::StoreFailed {
                    category,
                    error: e.to_string(),
                });
            }
        }

        ctx.report = Some(report);
        outcome.unwrap_or_else(|| {
            warn!("No rows to save for {}", ctx.job.file_name());
            JobOutcome::StoreFailed {
                category,
                error: "no rows produced".to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionError;
    use crate::extract::{EntityResult, ExtractionResult};
    use crate::store::{Table, SPACER_ROWS};
    use crate::watch::Stability;
    use crate::worker::job::{Job, Trigger};
    use serde_json::json;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    fn fixed_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    struct ScriptedService {
        label: &'static str,
        document_status: Option<u16>,
        entity_status: Option<u16>,
        document_calls: AtomicUsize,
        entity_calls: AtomicUsize,
    }

    impl ScriptedService {
        fn labelled(label: &'static str) -> Self {
            Self {
                label,
                document_status: None,
                entity_status: None,
                document_calls: AtomicUsize::new(0),
                entity_calls: AtomicUsize::new(0),
            }
        }
    }

    impl ExtractionService for ScriptedService {
        fn extract_document(
            &self,
            _file_name: &str,
            _content: Vec<u8>,
        ) -> Result<ExtractionResult, ExtractionError> {
            self.document_calls.fetch_add(1, Ordering::SeqCst);
            match self.document_status {
                Some(status) => Err(ExtractionError::Status {
                    status,
                    body: String::new(),
                }),
                None => Ok(ExtractionResult::new("Invoice from Acme", self.label)),
            }
        }

        fn extract_entities(
            &self,
            _document: &ExtractionResult,
        ) -> Result<EntityResult, ExtractionError> {
            self.entity_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(status) = self.entity_status {
                return Err(ExtractionError::Status {
                    status,
                    body: String::new(),
                });
            }
            Ok(serde_json::from_value(json!({
                "vendor_details": { "name": "Acme" },
                "invoice_details": { "number": "INV-1" },
                "line_items": [{ "sku": "W-1" }, { "sku": "W-2" }]
            }))
            .unwrap())
        }
    }

    fn setup_dirs() -> (TempDir, PathBuf, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("input");
        let output = tmp.path().join("output");
        std::fs::create_dir_all(&input).unwrap();
        std::fs::create_dir_all(&output).unwrap();
        (tmp, input, output)
    }

    fn pipeline(service: Arc<ScriptedService>, output: &Path) -> Pipeline {
        Pipeline::new(
            StabilityDetector::new(Duration::from_millis(10), Duration::from_secs(2)),
            Arc::new(DedupTracker::new()),
            ExtractionClient::new(service),
            Arc::new(OutputStore::new(output)),
        )
        .with_day_source(fixed_day)
    }

    fn write_pdf(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"%PDF-1.7\n%fake\n").unwrap();
        path
    }

    fn run(pipeline: &Pipeline, path: PathBuf) -> (JobResult, PipelineContext) {
        pipeline.run(PipelineContext::new(Job::new(path, Trigger::Created)))
    }

    #[test]
    fn test_full_pipeline_stores_one_row() {
        let (_tmp, input, output) = setup_dirs();
        let service = Arc::new(ScriptedService::labelled("AP_Invoice"));
        let pipeline = pipeline(service.clone(), &output);

        let (result, ctx) = run(&pipeline, write_pdf(&input, "acme.pdf"));

        let expected = pipeline
            .store()
            .store_path(Category::ApInvoice, fixed_day());
        match result.outcome {
            JobOutcome::Stored { category, ref path } => {
                assert_eq!(category, Category::ApInvoice);
                assert_eq!(path, &expected);
            }
            ref other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(ctx.category, Some(Category::ApInvoice));
        assert_eq!(ctx.record.as_ref().unwrap().file_name, "acme.pdf");

        let table = Table::read(&expected).unwrap();
        assert_eq!(
            table.headers(),
            &[
                "category",
                "file_name",
                "vendor_name",
                "invoice_number",
                "line_item_sku"
            ]
        );
        assert_eq!(table.row_count(), 1 + SPACER_ROWS);
        assert_eq!(table.rows()[0][4], "W-1");
        assert_eq!(service.document_calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.entity_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stage_one_failure_skips_stage_two() {
        let (_tmp, input, output) = setup_dirs();
        let service = Arc::new(ScriptedService {
            document_status: Some(502),
            ..ScriptedService::labelled("ap_invoice")
        });
        let pipeline = pipeline(service.clone(), &output);

        let (result, ctx) = run(&pipeline, write_pdf(&input, "acme.pdf"));

        assert!(matches!(
            result.outcome,
            JobOutcome::ExtractionFailed(Stage::DocumentExtract)
        ));
        assert!(ctx.record.is_none());
        assert!(ctx.batch.is_empty());
        assert_eq!(service.entity_calls.load(Ordering::SeqCst), 0);
        assert!(!pipeline.store().day_directory(fixed_day()).exists());
    }

    #[test]
    fn test_stage_two_failure_writes_nothing() {
        let (_tmp, input, output) = setup_dirs();
        let service = Arc::new(ScriptedService {
            entity_status: Some(500),
            ..ScriptedService::labelled("ap_invoice")
        });
        let pipeline = pipeline(service, &output);

        let (result, ctx) = run(&pipeline, write_pdf(&input, "acme.pdf"));

        assert!(matches!(
            result.outcome,
            JobOutcome::ExtractionFailed(Stage::EntityExtract)
        ));
        assert!(ctx.record.is_none());
        assert!(!pipeline.store().day_directory(fixed_day()).exists());
    }

    #[test]
    fn test_unknown_label_still_stored() {
        let (_tmp, input, output) = setup_dirs();
        let pipeline = pipeline(Arc::new(ScriptedService::labelled("")), &output);

        let (result, _ctx) = run(&pipeline, write_pdf(&input, "mystery.pdf"));

        assert!(matches!(
            result.outcome,
            JobOutcome::Stored {
                category: Category::Unknown,
                ..
            }
        ));
        assert!(pipeline
            .store()
            .store_path(Category::Unknown, fixed_day())
            .exists());
    }

    #[test]
    fn test_second_run_for_same_path_is_duplicate() {
        let (_tmp, input, output) = setup_dirs();
        let service = Arc::new(ScriptedService::labelled("incoming_payments"));
        let pipeline = pipeline(service.clone(), &output);
        let path = write_pdf(&input, "pay.pdf");

        let (first, _) = run(&pipeline, path.clone());
        let (second, _) = run(&pipeline, path);

        assert!(first.is_stored());
        assert!(matches!(second.outcome, JobOutcome::Duplicate));
        assert_eq!(service.document_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_file_is_not_deduped() {
        let (_tmp, input, output) = setup_dirs();
        let pipeline = pipeline(Arc::new(ScriptedService::labelled("ap_invoice")), &output);
        let path = input.join("later.pdf");

        let (result, _) = run(&pipeline, path.clone());
        assert!(matches!(
            result.outcome,
            JobOutcome::NotReady(Stability::Vanished)
        ));
        assert!(!pipeline.dedup().contains(&path));

        // The file shows up afterwards and a new notification succeeds.
        write_pdf(&input, "later.pdf");
        let (retry, _) = run(&pipeline, path);
        assert!(retry.is_stored());
    }

    #[test]
    fn test_store_failure_is_reported() {
        let (_tmp, input, output) = setup_dirs();
        let pipeline = pipeline(Arc::new(ScriptedService::labelled("ap_invoice")), &output);
        std::fs::create_dir_all(
            pipeline
                .store()
                .store_path(Category::ApInvoice, fixed_day()),
        )
        .unwrap();

        let (result, ctx) = run(&pipeline, write_pdf(&input, "acme.pdf"));

        assert!(matches!(
            result.outcome,
            JobOutcome::StoreFailed {
                category: Category::ApInvoice,
                ..
            }
        ));
        assert!(result.is_failure());
        assert!(!ctx.report.unwrap().is_success());
    }
}
