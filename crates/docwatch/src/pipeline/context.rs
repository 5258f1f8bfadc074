use crate::aggregate::{CategorizedBatch, CategorizedRecord};
use crate::classify::Category;
use crate::extract::ExtractionResult;
use crate::store::BatchReport;
use crate::watch::Stability;
use crate::worker::job::Job;

pub struct PipelineContext {
    // Input
    pub job: Job,

    // Step 1 result
    pub stability: Option<Stability>,

    // Step 3 result
    pub document: Option<ExtractionResult>,

    // Step 4 result
    pub category: Option<Category>,

    // Step 6 results (the record owns the step 5 entities)
    pub record: Option<CategorizedRecord>,
    pub batch: CategorizedBatch,

    // Step 7 result
    pub report: Option<BatchReport>,
}

impl PipelineContext {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            stability: None,
            document: None,
            category: None,
            record: None,
            batch: CategorizedBatch::new(),
            report: None,
        }
    }
}
