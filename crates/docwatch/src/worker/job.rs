use std::fmt;
use std::path::{Path, PathBuf};

use crate::classify::Category;
use crate::extract::Stage;
use crate::watch::Stability;

/// What caused a path to be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Created,
    MovedIn,
    StartupScan,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Created => write!(f, "created"),
            Trigger::MovedIn => write!(f, "moved-in"),
            Trigger::StartupScan => write!(f, "startup-scan"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub source_path: PathBuf,
    pub trigger: Trigger,
}

impl Job {
    pub fn new(source_path: PathBuf, trigger: Trigger) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_path,
            trigger,
        }
    }

    /// File name component only, for logs and the `file_name` column.
    pub fn file_name(&self) -> String {
        file_name_of(&self.source_path)
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

#[derive(Debug)]
pub enum JobOutcome {
    /// The file never settled or went away; a later notification may retry it.
    NotReady(Stability),
    /// Already dispatched earlier in this process lifetime.
    Duplicate,
    /// A remote stage failed; nothing was written.
    ExtractionFailed(Stage),
    /// Rows written to the category's store for the day.
    Stored { category: Category, path: PathBuf },
    /// Extraction worked but the store could not be updated.
    StoreFailed { category: Category, error: String },
}

#[derive(Debug)]
pub struct JobResult {
    pub job_id: String,
    pub source_path: PathBuf,
    pub outcome: JobOutcome,
}

impl JobResult {
    pub fn new(job: &Job, outcome: JobOutcome) -> Self {
        Self {
            job_id: job.id.clone(),
            source_path: job.source_path.clone(),
            outcome,
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self.outcome, JobOutcome::Stored { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self.outcome,
            JobOutcome::ExtractionFailed(_) | JobOutcome::StoreFailed { .. }
        )
    }
}
