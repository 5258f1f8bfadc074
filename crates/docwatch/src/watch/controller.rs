//! Directory watch loop: turns filesystem notifications into queued jobs.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::WorkerError;
use crate::extract::ExtractionService;
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::watch::DedupTracker;
use crate::worker::job::{Job, JobOutcome, JobResult, Trigger};
use crate::worker::WorkerPool;

const EVENT_POLL: Duration = Duration::from_millis(100);

/// Tally of finished jobs over one `run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub stored: usize,
    /// Not ready yet, or already processed.
    pub skipped: usize,
    pub failed: usize,
}

impl RunStats {
    pub fn record(&mut self, result: &JobResult) {
        match result.outcome {
            JobOutcome::Stored { .. } => self.stored += 1,
            JobOutcome::NotReady(_) | JobOutcome::Duplicate => self.skipped += 1,
            JobOutcome::ExtractionFailed(_) | JobOutcome::StoreFailed { .. } => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.stored + self.skipped + self.failed
    }
}

/// The path a notification says just arrived in the directory, if any.
///
/// Creations and rename targets count. Content modifications, removals and
/// rename sources do not.
pub fn arrival_path(event: &Event) -> Option<(PathBuf, Trigger)> {
    match event.kind {
        EventKind::Create(_) => event.paths.first().map(|p| (p.clone(), Trigger::Created)),
        EventKind::Modify(ModifyKind::Name(RenameMode::To))
        | EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
            event.paths.first().map(|p| (p.clone(), Trigger::MovedIn))
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.get(1).map(|p| (p.clone(), Trigger::MovedIn))
        }
        _ => None,
    }
}

/// `.pdf` in any letter case, and not a directory.
pub fn is_candidate(path: &Path) -> bool {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    is_pdf && !path.is_dir()
}

pub struct WatchController {
    watch_directory: PathBuf,
    scan_existing: bool,
    dedup: Arc<DedupTracker>,
    pool: WorkerPool,
}

impl WatchController {
    /// Fails when `watch_directory` is not an existing directory.
    pub fn new(
        watch_directory: &Path,
        pipeline: Arc<Pipeline>,
        worker_count: usize,
        scan_existing: bool,
    ) -> Result<Self, WorkerError> {
        if !watch_directory.is_dir() {
            return Err(WorkerError::MissingDirectory(watch_directory.to_path_buf()));
        }
        // Event paths are reported against the canonical directory.
        let watch_directory = watch_directory
            .canonicalize()
            .map_err(|_| WorkerError::MissingDirectory(watch_directory.to_path_buf()))?;

        Ok(Self {
            watch_directory,
            scan_existing,
            dedup: Arc::clone(pipeline.dedup()),
            pool: WorkerPool::new(pipeline, worker_count),
        })
    }

    pub fn from_config(
        config: &Config,
        service: Arc<dyn ExtractionService>,
    ) -> Result<Self, WorkerError> {
        let pipeline = Pipeline::from_config(
            &PipelineConfig::from_config(config),
            service,
            Arc::new(DedupTracker::new()),
        );
        Self::new(
            &config.watch_directory(),
            Arc::new(pipeline),
            config.worker_count,
            config.scan_existing,
        )
    }

    pub fn watch_directory(&self) -> &Path {
        &self.watch_directory
    }

    /// Paths dispatched so far, shared with every worker.
    pub fn dedup(&self) -> &Arc<DedupTracker> {
        &self.dedup
    }

    /// Jobs for PDFs already sitting in the directory.
    pub fn scan(&self) -> Result<Vec<Job>, WorkerError> {
        let mut jobs = Vec::new();

        for entry in WalkDir::new(&self.watch_directory)
            .min_depth(1)
            .max_depth(1) // Only the top level
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| WorkerError::ScanFailed {
                path: self.watch_directory.clone(),
                source: e,
            })?;
            let path = entry.path();

            if is_candidate(path) {
                debug!("Found existing PDF: {}", path.display());
                jobs.push(Job::new(path.to_path_buf(), Trigger::StartupScan));
            }
        }

        info!(
            "Scanned {} existing PDFs in {}",
            jobs.len(),
            self.watch_directory.display()
        );
        Ok(jobs)
    }

    /// Watches until `shutdown` is set, then waits for queued jobs to finish.
    pub fn run(self, shutdown: Arc<AtomicBool>) -> Result<RunStats, WorkerError> {
        let (tx, rx) = std::sync::mpsc::channel::<notify::Result<Event>>();

        // Subscribe before scanning so nothing slips between the two.
        let mut watcher = RecommendedWatcher::new(tx, notify::Config::default())
            .map_err(|e| WorkerError::WatchError(e.to_string()))?;
        watcher
            .watch(&self.watch_directory, RecursiveMode::NonRecursive)
            .map_err(|e| WorkerError::WatchError(e.to_string()))?;

        info!("Watching directory: {}", self.watch_directory.display());

        let mut stats = RunStats::default();

        if self.scan_existing {
            for job in self.scan()? {
                if !self.pool.submit_unless(job, &shutdown)? {
                    info!("Startup scan interrupted by shutdown");
                    break;
                }
            }
        }

        loop {
            if shutdown.load(Ordering::Relaxed) {
                info!("Watch mode shutting down...");
                break;
            }

            match rx.recv_timeout(EVENT_POLL) {
                Ok(Ok(event)) => {
                    if let Err(e) = self.dispatch(&event, &shutdown) {
                        error!("Could not queue {:?}: {}", event.paths, e);
                        break;
                    }
                }
                Ok(Err(e)) => {
                    warn!("Watch error: {}", e);
                }
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    error!("Watch channel disconnected");
                    break;
                }
            }

            while let Some(result) = self.pool.try_recv_result() {
                stats.record(&result);
            }
        }

        drop(watcher);
        self.pool.shutdown();
        for result in self.pool.wait() {
            stats.record(&result);
        }

        info!(
            "Watcher stopped: {} stored, {} skipped, {} failed ({} paths seen)",
            stats.stored,
            stats.skipped,
            stats.failed,
            self.dedup.len()
        );
        Ok(stats)
    }

    /// Queues the arrival in `event`, if any. Gives up once `shutdown` is set
    /// rather than waiting on a full queue.
    fn dispatch(&self, event: &Event, shutdown: &AtomicBool) -> Result<(), WorkerError> {
        let Some((path, trigger)) = arrival_path(event) else {
            return Ok(());
        };
        if !is_candidate(&path) {
            debug!("Ignoring {} ({})", path.display(), trigger);
            return Ok(());
        }

        debug!("New PDF detected: {} ({})", path.display(), trigger);
        if !self.pool.submit_unless(Job::new(path.clone(), trigger), shutdown)? {
            info!("Not queueing {}: shutting down", path.display());
        }
        Ok(())
    }
}
