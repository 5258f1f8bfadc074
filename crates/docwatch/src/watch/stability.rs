//! Size-polling check that decides when an arriving file has finished writing.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::config::StabilityConfig;

/// Outcome of waiting for a file to settle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stability {
    /// Two consecutive samples reported the same size.
    Ready { size: u64 },
    /// The size kept changing until the timeout elapsed.
    TimedOut,
    /// The path disappeared or became unreadable between polls.
    Vanished,
}

impl Stability {
    pub fn is_ready(&self) -> bool {
        matches!(self, Stability::Ready { .. })
    }
}

/// Polling state for one path. Lives only as long as a single wait.
#[derive(Debug, Clone)]
pub struct WatchedFile {
    pub path: PathBuf,
    pub last_size: Option<u64>,
    pub last_change: Instant,
}

impl WatchedFile {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            last_size: None,
            last_change: Instant::now(),
        }
    }

    /// Records a size sample; returns true when it matches the previous one.
    fn observe(&mut self, size: u64) -> bool {
        if self.last_size == Some(size) {
            return true;
        }
        self.last_size = Some(size);
        self.last_change = Instant::now();
        false
    }
}

#[derive(Debug, Clone)]
pub struct StabilityDetector {
    poll_interval: Duration,
    timeout: Duration,
}

impl StabilityDetector {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    pub fn from_config(config: &StabilityConfig) -> Self {
        Self::new(config.poll_interval(), config.timeout())
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Blocks the calling thread until the file settles, vanishes, or the
    /// timeout elapses.
    pub fn wait_until_stable(&self, path: &Path) -> Stability {
        let started = Instant::now();
        let mut watched = WatchedFile::new(path);

        while started.elapsed() < self.timeout {
            let size = match std::fs::metadata(&watched.path) {
                Ok(meta) => meta.len(),
                Err(e) => {
                    info!(
                        "{} disappeared or is unreadable while waiting for it to settle: {}",
                        watched.path.display(),
                        e
                    );
                    return Stability::Vanished;
                }
            };

            if watched.observe(size) {
                debug!(
                    "{} stable at {} bytes after {:?}",
                    watched.path.display(),
                    size,
                    started.elapsed()
                );
                return Stability::Ready { size };
            }

            std::thread::sleep(self.poll_interval);
        }

        warn!(
            "Timeout waiting for {} to be ready (last size {:?}, unchanged for {:?})",
            watched.path.display(),
            watched.last_size,
            watched.last_change.elapsed()
        );
        Stability::TimedOut
    }
}

impl Default for StabilityDetector {
    fn default() -> Self {
        Self::from_config(&StabilityConfig::default())
    }
}
