use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Paths already dispatched into the pipeline during this process lifetime.
///
/// Membership is in-memory only; a restart forgets every path.
#[derive(Debug, Default)]
pub struct DedupTracker {
    processed: Mutex<HashSet<PathBuf>>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time `path` is seen and records it; false on
    /// every later call. Check and insert happen under one lock.
    pub fn should_process(&self, path: &Path) -> bool {
        let mut processed = self
            .processed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        processed.insert(path.to_path_buf())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.processed
            .lock()
            .map(|set| set.contains(path))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.processed.lock().map(|set| set.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
