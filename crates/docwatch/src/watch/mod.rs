pub mod controller;
pub mod dedup;
pub mod stability;

pub use controller::{arrival_path, is_candidate, RunStats, WatchController};
pub use dedup::DedupTracker;
pub use stability::{Stability, StabilityDetector, WatchedFile};
