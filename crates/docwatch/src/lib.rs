pub mod aggregate;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod pipeline;
pub mod store;
pub mod watch;
pub mod worker;

pub use aggregate::{flatten, CategorizedBatch, CategorizedRecord, FlatRow};
pub use classify::Category;
pub use config::{load_config, load_config_from_str, Config};
pub use error::{
    ConfigError, DocwatchError, ExtractionError, Result, StoreError, WorkerError,
};
pub use extract::{
    EntityResult, ExtractionClient, ExtractionResult, ExtractionService, HttpExtractionService,
    Stage,
};
pub use pipeline::{Pipeline, PipelineConfig, PipelineContext};
pub use store::{BatchReport, OutputStore, WriteSummary};
pub use watch::{DedupTracker, RunStats, Stability, StabilityDetector, WatchController};
