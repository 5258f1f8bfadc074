use std::path::PathBuf;

use crate::config::schema::StabilityConfig;
use crate::config::Config;

pub struct PipelineConfig {
    pub output_directory: PathBuf,
    pub stability: StabilityConfig,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_directory: config.output_directory(),
            stability: config.stability.clone(),
        }
    }
}
