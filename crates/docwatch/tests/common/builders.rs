//! Builder for config JSON used by the loading tests.

#![allow(dead_code)]

use serde_json::{json, Value};

pub struct ConfigBuilder {
    value: Value,
}

impl ConfigBuilder {
    /// Minimal valid config.
    pub fn new() -> Self {
        Self {
            value: json!({
                "version": "1.0",
                "watch_directory": "/tmp/inbox",
                "output_directory": "/tmp/outputs",
                "extraction": {
                    "document_extract_url": "https://extract.example.com/document_extract",
                    "entity_extract_url": "https://extract.example.com/entity_extraction"
                }
            }),
        }
    }

    pub fn set(mut self, key: &str, value: Value) -> Self {
        self.value[key] = value;
        self
    }

    pub fn extraction(mut self, key: &str, value: Value) -> Self {
        self.value["extraction"][key] = value;
        self
    }

    pub fn stability(mut self, poll_interval_ms: u64, timeout_secs: u64) -> Self {
        self.value["stability"] = json!({
            "poll_interval_ms": poll_interval_ms,
            "timeout_secs": timeout_secs
        });
        self
    }

    pub fn remove(mut self, key: &str) -> Self {
        if let Some(object) = self.value.as_object_mut() {
            object.remove(key);
        }
        self
    }

    pub fn build(self) -> String {
        self.value.to_string()
    }
}
