//! Uniform status reporting.
//!
//! Every long-lived component answers `status()` with the same fixed record,
//! so callers never inspect optional fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::{BirdeyeSource, FileSource, SyntheticSource};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub component: String,
    pub ready: bool,
    /// Ordered so rendered output is stable.
    pub details: BTreeMap<String, String>,
}

impl ComponentStatus {
    pub fn new(component: impl Into<String>, ready: bool) -> Self {
        Self {
            component: component.into(),
            ready,
            details: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }

    /// One line per component: `name [ready] k=v k=v`.
    pub fn render(&self) -> String {
        let mut line = format!(
            "{} [{}]",
            self.component,
            if self.ready { "ready" } else { "not ready" }
        );
        for (k, v) in &self.details {
            line.push_str(&format!(" {k}={v}"));
        }
        line
    }
}

pub trait StatusReport {
    fn status(&self) -> ComponentStatus;
}

impl StatusReport for FileSource {
    fn status(&self) -> ComponentStatus {
        ComponentStatus::new("file_source", self.path().exists())
            .with("path", self.path().display())
    }
}

impl StatusReport for BirdeyeSource {
    fn status(&self) -> ComponentStatus {
        ComponentStatus::new("birdeye_source", true)
            .with("base_url", self.base_url())
            .with("chain", self.chain())
    }
}

impl StatusReport for SyntheticSource {
    fn status(&self) -> ComponentStatus {
        ComponentStatus::new("synthetic_source", true).with("seed", self.seed())
    }
}
