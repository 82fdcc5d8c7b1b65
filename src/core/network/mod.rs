use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::host::ResourceTimingSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InitiatorType {
    Img,
    Css,
    Script,
    Video,
    Fetch,
    #[default]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceTiming {
    pub name: String,
    #[serde(default)]
    pub initiator_type: InitiatorType,
    #[serde(default)]
    pub start_time: f64,
    pub response_end: f64,
}

impl ResourceTiming {
    pub fn new(name: impl Into<String>, response_end: f64) -> Self {
        Self {
            name: name.into(),
            initiator_type: InitiatorType::Other,
            start_time: 0.0,
            response_end,
        }
    }

    pub fn with_initiator(mut self, initiator_type: InitiatorType) -> Self {
        self.initiator_type = initiator_type;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PerformanceTimeline {
    entries: Arc<RwLock<Vec<ResourceTiming>>>,
}

impl PerformanceTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: ResourceTiming) {
        tracing::trace!(url = %entry.name, response_end = entry.response_end, "resource timing recorded");
        self.entries.write().push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl ResourceTimingSource for PerformanceTimeline {
    fn resource_entries(&self) -> Vec<ResourceTiming> {
        self.entries.read().clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResourceTimeIndex {
    by_url: HashMap<String, f64>,
}

impl ResourceTimeIndex {
    /// Later entries for the same URL replace earlier ones.
    pub fn build<S: ResourceTimingSource + ?Sized>(source: &S) -> Self {
        Self::from_entries(source.resource_entries())
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = ResourceTiming>,
    {
        let mut by_url = HashMap::new();
        for entry in entries {
            by_url.insert(entry.name, entry.response_end);
        }
        Self { by_url }
    }

    pub fn response_end(&self, url: &str) -> Option<f64> {
        self.by_url.get(url).copied().filter(|t| t.is_finite())
    }

    pub fn len(&self) -> usize {
        self.by_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_url.is_empty()
    }
}
