use parking_lot::Mutex;
use std::sync::Arc;

use crate::core::dom::NodeId;
use crate::core::geometry::DOMRect;
use crate::core::network::ResourceTiming;

pub trait ContentTree {
    /// The element scoring and stamping start from (the page body).
    fn root(&self) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    fn tag_name(&self, node: NodeId) -> Option<String>;

    /// Bounding box in viewport coordinates. `None` when the node has no box.
    fn bounding_box(&self, node: NodeId) -> Option<DOMRect>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Whether the primary computed-style mechanism exists on this host.
    fn supports_computed_style(&self) -> bool {
        true
    }

    fn computed_style(&self, node: NodeId, property: &str) -> Option<String>;

    /// Style lookup used when computed styles are unavailable.
    fn legacy_style(&self, _node: NodeId, _property: &str) -> Option<String> {
        None
    }

    fn resolve_style(&self, node: NodeId, property: &str) -> Option<String> {
        if self.supports_computed_style() {
            self.computed_style(node, property)
        } else {
            self.legacy_style(node, property)
        }
    }

    /// URL of the observed document, used to absolutize resource URLs.
    fn document_url(&self) -> Option<String> {
        None
    }
}

pub trait ResourceTimingSource {
    fn resource_entries(&self) -> Vec<ResourceTiming>;
}

pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Backed by `tokio::time::Instant`, so a paused runtime drives it.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: tokio::time::Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Arc::new(Mutex::new(start_ms)),
        }
    }

    pub fn set(&self, ms: f64) {
        *self.now.lock() = ms;
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        *self.now.lock()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> f64 {
        (**self).now_ms()
    }
}
