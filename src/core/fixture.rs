//! Recorded page loads that can be replayed against the reference host.
//!
//! A fixture describes the initial body content, timed batches of appended
//! nodes, resource completion times and when the load signal fires. Times are
//! milliseconds from the start of the replay.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, info};

use crate::core::dom::{create_html_document, Document, DocumentError, DocumentReadyState, NodeId};
use crate::core::geometry::DOMRect;
use crate::core::network::{PerformanceTimeline, ResourceTiming};

/// Fixture id that always names the page body.
pub const BODY_ID: &str = "body";

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Invalid fixture JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to read fixture: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unknown node id: {0}")]
    UnknownNode(String),
    #[error("Duplicate node id: {0}")]
    DuplicateId(String),
    #[error("Event time out of range: {0} ms")]
    InvalidTime(f64),
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
}

pub type Result<T> = std::result::Result<T, FixtureError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub tag: String,
    /// `[x, y, width, height]` in viewport coordinates.
    #[serde(default)]
    pub rect: Option<[f64; 4]>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub styles: HashMap<String, String>,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn new(tag: &str, rect: [f64; 4]) -> Self {
        Self {
            id: None,
            tag: tag.to_string(),
            rect: Some(rect),
            attributes: HashMap::new(),
            styles: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_style(mut self, property: &str, value: &str) -> Self {
        self.styles.insert(property.to_string(), value.to_string());
        self
    }

    pub fn with_child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureStep {
    pub at_ms: u64,
    #[serde(default = "default_parent")]
    pub parent: String,
    pub nodes: Vec<NodeSpec>,
}

fn default_parent() -> String {
    BODY_ID.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFixture {
    #[serde(default)]
    pub url: Option<String>,
    /// `[width, height]`; the configured viewport is used when absent.
    #[serde(default)]
    pub viewport: Option<[u32; 2]>,
    #[serde(default)]
    pub initial: Vec<NodeSpec>,
    #[serde(default)]
    pub steps: Vec<FixtureStep>,
    #[serde(default)]
    pub resources: Vec<ResourceTiming>,
    pub load_at_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct NodeIds {
    ids: HashMap<String, NodeId>,
}

impl NodeIds {
    pub fn get(&self, id: &str) -> Option<NodeId> {
        self.ids.get(id).copied()
    }

    fn insert(&mut self, id: &str, node: NodeId) -> Result<()> {
        if self.ids.insert(id.to_string(), node).is_some() {
            return Err(FixtureError::DuplicateId(id.to_string()));
        }
        Ok(())
    }
}

enum ReplayEvent<'a> {
    Resource(&'a ResourceTiming),
    Step(&'a FixtureStep),
    Load,
}

impl PageFixture {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    pub fn build_document(&self) -> Result<(Document, NodeIds)> {
        let document = create_html_document(self.url.as_deref())?;
        let body = document
            .body()
            .ok_or_else(|| FixtureError::UnknownNode(BODY_ID.to_string()))?;

        let mut ids = NodeIds::default();
        ids.insert(BODY_ID, body)?;
        for spec in &self.initial {
            insert_spec(&document, &mut ids, body, spec)?;
        }
        Ok((document, ids))
    }

    /// Plays steps, resource completions and the load signal in real time,
    /// measured from the moment this is called.
    pub async fn replay(
        &self,
        document: &Document,
        ids: &mut NodeIds,
        timeline: &PerformanceTimeline,
    ) -> Result<()> {
        let start = Instant::now();
        let mut events: Vec<(f64, ReplayEvent<'_>)> = Vec::new();
        events.extend(self.resources.iter().map(|r| (r.response_end, ReplayEvent::Resource(r))));
        events.extend(self.steps.iter().map(|s| (s.at_ms as f64, ReplayEvent::Step(s))));
        events.push((self.load_at_ms as f64, ReplayEvent::Load));
        // stable sort: at equal times resources land before steps, steps before load
        events.sort_by(|a, b| a.0.total_cmp(&b.0));
        let timed = events
            .into_iter()
            .map(|(at_ms, event)| Ok((at_ms, deadline(start, at_ms)?, event)))
            .collect::<Result<Vec<_>>>()?;

        for (at_ms, deadline, event) in timed {
            sleep_until(deadline).await;
            match event {
                ReplayEvent::Resource(resource) => timeline.record(resource.clone()),
                ReplayEvent::Step(step) => {
                    let parent = ids
                        .get(&step.parent)
                        .ok_or_else(|| FixtureError::UnknownNode(step.parent.clone()))?;
                    for spec in &step.nodes {
                        insert_spec(document, ids, parent, spec)?;
                    }
                    debug!(at_ms, parent = %step.parent, nodes = step.nodes.len(), "fixture step applied");
                }
                ReplayEvent::Load => {
                    document.set_ready_state(DocumentReadyState::Complete);
                    info!(at_ms, "fixture load signal fired");
                }
            }
        }
        Ok(())
    }

    pub fn demo() -> Self {
        PageFixture {
            url: Some("https://news.example/article/42".to_string()),
            viewport: Some([1280, 720]),
            initial: vec![NodeSpec::new("header", [0.0, 0.0, 1280.0, 64.0]).with_id("header")],
            steps: vec![
                FixtureStep {
                    at_ms: 120,
                    parent: BODY_ID.to_string(),
                    nodes: vec![NodeSpec::new("main", [0.0, 64.0, 1280.0, 656.0])
                        .with_id("main")
                        .with_child(NodeSpec::new("h1", [40.0, 80.0, 900.0, 48.0]))],
                },
                FixtureStep {
                    at_ms: 340,
                    parent: "main".to_string(),
                    nodes: vec![
                        NodeSpec::new("img", [40.0, 140.0, 1200.0, 500.0])
                            .with_attribute("src", "/media/hero.jpg"),
                        NodeSpec::new("p", [40.0, 650.0, 900.0, 60.0]),
                    ],
                },
            ],
            resources: vec![
                ResourceTiming::new("https://news.example/media/hero.jpg", 610.0),
                ResourceTiming::new("https://news.example/app.js", 90.0),
            ],
            load_at_ms: 700,
        }
    }
}

fn deadline(start: Instant, at_ms: f64) -> Result<Instant> {
    Duration::try_from_secs_f64(at_ms.max(0.0) / 1000.0)
        .ok()
        .and_then(|offset| start.checked_add(offset))
        .ok_or(FixtureError::InvalidTime(at_ms))
}

fn insert_spec(document: &Document, ids: &mut NodeIds, parent: NodeId, spec: &NodeSpec) -> Result<NodeId> {
    let node = document.create_element(&spec.tag)?;
    if let Some([x, y, width, height]) = spec.rect {
        document.set_layout(node, DOMRect::new(x, y, width, height))?;
    }
    for (name, value) in &spec.attributes {
        document.set_attribute(node, name, value)?;
    }
    for (property, value) in &spec.styles {
        document.set_computed_style(node, property, value)?;
    }
    if let Some(id) = &spec.id {
        ids.insert(id, node)?;
    }
    for child in &spec.children {
        insert_spec(document, ids, node, child)?;
    }
    document.append_child(parent, node)?;
    Ok(node)
}
