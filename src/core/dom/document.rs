use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use crate::core::geometry::DOMRect;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type Result<T> = std::result::Result<T, DocumentError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn new() -> Self {
        Self(fastrand::u64(..))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Element,
    Text,
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentReadyState {
    Loading,
    Interactive,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub url: Option<String>,
    pub ready_state: DocumentReadyState,
    /// When false, style queries go through the inline `style` attribute only.
    pub computed_style_available: bool,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            url: None,
            ready_state: DocumentReadyState::Loading,
            computed_style_available: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MutationRecord {
    pub mutation_type: MutationType,
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    ChildList,
    Attributes,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub node_type: NodeType,
    pub tag_name: String,
    pub text_content: String,
    pub attributes: HashMap<String, String>,
    pub computed_styles: HashMap<String, String>,
    pub layout: Option<DOMRect>,
    pub parent: Option<NodeId>,
    pub children: SmallVec<[NodeId; 8]>,
}

impl Node {
    pub fn new_element(tag_name: String, id: NodeId) -> Self {
        Self {
            id,
            node_type: NodeType::Element,
            tag_name,
            text_content: String::new(),
            attributes: HashMap::new(),
            computed_styles: HashMap::new(),
            layout: None,
            parent: None,
            children: SmallVec::new(),
        }
    }

    pub fn new_text(content: String, id: NodeId) -> Self {
        Self {
            text_content: content,
            node_type: NodeType::Text,
            ..Self::new_element("#text".to_string(), id)
        }
    }

    pub fn new_document(id: NodeId) -> Self {
        Self {
            node_type: NodeType::Document,
            ..Self::new_element("#document".to_string(), id)
        }
    }

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_string(), value.to_string());
    }

    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    pub fn inline_style(&self, property: &str) -> Option<String> {
        let declarations = self.attributes.get("style")?;
        declarations.split(';').find_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            if name.trim().eq_ignore_ascii_case(property) {
                Some(value.trim().to_string())
            } else {
                None
            }
        })
    }
}

pub type MutationCallback = Arc<dyn Fn(&[MutationRecord]) + Send + Sync>;

#[derive(Clone)]
pub struct MutationObserver {
    pub callback: MutationCallback,
    pub observe_child_list: bool,
    pub observe_attributes: bool,
}

impl MutationObserver {
    pub fn child_list<F>(callback: F) -> Self
    where
        F: Fn(&[MutationRecord]) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
            observe_child_list: true,
            observe_attributes: false,
        }
    }

    fn wants(&self, record: &MutationRecord) -> bool {
        match record.mutation_type {
            MutationType::ChildList => self.observe_child_list,
            MutationType::Attributes => self.observe_attributes,
        }
    }
}

impl std::fmt::Debug for MutationObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationObserver")
            .field("observe_child_list", &self.observe_child_list)
            .field("observe_attributes", &self.observe_attributes)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(u64);

pub struct Document {
    metadata: Arc<RwLock<DocumentMetadata>>,
    root_node: Arc<RwLock<Option<NodeId>>>,
    nodes: Arc<DashMap<NodeId, Arc<RwLock<Node>>>>,
    mutation_observers: Arc<RwLock<Vec<(ObserverHandle, MutationObserver)>>>,
    next_observer: AtomicU64,
    ready_state_tx: watch::Sender<DocumentReadyState>,
}

impl Document {
    pub fn new() -> Self {
        let (ready_state_tx, _) = watch::channel(DocumentReadyState::Loading);
        let document = Self {
            metadata: Arc::new(RwLock::new(DocumentMetadata::default())),
            root_node: Arc::new(RwLock::new(None)),
            nodes: Arc::new(DashMap::new()),
            mutation_observers: Arc::new(RwLock::new(Vec::new())),
            next_observer: AtomicU64::new(1),
            ready_state_tx,
        };
        let root_id = NodeId::new();
        document
            .nodes
            .insert(root_id, Arc::new(RwLock::new(Node::new_document(root_id))));
        *document.root_node.write() = Some(root_id);
        document
    }

    pub fn get_root_node(&self) -> Option<NodeId> {
        *self.root_node.read()
    }

    pub fn create_node(&self, node_type: NodeType, content: String) -> Result<NodeId> {
        let node_id = NodeId::new();
        let node = match node_type {
            NodeType::Element => Node::new_element(content, node_id),
            NodeType::Text => Node::new_text(content, node_id),
            NodeType::Document => {
                return Err(DocumentError::InvalidOperation(
                    "a document owns exactly one document node".to_string(),
                ))
            }
        };
        self.nodes.insert(node_id, Arc::new(RwLock::new(node)));
        Ok(node_id)
    }

    pub fn create_element(&self, tag_name: &str) -> Result<NodeId> {
        self.create_node(NodeType::Element, tag_name.to_string())
    }

    pub fn append_child(&self, parent_id: NodeId, child_id: NodeId) -> Result<()> {
        let parent = self.node_or_err(parent_id)?;
        let child = self.node_or_err(child_id)?;
        if self.is_inclusive_ancestor(child_id, parent_id) {
            return Err(DocumentError::InvalidOperation(format!(
                "cannot append {child_id} inside its own subtree"
            )));
        }

        let previous_parent = child.read().parent;
        if let Some(previous) = previous_parent {
            if let Some(old_parent) = self.nodes.get(&previous) {
                old_parent.write().children.retain(|id| *id != child_id);
            }
        }
        parent.write().children.push(child_id);
        child.write().parent = Some(parent_id);

        self.record_mutation(MutationRecord {
            mutation_type: MutationType::ChildList,
            target: parent_id,
            added_nodes: vec![child_id],
            removed_nodes: Vec::new(),
        });
        Ok(())
    }

    pub fn remove_child(&self, parent_id: NodeId, child_id: NodeId) -> Result<()> {
        let parent = self.node_or_err(parent_id)?;
        let child = self.node_or_err(child_id)?;
        if child.read().parent != Some(parent_id) {
            return Err(DocumentError::InvalidOperation(format!(
                "{child_id} is not a child of {parent_id}"
            )));
        }
        parent.write().children.retain(|id| *id != child_id);
        child.write().parent = None;

        self.record_mutation(MutationRecord {
            mutation_type: MutationType::ChildList,
            target: parent_id,
            added_nodes: Vec::new(),
            removed_nodes: vec![child_id],
        });
        Ok(())
    }

    pub fn set_attribute(&self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        self.node_or_err(node_id)?.write().set_attribute(name, value);
        self.record_mutation(MutationRecord {
            mutation_type: MutationType::Attributes,
            target: node_id,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
        });
        Ok(())
    }

    pub fn set_layout(&self, node_id: NodeId, rect: DOMRect) -> Result<()> {
        self.node_or_err(node_id)?.write().layout = Some(rect);
        Ok(())
    }

    pub fn set_computed_style(&self, node_id: NodeId, property: &str, value: &str) -> Result<()> {
        self.node_or_err(node_id)?
            .write()
            .computed_styles
            .insert(property.to_string(), value.to_string());
        Ok(())
    }

    pub fn get_node(&self, node_id: NodeId) -> Option<Arc<RwLock<Node>>> {
        self.nodes.get(&node_id).map(|e| e.clone())
    }

    pub fn get_children(&self, node_id: NodeId) -> Vec<NodeId> {
        if let Some(node) = self.nodes.get(&node_id) {
            node.read().children.iter().copied().collect()
        } else {
            Vec::new()
        }
    }

    pub fn get_element_children(&self, node_id: NodeId) -> Vec<NodeId> {
        self.get_children(node_id)
            .into_iter()
            .filter(|id| {
                self.nodes
                    .get(id)
                    .map(|node| node.read().is_element())
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn get_parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(&node_id).and_then(|node| node.read().parent)
    }

    pub fn body(&self) -> Option<NodeId> {
        let root = self.get_root_node()?;
        let find = |parent: NodeId, tag: &str| {
            self.get_element_children(parent).into_iter().find(|id| {
                self.nodes
                    .get(id)
                    .map(|node| node.read().tag_name.eq_ignore_ascii_case(tag))
                    .unwrap_or(false)
            })
        };
        match find(root, "html") {
            Some(html) => find(html, "body"),
            None => find(root, "body"),
        }
    }

    pub fn get_url(&self) -> Option<String> {
        self.metadata.read().url.clone()
    }

    pub fn set_url(&self, url: String) {
        self.metadata.write().url = Some(url);
    }

    pub fn computed_style_available(&self) -> bool {
        self.metadata.read().computed_style_available
    }

    pub fn set_computed_style_available(&self, available: bool) {
        self.metadata.write().computed_style_available = available;
    }

    pub fn get_ready_state(&self) -> DocumentReadyState {
        self.metadata.read().ready_state
    }

    pub fn set_ready_state(&self, state: DocumentReadyState) {
        self.metadata.write().ready_state = state;
        self.ready_state_tx.send_replace(state);
    }

    pub fn subscribe_ready_state(&self) -> watch::Receiver<DocumentReadyState> {
        self.ready_state_tx.subscribe()
    }

    pub fn add_mutation_observer(&self, observer: MutationObserver) -> ObserverHandle {
        let handle = ObserverHandle(self.next_observer.fetch_add(1, Ordering::Relaxed));
        self.mutation_observers.write().push((handle, observer));
        handle
    }

    pub fn remove_mutation_observer(&self, handle: ObserverHandle) -> bool {
        let mut observers = self.mutation_observers.write();
        let before = observers.len();
        observers.retain(|(h, _)| *h != handle);
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.mutation_observers.read().len()
    }

    fn record_mutation(&self, record: MutationRecord) {
        let observers: Vec<MutationObserver> = self
            .mutation_observers
            .read()
            .iter()
            .filter(|(_, observer)| observer.wants(&record))
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            (observer.callback)(std::slice::from_ref(&record));
        }
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get_parent(id);
        }
        false
    }

    fn node_or_err(&self, node_id: NodeId) -> Result<Arc<RwLock<Node>>> {
        self.get_node(node_id)
            .ok_or_else(|| DocumentError::NodeNotFound(node_id.to_string()))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
