pub mod document;

pub use document::{
    Document, DocumentError, DocumentMetadata, DocumentReadyState, MutationCallback,
    MutationObserver, MutationRecord, MutationType, Node, NodeId, NodeType, ObserverHandle,
    Result,
};

use crate::core::geometry::DOMRect;
use crate::core::host::ContentTree;

pub fn create_html_document(url: Option<&str>) -> Result<Document> {
    let document = Document::new();
    let html_id = document.create_element("html")?;
    let head_id = document.create_element("head")?;
    let body_id = document.create_element("body")?;
    document.append_child(html_id, head_id)?;
    document.append_child(html_id, body_id)?;
    if let Some(root_id) = document.get_root_node() {
        document.append_child(root_id, html_id)?;
    }
    if let Some(url) = url {
        document.set_url(url.to_string());
    }
    Ok(document)
}

impl ContentTree for Document {
    fn root(&self) -> Option<NodeId> {
        self.body()
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.get_element_children(node)
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.get_node(node).map(|n| n.read().tag_name.clone())
    }

    fn bounding_box(&self, node: NodeId) -> Option<DOMRect> {
        self.get_node(node).and_then(|n| n.read().layout)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.get_node(node).and_then(|n| n.read().get_attribute(name))
    }

    fn supports_computed_style(&self) -> bool {
        self.computed_style_available()
    }

    fn computed_style(&self, node: NodeId, property: &str) -> Option<String> {
        self.get_node(node)
            .and_then(|n| n.read().computed_styles.get(property).cloned())
    }

    fn legacy_style(&self, node: NodeId, property: &str) -> Option<String> {
        self.get_node(node).and_then(|n| n.read().inline_style(property))
    }

    fn document_url(&self) -> Option<String> {
        self.get_url()
    }
}
