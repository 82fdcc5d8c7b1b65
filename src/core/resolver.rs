use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::core::dom::NodeId;
use crate::core::geometry::WeightClass;
use crate::core::host::ContentTree;
use crate::core::mutation::MutationTracker;
use crate::core::network::ResourceTimeIndex;
use crate::core::scoring::WinningElement;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedElement {
    pub node: NodeId,
    pub tag: String,
    pub score: f64,
    pub weight: WeightClass,
    /// `None` when no timestamp could be resolved; counts as 0.
    pub time: Option<f64>,
}

pub struct TimeResolver<'a> {
    tracker: &'a MutationTracker,
    index: &'a ResourceTimeIndex,
}

impl<'a> TimeResolver<'a> {
    pub fn new(tracker: &'a MutationTracker, index: &'a ResourceTimeIndex) -> Self {
        Self { tracker, index }
    }

    pub fn resolve<T: ContentTree + ?Sized>(
        &self,
        tree: &T,
        elements: &[WinningElement],
    ) -> Vec<ResolvedElement> {
        elements
            .iter()
            .map(|element| ResolvedElement {
                node: element.node,
                tag: tree.tag_name(element.node).unwrap_or_default(),
                score: element.score,
                weight: element.weight,
                time: self.resolve_element(tree, element),
            })
            .collect()
    }

    pub fn resolve_element<T: ContentTree + ?Sized>(
        &self,
        tree: &T,
        element: &WinningElement,
    ) -> Option<f64> {
        let node = element.node;
        let tag = tree.tag_name(node).unwrap_or_default().to_ascii_lowercase();
        let time = match (element.weight, tag.as_str()) {
            (WeightClass::Plain, _) => self.tracker.stamp_time(node),
            (WeightClass::Image, "img") => self.attribute_time(tree, node, "src"),
            (WeightClass::Image, "svg") => self.tracker.stamp_time(node),
            (WeightClass::Image, _) => self.background_time(tree, node),
            (WeightClass::Media, "canvas") => self.tracker.stamp_time(node),
            (WeightClass::Media, "video") => self
                .attribute_time(tree, node, "src")
                .filter(|t| *t > 0.0)
                .or_else(|| self.attribute_time(tree, node, "poster")),
            (WeightClass::Media, _) => None,
        };
        time.filter(|t| t.is_finite())
    }

    fn attribute_time<T: ContentTree + ?Sized>(
        &self,
        tree: &T,
        node: NodeId,
        attribute: &str,
    ) -> Option<f64> {
        let raw = tree.attribute(node, attribute)?;
        let url = normalize_url(&raw, tree.document_url().as_deref());
        let time = self.index.response_end(&url);
        if time.is_none() {
            debug!(%node, %url, "no resource timing for {attribute}");
        }
        time
    }

    fn background_time<T: ContentTree + ?Sized>(&self, tree: &T, node: NodeId) -> Option<f64> {
        let value = tree.resolve_style(node, "background-image")?;
        let Some(raw) = extract_background_url(&value) else {
            debug!(%node, %value, "background-image has no quoted url");
            return None;
        };
        let url = normalize_url(&raw, tree.document_url().as_deref());
        let time = self.index.response_end(&url);
        if time.is_none() {
            debug!(%node, %url, "no resource timing for background image");
        }
        time
    }
}

pub fn latest_time(elements: &[ResolvedElement]) -> Option<f64> {
    if elements.is_empty() {
        return None;
    }
    Some(
        elements
            .iter()
            .map(|e| e.time.unwrap_or(0.0))
            .fold(0.0, f64::max),
    )
}

/// First quoted URL inside `url(...)` of a computed `background-image` value.
pub fn extract_background_url(value: &str) -> Option<String> {
    let start = value.find("url(")? + "url(".len();
    let rest = &value[start..];
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &rest[quote.len_utf8()..];
    let end = body.find(quote)?;
    if !body[end + quote.len_utf8()..].starts_with(')') {
        return None;
    }
    let url = &body[..end];
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}

/// Values that already mention `http` are used as is, as are all values when
/// the document URL is unknown or unparsable.
///
/// Relative values are resolved with `Url::join` instead of only prefixing
/// the page scheme (`https:` + value). Both agree on `//host/...`; for
/// `/path` the join yields `https://host/path` where the prefix rule would
/// yield `https:/path`.
pub fn normalize_url(raw: &str, document_url: Option<&str>) -> String {
    if raw.contains("http") {
        return raw.to_string();
    }
    match document_url.and_then(|base| Url::parse(base).ok()) {
        Some(base) => match base.join(raw) {
            Ok(joined) => joined.to_string(),
            Err(_) => format!("{}:{}", base.scheme(), raw),
        },
        None => raw.to_string(),
    }
}
