use serde::{Deserialize, Serialize};

use crate::core::dom::NodeId;
use crate::core::host::ContentTree;

const EMPTY_BACKGROUND_VALUES: &[&str] = &["none", "initial", "unset"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DOMRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl DOMRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            top: y,
            right: x + width,
            bottom: y + height,
            left: x,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn rect(&self) -> DOMRect {
        DOMRect::new(0.0, 0.0, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeightClass {
    Plain = 1,
    Image = 2,
    Media = 4,
}

impl WeightClass {
    pub fn for_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "img" | "svg" => WeightClass::Image,
            "canvas" | "object" | "embed" | "video" => WeightClass::Media,
            _ => WeightClass::Plain,
        }
    }

    pub fn factor(self) -> f64 {
        self as u8 as f64
    }
}

pub fn weight_of<T: ContentTree + ?Sized>(tree: &T, node: NodeId) -> WeightClass {
    let weight = tree
        .tag_name(node)
        .map(|tag| WeightClass::for_tag(&tag))
        .unwrap_or(WeightClass::Plain);
    if weight == WeightClass::Plain && has_background_image(tree, node) {
        return WeightClass::Image;
    }
    weight
}

pub fn has_background_image<T: ContentTree + ?Sized>(tree: &T, node: NodeId) -> bool {
    match tree.resolve_style(node, "background-image") {
        Some(value) => {
            let value = value.trim();
            !value.is_empty()
                && !EMPTY_BACKGROUND_VALUES
                    .iter()
                    .any(|empty| value.eq_ignore_ascii_case(empty))
        }
        None => false,
    }
}

/// Only the top-left corner is checked: a box hanging off the bottom or right
/// edge still counts as visible.
pub fn is_in_viewport(rect: &DOMRect, viewport: &Viewport) -> bool {
    !(viewport.height < rect.top || viewport.width < rect.left)
}

pub fn overlap_ratio(rect: &DOMRect, viewport: &Viewport) -> f64 {
    let area = rect.area();
    if area.is_nan() || area <= 0.0 {
        return 0.0;
    }
    let win = viewport.rect();
    let overlap_x = rect.right.min(win.right) - rect.left.max(win.left);
    let overlap_y = rect.bottom.min(win.bottom) - rect.top.max(win.top);
    if overlap_x <= 0.0 || overlap_y <= 0.0 {
        return 0.0;
    }
    (overlap_x * overlap_y / area).clamp(0.0, 1.0)
}
