use serde::Serialize;

use crate::core::dom::NodeId;
use crate::core::geometry::{is_in_viewport, overlap_ratio, weight_of, Viewport, WeightClass};
use crate::core::host::ContentTree;
use crate::core::mutation::MutationTracker;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WinningElement {
    pub node: NodeId,
    pub score: f64,
    pub weight: WeightClass,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    pub node: NodeId,
    pub score: f64,
    pub winning_elements: Vec<WinningElement>,
    pub children: Vec<ScoreResult>,
}

impl ScoreResult {
    /// Highest scoring child; the first one wins a tie.
    pub fn best_candidate(&self) -> Option<&ScoreResult> {
        let mut best: Option<&ScoreResult> = None;
        for candidate in &self.children {
            match best {
                Some(current) if current.score >= candidate.score => {}
                _ => best = Some(candidate),
            }
        }
        best
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TreeScorer {
    viewport: Viewport,
}

impl TreeScorer {
    pub fn new(viewport: Viewport) -> Self {
        Self { viewport }
    }

    pub fn score_tree<T: ContentTree + ?Sized>(
        &self,
        tree: &T,
        tracker: &MutationTracker,
    ) -> Option<ScoreResult> {
        tree.root().map(|root| self.score_node(tree, tracker, root))
    }

    pub fn score_node<T: ContentTree + ?Sized>(
        &self,
        tree: &T,
        tracker: &MutationTracker,
        node: NodeId,
    ) -> ScoreResult {
        let children: Vec<ScoreResult> = tree
            .children(node)
            .into_iter()
            .filter(|child| tracker.is_stamped(*child))
            .map(|child| self.score_node(tree, tracker, child))
            .filter(|result| result.score > 0.0)
            .collect();

        self.combine(tree, node, children)
    }

    fn combine<T: ContentTree + ?Sized>(
        &self,
        tree: &T,
        node: NodeId,
        children: Vec<ScoreResult>,
    ) -> ScoreResult {
        let weight = weight_of(tree, node);
        let (own_score, ratio) = match tree.bounding_box(node) {
            Some(rect) => {
                let own = if is_in_viewport(&rect, &self.viewport) {
                    (rect.area() * weight.factor()).max(0.0)
                } else {
                    0.0
                };
                (own, overlap_ratio(&rect, &self.viewport))
            }
            None => (0.0, 0.0),
        };
        let child_sum: f64 = children.iter().map(|child| child.score).sum();

        if child_sum > own_score * ratio || ratio == 0.0 {
            let winning_elements = children
                .iter()
                .flat_map(|child| child.winning_elements.iter().copied())
                .collect();
            ScoreResult {
                node,
                score: child_sum,
                winning_elements,
                children,
            }
        } else {
            ScoreResult {
                node,
                score: own_score,
                winning_elements: vec![WinningElement {
                    node,
                    score: own_score,
                    weight,
                }],
                children,
            }
        }
    }
}

/// A single element is kept as is. When every element has the same score none
/// is above the mean and the result is empty.
pub fn filter_result(elements: Vec<WinningElement>) -> Vec<WinningElement> {
    if elements.len() <= 1 {
        return elements;
    }
    let mean = elements.iter().map(|e| e.score).sum::<f64>() / elements.len() as f64;
    elements.into_iter().filter(|e| e.score > mean).collect()
}
