use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::trace;

use crate::core::dom::NodeId;
use crate::core::geometry::{is_in_viewport, Viewport};
use crate::core::host::ContentTree;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub timestamp: f64,
}

#[derive(Debug, Clone)]
pub struct MutationTracker {
    viewport: Viewport,
    ignored_tags: HashSet<String>,
    snapshots: Vec<SnapshotRecord>,
    stamps: HashMap<NodeId, usize>,
    batch_count: usize,
}

impl MutationTracker {
    pub fn new<T, I, S>(tree: &T, viewport: Viewport, ignored_tags: I, now: f64) -> Self
    where
        T: ContentTree + ?Sized,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tracker = Self {
            viewport,
            ignored_tags: ignored_tags
                .into_iter()
                .map(|tag| tag.as_ref().to_ascii_lowercase())
                .collect(),
            snapshots: Vec::new(),
            stamps: HashMap::new(),
            batch_count: 0,
        };
        tracker.first_snapshot(tree, now);
        tracker
    }

    fn first_snapshot<T: ContentTree + ?Sized>(&mut self, tree: &T, now: f64) {
        if let Some(root) = tree.root() {
            self.set_tag(tree, root, self.batch_count);
        }
        self.snapshots.push(SnapshotRecord { timestamp: now });
        trace!(stamped = self.stamps.len(), "initial snapshot taken");
    }

    pub fn record_batch<T: ContentTree + ?Sized>(&mut self, tree: &T, now: f64) -> usize {
        self.batch_count += 1;
        let before = self.stamps.len();
        if let Some(root) = tree.root() {
            self.set_tag(tree, root, self.batch_count);
        }
        self.snapshots.push(SnapshotRecord { timestamp: now });
        trace!(
            index = self.batch_count,
            newly_stamped = self.stamps.len() - before,
            timestamp = now,
            "mutation snapshot recorded"
        );
        self.batch_count
    }

    /// Children are walked last to first. A child that does not qualify stays
    /// unstamped but is still descended into.
    pub fn set_tag<T: ContentTree + ?Sized>(&mut self, tree: &T, target: NodeId, index: usize) {
        if self.is_ignored(tree, target) {
            return;
        }
        for child in tree.children(target).into_iter().rev() {
            if !self.stamps.contains_key(&child) && self.qualifies(tree, child) {
                self.stamps.insert(child, index);
            }
            self.set_tag(tree, child, index);
        }
    }

    fn qualifies<T: ContentTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        match tree.bounding_box(node) {
            Some(rect) => is_in_viewport(&rect, &self.viewport) && !rect.is_empty(),
            None => false,
        }
    }

    fn is_ignored<T: ContentTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        tree.tag_name(node)
            .map(|tag| self.ignored_tags.contains(&tag.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    pub fn stamp_of(&self, node: NodeId) -> Option<usize> {
        self.stamps.get(&node).copied()
    }

    pub fn is_stamped(&self, node: NodeId) -> bool {
        self.stamps.contains_key(&node)
    }

    pub fn stamped_count(&self) -> usize {
        self.stamps.len()
    }

    pub fn snapshot(&self, index: usize) -> Option<&SnapshotRecord> {
        self.snapshots.get(index)
    }

    pub fn snapshots(&self) -> &[SnapshotRecord] {
        &self.snapshots
    }

    pub fn stamp_time(&self, node: NodeId) -> Option<f64> {
        self.stamp_of(node)
            .and_then(|index| self.snapshot(index))
            .map(|snapshot| snapshot.timestamp)
    }

    pub fn last_snapshot_time(&self) -> Option<f64> {
        self.snapshots.last().map(|snapshot| snapshot.timestamp)
    }

    pub fn batch_count(&self) -> usize {
        self.batch_count
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }
}
