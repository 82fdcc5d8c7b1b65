use std::collections::HashMap;

use fmp_timing::core::dom::{create_html_document, NodeId};
use fmp_timing::core::geometry::{DOMRect, Viewport};
use fmp_timing::core::MutationTracker;
use proptest::prelude::*;

const IGNORED: [&str; 5] = ["script", "style", "meta", "head", "link"];

#[test]
fn test_element_hidden_first_is_stamped_when_it_appears() {
    let doc = create_html_document(None).unwrap();
    let body = doc.body().unwrap();
    let banner = doc.create_element("div").unwrap();
    doc.set_layout(banner, DOMRect::new(0.0, 0.0, 0.0, 0.0)).unwrap();
    doc.append_child(body, banner).unwrap();

    let mut tracker = MutationTracker::new(&doc, Viewport::new(800.0, 600.0), IGNORED, 0.0);
    assert!(!tracker.is_stamped(banner));

    doc.set_layout(banner, DOMRect::new(0.0, 0.0, 800.0, 90.0)).unwrap();
    tracker.record_batch(&doc, 250.0);
    assert_eq!(tracker.stamp_of(banner), Some(1));
    assert_eq!(tracker.stamp_time(banner), Some(250.0));
}

#[test]
fn test_removed_elements_keep_their_stamp() {
    let doc = create_html_document(None).unwrap();
    let body = doc.body().unwrap();
    let toast = doc.create_element("div").unwrap();
    doc.set_layout(toast, DOMRect::new(10.0, 10.0, 200.0, 40.0)).unwrap();

    let mut tracker = MutationTracker::new(&doc, Viewport::new(800.0, 600.0), IGNORED, 0.0);
    doc.append_child(body, toast).unwrap();
    tracker.record_batch(&doc, 100.0);
    doc.remove_child(body, toast).unwrap();
    tracker.record_batch(&doc, 200.0);

    assert_eq!(tracker.stamp_of(toast), Some(1));
    assert_eq!(tracker.batch_count(), 2);
}

fn rect_strategy() -> impl Strategy<Value = (f64, f64, f64, f64)> {
    (0.0f64..1200.0, 0.0f64..1000.0, 0.0f64..300.0, 0.0f64..300.0)
}

proptest! {
    #[test]
    fn stamps_are_write_once_and_snapshots_ordered(
        batches in prop::collection::vec(prop::collection::vec(rect_strategy(), 0..4), 1..8),
    ) {
        let doc = create_html_document(None).unwrap();
        let body = doc.body().unwrap();
        let mut tracker = MutationTracker::new(&doc, Viewport::new(1000.0, 800.0), IGNORED, 0.0);
        let mut seen: HashMap<NodeId, usize> = HashMap::new();
        let mut nodes = Vec::new();

        for (i, batch) in batches.iter().enumerate() {
            for (x, y, w, h) in batch {
                let id = doc.create_element("div").unwrap();
                doc.set_layout(id, DOMRect::new(*x, *y, *w, *h)).unwrap();
                doc.append_child(body, id).unwrap();
                nodes.push(id);
            }
            let index = tracker.record_batch(&doc, (i as f64 + 1.0) * 16.0);
            prop_assert_eq!(index, i + 1);

            for node in &nodes {
                if let Some(stamp) = tracker.stamp_of(*node) {
                    let first = *seen.entry(*node).or_insert(stamp);
                    prop_assert_eq!(first, stamp);
                    prop_assert!(stamp <= index);
                }
            }
        }

        let times: Vec<f64> = tracker.snapshots().iter().map(|s| s.timestamp).collect();
        prop_assert!(times.windows(2).all(|pair| pair[0] <= pair[1]));
        prop_assert_eq!(times.len(), batches.len() + 1);
    }
}
