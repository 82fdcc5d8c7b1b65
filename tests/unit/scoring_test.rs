use fmp_timing::core::dom::{create_html_document, Document, NodeId};
use fmp_timing::core::geometry::{DOMRect, Viewport, WeightClass};
use fmp_timing::core::{filter_result, MutationTracker, TreeScorer, WinningElement};
use pretty_assertions::assert_eq;

fn add(doc: &Document, parent: NodeId, tag: &str, rect: DOMRect) -> NodeId {
    let id = doc.create_element(tag).unwrap();
    doc.set_layout(id, rect).unwrap();
    doc.append_child(parent, id).unwrap();
    id
}

fn winners(doc: &Document, viewport: Viewport) -> (NodeId, Vec<WinningElement>) {
    let tracker = MutationTracker::new(doc, viewport, ["script", "style"], 0.0);
    let root = TreeScorer::new(viewport).score_tree(doc, &tracker).unwrap();
    let best = root.best_candidate().unwrap();
    (best.node, best.winning_elements.clone())
}

#[test]
fn test_background_hero_wins_over_navigation() {
    let doc = create_html_document(None).unwrap();
    let body = doc.body().unwrap();
    add(&doc, body, "nav", DOMRect::new(0.0, 0.0, 1280.0, 60.0));
    let hero = add(&doc, body, "div", DOMRect::new(0.0, 60.0, 1280.0, 500.0));
    doc.set_computed_style(hero, "background-image", "url(\"/hero.webp\")").unwrap();
    add(&doc, hero, "h2", DOMRect::new(100.0, 200.0, 900.0, 80.0));
    add(&doc, body, "footer", DOMRect::new(0.0, 2000.0, 1280.0, 300.0));

    let (node, elements) = winners(&doc, Viewport::new(1280.0, 720.0));
    assert_eq!(node, hero);
    assert_eq!(
        elements,
        vec![WinningElement {
            node: hero,
            score: 1_280_000.0,
            weight: WeightClass::Image,
        }]
    );
}

#[test]
fn test_video_outweighs_its_section() {
    let doc = create_html_document(None).unwrap();
    let body = doc.body().unwrap();
    let section = add(&doc, body, "section", DOMRect::new(0.0, 0.0, 1000.0, 400.0));
    let video = add(&doc, section, "video", DOMRect::new(0.0, 0.0, 640.0, 360.0));

    let (node, elements) = winners(&doc, Viewport::new(1280.0, 720.0));
    assert_eq!(node, section);
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0].node, video);
    assert_eq!(elements[0].score, 640.0 * 360.0 * 4.0);
}

#[test]
fn test_gallery_filter_keeps_dominant_images() {
    let doc = create_html_document(None).unwrap();
    let body = doc.body().unwrap();
    let gallery = add(&doc, body, "div", DOMRect::new(0.0, 0.0, 0.0, 0.0));
    let thumb_a = add(&doc, gallery, "p", DOMRect::new(0.0, 0.0, 100.0, 100.0));
    let thumb_b = add(&doc, gallery, "p", DOMRect::new(100.0, 0.0, 100.0, 100.0));
    let feature = add(&doc, gallery, "img", DOMRect::new(0.0, 100.0, 400.0, 300.0));

    // the wrapper stays unstamped while its content is stamped; scoring the
    // wrapper directly still sees that content
    let tracker = MutationTracker::new(&doc, Viewport::new(1280.0, 720.0), ["script"], 0.0);
    assert!(!tracker.is_stamped(gallery));
    assert!(tracker.is_stamped(feature));
    let scorer = TreeScorer::new(Viewport::new(1280.0, 720.0));
    let result = scorer.score_node(&doc, &tracker, gallery);
    let nodes: Vec<NodeId> = result.winning_elements.iter().map(|e| e.node).collect();
    assert_eq!(nodes, vec![thumb_a, thumb_b, feature]);

    let kept: Vec<NodeId> = filter_result(result.winning_elements)
        .iter()
        .map(|e| e.node)
        .collect();
    assert_eq!(kept, vec![feature]);
}

#[test]
fn test_nothing_visible_yields_no_candidate() {
    let doc = create_html_document(None).unwrap();
    let body = doc.body().unwrap();
    add(&doc, body, "div", DOMRect::new(0.0, 5000.0, 500.0, 500.0));

    let viewport = Viewport::new(1280.0, 720.0);
    let tracker = MutationTracker::new(&doc, viewport, ["script"], 0.0);
    let root = TreeScorer::new(viewport).score_tree(&doc, &tracker).unwrap();
    assert!(root.children.is_empty());
    assert!(root.best_candidate().is_none());
}

#[test]
fn test_unstamped_wrapper_hides_its_subtree_from_scoring() {
    let doc = create_html_document(None).unwrap();
    let body = doc.body().unwrap();
    let wrapper = add(&doc, body, "div", DOMRect::new(0.0, 0.0, 0.0, 0.0));
    let img = add(&doc, wrapper, "img", DOMRect::new(0.0, 0.0, 600.0, 400.0));

    let viewport = Viewport::new(1280.0, 720.0);
    let tracker = MutationTracker::new(&doc, viewport, ["script"], 0.0);
    assert!(tracker.is_stamped(img));

    let root = TreeScorer::new(viewport).score_tree(&doc, &tracker).unwrap();
    assert!(root.children.is_empty());
    assert_eq!(root.score, 0.0);
    assert!(root.best_candidate().is_none());
}
