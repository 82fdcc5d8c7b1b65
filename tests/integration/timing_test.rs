use fmp_timing::core::dom::{create_html_document, Document, DocumentReadyState};
use fmp_timing::core::fixture::{FixtureStep, NodeSpec, PageFixture, BODY_ID};
use fmp_timing::core::geometry::DOMRect;
use fmp_timing::core::{FinalizeReason, MonotonicClock, PerformanceTimeline, ResourceTiming};
use fmp_timing::{observe, FmpConfig, FmpReport};

fn config(width: u32, height: u32) -> FmpConfig {
    FmpConfig {
        viewport_width: width,
        viewport_height: height,
        ..FmpConfig::default()
    }
}

async fn replay(fixture: &PageFixture, config: FmpConfig) -> (Option<FmpReport>, Document) {
    let (document, mut ids) = fixture.build_document().unwrap();
    let timeline = PerformanceTimeline::new();
    let clock = MonotonicClock::new();

    let (report, replayed) = tokio::join!(
        observe(&document, &timeline, config, clock),
        fixture.replay(&document, &mut ids, &timeline),
    );
    replayed.unwrap();
    (report.unwrap(), document)
}

fn step(at_ms: u64, nodes: Vec<NodeSpec>) -> FixtureStep {
    FixtureStep {
        at_ms,
        parent: BODY_ID.to_string(),
        nodes,
    }
}

#[tokio::test(start_paused = true)]
async fn test_article_resolves_to_hero_image_load() {
    let (report, document) = replay(&PageFixture::demo(), config(1280, 720)).await;
    let report = report.expect("article has a meaningful subtree");

    assert_eq!(report.fmp_time, Some(610.0));
    assert_eq!(report.reason, FinalizeReason::Quiescent);
    assert_eq!(report.snapshot_count, 3);
    assert_eq!(report.candidate_count, 2);
    assert_eq!(report.elements.len(), 1);
    assert_eq!(report.elements[0].tag, "img");
    // load at 700, checks every 500 until 1000 ms have passed since the step at 340
    assert!(report.finalized_at_ms >= 1700.0 && report.finalized_at_ms < 1750.0);
    assert_eq!(document.observer_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_continuous_mutations_hit_the_hard_timeout() {
    let steps = (1..=10)
        .map(|i| step(i * 400, vec![NodeSpec::new("div", [0.0, i as f64 * 20.0, 300.0, 20.0])]))
        .collect();
    let fixture = PageFixture {
        url: None,
        viewport: None,
        initial: Vec::new(),
        steps,
        resources: Vec::new(),
        load_at_ms: 100,
    };

    let (report, _) = replay(&fixture, config(1000, 1000)).await;
    let report = report.unwrap();
    assert_eq!(report.reason, FinalizeReason::HardTimeout);
    assert!(report.finalized_at_ms > 3000.0 && report.finalized_at_ms < 3200.0);
    // steps at 400..=2800 landed before the cap
    assert_eq!(report.snapshot_count, 8);
}

#[tokio::test(start_paused = true)]
async fn test_already_loaded_page_needs_a_quiet_period() {
    let document = create_html_document(None).unwrap();
    let body = document.body().unwrap();
    let div = document.create_element("div").unwrap();
    document.set_layout(div, DOMRect::new(0.0, 0.0, 400.0, 300.0)).unwrap();
    document.append_child(body, div).unwrap();
    document.set_ready_state(DocumentReadyState::Complete);

    let report = observe(&document, &PerformanceTimeline::new(), config(1000, 1000), MonotonicClock::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.winner, div);
    assert_eq!(report.fmp_time, Some(0.0));
    assert!(report.finalized_at_ms >= 1500.0 && report.finalized_at_ms < 1550.0);
}

#[tokio::test(start_paused = true)]
async fn test_empty_page_reports_nothing() {
    let document = create_html_document(None).unwrap();
    document.set_ready_state(DocumentReadyState::Complete);

    let report = observe(&document, &PerformanceTimeline::new(), config(1000, 1000), MonotonicClock::new())
        .await
        .unwrap();
    assert_eq!(report, None);
    assert_eq!(document.observer_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_equal_winners_leave_the_time_unresolved() {
    let section = NodeSpec::new("section", [0.0, 0.0, 100.0, 100.0])
        .with_child(NodeSpec::new("p", [0.0, 0.0, 200.0, 200.0]))
        .with_child(NodeSpec::new("p", [0.0, 200.0, 200.0, 200.0]));
    let fixture = PageFixture {
        url: None,
        viewport: None,
        initial: Vec::new(),
        steps: vec![step(50, vec![section])],
        resources: Vec::new(),
        load_at_ms: 60,
    };

    let (report, _) = replay(&fixture, config(1000, 1000)).await;
    let report = report.unwrap();
    assert_eq!(report.winner_score, 80_000.0);
    assert!(report.elements.is_empty());
    assert_eq!(report.fmp_time, None);
}

#[tokio::test(start_paused = true)]
async fn test_background_image_uses_resource_timing() {
    let hero = NodeSpec::new("div", [0.0, 0.0, 1000.0, 600.0])
        .with_style("background-image", "url(\"//cdn.shop.example/hero.png\")");
    let fixture = PageFixture {
        url: Some("https://shop.example/".to_string()),
        viewport: None,
        initial: Vec::new(),
        steps: vec![step(200, vec![hero])],
        resources: vec![ResourceTiming::new("https://cdn.shop.example/hero.png", 950.0)],
        load_at_ms: 400,
    };

    let (report, _) = replay(&fixture, config(1000, 1000)).await;
    assert_eq!(report.unwrap().fmp_time, Some(950.0));
}
