use fmp_timing::core::dom::create_html_document;
use fmp_timing::core::geometry::*;
use proptest::prelude::*;

#[test]
fn test_weight_classes() {
    assert_eq!(WeightClass::for_tag("IMG"), WeightClass::Image);
    assert_eq!(WeightClass::for_tag("video").factor(), 4.0);
    assert_eq!(WeightClass::for_tag("section").factor(), 1.0);
}

#[test]
fn test_background_image_promotes_plain_elements_only() {
    let doc = create_html_document(None).unwrap();
    let div = doc.create_element("div").unwrap();
    let canvas = doc.create_element("canvas").unwrap();
    assert_eq!(weight_of(&doc, div), WeightClass::Plain);

    doc.set_computed_style(div, "background-image", "url(\"a.png\")").unwrap();
    doc.set_computed_style(canvas, "background-image", "url(\"a.png\")").unwrap();
    assert_eq!(weight_of(&doc, div), WeightClass::Image);
    assert_eq!(weight_of(&doc, canvas), WeightClass::Media);

    doc.set_computed_style(div, "background-image", "none").unwrap();
    assert_eq!(weight_of(&doc, div), WeightClass::Plain);
}

#[test]
fn test_legacy_style_used_without_computed_styles() {
    let doc = create_html_document(None).unwrap();
    doc.set_computed_style_available(false);
    let div = doc.create_element("div").unwrap();
    doc.set_attribute(div, "style", "color: red; background-image: url('hero.png')")
        .unwrap();
    assert!(has_background_image(&doc, div));
}

#[test]
fn test_viewport_check_is_top_left_only() {
    let viewport = Viewport::new(1000.0, 800.0);
    assert!(is_in_viewport(&DOMRect::new(900.0, 700.0, 500.0, 500.0), &viewport));
    assert!(is_in_viewport(&DOMRect::new(-50.0, -50.0, 10.0, 10.0), &viewport));
    assert!(!is_in_viewport(&DOMRect::new(0.0, 801.0, 10.0, 10.0), &viewport));
    assert!(!is_in_viewport(&DOMRect::new(1001.0, 0.0, 10.0, 10.0), &viewport));
}

#[test]
fn test_overlap_ratio_partial() {
    let viewport = Viewport::new(1000.0, 1000.0);
    let ratio = overlap_ratio(&DOMRect::new(500.0, 0.0, 1000.0, 100.0), &viewport);
    assert!((ratio - 0.5).abs() < 1e-9);
    assert_eq!(overlap_ratio(&DOMRect::new(0.0, 0.0, 0.0, 100.0), &viewport), 0.0);
}

proptest! {
    #[test]
    fn overlap_ratio_stays_in_unit_range(
        x in -3000.0f64..3000.0,
        y in -3000.0f64..3000.0,
        w in 0.0f64..4000.0,
        h in 0.0f64..4000.0,
    ) {
        let ratio = overlap_ratio(&DOMRect::new(x, y, w, h), &Viewport::new(1280.0, 720.0));
        prop_assert!((0.0..=1.0).contains(&ratio));
    }

    #[test]
    fn boxes_inside_the_viewport_fully_overlap(
        x in 0.0f64..600.0,
        y in 0.0f64..300.0,
        w in 1.0f64..600.0,
        h in 1.0f64..400.0,
    ) {
        let ratio = overlap_ratio(&DOMRect::new(x, y, w, h), &Viewport::new(1280.0, 720.0));
        prop_assert!((ratio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn boxes_below_the_fold_do_not_overlap(
        x in 0.0f64..1280.0,
        y in 720.0f64..5000.0,
        w in 1.0f64..600.0,
        h in 1.0f64..600.0,
    ) {
        let rect = DOMRect::new(x, y, w, h);
        prop_assert_eq!(overlap_ratio(&rect, &Viewport::new(1280.0, 720.0)), 0.0);
    }
}
