//! Full compositor runs through the public API: background, keying,
//! placement, and PNG export together.

use metaposter::{
    AspectRatio, BackgroundMode, MetaphorResult, PosterCompositor, PosterSettings, Raster,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn quoteless_metaphor() -> MetaphorResult {
    MetaphorResult {
        step2_object: "Anchor".to_string(),
        ..MetaphorResult::default()
    }
}

/// A 100x100 subject: dark left half (keyable), near-white right half
/// (recolorable).
fn split_subject() -> Raster {
    let mut r = Raster::filled(100, 100, [10, 10, 10]);
    for y in 0..100 {
        for x in 50..100 {
            r.put_pixel(x, y, [230, 230, 230, 255]);
        }
    }
    r
}

#[test]
fn export_decodes_to_canvas_dimensions() {
    init_tracing();
    let mut compositor = PosterCompositor::with_seed(7);
    let mut s = PosterSettings::default();
    s.aspect = AspectRatio::Portrait45;

    let png = compositor
        .export_png(&quoteless_metaphor(), Some(&split_subject()), &s, &[])
        .unwrap();
    let decoded = Raster::decode(&png).unwrap();
    assert_eq!((decoded.width, decoded.height), (1080, 1350));
}

#[test]
fn custom_background_keys_dark_subject_pixels() {
    init_tracing();
    let mut compositor = PosterCompositor::with_seed(7);
    let mut s = PosterSettings::default();
    s.background = BackgroundMode::Custom;
    s.bg_color = [40, 90, 200];
    s.shape_color = [255, 0, 0];
    s.y_pct = 30.0;
    s.show_guides = false;

    let frame = compositor
        .render(&quoteless_metaphor(), Some(&split_subject()), &s, &[])
        .unwrap();

    // Subject occupies x [490,590), y [274,374). Left half keys out to the
    // background, right half recolors toward the shape target.
    let keyed = frame.pixel(500, 300);
    assert_eq!([keyed[0], keyed[1], keyed[2]], [40, 90, 200]);
    let shape = frame.pixel(580, 300);
    assert!(shape[0] > 150 && shape[1] == 0 && shape[2] == 0);
}

#[test]
fn original_background_leaves_subject_untouched() {
    init_tracing();
    let mut compositor = PosterCompositor::with_seed(7);
    let mut s = PosterSettings::default();
    s.y_pct = 30.0;
    s.show_guides = false;

    let frame = compositor
        .render(&quoteless_metaphor(), Some(&split_subject()), &s, &[])
        .unwrap();
    let dark = frame.pixel(500, 300);
    assert_eq!([dark[0], dark[1], dark[2]], [10, 10, 10]);
    let light = frame.pixel(580, 300);
    assert_eq!([light[0], light[1], light[2]], [230, 230, 230]);
}

#[test]
fn seeded_scratched_render_is_reproducible() {
    init_tracing();
    let mut s = PosterSettings::default();
    s.background = BackgroundMode::Scratched;
    s.show_guides = false;

    let a = PosterCompositor::with_seed(99)
        .render(&quoteless_metaphor(), None, &s, &[])
        .unwrap();
    let b = PosterCompositor::with_seed(99)
        .render(&quoteless_metaphor(), None, &s, &[])
        .unwrap();
    assert_eq!(a.data, b.data);
}

#[test]
fn export_always_suppresses_guides() {
    init_tracing();
    let mut s = PosterSettings::default();
    s.background = BackgroundMode::Custom;
    s.bg_color = [0, 0, 0];
    s.show_guides = true;

    let png = PosterCompositor::with_seed(1)
        .export_png(&quoteless_metaphor(), None, &s, &[])
        .unwrap();
    let decoded = Raster::decode(&png).unwrap();

    // The centered crosshair guide would paint green along x = 540.
    let p = decoded.pixel(540, 100);
    assert_eq!([p[0], p[1], p[2]], [0, 0, 0]);
}
