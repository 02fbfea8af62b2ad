// Integration tests for temporal compilation:
//   idempotence (axis-aligned and slanted), residual overlap, equal-precedence survival, oldest-wins mode,
//   and drop reporting.

use std::f64::consts::TAU;

use geo::{coord, Area, Geometry, LineString, Polygon, Rect};

use landshift::geom::overlapping_pairs;
use landshift::{compile, CompilationConfig, Crs, DropReason, Layer, RawFeature, RawLayer};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
    Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon()
}

fn parcel(key: &str, polygon: Polygon<f64>, updated: &str) -> RawFeature {
    RawFeature::new(key, Some(Geometry::Polygon(polygon))).with("last_update_date", updated)
}

fn staircase() -> RawLayer {
    RawLayer::new(Crs::from_epsg(2039).unwrap(), vec![
        parcel("a", rect(0.0, 0.0, 4.0, 4.0), "2019-01-01"),
        parcel("b", rect(2.0, 2.0, 6.0, 6.0), "2021-06-30"),
        parcel("c", rect(4.0, 4.0, 8.0, 8.0), "2023-03-15"),
        parcel("d", rect(1.0, 5.0, 3.0, 7.0), "2020-01-01"),
    ])
}

/// Star-shaped blobs with 9 to 13 vertices on a 6x6 grid; neighbours overlap
/// along slanted edges. Precedence cycles through eleven numeric levels.
fn blobs() -> RawLayer {
    let features = (0..36)
        .map(|k| {
            let (cx, cy) = ((k % 6) as f64 * 6.0, (k / 6) as f64 * 6.0);
            let phase = k as f64;
            let n = 9 + k % 5;
            let ring = (0..n)
                .map(|v| {
                    let theta = TAU * v as f64 / n as f64 + 0.1 * phase;
                    let r = 4.0 + 1.2 * (3.0 * theta + phase).sin() + 0.5 * (5.0 * theta + 2.0 * phase).cos();
                    (cx + r * theta.cos(), cy + r * theta.sin())
                })
                .collect::<Vec<_>>();
            RawFeature::new(format!("blob{k}"), Some(Geometry::Polygon(Polygon::new(LineString::from(ring), vec![]))))
                .with("last_update_date", (k % 11) as f64)
        })
        .collect();
    RawLayer::new(Crs::from_epsg(2039).unwrap(), features)
}

fn key_areas(layer: &Layer) -> Vec<(String, u32, f64)> {
    let mut areas = layer.iter()
        .map(|f| (f.key.clone(), f.part, f.geometry.unsigned_area()))
        .collect::<Vec<_>>();
    areas.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    areas
}

#[test]
fn compiled_layer_has_no_residual_overlap() {
    let compiled = compile(staircase(), &CompilationConfig::default()).unwrap();
    assert!(compiled.dropped.is_empty());
    assert!(overlapping_pairs(&compiled.layer.polygons(), 1e-9).is_empty());

    // Newest keeps its full footprint; older parcels lose the shared corners.
    let areas = key_areas(&compiled.layer);
    let area = |key: &str| areas.iter().filter(|(k, _, _)| k == key).map(|(_, _, a)| a).sum::<f64>();
    assert!((area("c") - 16.0).abs() < 1e-9);
    assert!((area("b") - 12.0).abs() < 1e-9);
    assert!((area("a") - 12.0).abs() < 1e-9);
    assert!((area("d") - 3.0).abs() < 1e-9);
}

#[test]
fn compilation_is_idempotent() {
    let config = CompilationConfig::default();
    let once = compile(staircase(), &config).unwrap();
    let twice = compile(RawLayer::from(once.layer.clone()), &config).unwrap();

    assert!(twice.dropped.is_empty());
    let (first, second) = (key_areas(&once.layer), key_areas(&twice.layer));
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!((&a.0, a.1), (&b.0, b.1));
        assert!((a.2 - b.2).abs() < 1e-9);
    }
}

#[test]
fn compilation_is_idempotent_for_slanted_edges() {
    let config = CompilationConfig::default();
    let once = compile(blobs(), &config).unwrap();
    let twice = compile(RawLayer::from(once.layer.clone()), &config).unwrap();

    assert!(twice.dropped.is_empty());
    let (first, second) = (key_areas(&once.layer), key_areas(&twice.layer));
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!((&a.0, a.1), (&b.0, b.1));
        assert!((a.2 - b.2).abs() < 1e-6, "{} part {} changed: {} -> {}", a.0, a.1, a.2, b.2);
    }

    let total = |areas: &[(String, u32, f64)]| areas.iter().map(|(_, _, a)| a).sum::<f64>();
    assert!((total(&first) - total(&second)).abs() < 1e-6);
}

#[test]
fn equal_precedence_features_both_survive_uncut() {
    let layer = RawLayer::new(Crs::from_epsg(2039).unwrap(), vec![
        parcel("x", rect(0.0, 0.0, 2.0, 2.0), "2022-01-01"),
        parcel("y", rect(1.0, 0.0, 3.0, 2.0), "2022-01-01"),
    ]);
    let compiled = compile(layer, &CompilationConfig::default()).unwrap();

    assert_eq!(compiled.layer.len(), 2);
    assert!(compiled.layer.iter().all(|f| (f.area() - 4.0).abs() < 1e-9));
    assert_eq!(overlapping_pairs(&compiled.layer.polygons(), 1e-9).len(), 1);
}

#[test]
fn oldest_first_reverses_the_winner() {
    let layer = RawLayer::new(Crs::from_epsg(2039).unwrap(), vec![
        parcel("old", rect(0.0, 0.0, 2.0, 2.0), "2010-01-01"),
        parcel("new", rect(1.0, 0.0, 3.0, 2.0), "2024-01-01"),
    ]);
    let compiled = compile(layer, &CompilationConfig::new("last_update_date", false)).unwrap();

    assert_eq!(compiled.layer.features[0].key, "old");
    assert!((compiled.layer.features[0].area() - 4.0).abs() < 1e-9);
    assert!((compiled.layer.features[1].area() - 2.0).abs() < 1e-9);
}

#[test]
fn missing_precedence_never_erodes() {
    let layer = RawLayer::new(Crs::from_epsg(2039).unwrap(), vec![
        RawFeature::new("undated", Some(Geometry::Polygon(rect(0.0, 0.0, 2.0, 2.0)))),
        parcel("dated", rect(1.0, 0.0, 3.0, 2.0), "2020-01-01"),
    ]);
    let compiled = compile(layer, &CompilationConfig::default()).unwrap();

    assert_eq!(compiled.layer.features.last().unwrap().key, "undated");
    assert!(compiled.layer.iter().all(|f| (f.area() - 4.0).abs() < 1e-9));
}

#[test]
fn bad_rows_are_reported_not_raised() {
    let layer = RawLayer::new(Crs::from_epsg(2039).unwrap(), vec![
        RawFeature::new("null", None),
        parcel("inner", rect(1.0, 1.0, 2.0, 2.0), "2001-01-01"),
        parcel("outer", rect(0.0, 0.0, 3.0, 3.0), "2002-01-01"),
    ]);
    let compiled = compile(layer, &CompilationConfig::default()).unwrap();

    let reasons = compiled.dropped.iter().map(|d| (d.key.as_str(), d.reason)).collect::<Vec<_>>();
    assert_eq!(reasons, vec![("null", DropReason::NullGeometry), ("inner", DropReason::Consumed)]);
    assert_eq!(compiled.layer.len(), 1);
}

#[test]
fn empty_precedence_field_is_rejected() {
    let config = CompilationConfig::new("  ", true);
    assert!(compile(staircase(), &config).is_err());
}
