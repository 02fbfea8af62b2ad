// Integration tests for layer preparation:
//   sanitization, snapshot diffs, composite keys and ownership derivation.

use geo::{coord, Geometry, GeometryCollection, LineString, MultiPolygon, Point, Polygon, Rect};

use landshift::compare::derive_ownership_percentage;
use landshift::io::parse_wkt;
use landshift::layer::{compose_key, diff_snapshots};
use landshift::{AttrValue, Crs, DropReason, Feature, FieldNames, Layer, OwnershipMatcher, RawFeature, RawLayer};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
    Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon()
}

#[test]
fn sanitize_leaves_one_simple_polygon_per_row() {
    let raw = RawLayer::new(Crs::from_epsg(2039).unwrap(), vec![
        RawFeature::new("multi", Some(Geometry::MultiPolygon(MultiPolygon::new(vec![
            rect(0.0, 0.0, 1.0, 1.0),
            rect(5.0, 5.0, 6.0, 6.0),
        ])))).with("type", 1.0),
        RawFeature::new("mixed", Some(Geometry::GeometryCollection(GeometryCollection::new_from(vec![
            Geometry::Point(Point::new(9.0, 9.0)),
            Geometry::Polygon(rect(10.0, 10.0, 12.0, 12.0)),
        ])))),
        RawFeature::new("line", Some(Geometry::LineString(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)])))),
        RawFeature::new("empty", Some(Geometry::MultiPolygon(MultiPolygon::new(vec![])))),
        RawFeature::new("null", None),
    ]);

    let sanitized = raw.sanitize();
    let rows = sanitized.layer.iter().map(|f| (f.key.as_str(), f.part)).collect::<Vec<_>>();
    assert_eq!(rows, vec![("multi", 0), ("multi", 1), ("mixed", 0)]);
    assert!(sanitized.layer.iter().filter(|f| f.key == "multi").all(|f| f.attr("type") == Some(&AttrValue::Number(1.0))));

    let reasons = sanitized.dropped.iter().map(|d| d.reason).collect::<Vec<_>>();
    assert_eq!(reasons, vec![DropReason::NonPolygonal, DropReason::EmptyGeometry, DropReason::NullGeometry]);
}

#[test]
fn sanitize_repairs_bowtie() {
    let bowtie = parse_wkt("POLYGON ((0 0, 2 2, 2 0, 0 2, 0 0))").unwrap();
    let raw = RawLayer::new(Crs::from_epsg(2039).unwrap(), vec![RawFeature::new("bowtie", Some(bowtie))]);

    let sanitized = raw.sanitize();
    assert!(sanitized.dropped.is_empty());
    assert_eq!(sanitized.layer.len(), 2);
    let total = sanitized.layer.iter().map(Feature::area).sum::<f64>();
    assert!((total - 2.0).abs() < 1e-9);
}

#[test]
fn snapshot_diff_by_composite_key() {
    let feature = |block: f64, parcel: f64| RawFeature::new("", None).with("GUSH", block).with("HELKA", parcel);
    let mut current = vec![feature(1234.0, 56.0), feature(1234.0, 57.0), feature(99.0, 1.0)];
    let mut previous = vec![feature(1234.0, 56.0), feature(77.0, 3.0)];
    for f in current.iter_mut().chain(previous.iter_mut()) {
        assert!(f.rekey(&["GUSH", "HELKA"], "_"));
    }

    let diff = diff_snapshots(&current, &previous);
    let keys = |features: &[RawFeature]| features.iter().map(|f| f.key.clone()).collect::<Vec<_>>();
    assert_eq!(keys(&diff.added), vec!["1234_57", "99_1"]);
    assert_eq!(keys(&diff.deleted), vec!["77_3"]);

    assert_eq!(compose_key(&current[0].attributes, &["GUSH", "missing"], "_"), None);
}

#[test]
fn ownership_percentage_derivation() {
    let matcher = OwnershipMatcher::default();
    assert_eq!(derive_ownership_percentage(48.0, 100.0, Some("KKL"), &matcher), 48.0);
    assert_eq!(derive_ownership_percentage(96.2, 100.0, Some("קרן קיימת לישראל"), &matcher), 100.0);
    assert_eq!(derive_ownership_percentage(96.2, 100.0, Some("private"), &matcher), 96.2);
    assert_eq!(derive_ownership_percentage(5.0, 0.0, Some("KKL"), &matcher), 0.0);

    let fields = FieldNames::default();
    let mut layer = Layer::new(Crs::from_epsg(2039).unwrap(), vec![
        Feature::new("a", rect(0.0, 0.0, 10.0, 10.0)).with("owned_area", 25.0),
        Feature::new("b", rect(0.0, 0.0, 10.0, 10.0)),
    ]);
    assert_eq!(layer.assign_ownership_percentage("owned_area", &fields, &matcher), 1);
    assert_eq!(layer.features[0].ownership_percentage(&fields), 25.0);
    assert_eq!(layer.features[1].ownership_percentage(&fields), 100.0);
}
