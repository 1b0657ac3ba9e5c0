//! Tests d'intégration sur les fichiers de `tests/fixtures`
//!
//! L'extension de chaque fixture est le nom du format attendu (`route.polyline5`).

use std::path::PathBuf;

use geofiddle::{
    convert, ConvertOptions, FormatName, FormatOptions, FormatRegistry, Geometry,
    SupportedProjection,
};

fn fixtures() -> Vec<(PathBuf, FormatName, String)> {
    let pattern = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/*.*");
    let mut found = Vec::new();
    for path in glob::glob(pattern).unwrap().filter_map(Result::ok) {
        let extension = path.extension().unwrap().to_string_lossy().to_string();
        let format: FormatName = extension.parse().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        found.push((path, format, text));
    }
    assert!(found.len() >= 8, "fixtures missing: {}", found.len());
    found
}

#[test]
fn test_fixtures_detect_and_parse() {
    let registry = FormatRegistry::new();

    for (path, format, text) in fixtures() {
        assert_eq!(
            registry.detect_format(&text),
            Some(format),
            "{}",
            path.display()
        );

        let result = registry.parse(&text, format.as_str());
        assert!(
            result.errors.is_empty(),
            "{}: {:?}",
            path.display(),
            result.errors
        );
        assert!(result.has_features(), "{}", path.display());
        assert_eq!(result.detected_format, Some(format));
    }
}

#[test]
fn test_detection_round_trip() {
    let registry = FormatRegistry::new();

    for (path, format, text) in fixtures() {
        let parsed = registry.parse(&text, format.as_str());
        let options = parsed
            .detected_projection
            .map(FormatOptions::for_projection)
            .unwrap_or_default();
        let written = registry
            .format(&parsed.features, format.as_str(), &options)
            .unwrap();

        assert_eq!(
            registry.detect_format(&written),
            Some(format),
            "{}: {}",
            path.display(),
            written
        );

        let again = registry.parse(&written, format.as_str());
        assert!(again.errors.is_empty(), "{}: {:?}", path.display(), again.errors);
        assert_eq!(
            again.positions().len(),
            parsed.positions().len(),
            "{}",
            path.display()
        );
    }
}

#[test]
fn test_cross_format_conversion() {
    let registry = FormatRegistry::new();
    let targets = [
        FormatName::GeoJson,
        FormatName::Ewkt,
        FormatName::Wkt,
        FormatName::Kml,
        FormatName::Gpx,
        FormatName::Polyline5,
        FormatName::Polyline6,
        FormatName::Csv,
    ];

    for (path, _, text) in fixtures() {
        for target in targets {
            let options = ConvertOptions {
                output_format: target,
                ..Default::default()
            };
            let conversion = convert(&registry, &text, &options)
                .unwrap_or_else(|e| panic!("{} → {}: {}", path.display(), target, e));

            assert_eq!(
                registry.detect_format(&conversion.output),
                Some(target),
                "{} → {}:\n{}",
                path.display(),
                target,
                conversion.output
            );
        }
    }
}

#[test]
fn test_grid_fixture_reprojection_round_trip() {
    let registry = FormatRegistry::new();
    let text = std::fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/grid.ewkt"
    ))
    .unwrap();

    let to_wgs84 = convert(&registry, &text, &ConvertOptions::default()).unwrap();
    assert_eq!(to_wgs84.source_projection, SupportedProjection::Bng);
    let Some(Geometry::Point(p)) = &to_wgs84.features[0].geometry else {
        panic!("expected point");
    };
    assert!((p.y - 51.5).abs() < 0.01, "lat={}", p.y);

    let back = convert(
        &registry,
        &to_wgs84.output,
        &ConvertOptions {
            output_format: FormatName::Ewkt,
            output_projection: SupportedProjection::Bng,
            ..Default::default()
        },
    )
    .unwrap();
    let Some(Geometry::Point(p)) = &back.features[0].geometry else {
        panic!("expected point");
    };
    assert!((p.x - 530000.0).abs() < 1.0, "e={}", p.x);
    assert!((p.y - 180000.0).abs() < 1.0, "n={}", p.y);
    assert!(back.output.starts_with("SRID=27700;"));

    // Emprise calculée en WGS84 : la convergence des méridiens l'élargit de quelques dizaines de mètres
    let envelope = back.envelope.unwrap();
    assert!((envelope.sw.x - 529000.0).abs() < 100.0, "sw={:?}", envelope.sw);
    assert!((envelope.ne.y - 181000.0).abs() < 100.0, "ne={:?}", envelope.ne);
}

#[test]
fn test_concatenated_geojson_partial_success() {
    let registry = FormatRegistry::new();
    let text = r#"{"type":"Point","coordinates":[1,2]}{"type":"Point","coordinates":"x"}"#;

    let result = registry.parse(text, "geojson");
    assert_eq!(result.features.len(), 1);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.starts_with("Object 2: "));
}
