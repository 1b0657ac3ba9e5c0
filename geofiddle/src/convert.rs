//! Pipeline de conversion : détection → parsing → reprojection → formatage

use tracing::{debug, warn};

use crate::metrics::Envelope;
use crate::parser::{FormatName, FormatOptions, FormatRegistry};
use crate::reproject::{detect_projection_from_coordinates, Reprojector, SupportedProjection};
use crate::types::{Feature, ParseError};
use crate::GeoError;

/// Paramètres d'une conversion ; `None` en entrée signifie auto-détection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    pub input_format: Option<FormatName>,
    pub input_projection: Option<SupportedProjection>,
    pub output_format: FormatName,
    pub output_projection: SupportedProjection,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            input_format: None,
            input_projection: None,
            output_format: FormatName::GeoJson,
            output_projection: SupportedProjection::Wgs84,
        }
    }
}

/// D'où vient la projection source retenue
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionSource {
    /// Fournie par l'appelant
    Explicit,
    /// Annoncée par le codec (SRID EWKT, formats toujours WGS84)
    Format,
    /// Déduite de l'amplitude des coordonnées
    Heuristic,
}

/// Résultat d'une conversion réussie (éventuellement partielle)
#[derive(Debug, Clone)]
pub struct Conversion {
    pub input_format: FormatName,
    pub source_projection: SupportedProjection,
    pub projection_source: ProjectionSource,
    pub output_format: FormatName,
    pub output_projection: SupportedProjection,
    /// Features dans la projection de sortie
    pub features: Vec<Feature>,
    /// Texte formaté
    pub output: String,
    /// Erreurs de parsing non fatales
    pub errors: Vec<ParseError>,
    pub envelope: Option<Envelope>,
}

impl Conversion {
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Convertit un texte d'un format/projection vers un autre
///
/// # Errors
///
/// - `GeoError::UndetectedFormat` si aucun codec ne reconnaît l'entrée
/// - `GeoError::NoFeatures` si le parsing ne produit aucune feature
/// - erreurs de reprojection ou de formatage
pub fn convert(
    registry: &FormatRegistry,
    text: &str,
    options: &ConvertOptions,
) -> Result<Conversion, GeoError> {
    let input_format = match options.input_format {
        Some(format) => format,
        None => registry
            .detect_format(text)
            .ok_or(GeoError::UndetectedFormat)?,
    };
    debug!(format = %input_format, "parsing input");

    let codec = registry
        .get(input_format)
        .ok_or_else(|| GeoError::UnknownFormat(input_format.to_string()))?;
    let parsed = codec.parse(text);

    if parsed.features.is_empty() {
        let reason = match parsed.errors.first() {
            Some(error) => error.to_string(),
            None => "empty input".to_string(),
        };
        return Err(GeoError::NoFeatures(reason));
    }
    for error in &parsed.errors {
        warn!(format = %input_format, "{}", error);
    }

    let (source_projection, projection_source) =
        match (options.input_projection, parsed.detected_projection) {
            (Some(projection), _) => (projection, ProjectionSource::Explicit),
            (None, Some(projection)) => (projection, ProjectionSource::Format),
            (None, None) => (
                detect_projection_from_coordinates(&parsed.positions()),
                ProjectionSource::Heuristic,
            ),
        };
    debug!(
        projection = %source_projection,
        source = ?projection_source,
        features = parsed.features.len(),
        "source projection resolved"
    );

    let envelope = Envelope::compute(
        &parsed.features,
        source_projection,
        options.output_projection,
    )?;

    let features = Reprojector::new(source_projection, options.output_projection)
        .transform_features(&parsed.features)?;

    let output = registry
        .get(options.output_format)
        .ok_or_else(|| GeoError::UnknownFormat(options.output_format.to_string()))?
        .format(
            &features,
            &FormatOptions::for_projection(options.output_projection),
        )?;

    Ok(Conversion {
        input_format,
        source_projection,
        projection_source,
        output_format: options.output_format,
        output_projection: options.output_projection,
        features,
        output,
        errors: parsed.errors,
        envelope,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Geometry, Position};

    #[test]
    fn test_csv_to_geojson() {
        let registry = FormatRegistry::new();
        let conversion = convert(&registry, "-0.1276,51.5074", &ConvertOptions::default()).unwrap();

        assert_eq!(conversion.input_format, FormatName::Csv);
        assert_eq!(conversion.source_projection, SupportedProjection::Wgs84);
        assert_eq!(conversion.projection_source, ProjectionSource::Heuristic);
        assert!(conversion.output.contains("FeatureCollection"));
        assert!(!conversion.is_partial());
    }

    #[test]
    fn test_bng_csv_to_wgs84_wkt() {
        let registry = FormatRegistry::new();
        let options = ConvertOptions {
            output_format: FormatName::Wkt,
            ..Default::default()
        };
        let conversion = convert(&registry, "530000,180000", &options).unwrap();

        assert_eq!(conversion.source_projection, SupportedProjection::Bng);
        let Some(Geometry::Point(p)) = &conversion.features[0].geometry else {
            panic!("expected point");
        };
        assert!((p.x - (-0.128)).abs() < 0.01, "lon={}", p.x);
        assert!(conversion.output.starts_with("POINT ("));
    }

    #[test]
    fn test_ewkt_srid_wins_over_heuristic() {
        let registry = FormatRegistry::new();
        let options = ConvertOptions {
            output_format: FormatName::Ewkt,
            output_projection: SupportedProjection::WebMercator,
            ..Default::default()
        };
        let conversion =
            convert(&registry, "SRID=27700;POINT(500000 200000)", &options).unwrap();

        assert_eq!(conversion.projection_source, ProjectionSource::Format);
        assert_eq!(conversion.source_projection, SupportedProjection::Bng);
        assert!(conversion.output.starts_with("SRID=3857;POINT ("));
    }

    #[test]
    fn test_explicit_projection() {
        let registry = FormatRegistry::new();
        let options = ConvertOptions {
            input_format: Some(FormatName::Csv),
            input_projection: Some(SupportedProjection::WebMercator),
            ..Default::default()
        };
        let conversion = convert(&registry, "100,50", &options).unwrap();
        assert_eq!(conversion.projection_source, ProjectionSource::Explicit);
        let Some(Geometry::Point(p)) = &conversion.features[0].geometry else {
            panic!("expected point");
        };
        assert!(p.x.abs() < 0.01 && p.y.abs() < 0.01, "{:?}", p);
    }

    #[test]
    fn test_partial_errors_are_carried() {
        let registry = FormatRegistry::new();
        let options = ConvertOptions {
            input_format: Some(FormatName::Csv),
            ..Default::default()
        };
        let conversion = convert(&registry, "1,2\n1,2,3", &options).unwrap();
        assert_eq!(conversion.features.len(), 1);
        assert!(conversion.is_partial());
        assert_eq!(conversion.errors[0].line, Some(2));
        assert_eq!(
            conversion.envelope.map(|e| e.sw),
            Some(Position::new(1.0, 2.0))
        );
    }

    #[test]
    fn test_failures() {
        let registry = FormatRegistry::new();
        assert!(matches!(
            convert(&registry, "   ", &ConvertOptions::default()),
            Err(GeoError::UndetectedFormat)
        ));

        let options = ConvertOptions {
            input_format: Some(FormatName::Csv),
            ..Default::default()
        };
        assert!(matches!(
            convert(&registry, "1,2,3", &options),
            Err(GeoError::NoFeatures(_))
        ));
    }

    #[test]
    fn test_polyline_output_out_of_range_is_an_error() {
        let registry = FormatRegistry::new();
        let options = ConvertOptions {
            output_format: FormatName::Polyline5,
            ..Default::default()
        };
        assert!(matches!(
            convert(&registry, "1e15,0,-1e15,0", &options),
            Err(GeoError::PolylineRange { .. })
        ));
    }
}
