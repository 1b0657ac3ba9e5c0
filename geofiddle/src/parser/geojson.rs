//! Codec GeoJSON
//!
//! Accepte plusieurs objets JSON concaténés (`{...}{...}`). Le découpage suit la
//! profondeur des accolades en ignorant celles qui apparaissent dans les chaînes.

use geojson::feature::Id;
use geojson::GeoJson;
use memchr::memchr3_iter;
use serde_json::Value;

use super::{Codec, FormatName, FormatOptions};
use crate::types::{assign_ids, Feature, Geometry, ParseError, ParseResult, Position, RawFeature};
use crate::GeoError;

/// Types GeoJSON acceptés au niveau racine
pub const GEOJSON_TYPES: [&str; 9] = [
    "Point",
    "MultiPoint",
    "LineString",
    "MultiLineString",
    "Polygon",
    "MultiPolygon",
    "GeometryCollection",
    "Feature",
    "FeatureCollection",
];

pub struct GeoJsonCodec;

impl Codec for GeoJsonCodec {
    fn name(&self) -> FormatName {
        FormatName::GeoJson
    }

    fn parse(&self, text: &str) -> ParseResult {
        parse(text)
    }

    fn format(&self, features: &[Feature], _options: &FormatOptions) -> Result<String, GeoError> {
        format(features)
    }

    fn detect(&self, text: &str) -> bool {
        detect(text)
    }
}

/// Découpe un texte en objets JSON de premier niveau
pub fn split_objects(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut objects = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;

    for pos in memchr3_iter(b'{', b'}', b'"', bytes) {
        match bytes[pos] {
            b'"' => {
                if !in_string || !is_escaped(bytes, pos) {
                    in_string = !in_string;
                }
            }
            _ if in_string => {}
            b'{' => {
                if depth == 0 {
                    start = pos;
                }
                depth += 1;
            }
            _ => {
                if depth == 0 {
                    continue;
                }
                depth -= 1;
                if depth == 0 {
                    objects.push(&text[start..=pos]);
                }
            }
        }
    }

    objects
}

/// Vrai si le guillemet en `pos` est précédé d'un nombre impair de `\`
fn is_escaped(bytes: &[u8], pos: usize) -> bool {
    let backslashes = bytes[..pos]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count();
    backslashes % 2 == 1
}

/// Indications de schéma sur un objet JSON brut (type et membres obligatoires)
pub fn validate(value: &Value) -> Vec<String> {
    let Some(object) = value.as_object() else {
        return vec!["GeoJSON must be an object".to_string()];
    };

    let kind = match object.get("type") {
        None | Some(Value::Null) => return vec!["GeoJSON must have a \"type\" property".to_string()],
        Some(Value::String(kind)) => kind.as_str(),
        Some(_) => return vec!["\"type\" must be a string".to_string()],
    };

    if !GEOJSON_TYPES.contains(&kind) {
        return vec![format!("Invalid GeoJSON type: \"{kind}\"")];
    }

    let mut errors = Vec::new();
    match kind {
        "Feature" if !object.contains_key("geometry") => {
            errors.push("Feature must have \"geometry\" property".to_string());
        }
        "FeatureCollection" if !object.get("features").is_some_and(Value::is_array) => {
            errors.push("FeatureCollection must have \"features\" array".to_string());
        }
        "GeometryCollection" if !object.get("geometries").is_some_and(Value::is_array) => {
            errors.push("GeometryCollection must have \"geometries\" array".to_string());
        }
        "Feature" | "FeatureCollection" | "GeometryCollection" => {}
        _ if !object.contains_key("coordinates") => {
            errors.push(format!("{kind} must have \"coordinates\" property"));
        }
        _ => {}
    }
    errors
}

/// Parse GeoJSON avec succès partiel : un objet valide suffit à rendre des features
pub fn parse(text: &str) -> ParseResult {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ParseResult::empty(FormatName::GeoJson);
    }

    let objects = split_objects(trimmed);
    if objects.is_empty() {
        return ParseResult::failure(Some(FormatName::GeoJson), "No valid JSON objects found");
    }

    let mut raw = Vec::new();
    let mut errors = Vec::new();
    let multiple = objects.len() > 1;

    for (index, object) in objects.iter().enumerate() {
        let prefix = if multiple {
            format!("Object {}: ", index + 1)
        } else {
            String::new()
        };

        let mut object_errors = Vec::new();
        parse_object(object, &mut raw, &mut object_errors);
        errors.extend(object_errors.into_iter().map(|e| e.prefixed(&prefix)));
    }

    if raw.is_empty() && errors.is_empty() {
        errors.push(ParseError::new("No features found in GeoJSON"));
    }

    ParseResult {
        features: assign_ids(raw),
        errors,
        detected_format: Some(FormatName::GeoJson),
        detected_projection: None,
    }
}

fn parse_object(text: &str, raw: &mut Vec<RawFeature>, errors: &mut Vec<ParseError>) {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            errors.push(ParseError::new(format!("Invalid JSON: {e}")));
            return;
        }
    };

    let hints = validate(&value);
    if !hints.is_empty() {
        errors.extend(hints.into_iter().map(ParseError::new));
        return;
    }

    let geojson = match GeoJson::from_json_value(value) {
        Ok(geojson) => geojson,
        Err(e) => {
            errors.push(ParseError::new(e.to_string()));
            return;
        }
    };

    match geojson {
        GeoJson::FeatureCollection(collection) => {
            for (index, feature) in collection.features.into_iter().enumerate() {
                match convert_feature(feature) {
                    Ok(item) => raw.push(item),
                    Err(reason) => {
                        errors.push(ParseError::new(format!("Feature {}: {reason}", index + 1)))
                    }
                }
            }
        }
        GeoJson::Feature(feature) => match convert_feature(feature) {
            Ok(item) => raw.push(item),
            Err(reason) => errors.push(ParseError::new(reason)),
        },
        GeoJson::Geometry(geometry) => match convert_geometry(geometry.value) {
            Ok(geometry) => raw.push(RawFeature::from_geometry(geometry)),
            Err(reason) => errors.push(ParseError::new(reason)),
        },
    }
}

fn convert_feature(feature: geojson::Feature) -> Result<RawFeature, String> {
    let geometry = feature
        .geometry
        .map(|g| convert_geometry(g.value))
        .transpose()?;

    let id = feature.id.map(|id| match id {
        Id::String(s) => s,
        Id::Number(n) => n.to_string(),
    });

    Ok(RawFeature {
        id,
        geometry,
        properties: feature.properties.unwrap_or_default(),
    })
}

fn convert_geometry(value: geojson::Value) -> Result<Geometry, String> {
    use geojson::Value as V;

    let geometry = match value {
        V::Point(p) => Geometry::Point(position(&p)?),
        V::MultiPoint(ps) => Geometry::MultiPoint(positions(&ps)?),
        V::LineString(ps) => Geometry::LineString(positions(&ps)?),
        V::MultiLineString(rings) => Geometry::MultiLineString(nested(&rings)?),
        V::Polygon(rings) => Geometry::Polygon(nested(&rings)?),
        V::MultiPolygon(polygons) => Geometry::MultiPolygon(
            polygons
                .iter()
                .map(|rings| nested(rings))
                .collect::<Result<_, _>>()?,
        ),
        V::GeometryCollection(members) => Geometry::GeometryCollection(
            members
                .into_iter()
                .map(|g| convert_geometry(g.value))
                .collect::<Result<_, _>>()?,
        ),
    };
    Ok(geometry)
}

fn position(values: &[f64]) -> Result<Position, String> {
    Position::from_slice(values)
        .ok_or_else(|| format!("Position must have at least 2 values, got {}", values.len()))
}

fn positions(values: &[Vec<f64>]) -> Result<Vec<Position>, String> {
    values.iter().map(|p| position(p)).collect()
}

fn nested(rings: &[Vec<Vec<f64>>]) -> Result<Vec<Vec<Position>>, String> {
    rings.iter().map(|r| positions(r)).collect()
}

/// Conversion inverse vers la valeur géométrique du crate `geojson`
pub fn to_geojson_value(geometry: &Geometry) -> geojson::Value {
    use geojson::Value as V;

    fn list(ps: &[Position]) -> Vec<Vec<f64>> {
        ps.iter().map(Position::to_vec).collect()
    }
    fn rings(rs: &[Vec<Position>]) -> Vec<Vec<Vec<f64>>> {
        rs.iter().map(|r| list(r)).collect()
    }

    match geometry {
        Geometry::Point(p) => V::Point(p.to_vec()),
        Geometry::MultiPoint(ps) => V::MultiPoint(list(ps)),
        Geometry::LineString(ps) => V::LineString(list(ps)),
        Geometry::MultiLineString(rs) => V::MultiLineString(rings(rs)),
        Geometry::Polygon(rs) => V::Polygon(rings(rs)),
        Geometry::MultiPolygon(polys) => V::MultiPolygon(polys.iter().map(|p| rings(p)).collect()),
        Geometry::GeometryCollection(members) => V::GeometryCollection(
            members
                .iter()
                .map(|m| geojson::Geometry::new(to_geojson_value(m)))
                .collect(),
        ),
    }
}

/// FeatureCollection indentée, identifiants conservés
pub fn format(features: &[Feature]) -> Result<String, GeoError> {
    let collection = geojson::FeatureCollection {
        bbox: None,
        features: features
            .iter()
            .map(|f| geojson::Feature {
                bbox: None,
                geometry: f
                    .geometry
                    .as_ref()
                    .map(|g| geojson::Geometry::new(to_geojson_value(g))),
                id: Some(Id::String(f.id.clone())),
                properties: Some(f.properties.clone()),
                foreign_members: None,
            })
            .collect(),
        foreign_members: None,
    };

    Ok(serde_json::to_string_pretty(&collection)?)
}

/// Commence par `{` et le premier objet porte un `type` GeoJSON connu
pub fn detect(text: &str) -> bool {
    let trimmed = text.trim();
    if !trimmed.starts_with('{') {
        return false;
    }

    let Some(first) = split_objects(trimmed).into_iter().next() else {
        return false;
    };

    serde_json::from_str::<Value>(first)
        .ok()
        .and_then(|v| v.get("type").and_then(Value::as_str).map(str::to_owned))
        .is_some_and(|kind| GEOJSON_TYPES.contains(&kind.as_str()))
}
