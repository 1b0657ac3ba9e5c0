//! Codecs WKT et EWKT
//!
//! La grammaire est déléguée au crate `wkt` ; l'écriture est faite ici pour garder
//! une sortie stable (`POINT (0 1)`, `MULTIPOINT ((0 0), (1 1))`).
//! Plusieurs géométries sont séparées par une ligne vide.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;
use wkt::types::{Coord, LineString, Polygon};
use wkt::Wkt;

use super::{Codec, FormatName, FormatOptions};
use crate::reproject::SupportedProjection;
use crate::types::{assign_ids, fmt_num, Feature, Geometry, ParseError, ParseResult, Position, RawFeature};
use crate::GeoError;

/// Mots-clés reconnus en tête de texte WKT
pub const WKT_KEYWORDS: [&str; 7] = [
    "POINT",
    "LINESTRING",
    "POLYGON",
    "MULTIPOINT",
    "MULTILINESTRING",
    "MULTIPOLYGON",
    "GEOMETRYCOLLECTION",
];

/// SRID écrit par défaut en EWKT
const DEFAULT_SRID: u32 = 4326;

fn block_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("valid block separator regex"))
}

fn srid_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^SRID=(\d+);").expect("valid SRID regex"))
}

/// Vrai si le texte commence par un mot-clé WKT (insensible à la casse)
pub(crate) fn starts_with_wkt_keyword(text: &str) -> bool {
    WKT_KEYWORDS.iter().any(|keyword| {
        text.get(..keyword.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
    })
}

pub struct WktCodec;

impl Codec for WktCodec {
    fn name(&self) -> FormatName {
        FormatName::Wkt
    }

    fn parse(&self, text: &str) -> ParseResult {
        parse_wkt(text)
    }

    fn format(&self, features: &[Feature], _options: &FormatOptions) -> Result<String, GeoError> {
        Ok(format_wkt(features))
    }

    fn detect(&self, text: &str) -> bool {
        starts_with_wkt_keyword(text.trim())
    }
}

pub struct EwktCodec;

impl Codec for EwktCodec {
    fn name(&self) -> FormatName {
        FormatName::Ewkt
    }

    fn parse(&self, text: &str) -> ParseResult {
        parse_ewkt(text)
    }

    fn format(&self, features: &[Feature], options: &FormatOptions) -> Result<String, GeoError> {
        let srid = options
            .projection
            .as_deref()
            .and_then(|p| p.parse::<SupportedProjection>().ok())
            .map_or(DEFAULT_SRID, SupportedProjection::epsg);
        Ok(format_ewkt(features, srid))
    }

    fn detect(&self, text: &str) -> bool {
        srid_prefix().is_match(text.trim())
    }
}

/// Parse du WKT, un bloc par géométrie
pub fn parse_wkt(text: &str) -> ParseResult {
    let (raw, errors, _) = parse_blocks(text, false);
    ParseResult {
        features: assign_ids(raw),
        errors,
        detected_format: Some(FormatName::Wkt),
        detected_projection: None,
    }
}

/// Parse de l'EWKT ; le premier SRID fixe la projection détectée
///
/// Un bloc portant un SRID différent du premier est rejeté.
pub fn parse_ewkt(text: &str) -> ParseResult {
    let (raw, errors, projection) = parse_blocks(text, true);
    ParseResult {
        features: assign_ids(raw),
        errors,
        detected_format: Some(FormatName::Ewkt),
        detected_projection: projection,
    }
}

fn parse_blocks(
    text: &str,
    strip_srid: bool,
) -> (Vec<RawFeature>, Vec<ParseError>, Option<SupportedProjection>) {
    let mut raw = Vec::new();
    let mut errors = Vec::new();
    let mut projection = None;
    let mut first_srid: Option<u32> = None;

    let blocks = block_separator()
        .split(text.trim())
        .map(str::trim)
        .filter(|b| !b.is_empty());

    for (index, block) in blocks.enumerate() {
        let mut body = block;
        if strip_srid {
            if let Some(caps) = srid_prefix().captures(block) {
                let Ok(srid) = caps[1].parse::<u32>() else {
                    errors.push(ParseError::new(format!(
                        "Block {}: invalid SRID {}",
                        index + 1,
                        &caps[1]
                    )));
                    continue;
                };
                match first_srid {
                    None => {
                        first_srid = Some(srid);
                        projection = SupportedProjection::from_srid(srid);
                    }
                    Some(first) if first != srid => {
                        debug!(block = index + 1, srid, first, "EWKT block SRID mismatch");
                        errors.push(ParseError::new(format!(
                            "Block {}: SRID {srid} conflicts with {first}",
                            index + 1
                        )));
                        continue;
                    }
                    Some(_) => {}
                }
                body = &block[caps[0].len()..];
            }
        }

        match read_geometry(body) {
            Ok(geometry) => raw.push(RawFeature::from_geometry(geometry)),
            Err(reason) => {
                debug!(block = index + 1, %reason, "WKT block rejected");
                errors.push(ParseError::new(format!(
                    "Failed to parse WKT at block {}: {reason}",
                    index + 1
                )));
            }
        }
    }

    (raw, errors, projection)
}

/// Lit une géométrie WKT, toute erreur de grammaire devient un message
pub fn read_geometry(text: &str) -> Result<Geometry, String> {
    let parsed = Wkt::<f64>::from_str(text.trim()).map_err(|e| e.to_string())?;
    convert(parsed)
}

fn convert(wkt: Wkt<f64>) -> Result<Geometry, String> {
    let geometry = match wkt {
        Wkt::Point(point) => {
            let coord = point.0.ok_or_else(|| "empty POINT".to_string())?;
            Geometry::Point(position(coord))
        }
        Wkt::LineString(line) => Geometry::LineString(line_positions(line)),
        Wkt::Polygon(polygon) => Geometry::Polygon(rings(polygon)),
        Wkt::MultiPoint(multi) => Geometry::MultiPoint(
            multi
                .0
                .into_iter()
                .filter_map(|p| p.0.map(position))
                .collect(),
        ),
        Wkt::MultiLineString(multi) => {
            Geometry::MultiLineString(multi.0.into_iter().map(line_positions).collect())
        }
        Wkt::MultiPolygon(multi) => Geometry::MultiPolygon(multi.0.into_iter().map(rings).collect()),
        Wkt::GeometryCollection(collection) => Geometry::GeometryCollection(
            collection
                .0
                .into_iter()
                .map(convert)
                .collect::<Result<Vec<_>, _>>()?,
        ),
    };
    Ok(geometry)
}

fn position(coord: Coord<f64>) -> Position {
    Position {
        x: coord.x,
        y: coord.y,
        z: coord.z,
    }
}

fn line_positions(line: LineString<f64>) -> Vec<Position> {
    line.0.into_iter().map(position).collect()
}

fn rings(polygon: Polygon<f64>) -> Vec<Vec<Position>> {
    polygon.0.into_iter().map(line_positions).collect()
}

/// Écrit les géométries en WKT, blocs séparés par une ligne vide
pub fn format_wkt(features: &[Feature]) -> String {
    features
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .map(write_geometry)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Écrit les géométries en EWKT, chaque bloc préfixé par `SRID=<srid>;`
pub fn format_ewkt(features: &[Feature], srid: u32) -> String {
    features
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .map(|g| format!("SRID={srid};{}", write_geometry(g)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Écriture WKT d'une géométrie
///
/// Le tag ` Z` n'est posé que si toutes les positions portent une altitude.
pub fn write_geometry(geometry: &Geometry) -> String {
    let mut all_z = true;
    let mut any = false;
    geometry.for_each_position(&mut |p| {
        any = true;
        all_z &= p.z.is_some();
    });
    let with_z = any && all_z;

    let mut out = String::new();
    write_tagged(&mut out, geometry, with_z);
    out
}

fn write_tagged(out: &mut String, geometry: &Geometry, with_z: bool) {
    out.push_str(&geometry.type_name().to_ascii_uppercase());
    if with_z && !matches!(geometry, Geometry::GeometryCollection(_)) {
        out.push_str(" Z");
    }

    let empty = match geometry {
        Geometry::Point(_) => false,
        Geometry::MultiPoint(ps) | Geometry::LineString(ps) => ps.is_empty(),
        Geometry::MultiLineString(rs) | Geometry::Polygon(rs) => rs.is_empty(),
        Geometry::MultiPolygon(polys) => polys.is_empty(),
        Geometry::GeometryCollection(members) => members.is_empty(),
    };
    if empty {
        out.push_str(" EMPTY");
        return;
    }

    out.push_str(" (");
    match geometry {
        Geometry::Point(p) => write_position(out, p, with_z),
        Geometry::LineString(ps) => write_positions(out, ps, with_z),
        Geometry::MultiPoint(ps) => {
            for (i, p) in ps.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push('(');
                write_position(out, p, with_z);
                out.push(')');
            }
        }
        Geometry::MultiLineString(rs) | Geometry::Polygon(rs) => write_rings(out, rs, with_z),
        Geometry::MultiPolygon(polys) => {
            for (i, rings) in polys.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push('(');
                write_rings(out, rings, with_z);
                out.push(')');
            }
        }
        Geometry::GeometryCollection(members) => {
            for (i, member) in members.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_tagged(out, member, with_z);
            }
        }
    }
    out.push(')');
}

fn write_rings(out: &mut String, rings: &[Vec<Position>], with_z: bool) {
    for (i, ring) in rings.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push('(');
        write_positions(out, ring, with_z);
        out.push(')');
    }
}

fn write_positions(out: &mut String, positions: &[Position], with_z: bool) {
    for (i, p) in positions.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_position(out, p, with_z);
    }
}

fn write_position(out: &mut String, p: &Position, with_z: bool) {
    out.push_str(&fmt_num(p.x));
    out.push(' ');
    out.push_str(&fmt_num(p.y));
    if with_z {
        if let Some(z) = p.z {
            out.push(' ');
            out.push_str(&fmt_num(z));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(result: &ParseResult, index: usize) -> &Geometry {
        result.features[index].geometry.as_ref().unwrap()
    }

    #[test]
    fn test_point_round_trip() {
        let result = parse_wkt("POINT(0 1)");
        assert!(result.errors.is_empty());
        assert_eq!(format_wkt(&result.features), "POINT (0 1)");
    }

    #[test]
    fn test_point_z() {
        let result = parse_wkt("POINT Z (1 2 3)");
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(geometry(&result, 0), &Geometry::Point(Position::with_z(1.0, 2.0, 3.0)));
        assert_eq!(format_wkt(&result.features), "POINT Z (1 2 3)");
    }

    #[test]
    fn test_polygon_with_hole() {
        let text = "POLYGON((0 0, 10 0, 10 10, 0 10, 0 0), (2 2, 4 2, 4 4, 2 2))";
        let result = parse_wkt(text);
        match geometry(&result, 0) {
            Geometry::Polygon(rings) => {
                assert_eq!(rings.len(), 2);
                assert_eq!(rings[0].len(), 5);
            }
            other => panic!("expected polygon, got {:?}", other),
        }
        assert_eq!(
            format_wkt(&result.features),
            "POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0), (2 2, 4 2, 4 4, 2 2))"
        );
    }

    #[test]
    fn test_multi_and_collection() {
        let text = "MULTIPOINT((0 0), (1 1))\n\nGEOMETRYCOLLECTION(POINT(1 2), LINESTRING(0 0, 1 1))";
        let result = parse_wkt(text);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.features.len(), 2);
        assert_eq!(result.features[1].id, "feature-1");
        assert_eq!(
            format_wkt(&result.features),
            "MULTIPOINT ((0 0), (1 1))\n\nGEOMETRYCOLLECTION (POINT (1 2), LINESTRING (0 0, 1 1))"
        );
    }

    #[test]
    fn test_bad_block_does_not_abort() {
        let result = parse_wkt("POINT(0 0)\n\nPOINT(abc)\n\n  \nLINESTRING(0 0, 1 1)");
        assert_eq!(result.features.len(), 2);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.starts_with("Failed to parse WKT at block 2"));
    }

    #[test]
    fn test_empty_point_is_an_error() {
        let result = parse_wkt("POINT EMPTY");
        assert!(result.features.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_ewkt_srid_detection() {
        let result = parse_ewkt("SRID=27700;POINT(500000 200000)");
        assert_eq!(result.detected_projection, Some(SupportedProjection::Bng));
        assert_eq!(result.detected_format, Some(FormatName::Ewkt));
        assert_eq!(
            geometry(&result, 0),
            &Geometry::Point(Position::new(500000.0, 200000.0))
        );

        let result = parse_ewkt("srid=3857;POINT(0 0)");
        assert_eq!(result.detected_projection, Some(SupportedProjection::WebMercator));

        let result = parse_ewkt("SRID=2154;POINT(700000 6600000)");
        assert_eq!(result.detected_projection, None);
        assert_eq!(result.features.len(), 1);
    }

    #[test]
    fn test_ewkt_conflicting_srid_rejected() {
        let result = parse_ewkt(
            "SRID=27700;POINT(530000 180000)\n\nSRID=4326;POINT(-0.1276 51.5074)\n\nSRID=27700;POINT(1 2)",
        );
        assert_eq!(result.detected_projection, Some(SupportedProjection::Bng));
        assert_eq!(result.features.len(), 2);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(
            result.errors[0].message,
            "Block 2: SRID 4326 conflicts with 27700"
        );
    }

    #[test]
    fn test_ewkt_format_uses_projection_option() {
        let result = parse_ewkt("SRID=27700;POINT(500000 200000)");
        let codec = EwktCodec;
        let bng = FormatOptions {
            projection: Some("EPSG:27700".to_string()),
        };
        assert_eq!(
            codec.format(&result.features, &bng).unwrap(),
            "SRID=27700;POINT (500000 200000)"
        );
        let unknown = FormatOptions {
            projection: Some("EPSG:2154".to_string()),
        };
        assert_eq!(
            codec.format(&result.features, &unknown).unwrap(),
            "SRID=4326;POINT (500000 200000)"
        );
    }

    #[test]
    fn test_detect() {
        assert!(WktCodec.detect("  polygon((0 0, 1 0, 1 1, 0 0))"));
        assert!(!WktCodec.detect("SRID=4326;POINT(0 0)"));
        assert!(EwktCodec.detect("SRID=4326;POINT(0 0)"));
        assert!(!EwktCodec.detect("SRID=;POINT(0 0)"));
        assert!(!EwktCodec.detect("POINT(0 0)"));
    }
}
