//! Codec CSV/DSV : paires de nombres séparées par délimiteurs, une géométrie par ligne
//!
//! L'ordre des coordonnées est toujours x puis y (lon/lat, easting/northing).
//! Aucune validation de plage ici : elle n'a de sens qu'une fois la projection connue.

use super::wkt::starts_with_wkt_keyword;
use super::{Codec, FormatName, FormatOptions};
use crate::tokenizer::{self, TokenError};
use crate::types::{assign_ids, fmt_num, Feature, Geometry, ParseError, ParseResult, Position, RawFeature};
use crate::GeoError;

/// Nombre minimal de paires pour qu'une ligne fermée soit un polygone
const MIN_POLYGON_PAIRS: usize = 4;

pub struct CsvCodec;

impl Codec for CsvCodec {
    fn name(&self) -> FormatName {
        FormatName::Csv
    }

    fn parse(&self, text: &str) -> ParseResult {
        parse(text)
    }

    fn format(&self, features: &[Feature], _options: &FormatOptions) -> Result<String, GeoError> {
        Ok(format(features))
    }

    fn detect(&self, text: &str) -> bool {
        detect(text)
    }
}

/// Parse ligne à ligne ; une ligne invalide produit une erreur sans bloquer les autres
pub fn parse(text: &str) -> ParseResult {
    if text.trim().is_empty() {
        return ParseResult::empty(FormatName::Csv);
    }

    let mut raw = Vec::new();
    let mut errors = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(line) {
            Ok(Some(geometry)) => raw.push(RawFeature::from_geometry(geometry)),
            Ok(None) => {}
            Err(message) => errors.push(ParseError::at_line(
                format!("Line {line_number}: {message}"),
                line_number,
            )),
        }
    }

    if raw.is_empty() && errors.is_empty() {
        errors.push(ParseError::new("No coordinates found in input"));
    }

    ParseResult {
        features: assign_ids(raw),
        errors,
        detected_format: Some(FormatName::Csv),
        detected_projection: None,
    }
}

fn parse_line(line: &str) -> Result<Option<Geometry>, String> {
    let numbers = tokenizer::parse_dsv(line).map_err(|e: TokenError| e.to_string())?;

    if numbers.is_empty() {
        return Ok(None);
    }
    if numbers.len() % 2 != 0 {
        return Err(format!(
            "Odd number of coordinates ({}), expected x,y pairs",
            numbers.len()
        ));
    }

    let positions: Vec<Position> = numbers
        .chunks_exact(2)
        .map(|pair| Position::new(pair[0], pair[1]))
        .collect();

    Ok(Some(classify(positions)))
}

/// 1 paire → Point, anneau fermé d'au moins 4 paires → Polygon, sinon LineString
fn classify(positions: Vec<Position>) -> Geometry {
    match positions.as_slice() {
        [single] => Geometry::Point(*single),
        [first, .., last] if positions.len() >= MIN_POLYGON_PAIRS && first == last => {
            Geometry::Polygon(vec![positions])
        }
        _ => Geometry::LineString(positions),
    }
}

/// Une ligne par feature : "x,y" pour un point, liste aplatie sinon
pub fn format(features: &[Feature]) -> String {
    features
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .map(|geometry| {
            let mut values = Vec::new();
            geometry.for_each_position(&mut |p| {
                values.push(fmt_num(p.x));
                values.push(fmt_num(p.y));
            });
            values.join(",")
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Dernier recours de la détection : au moins une paire, nombre pair de valeurs
pub fn detect(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.starts_with(['{', '[', '<']) {
        return false;
    }
    if starts_with_wkt_keyword(trimmed) || has_srid_prefix(trimmed) {
        return false;
    }

    match tokenizer::parse_dsv(trimmed) {
        Ok(numbers) => numbers.len() >= 2 && numbers.len() % 2 == 0,
        Err(_) => false,
    }
}

fn has_srid_prefix(text: &str) -> bool {
    text.get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("SRID="))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(result: &ParseResult) -> Vec<(f64, f64)> {
        result.positions().iter().map(|p| (p.x, p.y)).collect()
    }

    #[test]
    fn test_single_point() {
        let result = parse("-0.1276,51.5074");
        assert!(result.errors.is_empty());
        assert_eq!(result.features.len(), 1);
        assert_eq!(result.features[0].id, "feature-0");
        match &result.features[0].geometry {
            Some(Geometry::Point(p)) => {
                assert!((p.x + 0.1276).abs() < 1e-12, "x={}", p.x);
                assert!((p.y - 51.5074).abs() < 1e-12, "y={}", p.y);
            }
            other => panic!("expected point, got {:?}", other),
        }
    }

    #[test]
    fn test_odd_token_count_is_an_error() {
        let result = parse("-0.1,51.5,0");
        assert!(result.features.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.starts_with("Line 1: Odd number of coordinates"));
        assert_eq!(result.errors[0].line, Some(1));
    }

    #[test]
    fn test_invalid_number() {
        let result = parse("1,2\n3,abc");
        assert_eq!(result.features.len(), 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].line, Some(2));
        assert!(result.errors[0].message.contains("abc"));
    }

    #[test]
    fn test_line_classification() {
        let result = parse("0 0 1 1\n0,0;1,0;1,1;0,0\n0 0 1 1 0 0");
        let types: Vec<&str> = result
            .features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .map(Geometry::type_name)
            .collect();
        assert_eq!(types, vec!["LineString", "Polygon", "LineString"]);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let result = parse("1 2\n\n   \n3 4\n");
        assert_eq!(result.features.len(), 2);
        assert_eq!(coords(&result), vec![(1.0, 2.0), (3.0, 4.0)]);
        assert_eq!(result.features[1].id, "feature-1");
    }

    #[test]
    fn test_delimiters_only_reports_no_coordinates() {
        let result = parse(" ;;, ");
        assert!(result.features.is_empty());
        assert_eq!(result.errors[0].message, "No coordinates found in input");
    }

    #[test]
    fn test_empty_input() {
        let result = parse("   ");
        assert!(result.features.is_empty());
        assert!(result.errors.is_empty());
        assert_eq!(result.detected_format, Some(FormatName::Csv));
    }

    #[test]
    fn test_format() {
        let result = parse("-0.1276,51.5074\n0 0 1 1");
        assert_eq!(format(&result.features), "-0.1276,51.5074\n0,0,1,1");
    }

    #[test]
    fn test_detect() {
        assert!(detect("-0.1276,51.5074"));
        assert!(detect("530000 180000\n530100 180100"));
        assert!(!detect("1,2,3"));
        assert!(!detect("42"));
        assert!(!detect("{\"type\": \"Point\"}"));
        assert!(!detect("[1, 2]"));
        assert!(!detect("<kml/>"));
        assert!(!detect("POINT(1 2)"));
        assert!(!detect("srid=4326;POINT(1 2)"));
        assert!(!detect("one,two"));
    }
}
