//! Codec GPX 1.1
//!
//! `wpt` → Point, `rte` → LineString, `trk` → LineString ou MultiLineString.
//! L'élément `ele` devient la coordonnée z.

use roxmltree::{Document, Node};
use serde_json::Value;
use tracing::warn;

use super::xml::{self, child_text, children, escape_xml, number_attribute};
use super::{Codec, FormatName, FormatOptions};
use crate::tokenizer::parse_number;
use crate::types::{fmt_num, Feature, Geometry, ParseResult, Position, Properties, RawFeature};
use crate::GeoError;

const ROOT: &str = "gpx";

pub struct GpxCodec;

impl Codec for GpxCodec {
    fn name(&self) -> FormatName {
        FormatName::Gpx
    }

    fn parse(&self, text: &str) -> ParseResult {
        xml::parse_documents(text, FormatName::Gpx, ROOT, extract)
    }

    fn format(&self, features: &[Feature], _options: &FormatOptions) -> Result<String, GeoError> {
        Ok(format(features))
    }

    fn detect(&self, text: &str) -> bool {
        xml::detect(text, ROOT)
    }
}

/// Waypoints, routes et traces dans l'ordre du document
fn extract(document: &Document) -> Vec<RawFeature> {
    document
        .root_element()
        .children()
        .filter(|n| n.is_element())
        .filter_map(|node| {
            let geometry = match node.tag_name().name() {
                "wpt" => point(node).map(Geometry::Point),
                "rte" => line(node, "rtept").map(Geometry::LineString),
                "trk" => track(node),
                _ => None,
            }?;
            Some(RawFeature {
                id: None,
                geometry: Some(geometry),
                properties: properties(node),
            })
        })
        .collect()
}

fn point(node: Node) -> Option<Position> {
    let lat = number_attribute(node, "lat")?;
    let lon = number_attribute(node, "lon")?;
    let ele = child_text(node, "ele").and_then(|t| parse_number(&t));
    Some(Position { x: lon, y: lat, z: ele })
}

fn line(node: Node, point_tag: &str) -> Option<Vec<Position>> {
    let positions: Vec<Position> = children(node, point_tag).filter_map(point).collect();
    (!positions.is_empty()).then_some(positions)
}

fn track(node: Node) -> Option<Geometry> {
    let mut segments: Vec<Vec<Position>> = children(node, "trkseg")
        .filter_map(|segment| line(segment, "trkpt"))
        .collect();

    match segments.len() {
        0 => None,
        1 => segments.pop().map(Geometry::LineString),
        _ => Some(Geometry::MultiLineString(segments)),
    }
}

fn properties(node: Node) -> Properties {
    let mut properties = Properties::new();
    for (tag, key) in [
        ("name", "name"),
        ("desc", "description"),
        ("type", "type"),
        ("cmt", "cmt"),
    ] {
        if let Some(text) = child_text(node, tag) {
            properties.insert(key.to_string(), Value::String(text));
        }
    }
    properties
}

/// Document GPX 1.1 ; polygones et features sans géométrie sont ignorés
pub fn format(features: &[Feature]) -> String {
    let mut elements = Vec::new();

    for feature in features {
        match feature.geometry.as_ref() {
            Some(geometry) => write_geometry(&mut elements, feature, geometry),
            None => warn!(id = %feature.id, "feature without geometry skipped in GPX output"),
        }
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<gpx version=\"1.1\" creator=\"GeoFiddle\" xmlns=\"http://www.topografix.com/GPX/1/1\">\n  {}\n</gpx>",
        elements.join("\n  ")
    )
}

fn write_geometry(elements: &mut Vec<String>, feature: &Feature, geometry: &Geometry) {
    match geometry {
        Geometry::Point(p) => elements.push(waypoint(feature, p)),
        Geometry::MultiPoint(ps) => elements.extend(ps.iter().map(|p| waypoint(feature, p))),
        Geometry::LineString(ps) => elements.push(track_element(feature, std::slice::from_ref(ps))),
        Geometry::MultiLineString(lines) => elements.push(track_element(feature, lines)),
        Geometry::GeometryCollection(members) => {
            for member in members {
                write_geometry(elements, feature, member);
            }
        }
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) => {
            warn!(
                id = %feature.id,
                geometry = geometry.type_name(),
                "geometry not representable in GPX, skipped"
            );
        }
    }
}

/// `<name>` puis `<desc>` quand les propriétés existent
fn metadata(feature: &Feature) -> String {
    let mut out = String::new();
    if let Some(name) = feature.property_str("name") {
        out.push_str(&format!("<name>{}</name>", escape_xml(name)));
    }
    if let Some(description) = feature.property_str("description") {
        out.push_str(&format!("<desc>{}</desc>", escape_xml(description)));
    }
    out
}

fn waypoint(feature: &Feature, p: &Position) -> String {
    format!(
        "<wpt lat=\"{}\" lon=\"{}\">{}{}</wpt>",
        fmt_num(p.y),
        fmt_num(p.x),
        elevation(p),
        metadata(feature)
    )
}

fn track_element(feature: &Feature, segments: &[Vec<Position>]) -> String {
    let segments: Vec<String> = segments
        .iter()
        .map(|segment| {
            let points: Vec<String> = segment
                .iter()
                .map(|p| {
                    format!(
                        "<trkpt lat=\"{}\" lon=\"{}\">{}</trkpt>",
                        fmt_num(p.y),
                        fmt_num(p.x),
                        elevation(p)
                    )
                })
                .collect();
            format!(
                "<trkseg>\n        {}\n      </trkseg>",
                points.join("\n        ")
            )
        })
        .collect();

    format!("<trk>{}{}</trk>", metadata(feature), segments.join("\n      "))
}

fn elevation(p: &Position) -> String {
    p.z
        .map(|z| format!("<ele>{}</ele>", fmt_num(z)))
        .unwrap_or_default()
}
