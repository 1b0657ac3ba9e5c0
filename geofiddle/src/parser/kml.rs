//! Codec KML
//!
//! Extraction des Placemarks (Point, LineString, LinearRing, Polygon, MultiGeometry)
//! et écriture d'un document KML 2.2.

use roxmltree::{Document, Node};
use serde_json::Value;
use tracing::warn;

use super::xml::{self, child, child_text, children, escape_xml};
use super::{Codec, FormatName, FormatOptions};
use crate::tokenizer::parse_number;
use crate::types::{fmt_num, Feature, Geometry, ParseResult, Position, Properties, RawFeature};
use crate::GeoError;

const ROOT: &str = "kml";

const GEOMETRY_TAGS: [&str; 5] = ["Point", "LineString", "LinearRing", "Polygon", "MultiGeometry"];

pub struct KmlCodec;

impl Codec for KmlCodec {
    fn name(&self) -> FormatName {
        FormatName::Kml
    }

    fn parse(&self, text: &str) -> ParseResult {
        xml::parse_documents(text, FormatName::Kml, ROOT, extract)
    }

    fn format(&self, features: &[Feature], _options: &FormatOptions) -> Result<String, GeoError> {
        Ok(format(features))
    }

    fn detect(&self, text: &str) -> bool {
        xml::detect(text, ROOT)
    }
}

/// Une feature par Placemark portant une géométrie
fn extract(document: &Document) -> Vec<RawFeature> {
    document
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Placemark")
        .filter_map(placemark)
        .collect()
}

fn placemark(node: Node) -> Option<RawFeature> {
    let geometry = node
        .children()
        .filter(|n| n.is_element() && GEOMETRY_TAGS.contains(&n.tag_name().name()))
        .find_map(geometry)?;

    let mut properties = Properties::new();
    if let Some(name) = child_text(node, "name") {
        properties.insert("name".to_string(), Value::String(name));
    }
    if let Some(description) = child_text(node, "description") {
        properties.insert("description".to_string(), Value::String(description));
    }
    if let Some(extended) = child(node, "ExtendedData") {
        extended_data(extended, &mut properties);
    }

    Some(RawFeature {
        id: node.attribute("id").map(str::to_string),
        geometry: Some(geometry),
        properties,
    })
}

/// `Data[@name]/value` et `SchemaData/SimpleData[@name]`
fn extended_data(node: Node, properties: &mut Properties) {
    for data in node.descendants().filter(|n| n.is_element()) {
        let Some(name) = data.attribute("name") else {
            continue;
        };
        let value = match data.tag_name().name() {
            "Data" => child_text(data, "value"),
            "SimpleData" => data.text().map(|t| t.trim().to_string()),
            _ => continue,
        };
        properties.insert(
            name.to_string(),
            value.map_or(Value::Null, Value::String),
        );
    }
}

fn geometry(node: Node) -> Option<Geometry> {
    match node.tag_name().name() {
        "Point" => coordinates(node)?.into_iter().next().map(Geometry::Point),
        "LineString" => Some(Geometry::LineString(coordinates(node)?)),
        "LinearRing" => Some(Geometry::Polygon(vec![coordinates(node)?])),
        "Polygon" => polygon(node),
        "MultiGeometry" => {
            let mut members: Vec<Geometry> = node
                .children()
                .filter(|n| n.is_element() && GEOMETRY_TAGS.contains(&n.tag_name().name()))
                .filter_map(geometry)
                .collect();
            match members.len() {
                0 => None,
                1 => members.pop(),
                _ => Some(Geometry::GeometryCollection(members)),
            }
        }
        _ => None,
    }
}

fn polygon(node: Node) -> Option<Geometry> {
    let outer = child(node, "outerBoundaryIs")
        .and_then(|b| child(b, "LinearRing"))
        .and_then(coordinates)?;

    let mut rings = vec![outer];
    for boundary in children(node, "innerBoundaryIs") {
        for ring in children(boundary, "LinearRing") {
            if let Some(positions) = coordinates(ring) {
                rings.push(positions);
            }
        }
    }
    Some(Geometry::Polygon(rings))
}

/// Lit `<coordinates>` : tuples `lon,lat[,alt]` séparés par des blancs
fn coordinates(node: Node) -> Option<Vec<Position>> {
    let text = child(node, "coordinates")?.text()?;
    let positions: Vec<Position> = text
        .split_whitespace()
        .filter_map(|tuple| {
            let values: Option<Vec<f64>> = tuple
                .split(',')
                .filter(|v| !v.is_empty())
                .map(parse_number)
                .collect();
            values.and_then(|v| Position::from_slice(&v))
        })
        .collect();

    (!positions.is_empty()).then_some(positions)
}

/// Document KML complet, un Placemark par feature géométrique
pub fn format(features: &[Feature]) -> String {
    let mut placemarks = Vec::with_capacity(features.len());

    for (index, feature) in features.iter().enumerate() {
        let Some(geometry) = feature.geometry.as_ref() else {
            warn!(id = %feature.id, "feature without geometry skipped in KML output");
            continue;
        };

        let name = feature
            .property_str("name")
            .map(str::to_string)
            .unwrap_or_else(|| format!("Feature {}", index + 1));

        let mut out = format!(
            "<Placemark id=\"{}\"><name>{}</name>",
            escape_xml(&feature.id),
            escape_xml(&name)
        );
        if let Some(description) = feature.property_str("description") {
            out.push_str(&format!(
                "<description>{}</description>",
                escape_xml(description)
            ));
        }
        write_extended_data(&mut out, &feature.properties);
        write_geometry(&mut out, geometry);
        out.push_str("</Placemark>");
        placemarks.push(out);
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<kml xmlns=\"http://www.opengis.net/kml/2.2\">\n<Document>\n{}\n</Document>\n</kml>",
        placemarks.join("\n")
    )
}

/// Propriétés scalaires autres que name/description
fn write_extended_data(out: &mut String, properties: &Properties) {
    let scalars: Vec<(&String, String)> = properties
        .iter()
        .filter(|(key, _)| key.as_str() != "name" && key.as_str() != "description")
        .filter_map(|(key, value)| match value {
            Value::String(s) => Some((key, s.clone())),
            Value::Number(n) => Some((key, n.to_string())),
            Value::Bool(b) => Some((key, b.to_string())),
            _ => None,
        })
        .collect();

    if scalars.is_empty() {
        return;
    }

    out.push_str("<ExtendedData>");
    for (key, value) in scalars {
        out.push_str(&format!(
            "<Data name=\"{}\"><value>{}</value></Data>",
            escape_xml(key),
            escape_xml(&value)
        ));
    }
    out.push_str("</ExtendedData>");
}

fn write_geometry(out: &mut String, geometry: &Geometry) {
    match geometry {
        Geometry::Point(p) => {
            out.push_str("<Point><coordinates>");
            out.push_str(&tuple(p));
            out.push_str("</coordinates></Point>");
        }
        Geometry::LineString(ps) => {
            out.push_str("<LineString><coordinates>");
            out.push_str(&tuples(ps));
            out.push_str("</coordinates></LineString>");
        }
        Geometry::Polygon(rings) => write_polygon(out, rings),
        Geometry::MultiPoint(ps) => {
            out.push_str("<MultiGeometry>");
            for p in ps {
                write_geometry(out, &Geometry::Point(*p));
            }
            out.push_str("</MultiGeometry>");
        }
        Geometry::MultiLineString(lines) => {
            out.push_str("<MultiGeometry>");
            for line in lines {
                out.push_str("<LineString><coordinates>");
                out.push_str(&tuples(line));
                out.push_str("</coordinates></LineString>");
            }
            out.push_str("</MultiGeometry>");
        }
        Geometry::MultiPolygon(polygons) => {
            out.push_str("<MultiGeometry>");
            for rings in polygons {
                write_polygon(out, rings);
            }
            out.push_str("</MultiGeometry>");
        }
        Geometry::GeometryCollection(members) => {
            out.push_str("<MultiGeometry>");
            for member in members {
                write_geometry(out, member);
            }
            out.push_str("</MultiGeometry>");
        }
    }
}

fn write_polygon(out: &mut String, rings: &[Vec<Position>]) {
    out.push_str("<Polygon>");
    for (index, ring) in rings.iter().enumerate() {
        let tag = if index == 0 {
            "outerBoundaryIs"
        } else {
            "innerBoundaryIs"
        };
        out.push_str(&format!(
            "<{tag}><LinearRing><coordinates>{}</coordinates></LinearRing></{tag}>",
            tuples(ring)
        ));
    }
    out.push_str("</Polygon>");
}

fn tuple(p: &Position) -> String {
    match p.z {
        Some(z) => format!("{},{},{}", fmt_num(p.x), fmt_num(p.y), fmt_num(z)),
        None => format!("{},{}", fmt_num(p.x), fmt_num(p.y)),
    }
}

fn tuples(ps: &[Position]) -> String {
    ps.iter().map(tuple).collect::<Vec<_>>().join(" ")
}
