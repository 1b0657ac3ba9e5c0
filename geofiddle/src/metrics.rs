//! Mesures de géométrie : comptage, aire et longueur géodésiques, emprise
//!
//! Les aires et longueurs attendent des coordonnées WGS84.

use std::fmt;

use geo::{BoundingRect, GeodesicArea, GeodesicLength};
use serde::Serialize;

use crate::reproject::{Reprojector, SupportedProjection};
use crate::types::{Feature, Geometry, Position};
use crate::GeoError;

/// Nombre de positions (anneaux fermés comptés avec leur point de fermeture)
pub fn count_coordinates(geometry: Option<&Geometry>) -> usize {
    let mut count = 0;
    if let Some(g) = geometry {
        g.for_each_position(&mut |_| count += 1);
    }
    count
}

/// Aire géodésique en m², uniquement pour Polygon et MultiPolygon
pub fn area(geometry: Option<&Geometry>) -> Option<f64> {
    match geometry? {
        Geometry::Polygon(rings) => Some(polygon(rings).geodesic_area_unsigned()),
        Geometry::MultiPolygon(polygons) => Some(
            geo::MultiPolygon::new(polygons.iter().map(|p| polygon(p)).collect())
                .geodesic_area_unsigned(),
        ),
        _ => None,
    }
}

/// Longueur géodésique en m, uniquement pour LineString et MultiLineString
pub fn length(geometry: Option<&Geometry>) -> Option<f64> {
    match geometry? {
        Geometry::LineString(ps) => Some(line(ps).geodesic_length()),
        Geometry::MultiLineString(lines) => Some(
            geo::MultiLineString::new(lines.iter().map(|l| line(l)).collect()).geodesic_length(),
        ),
        _ => None,
    }
}

/// `MultiLineString` → `Multi Line String`
pub fn type_label(type_name: Option<&str>) -> String {
    let Some(name) = type_name else {
        return "Unknown".to_string();
    };
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() && !out.is_empty() {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

/// m², ha au-delà de 10 000 m², km² au-delà de 1 000 000 m²
pub fn format_area(square_meters: Option<f64>) -> String {
    match square_meters {
        None => "-".to_string(),
        Some(v) if v >= 1_000_000.0 => format!("{:.2} km²", v / 1_000_000.0),
        Some(v) if v >= 10_000.0 => format!("{:.2} ha", v / 10_000.0),
        Some(v) => format!("{v:.2} m²"),
    }
}

pub fn format_length(meters: Option<f64>) -> String {
    match meters {
        None => "-".to_string(),
        Some(v) if v >= 1000.0 => format!("{:.2} km", v / 1000.0),
        Some(v) => format!("{v:.2} m"),
    }
}

fn coord(p: &Position) -> geo::Coord<f64> {
    geo::Coord { x: p.x, y: p.y }
}

fn line(positions: &[Position]) -> geo::LineString<f64> {
    positions.iter().map(coord).collect()
}

fn polygon(rings: &[Vec<Position>]) -> geo::Polygon<f64> {
    let mut rings = rings.iter().map(|r| line(r));
    let exterior = rings.next().unwrap_or_else(|| geo::LineString::new(Vec::new()));
    geo::Polygon::new(exterior, rings.collect())
}

/// Conversion vers les types du crate `geo` (z abandonné)
pub fn to_geo(geometry: &Geometry) -> geo::Geometry<f64> {
    match geometry {
        Geometry::Point(p) => geo::Point::from(coord(p)).into(),
        Geometry::MultiPoint(ps) => {
            geo::MultiPoint::new(ps.iter().map(|p| geo::Point::from(coord(p))).collect()).into()
        }
        Geometry::LineString(ps) => line(ps).into(),
        Geometry::MultiLineString(lines) => {
            geo::MultiLineString::new(lines.iter().map(|l| line(l)).collect()).into()
        }
        Geometry::Polygon(rings) => polygon(rings).into(),
        Geometry::MultiPolygon(polygons) => {
            geo::MultiPolygon::new(polygons.iter().map(|p| polygon(p)).collect()).into()
        }
        Geometry::GeometryCollection(members) => {
            geo::Geometry::GeometryCollection(geo::GeometryCollection(
                members.iter().map(to_geo).collect(),
            ))
        }
    }
}

/// Emprise des features : coins sud-ouest et nord-est dans la projection de sortie
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Envelope {
    pub sw: Position,
    pub ne: Position,
    pub projection: SupportedProjection,
}

impl Envelope {
    /// Emprise calculée en WGS84 puis transformée vers `output`
    ///
    /// `None` quand aucune feature ne porte de coordonnée.
    pub fn compute(
        features: &[Feature],
        source: SupportedProjection,
        output: SupportedProjection,
    ) -> Result<Option<Self>, GeoError> {
        let to_wgs84 = Reprojector::new(source, SupportedProjection::Wgs84);

        let mut bounds: Option<geo::Rect<f64>> = None;
        for geometry in features.iter().filter_map(|f| f.geometry.as_ref()) {
            let wgs84 = to_wgs84.transform_geometry(geometry)?;
            let Some(rect) = to_geo(&wgs84).bounding_rect() else {
                continue;
            };
            bounds = Some(match bounds {
                None => rect,
                Some(b) => geo::Rect::new(
                    geo::Coord {
                        x: b.min().x.min(rect.min().x),
                        y: b.min().y.min(rect.min().y),
                    },
                    geo::Coord {
                        x: b.max().x.max(rect.max().x),
                        y: b.max().y.max(rect.max().y),
                    },
                ),
            });
        }

        let Some(bounds) = bounds else {
            return Ok(None);
        };

        let to_output = Reprojector::new(SupportedProjection::Wgs84, output);
        let sw = to_output.transform_position(&Position::new(bounds.min().x, bounds.min().y))?;
        let ne = to_output.transform_position(&Position::new(bounds.max().x, bounds.max().y))?;

        Ok(Some(Self {
            sw,
            ne,
            projection: output,
        }))
    }

    /// 6 décimales en degrés, 2 en mètres
    pub fn decimals(&self) -> usize {
        if self.projection.is_geographic() {
            6
        } else {
            2
        }
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.decimals();
        write!(
            f,
            "SW: {:.d$}, {:.d$}\nNE: {:.d$}, {:.d$}",
            self.sw.x, self.sw.y, self.ne.x, self.ne.y
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Geometry {
        Geometry::Polygon(vec![vec![
            Position::new(0.0, 0.0),
            Position::new(size, 0.0),
            Position::new(size, size),
            Position::new(0.0, size),
            Position::new(0.0, 0.0),
        ]])
    }

    #[test]
    fn test_count_coordinates() {
        assert_eq!(count_coordinates(None), 0);
        assert_eq!(count_coordinates(Some(&square(1.0))), 5);
        let collection = Geometry::GeometryCollection(vec![
            Geometry::Point(Position::new(0.0, 0.0)),
            Geometry::MultiPolygon(vec![
                vec![vec![Position::new(0.0, 0.0); 4]],
                vec![vec![Position::new(0.0, 0.0); 4]],
            ]),
        ]);
        assert_eq!(count_coordinates(Some(&collection)), 9);
    }

    #[test]
    fn test_area_only_for_polygons() {
        // 0,01° × 0,01° à l'équateur ≈ 1,2309 km²
        let a = area(Some(&square(0.01))).unwrap();
        assert!((a - 1_230_900.0).abs() < 2_000.0, "area={}", a);
        assert_eq!(area(Some(&Geometry::Point(Position::new(0.0, 0.0)))), None);
        assert_eq!(area(None), None);
    }

    #[test]
    fn test_length_only_for_lines() {
        let l = length(Some(&Geometry::LineString(vec![
            Position::new(0.0, 0.0),
            Position::new(1.0, 0.0),
        ])))
        .unwrap();
        assert!((l - 111_319.49).abs() < 1.0, "length={}", l);
        assert_eq!(length(Some(&square(1.0))), None);
    }

    #[test]
    fn test_labels_and_formatting() {
        assert_eq!(type_label(Some("MultiLineString")), "Multi Line String");
        assert_eq!(type_label(Some("Point")), "Point");
        assert_eq!(type_label(None), "Unknown");

        assert_eq!(format_area(None), "-");
        assert_eq!(format_area(Some(950.0)), "950.00 m²");
        assert_eq!(format_area(Some(25_000.0)), "2.50 ha");
        assert_eq!(format_area(Some(3_500_000.0)), "3.50 km²");
        assert_eq!(format_length(Some(999.0)), "999.00 m");
        assert_eq!(format_length(Some(1500.0)), "1.50 km");
    }

    #[test]
    fn test_to_geo_collection() {
        let collection = Geometry::GeometryCollection(vec![
            Geometry::Point(Position::new(-1.0, 2.0)),
            square(1.0),
        ]);
        let geo::Geometry::GeometryCollection(members) = to_geo(&collection) else {
            panic!("expected a geometry collection");
        };
        assert_eq!(members.0.len(), 2);

        let features = vec![Feature::new("c", Some(collection))];
        let wgs = SupportedProjection::Wgs84;
        let envelope = Envelope::compute(&features, wgs, wgs).unwrap().unwrap();
        assert_eq!(envelope.sw, Position::new(-1.0, 0.0));
        assert_eq!(envelope.ne, Position::new(1.0, 2.0));
    }

    #[test]
    fn test_envelope() {
        let features = vec![
            Feature::new("a", Some(Geometry::Point(Position::new(-0.2, 51.4)))),
            Feature::new("b", Some(Geometry::Point(Position::new(0.1, 51.6)))),
            Feature::new("c", None),
        ];
        let wgs = SupportedProjection::Wgs84;
        let envelope = Envelope::compute(&features, wgs, wgs).unwrap().unwrap();
        assert_eq!(envelope.sw, Position::new(-0.2, 51.4));
        assert_eq!(envelope.ne, Position::new(0.1, 51.6));
        assert_eq!(
            envelope.to_string(),
            "SW: -0.200000, 51.400000\nNE: 0.100000, 51.600000"
        );

        let projected = Envelope::compute(&features, wgs, SupportedProjection::Bng)
            .unwrap()
            .unwrap();
        assert!(projected.sw.x < projected.ne.x);
        assert_eq!(projected.decimals(), 2);

        assert_eq!(Envelope::compute(&[], wgs, wgs).unwrap(), None);
    }
}
