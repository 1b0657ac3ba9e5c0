//! Reprojection en Rust pur entre les systèmes pris en charge
//!
//! - WGS84 (EPSG:4326) : degrés lon/lat, pivot de toutes les transformations
//! - Web Mercator (EPSG:3857) : sphère de rayon 6 378 137 m
//! - British National Grid (EPSG:27700) : Transverse Mercator sur Airy 1830,
//!   datum OSGB36 ramené à WGS84 par Helmert 7 paramètres
//!
//! La coordonnée z n'est jamais modifiée.

mod detect;
mod ellipsoid;
mod helmert;
mod mercator;
mod projection;
mod tmerc;

pub use detect::{detect_projection_from_coordinates, is_valid_wgs84, validate_wgs84};
pub use ellipsoid::{Ellipsoid, AIRY1830, WGS84};
pub use projection::{ProjectionDefinition, SupportedProjection};

use crate::types::{Feature, Geometry, Position};
use crate::GeoError;

/// Point en coordonnées géographiques (radians)
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    /// Longitude en radians
    pub lon: f64,
    /// Latitude en radians
    pub lat: f64,
}

impl Geographic {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Convertit en degrés
    pub fn to_degrees(self) -> (f64, f64) {
        (self.lon.to_degrees(), self.lat.to_degrees())
    }

    /// Crée depuis des degrés
    pub fn from_degrees(lon_deg: f64, lat_deg: f64) -> Self {
        Self {
            lon: lon_deg.to_radians(),
            lat: lat_deg.to_radians(),
        }
    }
}

/// Transformation d'une projection source vers une projection cible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reprojector {
    source: SupportedProjection,
    target: SupportedProjection,
}

impl Reprojector {
    pub fn new(source: SupportedProjection, target: SupportedProjection) -> Self {
        Self { source, target }
    }

    pub fn source(&self) -> SupportedProjection {
        self.source
    }

    pub fn target(&self) -> SupportedProjection {
        self.target
    }

    /// Source et cible identiques : les coordonnées sont recopiées telles quelles
    pub fn is_identity(&self) -> bool {
        self.source == self.target
    }

    /// Transforme un couple (x, y)
    ///
    /// # Errors
    ///
    /// `GeoError::Transform` si l'entrée ou le résultat n'est pas fini, ou si une
    /// latitude WGS84 sort de [-90, 90].
    pub fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64), GeoError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(GeoError::transform(format!(
                "non-finite coordinate ({x}, {y}) in {}",
                self.source
            )));
        }
        if self.is_identity() {
            return Ok((x, y));
        }

        let geo = self.source_to_geographic(x, y)?;
        let (tx, ty) = self.geographic_to_target(geo);

        if !tx.is_finite() || !ty.is_finite() {
            return Err(GeoError::transform(format!(
                "({x}, {y}) from {} has no finite image in {}",
                self.source, self.target
            )));
        }
        Ok((tx, ty))
    }

    /// Transforme une position en conservant z
    pub fn transform_position(&self, position: &Position) -> Result<Position, GeoError> {
        let (x, y) = self.transform_point(position.x, position.y)?;
        Ok(Position {
            x,
            y,
            z: position.z,
        })
    }

    /// Source → géographique WGS84 (radians)
    fn source_to_geographic(&self, x: f64, y: f64) -> Result<Geographic, GeoError> {
        match self.source {
            SupportedProjection::Wgs84 => {
                if !(-90.0..=90.0).contains(&y) {
                    return Err(GeoError::transform(format!(
                        "latitude {y} out of range [-90, 90]"
                    )));
                }
                Ok(Geographic::from_degrees(x, y))
            }
            SupportedProjection::WebMercator => Ok(mercator::web_mercator_to_geographic(x, y)),
            SupportedProjection::Bng => {
                let osgb36 = tmerc::BRITISH_NATIONAL_GRID.inverse(x, y);
                Ok(helmert::osgb36_to_wgs84(osgb36))
            }
        }
    }

    /// Géographique WGS84 → cible
    fn geographic_to_target(&self, geo: Geographic) -> (f64, f64) {
        match self.target {
            SupportedProjection::Wgs84 => geo.to_degrees(),
            SupportedProjection::WebMercator => mercator::geographic_to_web_mercator(geo),
            SupportedProjection::Bng => {
                let osgb36 = helmert::wgs84_to_osgb36(geo);
                tmerc::BRITISH_NATIONAL_GRID.forward(osgb36)
            }
        }
    }

    /// Transforme une géométrie en conservant sa structure
    pub fn transform_geometry(&self, geometry: &Geometry) -> Result<Geometry, GeoError> {
        if self.is_identity() {
            let mut non_finite = None;
            geometry.for_each_position(&mut |p| {
                if non_finite.is_none() && (!p.x.is_finite() || !p.y.is_finite()) {
                    non_finite = Some(*p);
                }
            });
            if let Some(p) = non_finite {
                self.transform_point(p.x, p.y)?;
            }
            return Ok(geometry.clone());
        }

        Ok(match geometry {
            Geometry::Point(p) => Geometry::Point(self.transform_position(p)?),
            Geometry::MultiPoint(ps) => Geometry::MultiPoint(self.transform_positions(ps)?),
            Geometry::LineString(ps) => Geometry::LineString(self.transform_positions(ps)?),
            Geometry::MultiLineString(lines) => {
                Geometry::MultiLineString(self.transform_rings(lines)?)
            }
            Geometry::Polygon(rings) => Geometry::Polygon(self.transform_rings(rings)?),
            Geometry::MultiPolygon(polygons) => Geometry::MultiPolygon(
                polygons
                    .iter()
                    .map(|rings| self.transform_rings(rings))
                    .collect::<Result<_, _>>()?,
            ),
            Geometry::GeometryCollection(members) => Geometry::GeometryCollection(
                members
                    .iter()
                    .map(|g| self.transform_geometry(g))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    /// Transforme la géométrie de chaque feature ; id et propriétés inchangés
    pub fn transform_features(&self, features: &[Feature]) -> Result<Vec<Feature>, GeoError> {
        features
            .iter()
            .map(|feature| {
                let geometry = feature
                    .geometry
                    .as_ref()
                    .map(|g| self.transform_geometry(g))
                    .transpose()?;
                Ok(Feature {
                    geometry,
                    ..feature.clone()
                })
            })
            .collect()
    }

    fn transform_positions(&self, positions: &[Position]) -> Result<Vec<Position>, GeoError> {
        positions
            .iter()
            .map(|p| self.transform_position(p))
            .collect()
    }

    fn transform_rings(&self, rings: &[Vec<Position>]) -> Result<Vec<Vec<Position>>, GeoError> {
        rings.iter().map(|r| self.transform_positions(r)).collect()
    }
}

/// Transforme une position entre deux projections
pub fn transform_coordinate(
    position: &Position,
    from: SupportedProjection,
    to: SupportedProjection,
) -> Result<Position, GeoError> {
    Reprojector::new(from, to).transform_position(position)
}

/// Transforme une géométrie entre deux projections
pub fn transform_geometry(
    geometry: &Geometry,
    from: SupportedProjection,
    to: SupportedProjection,
) -> Result<Geometry, GeoError> {
    Reprojector::new(from, to).transform_geometry(geometry)
}
