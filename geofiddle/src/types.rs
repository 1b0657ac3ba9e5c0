//! Types de données pour le crate geofiddle

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::parser::FormatName;
use crate::reproject::SupportedProjection;

/// Propriétés libres d'une feature (objet JSON)
pub type Properties = Map<String, Value>;

/// Position 2D ou 3D
///
/// `x`/`y` sont lon/lat en WGS84, easting/northing sinon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    pub fn with_z(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }

    /// Construit depuis un tableau `[x, y, z?]`, `None` si moins de 2 valeurs
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [x, y] => Some(Self::new(*x, *y)),
            [x, y, z, ..] => Some(Self::with_z(*x, *y, *z)),
            _ => None,
        }
    }

    /// Tableau `[x, y]` ou `[x, y, z]`
    pub fn to_vec(&self) -> Vec<f64> {
        match self.z {
            Some(z) => vec![self.x, self.y, z],
            None => vec![self.x, self.y],
        }
    }
}

/// Géométrie (union fermée)
///
/// Les anneaux de polygone suivent la convention GeoJSON : le premier est l'extérieur.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
    GeometryCollection(Vec<Geometry>),
}

impl Geometry {
    /// Nom du type, orthographe GeoJSON
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::MultiPoint(_) => "MultiPoint",
            Self::LineString(_) => "LineString",
            Self::MultiLineString(_) => "MultiLineString",
            Self::Polygon(_) => "Polygon",
            Self::MultiPolygon(_) => "MultiPolygon",
            Self::GeometryCollection(_) => "GeometryCollection",
        }
    }

    /// Parcourt toutes les positions dans l'ordre du document
    pub fn for_each_position<F: FnMut(&Position)>(&self, f: &mut F) {
        match self {
            Self::Point(p) => f(p),
            Self::MultiPoint(ps) | Self::LineString(ps) => ps.iter().for_each(f),
            Self::MultiLineString(rings) | Self::Polygon(rings) => {
                rings.iter().flatten().for_each(f)
            }
            Self::MultiPolygon(polygons) => polygons.iter().flatten().flatten().for_each(f),
            Self::GeometryCollection(members) => {
                for member in members {
                    member.for_each_position(f);
                }
            }
        }
    }

    /// Liste aplatie des positions
    pub fn positions(&self) -> Vec<Position> {
        let mut out = Vec::new();
        self.for_each_position(&mut |p| out.push(*p));
        out
    }

    /// Vrai si au moins une position porte une altitude
    pub fn has_z(&self) -> bool {
        let mut found = false;
        self.for_each_position(&mut |p| found |= p.z.is_some());
        found
    }
}

/// Une feature : géométrie optionnelle + propriétés
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Identifiant unique dans un `ParseResult`
    pub id: String,

    pub geometry: Option<Geometry>,

    pub properties: Properties,
}

impl Feature {
    pub fn new(id: impl Into<String>, geometry: Option<Geometry>) -> Self {
        Self {
            id: id.into(),
            geometry,
            properties: Properties::new(),
        }
    }

    /// Valeur textuelle d'une propriété (`name`, `description`...)
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

/// Erreur de parsing non fatale
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseError {
    pub message: String,

    /// Ligne (1-based) quand le format est orienté lignes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    pub fn at_line(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
        }
    }

    /// Préfixe le message (ex: "Object 2: ")
    pub fn prefixed(mut self, prefix: &str) -> Self {
        self.message.insert_str(0, prefix);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Résultat d'un parsing : features + erreurs non fatales + indices détectés
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseResult {
    pub features: Vec<Feature>,

    pub errors: Vec<ParseError>,

    pub detected_format: Option<FormatName>,

    pub detected_projection: Option<SupportedProjection>,
}

impl ParseResult {
    /// Résultat vide (entrée vide) pour un format
    pub fn empty(format: FormatName) -> Self {
        Self {
            detected_format: Some(format),
            ..Default::default()
        }
    }

    /// Échec total : une erreur, aucune feature
    pub fn failure(format: Option<FormatName>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![ParseError::new(message)],
            detected_format: format,
            ..Default::default()
        }
    }

    /// Toutes les positions de toutes les features
    pub fn positions(&self) -> Vec<Position> {
        let mut out = Vec::new();
        for geometry in self.features.iter().filter_map(|f| f.geometry.as_ref()) {
            geometry.for_each_position(&mut |p| out.push(*p));
        }
        out
    }

    pub fn has_features(&self) -> bool {
        !self.features.is_empty()
    }
}

/// Feature telle qu'extraite d'une source, avant attribution d'un identifiant
#[derive(Debug, Clone, Default)]
pub(crate) struct RawFeature {
    pub id: Option<String>,
    pub geometry: Option<Geometry>,
    pub properties: Properties,
}

impl RawFeature {
    pub fn from_geometry(geometry: Geometry) -> Self {
        Self {
            geometry: Some(geometry),
            ..Default::default()
        }
    }
}

/// Attribue les identifiants : id source si libre, sinon `feature-<index>`
pub(crate) fn assign_ids(raw: Vec<RawFeature>) -> Vec<Feature> {
    let mut used = HashSet::with_capacity(raw.len());
    let mut features = Vec::with_capacity(raw.len());

    for (index, item) in raw.into_iter().enumerate() {
        let mut id = match item.id {
            Some(id) if !used.contains(&id) => id,
            _ => format!("feature-{index}"),
        };
        // Collision possible avec un id source de la forme "feature-N"
        let mut suffix = 1;
        while used.contains(&id) {
            id = format!("feature-{index}-{suffix}");
            suffix += 1;
        }
        used.insert(id.clone());

        features.push(Feature {
            id,
            geometry: item.geometry,
            properties: item.properties,
        });
    }

    features
}

/// Écriture d'un nombre au plus court (aller-retour exact)
pub(crate) fn fmt_num(value: f64) -> String {
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_from_slice() {
        assert_eq!(Position::from_slice(&[1.0]), None);
        assert_eq!(Position::from_slice(&[1.0, 2.0]), Some(Position::new(1.0, 2.0)));
        assert_eq!(
            Position::from_slice(&[1.0, 2.0, 3.0, 4.0]),
            Some(Position::with_z(1.0, 2.0, 3.0))
        );
    }

    #[test]
    fn test_positions_flatten_collection() {
        let geometry = Geometry::GeometryCollection(vec![
            Geometry::Point(Position::new(0.0, 0.0)),
            Geometry::MultiPolygon(vec![vec![vec![
                Position::new(1.0, 1.0),
                Position::new(2.0, 1.0),
                Position::new(1.0, 1.0),
            ]]]),
        ]);
        assert_eq!(geometry.positions().len(), 4);
        assert!(!geometry.has_z());
    }

    #[test]
    fn test_assign_ids_keeps_source_ids_and_stays_unique() {
        let raw = vec![
            RawFeature {
                id: Some("a".to_string()),
                ..Default::default()
            },
            RawFeature {
                id: Some("a".to_string()),
                ..Default::default()
            },
            RawFeature::default(),
            RawFeature {
                id: Some("feature-4".to_string()),
                ..Default::default()
            },
            RawFeature::default(),
        ];
        let ids: Vec<String> = assign_ids(raw).into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec!["a", "feature-1", "feature-2", "feature-4", "feature-4-1"]);
    }

    #[test]
    fn test_fmt_num() {
        assert_eq!(fmt_num(530000.0), "530000");
        assert_eq!(fmt_num(-0.1276), "-0.1276");
    }
}
