//! Codecs de formats et registre d'auto-détection
//!
//! Chaque codec expose `parse`, `format` et `detect`. Le registre les garde dans un
//! ordre de priorité fixe : les grammaires se recouvrent (un corps EWKT sans son
//! préfixe SRID est du WKT, presque tout ressemble à du CSV).

pub mod csv;
pub mod geojson;
pub mod gpx;
pub mod kml;
pub mod polyline;
pub mod shapefile;
pub mod wkt;
mod xml;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::reproject::SupportedProjection;
use crate::types::{Feature, ParseResult};
use crate::GeoError;

/// Formats supportés, dans l'ordre de priorité de détection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatName {
    GeoJson,
    Ewkt,
    Wkt,
    Kml,
    Gpx,
    Shapefile,
    Polyline5,
    Polyline6,
    Csv,
}

impl FormatName {
    /// Tous les formats, ordre de priorité de détection
    pub const ALL: [FormatName; 9] = [
        Self::GeoJson,
        Self::Ewkt,
        Self::Wkt,
        Self::Kml,
        Self::Gpx,
        Self::Shapefile,
        Self::Polyline5,
        Self::Polyline6,
        Self::Csv,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GeoJson => "geojson",
            Self::Ewkt => "ewkt",
            Self::Wkt => "wkt",
            Self::Kml => "kml",
            Self::Gpx => "gpx",
            Self::Shapefile => "shapefile",
            Self::Polyline5 => "polyline5",
            Self::Polyline6 => "polyline6",
            Self::Csv => "csv",
        }
    }

    /// Libellé d'affichage
    pub fn label(self) -> &'static str {
        match self {
            Self::GeoJson => "GeoJSON",
            Self::Ewkt => "EWKT",
            Self::Wkt => "WKT",
            Self::Kml => "KML",
            Self::Gpx => "GPX",
            Self::Shapefile => "Shapefile",
            Self::Polyline5 => "Polyline (precision 5)",
            Self::Polyline6 => "Polyline (precision 6)",
            Self::Csv => "CSV/DSV",
        }
    }

    /// Extension de fichier pour une sortie dans ce format
    pub fn extension(self) -> &'static str {
        match self {
            Self::GeoJson | Self::Shapefile => "geojson",
            Self::Ewkt => "ewkt",
            Self::Wkt => "wkt",
            Self::Kml => "kml",
            Self::Gpx => "gpx",
            Self::Polyline5 | Self::Polyline6 => "txt",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for FormatName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatName {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| GeoError::UnknownFormat(name.to_string()))
    }
}

/// Options de formatage
///
/// Seul EWKT lit `projection` (choix du SRID), les autres codecs l'ignorent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatOptions {
    pub projection: Option<String>,
}

impl FormatOptions {
    pub fn for_projection(projection: SupportedProjection) -> Self {
        Self {
            projection: Some(projection.code().to_string()),
        }
    }
}

/// Contrat d'un codec de format
///
/// `parse` et `detect` ne paniquent pas et ne renvoient jamais d'erreur :
/// les échecs sont portés par `ParseResult::errors`.
pub trait Codec: Send + Sync {
    fn name(&self) -> FormatName;

    fn parse(&self, text: &str) -> ParseResult;

    fn format(&self, features: &[Feature], options: &FormatOptions) -> Result<String, GeoError>;

    fn detect(&self, text: &str) -> bool;
}

/// Registre immuable des codecs, construit une fois puis partagé par référence
pub struct FormatRegistry {
    codecs: Vec<Box<dyn Codec>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatRegistry {
    /// Registre complet dans l'ordre de priorité de détection
    pub fn new() -> Self {
        let codecs: Vec<Box<dyn Codec>> = vec![
            Box::new(geojson::GeoJsonCodec),
            Box::new(wkt::EwktCodec),
            Box::new(wkt::WktCodec),
            Box::new(kml::KmlCodec),
            Box::new(gpx::GpxCodec),
            Box::new(shapefile::ShapefileCodec),
            Box::new(polyline::PolylineCodec::new(5)),
            Box::new(polyline::PolylineCodec::new(6)),
            Box::new(csv::CsvCodec),
        ];
        Self { codecs }
    }

    /// Remplace le codec de même nom (même rang de priorité) ou l'ajoute en fin
    pub fn with_codec(mut self, codec: Box<dyn Codec>) -> Self {
        match self.codecs.iter().position(|c| c.name() == codec.name()) {
            Some(index) => self.codecs[index] = codec,
            None => self.codecs.push(codec),
        }
        self
    }

    pub fn get(&self, name: FormatName) -> Option<&dyn Codec> {
        self.codecs
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    /// Noms des formats enregistrés, ordre de priorité
    pub fn names(&self) -> impl Iterator<Item = FormatName> + '_ {
        self.codecs.iter().map(|c| c.name())
    }

    /// Parse avec le format nommé ; nom inconnu → une erreur, aucune feature
    pub fn parse(&self, text: &str, format: &str) -> ParseResult {
        match self.lookup(format) {
            Ok(codec) => codec.parse(text),
            Err(e) => ParseResult::failure(None, e.to_string()),
        }
    }

    /// Formate avec le format nommé ; nom inconnu → erreur
    pub fn format(
        &self,
        features: &[Feature],
        format: &str,
        options: &FormatOptions,
    ) -> Result<String, GeoError> {
        self.lookup(format)?.format(features, options)
    }

    /// Premier codec dont `detect` accepte le texte, `None` si vide ou inconnu
    pub fn detect_format(&self, text: &str) -> Option<FormatName> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        self.codecs
            .iter()
            .find(|c| c.detect(trimmed))
            .map(|c| c.name())
    }

    fn lookup(&self, format: &str) -> Result<&dyn Codec, GeoError> {
        let name = FormatName::from_str(format)?;
        self.get(name)
            .ok_or_else(|| GeoError::UnknownFormat(format.to_string()))
    }
}
