//! Descripteur Shapefile
//!
//! Le décodage d'archive ZIP (.shp/.shx/.dbf) est externe à ce crate : ce codec
//! reconnaît l'entrée pour la détection et signale qu'un décodeur doit être fourni
//! via `FormatRegistry::with_codec`. L'écriture retombe sur une FeatureCollection GeoJSON.

use super::{geojson, Codec, FormatName, FormatOptions};
use crate::types::{Feature, ParseResult};
use crate::GeoError;

/// Préfixes de data URL acceptés
const DATA_URL_PREFIXES: [&str; 3] = [
    "data:application/zip",
    "data:application/octet-stream",
    "data:application/x-zip",
];

/// Base64 de la signature ZIP `PK\x03\x04`
const ZIP_BASE64_MAGIC: &str = "UEs";

pub struct ShapefileCodec;

impl Codec for ShapefileCodec {
    fn name(&self) -> FormatName {
        FormatName::Shapefile
    }

    fn parse(&self, text: &str) -> ParseResult {
        if text.trim().is_empty() {
            return ParseResult::empty(FormatName::Shapefile);
        }
        ParseResult::failure(
            Some(FormatName::Shapefile),
            "Shapefile archives require an external decoder; register one with FormatRegistry::with_codec",
        )
    }

    fn format(&self, features: &[Feature], _options: &FormatOptions) -> Result<String, GeoError> {
        geojson::format(features)
    }

    fn detect(&self, text: &str) -> bool {
        let trimmed = text.trim();
        DATA_URL_PREFIXES.iter().any(|p| trimmed.starts_with(p))
            || trimmed.starts_with(ZIP_BASE64_MAGIC)
    }
}
