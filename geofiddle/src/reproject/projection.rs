//! Projections prises en charge et leurs définitions

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::GeoError;

/// Système de coordonnées pris en charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SupportedProjection {
    /// EPSG:4326, degrés lon/lat
    #[default]
    Wgs84,
    /// EPSG:3857, mètres
    WebMercator,
    /// EPSG:27700, mètres (OSGB36)
    Bng,
}

/// Définition d'une projection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionDefinition {
    pub code: &'static str,
    pub label: &'static str,
    pub proj4: &'static str,
    pub units: &'static str,
}

const WGS84_DEFINITION: ProjectionDefinition = ProjectionDefinition {
    code: "EPSG:4326",
    label: "WGS84 (lon/lat)",
    proj4: "+proj=longlat +datum=WGS84 +no_defs",
    units: "degrees",
};

const WEB_MERCATOR_DEFINITION: ProjectionDefinition = ProjectionDefinition {
    code: "EPSG:3857",
    label: "Web Mercator",
    proj4: "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +wktext +no_defs",
    units: "metres",
};

const BNG_DEFINITION: ProjectionDefinition = ProjectionDefinition {
    code: "EPSG:27700",
    label: "British National Grid",
    proj4: "+proj=tmerc +lat_0=49 +lon_0=-2 +k=0.9996012717 +x_0=400000 +y_0=-100000 +ellps=airy +towgs84=446.448,-125.157,542.06,0.15,0.247,0.842,-20.489 +units=m +no_defs",
    units: "metres",
};

impl SupportedProjection {
    pub const ALL: [SupportedProjection; 3] = [
        SupportedProjection::Wgs84,
        SupportedProjection::WebMercator,
        SupportedProjection::Bng,
    ];

    pub fn definition(&self) -> &'static ProjectionDefinition {
        match self {
            SupportedProjection::Wgs84 => &WGS84_DEFINITION,
            SupportedProjection::WebMercator => &WEB_MERCATOR_DEFINITION,
            SupportedProjection::Bng => &BNG_DEFINITION,
        }
    }

    /// Code EPSG numérique
    pub fn epsg(self) -> u32 {
        match self {
            SupportedProjection::Wgs84 => 4326,
            SupportedProjection::WebMercator => 3857,
            SupportedProjection::Bng => 27700,
        }
    }

    /// Code `EPSG:xxxx`
    pub fn code(&self) -> &'static str {
        self.definition().code
    }

    pub fn label(&self) -> &'static str {
        self.definition().label
    }

    /// Coordonnées en degrés (par opposition aux mètres)
    pub fn is_geographic(&self) -> bool {
        matches!(self, SupportedProjection::Wgs84)
    }

    /// Projection correspondant à un SRID EWKT, `None` si inconnu
    pub fn from_srid(srid: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.epsg() == srid)
    }
}

impl fmt::Display for SupportedProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for SupportedProjection {
    type Err = GeoError;

    /// Accepte `EPSG:xxxx`, le code seul ou un alias (`wgs84`, `webmercator`, `bng`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let code = normalized.strip_prefix("epsg:").unwrap_or(&normalized);

        match code {
            "4326" | "wgs84" => Ok(SupportedProjection::Wgs84),
            "3857" | "webmercator" | "web-mercator" => Ok(SupportedProjection::WebMercator),
            "27700" | "bng" | "osgb" => Ok(SupportedProjection::Bng),
            _ => Err(GeoError::UnknownProjection(s.trim().to_string())),
        }
    }
}

impl Serialize for SupportedProjection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codes_and_aliases() {
        for (input, expected) in [
            ("EPSG:4326", SupportedProjection::Wgs84),
            ("epsg:3857", SupportedProjection::WebMercator),
            ("27700", SupportedProjection::Bng),
            (" WGS84 ", SupportedProjection::Wgs84),
            ("WebMercator", SupportedProjection::WebMercator),
            ("bng", SupportedProjection::Bng),
        ] {
            assert_eq!(input.parse::<SupportedProjection>().unwrap(), expected, "{input}");
        }
        assert!(matches!(
            "EPSG:2154".parse::<SupportedProjection>(),
            Err(GeoError::UnknownProjection(code)) if code == "EPSG:2154"
        ));
    }

    #[test]
    fn test_from_srid() {
        assert_eq!(SupportedProjection::from_srid(27700), Some(SupportedProjection::Bng));
        assert_eq!(SupportedProjection::from_srid(2154), None);
    }

    #[test]
    fn test_display_and_serialize() {
        assert_eq!(SupportedProjection::Bng.to_string(), "EPSG:27700");
        assert_eq!(
            serde_json::to_string(&SupportedProjection::WebMercator).unwrap(),
            "\"EPSG:3857\""
        );
        assert_eq!(SupportedProjection::Bng.label(), "British National Grid");
    }
}
