//! Types d'erreurs pour le crate geofiddle

use thiserror::Error;

/// Erreurs des opérations qui peuvent échouer franchement
/// (formatage, reprojection, décodage polyline, pipeline de conversion).
///
/// Le parsing ne renvoie jamais cette erreur : il remplit `ParseResult::errors`.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Nom de format inconnu du registre
    #[error("Unsupported format: {0}")]
    UnknownFormat(String),

    /// Projection non reconnue
    #[error("Unsupported projection: {0}")]
    UnknownProjection(String),

    /// Échec de transformation d'une coordonnée
    #[error("Coordinate transformation failed: {0}")]
    Transform(String),

    /// Chaîne polyline invalide
    #[error("Invalid polyline at offset {offset}: {reason}")]
    InvalidPolyline { offset: usize, reason: String },

    /// Coordonnée non encodable en polyline
    #[error("Coordinate {index} cannot be encoded as polyline: ({x}, {y})")]
    PolylineRange { index: usize, x: f64, y: f64 },

    /// Erreur de sérialisation JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Format d'entrée non détecté
    #[error("Could not auto-detect input format")]
    UndetectedFormat,

    /// Aucune feature exploitable après parsing
    #[error("No features parsed: {0}")]
    NoFeatures(String),
}

impl GeoError {
    /// Crée une erreur de transformation avec contexte
    pub fn transform(reason: impl Into<String>) -> Self {
        Self::Transform(reason.into())
    }

    /// Crée une erreur polyline positionnée
    pub fn invalid_polyline(offset: usize, reason: impl Into<String>) -> Self {
        Self::InvalidPolyline {
            offset,
            reason: reason.into(),
        }
    }
}
