//! Détection heuristique de projection et validation WGS84

use super::SupportedProjection;
use crate::types::Position;

/// Étendue maximale de la grille britannique (m)
const BNG_MAX_EXTENT: f64 = 1_300_000.0;
/// Demi-étendue Web Mercator (m)
const WEB_MERCATOR_MAX_EXTENT: f64 = 20_037_508.34;

/// Devine la projection d'après la plus grande valeur absolue de x ou y
///
/// ≤ 180 → WGS84, ≤ 1 300 000 → BNG, ≤ 20 037 508,34 → Web Mercator,
/// au-delà (ou sans coordonnée) → WGS84.
pub fn detect_projection_from_coordinates(positions: &[Position]) -> SupportedProjection {
    let max_abs = positions
        .iter()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .map(|p| p.x.abs().max(p.y.abs()))
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));

    match max_abs {
        Some(v) if v <= 180.0 => SupportedProjection::Wgs84,
        Some(v) if v <= BNG_MAX_EXTENT => SupportedProjection::Bng,
        Some(v) if v <= WEB_MERCATOR_MAX_EXTENT => SupportedProjection::WebMercator,
        _ => SupportedProjection::Wgs84,
    }
}

/// lon ∈ [-180, 180] et lat ∈ [-90, 90]
pub fn is_valid_wgs84(position: &Position) -> bool {
    (-180.0..=180.0).contains(&position.x) && (-90.0..=90.0).contains(&position.y)
}

/// Première position hors des bornes WGS84
pub fn validate_wgs84(positions: &[Position]) -> Result<(), Position> {
    match positions.iter().find(|p| !is_valid_wgs84(p)) {
        Some(p) => Err(*p),
        None => Ok(()),
    }
}
