//! Projection Web Mercator (EPSG:3857)
//!
//! Aussi connu sous le nom de Pseudo-Mercator ou Spherical Mercator.
//! Modèle sphérique de rayon égal au demi-grand axe WGS84.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use super::ellipsoid::WGS84;
use super::Geographic;

/// Latitude limite (degrés) : la carte Web Mercator est carrée
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// Demi-étendue de la projection en mètres (π·R)
pub const HALF_EXTENT: f64 = 20_037_508.342_789_244;

/// Convertit coordonnées géographiques vers Web Mercator
pub fn geographic_to_web_mercator(geo: Geographic) -> (f64, f64) {
    let r = WGS84.a;

    // Limiter la latitude pour éviter l'infini aux pôles
    let lat = geo
        .lat
        .clamp(-MAX_LATITUDE.to_radians(), MAX_LATITUDE.to_radians());

    let x = r * geo.lon;
    let y = r * (FRAC_PI_4 + lat / 2.0).tan().ln();

    (x, y)
}

/// Convertit Web Mercator vers coordonnées géographiques
pub fn web_mercator_to_geographic(x: f64, y: f64) -> Geographic {
    let r = WGS84.a;

    let lon = x / r;
    let lat = 2.0 * (y / r).exp().atan() - FRAC_PI_2;

    Geographic::new(lon, lat)
}
