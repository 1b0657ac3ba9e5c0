//! Projection Transverse Mercator (formules de l'Ordnance Survey)
//!
//! Séries de Redfearn telles que publiées dans « A guide to coordinate systems
//! in Great Britain », annexe C. Précision millimétrique dans l'emprise de la grille.

use super::ellipsoid::{Ellipsoid, AIRY1830};
use super::Geographic;

/// Seuil de convergence de l'arc méridien inverse (0,01 mm)
const MERIDIAN_TOLERANCE: f64 = 1e-5;
const MAX_ITERATIONS: usize = 32;

/// Paramètres d'une projection Transverse Mercator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    pub ellipsoid: Ellipsoid,
    /// Facteur d'échelle sur le méridien central
    pub k0: f64,
    /// Latitude d'origine (degrés)
    pub lat0: f64,
    /// Méridien central (degrés)
    pub lon0: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

/// British National Grid (EPSG:27700) sur Airy 1830
pub const BRITISH_NATIONAL_GRID: TransverseMercator = TransverseMercator {
    ellipsoid: AIRY1830,
    k0: 0.9996012717,
    lat0: 49.0,
    lon0: -2.0,
    false_easting: 400_000.0,
    false_northing: -100_000.0,
};

/// Rayons de courbure au point de latitude `lat`
struct Curvature {
    /// ν : rayon de la grande normale, multiplié par k0
    nu: f64,
    /// ρ : rayon méridien, multiplié par k0
    rho: f64,
    /// η² = ν/ρ − 1
    eta2: f64,
}

impl TransverseMercator {
    fn curvature(&self, lat: f64) -> Curvature {
        let a = self.ellipsoid.a;
        let e2 = self.ellipsoid.e2();
        let s2 = 1.0 - e2 * lat.sin().powi(2);

        let nu = a * self.k0 / s2.sqrt();
        let rho = a * self.k0 * (1.0 - e2) / s2.powf(1.5);
        Curvature {
            nu,
            rho,
            eta2: nu / rho - 1.0,
        }
    }

    /// Arc méridien M entre la latitude d'origine et `lat`, en mètres
    fn meridian_arc(&self, lat: f64) -> f64 {
        let Ellipsoid { a, b } = self.ellipsoid;
        let n = (a - b) / (a + b);
        let (n2, n3) = (n * n, n * n * n);
        let lat0 = self.lat0.to_radians();
        let dl = lat - lat0;
        let sl = lat + lat0;

        b * self.k0
            * ((1.0 + n + 1.25 * n2 + 1.25 * n3) * dl
                - (3.0 * n + 3.0 * n2 + 2.625 * n3) * dl.sin() * sl.cos()
                + (1.875 * n2 + 1.875 * n3) * (2.0 * dl).sin() * (2.0 * sl).cos()
                - (35.0 / 24.0) * n3 * (3.0 * dl).sin() * (3.0 * sl).cos())
    }

    /// Géographique (sur l'ellipsoïde de la projection) → (easting, northing)
    pub fn forward(&self, geo: Geographic) -> (f64, f64) {
        let lat = geo.lat;
        let dlon = geo.lon - self.lon0.to_radians();
        let Curvature { nu, rho, eta2 } = self.curvature(lat);

        let (sin, cos) = lat.sin_cos();
        let tan2 = lat.tan().powi(2);
        let tan4 = tan2 * tan2;

        let i = self.meridian_arc(lat) + self.false_northing;
        let ii = nu / 2.0 * sin * cos;
        let iii = nu / 24.0 * sin * cos.powi(3) * (5.0 - tan2 + 9.0 * eta2);
        let iiia = nu / 720.0 * sin * cos.powi(5) * (61.0 - 58.0 * tan2 + tan4);
        let iv = nu * cos;
        let v = nu / 6.0 * cos.powi(3) * (nu / rho - tan2);
        let vi = nu / 120.0
            * cos.powi(5)
            * (5.0 - 18.0 * tan2 + tan4 + 14.0 * eta2 - 58.0 * tan2 * eta2);

        let northing = i + ii * dlon.powi(2) + iii * dlon.powi(4) + iiia * dlon.powi(6);
        let easting = self.false_easting + iv * dlon + v * dlon.powi(3) + vi * dlon.powi(5);

        (easting, northing)
    }

    /// (easting, northing) → géographique sur l'ellipsoïde de la projection
    pub fn inverse(&self, easting: f64, northing: f64) -> Geographic {
        let a_k0 = self.ellipsoid.a * self.k0;
        let dn = northing - self.false_northing;

        // Latitude du pied de la verticale par itération sur l'arc méridien
        let mut lat = dn / a_k0 + self.lat0.to_radians();
        for _ in 0..MAX_ITERATIONS {
            let residual = dn - self.meridian_arc(lat);
            if residual.abs() < MERIDIAN_TOLERANCE {
                break;
            }
            lat += residual / a_k0;
        }

        let Curvature { nu, rho, eta2 } = self.curvature(lat);
        let tan = lat.tan();
        let (tan2, tan4) = (tan * tan, tan.powi(4));
        let tan6 = tan4 * tan2;
        let sec = 1.0 / lat.cos();

        let vii = tan / (2.0 * rho * nu);
        let viii = tan / (24.0 * rho * nu.powi(3)) * (5.0 + 3.0 * tan2 + eta2 - 9.0 * tan2 * eta2);
        let ix = tan / (720.0 * rho * nu.powi(5)) * (61.0 + 90.0 * tan2 + 45.0 * tan4);
        let x = sec / nu;
        let xi = sec / (6.0 * nu.powi(3)) * (nu / rho + 2.0 * tan2);
        let xii = sec / (120.0 * nu.powi(5)) * (5.0 + 28.0 * tan2 + 24.0 * tan4);
        let xiia = sec / (5040.0 * nu.powi(7)) * (61.0 + 662.0 * tan2 + 1320.0 * tan4 + 720.0 * tan6);

        let de = easting - self.false_easting;
        let lat_out = lat - vii * de.powi(2) + viii * de.powi(4) - ix * de.powi(6);
        let lon_out = self.lon0.to_radians() + x * de - xi * de.powi(3) + xii * de.powi(5)
            - xiia * de.powi(7);

        Geographic::new(lon_out, lat_out)
    }
}
