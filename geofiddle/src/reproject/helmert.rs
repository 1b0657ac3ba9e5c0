//! Changement de datum par transformation de Helmert à 7 paramètres
//!
//! Convention « position vector » (celle de `+towgs84`) :
//! X' = T + (1 + s)·R·X, rotations petites en secondes d'arc.

use super::ellipsoid::{Ellipsoid, AIRY1830, WGS84};
use super::Geographic;

const ARCSEC_TO_RAD: f64 = std::f64::consts::PI / (180.0 * 3600.0);
const LATITUDE_TOLERANCE: f64 = 1e-12;
const MAX_ITERATIONS: usize = 16;
const INVERSE_ITERATIONS: usize = 4;

/// Paramètres vers WGS84 (translations en m, rotations en ″, échelle en ppm)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Helmert {
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
    pub s_ppm: f64,
}

/// OSGB36 → WGS84, `+towgs84=446.448,-125.157,542.06,0.15,0.247,0.842,-20.489`
pub const OSGB36_TO_WGS84: Helmert = Helmert {
    tx: 446.448,
    ty: -125.157,
    tz: 542.06,
    rx: 0.15,
    ry: 0.247,
    rz: 0.842,
    s_ppm: -20.489,
};

/// Coordonnées cartésiennes géocentriques (m)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cartesian {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Helmert {
    fn rotations(&self) -> (f64, f64, f64) {
        (
            self.rx * ARCSEC_TO_RAD,
            self.ry * ARCSEC_TO_RAD,
            self.rz * ARCSEC_TO_RAD,
        )
    }

    fn scale(&self) -> f64 {
        1.0 + self.s_ppm * 1e-6
    }

    /// Datum source → WGS84
    pub fn apply(&self, c: Cartesian) -> Cartesian {
        let (rx, ry, rz) = self.rotations();
        let m = self.scale();
        Cartesian {
            x: self.tx + m * (c.x - rz * c.y + ry * c.z),
            y: self.ty + m * (rz * c.x + c.y - rx * c.z),
            z: self.tz + m * (-ry * c.x + rx * c.y + c.z),
        }
    }

    /// WGS84 → datum source
    ///
    /// Résout `(I + R)·X = (X' - T) / (1 + s)` par itération de point fixe,
    /// la partie antisymétrique de `R` étant de l'ordre de 1e-5.
    pub fn invert(&self, c: Cartesian) -> Cartesian {
        let (rx, ry, rz) = self.rotations();
        let m = self.scale();
        let b = Cartesian {
            x: (c.x - self.tx) / m,
            y: (c.y - self.ty) / m,
            z: (c.z - self.tz) / m,
        };

        let mut x = b;
        for _ in 0..INVERSE_ITERATIONS {
            x = Cartesian {
                x: b.x + rz * x.y - ry * x.z,
                y: b.y - rz * x.x + rx * x.z,
                z: b.z + ry * x.x - rx * x.y,
            };
        }
        x
    }
}

/// Géographique (hauteur nulle) → cartésien géocentrique
pub fn geographic_to_cartesian(geo: Geographic, ellipsoid: &Ellipsoid) -> Cartesian {
    let e2 = ellipsoid.e2();
    let (sin_lat, cos_lat) = geo.lat.sin_cos();
    let (sin_lon, cos_lon) = geo.lon.sin_cos();
    let nu = ellipsoid.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();

    Cartesian {
        x: nu * cos_lat * cos_lon,
        y: nu * cos_lat * sin_lon,
        z: nu * (1.0 - e2) * sin_lat,
    }
}

/// Cartésien géocentrique → géographique, hauteur ignorée
pub fn cartesian_to_geographic(c: Cartesian, ellipsoid: &Ellipsoid) -> Geographic {
    let e2 = ellipsoid.e2();
    let lon = c.y.atan2(c.x);
    let p = c.x.hypot(c.y);

    let mut lat = c.z.atan2(p * (1.0 - e2));
    for _ in 0..MAX_ITERATIONS {
        let sin_lat = lat.sin();
        let nu = ellipsoid.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let next = (c.z + e2 * nu * sin_lat).atan2(p);
        let converged = (next - lat).abs() < LATITUDE_TOLERANCE;
        lat = next;
        if converged {
            break;
        }
    }

    Geographic::new(lon, lat)
}

/// OSGB36 (Airy 1830) → WGS84
pub fn osgb36_to_wgs84(geo: Geographic) -> Geographic {
    let cartesian = geographic_to_cartesian(geo, &AIRY1830);
    cartesian_to_geographic(OSGB36_TO_WGS84.apply(cartesian), &WGS84)
}

/// WGS84 → OSGB36 (Airy 1830)
pub fn wgs84_to_osgb36(geo: Geographic) -> Geographic {
    let cartesian = geographic_to_cartesian(geo, &WGS84);
    cartesian_to_geographic(OSGB36_TO_WGS84.invert(cartesian), &AIRY1830)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cartesian_roundtrip() {
        let geo = Geographic::from_degrees(-3.2, 55.95);
        let back = cartesian_to_geographic(geographic_to_cartesian(geo, &WGS84), &WGS84);
        assert!((back.lat - geo.lat).abs() < 1e-12, "lat={}", back.lat);
        assert!((back.lon - geo.lon).abs() < 1e-12, "lon={}", back.lon);
    }

    #[test]
    fn test_helmert_inverse() {
        let c = Cartesian {
            x: 3_874_938.849,
            y: -116_218.623,
            z: 5_047_168.207,
        };
        let back = OSGB36_TO_WGS84.invert(OSGB36_TO_WGS84.apply(c));
        assert!((back.x - c.x).abs() < 1e-6, "x={}", back.x);
        assert!((back.y - c.y).abs() < 1e-6, "y={}", back.y);
        assert!((back.z - c.z).abs() < 1e-6, "z={}", back.z);
    }

    #[test]
    fn test_datum_shift_magnitude() {
        // Décalage OSGB36/WGS84 de l'ordre de 100 m en Grande-Bretagne ;
        // la hauteur n'est pas propagée, l'aller-retour reste au centimètre
        let osgb = Geographic::from_degrees(-0.1276, 51.5074);
        let (lon, lat) = osgb36_to_wgs84(osgb).to_degrees();
        let dlon = (lon - -0.1276) * 111_320.0 * 51.5074_f64.to_radians().cos();
        let dlat = (lat - 51.5074) * 111_320.0;
        let shift = dlon.hypot(dlat);
        assert!(shift > 50.0 && shift < 200.0, "shift={}", shift);

        let (lon2, lat2) = wgs84_to_osgb36(Geographic::from_degrees(lon, lat)).to_degrees();
        assert!((lon2 - -0.1276).abs() < 1e-7, "lon={}", lon2);
        assert!((lat2 - 51.5074).abs() < 1e-7, "lat={}", lat2);
    }
}
