//! Définitions des ellipsoïdes

/// Ellipsoïde de référence défini par ses demi-axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Demi-grand axe (rayon équatorial) en mètres
    pub a: f64,
    /// Demi-petit axe (rayon polaire) en mètres
    pub b: f64,
}

impl Ellipsoid {
    /// Première excentricité au carré
    pub const fn e2(&self) -> f64 {
        (self.a * self.a - self.b * self.b) / (self.a * self.a)
    }
}

/// Ellipsoïde WGS84
pub const WGS84: Ellipsoid = Ellipsoid {
    a: 6378137.0,
    b: 6356752.314245,
};

/// Ellipsoïde Airy 1830 (OSGB36, British National Grid)
pub const AIRY1830: Ellipsoid = Ellipsoid {
    a: 6377563.396,
    b: 6356256.909,
};
