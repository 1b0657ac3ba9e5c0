//! # geofiddle
//!
//! Détection, parsing, reprojection et export de géométries collées sous forme de texte.
//!
//! ## Features
//!
//! - Formats : GeoJSON, WKT, EWKT, KML, GPX, Polyline (précision 5 et 6), CSV/DSV
//! - Détection automatique du format par ordre de priorité fixe
//! - Succès partiel : les erreurs de parsing sont des valeurs, jamais des paniques
//! - Reprojection en Rust pur : WGS84, Web Mercator, British National Grid
//! - Détection heuristique de la projection d'après l'amplitude des coordonnées
//! - Mesures géodésiques via le crate `geo`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use geofiddle::{convert, ConvertOptions, FormatName, FormatRegistry, SupportedProjection};
//!
//! let registry = FormatRegistry::new();
//! let options = ConvertOptions {
//!     output_format: FormatName::Wkt,
//!     output_projection: SupportedProjection::Wgs84,
//!     ..Default::default()
//! };
//!
//! let conversion = convert(&registry, "530000,180000", &options)?;
//! println!("{} → {}", conversion.source_projection, conversion.output);
//! ```

pub mod convert;
pub mod error;
pub mod metrics;
pub mod parser;
pub mod reproject;
pub mod tokenizer;
pub mod types;

pub use convert::{convert, ConvertOptions, Conversion, ProjectionSource};
pub use error::GeoError;
pub use metrics::Envelope;
pub use parser::{Codec, FormatName, FormatOptions, FormatRegistry};
pub use reproject::{
    detect_projection_from_coordinates, transform_coordinate, transform_geometry, Reprojector,
    SupportedProjection,
};
pub use types::{Feature, Geometry, ParseError, ParseResult, Position, Properties};
