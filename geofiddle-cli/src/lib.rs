//! # geofiddle-cli
//!
//! Conversion de géométries en ligne de commande.
//!
//! ## Usage CLI
//!
//! ```bash
//! # Détection automatique, sortie GeoJSON WGS84 sur stdout
//! echo "530000,180000" | geofiddle convert
//!
//! # Plusieurs fichiers en parallèle, sortie EWKT en British National Grid
//! geofiddle convert a.kml b.gpx --to ewkt --to-proj EPSG:27700 --output ./out --report report.json
//!
//! # Format et projection détectés
//! geofiddle detect route.txt
//! ```

pub mod config;
pub mod report;

pub use config::Config;
pub use report::{ConversionReport, ConversionStatus, FeatureMetrics, InputReport};
