//! Rapport de conversion avec succès partiel
//!
//! Un `InputReport` par entrée, agrégés dans un `ConversionReport`.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use geofiddle::metrics::{area, count_coordinates, format_area, format_length, length, type_label};
use geofiddle::reproject::validate_wgs84;
use geofiddle::{Conversion, Feature, Geometry, Reprojector, SupportedProjection};
use serde::Serialize;

/// Nombre maximal de lignes détaillées à l'affichage
const DISPLAY_LIMIT: usize = 10;

/// Statut d'une entrée ou de l'ensemble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConversionStatus {
    /// Conversion sans erreur
    Success,
    /// Conversion réussie avec des erreurs de parsing non fatales
    PartialSuccess,
    /// Aucune feature produite
    Failed,
}

/// Mesures d'une feature, aire et longueur géodésiques calculées en WGS84
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMetrics {
    pub id: String,
    /// Type lisible (`Multi Line String`)
    pub geometry: String,
    pub coordinates: usize,
    /// m², polygones uniquement
    pub area: Option<f64>,
    /// m, lignes uniquement
    pub length: Option<f64>,
}

impl FeatureMetrics {
    /// `projection` est celle des coordonnées de la feature
    pub fn new(feature: &Feature, projection: SupportedProjection) -> Self {
        let geometry = feature.geometry.as_ref();
        let wgs84 = geometry.and_then(|g| {
            Reprojector::new(projection, SupportedProjection::Wgs84)
                .transform_geometry(g)
                .ok()
        });

        Self {
            id: feature.id.clone(),
            geometry: type_label(geometry.map(Geometry::type_name)),
            coordinates: count_coordinates(geometry),
            area: area(wgs84.as_ref()),
            length: length(wgs84.as_ref()),
        }
    }

    /// Mesures de toutes les features
    pub fn collect(features: &[Feature], projection: SupportedProjection) -> Vec<Self> {
        features
            .iter()
            .map(|f| Self::new(f, projection))
            .collect()
    }

    /// `id: Type, n coordinates[, area ...][, length ...]`
    pub fn describe(&self) -> String {
        let mut out = format!(
            "{}: {}, {} coordinates",
            self.id, self.geometry, self.coordinates
        );
        if self.area.is_some() {
            out.push_str(&format!(", area {}", format_area(self.area)));
        }
        if self.length.is_some() {
            out.push_str(&format!(", length {}", format_length(self.length)));
        }
        out
    }
}

/// Avertissement si des coordonnées WGS84 sortent de [-180, 180] × [-90, 90]
pub fn wgs84_warning(features: &[Feature], projection: SupportedProjection) -> Option<String> {
    if projection != SupportedProjection::Wgs84 {
        return None;
    }
    let mut positions = Vec::new();
    for geometry in features.iter().filter_map(|f| f.geometry.as_ref()) {
        geometry.for_each_position(&mut |p| positions.push(*p));
    }
    validate_wgs84(&positions).err().map(|p| {
        format!(
            "coordinate ({}, {}) is outside WGS84 bounds",
            p.x, p.y
        )
    })
}

/// Résultat d'une entrée
#[derive(Debug, Clone, Serialize)]
pub struct InputReport {
    /// Fichier source, `-` pour stdin
    pub input: String,
    pub status: ConversionStatus,
    pub input_format: Option<String>,
    pub source_projection: Option<String>,
    /// `explicit`, `format` ou `heuristic`
    pub projection_source: Option<String>,
    pub output_format: Option<String>,
    pub output_projection: Option<String>,
    pub features: usize,
    pub coordinates: usize,
    /// Emprise SW/NE dans la projection de sortie
    pub envelope: Option<String>,
    pub output_file: Option<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Mesures par feature, dans l'ordre de sortie
    pub feature_metrics: Vec<FeatureMetrics>,
}

impl InputReport {
    /// Rapport d'une conversion aboutie
    pub fn from_conversion(input: &str, conversion: &Conversion) -> Self {
        let coordinates = conversion
            .features
            .iter()
            .map(|f| count_coordinates(f.geometry.as_ref()))
            .sum();

        Self {
            input: input.to_string(),
            status: if conversion.is_partial() {
                ConversionStatus::PartialSuccess
            } else {
                ConversionStatus::Success
            },
            input_format: Some(conversion.input_format.to_string()),
            source_projection: Some(conversion.source_projection.to_string()),
            projection_source: serde_json::to_value(conversion.projection_source)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string)),
            output_format: Some(conversion.output_format.to_string()),
            output_projection: Some(conversion.output_projection.to_string()),
            features: conversion.features.len(),
            coordinates,
            envelope: conversion.envelope.map(|e| e.to_string()),
            output_file: None,
            errors: conversion.errors.iter().map(ToString::to_string).collect(),
            warnings: wgs84_warning(&conversion.features, conversion.output_projection)
                .into_iter()
                .collect(),
            feature_metrics: FeatureMetrics::collect(
                &conversion.features,
                conversion.output_projection,
            ),
        }
    }

    /// Rapport d'une entrée en échec
    pub fn failed(input: &str, message: &str) -> Self {
        Self {
            input: input.to_string(),
            status: ConversionStatus::Failed,
            input_format: None,
            source_projection: None,
            projection_source: None,
            output_format: None,
            output_projection: None,
            features: 0,
            coordinates: 0,
            envelope: None,
            output_file: None,
            errors: vec![message.to_string()],
            warnings: Vec::new(),
            feature_metrics: Vec::new(),
        }
    }
}

/// Rapport complet d'un lot de conversions
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub duration_secs: f64,
    pub status: ConversionStatus,
    pub inputs_processed: usize,
    pub inputs_failed: usize,
    pub features_converted: usize,
    pub inputs: Vec<InputReport>,
}

impl Default for ConversionReport {
    fn default() -> Self {
        Self {
            duration_secs: 0.0,
            status: ConversionStatus::Success,
            inputs_processed: 0,
            inputs_failed: 0,
            features_converted: 0,
            inputs: Vec::new(),
        }
    }
}

impl ConversionReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enregistre le résultat d'une entrée
    pub fn record(&mut self, input: InputReport) {
        self.inputs_processed += 1;
        if input.status == ConversionStatus::Failed {
            self.inputs_failed += 1;
        }
        self.features_converted += input.features;
        self.inputs.push(input);
    }

    /// Définit la durée du traitement
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        let has_success = self.inputs_failed < self.inputs_processed;
        let has_errors = self
            .inputs
            .iter()
            .any(|i| i.status != ConversionStatus::Success);

        self.status = if !has_success {
            ConversionStatus::Failed
        } else if has_errors {
            ConversionStatus::PartialSuccess
        } else {
            ConversionStatus::Success
        };
    }

    /// Affiche le rapport sur stderr
    pub fn display(&self) {
        eprintln!("\n{}", "=".repeat(60));
        eprintln!("CONVERSION REPORT");
        eprintln!("{}", "=".repeat(60));

        eprintln!("\nStatus: {:?}", self.status);
        eprintln!("Duration: {:.2}s", self.duration_secs);

        eprintln!("\n--- INPUTS ---");
        for input in &self.inputs {
            eprintln!(
                "  {} [{:?}] {} features, {} coordinates",
                input.input, input.status, input.features, input.coordinates
            );
            if let (Some(format), Some(projection)) = (&input.input_format, &input.source_projection)
            {
                eprintln!(
                    "    {} ({}) → {} ({})",
                    format,
                    projection,
                    input.output_format.as_deref().unwrap_or("-"),
                    input.output_projection.as_deref().unwrap_or("-")
                );
            }
            if let Some(envelope) = &input.envelope {
                for line in envelope.lines() {
                    eprintln!("    {}", line);
                }
            }
            for metrics in input.feature_metrics.iter().take(DISPLAY_LIMIT) {
                eprintln!("    - {}", metrics.describe());
            }
            if input.feature_metrics.len() > DISPLAY_LIMIT {
                eprintln!(
                    "    ... and {} more features",
                    input.feature_metrics.len() - DISPLAY_LIMIT
                );
            }
            for w in &input.warnings {
                eprintln!("    ? {}", w);
            }
            for e in input.errors.iter().take(DISPLAY_LIMIT) {
                eprintln!("    ! {}", e);
            }
            if input.errors.len() > DISPLAY_LIMIT {
                eprintln!("    ... and {} more", input.errors.len() - DISPLAY_LIMIT);
            }
        }

        eprintln!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path, pretty: bool) -> Result<()> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}/{} inputs converted, {} features, {} failed",
            self.inputs_processed - self.inputs_failed,
            self.inputs_processed,
            self.features_converted,
            self.inputs_failed
        )
    }
}
