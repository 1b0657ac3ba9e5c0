//! Configuration de la conversion

use std::path::Path;

use anyhow::{Context, Result};
use geofiddle::{ConvertOptions, FormatName, SupportedProjection};
use serde::{Deserialize, Serialize};

/// Variable d'environnement désignant un preset ou un fichier JSON
pub const CONFIG_ENV: &str = "GEOFIDDLE_CONFIG";

/// Valeur déclenchant l'auto-détection
pub const AUTO: &str = "auto";

const PRESETS: [&str; 3] = ["default", "web", "osgb"];

/// Configuration principale
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Format d'entrée (`auto` ou nom de format)
    pub input_format: String,

    /// Projection d'entrée (`auto`, `EPSG:xxxx` ou alias)
    pub input_projection: String,

    pub output_format: String,

    pub output_projection: String,

    /// Rapport JSON indenté
    pub pretty_report: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_format: AUTO.to_string(),
            input_projection: AUTO.to_string(),
            output_format: FormatName::GeoJson.to_string(),
            output_projection: SupportedProjection::Wgs84.to_string(),
            pretty_report: true,
        }
    }
}

/// Surcharges issues de la ligne de commande
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input_format: Option<String>,
    pub input_projection: Option<String>,
    pub output_format: Option<String>,
    pub output_projection: Option<String>,
}

impl Config {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Charge une configuration depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "default" => Self::load_embedded(include_str!("presets/default.json")),
            "web" => Self::load_embedded(include_str!("presets/web.json")),
            "osgb" => Self::load_embedded(include_str!("presets/osgb.json")),
            _ => anyhow::bail!("Unknown preset: {}. Use: {}", preset, PRESETS.join(", ")),
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse embedded config")
    }

    /// Preset ou fichier ; sans argument, `GEOFIDDLE_CONFIG` puis le preset `default`
    pub fn resolve(selector: Option<&str>) -> Result<Self> {
        let selector = match selector {
            Some(selector) => selector.to_string(),
            None => std::env::var(CONFIG_ENV).unwrap_or_else(|_| "default".to_string()),
        };

        if PRESETS.contains(&selector.as_str()) {
            Self::from_preset(&selector)
        } else {
            Self::load(Path::new(&selector))
        }
    }

    /// Applique les options passées en ligne de commande
    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(v) = overrides.input_format {
            self.input_format = v;
        }
        if let Some(v) = overrides.input_projection {
            self.input_projection = v;
        }
        if let Some(v) = overrides.output_format {
            self.output_format = v;
        }
        if let Some(v) = overrides.output_projection {
            self.output_projection = v;
        }
        self
    }

    /// Valide les noms et construit les options du pipeline
    pub fn convert_options(&self) -> Result<ConvertOptions> {
        let input_format = parse_auto::<FormatName>(&self.input_format)
            .context("Invalid input_format")?;
        let input_projection = parse_auto::<SupportedProjection>(&self.input_projection)
            .context("Invalid input_projection")?;
        let output_format: FormatName = self
            .output_format
            .parse()
            .context("Invalid output_format")?;
        let output_projection: SupportedProjection = self
            .output_projection
            .parse()
            .context("Invalid output_projection")?;

        Ok(ConvertOptions {
            input_format,
            input_projection,
            output_format,
            output_projection,
        })
    }
}

/// `auto` → `None`, sinon valeur parsée
fn parse_auto<T>(value: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if value.trim().eq_ignore_ascii_case(AUTO) {
        return Ok(None);
    }
    Ok(Some(value.parse()?))
}
