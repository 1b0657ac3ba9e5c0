//! Définition et implémentation des commandes CLI
//!
//! - `convert` : texte → texte, format et projection au choix
//! - `detect` : format et projection détectés
//! - `info` : formats et projections disponibles

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use geofiddle::{
    convert, detect_projection_from_coordinates, ConvertOptions, FormatRegistry,
    SupportedProjection,
};
use geofiddle_cli::config::{Config, Overrides};
use geofiddle_cli::report::{
    wgs84_warning, ConversionReport, ConversionStatus, FeatureMetrics, InputReport,
};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Nom affiché pour l'entrée standard
const STDIN: &str = "-";

#[derive(Subcommand)]
pub enum Commands {
    /// Convert geometry text between formats and projections
    Convert(ConvertArgs),

    /// Print the detected format and projection of an input
    Detect {
        /// Input file (stdin when omitted)
        input: Option<PathBuf>,
    },

    /// List supported formats and projections
    Info,
}

#[derive(Args)]
pub struct ConvertArgs {
    /// Input files (stdin when omitted)
    pub inputs: Vec<PathBuf>,

    /// Input format (auto, geojson, wkt, ewkt, kml, gpx, polyline5, polyline6, csv)
    #[arg(long)]
    pub from: Option<String>,

    /// Input projection (auto, EPSG:4326, EPSG:3857, EPSG:27700)
    #[arg(long)]
    pub from_proj: Option<String>,

    /// Output format
    #[arg(long)]
    pub to: Option<String>,

    /// Output projection
    #[arg(long)]
    pub to_proj: Option<String>,

    /// Output directory (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the JSON conversion report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Config preset name (default/web/osgb) or path to a JSON config
    #[arg(long)]
    pub config: Option<String>,
}

/// Texte source d'une conversion
struct Source {
    name: String,
    bytes: Vec<u8>,
}

/// Exécute la commande convert
pub fn cmd_convert(args: ConvertArgs) -> Result<()> {
    let start = Instant::now();

    let config = Config::resolve(args.config.as_deref())?.apply(Overrides {
        input_format: args.from,
        input_projection: args.from_proj,
        output_format: args.to,
        output_projection: args.to_proj,
    });
    let options = config.convert_options()?;
    debug!(?options, "conversion options");

    if let Some(dir) = &args.output {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create output directory {}", dir.display()))?;
    }

    let sources = read_sources(&args.inputs)?;
    if let Some(dir) = &args.output {
        check_output_collisions(&sources, dir, options.output_format.extension())?;
    }
    info!(inputs = sources.len(), "Starting conversion");

    let registry = FormatRegistry::new();
    let results: Vec<(InputReport, Option<String>)> = sources
        .par_iter()
        .map(|source| process_source(&registry, source, &options, args.output.as_deref()))
        .collect();

    let mut report = ConversionReport::new();
    for (input, output) in results {
        if let Some(text) = output {
            println!("{}", text);
        }
        report.record(input);
    }
    report.set_duration(start.elapsed());
    report.finalize();

    if let Some(path) = &args.report {
        report
            .save_to_file(path, config.pretty_report)
            .with_context(|| format!("Cannot write report {}", path.display()))?;
        info!(path = %path.display(), "Report saved");
    }

    if report.status != ConversionStatus::Success || args.output.is_some() {
        report.display();
    }
    info!("{}", report.summary());

    if report.status == ConversionStatus::Failed {
        anyhow::bail!("No input could be converted");
    }
    Ok(())
}

/// Exécute la commande detect
pub fn cmd_detect(input: Option<&Path>) -> Result<()> {
    let sources = match input {
        Some(path) => read_sources(&[path.to_path_buf()])?,
        None => read_sources(&[])?,
    };
    let source = sources
        .first()
        .context("No input to detect")?;
    let text = decode_utf8(source)?;

    let registry = FormatRegistry::new();
    let format = registry
        .detect_format(text)
        .with_context(|| format!("Could not detect the format of {}", source.name))?;

    let parsed = registry.parse(text, format.as_str());
    let projection = parsed
        .detected_projection
        .unwrap_or_else(|| detect_projection_from_coordinates(&parsed.positions()));

    println!("Format: {} ({})", format, format.label());
    println!("Projection: {} ({})", projection, projection.label());
    println!("Features: {}", parsed.features.len());
    for metrics in FeatureMetrics::collect(&parsed.features, projection) {
        println!("  {}", metrics.describe());
    }
    if let Some(warning) = wgs84_warning(&parsed.features, projection) {
        println!("Warning: {}", warning);
    }
    for error in &parsed.errors {
        println!("Error: {}", error);
    }

    Ok(())
}

/// Exécute la commande info
pub fn cmd_info() {
    let registry = FormatRegistry::new();

    println!("Formats (detection order):");
    for name in registry.names() {
        println!("  {:<10} {}", name.as_str(), name.label());
    }

    println!("\nProjections:");
    for projection in SupportedProjection::ALL {
        let definition = projection.definition();
        println!(
            "  {:<10} {} ({})",
            definition.code, definition.label, definition.units
        );
        println!("             {}", definition.proj4);
    }
}

/// Lit les fichiers d'entrée, ou stdin si la liste est vide
fn read_sources(inputs: &[PathBuf]) -> Result<Vec<Source>> {
    if inputs.is_empty() {
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .context("Failed to read stdin")?;
        return Ok(vec![Source {
            name: STDIN.to_string(),
            bytes,
        }]);
    }

    inputs
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Cannot read {}", path.display()))?;
            Ok(Source {
                name: path.display().to_string(),
                bytes,
            })
        })
        .collect()
}

fn decode_utf8(source: &Source) -> Result<&str> {
    simdutf8::basic::from_utf8(&source.bytes)
        .map_err(|_| anyhow::anyhow!("{} is not valid UTF-8", source.name))
}

/// Convertit une entrée ; retourne le texte produit s'il doit aller sur stdout
fn process_source(
    registry: &FormatRegistry,
    source: &Source,
    options: &ConvertOptions,
    output_dir: Option<&Path>,
) -> (InputReport, Option<String>) {
    match convert_source(registry, source, options, output_dir) {
        Ok(result) => result,
        Err(e) => {
            warn!(input = %source.name, "Conversion failed: {:#}", e);
            (InputReport::failed(&source.name, &format!("{:#}", e)), None)
        }
    }
}

fn convert_source(
    registry: &FormatRegistry,
    source: &Source,
    options: &ConvertOptions,
    output_dir: Option<&Path>,
) -> Result<(InputReport, Option<String>)> {
    let text = decode_utf8(source)?;
    let conversion = convert(registry, text, options)?;
    let mut report = InputReport::from_conversion(&source.name, &conversion);

    let Some(dir) = output_dir else {
        return Ok((report, Some(conversion.output)));
    };

    let path = output_path(dir, &source.name, conversion.output_format.extension());
    std::fs::write(&path, &conversion.output)
        .with_context(|| format!("Cannot write {}", path.display()))?;
    info!(
        input = %source.name,
        output = %path.display(),
        features = conversion.features.len(),
        "Converted"
    );
    report.output_file = Some(path.display().to_string());

    Ok((report, None))
}

/// `<dir>/<nom de base>.<extension>`, `stdin` pour l'entrée standard
fn output_path(dir: &Path, input: &str, extension: &str) -> PathBuf {
    let stem = if input == STDIN {
        "stdin".to_string()
    } else {
        Path::new(input)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output")
            .to_string()
    };
    dir.join(format!("{}.{}", stem, extension))
}

/// Refuse deux entrées qui écriraient le même fichier de sortie
fn check_output_collisions(sources: &[Source], dir: &Path, extension: &str) -> Result<()> {
    let mut seen: HashMap<PathBuf, &str> = HashMap::new();
    for source in sources {
        let path = output_path(dir, &source.name, extension);
        if let Some(previous) = seen.insert(path.clone(), &source.name) {
            anyhow::bail!(
                "Inputs {} and {} would both be written to {}",
                previous,
                source.name,
                path.display()
            );
        }
    }
    Ok(())
}
