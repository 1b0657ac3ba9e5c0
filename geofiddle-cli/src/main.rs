//! Point d'entrée CLI pour geofiddle

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::Commands;

/// Convertir des géométries texte entre formats et projections
#[derive(Parser)]
#[command(name = "geofiddle")]
#[command(author, version)]
#[command(about = "Convert pasted geometry between GeoJSON, WKT, EWKT, KML, GPX, Polyline and CSV")]
#[command(long_about = "Detects the input format and projection, reprojects between WGS84, Web Mercator and British National Grid, and writes the requested format.\n\nReads stdin when no input file is given.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Convert(args) => cli::cmd_convert(args)?,
        Commands::Detect { input } => cli::cmd_detect(input.as_deref())?,
        Commands::Info => cli::cmd_info(),
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // stdout reste réservé aux géométries converties
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
