use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use jeepney_router::config::AppConfig;
use jeepney_router::geo::GeoPoint;
use jeepney_router::session::Services;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const LABEL_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Find a path between two points and ask for jeepney rides along it"
)]
struct Args {
    /// TOML config file (built-in defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a travel path, falling back to a straight line
    Route {
        /// Start point as LAT,LNG
        #[arg(long, allow_hyphen_values = true)]
        from: GeoPoint,
        /// End point as LAT,LNG
        #[arg(long, allow_hyphen_values = true)]
        to: GeoPoint,
        /// Print the full path as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reverse geocode a point into a short address
    Address {
        #[arg(allow_hyphen_values = true)]
        point: GeoPoint,
    },
    /// Ask the text-generation provider for jeepney rides
    Suggest {
        #[arg(long, allow_hyphen_values = true)]
        from: GeoPoint,
        #[arg(long, allow_hyphen_values = true)]
        to: GeoPoint,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    config.apply_env_overrides();

    let services = Services::from_config(&config)?;
    let session = services.session();

    match args.command {
        Command::Route { from, to, json } => {
            session.set_from(from, None)?;
            session.set_to(to, None)?;
            let path = session.route()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&path)?);
            } else {
                let style = if path.is_fallback() {
                    "straight line (no routing provider answered)"
                } else {
                    "road path"
                };
                println!(
                    "{style}: {} points, {:.2} km",
                    path.points().len(),
                    path.distance_km()
                );
            }
        }
        Command::Address { point } => match session.lookup_address(point)? {
            Some(address) => println!("{address}"),
            None => println!("{point}"),
        },
        Command::Suggest { from, to } => {
            session.set_from(from, None)?;
            session.set_to(to, None)?;
            if !session.waypoints().wait_for_labels(LABEL_WAIT) {
                tracing::warn!("continuing without resolved place names");
            }
            let suggestion = session.suggest()?;
            println!("{}", suggestion.summary);
            for (i, step) in suggestion.steps.iter().enumerate() {
                println!("{}. {} -> ride {} -> {}", i + 1, step.from, step.jeepney_id, step.to);
            }
            if !suggestion.alternatives.is_empty() {
                println!("alternatives:");
                for step in &suggestion.alternatives {
                    println!("  {} -> ride {} -> {}", step.from, step.jeepney_id, step.to);
                }
            }
        }
    }

    Ok(())
}
