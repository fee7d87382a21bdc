//! tilectl
//!
//! Resolve layer files into tile URLs, discover WMTS layers from a live
//! capabilities document, and convert layers to and from persisted envelopes.

mod commands;

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tile_common::TileAddress;
use tile_protocol::{load_capabilities, CapabilitiesWmts, FetchOptions};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "tilectl")]
#[command(about = "Build tile requests for WMS, WMTS, Esri, XYZ and PMTiles layers")]
struct Args {
    /// Capabilities fetch timeout in seconds
    #[arg(long, default_value_t = 30, env = "TILECTL_TIMEOUT_SECS")]
    timeout_secs: u64,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "TILECTL_LOG_JSON")]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the URL of one tile for a YAML layer file
    Url {
        layer: PathBuf,
        #[arg(short)]
        z: u32,
        #[arg(short)]
        x: u32,
        #[arg(short)]
        y: u32,
    },
    /// Resolve a WMTS layer from a capabilities URL, or list layers when none is given
    Discover {
        url: String,
        #[arg(long)]
        layer: Option<String>,
        #[arg(long)]
        matrix_set: Option<String>,
        #[arg(long)]
        style: Option<String>,
        #[arg(long)]
        format: Option<String>,
        #[arg(long)]
        crs: Option<String>,
        /// Well-known scale set that breaks ties between matrix sets
        #[arg(long)]
        well_known_scale_set: Option<String>,
        /// Dimension values as NAME=VALUE
        #[arg(long = "dim", value_parser = parse_dimension)]
        dimensions: Vec<(String, String)>,
    },
    /// Print the persisted envelope of a YAML layer file
    Persist { layer: PathBuf },
    /// Restore a persisted envelope and print it as YAML
    Restore {
        envelope: PathBuf,
        /// Fail when a migration step was skipped
        #[arg(long)]
        strict: bool,
    },
}

fn parse_dimension(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Logs go to stderr so stdout stays pipeable
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let fetch = FetchOptions::default()
        .with_timeout(Duration::from_secs(args.timeout_secs))
        .with_cancel(cancel);
    debug!(?fetch, "Fetch options");

    let output = run(args.command, &fetch).await?;
    println!("{}", output);
    Ok(())
}

async fn run(command: Command, fetch: &FetchOptions) -> Result<String> {
    match command {
        Command::Url { layer, z, x, y } => {
            let config = commands::load_layer(&layer)?;
            commands::tile_url(&config, TileAddress::new(x, y, z), fetch).await
        }
        Command::Discover {
            url,
            layer: None,
            ..
        } => {
            let capabilities = load_capabilities(&url, fetch)
                .await
                .with_context(|| format!("Failed to load {}", url))?;
            Ok(commands::list_layers(&capabilities))
        }
        Command::Discover {
            url,
            layer: Some(layer_id),
            matrix_set,
            style,
            format,
            crs,
            well_known_scale_set,
            dimensions,
        } => {
            let query = CapabilitiesWmts {
                capabilities_url: url,
                layer_id,
                matrix_set,
                style,
                format,
                preferred_crs: crs,
                preferred_well_known_scale_set: well_known_scale_set,
                dimensions: dimensions.into_iter().collect::<BTreeMap<_, _>>(),
            };
            commands::discover(&query, fetch).await
        }
        Command::Persist { layer } => {
            let config = commands::load_layer(&layer)?;
            commands::persist(&config)
        }
        Command::Restore { envelope, strict } => {
            let text = fs::read_to_string(&envelope)
                .with_context(|| format!("Failed to read {}", envelope.display()))?;
            let config = commands::restore(&text, strict)?;
            commands::render_yaml(&config)
        }
    }
}
