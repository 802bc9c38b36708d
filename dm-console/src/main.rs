//! DigitalMedia Switch Operator Console
//!
//! Lists and changes output routes on a Crestron DigitalMedia matrix switch
//! from the command line.

mod settings;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dm_router::{Gateway, RouteTable, SlotOffsetConfig, SwitchRouter};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use settings::{Overrides, Settings};

/// Query and change routes on a DigitalMedia matrix switch
#[derive(Parser)]
#[command(name = "dmctl", version, about)]
struct Cli {
    /// Switch host name or address
    #[arg(long)]
    host: Option<String>,

    /// Console port (default 23)
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (default $XDG_CONFIG_HOME/dmctl/settings.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Slot number of the first output card
    #[arg(long, requires = "set_route_output_start")]
    output_slot_start: Option<i64>,

    /// `setavuroute` index of the first output card
    #[arg(long, requires = "output_slot_start")]
    set_route_output_start: Option<i64>,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    save: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current routing table
    Routes {
        /// Show video and audio sources separately
        #[arg(long)]
        detail: bool,
    },
    /// Route an input to an output
    Set { output: String, input: String },
    /// Print the setavuroute index an output slot translates to
    Index { output: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "dmctl=info,dm_protocol=info,dm_router=info,dm_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let settings_path = cli.config.clone().or_else(Settings::settings_path);
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load(),
    };

    let calibration = cli
        .output_slot_start
        .zip(cli.set_route_output_start)
        .map(|(output, index)| SlotOffsetConfig::new(output, index));
    settings.apply(Overrides {
        host: cli.host.clone(),
        port: cli.port,
        calibration,
    });

    if cli.save {
        let path = settings_path.context("Could not determine settings path")?;
        settings.save_to(&path)?;
        info!("Saved settings to {}", path.display());
    }

    let router = SwitchRouter::from_config(&settings.switch);

    match cli.command {
        Command::Index { output } => {
            let index = router.device_index(&output)?;
            println!("{} -> {}", output, index);
            Ok(())
        }
        Command::Routes { detail } => {
            require_host(&settings)?;
            print_routes(&router, detail).await
        }
        Command::Set { output, input } => {
            require_host(&settings)?;
            set_route(&router, &output, &input).await
        }
    }
}

fn require_host(settings: &Settings) -> Result<()> {
    if settings.switch.host.is_empty() {
        bail!("No switch host configured; pass --host or set it in the settings file");
    }
    Ok(())
}

async fn print_routes<G: Gateway>(router: &SwitchRouter<G>, detail: bool) -> Result<()> {
    match router.query_routes().await {
        Ok(table) => {
            print_table(&table, detail);
            Ok(())
        }
        Err(e) => {
            if let Some(partial) = e.partial_routes() {
                eprintln!("Routing dump broke off; routes read so far:");
                print_table(partial, detail);
            }
            Err(e).context("Unable to query routes")
        }
    }
}

fn print_table(table: &RouteTable, detail: bool) {
    for route in table.sorted_routes() {
        if detail {
            println!(
                "{:>6}  video {:<4} audio {:<4}",
                route.output_slot,
                display_source(&route.video_source),
                display_source(&route.audio_source)
            );
        } else {
            println!("{:>6}  {}", route.output_slot, display_source(route.resolved_input()));
        }
    }
}

fn display_source(source: &str) -> &str {
    if source.is_empty() {
        "-"
    } else {
        source
    }
}

async fn set_route<G: Gateway>(router: &SwitchRouter<G>, output: &str, input: &str) -> Result<()> {
    let change = router
        .set_route(output, input)
        .await
        .with_context(|| format!("Unable to route input {} to output {}", input, output))?;
    change.settled().await;

    let table = router.query_routes().await.context("Unable to confirm route")?;
    match table.get(output) {
        Some(observed) if observed == input => {
            println!("{:>6}  {}", output, input);
        }
        Some(observed) => {
            warn!(
                "Output {} reports input {:?} after routing input {}",
                output, observed, input
            );
            println!("{:>6}  {}", output, display_source(observed));
        }
        None => warn!("Output {} is not listed in the routing dump", output),
    }
    Ok(())
}
