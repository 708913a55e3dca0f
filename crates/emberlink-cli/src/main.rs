//! emberlink CLI
//!
//! Configuration transfers between project files and panel endpoints.

mod config;
mod progress;
mod project;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use config::Config;
use emberlink_link::{
    count_units, download, upload, DownloadOutcome, MemoryLink, SerialLink, Session, UploadOutcome,
};
use emberlink_proto::device_types;
use emberlink_sim::SimulatedPanel;
use progress::TransferProgress;

/// emberlink - configuration transfer for fire-alarm panel endpoints
#[derive(Parser)]
#[command(name = "emberlink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available serial ports
    Ports,

    /// Upload a project file to an endpoint
    Upload {
        /// JSON project file to upload
        #[arg(required = true)]
        project: PathBuf,

        /// Serial port, overriding the configured one
        #[arg(short, long)]
        port: Option<String>,

        /// Use an in-process simulated endpoint instead of hardware
        #[arg(long)]
        simulate: bool,
    },

    /// Download an endpoint's configuration into a project file
    Download {
        /// JSON project file to write
        #[arg(required = true)]
        output: PathBuf,

        /// Serial port, overriding the configured one
        #[arg(short, long)]
        port: Option<String>,

        /// Use an in-process simulated endpoint instead of hardware
        #[arg(long)]
        simulate: bool,
    },

    /// Check a project file against the protocol's field limits
    Verify {
        /// JSON project file to check
        #[arg(required = true)]
        project: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };
    config.validate()?;

    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Ports => list_ports(),
        Commands::Upload {
            project,
            port,
            simulate,
        } => run_upload(project, port, simulate, &config).await?,
        Commands::Download {
            output,
            port,
            simulate,
        } => run_download(output, port, simulate, &config).await?,
        Commands::Verify { project } => verify_project(&project)?,
    }

    Ok(())
}

/// List serial ports the host exposes
fn list_ports() {
    let ports = SerialLink::available_ports();
    if ports.is_empty() {
        println!("No serial ports found");
    } else {
        for port in ports {
            println!("{port}");
        }
    }
}

/// Upload a project file to an endpoint
async fn run_upload(
    project_path: PathBuf,
    port: Option<String>,
    simulate: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let panel = project::load(&project_path)?;
    project::validate(&panel)?;
    let total = count_units(&panel);

    println!("Project: {}", project_path.display());
    println!("Panel: {} (address {})", panel.name, panel.address);
    println!("Units: {total}");

    let (mut session, _sim) = connect(port, simulate, config).await?;
    let cancel = cancel_on_ctrl_c();
    let progress = TransferProgress::new(total, "Uploading configuration");

    let outcome = upload(&mut session, &panel, &cancel, &progress).await;
    session.disconnect();

    match outcome? {
        UploadOutcome::Complete => {
            progress.finish_with_message(format!("Upload complete: {total} units"));
            Ok(())
        }
        UploadOutcome::Failed { unit, label } => {
            progress.abandon();
            anyhow::bail!("Endpoint refused unit {unit}/{total}: {label}");
        }
        UploadOutcome::Cancelled => {
            progress.abandon();
            println!("Upload cancelled");
            Ok(())
        }
    }
}

/// Download an endpoint's configuration into a project file
async fn run_download(
    output: PathBuf,
    port: Option<String>,
    simulate: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let (mut session, _sim) = connect(port, simulate, config).await?;
    let cancel = cancel_on_ctrl_c();
    let progress = TransferProgress::new(0, "Downloading configuration");

    let outcome = download(&mut session, &cancel, &progress).await;
    session.disconnect();

    match outcome? {
        DownloadOutcome::Complete(Some(panel)) => {
            progress.finish_with_message(format!("Download complete: panel '{}'", panel.name));
            project::save(&output, &panel)?;
            println!("Saved to {}", output.display());
            print_summary(&panel);
            Ok(())
        }
        DownloadOutcome::Complete(None) => {
            progress.finish_with_message("Endpoint holds no configuration".to_string());
            Ok(())
        }
        DownloadOutcome::Cancelled => {
            progress.abandon();
            println!("Download cancelled");
            Ok(())
        }
        DownloadOutcome::TimedOut => {
            progress.abandon();
            anyhow::bail!("Endpoint went silent before end of transmission");
        }
    }
}

/// Check a project file against the protocol's field limits
fn verify_project(project_path: &PathBuf) -> anyhow::Result<()> {
    let panel = project::load(project_path)?;
    project::validate(&panel)?;

    println!("Project: {}", project_path.display());
    print_summary(&panel);
    println!("OK");
    Ok(())
}

fn print_summary(panel: &emberlink_proto::Panel) {
    println!("Panel: {} (address {})", panel.name, panel.address);
    println!("  Location: {}", panel.location);
    for lp in &panel.loops {
        println!("  Loop {}: {} ({} devices)", lp.number, lp.name, lp.devices.len());
        for device in &lp.devices {
            println!(
                "    {:3}  {}  zone {}  {}",
                device.address,
                device_types::name_for_code(device.type_code),
                device.zone,
                device.location
            );
        }
    }
    for bus in &panel.buses {
        println!("  Bus {}: {} ({} nodes)", bus.number, bus.name, bus.nodes.len());
    }
    for rule in &panel.rules {
        println!(
            "  Rule '{}': {} inputs, {} outputs{}",
            rule.name,
            rule.inputs.len(),
            rule.outputs.len(),
            if rule.enabled { "" } else { " (disabled)" }
        );
    }
}

/// Open a link and complete the handshake.
///
/// Returns the simulated endpoint handle alongside the session when
/// `--simulate` is given, so its serve task outlives the transfer.
async fn connect(
    port: Option<String>,
    simulate: bool,
    config: &Config,
) -> anyhow::Result<(Session, Option<SimulatedPanel>)> {
    let mut session = Session::with_config(config.session_config());

    if simulate {
        let (host, peer) = MemoryLink::pair();
        let sim = SimulatedPanel::new();
        sim.spawn(peer);
        session.connect(Box::new(host)).await?;
        Ok((session, Some(sim)))
    } else {
        let path = port
            .or_else(|| config.link.port.clone())
            .context("No serial port given; use --port or set link.port in the config")?;
        tracing::info!("opening {path} at {} baud", config.link.baud_rate);
        let link = SerialLink::open(&path, config.link.baud_rate)?;
        session.connect(Box::new(link)).await?;
        Ok((session, None))
    }
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling transfer");
            token.cancel();
        }
    });
    cancel
}
