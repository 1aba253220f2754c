mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hardway")]
#[command(about = "Kubernetes the hard way, described as an AWS stack", long_about = None)]
struct Cli {
    /// Settings file (default: discovered hardway.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize the stack manifest for the provisioning engine
    Synth {
        /// Output directory
        #[arg(short, long, default_value = "hardway.out")]
        out: PathBuf,
        /// Use this image id instead of querying the catalog
        #[arg(short, long)]
        image: Option<String>,
        /// Workstation address or CIDR allowed to reach the bastion and API
        #[arg(short, long)]
        workstation: Option<String>,
        /// Print the manifest to stdout instead of writing it
        #[arg(long)]
        stdout: bool,
    },
    /// Check the topology without resolving the image
    Validate {
        /// Workstation address or CIDR allowed to reach the bastion and API
        #[arg(short, long)]
        workstation: Option<String>,
    },
    /// Query the catalog for the newest matching image
    LatestImage {
        /// Region to query (default: from settings)
        #[arg(short, long)]
        region: Option<String>,
        /// Image name pattern (default: from settings)
        #[arg(short, long)]
        name_pattern: Option<String>,
        /// Owner account, repeatable (default: from settings)
        #[arg(short, long = "owner")]
        owners: Vec<String>,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries manifests and image ids; logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("hardway {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let (settings, source) = hardway_config::load_settings(cli.config.as_deref())?;
    match &source {
        Some(path) => tracing::info!("Using settings from {}", path.display()),
        None => tracing::info!("No settings file found, using defaults"),
    }

    match cli.command {
        Commands::Synth {
            out,
            image,
            workstation,
            stdout,
        } => {
            commands::synth::handle(
                settings,
                commands::synth::SynthArgs {
                    out,
                    image,
                    workstation,
                    stdout,
                },
            )
            .await
        }
        Commands::Validate { workstation } => commands::validate::handle(settings, workstation),
        Commands::LatestImage {
            region,
            name_pattern,
            owners,
        } => commands::image::handle(&settings, region, name_pattern, owners).await,
        Commands::Version => unreachable!("Version is handled before settings loading"),
    }
}
