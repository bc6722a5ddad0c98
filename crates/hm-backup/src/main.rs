//! hmbackup
//!
//! Creates and restores backups of the direct links of a HomeMatic network.
//! Writes to the network only happen in wet mode.

mod config;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use config::{load_names, FileConfig, Overrides, Settings};
use hm_links::{
    device_list_text, read_backup_file, write_backup_file, write_text_file, EntryOutcome, Network,
    RestoreReport,
};
use hm_rpc::{ClientOptions, XmlRpcClient};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEVICE_LIST_FILE: &str = "devicelist.txt";

#[derive(Parser, Debug)]
#[command(name = "hmbackup")]
#[command(version, about = "Create and restore backups of HomeMatic links")]
#[command(group(
    ArgGroup::new("command")
        .args(["create_link_backup", "restore_link_backup", "list_devices", "link_table"])
        .multiple(false)
))]
struct Cli {
    /// Address of the rpc server [default: ccu]
    #[arg(short = 's', long)]
    host: Option<String>,

    /// Port of the xml service [default: 2000]
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Name file (JSON) for HomeMatic devices [default: homematic_manager_names.json]
    #[arg(short = 'n', long)]
    name_file: Option<PathBuf>,

    /// Location of the backup file [default: link_backup.json]
    #[arg(short = 'f', long)]
    backup_file: Option<PathBuf>,

    /// YAML file with defaults for the options above
    #[arg(long)]
    config: Option<PathBuf>,

    /// Back up all links
    #[arg(short = 'c', long)]
    create_link_backup: bool,

    /// Restore links from the backup file
    #[arg(short = 'r', long)]
    restore_link_backup: bool,

    /// Write a list of all devices next to the backup file
    #[arg(long)]
    list_devices: bool,

    /// Print a table of all links and their parameters
    #[arg(long)]
    link_table: bool,

    /// Enable writes to the HomeMatic network
    #[arg(short = 'w', long)]
    wet_mode: bool,

    /// Overwrite existing files
    #[arg(short = 'o', long)]
    overwrite_files: bool,

    /// More output (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbosity", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn settings(cli: &Cli) -> Result<Settings> {
    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let overrides = Overrides {
        host: cli.host.clone(),
        port: cli.port,
        name_file: cli.name_file.clone(),
        backup_file: cli.backup_file.clone(),
    };
    Ok(Settings::resolve(file, overrides)?)
}

async fn create_link_backup(network: &Network, settings: &Settings, overwrite: bool) -> Result<()> {
    info!("Create link backup");
    let mut links = network.links().await?;
    let document = network.build_backup(&mut links).await?;
    info!(
        "Found {} links and {} paramsets",
        document.links.len(),
        document.paramsets.len()
    );
    info!("Write linklist to file \"{}\"", settings.backup_file.display());
    write_backup_file(&settings.backup_file, &document, overwrite)?;
    Ok(())
}

fn log_report(report: &RestoreReport) {
    for outcome in &report.outcomes {
        match outcome {
            EntryOutcome::Updated(plan) | EntryOutcome::Created { plan: Some(plan), .. } => {
                for change in plan.accepted() {
                    info!(
                        "{}: {} {} -> {}{}",
                        plan.link,
                        change.key,
                        change.old,
                        change.new,
                        if plan.applied { "" } else { " (pending)" }
                    );
                }
            }
            EntryOutcome::Created { link, plan: None } => info!("{}: would be created", link),
            EntryOutcome::Deleted { link, dry_run } => {
                info!("{}: {}", link, if *dry_run { "would be deleted" } else { "deleted" })
            }
            EntryOutcome::NothingToDelete { .. } | EntryOutcome::Skipped { .. } => {}
            EntryOutcome::Failed { link, error } => warn!("{}: {}", link, error),
        }
    }
}

async fn restore_link_backup(network: &Network, settings: &Settings, wet: bool) -> Result<()> {
    info!("Restoring links from file \"{}\"", settings.backup_file.display());
    let document = read_backup_file(&settings.backup_file)?;
    let report = network.restore(&document, !wet).await?;
    log_report(&report);
    if report.dry_run {
        info!("Dry run, nothing was written. Use --wet-mode to apply the changes");
    }
    if report.failures() > 0 {
        warn!("{} of {} backup entries failed", report.failures(), report.outcomes.len());
    }
    Ok(())
}

async fn create_device_list(network: &Network, settings: &Settings, overwrite: bool) -> Result<()> {
    let devices = network.devices().await?;
    let path = settings.backup_dir().join(DEVICE_LIST_FILE);
    info!("Writing device list to file \"{}\"", path.display());
    write_text_file(&path, &device_list_text(&devices), overwrite)?;
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let settings = settings(&cli)?;
    let names = load_names(&settings.name_file)?;
    let client = XmlRpcClient::from_host(
        &settings.host,
        settings.port,
        ClientOptions {
            timeout: settings.timeout,
        },
    )
    .context("cannot set up rpc client")?;
    info!("Connecting to {}", client.url());
    let network = Network::new(Arc::new(client), names);

    if cli.create_link_backup {
        create_link_backup(&network, &settings, cli.overwrite_files).await?;
    } else if cli.restore_link_backup {
        restore_link_backup(&network, &settings, cli.wet_mode).await?;
    } else if cli.list_devices {
        create_device_list(&network, &settings, cli.overwrite_files).await?;
    } else if cli.link_table {
        let table = network.link_table().await?;
        print!("{}", table);
    } else {
        info!("No command given, nothing to do. See --help");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("cannot initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        error!("Program aborted");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_commands_are_exclusive() {
        assert!(Cli::try_parse_from(["hmbackup", "-c", "-r"]).is_err());
        assert!(Cli::try_parse_from(["hmbackup", "-c", "--link-table"]).is_err());
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from([
            "hmbackup", "-s", "homematic", "-p", "2001", "-f", "b.json", "-r", "-w", "-o", "-vv",
        ])
        .unwrap();

        assert_eq!(cli.host.as_deref(), Some("homematic"));
        assert_eq!(cli.port, Some(2001));
        assert_eq!(cli.backup_file, Some(PathBuf::from("b.json")));
        assert!(cli.restore_link_backup);
        assert!(cli.wet_mode);
        assert!(cli.overwrite_files);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_dry_run_is_default() {
        let cli = Cli::try_parse_from(["hmbackup", "-r"]).unwrap();
        assert!(!cli.wet_mode);
        assert!(!cli.overwrite_files);
        assert!(cli.host.is_none());
    }
}
