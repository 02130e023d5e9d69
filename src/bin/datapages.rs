use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing::info;
use tracing_subscriber::EnvFilter;

use datapages::app::App;
use datapages::config::{DomainConfig, GlobalConfig};
use datapages::ena::EnaHttpClient;
use datapages::error::DatapagesError;
use datapages::registry::MysqlRegistryClient;
use datapages::tracking::MysqlTrackingClient;

#[derive(Parser)]
#[command(name = "datapages")]
#[command(about = "Update data and index pages for the public sequencing-data site")]
#[command(version, author)]
struct Cli {
    /// Override config (e.g. database hosts, users)
    #[arg(long)]
    global_config: Option<Utf8PathBuf>,

    /// Only output warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Directory to update
    #[arg(short = 'd', long)]
    site_directory: Option<Utf8PathBuf>,

    /// Cache database results to this file
    #[arg(long)]
    save_cache: Option<Utf8PathBuf>,

    /// Load cached database results from this file
    #[arg(long)]
    load_cache: Option<Utf8PathBuf>,

    /// One or more domain config files (e.g. viruses.json)
    #[arg(required = true)]
    domain_config: Vec<Utf8PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<DatapagesError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &DatapagesError) -> u8 {
    match error {
        DatapagesError::MissingConfigKeys(_)
        | DatapagesError::ConfigRead(_)
        | DatapagesError::ConfigParse(_)
        | DatapagesError::CacheRead(_) => 2,
        DatapagesError::ArchiveHttp(_)
        | DatapagesError::ArchiveStatus { .. }
        | DatapagesError::Tracking(_)
        | DatapagesError::Registry(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut global = GlobalConfig::resolve(cli.global_config.as_deref()).into_diagnostic()?;
    if let Some(path) = cli.save_cache {
        global.save_cache_path = Some(path);
    }
    if let Some(path) = cli.load_cache {
        global.load_cache_path = Some(path);
    }
    if let Some(dir) = cli.site_directory {
        global.site_data_dir = Some(dir);
    }
    let site_dir = global
        .site_data_dir
        .clone()
        .unwrap_or_else(|| Utf8PathBuf::from("site"));
    info!("preparing updates to {site_dir}");

    let tracking = MysqlTrackingClient::new(global.tracking.clone());
    let archive = EnaHttpClient::new().into_diagnostic()?;
    let registry = MysqlRegistryClient::new(global.registry.clone());
    let app = App::new(tracking, archive, registry);

    for config_path in &cli.domain_config {
        let domain = DomainConfig::load(config_path).into_diagnostic()?;
        info!("processing {} from {config_path}", domain.metadata.name);
        let summary = app
            .update_domain(&global, &domain, &site_dir)
            .into_diagnostic()?;
        for entry in &summary.species {
            info!(
                species = %entry.species,
                filename = %entry.filename,
                rows = entry.count,
                "published"
            );
        }
    }
    Ok(())
}
