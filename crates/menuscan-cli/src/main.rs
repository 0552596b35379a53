mod scan;

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};
use menuscan_core::{ExportFormat, MenuType};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "menuscan")]
#[command(about = "Scan dispensary menus into a product table")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scan one or more menu URLs and export the combined table
    Scan(ScanArgs),
}

#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .multiple(true)
        .args(["url", "med_url", "rec_url"])
))]
struct ScanArgs {
    /// Menu URL; its menu type comes from --menu-type or the URL itself
    #[arg(long)]
    url: Option<String>,

    /// Medical menu URL, scanned as its own job
    #[arg(long)]
    med_url: Option<String>,

    /// Adult-use menu URL, scanned as its own job
    #[arg(long)]
    rec_url: Option<String>,

    /// Dispensary name for the Dispensary column (defaults to the URL)
    #[arg(long, default_value = "")]
    label: String,

    /// Menu type for --url: med, rec or auto
    #[arg(long, default_value = "auto")]
    menu_type: MenuType,

    /// Allow the headless-browser crawl (default)
    #[arg(long, overrides_with = "no_browser")]
    browser: bool,

    /// Never launch a browser
    #[arg(long, overrides_with = "browser")]
    no_browser: bool,

    /// Run the browser crawl even when structured data was found
    #[arg(long)]
    force_browser: bool,

    /// Print per-stage diagnostics
    #[arg(long)]
    debug: bool,

    /// Write the table here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Export format: csv or json
    #[arg(long, default_value = "csv")]
    format: ExportFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = menuscan_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Scan(args)) => scan::run_scan(&config, &args).await?,
        None => println!("menuscan: run `menuscan scan --help` for usage"),
    }

    Ok(())
}
