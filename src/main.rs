use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use nulp_site::config::{self, Endpoints, SiteConfig};
use nulp_site::fetch::HttpTransport;
use nulp_site::sections::{self, SiteModel};
use nulp_site::snapshot::{self, Snapshot};
use nulp_site::{generate, output};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const SNAPSHOT_FILE: &str = "snapshot.json";
const SITE_FILE: &str = "site.json";

/// Shared flags for commands that hit the network.
#[derive(clap::Args, Clone)]
struct FetchArgs {
    /// Abort on the first failed fetch instead of rendering around it
    #[arg(long)]
    strict: bool,
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "nulp-site")]
#[command(about = "Static builder for the NULP public website")]
#[command(long_about = "\
Static builder for the NULP public website

Pulls content from the CMS and the learning platform, keeps what is
published, active and inside its publish window, and renders the public
site as plain HTML.

Pipeline (each stage can be run on its own):

  fetch      CMS + LMS   → <temp-dir>/snapshot.json
  resolve    snapshot    → <temp-dir>/site.json
  generate   site.json   → <output>/

Environment selection: a --host of localhost, a loopback address, or a
hostname containing a staging marker uses the staging CMS and platform;
anything else uses production. --cms-url and --nulp-url override both.

Logging goes to stderr and is controlled by RUST_LOG (default: warn).

Run 'nulp-site gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Site config file (missing file = stock defaults)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Directory for intermediate files (snapshot.json, site.json)
    #[arg(long, default_value = ".nulp-site-temp", global = true)]
    temp_dir: PathBuf,

    /// Static assets (favicon, logos) copied to the output root
    #[arg(long, default_value = "assets", global = true)]
    assets: PathBuf,

    /// Hostname the site is served from; selects staging or production
    #[arg(long, default_value = "localhost", global = true)]
    host: String,

    /// Override the CMS API base URL
    #[arg(long, global = true)]
    cms_url: Option<String>,

    /// Override the learning platform base URL
    #[arg(long, global = true)]
    nulp_url: Option<String>,

    /// Evaluate publish windows at this instant (RFC 3339) instead of now
    #[arg(long, global = true)]
    now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every CMS and platform source into a snapshot
    Fetch(FetchArgs),
    /// Resolve the snapshot into render-ready sections
    Resolve,
    /// Produce the final HTML site from the resolved sections
    Generate,
    /// Run the full pipeline: fetch → resolve → generate
    Build(FetchArgs),
    /// Validate the config and, if a snapshot exists, resolve it without writing
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    match &cli.command {
        Command::Fetch(args) => {
            let config = config::load_config(&cli.config)?;
            run_fetch(&cli, &config, args.strict)?;
        }
        Command::Resolve => {
            let config = config::load_config(&cli.config)?;
            let snapshot = snapshot::load_snapshot(&cli.temp_dir.join(SNAPSHOT_FILE))?;
            run_resolve(&cli, &config, &snapshot)?;
        }
        Command::Generate => {
            run_generate(&cli)?;
        }
        Command::Build(args) => {
            let config = config::load_config(&cli.config)?;
            std::fs::create_dir_all(&cli.temp_dir)?;

            println!("==> Stage 1: Fetching content");
            let snapshot = run_fetch(&cli, &config, args.strict)?;

            println!("==> Stage 2: Resolving sections");
            run_resolve(&cli, &config, &snapshot)?;

            println!("==> Stage 3: Generating HTML → {}", cli.output.display());
            run_generate(&cli)?;

            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.config.display());
            let config = config::load_config(&cli.config)?;
            let endpoints = select_endpoints(&cli, &config);
            println!("    Environment: {}", endpoints.environment);
            println!("    CMS: {}", endpoints.cms);
            println!("    Platform: {}", endpoints.nulp);
            let snapshot_path = cli.temp_dir.join(SNAPSHOT_FILE);
            if snapshot_path.exists() {
                let snapshot = snapshot::load_snapshot(&snapshot_path)?;
                let model = sections::build_site_model(&snapshot, &config, now(&cli));
                output::print_resolve_output(&model);
            }
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Structured logs to stderr; stdout is reserved for stage output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Initialize the rayon thread pool based on fetch config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(fetch: &config::FetchConfig) {
    let threads = config::effective_threads(fetch);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn now(cli: &Cli) -> DateTime<Utc> {
    cli.now.unwrap_or_else(Utc::now)
}

/// Endpoints for `--host`, with explicit URL overrides applied.
fn select_endpoints(cli: &Cli, config: &SiteConfig) -> Endpoints {
    let mut endpoints = config.endpoints.select(&cli.host);
    if let Some(cms) = &cli.cms_url {
        endpoints.cms = cms.trim_end_matches('/').to_string();
    }
    if let Some(nulp) = &cli.nulp_url {
        endpoints.nulp = nulp.trim_end_matches('/').to_string();
    }
    endpoints
}

fn run_fetch(
    cli: &Cli,
    config: &SiteConfig,
    strict: bool,
) -> Result<Snapshot, Box<dyn std::error::Error>> {
    init_thread_pool(&config.fetch);
    let endpoints = select_endpoints(cli, config);
    tracing::info!(environment = %endpoints.environment, cms = %endpoints.cms, "selected endpoints");
    let transport = HttpTransport::new(config.fetch.timeout_secs.map(Duration::from_secs))?;

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_fetch_event(&event);
        }
    });
    let result = snapshot::fetch_snapshot(&transport, &endpoints, config, now(cli), strict, Some(tx));
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;
    let snapshot = result?;

    snapshot::save_snapshot(&snapshot, &cli.temp_dir.join(SNAPSHOT_FILE))?;
    output::print_fetch_summary(&snapshot);
    Ok(snapshot)
}

fn run_resolve(
    cli: &Cli,
    config: &SiteConfig,
    snapshot: &Snapshot,
) -> Result<SiteModel, Box<dyn std::error::Error>> {
    let model = sections::build_site_model(snapshot, config, now(cli));
    sections::save_site_model(&model, &cli.temp_dir.join(SITE_FILE))?;
    output::print_resolve_output(&model);
    Ok(model)
}

fn run_generate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let site = generate::generate(
        &cli.temp_dir.join(SITE_FILE),
        &cli.output,
        Some(cli.assets.as_path()),
    )?;
    output::print_generate_output(&site);
    Ok(())
}
