//! Cabinet Configurator CLI
//!
//! Usage:
//!   cabinet-configurator [OPTIONS] <PROJECT>
//!
//! Options:
//!   -c, --config <FILE>    Engine settings (TOML), replacing the project's [settings]
//!   -a, --arrange          Re-run auto-position for every module's sub-models
//!   --no-panels            Leave panels out of the report
//!   --deny-violations      Exit non-zero when any error-level rule is violated
//!   -d, --debug            Verbose logging to stderr
//!   -h, --help             Print help

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cabinet_configurator::registry::PassthroughMaterials;
use cabinet_configurator::{
    configure_with_options, ConfigureError, ConfigureOptions, ConfiguratorConfig, ReportConfig,
    SceneLog,
};

#[derive(Parser)]
#[command(name = "cabinet-configurator")]
#[command(about = "Panel decomposition, layout and rule checks for cabinet projects")]
struct Cli {
    /// Project file (TOML)
    project: PathBuf,

    /// Engine settings file (TOML), replacing the project's [settings]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Re-run auto-position for every module's sub-models
    #[arg(short, long)]
    arrange: bool,

    /// Leave panels out of the report
    #[arg(long)]
    no_panels: bool,

    /// Exit with status 2 when any error-level rule is violated
    #[arg(long)]
    deny_violations: bool,

    /// Verbose logging to stderr
    #[arg(short, long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let settings = match &cli.config {
        Some(path) => match ConfiguratorConfig::from_file(path) {
            Ok(c) => Some(c),
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => None,
    };

    let source = match fs::read_to_string(&cli.project) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", cli.project.display(), e);
            std::process::exit(1);
        }
    };

    let mut options = ConfigureOptions::new()
        .with_arrange(cli.arrange)
        .with_report(ReportConfig::new().with_panels(!cli.no_panels));
    if let Some(settings) = settings {
        options = options.with_settings(settings);
    }

    let mut configured = match configure_with_options(&source, options) {
        Ok(configured) => configured,
        Err(ConfigureError::Project(e)) => {
            let filename = cli.project.display().to_string();
            eprintln!("{}", e.format(&source, &filename));
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if cli.debug {
        let mut scene: SceneLog<String> = SceneLog::new();
        let applied = configured.registry.sync(&mut scene, &PassthroughMaterials);
        debug!(applied, nodes = scene.nodes.len(), "scene preview");
    }

    println!("{}", configured.report);

    if cli.deny_violations && configured.errors > 0 {
        eprintln!("{} rule violation(s) at error level", configured.errors);
        std::process::exit(2);
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
