use std::path::PathBuf;

use clap::Parser;
use log::info;

use dom_onboarding::logging::{level_for_verbosity, setup_logging};
use dom_onboarding::settings::{load_settings, DEFAULT_SETTINGS_PATH};
use dom_onboarding::web;

#[derive(Parser)]
#[command(name = "dom-onboarding", version, about = "DOM tenant onboarding backend")]
struct Cli {
    /// Settings file (YAML)
    #[arg(short, long, env = "DOM_ONBOARDING_CONFIG", default_value = DEFAULT_SETTINGS_PATH)]
    config: PathBuf,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Also append logs to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(level_for_verbosity(cli.verbose), cli.log_file.as_deref())?;

    let config = load_settings(&cli.config)?;
    info!(
        "Writing onboarding output to {}",
        config.onboarding.output_dir.display()
    );

    web::start_web_server(&config).await
}
