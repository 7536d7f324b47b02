#![allow(unused)]

use std::path::PathBuf;

use crate::prelude::*;
use crate::prelude::eprintln;
use clap::Parser;

mod error;
mod extract;
mod prelude;
mod settings;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Rebuild readable text, with line and paragraph breaks, from the positioned text runs of a PDF"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// TOML file with reconstruction thresholds
    #[clap(long, env = "REFLOW_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[clap(flatten)]
    tuning: settings::Tuning,

    /// Whether to display additional information.
    #[clap(long, env = "REFLOW_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommands {
    /// Print the reconstructed text of a document
    Text(extract::TextOptions),

    /// Print the reconstructed text of each page as JSON
    Pages(extract::PagesOptions),

    /// Dump the raw positioned fragments as JSON
    Fragments(extract::FragmentsOptions),

    /// Print document metadata
    Info(extract::InfoOptions),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();
    let config = settings::resolve(app.global.config.as_ref(), &app.global.tuning)?;

    if app.global.verbose {
        eprintln!("{}", serde_json::to_string_pretty(&config)?);
    }

    match app.command {
        SubCommands::Text(options) => extract::text(options, config).await,
        SubCommands::Pages(options) => extract::pages(options, config).await,
        SubCommands::Fragments(options) => extract::fragments(options, config).await,
        SubCommands::Info(options) => extract::info(options).await,
    }
}
