// Headless companion of the drawing app: classify image files and manage
// model artifacts from the command line.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use live_mnist::commands;
use live_mnist::config::AppConfig;
use live_mnist::logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "live-mnist",
    version,
    about = "Classify hand-drawn digits with a pretrained MNIST model"
)]
struct Cli {
    /// Directory holding default.toml
    #[arg(long, env = "LIVE_MNIST_CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Model artifact to use instead of `model.path`
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify an image file (png or jpg)
    Classify {
        image: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the layers of the model
    Inspect,
    /// Write a randomly initialized model artifact
    ScaffoldModel {
        #[arg(long)]
        out: PathBuf,
        /// Hidden layer width, 0 for a single linear layer
        #[arg(long, default_value_t = 128)]
        hidden: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_from(&cli.config_dir)
        .with_context(|| format!("loading configuration from {}", cli.config_dir.display()))?;
    if let Some(model) = cli.model {
        config.model.path = model;
    }
    logging::init(&config.logging);

    match cli.command {
        Command::Classify { image, json } => {
            let report = commands::classify(&config, &image).with_context(|| {
                format!(
                    "classifying {} with {}",
                    image.display(),
                    config.model.path.display()
                )
            })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.table());
            }
        }
        Command::Inspect => {
            let description = commands::inspect(&config)
                .with_context(|| format!("loading model {}", config.model.path.display()))?;
            print!("{}", description);
        }
        Command::ScaffoldModel { out, hidden, seed } => {
            let network = commands::scaffold(&out, hidden, seed)
                .with_context(|| format!("writing model {}", out.display()))?;
            println!("Wrote {} ({} parameters)", out.display(), network.parameter_count());
        }
    }
    Ok(())
}
