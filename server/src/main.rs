use anyhow::Context;
use clap::{Parser, Subcommand};
use gnn::ModelWeights;
use graphclass_core::config::{AppConfig, LogFormat};
use pipeline::Predictor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "graphclass")]
#[command(about = "Classify edge-list graphs as tree, dag or cyclic", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Config file (defaults to config/default + config/$RUN_MODE)
        #[arg(short, long, env = "GRAPHCLASS_CONFIG")]
        config: Option<PathBuf>,

        /// Emit JSON logs regardless of `log.format`
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Convert a JSON state_dict export into the weights archive
    ImportWeights {
        /// state_dict JSON file
        input: PathBuf,
        /// Output archive
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, json } => {
            let config = match config {
                Some(path) => AppConfig::load_from(&path)
                    .with_context(|| format!("failed to load config from {}", path.display()))?,
                None => AppConfig::load().context("failed to load config")?,
            };

            let format = if json { LogFormat::Json } else { config.log.format };
            graphclass_core::init_tracing(format);

            let predictor = Predictor::from_config(&config).context("failed to initialise model")?;
            info!(
                addr = %config.server.bind_addr(),
                model_loaded = predictor.model().is_loaded(),
                "starting graphclass"
            );

            server::serve(&config.server, Arc::new(predictor)).await
        }
        Command::ImportWeights { input, output } => {
            graphclass_core::init_tracing(LogFormat::Pretty);

            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let weights = ModelWeights::from_state_dict_json(&raw)?;
            weights.save(&output)?;

            info!(
                output = %output.display(),
                architecture = %weights.architecture(),
                "wrote weights archive"
            );
            Ok(())
        }
    }
}
