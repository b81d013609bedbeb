use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lipi::config::Config;
use lipi::ocr::{EngineKind, EngineSelector, OcrProvider, RawImage, ScriptRegistry};
use lipi::LipiError;

#[derive(Parser)]
#[command(name = "lipi")]
#[command(about = "Script-aware OCR for Indic word images")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract text from an image
    Extract {
        /// Script the image is written in (e.g. Hindi, Tamil, Bengali)
        #[arg(long, short)]
        script: String,

        /// Image file to read
        image: PathBuf,

        /// Also write the preprocessed image to this PNG path
        #[arg(long)]
        dump_preprocessed: Option<PathBuf>,
    },
    /// List supported scripts with their strategy and engine codes
    Scripts,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lipi=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();

    match args.command {
        Command::Scripts => {
            let selector = EngineSelector::from_model(&config.ocr.model);
            println!(
                "{:<10} {:<11} {:<7} {:<7} engine",
                "script", "strategy", "neural", "remote"
            );
            for entry in ScriptRegistry::global().entries() {
                let engine = selector
                    .engine_for(entry.script)
                    .map(|e| e.to_string())
                    .unwrap_or_else(|_| "-".to_string());
                println!(
                    "{:<10} {:<11} {:<7} {:<7} {}",
                    entry.script.name(),
                    entry.strategy.name(),
                    entry.neural_code,
                    entry.service_code,
                    engine
                );
            }
        }
        Command::Extract {
            script,
            image,
            dump_preprocessed,
        } => {
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("failed to read {}", image.display()))?;
            let file_name = image
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            let raw = RawImage::new(bytes, file_name, None);

            tracing::info!(
                model = %config.ocr.model,
                image = %image.display(),
                bytes = raw.len(),
                "Starting extraction"
            );
            let ocr = OcrProvider::new(&config.ocr)?;

            if let Some(path) = dump_preprocessed {
                let processed = ocr.preprocess(&raw, &script).await?;
                processed
                    .save(&path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                tracing::info!(path = %path.display(), "Wrote preprocessed image");
            }

            let text = ocr.extract(&raw, &script).await;
            ocr.shutdown();

            let text = match text {
                Ok(text) => text,
                Err(
                    e @ LipiError::EngineUnavailable {
                        engine: EngineKind::RemoteService,
                        ..
                    },
                ) => return Err(e).context("set OCR_API_KEY to use the OCR.space backend"),
                Err(e) if e.is_client_error() => {
                    return Err(e).context("run `lipi scripts` to list accepted script names")
                }
                Err(e) => return Err(e.into()),
            };
            println!("{text}");
        }
    }

    Ok(())
}
