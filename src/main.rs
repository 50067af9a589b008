use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use image::GenericImageView;
use rust_image_transfer::infrastructure::storage;
use rust_image_transfer::{
    ConsoleUi, DisplayTarget, ImageFormat, ObjectKey, RemoteLocation, TransferConfig,
    TransferOutcome, TransferRequest, TransferService,
};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the configured bucket is reachable
    Probe,

    /// Upload an image file, re-encoded as PNG (or JPEG with --jpeg)
    Upload {
        #[arg(short, long)]
        image: PathBuf,

        /// Object key; generated from the current time when omitted
        #[arg(short, long)]
        key: Option<String>,

        #[arg(long)]
        jpeg: bool,
    },

    /// Upload any local file unchanged
    UploadFile {
        #[arg(short, long)]
        path: PathBuf,

        #[arg(short, long)]
        key: String,
    },

    /// Download an image and write it to the output path
    Download {
        #[arg(short, long)]
        key: String,

        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_image_transfer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Rust Image Transfer...");

    let config = TransferConfig::from_env();
    info!(
        "🗂️  Staging Dir={}, Upload Prefix={}",
        config.staging_dir.display(),
        config.upload_prefix
    );

    let upload_prefix = config.upload_prefix.clone();
    let client = storage::setup_storage(&config).await;
    let service = Arc::new(TransferService::new(client, Arc::new(ConsoleUi), config));

    let summary = match args.command {
        Command::Probe => {
            service.probe().await?;
            json!({ "status": "ok" })
        }
        Command::Upload {
            image: image_path,
            key,
            jpeg,
        } => {
            let source = image::open(&image_path)?;
            let key = key.map(ObjectKey::new).transpose()?;

            if jpeg {
                let format = ImageFormat::Jpeg;
                let key =
                    key.unwrap_or_else(|| ObjectKey::generate(&upload_prefix, format.extension()));
                let location = service.upload_image(&source, key, format).await?;
                location_summary(&location)
            } else {
                outcome_summary(&service.upload(Some(source), key).await?)
            }
        }
        Command::UploadFile { path, key } => {
            let location = service.upload_file(&path, ObjectKey::new(key)?).await?;
            location_summary(&location)
        }
        Command::Download { key, output } => {
            let destination = Some(DisplayTarget::new(output.to_string_lossy()));
            // Runs on its own task, the way a UI click would issue it.
            let outcome = service
                .spawn(TransferRequest::Download { key, destination })
                .await??;
            outcome_summary(&outcome)
        }
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn location_summary(location: &RemoteLocation) -> Value {
    json!({
        "status": "uploaded",
        "location": location.to_string(),
        "size": location.size,
        "etag": location.etag,
    })
}

fn outcome_summary(outcome: &TransferOutcome) -> Value {
    match outcome {
        TransferOutcome::Uploaded { location } => location_summary(location),
        TransferOutcome::Downloaded { key, image } => {
            let (width, height) = image.dimensions();
            json!({
                "status": "downloaded",
                "key": key,
                "width": width,
                "height": height,
            })
        }
    }
}
