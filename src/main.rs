use clap::Parser;
use dotenvy::dotenv;
use s3edit::config::EditConfig;
use s3edit::edit_object;
use s3edit::infrastructure::storage;
use s3edit::services::prompt::TerminalPicker;
use s3edit::services::session::SessionOutcome;
use std::path::PathBuf;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Edit a single S3 object in a local editor and upload it only if it changed.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bucket holding the object
    bucket: String,

    /// AWS region [default: eu-west-1, or AWS_REGION]
    #[arg(long)]
    region: Option<String>,

    /// Custom S3-compatible endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Use path-style bucket addressing
    #[arg(long)]
    path_style: bool,

    /// Key prefix to use
    #[arg(short, long, default_value = "")]
    prefix: String,

    /// Which editor to use; only a terminal editor will function properly
    #[arg(short, long)]
    editor: Option<String>,

    /// Directory for the temporary local copy
    #[arg(long)]
    staging_dir: Option<PathBuf>,

    /// Refuse to upload if the object changed since it was downloaded
    #[arg(long)]
    if_match: bool,
}

impl Args {
    fn apply(self, mut config: EditConfig) -> (EditConfig, String, String) {
        if let Some(region) = self.region {
            config.region = region;
        }
        if self.endpoint.is_some() {
            config.endpoint_url = self.endpoint;
        }
        if let Some(editor) = self.editor {
            config.editor = editor;
        }
        if let Some(dir) = self.staging_dir {
            config.staging_dir = dir;
        }
        config.force_path_style |= self.path_style;
        config.conditional_upload |= self.if_match;
        (config, self.bucket, self.prefix)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "s3edit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let (config, bucket, prefix) = args.apply(EditConfig::from_env());
    let store = storage::setup_storage(&config, &bucket).await;

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let mut picker = TerminalPicker::new();
    let result = edit_object(&store, &config, &prefix, &mut picker, cancel).await;
    watcher.abort();

    match result {
        Ok(report) => {
            match report.outcome {
                SessionOutcome::Uploaded => info!("✅ {} updated", report.object),
                SessionOutcome::Skipped => info!("✅ {} left unchanged", report.object),
            }
            Ok(())
        }
        Err(e) => {
            error!("❌ {}", e);
            std::process::exit(1);
        }
    }
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if signal::ctrl_c().await.is_ok() {
        info!("⌨️  Ctrl+C received, cancelling...");
        cancel.cancel();
    }
}
