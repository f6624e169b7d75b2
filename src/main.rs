use clap::Parser;
use sitedeploy::store::{S3Store, StoreConfig};
use sitedeploy::upload::{self, PublishOptions};
use sitedeploy::{output, retry::RetryPolicy};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

#[derive(Parser)]
#[command(name = "sitedeploy")]
#[command(about = "Publish a static site directory to an S3 bucket")]
#[command(long_about = "\
Publish a static site directory to an S3 bucket

Every regular file under the source directory is uploaded to the bucket under
its relative path, with Content-Type (text/* always UTF-8), Cache-Control and
Content-Encoding derived per object. Uploads run concurrently and each object
is retried a few times before the run is marked failed.

Per-site rules live in sitedeploy.json at the publish root (never uploaded):

  {
    \"gzip_mimetypes\": [\"text/html\", \"text/css\", \"application/javascript\"],
    \"object_specific\": [
      { \"path\": \"^images/.*\", \"gzip\": false,
        \"headers\": { \"Cache-Control\": \"max-age=86400\" } }
    ]
  }

Directives are regular expressions matched against the destination key in
declared order, anchored at the start; the first match wins.

All flags can come from SITEDEPLOY_* environment variables, which is how CI
pipelines are expected to drive this tool.")]
#[command(version)]
struct Cli {
    /// Directory containing the built site
    #[arg(long, env = "SITEDEPLOY_SOURCE_DIR")]
    source_dir: PathBuf,

    /// Subdirectory of source-dir to publish instead of the whole tree
    #[arg(long, env = "SITEDEPLOY_DEPLOY_DIR")]
    deploy_dir: Option<PathBuf>,

    /// Destination bucket name
    #[arg(long, env = "SITEDEPLOY_BUCKET_NAME")]
    bucket: String,

    /// Access key id for the bucket
    #[arg(long, env = "SITEDEPLOY_ACCESS_KEY_ID")]
    access_key_id: String,

    /// Secret access key for the bucket
    #[arg(long, env = "SITEDEPLOY_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: String,

    /// Bucket region (falls back to the ambient AWS configuration)
    #[arg(long, env = "SITEDEPLOY_REGION")]
    region: Option<String>,

    /// Custom endpoint URL for S3-compatible stores
    #[arg(long, env = "SITEDEPLOY_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "SITEDEPLOY_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Maximum concurrent uploads
    #[arg(long, default_value_t = upload::DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Upload attempts per object before giving up
    #[arg(long, default_value_t = 4)]
    max_attempts: u32,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&cli.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let root = match &cli.deploy_dir {
        Some(deploy_dir) => cli.source_dir.join(deploy_dir),
        None => cli.source_dir.clone(),
    };

    let store_config = {
        let mut config =
            StoreConfig::new(&cli.bucket, &cli.access_key_id, &cli.secret_access_key);
        if let Some(region) = &cli.region {
            config = config.with_region(region);
        }
        if let Some(endpoint) = &cli.endpoint_url {
            config = config.with_endpoint(endpoint);
        }
        config
    };
    let store = Arc::new(S3Store::connect(&store_config).await);

    let options = PublishOptions {
        concurrency: cli.concurrency,
        retry: RetryPolicy::new(cli.max_attempts.max(1)),
    };

    match upload::publish(&root, store, &options).await {
        Ok(report) => {
            output::print_publish_report(&report);
            if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!(error = %e, "publish aborted");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
