mod app;
mod cache;
mod config;
mod loader;
mod output;
mod store;
mod supabase;
mod watch;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(about = "Terminal client for a studio project portfolio")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./folio.yaml, then $XDG_CONFIG_HOME/folio/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Print the listing as JSON
  #[arg(long)]
  json: bool,

  /// Bypass the cache and fetch from the store
  #[arg(long)]
  refresh: bool,

  /// Stay running and reprint when the store reports changes
  #[arg(short, long)]
  watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  // Logs go to stderr so piped output stays clean
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  let config = config::Config::load(args.config.as_deref())?;
  let format = if args.json {
    output::OutputFormat::Json
  } else {
    output::OutputFormat::Pretty
  };

  let app = app::App::new(config, format)?;
  if args.watch {
    app.run_watch(args.refresh).await
  } else {
    app.run_once(args.refresh).await
  }
}
