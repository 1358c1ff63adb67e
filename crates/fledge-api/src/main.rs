//! fledge server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite registration store, and serves the registration API over HTTP.
//! When no transactional-mail endpoint is configured, outbound emails are
//! logged instead of sent.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use fledge_api::{AppState, ServerConfig};
use fledge_core::lifecycle::RegistrationService;
use fledge_mailer::{EmailNotifier, HttpMailer, LogSender, MailSender};
use fledge_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Fledge registration server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("FLEDGE"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  server_cfg.validate().context("invalid configuration")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Pick the mail transport.
  match server_cfg.mail.endpoint.clone() {
    Some(endpoint) => {
      let token = server_cfg
        .mail
        .token
        .clone()
        .context("mail.token is required when mail.endpoint is set")?;
      let mailer =
        HttpMailer::new(endpoint, token, server_cfg.mail.from.clone());
      serve(store, EmailNotifier::new(mailer), server_cfg).await
    }
    None => {
      tracing::warn!("no mail endpoint configured; emails will only be logged");
      serve(store, EmailNotifier::new(LogSender), server_cfg).await
    }
  }
}

async fn serve<M>(
  store: SqliteStore,
  notifier: EmailNotifier<M>,
  cfg: ServerConfig,
) -> anyhow::Result<()>
where
  M: MailSender + 'static,
{
  let service = RegistrationService::new(
    store,
    notifier,
    cfg.school_profile(),
    cfg.base_fee,
  );
  let state = AppState { service: Arc::new(service) };

  let app = fledge_api::router(state).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
