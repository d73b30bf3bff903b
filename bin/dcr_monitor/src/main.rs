#[macro_use]
extern crate diesel;

use std::time::Duration;

use clap::Parser;

use dcr_utils::logger;
use dcr_error::io::{FromIo, IoResult};
use dcr_stubs::config::{MonitorConfig, TeeBackendKind};

mod cli;
mod commands;
mod tee;
mod utils;
mod config;
mod models;
mod schema;
mod server;
mod version;
mod reconciler;
mod repositories;
mod image_builder;

use cli::{Cli, Command, JobCommand};
use image_builder::Kaniko;
use reconciler::Reconciler;
use repositories::job::PgJobStore;
use tee::{ConfidentialSpace, MockTee, TeeBackend};
use utils::{dockerfile, gcp::GcpAuth, k8s::K8sClient, registry::Registry};

/// Select the tee backend from the config
fn gen_tee_backend(config: &MonitorConfig, k8s: &K8sClient) -> TeeBackend {
  match config.tee_backend {
    TeeBackendKind::Gcp => TeeBackend::ConfidentialSpace(
      ConfidentialSpace::new(&config.gcp, GcpAuth::from_env()),
    ),
    TeeBackendKind::Mock => TeeBackend::Mock(MockTee::new(k8s.clone())),
  }
}

async fn run(cli: &Cli) -> IoResult<()> {
  logger::enable_logger("dcr_monitor");
  log::info!(
    "dcr_monitor_{}_{}_v{}:{}",
    version::ARCH,
    version::CHANNEL,
    version::VERSION,
    version::COMMIT_ID
  );
  let config = config::init(cli)?;
  log::info!(
    "dcr_monitor: tee backend {:?}, registry {:?}, storage {:?}, namespace {}",
    config.tee_backend,
    config.registry,
    config.storage,
    config.namespace
  );
  let pool = utils::store::init(&config.store_url).await?;
  let k8s = K8sClient::in_cluster(&config.namespace)?;
  let builder = Kaniko::new(k8s.clone(), config.minio.clone());
  let tee = gen_tee_backend(&config, &k8s);
  let reconciler = Reconciler::new(
    builder,
    tee,
    PgJobStore::new(pool),
    Registry::new(&config),
    &config,
  );
  let interval = Duration::from_secs(config.tick_interval);
  ntex::rt::spawn(async move {
    reconciler.run(interval).await;
  });
  let server = server::gen(&config.health_host)
    .map_err(|err| err.map_err_context(|| "Health server"))?;
  server
    .await
    .map_err(|err| err.map_err_context(|| "Health server"))?;
  log::info!("dcr_monitor: shutdown");
  Ok(())
}

async fn exec_job(cli: &Cli, command: &JobCommand) -> IoResult<()> {
  logger::enable_logger("dcr_monitor");
  let config = config::load(cli)?;
  let pool = utils::store::init(&config.store_url).await?;
  commands::exec_job(&PgJobStore::new(pool), command).await
}

#[ntex::main]
async fn main() -> std::io::Result<()> {
  let cli = Cli::parse();
  let res = match &cli.command {
    Some(Command::Dockerfile { allow_env }) => {
      print!("{}", dockerfile::generate(allow_env.as_slice()));
      Ok(())
    }
    Some(Command::Job { command }) => exec_job(&cli, command).await,
    None => run(&cli).await,
  };
  if let Err(err) = res {
    err.print_and_exit();
  }
  Ok(())
}
