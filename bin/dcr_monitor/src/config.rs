use dcr_error::io::{FromIo, IoError, IoResult};
use dcr_stubs::config::{
  GcpConfig, MinioConfig, MonitorConfig, MonitorConfigFile, RegistryKind,
  StorageKind, TeeBackendKind,
};

use crate::cli::Cli;
use crate::utils::k8s;

const CONFIG_FILE_NAME: &str = "dcr_monitor.yml";

/// Pick the first defined value between the cli (flag or environment)
/// and the config file
fn merge<T: Clone>(arg: &Option<T>, file: &Option<T>) -> Option<T> {
  arg.clone().or_else(|| file.clone())
}

fn gen_monitor_conf(args: &Cli, file: &MonitorConfigFile) -> MonitorConfig {
  let default = MonitorConfig::default();
  let default_gcp = GcpConfig::default();
  let namespace = merge(&args.namespace, &file.namespace)
    .or_else(k8s::read_service_account_namespace)
    .unwrap_or(default.namespace);
  MonitorConfig {
    store_url: merge(&args.store_url, &file.store_url)
      .unwrap_or(default.store_url),
    namespace,
    tee_backend: merge(&args.tee_backend, &file.tee_backend)
      .unwrap_or(default.tee_backend),
    registry: merge(&args.registry, &file.registry)
      .unwrap_or(default.registry),
    storage: merge(&args.storage, &file.storage).unwrap_or(default.storage),
    gcp: GcpConfig {
      project: merge(&args.project, &file.project)
        .unwrap_or(default_gcp.project),
      region: merge(&args.region, &file.region).unwrap_or(default_gcp.region),
      zone: merge(&args.zone, &file.zone).unwrap_or(default_gcp.zone),
      env: merge(&args.env, &file.env).unwrap_or(default_gcp.env),
      debug: merge(&args.debug, &file.debug).unwrap_or(default_gcp.debug),
    },
    minio: None,
    tick_interval: merge(&args.tick_interval, &file.tick_interval)
      .unwrap_or(default.tick_interval),
    job_timeout: merge(&args.job_timeout, &file.job_timeout)
      .unwrap_or(default.job_timeout),
    call_timeout: merge(&args.call_timeout, &file.call_timeout)
      .unwrap_or(default.call_timeout),
    health_host: merge(&args.health_host, &file.health_host)
      .unwrap_or(default.health_host),
  }
}

fn read_config_file(conf_dir: &str) -> IoResult<MonitorConfigFile> {
  let config_path = std::path::Path::new(conf_dir).join(CONFIG_FILE_NAME);
  if !config_path.exists() {
    return Ok(MonitorConfigFile::default());
  }
  let context = || format!("Config file {}", config_path.display());
  let content = std::fs::read_to_string(&config_path)
    .map_err(|err| err.map_err_context(context))?;
  let config = serde_yaml::from_str::<MonitorConfigFile>(&content)
    .map_err(|err| err.map_err_context(context))?;
  Ok(config)
}

/// Credentials handed to the builder pods when build contexts live in MinIO
fn read_minio_env() -> IoResult<MinioConfig> {
  let read = |name: &str| {
    std::env::var(name).map_err(|_| {
      IoError::invalid_input(
        "Config",
        format!("{name} is required for minio storage"),
      )
    })
  };
  Ok(MinioConfig {
    access_key_id: read("AWS_ACCESS_KEY_ID")?,
    secret_access_key: read("AWS_SECRET_ACCESS_KEY")?,
    endpoint: read("S3_ENDPOINT")?,
  })
}

/// Reject combinations the monitor cannot run with
fn validate(config: &MonitorConfig) -> IoResult<()> {
  let needs_project = config.tee_backend == TeeBackendKind::Gcp
    || config.registry == RegistryKind::Gcp;
  if needs_project && config.gcp.project.is_empty() {
    return Err(IoError::invalid_input(
      "Config",
      "a gcp project is required by the gcp tee backend and registry",
    ));
  }
  if config.storage == StorageKind::Minio && config.minio.is_none() {
    return Err(IoError::invalid_input(
      "Config",
      "minio credentials are missing",
    ));
  }
  for (name, value) in [
    ("tick interval", config.tick_interval),
    ("job timeout", config.job_timeout),
    ("call timeout", config.call_timeout),
  ] {
    if value == 0 {
      return Err(IoError::invalid_input(
        "Config",
        format!("{name} must be greater than 0"),
      ));
    }
  }
  Ok(())
}

/// ## Init
///
/// Build the monitor config from `<conf_dir>/dcr_monitor.yml` and the cli.
/// Flags and environment variables take priority over the file.
///
pub fn init(args: &Cli) -> IoResult<MonitorConfig> {
  let mut config = load(args)?;
  if config.storage == StorageKind::Minio {
    config.minio = Some(read_minio_env()?);
  }
  validate(&config)?;
  Ok(config)
}

/// Merge the config without checking the backends, enough to reach the store
pub fn load(args: &Cli) -> IoResult<MonitorConfig> {
  let file_config = read_config_file(&args.conf_dir)?;
  Ok(gen_monitor_conf(args, &file_config))
}
