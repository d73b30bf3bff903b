use clap::{Args, Parser, Subcommand};

use dcr_stubs::config::{RegistryKind, StorageKind, TeeBackendKind};

/// Data clean room monitor
/// Drives every submitted job from image build to attested execution
#[derive(Debug, Clone, Parser)]
#[command(name = "dcr_monitor")]
#[command(author = "manatee contributors")]
#[command(version)]
pub struct Cli {
  /// Config directory
  #[clap(long, default_value = "/etc/dcr")]
  pub(crate) conf_dir: String,
  /// Postgres url of the job store
  #[clap(long, env = "DATABASE_URL")]
  pub(crate) store_url: Option<String>,
  /// Kubernetes namespace of the builder and mock jobs
  /// [default: namespace of the service account]
  #[clap(long, env = "POD_NAMESPACE")]
  pub(crate) namespace: Option<String>,
  /// Backend running the attested instances [default: mock]
  #[clap(long, env = "TEE_BACKEND", value_enum, ignore_case = true)]
  pub(crate) tee_backend: Option<TeeBackendKind>,
  /// Registry receiving the built images [default: gcp]
  #[clap(long, env = "REGISTRY_TYPE", value_enum, ignore_case = true)]
  pub(crate) registry: Option<RegistryKind>,
  /// Object storage holding the build contexts [default: gcs]
  #[clap(long, env = "STORAGE_TYPE", value_enum, ignore_case = true)]
  pub(crate) storage: Option<StorageKind>,
  /// GCP project id
  #[clap(long, env = "PROJECT_ID")]
  pub(crate) project: Option<String>,
  /// GCP region [default: us-west1]
  #[clap(long, env = "REGION")]
  pub(crate) region: Option<String>,
  /// GCP zone the instances are created in [default: us-west1-b]
  #[clap(long, env = "ZONE")]
  pub(crate) zone: Option<String>,
  /// Deployment environment [default: dev]
  #[clap(long, env = "ENV")]
  pub(crate) env: Option<String>,
  /// Use the debug confidential space image
  #[clap(
    long,
    env = "DEBUG",
    value_parser = clap::builder::BoolishValueParser::new()
  )]
  pub(crate) debug: Option<bool>,
  /// Seconds between two reconciliation ticks [default: 10]
  #[clap(long, env = "TICK_INTERVAL")]
  pub(crate) tick_interval: Option<u64>,
  /// Seconds after which a job is failed [default: 21600]
  #[clap(long, env = "JOB_TIMEOUT")]
  pub(crate) job_timeout: Option<u64>,
  /// Seconds a single backend call may take [default: 300]
  #[clap(long, env = "CALL_TIMEOUT")]
  pub(crate) call_timeout: Option<u64>,
  /// Address of the health server [default: tcp://0.0.0.0:8080]
  #[clap(long, env = "HEALTH_HOST")]
  pub(crate) health_host: Option<String>,
  #[clap(subcommand)]
  pub(crate) command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
  /// Print the Dockerfile injected in build contexts
  Dockerfile {
    /// Environment variable the instance operator may override
    #[clap(long = "allow-env")]
    allow_env: Vec<String>,
  },
  /// Manage the job records of the store
  Job {
    #[clap(subcommand)]
    command: JobCommand,
  },
}

#[derive(Debug, Clone, Subcommand)]
pub enum JobCommand {
  /// List the jobs of a creator
  #[clap(alias("ls"))]
  List {
    #[clap(long)]
    creator: String,
  },
  /// Show a job
  Inspect { uuid: String },
  /// Delete a job record
  #[clap(alias("rm"))]
  Remove { uuid: String },
  /// Insert a job in `Created` status
  Submit(JobSubmitOpts),
}

#[derive(Debug, Clone, Args)]
pub struct JobSubmitOpts {
  #[clap(long)]
  pub(crate) creator: String,
  /// Notebook executed in the instance
  #[clap(long)]
  pub(crate) jupyter_file_name: String,
  /// Location of the build context tarball
  #[clap(long)]
  pub(crate) build_context_path: String,
  /// Signed url receiving the executed notebook
  #[clap(long)]
  pub(crate) output_url: String,
  /// Signed url receiving the attestation token
  #[clap(long)]
  pub(crate) custom_token_url: String,
  /// Environment variable given to the instance as KEY=VALUE
  #[clap(long = "env")]
  pub(crate) envs: Vec<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cli_with_default() {
    let args = Cli::parse_from(["dcr_monitor"]);
    assert_eq!(args.conf_dir, "/etc/dcr");
    assert!(args.command.is_none());
  }

  #[test]
  fn cli_with_valid_args() {
    let args = Cli::parse_from([
      "dcr_monitor",
      "--tee-backend",
      "gcp",
      "--storage",
      "minio",
      "--project",
      "dcr-project",
      "--debug",
      "true",
      "--tick-interval",
      "30",
    ]);
    assert_eq!(args.tee_backend, Some(TeeBackendKind::Gcp));
    assert_eq!(args.storage, Some(StorageKind::Minio));
    assert_eq!(args.project.as_deref(), Some("dcr-project"));
    assert_eq!(args.debug, Some(true));
    assert_eq!(args.tick_interval, Some(30));
  }

  #[test]
  fn cli_dockerfile_command() {
    let args = Cli::parse_from([
      "dcr_monitor",
      "dockerfile",
      "--allow-env",
      "USER_TOKEN",
      "--allow-env",
      "BREAKPOINT",
    ]);
    match args.command {
      Some(Command::Dockerfile { allow_env }) => {
        assert_eq!(allow_env, vec!["USER_TOKEN", "BREAKPOINT"]);
      }
      _ => panic!("expected dockerfile command"),
    }
  }

  #[test]
  fn cli_job_submit_command() {
    let args = Cli::parse_from([
      "dcr_monitor",
      "job",
      "submit",
      "--creator",
      "alice",
      "--jupyter-file-name",
      "train.ipynb",
      "--build-context-path",
      "gs://bucket/alice/ctx.tar.gz",
      "--output-url",
      "https://storage/out",
      "--custom-token-url",
      "https://storage/token",
      "--env",
      "USER_TOKEN=secret",
    ]);
    let Some(Command::Job {
      command: JobCommand::Submit(opts),
    }) = args.command
    else {
      panic!("expected job submit command");
    };
    assert_eq!(opts.creator, "alice");
    assert_eq!(opts.envs, vec!["USER_TOKEN=secret"]);
  }

  #[test]
  fn cli_job_ls_alias() {
    let args =
      Cli::parse_from(["dcr_monitor", "job", "ls", "--creator", "bob"]);
    assert!(matches!(
      args.command,
      Some(Command::Job {
        command: JobCommand::List { .. }
      })
    ));
  }
}
