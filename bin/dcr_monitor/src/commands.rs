use std::collections::BTreeMap;

use serde::Serialize;

use dcr_error::io::{FromIo, IoError, IoResult};
use dcr_stubs::job::JobPartial;

use crate::cli::{JobCommand, JobSubmitOpts};
use crate::repositories::JobStore;

/// Split `KEY=VALUE` pairs given with `--env`
pub fn parse_envs(envs: &[String]) -> IoResult<BTreeMap<String, String>> {
  envs
    .iter()
    .map(|env| match env.split_once('=') {
      Some((key, value)) if !key.is_empty() => {
        Ok((key.to_owned(), value.to_owned()))
      }
      _ => Err(IoError::invalid_input(
        "Env",
        format!("{env} is not in the KEY=VALUE format"),
      )),
    })
    .collect()
}

impl TryFrom<&JobSubmitOpts> for JobPartial {
  type Error = IoError;

  fn try_from(opts: &JobSubmitOpts) -> Result<Self, Self::Error> {
    Ok(JobPartial {
      creator: opts.creator.clone(),
      jupyter_file_name: opts.jupyter_file_name.clone(),
      build_context_path: opts.build_context_path.clone(),
      output_put_signed_url: opts.output_url.clone(),
      custom_token_put_signed_url: opts.custom_token_url.clone(),
      extra_envs: parse_envs(&opts.envs)?,
    })
  }
}

fn print_json<T: Serialize>(item: &T) -> IoResult<()> {
  let json = serde_json::to_string_pretty(item)
    .map_err(|err| err.map_err_context(|| "Job"))?;
  println!("{json}");
  Ok(())
}

/// Execute a job command against the store
pub async fn exec_job<S: JobStore>(
  store: &S,
  cmd: &JobCommand,
) -> IoResult<()> {
  match cmd {
    JobCommand::List { creator } => {
      let jobs = store.list_by_creator(creator).await?;
      print_json(&jobs)
    }
    JobCommand::Inspect { uuid } => {
      let job = store.find_by_uuid(uuid).await?;
      print_json(&job)
    }
    JobCommand::Remove { uuid } => {
      store.delete_by_uuid(uuid).await?;
      log::info!("job: {uuid} removed");
      Ok(())
    }
    JobCommand::Submit(opts) => {
      let item = JobPartial::try_from(opts)?;
      let job = store.create(&item).await?;
      log::info!("job: {} submitted by {}", job.uuid, job.creator);
      print_json(&job)
    }
  }
}
