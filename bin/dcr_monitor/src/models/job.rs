use std::collections::BTreeMap;

use dcr_error::io::{FromIo, IoResult};
use dcr_stubs::job::{Job, JobPartial, JobStatus};

use crate::schema::jobs;

/// Row of the `jobs` table
#[derive(Clone, Debug, Queryable, Identifiable, Insertable, Selectable)]
#[diesel(primary_key(uuid))]
#[diesel(table_name = jobs)]
pub struct JobDb {
  pub uuid: String,
  pub creator: String,
  /// Stored as the status name, see [JobStatus](JobStatus)
  pub status: String,
  pub jupyter_file_name: String,
  pub build_context_path: String,
  pub output_put_signed_url: String,
  pub custom_token_put_signed_url: String,
  pub docker_image: Option<String>,
  pub docker_image_digest: Option<String>,
  pub instance_name: Option<String>,
  /// Json object of string values
  pub extra_envs: serde_json::Value,
  pub created_at: chrono::NaiveDateTime,
  pub updated_at: chrono::NaiveDateTime,
}

/// Fields the reconciler rewrites on a job
#[derive(Debug, AsChangeset)]
#[diesel(table_name = jobs)]
#[diesel(treat_none_as_null = true)]
pub struct JobUpdateDb {
  pub status: String,
  pub docker_image: Option<String>,
  pub docker_image_digest: Option<String>,
  pub instance_name: Option<String>,
  pub updated_at: chrono::NaiveDateTime,
}

impl JobDb {
  pub fn from_partial(uuid: &str, item: &JobPartial) -> IoResult<Self> {
    let job = Job::from_partial(uuid, item);
    Self::try_from_spec(&job)
  }

  pub fn try_from_spec(job: &Job) -> IoResult<Self> {
    let extra_envs = serde_json::to_value(&job.extra_envs)
      .map_err(|err| err.map_err_context(|| "Job extra envs"))?;
    Ok(JobDb {
      uuid: job.uuid.clone(),
      creator: job.creator.clone(),
      status: job.status.to_string(),
      jupyter_file_name: job.jupyter_file_name.clone(),
      build_context_path: job.build_context_path.clone(),
      output_put_signed_url: job.output_put_signed_url.clone(),
      custom_token_put_signed_url: job.custom_token_put_signed_url.clone(),
      docker_image: job.docker_image.clone(),
      docker_image_digest: job.docker_image_digest.clone(),
      instance_name: job.instance_name.clone(),
      extra_envs,
      created_at: job.created_at,
      updated_at: job.updated_at,
    })
  }

  pub fn try_to_spec(self) -> IoResult<Job> {
    let status = self
      .status
      .parse::<JobStatus>()
      .map_err(|err| err.map_err_context(|| format!("Job {}", self.uuid)))?;
    let extra_envs =
      serde_json::from_value::<BTreeMap<String, String>>(self.extra_envs)
        .map_err(|err| err.map_err_context(|| format!("Job {}", self.uuid)))?;
    Ok(Job {
      uuid: self.uuid,
      creator: self.creator,
      status,
      jupyter_file_name: self.jupyter_file_name,
      build_context_path: self.build_context_path,
      output_put_signed_url: self.output_put_signed_url,
      custom_token_put_signed_url: self.custom_token_put_signed_url,
      docker_image: self.docker_image,
      docker_image_digest: self.docker_image_digest,
      instance_name: self.instance_name,
      extra_envs,
      created_at: self.created_at,
      updated_at: self.updated_at,
    })
  }
}

impl From<&Job> for JobUpdateDb {
  fn from(job: &Job) -> Self {
    JobUpdateDb {
      status: job.status.to_string(),
      docker_image: job.docker_image.clone(),
      docker_image_digest: job.docker_image_digest.clone(),
      instance_name: job.instance_name.clone(),
      updated_at: chrono::Utc::now().naive_utc(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn job_row_conversion() {
    let mut extra_envs = BTreeMap::new();
    extra_envs.insert("USER_TOKEN".to_owned(), "secret".to_owned());
    let partial = JobPartial {
      creator: "alice".to_owned(),
      jupyter_file_name: "train.ipynb".to_owned(),
      extra_envs,
      ..Default::default()
    };
    let row = JobDb::from_partial("1234", &partial).unwrap();
    assert_eq!(row.status, "Created");
    assert_eq!(row.extra_envs["USER_TOKEN"], "secret");
    let job = row.try_to_spec().unwrap();
    assert_eq!(job.status, JobStatus::Created);
    assert_eq!(job.extra_envs.get("USER_TOKEN").unwrap(), "secret");
  }

  #[test]
  fn unknown_status_is_rejected() {
    let partial = JobPartial::default();
    let mut row = JobDb::from_partial("1234", &partial).unwrap();
    row.status = "Unknown".to_owned();
    let err = row.try_to_spec().unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
  }
}
