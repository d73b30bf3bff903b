use async_trait::async_trait;

use ntex::web;
use diesel::prelude::*;

use dcr_error::io::{FromIo, IoError, IoResult};
use dcr_stubs::job::{Job, JobPartial, JobStatus};

use crate::utils;
use crate::schema::jobs;
use crate::models::{Pool, JobDb, JobUpdateDb};

use super::JobStore;

fn to_specs(db_models: Vec<JobDb>) -> IoResult<Vec<Job>> {
  db_models
    .into_iter()
    .map(|db_model| db_model.try_to_spec())
    .collect::<IoResult<Vec<_>>>()
}

/// ## Create
///
/// Insert a new job in `Created` status with a fresh uuid
///
pub(crate) async fn create(item: &JobPartial, pool: &Pool) -> IoResult<Job> {
  let uuid = uuid::Uuid::new_v4().to_string();
  let db_model = JobDb::from_partial(&uuid, item)?;
  let pool = pool.clone();
  let db_model = web::block(move || {
    let mut conn = utils::store::get_pool_conn(&pool)?;
    let db_model = diesel::insert_into(jobs::table)
      .values(&db_model)
      .get_result::<JobDb>(&mut conn)
      .map_err(|err| err.map_err_context(|| "Job"))?;
    Ok::<_, IoError>(db_model)
  })
  .await?;
  db_model.try_to_spec()
}

/// ## Find by uuid
///
/// Find a job by its uuid, `NotFound` when it does not exist
///
pub(crate) async fn find_by_uuid(uuid: &str, pool: &Pool) -> IoResult<Job> {
  let uuid = uuid.to_owned();
  let pool = pool.clone();
  let db_model = web::block(move || {
    let mut conn = utils::store::get_pool_conn(&pool)?;
    let db_model = jobs::table
      .find(&uuid)
      .get_result::<JobDb>(&mut conn)
      .map_err(|err| err.map_err_context(|| format!("Job {uuid}")))?;
    Ok::<_, IoError>(db_model)
  })
  .await?;
  db_model.try_to_spec()
}

/// ## List in progress
///
/// List the jobs whose status is not terminal, oldest first
///
pub(crate) async fn list_in_progress(pool: &Pool) -> IoResult<Vec<Job>> {
  let terminal = JobStatus::TERMINAL
    .iter()
    .map(|status| status.to_string())
    .collect::<Vec<_>>();
  let pool = pool.clone();
  let db_models = web::block(move || {
    let mut conn = utils::store::get_pool_conn(&pool)?;
    let db_models = jobs::table
      .filter(jobs::status.ne_all(terminal))
      .order(jobs::created_at.asc())
      .get_results::<JobDb>(&mut conn)
      .map_err(|err| err.map_err_context(|| "Job"))?;
    Ok::<_, IoError>(db_models)
  })
  .await?;
  to_specs(db_models)
}

/// ## List by creator
///
/// List the jobs submitted by `creator`, newest first
///
pub(crate) async fn list_by_creator(
  creator: &str,
  pool: &Pool,
) -> IoResult<Vec<Job>> {
  let creator = creator.to_owned();
  let pool = pool.clone();
  let db_models = web::block(move || {
    let mut conn = utils::store::get_pool_conn(&pool)?;
    let db_models = jobs::table
      .filter(jobs::creator.eq(&creator))
      .order(jobs::created_at.desc())
      .get_results::<JobDb>(&mut conn)
      .map_err(|err| err.map_err_context(|| "Job"))?;
    Ok::<_, IoError>(db_models)
  })
  .await?;
  to_specs(db_models)
}

/// ## Update
///
/// Write back the status and derived fields of a job and refresh `updated_at`
///
pub(crate) async fn update(job: &Job, pool: &Pool) -> IoResult<()> {
  let uuid = job.uuid.clone();
  let data = JobUpdateDb::from(job);
  let pool = pool.clone();
  let count = web::block(move || {
    let mut conn = utils::store::get_pool_conn(&pool)?;
    let count = diesel::update(jobs::table.find(&uuid))
      .set(&data)
      .execute(&mut conn)
      .map_err(|err| err.map_err_context(|| format!("Job {uuid}")))?;
    Ok::<_, IoError>(count)
  })
  .await?;
  if count == 0 {
    return Err(IoError::not_found(
      "Job",
      format!("{} does not exist", job.uuid),
    ));
  }
  Ok(())
}

/// ## Delete by uuid
///
/// Delete a job record, `NotFound` when it does not exist
///
pub(crate) async fn delete_by_uuid(uuid: &str, pool: &Pool) -> IoResult<()> {
  let uuid = uuid.to_owned();
  let pool = pool.clone();
  let count = web::block(move || {
    let mut conn = utils::store::get_pool_conn(&pool)?;
    let count = diesel::delete(jobs::table.find(&uuid))
      .execute(&mut conn)
      .map_err(|err| err.map_err_context(|| format!("Job {uuid}")))?;
    Ok::<_, IoError>((count, uuid))
  })
  .await?;
  match count {
    (0, uuid) => {
      Err(IoError::not_found("Job", format!("{uuid} does not exist")))
    }
    _ => Ok(()),
  }
}

/// Postgres backed [JobStore](JobStore)
#[derive(Clone)]
pub struct PgJobStore {
  pool: Pool,
}

impl PgJobStore {
  pub fn new(pool: Pool) -> Self {
    Self { pool }
  }
}

#[async_trait(?Send)]
impl JobStore for PgJobStore {
  async fn list_in_progress(&self) -> IoResult<Vec<Job>> {
    list_in_progress(&self.pool).await
  }

  async fn update(&self, job: &Job) -> IoResult<()> {
    update(job, &self.pool).await
  }

  async fn create(&self, item: &JobPartial) -> IoResult<Job> {
    create(item, &self.pool).await
  }

  async fn find_by_uuid(&self, uuid: &str) -> IoResult<Job> {
    find_by_uuid(uuid, &self.pool).await
  }

  async fn list_by_creator(&self, creator: &str) -> IoResult<Vec<Job>> {
    list_by_creator(creator, &self.pool).await
  }

  async fn delete_by_uuid(&self, uuid: &str) -> IoResult<()> {
    delete_by_uuid(uuid, &self.pool).await
  }
}
