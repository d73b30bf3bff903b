use async_trait::async_trait;

use dcr_error::io::IoResult;
use dcr_stubs::job::{Job, JobPartial};

pub mod job;

/// Persistence of the job records
///
/// The reconciler only needs [list_in_progress](JobStore::list_in_progress)
/// and [update](JobStore::update), the rest is used by the submission path.
#[async_trait(?Send)]
pub trait JobStore {
  /// Jobs whose status is not terminal, oldest first
  async fn list_in_progress(&self) -> IoResult<Vec<Job>>;

  /// Persist the status and the derived fields of a job
  async fn update(&self, job: &Job) -> IoResult<()>;

  async fn create(&self, item: &JobPartial) -> IoResult<Job>;

  async fn find_by_uuid(&self, uuid: &str) -> IoResult<Job>;

  async fn list_by_creator(&self, creator: &str) -> IoResult<Vec<Job>>;

  async fn delete_by_uuid(&self, uuid: &str) -> IoResult<()>;
}
