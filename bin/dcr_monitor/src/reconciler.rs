use std::future::Future;
use std::time::Duration;

use ntex::time::{self, Millis};

use dcr_error::io::{IoError, IoResult};
use dcr_stubs::job::{Job, JobStatus};
use dcr_stubs::image::BuildStatus;
use dcr_stubs::config::MonitorConfig;
use dcr_stubs::instance::InstanceStatus;

use crate::utils::naming;
use crate::utils::registry::Registry;
use crate::tee::TeeProvider;
use crate::image_builder::ImageBuilder;
use crate::repositories::JobStore;

/// Control loop moving every in progress job one step per tick.
///
/// Each step makes at most one state changing call to a backend, errors leave
/// the status untouched so the step is retried on the next tick.
pub struct Reconciler<B, T, S> {
  builder: B,
  tee: T,
  store: S,
  registry: Registry,
  job_timeout: chrono::Duration,
  call_timeout: Duration,
}

impl<B, T, S> Reconciler<B, T, S>
where
  B: ImageBuilder,
  T: TeeProvider,
  S: JobStore,
{
  pub fn new(
    builder: B,
    tee: T,
    store: S,
    registry: Registry,
    config: &MonitorConfig,
  ) -> Self {
    Self {
      builder,
      tee,
      store,
      registry,
      job_timeout: chrono::Duration::seconds(
        i64::try_from(config.job_timeout).unwrap_or(i64::MAX),
      ),
      call_timeout: Duration::from_secs(config.call_timeout),
    }
  }

  /// Bound a backend call by the call timeout
  async fn bounded<F, R>(&self, context: &str, fut: F) -> IoResult<R>
  where
    F: Future<Output = IoResult<R>>,
  {
    match time::timeout(Millis::from(self.call_timeout), fut).await {
      Ok(res) => res,
      Err(()) => Err(IoError::timed_out(
        context,
        format!("no answer after {}s", self.call_timeout.as_secs()),
      )),
    }
  }

  /// Tear down the instance of a job, failures are only logged.
  /// Without a recorded instance the name is derived from the job, a launch
  /// may have been accepted without being recorded.
  async fn clean_up(&self, job: &Job) {
    let name = match &job.instance_name {
      Some(name) => name.clone(),
      None => naming::instance_name(&job.creator, &job.uuid),
    };
    let res = self
      .bounded("Tee cleanup", self.tee.clean_up_instance(&name))
      .await;
    match res {
      Ok(()) => {
        log::info!("reconciler: job {} instance {name} cleaned up", job.uuid)
      }
      Err(err) => log::error!(
        "reconciler: job {} cleanup of {name} failed: {err}",
        job.uuid
      ),
    }
  }

  async fn build_image(&self, job: &mut Job) -> IoResult<()> {
    let base_image = self.registry.base_image();
    let destination = self.registry.destination(&job.creator, &job.uuid);
    self
      .bounded(
        "Image builder",
        self.builder.build_image(job, &base_image, &destination),
      )
      .await?;
    job.status = JobStatus::ImageBuilding;
    Ok(())
  }

  async fn check_image(&self, job: &mut Job) -> IoResult<()> {
    let status = self
      .bounded("Image builder", self.builder.check_status(&job.uuid))
      .await?;
    let info = match status {
      BuildStatus::Running => return Ok(()),
      BuildStatus::Failed => {
        job.status = JobStatus::ImageBuildingFailed;
        return Ok(());
      }
      BuildStatus::Succeeded(info) => info,
    };
    job.docker_image = Some(info.image.clone());
    job.docker_image_digest = Some(info.digest.clone());
    let name = naming::instance_name(&job.creator, &job.uuid);
    let launched = self
      .bounded(
        "Tee launch",
        self
          .tee
          .launch_instance(&name, &info.image, &info.digest, &job.extra_envs),
      )
      .await;
    match launched {
      Ok(()) => {
        job.instance_name = Some(name);
        job.status = JobStatus::VMWaiting;
      }
      Err(err) => {
        log::error!(
          "reconciler: job {} launch of {name} failed: {err}",
          job.uuid
        );
        job.status = JobStatus::VMLaunchFailed;
      }
    }
    Ok(())
  }

  async fn check_instance(&self, job: &mut Job) -> IoResult<()> {
    let Some(name) = &job.instance_name else {
      return Err(IoError::invalid_data(
        "Reconciler",
        format!("job {} has no instance", job.uuid),
      ));
    };
    let status = self
      .bounded("Tee status", self.tee.get_instance_status(name))
      .await?;
    log::debug!("reconciler: job {} instance {name} is {status}", job.uuid);
    match (job.status, status) {
      (JobStatus::VMWaiting, InstanceStatus::Running) => {
        job.status = JobStatus::VMRunning;
      }
      (_, InstanceStatus::Terminated) => {
        job.status = JobStatus::VMFinished;
      }
      _ => {}
    }
    Ok(())
  }

  /// Take the state appropriate action for the current status of a job
  async fn step(&self, job: &mut Job) -> IoResult<()> {
    match job.status {
      JobStatus::Created => self.build_image(job).await,
      JobStatus::ImageBuilding => self.check_image(job).await,
      JobStatus::VMWaiting | JobStatus::VMRunning => {
        self.check_instance(job).await
      }
      _ => Ok(()),
    }
  }

  /// ## Reconcile
  ///
  /// Move a job one step forward and persist it whatever happened.
  /// Jobs older than the job timeout are failed before any other action.
  ///
  pub async fn reconcile(&self, job: &mut Job, now: chrono::NaiveDateTime) {
    let previous = job.status;
    if job.age(now) > self.job_timeout {
      log::warn!(
        "reconciler: job {} timed out in status {previous}",
        job.uuid
      );
      self.clean_up(job).await;
      job.status = JobStatus::VMFailed;
    } else {
      if let Err(err) = self.step(job).await {
        log::error!("reconciler: job {} in {previous}: {err}", job.uuid);
      }
      if job.status.requires_cleanup() {
        self.clean_up(job).await;
      }
    }
    if job.status != previous {
      log::info!("reconciler: job {} {previous} -> {}", job.uuid, job.status);
    }
    if let Err(err) = self.bounded("Job store", self.store.update(job)).await {
      log::error!("reconciler: job {} not persisted: {err}", job.uuid);
    }
  }

  /// Reconcile every in progress job once, in listing order
  pub async fn tick(&self) -> IoResult<usize> {
    let jobs = self
      .bounded("Job store", self.store.list_in_progress())
      .await?;
    let count = jobs.len();
    log::debug!("reconciler: {count} job(s) in progress");
    let now = chrono::Utc::now().naive_utc();
    for mut job in jobs {
      self.reconcile(&mut job, now).await;
    }
    Ok(count)
  }

  /// Tick forever every `interval`
  pub async fn run(&self, interval: Duration) {
    log::info!("reconciler: ticking every {}s", interval.as_secs());
    loop {
      if let Err(err) = self.tick().await {
        log::error!("reconciler: tick failed: {err}");
      }
      time::sleep(interval).await;
    }
  }
}

#[cfg(test)]
mod tests {
  use std::cell::{Cell, RefCell};
  use std::collections::BTreeMap;

  use dcr_stubs::image::ImageInfo;
  use dcr_stubs::job::JobPartial;
  use dcr_stubs::config::RegistryKind;

  use async_trait::async_trait;

  use super::*;

  const DIGEST: &str =
    "0f1e2d3c4b5a69788796a5b4c3d2e1f00f1e2d3c4b5a69788796a5b4c3d2e1f0";

  #[derive(Default)]
  struct FakeBuilder {
    status: RefCell<Option<BuildStatus>>,
    submitted: RefCell<Vec<(String, String, String)>>,
    fail_submit: bool,
    hang: bool,
  }

  #[async_trait(?Send)]
  impl ImageBuilder for FakeBuilder {
    async fn build_image(
      &self,
      job: &Job,
      base_image: &str,
      destination: &str,
    ) -> IoResult<()> {
      if self.hang {
        futures::future::pending::<()>().await;
      }
      if self.fail_submit {
        return Err(IoError::interrupted("Fake builder", "api unavailable"));
      }
      self.submitted.borrow_mut().push((
        job.uuid.clone(),
        base_image.to_owned(),
        destination.to_owned(),
      ));
      Ok(())
    }

    async fn check_status(&self, uuid: &str) -> IoResult<BuildStatus> {
      self.status.borrow().clone().ok_or_else(|| {
        IoError::not_found("Fake builder", format!("kaniko-{uuid}"))
      })
    }
  }

  #[derive(Default)]
  struct FakeTee {
    instances: RefCell<BTreeMap<String, InstanceStatus>>,
    envs: RefCell<BTreeMap<String, BTreeMap<String, String>>>,
    cleanups: Cell<usize>,
    fail_launch: bool,
    hang_launch: bool,
  }

  impl FakeTee {
    fn with_instance(name: &str, status: InstanceStatus) -> Self {
      let tee = FakeTee::default();
      tee.instances.borrow_mut().insert(name.to_owned(), status);
      tee
    }
  }

  #[async_trait(?Send)]
  impl TeeProvider for FakeTee {
    async fn launch_instance(
      &self,
      name: &str,
      image: &str,
      digest: &str,
      extra_envs: &BTreeMap<String, String>,
    ) -> IoResult<()> {
      if self.fail_launch {
        return Err(IoError::interrupted("Fake tee", "quota exceeded"));
      }
      assert!(image.ends_with(&format!("@sha256:{digest}")));
      self
        .instances
        .borrow_mut()
        .insert(name.to_owned(), InstanceStatus::Running);
      if self.hang_launch {
        futures::future::pending::<()>().await;
      }
      self
        .envs
        .borrow_mut()
        .insert(name.to_owned(), extra_envs.clone());
      Ok(())
    }

    async fn get_instance_status(
      &self,
      name: &str,
    ) -> IoResult<InstanceStatus> {
      self
        .instances
        .borrow()
        .get(name)
        .copied()
        .ok_or_else(|| IoError::not_found("Fake tee", name))
    }

    async fn clean_up_instance(&self, name: &str) -> IoResult<()> {
      self.cleanups.set(self.cleanups.get() + 1);
      self.instances.borrow_mut().remove(name);
      Ok(())
    }
  }

  #[derive(Default)]
  struct FakeStore {
    jobs: RefCell<Vec<Job>>,
    updates: Cell<usize>,
    fail_update: bool,
  }

  impl FakeStore {
    fn with_jobs(jobs: Vec<Job>) -> Self {
      let store = FakeStore::default();
      store.jobs.replace(jobs);
      store
    }

    fn get(&self, uuid: &str) -> Job {
      self
        .jobs
        .borrow()
        .iter()
        .find(|job| job.uuid == uuid)
        .cloned()
        .unwrap()
    }
  }

  #[async_trait(?Send)]
  impl JobStore for FakeStore {
    async fn list_in_progress(&self) -> IoResult<Vec<Job>> {
      let jobs = self.jobs.borrow();
      Ok(
        jobs
          .iter()
          .filter(|job| job.status.is_in_progress())
          .cloned()
          .collect(),
      )
    }

    async fn update(&self, job: &Job) -> IoResult<()> {
      self.updates.set(self.updates.get() + 1);
      if self.fail_update {
        return Err(IoError::interrupted("Fake store", "connection lost"));
      }
      let mut jobs = self.jobs.borrow_mut();
      let Some(stored) = jobs.iter_mut().find(|item| item.uuid == job.uuid)
      else {
        return Err(IoError::not_found("Fake store", &job.uuid));
      };
      *stored = job.clone();
      Ok(())
    }

    async fn create(&self, item: &JobPartial) -> IoResult<Job> {
      let uuid = format!("job{}", self.jobs.borrow().len() + 1);
      let job = Job::from_partial(&uuid, item);
      self.jobs.borrow_mut().push(job.clone());
      Ok(job)
    }

    async fn find_by_uuid(&self, uuid: &str) -> IoResult<Job> {
      self
        .jobs
        .borrow()
        .iter()
        .find(|job| job.uuid == uuid)
        .cloned()
        .ok_or_else(|| IoError::not_found("Fake store", uuid))
    }

    async fn list_by_creator(&self, creator: &str) -> IoResult<Vec<Job>> {
      let jobs = self.jobs.borrow();
      Ok(
        jobs
          .iter()
          .filter(|job| job.creator == creator)
          .cloned()
          .collect(),
      )
    }

    async fn delete_by_uuid(&self, uuid: &str) -> IoResult<()> {
      self.jobs.borrow_mut().retain(|job| job.uuid != uuid);
      Ok(())
    }
  }

  fn config() -> MonitorConfig {
    MonitorConfig {
      registry: RegistryKind::Minikube,
      call_timeout: 1,
      ..Default::default()
    }
  }

  fn job(uuid: &str, status: JobStatus) -> Job {
    let partial = JobPartial {
      creator: "user1".to_owned(),
      jupyter_file_name: "notebook.ipynb".to_owned(),
      build_context_path: format!("gs://bucket/user1/{uuid}.tar.gz"),
      ..Default::default()
    };
    let mut job = Job::from_partial(uuid, &partial);
    job.status = status;
    if matches!(status, JobStatus::VMWaiting | JobStatus::VMRunning) {
      job.docker_image = Some(format!("reg/user1-{uuid}@sha256:{DIGEST}"));
      job.docker_image_digest = Some(DIGEST.to_owned());
      job.instance_name = Some(naming::instance_name("user1", uuid));
    }
    job
  }

  fn reconciler(
    builder: FakeBuilder,
    tee: FakeTee,
    store: FakeStore,
  ) -> Reconciler<FakeBuilder, FakeTee, FakeStore> {
    let config = config();
    Reconciler::new(builder, tee, store, Registry::new(&config), &config)
  }

  fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
  }

  #[ntex::test]
  async fn created_submits_build() {
    let store = FakeStore::with_jobs(vec![job("job0", JobStatus::Created)]);
    let r = reconciler(FakeBuilder::default(), FakeTee::default(), store);
    r.tick().await.unwrap();
    assert_eq!(r.store.get("job0").status, JobStatus::ImageBuilding);
    let submitted = r.builder.submitted.borrow();
    assert_eq!(
      submitted[0],
      (
        "job0".to_owned(),
        "registry.kube-system.svc.cluster.local/executor:latest".to_owned(),
        "registry.kube-system.svc.cluster.local/user1-job0:latest".to_owned(),
      )
    );
  }

  #[ntex::test]
  async fn submit_error_keeps_status() {
    let builder = FakeBuilder {
      fail_submit: true,
      ..Default::default()
    };
    let store = FakeStore::with_jobs(vec![job("job0", JobStatus::Created)]);
    let r = reconciler(builder, FakeTee::default(), store);
    r.tick().await.unwrap();
    assert_eq!(r.store.get("job0").status, JobStatus::Created);
    assert_eq!(r.store.updates.get(), 1);
  }

  #[ntex::test]
  async fn hung_builder_times_out() {
    let builder = FakeBuilder {
      hang: true,
      ..Default::default()
    };
    let store = FakeStore::with_jobs(vec![job("job0", JobStatus::Created)]);
    let r = reconciler(builder, FakeTee::default(), store);
    r.tick().await.unwrap();
    assert_eq!(r.store.get("job0").status, JobStatus::Created);
    assert_eq!(r.store.updates.get(), 1);
  }

  #[ntex::test]
  async fn build_running_is_noop() {
    let builder = FakeBuilder {
      status: RefCell::new(Some(BuildStatus::Running)),
      ..Default::default()
    };
    let store =
      FakeStore::with_jobs(vec![job("job1", JobStatus::ImageBuilding)]);
    let r = reconciler(builder, FakeTee::default(), store);
    r.tick().await.unwrap();
    let job1 = r.store.get("job1");
    assert_eq!(job1.status, JobStatus::ImageBuilding);
    assert_eq!(job1.docker_image, None);
    assert!(r.tee.instances.borrow().is_empty());
  }

  #[ntex::test]
  async fn build_failed_is_terminal() {
    let builder = FakeBuilder {
      status: RefCell::new(Some(BuildStatus::Failed)),
      ..Default::default()
    };
    let store =
      FakeStore::with_jobs(vec![job("job2", JobStatus::ImageBuilding)]);
    let r = reconciler(builder, FakeTee::default(), store);
    r.tick().await.unwrap();
    assert_eq!(r.store.get("job2").status, JobStatus::ImageBuildingFailed);
    assert_eq!(r.tee.cleanups.get(), 0);
    // terminal jobs are not listed anymore
    assert_eq!(r.tick().await.unwrap(), 0);
  }

  #[ntex::test]
  async fn build_succeeded_launches_instance() {
    let info = ImageInfo {
      image: format!("reg/user1-job3@sha256:{DIGEST}"),
      digest: DIGEST.to_owned(),
    };
    let builder = FakeBuilder {
      status: RefCell::new(Some(BuildStatus::Succeeded(info.clone()))),
      ..Default::default()
    };
    let mut job3 = job("job3", JobStatus::ImageBuilding);
    job3
      .extra_envs
      .insert("USER_TOKEN".to_owned(), "secret".to_owned());
    let store = FakeStore::with_jobs(vec![job3]);
    let r = reconciler(builder, FakeTee::default(), store);
    r.tick().await.unwrap();
    let job3 = r.store.get("job3");
    assert_eq!(job3.status, JobStatus::VMWaiting);
    assert_eq!(job3.instance_name.as_deref(), Some("user1-job3"));
    assert_eq!(job3.docker_image.as_deref(), Some(info.image.as_str()));
    assert_eq!(job3.docker_image_digest.as_deref(), Some(DIGEST));
    assert_eq!(
      r.tee.get_instance_status("user1-job3").await.unwrap(),
      InstanceStatus::Running
    );
    assert_eq!(
      r.tee.envs.borrow()["user1-job3"].get("USER_TOKEN").unwrap(),
      "secret"
    );
  }

  #[ntex::test]
  async fn launch_error_is_terminal() {
    let builder = FakeBuilder {
      status: RefCell::new(Some(BuildStatus::Succeeded(ImageInfo {
        image: format!("reg/user1-job4@sha256:{DIGEST}"),
        digest: DIGEST.to_owned(),
      }))),
      ..Default::default()
    };
    let tee = FakeTee {
      fail_launch: true,
      ..Default::default()
    };
    let store =
      FakeStore::with_jobs(vec![job("job4", JobStatus::ImageBuilding)]);
    let r = reconciler(builder, tee, store);
    r.tick().await.unwrap();
    let job4 = r.store.get("job4");
    assert_eq!(job4.status, JobStatus::VMLaunchFailed);
    assert_eq!(job4.instance_name, None);
    assert_eq!(r.tee.cleanups.get(), 1);
    // terminal, nothing more happens
    assert_eq!(r.tick().await.unwrap(), 0);
    assert_eq!(r.tee.cleanups.get(), 1);
  }

  #[ntex::test]
  async fn hung_launch_is_cleaned_up() {
    let builder = FakeBuilder {
      status: RefCell::new(Some(BuildStatus::Succeeded(ImageInfo {
        image: format!("reg/user1-job4@sha256:{DIGEST}"),
        digest: DIGEST.to_owned(),
      }))),
      ..Default::default()
    };
    let tee = FakeTee {
      hang_launch: true,
      ..Default::default()
    };
    let store =
      FakeStore::with_jobs(vec![job("job4", JobStatus::ImageBuilding)]);
    let r = reconciler(builder, tee, store);
    r.tick().await.unwrap();
    let job4 = r.store.get("job4");
    assert_eq!(job4.status, JobStatus::VMLaunchFailed);
    assert_eq!(job4.instance_name, None);
    assert_eq!(r.tee.cleanups.get(), 1);
    assert!(r.tee.instances.borrow().is_empty());
  }

  #[ntex::test]
  async fn build_status_error_keeps_status() {
    let store =
      FakeStore::with_jobs(vec![job("job5", JobStatus::ImageBuilding)]);
    let r = reconciler(FakeBuilder::default(), FakeTee::default(), store);
    r.tick().await.unwrap();
    assert_eq!(r.store.get("job5").status, JobStatus::ImageBuilding);
    assert_eq!(r.store.updates.get(), 1);
  }

  #[ntex::test]
  async fn waiting_instance_running() {
    let tee = FakeTee::with_instance("user1-job6", InstanceStatus::Running);
    let store = FakeStore::with_jobs(vec![job("job6", JobStatus::VMWaiting)]);
    let r = reconciler(FakeBuilder::default(), tee, store);
    r.tick().await.unwrap();
    assert_eq!(r.store.get("job6").status, JobStatus::VMRunning);
    assert_eq!(r.tee.cleanups.get(), 0);
  }

  #[ntex::test]
  async fn waiting_instance_provisioning() {
    let tee =
      FakeTee::with_instance("user1-job6", InstanceStatus::Provisioning);
    let store = FakeStore::with_jobs(vec![job("job6", JobStatus::VMWaiting)]);
    let r = reconciler(FakeBuilder::default(), tee, store);
    r.tick().await.unwrap();
    assert_eq!(r.store.get("job6").status, JobStatus::VMWaiting);
  }

  #[ntex::test]
  async fn running_instance_still_running() {
    let tee = FakeTee::with_instance("user1-job6", InstanceStatus::Running);
    let store = FakeStore::with_jobs(vec![job("job6", JobStatus::VMRunning)]);
    let r = reconciler(FakeBuilder::default(), tee, store);
    r.tick().await.unwrap();
    assert_eq!(r.store.get("job6").status, JobStatus::VMRunning);
  }

  #[ntex::test]
  async fn terminated_instance_finishes_job() {
    for status in [JobStatus::VMWaiting, JobStatus::VMRunning] {
      let tee =
        FakeTee::with_instance("user1-job7", InstanceStatus::Terminated);
      let store = FakeStore::with_jobs(vec![job("job7", status)]);
      let r = reconciler(FakeBuilder::default(), tee, store);
      r.tick().await.unwrap();
      assert_eq!(r.store.get("job7").status, JobStatus::VMFinished);
      assert_eq!(r.tee.cleanups.get(), 1);
      assert!(r.tee.get_instance_status("user1-job7").await.is_err());
      // finished jobs are left alone afterwards
      r.tick().await.unwrap();
      assert_eq!(r.tee.cleanups.get(), 1);
    }
  }

  #[ntex::test]
  async fn missing_instance_keeps_status() {
    let store = FakeStore::with_jobs(vec![job("job8", JobStatus::VMRunning)]);
    let r = reconciler(FakeBuilder::default(), FakeTee::default(), store);
    r.tick().await.unwrap();
    assert_eq!(r.store.get("job8").status, JobStatus::VMRunning);
    assert_eq!(r.tee.cleanups.get(), 0);
  }

  #[ntex::test]
  async fn expired_jobs_fail() {
    let statuses = [
      JobStatus::Created,
      JobStatus::ImageBuilding,
      JobStatus::VMWaiting,
      JobStatus::VMRunning,
    ];
    for status in statuses {
      let tee = FakeTee::with_instance("user1-job9", InstanceStatus::Running);
      let mut job9 = job("job9", status);
      job9.created_at = now() - chrono::Duration::hours(7);
      let store = FakeStore::with_jobs(vec![job9]);
      let r = reconciler(FakeBuilder::default(), tee, store);
      r.tick().await.unwrap();
      let job9 = r.store.get("job9");
      assert_eq!(job9.status, JobStatus::VMFailed);
      // an unrecorded launch is found through the derived instance name
      assert_eq!(r.tee.cleanups.get(), 1);
      assert!(r.tee.instances.borrow().is_empty());
      assert!(r.builder.submitted.borrow().is_empty());
    }
  }

  #[ntex::test]
  async fn timeout_is_checked_against_creation() {
    let tee = FakeTee::with_instance("user1-job9", InstanceStatus::Running);
    let mut job9 = job("job9", JobStatus::VMRunning);
    job9.created_at = now() - chrono::Duration::hours(5);
    let store = FakeStore::with_jobs(vec![job9]);
    let r = reconciler(FakeBuilder::default(), tee, store);
    r.tick().await.unwrap();
    assert_eq!(r.store.get("job9").status, JobStatus::VMRunning);
  }

  #[ntex::test]
  async fn cleanup_is_idempotent() {
    let tee = FakeTee::with_instance("user1-job9", InstanceStatus::Running);
    tee.clean_up_instance("user1-job9").await.unwrap();
    tee.clean_up_instance("user1-job9").await.unwrap();
    assert_eq!(tee.cleanups.get(), 2);
    assert!(tee.instances.borrow().is_empty());
  }

  #[ntex::test]
  async fn persist_error_is_retried() {
    let tee = FakeTee::with_instance("user1-job6", InstanceStatus::Running);
    let store = FakeStore {
      fail_update: true,
      ..FakeStore::with_jobs(vec![job("job6", JobStatus::VMWaiting)])
    };
    let r = reconciler(FakeBuilder::default(), tee, store);
    r.tick().await.unwrap();
    assert_eq!(r.store.get("job6").status, JobStatus::VMWaiting);
    r.tick().await.unwrap();
    assert_eq!(r.store.updates.get(), 2);
  }

  #[ntex::test]
  async fn one_failing_job_does_not_stop_the_tick() {
    let tee = FakeTee::with_instance("user1-job6", InstanceStatus::Running);
    let store = FakeStore::with_jobs(vec![
      job("job8", JobStatus::VMRunning),
      job("job6", JobStatus::VMWaiting),
    ]);
    let r = reconciler(FakeBuilder::default(), tee, store);
    assert_eq!(r.tick().await.unwrap(), 2);
    assert_eq!(r.store.get("job8").status, JobStatus::VMRunning);
    assert_eq!(r.store.get("job6").status, JobStatus::VMRunning);
    assert_eq!(r.store.updates.get(), 2);
  }
}
