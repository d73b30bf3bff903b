use regex::Regex;
use async_trait::async_trait;

use dcr_error::io::{FromIo, IoError, IoResult};
use dcr_stubs::job::Job;
use dcr_stubs::image::{BuildStatus, ImageInfo};

mod kaniko;
pub use kaniko::*;

/// Backend turning a build context into a pushed image
#[async_trait(?Send)]
pub trait ImageBuilder {
  /// Submit the build of `job`.
  /// The build is named after the job uuid so submitting twice is harmless.
  async fn build_image(
    &self,
    job: &Job,
    base_image: &str,
    destination: &str,
  ) -> IoResult<()>;

  /// Non blocking poll of the build of the job `uuid`
  async fn check_status(&self, uuid: &str) -> IoResult<BuildStatus>;
}

/// ## Parse image info
///
/// Extract the pushed image from the builder output.
/// The last non empty line must contain `<image-ref>@sha256:<hex>`.
///
pub fn parse_image_info(logs: &str) -> IoResult<ImageInfo> {
  let last_line = logs
    .lines()
    .rev()
    .map(|line| line.trim())
    .find(|line| !line.is_empty())
    .ok_or_else(|| IoError::invalid_data("Image digest", "empty build logs"))?;
  let re = Regex::new(r"([^@\s]+)@sha256:([a-z0-9]+)")
    .map_err(|err| err.map_err_context(|| "Image digest"))?;
  let captures = re.captures(last_line).ok_or_else(|| {
    IoError::invalid_data(
      "Image digest",
      format!("no digest found in {last_line}"),
    )
  })?;
  let digest = captures[2].to_owned();
  Ok(ImageInfo {
    image: format!("{}@sha256:{digest}", &captures[1]),
    digest,
  })
}
