/// Longest name accepted by compute instances and kubernetes jobs
pub const INSTANCE_NAME_MAX_LEN: usize = 63;
/// Longest id accepted for a workload identity pool provider
pub const WIP_PROVIDER_ID_MAX_LEN: usize = 32;

/// Hex chars of the name digest kept when a name must be shortened
const DIGEST_LEN: usize = 8;

/// Fit `name` in `max_len` chars.
/// Longer names keep a prefix and end with a digest of the whole name, so
/// names only differing past the limit stay distinct.
fn shorten(name: &str, max_len: usize) -> String {
  let name = name.trim_end_matches('-');
  if name.chars().count() <= max_len {
    return name.to_owned();
  }
  let digest = openssl::sha::sha256(name.as_bytes())
    .iter()
    .map(|byte| format!("{byte:02x}"))
    .collect::<String>();
  let prefix = name
    .chars()
    .take(max_len - DIGEST_LEN - 1)
    .collect::<String>();
  let prefix = prefix.trim_end_matches('-');
  format!("{prefix}-{}", &digest[..DIGEST_LEN])
}

/// Name of the kubernetes job building the image of a job
pub fn build_job_name(uuid: &str) -> String {
  format!("kaniko-{uuid}")
}

/// Name of the instance running a job
pub fn instance_name(creator: &str, uuid: &str) -> String {
  shorten(&format!("{creator}-{uuid}"), INSTANCE_NAME_MAX_LEN)
}

/// Id of the workload identity pool provider bound to an instance
pub fn wip_provider_id(instance_name: &str) -> String {
  shorten(instance_name, WIP_PROVIDER_ID_MAX_LEN)
}
