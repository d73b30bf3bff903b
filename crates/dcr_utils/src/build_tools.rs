use std::io::{Error, ErrorKind, Result};

/// ## Set env git commit hash
///
/// Expose the hash of the current commit to the produced binary as `GIT_HASH`
///
pub fn set_env_git_commit_hash() -> Result<()> {
  let git_hash = std::process::Command::new("git")
    .args(["rev-parse", "HEAD"])
    .output()
    .ok()
    .and_then(|output| String::from_utf8(output.stdout).ok())
    .map(|hash| hash.trim().to_owned())
    .filter(|hash| !hash.is_empty())
    .unwrap_or_else(|| "<unknown>".to_owned());
  println!("cargo:rustc-env=GIT_HASH={git_hash}");
  Ok(())
}

/// ## Set env target arch
///
/// Expose the target arch to the produced binary as `TARGET_ARCH`
///
pub fn set_env_target_arch() -> Result<()> {
  let arch = std::env::var("CARGO_CFG_TARGET_ARCH")
    .map_err(|err| Error::new(ErrorKind::Other, err))?;
  println!("cargo:rustc-env=TARGET_ARCH={arch}");
  Ok(())
}

/// ## Set channel
///
/// Expose the release channel to the produced binary as `CHANNEL`,
/// overridable with `DCR_CHANNEL`
///
pub fn set_channel() -> Result<()> {
  #[allow(unused_mut)]
  let mut default_channel = "stable";
  #[cfg(feature = "dev")]
  {
    default_channel = "nightly";
  }
  let channel =
    std::env::var("DCR_CHANNEL").unwrap_or(default_channel.to_owned());
  println!("cargo:rustc-env=CHANNEL={channel}");
  println!("cargo:rerun-if-env-changed=DCR_CHANNEL");
  Ok(())
}
