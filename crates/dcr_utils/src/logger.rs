/// Enable the env logger for the given binary.
/// The filter is read from `LOG_LEVEL` and defaults to `{bin_name}=info`.
/// When `TEST` is set the output is captured by the test harness.
pub fn enable_logger(bin_name: &str) {
  if std::env::var("LOG_LEVEL").is_err() {
    std::env::set_var("LOG_LEVEL", format!("{bin_name}=info"));
  }
  let is_test = std::env::var("TEST").is_ok();
  let _ = env_logger::Builder::new()
    .parse_env("LOG_LEVEL")
    .format_target(false)
    .is_test(is_test)
    .try_init();
  log::debug!("logger enabled for {bin_name}");
}
