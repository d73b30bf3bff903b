/// Architecture the binary was built for
/// * x86_64
/// * aarch64
pub const ARCH: &str = env!("TARGET_ARCH");
/// Version of Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Commit the binary was built from
pub const COMMIT_ID: &str = env!("GIT_HASH");
/// Release channel
/// * stable
/// * nightly
pub const CHANNEL: &str = env!("CHANNEL");
