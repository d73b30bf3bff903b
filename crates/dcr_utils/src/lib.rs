#[cfg(feature = "logger")]
pub mod logger;

#[cfg(feature = "build_tools")]
pub mod build_tools;
