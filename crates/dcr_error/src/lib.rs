pub mod io;

#[cfg(feature = "http_client")]
pub mod http_client;
