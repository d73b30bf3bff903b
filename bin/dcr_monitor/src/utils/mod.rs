pub mod gcp;
pub mod k8s;
pub mod store;
pub mod naming;
pub mod registry;
pub mod dockerfile;
pub mod http_client;

#[cfg(test)]
pub mod fake_api;
