//! Gateway adapters - HTTP client and the two wire codecs.

mod current;
mod http_client;
mod legacy;

pub use http_client::{GatewayHttpConfig, HttpGatewayClient, HttpGatewayClientFactory};
