//! Adapters - implementations of the ports plus the HTTP surface.

pub mod gateway;
pub mod http;
pub mod ipn;
pub mod logging;
pub mod memory;
pub mod observers;
