//! Gateway Reconciler
//!
//! Reconciles the lifecycle of a remote payment transaction across two
//! racing update paths: synchronous confirmation calls made during
//! checkout, and asynchronous push notifications from the payment
//! provider.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
