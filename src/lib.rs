//! Library crate for lan-sentry-rs exposing reusable modules.
pub mod adblock;
pub mod config;
pub mod discovery;
pub mod fetch;
pub mod monitor;
pub mod ports;
pub mod privilege;
pub mod scanner;
pub mod types;
