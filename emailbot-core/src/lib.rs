//! Emailbot core library — record types, sidecar persistence, configuration.
//!
//! - [`types`] — [`Record`] and [`SidecarData`]
//! - [`sidecar`] — load / save of `<item>.emailbot.yaml`
//! - [`config`] — YAML configuration file and flag merging
//! - [`error`] — [`SidecarError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod sidecar;
pub mod types;

pub use config::{Config, ConfigOverrides};
pub use error::{ConfigError, SidecarError};
pub use types::{Record, SidecarData};
