//! # sukl-types
//!
//! Shared configuration types for the SUKL search proxy.
//!
//! - Settings: layered configuration (defaults, config file, environment)
//! - ConfigError: failures while loading or validating settings
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sukl_types::Settings;
//!
//! let settings = Settings::load(None).unwrap();
//! println!("{}", settings.api_version);
//! ```

pub mod config;
pub mod error;

pub use config::{AuthMode, AuthSettings, LogFormat, RetrySettings, Settings};
pub use error::ConfigError;
