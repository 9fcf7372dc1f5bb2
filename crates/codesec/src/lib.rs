//! # codesec
//!
//! Blocking client for GitHub code security configurations.
//!
//! This crate provides:
//! - The [`CodeSecurityApi`] trait covering the configuration lifecycle
//!   (list, inspect, create, update, delete, attach, set default)
//! - [`GitHubClient`], a `ureq` implementation for github.com, GHE.com and
//!   GitHub Enterprise Server
//! - [`MockApi`], an in-memory implementation for tests
//! - Error categories that tell a batch caller whether a failure is a
//!   skip, a reason to stop, or just an error
//!
//! ## Example
//!
//! ```no_run
//! use codesec::{AttachScope, CodeSecurityApi, GitHubClient, find_by_name};
//!
//! let client = GitHubClient::new(std::env::var("GH_TOKEN").ok());
//! let configs = client.list_configurations("octo-org")?;
//!
//! if let Some(id) = find_by_name(&configs, "baseline") {
//!     client.attach_configuration("octo-org", id, AttachScope::All)?;
//! }
//! # Ok::<(), codesec::Error>(())
//! ```

pub mod api;
pub mod error;
pub mod types;

pub use api::github::{Endpoints, GitHubClient};
pub use api::{Call, CodeSecurityApi, MockApi, MockOrg};
pub use error::{Error, ErrorCategory, Result};
pub use types::{
    AttachScope, ConfigurationDetails, ConfigurationUpdate, DEPENDABOT_FEATURES, Membership,
    NewConfiguration, SETTING_KEYS, SecurityConfiguration, Settings, allowed_values,
    find_by_name, requested_dependabot_feature, validate_settings,
};
