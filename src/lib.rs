//! Rust client library for the SUSE Studio appliance-building REST API.
//!
//! Public API layers:
//! - [`ApiClient`]/[`BlockingApiClient`]: generic XML HTTP clients.
//! - [`StudioClient`]/[`BlockingStudioClient`]: typed operations on
//!   appliances, repositories, GPG keys, software and running builds.
//! - [`ClientError`]: unified error type used by all clients.
//!
//! Responses are XML documents; they are decoded field by field into the
//! model types re-exported below.

mod appliance;
mod blocking_client;
mod client;
mod error;
mod gpg_key;
mod repository;
mod resource;
mod running_build;
mod software;
mod studio_client;
mod xml;

/// Appliance models.
pub use appliance::{Appliance, ApplianceBuild, ApplianceParent, Status, StatusIssue};
/// Generic blocking XML REST client.
pub use blocking_client::BlockingApiClient;
/// Generic async XML REST client.
pub use client::ApiClient;
/// Error type returned by all client operations.
pub use error::ClientError;
/// GPG key models and the default key target.
pub use gpg_key::{DEFAULT_KEY_TARGET, GpgKey, KeyMaterial};
/// Repository model and id flattening for multi-id commands.
pub use repository::{Repository, RepositoryIds};
/// Request description accepted by [`ApiClient::execute`].
pub use resource::{ApiRequest, FormPart, RequestBody};
/// Running build model and build start options.
pub use running_build::{BuildOptions, RunningBuild};
/// Software selection models.
pub use software::{Package, Pattern, Software};
/// Typed Studio clients.
///
/// See also [`StudioClient`] for the async variant.
pub use studio_client::{BlockingStudioClient, DEFAULT_BASE_URL, StudioClient};
