use reqwest::Method;
use serde_json::Value;

use crate::appliance::{self, Appliance, Command, Status};
use crate::gpg_key::{self, GpgKey, KeyMaterial};
use crate::repository::{self, Repository, RepositoryIds};
use crate::resource::Call;
use crate::running_build::{self, BuildOptions, RunningBuild};
use crate::software::{self, Software};
use crate::{ApiClient, BlockingApiClient, ClientError};

/// Base URL of the public Studio user API.
pub const DEFAULT_BASE_URL: &str = "https://susestudio.com/api/v2/user";

/// Async Studio API client.
///
/// Every method maps to one remote operation (several sequential requests for
/// the multi-id repository commands). The client carries its own connection
/// settings; clone it to share.
#[derive(Clone, Debug)]
pub struct StudioClient {
    inner: ApiClient,
}

impl StudioClient {
    /// Creates a client with an explicit base URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        Ok(Self {
            inner: ApiClient::new(base_url)?,
        })
    }

    /// Creates a client for [`DEFAULT_BASE_URL`].
    pub fn from_default_server() -> Result<Self, ClientError> {
        Self::new(DEFAULT_BASE_URL)
    }

    /// Returns a new client authenticating as `user` with `api_key`.
    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.inner = self.inner.with_credentials(user, api_key);
        self
    }

    /// Sends a request using a raw path and method and returns the XML tree.
    ///
    /// This bypasses the typed operations but keeps client configuration.
    pub async fn request_xml_with_query(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ClientError> {
        self.inner.request_xml_with_query(method, path, query).await
    }

    async fn send<T>(&self, call: Call<T>) -> Result<T, ClientError> {
        let response = self.inner.execute(&call.request).await;
        call.finish(response)
    }

    /// Lists all appliances of the account.
    pub async fn appliances(&self) -> Result<Vec<Appliance>, ClientError> {
        self.send(appliance::list()?).await
    }

    pub async fn appliance(&self, appliance_id: u64) -> Result<Appliance, ClientError> {
        self.send(appliance::find(appliance_id)?).await
    }

    /// Clones an appliance or template into a new appliance.
    pub async fn clone_appliance(
        &self,
        source_id: u64,
        options: &[(&str, &str)],
    ) -> Result<Appliance, ClientError> {
        self.send(appliance::clone(source_id, options)?).await
    }

    pub async fn appliance_status(&self, appliance_id: u64) -> Result<Status, ClientError> {
        self.send(appliance::status(appliance_id)?).await
    }

    pub async fn repositories(&self, appliance_id: u64) -> Result<Vec<Repository>, ClientError> {
        self.send(repository::list(appliance_id)?).await
    }

    /// Adds repositories one request at a time.
    ///
    /// Stops at the first failure; repositories added before it stay added.
    pub async fn add_repository(
        &self,
        appliance_id: u64,
        repo_ids: impl RepositoryIds,
    ) -> Result<(), ClientError> {
        for repo_id in repo_ids.into_ids() {
            self.send(appliance::repository_command(
                appliance_id,
                Command::AddRepository,
                repo_id,
            )?)
            .await?;
        }
        Ok(())
    }

    /// Removes repositories one request at a time.
    ///
    /// Stops at the first failure; repositories removed before it stay removed.
    pub async fn remove_repository(
        &self,
        appliance_id: u64,
        repo_ids: impl RepositoryIds,
    ) -> Result<(), ClientError> {
        for repo_id in repo_ids.into_ids() {
            self.send(appliance::repository_command(
                appliance_id,
                Command::RemoveRepository,
                repo_id,
            )?)
            .await?;
        }
        Ok(())
    }

    /// Removes a listed repository from the appliance it was listed for.
    pub async fn destroy_repository(&self, repository: &Repository) -> Result<(), ClientError> {
        self.remove_repository(repository.appliance_id, repository.id)
            .await
    }

    /// Removes a repository without fetching its appliance first.
    pub async fn delete_repository(&self, appliance_id: u64, repo_id: u64) -> Result<(), ClientError> {
        self.remove_repository(appliance_id, repo_id).await
    }

    /// Adds the repository holding the user's uploaded RPMs.
    pub async fn add_user_repository(&self, appliance_id: u64) -> Result<(), ClientError> {
        self.send(appliance::add_user_repository(appliance_id)?)
            .await
    }

    pub async fn gpg_keys(&self, appliance_id: u64) -> Result<Vec<GpgKey>, ClientError> {
        self.send(gpg_key::list(appliance_id)?).await
    }

    /// Returns `None` when the appliance has no key with this id.
    pub async fn gpg_key(&self, appliance_id: u64, key_id: u64) -> Result<Option<GpgKey>, ClientError> {
        self.send(gpg_key::find(appliance_id, key_id)?).await
    }

    /// Uploads a GPG key; `target` defaults to `rpm`.
    pub async fn add_gpg_key(
        &self,
        appliance_id: u64,
        name: &str,
        key: impl Into<KeyMaterial>,
        options: &[(&str, &str)],
    ) -> Result<GpgKey, ClientError> {
        self.send(gpg_key::create(appliance_id, name, key.into(), options)?)
            .await
    }

    pub async fn delete_gpg_key(&self, appliance_id: u64, key_id: u64) -> Result<(), ClientError> {
        self.send(gpg_key::delete(appliance_id, key_id)?).await
    }

    /// Explicitly selected patterns and packages.
    pub async fn selected_software(&self, appliance_id: u64) -> Result<Vec<Software>, ClientError> {
        self.send(software::selected(appliance_id)?).await
    }

    /// Everything installed by a build, dependencies included.
    ///
    /// Without `build_id` the latest build is used.
    pub async fn installed_software(
        &self,
        appliance_id: u64,
        build_id: Option<u64>,
    ) -> Result<Vec<Software>, ClientError> {
        self.send(software::installed(appliance_id, build_id)?)
            .await
    }

    pub async fn search_software(
        &self,
        appliance_id: u64,
        query: &str,
        options: &[(&str, &str)],
    ) -> Result<Vec<Software>, ClientError> {
        self.send(software::search(appliance_id, query, options)?)
            .await
    }

    /// Selects a package; its repository must already be part of the appliance.
    pub async fn add_package(
        &self,
        appliance_id: u64,
        name: &str,
        options: &[(&str, &str)],
    ) -> Result<(), ClientError> {
        self.software_command(appliance_id, Command::AddPackage, name, options)
            .await
    }

    pub async fn remove_package(
        &self,
        appliance_id: u64,
        name: &str,
        options: &[(&str, &str)],
    ) -> Result<(), ClientError> {
        self.software_command(appliance_id, Command::RemovePackage, name, options)
            .await
    }

    pub async fn add_pattern(
        &self,
        appliance_id: u64,
        name: &str,
        options: &[(&str, &str)],
    ) -> Result<(), ClientError> {
        self.software_command(appliance_id, Command::AddPattern, name, options)
            .await
    }

    pub async fn remove_pattern(
        &self,
        appliance_id: u64,
        name: &str,
        options: &[(&str, &str)],
    ) -> Result<(), ClientError> {
        self.software_command(appliance_id, Command::RemovePattern, name, options)
            .await
    }

    /// Bans a package so it is not installed even as a dependency.
    pub async fn ban_package(
        &self,
        appliance_id: u64,
        name: &str,
        options: &[(&str, &str)],
    ) -> Result<(), ClientError> {
        self.software_command(appliance_id, Command::BanPackage, name, options)
            .await
    }

    pub async fn unban_package(
        &self,
        appliance_id: u64,
        name: &str,
        options: &[(&str, &str)],
    ) -> Result<(), ClientError> {
        self.software_command(appliance_id, Command::UnbanPackage, name, options)
            .await
    }

    async fn software_command(
        &self,
        appliance_id: u64,
        command: Command,
        name: &str,
        options: &[(&str, &str)],
    ) -> Result<(), ClientError> {
        self.send(appliance::software_command(
            appliance_id,
            command,
            name,
            options,
        )?)
        .await
    }

    /// Starts a build of the appliance.
    ///
    /// Fails with [`ClientError::ImageAlreadyExists`] when the version was
    /// already built and `force` is not set.
    pub async fn start_build(
        &self,
        appliance_id: u64,
        options: &BuildOptions,
    ) -> Result<RunningBuild, ClientError> {
        self.send(running_build::start(appliance_id, options)?)
            .await
    }

    pub async fn running_builds(&self, appliance_id: u64) -> Result<Vec<RunningBuild>, ClientError> {
        self.send(running_build::list(appliance_id)?).await
    }

    pub async fn running_build(&self, build_id: u64) -> Result<RunningBuild, ClientError> {
        self.send(running_build::find(build_id)?).await
    }

    pub async fn cancel_build(&self, build_id: u64) -> Result<(), ClientError> {
        self.send(running_build::cancel(build_id)?).await
    }
}

/// Blocking Studio API client.
///
/// This is the synchronous counterpart of [`StudioClient`].
#[derive(Debug)]
pub struct BlockingStudioClient {
    inner: BlockingApiClient,
}

impl BlockingStudioClient {
    /// Creates a client with an explicit base URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        Ok(Self {
            inner: BlockingApiClient::new(base_url)?,
        })
    }

    /// Creates a client for [`DEFAULT_BASE_URL`].
    pub fn from_default_server() -> Result<Self, ClientError> {
        Self::new(DEFAULT_BASE_URL)
    }

    /// Returns a new client authenticating as `user` with `api_key`.
    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.inner = self.inner.with_credentials(user, api_key);
        self
    }

    /// Sends a request using a raw path and method and returns the XML tree.
    pub fn request_xml_with_query(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ClientError> {
        self.inner.request_xml_with_query(method, path, query)
    }

    fn send<T>(&self, call: Call<T>) -> Result<T, ClientError> {
        let response = self.inner.execute(&call.request);
        call.finish(response)
    }

    pub fn appliances(&self) -> Result<Vec<Appliance>, ClientError> {
        self.send(appliance::list()?)
    }

    pub fn appliance(&self, appliance_id: u64) -> Result<Appliance, ClientError> {
        self.send(appliance::find(appliance_id)?)
    }

    pub fn clone_appliance(
        &self,
        source_id: u64,
        options: &[(&str, &str)],
    ) -> Result<Appliance, ClientError> {
        self.send(appliance::clone(source_id, options)?)
    }

    pub fn appliance_status(&self, appliance_id: u64) -> Result<Status, ClientError> {
        self.send(appliance::status(appliance_id)?)
    }

    pub fn repositories(&self, appliance_id: u64) -> Result<Vec<Repository>, ClientError> {
        self.send(repository::list(appliance_id)?)
    }

    /// Adds repositories one request at a time, stopping at the first failure.
    pub fn add_repository(
        &self,
        appliance_id: u64,
        repo_ids: impl RepositoryIds,
    ) -> Result<(), ClientError> {
        for repo_id in repo_ids.into_ids() {
            self.send(appliance::repository_command(
                appliance_id,
                Command::AddRepository,
                repo_id,
            )?)?;
        }
        Ok(())
    }

    /// Removes repositories one request at a time, stopping at the first failure.
    pub fn remove_repository(
        &self,
        appliance_id: u64,
        repo_ids: impl RepositoryIds,
    ) -> Result<(), ClientError> {
        for repo_id in repo_ids.into_ids() {
            self.send(appliance::repository_command(
                appliance_id,
                Command::RemoveRepository,
                repo_id,
            )?)?;
        }
        Ok(())
    }

    pub fn destroy_repository(&self, repository: &Repository) -> Result<(), ClientError> {
        self.remove_repository(repository.appliance_id, repository.id)
    }

    pub fn delete_repository(&self, appliance_id: u64, repo_id: u64) -> Result<(), ClientError> {
        self.remove_repository(appliance_id, repo_id)
    }

    pub fn add_user_repository(&self, appliance_id: u64) -> Result<(), ClientError> {
        self.send(appliance::add_user_repository(appliance_id)?)
    }

    pub fn gpg_keys(&self, appliance_id: u64) -> Result<Vec<GpgKey>, ClientError> {
        self.send(gpg_key::list(appliance_id)?)
    }

    pub fn gpg_key(&self, appliance_id: u64, key_id: u64) -> Result<Option<GpgKey>, ClientError> {
        self.send(gpg_key::find(appliance_id, key_id)?)
    }

    pub fn add_gpg_key(
        &self,
        appliance_id: u64,
        name: &str,
        key: impl Into<KeyMaterial>,
        options: &[(&str, &str)],
    ) -> Result<GpgKey, ClientError> {
        self.send(gpg_key::create(appliance_id, name, key.into(), options)?)
    }

    pub fn delete_gpg_key(&self, appliance_id: u64, key_id: u64) -> Result<(), ClientError> {
        self.send(gpg_key::delete(appliance_id, key_id)?)
    }

    pub fn selected_software(&self, appliance_id: u64) -> Result<Vec<Software>, ClientError> {
        self.send(software::selected(appliance_id)?)
    }

    pub fn installed_software(
        &self,
        appliance_id: u64,
        build_id: Option<u64>,
    ) -> Result<Vec<Software>, ClientError> {
        self.send(software::installed(appliance_id, build_id)?)
    }

    pub fn search_software(
        &self,
        appliance_id: u64,
        query: &str,
        options: &[(&str, &str)],
    ) -> Result<Vec<Software>, ClientError> {
        self.send(software::search(appliance_id, query, options)?)
    }

    pub fn add_package(
        &self,
        appliance_id: u64,
        name: &str,
        options: &[(&str, &str)],
    ) -> Result<(), ClientError> {
        self.software_command(appliance_id, Command::AddPackage, name, options)
    }

    pub fn remove_package(
        &self,
        appliance_id: u64,
        name: &str,
        options: &[(&str, &str)],
    ) -> Result<(), ClientError> {
        self.software_command(appliance_id, Command::RemovePackage, name, options)
    }

    pub fn add_pattern(
        &self,
        appliance_id: u64,
        name: &str,
        options: &[(&str, &str)],
    ) -> Result<(), ClientError> {
        self.software_command(appliance_id, Command::AddPattern, name, options)
    }

    pub fn remove_pattern(
        &self,
        appliance_id: u64,
        name: &str,
        options: &[(&str, &str)],
    ) -> Result<(), ClientError> {
        self.software_command(appliance_id, Command::RemovePattern, name, options)
    }

    pub fn ban_package(
        &self,
        appliance_id: u64,
        name: &str,
        options: &[(&str, &str)],
    ) -> Result<(), ClientError> {
        self.software_command(appliance_id, Command::BanPackage, name, options)
    }

    pub fn unban_package(
        &self,
        appliance_id: u64,
        name: &str,
        options: &[(&str, &str)],
    ) -> Result<(), ClientError> {
        self.software_command(appliance_id, Command::UnbanPackage, name, options)
    }

    fn software_command(
        &self,
        appliance_id: u64,
        command: Command,
        name: &str,
        options: &[(&str, &str)],
    ) -> Result<(), ClientError> {
        self.send(appliance::software_command(
            appliance_id,
            command,
            name,
            options,
        )?)
    }

    pub fn start_build(
        &self,
        appliance_id: u64,
        options: &BuildOptions,
    ) -> Result<RunningBuild, ClientError> {
        self.send(running_build::start(appliance_id, options)?)
    }

    pub fn running_builds(&self, appliance_id: u64) -> Result<Vec<RunningBuild>, ClientError> {
        self.send(running_build::list(appliance_id)?)
    }

    pub fn running_build(&self, build_id: u64) -> Result<RunningBuild, ClientError> {
        self.send(running_build::find(build_id)?)
    }

    pub fn cancel_build(&self, build_id: u64) -> Result<(), ClientError> {
        self.send(running_build::cancel(build_id)?)
    }
}
