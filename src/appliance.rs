//! Appliances, their status and the appliance command endpoints.

use serde::Serialize;

use crate::ClientError;
use crate::resource::{ApiRequest, Call, Resource};
use crate::xml::{self, Fields};

pub(crate) const APPLIANCE: Resource = Resource {
    element: "appliance",
    collection: "appliances",
    prefix: "",
    prefix_params: &[],
};

/// An appliance: a configured, buildable system image definition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Appliance {
    pub id: u64,
    pub name: Option<String>,
    pub arch: Option<String>,
    pub appliance_type: Option<String>,
    pub last_edited: Option<String>,
    pub estimated_raw_size: Option<String>,
    pub estimated_compressed_size: Option<String>,
    pub edit_url: Option<String>,
    pub icon_url: Option<String>,
    pub basesystem: Option<String>,
    pub uuid: Option<String>,
    /// Template or appliance this one was cloned from.
    pub parent: Option<ApplianceParent>,
    /// Finished builds.
    pub builds: Vec<ApplianceBuild>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ApplianceParent {
    pub id: Option<u64>,
    pub name: Option<String>,
}

/// A finished image build listed on the appliance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ApplianceBuild {
    pub id: u64,
    pub version: Option<String>,
    pub image_type: Option<String>,
    pub image_size: Option<String>,
    pub compressed_image_size: Option<String>,
    pub download_url: Option<String>,
}

impl Appliance {
    pub(crate) fn from_fields(fields: &Fields<'_>) -> Result<Self, ClientError> {
        let parent = fields
            .child("parent")
            .map(|parent| {
                let parent = Fields::new("parent", parent)?;
                Ok::<_, ClientError>(ApplianceParent {
                    id: parent.number("id")?,
                    name: parent.string("name"),
                })
            })
            .transpose()?;

        let builds = match fields.child("builds") {
            Some(builds) => Fields::new("builds", builds)?
                .children("build")
                .iter()
                .map(|build| ApplianceBuild::from_fields(&Fields::new("build", build)?))
                .collect::<Result<_, _>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            id: fields.required_number("id")?,
            name: fields.string("name"),
            arch: fields.string("arch"),
            appliance_type: fields.string("type"),
            last_edited: fields.string("last_edited"),
            estimated_raw_size: fields.string("estimated_raw_size"),
            estimated_compressed_size: fields.string("estimated_compressed_size"),
            edit_url: fields.string("edit_url"),
            icon_url: fields.string("icon_url"),
            basesystem: fields.string("basesystem"),
            uuid: fields.string("uuid"),
            parent,
            builds,
        })
    }
}

impl ApplianceBuild {
    fn from_fields(fields: &Fields<'_>) -> Result<Self, ClientError> {
        Ok(Self {
            id: fields.required_number("id")?,
            version: fields.string("version"),
            image_type: fields.string("image_type"),
            image_size: fields.string("image_size"),
            compressed_image_size: fields.string("compressed_image_size"),
            download_url: fields.string("download_url"),
        })
    }
}

/// Build and configuration state of an appliance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Status {
    /// `ok` or `error`.
    pub state: String,
    pub issues: Vec<StatusIssue>,
}

/// One problem preventing a build.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusIssue {
    pub kind: Option<String>,
    pub text: Option<String>,
}

impl Status {
    fn from_fields(fields: &Fields<'_>) -> Result<Self, ClientError> {
        let issues = match fields.child("issues") {
            Some(issues) => Fields::new("issues", issues)?
                .children("issue")
                .iter()
                .map(|issue| {
                    let issue = Fields::new("issue", issue)?;
                    Ok(StatusIssue {
                        kind: issue.string("type"),
                        text: issue.string("text"),
                    })
                })
                .collect::<Result<_, ClientError>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            state: fields.required("state")?.to_owned(),
            issues,
        })
    }

    /// Returns `true` when the appliance can be built.
    pub fn is_ok(&self) -> bool {
        self.state == "ok"
    }
}

pub(crate) fn list() -> Result<Call<Vec<Appliance>>, ClientError> {
    let request = ApiRequest::get(APPLIANCE.collection_path(&[])?);
    Ok(Call::new(request, |body| {
        xml::decode_list(body, APPLIANCE.element, Appliance::from_fields)
    }))
}

pub(crate) fn find(appliance_id: u64) -> Result<Call<Appliance>, ClientError> {
    let request = ApiRequest::get(APPLIANCE.element_path(appliance_id, &[])?);
    Ok(Call::new(request, |body| {
        xml::decode_one(body, APPLIANCE.element, Appliance::from_fields)
    }))
}

/// Clones an appliance or template.
///
/// Studio reads every parameter from the query string; `appliance_id` is the
/// source id again and caller options follow in their order.
pub(crate) fn clone(source_id: u64, options: &[(&str, &str)]) -> Result<Call<Appliance>, ClientError> {
    let options: Vec<_> = options
        .iter()
        .copied()
        .filter(|(key, _)| *key != "appliance_id" && *key != "clone_from")
        .collect();
    let request = ApiRequest::post(APPLIANCE.collection_path(&[])?)
        .query("clone_from", source_id)
        .query("appliance_id", source_id)
        .extend_query(&options);
    Ok(Call::new(request, |body| {
        xml::decode_one(body, APPLIANCE.element, Appliance::from_fields)
    }))
}

pub(crate) fn status(appliance_id: u64) -> Result<Call<Status>, ClientError> {
    let path = format!("{}/status", APPLIANCE.element_path(appliance_id, &[])?);
    Ok(Call::new(ApiRequest::get(path), |body| {
        xml::decode_one(body, "status", Status::from_fields)
    }))
}

/// Commands accepted by `appliances/{id}/cmd/{command}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    AddRepository,
    RemoveRepository,
    AddUserRepository,
    AddPackage,
    RemovePackage,
    AddPattern,
    RemovePattern,
    BanPackage,
    UnbanPackage,
}

impl Command {
    fn as_str(self) -> &'static str {
        match self {
            Self::AddRepository => "add_repository",
            Self::RemoveRepository => "remove_repository",
            Self::AddUserRepository => "add_user_repository",
            Self::AddPackage => "add_package",
            Self::RemovePackage => "remove_package",
            Self::AddPattern => "add_pattern",
            Self::RemovePattern => "remove_pattern",
            Self::BanPackage => "ban_package",
            Self::UnbanPackage => "unban_package",
        }
    }
}

fn command_request(appliance_id: u64, command: Command) -> Result<ApiRequest, ClientError> {
    let path = format!(
        "{}/cmd/{}",
        APPLIANCE.element_path(appliance_id, &[])?,
        command.as_str()
    );
    Ok(ApiRequest::post(path))
}

/// Adds or removes one repository.
pub(crate) fn repository_command(
    appliance_id: u64,
    command: Command,
    repo_id: u64,
) -> Result<Call<()>, ClientError> {
    tracing::debug!(appliance_id, repo_id, command = command.as_str(), "repository command");
    let request = command_request(appliance_id, command)?.query("repo_id", repo_id);
    Ok(Call::command(request))
}

pub(crate) fn add_user_repository(appliance_id: u64) -> Result<Call<()>, ClientError> {
    Ok(Call::command(command_request(
        appliance_id,
        Command::AddUserRepository,
    )?))
}

/// Package or pattern selection command; `name` goes first, options follow.
pub(crate) fn software_command(
    appliance_id: u64,
    command: Command,
    name: &str,
    options: &[(&str, &str)],
) -> Result<Call<()>, ClientError> {
    let request = command_request(appliance_id, command)?
        .query("name", name)
        .extend_query(options);
    Ok(Call::command(request))
}
