//! Running builds: asynchronous jobs turning an appliance into an image.

use reqwest::StatusCode;
use serde::Serialize;

use crate::ClientError;
use crate::error::RemoteError;
use crate::resource::{ApiRequest, Call, Resource};
use crate::xml::{self, Fields};

pub(crate) const RUNNING_BUILD: Resource = Resource {
    element: "running_build",
    collection: "running_builds",
    prefix: "",
    prefix_params: &[],
};

/// Error code Studio sends when the build version already has an image.
const IMAGE_ALREADY_EXISTS: &str = "image_already_exists";

/// A build job in progress.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunningBuild {
    pub id: u64,
    pub appliance_id: Option<u64>,
    pub state: Option<String>,
    pub percent: Option<u32>,
    /// Seconds since the build started.
    pub time_elapsed: Option<u64>,
    pub message: Option<String>,
}

impl RunningBuild {
    fn from_fields(fields: &Fields<'_>, appliance_id: Option<u64>) -> Result<Self, ClientError> {
        Ok(Self {
            id: fields.required_number("id")?,
            appliance_id: match appliance_id {
                Some(id) => Some(id),
                None => fields.number("appliance_id")?,
            },
            state: fields.string("state"),
            percent: fields.number("percent")?,
            time_elapsed: fields.number("time_elapsed")?,
            message: fields.string("message"),
        })
    }
}

/// Parameters of a new build.
///
/// Without `force`, Studio refuses to build a version that already has an
/// image and the request fails with [`ClientError::ImageAlreadyExists`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub force: bool,
    pub multi: bool,
    pub version: Option<String>,
    pub image_type: Option<String>,
    /// Any other parameter, sent after the known ones.
    pub extra: Vec<(String, String)>,
}

impl BuildOptions {
    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    #[must_use]
    pub fn multi(mut self, multi: bool) -> Self {
        self.multi = multi;
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn image_type(mut self, image_type: impl Into<String>) -> Self {
        self.image_type = Some(image_type.into());
        self
    }

    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if self.force {
            pairs.push(("force".to_owned(), "true".to_owned()));
        }
        if self.multi {
            pairs.push(("multi".to_owned(), "true".to_owned()));
        }
        if let Some(version) = &self.version {
            pairs.push(("version".to_owned(), version.clone()));
        }
        if let Some(image_type) = &self.image_type {
            pairs.push(("image_type".to_owned(), image_type.clone()));
        }
        pairs.extend(self.extra.iter().cloned());
        pairs
    }
}

/// Starts a build.
///
/// Studio does not accept an enclosed document for this endpoint, so every
/// parameter travels in the query string and the body stays empty.
pub(crate) fn start(appliance_id: u64, options: &BuildOptions) -> Result<Call<RunningBuild>, ClientError> {
    let mut request =
        ApiRequest::post(RUNNING_BUILD.collection_path(&[])?).query("appliance_id", appliance_id);
    request.query.extend(options.query_pairs());

    let call = Call::new(request, move |body| {
        xml::decode_one(body, RUNNING_BUILD.element, |fields| {
            RunningBuild::from_fields(fields, Some(appliance_id))
        })
    });
    Ok(call.recover_with(detect_image_already_exists))
}

/// Turns a `400 Bad Request` carrying `image_already_exists` into
/// [`ClientError::ImageAlreadyExists`]; every other failure is kept as is.
fn detect_image_already_exists(error: ClientError) -> Result<RunningBuild, ClientError> {
    if let ClientError::HttpStatus { status, body } = &error
        && *status == StatusCode::BAD_REQUEST
        && let Some(remote) = RemoteError::parse(body)
        && remote.code == IMAGE_ALREADY_EXISTS
    {
        tracing::warn!(message = %remote.message, "build refused, image already exists");
        return Err(ClientError::ImageAlreadyExists(remote.message));
    }
    Err(error)
}

pub(crate) fn list(appliance_id: u64) -> Result<Call<Vec<RunningBuild>>, ClientError> {
    let request =
        ApiRequest::get(RUNNING_BUILD.collection_path(&[])?).query("appliance_id", appliance_id);
    Ok(Call::new(request, move |body| {
        xml::decode_list(body, RUNNING_BUILD.element, |fields| {
            RunningBuild::from_fields(fields, Some(appliance_id))
        })
    }))
}

pub(crate) fn find(build_id: u64) -> Result<Call<RunningBuild>, ClientError> {
    let request = ApiRequest::get(RUNNING_BUILD.element_path(build_id, &[])?);
    Ok(Call::new(request, |body| {
        xml::decode_one(body, RUNNING_BUILD.element, |fields| {
            RunningBuild::from_fields(fields, None)
        })
    }))
}

/// Cancelling a build is deleting it.
pub(crate) fn cancel(build_id: u64) -> Result<Call<()>, ClientError> {
    Ok(Call::command(ApiRequest::delete(
        RUNNING_BUILD.element_path(build_id, &[])?,
    )))
}

#[cfg(test)]
mod tests {
    use reqwest::{Method, StatusCode};

    use super::{BuildOptions, cancel, find, start};
    use crate::ClientError;
    use crate::resource::RequestBody;

    fn bad_request(body: &str) -> ClientError {
        ClientError::HttpStatus {
            status: StatusCode::BAD_REQUEST,
            body: body.to_owned(),
        }
    }

    #[test]
    fn start_puts_everything_in_the_query() {
        let options = BuildOptions::default().force(true).multi(true).version("0.0.2");
        let call = start(1234, &options).expect("call builds");
        assert_eq!(call.request.method, Method::POST);
        assert_eq!(call.request.path, "running_builds");
        assert_eq!(call.request.body, RequestBody::Empty);
        let keys: Vec<_> = call.request.query.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, ["appliance_id", "force", "multi", "version"]);
        assert_eq!(call.request.query_value("appliance_id"), Some("1234"));
    }

    #[test]
    fn unset_options_are_omitted() {
        let call = start(1, &BuildOptions::default()).expect("call builds");
        assert_eq!(call.request.query.len(), 1);
    }

    #[test]
    fn started_build_is_loaded_from_response() {
        let call = start(1234, &BuildOptions::default()).expect("call builds");
        let body = "<running_build><id>509559</id><state>running</state><percent>5</percent>\
                    <time_elapsed>12</time_elapsed><message>Preparing</message></running_build>";
        let build = call.finish(Ok(body.to_owned())).expect("decodes");
        assert_eq!(build.id, 509_559);
        assert_eq!(build.appliance_id, Some(1234));
        assert_eq!(build.percent, Some(5));
        assert_eq!(build.state.as_deref(), Some("running"));
    }

    #[test]
    fn image_already_exists_keeps_server_message() {
        let call = start(1234, &BuildOptions::default()).expect("call builds");
        let error = call
            .finish(Err(bad_request(
                "<error><code>image_already_exists</code>\
                 <message>An image with version 0.0.1 already exists</message></error>",
            )))
            .expect_err("conflict");
        match error {
            ClientError::ImageAlreadyExists(message) => {
                assert_eq!(message, "An image with version 0.0.1 already exists");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn other_bad_requests_are_returned_unchanged() {
        let body = "<error><code>invalid_version</code><message>nope</message></error>";
        let call = start(1234, &BuildOptions::default()).expect("call builds");
        let error = call.finish(Err(bad_request(body))).expect_err("bad request");
        match error {
            ClientError::HttpStatus { status, body: returned } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(returned, body);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn cancel_deletes_the_build() {
        let call = cancel(42).expect("call builds");
        assert_eq!(call.request.method, Method::DELETE);
        assert_eq!(call.request.path, "running_builds/42");
    }

    #[test]
    fn found_build_reads_appliance_from_document() {
        let call = find(42).expect("call builds");
        let body = "<running_build><id>42</id><appliance_id>7</appliance_id></running_build>";
        let build = call.finish(Ok(body.to_owned())).expect("decodes");
        assert_eq!(build.appliance_id, Some(7));
    }
}
