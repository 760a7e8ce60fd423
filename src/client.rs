use std::fmt;

use reqwest::{Method, Url};
use serde_json::Value;

use crate::resource::{ApiRequest, RequestBody};
use crate::{ClientError, xml};

/// Generic async XML REST client.
///
/// This client is transport-focused: it sends one [`ApiRequest`] and returns
/// the raw response text. For typed Studio operations use
/// [`crate::StudioClient`].
#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: Url,
    credentials: Option<Credentials>,
    http: reqwest::Client,
}

impl ApiClient {
    /// Creates a new client with the given base URL.
    ///
    /// The URL is normalized to include a trailing slash, so relative endpoint
    /// paths join correctly.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        Ok(Self {
            base_url: parse_base_url(base_url.as_ref())?,
            credentials: None,
            http: reqwest::Client::new(),
        })
    }

    /// Returns a new client sending HTTP basic credentials with all requests.
    ///
    /// Studio authenticates with the account login and its API key.
    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(user, api_key));
        self
    }

    /// Base URL all request paths are joined to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Sends a `GET` request with query parameters and parses the XML response.
    pub async fn get_xml_with_query(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ClientError> {
        self.request_xml_with_query(Method::GET, path, query).await
    }

    /// Sends a request with query parameters and parses the XML response.
    ///
    /// Returns [`Value::Null`] for successful responses with an empty body.
    pub async fn request_xml_with_query(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ClientError> {
        let request = ApiRequest::new(method, path).extend_query(query);
        let payload = self.execute(&request).await?;
        parse_payload(&payload)
    }

    /// Sends `request` and returns the response body.
    ///
    /// Non-success statuses are returned as [`ClientError::HttpStatus`].
    pub async fn execute(&self, request: &ApiRequest) -> Result<String, ClientError> {
        let url = build_url(&self.base_url, &request.path)?;
        tracing::debug!(method = %request.method, %url, "sending request");

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(reqwest::header::ACCEPT, XML_CONTENT_TYPE);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(credentials) = &self.credentials {
            builder = builder.basic_auth(&credentials.user, Some(&credentials.api_key));
        }

        if let RequestBody::Multipart(parts) = &request.body {
            let mut form = reqwest::multipart::Form::new();
            for part in parts {
                let mut form_part = reqwest::multipart::Part::bytes(part.data.clone());
                if let Some(file_name) = &part.file_name {
                    form_part = form_part.file_name(file_name.clone());
                }
                form = form.part(part.name.clone(), form_part);
            }
            builder = builder.multipart(form);
        }

        let response = builder.send().await?;
        let status = response.status();
        let payload = response.text().await?;
        tracing::debug!(%status, bytes = payload.len(), "received response");

        if !status.is_success() {
            return Err(ClientError::HttpStatus {
                status,
                body: payload,
            });
        }

        Ok(payload)
    }
}

pub(crate) const XML_CONTENT_TYPE: &str = "application/xml";

/// Login and API key sent as HTTP basic credentials.
#[derive(Clone)]
pub(crate) struct Credentials {
    pub(crate) user: String,
    pub(crate) api_key: String,
}

impl Credentials {
    pub(crate) fn new(user: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

pub(crate) fn parse_base_url(base_url: &str) -> Result<Url, ClientError> {
    let parsed =
        Url::parse(base_url).map_err(|_| ClientError::InvalidBaseUrl(base_url.to_owned()))?;
    Ok(ensure_trailing_slash(parsed))
}

pub(crate) fn build_url(base_url: &Url, path: &str) -> Result<Url, ClientError> {
    let relative = path.trim_start_matches('/');
    base_url
        .join(relative)
        .map_err(|_| ClientError::InvalidPath(path.to_owned()))
}

pub(crate) fn parse_payload(payload: &str) -> Result<Value, ClientError> {
    if payload.trim().is_empty() {
        Ok(Value::Null)
    } else {
        xml::parse(payload)
    }
}

fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_owned();
        path.push('/');
        url.set_path(&path);
    }
    url
}
