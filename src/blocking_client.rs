use reqwest::{Method, Url};
use serde_json::Value;

use crate::ClientError;
use crate::client::{Credentials, XML_CONTENT_TYPE, build_url, parse_base_url, parse_payload};
use crate::resource::{ApiRequest, RequestBody};

/// Generic blocking XML REST client.
///
/// This is the synchronous counterpart of [`crate::ApiClient`].
#[derive(Debug)]
pub struct BlockingApiClient {
    base_url: Url,
    credentials: Option<Credentials>,
    http: reqwest::blocking::Client,
}

impl BlockingApiClient {
    /// Creates a new client with the given base URL.
    ///
    /// The URL is normalized to include a trailing slash, so relative endpoint
    /// paths join correctly.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        Ok(Self {
            base_url: parse_base_url(base_url.as_ref())?,
            credentials: None,
            http: reqwest::blocking::Client::new(),
        })
    }

    /// Returns a new client sending HTTP basic credentials with all requests.
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
    pub fn get_xml_with_query(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ClientError> {
        self.request_xml_with_query(Method::GET, path, query)
    }

    /// Sends a request with query parameters and parses the XML response.
    ///
    /// Returns [`Value::Null`] for successful responses with an empty body.
    pub fn request_xml_with_query(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ClientError> {
        let request = ApiRequest::new(method, path).extend_query(query);
        let payload = self.execute(&request)?;
        parse_payload(&payload)
    }

    /// Sends `request` and returns the response body.
    pub fn execute(&self, request: &ApiRequest) -> Result<String, ClientError> {
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
            let mut form = reqwest::blocking::multipart::Form::new();
            for part in parts {
                let mut form_part = reqwest::blocking::multipart::Part::bytes(part.data.clone());
                if let Some(file_name) = &part.file_name {
                    form_part = form_part.file_name(file_name.clone());
                }
                form = form.part(part.name.clone(), form_part);
            }
            builder = builder.multipart(form);
        }

        let response = builder.send()?;
        let status = response.status();
        let payload = response.text()?;
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
