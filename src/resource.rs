use reqwest::Method;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::ClientError;

/// Location of one remote resource type relative to the API base URL.
///
/// `prefix` may contain `{param}` placeholders listed in `prefix_params`;
/// they are replaced when rendering paths.
#[derive(Clone, Copy, Debug)]
pub struct Resource {
    /// Singular element name used in XML documents (`repository`).
    pub element: &'static str,
    /// Plural collection name used in paths (`repositories`).
    pub collection: &'static str,
    /// Path prefix template, empty or ending with `/`.
    pub prefix: &'static str,
    /// Placeholder names appearing in `prefix`.
    pub prefix_params: &'static [&'static str],
}

impl Resource {
    /// Path of the whole collection, e.g. `appliances/12/repositories`.
    pub fn collection_path(&self, prefix_params: &[(&str, &str)]) -> Result<String, ClientError> {
        Ok(format!(
            "{}{}",
            self.render_prefix(prefix_params)?,
            self.collection
        ))
    }

    /// Path of one element, e.g. `appliances/12/repositories/34`.
    pub fn element_path(
        &self,
        id: u64,
        prefix_params: &[(&str, &str)],
    ) -> Result<String, ClientError> {
        Ok(format!("{}/{id}", self.collection_path(prefix_params)?))
    }

    fn render_prefix(&self, prefix_params: &[(&str, &str)]) -> Result<String, ClientError> {
        let mut rendered = self.prefix.to_owned();

        for required_param in self.prefix_params {
            let value = prefix_params
                .iter()
                .find(|(name, _)| name == required_param)
                .map(|(_, value)| *value)
                .ok_or(ClientError::MissingPathParameter {
                    resource: self.element,
                    parameter: *required_param,
                })?;

            let placeholder = format!("{{{required_param}}}");
            rendered = rendered.replace(&placeholder, &encode_path_segment(value));
        }

        Ok(rendered)
    }
}

/// Characters escaped inside a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn encode_path_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// One HTTP request against the Studio API, relative to the client base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    /// Query pairs, sent in order.
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Appends one query pair.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Appends caller-supplied query pairs, keeping their order.
    #[must_use]
    pub fn extend_query(mut self, pairs: &[(&str, &str)]) -> Self {
        self.query.extend(
            pairs
                .iter()
                .map(|(key, value)| ((*key).to_owned(), (*value).to_owned())),
        );
        self
    }

    #[must_use]
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Returns the value of the first query pair named `key`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

/// Payload of an [`ApiRequest`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RequestBody {
    /// No body; Studio reads everything from the query string.
    #[default]
    Empty,
    /// `multipart/form-data` upload.
    Multipart(Vec<FormPart>),
}

/// One part of a multipart upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub file_name: Option<String>,
    pub data: Vec<u8>,
}

type Decoder<T> = Box<dyn FnOnce(&str) -> Result<T, ClientError> + Send>;

/// A request together with the way its response is turned into `T`.
///
/// Both [`crate::StudioClient`] and [`crate::BlockingStudioClient`] execute
/// the same calls, they only differ in how the request is sent.
pub(crate) struct Call<T> {
    pub(crate) request: ApiRequest,
    pub(crate) decode: Decoder<T>,
    /// Gets a chance to turn a failed request into a value or a more specific error.
    pub(crate) recover: fn(ClientError) -> Result<T, ClientError>,
}

impl<T> Call<T> {
    pub(crate) fn new(
        request: ApiRequest,
        decode: impl FnOnce(&str) -> Result<T, ClientError> + Send + 'static,
    ) -> Self {
        Self {
            request,
            decode: Box::new(decode),
            recover: Err,
        }
    }

    #[must_use]
    pub(crate) fn recover_with(mut self, recover: fn(ClientError) -> Result<T, ClientError>) -> Self {
        self.recover = recover;
        self
    }

    pub(crate) fn finish(self, response: Result<String, ClientError>) -> Result<T, ClientError> {
        match response {
            Ok(body) => (self.decode)(&body),
            Err(error) => (self.recover)(error),
        }
    }
}

impl Call<()> {
    /// A call whose response body is not interpreted.
    pub(crate) fn command(request: ApiRequest) -> Self {
        Self::new(request, |_| Ok(()))
    }
}
