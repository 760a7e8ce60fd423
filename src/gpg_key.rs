use std::path::Path;

use serde::Serialize;

use crate::ClientError;
use crate::resource::{ApiRequest, Call, FormPart, RequestBody, Resource};
use crate::xml::{self, Fields};

pub(crate) const GPG_KEY: Resource = Resource {
    element: "gpg_key",
    collection: "gpg_keys",
    prefix: "appliances/{appliance_id}/",
    prefix_params: &["appliance_id"],
};

/// Key target used when the caller does not pick one.
pub const DEFAULT_KEY_TARGET: &str = "rpm";

/// A GPG key assigned to an appliance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GpgKey {
    pub id: u64,
    pub appliance_id: u64,
    pub name: Option<String>,
    pub target: Option<String>,
    pub key: Option<String>,
}

impl GpgKey {
    fn from_fields(fields: &Fields<'_>, appliance_id: u64) -> Result<Self, ClientError> {
        Ok(Self {
            id: fields.required_number("id")?,
            appliance_id,
            name: fields.string("name"),
            target: fields.string("target"),
            key: fields.string("key"),
        })
    }
}

/// Key material to upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyMaterial {
    /// ASCII-armored key, sent as the `key` query parameter.
    Text(String),
    /// Key file contents, uploaded as the `key` multipart part.
    File { file_name: String, data: Vec<u8> },
}

impl KeyMaterial {
    /// Reads a key file for upload.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map_or_else(|| "key".to_owned(), |name| name.to_string_lossy().into_owned());
        Ok(Self::File { file_name, data })
    }
}

impl From<String> for KeyMaterial {
    fn from(key: String) -> Self {
        Self::Text(key)
    }
}

impl From<&str> for KeyMaterial {
    fn from(key: &str) -> Self {
        Self::Text(key.to_owned())
    }
}

fn collection_path(appliance_id: u64) -> Result<String, ClientError> {
    GPG_KEY.collection_path(&[("appliance_id", &appliance_id.to_string())])
}

fn element_path(appliance_id: u64, key_id: u64) -> Result<String, ClientError> {
    GPG_KEY.element_path(key_id, &[("appliance_id", &appliance_id.to_string())])
}

pub(crate) fn list(appliance_id: u64) -> Result<Call<Vec<GpgKey>>, ClientError> {
    let request = ApiRequest::get(collection_path(appliance_id)?);
    Ok(Call::new(request, move |body| {
        xml::decode_list(body, GPG_KEY.element, |fields| {
            GpgKey::from_fields(fields, appliance_id)
        })
    }))
}

/// Looks up one key; a missing key is `None` rather than an error.
pub(crate) fn find(appliance_id: u64, key_id: u64) -> Result<Call<Option<GpgKey>>, ClientError> {
    let request = ApiRequest::get(element_path(appliance_id, key_id)?);
    let call = Call::new(request, move |body| {
        xml::decode_one(body, GPG_KEY.element, |fields| {
            GpgKey::from_fields(fields, appliance_id)
        })
        .map(Some)
    });
    Ok(call.recover_with(|error| {
        if error.is_not_found() {
            tracing::debug!("gpg key not found");
            Ok(None)
        } else {
            Err(error)
        }
    }))
}

/// Uploads a key.
///
/// Query order is `name`, caller options, the default `target` when the
/// caller gave none, and finally `key` for textual keys.
pub(crate) fn create(
    appliance_id: u64,
    name: &str,
    key: KeyMaterial,
    options: &[(&str, &str)],
) -> Result<Call<GpgKey>, ClientError> {
    let mut request = ApiRequest::post(collection_path(appliance_id)?)
        .query("name", name)
        .extend_query(options);

    if !options.iter().any(|(option, _)| *option == "target") {
        request = request.query("target", DEFAULT_KEY_TARGET);
    }

    request = match key {
        KeyMaterial::Text(text) => request.query("key", text),
        KeyMaterial::File { file_name, data } => {
            request.body(RequestBody::Multipart(vec![FormPart {
                name: "key".to_owned(),
                file_name: Some(file_name),
                data,
            }]))
        }
    };

    Ok(Call::new(request, move |body| {
        xml::decode_one(body, GPG_KEY.element, |fields| {
            GpgKey::from_fields(fields, appliance_id)
        })
    }))
}

pub(crate) fn delete(appliance_id: u64, key_id: u64) -> Result<Call<()>, ClientError> {
    Ok(Call::command(ApiRequest::delete(element_path(
        appliance_id,
        key_id,
    )?)))
}
