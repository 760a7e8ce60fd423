//! Packages and patterns selected, installed or found in an appliance.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::ClientError;
use crate::appliance::APPLIANCE;
use crate::resource::{ApiRequest, Call};
use crate::xml::{self, CONTENT_KEY, Fields};

/// A software pattern (a named group of packages).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Pattern {
    pub name: String,
    pub version: Option<String>,
    pub repository_id: Option<u64>,
    pub arch: Option<String>,
}

/// A single package.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Package {
    pub name: String,
    pub version: Option<String>,
    pub repository_id: Option<u64>,
}

impl Pattern {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn with_attributes(name: String, attributes: &Fields<'_>) -> Result<Self, ClientError> {
        Ok(Self {
            name,
            version: attributes.string("version"),
            repository_id: attributes.number("repository_id")?,
            arch: attributes.string("arch"),
        })
    }
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn with_attributes(name: String, attributes: &Fields<'_>) -> Result<Self, ClientError> {
        Ok(Self {
            name,
            version: attributes.string("version"),
            repository_id: attributes.number("repository_id")?,
        })
    }
}

/// Either kind of selectable software.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Software {
    Pattern(Pattern),
    Package(Package),
}

impl Software {
    pub fn name(&self) -> &str {
        match self {
            Self::Pattern(pattern) => &pattern.name,
            Self::Package(package) => &package.name,
        }
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            Self::Pattern(pattern) => pattern.version.as_deref(),
            Self::Package(package) => package.version.as_deref(),
        }
    }

    pub fn repository_id(&self) -> Option<u64> {
        match self {
            Self::Pattern(pattern) => pattern.repository_id,
            Self::Package(package) => package.repository_id,
        }
    }
}

#[derive(Clone, Copy)]
enum Kind {
    Pattern,
    Package,
}

impl Kind {
    fn element(self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::Package => "package",
        }
    }
}

/// Converts the `pattern` and `package` entries of a software listing.
///
/// Patterns come first, then packages, each in document order. An entry is
/// either a bare name or a mapping whose `content` is the name and whose other
/// keys are attributes; attributes override `preset`.
pub(crate) fn convert_selectable(
    listing: &Fields<'_>,
    preset: &Map<String, Value>,
) -> Result<Vec<Software>, ClientError> {
    let mut software = Vec::new();
    for kind in [Kind::Pattern, Kind::Package] {
        for entry in listing.children(kind.element()) {
            software.push(selectable(kind, entry, preset)?);
        }
    }
    Ok(software)
}

fn selectable(kind: Kind, entry: &Value, preset: &Map<String, Value>) -> Result<Software, ClientError> {
    let (name, mut attributes) = match entry {
        Value::String(name) => (name.clone(), Map::new()),
        Value::Object(map) => {
            let mut map = map.clone();
            let name = match map.remove(CONTENT_KEY) {
                Some(Value::String(name)) => name,
                _ => {
                    return Err(ClientError::decode(
                        kind.element(),
                        "element has attributes but no name",
                    ));
                }
            };
            (name, map)
        }
        other => {
            return Err(ClientError::decode(
                kind.element(),
                format!("unknown format of element: {other}"),
            ));
        }
    };

    for (key, value) in preset {
        attributes
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }

    let merged = Value::Object(attributes);
    let attributes = Fields::new(kind.element(), &merged)?;
    Ok(match kind {
        Kind::Pattern => Software::Pattern(Pattern::with_attributes(name, &attributes)?),
        Kind::Package => Software::Package(Package::with_attributes(name, &attributes)?),
    })
}

/// Converts a listing grouped by `repository` elements, stamping each entry
/// with the id of its group.
fn convert_grouped(body: &str) -> Result<Vec<Software>, ClientError> {
    let tree = xml::parse(body)?;
    let groups = Fields::new("software", &tree)?;

    let mut software = Vec::new();
    for repository in groups.children("repository") {
        let repository = Fields::new("repository", repository)?;
        let repository_id: u64 = repository.required_number("id")?;
        let Some(listing) = repository.child("software") else {
            continue;
        };

        let mut preset = Map::new();
        preset.insert(
            "repository_id".to_owned(),
            Value::String(repository_id.to_string()),
        );
        software.extend(convert_selectable(
            &Fields::new("software", listing)?,
            &preset,
        )?);
    }
    Ok(software)
}

fn software_path(appliance_id: u64) -> Result<String, ClientError> {
    Ok(format!(
        "{}/software",
        APPLIANCE.element_path(appliance_id, &[])?
    ))
}

pub(crate) fn selected(appliance_id: u64) -> Result<Call<Vec<Software>>, ClientError> {
    let request = ApiRequest::get(software_path(appliance_id)?);
    Ok(Call::new(request, |body| {
        let tree = xml::parse(body)?;
        convert_selectable(&Fields::new("software", &tree)?, &Map::new())
    }))
}

/// Software installed by the given build, or by the latest one.
pub(crate) fn installed(
    appliance_id: u64,
    build_id: Option<u64>,
) -> Result<Call<Vec<Software>>, ClientError> {
    let mut request = ApiRequest::get(format!("{}/installed", software_path(appliance_id)?));
    if let Some(build_id) = build_id {
        request = request.query("build_id", build_id);
    }
    Ok(Call::new(request, convert_grouped))
}

pub(crate) fn search(
    appliance_id: u64,
    query: &str,
    options: &[(&str, &str)],
) -> Result<Call<Vec<Software>>, ClientError> {
    let request = ApiRequest::get(format!("{}/search", software_path(appliance_id)?))
        .query("q", query)
        .extend_query(options);
    Ok(Call::new(request, convert_grouped))
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, Value, json};

    use super::{Package, Pattern, Software, convert_selectable, installed, search, selected};
    use crate::ClientError;
    use crate::xml::Fields;

    fn convert(tree: &Value) -> Result<Vec<Software>, ClientError> {
        convert_selectable(&Fields::new("software", tree).expect("mapping"), &Map::new())
    }

    #[test]
    fn converts_bare_names_and_attribute_mappings() {
        let tree = json!({
            "pattern": ["foo"],
            "package": [{ "content": "bar", "version": "1.0" }],
        });
        let software = convert(&tree).expect("converts");
        assert_eq!(
            software,
            [
                Software::Pattern(Pattern::new("foo")),
                Software::Package(Package {
                    name: "bar".to_owned(),
                    version: Some("1.0".to_owned()),
                    repository_id: None,
                }),
            ]
        );
    }

    #[test]
    fn empty_listing_converts_to_nothing() {
        assert!(convert(&json!({})).expect("converts").is_empty());
    }

    #[test]
    fn patterns_come_before_packages() {
        let tree = json!({ "package": ["a"], "pattern": ["b", "c"] });
        let names: Vec<_> = convert(&tree)
            .expect("converts")
            .iter()
            .map(|item| item.name().to_owned())
            .collect();
        assert_eq!(names, ["b", "c", "a"]);
    }

    #[test]
    fn unknown_element_shape_is_a_decode_error() {
        let error = convert(&json!({ "package": [["nested"]] })).expect_err("list is not an element");
        assert!(matches!(error, ClientError::Decode { element, .. } if element == "package"));
    }

    #[test]
    fn element_attributes_override_preset() {
        let mut preset = Map::new();
        preset.insert("repository_id".to_owned(), json!("1"));
        let tree = json!({ "package": [{ "content": "vim", "repository_id": "2" }, "zsh"] });
        let software = convert_selectable(&Fields::new("software", &tree).expect("mapping"), &preset)
            .expect("converts");
        assert_eq!(software[0].repository_id(), Some(2));
        assert_eq!(software[1].repository_id(), Some(1));
    }

    #[test]
    fn installed_software_concatenates_repository_groups() {
        let call = installed(24, Some(7)).expect("call builds");
        assert_eq!(call.request.path, "appliances/24/software/installed");
        assert_eq!(call.request.query_value("build_id"), Some("7"));

        let body = r#"<software>
  <repository id="10">
    <software>
      <pattern version="11.1">base</pattern>
      <package version="2.6.27">kernel-default</package>
    </software>
  </repository>
  <repository id="20">
    <software>
      <package version="7.2" arch="i586">vim</package>
    </software>
  </repository>
</software>"#;
        let software = call.finish(Ok(body.to_owned())).expect("decodes");
        let summary: Vec<_> = software
            .iter()
            .map(|item| (item.name(), item.repository_id()))
            .collect();
        assert_eq!(
            summary,
            [
                ("base", Some(10)),
                ("kernel-default", Some(10)),
                ("vim", Some(20)),
            ]
        );
    }

    #[test]
    fn search_sends_query_then_options() {
        let call = search(24, "vim", &[("all_fields", "true")]).expect("call builds");
        assert_eq!(call.request.path, "appliances/24/software/search");
        assert_eq!(call.request.query[0], ("q".to_owned(), "vim".to_owned()));
        assert_eq!(call.request.query[1].0, "all_fields");
    }

    #[test]
    fn selected_software_is_read_from_root() {
        let call = selected(24).expect("call builds");
        let body = r#"<software appliance_id="24"><pattern>base</pattern><package>vim</package></software>"#;
        let software = call.finish(Ok(body.to_owned())).expect("decodes");
        assert_eq!(software.len(), 2);
        assert_eq!(software[0], Software::Pattern(Pattern::new("base")));
        assert_eq!(software[1].version(), None);
    }
}
