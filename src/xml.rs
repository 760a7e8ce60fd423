//! XML response mapping.
//!
//! Studio answers with plain XML documents. They are converted into a
//! [`serde_json::Value`] tree with the following shape:
//!
//! - the root element itself is dropped, its content is returned;
//! - child elements are always collected into arrays, even when they occur once;
//! - attributes become string scalars;
//! - an element holding only text becomes a string;
//! - text next to attributes or child elements is stored under `content`;
//! - an empty element becomes an empty mapping.
//!
//! Typed models are then decoded field by field through [`Fields`].

use std::str::FromStr;

use roxmltree::{Document, Node};
use serde_json::{Map, Value};

use crate::ClientError;

/// Key holding the text of an element that also has attributes or children.
pub(crate) const CONTENT_KEY: &str = "content";

/// Parses a document and returns its root element content.
pub(crate) fn parse(xml: &str) -> Result<Value, ClientError> {
    parse_document(xml).map(|(_, content)| content)
}

/// Parses a document and returns the root element name with its content.
pub(crate) fn parse_document(xml: &str) -> Result<(String, Value), ClientError> {
    let document = Document::parse(xml)?;
    let root = document.root_element();
    Ok((root.tag_name().name().to_owned(), element_to_value(root)))
}

/// Parses a document whose root element must be `expected`.
pub(crate) fn parse_element(xml: &str, expected: &str) -> Result<Value, ClientError> {
    let (root, content) = parse_document(xml)?;
    if root != expected {
        return Err(ClientError::decode(
            expected,
            format!("response root element is '{root}'"),
        ));
    }
    Ok(content)
}

/// Decodes a single-element response with `decoder`.
pub(crate) fn decode_one<T>(
    xml: &str,
    element: &str,
    decoder: impl FnOnce(&Fields<'_>) -> Result<T, ClientError>,
) -> Result<T, ClientError> {
    let content = parse_element(xml, element)?;
    decoder(&Fields::new(element, &content)?)
}

/// Decodes every `element` child of a collection response with `decoder`.
pub(crate) fn decode_list<T>(
    xml: &str,
    element: &str,
    decoder: impl Fn(&Fields<'_>) -> Result<T, ClientError>,
) -> Result<Vec<T>, ClientError> {
    let content = parse(xml)?;
    let collection = Fields::new(element, &content)?;
    collection
        .children(element)
        .iter()
        .map(|item| decoder(&Fields::new(element, item)?))
        .collect()
}

fn element_to_value(node: Node<'_, '_>) -> Value {
    let mut map = Map::new();

    for attribute in node.attributes() {
        map.insert(
            attribute.name().to_owned(),
            Value::String(attribute.value().to_owned()),
        );
    }

    let mut text = String::new();
    for child in node.children() {
        if child.is_element() {
            let value = element_to_value(child);
            let entry = map
                .entry(child.tag_name().name())
                .or_insert_with(|| Value::Array(Vec::new()));
            match entry {
                Value::Array(items) => items.push(value),
                // an attribute and a child element share the name
                other => {
                    let attribute = other.take();
                    *other = Value::Array(vec![attribute, value]);
                }
            }
        } else if child.is_text()
            && let Some(fragment) = child.text()
        {
            text.push_str(fragment);
        }
    }

    let text = text.trim();
    if map.is_empty() {
        if text.is_empty() {
            return Value::Object(map);
        }
        return Value::String(text.to_owned());
    }

    if !text.is_empty() {
        map.insert(CONTENT_KEY.to_owned(), Value::String(text.to_owned()));
    }
    Value::Object(map)
}

fn element_text(value: &Value) -> Option<&str> {
    match value {
        Value::String(text) => Some(text.as_str()),
        Value::Object(map) => map.get(CONTENT_KEY).and_then(Value::as_str),
        _ => None,
    }
}

/// Read-only view over the mapping of one element.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Fields<'a> {
    element: &'a str,
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    /// Wraps `value`, which must be a mapping.
    pub(crate) fn new(element: &'a str, value: &'a Value) -> Result<Self, ClientError> {
        match value {
            Value::Object(map) => Ok(Self { element, map }),
            other => Err(ClientError::decode(
                element,
                format!("expected a mapping, found {other}"),
            )),
        }
    }

    /// Text of `key`: an attribute, or the first child element holding text.
    ///
    /// A child with attributes, such as `<id type="integer">24</id>`,
    /// yields its `content`.
    pub(crate) fn text(&self, key: &str) -> Option<&'a str> {
        match self.map.get(key)? {
            Value::Array(items) => items.first().and_then(element_text),
            other => element_text(other),
        }
    }

    /// Owned copy of [`Self::text`].
    pub(crate) fn string(&self, key: &str) -> Option<String> {
        self.text(key).map(str::to_owned)
    }

    /// Like [`Self::text`] but reports a missing field.
    pub(crate) fn required(&self, key: &str) -> Result<&'a str, ClientError> {
        self.text(key)
            .ok_or_else(|| ClientError::decode(self.element, format!("missing field '{key}'")))
    }

    /// Parses the text of `key` as a number, if present.
    pub(crate) fn number<N: FromStr>(&self, key: &str) -> Result<Option<N>, ClientError> {
        self.text(key)
            .map(|raw| {
                raw.trim().parse().map_err(|_| {
                    ClientError::decode(
                        self.element,
                        format!("field '{key}' is not a number: '{raw}'"),
                    )
                })
            })
            .transpose()
    }

    /// Like [`Self::number`] but reports a missing field.
    pub(crate) fn required_number<N: FromStr>(&self, key: &str) -> Result<N, ClientError> {
        self.number(key)?
            .ok_or_else(|| ClientError::decode(self.element, format!("missing field '{key}'")))
    }

    /// All values stored under `key`, in document order.
    pub(crate) fn children(&self, key: &str) -> &'a [Value] {
        match self.map.get(key) {
            Some(Value::Array(items)) => items.as_slice(),
            Some(other) => std::slice::from_ref(other),
            None => &[],
        }
    }

    /// First value stored under `key`.
    pub(crate) fn child(&self, key: &str) -> Option<&'a Value> {
        self.children(key).first()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Fields, decode_list, parse, parse_document, parse_element};
    use crate::ClientError;

    #[test]
    fn child_elements_are_always_arrays() {
        let tree = parse("<status><state>ok</state></status>").expect("valid xml");
        assert_eq!(tree, json!({ "state": ["ok"] }));
    }

    #[test]
    fn text_next_to_attributes_is_stored_as_content() {
        let tree = parse(r#"<software><package version="1.0">bar</package><pattern>foo</pattern></software>"#)
            .expect("valid xml");
        assert_eq!(
            tree,
            json!({
                "package": [{ "version": "1.0", "content": "bar" }],
                "pattern": ["foo"],
            })
        );
    }

    #[test]
    fn empty_elements_become_empty_mappings() {
        let tree = parse("<software>\n  <repository id=\"1\"><software/></repository>\n</software>")
            .expect("valid xml");
        assert_eq!(tree, json!({ "repository": [{ "id": "1", "software": [{}] }] }));
    }

    #[test]
    fn document_keeps_root_name() {
        let (root, content) = parse_document("<appliance><id>7</id></appliance>").expect("valid xml");
        assert_eq!(root, "appliance");
        assert_eq!(content, json!({ "id": ["7"] }));
    }

    #[test]
    fn unexpected_root_is_a_decode_error() {
        let error = parse_element("<error><code>x</code></error>", "appliance")
            .expect_err("root mismatch should fail");
        assert!(matches!(error, ClientError::Decode { element, .. } if element == "appliance"));
    }

    #[test]
    fn malformed_xml_is_reported() {
        let error = parse("<appliance>").expect_err("unterminated document");
        assert!(matches!(error, ClientError::Xml(_)));
    }

    #[test]
    fn fields_read_attributes_and_children() {
        let tree = json!({ "id": "5", "name": ["repo"], "size": ["abc"] });
        let fields = Fields::new("repository", &tree).expect("mapping");
        assert_eq!(fields.required_number::<u64>("id").expect("numeric id"), 5);
        assert_eq!(fields.text("name"), Some("repo"));
        assert_eq!(fields.text("missing"), None);
        assert!(fields.number::<u64>("size").is_err());
    }

    #[test]
    fn typed_child_elements_yield_their_content() {
        let (_, tree) = parse_document(
            r#"<running_build><id type="integer">24</id><percent type="integer">5</percent><state type="string"/></running_build>"#,
        )
        .expect("valid xml");
        let fields = Fields::new("running_build", &tree).expect("mapping");
        assert_eq!(fields.text("id"), Some("24"));
        assert_eq!(fields.number::<u32>("percent").expect("numeric"), Some(5));
        assert_eq!(fields.text("state"), None);
    }

    #[test]
    fn blank_collection_decodes_to_empty_list() {
        let items = decode_list("<repositories>\n</repositories>", "repository", |fields| {
            fields.required_number::<u64>("id")
        })
        .expect("empty collection");
        assert!(items.is_empty());
    }
}
