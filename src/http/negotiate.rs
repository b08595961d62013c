//! Content negotiation
//!
//! Picks a body decoder from the response content type, falling back to the
//! URL's file extension, then to plain text, then to the raw bytes.

use super::{Body, RawResponse};
use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use url::Url;

/// Structured body formats the session can decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFamily {
    Json,
    Xml,
    Yaml,
}

impl ContentFamily {
    pub fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Yaml => "yaml",
        }
    }

    /// Match the media type essence of a `Content-Type` value
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/json" => Some(Self::Json),
            "application/xml" | "text/xml" => Some(Self::Xml),
            "application/yaml" | "application/x-yaml" | "text/yaml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Match the extension of the last path segment
    pub fn from_path(path: &str) -> Option<Self> {
        let file_name = path.rsplit(['/', '\\']).next()?;
        let (_, extension) = file_name.rsplit_once('.')?;

        match extension.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Content type first, URL extension second
    pub fn detect(content_type: &str, url: &Url) -> Option<Self> {
        Self::from_content_type(content_type).or_else(|| Self::from_path(url.path()))
    }

    /// Decode a body. Blank bodies decode to `null`.
    pub fn decode(self, bytes: &[u8], url: &Url) -> Result<Value> {
        let text = String::from_utf8_lossy(bytes);
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        match self {
            Self::Json => serde_json::from_str(&text).map_err(|e| Error::decode("json", url, e)),
            Self::Yaml => serde_yaml::from_str(&text).map_err(|e| Error::decode("yaml", url, e)),
            Self::Xml => xml_to_value(&text).map_err(|e| Error::decode("xml", url, e)),
        }
    }
}

/// Decode a successful response body.
pub fn decode_body(
    content_type: Option<&str>,
    url: &Url,
    status: u16,
    bytes: Vec<u8>,
) -> Result<Body> {
    let declared = content_type.unwrap_or_default();

    if let Some(family) = ContentFamily::detect(declared, url) {
        return family.decode(&bytes, url).map(Body::Data);
    }

    if declared.to_ascii_lowercase().contains("text") {
        return Ok(Body::Text(String::from_utf8_lossy(&bytes).into_owned()));
    }

    Ok(Body::Raw(RawResponse {
        status,
        content_type: content_type.map(str::to_string),
        url: url.clone(),
        bytes,
    }))
}

struct XmlNode {
    name: String,
    map: Map<String, Value>,
    text: String,
}

/// Convert an XML document into a JSON value.
///
/// Attributes become `@name` keys, mixed text becomes `#text`, repeated child
/// elements collapse into arrays and text-only elements become strings.
pub fn xml_to_value(text: &str) -> std::result::Result<Value, String> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root = Map::new();

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(start) => stack.push(open_node(&start)?),
            Event::Empty(start) => {
                let node = open_node(&start)?;
                let parent = match stack.last_mut() {
                    Some(parent) => &mut parent.map,
                    None => &mut root,
                };
                attach(parent, node);
            },
            Event::Text(content) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&content.unescape().map_err(|e| e.to_string())?);
                }
            },
            Event::CData(content) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&content.into_inner()));
                }
            },
            Event::End(_) => {
                let node = stack.pop().ok_or("unbalanced closing tag")?;
                let parent = match stack.last_mut() {
                    Some(parent) => &mut parent.map,
                    None => &mut root,
                };
                attach(parent, node);
            },
            Event::Eof => break,
            _ => {},
        }
    }

    if let Some(node) = stack.last() {
        return Err(format!("unclosed element <{}>", node.name));
    }

    Ok(Value::Object(root))
}

fn open_node(start: &BytesStart<'_>) -> std::result::Result<XmlNode, String> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut map = Map::new();

    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        map.insert(key, Value::String(value.into_owned()));
    }

    Ok(XmlNode {
        name,
        map,
        text: String::new(),
    })
}

fn attach(parent: &mut Map<String, Value>, node: XmlNode) {
    let XmlNode {
        name,
        mut map,
        text,
    } = node;

    let value = if map.is_empty() {
        if text.is_empty() {
            Value::Null
        } else {
            Value::String(text)
        }
    } else {
        if !text.is_empty() {
            map.insert("#text".to_string(), Value::String(text));
        }
        Value::Object(map)
    };

    match parent.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        },
        None => {
            parent.insert(name, value);
        },
    }
}
