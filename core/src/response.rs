//! Response decoder and result classifier.
//!
//! # Design
//! The raw byte stream still carries the HTTP status line and headers; the
//! decoder simply scans for the literal `<rsp` marker and parses everything
//! from there, so no HTTP response parsing is needed. The parsed tree is
//! flattened into [`Node`] — a loosely-typed recursive mapping mirroring
//! what dynamic callers expect from this API.
//!
//! Repeated sibling tags overwrite the same key, last write wins. That is a
//! long-standing structural limitation of the flatten, carried over
//! unchanged; callers disambiguate with schema knowledge.

use std::io::Cursor;

use indexmap::IndexMap;
use xml::reader::{EventReader, XmlEvent};

use crate::error::{Error, Result};

/// Key under which element attributes are exposed in a [`Node::Map`].
pub const ATTRIBUTES_KEY: &str = "@attributes";

/// Response status value on success.
pub const STATUS_OK: &str = "ok";

/// One node of a decoded response.
///
/// An element with only text content is a `Leaf`; an element with child
/// elements and/or attributes is a `Map` (attributes under
/// [`ATTRIBUTES_KEY`]); an element with neither is `Null`. Text on an
/// element that also carries attributes or children lands under the key
/// `"0"`, matching the original flatten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf(String),
    Null,
    Map(IndexMap<String, Node>),
}

impl Node {
    /// Child lookup; `None` on leaves and nulls.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Leaf text; `None` on maps and nulls.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Leaf(s) => Some(s),
            _ => None,
        }
    }

    /// Attribute text lookup on this node's `@attributes` sub-map.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.get(ATTRIBUTES_KEY)?.get(name)?.as_str()
    }
}

/// Extract and flatten the XML payload of a raw response.
///
/// Everything before the first `<rsp` is discarded. A stream without the
/// marker (or with nothing but whitespace after it) means no response was
/// received — an [`Error::Io`], not a parse error. Malformed XML after the
/// marker is a distinct [`Error::Io`] case.
pub fn decode(raw: &[u8]) -> Result<Node> {
    let start = raw
        .windows(4)
        .position(|w| w == b"<rsp")
        .ok_or_else(|| Error::io("No response received"))?;

    let payload = String::from_utf8_lossy(&raw[start..]);
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(Error::io("No response received"));
    }

    let mut reader = EventReader::new(Cursor::new(payload.as_bytes().to_vec()));
    loop {
        match reader.next() {
            Ok(XmlEvent::StartElement { attributes, .. }) => {
                return parse_element(&mut reader, attributes);
            }
            Ok(XmlEvent::EndDocument) => {
                return Err(Error::io("Error while parsing XML response"));
            }
            Ok(_) => {}
            Err(_) => return Err(Error::io("Error while parsing XML response")),
        }
    }
}

/// Check the top-level status attributes of a decoded response.
///
/// `status="ok"` passes the node through untouched; anything else raises
/// [`Error::Api`] with `status_code` (0 if absent or non-numeric) and
/// `status_description` from the same attributes node.
pub fn classify(node: Node) -> Result<Node> {
    if node.attr("status") == Some(STATUS_OK) {
        return Ok(node);
    }

    let code = node
        .attr("status_code")
        .and_then(|c| c.parse::<i32>().ok())
        .unwrap_or(0);
    let description = node
        .attr("status_description")
        .unwrap_or("unknown error")
        .to_string();

    Err(Error::Api { code, description })
}

/// Flatten one element, consuming events up to its matching end tag.
fn parse_element(
    reader: &mut EventReader<Cursor<Vec<u8>>>,
    attributes: Vec<xml::attribute::OwnedAttribute>,
) -> Result<Node> {
    let mut map = IndexMap::new();
    let mut text = String::new();

    if !attributes.is_empty() {
        let attrs = attributes
            .into_iter()
            .map(|a| (a.name.local_name, Node::Leaf(a.value)))
            .collect();
        map.insert(ATTRIBUTES_KEY.to_string(), Node::Map(attrs));
    }

    loop {
        match reader.next() {
            Ok(XmlEvent::StartElement {
                name, attributes, ..
            }) => {
                let child = parse_element(reader, attributes)?;
                // last sibling wins
                map.insert(name.local_name, child);
            }
            Ok(XmlEvent::Characters(s)) | Ok(XmlEvent::CData(s)) => text.push_str(&s),
            Ok(XmlEvent::EndElement { .. }) => break,
            Ok(XmlEvent::EndDocument) => break,
            Ok(_) => {}
            Err(_) => return Err(Error::io("Error while parsing XML response")),
        }
    }

    let text = text.trim().to_string();
    if map.is_empty() {
        if text.is_empty() {
            Ok(Node::Null)
        } else {
            Ok(Node::Leaf(text))
        }
    } else {
        if !text.is_empty() {
            map.insert("0".to_string(), Node::Leaf(text));
        }
        Ok(Node::Map(map))
    }
}
