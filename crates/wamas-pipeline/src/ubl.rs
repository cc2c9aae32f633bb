//! UBL XML flattened into generic records.
//!
//! The mapping follows the common XML-to-dictionary convention:
//!
//! - element names are kept as written, namespace prefix included
//!   (`cac:DespatchLine`)
//! - a repeated child element becomes a list, in document order
//! - attributes become `@name` keys
//! - an element with only text becomes a string, an empty one becomes null
//! - the text of an element that also has attributes or children is stored
//!   under `#text`
//!
//! Text is trimmed. The resulting record has a single key, the root element.

use crate::{Error, Result};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::trace;
use wamas_record::{GenericRecord, Value};

struct Node {
    name: String,
    fields: GenericRecord,
    text: String,
}

impl Node {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let name = utf8(start.name().as_ref())?.to_string();
        let mut fields = GenericRecord::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::Xml(format!("<{name}>: {e}")))?;
            let key = utf8(attr.key.as_ref())?;
            let value = unescape(utf8(&attr.value)?).map_err(|e| Error::Xml(e.to_string()))?;
            fields.insert(format!("@{key}"), value.into_owned());
        }
        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let text = self.text.trim();
        let value = if self.fields.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            }
        } else {
            let mut fields = self.fields;
            if !text.is_empty() {
                fields.insert("#text", text);
            }
            Value::Record(fields)
        };
        (self.name, value)
    }

    fn add_child(&mut self, name: String, value: Value) {
        add(&mut self.fields, name, value);
    }
}

/// Insert a child, turning repeated names into a list.
fn add(fields: &mut GenericRecord, name: String, value: Value) {
    match fields.get_mut(&name) {
        None => {
            fields.insert(name, value);
        }
        Some(Value::List(items)) => items.push(value),
        Some(existing) => {
            let first = std::mem::take(existing);
            *existing = Value::List(vec![first, value]);
        }
    }
}

/// Flatten an XML document into a record keyed by its root element.
///
/// # Errors
///
/// Returns [`Error::Xml`] for malformed XML or a document without a root
/// element.
pub fn flatten_xml(xml: &str) -> Result<GenericRecord> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Node> = Vec::new();
    let mut document = GenericRecord::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::Xml(format!("at position {}: {e}", reader.error_position())))?;
        match event {
            Event::Start(start) => stack.push(Node::open(&start)?),
            Event::Empty(start) => {
                let (name, value) = Node::open(&start)?.close();
                attach(&mut stack, &mut document, name, value)?;
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| Error::Xml("unexpected closing tag".to_string()))?;
                let (name, value) = node.close();
                attach(&mut stack, &mut document, name, value)?;
            }
            Event::Text(text) => {
                if let Some(node) = stack.last_mut() {
                    let raw = utf8(&text)?;
                    let text = unescape(raw).map_err(|e| Error::Xml(e.to_string()))?;
                    node.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(utf8(&data)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::Xml(format!("unclosed element <{}>", open.name)));
    }
    if document.is_empty() {
        return Err(Error::Xml("document has no root element".to_string()));
    }
    trace!(root = ?document.keys().next(), "XML flattened");
    Ok(document)
}

fn attach(
    stack: &mut [Node],
    document: &mut GenericRecord,
    name: String,
    value: Value,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.add_child(name, value),
        None if document.is_empty() => add(document, name, value),
        None => return Err(Error::Xml("more than one root element".to_string())),
    }
    Ok(())
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::Xml(e.to_string()))
}
