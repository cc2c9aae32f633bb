use crate::eval::{RenderContext, Scope, evaluate};
use crate::expr::{Expr, parse_expr};
use crate::format::Format;
use crate::{Error, Result};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::debug;
use wamas_record::Value;

/// Directives that decide how an element renders; the last one wins.
const RENDER_DIRECTIVES: [&str; 5] = ["raw", "rawf", "foreach", "if", "set"];

/// A parsed template, reusable across renders and threads
///
/// Only the root element is rendered; the XML declaration, comments and
/// processing instructions are dropped. Text is emitted exactly as written
/// in the source, entities included, and CDATA sections contribute their
/// content without the markers.
#[derive(Debug, Clone)]
pub struct Template {
    root: Element,
}

#[derive(Debug, Clone)]
enum Node {
    Text(String),
    Element(Element),
}

#[derive(Debug, Clone)]
struct Element {
    name: String,
    attributes: Vec<Attribute>,
    directive: Option<Directive>,
    trim: Option<Trim>,
    children: Vec<Node>,
}

#[derive(Debug, Clone)]
struct Compiled {
    source: String,
    expr: Expr,
}

#[derive(Debug, Clone)]
enum Attribute {
    Static { name: String, raw: String },
    Eval { name: String, value: Compiled },
    Format { name: String, format: Format },
    Pair(Compiled),
}

#[derive(Debug, Clone)]
enum Directive {
    Raw(Compiled),
    RawFormat(Format),
    Foreach { items: Compiled, var: String },
    If(Compiled),
    Set { name: String, eval: Option<Compiled> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trim {
    Left,
    Right,
    Both,
}

impl Template {
    /// Parse template source and compile its directives.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for malformed XML or a missing root element,
    /// and [`Error::Syntax`] for malformed directive expressions.
    pub fn parse(source: &str) -> Result<Self> {
        let mut reader = Reader::from_str(source);
        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                Error::Parse(format!("at position {}: {e}", reader.error_position()))
            })?;
            match event {
                Event::Start(start) => stack.push(Element::compile(&start)?),
                Event::Empty(start) => attach(&mut stack, &mut root, Element::compile(&start)?)?,
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::Parse("unexpected closing tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => push_text(&mut stack, &text)?,
                Event::CData(data) => push_text(&mut stack, &data)?,
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::Parse(format!("unclosed element <{}>", open.name)));
        }
        root.map(|root| Template { root })
            .ok_or_else(|| Error::Parse("template has no root element".to_string()))
    }

    /// Render the template. Evaluation failures degrade to empty output for
    /// the affected node; rendering itself never fails.
    pub fn render(&self, context: &RenderContext) -> String {
        let mut scope = Scope::new(context);
        let mut out = String::new();
        self.root.render(&mut scope, &mut out);
        out
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(Error::Parse("more than one root element".to_string())),
    }
    Ok(())
}

fn push_text(stack: &mut [Element], bytes: &[u8]) -> Result<()> {
    // whitespace around the root element is not part of the output
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Text(utf8(bytes)?.to_string()));
    }
    Ok(())
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::Parse(e.to_string()))
}

fn unescaped(raw: &str) -> Result<String> {
    unescape(raw)
        .map(|text| text.into_owned())
        .map_err(|e| Error::Parse(format!("{e} in '{raw}'")))
}

impl Compiled {
    fn parse(raw: &str) -> Result<Self> {
        let source = unescaped(raw)?;
        let expr = parse_expr(&source)?;
        Ok(Self { source, expr })
    }

    fn eval(&self, scope: &Scope<'_>) -> Option<Value> {
        match evaluate(&self.expr, scope) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(expr = %self.source, error = %e, "template expression failed");
                None
            }
        }
    }

    fn text(&self, scope: &Scope<'_>) -> String {
        self.eval(scope).map(|value| value.to_text()).unwrap_or_default()
    }
}

fn format_text(format: &Format, scope: &Scope<'_>) -> String {
    format.render(scope).unwrap_or_else(|e| {
        debug!(format = format.source(), error = %e, "template format failed");
        String::new()
    })
}

impl Attribute {
    fn compile(directive: &str, raw: &str) -> Result<Self> {
        if directive == "att" {
            Ok(Attribute::Pair(Compiled::parse(raw)?))
        } else if let Some(name) = directive.strip_prefix("attf-") {
            Ok(Attribute::Format {
                name: name.to_string(),
                format: Format::parse(raw)?,
            })
        } else if let Some(name) = directive.strip_prefix("att-") {
            Ok(Attribute::Eval {
                name: name.to_string(),
                value: Compiled::parse(raw)?,
            })
        } else {
            Err(Error::Parse(format!("unknown attribute directive 't-{directive}'")))
        }
    }

    fn render(&self, scope: &Scope<'_>, out: &mut String) {
        let (name, value) = match self {
            Attribute::Static { name, raw } => (name.clone(), raw.replace('"', "&quot;")),
            Attribute::Eval { name, value } => (name.clone(), value.text(scope)),
            Attribute::Format { name, format } => (name.clone(), format_text(format, scope)),
            Attribute::Pair(pair) => match pair.eval(scope) {
                Some(Value::List(items)) if items.len() == 2 => {
                    (items[0].to_text(), items[1].to_text())
                }
                Some(other) => {
                    debug!(
                        expr = %pair.source,
                        found = other.type_name(),
                        "t-att expects a [name, value] pair"
                    );
                    return;
                }
                None => return,
            },
        };
        out.push(' ');
        out.push_str(&name);
        out.push_str("=\"");
        out.push_str(&value);
        out.push('"');
    }
}

impl Element {
    fn compile(start: &BytesStart<'_>) -> Result<Self> {
        let name = utf8(start.name().as_ref())?.to_string();
        let mut attributes = Vec::new();
        let mut render: Option<(String, String)> = None;
        let mut as_var = None;
        let mut eval = None;
        let mut trim = None;

        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::Parse(format!("<{name}>: {e}")))?;
            let key = utf8(attr.key.as_ref())?.to_string();
            let raw = utf8(&attr.value)?.to_string();
            match key.strip_prefix("t-") {
                Some(directive) if directive.starts_with("att") => {
                    attributes.push(Attribute::compile(directive, &raw)?);
                }
                Some(directive) if RENDER_DIRECTIVES.contains(&directive) => {
                    render = Some((directive.to_string(), raw));
                }
                Some("as") => as_var = Some(unescaped(&raw)?),
                Some("eval") => eval = Some(Compiled::parse(&raw)?),
                Some("trim") => {
                    trim = match raw.as_str() {
                        "left" => Some(Trim::Left),
                        "right" => Some(Trim::Right),
                        "both" => Some(Trim::Both),
                        _ => None,
                    }
                }
                Some(other) => {
                    debug!(element = %name, directive = other, "ignoring unknown directive");
                }
                None => attributes.push(Attribute::Static { name: key, raw }),
            }
        }

        let directive = match render {
            None => None,
            Some((kind, raw)) => Some(match kind.as_str() {
                "raw" => Directive::Raw(Compiled::parse(&raw)?),
                "rawf" => Directive::RawFormat(Format::parse(&raw)?),
                "if" => Directive::If(Compiled::parse(&raw)?),
                "foreach" => {
                    let items = Compiled::parse(&raw)?;
                    let var = as_var.unwrap_or_else(|| items.source.replace('.', "_"));
                    Directive::Foreach { items, var }
                }
                _ => Directive::Set {
                    name: unescaped(&raw)?,
                    eval,
                },
            }),
        };

        Ok(Self {
            name,
            attributes,
            directive,
            trim,
            children: Vec::new(),
        })
    }

    fn render(&self, scope: &mut Scope<'_>, out: &mut String) {
        match &self.directive {
            None => self.render_plain(scope, out),
            Some(Directive::Raw(expr)) => out.push_str(&expr.text(scope)),
            Some(Directive::RawFormat(format)) => out.push_str(&format_text(format, scope)),
            Some(Directive::If(cond)) => {
                if cond.eval(scope).is_some_and(|value| value.is_truthy()) {
                    self.render_plain(scope, out);
                }
            }
            Some(Directive::Foreach { items, var }) => self.render_foreach(items, var, scope, out),
            Some(Directive::Set { name, eval }) => {
                let value = match eval {
                    Some(expr) => expr.eval(scope).unwrap_or(Value::Null),
                    None => {
                        let mut body = String::new();
                        self.render_plain(scope, &mut body);
                        Value::String(body)
                    }
                };
                scope.set(name.as_str(), value);
            }
        }
    }

    fn render_foreach(
        &self,
        items: &Compiled,
        var: &str,
        scope: &mut Scope<'_>,
        out: &mut String,
    ) {
        let items = match items.eval(scope) {
            Some(Value::List(items)) => items,
            Some(Value::Integer(n)) => (0..n.max(0)).map(Value::Integer).collect(),
            Some(Value::Record(record)) => record.keys().map(Value::from).collect(),
            Some(Value::Null) | None => return,
            Some(other) => {
                debug!(
                    expr = %items.source,
                    found = other.type_name(),
                    "t-foreach over a non-iterable value"
                );
                return;
            }
        };

        let size = i64::try_from(items.len()).unwrap_or(i64::MAX);
        scope.push();
        scope.set(format!("{var}_size"), Value::Integer(size));
        scope.set(format!("{var}_all"), Value::List(items.clone()));
        for (index, item) in (0i64..).zip(items) {
            scope.set(format!("{var}_index"), Value::Integer(index));
            scope.set(format!("{var}_first"), Value::Bool(index == 0));
            scope.set(format!("{var}_last"), Value::Bool(index + 1 == size));
            scope.set(format!("{var}_even"), Value::Bool(index % 2 == 0));
            scope.set(format!("{var}_odd"), Value::Bool(index % 2 == 1));
            scope.set(
                format!("{var}_parity"),
                Value::from(if index % 2 == 0 { "even" } else { "odd" }),
            );
            scope.set(format!("{var}_value"), item.clone());
            if let Value::Record(record) = &item {
                for (key, value) in record.iter() {
                    scope.set(key, value.clone());
                }
            }
            scope.set(var, item);
            self.render_plain(scope, out);
        }
        scope.pop();
    }

    /// Render the element itself with its attributes and children,
    /// ignoring its rendering directive.
    fn render_plain(&self, scope: &mut Scope<'_>, out: &mut String) {
        let mut attributes = String::new();
        for attribute in &self.attributes {
            attribute.render(scope, &mut attributes);
        }

        let mut inner = String::new();
        for child in &self.children {
            match child {
                Node::Text(text) => inner.push_str(text),
                Node::Element(element) => element.render(scope, &mut inner),
            }
        }
        let inner = match self.trim {
            None => inner.as_str(),
            Some(Trim::Left) => inner.trim_start(),
            Some(Trim::Right) => inner.trim_end(),
            Some(Trim::Both) => inner.trim(),
        };

        if self.name == "t" {
            out.push_str(inner);
        } else if inner.is_empty() {
            out.push('<');
            out.push_str(&self.name);
            out.push_str(&attributes);
            out.push_str("/>");
        } else {
            out.push('<');
            out.push_str(&self.name);
            out.push_str(&attributes);
            out.push('>');
            out.push_str(inner);
            out.push_str("</");
            out.push_str(&self.name);
            out.push('>');
        }
    }
}
