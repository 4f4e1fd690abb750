//! Minimal HTML fragment tree for CMS-authored markup.
//!
//! CMS fields carry HTML fragments (`<div><h3>Mission</h3>...</div>`), not
//! documents. This module parses such a fragment into a tree of [`Node`]s
//! with [quick-xml](https://docs.rs/quick-xml) in a lenient, HTML-aware
//! configuration: end tag names are not checked, void elements (`<br>`,
//! `<img>`) never take children, unclosed elements are closed at the end of
//! their parent, and attributes may be unquoted or valueless.
//!
//! Serialization is lossless for anything that was not modified: every
//! element remembers its original open and close tag text, and text is kept
//! in its raw (still-escaped) form. Only elements whose attributes were
//! changed are re-serialized from their parts.
//!
//! Markup quick-xml cannot tokenize at all (e.g. a bare `<` inside text)
//! yields [`DomError::Parse`]; callers fall back to string-level handling.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::borrow::Cow;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomError {
    #[error("HTML parse error at byte {position}: {message}")]
    Parse { position: u64, message: String },
}

/// Elements that never have content or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Character data, raw (entities not decoded).
    Text(String),
    /// Comments, CDATA, doctype and processing instructions, verbatim.
    Other(String),
}

impl Node {
    fn write_html(&self, out: &mut String) {
        match self {
            Node::Element(el) => el.write_html(out),
            Node::Text(s) | Node::Other(s) => out.push_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    /// Raw attribute value; `""` for valueless attributes.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Lowercased tag name.
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    open_tag: String,
    close_tag: Option<String>,
    self_closing: bool,
    modified: bool,
}

impl Element {
    fn from_start(start: &BytesStart<'_>, self_closing: bool, position: u64) -> Result<Self, DomError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase();
        let mut attributes = Vec::new();
        for attr in start.html_attributes() {
            let attr = attr.map_err(|e| DomError::Parse {
                position,
                message: e.to_string(),
            })?;
            attributes.push(Attribute {
                name: String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                value: String::from_utf8_lossy(&attr.value).into_owned(),
            });
        }
        let inner = String::from_utf8_lossy(start);
        let open_tag = if self_closing {
            format!("<{inner}/>")
        } else {
            format!("<{inner}>")
        };
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
            open_tag,
            close_tag: None,
            self_closing,
            modified: false,
        })
    }

    /// Attribute value by case-insensitive name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing an existing one of the same name.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        {
            Some(existing) if existing.value == value => return,
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                value,
            }),
        }
        self.modified = true;
    }

    /// Remove an attribute. Returns whether it was present.
    pub fn remove_attr(&mut self, name: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|a| !a.name.eq_ignore_ascii_case(name));
        let removed = self.attributes.len() != before;
        self.modified |= removed;
        removed
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    /// Markup of this element's children.
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.write_html(&mut out);
        }
        out
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    /// Concatenated raw text of all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Visit this element and every descendant element, parents first.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Element)) {
        f(self);
        for child in &mut self.children {
            if let Node::Element(el) = child {
                el.walk_mut(f);
            }
        }
    }

    fn write_html(&self, out: &mut String) {
        if self.modified {
            out.push('<');
            out.push_str(&self.name);
            for attr in &self.attributes {
                out.push(' ');
                out.push_str(&attr.name);
                out.push('=');
                let quote = if attr.value.contains('"') { '\'' } else { '"' };
                out.push(quote);
                out.push_str(&attr.value);
                out.push(quote);
            }
            out.push_str(if self.self_closing { "/>" } else { ">" });
        } else {
            out.push_str(&self.open_tag);
        }
        for child in &self.children {
            child.write_html(out);
        }
        if let Some(close) = &self.close_tag {
            out.push_str(close);
        }
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(s) => out.push_str(s),
            Node::Element(el) => collect_text(&el.children, out),
            Node::Other(_) => {}
        }
    }
}

/// A parsed HTML fragment: a list of top-level nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    pub nodes: Vec<Node>,
}

impl Fragment {
    pub fn parse(html: &str) -> Result<Self, DomError> {
        let mut reader = Reader::from_str(html);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.expand_empty_elements = false;

        let mut roots: Vec<Node> = Vec::new();
        let mut open: Vec<Element> = Vec::new();

        loop {
            let position = reader.buffer_position() as u64;
            let event = reader.read_event().map_err(|e| DomError::Parse {
                position,
                message: e.to_string(),
            })?;
            match event {
                Event::Eof => break,
                Event::Start(start) => {
                    let el = Element::from_start(&start, false, position)?;
                    if is_void(&el.name) {
                        attach(&mut open, &mut roots, Node::Element(el));
                    } else {
                        open.push(el);
                    }
                }
                Event::Empty(start) => {
                    let el = Element::from_start(&start, true, position)?;
                    attach(&mut open, &mut roots, Node::Element(el));
                }
                Event::End(end) => {
                    let raw = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                    let name = raw.to_ascii_lowercase();
                    if is_void(&name) {
                        continue;
                    }
                    let Some(idx) = open.iter().rposition(|el| el.name == name) else {
                        // Stray close tag: keep it so the markup is unchanged.
                        attach(&mut open, &mut roots, Node::Other(format!("</{raw}>")));
                        continue;
                    };
                    close_down_to(&mut open, &mut roots, idx + 1);
                    if let Some(mut el) = open.pop() {
                        el.close_tag = Some(format!("</{raw}>"));
                        attach(&mut open, &mut roots, Node::Element(el));
                    }
                }
                Event::Text(text) => {
                    attach(&mut open, &mut roots, Node::Text(raw_str(&text)));
                }
                Event::CData(data) => {
                    let node = Node::Other(format!("<![CDATA[{}]]>", raw_str(&data)));
                    attach(&mut open, &mut roots, node);
                }
                Event::Comment(comment) => {
                    let node = Node::Other(format!("<!--{}-->", raw_str(&comment)));
                    attach(&mut open, &mut roots, node);
                }
                Event::DocType(doctype) => {
                    let node = Node::Other(format!("<!DOCTYPE {}>", raw_str(&doctype)));
                    attach(&mut open, &mut roots, node);
                }
                Event::PI(pi) => {
                    let node = Node::Other(format!("<?{}?>", raw_str(&pi)));
                    attach(&mut open, &mut roots, node);
                }
                Event::Decl(decl) => {
                    let node = Node::Other(format!("<?{}?>", raw_str(&decl)));
                    attach(&mut open, &mut roots, node);
                }
            }
        }
        close_down_to(&mut open, &mut roots, 0);
        Ok(Self { nodes: roots })
    }

    /// Top-level elements, skipping text and comments between them.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.nodes.iter().filter_map(|n| match n {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    /// Visit every element in document order, parents first.
    pub fn walk_mut(&mut self, mut f: impl FnMut(&mut Element)) {
        for node in &mut self.nodes {
            if let Node::Element(el) = node {
                el.walk_mut(&mut f);
            }
        }
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.nodes, &mut out);
        out
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            node.write_html(&mut out);
        }
        out
    }
}

fn raw_str(bytes: &[u8]) -> String {
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    }
}

/// Append a node to the innermost open element, or to the roots.
fn attach(open: &mut [Element], roots: &mut Vec<Node>, node: Node) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

/// Implicitly close open elements until only `depth` remain. Implicitly
/// closed elements get no close tag, matching their source.
fn close_down_to(open: &mut Vec<Element>, roots: &mut Vec<Node>, depth: usize) {
    while open.len() > depth {
        if let Some(el) = open.pop() {
            attach(open, roots, Node::Element(el));
        }
    }
}
