//! In-memory XML tree for uploaded GPX documents
//!
//! Nodes live in an arena owned by [`GpxDocument`] and are addressed by
//! [`NodeId`]. Each node knows its parent, but only for walking upward
//! (namespace scope, metadata checks); ownership always flows from the
//! document. Text is kept exactly as it appeared in the source so a parse and
//! serialize cycle preserves formatting.

use std::io::Read;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{GpxHrError, ParseError, Result};

/// Namespace permanently bound to the `xml` prefix
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Handle to a node inside one [`GpxDocument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A single attribute, value stored unescaped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Element name and attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written, `prefix:local` or `local`
    pub name: String,
    pub attributes: Vec<Attribute>,
    /// Written as `<name/>` in the source
    self_closing: bool,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            self_closing: false,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(key, value));
        self
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map(|(_, local)| local)
            .unwrap_or(&self.name)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }

    /// Namespace this element declares for `prefix` (`None` is the default)
    fn declared_namespace(&self, prefix: Option<&str>) -> Option<&str> {
        match prefix {
            None => self.attribute("xmlns"),
            Some(prefix) => self
                .attributes
                .iter()
                .find(|attr| attr.key.strip_prefix("xmlns:") == Some(prefix))
                .map(|attr| attr.value.as_str()),
        }
    }
}

/// Content of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Invisible container for the prolog, the root element and the epilog
    Document,
    Element(Element),
    /// Character data, still escaped
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A parsed XML document
#[derive(Debug, Clone)]
pub struct GpxDocument {
    nodes: Vec<Node>,
    root: NodeId,
    standalone: Option<String>,
}

const DOCUMENT: NodeId = NodeId(0);

impl GpxDocument {
    /// Parse a document from text
    pub fn parse_str(input: &str) -> Result<Self> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let mut reader = Reader::from_str(input);

        let mut doc = GpxDocument {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            root: DOCUMENT,
            standalone: None,
        };
        let mut open: Vec<NodeId> = vec![DOCUMENT];
        let mut root: Option<NodeId> = None;

        loop {
            let position = reader.buffer_position() as usize;
            let malformed = |reason: String| ParseError::Malformed { position, reason };

            let event = reader.read_event().map_err(|e| malformed(e.to_string()))?;
            let parent = *open.last().unwrap_or(&DOCUMENT);
            let at_top_level = parent == DOCUMENT;

            match event {
                Event::Decl(decl) => {
                    doc.standalone = read_standalone(&decl);
                }
                Event::Start(_) | Event::Empty(_) if at_top_level && root.is_some() => {
                    return Err(ParseError::TrailingContent.into());
                }
                Event::Start(start) => {
                    let element = read_element(&start, false).map_err(malformed)?;
                    let id = doc.push_child(parent, NodeKind::Element(element));
                    if at_top_level {
                        root = Some(id);
                    }
                    open.push(id);
                }
                Event::Empty(start) => {
                    let element = read_element(&start, true).map_err(malformed)?;
                    let id = doc.push_child(parent, NodeKind::Element(element));
                    if at_top_level {
                        root = Some(id);
                    }
                }
                Event::End(end) => {
                    let name = decode(end.name().as_ref())?.to_string();
                    let matches = doc
                        .element(parent)
                        .map(|element| element.name == name)
                        .unwrap_or(false);
                    if at_top_level || !matches {
                        return Err(ParseError::UnexpectedEnd { name }.into());
                    }
                    open.pop();
                }
                Event::Text(text) => {
                    let raw = decode(&text)?;
                    if at_top_level {
                        // Whitespace between top-level nodes is rewritten on output
                        if !raw.trim().is_empty() {
                            return Err(if root.is_some() {
                                ParseError::TrailingContent.into()
                            } else {
                                malformed("text before the root element".to_string()).into()
                            });
                        }
                    } else {
                        doc.push_child(parent, NodeKind::Text(raw.to_string()));
                    }
                }
                Event::CData(cdata) => {
                    let raw = decode(&cdata)?.to_string();
                    doc.push_child(parent, NodeKind::CData(raw));
                }
                Event::Comment(comment) => {
                    let raw = decode(&comment)?.to_string();
                    doc.push_child(parent, NodeKind::Comment(raw));
                }
                Event::PI(pi) => {
                    let raw = decode(&pi)?.to_string();
                    doc.push_child(parent, NodeKind::ProcessingInstruction(raw));
                }
                Event::DocType(doctype) => {
                    let raw = decode(&doctype)?.to_string();
                    doc.push_child(parent, NodeKind::DocType(raw));
                }
                Event::Eof => break,
            }
        }

        if let Some(&unclosed) = open.last().filter(|&&id| id != DOCUMENT) {
            let name = doc
                .element(unclosed)
                .map(|element| element.name.clone())
                .unwrap_or_default();
            return Err(ParseError::Unclosed { name }.into());
        }

        doc.root = root.ok_or(ParseError::NoRoot)?;
        Ok(doc)
    }

    /// Parse a document from raw bytes, which must be UTF-8
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(ParseError::from)?;
        Self::parse_str(text)
    }

    /// Parse a document from any reader
    pub fn parse_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::parse_bytes(&bytes)
    }

    /// The document element
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent.filter(|&parent| parent != DOCUMENT)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.node(id).kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Index of `id` among its parent's children
    pub fn position(&self, id: NodeId) -> Option<usize> {
        let parent = self.node(id).parent?;
        self.children(parent).iter().position(|&child| child == id)
    }

    /// Next sibling node, of any kind
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id).parent?;
        let position = self.position(id)?;
        self.children(parent).get(position + 1).copied()
    }

    /// Every element below `id` in document order, `id` excluded
    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if self.element(current).is_some() {
                found.push(current);
            }
            stack.extend(self.children(current).iter().rev().copied());
        }
        found
    }

    /// Concatenated text directly inside `id`, unescaped
    pub fn text(&self, id: NodeId) -> String {
        self.children(id)
            .iter()
            .filter_map(|&child| match &self.node(child).kind {
                NodeKind::Text(raw) => Some(
                    quick_xml::escape::unescape(raw)
                        .map(|text| text.into_owned())
                        .unwrap_or_else(|_| raw.clone()),
                ),
                NodeKind::CData(raw) => Some(raw.clone()),
                _ => None,
            })
            .collect()
    }

    /// Default namespace declared on the root element, if any and non-empty
    pub fn default_namespace(&self) -> Option<&str> {
        self.element(self.root)
            .and_then(|root| root.attribute("xmlns"))
            .filter(|uri| !uri.is_empty())
    }

    /// Namespace URI of an element, resolved through the declarations in scope
    pub fn namespace_of(&self, id: NodeId) -> Option<&str> {
        let prefix = self.element(id)?.prefix();
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }
        self.resolve_prefix(id, prefix)
    }

    /// Namespace bound to `prefix` at `id` (`None` looks up the default)
    pub fn resolve_prefix(&self, id: NodeId, prefix: Option<&str>) -> Option<&str> {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(uri) = self
                .element(node)
                .and_then(|element| element.declared_namespace(prefix))
            {
                return Some(uri).filter(|uri| !uri.is_empty());
            }
            current = self.node(node).parent;
        }
        None
    }

    /// A prefix bound to `uri` that is visible at `id`
    pub fn lookup_prefix(&self, id: NodeId, uri: &str) -> Option<String> {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(element) = self.element(node) {
                for attr in &element.attributes {
                    if let Some(prefix) = attr.key.strip_prefix("xmlns:") {
                        // Only usable if no closer declaration shadows it
                        if attr.value == uri && self.resolve_prefix(id, Some(prefix)) == Some(uri) {
                            return Some(prefix.to_string());
                        }
                    }
                }
            }
            current = self.node(node).parent;
        }
        None
    }

    /// Whether an element has the given namespace and local name
    pub fn is_element(&self, id: NodeId, namespace: &str, local_name: &str) -> bool {
        self.element(id)
            .map(|element| element.local_name() == local_name)
            .unwrap_or(false)
            && self.namespace_of(id) == Some(namespace)
    }

    /// Create a detached node; attach it with one of the insert methods
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element holding a single text child
    pub fn create_text_element(&mut self, element: Element, text: &str) -> NodeId {
        let id = self.create(NodeKind::Element(element));
        let escaped = quick_xml::escape::escape(text).into_owned();
        let text = self.create(NodeKind::Text(escaped));
        self.attach(id, text, None);
        id
    }

    /// Append a detached node as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.attach(parent, child, None);
    }

    /// Insert a detached node into `parent` right after the child at `position`
    pub fn insert_after(&mut self, parent: NodeId, position: usize, child: NodeId) {
        self.attach(parent, child, Some(position + 1));
    }

    /// Insert a detached node as the next sibling of `anchor`
    pub fn insert_sibling_after(&mut self, anchor: NodeId, child: NodeId) -> Result<()> {
        let parent = self.node(anchor).parent;
        let position = self.position(anchor);
        match (parent, position) {
            (Some(parent), Some(position)) if parent != DOCUMENT => {
                self.insert_after(parent, position, child);
                Ok(())
            }
            _ => Err(GpxHrError::invalid(
                "node",
                "only nodes inside the root element can receive siblings",
            )),
        }
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        debug_assert!(self.nodes[child.0].parent.is_none(), "node already attached");
        self.nodes[child.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        match index {
            Some(index) if index <= children.len() => children.insert(index, child),
            _ => children.push(child),
        }
    }

    fn push_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.create(kind);
        self.attach(parent, id, None);
        id
    }

    /// Serialize to UTF-8 text with an XML declaration
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());

        writer.write_event(Event::Decl(BytesDecl::new(
            "1.0",
            Some("UTF-8"),
            self.standalone.as_deref(),
        )))?;

        for &child in self.children(DOCUMENT) {
            writer.write_event(Event::Text(BytesText::from_escaped("\n")))?;
            self.write_node(&mut writer, child)?;
        }
        writer.write_event(Event::Text(BytesText::from_escaped("\n")))?;

        String::from_utf8(writer.into_inner())
            .map_err(|err| GpxHrError::Serialization(err.to_string()))
    }

    fn write_node(&self, writer: &mut Writer<Vec<u8>>, id: NodeId) -> Result<()> {
        match &self.node(id).kind {
            NodeKind::Document => {
                for &child in self.children(id) {
                    self.write_node(writer, child)?;
                }
            }
            NodeKind::Element(element) => {
                let mut start = BytesStart::new(element.name.as_str());
                for attr in &element.attributes {
                    start.push_attribute((attr.key.as_str(), attr.value.as_str()));
                }

                let children = self.children(id);
                if children.is_empty() && element.self_closing {
                    writer.write_event(Event::Empty(start))?;
                } else {
                    writer.write_event(Event::Start(start))?;
                    for &child in children {
                        self.write_node(writer, child)?;
                    }
                    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
                }
            }
            NodeKind::Text(raw) => {
                writer.write_event(Event::Text(BytesText::from_escaped(raw.as_str())))?;
            }
            NodeKind::CData(raw) => {
                writer.write_event(Event::CData(BytesCData::new(raw.as_str())))?;
            }
            NodeKind::Comment(raw) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(raw.as_str())))?;
            }
            NodeKind::ProcessingInstruction(raw) => {
                writer.write_event(Event::PI(BytesText::from_escaped(raw.as_str())))?;
            }
            NodeKind::DocType(raw) => {
                writer.write_event(Event::DocType(BytesText::from_escaped(raw.as_str())))?;
            }
        }
        Ok(())
    }
}

fn decode(bytes: &[u8]) -> std::result::Result<&str, ParseError> {
    Ok(std::str::from_utf8(bytes)?)
}

fn read_standalone(decl: &BytesDecl) -> Option<String> {
    let value = decl.standalone()?.ok()?;
    std::str::from_utf8(&value).ok().map(str::to_string)
}

fn read_element(start: &BytesStart, self_closing: bool) -> std::result::Result<Element, String> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| e.to_string())?
        .to_string();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(|e| e.to_string())?;
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        attributes.push(Attribute::new(key, value.into_owned()));
    }

    Ok(Element {
        name,
        attributes,
        self_closing,
    })
}
