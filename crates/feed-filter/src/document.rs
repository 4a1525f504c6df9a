//! Mutable XML document tree built on quick-xml events.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Detaching a node
//! unlinks it from its parent but keeps it in the arena, so a handle taken
//! before a mutation still names the same node afterwards.

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::types::{FeedError, FeedResult};

/// Handle to a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// An element's qualified name and attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

impl Element {
    /// Namespace prefix as written in the source, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Name without its prefix.
    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Match against a selector such as `item` or `dc:creator`.
    ///
    /// An unprefixed selector matches the local name under any prefix.
    pub fn matches(&self, selector: &str) -> bool {
        match selector.split_once(':') {
            Some((prefix, local)) => self.prefix() == Some(prefix) && self.local_name() == local,
            None => self.local_name() == selector,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// The `<?xml ...?>` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

/// What a node holds. Text and attribute values are stored unescaped;
/// comments, PIs and doctypes are stored as raw source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    Declaration(Declaration),
    DocType(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A parsed XML document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Parse a document from raw bytes.
    ///
    /// Whitespace is kept as text nodes so untouched regions serialize back
    /// unchanged.
    pub fn parse(xml: &[u8]) -> FeedResult<Self> {
        let mut doc = Document::new();
        let mut reader = Reader::from_reader(xml);
        let mut open = vec![doc.root()];
        let mut buf = Vec::new();

        loop {
            let event = match reader.read_event_into(&mut buf) {
                Ok(event) => event,
                Err(e) => {
                    return Err(FeedError::parse(reader.error_position() as u64, e.to_string()))
                }
            };
            let position = reader.buffer_position() as u64;
            let parent = open.last().copied().unwrap_or_else(|| doc.root());

            match event {
                Event::Start(e) => {
                    let element = read_element(&e, position)?;
                    let id = doc.append(parent, NodeKind::Element(element));
                    open.push(id);
                }
                Event::Empty(e) => {
                    let element = read_element(&e, position)?;
                    doc.append(parent, NodeKind::Element(element));
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let closes_open = open.len() > 1
                        && doc
                            .element(parent)
                            .is_some_and(|element| element.name == name);
                    if !closes_open {
                        return Err(FeedError::parse(
                            position,
                            format!("unexpected end tag </{name}>"),
                        ));
                    }
                    open.pop();
                }
                Event::Text(e) => {
                    let text = e
                        .unescape()
                        .map_err(|err| FeedError::parse(position, err.to_string()))?;
                    doc.append(parent, NodeKind::Text(text.into_owned()));
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    doc.append(parent, NodeKind::CData(text));
                }
                Event::Comment(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    doc.append(parent, NodeKind::Comment(text));
                }
                Event::PI(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    doc.append(parent, NodeKind::ProcessingInstruction(text));
                }
                Event::DocType(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    doc.append(parent, NodeKind::DocType(text));
                }
                Event::Decl(e) => {
                    let declaration = read_declaration(&e, position)?;
                    doc.append(parent, NodeKind::Declaration(declaration));
                }
                Event::Eof => break,
            }
            buf.clear();
        }

        if open.len() > 1 {
            let name = open
                .last()
                .and_then(|&id| doc.element(id))
                .map(|element| element.name.clone())
                .unwrap_or_default();
            return Err(FeedError::parse(
                reader.buffer_position() as u64,
                format!("unclosed element <{name}>"),
            ));
        }

        if doc.root_element().is_none() {
            return Err(FeedError::parse(0, "document has no root element"));
        }

        Ok(doc)
    }

    /// Serialize every node still attached to the tree.
    pub fn to_bytes(&self) -> FeedResult<Vec<u8>> {
        enum Step {
            Open(NodeId),
            Close(NodeId),
        }

        let mut writer = Writer::new(Vec::new());
        let mut pending: Vec<Step> = self.nodes[0]
            .children
            .iter()
            .rev()
            .map(|&id| Step::Open(id))
            .collect();

        while let Some(step) = pending.pop() {
            match step {
                Step::Open(id) => {
                    let node = &self.nodes[id.0];
                    match &node.kind {
                        NodeKind::Document => {
                            pending.extend(node.children.iter().rev().map(|&c| Step::Open(c)));
                        }
                        NodeKind::Element(element) => {
                            let mut start = BytesStart::new(element.name.as_str());
                            for (key, value) in &element.attributes {
                                start.push_attribute((key.as_str(), value.as_str()));
                            }
                            if node.children.is_empty() {
                                write_event(&mut writer, Event::Empty(start))?;
                            } else {
                                write_event(&mut writer, Event::Start(start))?;
                                pending.push(Step::Close(id));
                                pending.extend(node.children.iter().rev().map(|&c| Step::Open(c)));
                            }
                        }
                        NodeKind::Text(text) => {
                            write_event(&mut writer, Event::Text(BytesText::new(text)))?;
                        }
                        NodeKind::CData(text) => {
                            write_event(&mut writer, Event::CData(BytesCData::new(text.as_str())))?;
                        }
                        NodeKind::Comment(raw) => {
                            write_event(
                                &mut writer,
                                Event::Comment(BytesText::from_escaped(raw.as_str())),
                            )?;
                        }
                        NodeKind::ProcessingInstruction(raw) => {
                            write_event(&mut writer, Event::PI(BytesPI::new(raw.as_str())))?;
                        }
                        NodeKind::DocType(raw) => {
                            write_event(
                                &mut writer,
                                Event::DocType(BytesText::from_escaped(raw.as_str())),
                            )?;
                        }
                        NodeKind::Declaration(decl) => {
                            let decl = BytesDecl::new(
                                &decl.version,
                                decl.encoding.as_deref(),
                                decl.standalone.as_deref(),
                            );
                            write_event(&mut writer, Event::Decl(decl))?;
                        }
                    }
                }
                Step::Close(id) => {
                    if let Some(element) = self.element(id) {
                        let end = BytesEnd::new(element.name.as_str());
                        write_event(&mut writer, Event::End(end))?;
                    }
                }
            }
        }

        Ok(writer.into_inner())
    }

    /// The synthetic document node every top-level node hangs off.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The single top-level element (`<rss>` for a feed).
    pub fn root_element(&self) -> Option<NodeId> {
        self.nodes[0]
            .children
            .iter()
            .copied()
            .find(|&id| self.element(id).is_some())
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// First direct child element matching `selector`.
    pub fn child_named(&self, id: NodeId, selector: &str) -> Option<NodeId> {
        self.children_named(id, selector).next()
    }

    /// Direct child elements matching `selector`, in document order.
    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        selector: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(move |&child| self.element(child).is_some_and(|e| e.matches(selector)))
    }

    /// All descendant elements of `id` matching `selector`, at any depth,
    /// in document order. The result is a snapshot: mutating the tree does
    /// not change it.
    pub fn descendants_named(&self, id: NodeId, selector: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id.0].children.iter().rev().copied().collect();

        while let Some(current) = stack.pop() {
            if self.element(current).is_some_and(|e| e.matches(selector)) {
                found.push(current);
            }
            stack.extend(self.nodes[current.0].children.iter().rev().copied());
        }

        found
    }

    /// Character data (text and CDATA) directly after the element's start
    /// tag, up to its first child of any other kind.
    pub fn text(&self, id: NodeId) -> String {
        let mut text = String::new();
        for &child in &self.nodes[id.0].children {
            match &self.nodes[child.0].kind {
                NodeKind::Text(t) | NodeKind::CData(t) => text.push_str(t),
                _ => break,
            }
        }
        text
    }

    /// Unlink a node from its parent. Returns `false` if it had no parent.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.nodes[id.0].parent.take() else {
            return false;
        };
        let siblings = &mut self.nodes[parent.0].children;
        if let Some(index) = siblings.iter().position(|&c| c == id) {
            siblings.remove(index);
        }
        true
    }

    fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }
}

fn read_element(start: &BytesStart<'_>, position: u64) -> FeedResult<Element> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| FeedError::parse(position, e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| FeedError::parse(position, e.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element { name, attributes })
}

fn read_declaration(decl: &BytesDecl<'_>, position: u64) -> FeedResult<Declaration> {
    let version = decl
        .version()
        .map_err(|e| FeedError::parse(position, e.to_string()))?;
    let encoding = decl
        .encoding()
        .transpose()
        .map_err(|e| FeedError::parse(position, e.to_string()))?;
    let standalone = decl
        .standalone()
        .transpose()
        .map_err(|e| FeedError::parse(position, e.to_string()))?;

    Ok(Declaration {
        version: String::from_utf8_lossy(version.as_ref()).into_owned(),
        encoding: encoding.map(|v| String::from_utf8_lossy(v.as_ref()).into_owned()),
        standalone: standalone.map(|v| String::from_utf8_lossy(v.as_ref()).into_owned()),
    })
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> FeedResult<()> {
    writer
        .write_event(event)
        .map_err(|e| FeedError::Serialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Example</title>
    <item>
      <title>First</title>
      <dc:creator><![CDATA[Jane Doe]]></dc:creator>
      <category>Post</category>
      <category>News</category>
    </item>
    <item>
      <title>Second &amp; last</title>
    </item>
  </channel>
</rss>"#;

    fn parse(xml: &str) -> Document {
        Document::parse(xml.as_bytes()).unwrap()
    }

    fn titles(doc: &Document) -> Vec<String> {
        doc.descendants_named(doc.root(), "item")
            .into_iter()
            .filter_map(|item| doc.child_named(item, "title"))
            .map(|title| doc.text(title))
            .collect()
    }

    #[test]
    fn test_parse_items_in_order() {
        let doc = parse(FEED);
        assert_eq!(titles(&doc), vec!["First", "Second & last"]);
    }

    #[test]
    fn test_root_element_is_rss() {
        let doc = parse(FEED);
        let root = doc.root_element().unwrap();
        let element = doc.element(root).unwrap();
        assert_eq!(element.name, "rss");
        assert_eq!(element.attribute("version"), Some("2.0"));
    }

    #[test]
    fn test_prefixed_selector_and_cdata_text() {
        let doc = parse(FEED);
        let item = doc.descendants_named(doc.root(), "item")[0];
        let creator = doc.child_named(item, "dc:creator").unwrap();
        assert_eq!(doc.text(creator), "Jane Doe");
        assert!(doc.child_named(item, "atom:creator").is_none());
        // unprefixed selector matches on local name
        assert_eq!(doc.child_named(item, "creator"), Some(creator));
    }

    #[test]
    fn test_children_named_returns_all() {
        let doc = parse(FEED);
        let item = doc.descendants_named(doc.root(), "item")[0];
        let categories: Vec<String> = doc
            .children_named(item, "category")
            .map(|c| doc.text(c))
            .collect();
        assert_eq!(categories, vec!["Post", "News"]);
    }

    #[test]
    fn test_text_stops_at_first_child_element() {
        let doc = parse("<a>head<b>inner</b>tail</a>");
        let a = doc.root_element().unwrap();
        assert_eq!(doc.text(a), "head");
    }

    #[test]
    fn test_descendants_include_nested() {
        let doc = parse("<rss><channel><item/><group><item/></group></channel><item/></rss>");
        assert_eq!(doc.descendants_named(doc.root(), "item").len(), 3);
    }

    #[test]
    fn test_serialize_untouched_document() {
        let doc = parse(FEED);
        let out = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert_eq!(out, FEED);
    }

    #[test]
    fn test_detach_removes_from_output() {
        let mut doc = parse(FEED);
        let items = doc.descendants_named(doc.root(), "item");
        assert!(doc.detach(items[0]));
        assert_eq!(doc.parent(items[0]), None);
        assert!(!doc.detach(items[0]));

        let out = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert!(!out.contains("First"));
        assert!(out.contains("Second &amp; last"));
        assert_eq!(titles(&doc), vec!["Second & last"]);
    }

    #[test]
    fn test_escapes_text_on_write() {
        let doc = parse("<a>1 &lt; 2 &amp;&amp; 3</a>");
        let a = doc.root_element().unwrap();
        assert_eq!(doc.text(a), "1 < 2 && 3");
        let out = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert_eq!(out, "<a>1 &lt; 2 &amp;&amp; 3</a>");
    }

    #[test]
    fn test_mismatched_end_tag_is_error() {
        assert!(Document::parse(b"<rss><channel></rss>").is_err());
    }

    #[test]
    fn test_unclosed_element_is_error() {
        assert!(Document::parse(b"<rss><channel>").is_err());
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(Document::parse(b"").is_err());
        assert!(Document::parse(b"   \n").is_err());
    }

    #[test]
    fn test_unknown_entity_is_error() {
        let err = Document::parse(b"<a>&nbsp;</a>").unwrap_err();
        assert!(matches!(err, FeedError::Parse { .. }));
    }
}
