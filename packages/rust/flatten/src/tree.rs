//! Parsed markup as a flat node arena.
//!
//! Nodes refer to their parent by [`NodeId`], so navigation upward never
//! implies ownership. A [`Document`] lives only as long as one flattening
//! pass needs it.

use entsoe_shared::{EntsoeError, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One markup element.
#[derive(Debug, Clone)]
pub struct Node {
    /// Local tag name, lower-cased.
    pub name: String,
    pub parent: Option<NodeId>,
    /// Element children in document order.
    pub children: Vec<NodeId>,
    /// Concatenated text content directly inside this element.
    pub text: Option<String>,
}

/// A parsed document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

impl Document {
    /// Parse markup text. Blank input gives a document without a root.
    pub fn parse(input: &str) -> Result<Self> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(true);

        let mut doc = Self::default();
        let mut open: Vec<NodeId> = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let id = doc.open_element(&e, open.last().copied())?;
                    open.push(id);
                }
                Ok(Event::Empty(e)) => {
                    doc.open_element(&e, open.last().copied())?;
                }
                Ok(Event::End(_)) => {
                    if open.pop().is_none() {
                        return Err(parse_error(&reader, "unexpected closing tag"));
                    }
                }
                Ok(Event::Text(t)) => {
                    let text = t
                        .unescape()
                        .map_err(|e| parse_error(&reader, &e.to_string()))?;
                    doc.append_text(open.last().copied(), &text, &reader)?;
                }
                Ok(Event::CData(c)) => {
                    let data = c.into_inner();
                    let text = String::from_utf8_lossy(&data);
                    doc.append_text(open.last().copied(), &text, &reader)?;
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(parse_error(&reader, &e.to_string())),
                // Declarations, comments, processing instructions, doctype.
                _ => {}
            }
        }

        if let Some(&unclosed) = open.last() {
            return Err(EntsoeError::parse(format!(
                "unexpected end of document inside <{}>",
                doc.name(unclosed)
            )));
        }

        Ok(doc)
    }

    /// Parse raw response bytes, which must be UTF-8.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| EntsoeError::parse(format!("document is not UTF-8: {e}")))?;
        Self::parse(text)
    }

    fn open_element(&mut self, start: &BytesStart<'_>, parent: Option<NodeId>) -> Result<NodeId> {
        let name = std::str::from_utf8(start.local_name().as_ref())
            .map_err(|e| EntsoeError::parse(format!("tag name is not UTF-8: {e}")))?
            .to_lowercase();

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name,
            parent,
            children: Vec::new(),
            text: None,
        });

        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None if self.root.is_none() => self.root = Some(id),
            None => {
                return Err(EntsoeError::parse(format!(
                    "second root element <{}>",
                    self.nodes[id.0].name
                )));
            }
        }
        Ok(id)
    }

    fn append_text(
        &mut self,
        target: Option<NodeId>,
        text: &str,
        reader: &Reader<&[u8]>,
    ) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let Some(id) = target else {
            return Err(parse_error(reader, "text outside of any element"));
        };
        self.nodes[id.0]
            .text
            .get_or_insert_with(String::new)
            .push_str(text);
        Ok(())
    }
}

fn parse_error(reader: &Reader<&[u8]>, message: &str) -> EntsoeError {
    EntsoeError::parse(format!(
        "{message} at byte {}",
        reader.buffer_position()
    ))
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

impl Document {
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Trimmed text content, if any.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.0].text.as_deref().map(str::trim)
    }

    /// A node without element children.
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id.0].children.is_empty()
    }

    /// First node named `tag` in document order, searching the whole tree.
    pub fn find(&self, tag: &str) -> Option<NodeId> {
        let tag = tag.to_lowercase();
        // Nodes are allocated in pre-order, so arena order is document order.
        self.nodes
            .iter()
            .position(|n| n.name == tag)
            .map(NodeId)
    }

    /// First child of `id` named `tag`.
    pub fn child(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.nodes[c.0].name == tag)
    }

    /// The element a flattening pass starts from by default.
    ///
    /// That is the document root, or the first element inside `<body>` when
    /// the document is wrapped in `<html>`.
    pub fn content_root(&self) -> Option<NodeId> {
        let root = self.root?;
        if self.name(root) != "html" {
            return Some(root);
        }
        let body = self.child(root, "body")?;
        self.children(body).first().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
