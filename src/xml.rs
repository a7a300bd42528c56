//! Owned, mutable XML tree for OOXML parts.
//!
//! Elements keep their qualified name as written (so prefixes round-trip) next
//! to the namespace URI the prefix resolved to at parse time. Lookups always go
//! through `(Ns, local name)`, never through the prefix.

use std::borrow::Cow;

use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute as RawAttribute;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};

use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ns {
    pub prefix: &'static str,
    pub uri: &'static str,
}

pub const W: Ns = Ns {
    prefix: "w",
    uri: "http://schemas.openxmlformats.org/wordprocessingml/2006/main",
};
pub const WP: Ns = Ns {
    prefix: "wp",
    uri: "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing",
};
pub const P: Ns = Ns {
    prefix: "p",
    uri: "http://schemas.openxmlformats.org/presentationml/2006/main",
};
pub const PKG_REL: Ns = Ns {
    prefix: "",
    uri: "http://schemas.openxmlformats.org/package/2006/relationships",
};
pub const XML: Ns = Ns {
    prefix: "xml",
    uri: "http://www.w3.org/XML/1998/namespace",
};

#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub namespace: Option<String>,
    pub value: String,
}

impl Attribute {
    fn local_name(&self) -> &str {
        local_part(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    /// Raw (still escaped) comment body.
    Comment(String),
    /// Raw processing instruction body.
    ProcessingInstruction(String),
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

fn local_part(qname: &str) -> &str {
    qname.rsplit_once(':').map_or(qname, |(_, local)| local)
}

fn qualified(ns: Ns, local: &str) -> String {
    if ns.prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{local}", ns.prefix)
    }
}

impl Element {
    pub fn new(ns: Ns, local: &str) -> Self {
        Element {
            name: qualified(ns, local),
            namespace: Some(ns.uri.to_string()),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    pub fn is(&self, ns: Ns, local: &str) -> bool {
        self.local_name() == local && self.namespace.as_deref() == Some(ns.uri)
    }

    pub fn with_attr(mut self, ns: Ns, local: &str, value: impl Into<String>) -> Self {
        self.set_attr(ns, local, value);
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Namespaced attribute lookup (`w:val`, `xml:space`, ...).
    pub fn attr(&self, ns: Ns, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.local_name() == local && a.namespace.as_deref() == Some(ns.uri))
            .map(|a| a.value.as_str())
    }

    /// Unprefixed attribute lookup (`cx`, `Target`, ...).
    pub fn plain_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name && a.namespace.is_none())
            .map(|a| a.value.as_str())
    }

    pub fn set_attr(&mut self, ns: Ns, local: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(existing) = self
            .attributes
            .iter_mut()
            .find(|a| a.local_name() == local && a.namespace.as_deref() == Some(ns.uri))
        {
            existing.value = value;
            return;
        }
        self.attributes.push(Attribute {
            name: qualified(ns, local),
            namespace: Some(ns.uri.to_string()),
            value,
        });
    }

    pub fn set_plain_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|a| a.name == name && a.namespace.is_none())
        {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                namespace: None,
                value,
            }),
        }
    }

    /// Returns true if the attribute was present.
    pub fn remove_attr(&mut self, ns: Ns, local: &str) -> bool {
        let before = self.attributes.len();
        self.attributes
            .retain(|a| !(a.local_name() == local && a.namespace.as_deref() == Some(ns.uri)));
        self.attributes.len() != before
    }

    pub fn elements(&self) -> impl DoubleEndedIterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn children_named<'a>(
        &'a self,
        ns: Ns,
        local: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |el| el.is(ns, local))
    }

    pub fn children_named_mut<'a>(
        &'a mut self,
        ns: Ns,
        local: &'a str,
    ) -> impl Iterator<Item = &'a mut Element> + 'a {
        self.elements_mut().filter(move |el| el.is(ns, local))
    }

    pub fn child(&self, ns: Ns, local: &str) -> Option<&Element> {
        self.elements().find(|el| el.is(ns, local))
    }

    pub fn child_mut(&mut self, ns: Ns, local: &str) -> Option<&mut Element> {
        self.elements_mut().find(|el| el.is(ns, local))
    }

    /// Index into `children` of the first matching element.
    pub fn position(&self, ns: Ns, local: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|n| matches!(n, Node::Element(el) if el.is(ns, local)))
    }

    /// Returns the existing child or inserts `Element::new(ns, local)` at `index`.
    pub fn child_or_insert(&mut self, ns: Ns, local: &str, index: usize) -> &mut Element {
        let idx = match self.position(ns, local) {
            Some(idx) => idx,
            None => {
                let idx = index.min(self.children.len());
                self.children.insert(idx, Element::new(ns, local).into());
                idx
            }
        };
        match &mut self.children[idx] {
            Node::Element(el) => el,
            _ => unreachable!("position() only reports element nodes"),
        }
    }

    pub fn insert_child(&mut self, index: usize, child: impl Into<Node>) {
        let index = index.min(self.children.len());
        self.children.insert(index, child.into());
    }

    pub fn push_child(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
    }

    /// Removes every direct child element matching `pred` and returns them in order.
    pub fn remove_children_where<F: Fn(&Element) -> bool>(&mut self, pred: F) -> Vec<Element> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.children.len());
        for node in self.children.drain(..) {
            match node {
                Node::Element(el) if pred(&el) => removed.push(el),
                other => kept.push(other),
            }
        }
        self.children = kept;
        removed
    }

    pub fn remove_children_named(&mut self, ns: Ns, local: &str) -> Vec<Element> {
        self.remove_children_where(|el| el.is(ns, local))
    }

    /// Pre-order traversal of all descendant elements (self excluded).
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.elements().rev().collect(),
        }
    }

    pub fn descendants_named<'a>(
        &'a self,
        ns: Ns,
        local: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.descendants().filter(move |el| el.is(ns, local))
    }

    /// Visits every descendant element mutably, parents before children.
    pub fn for_each_descendant_mut<F: FnMut(&mut Element)>(&mut self, f: &mut F) {
        for child in self.elements_mut() {
            f(child);
            child.for_each_descendant_mut(f);
        }
    }

    /// Concatenated direct text children.
    pub fn own_text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) | Node::CData(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let el = self.stack.pop()?;
        self.stack.extend(el.elements().rev());
        Some(el)
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Declaration {
    version: String,
    encoding: Option<String>,
    standalone: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct XmlDocument {
    declaration: Option<Declaration>,
    prolog: Vec<Node>,
    pub root: Element,
}

struct Scope {
    bindings: Vec<(String, String)>,
}

fn resolve<'s>(scopes: &'s [Scope], prefix: &str) -> Option<&'s str> {
    if prefix == XML.prefix {
        return Some(XML.uri);
    }
    scopes
        .iter()
        .rev()
        .flat_map(|s| s.bindings.iter().rev())
        .find(|(p, _)| p == prefix)
        .map(|(_, uri)| uri.as_str())
        .filter(|uri| !uri.is_empty())
}

fn prefix_of(qname: &str) -> &str {
    qname.split_once(':').map_or("", |(prefix, _)| prefix)
}

fn open_element(
    reader: &Reader<&[u8]>,
    start: &BytesStart,
    scopes: &mut Vec<Scope>,
) -> Result<Element, Error> {
    let decoder = reader.decoder();
    let name = decoder.decode(start.name().as_ref())?.into_owned();

    let mut raw = Vec::new();
    let mut bindings = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = decoder.decode(attr.key.as_ref())?.into_owned();
        let value = attr.unescape_value()?.into_owned();
        if key == "xmlns" {
            bindings.push((String::new(), value.clone()));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            bindings.push((prefix.to_string(), value.clone()));
        }
        raw.push((key, value));
    }
    scopes.push(Scope { bindings });

    let attributes = raw
        .into_iter()
        .map(|(key, value)| {
            let namespace = if key == "xmlns" || key.starts_with("xmlns:") || !key.contains(':') {
                None
            } else {
                resolve(scopes, prefix_of(&key)).map(str::to_string)
            };
            Attribute { name: key, namespace, value }
        })
        .collect();

    let namespace = resolve(scopes, prefix_of(&name)).map(str::to_string);
    Ok(Element {
        name,
        namespace,
        attributes,
        children: Vec::new(),
    })
}

fn attach(stack: &mut [Element], prolog: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            // Whitespace between the declaration and the root carries nothing.
            if !matches!(&node, Node::Text(t) if t.trim().is_empty()) {
                prolog.push(node);
            }
        }
    }
}

impl XmlDocument {
    /// Parses a complete XML document. No size limit is imposed on text content.
    pub fn parse(xml: &str) -> Result<Self, Error> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);

        let mut declaration = None;
        let mut prolog = Vec::new();
        let mut scopes: Vec<Scope> = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Decl(decl) => {
                    let decoder = reader.decoder();
                    declaration = Some(Declaration {
                        version: decoder.decode(&decl.version()?)?.into_owned(),
                        encoding: match decl.encoding() {
                            Some(enc) => Some(decoder.decode(&enc?)?.into_owned()),
                            None => None,
                        },
                        standalone: match decl.standalone() {
                            Some(sa) => Some(decoder.decode(&sa?)?.into_owned()),
                            None => None,
                        },
                    });
                }
                Event::Start(start) => {
                    let el = open_element(&reader, &start, &mut scopes)?;
                    stack.push(el);
                }
                Event::Empty(start) => {
                    let el = open_element(&reader, &start, &mut scopes)?;
                    scopes.pop();
                    if stack.is_empty() {
                        root = Some(el);
                    } else {
                        attach(&mut stack, &mut prolog, el.into());
                    }
                }
                Event::End(_) => {
                    scopes.pop();
                    let Some(el) = stack.pop() else {
                        return Err(Error::InvalidPackage("unbalanced end tag".into()));
                    };
                    if stack.is_empty() {
                        root = Some(el);
                    } else {
                        attach(&mut stack, &mut prolog, el.into());
                    }
                }
                Event::Text(text) => {
                    if root.is_none() {
                        let text = text.unescape()?.into_owned();
                        attach(&mut stack, &mut prolog, Node::Text(text));
                    }
                }
                Event::CData(cdata) => {
                    let text = reader.decoder().decode(&cdata.into_inner())?.into_owned();
                    attach(&mut stack, &mut prolog, Node::CData(text));
                }
                Event::Comment(comment) => {
                    if root.is_none() {
                        let raw = reader.decoder().decode(&comment)?.into_owned();
                        attach(&mut stack, &mut prolog, Node::Comment(raw));
                    }
                }
                Event::PI(pi) => {
                    if root.is_none() {
                        let raw = reader.decoder().decode(&pi)?.into_owned();
                        attach(&mut stack, &mut prolog, Node::ProcessingInstruction(raw));
                    }
                }
                Event::DocType(_) => {}
                Event::Eof => break,
            }
        }

        if !stack.is_empty() {
            return Err(Error::InvalidPackage("unexpected end of XML".into()));
        }
        let root = root.ok_or_else(|| Error::InvalidPackage("XML part has no root element".into()))?;
        Ok(XmlDocument {
            declaration,
            prolog,
            root,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut writer = Writer::new(Vec::new());
        if let Some(decl) = &self.declaration {
            writer.write_event(Event::Decl(BytesDecl::new(
                &decl.version,
                decl.encoding.as_deref(),
                decl.standalone.as_deref(),
            )))?;
            writer.get_mut().extend_from_slice(b"\r\n");
        }
        for node in &self.prolog {
            write_node(&mut writer, node)?;
        }
        write_element(&mut writer, &self.root)?;
        Ok(writer.into_inner())
    }

    pub fn to_string_lossy(&self) -> Result<String, Error> {
        Ok(String::from_utf8_lossy(&self.to_bytes()?).into_owned())
    }
}

/// Serializes a single element without declaration; used for fragments.
pub fn element_to_string(el: &Element) -> Result<String, Error> {
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, el)?;
    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

/// A literal CR in text would be read back as LF, so it stays a reference.
fn escape_text(text: &str) -> String {
    escape(text).replace('\r', "&#13;")
}

/// Attribute-value normalization turns literal whitespace characters into
/// spaces; keep them as character references.
fn escape_attr(value: &str) -> String {
    escape(value)
        .replace('\r', "&#13;")
        .replace('\n', "&#10;")
        .replace('\t', "&#9;")
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> Result<(), Error> {
    match node {
        Node::Element(el) => write_element(writer, el)?,
        Node::Text(text) => {
            writer.write_event(Event::Text(BytesText::from_escaped(escape_text(text))))?
        }
        Node::CData(text) => writer.write_event(Event::CData(BytesCData::new(text.as_str())))?,
        Node::Comment(raw) => {
            writer.write_event(Event::Comment(BytesText::from_escaped(raw.as_str())))?
        }
        Node::ProcessingInstruction(raw) => {
            writer.write_event(Event::PI(BytesText::from_escaped(raw.as_str())))?
        }
    }
    Ok(())
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &Element) -> Result<(), Error> {
    let mut start = BytesStart::new(el.name.as_str());
    for attr in &el.attributes {
        start.push_attribute(RawAttribute {
            key: QName(attr.name.as_bytes()),
            value: Cow::Owned(escape_attr(&attr.value).into_bytes()),
        });
    }
    if el.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for child in &el.children {
        write_node(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(el.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t xml:space="preserve"> a &amp; b </w:t></w:r></w:p></w:body></w:document>"#;

    #[test]
    fn resolves_prefixes_to_namespaces() {
        let doc = XmlDocument::parse(DOC).unwrap();
        assert!(doc.root.is(W, "document"));
        let t = doc.root.descendants_named(W, "t").next().unwrap();
        assert_eq!(t.attr(XML, "space"), Some("preserve"));
        assert_eq!(t.own_text(), " a & b ");
    }

    #[test]
    fn alternate_prefix_matches_by_uri() {
        let xml = r#"<x:body xmlns:x="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><x:p/></x:body>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        assert!(doc.root.is(W, "body"));
        assert!(doc.root.child(W, "p").is_some());
    }

    #[test]
    fn serializes_back_with_escaping() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let out = doc.to_string_lossy().unwrap();
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"));
        assert!(out.contains("<w:t xml:space=\"preserve\"> a &amp; b </w:t>"));
        let again = XmlDocument::parse(&out).unwrap();
        assert_eq!(again.root, doc.root);
    }

    #[test]
    fn mismatched_tags_are_errors() {
        assert!(XmlDocument::parse("<a><b></a>").is_err());
        assert!(XmlDocument::parse("<a>").is_err());
    }

    #[test]
    fn child_or_insert_and_removal() {
        let mut el = Element::new(W, "tblPr").with_child(Element::new(W, "tblW"));
        el.child_or_insert(W, "tblLayout", 0).set_attr(W, "type", "autofit");
        assert_eq!(el.position(W, "tblLayout"), Some(0));
        let removed = el.remove_children_named(W, "tblW");
        assert_eq!(removed.len(), 1);
        assert_eq!(el.elements().count(), 1);
        assert!(!el.remove_attr(W, "type"));
        assert_eq!(el.child(W, "tblLayout").unwrap().attr(W, "type"), Some("autofit"));
    }

    #[test]
    fn character_references_survive_round_trip() {
        let doc = XmlDocument::parse(r#"<r a="x&#10;y&#9;z"><t>a&#13;b</t></r>"#).unwrap();
        assert_eq!(doc.root.plain_attr("a"), Some("x\ny\tz"));
        let out = doc.to_string_lossy().unwrap();
        assert_eq!(out, r#"<r a="x&#10;y&#9;z"><t>a&#13;b</t></r>"#);
        assert_eq!(XmlDocument::parse(&out).unwrap(), doc);
    }

    #[test]
    fn large_text_nodes_are_accepted() {
        let payload = "A".repeat(12 * 1024 * 1024);
        let xml = format!("<root><data>{payload}</data></root>");
        let doc = XmlDocument::parse(&xml).unwrap();
        assert_eq!(doc.root.elements().next().unwrap().own_text().len(), payload.len());
    }
}
