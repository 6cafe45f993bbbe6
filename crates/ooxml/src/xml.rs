//! A small in-memory element tree over quick-xml events.
//!
//! Elements are matched by local name so callers never depend on the
//! namespace prefixes a producer happened to choose.

use docref_core::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// A child of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element with its attributes and children, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    /// Local name, without prefix.
    pub name: String,
    /// Qualified name as written.
    pub qname: String,
    attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Parse a document and return its root element.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event().map_err(|e| Error::Xml(e.to_string()))? {
                Event::Start(ref e) => stack.push(Self::from_start(e)),
                Event::Empty(ref e) => attach(&mut stack, &mut root, Self::from_start(e)),
                Event::End(_) => {
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, &mut root, element);
                    }
                }
                Event::Text(ref e) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = match e.unescape() {
                            Ok(text) => text.into_owned(),
                            Err(_) => String::from_utf8_lossy(e).into_owned(),
                        };
                        if !text.is_empty() {
                            parent.children.push(XmlNode::Text(text));
                        }
                    }
                }
                Event::CData(ref e) => {
                    if let Some(parent) = stack.last_mut() {
                        parent
                            .children
                            .push(XmlNode::Text(String::from_utf8_lossy(e).into_owned()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        // Unclosed elements still count in a truncated part.
        while let Some(element) = stack.pop() {
            attach(&mut stack, &mut root, element);
        }

        root.ok_or_else(|| Error::Xml("document has no root element".to_string()))
    }

    fn from_start(e: &BytesStart<'_>) -> Self {
        let qname = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let name = String::from_utf8_lossy(local_name(e.name().as_ref())).into_owned();

        let attributes = e
            .attributes()
            .flatten()
            .filter(|attr| {
                let key = attr.key.as_ref();
                key != b"xmlns" && !key.starts_with(b"xmlns:")
            })
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                let value = match attr.unescape_value() {
                    Ok(value) => value.into_owned(),
                    Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
                };
                (key, value)
            })
            .collect();

        Self {
            name,
            qname,
            attributes,
            children: Vec::new(),
        }
    }

    pub fn is(&self, local: &str) -> bool {
        self.name == local
    }

    /// Attribute by qualified name, e.g. `w:val` or `Target`.
    pub fn attr(&self, qname: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == qname)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute by local name, whatever its prefix.
    pub fn attr_local(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| local_name_str(k) == local)
            .map(|(_, v)| v.as_str())
    }

    /// A prefixed attribute by local name, e.g. `r:id` next to a plain `id`.
    pub fn prefixed_attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.contains(':') && local_name_str(k) == local)
            .map(|(_, v)| v.as_str())
    }

    /// Numeric attribute by local name.
    pub fn attr_f64(&self, local: &str) -> Option<f64> {
        self.attr_local(local)?.trim().parse().ok()
    }

    /// Child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Child elements with the given local name.
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| e.name == local)
    }

    /// First child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == local)
    }

    /// Follow a path of local names through first-matching children.
    pub fn path(&self, locals: &[&str]) -> Option<&XmlElement> {
        locals
            .iter()
            .try_fold(self, |element, local| element.child(local))
    }

    /// First descendant (depth-first, excluding self) with the local name.
    pub fn find(&self, local: &str) -> Option<&XmlElement> {
        for element in self.elements() {
            if element.name == local {
                return Some(element);
            }
            if let Some(found) = element.find(local) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants with the local name, in document order.
    pub fn find_all<'a>(&'a self, local: &str) -> Vec<&'a XmlElement> {
        let mut found = Vec::new();
        self.collect_named(local, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, local: &str, found: &mut Vec<&'a XmlElement>) {
        for element in self.elements() {
            if element.name == local {
                found.push(element);
            }
            element.collect_named(local, found);
        }
    }

    /// Concatenated text of all descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(element) => element.push_text(out),
            }
        }
    }
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

/// Extract the local name from a potentially namespaced XML element name.
pub fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

fn local_name_str(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<p:sld xmlns:p="urn:p" xmlns:a="urn:a" xmlns:r="urn:r">
  <p:cSld>
    <p:spTree>
      <p:sp>
        <p:spPr><a:xfrm><a:off x="10" y="20"/><a:ext cx="30" cy="40"/></a:xfrm></p:spPr>
        <p:txBody><a:p><a:r><a:t>Fish &amp; Chips</a:t></a:r><a:r><a:t> to go</a:t></a:r></a:p></p:txBody>
      </p:sp>
      <p:pic><p:blipFill><a:blip r:embed="rId2"/></p:blipFill></p:pic>
      <p:sldId id="256" r:id="rId7"/>
    </p:spTree>
  </p:cSld>
</p:sld>"#;

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sp"), b"sp");
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"sp"), b"sp");
    }

    #[test]
    fn test_parse_tree() {
        let root = XmlElement::parse(SLIDE).unwrap();
        assert_eq!(root.name, "sld");
        assert_eq!(root.qname, "p:sld");

        let tree = root.path(&["cSld", "spTree"]).unwrap();
        assert_eq!(tree.elements().count(), 3);

        let sp = tree.child("sp").unwrap();
        let off = sp.find("off").unwrap();
        assert_eq!(off.attr_f64("x"), Some(10.0));
        assert_eq!(off.attr_f64("y"), Some(20.0));

        let texts: Vec<String> = sp.find_all("t").iter().map(|t| t.text()).collect();
        assert_eq!(texts, vec!["Fish & Chips", " to go"]);
    }

    #[test]
    fn test_attribute_lookup() {
        let root = XmlElement::parse(SLIDE).unwrap();
        let blip = root.find("blip").unwrap();
        assert_eq!(blip.attr("r:embed"), Some("rId2"));
        assert_eq!(blip.attr_local("embed"), Some("rId2"));
        assert!(blip.attr("xmlns:r").is_none());

        let sld_id = root.find("sldId").unwrap();
        assert_eq!(sld_id.attr("id"), Some("256"));
        assert_eq!(sld_id.prefixed_attr("id"), Some("rId7"));
    }

    #[test]
    fn test_malformed_xml_is_error() {
        assert!(XmlElement::parse("").is_err());
        assert!(XmlElement::parse("<a><b></a>").is_err());
    }
}
