//! Minimal element tree over quick-xml events.
//!
//! Capabilities documents are small (tens of KB to a few MB) and the parsers
//! need random access to siblings, so the event stream is assembled into a
//! tree once. Namespace prefixes are dropped; elements and attributes are
//! addressed by local name.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tile_common::ParseError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    /// Attribute value by local name (`xlink:href` is found as `href`).
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text content, `None` when empty.
    pub fn text(&self) -> Option<&str> {
        let t = self.text.trim();
        (!t.is_empty()).then_some(t)
    }

    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(Element::text)
    }

    /// Follow a path of local names, taking the first match at each step.
    pub fn find_path(&self, path: &[&str]) -> Option<&Element> {
        path.iter().try_fold(self, |el, name| el.child(name))
    }
}

fn local_name(bytes: &[u8]) -> String {
    let full = String::from_utf8_lossy(bytes);
    match full.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => full.into_owned(),
    }
}

fn open_element(start: &BytesStart<'_>) -> Result<Element, quick_xml::Error> {
    let mut element = Element {
        name: local_name(start.local_name().as_ref()),
        ..Default::default()
    };
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = local_name(attr.key.as_ref());
        // namespace declarations carry no data we need
        if key == "xmlns" || attr.key.as_ref().starts_with(b"xmlns:") {
            continue;
        }
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

/// Browsers and some proxies report XML failures as a `parsererror` node
/// inside an otherwise well-formed document.
fn reject_parser_error(element: &Element, position: usize) -> Result<(), ParseError> {
    if element.name.eq_ignore_ascii_case("parsererror") {
        return Err(ParseError::MalformedXml {
            position,
            message: element.text().unwrap_or("parser error").to_string(),
        });
    }
    Ok(())
}

/// Parse a document into its root element.
pub fn parse_document(xml: &str) -> Result<Element, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    let malformed = |position: usize, message: String| ParseError::MalformedXml { position, message };

    loop {
        let event = reader.read_event_into(&mut buf);
        let position = reader.buffer_position();
        match event {
            Ok(Event::Start(e)) => {
                let element = open_element(&e).map_err(|err| malformed(position, err.to_string()))?;
                stack.push(element);
            }
            Ok(Event::Empty(e)) => {
                let element = open_element(&e).map_err(|err| malformed(position, err.to_string()))?;
                reject_parser_error(&element, position)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed(position, "unexpected closing tag".to_string()))?;
                reject_parser_error(&element, position)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(current) = stack.last_mut() {
                    let text = t.unescape().map_err(|err| malformed(position, err.to_string()))?;
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(malformed(position, e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(malformed(
            reader.buffer_position(),
            format!("unclosed element <{}>", open.name),
        ));
    }

    root.ok_or_else(|| malformed(0, "document has no root element".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_drops_namespace_prefixes() {
        let root = parse_document(
            r#"<a:Root xmlns:a="urn:a" xmlns:xlink="urn:x"><a:Child xlink:href="https://h/">t &amp; u</a:Child><Empty/></a:Root>"#,
        )
        .unwrap();
        assert_eq!(root.name, "Root");
        assert!(root.attributes.is_empty());
        let child = root.child("Child").unwrap();
        assert_eq!(child.attr("href"), Some("https://h/"));
        assert_eq!(child.text(), Some("t & u"));
        assert!(root.child("Empty").is_some());
    }

    #[test]
    fn test_nested_parsererror_is_malformed() {
        let err = parse_document(
            r#"<Capabilities version="1.0.0"><parsererror>bad token</parsererror><Contents/></Capabilities>"#,
        )
        .unwrap_err();
        match err {
            ParseError::MalformedXml { message, .. } => assert_eq!(message, "bad token"),
            other => panic!("unexpected error {:?}", other),
        }

        let err = parse_document(r#"<Root><a><x:parsererror xmlns:x="urn:x"/></a></Root>"#).unwrap_err();
        assert_eq!(err.code(), "MALFORMED_XML");
    }

    #[test]
    fn test_mismatched_tags_are_malformed() {
        let err = parse_document("<a><b></a>").unwrap_err();
        assert_eq!(err.code(), "MALFORMED_XML");
    }

    #[test]
    fn test_unclosed_root_is_malformed() {
        assert!(matches!(
            parse_document("<a><b/>"),
            Err(ParseError::MalformedXml { .. })
        ));
    }

    #[test]
    fn test_find_path() {
        let root = parse_document("<a><b><c>x</c></b></a>").unwrap();
        assert_eq!(root.find_path(&["b", "c"]).and_then(Element::text), Some("x"));
        assert!(root.find_path(&["b", "d"]).is_none());
    }
}
