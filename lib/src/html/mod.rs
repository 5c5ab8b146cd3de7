//! An immutable tree over an HTML fragment.
//!
//! The tree is built once by [`Fragment::parse()`] and then only read or
//! consumed into a new tree; nothing edits it in place. Text is kept exactly
//! as it appears in the source, escapes and all, so that
//! [`Fragment::to_html()`] reproduces its input modulo attribute quoting and
//! void-element syntax.

mod parse;

use std::fmt::{self, Write};

use derive_more::{Deref, From};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Character data, still escaped.
    Text(String),
    /// Markup emitted verbatim: comments, doctypes, CDATA and the bodies of
    /// raw text elements like `<script>`.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    /// Attribute names and their raw, still-escaped values, in source order.
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, From)]
pub struct Fragment(Vec<Node>);

impl Fragment {
    /// Parses `html` leniently: unknown or mismatched end tags are dropped,
    /// unclosed elements are closed at the end of input, and void elements
    /// such as `<br>` never take children.
    pub fn parse(html: &str) -> Result<Fragment> {
        parse::parse(html)
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.0
    }

    /// Visits every element in document order, depth first.
    pub fn walk<'a, F: FnMut(&'a Element)>(&'a self, mut f: F) {
        self.0.iter().for_each(|node| node.walk(&mut f));
    }

    /// Consumes the fragment into a new one with each element replaced by
    /// `f(element)`. Elements are visited in document order; `f` sees an
    /// element before its children.
    pub fn try_map<F>(self, mut f: F) -> Result<Fragment>
        where F: FnMut(Element) -> Result<Element>
    {
        self.0.into_iter()
            .map(|node| node.try_map(&mut f))
            .collect::<Result<Vec<_>>>()
            .map(Fragment)
    }

    pub fn to_html(&self) -> String {
        self.to_string()
    }
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_element(&self, name: &str) -> bool {
        self.as_element().map_or(false, |e| e.is(name))
    }

    pub fn walk<'a, F: FnMut(&'a Element)>(&'a self, f: &mut F) {
        if let Node::Element(element) = self {
            f(element);
            element.children.iter().for_each(|child| child.walk(f));
        }
    }

    pub fn try_map<F>(self, f: &mut F) -> Result<Node>
        where F: FnMut(Element) -> Result<Element>
    {
        let Node::Element(element) = self else {
            return Ok(self);
        };

        let mut element = f(element)?;
        element.children = std::mem::take(&mut element.children)
            .into_iter()
            .map(|child| child.try_map(f))
            .collect::<Result<_>>()?;

        Ok(Node::Element(element))
    }

    /// The unescaped text of this node and its descendants, tags stripped.
    pub fn text(&self) -> String {
        let mut raw = String::new();
        self.raw_text(&mut raw);
        unescape(&raw)
    }

    fn raw_text(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(text),
            Node::Element(e) => e.children.iter().for_each(|c| c.raw_text(out)),
            Node::Raw(_) => {}
        }
    }
}

impl Element {
    /// Case-insensitive tag name comparison.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Sets attribute `name` to `value`, replacing an existing value in place
    /// or appending the attribute. `value` is escaped.
    pub fn with_attr(mut self, name: &str, value: &str) -> Element {
        let value = quick_xml::escape::escape(value).into_owned();
        match self.attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, existing)) => *existing = value,
            None => self.attrs.push((name.to_string(), value)),
        }

        self
    }

    pub fn text(&self) -> String {
        let mut raw = String::new();
        self.children.iter().for_each(|c| c.raw_text(&mut raw));
        unescape(&raw)
    }
}

fn unescape(raw: &str) -> String {
    // Named HTML entities that XML doesn't know are left as written.
    quick_xml::escape::unescape(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('<')?;
        f.write_str(&self.name)?;
        for (key, value) in &self.attrs {
            write!(f, " {key}=\"{value}\"")?;
        }

        if parse::is_void(&self.name) {
            return f.write_str(" />");
        }

        f.write_char('>')?;
        for child in &self.children {
            fmt::Display::fmt(child, f)?;
        }

        write!(f, "</{}>", self.name)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Element(e) => fmt::Display::fmt(e, f),
            Node::Text(s) | Node::Raw(s) => f.write_str(s),
        }
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|node| fmt::Display::fmt(node, f))
    }
}

impl FromIterator<Node> for Fragment {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Fragment(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn roundtrips_renderer_output() {
        let html = "<h1>Getting Started</h1>\n<p>Some <em>intro</em> &amp; more.</p>\n\
            <hr />\n<p><img src=\"a.png\" alt=\"a\" /></p>\n<!-- note -->\n";

        let fragment = Fragment::parse(html).unwrap();
        assert_eq!(fragment.to_html(), html);
    }

    #[test]
    fn text_strips_tags_and_unescapes() {
        let fragment = Fragment::parse("<h1>Tom &amp; <code>Jerry</code>&#39;s</h1>").unwrap();
        assert_eq!(fragment[0].text(), "Tom & Jerry's");

        let fragment = Fragment::parse("<h2>a&nbsp;b</h2>").unwrap();
        assert_eq!(fragment[0].text(), "a&nbsp;b");
    }

    #[test]
    fn lenient_structure() {
        let fragment = Fragment::parse("<p>one<br>two</p></div><ul><li>open").unwrap();
        assert_eq!(fragment.len(), 2);

        let p = fragment[0].as_element().unwrap();
        assert!(p.is("p"));
        assert_eq!(p.children.len(), 3);
        assert!(p.children[1].is_element("br"));

        assert_eq!(fragment.to_html(), "<p>one<br />two</p><ul><li>open</li></ul>");
    }

    #[test]
    fn walk_is_document_order() {
        let fragment = Fragment::parse("<div><h2>a</h2><section><h2>b</h2></section></div><h2>c</h2>")
            .unwrap();

        let mut seen = vec![];
        fragment.walk(|e| if e.is("h2") { seen.push(e.text()) });
        assert_eq!(seen, ["a", "b", "c"]);
    }

    #[test]
    fn try_map_rebuilds() {
        let fragment = Fragment::parse(r#"<h2 id="old" class="x">A</h2><p><h2>B</h2></p>"#).unwrap();
        let mapped = fragment.try_map(|e| match e.is("h2") {
            true => {
                let id = e.text().to_lowercase();
                Ok(e.with_attr("id", &id))
            }
            false => Ok(e),
        }).unwrap();

        assert_eq!(mapped.to_html(), r#"<h2 id="a" class="x">A</h2><p><h2 id="b">B</h2></p>"#);
    }
}
