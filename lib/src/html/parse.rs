use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Chainable, Result};
use crate::html::{Element, Fragment, Node};

/// Elements that never have children or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "source", "track", "wbr",
];

/// Elements whose body is text up to the matching end tag, never markup.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "textarea", "title", "xmp", "iframe", "noembed", "noframes",
];

pub(crate) fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

fn reader(html: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(html.as_bytes());
    let config = reader.config_mut();
    config.trim_text(false);
    config.enable_all_checks(false);
    config.allow_unmatched_ends = true;
    config.allow_dangling_amp = true;
    reader
}

/// The input and a reader over what's left of it. Comments and raw text
/// bodies are cut out of the input by hand; the reader is restarted past them.
struct Input<'a> {
    html: &'a str,
    offset: usize,
    reader: Reader<&'a [u8]>,
}

impl<'a> Input<'a> {
    fn new(html: &'a str) -> Self {
        Input { html, offset: 0, reader: reader(html) }
    }

    fn position(&self) -> usize {
        self.offset + self.reader.buffer_position() as usize
    }

    fn rest(&self) -> &'a str {
        self.html.get(self.position()..).unwrap_or("")
    }

    fn skip(&mut self, len: usize) {
        self.offset = self.position() + len;
        self.reader = reader(self.html.get(self.offset..).unwrap_or(""));
    }

    /// Takes a comment at the current position. An unterminated comment runs
    /// to the end of input.
    fn comment(&mut self) -> Option<&'a str> {
        let rest = self.rest();
        if !rest.starts_with("<!--") {
            return None;
        }

        let len = rest[4..].find("-->").map_or(rest.len(), |i| i + 7);
        self.skip(len);
        Some(&rest[..len])
    }

    /// Takes the body of raw text element `name`, whose start tag was just
    /// read, and its end tag. Without an end tag the body runs to the end of
    /// input.
    fn raw_text(&mut self, name: &str) -> &'a str {
        let rest = self.rest();
        let end = find_end_tag(rest, name).unwrap_or(rest.len());
        let close = rest[end..].find('>').map_or(rest.len(), |i| end + i + 1);
        self.skip(close);
        &rest[..end]
    }
}

/// Byte offset of the first `</name` in `html` that is followed by `>`, `/`,
/// whitespace, or the end of input.
fn find_end_tag(html: &str, name: &str) -> Option<usize> {
    let bytes = html.as_bytes();
    let mut from = 0;
    while let Some(i) = html[from..].find("</") {
        let start = from + i;
        let tag = start + 2;
        let named = bytes.get(tag..tag + name.len())
            .map_or(false, |n| n.eq_ignore_ascii_case(name.as_bytes()));

        let after = bytes.get(tag + name.len()).copied();
        if named && after.map_or(true, |b| b == b'>' || b == b'/' || b.is_ascii_whitespace()) {
            return Some(start);
        }

        from = tag;
    }

    None
}

#[inline]
fn utf8(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

fn element(start: &BytesStart<'_>) -> Result<Element> {
    let mut attrs = vec![];
    for attr in start.html_attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        attrs.push((utf8(attr.key.as_ref()).into_owned(), utf8(&attr.value).into_owned()));
    }

    Ok(Element {
        name: utf8(start.name().as_ref()).into_owned(),
        attrs,
        children: vec![],
    })
}

/// Builds the tree bottom-up from a flat event stream.
#[derive(Default)]
struct Builder {
    roots: Vec<Node>,
    open: Vec<Element>,
}

impl Builder {
    fn siblings(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.roots,
        }
    }

    fn push(&mut self, node: Node) {
        let siblings = self.siblings();
        match (siblings.last_mut(), node) {
            (Some(Node::Text(prev)), Node::Text(text)) => prev.push_str(&text),
            (_, node) => siblings.push(node),
        }
    }

    fn text(&mut self, raw: &[u8]) {
        if !raw.is_empty() {
            self.push(Node::Text(utf8(raw).into_owned()));
        }
    }

    fn raw(&mut self, prefix: &str, body: &[u8], suffix: &str) {
        self.push(Node::Raw(format!("{prefix}{}{suffix}", utf8(body))));
    }

    fn open(&mut self, element: Element) {
        if is_void(&element.name) {
            self.push(Node::Element(element));
        } else {
            self.open.push(element);
        }
    }

    fn close_one(&mut self) {
        if let Some(element) = self.open.pop() {
            self.push(Node::Element(element));
        }
    }

    /// Closes the innermost open element named `name` along with everything
    /// opened after it. An end tag with no matching open element is dropped.
    fn close(&mut self, name: &str) {
        let Some(i) = self.open.iter().rposition(|e| e.name.eq_ignore_ascii_case(name)) else {
            return;
        };

        while self.open.len() > i {
            self.close_one();
        }
    }

    fn finish(mut self) -> Fragment {
        while !self.open.is_empty() {
            self.close_one();
        }

        Fragment(self.roots)
    }
}

pub(crate) fn parse(html: &str) -> Result<Fragment> {
    let mut input = Input::new(html);
    let mut builder = Builder::default();
    loop {
        if let Some(comment) = input.comment() {
            builder.push(Node::Raw(comment.to_string()));
            continue;
        }

        let event = input.reader.read_event().chain_with(|| error! {
            "failed to parse HTML fragment",
            "byte offset" => input.offset + input.reader.error_position() as usize,
        })?;

        match event {
            Event::Start(e) => {
                let mut element = element(&e)?;
                if is_raw_text(&element.name) {
                    let body = input.raw_text(&element.name);
                    if !body.is_empty() {
                        element.children.push(Node::Raw(body.to_string()));
                    }

                    builder.push(Node::Element(element));
                } else {
                    builder.open(element);
                }
            }
            Event::Empty(e) => builder.push(Node::Element(element(&e)?)),
            Event::End(e) => builder.close(&utf8(e.name().as_ref())),
            Event::Text(e) => builder.text(&e),
            Event::GeneralRef(e) => builder.push(Node::Text(format!("&{};", utf8(&e)))),
            Event::CData(e) => builder.raw("<![CDATA[", &e, "]]>"),
            Event::DocType(e) => builder.raw("<!DOCTYPE ", &e, ">"),
            Event::PI(e) => builder.raw("<?", &e, "?>"),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(builder.finish())
}
