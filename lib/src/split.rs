//! Splitting a rendered document into pages.
//!
//! A document is cut at every top-level page heading (`<h1>` by default).
//! Each cut becomes a [`Page`] whose title and slug come from that heading and
//! whose section headings (`<h2>` by default) are given `id`s and collected as
//! [`SubHeading`]s. Content before the first page heading is dropped.

use std::fmt;

use derive_more::Deref;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::error::{Chainable, Result};
use crate::html::{Fragment, Node};
use crate::util::slugify;

const HEADINGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Slugs that would collide with files the build writes itself.
const RESERVED_SLUGS: &[&str] = &["index"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub title: String,
    pub slug: String,
    /// The page's HTML, starting with its own heading.
    pub content: String,
    pub submenus: Vec<SubHeading>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubHeading {
    pub title: String,
    /// `{page slug}/#{heading id}`.
    pub anchor: String,
}

/// Every page of a document in document order. This is the navigation list
/// handed to each page's template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deref)]
#[serde(transparent)]
pub struct Pages(Vec<Page>);

impl Pages {
    pub fn get(&self, slug: &str) -> Option<&Page> {
        self.0.iter().find(|page| page.slug == slug)
    }
}

impl<'a> IntoIterator for &'a Pages {
    type Item = &'a Page;
    type IntoIter = std::slice::Iter<'a, Page>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Splitter {
    page: &'static str,
    section: &'static str,
}

impl Default for Splitter {
    fn default() -> Self {
        Splitter { page: HEADINGS[0], section: HEADINGS[1] }
    }
}

impl Splitter {
    /// A splitter that starts pages at `<h{page}>` and collects
    /// `<h{section}>` as sub-headings. Requires `1 <= page < section <= 6`.
    pub fn with_levels(page: usize, section: usize) -> Result<Splitter> {
        if page == 0 || page >= section || section > HEADINGS.len() {
            return err! {
                "invalid heading levels for splitting",
                "page level" => page,
                "section level" => section,
                "must satisfy" => "1 <= page < section <= 6",
            };
        }

        Ok(Splitter { page: HEADINGS[page - 1], section: HEADINGS[section - 1] })
    }

    pub fn split(&self, html: &str) -> Result<Pages> {
        let fragment = Fragment::parse(html).chain(error!("failed to parse rendered document"))?;

        let mut partitions: Vec<Vec<Node>> = vec![];
        for node in fragment.into_nodes() {
            if node.is_element(self.page) {
                partitions.push(vec![node]);
            } else if let Some(partition) = partitions.last_mut() {
                partition.push(node);
            }
        }

        let mut slugs: FxHashMap<String, String> = FxHashMap::default();
        let mut pages = Vec::with_capacity(partitions.len());
        for (i, partition) in partitions.into_iter().enumerate() {
            let page = self.page(Fragment::from(partition))
                .chain_with(|| error!("failed to build page", "page number" => i + 1))?;

            if RESERVED_SLUGS.contains(&page.slug.as_str()) {
                return Err(invalid! {
                    "page slug is reserved",
                    "page title" => page.title,
                    "slug" => page.slug,
                });
            }

            if let Some(existing) = slugs.get(&page.slug) {
                return Err(invalid! {
                    "two pages have the same slug",
                    "first title" => existing,
                    "second title" => page.title,
                    "slug" => page.slug,
                });
            }

            slugs.insert(page.slug.clone(), page.title.clone());
            pages.push(page);
        }

        Ok(Pages(pages))
    }

    /// Builds a page from a fragment whose first node is a page heading.
    fn page(&self, fragment: Fragment) -> Result<Page> {
        let (title, slug) = match fragment.first() {
            Some(heading) => title_and_slug(heading, heading.text())?,
            None => return Err(invalid!("page has no heading")),
        };

        let mut ids = Ids::default();
        let mut submenus = vec![];
        let fragment = fragment.try_map(|element| {
            if !element.is(self.section) {
                return Ok(element);
            }

            let (title, base) = title_and_slug(&element, element.text())?;
            let id = ids.claim(base);
            submenus.push(SubHeading { anchor: format!("{slug}/#{id}"), title });
            Ok(element.with_attr("id", &id))
        })?;

        Ok(Page { title, slug, content: fragment.to_html(), submenus })
    }
}

/// Splits `html` with the default `<h1>`/`<h2>` rule.
pub fn split(html: &str) -> Result<Pages> {
    Splitter::default().split(html)
}

fn title_and_slug<H: fmt::Display>(heading: H, text: String) -> Result<(String, String)> {
    let title = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        return Err(invalid!("heading has no text", "heading" => heading));
    }

    let slug = slugify(&title);
    if slug.is_empty() {
        return Err(invalid! {
            "heading text produces an empty slug",
            "heading" => heading,
            "title" => title,
        });
    }

    Ok((title, slug))
}

/// Heading ids already used within one page.
#[derive(Default)]
struct Ids(FxHashSet<String>);

impl Ids {
    /// Returns `base`, or `base-N` for the smallest `N` not yet taken.
    fn claim(&mut self, base: String) -> String {
        let mut id = base.clone();
        let mut n = 0;
        while self.0.contains(&id) {
            n += 1;
            id = format!("{base}-{n}");
        }

        self.0.insert(id.clone());
        id
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn getting_started() {
        let pages = split("<h1>Getting Started</h1><p>intro</p><h2>Install</h2>").unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0], Page {
            title: "Getting Started".into(),
            slug: "getting-started".into(),
            content: r#"<h1>Getting Started</h1><p>intro</p><h2 id="install">Install</h2>"#.into(),
            submenus: vec![SubHeading {
                title: "Install".into(),
                anchor: "getting-started/#install".into(),
            }],
        });
    }

    #[test]
    fn pages_in_document_order() {
        let html = "<p>badge</p>\n<h1>One</h1>\n<p>1</p>\n<h1>Two</h1>\n<h2>A</h2>\n\
            <h1>Three <code>3</code></h1>\n";

        let pages = split(html).unwrap();
        let titles: Vec<_> = pages.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["One", "Two", "Three 3"]);

        let slugs: Vec<_> = pages.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, ["one", "two", "three-3"]);

        assert_eq!(pages[0].content, "<h1>One</h1>\n<p>1</p>\n");
        assert!(!pages.iter().any(|p| p.content.contains("badge")));
        assert_eq!(pages.get("two").unwrap().submenus.len(), 1);
    }

    #[test]
    fn splitting_is_idempotent() {
        let html = "<h1>A</h1><h2>x</h2><h2>x</h2><h1>B</h1><ul><li><h2>y</h2></li></ul>";
        assert_eq!(split(html).unwrap(), split(html).unwrap());
    }

    #[test]
    fn anchors_resolve() {
        let html = "<h1>Guide</h1><h2>Setup</h2><div><h2>Use it!</h2></div>\
            <h1>API Reference</h1><h2>Types</h2><h2>Types</h2>";

        let pages = split(html).unwrap();
        for page in &pages {
            for sub in &page.submenus {
                let (slug, id) = sub.anchor.split_once("/#").unwrap();
                assert_eq!(pages.get(slug).unwrap(), page);
                assert!(!id.is_empty());
                assert!(id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
                assert!(page.content.contains(&format!(r#"id="{id}""#)));
            }
        }

        let anchors: Vec<_> = pages[1].submenus.iter().map(|s| s.anchor.as_str()).collect();
        assert_eq!(anchors, ["api-reference/#types", "api-reference/#types-1"]);
    }

    #[test]
    fn multiline_headings() {
        let pages = split("<h1>Getting\tStarted</h1><h2>Quick\nInstall</h2>").unwrap();
        assert_eq!(pages[0].title, "Getting Started");
        assert_eq!(pages[0].slug, "getting-started");
        assert_eq!(pages[0].submenus[0], SubHeading {
            title: "Quick Install".into(),
            anchor: "getting-started/#quick-install".into(),
        });

        let html = crate::markdown::Markdown::from("Getting\nStarted\n===\n").render();
        let pages = split(&html).unwrap();
        assert_eq!(pages[0].title, "Getting Started");
        assert_eq!(pages[0].slug, "getting-started");
    }

    #[test]
    fn existing_ids_are_replaced() {
        let pages = split(r#"<h1 id="top">T</h1><h2 id="custom" class="c">Sub Heading</h2>"#).unwrap();
        assert_eq!(pages[0].content, r#"<h1 id="top">T</h1><h2 id="sub-heading" class="c">Sub Heading</h2>"#);
    }

    #[test]
    fn no_pages() {
        assert!(split("").unwrap().is_empty());
        assert!(split("<p>just text</p><h2>sub</h2>").unwrap().is_empty());
    }

    #[test]
    fn nested_page_headings_are_content() {
        let pages = split("<h1>Top</h1><blockquote><h1>Quoted</h1></blockquote>").unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].content.contains("Quoted"));
    }

    #[test]
    fn empty_title_is_invalid() {
        let error = split("<h1>  </h1><p>x</p>").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidStructure);

        let error = split("<h1>Fine</h1><h1><em> </em></h1>").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidStructure);

        let error = split("<h1>!!!</h1>").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidStructure);

        let error = split("<h1>Ok</h1><h2>\n</h2>").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidStructure);
    }

    #[test]
    fn slug_collisions_are_invalid() {
        let error = split("<h1>Hello, World</h1><h1>hello world!</h1>").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidStructure);
        assert!(error.to_string().contains("same slug"));

        let error = split("<h1>Index</h1>").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidStructure);
    }

    #[test]
    fn custom_levels() {
        let splitter = Splitter::with_levels(2, 3).unwrap();
        let pages = splitter.split("<h1>Title</h1><h2>Part</h2><h3>Bit</h3><h2>Other</h2>").unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].submenus[0].anchor, "part/#bit");

        assert!(Splitter::with_levels(2, 2).is_err());
        assert!(Splitter::with_levels(0, 1).is_err());
        assert!(Splitter::with_levels(1, 7).is_err());
    }

    #[test]
    fn ids_are_claimed_once() {
        let mut ids = Ids::default();
        assert_eq!(ids.claim("a".into()), "a");
        assert_eq!(ids.claim("a".into()), "a-1");
        assert_eq!(ids.claim("a-1".into()), "a-1-1");
        assert_eq!(ids.claim("a".into()), "a-2");
    }

    static_assertions::assert_impl_all!(Page: Send, Sync, Clone);
    static_assertions::assert_impl_all!(Splitter: Send, Sync, Copy);
}
