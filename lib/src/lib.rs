#![doc = svgbobdoc::transform!(
//! Turn one markdown document into a small, navigable HTML site.
//!
//! # Overview
//!
//! Folio takes a single markdown document, typically a project's README, and
//! produces one HTML page per top-level section plus an index holding the
//! whole document. Every page is rendered through the same template, which
//! receives the list of all pages so it can draw a table of contents.
//!
//! ```svgbob
//!  +----------+     +----------+     +----------+     +-----------+
//!  | markdown |---->|   HTML   |---->| Splitter |---->|   Pages   |
//!  +----------+     +----+-----+     +----------+     +-----+-----+
//!                        |                                  |
//!                        |          +----------+            |
//!                        +--------->| Template |<-----------+
//!                        index.html +----+-----+  {slug}.html
//!                                        |
//!                                        v
//!                                  +-----------+
//!                                  |  output   |
//!                                  +-----------+
//! ```
//!
//! In words:
//!
//!   1. The document is rendered to HTML with [`markdown::Markdown`].
//!   2. The HTML is parsed into an immutable [`html::Fragment`] and cut at
//!      every top-level `<h1>` by a [`split::Splitter`]. Each cut is a
//!      [`split::Page`] with a title, a slug derived from the title, its HTML,
//!      and the `<h2>` sub-headings within it (which are given `id`s so that
//!      `{slug}/#{id}` anchors resolve).
//!   3. Each page, and the unsplit document as the index, is rendered through
//!      a [`templating::Engine`] with the full page list as navigation.
//!
//! Splitting is pure: it reads a string and returns pages or an
//! [`ErrorKind::InvalidStructure`](error::ErrorKind) error, never partial
//! output. Writing files is left to the caller.
)]

#[macro_use]
pub mod error;
pub mod util;
pub mod html;
pub mod markdown;
pub mod split;
pub mod templating;

pub use split::{split, Page, Pages, Splitter, SubHeading};
