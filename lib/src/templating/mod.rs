pub mod minijinja;

use std::fmt::Debug;
use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;

use crate::error::{Chainable, Result};
use crate::split::{Page, Pages};

/// What a template sees when rendering one output file.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub title: &'a str,
    /// Rendered HTML, inserted without escaping.
    pub content: &'a str,
    /// The page being rendered; `None` for the index.
    pub page: Option<&'a Page>,
    pub pages: &'a Pages,
}

impl<'a> PageContext<'a> {
    pub fn page(page: &'a Page, pages: &'a Pages) -> Self {
        PageContext { title: &page.title, content: &page.content, page: Some(page), pages }
    }

    pub fn index(title: &'a str, content: &'a str, pages: &'a Pages) -> Self {
        PageContext { title, content, page: None, pages }
    }
}

pub trait EngineInit {
    type Engine: Engine + 'static;

    /// Creates an engine loading templates from `root`, exposing `globals` to
    /// every template as `G`. Failures surface on the first render.
    fn init<G: Serialize>(root: Option<&Path>, globals: G) -> Self::Engine;
}

pub trait Engine: Send + Sync + Debug {
    /// Renders the template called `name` from the engine's template root.
    fn render(&self, name: &str, context: PageContext<'_>) -> Result<String>;

    /// Renders `template_str` directly. `name` is used in error messages.
    fn render_str(
        &self,
        name: Option<&str>,
        template_str: &str,
        context: PageContext<'_>,
    ) -> Result<String>;
}

/// A template to render with, either by name from the engine's root or from
/// source held in memory.
#[derive(Debug, Clone, Copy)]
pub enum Template<'a> {
    Named(&'a str),
    Source { name: &'a str, source: &'a str },
}

impl Template<'_> {
    pub fn name(&self) -> &str {
        match self {
            Template::Named(name) | Template::Source { name, .. } => name,
        }
    }

    pub fn render<E: Engine + ?Sized>(&self, engine: &E, context: PageContext<'_>) -> Result<String> {
        match *self {
            Template::Named(name) => engine.render(name, context),
            Template::Source { name, source } => engine.render_str(Some(name), source, context),
        }
    }
}

/// Renders every page through `template`, in parallel. The output is in page
/// order.
pub fn render_pages<E>(engine: &E, template: Template<'_>, pages: &Pages) -> Result<Vec<String>>
    where E: Engine + ?Sized
{
    pages.par_iter()
        .map(|page| {
            template.render(engine, PageContext::page(page, pages))
                .chain_with(|| error! {
                    "failed to render page",
                    "page" => page.title,
                    "template" => template.name(),
                })
        })
        .collect()
}
