use pulldown_cmark::{html, Options, Parser};

use crate::error::Result;
use crate::split::{Pages, Splitter};

/// A markdown document and the options it's rendered with.
#[derive(Debug, Clone)]
pub struct Markdown<'a> {
    input: &'a str,
    options: Options,
}

impl<'a> Markdown<'a> {
    /// Every extension except smart punctuation, which would rewrite quotes in
    /// code-adjacent prose.
    pub fn from(input: &'a str) -> Self {
        Self {
            input,
            options: Options::all().difference(Options::ENABLE_SMART_PUNCTUATION),
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn render(&self) -> String {
        let parser = Parser::new_ext(self.input, self.options);
        let mut html_output = String::with_capacity(self.input.len() * 3 / 2);
        html::push_html(&mut html_output, parser);
        html_output
    }

    /// Renders and splits in one step, returning the full HTML alongside the
    /// pages cut from it.
    pub fn render_pages(&self, splitter: &Splitter) -> Result<(String, Pages)> {
        let html = self.render();
        let pages = splitter.split(&html)?;
        Ok((html, pages))
    }
}
