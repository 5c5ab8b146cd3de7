use std::path::PathBuf;

use tokio::task::JoinSet;

use folio::error;
use folio::error::{Chainable, Error, Result};
use folio::markdown::Markdown;
use folio::templating::{render_pages, Engine, EngineInit, PageContext, Template};
use folio::{Pages, Splitter};

use crate::config::Config;

/// Used when the configured template doesn't exist.
const DEFAULT_TEMPLATE: &str = include_str!("../templates/default.html");
const DEFAULT_TEMPLATE_NAME: &str = "default.html";

#[derive(Debug)]
pub struct Docs<E> {
    pub config: Config,
    pub engine: E,
    pub splitter: Splitter,
    /// File name of the template within its directory; `None` for the
    /// built-in default.
    template: Option<String>,
}

/// A fully rendered site, not yet written.
#[derive(Debug)]
pub struct Rendered {
    pub pages: Pages,
    pub files: Vec<(PathBuf, String)>,
}

impl<E: Engine> Docs<E> {
    pub fn new<I>(config: Config) -> Self
        where I: EngineInit<Engine = E>
    {
        let template_path = config.template();
        let (dir, template) = match (template_path.is_file(), template_path.file_name()) {
            (true, Some(name)) => {
                (template_path.parent().map(|p| p.to_path_buf()), Some(name.to_string_lossy().into()))
            }
            _ => {
                tracing::warn!(path = %template_path.display(), "template not found; using built-in default");
                (None, None)
            }
        };

        let engine = I::init(dir.as_deref(), &config.settings);
        Docs { config, engine, splitter: Splitter::default(), template }
    }

    fn template(&self) -> Template<'_> {
        match &self.template {
            Some(name) => Template::Named(name),
            None => Template::Source { name: DEFAULT_TEMPLATE_NAME, source: DEFAULT_TEMPLATE },
        }
    }

    /// Renders `markdown` into every output file. Pure apart from the engine
    /// reading its template.
    pub fn render(&self, markdown: &str) -> Result<Rendered> {
        let (html, pages) = Markdown::from(markdown)
            .render_pages(&self.splitter)
            .chain(error!("failed to split document into pages"))?;

        let template = self.template();
        let rendered = render_pages(&self.engine, template, &pages)?;

        let title = self.config.settings.title.as_deref()
            .or_else(|| pages.first().map(|page| page.title.as_str()))
            .unwrap_or("Documentation");

        let index = template.render(&self.engine, PageContext::index(title, &html, &pages))
            .chain_with(|| error!("failed to render index", "template" => template.name()))?;

        let mut files = Vec::with_capacity(pages.len() + 1);
        files.push((self.config.index_path(), index));
        for (page, html) in pages.iter().zip(rendered) {
            files.push((self.config.page_path(&page.slug), html));
        }

        Ok(Rendered { pages, files })
    }

    /// Reads the source, renders it, writes every file concurrently, then runs
    /// the stylesheet command if one is configured.
    pub async fn build(&self) -> Result<Rendered> {
        let source = self.config.source();
        tracing::info!(path = %source.display(), "reading source");
        let markdown = tokio::fs::read_to_string(&source).await
            .chain_with(|| error!("failed to read source document", "path" => source.display()))?;

        let rendered = self.render(&markdown)?;
        tracing::info!(pages = rendered.pages.len(), "rendered pages");

        write_all(&rendered.files).await?;
        if let Some(stylesheet) = &self.config.settings.stylesheet {
            crate::stylesheet::regenerate(&stylesheet.command, &self.config.root).await?;
        }

        Ok(rendered)
    }
}

/// Writes each `(path, contents)` pair, creating parent directories. Writes
/// run concurrently; the first failure aborts the rest, leaving whatever was
/// already written on disk.
pub async fn write_all(files: &[(PathBuf, String)]) -> Result<()> {
    let mut writes = JoinSet::new();
    for (path, contents) in files.iter().cloned() {
        writes.spawn(async move {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await
                    .chain_with(|| error!("failed to create directory", "path" => parent.display()))?;
            }

            tracing::debug!(path = %path.display(), bytes = contents.len(), "writing");
            tokio::fs::write(&path, contents).await
                .chain_with(|| error!("failed to write output", "path" => path.display()))
        });
    }

    while let Some(result) = writes.join_next().await {
        result.map_err(Error::from_std)??;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use pretty_assertions::assert_eq;
    use folio::error::ErrorKind;
    use folio::templating::minijinja::MiniJinjaEngine;

    use super::*;
    use crate::CONFIG_FILE;

    const README: &str = "\
# Getting Started

Some intro.

## Install

## Use

# Reference

## Keys
";

    const TEMPLATE: &str = "\
<title>{{ title }}</title>
<nav>{% for p in pages %}<a href=\"{{ url(p.slug ~ '.html') }}\">{{ p.title }}</a>{% endfor %}</nav>
<main>{{ content }}</main>
";

    fn project(readme: &str, config: &str, template: Option<&str>) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs/templates")).unwrap();
        fs::write(dir.path().join("README.md"), readme).unwrap();
        fs::write(dir.path().join("docs").join(CONFIG_FILE), config).unwrap();
        if let Some(template) = template {
            fs::write(dir.path().join("docs/templates/docs.html"), template).unwrap();
        }

        dir
    }

    fn docs(dir: &Path) -> Docs<MiniJinjaEngine> {
        let config = Config::discover(dir.join("docs")).unwrap();
        Docs::new::<MiniJinjaEngine>(config)
    }

    fn read(dir: &Path, path: &str) -> String {
        fs::read_to_string(dir.join("docs/_site").join(path)).unwrap()
    }

    #[tokio::test]
    async fn writes_pages_and_index() {
        let dir = project(README, "", Some(TEMPLATE));
        let rendered = docs(dir.path()).build().await.unwrap();
        assert_eq!(rendered.pages.len(), 2);
        assert_eq!(rendered.files.len(), 3);

        let nav = r#"<nav><a href="/getting-started.html">Getting Started</a><a href="/reference.html">Reference</a></nav>"#;
        let start = read(dir.path(), "getting-started.html");
        assert!(start.contains("<title>Getting Started</title>"));
        assert!(start.contains(nav));
        assert!(start.contains(r#"<h2 id="install">Install</h2>"#));
        assert!(!start.contains("Keys"));

        let reference = read(dir.path(), "reference.html");
        assert!(reference.contains(nav));
        assert!(reference.contains(r#"<h2 id="keys">Keys</h2>"#));

        let index = read(dir.path(), "index.html");
        assert!(index.contains(nav));
        assert!(index.contains("<h1>Getting Started</h1>"));
        assert!(index.contains("<h1>Reference</h1>"));
    }

    #[tokio::test]
    async fn pretty_urls_and_title() {
        let dir = project(README, "pretty_urls = true\ntitle = \"Folio Docs\"", Some(TEMPLATE));
        docs(dir.path()).build().await.unwrap();

        assert!(read(dir.path(), "index.html").contains("<title>Folio Docs</title>"));
        assert!(read(dir.path(), "getting-started/index.html").contains("<h1>Getting Started</h1>"));
        assert!(read(dir.path(), "reference/index.html").contains("<h1>Reference</h1>"));
    }

    /// Every `href` in `html` that starts with `/` and names a fragment.
    fn anchors(html: &str) -> Vec<&str> {
        html.split("href=\"").skip(1)
            .filter_map(|rest| rest.split('"').next())
            .filter(|href| href.starts_with('/') && href.contains('#'))
            .collect()
    }

    fn assert_anchors_resolve(dir: &Path, html: &str, expected: &[&str]) {
        let anchors = anchors(html);
        assert_eq!(anchors, expected);
        for anchor in anchors {
            let (path, _) = anchor.split_once('#').unwrap();
            let path = path.trim_start_matches('/');
            let file = match path.ends_with('/') {
                true => format!("{path}index.html"),
                false => path.to_string(),
            };

            assert!(dir.join("docs/_site").join(file).is_file(), "{anchor} does not resolve");
        }
    }

    #[tokio::test]
    async fn default_template() {
        let dir = project(README, "title = \"Fallback\"", None);
        docs(dir.path()).build().await.unwrap();

        let start = read(dir.path(), "getting-started.html");
        assert!(start.starts_with("<!DOCTYPE html>"));
        assert!(start.contains(r#"aria-current="page""#));
        assert_anchors_resolve(dir.path(), &start, &[
            "/getting-started.html#install",
            "/getting-started.html#use",
        ]);
    }

    #[tokio::test]
    async fn default_template_pretty_urls() {
        let dir = project(README, "pretty_urls = true", None);
        docs(dir.path()).build().await.unwrap();

        let reference = read(dir.path(), "reference/index.html");
        assert!(reference.contains(r#"href="/getting-started/""#));
        assert_anchors_resolve(dir.path(), &reference, &["/reference/#keys"]);
    }

    #[tokio::test]
    async fn stylesheet_runs_after_pages() {
        let config = r#"
            [stylesheet]
            command = ["sh", "-c", "ls _site > _site/listing.txt"]
        "#;

        let dir = project(README, config, Some(TEMPLATE));
        docs(dir.path()).build().await.unwrap();

        let listing = read(dir.path(), "listing.txt");
        assert!(listing.contains("getting-started.html"));
        assert!(listing.contains("index.html"));
    }

    #[tokio::test]
    async fn invalid_structure_writes_nothing() {
        let dir = project("# Fine\n\n#  \n", "", Some(TEMPLATE));
        let error = docs(dir.path()).build().await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidStructure);
        assert!(!dir.path().join("docs/_site").exists());
    }

    #[tokio::test]
    async fn missing_source_is_io() {
        let dir = project(README, "source = \"nope.md\"", Some(TEMPLATE));
        let error = docs(dir.path()).build().await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Io);
    }

    #[tokio::test]
    async fn template_errors_are_render() {
        let dir = project(README, "", Some("{{ content | nosuchfilter }}"));
        let error = docs(dir.path()).build().await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Render);
    }

    #[test]
    fn rendering_is_deterministic() {
        let dir = project(README, "", Some(TEMPLATE));
        let docs = docs(dir.path());
        let first = docs.render(README).unwrap();
        let second = docs.render(README).unwrap();
        assert_eq!(first.pages, second.pages);
        assert_eq!(first.files, second.files);
    }
}
