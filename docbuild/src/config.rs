use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use folio::{err, error};
use folio::error::{Chainable, Result};

use crate::CONFIG_FILE;

#[derive(Debug)]
pub struct Config {
    /// Directory holding `docbuild.toml`; relative settings resolve against it.
    pub root: PathBuf,
    pub settings: Settings,
}

/// The contents of `docbuild.toml`. The whole table, unknown keys included,
/// is visible to templates as `G`.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub source: PathBuf,
    pub template: PathBuf,
    pub output: PathBuf,
    /// URL prefix for links produced by the `url()` template function.
    pub root: String,
    /// Write `{slug}/index.html` instead of `{slug}.html`.
    pub pretty_urls: bool,
    pub title: Option<String>,
    pub stylesheet: Option<Stylesheet>,
    #[serde(flatten)]
    pub globals: FxHashMap<String, toml::Value>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Stylesheet {
    /// Program and arguments, run from the project root.
    pub command: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            source: "../README.md".into(),
            template: "templates/docs.html".into(),
            output: "_site".into(),
            root: "/".into(),
            pretty_urls: false,
            title: None,
            stylesheet: None,
            globals: FxHashMap::default(),
        }
    }
}

impl Config {
    pub fn discover<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return err! {
                "project root must be an existing directory",
                "path" => root.display(),
            };
        }

        let path = root.join(CONFIG_FILE);
        let settings = match path.is_file() {
            true => {
                let contents = std::fs::read_to_string(&path)
                    .chain_with(|| error!("failed to read config", "path" => path.display()))?;

                Settings::parse(&contents)
                    .chain_with(|| error!("invalid config", "path" => path.display()))?
            }
            false => {
                tracing::debug!(path = %path.display(), "no config file; using defaults");
                Settings::default()
            }
        };

        Ok(Config { root, settings })
    }

    pub fn source(&self) -> PathBuf {
        self.root.join(&self.settings.source)
    }

    pub fn template(&self) -> PathBuf {
        self.root.join(&self.settings.template)
    }

    pub fn output(&self) -> PathBuf {
        self.root.join(&self.settings.output)
    }

    /// Where the page with slug `slug` is written.
    pub fn page_path(&self, slug: &str) -> PathBuf {
        match self.settings.pretty_urls {
            true => self.output().join(slug).join("index.html"),
            false => self.output().join(format!("{slug}.html")),
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.output().join("index.html")
    }
}

impl Settings {
    pub fn parse(contents: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(contents)?;
        if let Some(stylesheet) = &settings.stylesheet {
            if stylesheet.command.first().map_or(true, |program| program.trim().is_empty()) {
                return err!("`stylesheet.command` must name a program");
            }
        }

        Ok(settings)
    }
}
