use std::path::Path;

use minijinja::{context, path_loader, Environment};
use minijinja::value::Value;
use serde::Serialize;

use crate::error::Result;
use crate::templating::{Engine, EngineInit, PageContext};

#[derive(Debug)]
pub struct MiniJinjaEngine {
    env: Result<Environment<'static>>,
}

fn try_init<G: Serialize>(root: Option<&Path>, globals: G) -> Result<Environment<'static>> {
    let mut env = Environment::new();
    if let Some(root) = root {
        if !root.is_dir() {
            return err! {
                "template directory does not exist",
                "path" => root.display(),
            };
        }

        env.set_loader(path_loader(root));
    }

    env.add_global("G", Value::from_serializable(&globals));
    env.add_function("url", ext::url);
    env.add_function("now", ext::now);
    env.add_filter("deslug", ext::deslug);
    env.add_filter("date", ext::date);
    env.add_filter("split", ext::split);
    Ok(env)
}

impl EngineInit for MiniJinjaEngine {
    type Engine = Self;

    fn init<G: Serialize>(root: Option<&Path>, globals: G) -> Self::Engine {
        MiniJinjaEngine { env: try_init(root, globals) }
    }
}

fn to_value(context: PageContext<'_>) -> Value {
    context! {
        title => context.title,
        content => Value::from_safe_string(context.content.to_string()),
        page => Value::from_serializable(&context.page),
        pages => Value::from_serializable(context.pages),
    }
}

impl Engine for MiniJinjaEngine {
    fn render(&self, name: &str, context: PageContext<'_>) -> Result<String> {
        let env = self.env.as_ref().map_err(|e| e.clone())?;
        let template = env.get_template(name)?;
        Ok(template.render(to_value(context))?)
    }

    fn render_str(
        &self,
        name: Option<&str>,
        template_str: &str,
        context: PageContext<'_>,
    ) -> Result<String> {
        let env = self.env.as_ref().map_err(|e| e.clone())?;
        let context = to_value(context);
        let string = match name {
            Some(name) => env.render_named_str(name, template_str, context)?,
            None => env.render_str(template_str, context)?,
        };

        Ok(string)
    }
}

mod ext {
    use std::sync::Arc;

    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
    use minijinja::{value::{Rest, Value}, Error, ErrorKind, State};

    /// `url("guide.html", "#install")`: joins `G.root` (default `/`) with each
    /// argument.
    pub fn url<'a>(state: &'a State<'a, 'a>, segments: Rest<Arc<str>>) -> Result<Value, Error> {
        let root = state.lookup("G")
            .and_then(|globals| globals.get_attr("root").ok())
            .filter(|root| !root.is_undefined() && !root.is_none());

        let root = match root {
            Some(root) => root.as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| Error::new(ErrorKind::InvalidOperation, "G.root must be a string"))?,
            None => "/".to_string(),
        };

        let url = crate::util::join_url(&root, segments.iter());
        Ok(Value::from_safe_string(url))
    }

    pub fn deslug(value: &str) -> String {
        value.replace('-', " ")
    }

    pub fn date(value: Value, fmt: &str) -> Result<Value, Error> {
        if let Ok(ts) = i64::try_from(value.clone()) {
            let datetime = DateTime::<Utc>::from_timestamp(ts, 0)
                .ok_or_else(|| Error::new(
                    ErrorKind::InvalidOperation,
                    "invalid timestamp provided to `date`"
                ))?;

            return Ok(datetime.format(fmt).to_string().into());
        }

        let kind = value.kind();
        let attr = value.get_attr("$__toml_private_datetime");
        let string = attr.as_ref()
            .ok()
            .filter(|v| !v.is_undefined())
            .map_or_else(|| value.as_str(), |v| v.as_str())
            .ok_or_else(|| Error::new(
                ErrorKind::InvalidOperation,
                format!("`date` must be applied to a string or integer, found {kind}")
            ))?;

        let datetime = string.parse::<NaiveDate>().map(|d| d.format(fmt))
            .or_else(|_| string.parse::<NaiveTime>().map(|t| t.format(fmt)))
            .or_else(|_| string.parse::<NaiveDateTime>().map(|dt| dt.format(fmt)))
            .or_else(|_| string.parse::<DateTime<Utc>>().map(|dt| dt.format(fmt)))
            .map_err(|e| Error::new(
                ErrorKind::InvalidOperation,
                format!("failed to parse {string}: {e}")
            ))?;

        Ok(datetime.to_string().into())
    }

    pub fn split(value: &str, pat: &str, n: Option<usize>) -> Result<Value, Error> {
        match n {
            Some(n) => Ok(value.split(pat).nth(n).map(Value::from).unwrap_or(Value::UNDEFINED)),
            None => Ok(value.split(pat).map(Value::from).collect()),
        }
    }

    pub fn now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs())
    }
}

impl_error_detail_with_std_error!(minijinja::Error => Render);
