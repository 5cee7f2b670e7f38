use crate::config::SitePaths;
use crate::document::{coerce_date, output_relative, read_template_file};
use crate::error::{IoContext, Result, SitegenError};
use crate::layouts::LayoutCache;
use crate::site::Site;
use crate::transform::{discover_partials, write_output};
use log::debug;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::error::Error as _;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};

pub const FEED_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S +0000";

/// Tera wrapper used for page bodies, layouts and the feed.
///
/// Autoescaping is off because layouts embed already rendered HTML bodies;
/// templates escape explicitly where they need to.
#[derive(Clone)]
pub struct TemplateEngine {
    tera: Tera,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.register_filter("feed_date", feed_date);
        Self { tera }
    }

    /// Registers every private template under the input root by its
    /// relative path, e.g. `nested/_nav.tera`, so bodies and layouts can
    /// `include`, `import` or `extends` it.
    pub async fn with_partials(mut self, paths: &SitePaths) -> Result<Self> {
        for path in discover_partials(paths)? {
            let source = tokio::fs::read_to_string(&path)
                .await
                .io_context("reading partial", &path)?;
            let name = partial_name(&path, &paths.indir)?;
            self.tera
                .add_raw_template(&name, &source)
                .map_err(|error| render_error(&path, None, &error))?;
            debug!("Registered partial {}", name);
        }
        Ok(self)
    }

    pub fn render(&self, name: &str, source: &str, context: &Context) -> tera::Result<String> {
        let mut tera = self.tera.clone();
        tera.add_raw_template(name, source)?;
        tera.render(name, context)
    }
}

fn partial_name(path: &Path, indir: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(indir)
        .map_err(|_| SitegenError::InvalidPath {
            path: path.to_path_buf(),
        })?;
    Ok(relative.to_string_lossy().replace('\\', "/"))
}

pub fn context_from(variables: Map<String, Value>) -> Context {
    let mut context = Context::new();
    for (key, value) in variables {
        context.insert(key, &value);
    }
    context
}

/// Renders a template source file into its layout and writes the page.
///
/// The body is rendered first with only the site variables in scope. The
/// layout then sees the site variables overlaid with the page's own fields
/// and the rendered body.
pub async fn process_template_file(
    site: &Site,
    layouts: &LayoutCache,
    engine: &TemplateEngine,
    path: &Path,
) -> Result<PathBuf> {
    let paths = &site.config.paths;
    let document = read_template_file(path, &paths.indir).await?;

    let site_context = context_from(site.variables().clone());
    let body = engine
        .render(
            &path.to_string_lossy(),
            document.front_matter.body(),
            &site_context,
        )
        .map_err(|error| render_error(path, None, &error))?;

    let layout_name = document.front_matter.get_string("layout");
    let layout_path = layouts.resolve(layout_name.as_deref());
    let layout = layouts.load(&layout_path).await?;

    let context = context_from(site.page_variables(&document, body));
    let html = engine
        .render(&layout_path.to_string_lossy(), &layout, &context)
        .map_err(|error| render_error(path, Some(&layout_path), &error))?;

    let output = paths.outdir.join(output_relative(path, &paths.indir)?);
    write_output(&output, html).await?;

    Ok(output)
}

pub(crate) fn render_error(path: &Path, layout: Option<&Path>, error: &tera::Error) -> SitegenError {
    SitegenError::Render {
        path: path.to_path_buf(),
        layout: layout.map(Path::to_path_buf),
        message: describe(error),
    }
}

// Tera reports the useful detail in the source chain, not the top-level message.
fn describe(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

pub fn format_feed_date(date: &DateTime<Utc>) -> String {
    date.format(FEED_DATE_FORMAT).to_string()
}

/// `feed_date` filter: RFC 822 style date, or `""` for null and empty values.
pub fn feed_date(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    if value.is_null() || value.as_str().is_some_and(str::is_empty) {
        return Ok(Value::String(String::new()));
    }

    coerce_date(value)
        .map(|date| Value::String(format_feed_date(&date)))
        .ok_or_else(|| tera::Error::msg(format!("feed_date cannot interpret {value} as a date")))
}
