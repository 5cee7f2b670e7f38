use crate::error::Result;
use crate::render::{TemplateEngine, context_from, render_error};
use crate::site::Site;
use crate::transform::write_output;
use log::info;
use std::path::{Path, PathBuf};

pub const FEED_FILE: &str = "rss.xml";

const FEED_TEMPLATE: &str = include_str!("../templates/rss.xml");
const FEED_TEMPLATE_NAME: &str = "templates/rss.xml";

/// Renders the bundled RSS template against the site and writes
/// `<outdir>/rss.xml`.
pub async fn generate_feed(site: &Site, engine: &TemplateEngine) -> Result<PathBuf> {
    let context = context_from(site.variables().clone());
    let rss = engine
        .render(FEED_TEMPLATE_NAME, FEED_TEMPLATE, &context)
        .map_err(|error| render_error(Path::new(FEED_TEMPLATE_NAME), None, &error))?;

    let output = site.config.paths.outdir.join(FEED_FILE);
    write_output(&output, rss).await?;

    info!("Wrote feed with {} posts to {}", site.posts.len(), output.display());

    Ok(output)
}
