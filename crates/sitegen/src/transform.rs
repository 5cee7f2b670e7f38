use crate::config::{SitePaths, STYLESHEET_EXTENSION, TEMPLATE_EXTENSION};
use crate::error::{IoContext, Result, SitegenError};
use crate::layouts::LayoutCache;
use crate::render::{TemplateEngine, process_template_file};
use crate::site::Site;
use crate::types::{Transform, TransformSummary};
use futures_util::future::try_join_all;
use log::{debug, info};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Files whose name starts with this are partials and never emitted.
pub const PRIVATE_PREFIX: char = '_';

/// Renders, compiles or copies every eligible file under the input root.
pub async fn transform_files(
    site: &Site,
    layouts: &LayoutCache,
    engine: &TemplateEngine,
) -> Result<TransformSummary> {
    let sources = discover_sources(&site.config.paths)?;

    let actions = try_join_all(
        sources
            .iter()
            .map(|path| transform_file(site, layouts, engine, path)),
    )
    .await?;

    let summary = actions
        .into_iter()
        .fold(TransformSummary::default(), TransformSummary::record);

    info!(
        "Rendered {} templates, compiled {} stylesheets, copied {} files",
        summary.rendered, summary.compiled, summary.copied
    );

    Ok(summary)
}

pub fn classify(path: &Path) -> Transform {
    match path.extension().and_then(|extension| extension.to_str()) {
        Some(STYLESHEET_EXTENSION) => Transform::Compile,
        Some(TEMPLATE_EXTENSION) => Transform::Render,
        _ => Transform::Copy,
    }
}

/// Every file under the input root except the layouts and output trees and
/// files carrying the private prefix, in file name order.
pub fn discover_sources(paths: &SitePaths) -> Result<Vec<PathBuf>> {
    walk_input(paths, |name| !name.starts_with(PRIVATE_PREFIX))
}

/// Private templates, which pages and layouts reach by their path relative
/// to the input root.
pub fn discover_partials(paths: &SitePaths) -> Result<Vec<PathBuf>> {
    Ok(walk_input(paths, |name| name.starts_with(PRIVATE_PREFIX))?
        .into_iter()
        .filter(|path| classify(path) == Transform::Render)
        .collect())
}

// Symlinks are followed; walkdir reports loops as errors.
fn walk_input(paths: &SitePaths, keep: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    let excluded = ExcludedDirs::new(&[&paths.layouts_dir, &paths.outdir]);
    let mut files = Vec::new();

    for entry in WalkDir::new(&paths.indir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !excluded.contains(entry))
    {
        let entry = entry.map_err(|error| SitegenError::WalkDir {
            path: paths.indir.clone(),
            message: error.to_string(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        if keep(&entry.file_name().to_string_lossy()) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

struct ExcludedDirs {
    lexical: Vec<PathBuf>,
    canonical: Vec<PathBuf>,
}

impl ExcludedDirs {
    fn new(dirs: &[&PathBuf]) -> Self {
        Self {
            lexical: dirs.iter().map(|dir| dir.to_path_buf()).collect(),
            canonical: dirs
                .iter()
                .filter_map(|dir| dir.canonicalize().ok())
                .collect(),
        }
    }

    fn contains(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }

        let path = entry.path();
        if self.lexical.iter().any(|dir| dir == path) {
            return true;
        }

        !self.canonical.is_empty()
            && path
                .canonicalize()
                .is_ok_and(|resolved| self.canonical.contains(&resolved))
    }
}

async fn transform_file(
    site: &Site,
    layouts: &LayoutCache,
    engine: &TemplateEngine,
    path: &Path,
) -> Result<Transform> {
    let paths = &site.config.paths;
    let action = classify(path);

    match action {
        Transform::Render => {
            let output = process_template_file(site, layouts, engine, path).await?;
            debug!("Rendered {} -> {}", path.display(), output.display());
        }
        Transform::Compile => {
            let output = mirrored_output(path, paths)?.with_extension("css");
            compile_stylesheet(path, &output).await?;
            debug!("Compiled {} -> {}", path.display(), output.display());
        }
        Transform::Copy => {
            let output = mirrored_output(path, paths)?;
            copy_file(path, &output).await?;
            debug!("Copied {} -> {}", path.display(), output.display());
        }
    }

    Ok(action)
}

fn mirrored_output(path: &Path, paths: &SitePaths) -> Result<PathBuf> {
    let relative = path
        .strip_prefix(&paths.indir)
        .map_err(|_| SitegenError::InvalidPath {
            path: path.to_path_buf(),
        })?;
    Ok(paths.outdir.join(relative))
}

async fn compile_stylesheet(path: &Path, output: &Path) -> Result<()> {
    let source = tokio::fs::read_to_string(path)
        .await
        .io_context("reading stylesheet", path)?;
    let load_path = path.parent().unwrap_or_else(|| Path::new("."));

    let css = compile_scss(source, load_path).map_err(|message| SitegenError::Stylesheet {
        path: path.to_path_buf(),
        message,
    })?;

    write_output(output, css).await
}

fn compile_scss(source: String, load_path: &Path) -> std::result::Result<String, String> {
    grass::from_string(source, &grass::Options::default().load_path(load_path))
        .map_err(|error| error.to_string())
}

async fn copy_file(path: &Path, output: &Path) -> Result<()> {
    create_parent(output).await?;
    tokio::fs::copy(path, output)
        .await
        .io_context("copying", path)?;
    Ok(())
}

async fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .io_context("creating directory", parent)?;
    }
    Ok(())
}

/// Writes an output file, creating its parent directories first.
pub(crate) async fn write_output(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    create_parent(path).await?;
    tokio::fs::write(path, contents)
        .await
        .io_context("writing", path)
}
