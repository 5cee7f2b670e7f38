use crate::config::{BuildOptions, Config, load_config};
use crate::error::{IoContext, Result, SitegenError};
use crate::feeds::generate_feed;
use crate::graph::{Inputs, TaskGraph};
use crate::layouts::LayoutCache;
use crate::posts::collect_posts;
use crate::render::TemplateEngine;
use crate::site::Site;
use crate::transform::transform_files;
use crate::types::{BuildSummary, Post, TransformSummary};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Value produced by one build task.
#[derive(Debug, Clone)]
enum Artifact {
    OutputDir,
    Config(Arc<Config>),
    Posts(Arc<Vec<Post>>),
    Files(TransformSummary),
    Feed(PathBuf),
}

fn config_from(inputs: &Inputs<Artifact>, task: &'static str) -> Result<Arc<Config>> {
    match inputs.get("config") {
        Some(Artifact::Config(config)) => Ok(Arc::clone(config)),
        _ => Err(SitegenError::MissingArtifact {
            task,
            artifact: "config",
        }),
    }
}

fn site_from(inputs: &Inputs<Artifact>, task: &'static str) -> Result<Site> {
    let config = config_from(inputs, task)?;
    match inputs.get("posts") {
        Some(Artifact::Posts(posts)) => Ok(Site::new(config, Arc::clone(posts))),
        _ => Err(SitegenError::MissingArtifact {
            task,
            artifact: "posts",
        }),
    }
}

/// Builds the whole site.
///
/// `outdir` and `config` start immediately, `posts` waits for the
/// configuration, and `files` and `feed` run side by side once posts and
/// the output directory are ready. The first failing task aborts the build.
pub async fn build(options: BuildOptions) -> Result<BuildSummary> {
    let started = Instant::now();
    let paths = options.paths();
    let engine = TemplateEngine::new();
    let options = Arc::new(options);

    let mut graph: TaskGraph<Artifact> = TaskGraph::new();

    {
        let outdir = paths.outdir.clone();
        graph.add("outdir", &[], move |_| async move {
            tokio::fs::create_dir_all(&outdir)
                .await
                .io_context("creating output directory", &outdir)?;
            Ok(Artifact::OutputDir)
        });
    }

    {
        let options = Arc::clone(&options);
        graph.add("config", &[], move |_| async move {
            let config = load_config(&options).await?;
            Ok(Artifact::Config(Arc::new(config)))
        });
    }

    graph.add("posts", &["config"], |inputs| async move {
        let config = config_from(&inputs, "posts")?;
        let posts = collect_posts(&config).await?;
        Ok(Artifact::Posts(Arc::new(posts)))
    });

    {
        let engine = engine.clone();
        graph.add("files", &["posts", "config", "outdir"], move |inputs| async move {
            let site = site_from(&inputs, "files")?;
            let engine = engine.with_partials(&site.config.paths).await?;
            let layouts = LayoutCache::new(&site.config.paths.layouts_dir, &site.config.default_layout);
            let summary = transform_files(&site, &layouts, &engine).await?;
            Ok(Artifact::Files(summary))
        });
    }

    graph.add("feed", &["posts", "config", "outdir"], move |inputs| async move {
        let site = site_from(&inputs, "feed")?;
        let feed = generate_feed(&site, &engine).await?;
        Ok(Artifact::Feed(feed))
    });

    let mut outputs = graph.run().await?;

    let posts = match outputs.remove("posts") {
        Some(Artifact::Posts(posts)) => posts.len(),
        _ => return Err(missing("posts")),
    };
    let files = match outputs.remove("files") {
        Some(Artifact::Files(summary)) => summary,
        _ => return Err(missing("files")),
    };
    let feed = match outputs.remove("feed") {
        Some(Artifact::Feed(path)) => path,
        _ => return Err(missing("feed")),
    };

    info!(
        "Built {} posts and {} files into {} in {:.2?}",
        posts,
        files.total(),
        paths.outdir.display(),
        started.elapsed()
    );

    Ok(BuildSummary { posts, files, feed })
}

fn missing(artifact: &'static str) -> SitegenError {
    SitegenError::MissingArtifact {
        task: "build",
        artifact,
    }
}

/// Removes a previous build's output directory.
///
/// Refuses to remove a directory that contains the input root.
pub async fn clean_output_dir(options: &BuildOptions) -> Result<()> {
    let paths = options.paths();
    if contains(&paths.outdir, &paths.indir) {
        return Err(SitegenError::InvalidPath { path: paths.outdir });
    }

    let exists = tokio::fs::try_exists(&paths.outdir)
        .await
        .io_context("checking output directory", &paths.outdir)?;
    if exists {
        tokio::fs::remove_dir_all(&paths.outdir)
            .await
            .io_context("removing output directory", &paths.outdir)?;
        info!("Removed {}", paths.outdir.display());
    }

    Ok(())
}

fn contains(dir: &Path, path: &Path) -> bool {
    match (dir.canonicalize(), path.canonicalize()) {
        (Ok(dir), Ok(path)) => path.starts_with(dir),
        _ => path.starts_with(dir),
    }
}
