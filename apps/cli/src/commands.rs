use log::info;
use sitegen::{BuildOptions, build, clean_output_dir};
use std::path::PathBuf;

pub struct BuildArgs {
    pub indir: PathBuf,
    pub outdir: Option<PathBuf>,
    pub layouts_dir: Option<PathBuf>,
    pub posts_dir: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub default_layout: Option<String>,
    pub site_href: Option<String>,
    pub clean: bool,
}

impl BuildArgs {
    fn options(self) -> BuildOptions {
        let mut options = BuildOptions::new(&self.indir);

        if let Some(dir) = self.outdir {
            options = options.outdir(dir);
        }
        if let Some(dir) = self.layouts_dir {
            options = options.layouts_dir(dir);
        }
        if let Some(dir) = self.posts_dir {
            options = options.posts_dir(dir);
        }
        if let Some(file) = self.config_file {
            options = options.config_file(file);
        }
        if let Some(name) = self.default_layout {
            options = options.default_layout(name);
        }
        if let Some(href) = self.site_href {
            options = options.site_href(href);
        }

        options
    }
}

pub async fn build_site(args: BuildArgs) -> Result<(), Box<dyn std::error::Error>> {
    let clean = args.clean;
    let options = args.options();

    if clean {
        clean_output_dir(&options).await?;
    }

    info!("Building site from {}", options.paths().indir.display());

    let summary = build(options).await?;

    info!(
        "Rendered {} templates, compiled {} stylesheets, copied {} files, {} posts in feed {}",
        summary.files.rendered,
        summary.files.compiled,
        summary.files.copied,
        summary.posts,
        summary.feed.display()
    );

    Ok(())
}
