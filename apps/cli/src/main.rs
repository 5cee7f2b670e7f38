mod commands;

use clap::Parser;
use commands::BuildArgs;
use env_logger::Env;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sitegen")]
#[command(about = "Builds a static site from templates, layouts and posts", long_about = None)]
struct Cli {
    /// Input root
    #[arg(long, default_value = ".")]
    indir: PathBuf,

    /// Output directory [default: <indir>/_build]
    #[arg(long)]
    outdir: Option<PathBuf>,

    /// Layout templates [default: <indir>/_layouts]
    #[arg(long)]
    layouts_dir: Option<PathBuf>,

    /// Post sources [default: <indir>/posts]
    #[arg(long)]
    posts_dir: Option<PathBuf>,

    /// Site configuration [default: <indir>/_config.json]
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Layout used by pages that do not name one
    #[arg(long)]
    default_layout: Option<String>,

    /// Absolute site URL used for feed links
    #[arg(long)]
    site_href: Option<String>,

    /// Remove the output directory before building
    #[arg(long)]
    clean: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let cli = Cli::parse();

    let result = commands::build_site(BuildArgs {
        indir: cli.indir,
        outdir: cli.outdir,
        layouts_dir: cli.layouts_dir,
        posts_dir: cli.posts_dir,
        config_file: cli.config_file,
        default_layout: cli.default_layout,
        site_href: cli.site_href,
        clean: cli.clean,
    })
    .await;

    if let Err(error) = result {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
