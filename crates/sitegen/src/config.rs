use crate::error::{IoContext, Result, SitegenError};
use crate::parsing::json_kind;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const TEMPLATE_EXTENSION: &str = "tera";
pub const STYLESHEET_EXTENSION: &str = "scss";
pub const DEFAULT_LAYOUT: &str = "default";
pub const DEFAULT_OUTPUT_DIR: &str = "_build";
pub const LAYOUTS_DIR: &str = "_layouts";
pub const POSTS_DIR: &str = "posts";
pub const CONFIG_FILE: &str = "_config.json";

const PATH_KEYS: [&str; 5] = ["indir", "outdir", "layoutsDir", "postsDir", "configFile"];

/// Caller supplied options for one build. Unset paths default to
/// locations inside the input directory.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    indir: Option<PathBuf>,
    outdir: Option<PathBuf>,
    layouts_dir: Option<PathBuf>,
    posts_dir: Option<PathBuf>,
    config_file: Option<PathBuf>,
    default_layout: Option<String>,
    site_href: Option<String>,
}

impl BuildOptions {
    pub fn new(indir: impl AsRef<Path>) -> Self {
        Self {
            indir: Some(indir.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    pub fn outdir(mut self, dir: impl AsRef<Path>) -> Self {
        self.outdir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn layouts_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.layouts_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn posts_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.posts_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn config_file(mut self, file: impl AsRef<Path>) -> Self {
        self.config_file = Some(file.as_ref().to_path_buf());
        self
    }

    pub fn default_layout(mut self, name: impl Into<String>) -> Self {
        self.default_layout = Some(name.into());
        self
    }

    pub fn site_href(mut self, href: impl Into<String>) -> Self {
        self.site_href = Some(href.into());
        self
    }

    pub fn paths(&self) -> SitePaths {
        let indir = self.indir.clone().unwrap_or_else(|| PathBuf::from("."));
        SitePaths {
            outdir: self
                .outdir
                .clone()
                .unwrap_or_else(|| indir.join(DEFAULT_OUTPUT_DIR)),
            layouts_dir: self
                .layouts_dir
                .clone()
                .unwrap_or_else(|| indir.join(LAYOUTS_DIR)),
            posts_dir: self
                .posts_dir
                .clone()
                .unwrap_or_else(|| indir.join(POSTS_DIR)),
            config_file: self
                .config_file
                .clone()
                .unwrap_or_else(|| indir.join(CONFIG_FILE)),
            indir,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    pub indir: PathBuf,
    pub outdir: PathBuf,
    pub layouts_dir: PathBuf,
    pub posts_dir: PathBuf,
    pub config_file: PathBuf,
}

/// Site configuration resolved once per build and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub paths: SitePaths,
    pub title: Option<String>,
    pub site_href: Option<String>,
    pub default_layout: String,
    pub extra: Map<String, Value>,
}

impl Config {
    pub fn from_options(options: &BuildOptions) -> Self {
        Self {
            paths: options.paths(),
            title: None,
            site_href: options.site_href.clone(),
            default_layout: options
                .default_layout
                .clone()
                .unwrap_or_else(|| DEFAULT_LAYOUT.to_string()),
            extra: Map::new(),
        }
    }

    /// Template variables exposed by the configuration. Author defined keys
    /// come first so the typed fields take precedence.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.extra.clone();
        if let Some(title) = &self.title {
            map.insert("title".to_string(), Value::String(title.clone()));
        }
        if let Some(href) = &self.site_href {
            map.insert("siteHref".to_string(), Value::String(href.clone()));
        }
        map.insert(
            "defaultLayout".to_string(),
            Value::String(self.default_layout.clone()),
        );
        map
    }

    fn merge(&mut self, file: Map<String, Value>, path: &Path) -> Result<()> {
        for (key, value) in file {
            match key.as_str() {
                "title" => self.title = Some(expect_string(&key, value, path)?),
                "siteHref" => self.site_href = Some(expect_string(&key, value, path)?),
                "defaultLayout" => self.default_layout = expect_string(&key, value, path)?,
                path_key if PATH_KEYS.contains(&path_key) => {
                    warn!(
                        "Ignoring '{}' in {}: paths are only set by build options",
                        path_key,
                        path.display()
                    );
                }
                _ => {
                    self.extra.insert(key, value);
                }
            }
        }
        Ok(())
    }

    fn normalize(&mut self) {
        if let Some(href) = &mut self.site_href
            && href.ends_with('/')
        {
            href.pop();
        }
    }
}

fn expect_string(key: &str, value: Value, path: &Path) -> Result<String> {
    match value {
        Value::String(string) => Ok(string),
        other => Err(SitegenError::Parse {
            path: path.to_path_buf(),
            message: format!("'{}' must be a string, found {}", key, json_kind(&other)),
        }),
    }
}

/// Resolves the build configuration. A missing configuration file is not
/// an error; values from an existing file override the caller's options.
pub async fn load_config(options: &BuildOptions) -> Result<Config> {
    let mut config = Config::from_options(options);
    let config_path = config.paths.config_file.clone();

    let exists = tokio::fs::try_exists(&config_path)
        .await
        .io_context("checking config", &config_path)?;

    if exists {
        let content = tokio::fs::read_to_string(&config_path)
            .await
            .io_context("reading config", &config_path)?;
        let file = parse_config(&content, &config_path)?;
        config.merge(file, &config_path)?;
        debug!("Loaded configuration from {}", config_path.display());
    } else {
        debug!(
            "No configuration file at {}, using defaults",
            config_path.display()
        );
    }

    config.normalize();

    Ok(config)
}

fn parse_config(content: &str, path: &Path) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_str(content).map_err(|error| SitegenError::Parse {
        path: path.to_path_buf(),
        message: error.to_string(),
    })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(SitegenError::Parse {
            path: path.to_path_buf(),
            message: format!("configuration must be an object, found {}", json_kind(&other)),
        }),
    }
}
