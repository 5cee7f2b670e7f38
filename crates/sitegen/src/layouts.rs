use crate::config::TEMPLATE_EXTENSION;
use crate::error::{IoContext, Result};
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Layout templates memoized by resolved path for the lifetime of one build.
///
/// The lock is only held for map lookups and inserts, never across a read,
/// so two concurrent first loads of the same layout both read the file and
/// the later insert wins.
#[derive(Debug)]
pub struct LayoutCache {
    layouts_dir: PathBuf,
    default_layout: String,
    layouts: Mutex<HashMap<PathBuf, Arc<str>>>,
    reads: AtomicUsize,
}

impl LayoutCache {
    pub fn new(layouts_dir: impl AsRef<Path>, default_layout: impl Into<String>) -> Self {
        Self {
            layouts_dir: layouts_dir.as_ref().to_path_buf(),
            default_layout: default_layout.into(),
            layouts: Mutex::new(HashMap::new()),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn resolve(&self, name: Option<&str>) -> PathBuf {
        let name = name.unwrap_or(&self.default_layout);
        let file = if Path::new(name)
            .extension()
            .is_some_and(|extension| extension == TEMPLATE_EXTENSION)
        {
            name.to_string()
        } else {
            format!("{name}.{TEMPLATE_EXTENSION}")
        };
        self.layouts_dir.join(file)
    }

    pub async fn load(&self, path: &Path) -> Result<Arc<str>> {
        if let Some(layout) = self.cached(path) {
            return Ok(layout);
        }

        self.reads.fetch_add(1, Ordering::Relaxed);
        let content = tokio::fs::read_to_string(path)
            .await
            .io_context("reading layout", path)?;
        debug!("Loaded layout {}", path.display());

        let layout: Arc<str> = Arc::from(content);
        self.layouts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), Arc::clone(&layout));

        Ok(layout)
    }

    /// Number of reads issued against storage so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    fn cached(&self, path: &Path) -> Option<Arc<str>> {
        self.layouts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }
}
