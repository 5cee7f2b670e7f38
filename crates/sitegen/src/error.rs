use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SitegenError {
    #[error("IO error {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Render error in {path}{}: {message}", layout_suffix(.layout))]
    Render {
        path: PathBuf,
        layout: Option<PathBuf>,
        message: String,
    },

    #[error("Stylesheet error in {path}: {message}")]
    Stylesheet { path: PathBuf, message: String },

    #[error("Directory walk error in {path}: {message}")]
    WalkDir { path: PathBuf, message: String },

    #[error("Invalid path: {path}")]
    InvalidPath { path: PathBuf },

    #[error("Task '{task}' is declared more than once")]
    DuplicateTask { task: String },

    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("Dependency cycle between tasks: {}", .tasks.join(", "))]
    DependencyCycle { tasks: Vec<String> },

    #[error("Task '{task}' panicked: {message}")]
    TaskPanicked { task: String, message: String },

    #[error("Task '{task}' did not receive the '{artifact}' output")]
    MissingArtifact {
        task: &'static str,
        artifact: &'static str,
    },
}

fn layout_suffix(layout: &Option<PathBuf>) -> String {
    layout
        .as_ref()
        .map(|layout| format!(" (layout {})", layout.display()))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, SitegenError>;

/// Attaches the action and offending path to a raw IO error.
pub trait IoContext<T> {
    fn io_context(self, action: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context(self, action: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| SitegenError::Io {
            action,
            path: path.to_path_buf(),
            source,
        })
    }
}
