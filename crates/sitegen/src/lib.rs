pub mod build;
pub mod config;
pub mod document;
pub mod error;
pub mod feeds;
pub mod graph;
pub mod layouts;
pub mod parsing;
pub mod posts;
pub mod render;
pub mod site;
pub mod transform;
pub mod types;

pub use build::*;
pub use config::*;
pub use error::*;
pub use parsing::*;
pub use site::*;
pub use types::*;
