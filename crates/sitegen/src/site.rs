use crate::config::Config;
use crate::types::{Document, Post};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Configuration extended with the collected posts: the read-only input
/// shared by every page render and the feed.
#[derive(Debug, Clone)]
pub struct Site {
    pub config: Arc<Config>,
    pub posts: Arc<Vec<Post>>,
    variables: Arc<Map<String, Value>>,
}

impl Site {
    pub fn new(config: Arc<Config>, posts: Arc<Vec<Post>>) -> Self {
        let mut variables = config.to_map();
        variables.insert(
            "posts".to_string(),
            Value::Array(
                posts
                    .iter()
                    .map(|post| Value::Object(post.to_map()))
                    .collect(),
            ),
        );

        Self {
            config,
            posts,
            variables: Arc::new(variables),
        }
    }

    /// Configuration variables plus `posts`; what a page body sees.
    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    /// Full layout context for one page. Later layers win: site variables,
    /// then the page's front matter and derived fields, then the rendered body.
    pub fn page_variables(&self, document: &Document, body: String) -> Map<String, Value> {
        let mut variables = self.variables.as_ref().clone();
        variables.extend(document.to_map());
        variables.insert("body".to_string(), Value::String(body));
        variables
    }
}
