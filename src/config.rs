// Router configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_weight() -> i32 {
    100
}

/// Build-time configuration for a router.
///
/// The routes root is explicit and required - it is never inferred from
/// the process working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Directory whose file tree defines the URL space.
    pub routes_root: PathBuf,

    /// File extensions treated as route sources when scanning. Empty
    /// means every file under the root is a route source.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Weight assigned to modules that do not declare one.
    #[serde(default = "default_weight")]
    pub default_weight: i32,
}

impl RouterConfig {
    pub fn new(routes_root: impl Into<PathBuf>) -> Self {
        Self {
            routes_root: routes_root.into(),
            extensions: Vec::new(),
            default_weight: default_weight(),
        }
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_default_weight(mut self, weight: i32) -> Self {
        self.default_weight = weight;
        self
    }
}
