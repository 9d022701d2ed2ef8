// Route module contract and explicit registration

use crate::{Error, HttpMethod, Middleware};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a route source file contributes: per-method handlers, an
/// optional precedence weight, and optional directory-scoped middleware
/// declarations.
///
/// Built with a fluent API:
///
/// ```
/// use trellis::{middleware_fn, HttpResponse, RouteModule};
///
/// let module = RouteModule::new()
///     .get(middleware_fn(|_req, _next| async {
///         Ok(HttpResponse::ok())
///     }))
///     .weight(50);
/// # let _ = module;
/// ```
#[derive(Clone, Default)]
pub struct RouteModule {
    handlers: HashMap<HttpMethod, Arc<dyn Middleware>>,
    weight: Option<i32>,
    use_before: Vec<Arc<dyn Middleware>>,
    use_after: Vec<Arc<dyn Middleware>>,
}

impl RouteModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an arbitrary method.
    pub fn on(mut self, method: HttpMethod, handler: Arc<dyn Middleware>) -> Self {
        self.handlers.insert(method, handler);
        self
    }

    pub fn get(self, handler: Arc<dyn Middleware>) -> Self {
        self.on(HttpMethod::GET, handler)
    }

    pub fn post(self, handler: Arc<dyn Middleware>) -> Self {
        self.on(HttpMethod::POST, handler)
    }

    pub fn put(self, handler: Arc<dyn Middleware>) -> Self {
        self.on(HttpMethod::PUT, handler)
    }

    pub fn patch(self, handler: Arc<dyn Middleware>) -> Self {
        self.on(HttpMethod::PATCH, handler)
    }

    pub fn delete(self, handler: Arc<dyn Middleware>) -> Self {
        self.on(HttpMethod::DELETE, handler)
    }

    pub fn head(self, handler: Arc<dyn Middleware>) -> Self {
        self.on(HttpMethod::HEAD, handler)
    }

    pub fn options(self, handler: Arc<dyn Middleware>) -> Self {
        self.on(HttpMethod::OPTIONS, handler)
    }

    /// Precedence weight. Default is 100; larger weights are matched
    /// earlier when patterns overlap.
    pub fn weight(mut self, weight: i32) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Middleware to run before any handler in this file's directory and
    /// everything nested below it.
    pub fn use_before(mut self, middleware: Vec<Arc<dyn Middleware>>) -> Self {
        self.use_before = middleware;
        self
    }

    /// Middleware to run after the handler, same scoping as `use_before`.
    pub fn use_after(mut self, middleware: Vec<Arc<dyn Middleware>>) -> Self {
        self.use_after = middleware;
        self
    }

    pub fn handler_for(&self, method: HttpMethod) -> Option<Arc<dyn Middleware>> {
        self.handlers.get(&method).cloned()
    }

    pub fn weight_or(&self, default: i32) -> i32 {
        self.weight.unwrap_or(default)
    }

    pub(crate) fn before_declarations(&self) -> &[Arc<dyn Middleware>] {
        &self.use_before
    }

    pub(crate) fn after_declarations(&self) -> &[Arc<dyn Middleware>] {
        &self.use_after
    }
}

impl std::fmt::Debug for RouteModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods: Vec<&'static str> =
            self.handlers.keys().map(|m| m.as_str()).collect();
        methods.sort_unstable();
        f.debug_struct("RouteModule")
            .field("methods", &methods)
            .field("weight", &self.weight)
            .field("use_before", &self.use_before.len())
            .field("use_after", &self.use_after.len())
            .finish()
    }
}

/// Supplies the module for each discovered route file.
///
/// This stands in for dynamic module loading: the build phase asks the
/// loader for every discovered path and aborts on the first failure, so a
/// router never starts with a partially loaded table. Implementations may
/// resolve immediately or suspend.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, source_path: &Path) -> Result<RouteModule, Error>;
}

/// A pre-registered set of route modules keyed by path relative to the
/// routes root. Doubles as both the file list and the loader, so a router
/// can be built from a manifest alone without touching the filesystem.
#[derive(Default)]
pub struct RouteManifest {
    root: PathBuf,
    modules: HashMap<PathBuf, RouteModule>,
}

impl RouteManifest {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            modules: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Register a module under a root-relative source path such as
    /// `users/[id].rs`. Re-registering a path replaces the entry.
    pub fn register(mut self, relative: impl AsRef<Path>, module: RouteModule) -> Self {
        self.modules
            .insert(relative.as_ref().to_path_buf(), module);
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Absolute source paths of every registered module. Iteration order
    /// is unspecified, mirroring the unspecified order of a directory
    /// walk; use weights to disambiguate overlapping patterns.
    pub fn source_paths(&self) -> Vec<PathBuf> {
        self.modules.keys().map(|rel| self.root.join(rel)).collect()
    }
}

#[async_trait]
impl ModuleLoader for RouteManifest {
    async fn load(&self, source_path: &Path) -> Result<RouteModule, Error> {
        let relative = source_path
            .strip_prefix(&self.root)
            .map_err(|_| Error::OutsideRoot {
                path: source_path.to_path_buf(),
            })?;
        self.modules
            .get(relative)
            .cloned()
            .ok_or_else(|| Error::ModuleLoad {
                source_path: source_path.to_path_buf(),
                reason: "no module registered for this path".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{middleware_fn, HttpResponse};

    fn noop() -> Arc<dyn Middleware> {
        middleware_fn(|_req, _next| async { Ok(HttpResponse::ok()) })
    }

    #[test]
    fn test_module_builder_registers_methods() {
        let module = RouteModule::new().get(noop()).post(noop());
        assert!(module.handler_for(HttpMethod::GET).is_some());
        assert!(module.handler_for(HttpMethod::POST).is_some());
        assert!(module.handler_for(HttpMethod::DELETE).is_none());
    }

    #[test]
    fn test_weight_defaults_when_unset() {
        let module = RouteModule::new();
        assert_eq!(module.weight_or(100), 100);
        let weighted = RouteModule::new().weight(50);
        assert_eq!(weighted.weight_or(100), 50);
    }

    #[test]
    fn test_manifest_resolves_registered_path() {
        let manifest = RouteManifest::new("/srv/routes")
            .register("users/index.rs", RouteModule::new().get(noop()));
        let module = tokio_test::block_on(manifest.load(Path::new("/srv/routes/users/index.rs")))
            .unwrap();
        assert!(module.handler_for(HttpMethod::GET).is_some());
    }

    #[tokio::test]
    async fn test_manifest_missing_path_is_load_error() {
        let manifest = RouteManifest::new("/srv/routes");
        let err = manifest
            .load(Path::new("/srv/routes/ghost.rs"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ModuleLoad { .. }));
    }

    #[tokio::test]
    async fn test_manifest_rejects_path_outside_root() {
        let manifest = RouteManifest::new("/srv/routes");
        let err = manifest.load(Path::new("/tmp/evil.rs")).await.unwrap_err();
        assert!(matches!(err, Error::OutsideRoot { .. }));
    }

    #[test]
    fn test_source_paths_are_rooted() {
        let manifest = RouteManifest::new("/srv/routes")
            .register("index.rs", RouteModule::new())
            .register("users/index.rs", RouteModule::new());
        let mut paths = manifest.source_paths();
        paths.sort();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/srv/routes/index.rs"),
                PathBuf::from("/srv/routes/users/index.rs"),
            ]
        );
    }

    #[test]
    fn test_debug_lists_methods_without_handlers() {
        let module = RouteModule::new().get(noop()).weight(10);
        let debug = format!("{module:?}");
        assert!(debug.contains("GET"));
        assert!(debug.contains("10"));
    }
}
