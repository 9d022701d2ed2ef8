// Route table construction and request dispatch

use crate::discover::{derive_uri_path, scan_route_files};
use crate::manifest::{ModuleLoader, RouteManifest, RouteModule};
use crate::pattern::PathPattern;
use crate::scope::{ScopeIndex, ScopePhase};
use crate::{
    Error, HttpMethod, HttpRequest, HttpResponse, Middleware, MiddlewareChain, Next, RouterConfig,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// One entry in the route table: a discovered file, its derived pattern,
/// and the module that backs it. Immutable once built.
pub struct RouteRecord {
    pub uri_path: String,
    pub source_path: PathBuf,
    pub weight: i32,
    pattern: PathPattern,
    module: RouteModule,
    scope_dir: PathBuf,
}

/// Filesystem-convention router.
///
/// Built once from a directory tree (or a pre-registered manifest) and
/// immutable afterwards, so it can be shared across any number of
/// concurrent requests without locking. The router is itself a
/// [`Middleware`]: it delegates to its `next` continuation whenever no
/// route (or no handler for the request's method) matches, which is the
/// fall-through contract, not an error.
pub struct Router {
    table: Arc<Vec<RouteRecord>>,
    scopes: Arc<ScopeIndex>,
}

impl Router {
    /// Build from a manifest alone, without touching the filesystem. The
    /// manifest supplies both the file set and the modules.
    pub async fn from_manifest(manifest: &RouteManifest) -> Result<Self, Error> {
        let config = RouterConfig::new(manifest.root());
        Self::build(&config, manifest.source_paths(), manifest).await
    }

    /// Scan the configured routes root and ask `loader` for each file's
    /// module.
    pub async fn scan(config: &RouterConfig, loader: &dyn ModuleLoader) -> Result<Self, Error> {
        let files = scan_route_files(&config.routes_root, &config.extensions)?;
        Self::build(config, files, loader).await
    }

    /// Assemble the route table from an explicit file list.
    ///
    /// Any per-file failure (derivation, loading, duplicate pattern,
    /// scope conflict) aborts the whole build: precedence ordering and
    /// scope resolution only make sense over the complete set. The sort
    /// is stable, so files with equal weight keep their discovery order.
    pub async fn build(
        config: &RouterConfig,
        files: Vec<PathBuf>,
        loader: &dyn ModuleLoader,
    ) -> Result<Self, Error> {
        let mut scopes = ScopeIndex::new();
        let mut records: Vec<RouteRecord> = Vec::with_capacity(files.len());

        for file in files {
            let uri_path = derive_uri_path(&config.routes_root, &file)?;

            if let Some(existing) = records.iter().find(|r| r.uri_path == uri_path) {
                return Err(Error::DuplicateRoute {
                    uri_path,
                    first: existing.source_path.clone(),
                    second: file,
                });
            }

            let module = loader.load(&file).await?;

            let scope_dir = file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| config.routes_root.clone());
            scopes.register(&scope_dir, ScopePhase::Before, module.before_declarations())?;
            scopes.register(&scope_dir, ScopePhase::After, module.after_declarations())?;

            let weight = module.weight_or(config.default_weight);
            debug!(uri_path = %uri_path, source = %file.display(), weight, "assembled route");

            records.push(RouteRecord {
                pattern: PathPattern::compile(&uri_path),
                uri_path,
                source_path: file,
                weight,
                module,
                scope_dir,
            });
        }

        records.sort_by_key(|r| std::cmp::Reverse(r.weight));

        info!(
            routes = records.len(),
            root = %config.routes_root.display(),
            "route table built"
        );

        Ok(Self {
            table: Arc::new(records),
            scopes: Arc::new(scopes),
        })
    }

    /// The route table in match order: descending weight, discovery
    /// order within equal weights.
    pub fn routes(&self) -> &[RouteRecord] {
        &self.table
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.table.len())
            .field("scoped", &!self.scopes.is_empty())
            .finish()
    }
}

#[async_trait]
impl Middleware for Router {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        let mut req = req;

        // Matching only ever sees the path component.
        let path = match req.path.split_once('?') {
            Some((path, query)) => {
                req.query_params = parse_query_string(query);
                path.to_string()
            }
            None => req.path.clone(),
        };

        // First match in sorted order wins; combined with the weight
        // sort this is how overlapping patterns are disambiguated.
        let matched = self
            .table
            .iter()
            .find_map(|record| record.pattern.matches(&path).map(|params| (record, params)));

        let Some((record, params)) = matched else {
            trace!(path = %path, "no route matched, falling through");
            return next(req).await;
        };

        let handler = HttpMethod::from_str(&req.method)
            .and_then(|method| record.module.handler_for(method));
        let Some(handler) = handler else {
            trace!(
                path = %path,
                method = %req.method,
                uri_path = %record.uri_path,
                "matched route has no handler for method, falling through"
            );
            return next(req).await;
        };

        debug!(uri_path = %record.uri_path, method = %req.method, "dispatching");

        let after = self.scopes.after_chain(&record.scope_dir);
        let after_req = if after.is_empty() {
            None
        } else {
            Some(req.clone())
        };

        // Scoped before-middleware wraps the matched handler: a scope
        // that does not call its continuation short-circuits the handler
        // entirely. The handler itself receives the outer continuation.
        let before = MiddlewareChain::new(self.scopes.before_chain(&record.scope_dir));
        let terminal: Next = {
            let handler = handler.clone();
            Box::new(move |mut req: HttpRequest| {
                Box::pin(async move {
                    req.path_params = params;
                    handler.handle(req, next).await
                })
            })
        };

        let mut response = before.run(req, terminal).await?;

        // After-phase scopes run once the handler chain has resolved,
        // innermost directory first, each seeing the produced response
        // through its continuation. They get the request as it stood at
        // dispatch entry, not the before-chain's mutations.
        if let Some(after_req) = after_req {
            for scope in after {
                let resolved = response;
                response = scope
                    .handle(
                        after_req.clone(),
                        Box::new(move |_req| Box::pin(async move { Ok(resolved) })),
                    )
                    .await?;
            }
        }

        Ok(response)
    }
}

fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|part| {
            let mut split = part.splitn(2, '=');
            let key = split.next()?;
            if key.is_empty() {
                return None;
            }
            let value = split.next().unwrap_or("");
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}
