// Directory-scoped middleware resolution

use crate::{Error, Middleware, MiddlewareChain};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Phase a scope declaration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopePhase {
    Before,
    After,
}

impl ScopePhase {
    fn as_str(self) -> &'static str {
        match self {
            ScopePhase::Before => "before",
            ScopePhase::After => "after",
        }
    }
}

/// Composed scope middleware keyed by the declaring directory.
///
/// A scope covers its directory and every directory nested beneath it;
/// containment is component-wise (`/routes/adm` does not cover
/// `/routes/admin`). Populated once at build time, then shared read-only
/// across all in-flight requests.
#[derive(Default)]
pub struct ScopeIndex {
    before: HashMap<PathBuf, Arc<dyn Middleware>>,
    after: HashMap<PathBuf, Arc<dyn Middleware>>,
}

impl ScopeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compose a declared middleware list and register it for `dir`.
    ///
    /// Two route files in the same directory declaring the same phase is
    /// rejected at build time; silent last-write-wins made it depend on
    /// discovery order which file's declaration survived.
    pub(crate) fn register(
        &mut self,
        dir: &Path,
        phase: ScopePhase,
        declared: &[Arc<dyn Middleware>],
    ) -> Result<(), Error> {
        if declared.is_empty() {
            return Ok(());
        }
        let composed: Arc<dyn Middleware> = Arc::new(MiddlewareChain::new(declared.to_vec()));
        let slot = match phase {
            ScopePhase::Before => &mut self.before,
            ScopePhase::After => &mut self.after,
        };
        if slot.insert(dir.to_path_buf(), composed).is_some() {
            return Err(Error::ScopeConflict {
                dir: dir.to_path_buf(),
                phase: phase.as_str(),
            });
        }
        Ok(())
    }

    /// Before-phase handlers applicable to a route in `scope_dir`:
    /// every registered ancestor (or the directory itself), outermost
    /// first, so `/routes` middleware runs before `/routes/admin`
    /// middleware.
    pub fn before_chain(&self, scope_dir: &Path) -> Vec<Arc<dyn Middleware>> {
        Self::applicable(&self.before, scope_dir, false)
    }

    /// After-phase handlers for `scope_dir`, innermost first - the
    /// mirror image of the before ordering.
    ///
    /// After-phase handlers are response-oriented: at dispatch time they
    /// receive the request as it stood when dispatch began, without
    /// matched path parameters or mutations made by before-phase
    /// middleware. The resolved response reaches them through their
    /// continuation.
    pub fn after_chain(&self, scope_dir: &Path) -> Vec<Arc<dyn Middleware>> {
        Self::applicable(&self.after, scope_dir, true)
    }

    fn applicable(
        index: &HashMap<PathBuf, Arc<dyn Middleware>>,
        scope_dir: &Path,
        innermost_first: bool,
    ) -> Vec<Arc<dyn Middleware>> {
        let mut matched: Vec<(&PathBuf, &Arc<dyn Middleware>)> = index
            .iter()
            .filter(|(dir, _)| scope_dir.starts_with(dir))
            .collect();
        matched.sort_by_key(|(dir, _)| dir.components().count());
        if innermost_first {
            matched.reverse();
        }
        matched.into_iter().map(|(_, mw)| mw.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}
