//! Locates the RISU executable before anything is spawned.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ModuleError;

const RESOLVER_TARGET: &str = "risu_runner::resolver";

/// Resolves executable references against `PATH`.
///
/// The default resolver searches the process `PATH`; tests can pin the search
/// path with [`ExecutableResolver::with_search_path`].
#[derive(Debug, Clone, Default)]
pub struct ExecutableResolver {
    search_path: Option<OsString>,
}

impl ExecutableResolver {
    /// Creates a resolver that consults the process `PATH`.
    #[must_use]
    pub const fn new() -> Self {
        Self { search_path: None }
    }

    /// Creates a resolver that consults `search_path` instead of `PATH`.
    #[must_use]
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
        }
    }

    /// Resolves `reference` to the path that will be executed.
    ///
    /// A bare name (no path separators) is replaced by its absolute location
    /// on the search path when one exists. The result must then either exist
    /// on disk or be discoverable on the search path.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::InstallationNotFound`] when neither holds.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf, ModuleError> {
        let mut resolved = PathBuf::from(reference);

        if is_bare_name(reference) {
            if let Some(found) = self.lookup(reference) {
                debug!(
                    target: RESOLVER_TARGET,
                    name = reference,
                    path = %found.display(),
                    "resolved executable from search path"
                );
                resolved = found;
            }
        }

        if resolved.exists() || self.lookup(resolved.as_os_str()).is_some() {
            return Ok(resolved);
        }

        Err(ModuleError::InstallationNotFound {
            path: resolved.display().to_string(),
        })
    }

    fn lookup(&self, name: impl AsRef<OsStr>) -> Option<PathBuf> {
        match &self.search_path {
            Some(paths) => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
                which::which_in(name, Some(paths), cwd).ok()
            }
            None => which::which(name).ok(),
        }
    }
}

fn is_bare_name(reference: &str) -> bool {
    !reference.is_empty()
        && Path::new(reference)
            .file_name()
            .is_some_and(|name| name == OsStr::new(reference))
}
