//! Resource interning
//!
//! Maps asset paths to dense, zero-based handles. Handles are never reused
//! or evicted for the lifetime of the registry.

use std::path::PathBuf;

use hashbrown::HashMap;

use crate::error::BridgeError;

/// Dense handle identifying one interned resource path
pub type Handle = u32;

/// Interns resource paths into stable [`Handle`]s
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    paths: Vec<String>,
    lookup: HashMap<String, Handle>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the handle for `path`, assigning the next index on first sight
    pub fn intern(&mut self, path: &str) -> Handle {
        if let Some(&handle) = self.lookup.get(path) {
            return handle;
        }
        let handle = self.paths.len() as Handle;
        self.paths.push(path.to_owned());
        self.lookup.insert(path.to_owned(), handle);
        handle
    }

    /// Look up the path a handle was assigned to
    pub fn resolve(&self, handle: Handle) -> Result<&str, BridgeError> {
        self.paths
            .get(handle as usize)
            .map(String::as_str)
            .ok_or(BridgeError::UnknownHandle(handle))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Maps file names requested by modules to host resource paths
#[derive(Debug, Clone, Default)]
pub struct AssetRoot {
    root: Option<PathBuf>,
}

impl AssetRoot {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// Host path for `file`; the name is used unchanged when no root is set
    pub fn resolve(&self, file: &str) -> String {
        match &self.root {
            Some(root) => root.join(file).to_string_lossy().into_owned(),
            None => file.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let mut registry = ResourceRegistry::new();
        assert_eq!(registry.intern("a.png"), 0);
        assert_eq!(registry.intern("a.png"), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_intern_assigns_increasing_handles() {
        let mut registry = ResourceRegistry::new();
        let a = registry.intern("a.png");
        let b = registry.intern("b.png");
        assert_eq!(a, 0);
        assert!(b > a);
        assert_eq!(registry.intern("a.png"), a);
        assert_eq!(registry.resolve(b).unwrap(), "b.png");
    }

    #[test]
    fn test_asset_root() {
        assert_eq!(AssetRoot::default().resolve("a.png"), "a.png");
        let root = AssetRoot::new(Some(PathBuf::from("assets")));
        assert_eq!(root.resolve("a.png"), PathBuf::from("assets").join("a.png").to_string_lossy());
    }

    #[test]
    fn test_resolve_unknown_handle() {
        let mut registry = ResourceRegistry::new();
        assert!(registry.is_empty());
        registry.intern("a.png");
        assert_eq!(registry.resolve(1), Err(BridgeError::UnknownHandle(1)));
    }
}
