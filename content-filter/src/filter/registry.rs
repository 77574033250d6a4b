//! Process-wide `type_name -> constructor` mapping, seeded with the
//! built-in filter kinds and extensible by dynamically loading plug-in
//! libraries.
//!
//! Dynamic loading follows the same `libloading` pattern this pack's
//! `mofa-org-mofa` plug-in loader uses
//! (`crates/mofa-plugins/src/hot_reload/loader.rs`): one exported `extern
//! "C"` symbol per library, called once at load time, through which the
//! plugin registers its own type names. Unlike that loader we never unload
//! or hot-swap a plugin library at runtime — filter objects constructed
//! from it must outlive any request that references them, so the library
//! handle is kept for the life of the process once loaded.

use super::{FilterConfigNode, FilterConstructor, FilterObject};
use crate::error::{ConfigError, PluginError};
use libloading::{Library, Symbol};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

/// The symbol every plug-in shared object must export.
const PLUGIN_ENTRY_SYMBOL: &[u8] = b"nfwf_register_filters";

/// Default plug-in directory checked last, after every configured search
/// path, matching spec.md §4.3's "built-in default path checked last".
pub const DEFAULT_PLUGIN_PATH: &str = "/usr/lib/nfq-content-filter/plugins";

/// Handle a plug-in's exported entry point uses to register its own
/// filter kinds into the owning `FilterRegistry`.
pub struct FilterRegistrar<'a> {
    registry: &'a FilterRegistry,
}

impl<'a> FilterRegistrar<'a> {
    pub fn register(
        &mut self,
        type_name: &str,
        ctor: FilterConstructor,
    ) -> Result<(), PluginError> {
        self.registry.register(type_name, ctor)
    }
}

/// The plug-in entry point signature. A plugin crate exports exactly one
/// `extern "C"` function with this shape, named `nfwf_register_filters`.
pub type PluginEntryFn = unsafe extern "C" fn(&mut FilterRegistrar);

#[derive(Default)]
pub struct FilterRegistry {
    constructors: RwLock<HashMap<String, FilterConstructor>>,
    search_paths: RwLock<Vec<PathBuf>>,
    // Kept alive for the process lifetime: a filter object's vtable lives
    // in the library that constructed it.
    loaded_libraries: Mutex<Vec<Library>>,
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("types", &self.constructors.read().unwrap().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FilterRegistry {
    /// A registry seeded with the five built-in filter kinds and no
    /// configured search paths (the default path is always consulted).
    pub fn with_builtins() -> Self {
        let registry = Self::default();
        registry.register_builtin("host", |node| {
            super::host::HostFilter::from_config(node)
                .map(|f| Arc::new(f) as Arc<dyn FilterObject>)
        });
        registry.register_builtin("ip_net", |node| {
            super::ip::IpNetFilter::from_config(node).map(|f| Arc::new(f) as Arc<dyn FilterObject>)
        });
        registry.register_builtin("url_substring", |node| {
            super::url_substring::UrlSubstringFilter::from_config(node)
                .map(|f| Arc::new(f) as Arc<dyn FilterObject>)
        });
        registry.register_builtin("content_hash", |node| {
            super::content_hash::ContentHashFilter::from_config(node)
                .map(|f| Arc::new(f) as Arc<dyn FilterObject>)
        });
        registry.register_builtin("always_trust", |node| {
            super::always_trust::AlwaysTrustFilter::from_config(node)
                .map(|f| Arc::new(f) as Arc<dyn FilterObject>)
        });
        registry.register_builtin("clamav", |node| {
            super::clamav::ClamAvFilter::from_config(node)
                .map(|f| Arc::new(f) as Arc<dyn FilterObject>)
        });
        registry
    }

    fn register_builtin(
        &self,
        type_name: &str,
        ctor: impl Fn(&FilterConfigNode) -> Result<Arc<dyn FilterObject>, ConfigError>
            + Send
            + Sync
            + 'static,
    ) {
        self.constructors
            .write()
            .unwrap()
            .insert(type_name.to_string(), Arc::new(ctor));
    }

    /// Add a library search path, tried before the built-in default path.
    /// Paths are evaluated in insertion order.
    pub fn add_search_path(&self, path: impl Into<PathBuf>) {
        self.search_paths.write().unwrap().push(path.into());
    }

    pub fn register(&self, type_name: &str, ctor: FilterConstructor) -> Result<(), PluginError> {
        let mut constructors = self.constructors.write().unwrap();
        if constructors.contains_key(type_name) {
            return Err(PluginError::DuplicateType(type_name.to_string()));
        }
        constructors.insert(type_name.to_string(), ctor);
        Ok(())
    }

    /// Load a single plug-in shared object and run its registration entry
    /// point.
    ///
    /// # Safety contract
    /// The library must export `nfwf_register_filters` with the exact
    /// `PluginEntryFn` signature; calling an incompatible symbol is
    /// undefined behaviour. This is an inherent boundary of any C-ABI
    /// plug-in system, not specific to this loader.
    pub fn load_library(&self, path: &Path) -> Result<(), PluginError> {
        unsafe {
            let lib = Library::new(path).map_err(|e| PluginError::Library {
                path: path.to_path_buf(),
                source: e,
            })?;

            let entry: Symbol<PluginEntryFn> =
                lib.get(PLUGIN_ENTRY_SYMBOL).map_err(|e| PluginError::MissingSymbol {
                    path: path.to_path_buf(),
                    source: e,
                })?;

            let mut registrar = FilterRegistrar { registry: self };
            entry(&mut registrar);

            self.loaded_libraries.lock().unwrap().push(lib);
        }
        Ok(())
    }

    /// Try to load a plug-in providing `type_name` from the configured
    /// search paths, in insertion order, then the built-in default path.
    fn discover(&self, type_name: &str) -> bool {
        let candidate_name = format!("libnfwf_{type_name}.so");
        let mut paths: Vec<PathBuf> = self.search_paths.read().unwrap().clone();
        paths.push(PathBuf::from(DEFAULT_PLUGIN_PATH));

        for dir in paths {
            let candidate = dir.join(&candidate_name);
            if !candidate.exists() {
                continue;
            }
            match self.load_library(&candidate) {
                Ok(()) => {
                    if self.constructors.read().unwrap().contains_key(type_name) {
                        return true;
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %candidate.display(), error = %e, "plugin load failed");
                }
            }
        }
        false
    }

    /// Construct a filter object for the given configuration node.
    ///
    /// Unknown type: per spec.md §4.3, this is not an error — the caller
    /// (the configuration loader) warns and skips the filter, so this
    /// returns `None` rather than `Err`.
    pub fn construct(&self, node: &FilterConfigNode) -> Option<Arc<dyn FilterObject>> {
        let ctor = {
            let constructors = self.constructors.read().unwrap();
            constructors.get(&node.type_name).cloned()
        };

        let ctor = match ctor {
            Some(c) => c,
            None => {
                if !self.discover(&node.type_name) {
                    return None;
                }
                self.constructors.read().unwrap().get(&node.type_name).cloned()?
            }
        };

        match ctor(node) {
            Ok(filter) => Some(filter),
            Err(e) => {
                tracing::warn!(filter_id = node.id, type_name = %node.type_name, error = %e, "filter construction failed");
                None
            }
        }
    }
}
