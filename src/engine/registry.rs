use crate::engine::{
    EngineError, Result,
    adapter::SiteAdapter,
    adapters::{FzMoviesEngine, NetNaijaEngine, TvSeriesEngine},
};
use std::collections::BTreeMap;
use std::sync::Arc;

type Constructor = Arc<dyn Fn() -> Box<dyn SiteAdapter> + Send + Sync>;

/// Maps case-insensitive engine names to adapter constructors.
///
/// Every lookup builds a new adapter so nothing leaks between unrelated runs.
#[derive(Clone, Default)]
pub struct EngineRegistry {
    engines: BTreeMap<String, Constructor>,
}

impl EngineRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every built-in engine
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("netnaija", || Box::new(NetNaijaEngine::new()));
        registry.register("fzmovies", || Box::new(FzMoviesEngine::new()));
        registry.register("tvseries", || Box::new(TvSeriesEngine::new()));
        registry
    }

    /// Add or replace an engine
    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn() -> Box<dyn SiteAdapter> + Send + Sync + 'static,
    {
        self.engines
            .insert(name.trim().to_lowercase(), Arc::new(constructor));
    }

    /// Construct the engine registered under `name`, ignoring case
    pub fn lookup(&self, name: &str) -> Result<Box<dyn SiteAdapter>> {
        self.engines
            .get(&name.trim().to_lowercase())
            .map(|constructor| constructor())
            .ok_or_else(|| EngineError::UnknownEngine(name.to_string()))
    }

    /// Construct every registered engine
    pub fn list_all(&self) -> BTreeMap<String, Box<dyn SiteAdapter>> {
        self.engines
            .iter()
            .map(|(name, constructor)| (name.clone(), constructor()))
            .collect()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.engines.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.engines.contains_key(&name.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("engines", &self.names())
            .finish()
    }
}
