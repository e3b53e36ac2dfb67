//! # Mapper Registry
//!
//! Resolves the [`TaskMapper`] for a topic name.
//!
//! Mappers are registered once at startup, either directly or from configuration
//! through a [`MapperCatalog`] of named factories, and the registry is read-only
//! afterwards. Topics without an explicit mapper fall back to the identity mapper
//! unless the registry was built in required mode, where a missing mapper is a
//! [`DispatcherError::MapperNotFound`] configuration error.
//!
//! ## Usage
//!
//! ```rust
//! use external_task_dispatcher::mappers::IdentityMapper;
//! use external_task_dispatcher::registry::MapperRegistry;
//! use std::sync::Arc;
//!
//! let mut registry = MapperRegistry::new();
//! registry.register("Svc-Quote", Arc::new(IdentityMapper));
//!
//! assert_eq!(registry.resolve("Svc-Quote").mapper_name(), "identity");
//! assert_eq!(registry.resolve("Svc-Other").mapper_name(), "identity");
//! ```

use crate::config::TopicMapping;
use crate::constants::IDENTITY_MAPPER;
use crate::error::{DispatcherError, DispatcherResult};
use crate::mappers::{IdentityMapper, TaskMapper};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Creates a mapper instance
pub type MapperFactory = Arc<dyn Fn() -> Arc<dyn TaskMapper> + Send + Sync>;

/// Named mapper factories that configuration can refer to
#[derive(Clone)]
pub struct MapperCatalog {
    factories: HashMap<String, MapperFactory>,
}

impl std::fmt::Debug for MapperCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperCatalog")
            .field("names", &self.names())
            .finish()
    }
}

impl Default for MapperCatalog {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl MapperCatalog {
    /// Catalog with no factories at all
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Catalog containing the built-in mappers
    pub fn with_builtin() -> Self {
        let mut catalog = Self::empty();
        catalog.register(
            IDENTITY_MAPPER,
            Arc::new(|| Arc::new(IdentityMapper) as Arc<dyn TaskMapper>),
        );
        catalog
    }

    /// Add or replace a named factory
    pub fn register(&mut self, name: impl Into<String>, factory: MapperFactory) {
        let name = name.into();
        if self.factories.insert(name.clone(), factory).is_some() {
            warn!(mapper = %name, "Replacing existing mapper factory");
        }
    }

    /// Instantiate the mapper registered under `name`
    pub fn create(&self, name: &str) -> Option<Arc<dyn TaskMapper>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Sorted factory names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Statistics about the registered mappers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperRegistryStats {
    pub registered_topics: usize,
    pub require_explicit: bool,
}

/// Topic name to mapper lookup with identity fallback
pub struct MapperRegistry {
    mappers: HashMap<String, Arc<dyn TaskMapper>>,
    fallback: Arc<dyn TaskMapper>,
    require_explicit: bool,
}

impl std::fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperRegistry")
            .field("topics", &self.registered_topics())
            .field("fallback", &self.fallback.mapper_name())
            .field("require_explicit", &self.require_explicit)
            .finish()
    }
}

impl Default for MapperRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MapperRegistry {
    /// Registry that falls back to the identity mapper for unknown topics
    pub fn new() -> Self {
        Self {
            mappers: HashMap::new(),
            fallback: Arc::new(IdentityMapper),
            require_explicit: false,
        }
    }

    /// Registry where every dispatched topic must have a registered mapper
    pub fn required() -> Self {
        Self {
            require_explicit: true,
            ..Self::new()
        }
    }

    /// Build the registry from configured topic -> mapper-name bindings.
    ///
    /// Fails with [`DispatcherError::UnknownMapper`] when a name is not in the catalog.
    /// A later binding for the same topic replaces an earlier one.
    pub fn from_config(
        catalog: &MapperCatalog,
        topic_mappers: &[TopicMapping],
        require_explicit: bool,
    ) -> DispatcherResult<Self> {
        let mut registry = if require_explicit {
            Self::required()
        } else {
            Self::new()
        };

        for binding in topic_mappers {
            let mapper = catalog
                .create(&binding.mapper)
                .ok_or_else(|| DispatcherError::UnknownMapper {
                    topic: binding.topic.clone(),
                    mapper: binding.mapper.clone(),
                })?;
            registry.register(binding.topic.clone(), mapper);
        }

        info!(
            registered_topics = registry.mappers.len(),
            require_explicit = require_explicit,
            "Mapper registry built"
        );
        Ok(registry)
    }

    /// Register the mapper for a topic
    pub fn register(&mut self, topic: impl Into<String>, mapper: Arc<dyn TaskMapper>) {
        let topic = topic.into();
        info!(topic = %topic, mapper = %mapper.mapper_name(), "Registered topic mapper");
        if self.mappers.insert(topic.clone(), mapper).is_some() {
            warn!(topic = %topic, "Replaced existing topic mapper");
        }
    }

    /// Mapper for `topic`, or the identity mapper when none is registered
    pub fn resolve(&self, topic: &str) -> Arc<dyn TaskMapper> {
        match self.mappers.get(topic) {
            Some(mapper) => mapper.clone(),
            None => {
                debug!(topic = %topic, "No topic mapper registered, using fallback");
                self.fallback.clone()
            }
        }
    }

    /// Mapper for `topic`; absence is a configuration error
    pub fn resolve_required(&self, topic: &str) -> DispatcherResult<Arc<dyn TaskMapper>> {
        self.mappers
            .get(topic)
            .cloned()
            .ok_or_else(|| DispatcherError::MapperNotFound {
                topic: topic.to_string(),
            })
    }

    /// Resolve according to the registry's mode
    pub fn resolve_for_dispatch(&self, topic: &str) -> DispatcherResult<Arc<dyn TaskMapper>> {
        if self.require_explicit {
            self.resolve_required(topic)
        } else {
            Ok(self.resolve(topic))
        }
    }

    /// Startup check: in required mode every listed topic needs a mapper
    pub fn verify_topics(&self, topics: &[String]) -> DispatcherResult<()> {
        if !self.require_explicit {
            return Ok(());
        }
        for topic in topics {
            self.resolve_required(topic)?;
        }
        Ok(())
    }

    pub fn has_mapper(&self, topic: &str) -> bool {
        self.mappers.contains_key(topic)
    }

    pub fn requires_explicit_mappers(&self) -> bool {
        self.require_explicit
    }

    /// Sorted names of topics with an explicit mapper
    pub fn registered_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.mappers.keys().cloned().collect();
        topics.sort();
        topics
    }

    pub fn stats(&self) -> MapperRegistryStats {
        MapperRegistryStats {
            registered_topics: self.mappers.len(),
            require_explicit: self.require_explicit,
        }
    }
}
