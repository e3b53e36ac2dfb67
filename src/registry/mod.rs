//! # Registry Infrastructure
//!
//! Registries that decide *what* the dispatcher works on and *how* each topic is
//! translated for its downstream API.
//!
//! ## Available Registries
//!
//! - **TopicRegistry**: the working set of topics to long-poll for
//! - **MapperRegistry**: topic name to request/response mapper, built at startup
//!   from a **MapperCatalog** of named factories
//!
//! ```text
//! Registry Infrastructure
//! ├── TopicRegistry   (static topics + auto-discovery + cache invalidation)
//! └── MapperRegistry  (per-topic mappers, identity fallback)
//!     └── MapperCatalog (named mapper factories)
//! ```

pub mod mapper_registry;
pub mod topic_registry;

pub use mapper_registry::{MapperCatalog, MapperFactory, MapperRegistry, MapperRegistryStats};
pub use topic_registry::TopicRegistry;
